use std::collections::HashMap;

use serde_json::Value as JsonValue;
use tracing::debug;

use crate::{
    models::template::{NotificationTemplate, RenderedTemplate},
    utils::value_to_text,
};

/// Flat `{{name}}` substitution.
///
/// Every occurrence of a known key is replaced with its text form. Unknown
/// placeholders stay in the output as written. Substituted values are not
/// scanned again, so a value containing `{{x}}` is emitted literally.
pub struct TemplateRenderer;

impl TemplateRenderer {
    pub fn render(template: &NotificationTemplate, variables: &HashMap<String, JsonValue>) -> RenderedTemplate {
        debug!(
            template_key = %template.template_key,
            variable_count = variables.len(),
            "Rendering template"
        );

        RenderedTemplate {
            subject: template
                .subject
                .as_deref()
                .map(|subject| Self::replace_variables(subject, variables)),
            body: Self::replace_variables(&template.body_template, variables),
            html_body: template
                .html_body_template
                .as_deref()
                .map(|html| Self::replace_variables(html, variables)),
        }
    }

    pub fn replace_variables(template: &str, variables: &HashMap<String, JsonValue>) -> String {
        let mut result = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find("{{") {
            let after_open = &rest[start + 2..];

            let Some(end) = after_open.find("}}") else {
                break;
            };

            let key = &after_open[..end];
            result.push_str(&rest[..start]);

            match variables.get(key) {
                Some(value) => result.push_str(&value_to_text(value)),
                None => {
                    result.push_str("{{");
                    result.push_str(key);
                    result.push_str("}}");
                }
            }

            rest = &after_open[end + 2..];
        }

        result.push_str(rest);
        result
    }
}
