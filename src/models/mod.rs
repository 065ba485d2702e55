pub mod audit;
pub mod fcm;
pub mod health;
pub mod payload;
pub mod queue;
pub mod response;
pub mod retry;
pub mod sendgrid;
pub mod status;
pub mod template;
pub mod twilio;
pub mod validation;
