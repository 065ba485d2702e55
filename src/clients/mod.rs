pub mod database;
pub mod fcm;
pub mod health;
pub mod memory;
pub mod provider;
pub mod registry;
pub mod sendgrid;
pub mod store;
pub mod template;
pub mod twilio;
