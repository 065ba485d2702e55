pub mod api;
pub mod clients;
pub mod config;
pub mod error;
pub mod jobs;
pub mod models;
pub mod service;
pub mod utils;
