pub mod analytics;
pub mod config;
pub mod error;
pub mod i18n;
pub mod retry;
pub mod scheduler;
pub mod security;
pub mod server;
