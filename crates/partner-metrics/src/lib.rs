pub mod access;
pub mod config;
pub mod error;
pub mod import;
pub mod metrics;
pub mod notifications;
pub mod reports;
pub mod telemetry;
