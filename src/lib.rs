pub mod apis;
pub mod cache;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod presentation;
pub mod server;
pub mod store;
pub mod types;

// Ports and their infrastructure adapters
pub mod app;
pub mod infra;
