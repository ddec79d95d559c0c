pub mod app_context;
pub mod config;
pub mod history;
pub mod logging;
pub mod protocols;
pub mod reasoning_filter;
pub mod server;
pub mod upstream;
