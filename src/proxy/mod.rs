// proxy module - relay service

pub mod config;
pub mod server;

pub mod common; // Domain allow-list, SSRF guard, helpers
pub mod handlers; // API endpoint handlers
pub mod middleware; // Axum middleware
pub mod upstream; // Upstream client

pub use config::ProxyConfig;
pub use server::{build_router, AppState, AxumServer};
