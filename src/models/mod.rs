pub mod config;
pub mod envelope;

pub use config::AppConfig;
pub use envelope::{ProxyRequest, ProxyResponse};
