use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{AppError, AppResult};
use crate::models::AppConfig;
use crate::proxy::ProxyConfig;

const ENV_CONFIG_FILE: &str = "PROXY_CONFIG_FILE";
const ENV_AUTH_TOKEN: &str = "PROXY_AUTH_TOKEN";
const ENV_ALLOWED_DOMAINS: &str = "ALLOWED_DOMAINS";
const ENV_TIMEOUT: &str = "PROXY_TIMEOUT";
const ENV_HOST: &str = "PROXY_HOST";
const ENV_PORT: &str = "PROXY_PORT";
const ENV_LOG_DIR: &str = "PROXY_LOG_DIR";

/// Load application config from the process environment
pub fn load_app_config() -> AppResult<AppConfig> {
    load_app_config_from(|key| std::env::var(key).ok())
}

/// Load application config through an arbitrary variable lookup.
///
/// Values from `PROXY_CONFIG_FILE` (JSON) are applied first, then individual
/// variables override them.
pub fn load_app_config_from<F>(lookup: F) -> AppResult<AppConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match lookup(ENV_CONFIG_FILE).filter(|p| !p.trim().is_empty()) {
        Some(path) => read_config_file(Path::new(path.trim()))?,
        None => AppConfig::new(),
    };

    if let Some(token) = lookup(ENV_AUTH_TOKEN) {
        config.proxy.auth_token = token;
    }
    if let Some(domains) = lookup(ENV_ALLOWED_DOMAINS) {
        config.proxy.allowed_domains = ProxyConfig::parse_domain_list(&domains);
    }
    if let Some(timeout) = lookup(ENV_TIMEOUT) {
        config.proxy.request_timeout = parse_value(ENV_TIMEOUT, &timeout)?;
    }
    if let Some(host) = lookup(ENV_HOST).filter(|h| !h.trim().is_empty()) {
        config.proxy.host = host.trim().to_string();
    }
    if let Some(port) = lookup(ENV_PORT) {
        config.proxy.port = parse_value(ENV_PORT, &port)?;
    }
    if let Some(dir) = lookup(ENV_LOG_DIR).filter(|d| !d.trim().is_empty()) {
        config.log_dir = Some(PathBuf::from(dir.trim()));
    }

    // File entries get the same normalization as the env list
    config.proxy.allowed_domains =
        ProxyConfig::parse_domain_list(&config.proxy.allowed_domains.join(","));

    validate(&config)?;
    Ok(config)
}

fn read_config_file(path: &Path) -> AppResult<AppConfig> {
    let content = fs::read_to_string(path).map_err(|e| {
        AppError::Config(format!(
            "Failed to read config file {}: {}",
            path.display(),
            e
        ))
    })?;

    serde_json::from_str(&content).map_err(|e| {
        AppError::Config(format!(
            "Failed to parse config file {}: {}",
            path.display(),
            e
        ))
    })
}

fn parse_value<T>(key: &str, raw: &str) -> AppResult<T>
where
    T: FromStr,
    T::Err: Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| AppError::Config(format!("Invalid value for {}: {:?} ({})", key, raw, e)))
}

fn validate(config: &AppConfig) -> AppResult<()> {
    if config.proxy.auth_token.is_empty() {
        return Err(AppError::Config(format!("{} must not be empty", ENV_AUTH_TOKEN)));
    }
    if config.proxy.request_timeout == 0 {
        return Err(AppError::Config(format!(
            "{} must be greater than zero",
            ENV_TIMEOUT
        )));
    }
    Ok(())
}
