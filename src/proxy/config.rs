use serde::{Deserialize, Serialize};

/// Token shipped as the default; operators must override it
pub const PLACEHOLDER_AUTH_TOKEN: &str = "changeme";

/// 反代服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,

    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,

    /// Shared secret expected in `X-Proxy-Token`
    #[serde(default = "default_auth_token")]
    pub auth_token: String,

    /// Permitted target domains (subdomains included); empty allows every domain
    #[serde(default)]
    pub allowed_domains: Vec<String>,

    /// Outbound request timeout (seconds), connect through body read
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            auth_token: default_auth_token(),
            allowed_domains: Vec::new(),
            request_timeout: default_request_timeout(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_auth_token() -> String {
    PLACEHOLDER_AUTH_TOKEN.to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl ProxyConfig {
    /// 获取实际的监听地址
    pub fn get_bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn uses_placeholder_token(&self) -> bool {
        self.auth_token == PLACEHOLDER_AUTH_TOKEN
    }

    /// Split a comma-separated domain list, dropping blank entries
    pub fn parse_domain_list(raw: &str) -> Vec<String> {
        raw.split(',')
            .map(|d| d.trim().to_lowercase())
            .filter(|d| !d.is_empty())
            .collect()
    }
}
