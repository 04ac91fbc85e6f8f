// Upstream client implementation
// One outbound call per relayed request: no retries, no redirects followed

use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    redirect, Client, Method,
};
use std::collections::HashMap;
use std::error::Error as StdError;
use tokio::time::Duration;
use url::Url;

use crate::error::{AppResult, RelayError};
use crate::models::{ProxyRequest, ProxyResponse};

pub struct UpstreamClient {
    http_client: Client,
}

impl UpstreamClient {
    pub fn new(timeout_secs: u64) -> AppResult<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .redirect(redirect::Policy::none())
            // Single hop: never pick up HTTP_PROXY / HTTPS_PROXY from the environment
            .no_proxy()
            .build()?;

        Ok(Self { http_client })
    }

    /// Parse the caller's method, case-insensitively
    fn build_method(method: &str) -> Result<Method, RelayError> {
        Method::from_bytes(method.trim().to_uppercase().as_bytes())
            .map_err(|_| RelayError::Validation(format!("Invalid HTTP method: {}", method)))
    }

    /// Caller headers, verbatim
    fn build_headers(headers: Option<&HashMap<String, String>>) -> Result<HeaderMap, RelayError> {
        let mut map = HeaderMap::new();
        for (name, value) in headers.into_iter().flatten() {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| RelayError::Validation(format!("Invalid header name: {}", name)))?;
            let header_value = HeaderValue::from_str(value).map_err(|_| {
                RelayError::Validation(format!("Invalid value for header {}", name))
            })?;
            map.insert(header_name, header_value);
        }
        Ok(map)
    }

    /// Flatten response headers; repeated names are joined with ", "
    fn collect_headers(headers: &HeaderMap) -> HashMap<String, String> {
        let mut collected: HashMap<String, String> = HashMap::new();
        for (name, value) in headers {
            let value = String::from_utf8_lossy(value.as_bytes());
            collected
                .entry(name.as_str().to_string())
                .and_modify(|existing| {
                    existing.push_str(", ");
                    existing.push_str(&value);
                })
                .or_insert_with(|| value.into_owned());
        }
        collected
    }

    /// Error text including the source chain ("error sending request: connection refused")
    fn describe(err: &reqwest::Error) -> String {
        let mut description = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            let cause_text = cause.to_string();
            if !description.contains(&cause_text) {
                description.push_str(": ");
                description.push_str(&cause_text);
            }
            source = cause.source();
        }
        description
    }

    fn map_transport_error(err: reqwest::Error) -> RelayError {
        if err.is_timeout() {
            RelayError::UpstreamTimeout
        } else {
            RelayError::Upstream(Self::describe(&err))
        }
    }

    /// Relay `request` to `url` and capture the response as-is
    pub async fn forward(&self, url: Url, request: &ProxyRequest) -> Result<ProxyResponse, RelayError> {
        let method = Self::build_method(&request.method)?;
        let headers = Self::build_headers(request.headers.as_ref())?;

        let mut builder = self.http_client.request(method, url).headers(headers);
        if let Some(body) = request.body.as_ref().filter(|b| !b.is_empty()) {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(Self::map_transport_error)?;

        let status_code = response.status().as_u16();
        let headers = Self::collect_headers(response.headers());
        let body = response.text().await.map_err(Self::map_transport_error)?;

        Ok(ProxyResponse {
            status_code,
            headers,
            body,
        })
    }
}
