use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::net::IpAddr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Server error: {0}")]
    Server(String),
}

// Implement alias for Result to simplify usage
pub type AppResult<T> = Result<T, AppError>;

/// Reasons a target URL is refused before any outbound traffic happens.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyViolation {
    #[error("Domain not allowed")]
    DomainNotAllowed,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("URL has no host")]
    MissingHost,

    #[error("Metadata endpoints are blocked")]
    MetadataEndpoint,

    #[error("Private/internal IP addresses are blocked")]
    PrivateAddress(IpAddr),

    #[error("Hostname resolves to private/internal IP")]
    ResolvesToPrivate { host: String, ip: IpAddr },
}

/// Per-request failure of the relay pipeline.
///
/// Every variant maps to exactly one HTTP status; the body is always
/// `{"detail": <message>}`.
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Invalid token")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(#[from] PolicyViolation),

    #[error("Upstream timeout")]
    UpstreamTimeout,

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("{0}")]
    Validation(String),
}

impl RelayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::Unauthorized => StatusCode::UNAUTHORIZED,
            RelayError::Forbidden(_) => StatusCode::FORBIDDEN,
            RelayError::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
            RelayError::Upstream(_) => StatusCode::BAD_GATEWAY,
            RelayError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (
            status,
            Json(serde_json::json!({
                "detail": self.to_string()
            })),
        )
            .into_response()
    }
}
