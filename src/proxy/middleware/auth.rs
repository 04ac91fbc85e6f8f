// Proxy token authentication middleware
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;

use crate::error::RelayError;
use crate::proxy::server::AppState;

pub const PROXY_TOKEN_HEADER: &str = "x-proxy-token";

/// Exact match, compared in constant time for equal lengths
pub fn token_matches(presented: &str, expected: &str) -> bool {
    let (a, b) = (presented.as_bytes(), expected.as_bytes());
    a.len() == b.len() && bool::from(a.ct_eq(b))
}

/// Proxy token authentication middleware
///
/// Runs before the body is read, so unauthenticated callers get 401 no
/// matter what they sent.
pub async fn auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let presented = request
        .headers()
        .get(PROXY_TOKEN_HEADER)
        .and_then(|h| h.to_str().ok());

    match presented {
        Some(token) if token_matches(token, &state.config.auth_token) => next.run(request).await,
        Some(_) => {
            tracing::warn!("Rejected {} {}: token mismatch", request.method(), request.uri());
            RelayError::Unauthorized.into_response()
        }
        None => {
            tracing::warn!("Rejected {} {}: missing token", request.method(), request.uri());
            RelayError::Unauthorized.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_matches_exactly() {
        assert!(token_matches("s3cret", "s3cret"));
        assert!(!token_matches("s3cret ", "s3cret"));
        assert!(!token_matches("S3CRET", "s3cret"));
        assert!(!token_matches("", "s3cret"));
        assert!(!token_matches("s3cr", "s3cret"));
    }
}
