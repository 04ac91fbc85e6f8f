// Relay Handler
use axum::extract::{rejection::JsonRejection, Json, State};
use tokio::time::Instant;
use tracing::{info, info_span, warn, Instrument};

use crate::error::RelayError;
use crate::models::{ProxyRequest, ProxyResponse};
use crate::proxy::common::{ssrf, utils::extract_host};
use crate::proxy::server::AppState;

/// Handle POST /proxy
///
/// Authentication already happened in the middleware; this runs
/// domain allow-list → SSRF validation → forward, all under one
/// `request_timeout` deadline.
pub async fn handle_proxy(
    State(state): State<AppState>,
    payload: Result<Json<ProxyRequest>, JsonRejection>,
) -> Result<Json<ProxyResponse>, RelayError> {
    let Json(request) = payload.map_err(|rejection| {
        warn!("Rejected malformed relay request: {}", rejection.body_text());
        RelayError::Validation(rejection.body_text())
    })?;

    let request_id = uuid::Uuid::new_v4().simple().to_string();
    let span = info_span!("relay", request_id = %request_id);

    let deadline = Instant::now() + state.request_timeout();
    relay(&state, request, deadline).instrument(span).await.map(Json)
}

async fn relay(
    state: &AppState,
    request: ProxyRequest,
    deadline: Instant,
) -> Result<ProxyResponse, RelayError> {
    let target_host = extract_host(&request.url).unwrap_or_else(|| "<unparsed>".to_string());
    info!("Received relay request: {} {}", request.method, target_host);

    // 1. Domain allow-list
    if let Err(violation) = state.domains.check(&request.url) {
        warn!("Denied {}: {}", target_host, violation);
        return Err(violation.into());
    }

    // 2. SSRF validation (scheme, metadata hosts, private ranges, DNS)
    let lookup_budget = deadline.saturating_duration_since(Instant::now());
    let url = match ssrf::validate_target(&request.url, lookup_budget).await {
        Ok(url) => url,
        Err(violation) => {
            warn!("Denied {}: {:?}", target_host, violation);
            return Err(violation.into());
        }
    };

    // 3. Upstream call, with whatever is left of the deadline
    let forwarded = tokio::time::timeout_at(deadline, state.upstream.forward(url, &request))
        .await
        .unwrap_or(Err(RelayError::UpstreamTimeout));

    match forwarded {
        Ok(response) => {
            info!(
                "Relayed {} {} -> {}",
                request.method.to_uppercase(),
                target_host,
                response.status_code
            );
            Ok(response)
        }
        Err(RelayError::UpstreamTimeout) => {
            warn!("Upstream {} timed out", target_host);
            Err(RelayError::UpstreamTimeout)
        }
        Err(e) => {
            warn!("Relay to {} failed: {}", target_host, e);
            Err(e)
        }
    }
}
