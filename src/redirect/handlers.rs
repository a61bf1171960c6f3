use axum::{
    extract::{ConnectInfo, Path, State},
    http::{header, header::HeaderMap, StatusCode},
    response::{Html, IntoResponse},
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use super::interstitial::render_interstitial;
use crate::storage::Storage;
use crate::tracking::{RequestMeta, VisitRecorder};

pub struct RedirectState {
    pub storage: Arc<dyn Storage>,
    pub recorder: Arc<VisitRecorder>,
}

/// Record the visit and serve the location handshake page
pub async fn track_and_redirect(
    State(state): State<Arc<RedirectState>>,
    Path(link_id): Path<String>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let handler_start = Instant::now();

    let link = match state.storage.get_link(&link_id).await {
        Ok(Some(link)) => link,
        Ok(None) => return (StatusCode::NOT_FOUND, "Link not found").into_response(),
        Err(err) => {
            tracing::error!(%link_id, error = %err, "failed to look up link");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response();
        }
    };

    let meta = RequestMeta::from_headers(&headers, addr.ip());
    let visit_id = match state.recorder.record_visit(&link_id, meta).await {
        Ok(Some(visit_id)) => visit_id,
        // Deleted between lookup and append
        Ok(None) => return (StatusCode::NOT_FOUND, "Link not found").into_response(),
        Err(err) => {
            tracing::error!(%link_id, error = %err, "failed to record visit");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response();
        }
    };

    tracing::debug!(
        %link_id,
        %visit_id,
        elapsed_ms = handler_start.elapsed().as_millis() as u64,
        "visit recorded"
    );

    (
        [(header::CACHE_CONTROL, "no-store")],
        Html(render_interstitial(&link.redirect_url, &link_id, &visit_id)),
    )
        .into_response()
}
