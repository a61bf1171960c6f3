use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;

use crate::storage::Storage;
use crate::tracking::VisitRecorder;

use super::handlers::{
    create_link, delete_link, get_tracking, health_check, list_links, update_location, AppState,
};

/// Routes served under `/api`
pub fn create_api_router(
    storage: Arc<dyn Storage>,
    recorder: Arc<VisitRecorder>,
    public_url: String,
) -> Router {
    let state = Arc::new(AppState {
        storage,
        recorder,
        public_url,
    });

    Router::new()
        .route("/health", get(health_check))
        .route("/create-link", post(create_link))
        .route("/links", get(list_links))
        .route("/links/{link_id}", delete(delete_link))
        .route("/tracking/{link_id}", get(get_tracking))
        .route("/update-location", post(update_location))
        .with_state(state)
}
