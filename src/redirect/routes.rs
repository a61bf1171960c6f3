use axum::{routing::get, Router};
use std::sync::Arc;

use crate::storage::Storage;
use crate::tracking::VisitRecorder;

use super::handlers::{track_and_redirect, RedirectState};

pub fn create_redirect_router(storage: Arc<dyn Storage>, recorder: Arc<VisitRecorder>) -> Router {
    let state = Arc::new(RedirectState { storage, recorder });

    Router::new()
        .route("/t/{link_id}", get(track_and_redirect))
        .with_state(state)
}
