use axum::Router;
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::api::create_api_router;
use crate::redirect::create_redirect_router;
use crate::storage::Storage;
use crate::tracking::VisitRecorder;

/// Build the full application router
///
/// API routes live under `/api`, tracking links under `/t/{link_id}`. When a
/// static directory is given, unmatched paths are served from it with
/// `index.html` as the SPA fallback.
pub fn create_app(
    storage: Arc<dyn Storage>,
    recorder: Arc<VisitRecorder>,
    public_url: &str,
    static_dir: Option<&str>,
) -> Router {
    let api_router = create_api_router(
        Arc::clone(&storage),
        Arc::clone(&recorder),
        public_url.to_string(),
    );
    let redirect_router = create_redirect_router(storage, recorder);

    let mut router = Router::new()
        .nest("/api", api_router)
        .merge(redirect_router);

    if let Some(dir) = static_dir {
        let index = Path::new(dir).join("index.html");
        router = router.fallback_service(ServeDir::new(dir).fallback(ServeFile::new(index)));
    }

    router
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
