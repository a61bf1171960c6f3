use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::tracking_link;
use crate::models::{
    generate_link_id, CreateLinkRequest, CreateLinkResponse, Link, LinkSummary,
    UpdateLocationRequest, VisitRecord,
};
use crate::storage::{PatchOutcome, PatchTarget, Storage, StorageError};
use crate::tracking::VisitRecorder;

/// Attempts at drawing an unused link id before giving up
const MAX_ID_ATTEMPTS: usize = 10;

pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub recorder: Arc<VisitRecorder>,
    pub public_url: String,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Serialize, Deserialize)]
pub struct TrackingResponse {
    pub link: Link,
    pub tracking: Vec<VisitRecord>,
}

/// Result of a precise-location submission
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLocationResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracking_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_by: Option<PatchTarget>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error(status: StatusCode, message: &str) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
}

fn link_not_found() -> ApiError {
    error(StatusCode::NOT_FOUND, "Link not found")
}

fn internal_error(context: &str, err: impl std::fmt::Display) -> ApiError {
    tracing::error!(error = %err, "{context}");
    error(StatusCode::INTERNAL_SERVER_ERROR, context)
}

/// Create a new tracking link
pub async fn create_link(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateLinkRequest>,
) -> Result<Json<CreateLinkResponse>, ApiError> {
    let redirect_url = match payload.redirect_url.as_deref().map(str::trim) {
        Some(url) if !url.is_empty() => url.to_string(),
        _ => return Err(error(StatusCode::BAD_REQUEST, "Redirect URL is required")),
    };
    let description = payload.description.unwrap_or_default();

    for _ in 0..MAX_ID_ATTEMPTS {
        let link_id = generate_link_id();
        let link = Link::new(
            link_id.clone(),
            redirect_url.clone(),
            description.clone(),
            tracking_link(&state.public_url, &link_id),
        );

        match state.storage.create_link(link).await {
            Ok(link) => {
                tracing::info!(link_id = %link.id, redirect_url = %link.redirect_url, "link created");
                return Ok(Json(CreateLinkResponse {
                    link_id: link.id,
                    tracking_link: link.tracking_link,
                    redirect_url: link.redirect_url,
                }));
            }
            Err(StorageError::Conflict) => continue,
            Err(StorageError::Other(err)) => {
                return Err(internal_error("Failed to create link", err));
            }
        }
    }

    Err(error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Failed to generate unique link id",
    ))
}

/// List all links with their visit counts
pub async fn list_links(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<LinkSummary>>, ApiError> {
    state
        .storage
        .list_links()
        .await
        .map(Json)
        .map_err(|e| internal_error("Failed to list links", e))
}

/// Get a link together with its recorded visits
pub async fn get_tracking(
    State(state): State<Arc<AppState>>,
    Path(link_id): Path<String>,
) -> Result<Json<TrackingResponse>, ApiError> {
    let (link, tracking) = state
        .storage
        .get_link_with_visits(&link_id)
        .await
        .map_err(|e| internal_error("Failed to get tracking data", e))?
        .ok_or_else(link_not_found)?;

    Ok(Json(TrackingResponse { link, tracking }))
}

/// Delete a link and everything recorded for it
pub async fn delete_link(
    State(state): State<Arc<AppState>>,
    Path(link_id): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let deleted = state
        .storage
        .delete_link(&link_id)
        .await
        .map_err(|e| internal_error("Failed to delete link", e))?;

    if !deleted {
        return Err(link_not_found());
    }

    let cancelled = state.recorder.cancel_pending(&link_id);
    tracing::info!(%link_id, cancelled_lookups = cancelled, "link deleted");

    Ok(Json(SuccessResponse { success: true }))
}

/// Attach browser-reported coordinates to a visit
pub async fn update_location(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<UpdateLocationRequest>,
) -> Result<Json<UpdateLocationResponse>, ApiError> {
    let outcome = state
        .storage
        .patch_precise_location(
            &payload.link_id,
            payload.tracking_id.as_deref(),
            payload.to_precise_location(),
        )
        .await
        .map_err(|e| internal_error("Failed to update location", e))?;

    match outcome {
        PatchOutcome::LinkNotFound => Err(link_not_found()),
        PatchOutcome::NoVisits => {
            tracing::debug!(link_id = %payload.link_id, "precise location for link without visits ignored");
            Ok(Json(UpdateLocationResponse {
                success: true,
                tracking_id: None,
                matched_by: None,
            }))
        }
        PatchOutcome::Patched { visit_id, target } => {
            if target == PatchTarget::Latest {
                tracing::warn!(
                    link_id = %payload.link_id,
                    submitted = ?payload.tracking_id,
                    patched = %visit_id,
                    "tracking id did not match a visit, patched the latest one"
                );
            } else {
                tracing::debug!(link_id = %payload.link_id, %visit_id, "precise location stored");
            }

            Ok(Json(UpdateLocationResponse {
                success: true,
                tracking_id: Some(visit_id),
                matched_by: Some(target),
            }))
        }
    }
}

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}
