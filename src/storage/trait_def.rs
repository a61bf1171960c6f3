use crate::geo::GeoLocation;
use crate::models::{Link, LinkSummary, PreciseLocation, VisitRecord};
use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("link id already exists")]
    Conflict,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// How a precise-location submission found its visit record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchTarget {
    /// The submitted tracking id matched a visit
    TrackingId,
    /// No visit matched, so the most recent one was used
    Latest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchOutcome {
    Patched { visit_id: String, target: PatchTarget },
    /// The link exists but has no visits yet
    NoVisits,
    LinkNotFound,
}

#[async_trait]
pub trait Storage: Send + Sync {
    /// Store a new link; fails with `Conflict` if the id is taken
    async fn create_link(&self, link: Link) -> StorageResult<Link>;

    async fn get_link(&self, link_id: &str) -> Result<Option<Link>>;

    async fn exists(&self, link_id: &str) -> Result<bool>;

    /// All links with their visit counts, oldest first
    async fn list_links(&self) -> Result<Vec<LinkSummary>>;

    /// Remove a link together with every visit recorded for it
    async fn delete_link(&self, link_id: &str) -> Result<bool>;

    /// Append a visit and bump the link's click counter in one write
    ///
    /// Returns false if the link no longer exists.
    async fn append_visit(&self, link_id: &str, visit: VisitRecord) -> Result<bool>;

    /// Visits for a link in insertion order, or None for an unknown link
    async fn get_visits(&self, link_id: &str) -> Result<Option<Vec<VisitRecord>>>;

    /// A link and its visits read together, so `clicks` matches the visit count
    async fn get_link_with_visits(
        &self,
        link_id: &str,
    ) -> Result<Option<(Link, Vec<VisitRecord>)>>;

    /// Attach an IP-derived location to a recorded visit
    ///
    /// Returns false if the link or the visit is gone.
    async fn set_visit_location(
        &self,
        link_id: &str,
        visit_id: &str,
        location: GeoLocation,
    ) -> Result<bool>;

    /// Overwrite the precise location of the visit matching `tracking_id`,
    /// or of the latest visit when nothing matches
    async fn patch_precise_location(
        &self,
        link_id: &str,
        tracking_id: Option<&str>,
        location: PreciseLocation,
    ) -> Result<PatchOutcome>;
}
