use crate::geo::GeoLocation;
use crate::models::{Link, LinkSummary, PreciseLocation, VisitRecord};
use crate::storage::{PatchOutcome, PatchTarget, Storage, StorageError, StorageResult};
use anyhow::Result;
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// A link and its visits, kept under one map entry so a single shard lock
/// covers the click counter and the visit sequence together
#[derive(Debug, Clone)]
struct LinkEntry {
    link: Link,
    visits: Vec<VisitRecord>,
}

/// Process-resident storage backed by a concurrent map
#[derive(Default)]
pub struct MemoryStorage {
    links: DashMap<String, LinkEntry>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn create_link(&self, link: Link) -> StorageResult<Link> {
        match self.links.entry(link.id.clone()) {
            Entry::Occupied(_) => Err(StorageError::Conflict),
            Entry::Vacant(vacant) => {
                vacant.insert(LinkEntry {
                    link: link.clone(),
                    visits: Vec::new(),
                });
                Ok(link)
            }
        }
    }

    async fn get_link(&self, link_id: &str) -> Result<Option<Link>> {
        Ok(self.links.get(link_id).map(|entry| entry.link.clone()))
    }

    async fn exists(&self, link_id: &str) -> Result<bool> {
        Ok(self.links.contains_key(link_id))
    }

    async fn list_links(&self) -> Result<Vec<LinkSummary>> {
        let mut summaries: Vec<LinkSummary> = self
            .links
            .iter()
            .map(|entry| LinkSummary {
                link: entry.link.clone(),
                tracking_count: entry.visits.len(),
            })
            .collect();

        summaries.sort_by(|a, b| {
            a.link
                .created_at
                .cmp(&b.link.created_at)
                .then_with(|| a.link.id.cmp(&b.link.id))
        });

        Ok(summaries)
    }

    async fn delete_link(&self, link_id: &str) -> Result<bool> {
        Ok(self.links.remove(link_id).is_some())
    }

    async fn append_visit(&self, link_id: &str, visit: VisitRecord) -> Result<bool> {
        match self.links.get_mut(link_id) {
            Some(mut entry) => {
                entry.visits.push(visit);
                entry.link.clicks += 1;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn get_visits(&self, link_id: &str) -> Result<Option<Vec<VisitRecord>>> {
        Ok(self.links.get(link_id).map(|entry| entry.visits.clone()))
    }

    async fn get_link_with_visits(
        &self,
        link_id: &str,
    ) -> Result<Option<(Link, Vec<VisitRecord>)>> {
        Ok(self
            .links
            .get(link_id)
            .map(|entry| (entry.link.clone(), entry.visits.clone())))
    }

    async fn set_visit_location(
        &self,
        link_id: &str,
        visit_id: &str,
        location: GeoLocation,
    ) -> Result<bool> {
        let Some(mut entry) = self.links.get_mut(link_id) else {
            return Ok(false);
        };

        match entry.visits.iter_mut().find(|visit| visit.id == visit_id) {
            Some(visit) => {
                visit.location = Some(location);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn patch_precise_location(
        &self,
        link_id: &str,
        tracking_id: Option<&str>,
        location: PreciseLocation,
    ) -> Result<PatchOutcome> {
        let Some(mut entry) = self.links.get_mut(link_id) else {
            return Ok(PatchOutcome::LinkNotFound);
        };

        let matched = tracking_id
            .and_then(|id| entry.visits.iter().rposition(|visit| visit.id == id));

        let (index, target) = match matched {
            Some(index) => (index, PatchTarget::TrackingId),
            None => match entry.visits.len().checked_sub(1) {
                Some(last) => (last, PatchTarget::Latest),
                None => return Ok(PatchOutcome::NoVisits),
            },
        };

        let visit = &mut entry.visits[index];
        visit.precise_location = Some(location);

        Ok(PatchOutcome::Patched {
            visit_id: visit.id.clone(),
            target,
        })
    }
}
