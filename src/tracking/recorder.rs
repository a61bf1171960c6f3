use axum::http::{header, HeaderMap};
use chrono::Utc;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::geo::{extract_client_ip, GeoResolver};
use crate::models::{generate_visit_id, RequestHeaders, VisitRecord, DIRECT_REFERER};
use crate::storage::Storage;
use crate::tracking::in_flight::{InFlightLookups, PendingLookup};

/// Request metadata captured for a visit
#[derive(Debug, Clone)]
pub struct RequestMeta {
    pub ip: IpAddr,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    pub accept_language: Option<String>,
    pub accept_encoding: Option<String>,
}

/// Header value as text; None only when the header is absent
fn header_value(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
}

impl RequestMeta {
    pub fn from_headers(headers: &HeaderMap, socket_ip: IpAddr) -> Self {
        Self {
            ip: extract_client_ip(headers, socket_ip),
            user_agent: header_value(headers, header::USER_AGENT),
            referer: header_value(headers, header::REFERER),
            accept_language: header_value(headers, header::ACCEPT_LANGUAGE),
            accept_encoding: header_value(headers, header::ACCEPT_ENCODING),
        }
    }

    fn into_visit(self, visit_id: String) -> VisitRecord {
        VisitRecord {
            id: visit_id,
            timestamp: Utc::now(),
            ip: self.ip.to_string(),
            user_agent: self.user_agent,
            referer: self
                .referer
                .filter(|r| !r.is_empty())
                .unwrap_or_else(|| DIRECT_REFERER.to_string()),
            headers: RequestHeaders {
                accept_language: self.accept_language,
                accept_encoding: self.accept_encoding,
            },
            location: None,
            precise_location: None,
        }
    }
}

/// Records visits and resolves their IP location in the background
///
/// A visit is appended as soon as the hit arrives, so a redirected visitor is
/// always visible in the store. The IP lookup runs as a tracked task that
/// fills in `location` once it settles; the HTTP response never waits on it.
pub struct VisitRecorder {
    storage: Arc<dyn Storage>,
    resolver: Arc<GeoResolver>,
    in_flight: Arc<InFlightLookups>,
}

impl VisitRecorder {
    pub fn new(
        storage: Arc<dyn Storage>,
        resolver: Arc<GeoResolver>,
        max_in_flight_lookups: usize,
    ) -> Self {
        Self {
            storage,
            resolver,
            in_flight: InFlightLookups::new(max_in_flight_lookups),
        }
    }

    /// Record a hit on a link
    ///
    /// Returns the new visit id, or None if the link does not exist.
    pub async fn record_visit(
        &self,
        link_id: &str,
        meta: RequestMeta,
    ) -> anyhow::Result<Option<String>> {
        let visit_id = generate_visit_id();
        let ip = meta.ip;

        if !self
            .storage
            .append_visit(link_id, meta.into_visit(visit_id.clone()))
            .await?
        {
            return Ok(None);
        }

        match self.in_flight.try_register(link_id, &visit_id) {
            Some(pending) => self.spawn_lookup(link_id.to_string(), visit_id.clone(), ip, pending),
            None => {
                warn!(%link_id, %visit_id, "too many pending IP lookups, visit stored without location");
            }
        }

        Ok(Some(visit_id))
    }

    fn spawn_lookup(&self, link_id: String, visit_id: String, ip: IpAddr, pending: PendingLookup) {
        let storage = Arc::clone(&self.storage);
        let resolver = Arc::clone(&self.resolver);

        tokio::spawn(async move {
            let PendingLookup {
                guard,
                mut cancelled,
            } = pending;

            tokio::select! {
                _ = &mut cancelled => {
                    debug!(%link_id, %visit_id, "IP lookup cancelled");
                }
                location = resolver.resolve(ip) => {
                    match location {
                        Some(location) => {
                            match storage.set_visit_location(&link_id, &visit_id, location).await {
                                Ok(true) => debug!(%link_id, %visit_id, "visit location stored"),
                                Ok(false) => debug!(%link_id, %visit_id, "visit no longer exists, dropping location"),
                                Err(err) => error!(%link_id, %visit_id, error = %err, "failed to store visit location"),
                            }
                        }
                        None => debug!(%link_id, %visit_id, %ip, "no IP location available"),
                    }
                }
            }

            drop(guard);
        });
    }

    /// Cancel the pending lookups of a deleted link
    pub fn cancel_pending(&self, link_id: &str) -> usize {
        self.in_flight.cancel_link(link_id)
    }

    pub fn pending_lookups(&self) -> usize {
        self.in_flight.pending()
    }

    /// Wait for pending lookups to settle, up to `grace`
    pub async fn drain(&self, grace: Duration) -> bool {
        self.in_flight.wait_idle(grace).await
    }
}
