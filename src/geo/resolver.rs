//! Geolocation resolver with an ordered provider fallback chain

use moka::future::Cache;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::GeoConfig;
use crate::geo::models::GeoLocation;
use crate::geo::provider::{build_http_client, GeoProvider, IpApiCoProvider, IpApiComProvider};

/// Resolves an IP address to a location by trying providers in order
///
/// The first provider that answers wins. Successful lookups are cached per
/// address; failures are retried on the next visit.
pub struct GeoResolver {
    providers: Vec<Arc<dyn GeoProvider>>,
    cache: Cache<IpAddr, GeoLocation>,
}

impl GeoResolver {
    pub fn new(
        providers: Vec<Arc<dyn GeoProvider>>,
        cache_max_entries: u64,
        cache_ttl: Duration,
    ) -> Self {
        let cache = Cache::builder()
            .max_capacity(cache_max_entries)
            .time_to_live(cache_ttl)
            .build();

        Self { providers, cache }
    }

    /// Primary ipapi.co with ip-api.com as fallback
    pub fn from_config(config: &GeoConfig) -> anyhow::Result<Self> {
        let client = build_http_client(Duration::from_millis(config.timeout_ms))?;

        let providers: Vec<Arc<dyn GeoProvider>> = vec![
            Arc::new(IpApiCoProvider::new(client.clone(), config.primary_url.as_str())),
            Arc::new(IpApiComProvider::new(client, config.fallback_url.as_str())),
        ];

        Ok(Self::new(
            providers,
            config.cache_max_entries,
            Duration::from_secs(config.cache_ttl_secs),
        ))
    }

    /// Look up an address, returning None when every provider fails
    ///
    /// The returned coordinates already carry the correction offset.
    pub async fn resolve(&self, ip: IpAddr) -> Option<GeoLocation> {
        if let Some(cached) = self.cache.get(&ip).await {
            debug!(%ip, "geolocation cache hit");
            return Some(cached);
        }

        for provider in &self.providers {
            match provider.lookup(ip).await {
                Ok(location) => {
                    debug!(%ip, provider = provider.name(), "geolocation resolved");
                    let location = location.with_offset();
                    self.cache.insert(ip, location.clone()).await;
                    return Some(location);
                }
                Err(err) => {
                    warn!(%ip, provider = provider.name(), error = %err, "geolocation lookup failed");
                }
            }
        }

        warn!(%ip, "all geolocation providers failed");
        None
    }
}
