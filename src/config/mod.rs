use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    /// Externally reachable base URL used to build tracking links
    pub public_url: String,
    pub geo: GeoConfig,
    pub visits: VisitConfig,
    pub frontend: FrontendConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoConfig {
    pub primary_url: String,
    pub fallback_url: String,
    pub timeout_ms: u64,
    pub cache_ttl_secs: u64,
    pub cache_max_entries: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitConfig {
    /// Upper bound on concurrently running IP lookups
    pub max_in_flight_lookups: usize,
    /// How long shutdown waits for pending lookups to settle
    pub shutdown_grace_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontendConfig {
    /// Path to directory containing a built dashboard
    /// If None, only the API and tracking routes are served
    pub static_dir: Option<String>,
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            primary_url: "https://ipapi.co".to_string(),
            fallback_url: "http://ip-api.com".to_string(),
            timeout_ms: 5_000,
            cache_ttl_secs: 600,
            cache_max_entries: 10_000,
        }
    }
}

impl Default for VisitConfig {
    fn default() -> Self {
        Self {
            max_in_flight_lookups: 1024,
            shutdown_grace_secs: 5,
        }
    }
}

fn env_or<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{name} has an invalid value '{raw}'")),
        None => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from a variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = env_or(&lookup, "PORT", 3001u16)?;

        let public_url = lookup("PUBLIC_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| format!("http://localhost:{port}"));
        let public_url = public_url.trim().trim_end_matches('/').to_string();

        let geo_defaults = GeoConfig::default();
        let geo = GeoConfig {
            primary_url: lookup("GEO_PRIMARY_URL").unwrap_or(geo_defaults.primary_url),
            fallback_url: lookup("GEO_FALLBACK_URL").unwrap_or(geo_defaults.fallback_url),
            timeout_ms: env_or(&lookup, "GEO_TIMEOUT_MS", geo_defaults.timeout_ms)?,
            cache_ttl_secs: env_or(&lookup, "GEO_CACHE_TTL_SECS", geo_defaults.cache_ttl_secs)?,
            cache_max_entries: env_or(
                &lookup,
                "GEO_CACHE_MAX_ENTRIES",
                geo_defaults.cache_max_entries,
            )?,
        };

        let visit_defaults = VisitConfig::default();
        let max_in_flight_lookups = env_or(
            &lookup,
            "MAX_IN_FLIGHT_LOOKUPS",
            visit_defaults.max_in_flight_lookups,
        )?;
        if max_in_flight_lookups == 0 {
            tracing::warn!("MAX_IN_FLIGHT_LOOKUPS=0 disables IP geolocation for every visit");
        }

        let visits = VisitConfig {
            max_in_flight_lookups,
            shutdown_grace_secs: env_or(
                &lookup,
                "SHUTDOWN_GRACE_SECS",
                visit_defaults.shutdown_grace_secs,
            )?,
        };

        Ok(Config {
            server: ServerConfig { host, port },
            public_url,
            geo,
            visits,
            frontend: FrontendConfig {
                static_dir: lookup("FRONTEND_STATIC_DIR"),
            },
        })
    }
}

/// Tracking link advertised to users for a given link id
pub fn tracking_link(public_url: &str, link_id: &str) -> String {
    format!("{}/t/{}", public_url.trim_end_matches('/'), link_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_tracking_link_trims_trailing_slash() {
        assert_eq!(
            tracking_link("https://track.example/", "abc"),
            "https://track.example/t/abc"
        );
        assert_eq!(
            tracking_link("http://localhost:3001", "abc"),
            "http://localhost:3001/t/abc"
        );
    }

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_env_or_falls_back_when_unset() {
        let value: u64 = env_or(&vars(&[]), "GEO_TIMEOUT_MS", 42).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_defaults_without_variables() {
        let config = Config::from_lookup(vars(&[])).unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.public_url, "http://localhost:3001");
        assert_eq!(config.geo.primary_url, "https://ipapi.co");
        assert_eq!(config.geo.fallback_url, "http://ip-api.com");
        assert_eq!(config.geo.timeout_ms, 5_000);
        assert_eq!(config.geo.cache_ttl_secs, 600);
        assert_eq!(config.geo.cache_max_entries, 10_000);
        assert_eq!(config.visits.max_in_flight_lookups, 1024);
        assert_eq!(config.visits.shutdown_grace_secs, 5);
        assert!(config.frontend.static_dir.is_none());
    }

    #[test]
    fn test_public_url_defaults_to_configured_port() {
        let config = Config::from_lookup(vars(&[("PORT", "8080")])).unwrap();
        assert_eq!(config.public_url, "http://localhost:8080");

        let config = Config::from_lookup(vars(&[("PORT", "8080"), ("PUBLIC_URL", "  ")])).unwrap();
        assert_eq!(config.public_url, "http://localhost:8080");
    }

    #[test]
    fn test_public_url_trailing_slash_trimmed() {
        let config =
            Config::from_lookup(vars(&[("PUBLIC_URL", "https://track.example/")])).unwrap();
        assert_eq!(config.public_url, "https://track.example");
    }

    #[test]
    fn test_invalid_number_is_an_error() {
        let err = Config::from_lookup(vars(&[("PORT", "abc")])).unwrap_err();
        assert_eq!(err.to_string(), "PORT has an invalid value 'abc'");

        let err = Config::from_lookup(vars(&[("GEO_TIMEOUT_MS", "-5")])).unwrap_err();
        assert_eq!(err.to_string(), "GEO_TIMEOUT_MS has an invalid value '-5'");
    }

    #[test]
    fn test_overrides_are_read() {
        let config = Config::from_lookup(vars(&[
            ("HOST", "127.0.0.1"),
            ("GEO_PRIMARY_URL", "http://127.0.0.1:9000/co"),
            ("MAX_IN_FLIGHT_LOOKUPS", " 16 "),
            ("FRONTEND_STATIC_DIR", "dist"),
        ]))
        .unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.geo.primary_url, "http://127.0.0.1:9000/co");
        assert_eq!(config.visits.max_in_flight_lookups, 16);
        assert_eq!(config.frontend.static_dir.as_deref(), Some("dist"));
    }
}
