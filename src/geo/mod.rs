//! Visitor IP geolocation
//!
//! Resolves visitor addresses through public lookup services, with a
//! fallback provider and a short-lived cache in front of them.

pub mod ip_extractor;
pub mod models;
pub mod provider;
pub mod resolver;

pub use ip_extractor::{extract_client_ip, normalize_ip};
pub use models::{GeoLocation, LATITUDE_OFFSET, LONGITUDE_OFFSET};
pub use provider::{GeoError, GeoProvider, IpApiCoProvider, IpApiComProvider};
pub use resolver::GeoResolver;
