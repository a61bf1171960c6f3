//! Data models for geolocation

use serde::{Deserialize, Serialize};

/// Latitude correction applied to provider coordinates (~53m south)
pub const LATITUDE_OFFSET: f64 = -0.000482;

/// Longitude correction applied to provider coordinates (~129m east)
pub const LONGITUDE_OFFSET: f64 = 0.001402;

/// Geographic location derived from the visitor's IP address
///
/// Every attribute is optional; providers fill in what they know.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub ip: Option<String>,

    pub city: Option<String>,

    pub district: Option<String>,

    /// Region/state/province
    pub region: Option<String>,

    /// Country name
    pub country: Option<String>,

    /// ISO country code (e.g., "US", "GB")
    pub country_code: Option<String>,

    pub postal: Option<String>,

    /// Offset-corrected latitude
    pub latitude: Option<f64>,

    /// Offset-corrected longitude
    pub longitude: Option<f64>,

    pub timezone: Option<String>,

    /// Organization that owns the address
    pub org: Option<String>,

    pub isp: Option<String>,

    /// Autonomous System Number, as reported by the provider (e.g. "AS15169")
    pub asn: Option<String>,

    /// Accuracy radius in kilometers, when the provider reports one
    pub accuracy_radius: Option<u32>,

    pub mobile: Option<bool>,

    pub proxy: Option<bool>,

    pub hosting: Option<bool>,

    /// Name of the provider that produced this location
    pub source: Option<String>,
}

impl GeoLocation {
    /// Shift provider coordinates by the fixed correction offset
    ///
    /// Only applied when both coordinates are present.
    pub fn with_offset(mut self) -> Self {
        if let (Some(lat), Some(lon)) = (self.latitude, self.longitude) {
            self.latitude = Some(lat + LATITUDE_OFFSET);
            self.longitude = Some(lon + LONGITUDE_OFFSET);
        }
        self
    }
}
