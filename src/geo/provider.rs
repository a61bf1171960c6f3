//! Upstream IP geolocation providers
//!
//! Each provider speaks its own JSON layout and normalizes it into
//! [`GeoLocation`]. Coordinates are returned raw; the resolver applies
//! the correction offset.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::net::IpAddr;
use std::time::Duration;
use thiserror::Error;

use crate::geo::models::GeoLocation;

/// Field mask requested from ip-api.com (every field the free tier offers)
const IP_API_COM_FIELDS: u32 = 66846719;

#[derive(Debug, Error)]
pub enum GeoError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("provider responded with status {0}")]
    Status(u16),
    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("provider rejected lookup: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait GeoProvider: Send + Sync {
    /// Short name recorded as the location's source
    fn name(&self) -> &'static str;

    async fn lookup(&self, ip: IpAddr) -> Result<GeoLocation, GeoError>;
}

/// Build the HTTP client shared by the providers
pub fn build_http_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(concat!("pinpoint/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()
}

async fn fetch_json<T: DeserializeOwned>(client: &Client, url: &str) -> Result<T, GeoError> {
    let response = client.get(url).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(GeoError::Status(status.as_u16()));
    }

    let body = response.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Primary provider: ipapi.co
pub struct IpApiCoProvider {
    client: Client,
    base_url: String,
}

impl IpApiCoProvider {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct IpApiCoResponse {
    #[serde(default)]
    error: bool,
    reason: Option<String>,
    ip: Option<String>,
    city: Option<String>,
    region: Option<String>,
    country_name: Option<String>,
    country_code: Option<String>,
    postal: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    timezone: Option<String>,
    org: Option<String>,
    asn: Option<String>,
    accuracy_radius: Option<u32>,
}

#[async_trait]
impl GeoProvider for IpApiCoProvider {
    fn name(&self) -> &'static str {
        "ipapi.co"
    }

    async fn lookup(&self, ip: IpAddr) -> Result<GeoLocation, GeoError> {
        let url = format!("{}/{}/json/", self.base_url, ip);
        let data: IpApiCoResponse = fetch_json(&self.client, &url).await?;

        if data.error {
            return Err(GeoError::Rejected(
                data.reason.unwrap_or_else(|| "unspecified error".to_string()),
            ));
        }

        Ok(GeoLocation {
            ip: data.ip,
            city: non_empty(data.city),
            district: None,
            region: non_empty(data.region),
            country: non_empty(data.country_name),
            country_code: non_empty(data.country_code),
            postal: non_empty(data.postal),
            latitude: data.latitude,
            longitude: data.longitude,
            timezone: non_empty(data.timezone),
            org: non_empty(data.org),
            isp: None,
            asn: non_empty(data.asn),
            accuracy_radius: data.accuracy_radius,
            mobile: None,
            proxy: None,
            hosting: None,
            source: Some(self.name().to_string()),
        })
    }
}

/// Fallback provider: ip-api.com
pub struct IpApiComProvider {
    client: Client,
    base_url: String,
}

impl IpApiComProvider {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IpApiComResponse {
    status: Option<String>,
    message: Option<String>,
    query: Option<String>,
    city: Option<String>,
    district: Option<String>,
    region_name: Option<String>,
    country: Option<String>,
    country_code: Option<String>,
    zip: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
    timezone: Option<String>,
    isp: Option<String>,
    org: Option<String>,
    #[serde(rename = "as")]
    asn: Option<String>,
    mobile: Option<bool>,
    proxy: Option<bool>,
    hosting: Option<bool>,
}

#[async_trait]
impl GeoProvider for IpApiComProvider {
    fn name(&self) -> &'static str {
        "ip-api.com"
    }

    async fn lookup(&self, ip: IpAddr) -> Result<GeoLocation, GeoError> {
        let url = format!(
            "{}/json/{}?fields={}",
            self.base_url, ip, IP_API_COM_FIELDS
        );
        let data: IpApiComResponse = fetch_json(&self.client, &url).await?;

        if data.status.as_deref() == Some("fail") {
            return Err(GeoError::Rejected(
                data.message.unwrap_or_else(|| "unspecified error".to_string()),
            ));
        }

        let isp = non_empty(data.isp);

        Ok(GeoLocation {
            ip: data.query,
            city: non_empty(data.city),
            district: non_empty(data.district),
            region: non_empty(data.region_name),
            country: non_empty(data.country),
            country_code: non_empty(data.country_code),
            postal: non_empty(data.zip),
            latitude: data.lat,
            longitude: data.lon,
            timezone: non_empty(data.timezone),
            org: non_empty(data.org).or_else(|| isp.clone()),
            isp,
            asn: non_empty(data.asn),
            accuracy_radius: None,
            mobile: data.mobile,
            proxy: data.proxy,
            hosting: data.hosting,
            source: Some(self.name().to_string()),
        })
    }
}
