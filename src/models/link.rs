use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    pub id: String,
    pub redirect_url: String,
    #[serde(default)]
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub clicks: u64,
    pub tracking_link: String,
}

impl Link {
    pub fn new(id: String, redirect_url: String, description: String, tracking_link: String) -> Self {
        Self {
            id,
            redirect_url,
            description,
            created_at: Utc::now(),
            clicks: 0,
            tracking_link,
        }
    }
}

/// Link as shown in listings, with the number of recorded visits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkSummary {
    #[serde(flatten)]
    pub link: Link,
    pub tracking_count: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLinkRequest {
    pub redirect_url: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLinkResponse {
    pub link_id: String,
    pub tracking_link: String,
    pub redirect_url: String,
}
