//! Docker Hub 官方镜像查询（只读）

use std::time::Duration;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;
use crate::utils::{DockwatchError, Result};

pub const DOCKER_HUB_URL: &str = "https://hub.docker.com";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HubRepository {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub star_count: u64,
    #[serde(default)]
    pub pull_count: u64,
    #[serde(default)]
    pub last_updated: Option<String>,
}

impl HubRepository {
    pub fn last_updated_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.last_updated.as_deref()
            .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
            .map(|d| d.with_timezone(&chrono::Utc))
    }
}

pub struct HubClient {
    http: reqwest::blocking::Client,
    base_url: String,
}

impl HubClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(DOCKER_HUB_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .use_rustls_tls()
            .user_agent(concat!("dockwatch/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| DockwatchError::Hub(format!("cannot build HTTP client: {}", e)))?;

        Ok(HubClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// `library/{name}`；不存在返回 `None`
    pub fn search(&self, name: &str) -> Result<Option<HubRepository>> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(None);
        }

        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| DockwatchError::Hub(format!("invalid base url: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| DockwatchError::Hub("base url cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(["v2", "repositories", "library", name, ""]);

        debug!(%url, "querying Docker Hub");
        let response = self.http.get(url).send()
            .map_err(|e| DockwatchError::Hub(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => response.json::<HubRepository>()
                .map(Some)
                .map_err(|e| DockwatchError::Hub(format!("unexpected response: {}", e))),
            s => Err(DockwatchError::Hub(format!("Docker Hub returned {}", s))),
        }
    }
}
