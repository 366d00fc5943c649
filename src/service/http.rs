use super::{AnnotationService, TileRequest};
use crate::data::annotation::{Mutation, TileDataMap};
use crate::Result;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use std::time::Duration;

/// Shared async HTTP client for annotation traffic
static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .user_agent(concat!("annotile/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(30))
        .tcp_keepalive(Duration::from_secs(30))
        .pool_idle_timeout(Duration::from_secs(90))
        .build()
        .unwrap_or_else(|e| {
            log::warn!("falling back to default HTTP client: {}", e);
            reqwest::Client::new()
        })
});

/// Annotation service reached over JSON/HTTP.
///
/// Tile requests are POSTed to `{base}/{layer}/tiles` and mutations to
/// `{base}/{layer}/annotations`.
#[derive(Debug, Clone)]
pub struct HttpAnnotationService {
    base_url: String,
    layer: String,
}

impl HttpAnnotationService {
    pub fn new(base_url: impl Into<String>, layer: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            layer: layer.into(),
        }
    }

    pub fn tiles_url(&self) -> String {
        format!("{}/{}/tiles", self.base_url, self.layer)
    }

    pub fn annotations_url(&self) -> String {
        format!("{}/{}/annotations", self.base_url, self.layer)
    }
}

#[async_trait]
impl AnnotationService for HttpAnnotationService {
    async fn fetch_tiles(&self, request: TileRequest) -> Result<TileDataMap> {
        log::debug!("POST {} ({} tiles)", self.tiles_url(), request.len());
        let response = HTTP_CLIENT
            .post(self.tiles_url())
            .json(&request)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json::<TileDataMap>().await?)
    }

    async fn submit(&self, mutation: Mutation) -> Result<()> {
        log::debug!("POST {} ({})", self.annotations_url(), mutation.kind());
        HTTP_CLIENT
            .post(self.annotations_url())
            .json(&mutation)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
