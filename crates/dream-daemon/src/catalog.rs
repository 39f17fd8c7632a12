//! Remote catalog access.
//!
//! The sampler only sees [`CatalogClient`]; [`HttpCatalogClient`] talks to a
//! Jellyfin/Emby server over its REST API (`/Users/{id}/Items`), sending the
//! access token in the `X-Emby-Token` header.
use std::future::Future;
use std::time::Duration;

use dream_proto::config::ServerConfig;
use dream_proto::protocol::{ImageType, ItemKind, MediaItem};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use tracing::debug;

use crate::prefs::RatingFilter;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("catalog returned {0}")]
    Status(StatusCode),
    #[error("invalid server url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Item query, mirroring the server's query-string parameters.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ItemQuery {
    pub include_item_types: Vec<ItemKind>,
    pub recursive: bool,
    pub sort_random: bool,
    pub limit: Option<u32>,
    pub image_types: Vec<ImageType>,
    pub max_official_rating: Option<String>,
    pub has_parental_rating: Option<bool>,
}

impl ItemQuery {
    /// Random movies/series that carry a backdrop, filtered by rating.
    pub fn showcase(filter: &RatingFilter, limit: u32) -> Self {
        Self {
            include_item_types: vec![ItemKind::Movie, ItemKind::Series],
            recursive: true,
            sort_random: true,
            limit: Some(limit),
            image_types: vec![ImageType::Backdrop],
            max_official_rating: filter.max_official_rating(),
            has_parental_rating: filter.has_parental_rating(),
        }
    }

    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if !self.include_item_types.is_empty() {
            let kinds: Vec<&str> = self.include_item_types.iter().map(|k| k.as_str()).collect();
            params.push(("IncludeItemTypes", kinds.join(",")));
        }
        if self.recursive {
            params.push(("Recursive", "true".to_string()));
        }
        if self.sort_random {
            params.push(("SortBy", "Random".to_string()));
        }
        if let Some(limit) = self.limit {
            params.push(("Limit", limit.to_string()));
        }
        if !self.image_types.is_empty() {
            let types: Vec<&str> = self.image_types.iter().map(|t| t.as_str()).collect();
            params.push(("ImageTypes", types.join(",")));
        }
        if let Some(max) = &self.max_official_rating {
            params.push(("MaxOfficialRating", max.clone()));
        }
        if let Some(has) = self.has_parental_rating {
            params.push(("HasParentalRating", has.to_string()));
        }
        params
    }
}

pub trait CatalogClient: Send + Sync + 'static {
    fn query(
        &self,
        query: &ItemQuery,
    ) -> impl Future<Output = Result<Vec<MediaItem>, CatalogError>> + Send;

    fn item(&self, item_id: &str) -> impl Future<Output = Result<MediaItem, CatalogError>> + Send;

    /// URL of one image of an item.  `index` selects among multiple
    /// backdrops; the tag pins the version so caches invalidate on change.
    fn image_url(
        &self,
        item_id: &str,
        image_type: ImageType,
        index: Option<usize>,
        tag: &str,
        max_width: Option<u32>,
    ) -> String;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ItemsResult {
    #[serde(default)]
    items: Vec<MediaItem>,
}

pub struct HttpCatalogClient {
    client: Client,
    base_url: Url,
    user_id: String,
    access_token: String,
}

impl HttpCatalogClient {
    pub fn new(config: &ServerConfig) -> Result<Self, CatalogError> {
        let base_url = parse_base_url(&config.url)?;
        let client = Client::builder()
            .user_agent(format!("{}/{}", config.device_name, env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(20))
            .build()?;

        Ok(Self {
            client,
            base_url,
            user_id: config.user_id.clone(),
            access_token: config.access_token.clone(),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        with_segments(&self.base_url, segments)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: Url,
        params: &[(&'static str, String)],
    ) -> Result<T, CatalogError> {
        let response = self
            .client
            .get(url)
            .header("X-Emby-Token", &self.access_token)
            .header("Accept", "application/json")
            .query(params)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CatalogError::Status(response.status()));
        }

        Ok(response.json().await?)
    }
}

impl CatalogClient for HttpCatalogClient {
    async fn query(&self, query: &ItemQuery) -> Result<Vec<MediaItem>, CatalogError> {
        let url = self.endpoint(&["Users", &self.user_id, "Items"]);
        let params = query.to_params();
        debug!("catalog query {} {:?}", url, params);
        let result: ItemsResult = self.get_json(url, &params).await?;
        Ok(result.items)
    }

    async fn item(&self, item_id: &str) -> Result<MediaItem, CatalogError> {
        let url = self.endpoint(&["Users", &self.user_id, "Items", item_id]);
        self.get_json(url, &[]).await
    }

    fn image_url(
        &self,
        item_id: &str,
        image_type: ImageType,
        index: Option<usize>,
        tag: &str,
        max_width: Option<u32>,
    ) -> String {
        build_image_url(&self.base_url, item_id, image_type, index, tag, max_width)
    }
}

fn parse_base_url(raw: &str) -> Result<Url, CatalogError> {
    let url = Url::parse(raw).map_err(|e| CatalogError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(CatalogError::InvalidUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme {}", url.scheme()),
        });
    }
    Ok(url)
}

/// `base` with `segments` appended to its path, each one percent-encoded.
/// Any query or fragment on the base is dropped.
fn with_segments(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    url.set_query(None);
    url.set_fragment(None);
    // http(s) URLs always have a path; parse_base_url rejects anything else.
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}

pub fn build_image_url(
    base_url: &Url,
    item_id: &str,
    image_type: ImageType,
    index: Option<usize>,
    tag: &str,
    max_width: Option<u32>,
) -> String {
    let index = index.map(|i| i.to_string());
    let mut segments = vec!["Items", item_id, "Images", image_type.as_str()];
    if let Some(index) = &index {
        segments.push(index.as_str());
    }
    let mut url = with_segments(base_url, &segments);
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("tag", tag);
        if let Some(width) = max_width {
            query.append_pair("maxWidth", &width.to_string());
        }
    }
    url.into()
}
