//! Shared in-memory collaborators for the integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use dream_daemon::catalog::{CatalogClient, CatalogError, ItemQuery};
use dream_daemon::images::ImageFetcher;
use dream_daemon::prefs::PreferenceSource;
use dream_proto::protocol::{Image, ImageType, ItemKind, MediaItem};

pub fn movie(id: &str, backdrops: &[&str], logo: Option<&str>) -> MediaItem {
    let mut item = MediaItem {
        id: id.into(),
        name: format!("Movie {}", id),
        kind: ItemKind::Movie,
        backdrop_image_tags: backdrops.iter().map(|t| t.to_string()).collect(),
        ..Default::default()
    };
    if let Some(logo) = logo {
        item.image_tags.insert(ImageType::Logo, logo.into());
    }
    item
}

pub fn track(id: &str) -> MediaItem {
    MediaItem {
        id: id.into(),
        name: format!("Track {}", id),
        kind: ItemKind::Audio,
        ..Default::default()
    }
}

/// Always answers with the same item list.
pub struct StaticCatalog {
    items: Vec<MediaItem>,
    pub queries: Mutex<Vec<ItemQuery>>,
}

impl StaticCatalog {
    pub fn new(items: Vec<MediaItem>) -> Self {
        Self {
            items,
            queries: Mutex::new(Vec::new()),
        }
    }
}

impl CatalogClient for StaticCatalog {
    async fn query(&self, query: &ItemQuery) -> Result<Vec<MediaItem>, CatalogError> {
        self.queries.lock().unwrap().push(query.clone());
        Ok(self.items.clone())
    }

    async fn item(&self, item_id: &str) -> Result<MediaItem, CatalogError> {
        self.items
            .iter()
            .find(|i| i.id == item_id)
            .cloned()
            .ok_or(CatalogError::Status(reqwest::StatusCode::NOT_FOUND))
    }

    fn image_url(
        &self,
        item_id: &str,
        image_type: ImageType,
        _index: Option<usize>,
        tag: &str,
        _max_width: Option<u32>,
    ) -> String {
        format!("mem://{}/{}/{}", item_id, image_type.as_str(), tag)
    }
}

/// Every URL decodes to a tiny bitmap tagged with its URL.
pub struct MemoryImages;

impl ImageFetcher for MemoryImages {
    async fn fetch(&self, url: &str) -> Option<Image> {
        Some(Image {
            source_url: url.to_string(),
            width: 1,
            height: 1,
            pixels: Arc::from(vec![255u8; 4]),
        })
    }
}

pub struct Unrestricted;

impl PreferenceSource for Unrestricted {
    fn require_rating(&self) -> bool {
        false
    }

    fn max_rating(&self) -> i32 {
        -1
    }
}
