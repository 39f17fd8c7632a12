//! In-memory collaborators for unit tests.
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use dream_proto::config::UNBOUNDED_RATING;
use dream_proto::protocol::{Image, ImageType, ItemKind, MediaItem};
use reqwest::StatusCode;
use tokio::time::Instant;

use crate::catalog::{CatalogClient, CatalogError, ItemQuery};
use crate::images::ImageFetcher;
use crate::prefs::PreferenceSource;

pub fn unavailable() -> CatalogError {
    CatalogError::Status(StatusCode::SERVICE_UNAVAILABLE)
}

pub fn backdrop_item(id: &str, backdrops: &[&str], logo: Option<&str>) -> MediaItem {
    let mut item = MediaItem {
        id: id.into(),
        name: format!("Item {}", id),
        kind: ItemKind::Movie,
        backdrop_image_tags: backdrops.iter().map(|t| t.to_string()).collect(),
        ..Default::default()
    };
    if let Some(logo) = logo {
        item.image_tags.insert(ImageType::Logo, logo.into());
    }
    item
}

pub fn image(url: &str) -> Image {
    Image {
        source_url: url.to_string(),
        width: 2,
        height: 1,
        pixels: Arc::from(vec![0u8; 8]),
    }
}

type Scripted = Result<Vec<MediaItem>, StatusCode>;

fn script(result: Result<Vec<MediaItem>, CatalogError>) -> Scripted {
    result.map_err(|e| match e {
        CatalogError::Status(code) => code,
        _ => StatusCode::SERVICE_UNAVAILABLE,
    })
}

#[derive(Default)]
pub struct FakeCatalog {
    responses: Mutex<VecDeque<Scripted>>,
    fallback: Mutex<Option<Scripted>>,
    queries: Mutex<Vec<(Instant, ItemQuery)>>,
    known: Mutex<HashMap<String, MediaItem>>,
}

impl FakeCatalog {
    /// Queue a one-shot response.
    pub fn respond(&self, result: Result<Vec<MediaItem>, CatalogError>) {
        self.responses.lock().unwrap().push_back(script(result));
    }

    /// Response used once the one-shot queue is drained.
    pub fn set_fallback(&self, result: Result<Vec<MediaItem>, CatalogError>) {
        *self.fallback.lock().unwrap() = Some(script(result));
    }

    pub fn insert(&self, item: MediaItem) {
        self.known.lock().unwrap().insert(item.id.clone(), item);
    }

    pub fn queries(&self) -> Vec<ItemQuery> {
        self.queries
            .lock()
            .unwrap()
            .iter()
            .map(|(_, q)| q.clone())
            .collect()
    }

    pub fn query_times(&self) -> Vec<Instant> {
        self.queries.lock().unwrap().iter().map(|(t, _)| *t).collect()
    }
}

impl CatalogClient for FakeCatalog {
    async fn query(&self, query: &ItemQuery) -> Result<Vec<MediaItem>, CatalogError> {
        self.queries
            .lock()
            .unwrap()
            .push((Instant::now(), query.clone()));
        let next = self.responses.lock().unwrap().pop_front();
        let scripted = match next {
            Some(s) => s,
            None => self.fallback.lock().unwrap().clone().unwrap_or(Ok(Vec::new())),
        };
        scripted.map_err(CatalogError::Status)
    }

    async fn item(&self, item_id: &str) -> Result<MediaItem, CatalogError> {
        self.known
            .lock()
            .unwrap()
            .get(item_id)
            .cloned()
            .ok_or(CatalogError::Status(StatusCode::NOT_FOUND))
    }

    fn image_url(
        &self,
        item_id: &str,
        image_type: ImageType,
        index: Option<usize>,
        tag: &str,
        _max_width: Option<u32>,
    ) -> String {
        let index = index.map(|i| i.to_string()).unwrap_or_else(|| "-".into());
        format!("mem://{}/{}/{}/{}", item_id, image_type.as_str(), index, tag)
    }
}

#[derive(Default)]
pub struct FakeImages {
    failing: Mutex<Vec<String>>,
    fetched: Mutex<Vec<String>>,
}

impl FakeImages {
    /// Make every URL ending in `/{tag}` resolve to no image.
    pub fn fail_on(&self, tag: &str) {
        self.failing.lock().unwrap().push(format!("/{}", tag));
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

impl ImageFetcher for FakeImages {
    async fn fetch(&self, url: &str) -> Option<Image> {
        self.fetched.lock().unwrap().push(url.to_string());
        let fails = self
            .failing
            .lock()
            .unwrap()
            .iter()
            .any(|suffix| url.ends_with(suffix.as_str()));
        (!fails).then(|| image(url))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedPrefs {
    pub require_rating: bool,
    pub max_rating: i32,
}

impl Default for FixedPrefs {
    fn default() -> Self {
        Self {
            require_rating: false,
            max_rating: UNBOUNDED_RATING,
        }
    }
}

impl PreferenceSource for FixedPrefs {
    fn require_rating(&self) -> bool {
        self.require_rating
    }

    fn max_rating(&self) -> i32 {
        self.max_rating
    }
}
