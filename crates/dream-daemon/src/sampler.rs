//! Library showcase sampler.
//!
//! Polls the catalog for a handful of random movies/series, keeps the first
//! one that has a backdrop, and resolves its backdrop and logo concurrently.
//!
//! Cadence:
//!   - first poll after `initial_delay` (so a cold start shows the logo or
//!     the playing item first),
//!   - `showcase_duration` after a successful showcase,
//!   - `retry_delay` after an empty or failed poll.
//!
//! Empty cycles publish nothing: the last good showcase stays current.
use std::sync::Arc;
use std::time::Duration;

use dream_proto::config::ScreensaverConfig;
use dream_proto::protocol::{ImageType, MediaItem, Showcase};
use rand::Rng;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::catalog::{CatalogClient, ItemQuery};
use crate::images::ImageFetcher;
use crate::merge::publish_distinct;
use crate::prefs::{PreferenceSource, RatingFilter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamplerSettings {
    pub initial_delay: Duration,
    pub showcase_duration: Duration,
    pub retry_delay: Duration,
    pub batch_limit: u32,
    pub backdrop_max_width: Option<u32>,
    pub logo_max_width: Option<u32>,
}

impl From<&ScreensaverConfig> for SamplerSettings {
    fn from(config: &ScreensaverConfig) -> Self {
        Self {
            initial_delay: config.initial_delay(),
            showcase_duration: config.showcase_duration(),
            retry_delay: config.retry_delay(),
            batch_limit: config.batch_limit,
            backdrop_max_width: Some(config.backdrop_max_width),
            logo_max_width: Some(config.logo_max_width),
        }
    }
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self::from(&ScreensaverConfig::default())
    }
}

/// Which backdrop to show: an index into `backdrop_image_tags`, or `None`
/// for the item's single `Backdrop` image tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackdropPick {
    pub index: Option<usize>,
    pub tag: String,
}

/// Random per-item backdrop, falling back to the item's `Backdrop` image tag.
/// Logos have no such fallback.
pub fn choose_backdrop(item: &MediaItem) -> Option<BackdropPick> {
    if !item.backdrop_image_tags.is_empty() {
        let index = rand::thread_rng().gen_range(0..item.backdrop_image_tags.len());
        return Some(BackdropPick {
            index: Some(index),
            tag: item.backdrop_image_tags[index].clone(),
        });
    }
    item.image_tag(ImageType::Backdrop).map(|tag| BackdropPick {
        index: None,
        tag: tag.to_string(),
    })
}

pub struct ShowcaseSampler<C, F, P> {
    catalog: Arc<C>,
    images: Arc<F>,
    prefs: Arc<P>,
    settings: SamplerSettings,
}

impl<C, F, P> ShowcaseSampler<C, F, P>
where
    C: CatalogClient,
    F: ImageFetcher,
    P: PreferenceSource,
{
    pub fn new(catalog: Arc<C>, images: Arc<F>, prefs: Arc<P>, settings: SamplerSettings) -> Self {
        Self {
            catalog,
            images,
            prefs,
            settings,
        }
    }

    /// One sampling attempt.  `None` covers every non-fatal outcome: catalog
    /// failure, no item with a backdrop, or a backdrop that would not load.
    pub async fn sample_once(&self) -> Option<Showcase> {
        let filter = RatingFilter::snapshot(self.prefs.as_ref());
        let query = ItemQuery::showcase(&filter, self.settings.batch_limit);

        let items = match self.catalog.query(&query).await {
            Ok(items) => items,
            Err(e) => {
                warn!("showcase: catalog query failed: {}", e);
                return None;
            }
        };

        let count = items.len();
        let Some(item) = items.into_iter().find(MediaItem::has_backdrop) else {
            debug!("showcase: none of {} item(s) has a backdrop", count);
            return None;
        };

        let backdrop = choose_backdrop(&item)?;
        let backdrop_url = self.catalog.image_url(
            &item.id,
            ImageType::Backdrop,
            backdrop.index,
            &backdrop.tag,
            self.settings.backdrop_max_width,
        );
        let logo_url = item.image_tag(ImageType::Logo).map(|tag| {
            self.catalog.image_url(
                &item.id,
                ImageType::Logo,
                None,
                tag,
                self.settings.logo_max_width,
            )
        });

        let (backdrop, logo) = tokio::join!(self.images.fetch(&backdrop_url), async {
            match &logo_url {
                Some(url) => self.images.fetch(url).await,
                None => None,
            }
        });

        let Some(backdrop) = backdrop else {
            debug!("showcase: backdrop unavailable for {} ({})", item.id, backdrop_url);
            return None;
        };

        Some(Showcase {
            item,
            backdrop,
            logo,
        })
    }

    pub fn next_delay(&self, outcome: Option<&Showcase>) -> Duration {
        match outcome {
            Some(_) => self.settings.showcase_duration,
            None => self.settings.retry_delay,
        }
    }

    /// Poll until cancelled.  Cycles never overlap: the next query starts only
    /// after the previous cycle's delay has elapsed.
    pub async fn run(self, tx: watch::Sender<Option<Showcase>>, cancel: CancellationToken) {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(self.settings.initial_delay) => {}
        }

        loop {
            let outcome = tokio::select! {
                _ = cancel.cancelled() => break,
                outcome = self.sample_once() => outcome,
            };
            let delay = self.next_delay(outcome.as_ref());

            if let Some(showcase) = outcome {
                let id = showcase.item.id.clone();
                if publish_distinct(&tx, Some(showcase)) {
                    info!("showcase: now showing {}", id);
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }
        debug!("showcase: sampler stopped");
    }
}
