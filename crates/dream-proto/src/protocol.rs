use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Server-side duration unit: 100 ns ticks.
pub const TICKS_PER_MILLI: i64 = 10_000;

/// Item kinds the client cares about.  Anything else the server returns
/// collapses into `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ItemKind {
    Movie,
    Series,
    Episode,
    Audio,
    MusicAlbum,
    #[default]
    #[serde(other)]
    Other,
}

impl ItemKind {
    /// Name used by the server in `IncludeItemTypes`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Movie => "Movie",
            ItemKind::Series => "Series",
            ItemKind::Episode => "Episode",
            ItemKind::Audio => "Audio",
            ItemKind::MusicAlbum => "MusicAlbum",
            ItemKind::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageType {
    Primary,
    Art,
    Backdrop,
    Banner,
    Logo,
    Thumb,
    Disc,
    Box,
    Screenshot,
    Menu,
    BoxRear,
    #[serde(other)]
    Other,
}

impl ImageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageType::Primary => "Primary",
            ImageType::Art => "Art",
            ImageType::Backdrop => "Backdrop",
            ImageType::Banner => "Banner",
            ImageType::Logo => "Logo",
            ImageType::Thumb => "Thumb",
            ImageType::Disc => "Disc",
            ImageType::Box => "Box",
            ImageType::Screenshot => "Screenshot",
            ImageType::Menu => "Menu",
            ImageType::BoxRear => "BoxRear",
            ImageType::Other => "Other",
        }
    }
}

/// Catalog item as returned by the media server.  Read-only on the client.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MediaItem {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "Type", default)]
    pub kind: ItemKind,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub album_artist: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub run_time_ticks: Option<i64>,
    #[serde(default)]
    pub official_rating: Option<String>,
    #[serde(default)]
    pub image_tags: HashMap<ImageType, String>,
    #[serde(default)]
    pub backdrop_image_tags: Vec<String>,
    /// Ancestor whose backdrops stand in for this item's (album or series).
    #[serde(default)]
    pub parent_backdrop_item_id: Option<String>,
    #[serde(default)]
    pub parent_backdrop_image_tags: Vec<String>,
    #[serde(default)]
    pub album_id: Option<String>,
    #[serde(default)]
    pub album_primary_image_tag: Option<String>,
}

impl MediaItem {
    /// True when the item carries any backdrop tag, either in the per-item
    /// list or as the single `Backdrop` image tag.
    pub fn has_backdrop(&self) -> bool {
        !self.backdrop_image_tags.is_empty() || self.image_tags.contains_key(&ImageType::Backdrop)
    }

    pub fn image_tag(&self, image_type: ImageType) -> Option<&str> {
        self.image_tags.get(&image_type).map(String::as_str)
    }

    pub fn duration_ms(&self) -> Option<u64> {
        self.run_time_ticks
            .filter(|t| *t > 0)
            .map(|t| (t / TICKS_PER_MILLI) as u64)
    }
}

/// A decoded RGBA bitmap.
#[derive(Clone, PartialEq, Eq)]
pub struct Image {
    pub source_url: String,
    pub width: u32,
    pub height: u32,
    pub pixels: Arc<[u8]>,
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Image")
            .field("source_url", &self.source_url)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

/// A randomly sampled library item with its resolved artwork.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Showcase {
    pub item: MediaItem,
    pub backdrop: Image,
    pub logo: Option<Image>,
}

/// What the screensaver shows right now.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DisplayContent {
    NowPlaying(MediaItem),
    LibraryShowcase(Showcase),
    #[default]
    Logo,
}

impl DisplayContent {
    pub fn label(&self) -> &'static str {
        match self {
            DisplayContent::NowPlaying(_) => "now-playing",
            DisplayContent::LibraryShowcase(_) => "showcase",
            DisplayContent::Logo => "logo",
        }
    }

    pub fn summary(&self) -> ContentSummary {
        match self {
            DisplayContent::NowPlaying(item) => ContentSummary::NowPlaying {
                item_id: item.id.clone(),
                name: item.name.clone(),
            },
            DisplayContent::LibraryShowcase(showcase) => ContentSummary::LibraryShowcase {
                item_id: showcase.item.id.clone(),
                name: showcase.item.name.clone(),
                backdrop_url: showcase.backdrop.source_url.clone(),
                backdrop_width: showcase.backdrop.width,
                backdrop_height: showcase.backdrop.height,
                logo_url: showcase.logo.as_ref().map(|l| l.source_url.clone()),
            },
            DisplayContent::Logo => ContentSummary::Logo,
        }
    }
}

/// Serializable view of [`DisplayContent`] for the HTTP API.  Bitmaps are
/// replaced by their source URLs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentSummary {
    NowPlaying {
        item_id: String,
        name: String,
    },
    LibraryShowcase {
        item_id: String,
        name: String,
        backdrop_url: String,
        backdrop_width: u32,
        backdrop_height: u32,
        logo_url: Option<String>,
    },
    Logo,
}

/// Player state as seen by listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PlaybackState {
    #[default]
    Idle,
    Buffering,
    Playing,
    Paused,
    Error,
}

/// Display data for the audio now-playing screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NowPlayingInfo {
    pub item_id: String,
    pub title: String,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub genres: Vec<String>,
    /// 1-based position in the queue, as displayed.
    pub queue_position: usize,
    pub queue_size: usize,
    pub state: PlaybackState,
    pub is_playing: bool,
    /// The screen should stay awake while audio is actually playing.
    pub keep_awake: bool,
    pub position_ms: u64,
    pub duration_ms: Option<u64>,
    pub elapsed_text: String,
    pub remaining_text: String,
    pub backdrop_url: Option<String>,
    /// Primary art for the item, `None` when the screen should use its
    /// default audio icon.
    pub poster_url: Option<String>,
}
