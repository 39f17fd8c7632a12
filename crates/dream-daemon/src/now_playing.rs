//! Derived display data for the audio now-playing screen, plus the rotating
//! backdrop that cycles through the playing item's artwork.
use std::sync::Arc;
use std::time::Duration;

use dream_proto::protocol::{ImageType, MediaItem, NowPlayingInfo, PlaybackState};
use futures_util::StreamExt;
use rand::Rng;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::catalog::CatalogClient;
use crate::merge::publish_distinct;
use crate::playback::PlaybackEventSource;
use crate::playing::playing_items;
use crate::sampler::choose_backdrop;

/// `h:mm:ss` once there are hours, `m:ss` otherwise.
pub fn format_millis(ms: u64) -> String {
    let total_secs = ms / 1000;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

pub fn build_info(
    item: &MediaItem,
    state: PlaybackState,
    index: usize,
    queue_size: usize,
    position_ms: u64,
    backdrop_url: Option<String>,
    poster_url: Option<String>,
) -> NowPlayingInfo {
    let duration_ms = item.duration_ms();
    let remaining_text = duration_ms
        .map(|d| format!("-{}", format_millis(d.saturating_sub(position_ms))))
        .unwrap_or_default();
    let is_playing = state == PlaybackState::Playing;

    NowPlayingInfo {
        item_id: item.id.clone(),
        title: item.name.clone(),
        artist: item.album_artist.clone(),
        album: item.album.clone(),
        genres: item.genres.clone(),
        queue_position: index + 1,
        queue_size,
        state,
        is_playing,
        keep_awake: is_playing,
        position_ms,
        duration_ms,
        elapsed_text: format_millis(position_ms),
        remaining_text,
        backdrop_url,
        poster_url,
    }
}

/// Random backdrop URL for `item`.  Tracks rarely carry backdrops of their
/// own, so the parent's (album or artist) are used when the item has none.
pub fn backdrop_url<C: CatalogClient>(
    catalog: &C,
    item: &MediaItem,
    max_width: Option<u32>,
) -> Option<String> {
    if let Some(pick) = choose_backdrop(item) {
        return Some(catalog.image_url(
            &item.id,
            ImageType::Backdrop,
            pick.index,
            &pick.tag,
            max_width,
        ));
    }

    let parent_id = item.parent_backdrop_item_id.as_deref()?;
    let tags = &item.parent_backdrop_image_tags;
    if tags.is_empty() {
        return None;
    }
    let index = rand::thread_rng().gen_range(0..tags.len());
    Some(catalog.image_url(
        parent_id,
        ImageType::Backdrop,
        Some(index),
        &tags[index],
        max_width,
    ))
}

/// Primary image of the item, else its album's.  `None` means no art.
pub fn poster_url<C: CatalogClient>(
    catalog: &C,
    item: &MediaItem,
    max_width: Option<u32>,
) -> Option<String> {
    if let Some(tag) = item.image_tag(ImageType::Primary) {
        return Some(catalog.image_url(&item.id, ImageType::Primary, None, tag, max_width));
    }
    match (&item.album_id, &item.album_primary_image_tag) {
        (Some(album_id), Some(tag)) => Some(catalog.image_url(
            album_id,
            ImageType::Primary,
            None,
            tag,
            max_width,
        )),
        _ => None,
    }
}

/// Republish a random backdrop of the playing item every `period`, and
/// immediately whenever the playing item changes.  `None` tells the screen to
/// fall back to its default background.
pub async fn rotate_backdrops<S, C>(
    source: Arc<S>,
    catalog: Arc<C>,
    period: Duration,
    max_width: Option<u32>,
    tx: watch::Sender<Option<String>>,
    cancel: CancellationToken,
) where
    S: PlaybackEventSource,
    C: CatalogClient,
{
    let mut items = playing_items(source);
    let mut current: Option<MediaItem> = None;
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            next = items.next() => {
                let Some(item) = next else { break };
                if item == current {
                    continue;
                }
                current = item;
                ticker.reset();
            }
            _ = ticker.tick() => {}
        }

        let url = current
            .as_ref()
            .and_then(|item| backdrop_url(catalog.as_ref(), item, max_width));
        debug!("now-playing backdrop: {:?}", url);
        publish_distinct(&tx, url);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::PlaybackManager;
    use crate::test_support::{backdrop_item, FakeCatalog};
    use dream_proto::protocol::ItemKind;

    #[test]
    fn test_format_millis() {
        assert_eq!(format_millis(0), "0:00");
        assert_eq!(format_millis(5_000), "0:05");
        assert_eq!(format_millis(65_000), "1:05");
        assert_eq!(format_millis(65_999), "1:05");
        assert_eq!(format_millis(3_725_000), "1:02:05");
    }

    #[test]
    fn test_build_info_times() {
        let item = MediaItem {
            id: "t1".into(),
            name: "So What".into(),
            album: Some("Kind of Blue".into()),
            album_artist: Some("Miles Davis".into()),
            genres: vec!["Jazz".into()],
            run_time_ticks: Some(565_000 * 10_000),
            ..Default::default()
        };
        let info = build_info(&item, PlaybackState::Playing, 0, 5, 65_000, None, None);
        assert_eq!(info.title, "So What");
        assert_eq!(info.artist.as_deref(), Some("Miles Davis"));
        assert_eq!(info.queue_position, 1);
        assert_eq!(info.queue_size, 5);
        assert_eq!(info.elapsed_text, "1:05");
        assert_eq!(info.remaining_text, "-8:20");
        assert!(info.keep_awake);
    }

    #[test]
    fn test_paused_without_duration() {
        let item = MediaItem {
            id: "t2".into(),
            ..Default::default()
        };
        let info = build_info(&item, PlaybackState::Paused, 2, 3, 1_000, None, None);
        assert_eq!(info.remaining_text, "");
        assert_eq!(info.duration_ms, None);
        assert!(!info.is_playing);
        assert!(!info.keep_awake);
        assert_eq!(info.queue_position, 3);
    }

    fn track_with_parent_art() -> MediaItem {
        MediaItem {
            id: "t1".into(),
            kind: ItemKind::Audio,
            album_id: Some("alb".into()),
            album_primary_image_tag: Some("ap1".into()),
            parent_backdrop_item_id: Some("artist".into()),
            parent_backdrop_image_tags: vec!["pb1".into()],
            ..Default::default()
        }
    }

    #[test]
    fn test_backdrop_falls_back_to_parent() {
        let catalog = FakeCatalog::default();
        let track = track_with_parent_art();
        assert_eq!(
            backdrop_url(&catalog, &track, None).as_deref(),
            Some("mem://artist/Backdrop/0/pb1")
        );

        let own = MediaItem {
            backdrop_image_tags: vec!["b0".into()],
            ..track.clone()
        };
        assert_eq!(
            backdrop_url(&catalog, &own, None).as_deref(),
            Some("mem://t1/Backdrop/0/b0")
        );

        let bare = MediaItem {
            parent_backdrop_image_tags: Vec::new(),
            ..track
        };
        assert_eq!(backdrop_url(&catalog, &bare, None), None);
    }

    #[test]
    fn test_poster_prefers_own_primary_then_album() {
        let catalog = FakeCatalog::default();
        let mut track = track_with_parent_art();
        assert_eq!(
            poster_url(&catalog, &track, Some(500)).as_deref(),
            Some("mem://alb/Primary/-/ap1")
        );

        track.image_tags.insert(ImageType::Primary, "p1".into());
        assert_eq!(
            poster_url(&catalog, &track, Some(500)).as_deref(),
            Some("mem://t1/Primary/-/p1")
        );

        let bare = MediaItem {
            id: "t2".into(),
            album_id: Some("alb".into()),
            ..Default::default()
        };
        assert_eq!(poster_url(&catalog, &bare, None), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backdrop_follows_playing_item() {
        let playback = Arc::new(PlaybackManager::new());
        let catalog = Arc::new(FakeCatalog::default());
        let (tx, mut rx) = watch::channel(None);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(rotate_backdrops(
            Arc::clone(&playback),
            catalog,
            Duration::from_secs(8),
            None,
            tx,
            cancel.clone(),
        ));
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(rx.borrow_and_update().is_none());

        playback.play_items(vec![backdrop_item("song", &["b0"], None)], 0);
        rx.changed().await.unwrap();
        assert_eq!(
            rx.borrow_and_update().as_deref(),
            Some("mem://song/Backdrop/0/b0")
        );

        playback.stop();
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_none());

        cancel.cancel();
        task.await.unwrap();
    }
}
