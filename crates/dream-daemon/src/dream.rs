//! Owner of the screensaver content pipeline.
//!
//! Three tasks, wired only through `watch` channels:
//!
//!   playback source ─▶ pump ──(Option<MediaItem>)──┐
//!                                                  ├─▶ merge ─▶ DisplayContent
//!   catalog/images ─▶ sampler ─(Option<Showcase>)──┘
//!
//! The output channel is seeded synchronously from the playback snapshot, so
//! subscribers always see a defined value.  Dropping the view model (or
//! calling [`DreamViewModel::close`]) cancels every task; the pump drops its
//! playback stream, which unregisters the listener.
use std::sync::Arc;

use dream_proto::protocol::{DisplayContent, MediaItem};
use futures_util::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::catalog::CatalogClient;
use crate::images::ImageFetcher;
use crate::merge::{merge_content, publish_distinct, select_content};
use crate::playback::PlaybackEventSource;
use crate::playing::{playing_items, PlayingItems};
use crate::prefs::PreferenceSource;
use crate::sampler::{SamplerSettings, ShowcaseSampler};

pub struct DreamViewModel {
    content: watch::Receiver<DisplayContent>,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl DreamViewModel {
    /// Spawn the pipeline on the current tokio runtime.
    pub fn start<S, C, F, P>(
        playback: Arc<S>,
        catalog: Arc<C>,
        images: Arc<F>,
        prefs: Arc<P>,
        settings: SamplerSettings,
    ) -> Self
    where
        S: PlaybackEventSource,
        C: CatalogClient,
        F: ImageFetcher,
        P: PreferenceSource,
    {
        let cancel = CancellationToken::new();

        // Subscribe first so no transition can slip in before the snapshot.
        let items = playing_items(Arc::clone(&playback));
        let snapshot = playback.current_item();
        let (content_tx, content) = watch::channel(select_content(snapshot.as_ref(), None));
        let (playing_tx, playing_rx) = watch::channel(snapshot);
        let (showcase_tx, showcase_rx) = watch::channel(None);

        let sampler = ShowcaseSampler::new(catalog, images, prefs, settings);

        let tasks = vec![
            tokio::spawn(forward_playing(items, playing_tx, cancel.clone())),
            tokio::spawn(sampler.run(showcase_tx, cancel.clone())),
            tokio::spawn(merge_content(
                playing_rx,
                showcase_rx,
                content_tx,
                cancel.clone(),
            )),
        ];
        info!("dream: started (initial content: {})", content.borrow().label());

        Self {
            content,
            cancel,
            tasks,
        }
    }

    pub fn content(&self) -> DisplayContent {
        self.content.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DisplayContent> {
        self.content.clone()
    }

    /// Cancel the pipeline and wait for its tasks to finish.
    pub async fn close(mut self) {
        self.cancel.cancel();
        for task in self.tasks.drain(..) {
            let _ = task.await;
        }
        info!("dream: closed");
    }
}

impl Drop for DreamViewModel {
    fn drop(&mut self) {
        self.cancel.cancel();
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

/// Feed the playback stream into the merge stage, collapsing consecutive
/// duplicates.
async fn forward_playing<S: PlaybackEventSource>(
    mut items: PlayingItems<S>,
    tx: watch::Sender<Option<MediaItem>>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            next = items.next() => {
                let Some(item) = next else { break };
                if publish_distinct(&tx, item) {
                    debug!("dream: playing item changed");
                }
            }
        }
    }
}
