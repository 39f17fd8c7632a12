//! Adapter from playback listener callbacks to a stream of "currently playing
//! item or none".
//!
//! Each call to [`playing_items`] registers its own listener, so every
//! consumer gets an independent subscription that starts with the current
//! snapshot.  The stream never ends while it is alive; dropping it (including
//! when its owning task is aborted) unregisters the listener.
//!
//! The stream yields on every state change and queue-status change, repeats
//! included.  Consumers collapse consecutive duplicates themselves.
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use dream_proto::protocol::MediaItem;
use futures_util::Stream;
use tokio::sync::mpsc;

use crate::playback::{ListenerId, PlaybackEvent, PlaybackEventSource};

pub struct PlayingItems<S: PlaybackEventSource> {
    source: Arc<S>,
    listener: ListenerId,
    events: mpsc::UnboundedReceiver<PlaybackEvent>,
    initial: Option<Option<MediaItem>>,
}

pub fn playing_items<S: PlaybackEventSource>(source: Arc<S>) -> PlayingItems<S> {
    let (tx, events) = mpsc::unbounded_channel();
    // Register before taking the snapshot so no transition can fall between.
    let listener = source.subscribe(Box::new(move |event: &PlaybackEvent| {
        if !matches!(event, PlaybackEvent::Progress { .. }) {
            let _ = tx.send(event.clone());
        }
    }));
    let initial = Some(source.current_item());

    PlayingItems {
        source,
        listener,
        events,
        initial,
    }
}

impl<S: PlaybackEventSource> Stream for PlayingItems<S> {
    type Item = Option<MediaItem>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if let Some(snapshot) = this.initial.take() {
            return Poll::Ready(Some(snapshot));
        }

        loop {
            match this.events.poll_recv(cx) {
                Poll::Ready(Some(PlaybackEvent::StateChanged { item, .. })) => {
                    return Poll::Ready(Some(item));
                }
                Poll::Ready(Some(PlaybackEvent::QueueStatusChanged { .. })) => {
                    return Poll::Ready(Some(this.source.current_item()));
                }
                Poll::Ready(Some(PlaybackEvent::Progress { .. })) => continue,
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

impl<S: PlaybackEventSource> Drop for PlayingItems<S> {
    fn drop(&mut self) {
        self.source.unsubscribe(self.listener);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::PlaybackManager;
    use futures_util::StreamExt;

    fn track(id: &str) -> MediaItem {
        MediaItem {
            id: id.into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_starts_with_snapshot() {
        let manager = Arc::new(PlaybackManager::new());
        manager.play_items(vec![track("a")], 0);

        let mut items = playing_items(Arc::clone(&manager));
        assert_eq!(items.next().await, Some(Some(track("a"))));
    }

    #[tokio::test]
    async fn test_yields_every_transition_including_repeats() {
        let manager = Arc::new(PlaybackManager::new());
        let mut items = playing_items(Arc::clone(&manager));
        assert_eq!(items.next().await, Some(None));

        manager.play_items(vec![track("a")], 0);
        // queue-status change re-reads the snapshot, then the state change
        assert_eq!(items.next().await, Some(Some(track("a"))));
        assert_eq!(items.next().await, Some(Some(track("a"))));

        manager.report_progress(500);
        manager.stop();
        assert_eq!(items.next().await, Some(None));
        assert_eq!(items.next().await, Some(None));
    }

    #[tokio::test]
    async fn test_each_subscription_is_independent() {
        let manager = Arc::new(PlaybackManager::new());
        let first = playing_items(Arc::clone(&manager));
        let mut second = playing_items(Arc::clone(&manager));
        assert_eq!(manager.listener_count(), 2);

        drop(first);
        assert_eq!(manager.listener_count(), 1);

        manager.play_items(vec![track("b")], 0);
        assert_eq!(second.next().await, Some(None));
        assert_eq!(second.next().await, Some(Some(track("b"))));
    }

    #[tokio::test]
    async fn test_abort_unregisters_listener() {
        let manager = Arc::new(PlaybackManager::new());
        let items = playing_items(Arc::clone(&manager));
        let task = tokio::spawn(async move {
            let mut items = items;
            while items.next().await.is_some() {}
        });
        assert_eq!(manager.listener_count(), 1);

        task.abort();
        let _ = task.await;
        assert_eq!(manager.listener_count(), 0);
    }
}
