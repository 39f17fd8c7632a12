//! Playback event source and the in-process audio queue behind it.
//!
//! Listeners are invoked synchronously on the thread that mutated the queue,
//! after the queue lock has been released.  They must not block or call back
//! into the manager's mutators.
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use dream_proto::protocol::{MediaItem, NowPlayingInfo, PlaybackState};
use tracing::{debug, info};

use crate::now_playing;

#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    StateChanged {
        state: PlaybackState,
        item: Option<MediaItem>,
    },
    QueueStatusChanged {
        has_queue: bool,
    },
    Progress {
        position_ms: u64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

pub type PlaybackListener = Box<dyn Fn(&PlaybackEvent) + Send + Sync>;

pub trait PlaybackEventSource: Send + Sync + 'static {
    /// The item currently loaded in the player, if any.
    fn current_item(&self) -> Option<MediaItem>;
    fn subscribe(&self, listener: PlaybackListener) -> ListenerId;
    fn unsubscribe(&self, id: ListenerId);
}

#[derive(Debug, Default)]
struct QueueState {
    items: Vec<MediaItem>,
    index: usize,
    state: PlaybackState,
    position_ms: u64,
}

impl QueueState {
    fn current(&self) -> Option<&MediaItem> {
        if self.state == PlaybackState::Idle {
            return None;
        }
        self.items.get(self.index)
    }
}

/// Single-owner audio queue.  Every mutation takes the queue lock, computes
/// the events to emit, drops the lock and then notifies listeners.  The
/// dispatch lock is held across both steps so listeners observe mutations in
/// the order they happened.
pub struct PlaybackManager {
    dispatch: Mutex<()>,
    queue: Mutex<QueueState>,
    listeners: Mutex<Vec<(ListenerId, Arc<PlaybackListener>)>>,
    next_listener: AtomicU64,
}

impl Default for PlaybackManager {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackManager {
    pub fn new() -> Self {
        Self {
            dispatch: Mutex::new(()),
            queue: Mutex::new(QueueState::default()),
            listeners: Mutex::new(Vec::new()),
            next_listener: AtomicU64::new(1),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn state(&self) -> PlaybackState {
        self.lock_queue().state
    }

    /// Replace the queue and start playing at `start_index`.
    pub fn play_items(&self, items: Vec<MediaItem>, start_index: usize) {
        if items.is_empty() {
            self.stop();
            return;
        }
        let _dispatch = self.lock_dispatch();
        let events = {
            let mut q = self.lock_queue();
            let had_queue = !q.items.is_empty();
            q.index = start_index.min(items.len() - 1);
            q.items = items;
            q.state = PlaybackState::Playing;
            q.position_ms = 0;
            info!(
                "playback: playing {} item(s) from index {}",
                q.items.len(),
                q.index
            );
            let mut events = Vec::new();
            if !had_queue {
                events.push(PlaybackEvent::QueueStatusChanged { has_queue: true });
            }
            events.push(state_event(&q));
            events
        };
        self.notify(&events);
    }

    /// Append to the queue.  Starts playback when the player was idle.
    pub fn add_to_queue(&self, item: MediaItem) {
        let _dispatch = self.lock_dispatch();
        let events = {
            let mut q = self.lock_queue();
            let had_queue = !q.items.is_empty();
            q.items.push(item);
            let mut events = Vec::new();
            if !had_queue {
                events.push(PlaybackEvent::QueueStatusChanged { has_queue: true });
            }
            if q.state == PlaybackState::Idle {
                q.index = q.items.len() - 1;
                q.state = PlaybackState::Playing;
                q.position_ms = 0;
                events.push(state_event(&q));
            }
            events
        };
        self.notify(&events);
    }

    pub fn toggle_pause(&self) {
        let _dispatch = self.lock_dispatch();
        let events = {
            let mut q = self.lock_queue();
            q.state = match q.state {
                PlaybackState::Playing | PlaybackState::Buffering => PlaybackState::Paused,
                PlaybackState::Paused => PlaybackState::Playing,
                PlaybackState::Idle | PlaybackState::Error => return,
            };
            vec![state_event(&q)]
        };
        self.notify(&events);
    }

    pub fn next(&self) {
        self.skip(1);
    }

    pub fn prev(&self) {
        self.skip(-1);
    }

    fn skip(&self, delta: isize) {
        let _dispatch = self.lock_dispatch();
        let events = {
            let mut q = self.lock_queue();
            if q.state == PlaybackState::Idle {
                return;
            }
            let target = q.index as isize + delta;
            if target < 0 || target as usize >= q.items.len() {
                debug!("playback: skip {} out of range, ignoring", delta);
                return;
            }
            q.index = target as usize;
            q.position_ms = 0;
            q.state = PlaybackState::Playing;
            vec![state_event(&q)]
        };
        self.notify(&events);
    }

    /// Stop and clear the queue.
    pub fn stop(&self) {
        let _dispatch = self.lock_dispatch();
        let events = {
            let mut q = self.lock_queue();
            if q.state == PlaybackState::Idle && q.items.is_empty() {
                return;
            }
            let had_queue = !q.items.is_empty();
            *q = QueueState::default();
            info!("playback: stopped");
            let mut events = vec![state_event(&q)];
            if had_queue {
                events.push(PlaybackEvent::QueueStatusChanged { has_queue: false });
            }
            events
        };
        self.notify(&events);
    }

    pub fn report_progress(&self, position_ms: u64) {
        let _dispatch = self.lock_dispatch();
        {
            let mut q = self.lock_queue();
            if q.current().is_none() {
                return;
            }
            q.position_ms = position_ms;
        }
        self.notify(&[PlaybackEvent::Progress { position_ms }]);
    }

    /// Display snapshot for the now-playing screen.  `poster` resolves the
    /// current item's primary art.
    pub fn now_playing<F>(&self, backdrop_url: Option<String>, poster: F) -> Option<NowPlayingInfo>
    where
        F: FnOnce(&MediaItem) -> Option<String>,
    {
        let q = self.lock_queue();
        let item = q.current()?;
        let poster_url = poster(item);
        Some(now_playing::build_info(
            item,
            q.state,
            q.index,
            q.items.len(),
            q.position_ms,
            backdrop_url,
            poster_url,
        ))
    }

    fn lock_dispatch(&self) -> std::sync::MutexGuard<'_, ()> {
        self.dispatch.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_queue(&self) -> std::sync::MutexGuard<'_, QueueState> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, events: &[PlaybackEvent]) {
        // Snapshot so a listener may unsubscribe while we iterate.
        let listeners: Vec<Arc<PlaybackListener>> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for event in events {
            for listener in &listeners {
                listener(event);
            }
        }
    }
}

fn state_event(q: &QueueState) -> PlaybackEvent {
    PlaybackEvent::StateChanged {
        state: q.state,
        item: q.current().cloned(),
    }
}

impl PlaybackEventSource for PlaybackManager {
    fn current_item(&self) -> Option<MediaItem> {
        self.lock_queue().current().cloned()
    }

    fn subscribe(&self, listener: PlaybackListener) -> ListenerId {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(listener)));
        debug!("playback: listener {:?} subscribed", id);
        id
    }

    fn unsubscribe(&self, id: ListenerId) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(lid, _)| *lid != id);
        debug!("playback: listener {:?} unsubscribed", id);
    }
}
