use dream_proto::protocol::{DisplayContent, MediaItem, Showcase};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Priority rule: a playing item beats the showcase, the showcase beats the
/// logo.
pub fn select_content(playing: Option<&MediaItem>, showcase: Option<&Showcase>) -> DisplayContent {
    if let Some(item) = playing {
        return DisplayContent::NowPlaying(item.clone());
    }
    if let Some(showcase) = showcase {
        return DisplayContent::LibraryShowcase(showcase.clone());
    }
    DisplayContent::Logo
}

/// Store `value` unless it equals what the channel already holds.  Returns
/// whether receivers were notified.
pub fn publish_distinct<T: PartialEq>(tx: &watch::Sender<T>, value: T) -> bool {
    tx.send_if_modified(|slot| {
        if *slot == value {
            return false;
        }
        *slot = value;
        true
    })
}

/// Hold-latest combinator: re-evaluates [`select_content`] whenever either
/// upstream changes and publishes only distinct results.
pub async fn merge_content(
    mut playing: watch::Receiver<Option<MediaItem>>,
    mut showcase: watch::Receiver<Option<Showcase>>,
    out: watch::Sender<DisplayContent>,
    cancel: CancellationToken,
) {
    loop {
        let next = {
            let playing = playing.borrow_and_update();
            let showcase = showcase.borrow_and_update();
            select_content(playing.as_ref(), showcase.as_ref())
        };
        let label = next.label();
        if publish_distinct(&out, next) {
            info!("dream: content -> {}", label);
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            changed = playing.changed() => {
                if changed.is_err() {
                    debug!("dream: playback feed closed");
                    break;
                }
            }
            changed = showcase.changed() => {
                if changed.is_err() {
                    debug!("dream: showcase feed closed");
                    break;
                }
            }
        }
    }
}
