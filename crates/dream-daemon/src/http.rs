use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use dream_proto::protocol::{ContentSummary, DisplayContent, NowPlayingInfo};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::catalog::{CatalogClient, CatalogError};
use crate::now_playing;
use crate::playback::PlaybackManager;
use crate::prefs::LivePreferences;

pub struct HttpState<C> {
    pub playback: Arc<PlaybackManager>,
    pub catalog: Arc<C>,
    pub prefs: Arc<LivePreferences>,
    pub content: watch::Receiver<DisplayContent>,
    pub backdrop: watch::Receiver<Option<String>>,
    pub poster_max_width: Option<u32>,
}

// Manual impl: derive would require `C: Clone`.
impl<C> Clone for HttpState<C> {
    fn clone(&self) -> Self {
        Self {
            playback: Arc::clone(&self.playback),
            catalog: Arc::clone(&self.catalog),
            prefs: Arc::clone(&self.prefs),
            content: self.content.clone(),
            backdrop: self.backdrop.clone(),
            poster_max_width: self.poster_max_width,
        }
    }
}

pub fn router<C: CatalogClient>(state: HttpState<C>) -> Router {
    Router::new()
        .route("/api/content", get(get_content::<C>))
        .route("/api/now-playing", get(get_now_playing::<C>))
        .route("/api/play/:item_id", post(play_item::<C>))
        .route("/api/queue/:item_id", post(queue_item::<C>))
        .route("/api/toggle", post(toggle_pause::<C>))
        .route("/api/next", post(next_item::<C>))
        .route("/api/prev", post(prev_item::<C>))
        .route("/api/stop", post(stop::<C>))
        .route("/api/prefs/max-rating/:value", post(set_max_rating::<C>))
        .route("/api/prefs/require-rating/:flag", post(set_require_rating::<C>))
        .with_state(state)
}

pub fn start_server<C: CatalogClient>(
    bind_address: String,
    port: u16,
    state: HttpState<C>,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let app = router(state);

        let addr = format!("{}:{}", bind_address, port);
        let listener = match TcpListener::bind(&addr).await {
            Ok(l) => l,
            Err(e) => {
                error!("Failed to bind HTTP server to {}: {}", addr, e);
                return;
            }
        };

        info!("HTTP API server listening on http://{}", addr);

        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(cancel.cancelled_owned())
            .await
        {
            error!("HTTP server error: {}", e);
        }
    })
}

async fn get_content<C: CatalogClient>(State(state): State<HttpState<C>>) -> Json<ContentSummary> {
    let summary = state.content.borrow().summary();
    Json(summary)
}

async fn get_now_playing<C: CatalogClient>(
    State(state): State<HttpState<C>>,
) -> Result<Json<NowPlayingInfo>, StatusCode> {
    let backdrop = state.backdrop.borrow().clone();
    let catalog = state.catalog.as_ref();
    state
        .playback
        .now_playing(backdrop, |item| {
            now_playing::poster_url(catalog, item, state.poster_max_width)
        })
        .map(Json)
        .ok_or(StatusCode::NO_CONTENT)
}

async fn play_item<C: CatalogClient>(
    State(state): State<HttpState<C>>,
    Path(item_id): Path<String>,
) -> StatusCode {
    info!("HTTP API: Play {}", item_id);
    match state.catalog.item(&item_id).await {
        Ok(item) => {
            state.playback.play_items(vec![item], 0);
            StatusCode::OK
        }
        Err(e) => lookup_failed(&item_id, e),
    }
}

async fn queue_item<C: CatalogClient>(
    State(state): State<HttpState<C>>,
    Path(item_id): Path<String>,
) -> StatusCode {
    info!("HTTP API: Queue {}", item_id);
    match state.catalog.item(&item_id).await {
        Ok(item) => {
            state.playback.add_to_queue(item);
            StatusCode::OK
        }
        Err(e) => lookup_failed(&item_id, e),
    }
}

fn lookup_failed(item_id: &str, e: CatalogError) -> StatusCode {
    warn!("HTTP API: lookup of {} failed: {}", item_id, e);
    match e {
        CatalogError::Status(StatusCode::NOT_FOUND) => StatusCode::NOT_FOUND,
        _ => StatusCode::BAD_GATEWAY,
    }
}

async fn toggle_pause<C: CatalogClient>(State(state): State<HttpState<C>>) -> StatusCode {
    info!("HTTP API: Toggle pause");
    state.playback.toggle_pause();
    StatusCode::OK
}

async fn next_item<C: CatalogClient>(State(state): State<HttpState<C>>) -> StatusCode {
    info!("HTTP API: Next");
    state.playback.next();
    StatusCode::OK
}

async fn prev_item<C: CatalogClient>(State(state): State<HttpState<C>>) -> StatusCode {
    info!("HTTP API: Previous");
    state.playback.prev();
    StatusCode::OK
}

async fn stop<C: CatalogClient>(State(state): State<HttpState<C>>) -> StatusCode {
    info!("HTTP API: Stop");
    state.playback.stop();
    StatusCode::OK
}

async fn set_max_rating<C: CatalogClient>(
    State(state): State<HttpState<C>>,
    Path(value): Path<i32>,
) -> StatusCode {
    info!("HTTP API: max rating {}", value);
    state.prefs.set_max_rating(value);
    StatusCode::OK
}

async fn set_require_rating<C: CatalogClient>(
    State(state): State<HttpState<C>>,
    Path(flag): Path<bool>,
) -> StatusCode {
    info!("HTTP API: require rating {}", flag);
    state.prefs.set_require_rating(flag);
    StatusCode::OK
}
