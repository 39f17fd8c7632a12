use std::sync::Arc;

use dream_daemon::catalog::HttpCatalogClient;
use dream_daemon::dream::DreamViewModel;
use dream_daemon::http::{self, HttpState};
use dream_daemon::images::HttpImageFetcher;
use dream_daemon::now_playing::rotate_backdrops;
use dream_daemon::playback::PlaybackManager;
use dream_daemon::prefs::LivePreferences;
use dream_daemon::sampler::SamplerSettings;
use dream_proto::config::Config;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn init_logging() -> anyhow::Result<()> {
    let data_dir = dream_proto::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let log_path = dream_proto::platform::log_file();

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // File log for post-mortems, stderr for interactive runs.
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(log_file)
        .with_ansi(false);
    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,dream_daemon=debug")),
        )
        .init();

    info!("Log file: {:?}", log_path);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging()?;

    let config = Config::load()?;
    info!("Config loaded from: {:?}", Config::config_path());
    if config.server.user_id.is_empty() || config.server.access_token.is_empty() {
        warn!("server.user_id / server.access_token not set; catalog queries will fail");
    }

    let catalog = Arc::new(HttpCatalogClient::new(&config.server)?);
    let images = Arc::new(HttpImageFetcher::new(config.server.access_token.clone())?);
    let prefs = Arc::new(LivePreferences::new(config.parental.clone()));
    let playback = Arc::new(PlaybackManager::new());

    let dream = DreamViewModel::start(
        Arc::clone(&playback),
        Arc::clone(&catalog),
        images,
        Arc::clone(&prefs),
        SamplerSettings::from(&config.screensaver),
    );

    let cancel = CancellationToken::new();

    let (backdrop_tx, backdrop_rx) = watch::channel(None);
    let rotation_handle = tokio::spawn(rotate_backdrops(
        Arc::clone(&playback),
        Arc::clone(&catalog),
        config.screensaver.backdrop_rotation(),
        Some(config.screensaver.backdrop_max_width),
        backdrop_tx,
        cancel.clone(),
    ));

    let http_handle = if config.http.enabled {
        Some(http::start_server(
            config.http.bind_address.clone(),
            config.http.port,
            HttpState {
                playback: Arc::clone(&playback),
                catalog: Arc::clone(&catalog),
                prefs: Arc::clone(&prefs),
                content: dream.subscribe(),
                backdrop: backdrop_rx,
                poster_max_width: Some(config.screensaver.poster_max_width),
            },
            cancel.clone(),
        ))
    } else {
        None
    };

    info!("Daemon initialised, waiting for shutdown signal");
    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");

    cancel.cancel();
    dream.close().await;
    let _ = rotation_handle.await;
    if let Some(handle) = http_handle {
        let _ = handle.await;
    }

    Ok(())
}
