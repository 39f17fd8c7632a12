use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dream_proto::protocol::Image;
use reqwest::Client;
use tracing::{debug, warn};

/// Resolves an image URL to a decoded bitmap.  `None` means there is no
/// usable image at that URL; failures are reported by the implementation,
/// never to the caller.
pub trait ImageFetcher: Send + Sync + 'static {
    fn fetch(&self, url: &str) -> impl Future<Output = Option<Image>> + Send;
}

pub struct HttpImageFetcher {
    client: Client,
    access_token: String,
}

impl HttpImageFetcher {
    pub fn new(access_token: impl Into<String>) -> anyhow::Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            access_token: access_token.into(),
        })
    }

    async fn download(&self, url: &str) -> anyhow::Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .header("X-Emby-Token", &self.access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("image fetch returned status: {}", response.status());
        }

        Ok(response.bytes().await?.to_vec())
    }
}

impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> Option<Image> {
        let bytes = match self.download(url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("[image] fetch failed for {}: {}", url, e);
                return None;
            }
        };

        let url_owned = url.to_string();
        // Decoding a full-size backdrop is CPU-bound; keep it off the async workers.
        let decoded = tokio::task::spawn_blocking(move || decode_image(&url_owned, &bytes)).await;
        match decoded {
            Ok(Ok(image)) => {
                debug!("[image] decoded {}x{} from {}", image.width, image.height, url);
                Some(image)
            }
            Ok(Err(e)) => {
                warn!("[image] {}", e);
                None
            }
            Err(e) => {
                warn!("[image] decode task failed: {}", e);
                None
            }
        }
    }
}

pub fn decode_image(source_url: &str, bytes: &[u8]) -> anyhow::Result<Image> {
    let image = image::load_from_memory(bytes)
        .map_err(|e| anyhow::anyhow!("failed to decode {}: {}", source_url, e))?;
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(Image {
        source_url: source_url.to_string(),
        width,
        height,
        pixels: Arc::from(rgba.into_raw()),
    })
}
