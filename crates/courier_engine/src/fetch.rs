use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;

use bytes::BytesMut;
use courier_core::ImageRef;
use courier_logging::{courier_debug, courier_warn};
use futures_util::future::join_all;
use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;

use crate::{FailureKind, FetchError, FetchMetadata, FetchOutput, FetchedImage, ImageMap};

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) courier/0.1";

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub image_timeout: Duration,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    pub max_image_bytes: u64,
    pub allowed_content_types: Vec<String>,
    pub user_agent: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            image_timeout: Duration::from_secs(20),
            redirect_limit: 5,
            max_bytes: 5 * 1024 * 1024,
            max_image_bytes: 10 * 1024 * 1024,
            allowed_content_types: vec![
                "text/html".to_string(),
                "application/xhtml+xml".to_string(),
            ],
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    /// Downloads an HTML page.
    async fn fetch_page(&self, url: &str) -> Result<FetchOutput, FetchError>;

    /// Downloads one image binary.
    async fn fetch_image(&self, url: &str) -> Result<FetchOutput, FetchError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resource {
    Page,
    Image,
}

#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    settings: FetchSettings,
}

impl ReqwestFetcher {
    pub fn new(settings: FetchSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &FetchSettings {
        &self.settings
    }

    fn build_client(
        &self,
        timeout: Duration,
        redirect_counter: Arc<AtomicUsize>,
    ) -> Result<reqwest::Client, FetchError> {
        let redirect_limit = self.settings.redirect_limit;
        let policy = reqwest::redirect::Policy::custom(move |attempt| {
            let count = attempt.previous().len();
            redirect_counter.store(count, Ordering::Relaxed);
            if count >= redirect_limit {
                attempt.error("redirect limit exceeded")
            } else {
                attempt.follow()
            }
        });

        reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .timeout(timeout)
            .user_agent(self.settings.user_agent.clone())
            .redirect(policy)
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))
    }

    fn is_content_type_allowed(&self, resource: Resource, content_type: &str) -> bool {
        let ct = content_type.split(';').next().unwrap_or(content_type).trim();
        match resource {
            Resource::Page => self
                .settings
                .allowed_content_types
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(ct)),
            // CDNs regularly mislabel images; the packager sniffs the bytes anyway.
            Resource::Image => {
                ct.to_ascii_lowercase().starts_with("image/")
                    || ct.eq_ignore_ascii_case("application/octet-stream")
                    || ct.eq_ignore_ascii_case("binary/octet-stream")
            }
        }
    }

    async fn fetch_resource(&self, url: &str, resource: Resource) -> Result<FetchOutput, FetchError> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FetchError::new(
                FailureKind::InvalidUrl,
                format!("unsupported scheme {}", parsed.scheme()),
            ));
        }

        let (timeout, max_bytes) = match resource {
            Resource::Page => (self.settings.request_timeout, self.settings.max_bytes),
            Resource::Image => (self.settings.image_timeout, self.settings.max_image_bytes),
        };
        let redirect_counter = Arc::new(AtomicUsize::new(0));
        let client = self.build_client(timeout, redirect_counter.clone())?;

        let response = client
            .get(parsed)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let kind = match status.as_u16() {
                404 | 410 => FailureKind::NotFound,
                code => FailureKind::HttpStatus(code),
            };
            return Err(FetchError::new(kind, status.to_string()));
        }

        if let Some(content_len) = response.content_length() {
            if content_len > max_bytes {
                return Err(FetchError::new(
                    FailureKind::TooLarge {
                        max_bytes,
                        actual: Some(content_len),
                    },
                    "response too large",
                ));
            }
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        if let Some(ct) = content_type.as_deref() {
            if !self.is_content_type_allowed(resource, ct) {
                return Err(FetchError::new(
                    FailureKind::UnsupportedContentType {
                        content_type: ct.to_string(),
                    },
                    "unsupported content type",
                ));
            }
        }

        let mut bytes = BytesMut::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > max_bytes {
                return Err(FetchError::new(
                    FailureKind::TooLarge {
                        max_bytes,
                        actual: Some(next_len),
                    },
                    "response too large",
                ));
            }
            bytes.extend_from_slice(&chunk);
        }

        let metadata = FetchMetadata {
            original_url: url.to_string(),
            final_url,
            redirect_count: redirect_counter.load(Ordering::Relaxed),
            content_type,
            byte_len: bytes.len() as u64,
        };
        courier_debug!(
            "Fetched {:?} url={} bytes={} redirects={}",
            resource,
            metadata.final_url,
            metadata.byte_len,
            metadata.redirect_count
        );

        Ok(FetchOutput {
            bytes: bytes.freeze(),
            metadata,
        })
    }
}

#[async_trait::async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch_page(&self, url: &str) -> Result<FetchOutput, FetchError> {
        self.fetch_resource(url, Resource::Page).await
    }

    async fn fetch_image(&self, url: &str) -> Result<FetchOutput, FetchError> {
        self.fetch_resource(url, Resource::Image).await
    }
}

/// Downloads every referenced image concurrently.
///
/// Individual failures are logged and leave the image out of the map; they
/// never fail the whole batch.
pub async fn fetch_images(fetcher: &dyn Fetcher, images: &[ImageRef]) -> ImageMap {
    let downloads = images.iter().map(|image| async move {
        let result = fetcher.fetch_image(&image.original_url).await;
        (image, result)
    });

    let mut map = ImageMap::with_capacity(images.len());
    for (image, result) in join_all(downloads).await {
        match result {
            Ok(output) if !output.bytes.is_empty() => {
                map.insert(
                    image.local_id.clone(),
                    FetchedImage {
                        bytes: output.bytes,
                        content_type: output.metadata.content_type,
                    },
                );
            }
            Ok(_) => {
                courier_warn!("Image {} was empty: {}", image.local_id, image.original_url);
            }
            Err(err) => {
                courier_warn!(
                    "Image {} could not be fetched from {}: {}",
                    image.local_id,
                    image.original_url,
                    err
                );
            }
        }
    }
    map
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_redirect() {
        return FetchError::new(FailureKind::RedirectLimitExceeded, err.to_string());
    }
    if err.is_builder() {
        return FetchError::new(FailureKind::InvalidUrl, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}
