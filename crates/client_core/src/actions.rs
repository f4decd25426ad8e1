//! Download and share actions on a generated image.
//!
//! Both are one-shot and best effort. The platform pieces (clipboard, opening
//! a URL in an external viewer) sit behind traits so the fallback paths are
//! observable as return values.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use shared::{
    domain::{GeneratedImageRef, ShareTarget},
    error::ErrorKind,
};
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

pub const DOWNLOAD_EXTENSION: &str = "jpg";
pub const FACEBOOK_SHARER_URL: &str = "https://www.facebook.com/sharer/sharer.php";
pub const INSTAGRAM_HOME_URL: &str = "https://www.instagram.com/";
pub const INSTAGRAM_COPY_NOTICE: &str = "Image URL copied! You can now paste it in Instagram.";

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("failed to fetch image: {0}")]
    Fetch(String),
    #[error("invalid inline image payload: {0}")]
    Decode(String),
    #[error("failed to save image to {}: {source}", .path.display())]
    Save {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("clipboard unavailable: {0}")]
    Clipboard(String),
    #[error("failed to open {target}: {reason}")]
    Open { target: String, reason: String },
    #[error("invalid share url: {0}")]
    InvalidUrl(String),
    #[error("{primary}; fallback also failed: {fallback}")]
    FallbackFailed {
        primary: Box<ActionError>,
        fallback: Box<ActionError>,
    },
}

impl ActionError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Resource
    }
}

#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ActionError>;
}

/// Opens a URL or file in whatever the platform uses to view it.
pub trait ExternalOpener {
    fn open(&self, target: &str) -> Result<(), ActionError>;
}

pub trait ClipboardWriter {
    fn write_text(&mut self, text: &str) -> Result<(), ActionError>;
}

pub struct HttpImageFetcher {
    http: Client,
}

impl HttpImageFetcher {
    pub fn new() -> Self {
        Self {
            http: Client::new(),
        }
    }
}

impl Default for HttpImageFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ActionError> {
        let bytes = self
            .http
            .get(url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|err| ActionError::Fetch(err.to_string()))?
            .bytes()
            .await
            .map_err(|err| ActionError::Fetch(err.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Saved(PathBuf),
    OpenedExternally { reason: String },
}

/// Saves the image as `{dir}/{file_stem}.jpg`, whatever its real format.
/// On any failure the reference is handed to `opener` once instead.
pub async fn download_image(
    fetcher: &dyn ImageFetcher,
    opener: &dyn ExternalOpener,
    reference: &GeneratedImageRef,
    dir: &Path,
    file_stem: &str,
) -> Result<DownloadOutcome, ActionError> {
    match save_image(fetcher, reference, dir, file_stem).await {
        Ok(path) => {
            info!(path = %path.display(), "download: image saved");
            Ok(DownloadOutcome::Saved(path))
        }
        Err(err) => {
            warn!(error = %err, "download: opening image externally instead");
            match opener.open(reference.as_str()) {
                Ok(()) => Ok(DownloadOutcome::OpenedExternally {
                    reason: err.to_string(),
                }),
                Err(fallback) => Err(ActionError::FallbackFailed {
                    primary: Box::new(err),
                    fallback: Box::new(fallback),
                }),
            }
        }
    }
}

async fn save_image(
    fetcher: &dyn ImageFetcher,
    reference: &GeneratedImageRef,
    dir: &Path,
    file_stem: &str,
) -> Result<PathBuf, ActionError> {
    let bytes = match reference {
        GeneratedImageRef::Url(url) if url.starts_with("data:") => decode_inline(url)?,
        GeneratedImageRef::Url(url) => fetcher.fetch(url).await?,
        GeneratedImageRef::Inline(payload) => decode_inline(payload)?,
    };

    let path = dir.join(format!("{file_stem}.{DOWNLOAD_EXTENSION}"));
    tokio::fs::write(&path, &bytes)
        .await
        .map_err(|source| ActionError::Save {
            path: path.clone(),
            source,
        })?;
    Ok(path)
}

/// Accepts bare base64 or a `data:<mime>;base64,<payload>` URL.
pub fn decode_inline(payload: &str) -> Result<Vec<u8>, ActionError> {
    let encoded = match payload.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => payload,
    };
    STANDARD
        .decode(encoded.trim())
        .map_err(|err| ActionError::Decode(err.to_string()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareOutcome {
    CopiedToClipboard { notice: &'static str },
    OpenedShareDialog { url: String },
    OpenedFallback { url: String, reason: String },
}

pub fn share_caption(hashtag: &str, mention: &str) -> String {
    format!("Check out my pup's amazing transformation! {hashtag} {mention}")
}

pub fn facebook_share_url(reference: &str, caption: &str) -> Result<Url, ActionError> {
    Url::parse_with_params(FACEBOOK_SHARER_URL, &[("u", reference), ("quote", caption)])
        .map_err(|err| ActionError::InvalidUrl(err.to_string()))
}

pub fn share_image(
    target: ShareTarget,
    reference: &GeneratedImageRef,
    caption: &str,
    clipboard: &mut dyn ClipboardWriter,
    opener: &dyn ExternalOpener,
) -> Result<ShareOutcome, ActionError> {
    match target {
        ShareTarget::Instagram => {
            let text = format!("{caption}\n\nImage: {reference}");
            match clipboard.write_text(&text) {
                Ok(()) => {
                    info!("share: caption copied for instagram");
                    Ok(ShareOutcome::CopiedToClipboard {
                        notice: INSTAGRAM_COPY_NOTICE,
                    })
                }
                Err(err) => {
                    warn!(error = %err, "share: clipboard failed, opening instagram");
                    match opener.open(INSTAGRAM_HOME_URL) {
                        Ok(()) => Ok(ShareOutcome::OpenedFallback {
                            url: INSTAGRAM_HOME_URL.to_string(),
                            reason: err.to_string(),
                        }),
                        Err(fallback) => Err(ActionError::FallbackFailed {
                            primary: Box::new(err),
                            fallback: Box::new(fallback),
                        }),
                    }
                }
            }
        }
        ShareTarget::Facebook => {
            let url = facebook_share_url(reference.as_str(), caption)?;
            opener.open(url.as_str())?;
            info!("share: facebook dialog opened");
            Ok(ShareOutcome::OpenedShareDialog { url: url.into() })
        }
    }
}

#[cfg(test)]
#[path = "tests/actions_tests.rs"]
mod tests;
