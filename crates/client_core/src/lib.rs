use async_trait::async_trait;
use reqwest::{multipart, Client};
use shared::{
    domain::{CandidateFile, GeneratedImageRef},
    error::UploadError,
    protocol::{GenerateResponse, IMAGE_FIELD},
};
use tracing::{info, warn};

pub mod actions;
pub mod config;
pub mod presenter;
pub mod preview;
pub mod validation;
pub mod workflow;

pub use actions::{
    download_image, share_caption, share_image, ActionError, ClipboardWriter, DownloadOutcome,
    ExternalOpener, HttpImageFetcher, ImageFetcher, ShareOutcome,
};
pub use config::{generate_endpoint, load_settings, Settings};
pub use presenter::{ComparisonView, Panel, ResultPresenter};
pub use preview::{PreviewManager, PreviewStats};
pub use validation::{validate, ACCEPT_FILTER, ALLOWED_MIME_TYPES, MAX_UPLOAD_BYTES};
pub use workflow::{UploadWorkflow, WorkflowError, WorkflowEvent, WorkflowSnapshot, WorkflowState};

pub type UploadResult = Result<GeneratedImageRef, UploadError>;

const GENERIC_SERVER_FAILURE: &str = "Failed to generate image";

/// The remote image generation service.
#[async_trait]
pub trait GenerationApi: Send + Sync {
    /// One attempt, no retry. Failures come back as values.
    async fn submit(&self, file: &CandidateFile) -> UploadResult;
}

pub struct HttpGenerationClient {
    http: Client,
    endpoint: String,
}

impl HttpGenerationClient {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: &str) -> Self {
        Self {
            http,
            endpoint: generate_endpoint(base_url),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post_image(&self, file: &CandidateFile) -> UploadResult {
        let part = multipart::Part::bytes(file.bytes.clone())
            .file_name(file.name.clone())
            .mime_str(&file.mime_type)
            .map_err(|err| UploadError::Transport(err.to_string()))?;
        let form = multipart::Form::new().part(IMAGE_FIELD, part);

        let response = self
            .http
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|err| UploadError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::Http {
                status: status.as_u16(),
            });
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|err| UploadError::Decode(err.to_string()))?;
        interpret_response(body)
    }
}

#[async_trait]
impl GenerationApi for HttpGenerationClient {
    async fn submit(&self, file: &CandidateFile) -> UploadResult {
        info!(
            endpoint = %self.endpoint,
            file = %file.name,
            size = file.size(),
            "upload: submitting image"
        );
        let result = self.post_image(file).await;
        match &result {
            Ok(generated) => info!(remote = generated.is_remote(), "upload: image generated"),
            Err(err) => warn!(kind = ?err.kind(), error = %err, "upload: generation failed"),
        }
        result
    }
}

/// Maps a decoded 2xx envelope onto an upload outcome. `imageUrl` wins over
/// `base64Image` when both are present.
pub fn interpret_response(response: GenerateResponse) -> UploadResult {
    if !response.success {
        let message = response
            .error
            .filter(|message| !message.trim().is_empty())
            .unwrap_or_else(|| GENERIC_SERVER_FAILURE.to_string());
        return Err(UploadError::Server(message));
    }

    if let Some(url) = response.image_url() {
        return Ok(GeneratedImageRef::Url(url.to_string()));
    }
    if let Some(payload) = response.base64_image() {
        return Ok(GeneratedImageRef::Inline(payload.to_string()));
    }
    Err(UploadError::NoImageData)
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
