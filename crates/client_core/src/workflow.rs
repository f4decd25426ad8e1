//! Upload session state machine.
//!
//! One [`UploadWorkflow`] per user session. It is the only owner of the
//! selected file and its preview; observers read [`WorkflowSnapshot`]s or
//! subscribe to [`WorkflowEvent`]s.

use std::{mem, sync::Arc};

use shared::{
    domain::{CandidateFile, GeneratedImageRef, PreviewReference, WorkflowPhase},
    error::ValidationError,
};
use thiserror::Error;
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{
    presenter::ComparisonView,
    preview::{PreviewManager, PreviewStats},
    validation::validate,
    GenerationApi, UploadResult,
};

const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowState {
    Idle,
    FileSelected {
        file: CandidateFile,
        preview: PreviewReference,
    },
    Uploading {
        file: CandidateFile,
        preview: PreviewReference,
    },
    Completed {
        preview: PreviewReference,
        generated: GeneratedImageRef,
    },
    Failed {
        message: String,
        previous: Option<CandidateFile>,
    },
}

impl WorkflowState {
    pub fn phase(&self) -> WorkflowPhase {
        match self {
            Self::Idle => WorkflowPhase::Idle,
            Self::FileSelected { .. } => WorkflowPhase::FileSelected,
            Self::Uploading { .. } => WorkflowPhase::Uploading,
            Self::Completed { .. } => WorkflowPhase::Completed,
            Self::Failed { .. } => WorkflowPhase::Failed,
        }
    }

    pub fn preview(&self) -> Option<&PreviewReference> {
        match self {
            Self::FileSelected { preview, .. }
            | Self::Uploading { preview, .. }
            | Self::Completed { preview, .. } => Some(preview),
            Self::Idle | Self::Failed { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowSnapshot {
    pub phase: WorkflowPhase,
    pub file_name: Option<String>,
    pub preview: Option<PreviewReference>,
    pub generated: Option<GeneratedImageRef>,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub enum WorkflowEvent {
    StateChanged(WorkflowSnapshot),
    SelectionRejected(String),
}

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Rejected(#[from] ValidationError),
    #[error("an upload is already in progress")]
    UploadInFlight,
}

struct WorkflowInner {
    state: WorkflowState,
    previews: PreviewManager,
    last_error: Option<String>,
}

impl WorkflowInner {
    fn release_held_preview(&mut self) {
        if let Some(preview) = self.state.preview() {
            self.previews.release_preview(preview);
        }
    }

    fn snapshot(&self) -> WorkflowSnapshot {
        let file_name = match &self.state {
            WorkflowState::FileSelected { file, .. } | WorkflowState::Uploading { file, .. } => {
                Some(file.name.clone())
            }
            WorkflowState::Failed {
                previous: Some(file),
                ..
            } => Some(file.name.clone()),
            _ => None,
        };
        let generated = match &self.state {
            WorkflowState::Completed { generated, .. } => Some(generated.clone()),
            _ => None,
        };
        let error = match &self.state {
            WorkflowState::Failed { message, .. } => Some(message.clone()),
            _ => self.last_error.clone(),
        };

        WorkflowSnapshot {
            phase: self.state.phase(),
            file_name,
            preview: self.state.preview().cloned(),
            generated,
            error,
        }
    }
}

pub struct UploadWorkflow {
    api: Arc<dyn GenerationApi>,
    inner: Mutex<WorkflowInner>,
    events: broadcast::Sender<WorkflowEvent>,
}

impl UploadWorkflow {
    pub fn new(api: Arc<dyn GenerationApi>) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new(Self {
            api,
            inner: Mutex::new(WorkflowInner {
                state: WorkflowState::Idle,
                previews: PreviewManager::new(),
                last_error: None,
            }),
            events,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> WorkflowSnapshot {
        self.inner.lock().await.snapshot()
    }

    pub async fn state(&self) -> WorkflowState {
        self.inner.lock().await.state.clone()
    }

    /// Validates `file` and, if accepted, makes it the current selection.
    /// A rejected file leaves the current state untouched.
    pub async fn select_file(
        &self,
        file: CandidateFile,
    ) -> Result<PreviewReference, WorkflowError> {
        let mut inner = self.inner.lock().await;
        if matches!(inner.state, WorkflowState::Uploading { .. }) {
            debug!(file = %file.name, "workflow: selection ignored while uploading");
            return Err(WorkflowError::UploadInFlight);
        }

        if let Err(err) = validate(&file) {
            info!(
                file = %file.name,
                mime_type = %file.mime_type,
                size = file.size(),
                reason = %err,
                "workflow: selection rejected"
            );
            let message = err.to_string();
            inner.last_error = Some(message.clone());
            let _ = self.events.send(WorkflowEvent::SelectionRejected(message));
            return Err(err.into());
        }

        inner.release_held_preview();
        let preview = inner.previews.create_preview(&file);
        info!(file = %file.name, preview = %preview, "workflow: file selected");
        inner.state = WorkflowState::FileSelected {
            file,
            preview: preview.clone(),
        };
        inner.last_error = None;
        self.publish(&inner);
        Ok(preview)
    }

    /// Starts the upload for the current selection. Returns `None` without
    /// side effects unless a file is selected and nothing is in flight.
    pub async fn confirm_transform(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let file = {
            let mut inner = self.inner.lock().await;
            match mem::replace(&mut inner.state, WorkflowState::Idle) {
                WorkflowState::FileSelected { file, preview } => {
                    let upload = file.clone();
                    inner.state = WorkflowState::Uploading { file, preview };
                    inner.last_error = None;
                    self.publish(&inner);
                    upload
                }
                other => {
                    debug!(phase = ?other.phase(), "workflow: confirm ignored");
                    inner.state = other;
                    return None;
                }
            }
        };

        info!(file = %file.name, "workflow: upload started");
        let workflow = Arc::clone(self);
        Some(tokio::spawn(async move {
            let result = workflow.api.submit(&file).await;
            workflow.finish_upload(result).await;
        }))
    }

    async fn finish_upload(&self, result: UploadResult) {
        let mut inner = self.inner.lock().await;
        match mem::replace(&mut inner.state, WorkflowState::Idle) {
            WorkflowState::Uploading { file, preview } => match result {
                Ok(generated) => {
                    info!(file = %file.name, generated = %generated, "workflow: upload completed");
                    inner.state = WorkflowState::Completed { preview, generated };
                }
                Err(err) => {
                    warn!(file = %file.name, error = %err, "workflow: upload failed");
                    inner.previews.release_preview(&preview);
                    inner.state = WorkflowState::Failed {
                        message: err.to_string(),
                        previous: Some(file),
                    };
                }
            },
            other => {
                warn!(phase = ?other.phase(), "workflow: upload result arrived outside upload; dropped");
                inner.state = other;
                return;
            }
        }
        self.publish(&inner);
    }

    /// From `Failed`, reselects the file that failed so it can be confirmed
    /// again. Elsewhere it only clears a surfaced error.
    pub async fn retry(&self) -> WorkflowPhase {
        let mut inner = self.inner.lock().await;
        match mem::replace(&mut inner.state, WorkflowState::Idle) {
            WorkflowState::Failed {
                previous: Some(file),
                ..
            } => {
                let preview = inner.previews.create_preview(&file);
                info!(file = %file.name, preview = %preview, "workflow: retrying selection");
                inner.state = WorkflowState::FileSelected { file, preview };
            }
            WorkflowState::Failed { previous: None, .. } => {}
            other => {
                inner.state = other;
                if inner.last_error.take().is_none() {
                    return inner.state.phase();
                }
            }
        }
        inner.last_error = None;
        self.publish(&inner);
        inner.state.phase()
    }

    /// Drops the selection and any result. Ignored while uploading.
    pub async fn reset(&self) {
        let mut inner = self.inner.lock().await;
        match inner.state {
            WorkflowState::Uploading { .. } => {
                debug!("workflow: reset ignored while uploading");
                return;
            }
            WorkflowState::Idle if inner.last_error.is_none() => return,
            _ => {}
        }

        inner.release_held_preview();
        inner.state = WorkflowState::Idle;
        inner.last_error = None;
        info!("workflow: reset");
        self.publish(&inner);
    }

    /// View for the presenter: loading while uploading, side by side once
    /// completed, nothing otherwise.
    pub async fn comparison_view(&self) -> Option<ComparisonView> {
        let inner = self.inner.lock().await;
        match &inner.state {
            WorkflowState::Uploading { preview, .. } => {
                Some(ComparisonView::new(preview.to_string(), String::new(), true))
            }
            WorkflowState::Completed { preview, generated } => Some(ComparisonView::new(
                preview.to_string(),
                generated.as_str(),
                false,
            )),
            _ => None,
        }
    }

    pub async fn resolve_preview(&self, reference: &PreviewReference) -> Option<Arc<[u8]>> {
        self.inner.lock().await.previews.resolve(reference)
    }

    pub async fn preview_stats(&self) -> PreviewStats {
        self.inner.lock().await.previews.stats()
    }

    pub async fn live_previews(&self) -> usize {
        self.inner.lock().await.previews.live_count()
    }

    fn publish(&self, inner: &WorkflowInner) {
        let _ = self
            .events
            .send(WorkflowEvent::StateChanged(inner.snapshot()));
    }
}

impl Drop for UploadWorkflow {
    fn drop(&mut self) {
        self.inner.get_mut().release_held_preview();
    }
}

#[cfg(test)]
#[path = "tests/workflow_tests.rs"]
mod tests;
