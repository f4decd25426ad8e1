use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use shared::error::UploadError;
use tokio::sync::Notify;

use crate::presenter::{Panel, ResultPresenter};

struct ScriptedApi {
    result: UploadResult,
    calls: AtomicUsize,
    gate: Option<Notify>,
}

impl ScriptedApi {
    fn ok(url: &str) -> Arc<Self> {
        Arc::new(Self {
            result: Ok(GeneratedImageRef::Url(url.to_string())),
            calls: AtomicUsize::new(0),
            gate: None,
        })
    }

    fn failing(err: UploadError) -> Arc<Self> {
        Arc::new(Self {
            result: Err(err),
            calls: AtomicUsize::new(0),
            gate: None,
        })
    }

    fn gated(url: &str) -> Arc<Self> {
        Arc::new(Self {
            result: Ok(GeneratedImageRef::Url(url.to_string())),
            calls: AtomicUsize::new(0),
            gate: Some(Notify::new()),
        })
    }

    fn open_gate(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationApi for ScriptedApi {
    async fn submit(&self, _file: &CandidateFile) -> UploadResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.result.clone()
    }
}

#[derive(Default)]
struct RecordingPresenter {
    views: Vec<ComparisonView>,
}

impl ResultPresenter for RecordingPresenter {
    fn render(&mut self, view: &ComparisonView) {
        self.views.push(view.clone());
    }
}

fn png(name: &str) -> CandidateFile {
    CandidateFile::new(name, "image/png", vec![7u8; 64])
}

async fn next_phase(rx: &mut broadcast::Receiver<WorkflowEvent>) -> WorkflowPhase {
    loop {
        match rx.recv().await.expect("event") {
            WorkflowEvent::StateChanged(snapshot) => return snapshot.phase,
            WorkflowEvent::SelectionRejected(_) => continue,
        }
    }
}

#[tokio::test]
async fn successful_upload_reaches_completed_and_feeds_presenter() {
    let api = ScriptedApi::ok("https://x/y.jpg");
    let workflow = UploadWorkflow::new(api.clone());
    let mut events = workflow.subscribe();

    assert_eq!(workflow.snapshot().await.phase, WorkflowPhase::Idle);

    let preview = workflow.select_file(png("rex.png")).await.expect("select");
    assert_eq!(next_phase(&mut events).await, WorkflowPhase::FileSelected);
    assert_eq!(
        workflow.resolve_preview(&preview).await.as_deref(),
        Some(vec![7u8; 64].as_slice())
    );

    let upload = workflow.confirm_transform().await.expect("upload started");
    assert_eq!(next_phase(&mut events).await, WorkflowPhase::Uploading);
    upload.await.expect("upload task");
    assert_eq!(next_phase(&mut events).await, WorkflowPhase::Completed);

    let snapshot = workflow.snapshot().await;
    assert_eq!(snapshot.preview.as_ref(), Some(&preview));
    assert_eq!(
        snapshot.generated,
        Some(GeneratedImageRef::Url("https://x/y.jpg".into()))
    );
    assert_eq!(snapshot.error, None);

    let mut presenter = RecordingPresenter::default();
    let view = workflow.comparison_view().await.expect("view");
    presenter.render(&view);
    assert_eq!(presenter.views.len(), 1);
    assert_eq!(presenter.views[0].original, preview.to_string());
    assert_eq!(presenter.views[0].generated, "https://x/y.jpg");
    assert!(!presenter.views[0].is_loading);
    assert_eq!(api.calls(), 1);
}

#[tokio::test]
async fn failed_upload_carries_message_and_reset_clears_everything() {
    let api = ScriptedApi::failing(UploadError::Server("quota exceeded".into()));
    let workflow = UploadWorkflow::new(api.clone());

    workflow.select_file(png("rex.png")).await.expect("select");
    workflow
        .confirm_transform()
        .await
        .expect("upload started")
        .await
        .expect("upload task");

    match workflow.state().await {
        WorkflowState::Failed { message, previous } => {
            assert_eq!(message, "quota exceeded");
            assert_eq!(previous.map(|file| file.name), Some("rex.png".to_string()));
        }
        other => panic!("expected failed state, got {other:?}"),
    }
    assert_eq!(workflow.live_previews().await, 0, "failure releases the preview");
    assert_eq!(
        workflow.snapshot().await.error.as_deref(),
        Some("quota exceeded")
    );

    workflow.reset().await;
    assert_eq!(workflow.state().await, WorkflowState::Idle);
    assert_eq!(workflow.live_previews().await, 0);
    let stats = workflow.preview_stats().await;
    assert_eq!(stats.created, stats.released);
}

#[tokio::test]
async fn double_confirm_issues_a_single_request() {
    let api = ScriptedApi::gated("https://x/y.jpg");
    let workflow = UploadWorkflow::new(api.clone());
    workflow.select_file(png("rex.png")).await.expect("select");

    let first = workflow.confirm_transform().await;
    let second = workflow.confirm_transform().await;
    assert!(first.is_some());
    assert!(second.is_none());
    assert_eq!(workflow.snapshot().await.phase, WorkflowPhase::Uploading);

    let view = workflow.comparison_view().await.expect("loading view");
    assert!(view.is_loading);
    assert!(matches!(view.panels().as_slice(), [Panel::Loading { .. }]));

    api.open_gate();
    first.expect("handle").await.expect("upload task");
    assert_eq!(api.calls(), 1);
    assert_eq!(workflow.snapshot().await.phase, WorkflowPhase::Completed);
}

#[tokio::test]
async fn selection_and_reset_are_ignored_while_uploading() {
    let api = ScriptedApi::gated("https://x/y.jpg");
    let workflow = UploadWorkflow::new(api.clone());
    workflow.select_file(png("rex.png")).await.expect("select");
    let upload = workflow.confirm_transform().await.expect("upload started");

    let err = workflow
        .select_file(png("other.png"))
        .await
        .expect_err("busy");
    assert!(matches!(err, WorkflowError::UploadInFlight));
    workflow.reset().await;
    assert_eq!(workflow.snapshot().await.phase, WorkflowPhase::Uploading);

    api.open_gate();
    upload.await.expect("upload task");
    assert_eq!(workflow.snapshot().await.phase, WorkflowPhase::Completed);
}

#[tokio::test]
async fn invalid_selection_stays_idle_and_surfaces_message() {
    let workflow = UploadWorkflow::new(ScriptedApi::ok("https://x/y.jpg"));
    let mut events = workflow.subscribe();

    let err = workflow
        .select_file(CandidateFile::new("rex.tiff", "image/tiff", vec![1]))
        .await
        .expect_err("rejected");
    assert!(matches!(
        err,
        WorkflowError::Rejected(ValidationError::UnsupportedType { .. })
    ));

    match events.recv().await.expect("event") {
        WorkflowEvent::SelectionRejected(message) => {
            assert_eq!(message, "Please upload a JPG or PNG image file.")
        }
        other => panic!("unexpected event {other:?}"),
    }

    let snapshot = workflow.snapshot().await;
    assert_eq!(snapshot.phase, WorkflowPhase::Idle);
    assert_eq!(
        snapshot.error.as_deref(),
        Some("Please upload a JPG or PNG image file.")
    );
    assert_eq!(workflow.preview_stats().await.created, 0);

    assert_eq!(workflow.retry().await, WorkflowPhase::Idle);
    assert_eq!(workflow.snapshot().await.error, None);
}

#[tokio::test]
async fn invalid_reselect_keeps_current_selection() {
    let workflow = UploadWorkflow::new(ScriptedApi::ok("https://x/y.jpg"));
    let preview = workflow.select_file(png("rex.png")).await.expect("select");

    let oversized = CandidateFile::new(
        "huge.png",
        "image/png",
        vec![0u8; (crate::MAX_UPLOAD_BYTES + 1) as usize],
    );
    assert!(workflow.select_file(oversized).await.is_err());

    let snapshot = workflow.snapshot().await;
    assert_eq!(snapshot.phase, WorkflowPhase::FileSelected);
    assert_eq!(snapshot.preview, Some(preview));
    assert_eq!(
        snapshot.error.as_deref(),
        Some("Image size must be less than 10MB.")
    );
}

#[tokio::test]
async fn every_preview_is_released_exactly_once() {
    let workflow = UploadWorkflow::new(ScriptedApi::ok("https://x/y.jpg"));

    let first = workflow.select_file(png("a.png")).await.expect("select a");
    let second = workflow.select_file(png("b.png")).await.expect("select b");
    assert_ne!(first, second);
    assert!(workflow.resolve_preview(&first).await.is_none());
    assert_eq!(workflow.live_previews().await, 1);

    workflow.reset().await;
    workflow.reset().await;
    workflow.select_file(png("c.png")).await.expect("select c");
    workflow
        .confirm_transform()
        .await
        .expect("upload")
        .await
        .expect("upload task");
    workflow.select_file(png("d.png")).await.expect("select d");
    workflow.reset().await;

    let stats = workflow.preview_stats().await;
    assert_eq!(stats.created, 4);
    assert_eq!(stats.released, 4);
    assert_eq!(workflow.live_previews().await, 0);
}

#[tokio::test]
async fn retry_after_failure_reselects_previous_file() {
    let api = ScriptedApi::failing(UploadError::Http { status: 500 });
    let workflow = UploadWorkflow::new(api.clone());
    workflow.select_file(png("rex.png")).await.expect("select");
    workflow
        .confirm_transform()
        .await
        .expect("upload")
        .await
        .expect("upload task");
    assert_eq!(
        workflow.snapshot().await.error.as_deref(),
        Some("HTTP error! status: 500")
    );

    assert_eq!(workflow.retry().await, WorkflowPhase::FileSelected);
    let snapshot = workflow.snapshot().await;
    assert_eq!(snapshot.file_name.as_deref(), Some("rex.png"));
    assert_eq!(snapshot.error, None);
    assert_eq!(workflow.live_previews().await, 1);

    assert!(workflow.confirm_transform().await.is_some());
}

#[tokio::test]
async fn confirm_without_selection_is_a_no_op() {
    let api = ScriptedApi::ok("https://x/y.jpg");
    let workflow = UploadWorkflow::new(api.clone());
    assert!(workflow.confirm_transform().await.is_none());
    assert_eq!(api.calls(), 0);
    assert!(workflow.comparison_view().await.is_none());
}
