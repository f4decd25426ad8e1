use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use client_core::{
    download_image, load_settings, share_caption, share_image, validation, DownloadOutcome,
    HttpGenerationClient, HttpImageFetcher, ResultPresenter, Settings, ShareOutcome,
    UploadWorkflow, WorkflowEvent, WorkflowState,
};
use shared::{
    domain::{CandidateFile, GeneratedImageRef, ShareTarget},
    error::ValidationError,
};
use tokio::io::AsyncReadExt;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod platform;
mod presenter;

use platform::{declared_mime_type, SystemClipboard, SystemOpener};
use presenter::TerminalPresenter;

#[derive(Parser, Debug)]
#[command(name = "pup", about = "Transform dog photos with the generation service")]
struct Cli {
    /// Overrides `api_base_url` from pup.toml / the environment.
    #[arg(long, global = true)]
    api_base_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload a photo and show the original next to the result.
    Transform {
        path: PathBuf,
        #[arg(long)]
        download: bool,
        #[arg(long)]
        out_dir: Option<PathBuf>,
        #[arg(long, value_enum)]
        share: Option<ShareArg>,
    },
    /// Save a generated image reference to disk.
    Download {
        reference: String,
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Share a generated image reference.
    Share {
        #[arg(value_enum)]
        target: ShareArg,
        reference: String,
    },
    /// Print the picker filter and the types that pass validation.
    Accepts,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ShareArg {
    Instagram,
    Facebook,
}

impl From<ShareArg> for ShareTarget {
    fn from(value: ShareArg) -> Self {
        match value {
            ShareArg::Instagram => ShareTarget::Instagram,
            ShareArg::Facebook => ShareTarget::Facebook,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings();
    if let Some(base_url) = cli.api_base_url {
        settings.api_base_url = base_url;
    }

    match cli.command {
        Command::Transform {
            path,
            download,
            out_dir,
            share,
        } => {
            let out_dir = out_dir.unwrap_or_else(|| settings.download_dir.clone());
            let generated = transform(&settings, &path).await?;
            if download {
                run_download(&settings, &generated, &out_dir).await?;
            }
            if let Some(target) = share {
                run_share(&settings, target.into(), &generated)?;
            }
        }
        Command::Download { reference, out_dir } => {
            let out_dir = out_dir.unwrap_or_else(|| settings.download_dir.clone());
            run_download(&settings, &parse_reference(&reference), &out_dir).await?;
        }
        Command::Share { target, reference } => {
            run_share(&settings, target.into(), &parse_reference(&reference))?;
        }
        Command::Accepts => {
            println!("picker filter: {}", validation::ACCEPT_FILTER.join(","));
            println!("accepted:      {}", validation::ALLOWED_MIME_TYPES.join(","));
            println!("max size:      {} bytes", validation::MAX_UPLOAD_BYTES);
        }
    }

    Ok(())
}

async fn transform(settings: &Settings, path: &Path) -> Result<GeneratedImageRef> {
    let file = read_candidate(path).await?;

    let api = Arc::new(HttpGenerationClient::new(&settings.api_base_url));
    info!(endpoint = %api.endpoint(), "using generation endpoint");
    let workflow = UploadWorkflow::new(api);

    let mut events = workflow.subscribe();
    let event_log = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                WorkflowEvent::StateChanged(snapshot) => {
                    debug!(phase = ?snapshot.phase, error = ?snapshot.error, "workflow event")
                }
                WorkflowEvent::SelectionRejected(message) => {
                    debug!(%message, "workflow rejected selection")
                }
            }
        }
    });

    let result = drive_workflow(&workflow, file).await;
    workflow.reset().await;
    event_log.abort();
    result
}

/// Loads a picked file without buffering anything past the upload limit.
async fn read_candidate(path: &Path) -> Result<CandidateFile> {
    let metadata = tokio::fs::metadata(path)
        .await
        .with_context(|| format!("failed to stat {}", path.display()))?;
    if metadata.len() > validation::MAX_UPLOAD_BYTES {
        info!(path = %path.display(), size = metadata.len(), "rejecting oversized file before reading");
        return Err(ValidationError::TooLarge {
            size: metadata.len(),
        }
        .into());
    }

    let handle = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("failed to open {}", path.display()))?;
    // The file may grow after the stat; one byte past the limit is enough for `validate`.
    let mut bytes = Vec::new();
    handle
        .take(validation::MAX_UPLOAD_BYTES + 1)
        .read_to_end(&mut bytes)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;

    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("upload.bin")
        .to_string();
    Ok(CandidateFile::new(name, declared_mime_type(path), bytes))
}

async fn drive_workflow(
    workflow: &Arc<UploadWorkflow>,
    file: CandidateFile,
) -> Result<GeneratedImageRef> {
    let mut presenter = TerminalPresenter::new(std::io::stdout());

    if let Err(err) = workflow.select_file(file).await {
        bail!("{err}");
    }
    let Some(upload) = workflow.confirm_transform().await else {
        bail!("no file selected for upload");
    };
    if let Some(view) = workflow.comparison_view().await {
        presenter.render(&view);
    }
    upload.await.context("upload task failed")?;

    match workflow.state().await {
        WorkflowState::Completed { generated, .. } => {
            if let Some(view) = workflow.comparison_view().await {
                presenter.render(&view);
            }
            Ok(generated)
        }
        WorkflowState::Failed { message, .. } => bail!("transformation failed: {message}"),
        other => bail!("unexpected workflow state after upload: {:?}", other.phase()),
    }
}

async fn run_download(
    settings: &Settings,
    generated: &GeneratedImageRef,
    out_dir: &Path,
) -> Result<()> {
    tokio::fs::create_dir_all(out_dir)
        .await
        .with_context(|| format!("failed to create {}", out_dir.display()))?;
    let outcome = download_image(
        &HttpImageFetcher::new(),
        &SystemOpener,
        generated,
        out_dir,
        &settings.download_file_stem,
    )
    .await?;
    match outcome {
        DownloadOutcome::Saved(path) => println!("Saved image to {}", path.display()),
        DownloadOutcome::OpenedExternally { reason } => {
            println!("Could not save the image ({reason}); opened it in your viewer instead")
        }
    }
    Ok(())
}

fn run_share(settings: &Settings, target: ShareTarget, generated: &GeneratedImageRef) -> Result<()> {
    let caption = share_caption(&settings.share_hashtag, &settings.share_mention);
    let mut clipboard = SystemClipboard::default();
    let outcome = share_image(target, generated, &caption, &mut clipboard, &SystemOpener)?;
    match outcome {
        ShareOutcome::CopiedToClipboard { notice } => println!("{notice}"),
        ShareOutcome::OpenedShareDialog { url } => println!("Opened share dialog: {url}"),
        ShareOutcome::OpenedFallback { url, reason } => {
            println!("Clipboard unavailable ({reason}); opened {url}")
        }
    }
    Ok(())
}

fn parse_reference(raw: &str) -> GeneratedImageRef {
    let raw = raw.trim();
    if raw.starts_with("http://") || raw.starts_with("https://") {
        GeneratedImageRef::Url(raw.to_string())
    } else {
        GeneratedImageRef::Inline(raw.to_string())
    }
}
