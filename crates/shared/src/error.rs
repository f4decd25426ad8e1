use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse classification of everything that can go wrong in a session.
/// None of them are fatal: the user reselects, retries, or the action degrades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Transport,
    Server,
    Resource,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please upload a JPG or PNG image file.")]
    UnsupportedType { mime_type: String },
    #[error("Image size must be less than 10MB.")]
    TooLarge { size: u64 },
}

impl ValidationError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }
}

/// Failure of a single generation request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    #[error("HTTP error! status: {status}")]
    Http { status: u16 },
    #[error("{0}")]
    Transport(String),
    #[error("invalid response from server: {0}")]
    Decode(String),
    #[error("{0}")]
    Server(String),
    #[error("No image data received from server")]
    NoImageData,
}

impl UploadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Http { .. } | Self::Transport(_) | Self::Decode(_) => ErrorKind::Transport,
            Self::Server(_) | Self::NoImageData => ErrorKind::Server,
        }
    }
}
