use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }
    };
}

id_newtype!(PreviewId);

/// A file the user picked, held between selection and upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl CandidateFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Local handle to a selected file's bytes, valid until released.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PreviewReference {
    id: PreviewId,
}

impl PreviewReference {
    pub fn new(id: PreviewId) -> Self {
        Self { id }
    }

    pub fn id(&self) -> PreviewId {
        self.id
    }
}

impl fmt::Display for PreviewReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "blob:pup-preview/{}", self.id.0)
    }
}

/// The transformed image as returned by the generation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum GeneratedImageRef {
    Url(String),
    /// Base64 payload, bare or wrapped in a `data:` URL.
    Inline(String),
}

impl GeneratedImageRef {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Url(url) => url,
            Self::Inline(payload) => payload,
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Url(_))
    }
}

impl fmt::Display for GeneratedImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowPhase {
    Idle,
    FileSelected,
    Uploading,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShareTarget {
    Instagram,
    Facebook,
}
