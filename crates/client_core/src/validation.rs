//! Pre-upload checks on a picked file.

use shared::{domain::CandidateFile, error::ValidationError};

pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Types the generation service accepts.
pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/webp",
    "image/bmp",
];

/// Types offered by the file picker. Wider than [`ALLOWED_MIME_TYPES`]: TIFF
/// can be picked but is refused by [`validate`].
pub const ACCEPT_FILTER: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/webp",
    "image/tiff",
    "image/bmp",
];

pub fn is_allowed_mime(mime_type: &str) -> bool {
    let mime_type = mime_type.trim();
    ALLOWED_MIME_TYPES
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(mime_type))
}

pub fn passes_accept_filter(mime_type: &str) -> bool {
    let mime_type = mime_type.trim();
    ACCEPT_FILTER
        .iter()
        .any(|accepted| accepted.eq_ignore_ascii_case(mime_type))
}

/// Checks type, then size. Reports only the first failure.
pub fn validate(file: &CandidateFile) -> Result<(), ValidationError> {
    if !is_allowed_mime(&file.mime_type) {
        return Err(ValidationError::UnsupportedType {
            mime_type: file.mime_type.clone(),
        });
    }

    let size = file.size();
    if size > MAX_UPLOAD_BYTES {
        return Err(ValidationError::TooLarge { size });
    }

    Ok(())
}
