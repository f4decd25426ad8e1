use serde::{Deserialize, Serialize};

/// Path of the generation endpoint, relative to the configured base URL.
pub const GENERATE_PATH: &str = "/api/v1/generate";

/// Multipart field carrying the image bytes.
pub const IMAGE_FIELD: &str = "image";

/// Response envelope of the generation endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<GenerateData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base64_image: Option<String>,
}

impl GenerateResponse {
    pub fn image_url(&self) -> Option<&str> {
        self.data
            .as_ref()
            .and_then(|data| data.image_url.as_deref())
            .filter(|value| !value.is_empty())
    }

    pub fn base64_image(&self) -> Option<&str> {
        self.data
            .as_ref()
            .and_then(|data| data.base64_image.as_deref())
            .filter(|value| !value.is_empty())
    }
}
