//! Data-URI interchange format (`data:<mime>;base64,<payload>`).

use base64::Engine;

use crate::error::{Result, StudioError};

/// A base64 image payload together with its MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub mime_type: String,
    pub data: String,
}

impl EncodedImage {
    pub fn new(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Encode raw bytes into a base64 payload.
    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self::new(
            mime_type,
            base64::engine::general_purpose::STANDARD.encode(bytes),
        )
    }

    /// Parse a `data:<mime>;base64,<payload>` URI.
    pub fn from_data_uri(uri: &str) -> Result<Self> {
        let rest = uri
            .strip_prefix("data:")
            .ok_or_else(|| StudioError::InvalidResponse("Not a data URI".into()))?;
        let (header, data) = rest
            .split_once(',')
            .ok_or_else(|| StudioError::InvalidResponse("Data URI has no payload".into()))?;
        let mime_type = header
            .strip_suffix(";base64")
            .ok_or_else(|| StudioError::InvalidResponse("Data URI is not base64".into()))?;
        Ok(Self::new(mime_type, data))
    }

    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    /// Decode the payload into raw bytes.
    pub fn decode(&self) -> Result<Vec<u8>> {
        base64::engine::general_purpose::STANDARD
            .decode(self.data.as_bytes())
            .map_err(|e| StudioError::InvalidResponse(format!("Invalid base64 payload: {}", e)))
    }

    /// File extension matching the MIME type, for writing images to disk.
    pub fn extension(&self) -> &str {
        match self.mime_type.as_str() {
            "image/jpeg" | "image/jpg" => "jpg",
            "image/png" => "png",
            "image/webp" => "webp",
            "image/gif" => "gif",
            _ => "bin",
        }
    }
}

/// Strip any `data:...,` prefix, leaving the raw base64 payload.
pub fn strip_data_uri_prefix(image: &str) -> &str {
    if image.starts_with("data:") {
        image.split_once(',').map(|(_, data)| data).unwrap_or("")
    } else {
        image
    }
}

/// MIME type declared by a data URI, if any.
pub fn data_uri_mime_type(image: &str) -> Option<&str> {
    let rest = image.strip_prefix("data:")?;
    let (header, _) = rest.split_once(',')?;
    Some(header.split(';').next().unwrap_or(header))
}
