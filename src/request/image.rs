// request/image.rs — Uploaded image attachments

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use serde::Serialize;
use std::path::Path;
use thiserror::Error;

/// Accepted image formats: (extension, MIME type)
const SUPPORTED_FORMATS: &[(&str, &str)] = &[
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("webp", "image/webp"),
];

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Unsupported image format '{0}' (expected png, jpg, jpeg or webp)")]
    UnsupportedFormat(String),

    #[error("Unsupported MIME type '{0}'")]
    UnsupportedMimeType(String),

    #[error("Failed to read image {path}: {message}")]
    Io { path: String, message: String },
}

/// Opaque image payload plus its declared MIME type
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct ImageAttachment {
    pub name: String,
    pub mime_type: String,
    #[serde(skip)]
    pub data: Vec<u8>,
}

impl std::fmt::Debug for ImageAttachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageAttachment")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("bytes", &self.data.len())
            .finish()
    }
}

impl ImageAttachment {
    pub fn new(name: impl Into<String>, mime_type: &str, data: Vec<u8>) -> Result<Self, ImageError> {
        let mime_type = mime_type.trim().to_ascii_lowercase();
        if !SUPPORTED_FORMATS.iter().any(|(_, mime)| *mime == mime_type) {
            return Err(ImageError::UnsupportedMimeType(mime_type));
        }

        Ok(Self {
            name: name.into(),
            mime_type,
            data,
        })
    }

    /// Read an image from disk; the MIME type comes from the extension
    pub fn from_path(path: &Path) -> Result<Self, ImageError> {
        let mime_type = mime_for_path(path)?;
        let data = std::fs::read(path).map_err(|e| ImageError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        tracing::debug!("Loaded image {} ({}, {} bytes)", name, mime_type, data.len());

        Ok(Self {
            name,
            mime_type: mime_type.to_string(),
            data,
        })
    }

    pub fn base64_data(&self) -> String {
        BASE64_STANDARD.encode(&self.data)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

pub fn mime_for_path(path: &Path) -> Result<&'static str, ImageError> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    SUPPORTED_FORMATS
        .iter()
        .find(|(candidate, _)| *candidate == ext)
        .map(|(_, mime)| *mime)
        .ok_or(ImageError::UnsupportedFormat(ext))
}
