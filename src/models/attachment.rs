use std::path::Path;

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;

/// An image picked in the composer, waiting to be uploaded.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageAttachment {
    pub mime_type: String,
    pub filename: Option<String>,
    pub data: Bytes,
}

impl ImageAttachment {
    pub fn new(mime_type: &str, filename: Option<String>, data: impl Into<Bytes>) -> Self {
        Self {
            mime_type: mime_type.to_string(),
            filename,
            data: data.into(),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)
            .with_context(|| format!("Failed to read image file {}", path.display()))?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string);
        Ok(Self::new(mime_for_path(path), filename, data))
    }

    pub fn upload_name(&self) -> String {
        self.filename.clone().unwrap_or_else(|| {
            let ext = self.mime_type.rsplit('/').next().unwrap_or("png");
            format!("image.{}", ext)
        })
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.data))
    }
}

pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            matches!(
                ext.to_lowercase().as_str(),
                "png" | "jpg" | "jpeg" | "gif" | "webp"
            )
        })
}

fn mime_for_path(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "image/png",
    }
}

/// Split a `data:<mime>;base64,<payload>` URL back into its MIME type and bytes.
pub fn decode_data_url(url: &str) -> Option<(String, Vec<u8>)> {
    let rest = url.strip_prefix("data:")?;
    let (meta, payload) = rest.split_once(',')?;
    let mime = meta.strip_suffix(";base64")?;
    let data = STANDARD.decode(payload).ok()?;
    Some((mime.to_string(), data))
}
