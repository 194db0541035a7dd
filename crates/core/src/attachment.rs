use bytes::Bytes;
use std::path::Path;

use crate::error::{Error, Result};

/// File categories the tutor accepts alongside a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachmentKind {
    Image,
    Pdf,
    SlideDeck,
}

impl AttachmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttachmentKind::Image => "image",
            AttachmentKind::Pdf => "pdf",
            AttachmentKind::SlideDeck => "slides",
        }
    }
}

/// Map a file extension to its kind and MIME type
pub fn classify_extension(ext: &str) -> Option<(AttachmentKind, &'static str)> {
    match ext.to_lowercase().as_str() {
        "png" => Some((AttachmentKind::Image, "image/png")),
        "jpg" | "jpeg" => Some((AttachmentKind::Image, "image/jpeg")),
        "gif" => Some((AttachmentKind::Image, "image/gif")),
        "webp" => Some((AttachmentKind::Image, "image/webp")),
        "pdf" => Some((AttachmentKind::Pdf, "application/pdf")),
        "ppt" => Some((AttachmentKind::SlideDeck, "application/vnd.ms-powerpoint")),
        "pptx" => Some((
            AttachmentKind::SlideDeck,
            "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        )),
        _ => None,
    }
}

/// Display-side description of an attachment kept on the echoed message
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttachmentInfo {
    pub file_name: String,
    pub mime_type: String,
    pub kind: AttachmentKind,
    pub size: usize,
}

/// A file the user includes with an outgoing message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    file_name: String,
    mime_type: String,
    kind: AttachmentKind,
    data: Bytes,
}

impl Attachment {
    /// Build an attachment from in-memory bytes, inferring the type from the file name
    pub fn from_bytes(file_name: impl Into<String>, data: impl Into<Bytes>) -> Result<Self> {
        let file_name = file_name.into();
        let ext = Path::new(&file_name).extension().and_then(|e| e.to_str()).unwrap_or_default();
        let (kind, mime_type) = classify_extension(ext)
            .ok_or_else(|| Error::Validation(format!("unsupported attachment type: {}", file_name)))?;

        Ok(Self { file_name, mime_type: mime_type.to_string(), kind, data: data.into() })
    }

    /// Read an attachment from disk
    pub fn from_path(path: &Path) -> Result<Self> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::Validation(format!("invalid attachment path: {}", path.display())))?
            .to_string();

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        if classify_extension(ext).is_none() {
            return Err(Error::Validation(format!("unsupported attachment type: {}", file_name)));
        }

        let data = std::fs::read(path)?;
        Self::from_bytes(file_name, data)
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn kind(&self) -> AttachmentKind {
        self.kind
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Description carried on the optimistic echo
    pub fn info(&self) -> AttachmentInfo {
        AttachmentInfo {
            file_name: self.file_name.clone(),
            mime_type: self.mime_type.clone(),
            kind: self.kind,
            size: self.data.len(),
        }
    }
}
