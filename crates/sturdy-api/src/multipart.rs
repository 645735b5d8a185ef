//! Rebuildable multipart payloads for file submission endpoints.
//!
//! `reqwest`'s `Form` is consumed on send, but the 401 retry path needs to
//! issue the same upload twice. [`UploadForm`] owns the parts and builds a
//! fresh `Form` per attempt; the transport sets the multipart boundary.

use reqwest::multipart::{Form, Part};

use sturdy_core::error::AppError;
use sturdy_core::result::AppResult;

/// One file attachment within an upload.
#[derive(Debug, Clone)]
pub struct FilePart {
    /// Form field name.
    pub field: String,
    /// File name reported to the server.
    pub file_name: String,
    /// MIME type of the content.
    pub mime: String,
    /// Raw file content.
    pub bytes: Vec<u8>,
}

/// A multipart form that can be rebuilt for the refresh-retry attempt.
#[derive(Debug, Clone, Default)]
pub struct UploadForm {
    fields: Vec<(String, String)>,
    files: Vec<FilePart>,
}

impl UploadForm {
    /// Creates an empty form.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a text field.
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    /// Adds a file attachment.
    pub fn file(mut self, part: FilePart) -> Self {
        self.files.push(part);
        self
    }

    /// Builds a fresh transport form from the owned parts.
    pub(crate) fn to_form(&self) -> AppResult<Form> {
        let mut form = Form::new();
        for (name, value) in &self.fields {
            form = form.text(name.clone(), value.clone());
        }
        for file in &self.files {
            let part = Part::bytes(file.bytes.clone())
                .file_name(file.file_name.clone())
                .mime_str(&file.mime)
                .map_err(|e| {
                    AppError::validation(format!("Invalid MIME type '{}': {e}", file.mime))
                })?;
            form = form.part(file.field.clone(), part);
        }
        Ok(form)
    }
}
