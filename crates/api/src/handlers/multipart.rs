//! Multipart form reading shared by the upload endpoints.

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::Multipart;

use crate::error::{AppError, AppResult};

/// Name of the file field on every upload form.
pub const FILE_FIELD: &str = "uploadfile";

/// A file part of a multipart form.
#[derive(Debug)]
pub struct UploadedFile {
    pub file_name: String,
    pub data: Bytes,
}

/// The text fields and the single file field of a multipart form.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub fields: HashMap<String, String>,
    pub file: Option<UploadedFile>,
}

impl UploadForm {
    /// Read every part. The part named [`FILE_FIELD`] is kept as bytes;
    /// other parts are read as text.
    pub async fn read(mut multipart: Multipart) -> AppResult<Self> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or("").to_string();
            if name == FILE_FIELD {
                let file_name = field
                    .file_name()
                    .map(str::to_string)
                    .ok_or_else(|| AppError::BadRequest("Uploaded file has no filename".into()))?;
                let data = field.bytes().await?;
                form.file = Some(UploadedFile { file_name, data });
            } else {
                let text = field.text().await?;
                form.fields.insert(name, text);
            }
        }

        Ok(form)
    }

    /// Remove and return a required text field.
    pub fn take_field(&mut self, name: &str) -> AppResult<String> {
        self.fields
            .remove(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AppError::BadRequest(format!("Missing required '{name}' field")))
    }

    /// Remove and return the required file part.
    pub fn take_file(&mut self) -> AppResult<UploadedFile> {
        self.file
            .take()
            .ok_or_else(|| AppError::BadRequest(format!("Missing required '{FILE_FIELD}' field")))
    }
}
