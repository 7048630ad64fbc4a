use axum::extract::Multipart;

use crate::errors::AppError;

/// A file taken from the `file` field of a multipart body.
pub struct UploadedFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

pub async fn read_file_field(mut multipart: Multipart) -> Result<UploadedFile, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| AppError::validation("No file selected"))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::validation(format!("Could not read upload: {e}")))?;

        return Ok(UploadedFile {
            filename,
            bytes: bytes.to_vec(),
        });
    }

    Err(AppError::validation("Multipart field 'file' is required"))
}
