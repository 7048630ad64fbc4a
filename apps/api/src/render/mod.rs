pub mod classify;
pub mod docx;
pub mod storage;

pub use docx::{DocumentFormatter, DocumentMetadata, DocxFormatter, FormatError};
pub use storage::{ArtifactStorage, S3Storage, StorageError, DOCX_CONTENT_TYPE};
