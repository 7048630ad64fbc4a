//! Plain-text extraction from uploaded files. Parsing is CPU-bound and runs
//! on the blocking pool.

use docx_rs::{
    DocumentChild, ParagraphChild, RunChild, TableCellContent, TableChild, TableRowChild,
};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Docx,
    Txt,
}

impl FileKind {
    /// Kind from the file extension (case-insensitive). `None` when unsupported.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let (_, ext) = filename.rsplit_once('.')?;
        match ext.to_lowercase().as_str() {
            "pdf" => Some(FileKind::Pdf),
            "docx" => Some(FileKind::Docx),
            "txt" => Some(FileKind::Txt),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FileKind::Pdf => "pdf",
            FileKind::Docx => "docx",
            FileKind::Txt => "txt",
        }
    }
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    #[error("DOCX extraction failed: {0}")]
    Docx(String),

    #[error("No text could be extracted from the file")]
    Empty,

    #[error("Extraction task failed: {0}")]
    Task(String),
}

/// Extracts text off the async runtime.
pub async fn extract_text(bytes: Vec<u8>, kind: FileKind) -> Result<String, ExtractError> {
    tokio::task::spawn_blocking(move || extract_text_blocking(&bytes, kind))
        .await
        .map_err(|e| ExtractError::Task(e.to_string()))?
}

pub fn extract_text_blocking(bytes: &[u8], kind: FileKind) -> Result<String, ExtractError> {
    let text = match kind {
        FileKind::Pdf => {
            pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))?
        }
        FileKind::Docx => docx_text(bytes)?,
        FileKind::Txt => String::from_utf8_lossy(bytes).into_owned(),
    };

    let text = text.trim().to_string();
    if text.is_empty() {
        return Err(ExtractError::Empty);
    }
    Ok(text)
}

fn paragraph_text(paragraph: &docx_rs::Paragraph) -> String {
    let mut out = String::new();
    for child in &paragraph.children {
        if let ParagraphChild::Run(run) = child {
            for rc in &run.children {
                match rc {
                    RunChild::Text(t) => out.push_str(&t.text),
                    RunChild::Tab(_) => out.push('\t'),
                    _ => {}
                }
            }
        }
    }
    out
}

fn docx_text(bytes: &[u8]) -> Result<String, ExtractError> {
    let docx = docx_rs::read_docx(bytes).map_err(|e| ExtractError::Docx(e.to_string()))?;
    let mut lines: Vec<String> = Vec::new();

    for child in &docx.document.children {
        match child {
            DocumentChild::Paragraph(p) => lines.push(paragraph_text(p)),
            DocumentChild::Table(table) => {
                for TableChild::TableRow(row) in &table.rows {
                    let cells: Vec<String> = row
                        .cells
                        .iter()
                        .map(|TableRowChild::TableCell(cell)| {
                            cell.children
                                .iter()
                                .filter_map(|c| match c {
                                    TableCellContent::Paragraph(p) => Some(paragraph_text(p)),
                                    _ => None,
                                })
                                .collect::<Vec<_>>()
                                .join(" ")
                        })
                        .collect();
                    lines.push(format!("| {} |", cells.join(" | ")));
                }
            }
            _ => {}
        }
    }

    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use docx_rs::{Docx, Paragraph, Run};

    #[test]
    fn test_file_kind_from_extension() {
        assert_eq!(FileKind::from_filename("TR.PDF"), Some(FileKind::Pdf));
        assert_eq!(FileKind::from_filename("minuta.final.docx"), Some(FileKind::Docx));
        assert_eq!(FileKind::from_filename("notas.txt"), Some(FileKind::Txt));
        assert_eq!(FileKind::from_filename("planilha.xlsx"), None);
        assert_eq!(FileKind::from_filename("sem_extensao"), None);
    }

    #[test]
    fn test_txt_is_decoded_lossily_and_trimmed() {
        let text = extract_text_blocking(b"  Necessidade: notebooks\n", FileKind::Txt).unwrap();
        assert_eq!(text, "Necessidade: notebooks");
    }

    #[test]
    fn test_blank_file_is_empty_error() {
        let err = extract_text_blocking(b"   \n ", FileKind::Txt).unwrap_err();
        assert!(matches!(err, ExtractError::Empty));
    }

    #[test]
    fn test_docx_paragraphs_are_read_in_order() {
        let mut buf = std::io::Cursor::new(Vec::new());
        Docx::new()
            .add_paragraph(Paragraph::new().add_run(Run::new().add_text("Objeto: notebooks")))
            .add_paragraph(Paragraph::new().add_run(Run::new().add_text("Valor: R$ 50.000")))
            .build()
            .pack(&mut buf)
            .unwrap();

        let text = extract_text_blocking(buf.get_ref(), FileKind::Docx).unwrap();
        assert_eq!(text, "Objeto: notebooks\nValor: R$ 50.000");
    }

    #[test]
    fn test_corrupt_docx_is_an_error() {
        let err = extract_text_blocking(b"not a zip", FileKind::Docx).unwrap_err();
        assert!(matches!(err, ExtractError::Docx(_)));
    }
}
