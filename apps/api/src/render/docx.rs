//! Word rendering of a finalized ETP.
//!
//! Layout: institutional header, centered title and date, an introductory
//! paragraph, the classified body blocks, then a signature block. The page
//! footer carries the compliance line.

use std::io::Cursor;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use docx_rs::{
    AlignmentType, Docx, Footer, Header, LineSpacing, Paragraph, Run, RunFonts, Table, TableCell,
    TableRow,
};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::etp::Answers;
use crate::generation::strategy::{unframe, COMPLIANCE_FOOTER, DOCUMENT_TITLE};

use super::classify::{layout, Block};
use super::storage::{ArtifactStorage, StorageError, DOCX_CONTENT_TYPE};

const FONT: &str = "Arial";
const HEADING_COLOR: &str = "1F4E79";

const INTRODUCTION: &str = "O presente documento caracteriza a primeira etapa da fase de \
    planejamento e apresenta os devidos estudos para a contratação de solução que melhor \
    atenderá à necessidade descrita abaixo, em observância às normas vigentes e aos princípios \
    que regem a Administração Pública, especialmente a Lei nº 14.133/2021.";

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("DOCX packaging failed: {0}")]
    Pack(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// What the formatter needs besides the document text.
#[derive(Debug, Clone)]
pub struct DocumentMetadata {
    pub session_id: Uuid,
    pub title: String,
    pub generated_at: DateTime<Utc>,
    pub answers: Answers,
}

/// Turns document text into a stored artifact and returns its reference.
#[async_trait]
pub trait DocumentFormatter: Send + Sync {
    async fn render(
        &self,
        document_text: &str,
        metadata: &DocumentMetadata,
    ) -> Result<String, FormatError>;
}

pub struct DocxFormatter {
    storage: Arc<dyn ArtifactStorage>,
}

impl DocxFormatter {
    pub fn new(storage: Arc<dyn ArtifactStorage>) -> Self {
        Self { storage }
    }
}

/// `documents/<session>/ETP_<yyyymmdd_hhmmss>.docx`
pub fn artifact_key(metadata: &DocumentMetadata) -> String {
    format!(
        "documents/{}/ETP_{}.docx",
        metadata.session_id,
        metadata.generated_at.format("%Y%m%d_%H%M%S")
    )
}

#[async_trait]
impl DocumentFormatter for DocxFormatter {
    async fn render(
        &self,
        document_text: &str,
        metadata: &DocumentMetadata,
    ) -> Result<String, FormatError> {
        let bytes = render_docx(document_text, metadata)?;
        let key = artifact_key(metadata);
        let size = bytes.len();
        self.storage.put(&key, bytes, DOCX_CONTENT_TYPE).await?;

        info!("Rendered ETP for session {} ({size} bytes) -> {key}", metadata.session_id);
        Ok(key)
    }
}

fn run(text: &str) -> Run {
    Run::new()
        .add_text(text)
        .fonts(RunFonts::new().ascii(FONT).hi_ansi(FONT).cs(FONT))
}

fn centered(run: Run) -> Paragraph {
    Paragraph::new().add_run(run).align(AlignmentType::Center)
}

fn institutional_header() -> Header {
    Header::new()
        .add_paragraph(centered(run("GOVERNO DO ESTADO").bold().size(20)))
        .add_paragraph(centered(run("SECRETARIA DE ADMINISTRAÇÃO").bold().size(20)))
        .add_paragraph(centered(run(DOCUMENT_TITLE).size(20)))
}

fn body_paragraph(text: &str) -> Paragraph {
    Paragraph::new()
        .add_run(run(text).size(24))
        .align(AlignmentType::Both)
        .line_spacing(LineSpacing::new().after(120))
}

fn table(rows: &[Vec<String>]) -> Table {
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    let rows = rows
        .iter()
        .enumerate()
        .map(|(i, cells)| {
            let cells = (0..width)
                .map(|c| {
                    let text = cells.get(c).map(String::as_str).unwrap_or("");
                    let mut r = run(text).size(20);
                    if i == 0 {
                        r = r.bold();
                    }
                    TableCell::new().add_paragraph(centered(r))
                })
                .collect();
            TableRow::new(cells)
        })
        .collect();
    Table::new(rows)
}

fn signature_block(docx: Docx, metadata: &DocumentMetadata) -> Docx {
    let mut docx = docx
        .add_paragraph(Paragraph::new())
        .add_paragraph(Paragraph::new());

    if let Some(object) = metadata.answers.get(1) {
        docx = docx.add_paragraph(body_paragraph(&format!("Objeto: {object}")));
    }

    docx.add_paragraph(centered(run(&"_".repeat(50))))
        .add_paragraph(centered(run("Nome do Responsável pela Elaboração").bold().size(24)))
        .add_paragraph(centered(run("Cargo/Função").size(22)))
        .add_paragraph(centered(
            run(&format!("Data: {}", metadata.generated_at.format("%d/%m/%Y"))).size(22),
        ))
}

/// Builds the DOCX bytes without storing them.
pub fn render_docx(document_text: &str, metadata: &DocumentMetadata) -> Result<Vec<u8>, FormatError> {
    let mut docx = Docx::new()
        .header(institutional_header())
        .footer(Footer::new().add_paragraph(centered(run(COMPLIANCE_FOOTER).italic().size(18))))
        .add_paragraph(centered(run(&metadata.title).bold().size(32)))
        .add_paragraph(centered(
            run(&format!("Data: {}", metadata.generated_at.format("%d/%m/%Y"))).size(24),
        ))
        .add_paragraph(Paragraph::new())
        .add_paragraph(body_paragraph(INTRODUCTION));

    for block in layout(unframe(document_text)) {
        docx = match block {
            Block::MajorHeading(title) => docx.add_paragraph(
                Paragraph::new()
                    .add_run(run(&title.to_uppercase()).bold().size(28).color(HEADING_COLOR))
                    .line_spacing(LineSpacing::new().before(240).after(240)),
            ),
            Block::MinorHeading(title) => docx.add_paragraph(
                Paragraph::new()
                    .add_run(run(&title).bold().size(24))
                    .line_spacing(LineSpacing::new().before(160).after(120)),
            ),
            Block::Paragraph(text) => docx.add_paragraph(body_paragraph(&text)),
            Block::Table(rows) => docx.add_table(table(&rows)).add_paragraph(Paragraph::new()),
        };
    }

    docx = signature_block(docx, metadata);

    let mut buf = Cursor::new(Vec::new());
    docx.build()
        .pack(&mut buf)
        .map_err(|e| FormatError::Pack(e.to_string()))?;
    Ok(buf.into_inner())
}
