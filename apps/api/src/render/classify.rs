//! Line classifier and block layout for generated document text.
//!
//! Each line is one of: major heading ("4. ESTIMATIVA ..."), minor heading
//! ("2.1 Localização ..."), table row (two or more `|`), blank, or body.
//! Body lines accumulate into a paragraph until a blank line, heading or
//! table row; consecutive table rows become one table.

use std::sync::OnceLock;

use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    MajorHeading,
    MinorHeading,
    TableRow,
    Body,
    Blank,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    MajorHeading(String),
    MinorHeading(String),
    Paragraph(String),
    /// Rows of cells; the first row is the header.
    Table(Vec<Vec<String>>),
}

fn major_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+\.\s+(\S.*)$").expect("valid major heading regex"))
}

/// At least one uppercase letter and no lowercase ones. Digits and
/// punctuation are allowed ("LEI 14.133/2021", "(ETP)").
fn is_all_caps(text: &str) -> bool {
    text.chars().any(char::is_uppercase) && !text.chars().any(char::is_lowercase)
}

fn is_major_heading(line: &str) -> bool {
    major_regex()
        .captures(line)
        .and_then(|c| c.get(1))
        .is_some_and(|title| is_all_caps(title.as_str()))
}

fn minor_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+\.\d+\.?\s+\S").expect("valid minor heading regex"))
}

/// Drops markdown heading hashes and emphasis markers.
pub fn clean_markup(line: &str) -> String {
    line.trim()
        .trim_start_matches('#')
        .trim()
        .replace("**", "")
        .trim()
        .to_string()
}

pub fn classify_line(line: &str) -> LineKind {
    let cleaned = clean_markup(line);
    if cleaned.is_empty() {
        LineKind::Blank
    } else if cleaned.matches('|').count() >= 2 {
        LineKind::TableRow
    } else if is_major_heading(&cleaned) {
        LineKind::MajorHeading
    } else if minor_regex().is_match(&cleaned) {
        LineKind::MinorHeading
    } else {
        LineKind::Body
    }
}

fn table_cells(line: &str) -> Vec<String> {
    let trimmed = line.trim();
    let inner = trimmed.strip_prefix('|').unwrap_or(trimmed);
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    inner.split('|').map(|c| clean_markup(c)).collect()
}

/// `|---|:---:|` style rows carry no content.
fn is_separator_row(cells: &[String]) -> bool {
    cells.iter().all(|c| {
        let c = c.trim();
        !c.is_empty() && c.chars().all(|ch| matches!(ch, '-' | ':' | ' '))
    })
}

pub fn layout(text: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut paragraph: Vec<String> = Vec::new();
    let mut table: Vec<Vec<String>> = Vec::new();

    fn flush_paragraph(paragraph: &mut Vec<String>, blocks: &mut Vec<Block>) {
        if !paragraph.is_empty() {
            blocks.push(Block::Paragraph(paragraph.join(" ")));
            paragraph.clear();
        }
    }

    fn flush_table(table: &mut Vec<Vec<String>>, blocks: &mut Vec<Block>) {
        if !table.is_empty() {
            blocks.push(Block::Table(std::mem::take(table)));
        }
    }

    for line in text.lines() {
        let kind = classify_line(line);
        if kind != LineKind::TableRow {
            flush_table(&mut table, &mut blocks);
        }
        match kind {
            LineKind::Blank => flush_paragraph(&mut paragraph, &mut blocks),
            LineKind::TableRow => {
                flush_paragraph(&mut paragraph, &mut blocks);
                let cells = table_cells(line);
                if !is_separator_row(&cells) {
                    table.push(cells);
                }
            }
            LineKind::MajorHeading => {
                flush_paragraph(&mut paragraph, &mut blocks);
                blocks.push(Block::MajorHeading(clean_markup(line)));
            }
            LineKind::MinorHeading => {
                flush_paragraph(&mut paragraph, &mut blocks);
                blocks.push(Block::MinorHeading(clean_markup(line)));
            }
            LineKind::Body => paragraph.push(clean_markup(line)),
        }
    }
    flush_table(&mut table, &mut blocks);
    flush_paragraph(&mut paragraph, &mut blocks);

    blocks
}
