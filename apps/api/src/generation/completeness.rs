use std::collections::BTreeSet;

use super::sections::SECTION_COUNT;

/// Minimum number of distinct section markers generated text must carry.
pub const MIN_SECTIONS: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityVerdict {
    Acceptable { sections_found: usize },
    NeedsFallback { sections_found: usize },
}

impl QualityVerdict {
    pub fn sections_found(self) -> usize {
        match self {
            QualityVerdict::Acceptable { sections_found }
            | QualityVerdict::NeedsFallback { sections_found } => sections_found,
        }
    }

    pub fn is_acceptable(self) -> bool {
        matches!(self, QualityVerdict::Acceptable { .. })
    }
}

/// Section numbers 1..=14 whose literal marker `"N."` occurs anywhere in
/// the text. Position and surrounding markup are irrelevant, so `**3.**`,
/// `Seção 3.` and `3.REQUISITOS` all count.
pub fn section_markers(text: &str) -> BTreeSet<u8> {
    (1..=SECTION_COUNT as u8)
        .filter(|n| text.contains(&format!("{n}.")))
        .collect()
}

pub fn count_section_markers(text: &str) -> usize {
    section_markers(text).len()
}

/// The completeness gate applied to every generator output.
pub fn assess(text: &str) -> QualityVerdict {
    let sections_found = count_section_markers(text);
    if sections_found >= MIN_SECTIONS {
        QualityVerdict::Acceptable { sections_found }
    } else {
        QualityVerdict::NeedsFallback { sections_found }
    }
}
