//! The fixed five-question intake and its typed answer record.
//!
//! Raw client input is a loosely-keyed JSON object (`{"1": "...", "2": true}`).
//! It is parsed once at the boundary into `Answers`; everything downstream
//! works on the typed record.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerKind {
    Text,
    YesNo,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Question {
    pub id: u8,
    pub text: &'static str,
    pub kind: AnswerKind,
    /// Document section the answer primarily feeds.
    pub section: u8,
}

pub const QUESTIONS: [Question; 5] = [
    Question {
        id: 1,
        text: "Qual a descrição da necessidade da contratação?",
        kind: AnswerKind::Text,
        section: 2,
    },
    Question {
        id: 2,
        text: "Possui demonstrativo de previsão no PCA?",
        kind: AnswerKind::YesNo,
        section: 2,
    },
    Question {
        id: 3,
        text: "Quais normas legais pretende utilizar?",
        kind: AnswerKind::Text,
        section: 3,
    },
    Question {
        id: 4,
        text: "Qual o quantitativo e valor estimado?",
        kind: AnswerKind::Text,
        section: 4,
    },
    Question {
        id: 5,
        text: "Haverá parcelamento da contratação?",
        kind: AnswerKind::YesNo,
        section: 8,
    },
];

pub fn question(id: u8) -> Option<&'static Question> {
    QUESTIONS.iter().find(|q| q.id == id)
}

const YES_WORDS: &[&str] = &["sim", "s", "yes", "true"];
const NO_WORDS: &[&str] = &["não", "nao", "n", "no", "false"];

/// Interprets the leading word of a yes/no answer.
/// "Sim, conforme PCA 2024" is `Some(true)`; "talvez" is `None`.
pub fn parse_yes_no(value: &str) -> Option<bool> {
    let first = value
        .split(|c: char| c.is_whitespace() || c == ',' || c == '.' || c == ';' || c == '-')
        .find(|w| !w.is_empty())?
        .to_lowercase();
    if YES_WORDS.contains(&first.as_str()) {
        Some(true)
    } else if NO_WORDS.contains(&first.as_str()) {
        Some(false)
    } else {
        None
    }
}

/// Typed answer record. Serialized under the keys "1".."5" so persisted JSON
/// and API payloads keep the question-index shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answers {
    #[serde(rename = "1", default, skip_serializing_if = "Option::is_none")]
    pub need_description: Option<String>,
    #[serde(rename = "2", default, skip_serializing_if = "Option::is_none")]
    pub pca_forecast: Option<String>,
    #[serde(rename = "3", default, skip_serializing_if = "Option::is_none")]
    pub legal_norms: Option<String>,
    #[serde(rename = "4", default, skip_serializing_if = "Option::is_none")]
    pub quantity_and_value: Option<String>,
    #[serde(rename = "5", default, skip_serializing_if = "Option::is_none")]
    pub installments: Option<String>,
}

impl Answers {
    /// Builds the record from a raw JSON object. Strings are trimmed, booleans
    /// become "Sim"/"Não", numbers are kept as text, blanks and unknown keys
    /// are dropped.
    pub fn from_raw(raw: &Map<String, Value>) -> Self {
        let mut answers = Answers::default();
        for (key, value) in raw {
            let Ok(id) = key.trim().parse::<u8>() else {
                continue;
            };
            let text = match value {
                Value::String(s) => s.trim().to_string(),
                Value::Bool(true) => "Sim".to_string(),
                Value::Bool(false) => "Não".to_string(),
                Value::Number(n) => n.to_string(),
                _ => continue,
            };
            if !text.is_empty() {
                answers.set(id, text);
            }
        }
        answers
    }

    fn slot(&self, id: u8) -> Option<&Option<String>> {
        match id {
            1 => Some(&self.need_description),
            2 => Some(&self.pca_forecast),
            3 => Some(&self.legal_norms),
            4 => Some(&self.quantity_and_value),
            5 => Some(&self.installments),
            _ => None,
        }
    }

    fn slot_mut(&mut self, id: u8) -> Option<&mut Option<String>> {
        match id {
            1 => Some(&mut self.need_description),
            2 => Some(&mut self.pca_forecast),
            3 => Some(&mut self.legal_norms),
            4 => Some(&mut self.quantity_and_value),
            5 => Some(&mut self.installments),
            _ => None,
        }
    }

    pub fn get(&self, id: u8) -> Option<&str> {
        self.slot(id)
            .and_then(|s| s.as_deref())
            .filter(|s| !s.trim().is_empty())
    }

    /// Sets answer `id`; ids outside 1..=5 are ignored.
    pub fn set(&mut self, id: u8, value: impl Into<String>) {
        if let Some(slot) = self.slot_mut(id) {
            *slot = Some(value.into());
        }
    }

    /// Answer text, or the given default when unanswered.
    pub fn get_or<'a>(&'a self, id: u8, default: &'a str) -> &'a str {
        self.get(id).unwrap_or(default)
    }

    /// Yes/no reading of a boolean-kind answer.
    pub fn as_bool(&self, id: u8) -> Option<bool> {
        self.get(id).and_then(parse_yes_no)
    }

    pub fn is_empty(&self) -> bool {
        QUESTIONS.iter().all(|q| self.get(q.id).is_none())
    }

    /// Copies every answer present in `other` over this record.
    pub fn merge_from(&mut self, other: &Answers) {
        for q in &QUESTIONS {
            if let Some(value) = other.get(q.id) {
                self.set(q.id, value);
            }
        }
    }

    /// Questions whose answer is absent, blank, or (for yes/no questions)
    /// does not start with a recognizable yes/no word.
    pub fn invalid_questions(&self) -> Vec<&'static Question> {
        QUESTIONS
            .iter()
            .filter(|q| match self.get(q.id) {
                None => true,
                Some(value) => q.kind == AnswerKind::YesNo && parse_yes_no(value).is_none(),
            })
            .collect()
    }
}
