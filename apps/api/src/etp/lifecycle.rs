//! Session lifecycle: `created → validated → preview_generated → approved → completed`,
//! plus terminal `error`. Every mutating operation checks its `Transition`
//! here before touching the session.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Created,
    Validated,
    PreviewGenerated,
    Approved,
    Completed,
    Error,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Created => "created",
            SessionStatus::Validated => "validated",
            SessionStatus::PreviewGenerated => "preview_generated",
            SessionStatus::Approved => "approved",
            SessionStatus::Completed => "completed",
            SessionStatus::Error => "error",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Error)
    }

    /// Position along the linear path. `Error` is off the path.
    pub fn stage(self) -> Option<u8> {
        match self {
            SessionStatus::Created => Some(0),
            SessionStatus::Validated => Some(1),
            SessionStatus::PreviewGenerated => Some(2),
            SessionStatus::Approved => Some(3),
            SessionStatus::Completed => Some(4),
            SessionStatus::Error => None,
        }
    }

    /// True when the session has reached at least `other` on the linear path.
    pub fn has_reached(self, other: SessionStatus) -> bool {
        match (self.stage(), other.stage()) {
            (Some(a), Some(b)) => a >= b,
            _ => false,
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(SessionStatus::Created),
            "validated" => Ok(SessionStatus::Validated),
            "preview_generated" => Ok(SessionStatus::PreviewGenerated),
            "approved" => Ok(SessionStatus::Approved),
            "completed" => Ok(SessionStatus::Completed),
            "error" => Ok(SessionStatus::Error),
            other => anyhow::bail!("unknown session status '{other}'"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    SubmitAnswers,
    IngestAnalysis,
    GeneratePreview,
    AdjustPreview,
    Approve,
    Finalize,
}

impl Transition {
    fn describe(self) -> &'static str {
        match self {
            Transition::SubmitAnswers => "submit answers",
            Transition::IngestAnalysis => "attach a document analysis",
            Transition::GeneratePreview => "generate a preview",
            Transition::AdjustPreview => "adjust the preview",
            Transition::Approve => "approve the preview",
            Transition::Finalize => "finalize the document",
        }
    }
}

/// Rejects `transition` when `status` does not allow it.
pub fn check(status: SessionStatus, transition: Transition) -> Result<(), AppError> {
    if status.is_terminal() {
        return Err(AppError::Precondition(format!(
            "Cannot {} on a session in status '{}'",
            transition.describe(),
            status
        )));
    }

    let allowed = match transition {
        Transition::SubmitAnswers | Transition::IngestAnalysis => true,
        Transition::GeneratePreview => status.has_reached(SessionStatus::Validated),
        Transition::AdjustPreview | Transition::Approve => {
            status == SessionStatus::PreviewGenerated
        }
        Transition::Finalize => status == SessionStatus::Approved,
    };

    if allowed {
        Ok(())
    } else {
        let needed = match transition {
            Transition::GeneratePreview => "answers must be validated first",
            Transition::AdjustPreview | Transition::Approve => "a preview must be generated first",
            Transition::Finalize => "the preview must be approved first",
            Transition::SubmitAnswers | Transition::IngestAnalysis => "",
        };
        Err(AppError::Precondition(format!(
            "Cannot {} in status '{}': {}",
            transition.describe(),
            status,
            needed
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [SessionStatus; 6] = [
        SessionStatus::Created,
        SessionStatus::Validated,
        SessionStatus::PreviewGenerated,
        SessionStatus::Approved,
        SessionStatus::Completed,
        SessionStatus::Error,
    ];

    fn allowed_from(transition: Transition) -> Vec<SessionStatus> {
        ALL.iter()
            .copied()
            .filter(|s| check(*s, transition).is_ok())
            .collect()
    }

    #[test]
    fn test_no_stage_is_skipped() {
        assert_eq!(
            allowed_from(Transition::GeneratePreview),
            vec![
                SessionStatus::Validated,
                SessionStatus::PreviewGenerated,
                SessionStatus::Approved
            ]
        );
        assert_eq!(
            allowed_from(Transition::Approve),
            vec![SessionStatus::PreviewGenerated]
        );
        assert_eq!(
            allowed_from(Transition::Finalize),
            vec![SessionStatus::Approved]
        );
    }

    #[test]
    fn test_terminal_states_reject_everything() {
        for t in [
            Transition::SubmitAnswers,
            Transition::IngestAnalysis,
            Transition::GeneratePreview,
            Transition::AdjustPreview,
            Transition::Approve,
            Transition::Finalize,
        ] {
            assert!(check(SessionStatus::Completed, t).is_err(), "{t:?}");
            assert!(check(SessionStatus::Error, t).is_err(), "{t:?}");
        }
    }

    #[test]
    fn test_precondition_error_names_status() {
        let err = check(SessionStatus::Created, Transition::GeneratePreview).unwrap_err();
        match err {
            AppError::Precondition(msg) => {
                assert!(msg.contains("created"), "message was: {msg}");
            }
            other => panic!("expected Precondition, got {other:?}"),
        }
    }

    #[test]
    fn test_status_round_trips_through_text() {
        for s in ALL {
            assert_eq!(s.as_str().parse::<SessionStatus>().unwrap(), s);
        }
        assert!("answers_submitted".parse::<SessionStatus>().is_err());
    }

    #[test]
    fn test_has_reached_ignores_error_state() {
        assert!(SessionStatus::Approved.has_reached(SessionStatus::Validated));
        assert!(!SessionStatus::Created.has_reached(SessionStatus::Validated));
        assert!(!SessionStatus::Error.has_reached(SessionStatus::Created));
    }
}
