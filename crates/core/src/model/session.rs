use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::model::ids::{ItemId, SessionId};
use crate::model::kind::SessionKind;

//
// ─── STATUS ────────────────────────────────────────────────────────────────────
//

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Configuring,
    InProgress,
    Completed,
    Expired,
    Aborted,
}

impl SessionStatus {
    /// Terminal states have no outbound transitions.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Expired | Self::Aborted)
    }

    /// Terminal states that produce a summary.
    #[must_use]
    pub fn is_scored(self) -> bool {
        matches!(self, Self::Completed | Self::Expired)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Configuring => "configuring",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Expired => "expired",
            Self::Aborted => "aborted",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── SUMMARY ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionSummaryError {
    #[error("completed_at is before started_at")]
    InvalidTimeRange,

    #[error("a summary needs a completed or expired session, got {0}")]
    NotScored(SessionStatus),

    #[error("total items ({total}) does not match outcome counts ({sum})")]
    CountMismatch { total: u32, sum: u32 },

    #[error("score {0} is above 100")]
    ScoreOutOfRange(u8),

    #[error("expected {expected} per-item details, got {got}")]
    DetailMismatch { expected: u32, got: usize },

    #[error("too many items for a single session: {len}")]
    TooManyItems { len: usize },
}

/// Outcome of a single item after scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemOutcome {
    Correct,
    Incorrect,
    Unanswered,
}

impl ItemOutcome {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Correct => "correct",
            Self::Incorrect => "incorrect",
            Self::Unanswered => "unanswered",
        }
    }
}

/// Per-item line of a summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDetail {
    pub item_id: ItemId,
    pub category: String,
    pub outcome: ItemOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted: Option<String>,
}

/// Aggregated results for one category, in first-appearance order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryBreakdown {
    pub category: String,
    pub total: u32,
    pub answered: u32,
    pub correct: u32,
    pub score_percent: u8,
}

/// Raw summary fields; also the persisted document shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryParts {
    pub id: SessionId,
    pub kind: SessionKind,
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    #[serde(rename = "date")]
    pub completed_at: DateTime<Utc>,
    pub items_total: u32,
    pub items_answered: u32,
    pub items_correct: u32,
    pub items_incorrect: u32,
    pub items_unanswered: u32,
    pub score_percent: u8,
    #[serde(rename = "durationUsedSeconds")]
    pub duration_used_secs: u32,
    pub categories: Vec<CategoryBreakdown>,
    pub per_item_detail: Vec<ItemDetail>,
}

/// Scored record of a finished session. Immutable once built.
///
/// Deserialization goes through the same validation as construction, so a
/// stored document that breaks the count invariants is rejected on load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SummaryParts", into = "SummaryParts")]
pub struct SessionSummary {
    parts: SummaryParts,
}

impl SessionSummary {
    /// Validate raw parts into a summary.
    ///
    /// # Errors
    ///
    /// Returns `SessionSummaryError` when the status is not scored, timestamps are
    /// reversed, counts do not add up, the score exceeds 100, or the per-item
    /// details do not cover every item.
    pub fn from_parts(parts: SummaryParts) -> Result<Self, SessionSummaryError> {
        if !parts.status.is_scored() {
            return Err(SessionSummaryError::NotScored(parts.status));
        }
        if parts.completed_at < parts.started_at {
            return Err(SessionSummaryError::InvalidTimeRange);
        }

        let sum = parts
            .items_correct
            .saturating_add(parts.items_incorrect)
            .saturating_add(parts.items_unanswered);
        if sum != parts.items_total {
            return Err(SessionSummaryError::CountMismatch {
                total: parts.items_total,
                sum,
            });
        }
        let answered = parts.items_correct.saturating_add(parts.items_incorrect);
        if answered != parts.items_answered {
            return Err(SessionSummaryError::CountMismatch {
                total: parts.items_answered,
                sum: answered,
            });
        }
        if parts.score_percent > 100 {
            return Err(SessionSummaryError::ScoreOutOfRange(parts.score_percent));
        }
        if parts.per_item_detail.len() != parts.items_total as usize {
            return Err(SessionSummaryError::DetailMismatch {
                expected: parts.items_total,
                got: parts.per_item_detail.len(),
            });
        }

        Ok(Self { parts })
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.parts.id
    }

    #[must_use]
    pub fn kind(&self) -> SessionKind {
        self.parts.kind
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.parts.status
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.parts.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.parts.completed_at
    }

    #[must_use]
    pub fn items_total(&self) -> u32 {
        self.parts.items_total
    }

    #[must_use]
    pub fn items_answered(&self) -> u32 {
        self.parts.items_answered
    }

    #[must_use]
    pub fn items_correct(&self) -> u32 {
        self.parts.items_correct
    }

    #[must_use]
    pub fn items_incorrect(&self) -> u32 {
        self.parts.items_incorrect
    }

    #[must_use]
    pub fn items_unanswered(&self) -> u32 {
        self.parts.items_unanswered
    }

    #[must_use]
    pub fn score_percent(&self) -> u8 {
        self.parts.score_percent
    }

    #[must_use]
    pub fn duration_used_secs(&self) -> u32 {
        self.parts.duration_used_secs
    }

    #[must_use]
    pub fn categories(&self) -> &[CategoryBreakdown] {
        &self.parts.categories
    }

    #[must_use]
    pub fn per_item_detail(&self) -> &[ItemDetail] {
        &self.parts.per_item_detail
    }

    #[must_use]
    pub fn parts(&self) -> &SummaryParts {
        &self.parts
    }
}

impl TryFrom<SummaryParts> for SessionSummary {
    type Error = SessionSummaryError;

    fn try_from(parts: SummaryParts) -> Result<Self, Self::Error> {
        Self::from_parts(parts)
    }
}

impl From<SessionSummary> for SummaryParts {
    fn from(summary: SessionSummary) -> Self {
        summary.parts
    }
}
