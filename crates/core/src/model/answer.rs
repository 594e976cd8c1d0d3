use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::ItemId;
use crate::model::kind::SessionKind;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AnswerError {
    #[error("rating must be between 1 and 5, got {0}")]
    RatingOutOfRange(u8),
}

/// Self-assessed interview rating, 1 (poor) to 5 (excellent).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    /// # Errors
    ///
    /// Returns `AnswerError::RatingOutOfRange` outside `1..=5`.
    pub fn new(value: u8) -> Result<Self, AnswerError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(AnswerError::RatingOutOfRange(value))
        }
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    /// The rating on a 0–100 scale.
    #[must_use]
    pub fn percent(self) -> u32 {
        u32::from(self.0) * 20
    }
}

impl TryFrom<u8> for Rating {
    type Error = AnswerError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

/// A value submitted for one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerValue {
    Choice(usize),
    Code(String),
    Rating {
        rating: Rating,
        notes: Option<String>,
    },
}

impl AnswerValue {
    /// The session kind this value belongs to.
    #[must_use]
    pub fn kind(&self) -> SessionKind {
        match self {
            Self::Choice(_) => SessionKind::Mcq,
            Self::Code(_) => SessionKind::Coding,
            Self::Rating { .. } => SessionKind::Interview,
        }
    }

    #[must_use]
    pub fn rating(&self) -> Option<Rating> {
        match self {
            Self::Rating { rating, .. } => Some(*rating),
            _ => None,
        }
    }

    /// Short human-readable rendering used in summaries and exports.
    #[must_use]
    pub fn display(&self) -> String {
        match self {
            Self::Choice(index) => index.to_string(),
            Self::Code(code) => code.clone(),
            Self::Rating { rating, notes } => match notes.as_deref() {
                Some(n) if !n.trim().is_empty() => format!("{}: {}", rating.value(), n.trim()),
                _ => rating.value().to_string(),
            },
        }
    }
}

/// The recorded answer for one item; the latest submission wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub item_id: ItemId,
    pub value: AnswerValue,
    pub submitted_at: DateTime<Utc>,
    /// `None` until the session has been scored.
    pub correct: Option<bool>,
}

impl Answer {
    #[must_use]
    pub fn new(item_id: ItemId, value: AnswerValue, submitted_at: DateTime<Utc>) -> Self {
        Self {
            item_id,
            value,
            submitted_at,
            correct: None,
        }
    }
}
