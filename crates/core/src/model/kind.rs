use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The flavour of assessment a session runs.
///
/// All three kinds share one state machine; the kind only decides which answer
/// values are accepted and how the scorer grades them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    /// Multiple-choice quiz.
    Mcq,
    /// Coding practice in test mode.
    Coding,
    /// Mock face-to-face interview, self-rated.
    Interview,
}

impl SessionKind {
    pub const ALL: [SessionKind; 3] = [Self::Mcq, Self::Coding, Self::Interview];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mcq => "mcq",
            Self::Coding => "coding",
            Self::Interview => "interview",
        }
    }

    /// Storage namespace holding the history of this kind.
    #[must_use]
    pub fn history_key(self) -> &'static str {
        match self {
            Self::Mcq => "prep.history.mcq",
            Self::Coding => "prep.history.coding",
            Self::Interview => "prep.history.interview",
        }
    }

    /// Whether items of this kind are graded by a self-reported rating.
    #[must_use]
    pub fn is_rating_only(self) -> bool {
        matches!(self, Self::Interview)
    }
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relative difficulty of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Easy => "Easy",
            Self::Medium => "Medium",
            Self::Hard => "Hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown {what}: {raw}")]
pub struct ParseKindError {
    what: &'static str,
    raw: String,
}

impl FromStr for SessionKind {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mcq" | "quiz" => Ok(Self::Mcq),
            "coding" => Ok(Self::Coding),
            "interview" => Ok(Self::Interview),
            _ => Err(ParseKindError {
                what: "session kind",
                raw: s.to_string(),
            }),
        }
    }
}

impl FromStr for Difficulty {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            _ => Err(ParseKindError {
                what: "difficulty",
                raw: s.to_string(),
            }),
        }
    }
}
