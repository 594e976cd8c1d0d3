use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::ItemId;
use crate::model::kind::{Difficulty, SessionKind};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ItemError {
    #[error("item prompt cannot be empty")]
    EmptyPrompt,

    #[error("item category cannot be empty")]
    EmptyCategory,

    #[error("estimated duration must be > 0 seconds")]
    InvalidEstimatedDuration,

    #[error("multiple-choice item needs at least one option")]
    NoOptions,

    #[error("correct option {correct} is out of range for {options} options")]
    CorrectOutOfRange { correct: usize, options: usize },

    #[error("coding item needs at least one test case")]
    NoTestCases,
}

//
// ─── GRADING DATA ──────────────────────────────────────────────────────────────
//

/// One input/expected-output pair for a coding item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub input: String,
    pub expected_output: String,
}

impl TestCase {
    #[must_use]
    pub fn new(input: impl Into<String>, expected_output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            expected_output: expected_output.into(),
        }
    }
}

/// Correctness data attached to an item. The variant fixes the item's kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Grading {
    Choice { options: Vec<String>, correct: usize },
    TestCases { cases: Vec<TestCase> },
    RatingOnly,
}

impl Grading {
    #[must_use]
    pub fn kind(&self) -> SessionKind {
        match self {
            Self::Choice { .. } => SessionKind::Mcq,
            Self::TestCases { .. } => SessionKind::Coding,
            Self::RatingOnly => SessionKind::Interview,
        }
    }

    fn validate(&self) -> Result<(), ItemError> {
        match self {
            Self::Choice { options, correct } => {
                if options.is_empty() {
                    return Err(ItemError::NoOptions);
                }
                if *correct >= options.len() {
                    return Err(ItemError::CorrectOutOfRange {
                        correct: *correct,
                        options: options.len(),
                    });
                }
                Ok(())
            }
            Self::TestCases { cases } if cases.is_empty() => Err(ItemError::NoTestCases),
            Self::TestCases { .. } | Self::RatingOnly => Ok(()),
        }
    }
}

//
// ─── ITEM ──────────────────────────────────────────────────────────────────────
//

/// Unvalidated item fields, as they arrive from a bank or a generator.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemDraft {
    pub id: ItemId,
    pub prompt: String,
    pub category: String,
    pub difficulty: Difficulty,
    pub company: Option<String>,
    pub explanation: Option<String>,
    pub grading: Grading,
    pub estimated_secs: u32,
}

impl ItemDraft {
    /// Validate and normalize the draft into an item.
    ///
    /// # Errors
    ///
    /// Returns `ItemError` when the prompt or category is blank, the duration is
    /// zero, or the grading data is inconsistent.
    pub fn validate(self) -> Result<Item, ItemError> {
        let prompt = self.prompt.trim().to_string();
        if prompt.is_empty() {
            return Err(ItemError::EmptyPrompt);
        }
        let category = self.category.trim().to_string();
        if category.is_empty() {
            return Err(ItemError::EmptyCategory);
        }
        if self.estimated_secs == 0 {
            return Err(ItemError::InvalidEstimatedDuration);
        }
        self.grading.validate()?;

        Ok(Item {
            id: self.id,
            prompt,
            category,
            difficulty: self.difficulty,
            company: normalize_optional(self.company),
            explanation: normalize_optional(self.explanation),
            grading: self.grading,
            estimated_secs: self.estimated_secs,
        })
    }
}

/// A single assessable unit shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    id: ItemId,
    prompt: String,
    category: String,
    difficulty: Difficulty,
    company: Option<String>,
    explanation: Option<String>,
    grading: Grading,
    estimated_secs: u32,
}

impl Item {
    #[must_use]
    pub fn id(&self) -> ItemId {
        self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn category(&self) -> &str {
        &self.category
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn company(&self) -> Option<&str> {
        self.company.as_deref()
    }

    #[must_use]
    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    #[must_use]
    pub fn grading(&self) -> &Grading {
        &self.grading
    }

    #[must_use]
    pub fn kind(&self) -> SessionKind {
        self.grading.kind()
    }

    #[must_use]
    pub fn estimated_secs(&self) -> u32 {
        self.estimated_secs
    }

    /// Options of a multiple-choice item; empty for other kinds.
    #[must_use]
    pub fn options(&self) -> &[String] {
        match &self.grading {
            Grading::Choice { options, .. } => options,
            _ => &[],
        }
    }

    /// Convert back into a draft, e.g. for persisting.
    #[must_use]
    pub fn to_draft(&self) -> ItemDraft {
        ItemDraft {
            id: self.id,
            prompt: self.prompt.clone(),
            category: self.category.clone(),
            difficulty: self.difficulty,
            company: self.company.clone(),
            explanation: self.explanation.clone(),
            grading: self.grading.clone(),
            estimated_secs: self.estimated_secs,
        }
    }
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|val| val.trim().to_string())
        .filter(|val| !val.is_empty())
}
