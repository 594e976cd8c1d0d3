//! Item sources: the provider seam and the offline practice generator.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use prep_core::model::{
    Difficulty, Grading, Item, ItemDraft, ItemId, ItemQuery, SessionConfig, SessionKind,
    TestCase,
};
use storage::repository::{ItemRepository, StorageError};

use crate::error::ItemBankError;

/// Supplies items for a new session.
#[async_trait]
pub trait ItemBankProvider: Send + Sync {
    /// Between 0 and `query.limit` items of `kind`.
    ///
    /// # Errors
    ///
    /// Returns `ItemBankError` when the bank cannot be reached.
    async fn fetch_items(
        &self,
        kind: SessionKind,
        query: &ItemQuery,
    ) -> Result<Vec<Item>, ItemBankError>;
}

/// Provider backed by the stored item bank.
#[derive(Clone)]
pub struct RepositoryItemBank {
    items: Arc<dyn ItemRepository>,
}

impl RepositoryItemBank {
    #[must_use]
    pub fn new(items: Arc<dyn ItemRepository>) -> Self {
        Self { items }
    }
}

#[async_trait]
impl ItemBankProvider for RepositoryItemBank {
    async fn fetch_items(
        &self,
        kind: SessionKind,
        query: &ItemQuery,
    ) -> Result<Vec<Item>, ItemBankError> {
        if query.limit == 0 {
            return Ok(Vec::new());
        }
        match self.items.find_items(kind, query).await {
            Ok(mut items) => {
                items.truncate(query.limit as usize);
                Ok(items)
            }
            Err(StorageError::Connection(msg)) => Err(ItemBankError::Unavailable(msg)),
            Err(other) => Err(ItemBankError::Storage(other)),
        }
    }
}

/// Produces stand-in items when the bank cannot fill a session.
pub trait FallbackGenerator: Send + Sync {
    /// `needed` items of `kind` honoring `query`'s filters, with ids outside
    /// `taken`. The same inputs always yield the same items.
    fn generate(
        &self,
        kind: SessionKind,
        query: &ItemQuery,
        needed: usize,
        taken: &HashSet<ItemId>,
    ) -> Vec<Item>;
}

/// Deterministic built-in practice items, never more than
/// `SessionConfig::MAX_ITEMS` per call.
#[derive(Debug, Clone, Copy, Default)]
pub struct PracticeFallback;

impl PracticeFallback {
    /// First id handed out to generated items.
    pub const ID_BASE: u64 = 900_000;
}

const MCQ_TOPICS: &[(&str, [&str; 4], usize)] = &[
    (
        "Which structure gives O(1) average lookup by key?",
        ["Hash map", "Linked list", "Binary heap", "Sorted array"],
        0,
    ),
    (
        "Which sort is stable and runs in O(n log n) worst case?",
        ["Quick sort", "Heap sort", "Merge sort", "Selection sort"],
        2,
    ),
    (
        "What does a stack return on pop?",
        ["Oldest element", "Newest element", "Smallest element", "A random element"],
        1,
    ),
    (
        "Which traversal uses a queue?",
        ["Depth-first", "In-order", "Post-order", "Breadth-first"],
        3,
    ),
];

const CODING_TOPICS: &[(&str, &[(&str, &str)])] = &[
    (
        "Reverse the words of a sentence.",
        &[("\"hello world\"", "\"world hello\""), ("\"a\"", "\"a\"")],
    ),
    (
        "Return the maximum sum of a contiguous subarray.",
        &[("[-2,1,-3,4,-1,2,1,-5,4]", "6"), ("[1]", "1")],
    ),
    (
        "Count the distinct values in a list.",
        &[("[1,1,2,3]", "3"), ("[]", "0")],
    ),
];

const INTERVIEW_TOPICS: &[&str] = &[
    "Describe a project you are proud of and your role in it.",
    "Tell me about a time you had to learn something quickly.",
    "How do you handle conflicting priorities?",
    "Walk me through how you would debug a slow endpoint.",
];

impl FallbackGenerator for PracticeFallback {
    fn generate(
        &self,
        kind: SessionKind,
        query: &ItemQuery,
        needed: usize,
        taken: &HashSet<ItemId>,
    ) -> Vec<Item> {
        let category = query
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or("General");
        let difficulty = query.difficulty.unwrap_or(Difficulty::Medium);
        let company = query
            .company
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty());
        let topic = query
            .query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty());

        let needed = needed.min(SessionConfig::MAX_ITEMS as usize);
        let mut out = Vec::with_capacity(needed);
        let mut next_id = Self::ID_BASE;
        let mut n = 0_usize;
        while out.len() < needed {
            let id = ItemId::new(next_id);
            next_id += 1;
            if taken.contains(&id) {
                continue;
            }

            let (base_prompt, grading, estimated_secs, explanation) = match kind {
                SessionKind::Mcq => {
                    let (prompt, options, correct) = MCQ_TOPICS[n % MCQ_TOPICS.len()];
                    (
                        prompt.to_string(),
                        Grading::Choice {
                            options: options.iter().map(|o| (*o).to_string()).collect(),
                            correct,
                        },
                        60,
                        Some(format!("The expected answer is \"{}\".", options[correct])),
                    )
                }
                SessionKind::Coding => {
                    let (prompt, cases) = CODING_TOPICS[n % CODING_TOPICS.len()];
                    (
                        prompt.to_string(),
                        Grading::TestCases {
                            cases: cases
                                .iter()
                                .map(|(input, output)| TestCase::new(*input, *output))
                                .collect(),
                        },
                        900,
                        None,
                    )
                }
                SessionKind::Interview => (
                    INTERVIEW_TOPICS[n % INTERVIEW_TOPICS.len()].to_string(),
                    Grading::RatingOnly,
                    300,
                    None,
                ),
            };

            let prompt = match topic {
                Some(topic) => format!("[{topic}] {base_prompt}"),
                None => base_prompt,
            };

            let draft = ItemDraft {
                id,
                prompt: format!("Practice {}: {prompt}", n + 1),
                category: category.to_string(),
                difficulty,
                company: company.map(str::to_string),
                explanation,
                grading,
                estimated_secs,
            };
            n += 1;
            // Stop rather than loop on an invalid template.
            match draft.validate() {
                Ok(item) => out.push(item),
                Err(_) => break,
            }
        }
        out
    }
}
