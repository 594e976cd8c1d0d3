mod answer;
mod config;
mod ids;
mod item;
mod item_set;
mod kind;
mod session;

pub use answer::{Answer, AnswerError, AnswerValue, Rating};
pub use config::{SessionConfig, SessionConfigError};
pub use ids::{ItemId, ParseIdError, SessionId};
pub use item::{Grading, Item, ItemDraft, ItemError, TestCase};
pub use item_set::{ItemQuery, ItemSet, ItemSetError};
pub use kind::{Difficulty, ParseKindError, SessionKind};
pub use session::{
    CategoryBreakdown, ItemDetail, ItemOutcome, SessionStatus, SessionSummary,
    SessionSummaryError, SummaryParts,
};

#[cfg(test)]
pub(crate) use item::fixtures;
