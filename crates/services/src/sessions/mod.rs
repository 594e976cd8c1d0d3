mod controller;
mod engine;
mod history;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use controller::{AnswerFeedback, SessionController};
pub use engine::SessionEngine;
pub use history::{HistoryListItem, HistoryService, KindOverview};
