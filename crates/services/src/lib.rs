#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod export;
pub mod item_bank;
pub mod sessions;
pub mod ticks;

pub use prep_core::Clock;

pub use config::EngineSettings;
pub use error::{ExportError, ItemBankError, SessionError, SettingsError};
pub use export::ExportFormat;
pub use item_bank::{FallbackGenerator, ItemBankProvider, PracticeFallback, RepositoryItemBank};
pub use sessions::{
    AnswerFeedback, HistoryListItem, HistoryService, KindOverview, SessionController,
    SessionEngine,
};
pub use ticks::{IntervalTicks, ManualTicks, TickProbe, TickSource};
