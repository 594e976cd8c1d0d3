use async_trait::async_trait;
use prep_core::model::{Item, ItemId, ItemQuery, SessionId, SessionKind, SessionSummary};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Storage identifier for an archived summary.
///
/// NOTE: This is `i64` to match `SQLite` row IDs.
pub type SummaryId = i64;

/// A summary together with its storage identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRow {
    pub id: SummaryId,
    pub summary: SessionSummary,
}

impl HistoryRow {
    #[must_use]
    pub fn new(id: SummaryId, summary: SessionSummary) -> Self {
        Self { id, summary }
    }
}

/// Repository contract for the local item bank.
#[async_trait]
pub trait ItemRepository: Send + Sync {
    /// Persist or replace an item.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the item cannot be stored.
    async fn upsert_item(&self, item: &Item) -> Result<(), StorageError>;

    /// Items of `kind` matching `query`, ordered by id, at most `query.limit`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn find_items(&self, kind: SessionKind, query: &ItemQuery)
    -> Result<Vec<Item>, StorageError>;

    /// Number of stored items of `kind`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn count_items(&self, kind: SessionKind) -> Result<u64, StorageError>;
}

/// Append-only archive of session summaries.
///
/// There is deliberately no update or delete: an appended entry is final.
#[async_trait]
pub trait HistoryRepository: Send + Sync {
    /// Append a summary.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if a summary for the same session was
    /// already appended, or other storage errors.
    async fn append_summary(&self, summary: &SessionSummary) -> Result<SummaryId, StorageError>;

    /// Fetch a summary by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_summary(&self, id: SummaryId) -> Result<SessionSummary, StorageError>;

    /// Most recent summaries first; ties on completion time put the later
    /// insertion first. `kind = None` lists every namespace.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_summaries(
        &self,
        kind: Option<SessionKind>,
        limit: u32,
    ) -> Result<Vec<HistoryRow>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    items: Arc<Mutex<BTreeMap<ItemId, Item>>>,
    history: Arc<Mutex<Vec<HistoryRow>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl ItemRepository for InMemoryRepository {
    async fn upsert_item(&self, item: &Item) -> Result<(), StorageError> {
        let mut guard = self.items.lock().map_err(poisoned)?;
        guard.insert(item.id(), item.clone());
        Ok(())
    }

    async fn find_items(
        &self,
        kind: SessionKind,
        query: &ItemQuery,
    ) -> Result<Vec<Item>, StorageError> {
        let guard = self.items.lock().map_err(poisoned)?;
        Ok(guard
            .values()
            .filter(|item| item.kind() == kind && query.matches(item))
            .take(query.limit as usize)
            .cloned()
            .collect())
    }

    async fn count_items(&self, kind: SessionKind) -> Result<u64, StorageError> {
        let guard = self.items.lock().map_err(poisoned)?;
        Ok(guard.values().filter(|item| item.kind() == kind).count() as u64)
    }
}

#[async_trait]
impl HistoryRepository for InMemoryRepository {
    async fn append_summary(&self, summary: &SessionSummary) -> Result<SummaryId, StorageError> {
        let mut guard = self.history.lock().map_err(poisoned)?;
        if guard.iter().any(|row| row.summary.id() == summary.id()) {
            return Err(StorageError::Conflict);
        }
        let id = SummaryId::try_from(guard.len() + 1)
            .map_err(|_| StorageError::Serialization("summary id overflow".into()))?;
        guard.push(HistoryRow::new(id, summary.clone()));
        Ok(id)
    }

    async fn get_summary(&self, id: SummaryId) -> Result<SessionSummary, StorageError> {
        let guard = self.history.lock().map_err(poisoned)?;
        guard
            .iter()
            .find(|row| row.id == id)
            .map(|row| row.summary.clone())
            .ok_or(StorageError::NotFound)
    }

    async fn list_summaries(
        &self,
        kind: Option<SessionKind>,
        limit: u32,
    ) -> Result<Vec<HistoryRow>, StorageError> {
        let guard = self.history.lock().map_err(poisoned)?;
        let mut rows: Vec<HistoryRow> = guard
            .iter()
            .filter(|row| kind.is_none_or(|k| row.summary.kind() == k))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.summary
                .completed_at()
                .cmp(&a.summary.completed_at())
                .then(b.id.cmp(&a.id))
        });
        rows.truncate(limit as usize);
        Ok(rows)
    }
}

impl InMemoryRepository {
    /// Whether a summary for `session_id` has been archived.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn contains_session(&self, session_id: SessionId) -> Result<bool, StorageError> {
        let guard = self.history.lock().map_err(poisoned)?;
        Ok(guard.iter().any(|row| row.summary.id() == session_id))
    }
}

/// Aggregates the item bank and history repositories behind trait objects for
/// easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub items: Arc<dyn ItemRepository>,
    pub history: Arc<dyn HistoryRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let items: Arc<dyn ItemRepository> = Arc::new(repo.clone());
        let history: Arc<dyn HistoryRepository> = Arc::new(repo);
        Self { items, history }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use prep_core::model::{
        Difficulty, Grading, ItemDetail, ItemDraft, ItemOutcome, SessionStatus, SummaryParts,
    };
    use prep_core::time::fixed_now;

    fn build_item(id: u64, kind: SessionKind, category: &str) -> Item {
        let grading = match kind {
            SessionKind::Mcq => Grading::Choice {
                options: vec!["yes".into(), "no".into()],
                correct: 0,
            },
            SessionKind::Coding => Grading::TestCases {
                cases: vec![prep_core::model::TestCase::new("1", "1")],
            },
            SessionKind::Interview => Grading::RatingOnly,
        };
        ItemDraft {
            id: ItemId::new(id),
            prompt: format!("Prompt {id}"),
            category: category.into(),
            difficulty: Difficulty::Easy,
            company: None,
            explanation: None,
            grading,
            estimated_secs: 60,
        }
        .validate()
        .unwrap()
    }

    fn build_summary(kind: SessionKind, completed_offset_secs: i64) -> SessionSummary {
        let now = fixed_now();
        SessionSummary::from_parts(SummaryParts {
            id: SessionId::generate(),
            kind,
            status: SessionStatus::Completed,
            started_at: now,
            completed_at: now + Duration::seconds(completed_offset_secs),
            items_total: 1,
            items_answered: 1,
            items_correct: 1,
            items_incorrect: 0,
            items_unanswered: 0,
            score_percent: 100,
            duration_used_secs: 10,
            categories: Vec::new(),
            per_item_detail: vec![ItemDetail {
                item_id: ItemId::new(1),
                category: "General".into(),
                outcome: ItemOutcome::Correct,
                rating: None,
                submitted: Some("0".into()),
            }],
        })
        .unwrap()
    }

    #[tokio::test]
    async fn find_items_filters_by_kind_and_limit() {
        let repo = InMemoryRepository::new();
        for id in 1..=4 {
            repo.upsert_item(&build_item(id, SessionKind::Mcq, "Arrays"))
                .await
                .unwrap();
        }
        repo.upsert_item(&build_item(10, SessionKind::Interview, "Behavioral"))
            .await
            .unwrap();

        let found = repo
            .find_items(SessionKind::Mcq, &ItemQuery::with_limit(3))
            .await
            .unwrap();
        let ids: Vec<u64> = found.iter().map(|i| i.id().value()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(repo.count_items(SessionKind::Interview).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn history_lists_most_recent_first_with_insertion_tiebreak() {
        let repo = InMemoryRepository::new();
        let older = build_summary(SessionKind::Mcq, 10);
        let tie_a = build_summary(SessionKind::Mcq, 60);
        let tie_b = build_summary(SessionKind::Mcq, 60);
        let other = build_summary(SessionKind::Coding, 90);

        let id_older = repo.append_summary(&older).await.unwrap();
        let id_a = repo.append_summary(&tie_a).await.unwrap();
        let id_b = repo.append_summary(&tie_b).await.unwrap();
        repo.append_summary(&other).await.unwrap();

        let rows = repo
            .list_summaries(Some(SessionKind::Mcq), 10)
            .await
            .unwrap();
        let ids: Vec<SummaryId> = rows.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![id_b, id_a, id_older]);

        let all = repo.list_summaries(None, 2).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].summary.kind(), SessionKind::Coding);
    }

    #[tokio::test]
    async fn history_rejects_second_summary_for_same_session() {
        let repo = InMemoryRepository::new();
        let summary = build_summary(SessionKind::Mcq, 5);
        repo.append_summary(&summary).await.unwrap();
        let err = repo.append_summary(&summary).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
        assert_eq!(repo.list_summaries(None, 10).await.unwrap().len(), 1);
        assert!(repo.contains_session(summary.id()).unwrap());
    }

    #[tokio::test]
    async fn get_summary_reports_missing_rows() {
        let repo = InMemoryRepository::new();
        assert!(matches!(
            repo.get_summary(42).await.unwrap_err(),
            StorageError::NotFound
        ));
    }
}
