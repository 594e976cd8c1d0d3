use chrono::{DateTime, Utc};
use std::sync::Arc;

use prep_core::Clock;
use prep_core::model::{SessionId, SessionKind, SessionStatus, SessionSummary};
use storage::repository::{HistoryRepository, StorageError, SummaryId};

use crate::export::{self, ExportFormat};
use crate::error::ExportError;

/// Presentation-agnostic history row.
///
/// No pre-formatted strings; callers format timestamps and percentages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryListItem {
    pub id: SummaryId,
    pub session_id: SessionId,
    pub kind: SessionKind,
    pub status: SessionStatus,
    pub completed_at: DateTime<Utc>,
    pub score_percent: u8,
    pub items_total: u32,
    pub items_correct: u32,
    pub duration_used_secs: u32,
}

impl HistoryListItem {
    #[must_use]
    pub fn from_summary(id: SummaryId, summary: &SessionSummary) -> Self {
        Self {
            id,
            session_id: summary.id(),
            kind: summary.kind(),
            status: summary.status(),
            completed_at: summary.completed_at(),
            score_percent: summary.score_percent(),
            items_total: summary.items_total(),
            items_correct: summary.items_correct(),
            duration_used_secs: summary.duration_used_secs(),
        }
    }
}

/// Aggregate over the archived sessions of one kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindOverview {
    pub kind: SessionKind,
    pub sessions: u32,
    pub average_score: Option<u8>,
    pub best_score: Option<u8>,
    pub latest_completed_at: Option<DateTime<Utc>>,
}

/// Read side of the session archive.
#[derive(Clone)]
pub struct HistoryService {
    clock: Clock,
    history: Arc<dyn HistoryRepository>,
    default_limit: u32,
}

impl HistoryService {
    #[must_use]
    pub fn new(clock: Clock, history: Arc<dyn HistoryRepository>) -> Self {
        Self {
            clock,
            history,
            default_limit: 50,
        }
    }

    #[must_use]
    pub fn with_default_limit(mut self, limit: u32) -> Self {
        self.default_limit = limit.max(1);
        self
    }

    /// Most recent first; `limit = None` uses the configured default.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    pub async fn list_recent(
        &self,
        kind: Option<SessionKind>,
        limit: Option<u32>,
    ) -> Result<Vec<HistoryListItem>, StorageError> {
        let rows = self
            .history
            .list_summaries(kind, limit.unwrap_or(self.default_limit))
            .await?;
        Ok(rows
            .iter()
            .map(|row| HistoryListItem::from_summary(row.id, &row.summary))
            .collect())
    }

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` for an unknown id.
    pub async fn get(&self, id: SummaryId) -> Result<SessionSummary, StorageError> {
        self.history.get_summary(id).await
    }

    /// Totals over the most recent `default_limit` sessions of `kind`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    pub async fn overview(&self, kind: SessionKind) -> Result<KindOverview, StorageError> {
        let rows = self
            .history
            .list_summaries(Some(kind), self.default_limit)
            .await?;

        let sessions = u32::try_from(rows.len()).unwrap_or(u32::MAX);
        let total: u32 = rows
            .iter()
            .map(|row| u32::from(row.summary.score_percent()))
            .sum();
        let average_score = (sessions > 0)
            .then(|| u8::try_from((2 * total + sessions) / (2 * sessions)).unwrap_or(100));

        Ok(KindOverview {
            kind,
            sessions,
            average_score,
            best_score: rows.iter().map(|row| row.summary.score_percent()).max(),
            latest_completed_at: rows.iter().map(|row| row.summary.completed_at()).max(),
        })
    }

    /// Render an archived summary for download.
    ///
    /// # Errors
    ///
    /// Returns `ExportError::Storage` for an unknown id or serializer errors.
    pub async fn export(&self, id: SummaryId, format: ExportFormat) -> Result<String, ExportError> {
        let summary = self.history.get_summary(id).await?;
        match format {
            ExportFormat::Json => export::to_json(&summary, self.clock.now()),
            ExportFormat::Csv => export::to_csv(&summary),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prep_core::model::{ItemDetail, ItemId, ItemOutcome, SummaryParts};
    use prep_core::time::{fixed_clock, fixed_now};
    use storage::repository::InMemoryRepository;

    fn summary(kind: SessionKind, offset_secs: i64, score: u8) -> SessionSummary {
        let now = fixed_now();
        SessionSummary::from_parts(SummaryParts {
            id: SessionId::generate(),
            kind,
            status: SessionStatus::Completed,
            started_at: now,
            completed_at: now + chrono::Duration::seconds(offset_secs),
            items_total: 1,
            items_answered: 1,
            items_correct: 0,
            items_incorrect: 1,
            items_unanswered: 0,
            score_percent: score,
            duration_used_secs: 12,
            categories: Vec::new(),
            per_item_detail: vec![ItemDetail {
                item_id: ItemId::new(1),
                category: "General".into(),
                outcome: ItemOutcome::Incorrect,
                rating: Some(2),
                submitted: Some("2".into()),
            }],
        })
        .unwrap()
    }

    async fn service_with(rows: &[SessionSummary]) -> (HistoryService, Vec<SummaryId>) {
        let repo = InMemoryRepository::new();
        let mut ids = Vec::new();
        for row in rows {
            ids.push(repo.append_summary(row).await.unwrap());
        }
        (HistoryService::new(fixed_clock(), Arc::new(repo)), ids)
    }

    #[tokio::test]
    async fn list_recent_maps_rows_newest_first() {
        let first = summary(SessionKind::Interview, 10, 40);
        let second = summary(SessionKind::Interview, 20, 60);
        let (service, ids) = service_with(&[first, second.clone()]).await;

        let items = service.list_recent(None, None).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0], HistoryListItem::from_summary(ids[1], &second));

        let limited = service
            .list_recent(Some(SessionKind::Interview), Some(1))
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn overview_aggregates_scores_per_kind() {
        let (service, _) = service_with(&[
            summary(SessionKind::Interview, 10, 40),
            summary(SessionKind::Interview, 30, 61),
            summary(SessionKind::Mcq, 50, 100),
        ])
        .await;

        let overview = service.overview(SessionKind::Interview).await.unwrap();
        assert_eq!(overview.sessions, 2);
        assert_eq!(overview.average_score, Some(51));
        assert_eq!(overview.best_score, Some(61));
        assert_eq!(
            overview.latest_completed_at,
            Some(fixed_now() + chrono::Duration::seconds(30))
        );

        let empty = service.overview(SessionKind::Coding).await.unwrap();
        assert_eq!(empty.sessions, 0);
        assert_eq!(empty.average_score, None);
        assert_eq!(empty.latest_completed_at, None);
    }

    #[tokio::test]
    async fn export_renders_requested_format() {
        let stored = summary(SessionKind::Mcq, 5, 0);
        let (service, ids) = service_with(std::slice::from_ref(&stored)).await;

        let json = service.export(ids[0], ExportFormat::Json).await.unwrap();
        assert_eq!(export::from_json(&json).unwrap(), stored);

        let csv = service.export(ids[0], ExportFormat::Csv).await.unwrap();
        assert_eq!(csv.lines().count(), 2);

        assert!(matches!(
            service.export(999, ExportFormat::Json).await,
            Err(ExportError::Storage(StorageError::NotFound))
        ));
    }
}
