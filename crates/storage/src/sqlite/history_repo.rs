use prep_core::model::{SessionKind, SessionSummary};

use super::SqliteRepository;
use super::mapping::{map_history_row, summary_to_document};
use crate::repository::{HistoryRepository, HistoryRow, StorageError, SummaryId};

fn conn(e: sqlx::Error) -> StorageError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return StorageError::Conflict;
        }
    }
    StorageError::Connection(e.to_string())
}

#[async_trait::async_trait]
impl HistoryRepository for SqliteRepository {
    async fn append_summary(&self, summary: &SessionSummary) -> Result<SummaryId, StorageError> {
        let document = summary_to_document(summary)?;

        let res = sqlx::query(
            r"
                INSERT INTO session_history (
                    namespace, session_id, completed_at, score_percent, document
                )
                VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(summary.kind().history_key())
        .bind(summary.id().to_string())
        .bind(summary.completed_at())
        .bind(i64::from(summary.score_percent()))
        .bind(document)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(res.last_insert_rowid())
    }

    async fn get_summary(&self, id: SummaryId) -> Result<SessionSummary, StorageError> {
        let row = sqlx::query(
            r"
                SELECT id, namespace, document
                FROM session_history
                WHERE id = ?1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?
        .ok_or(StorageError::NotFound)?;

        Ok(map_history_row(&row)?.summary)
    }

    async fn list_summaries(
        &self,
        kind: Option<SessionKind>,
        limit: u32,
    ) -> Result<Vec<HistoryRow>, StorageError> {
        let rows = match kind {
            Some(kind) => {
                sqlx::query(
                    r"
                        SELECT id, namespace, document
                        FROM session_history
                        WHERE namespace = ?1
                        ORDER BY completed_at DESC, id DESC
                        LIMIT ?2
                    ",
                )
                .bind(kind.history_key())
                .bind(i64::from(limit))
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(
                    r"
                        SELECT id, namespace, document
                        FROM session_history
                        ORDER BY completed_at DESC, id DESC
                        LIMIT ?1
                    ",
                )
                .bind(i64::from(limit))
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_history_row(&row)?);
        }
        Ok(out)
    }
}
