use prep_core::model::{Item, ItemQuery, SessionKind};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{grading_to_json, item_id_to_i64, map_item_row, ser};
use crate::repository::{ItemRepository, StorageError};

fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn trimmed(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[async_trait::async_trait]
impl ItemRepository for SqliteRepository {
    async fn upsert_item(&self, item: &Item) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO items (
                    id, kind, prompt, category, difficulty,
                    company, explanation, grading, estimated_secs
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                ON CONFLICT(id) DO UPDATE SET
                    kind = excluded.kind,
                    prompt = excluded.prompt,
                    category = excluded.category,
                    difficulty = excluded.difficulty,
                    company = excluded.company,
                    explanation = excluded.explanation,
                    grading = excluded.grading,
                    estimated_secs = excluded.estimated_secs
            ",
        )
        .bind(item_id_to_i64(item.id())?)
        .bind(item.kind().as_str())
        .bind(item.prompt())
        .bind(item.category())
        .bind(item.difficulty().as_str())
        .bind(item.company())
        .bind(item.explanation())
        .bind(grading_to_json(item.grading())?)
        .bind(i64::from(item.estimated_secs()))
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn find_items(
        &self,
        kind: SessionKind,
        query: &ItemQuery,
    ) -> Result<Vec<Item>, StorageError> {
        let text = trimmed(query.query.as_deref());
        let category = trimmed(query.category.as_deref());
        let company = trimmed(query.company.as_deref());

        let mut sql = String::from(
            r"
                SELECT
                    id, kind, prompt, category, difficulty,
                    company, explanation, grading, estimated_secs
                FROM items
                WHERE kind = ?1
            ",
        );

        let mut bind_index = 2;
        if text.is_some() {
            sql.push_str(" AND instr(lower(prompt), lower(?");
            sql.push_str(&bind_index.to_string());
            sql.push_str(")) > 0");
            bind_index += 1;
        }
        if category.is_some() {
            sql.push_str(" AND category = ?");
            sql.push_str(&bind_index.to_string());
            sql.push_str(" COLLATE NOCASE");
            bind_index += 1;
        }
        if query.difficulty.is_some() {
            sql.push_str(" AND difficulty = ?");
            sql.push_str(&bind_index.to_string());
            bind_index += 1;
        }
        if company.is_some() {
            sql.push_str(" AND company = ?");
            sql.push_str(&bind_index.to_string());
            sql.push_str(" COLLATE NOCASE");
            bind_index += 1;
        }
        sql.push_str(" ORDER BY id ASC LIMIT ?");
        sql.push_str(&bind_index.to_string());

        let mut q = sqlx::query(&sql).bind(kind.as_str());
        if let Some(text) = text {
            q = q.bind(text);
        }
        if let Some(category) = category {
            q = q.bind(category);
        }
        if let Some(difficulty) = query.difficulty {
            q = q.bind(difficulty.as_str());
        }
        if let Some(company) = company {
            q = q.bind(company);
        }
        q = q.bind(i64::from(query.limit));

        let rows = q.fetch_all(&self.pool).await.map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_item_row(&row)?);
        }
        Ok(out)
    }

    async fn count_items(&self, kind: SessionKind) -> Result<u64, StorageError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM items WHERE kind = ?1")
            .bind(kind.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(conn)?;
        let n: i64 = row.try_get("n").map_err(ser)?;
        u64::try_from(n).map_err(ser)
    }
}
