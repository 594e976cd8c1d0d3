use prep_core::model::{
    Difficulty, Grading, Item, ItemDraft, ItemId, SessionKind, SessionSummary,
};
use sqlx::Row;

use crate::repository::{HistoryRow, StorageError};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn item_id_to_i64(id: ItemId) -> Result<i64, StorageError> {
    i64::try_from(id.value()).map_err(|_| StorageError::Serialization("item_id overflow".into()))
}

fn item_id_from_i64(v: i64) -> Result<ItemId, StorageError> {
    u64::try_from(v)
        .map(ItemId::new)
        .map_err(|_| StorageError::Serialization("item_id sign overflow".into()))
}

pub(crate) fn parse_kind(s: &str) -> Result<SessionKind, StorageError> {
    match s {
        "mcq" => Ok(SessionKind::Mcq),
        "coding" => Ok(SessionKind::Coding),
        "interview" => Ok(SessionKind::Interview),
        _ => Err(StorageError::Serialization(format!("invalid kind: {s}"))),
    }
}

pub(crate) fn parse_difficulty(s: &str) -> Result<Difficulty, StorageError> {
    match s {
        "Easy" => Ok(Difficulty::Easy),
        "Medium" => Ok(Difficulty::Medium),
        "Hard" => Ok(Difficulty::Hard),
        _ => Err(StorageError::Serialization(format!("invalid difficulty: {s}"))),
    }
}

pub(crate) fn grading_to_json(grading: &Grading) -> Result<String, StorageError> {
    serde_json::to_string(grading).map_err(ser)
}

pub(crate) fn map_item_row(row: &sqlx::sqlite::SqliteRow) -> Result<Item, StorageError> {
    let kind = parse_kind(row.try_get::<String, _>("kind").map_err(ser)?.as_str())?;
    let grading: Grading =
        serde_json::from_str(row.try_get::<String, _>("grading").map_err(ser)?.as_str())
            .map_err(ser)?;
    if grading.kind() != kind {
        return Err(StorageError::Serialization(format!(
            "grading does not match kind {kind}"
        )));
    }

    let estimated: i64 = row.try_get("estimated_secs").map_err(ser)?;
    let estimated_secs = u32::try_from(estimated)
        .map_err(|_| StorageError::Serialization(format!("invalid estimated_secs: {estimated}")))?;

    ItemDraft {
        id: item_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        prompt: row.try_get("prompt").map_err(ser)?,
        category: row.try_get("category").map_err(ser)?,
        difficulty: parse_difficulty(row.try_get::<String, _>("difficulty").map_err(ser)?.as_str())?,
        company: row.try_get("company").map_err(ser)?,
        explanation: row.try_get("explanation").map_err(ser)?,
        grading,
        estimated_secs,
    }
    .validate()
    .map_err(ser)
}

pub(crate) fn summary_to_document(summary: &SessionSummary) -> Result<String, StorageError> {
    serde_json::to_string(summary).map_err(ser)
}

pub(crate) fn map_history_row(row: &sqlx::sqlite::SqliteRow) -> Result<HistoryRow, StorageError> {
    let id: i64 = row.try_get("id").map_err(ser)?;
    let document: String = row.try_get("document").map_err(ser)?;
    let summary: SessionSummary = serde_json::from_str(&document).map_err(ser)?;

    let namespace: String = row.try_get("namespace").map_err(ser)?;
    if namespace != summary.kind().history_key() {
        return Err(StorageError::Serialization(format!(
            "summary {id} stored under {namespace} but is {}",
            summary.kind()
        )));
    }

    Ok(HistoryRow::new(id, summary))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_kinds_only() {
        assert_eq!(parse_kind("coding").unwrap(), SessionKind::Coding);
        assert!(parse_kind("Coding").is_err());
    }

    #[test]
    fn difficulty_uses_display_spelling() {
        for d in [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard] {
            assert_eq!(parse_difficulty(d.as_str()).unwrap(), d);
        }
    }
}
