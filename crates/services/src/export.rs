//! Portable renderings of an archived summary.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use prep_core::model::SessionSummary;
use serde::{Deserialize, Serialize};

use crate::error::ExportError;

/// Output format for `HistoryService::export`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
}

impl ExportFormat {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            _ => Err(ExportError::UnknownFormat(s.to_string())),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<'a> {
    exported_at: DateTime<Utc>,
    summary: &'a SessionSummary,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Incoming {
    Envelope { summary: SessionSummary },
    Bare(SessionSummary),
}

/// Pretty JSON envelope `{exportedAt, summary}`.
///
/// # Errors
///
/// Returns `ExportError::Json` if serialization fails.
pub fn to_json(summary: &SessionSummary, exported_at: DateTime<Utc>) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(&Envelope {
        exported_at,
        summary,
    })?)
}

/// Read a summary back from an export envelope or a bare summary document.
/// `exportedAt` is ignored.
///
/// # Errors
///
/// Returns `ExportError::Json` for malformed or inconsistent documents.
pub fn from_json(raw: &str) -> Result<SessionSummary, ExportError> {
    let incoming: Incoming = serde_json::from_str(raw)?;
    Ok(match incoming {
        Incoming::Envelope { summary } | Incoming::Bare(summary) => summary,
    })
}

#[derive(Serialize)]
struct CsvRow<'a> {
    session_id: String,
    kind: &'static str,
    status: &'static str,
    started_at: String,
    completed_at: String,
    score_percent: u8,
    duration_used_secs: u32,
    item_id: u64,
    category: &'a str,
    outcome: &'static str,
    rating: Option<u8>,
    submitted: Option<&'a str>,
}

/// One CSV row per item, each repeating the session columns.
///
/// # Errors
///
/// Returns `ExportError::Csv` on writer failures.
pub fn to_csv(summary: &SessionSummary) -> Result<String, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let session_id = summary.id().to_string();
    let started_at = summary.started_at().to_rfc3339();
    let completed_at = summary.completed_at().to_rfc3339();

    for detail in summary.per_item_detail() {
        writer.serialize(CsvRow {
            session_id: session_id.clone(),
            kind: summary.kind().as_str(),
            status: summary.status().as_str(),
            started_at: started_at.clone(),
            completed_at: completed_at.clone(),
            score_percent: summary.score_percent(),
            duration_used_secs: summary.duration_used_secs(),
            item_id: detail.item_id.value(),
            category: &detail.category,
            outcome: detail.outcome.as_str(),
            rating: detail.rating,
            submitted: detail.submitted.as_deref(),
        })?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Csv(e.into_error().into()))?;
    String::from_utf8(bytes).map_err(|_| ExportError::Encoding)
}
