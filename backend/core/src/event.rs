use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::process::ProcessId;
use crate::record::ScreenshotRecord;

/// An event pushed to every connected viewer.
///
/// Wire shape is `{"type": <tag>, "payload": {...}}`, the format the viewer
/// frontend switches on. Events for one correlation id are delivered in
/// causal order (`process_start` → `ocr_complete`? → `process_error` XOR
/// `process_complete`); no ordering holds across different ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum BroadcastEvent {
    /// A run was accepted; published before any blocking work starts.
    ProcessStart { id: ProcessId, status: String },
    /// Recognition succeeded; carries the full transcript.
    OcrComplete {
        id: ProcessId,
        text: String,
        status: String,
    },
    /// The run ended without a persisted record. `text`/`answer` are set
    /// when the run had already computed them (persistence failure).
    ProcessError {
        id: ProcessId,
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        answer: Option<String>,
    },
    /// The run finished and its record was persisted under `id`.
    ProcessComplete {
        id: i64,
        process_id: ProcessId,
        text: String,
        answer: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        timestamp: DateTime<Utc>,
        thumbnail: String,
    },
    /// Replay of recent history, sent once to each subscriber on attach.
    HistorySnapshot { records: Vec<ScreenshotRecord> },
}

impl BroadcastEvent {
    /// Wire tag, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            BroadcastEvent::ProcessStart { .. } => "process_start",
            BroadcastEvent::OcrComplete { .. } => "ocr_complete",
            BroadcastEvent::ProcessError { .. } => "process_error",
            BroadcastEvent::ProcessComplete { .. } => "process_complete",
            BroadcastEvent::HistorySnapshot { .. } => "history_snapshot",
        }
    }

    /// The correlation id this event belongs to, if any.
    pub fn process_id(&self) -> Option<&ProcessId> {
        match self {
            BroadcastEvent::ProcessStart { id, .. } => Some(id),
            BroadcastEvent::OcrComplete { id, .. } => Some(id),
            BroadcastEvent::ProcessError { id, .. } => Some(id),
            BroadcastEvent::ProcessComplete { process_id, .. } => Some(process_id),
            BroadcastEvent::HistorySnapshot { .. } => None,
        }
    }
}
