use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Opaque correlation token identifying one pipeline run across all of its
/// published events. Time-based, strictly increasing within a process.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProcessId(String);

static LAST_ISSUED: AtomicI64 = AtomicI64::new(0);

impl ProcessId {
    /// Mint a fresh id for a new run. Clock ties bump past the last issued
    /// value so two concurrent mints never collide.
    pub fn next() -> Self {
        let now = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        let mut prev = LAST_ISSUED.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(prev + 1);
            match LAST_ISSUED.compare_exchange_weak(
                prev,
                candidate,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return Self(format!("proc_{}", candidate)),
                Err(seen) => prev = seen,
            }
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProcessId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stages a processing run moves through. A run visits each stage at most
/// once and always ends in a terminal stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStage {
    Started,
    Recognizing,
    Recognized,
    Generating,
    Completed,
    Errored,
}

impl RunStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStage::Completed | RunStage::Errored)
    }
}

impl std::fmt::Display for RunStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = serde_json::to_value(self)
            .ok()
            .and_then(|v| v.as_str().map(String::from))
            .unwrap_or_else(|| format!("{:?}", self));
        write!(f, "{}", s)
    }
}
