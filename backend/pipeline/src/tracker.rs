use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

use screensage_core::{ProcessId, RunStage};

struct RunState {
    handle: JoinHandle<()>,
    stage: RunStage,
    started_at: DateTime<Utc>,
}

/// Tracks every in-flight processing run by correlation id, replacing
/// fire-and-forget spawns with handles whose lifecycle is observable and
/// awaitable. Entries for terminal runs are removed as soon as the run
/// reports its terminal stage.
pub struct RunTracker {
    runs: Mutex<HashMap<ProcessId, RunState>>,
}

impl RunTracker {
    pub fn new() -> Self {
        Self {
            runs: Mutex::new(HashMap::new()),
        }
    }

    /// Register a freshly spawned run.
    pub async fn track(&self, id: ProcessId, handle: JoinHandle<()>) {
        let mut runs = self.runs.lock().await;
        runs.retain(|_, state| !state.handle.is_finished());
        debug!(process = %id, active = runs.len() + 1, "run tracked");
        runs.insert(
            id,
            RunState {
                handle,
                stage: RunStage::Started,
                started_at: Utc::now(),
            },
        );
    }

    /// Record a stage transition. A terminal stage destroys the entry; the
    /// run is never revisited.
    pub async fn advance(&self, id: &ProcessId, stage: RunStage) {
        let mut runs = self.runs.lock().await;
        if stage.is_terminal() {
            if let Some(state) = runs.remove(id) {
                debug!(
                    process = %id,
                    stage = %stage,
                    elapsed_ms = (Utc::now() - state.started_at).num_milliseconds(),
                    "run reached terminal stage"
                );
            }
            return;
        }
        if let Some(state) = runs.get_mut(id) {
            state.stage = stage;
        }
    }

    /// Current stage of a run, or None once it reached a terminal stage.
    pub async fn stage(&self, id: &ProcessId) -> Option<RunStage> {
        self.runs.lock().await.get(id).map(|state| state.stage)
    }

    /// Number of runs not yet terminal.
    pub async fn active(&self) -> usize {
        let mut runs = self.runs.lock().await;
        runs.retain(|_, state| !state.handle.is_finished());
        runs.len()
    }

    /// Await one run's task, if it is still tracked.
    pub async fn wait(&self, id: &ProcessId) {
        let state = self.runs.lock().await.remove(id);
        if let Some(state) = state {
            let _ = state.handle.await;
        }
    }

    /// Await every tracked run; used to drain in-flight work at shutdown.
    pub async fn wait_all(&self) {
        let drained: Vec<RunState> = {
            let mut runs = self.runs.lock().await;
            runs.drain().map(|(_, state)| state).collect()
        };
        for state in drained {
            let _ = state.handle.await;
        }
    }
}

impl Default for RunTracker {
    fn default() -> Self {
        Self::new()
    }
}
