use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::Utc;
use tracing::{error, info, warn};

use screensage_core::{
    AnswerGenerator, BroadcastEvent, GeneratedAnswer, NewScreenshot, ProcessId, RunStage,
    SageError, TextRecognizer,
};
use screensage_history::HistoryStore;

use crate::hub::BroadcastHub;
use crate::tracker::RunTracker;

/// Answer used when generation fails: recognition results are valuable
/// even without an AI answer, so the run still completes.
pub const FALLBACK_ANSWER: &str =
    "AI processing failed, but the recognized text is still available.";

/// Per-call budgets for the pipeline's three suspension points. A timeout
/// is handled exactly like any other failure of that call.
#[derive(Debug, Clone, Copy)]
pub struct PipelineTimeouts {
    pub recognize: Duration,
    pub generate: Duration,
    pub persist: Duration,
}

impl Default for PipelineTimeouts {
    fn default() -> Self {
        Self {
            recognize: Duration::from_secs(30),
            generate: Duration::from_secs(60),
            persist: Duration::from_secs(10),
        }
    }
}

/// Orchestrates one processing run per submitted screenshot: mints the
/// correlation id, walks the run through recognition, generation, and
/// persistence, and reports progress through the broadcast hub.
///
/// Capabilities are injected once at construction and never swapped. Each
/// run is an independent Tokio task registered with the run tracker; a run
/// always reaches a terminal stage on its own and is not abortable.
#[derive(Clone)]
pub struct PipelineCoordinator {
    recognizer: Arc<dyn TextRecognizer>,
    generator: Arc<dyn AnswerGenerator>,
    store: Arc<dyn HistoryStore>,
    hub: BroadcastHub,
    tracker: Arc<RunTracker>,
    timeouts: PipelineTimeouts,
}

impl PipelineCoordinator {
    pub fn new(
        recognizer: Arc<dyn TextRecognizer>,
        generator: Arc<dyn AnswerGenerator>,
        store: Arc<dyn HistoryStore>,
        hub: BroadcastHub,
        tracker: Arc<RunTracker>,
        timeouts: PipelineTimeouts,
    ) -> Self {
        Self {
            recognizer,
            generator,
            store,
            hub,
            tracker,
            timeouts,
        }
    }

    pub fn tracker(&self) -> &Arc<RunTracker> {
        &self.tracker
    }

    /// Accept raw image bytes and return the run's correlation id
    /// immediately; processing continues asynchronously. `process_start`
    /// is published before any blocking work, so subscribers see intent
    /// even when recognition is slow.
    pub async fn submit(&self, image: Vec<u8>) -> ProcessId {
        let pid = ProcessId::next();
        info!(process = %pid, bytes = image.len(), "screenshot accepted");
        self.hub
            .publish(BroadcastEvent::ProcessStart {
                id: pid.clone(),
                status: "processing image".to_string(),
            })
            .await;

        let runner = self.clone();
        let task_pid = pid.clone();
        let handle = tokio::spawn(async move { runner.run(task_pid, image).await });
        self.tracker.track(pid.clone(), handle).await;
        pid
    }

    async fn run(self, pid: ProcessId, image: Vec<u8>) {
        let image_base64 = STANDARD.encode(&image);
        let thumbnail = format!("data:image/png;base64,{}", image_base64);

        self.tracker.advance(&pid, RunStage::Recognizing).await;
        let recognized = bounded(
            self.timeouts.recognize,
            "recognition",
            SageError::Recognition,
            self.recognizer.recognize(&image_base64),
        )
        .await;
        let text = match recognized {
            Ok(text) => text,
            Err(err) => {
                warn!(process = %pid, error = %err, "recognition failed, terminating run");
                self.hub
                    .publish(BroadcastEvent::ProcessError {
                        id: pid.clone(),
                        error: err.to_string(),
                        text: None,
                        answer: None,
                    })
                    .await;
                self.tracker.advance(&pid, RunStage::Errored).await;
                return;
            }
        };

        self.tracker.advance(&pid, RunStage::Recognized).await;
        self.hub
            .publish(BroadcastEvent::OcrComplete {
                id: pid.clone(),
                text: text.clone(),
                status: "recognition complete, generating answer".to_string(),
            })
            .await;

        self.tracker.advance(&pid, RunStage::Generating).await;
        let generated = match bounded(
            self.timeouts.generate,
            "generation",
            SageError::Generation,
            self.generator.generate(&text),
        )
        .await
        {
            Ok(generated) => generated,
            Err(err) => {
                warn!(process = %pid, error = %err, "generation failed, using fallback answer");
                GeneratedAnswer {
                    answer: FALLBACK_ANSWER.to_string(),
                    title: None,
                }
            }
        };

        let record = NewScreenshot {
            timestamp: Utc::now(),
            image_path: String::new(),
            thumbnail,
            text,
            answer: generated.answer,
            title: generated.title,
        };
        let persisted = bounded(
            self.timeouts.persist,
            "persistence",
            SageError::Persistence,
            self.store.append(record.clone()),
        )
        .await;
        match persisted {
            Ok(id) => {
                info!(process = %pid, record = id, "run complete");
                self.hub
                    .publish(BroadcastEvent::ProcessComplete {
                        id,
                        process_id: pid.clone(),
                        text: record.text,
                        answer: record.answer,
                        title: record.title,
                        timestamp: record.timestamp,
                        thumbnail: record.thumbnail,
                    })
                    .await;
            }
            Err(err) => {
                // the computed content still reaches subscribers even
                // though no record was stored
                error!(process = %pid, error = %err, "persistence failed");
                self.hub
                    .publish(BroadcastEvent::ProcessError {
                        id: pid.clone(),
                        error: err.to_string(),
                        text: Some(record.text),
                        answer: Some(record.answer),
                    })
                    .await;
            }
        }
        self.tracker.advance(&pid, RunStage::Completed).await;
    }
}

async fn bounded<T, F>(
    limit: Duration,
    what: &str,
    wrap: fn(String) -> SageError,
    fut: F,
) -> Result<T, SageError>
where
    F: Future<Output = Result<T, SageError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(wrap(format!(
            "{} timed out after {}s",
            what,
            limit.as_secs()
        ))),
    }
}
