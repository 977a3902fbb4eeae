//! `screensage-pipeline` — the asynchronous capture→OCR→AI→persist→broadcast
//! pipeline and its client-notification layer.
//!
//! One `PipelineCoordinator` orchestrates each processing run as a tracked
//! Tokio task; progress flows through the `BroadcastHub` to every viewer
//! registered in the `SubscriberRegistry`.

pub mod coordinator;
pub mod hub;
pub mod registry;
pub mod tracker;

pub use coordinator::{FALLBACK_ANSWER, PipelineCoordinator, PipelineTimeouts};
pub use hub::BroadcastHub;
pub use registry::{SubscriberId, SubscriberRegistry};
pub use tracker::RunTracker;
