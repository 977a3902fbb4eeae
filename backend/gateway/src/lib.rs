//! `screensage-gateway` — HTTP and WebSocket surface of the pipeline.
//!
//! Exposes the upload trigger, the history query API, and the long-lived
//! viewer socket that replays recent history and then streams live events.

pub mod server;
pub mod ws;

pub use server::{GatewayState, build_router, serve};
