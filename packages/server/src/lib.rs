//! Hiroba chat server: real-time group chat over WebSocket.
//!
//! Layers, inside out: `domain` (value objects and ports), `codec` (wire
//! envelopes and the per-message cipher), `auth`, `hub` (the connection
//! registry and its event loop), `usecase`, `infrastructure` (in-memory
//! adapters) and `ui` (axum routes). `telemetry` holds the Prometheus series.

pub mod auth;
pub mod codec;
pub mod config;
pub mod domain;
pub mod hub;
pub mod infrastructure;
pub mod seed;
pub mod telemetry;
pub mod ui;
pub mod usecase;
