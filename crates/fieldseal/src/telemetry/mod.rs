//! Structured logging and optional OTLP span export.
//!
//! # Telemetry invariants
//!
//! - **No plaintext field values, passwords, tokens, or key material** may appear
//!   in any span attribute or log field.
//! - Log level is configurable via `LOG_LEVEL` (default: `info`).

pub mod init;

pub use init::{init_telemetry, shutdown_telemetry};
