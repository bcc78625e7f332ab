//! Field-level encryption for externally-owned records, with credential
//! validation and token issuance in front of it.

pub mod auth;
pub mod config;
pub mod crypto;
pub mod fields;
pub mod server;
pub mod telemetry;
