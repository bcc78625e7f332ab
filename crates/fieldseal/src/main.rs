//! `fieldseal` binary entry point.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from environment variables.
//! 2. Initialise the telemetry pipeline (tracing + optional OTLP).
//! 3. Build the field codec from the configured key and the builtin catalog.
//! 4. Load user records and set up the credential validator.
//! 5. Build the Axum router and serve until interrupted.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use fieldseal::auth::{CredentialValidator, MemoryUserStore, TokenIssuer, UserStore};
use fieldseal::config::Config;
use fieldseal::crypto::Cipher;
use fieldseal::fields::{FieldCatalog, FieldCodec};
use fieldseal::server::{self, state::AppState};
use fieldseal::telemetry;

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e:#}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init_telemetry(cfg.otel_exporter_otlp_endpoint.as_deref(), &cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = cfg.listen_port,
        "fieldseal starting"
    );

    // -----------------------------------------------------------------------
    // 3. Field codec
    // -----------------------------------------------------------------------
    let codec = FieldCodec::new(Cipher::new(cfg.encryption_key()?));
    let catalog = FieldCatalog::builtin();
    info!(record_kinds = catalog.len(), "field catalog loaded");

    // -----------------------------------------------------------------------
    // 4. Credentials
    // -----------------------------------------------------------------------
    let store = MemoryUserStore::from_json_file(&cfg.users_file)?;
    info!(users = store.user_count(), "user records loaded");

    let issuer = TokenIssuer::new(
        &cfg.signing_secret()?,
        cfg.access_token_lifetime_secs,
        cfg.refresh_token_lifetime_secs,
    )
    .context("invalid token lifetimes")?;
    let validator = CredentialValidator::new(Arc::new(store), issuer);

    // -----------------------------------------------------------------------
    // 5. HTTP server
    // -----------------------------------------------------------------------
    let state = AppState::new(codec, catalog, validator, cfg.record_kind_header.clone());
    let router = server::router::build(state);

    let addr: std::net::SocketAddr = ([0, 0, 0, 0], cfg.listen_port).into();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(addr = %addr, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("fieldseal stopped");
    telemetry::shutdown_telemetry();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
