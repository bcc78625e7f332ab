//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use crate::auth::CredentialValidator;
use crate::fields::{FieldCatalog, FieldCodec};

/// Application state shared across all request handlers.
///
/// Every field is `Arc`-backed, so Axum's per-request clone is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Seals and opens individual field values.
    pub codec: FieldCodec,
    /// Record kind → encrypted field paths.
    pub catalog: Arc<FieldCatalog>,
    /// Credential checks and token issuance.
    pub validator: CredentialValidator,
    /// Name of the HTTP header naming the record kind on `/fields/*` requests.
    pub record_kind_header: Arc<String>,
}

impl AppState {
    pub fn new(
        codec: FieldCodec,
        catalog: FieldCatalog,
        validator: CredentialValidator,
        record_kind_header: String,
    ) -> Self {
        Self {
            codec,
            catalog: Arc::new(catalog),
            validator,
            record_kind_header: Arc::new(record_kind_header),
        }
    }
}
