//! Axum request handlers for all service endpoints.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use common::{
    protocol::{
        DecryptResponse, EncryptResponse, ErrorResponse, FieldsRequest, HealthResponse,
        LoginRequest, LoginResponse, RefreshRequest, RefreshResponse, VerifyRequest,
        VerifyResponse,
    },
    ServiceError,
};
use tracing::{error, info, warn};

use super::state::AppState;
use crate::auth::CredentialError;
use crate::crypto::CipherError;
use crate::fields::FieldPaths;

/// `POST /auth/login`: exchange email and password for a token pair.
///
/// Credential failures return `400` with a per-input error map such as
/// `{"password": ["incorrect password"]}`.
pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Response {
    let req = match body {
        Ok(Json(req)) => req,
        Err(rejection) => return bad_body(rejection),
    };
    if let Some(missing) = req.missing_fields() {
        return (StatusCode::BAD_REQUEST, Json(missing)).into_response();
    }

    let validator = state.validator.clone();
    let outcome =
        tokio::task::spawn_blocking(move || validator.validate(&req.email, &req.password)).await;

    let result = match outcome {
        Ok(result) => result,
        Err(e) => {
            error!(error = %e, "credential check task failed");
            return error_response(ServiceError::Internal("credential check failed".into()));
        }
    };

    match result {
        Ok(auth) => {
            let body = LoginResponse {
                access: auth.tokens.access,
                refresh: auth.tokens.refresh,
                user: auth.user,
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => match e.field_errors() {
            Some(errors) => (StatusCode::BAD_REQUEST, Json(errors)).into_response(),
            None => match e {
                CredentialError::Store(store) => {
                    warn!(error = %store, "user store unavailable during login");
                    error_response(ServiceError::Unavailable("user store unavailable".into()))
                }
                other => {
                    error!(error = %other, "token issuance failed");
                    error_response(ServiceError::Internal("token issuance failed".into()))
                }
            },
        },
    }
}

/// `POST /token/refresh`: rotate a refresh token into a new pair.
///
/// The presented refresh token is revoked; presenting it again returns `401`.
pub async fn refresh(
    State(state): State<AppState>,
    body: Result<Json<RefreshRequest>, JsonRejection>,
) -> Response {
    let req = match body {
        Ok(Json(req)) => req,
        Err(rejection) => return bad_body(rejection),
    };
    match state.validator.issuer().refresh(&req.refresh).await {
        Ok(pair) => {
            let body = RefreshResponse {
                access: pair.access,
                refresh: pair.refresh,
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => error_response(ServiceError::Unauthorized(e.to_string())),
    }
}

/// `POST /token/verify`: check a token's signature, expiry, and revocation.
pub async fn verify(
    State(state): State<AppState>,
    body: Result<Json<VerifyRequest>, JsonRejection>,
) -> Response {
    let req = match body {
        Ok(Json(req)) => req,
        Err(rejection) => return bad_body(rejection),
    };
    match state.validator.issuer().verify(&req.token).await {
        Ok(claims) => match serde_json::to_value(&claims) {
            Ok(claims) => {
                let body = VerifyResponse {
                    valid: true,
                    claims: Some(claims),
                    reason: None,
                };
                (StatusCode::OK, Json(body)).into_response()
            }
            Err(e) => error_response(ServiceError::Internal(e.to_string())),
        },
        Err(e) => {
            let body = VerifyResponse {
                valid: false,
                claims: None,
                reason: Some(e.to_string()),
            };
            (StatusCode::UNAUTHORIZED, Json(body)).into_response()
        }
    }
}

/// `POST /fields/encrypt`: seal the catalogued fields of a record.
///
/// The record kind is taken from the configured header (`X-Record-Kind` by
/// default). Catalogued fields are replaced with lowercase hex envelopes;
/// absent and `null` fields are left alone.
pub async fn encrypt_fields(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<FieldsRequest>, JsonRejection>,
) -> Response {
    let req = match body {
        Ok(Json(req)) => req,
        Err(rejection) => return bad_body(rejection),
    };
    let (kind, paths) = match resolve_kind(&state, &headers) {
        Ok(found) => found,
        Err(e) => return error_response(e),
    };
    let mut payload = req.payload;
    if !payload.is_object() {
        return error_response(ServiceError::BadRequest("payload must be a JSON object".into()));
    }

    match state.codec.seal_record(&mut payload, paths.iter()) {
        Ok(sealed) => {
            info!(record_kind = %kind, sealed, "record fields sealed");
            (StatusCode::OK, Json(EncryptResponse { payload })).into_response()
        }
        Err(e) => {
            warn!(record_kind = %kind, field = %e.path, error = %e.source, "field sealing failed");
            match e.source {
                CipherError::PlaintextType(_) => error_response(ServiceError::BadRequest(e.to_string())),
                _ => error_response(ServiceError::EncryptionFailure(format!(
                    "cannot seal field {}",
                    e.path
                ))),
            }
        }
    }
}

/// `POST /fields/decrypt`: open the catalogued fields of a record.
///
/// Never fails per field: an undecodable field becomes `null` and its
/// location is listed in `failed_fields`.
pub async fn decrypt_fields(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<FieldsRequest>, JsonRejection>,
) -> Response {
    let req = match body {
        Ok(Json(req)) => req,
        Err(rejection) => return bad_body(rejection),
    };
    let (kind, paths) = match resolve_kind(&state, &headers) {
        Ok(found) => found,
        Err(e) => return error_response(e),
    };
    let mut payload = req.payload;
    if !payload.is_object() {
        return error_response(ServiceError::BadRequest("payload must be a JSON object".into()));
    }

    let report = state.codec.open_record(&mut payload, paths.iter());
    info!(
        record_kind = %kind,
        opened = report.opened,
        failed = report.failed.len(),
        "record fields opened"
    );
    let body = DecryptResponse {
        payload,
        failed_fields: report.failed,
    };
    (StatusCode::OK, Json(body)).into_response()
}

/// `GET /health`: readiness check.
///
/// Returns `200 OK` when users are loaded and the catalog names at least one
/// record kind, `503 Service Unavailable` otherwise.
pub async fn health(State(state): State<AppState>) -> Response {
    let record_kinds = state.catalog.len();
    let users_loaded = state.validator.store().user_count();

    let (status_code, status_str) = if record_kinds > 0 && users_loaded > 0 {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    let body = HealthResponse {
        status: status_str.into(),
        record_kinds,
        users_loaded,
    };
    (status_code, Json(body)).into_response()
}

/// Catch-all 404 handler.
pub async fn not_found() -> impl IntoResponse {
    let err = ErrorResponse::new("not_found", "the requested resource does not exist");
    (StatusCode::NOT_FOUND, Json(err))
}

/// Read the record kind header and look up its encrypted field paths.
fn resolve_kind(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<(String, Arc<FieldPaths>), ServiceError> {
    let header = state.record_kind_header.as_str();
    let kind = headers
        .get(header)
        .ok_or_else(|| ServiceError::BadRequest(format!("missing {header} header")))?
        .to_str()
        .map_err(|_| {
            ServiceError::BadRequest(format!("{header} header contains non-ASCII characters"))
        })?
        .to_owned();
    let paths = state
        .catalog
        .get(&kind)
        .map_err(|e| ServiceError::BadRequest(e.to_string()))?;
    Ok((kind, paths))
}

/// A request body that is not JSON or does not match the expected shape.
fn bad_body(rejection: JsonRejection) -> Response {
    error_response(ServiceError::BadRequest(rejection.body_text()))
}

fn error_response(err: ServiceError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ErrorResponse::from(&err))).into_response()
}
