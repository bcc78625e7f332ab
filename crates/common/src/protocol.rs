//! Request and response types exchanged with callers.
//!
//! All bodies are JSON. Credential failures use [`FieldErrors`], a map from the
//! offending input (`"email"`, `"password"`, `"account"`) to messages, so a client
//! can tell which input was wrong.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Field encryption endpoints
// ---------------------------------------------------------------------------

/// Request body for `POST /fields/encrypt` and `POST /fields/decrypt`.
///
/// The record kind named in the `X-Record-Kind` header decides which fields of
/// `payload` are sealed or opened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldsRequest {
    /// The externally-owned record, as a JSON object.
    pub payload: serde_json::Value,
}

/// Successful response body for `POST /fields/encrypt`.
///
/// Catalogued fields are replaced by lowercase hex envelopes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptResponse {
    pub payload: serde_json::Value,
}

/// Successful response body for `POST /fields/decrypt`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecryptResponse {
    /// The record with catalogued fields restored; undecodable fields are `null`.
    pub payload: serde_json::Value,
    /// Paths of the fields that could not be decoded.
    #[serde(default)]
    pub failed_fields: Vec<String>,
}

// ---------------------------------------------------------------------------
// Credential / token endpoints
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/login`.
///
/// Absent inputs deserialise as empty so the handler can report each one in
/// a [`FieldErrors`] map.
#[derive(Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl LoginRequest {
    /// `{"<input>": ["this field is required"]}` for every blank input, or
    /// `None` when both are present.
    pub fn missing_fields(&self) -> Option<FieldErrors> {
        let missing: FieldErrors = [("email", &self.email), ("password", &self.password)]
            .into_iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(field, _)| (field.to_owned(), vec!["this field is required".to_owned()]))
            .collect();
        (!missing.is_empty()).then_some(missing)
    }
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Public view of an authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: u64,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

/// Successful response body for `POST /auth/login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access: String,
    pub refresh: String,
    pub user: UserSummary,
}

/// Request body for `POST /token/refresh`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

/// Successful response body for `POST /token/refresh`.
///
/// `refresh` is the rotated token; the one presented in the request is no
/// longer accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
    pub refresh: String,
}

/// Request body for `POST /token/verify`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyRequest {
    pub token: String,
}

/// Response body for `POST /token/verify`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub valid: bool,
    /// Decoded claims when `valid` is true.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claims: Option<serde_json::Value>,
    /// Why the token was rejected when `valid` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Per-input validation errors, e.g. `{"password": ["..."]}`.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

/// Standard error response body for non-2xx statuses.
///
/// Login credential failures use [`FieldErrors`] instead, and a rejected
/// `POST /token/verify` answers with [`VerifyResponse`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short machine-readable error code (e.g. `"bad_request"`).
    pub code: String,
    /// Human-readable description safe to expose to callers.
    pub message: String,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<&crate::ServiceError> for ErrorResponse {
    fn from(err: &crate::ServiceError) -> Self {
        Self::new(err.code(), err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall service status: `"ok"` or `"degraded"`.
    pub status: String,
    /// Number of record kinds with encrypted fields in the catalog.
    pub record_kinds: usize,
    /// Number of user records visible to the credential validator.
    pub users_loaded: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn login_request_debug_hides_password() {
        let req = LoginRequest {
            email: "juan@pragma.cl".into(),
            password: "Pass123456".into(),
        };
        let dbg = format!("{req:?}");
        assert!(dbg.contains("juan@pragma.cl"));
        assert!(!dbg.contains("Pass123456"));
    }

    #[test]
    fn login_request_reports_missing_inputs() {
        let req: LoginRequest = serde_json::from_value(json!({"email": "juan@pragma.cl"})).unwrap();
        let missing = req.missing_fields().unwrap();
        assert_eq!(missing.len(), 1);
        assert!(missing.contains_key("password"));

        let req: LoginRequest = serde_json::from_value(json!({"password": " "})).unwrap();
        assert_eq!(req.missing_fields().unwrap().len(), 2);

        let req: LoginRequest =
            serde_json::from_value(json!({"email": "juan@pragma.cl", "password": "x"})).unwrap();
        assert!(req.missing_fields().is_none());
    }

    #[test]
    fn decrypt_response_defaults_failed_fields() {
        let resp: DecryptResponse =
            serde_json::from_value(json!({"payload": {"datos_savefile": null}})).unwrap();
        assert!(resp.failed_fields.is_empty());
    }

    #[test]
    fn verify_response_omits_absent_parts() {
        let resp = VerifyResponse {
            valid: false,
            claims: None,
            reason: Some("token expired".into()),
        };
        let v = serde_json::to_value(&resp).unwrap();
        assert!(v.get("claims").is_none());
        assert_eq!(v["reason"], "token expired");
    }

    #[test]
    fn error_response_from_service_error() {
        let err = crate::ServiceError::Unauthorized("token revoked".into());
        let body = ErrorResponse::from(&err);
        assert_eq!(body.code, "unauthorized");
        assert!(body.message.contains("token revoked"));
    }
}
