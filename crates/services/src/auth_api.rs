use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::time::Instant;

use navigator_core::{AuthToken, Session, SessionId};

use crate::config::{AuthConfig, AuthTimeouts};
use crate::error::{
    AuthError, ConfigError, DECODE_TIMEOUT_MESSAGE, REGISTRATION_FAILED_MESSAGE,
};
use crate::transport::{decode_with_timeout, request_with_timeout};

const ME_PATH: &str = "/auth/me";
const REGISTER_PATH: &str = "/auth/register";
const LOGOUT_PATH: &str = "/auth/logout";

/// Client for the remote auth endpoints.
///
/// The underlying HTTP client keeps a cookie jar, so the server-managed session
/// cookie set by registration is replayed on `/auth/me` and `/auth/logout`.
#[derive(Clone)]
pub struct AuthApi {
    client: Client,
    config: AuthConfig,
}

impl AuthApi {
    /// # Errors
    ///
    /// Returns `ConfigError::HttpClient` if the HTTP client cannot be built.
    pub fn new(config: AuthConfig) -> Result<Self, ConfigError> {
        let client = Client::builder().cookie_store(true).build()?;
        Ok(Self { client, config })
    }

    fn timeouts(&self) -> &AuthTimeouts {
        &self.config.timeouts
    }

    /// Ask the server who the ambient cookie belongs to.
    ///
    /// Returns `Ok(None)` when the server answers with a non-success status.
    /// Headers and body share one deadline of `timeouts.resume`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError` for transport failures or an undecodable body.
    pub async fn current_session(&self) -> Result<Option<Session>, AuthError> {
        let budget = self.timeouts().resume;
        let started = Instant::now();
        let request = self.client.get(self.config.endpoint(ME_PATH));
        let response = request_with_timeout(request, budget).await?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(%status, "no active session");
            return Ok(None);
        }

        let remaining = budget.saturating_sub(started.elapsed());
        let bytes = decode_with_timeout(response.bytes(), remaining, DECODE_TIMEOUT_MESSAGE)
            .await?
            .map_err(|err| AuthError::InvalidBody(err.to_string()))?;
        let value: Value = serde_json::from_slice(&bytes)
            .map_err(|err| AuthError::InvalidBody(err.to_string()))?;

        validate_current_session(value).map(Some)
    }

    /// Register `name` and return the session the server granted.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::RegistrationRejected` for a non-success status,
    /// `AuthError::InvalidBody` / `AuthError::MalformedResponse` for a bad body, and
    /// `AuthError::Transport` for timeouts and network failures.
    pub async fn register(&self, name: &str) -> Result<Session, AuthError> {
        let timeouts = *self.timeouts();
        let request = self
            .client
            .post(self.config.endpoint(REGISTER_PATH))
            .json(&RegisterRequest { name });
        let response = request_with_timeout(request, timeouts.register).await?;

        let status = response.status();
        if !status.is_success() {
            let body =
                decode_with_timeout(response.bytes(), timeouts.register_decode, DECODE_TIMEOUT_MESSAGE)
                    .await
                    .ok()
                    .and_then(Result::ok);
            let message = rejection_message(status, body.as_deref());
            return Err(AuthError::RegistrationRejected { status, message });
        }

        let bytes =
            decode_with_timeout(response.bytes(), timeouts.register_decode, DECODE_TIMEOUT_MESSAGE)
                .await?
                .map_err(|err| AuthError::InvalidBody(err.to_string()))?;
        let value: Value = serde_json::from_slice(&bytes)
            .map_err(|err| AuthError::InvalidBody(err.to_string()))?;

        validate_registration(value)
    }

    /// Tell the server to drop the ambient session. The response body is ignored.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Transport` for timeouts and network failures.
    pub async fn logout(&self) -> Result<(), AuthError> {
        let request = self.client.post(self.config.endpoint(LOGOUT_PATH));
        let response = request_with_timeout(request, self.timeouts().logout).await?;
        tracing::debug!(status = %response.status(), "logout acknowledged");
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct RegisterRequest<'a> {
    name: &'a str,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<String>,
}

fn rejection_message(status: StatusCode, body: Option<&[u8]>) -> String {
    let decoded = body.and_then(|bytes| serde_json::from_slice::<ErrorBody>(bytes).ok());
    match decoded {
        Some(ErrorBody {
            detail: Some(detail),
        }) if !detail.is_empty() => detail,
        Some(_) => REGISTRATION_FAILED_MESSAGE.to_owned(),
        None => format!("{REGISTRATION_FAILED_MESSAGE} with status {}", status.as_u16()),
    }
}

/// Check a decoded `/auth/me` body. The session cookie stands in for a token.
fn validate_current_session(value: Value) -> Result<Session, AuthError> {
    let fields = object_fields(value)?;
    let name = required_str(&fields, "name")?;
    let session_id = required_str(&fields, "session_id")?;
    let questions_remaining = required_quota(&fields)?;

    Session::authenticated(name, SessionId::new(session_id), None, questions_remaining)
        .map_err(|err| AuthError::MalformedResponse(err.to_string()))
}

/// Check a decoded registration body and keep only the recognized fields.
fn validate_registration(value: Value) -> Result<Session, AuthError> {
    let fields = object_fields(value)?;
    let name = required_str(&fields, "name")?;
    let session_id = required_str(&fields, "session_id")?;
    let token = required_str(&fields, "token")?;
    let questions_remaining = required_quota(&fields)?;

    Session::authenticated(
        name,
        SessionId::new(session_id),
        Some(AuthToken::new(token)),
        questions_remaining,
    )
    .map_err(|err| AuthError::MalformedResponse(err.to_string()))
}

fn object_fields(value: Value) -> Result<Map<String, Value>, AuthError> {
    match value {
        Value::Object(fields) => Ok(fields),
        _ => Err(AuthError::MalformedResponse(
            "response is not an object".into(),
        )),
    }
}

fn required_quota(fields: &Map<String, Value>) -> Result<u32, AuthError> {
    fields
        .get("questions_remaining")
        .and_then(quota_from_json)
        .ok_or_else(|| {
            AuthError::MalformedResponse("questions_remaining is missing or not a count".into())
        })
}

fn required_str<'a>(fields: &'a Map<String, Value>, key: &str) -> Result<&'a str, AuthError> {
    match fields.get(key) {
        Some(Value::String(value)) if !value.is_empty() => Ok(value.as_str()),
        _ => Err(AuthError::MalformedResponse(format!(
            "{key} is missing or empty"
        ))),
    }
}

// Accepts integral floats such as `5.0`; rejects negatives, fractions, and overflow.
fn quota_from_json(value: &Value) -> Option<u32> {
    if let Some(n) = value.as_u64() {
        return u32::try_from(n).ok();
    }
    let n = value.as_f64()?;
    if n.is_finite() && n >= 0.0 && n.fract() == 0.0 && n <= f64::from(u32::MAX) {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let count = n as u32;
        return Some(count);
    }
    None
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn valid_registration_drops_extra_fields() {
        let session = validate_registration(json!({
            "name": "Alice",
            "session_id": "s1",
            "token": "t1",
            "questions_remaining": 5,
            "message": "ok"
        }))
        .unwrap();

        assert_eq!(session.user_name(), Some("Alice"));
        assert_eq!(session.session_id().map(SessionId::as_str), Some("s1"));
        assert_eq!(session.auth_token().map(AuthToken::expose), Some("t1"));
        assert_eq!(session.questions_remaining(), Some(5));
        assert!(session.is_authenticated());
    }

    #[test]
    fn non_object_bodies_are_malformed() {
        for body in [json!(null), json!([1, 2]), json!("Alice"), json!(3)] {
            let err = validate_registration(body).unwrap_err();
            assert!(matches!(err, AuthError::MalformedResponse(_)));
        }
    }

    #[test]
    fn missing_or_empty_fields_are_malformed() {
        let cases = [
            json!({"session_id": "s1", "token": "t1", "questions_remaining": 5}),
            json!({"name": "", "session_id": "s1", "token": "t1", "questions_remaining": 5}),
            json!({"name": "A", "token": "t1", "questions_remaining": 5}),
            json!({"name": "A", "session_id": "s1", "questions_remaining": 5}),
            json!({"name": "A", "session_id": "s1", "token": "", "questions_remaining": 5}),
            json!({"name": "A", "session_id": "s1", "token": "t1"}),
            json!({"name": "A", "session_id": "s1", "token": "t1", "questions_remaining": "5"}),
            json!({"name": 7, "session_id": "s1", "token": "t1", "questions_remaining": 5}),
        ];
        for body in cases {
            let err = validate_registration(body.clone()).unwrap_err();
            assert!(
                matches!(err, AuthError::MalformedResponse(_)),
                "expected malformed for {body}"
            );
        }
    }

    #[test]
    fn current_session_accepts_integral_float_quota() {
        let session = validate_current_session(json!({
            "name": "Carol",
            "session_id": "cookie-session",
            "questions_remaining": 5.0
        }))
        .unwrap();

        assert_eq!(session.questions_remaining(), Some(5));
        assert!(session.auth_token().is_none());
        assert!(session.is_authenticated());
    }

    #[test]
    fn current_session_rejects_bad_shapes() {
        let cases = [
            json!([]),
            json!({"session_id": "s1", "questions_remaining": 1}),
            json!({"name": "A", "session_id": "", "questions_remaining": 1}),
            json!({"name": "A", "session_id": "s1", "questions_remaining": -1}),
        ];
        for body in cases {
            let err = validate_current_session(body.clone()).unwrap_err();
            assert!(
                matches!(err, AuthError::MalformedResponse(_)),
                "expected malformed for {body}"
            );
        }
    }

    #[test]
    fn quota_accepts_only_non_negative_integers() {
        assert_eq!(quota_from_json(&json!(0)), Some(0));
        assert_eq!(quota_from_json(&json!(7.0)), Some(7));
        assert_eq!(quota_from_json(&json!(-1)), None);
        assert_eq!(quota_from_json(&json!(2.5)), None);
        assert_eq!(quota_from_json(&json!(u64::from(u32::MAX) + 1)), None);
        assert_eq!(quota_from_json(&json!(null)), None);
    }

    #[test]
    fn rejection_prefers_server_detail() {
        let msg = rejection_message(
            StatusCode::BAD_REQUEST,
            Some(br#"{"detail":"Name already taken"}"#),
        );
        assert_eq!(msg, "Name already taken");
    }

    #[test]
    fn rejection_without_detail_is_generic() {
        let msg = rejection_message(StatusCode::BAD_REQUEST, Some(b"{}"));
        assert_eq!(msg, "Registration failed");

        let msg = rejection_message(StatusCode::BAD_REQUEST, Some(br#"{"detail":""}"#));
        assert_eq!(msg, "Registration failed");
    }

    #[test]
    fn undecodable_rejection_reports_status() {
        let msg = rejection_message(StatusCode::BAD_GATEWAY, Some(b"<html>oops</html>"));
        assert_eq!(msg, "Registration failed with status 502");

        let msg = rejection_message(StatusCode::INTERNAL_SERVER_ERROR, None);
        assert_eq!(msg, "Registration failed with status 500");
    }
}
