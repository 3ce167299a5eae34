//! Session handling.
//!
//! The CMS issues the JWT; this server only carries it in the `_token`
//! cookie and forwards it back to the CMS. Token signatures are never
//! checked here, only the `exp` claim is read to skip obviously dead
//! sessions.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD as BASE64_URL, Engine};
use serde::Deserialize;

use super::AppState;
use crate::cms::types::AuthSession;
use crate::cms::CmsError;
use crate::config::Config;
use crate::error::{Result, ServerError};

pub const SESSION_COOKIE: &str = "_token";

/// `Set-Cookie` value carrying a session token
pub fn session_cookie(config: &Config, jwt: &str) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE,
        jwt,
        config.session_max_age.as_secs()
    );
    if config.cookie_secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value removing the session
pub fn clear_session_cookie(config: &Config) -> String {
    let mut cookie = format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE);
    if config.cookie_secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Session token from the request cookies
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    for value in headers.get_all(header::COOKIE) {
        let Ok(cookie_header) = value.to_str() else {
            continue;
        };
        for part in cookie_header.split(';') {
            if let Some(token) = part.trim().strip_prefix("_token=") {
                let token = token.trim();
                if !token.is_empty() {
                    return Some(token.to_string());
                }
            }
        }
    }
    None
}

#[derive(Deserialize)]
struct Claims {
    exp: Option<u64>,
}

/// Expiry claim of a JWT, if the payload can be read
fn token_expiry(token: &str) -> Option<u64> {
    let payload = token.split('.').nth(1)?;
    let bytes = BASE64_URL.decode(payload.trim_end_matches('=')).ok()?;
    serde_json::from_slice::<Claims>(&bytes).ok()?.exp
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Whether a token is worth sending to the CMS at `now` (unix seconds)
pub fn token_usable_at(token: &str, now: u64) -> bool {
    match token_expiry(token) {
        Some(exp) => exp > now,
        None => !token.is_empty(),
    }
}

/// Session token from the request, if present and not expired
pub fn usable_session(headers: &HeaderMap) -> Option<String> {
    session_token(headers).filter(|token| token_usable_at(token, now_secs()))
}

/// Map CMS auth failures to 401 with the CMS message; everything else stays a CMS error
pub fn auth_error(error: CmsError) -> ServerError {
    match &error {
        CmsError::Status { status: 400 | 401 | 403, message } => ServerError::AuthFailed(message.clone()),
        _ => ServerError::Cms(error),
    }
}

fn required(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ServerError::InvalidRequest(format!("{} is required", field)));
    }
    Ok(())
}

/// Login request body
#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub identifier: String,
    #[serde(default)]
    pub password: String,
}

/// Registration request body
#[derive(Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl LoginRequest {
    pub fn validate(&self) -> Result<()> {
        required("identifier", &self.identifier)?;
        required("password", &self.password)
    }
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<()> {
        required("username", &self.username)?;
        required("email", &self.email)?;
        required("password", &self.password)
    }
}

/// Log in against the CMS
pub async fn login_session(state: &AppState, request: &LoginRequest) -> Result<AuthSession> {
    request.validate()?;
    let session = state
        .cms
        .login(request.identifier.trim(), &request.password)
        .await
        .map_err(auth_error)?;
    tracing::info!(user = %session.user.username, "user logged in");
    Ok(session)
}

/// Create an account in the CMS
pub async fn register_session(state: &AppState, request: &RegisterRequest) -> Result<AuthSession> {
    request.validate()?;
    let session = state
        .cms
        .register(request.username.trim(), request.email.trim(), &request.password)
        .await
        .map_err(auth_error)?;
    tracing::info!(user = %session.user.username, "user registered");
    Ok(session)
}

fn session_response(state: &AppState, session: AuthSession) -> Response {
    (
        StatusCode::OK,
        [(header::SET_COOKIE, session_cookie(&state.config, &session.jwt))],
        Json(serde_json::json!({ "user": session.user })),
    )
        .into_response()
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Response> {
    let session = login_session(&state, &request).await?;
    Ok(session_response(&state, session))
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<Response> {
    let session = register_session(&state, &request).await?;
    Ok(session_response(&state, session))
}

/// POST /api/auth/logout
pub async fn logout(State(state): State<Arc<AppState>>) -> Response {
    (
        StatusCode::OK,
        [(header::SET_COOKIE, clear_session_cookie(&state.config))],
        Json(serde_json::json!({ "ok": true })),
    )
        .into_response()
}

/// GET /api/auth/me
pub async fn me(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let Some(token) = usable_session(&headers) else {
        return ServerError::AuthRequired.into_response();
    };

    match state.cms.me(&token).await {
        Ok(user) => Json(serde_json::json!({ "user": user })).into_response(),
        Err(e) if e.is_unauthorized() => {
            tracing::debug!("session rejected by CMS, clearing cookie");
            let mut response = ServerError::AuthRequired.into_response();
            if let Ok(value) = clear_session_cookie(&state.config).parse() {
                response.headers_mut().insert(header::SET_COOKIE, value);
            }
            response
        }
        Err(e) => ServerError::Cms(e).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn jwt_with(payload: &str) -> String {
        format!("eyJhbGciOiJIUzI1NiJ9.{}.signature", BASE64_URL.encode(payload))
    }

    #[test]
    fn test_session_token_from_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; _token=abc.def.ghi; other=1"));
        assert_eq!(session_token(&headers).as_deref(), Some("abc.def.ghi"));

        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("_token=; x=y"));
        assert!(session_token(&headers).is_none());
        assert!(session_token(&HeaderMap::new()).is_none());
    }

    #[test]
    fn test_token_expiry() {
        let live = jwt_with(r#"{"id":1,"exp":2000}"#);
        assert!(token_usable_at(&live, 1000));
        assert!(!token_usable_at(&live, 2000));

        let no_exp = jwt_with(r#"{"id":1}"#);
        assert!(token_usable_at(&no_exp, 5000));
        assert!(token_usable_at("opaque-token", 5000));
    }

    #[test]
    fn test_cookie_attributes() {
        let mut config = Config::from_lookup(|_| None).unwrap();
        let cookie = session_cookie(&config, "jwt");
        assert_eq!(cookie, "_token=jwt; Path=/; HttpOnly; SameSite=Lax; Max-Age=604800");

        config.cookie_secure = true;
        assert!(session_cookie(&config, "jwt").ends_with("; Secure"));
        assert!(clear_session_cookie(&config).contains("Max-Age=0"));
    }

    #[test]
    fn test_auth_error_mapping() {
        let err = auth_error(CmsError::Status { status: 400, message: "Invalid identifier or password".into() });
        assert!(matches!(err, ServerError::AuthFailed(ref m) if m == "Invalid identifier or password"));

        let err = auth_error(CmsError::Status { status: 500, message: "boom".into() });
        assert!(matches!(err, ServerError::Cms(_)));
    }

    #[test]
    fn test_missing_fields_rejected() {
        let request = LoginRequest { identifier: " ".into(), password: "secret".into() };
        assert!(matches!(request.validate(), Err(ServerError::InvalidRequest(_))));
    }
}
