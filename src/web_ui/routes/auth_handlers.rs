//! Authentication route handlers for login, registration, logout and the dashboard.

use axum::{
    extract::{Form, Query, State},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use std::sync::Arc;

use super::utils::{
    base_context, redirect_with_cookie, render_failure, render_template, safe_next, with_error,
};
use crate::api::auth::{
    clear_session_cookie, login_session, register_session, session_cookie, usable_session,
    LoginRequest, RegisterRequest,
};
use crate::api::AppState;
use crate::error::ServerError;

const LOGIN_PATH: &str = "/authentication/login";
const REGISTER_PATH: &str = "/authentication/register";

/// Query parameters accepted by the auth pages
#[derive(Deserialize, Default)]
pub struct AuthPageQuery {
    pub error: Option<String>,
    pub next: Option<String>,
}

/// Login form data
#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub identifier: String,
    #[serde(default)]
    pub password: String,
    pub next: Option<String>,
}

/// Registration form data
#[derive(Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Message shown back on the form for a failed attempt
fn form_error(error: &ServerError) -> String {
    match error {
        ServerError::AuthFailed(message) | ServerError::InvalidRequest(message) => message.clone(),
        other => other.public_message(),
    }
}

/// Login page (GET)
pub async fn login_page(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AuthPageQuery>,
    headers: HeaderMap,
) -> Response {
    let mut context = base_context(&state, &headers);
    context.insert("seo_title", "Log in");
    if let Some(error) = &query.error {
        context.insert("error", error);
    }
    context.insert("next", safe_next(query.next.as_deref()));
    render_template("login.html", &context)
}

/// Login submit (POST)
pub async fn login_submit(
    State(state): State<Arc<AppState>>,
    Form(form): Form<LoginForm>,
) -> Response {
    let request = LoginRequest {
        identifier: form.identifier,
        password: form.password,
    };

    match login_session(&state, &request).await {
        Ok(session) => redirect_with_cookie(
            safe_next(form.next.as_deref()),
            session_cookie(&state.config, &session.jwt),
        ),
        Err(e) => Redirect::to(&with_error(LOGIN_PATH, &form_error(&e))).into_response(),
    }
}

/// Registration page (GET)
pub async fn register_page(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AuthPageQuery>,
    headers: HeaderMap,
) -> Response {
    let mut context = base_context(&state, &headers);
    context.insert("seo_title", "Register");
    if let Some(error) = &query.error {
        context.insert("error", error);
    }
    render_template("register.html", &context)
}

/// Registration submit (POST)
pub async fn register_submit(
    State(state): State<Arc<AppState>>,
    Form(form): Form<RegisterForm>,
) -> Response {
    let request = RegisterRequest {
        username: form.username,
        email: form.email,
        password: form.password,
    };

    match register_session(&state, &request).await {
        Ok(session) => redirect_with_cookie("/dashboard", session_cookie(&state.config, &session.jwt)),
        Err(e) => Redirect::to(&with_error(REGISTER_PATH, &form_error(&e))).into_response(),
    }
}

/// Logout (GET)
pub async fn logout(State(state): State<Arc<AppState>>) -> Response {
    redirect_with_cookie("/", clear_session_cookie(&state.config))
}

/// Dashboard: the logged-in user's profile
pub async fn dashboard(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let Some(token) = usable_session(&headers) else {
        return Redirect::to(LOGIN_PATH).into_response();
    };

    match state.cms.me(&token).await {
        Ok(user) => {
            let mut context = base_context(&state, &headers);
            context.insert("user", &user);
            render_template("dashboard.html", &context)
        }
        Err(e) if e.is_unauthorized() => {
            tracing::debug!("dashboard session rejected by CMS, clearing cookie");
            redirect_with_cookie(LOGIN_PATH, clear_session_cookie(&state.config))
        }
        Err(e) => render_failure(&state, &headers, e.into()),
    }
}
