use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Form, Json, Router};
use serde_json::json;

use crate::error::AppResult;
use crate::extractors::SessionToken;
use crate::forms::{LoginForm, RegistrationForm, ResetPasswordForm, ResetPasswordRequestForm};
use crate::identity::verification::VerificationForm;
use crate::policy::{self, Action, Actor};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login_page).post(login))
        .route("/register", get(register_page).post(register))
        .route("/logout", get(logout).post(logout))
        .route("/verification", get(verification_page).post(verify))
        .route(
            "/reset_password_request",
            get(reset_request_page).post(reset_request),
        )
        .route(
            "/reset_password/{token}",
            get(reset_password_page).post(reset_password),
        )
}

fn session_cookie(name: &str, token: &str, max_age_secs: Option<u64>) -> String {
    let mut cookie = format!("{}={}; HttpOnly; SameSite=Lax; Path=/", name, token);
    if let Some(secs) = max_age_secs {
        cookie.push_str(&format!("; Max-Age={}", secs));
    }
    cookie
}

fn form_fields(actor: &Actor, fields: &[&str]) -> AppResult<Json<serde_json::Value>> {
    policy::authorize(actor, Action::Authenticate, None)?;
    Ok(Json(json!({ "fields": fields })))
}

pub async fn login_page(actor: Actor) -> AppResult<Json<serde_json::Value>> {
    form_fields(&actor, &["username", "password", "remember_me", "next"])
}

pub async fn login(
    State(state): State<AppState>,
    actor: Actor,
    Form(form): Form<LoginForm>,
) -> AppResult<Response> {
    let outcome = state.service.login(&actor, &form)?;

    // A remembered login outlives the browser session
    let max_age = outcome
        .remember_me
        .then(|| state.config.auth.session_hours * 3600);
    let cookie = session_cookie(&state.config.auth.cookie_name, &outcome.token, max_age);

    Ok((
        [(header::SET_COOKIE, cookie)],
        Redirect::to(&outcome.redirect),
    )
        .into_response())
}

pub async fn register_page(actor: Actor) -> AppResult<Json<serde_json::Value>> {
    form_fields(&actor, &["username", "email", "password", "confirm"])
}

pub async fn register(
    State(state): State<AppState>,
    actor: Actor,
    Form(form): Form<RegistrationForm>,
) -> AppResult<Response> {
    let user = state.service.register(&actor, &form)?;
    Ok((StatusCode::CREATED, Json(user)).into_response())
}

pub async fn logout(
    State(state): State<AppState>,
    actor: Actor,
    SessionToken(token): SessionToken,
) -> AppResult<Response> {
    state.service.logout(&actor, token.as_deref())?;
    let cleared = session_cookie(&state.config.auth.cookie_name, "", Some(0));
    Ok(([(header::SET_COOKIE, cleared)], Redirect::to("/")).into_response())
}

pub async fn verification_page(
    State(state): State<AppState>,
    actor: Actor,
) -> AppResult<Json<serde_json::Value>> {
    let questions = state.service.verification_questions(&actor)?;
    Ok(Json(json!({ "questions": questions })))
}

pub async fn verify(
    State(state): State<AppState>,
    actor: Actor,
    Form(form): Form<VerificationForm>,
) -> AppResult<Response> {
    let user = state.service.verify(&actor, &form)?;
    Ok(Json(user).into_response())
}

pub async fn reset_request_page(actor: Actor) -> AppResult<Json<serde_json::Value>> {
    form_fields(&actor, &["email"])
}

pub async fn reset_request(
    State(state): State<AppState>,
    actor: Actor,
    Form(form): Form<ResetPasswordRequestForm>,
) -> AppResult<Json<serde_json::Value>> {
    state.service.request_password_reset(&actor, &form)?;
    Ok(Json(json!({
        "message": "Check your email for the instructions to reset your password",
    })))
}

pub async fn reset_password_page(
    State(state): State<AppState>,
    actor: Actor,
    Path(token): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    state.service.check_reset_token(&actor, &token)?;
    Ok(Json(json!({ "fields": ["password", "repeat_password"] })))
}

pub async fn reset_password(
    State(state): State<AppState>,
    actor: Actor,
    Path(token): Path<String>,
    Form(form): Form<ResetPasswordForm>,
) -> AppResult<Response> {
    state.service.reset_password(&actor, &token, &form)?;
    Ok(Redirect::to("/login").into_response())
}
