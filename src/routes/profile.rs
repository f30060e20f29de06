use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Form, Json, Router};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::forms::{EditProfileForm, ProfilePictureForm};
use crate::identity;
use crate::policy::{self, Action, Actor};
use crate::routes::MultipartForm;
use crate::service::ProfileView;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/profile/{username}", get(profile))
        .route("/edit_profile", get(edit_profile_page).post(edit_profile))
        .route(
            "/edit_profile_picture",
            get(edit_profile_picture_page).post(edit_profile_picture),
        )
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "first_page")]
    pub page: usize,
}

fn first_page() -> usize {
    1
}

pub async fn profile(
    State(state): State<AppState>,
    actor: Actor,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<ProfileView>> {
    Ok(Json(state.service.profile(&actor, &username, query.page)?))
}

/// Current values to prefill the form with.
pub async fn edit_profile_page(State(state): State<AppState>, actor: Actor) -> AppResult<Response> {
    let member = policy::require_member(&actor, Action::EditProfile, None)?;
    let conn = state.db.get()?;
    let user = identity::find_by_id(&conn, member.id)?.ok_or(AppError::NotFound)?;
    Ok(Json(EditProfileForm {
        username: user.username,
        about_me: user.about_me.unwrap_or_default(),
    })
    .into_response())
}

pub async fn edit_profile(
    State(state): State<AppState>,
    actor: Actor,
    Form(form): Form<EditProfileForm>,
) -> AppResult<Response> {
    let user = state.service.edit_profile(&actor, &form)?;
    Ok(Json(user).into_response())
}

pub async fn edit_profile_picture_page(actor: Actor) -> AppResult<Json<serde_json::Value>> {
    policy::require_member(&actor, Action::EditProfile, None)?;
    Ok(Json(serde_json::json!({ "fields": ["photo"] })))
}

pub async fn edit_profile_picture(
    State(state): State<AppState>,
    actor: Actor,
    multipart: Multipart,
) -> AppResult<Response> {
    policy::require_member(&actor, Action::EditProfile, None)?;
    let form = MultipartForm::read(multipart).await?;
    let published = state.service.change_profile_picture(
        &actor,
        ProfilePictureForm {
            photo: form.files.into_iter().next(),
        },
    )?;
    Ok((StatusCode::CREATED, Json(published)).into_response())
}
