use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};

use crate::db::models::{Photo, Post, Video};
use crate::engagement::Target;
use crate::error::AppResult;
use crate::forms::{CommentForm, EditPostForm, TitleForm};
use crate::policy::{self, Action, Actor};
use crate::service::{ItemView, LikeAction, LikeState};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/post/{id}", get(view_post).post(comment_post))
        .route("/photo/{id}", get(view_photo).post(comment_photo))
        .route("/video/{id}", get(view_video).post(comment_video))
        .route("/like-post/{id}/{action}", post(like_post))
        .route("/like-photo/{id}/{action}", post(like_photo))
        .route("/like-video/{id}/{action}", post(like_video))
        .route("/edit-post/{id}", post(edit_post))
        .route("/edit-photo/{id}", post(edit_photo))
        .route("/edit-video/{id}", post(edit_video))
        .route("/delete-post/{id}", post(delete_post))
        .route("/delete-photo/{id}", post(delete_photo))
        .route("/delete-video/{id}", post(delete_video))
}

fn view(state: &AppState, actor: &Actor, target: Target) -> AppResult<Json<ItemView>> {
    Ok(Json(state.service.view_item(actor, target)?))
}

fn comment(state: &AppState, actor: &Actor, target: Target, form: &CommentForm) -> AppResult<Response> {
    let comment = state.service.comment(actor, target, form)?;
    Ok((StatusCode::CREATED, Json(comment)).into_response())
}

fn like(state: &AppState, actor: &Actor, target: Target, action: &str) -> AppResult<Json<LikeState>> {
    policy::require_member(actor, Action::Like, None)?;
    let action: LikeAction = action.parse()?;
    Ok(Json(state.service.set_like(actor, target, action)?))
}

fn delete(state: &AppState, actor: &Actor, target: Target) -> AppResult<StatusCode> {
    state.service.delete(actor, target)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn view_post(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> AppResult<Json<ItemView>> {
    view(&state, &actor, Target::Post(id))
}

pub async fn view_photo(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> AppResult<Json<ItemView>> {
    view(&state, &actor, Target::Photo(id))
}

pub async fn view_video(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> AppResult<Json<ItemView>> {
    view(&state, &actor, Target::Video(id))
}

pub async fn comment_post(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
    Form(form): Form<CommentForm>,
) -> AppResult<Response> {
    comment(&state, &actor, Target::Post(id), &form)
}

pub async fn comment_photo(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
    Form(form): Form<CommentForm>,
) -> AppResult<Response> {
    comment(&state, &actor, Target::Photo(id), &form)
}

pub async fn comment_video(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
    Form(form): Form<CommentForm>,
) -> AppResult<Response> {
    comment(&state, &actor, Target::Video(id), &form)
}

pub async fn like_post(
    State(state): State<AppState>,
    actor: Actor,
    Path((id, action)): Path<(i64, String)>,
) -> AppResult<Json<LikeState>> {
    like(&state, &actor, Target::Post(id), &action)
}

pub async fn like_photo(
    State(state): State<AppState>,
    actor: Actor,
    Path((id, action)): Path<(i64, String)>,
) -> AppResult<Json<LikeState>> {
    like(&state, &actor, Target::Photo(id), &action)
}

pub async fn like_video(
    State(state): State<AppState>,
    actor: Actor,
    Path((id, action)): Path<(i64, String)>,
) -> AppResult<Json<LikeState>> {
    like(&state, &actor, Target::Video(id), &action)
}

pub async fn edit_post(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
    Form(form): Form<EditPostForm>,
) -> AppResult<Json<Post>> {
    Ok(Json(state.service.edit_post(&actor, id, &form)?))
}

pub async fn edit_photo(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
    Form(form): Form<TitleForm>,
) -> AppResult<Json<Photo>> {
    Ok(Json(state.service.edit_photo(&actor, id, &form)?))
}

pub async fn edit_video(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
    Form(form): Form<TitleForm>,
) -> AppResult<Json<Video>> {
    Ok(Json(state.service.edit_video(&actor, id, &form)?))
}

pub async fn delete_post(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    delete(&state, &actor, Target::Post(id))
}

pub async fn delete_photo(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    delete(&state, &actor, Target::Photo(id))
}

pub async fn delete_video(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    delete(&state, &actor, Target::Video(id))
}
