use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};

use crate::db::models::{Photo, Video};
use crate::error::AppResult;
use crate::forms::{PhotoForm, PostForm, VideoForm};
use crate::policy::{self, Action, Actor};
use crate::routes::MultipartForm;
use crate::service::{MediaView, PostView};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/discussion", get(discussion).post(create_post))
        .route("/photos", get(photos).post(upload_photos))
        .route("/videos", get(videos).post(upload_videos))
        .route("/media", get(media))
}

/// Gate before reading the body, so a denied upload is never buffered.
async fn read_upload(actor: &Actor, multipart: Multipart) -> AppResult<MultipartForm> {
    policy::require_member(actor, Action::CreateContent, None)?;
    MultipartForm::read(multipart).await
}

pub async fn discussion(
    State(state): State<AppState>,
    actor: Actor,
) -> AppResult<Json<Vec<PostView>>> {
    Ok(Json(state.service.discussion_feed(&actor)?))
}

pub async fn create_post(
    State(state): State<AppState>,
    actor: Actor,
    multipart: Multipart,
) -> AppResult<Response> {
    let mut form = read_upload(&actor, multipart).await?;
    let published = state.service.create_discussion_post(
        &actor,
        PostForm {
            body: form.text("body"),
            files: form.files,
        },
    )?;
    Ok((StatusCode::CREATED, Json(published)).into_response())
}

pub async fn photos(State(state): State<AppState>, actor: Actor) -> AppResult<Json<Vec<Photo>>> {
    Ok(Json(state.service.photo_feed(&actor)?))
}

pub async fn upload_photos(
    State(state): State<AppState>,
    actor: Actor,
    multipart: Multipart,
) -> AppResult<Response> {
    let mut form = read_upload(&actor, multipart).await?;
    let published = state.service.create_photo_post(
        &actor,
        PhotoForm {
            body: form.text("body"),
            files: form.files,
        },
    )?;
    Ok((StatusCode::CREATED, Json(published)).into_response())
}

pub async fn videos(State(state): State<AppState>, actor: Actor) -> AppResult<Json<Vec<Video>>> {
    Ok(Json(state.service.video_feed(&actor)?))
}

pub async fn upload_videos(
    State(state): State<AppState>,
    actor: Actor,
    multipart: Multipart,
) -> AppResult<Response> {
    let mut form = read_upload(&actor, multipart).await?;
    let published = state.service.create_video_post(
        &actor,
        VideoForm {
            title: form.text("title"),
            files: form.files,
        },
    )?;
    Ok((StatusCode::CREATED, Json(published)).into_response())
}

pub async fn media(State(state): State<AppState>, actor: Actor) -> AppResult<Json<MediaView>> {
    Ok(Json(state.service.media_feed(&actor)?))
}
