use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;

use crate::error::AppResult;
use crate::policy::Actor;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/uploads/{filename}", get(serve))
}

pub async fn serve(
    State(state): State<AppState>,
    actor: Actor,
    Path(filename): Path<String>,
) -> AppResult<Response> {
    let data = state.service.read_upload(&actor, &filename)?;
    let mime = mime_guess::from_path(&filename).first_or_octet_stream();
    Ok((
        [
            (header::CONTENT_TYPE, mime.as_ref().to_string()),
            (header::CACHE_CONTROL, "private, max-age=86400".to_string()),
        ],
        data,
    )
        .into_response())
}
