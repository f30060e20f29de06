use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::error::AppResult;
use crate::policy::{self, Action, Actor};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/about", get(about))
}

pub async fn index(State(state): State<AppState>, actor: Actor) -> AppResult<Json<Value>> {
    policy::authorize(&actor, Action::ReadPublicPage, None)?;
    let conn = state.db.get()?;
    let members: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;

    Ok(Json(json!({
        "members": members,
        "actor": actor,
    })))
}

pub async fn about(actor: Actor) -> AppResult<Json<Value>> {
    policy::authorize(&actor, Action::ReadPublicPage, None)?;
    Ok(Json(json!({
        "name": "plaza",
        "version": env!("CARGO_PKG_VERSION"),
        "description": env!("CARGO_PKG_DESCRIPTION"),
    })))
}
