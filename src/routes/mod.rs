pub mod auth;
pub mod feeds;
pub mod home;
pub mod items;
pub mod profile;
pub mod uploads;

use std::collections::HashMap;

use axum::extract::{DefaultBodyLimit, Multipart};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::error::{AppError, AppResult};
use crate::forms::{FieldErrors, Upload};
use crate::state::AppState;

/// The full application with middleware applied.
pub fn app(state: AppState) -> Router {
    let body_limit = state.config.storage.max_upload_bytes;
    Router::new()
        .merge(home::router())
        .merge(auth::router())
        .merge(profile::router())
        .merge(feeds::router())
        .merge(items::router())
        .merge(uploads::router())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Text fields and files of a multipart submission.
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub fields: HashMap<String, String>,
    pub files: Vec<Upload>,
}

impl MultipartForm {
    pub fn text(&mut self, name: &str) -> String {
        self.fields.remove(name).unwrap_or_default()
    }

    pub async fn read(mut multipart: Multipart) -> AppResult<Self> {
        let mut form = MultipartForm::default();
        while let Some(field) = multipart.next_field().await.map_err(malformed)? {
            let name = field.name().unwrap_or_default().to_string();
            match field.file_name().map(str::to_string) {
                Some(filename) => {
                    let data = field.bytes().await.map_err(malformed)?;
                    // Browsers send an empty part for an untouched file input
                    if filename.is_empty() && data.is_empty() {
                        continue;
                    }
                    form.files.push(Upload { filename, data });
                }
                None => {
                    let value = field.text().await.map_err(malformed)?;
                    form.fields.insert(name, value);
                }
            }
        }
        Ok(form)
    }
}

fn malformed(err: axum::extract::multipart::MultipartError) -> AppError {
    AppError::Validation(FieldErrors::single("form", err.body_text()))
}
