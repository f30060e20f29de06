//! Shapes returned by the service, serialized as response bodies.

use serde::Serialize;

use crate::db::models::{Comment, Photo, Post, User, Video};
use crate::engagement::Target;

/// A post with its attachments.
#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    #[serde(flatten)]
    pub post: Post,
    pub photos: Vec<Photo>,
    pub videos: Vec<Video>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MediaView {
    pub photos: Vec<Photo>,
    pub videos: Vec<Video>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Item {
    Post(PostView),
    Photo(Photo),
    Video(Video),
}

impl Item {
    pub fn author_id(&self) -> i64 {
        match self {
            Item::Post(view) => view.post.author_id,
            Item::Photo(photo) => photo.author_id,
            Item::Video(video) => video.author_id,
        }
    }

    pub fn is_public(&self) -> bool {
        match self {
            Item::Post(view) => view.post.is_public,
            Item::Photo(photo) => photo.is_public,
            Item::Video(video) => video.is_public,
        }
    }
}

/// Everything shown on an item page.
#[derive(Debug, Clone, Serialize)]
pub struct ItemView {
    pub item: Item,
    pub comments: Vec<Comment>,
    pub like_count: i64,
    pub has_liked: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LikeState {
    pub target: Target,
    pub liked: bool,
    pub like_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    pub user: User,
    pub is_self: bool,
    pub posts: Vec<PostView>,
    pub page: usize,
    pub total_posts: usize,
    pub next: Option<String>,
    pub prev: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: User,
    pub token: String,
    pub remember_me: bool,
    /// Local path to continue to.
    pub redirect: String,
}
