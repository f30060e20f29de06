use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub about_me: Option<String>,
    pub verified: bool,
    pub last_seen: String,
    pub profile_picture: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub body: String,
    pub author_id: i64,
    pub author: String,
    pub timestamp: String,
    pub is_discussion: bool,
    pub is_public: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    pub id: i64,
    pub filename: String,
    pub title: Option<String>,
    pub post_id: i64,
    pub author_id: i64,
    pub author: String,
    pub is_public: bool,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    pub id: i64,
    pub filename: String,
    pub title: String,
    pub post_id: i64,
    pub author_id: i64,
    pub author: String,
    pub is_public: bool,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub body: String,
    pub author_id: i64,
    pub author: String,
    pub target: crate::engagement::Target,
    pub timestamp: String,
}
