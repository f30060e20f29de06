//! Engagement store: comments and likes on posts, photos and videos.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::db::models::Comment;
use crate::error::{AppError, AppResult};

/// The content item a comment or like attaches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Target {
    Post(i64),
    Photo(i64),
    Video(i64),
}

impl Target {
    pub fn id(self) -> i64 {
        match self {
            Target::Post(id) | Target::Photo(id) | Target::Video(id) => id,
        }
    }

    /// Column holding this kind of target on `comments` and `likes`.
    fn column(self) -> &'static str {
        match self {
            Target::Post(_) => "post_id",
            Target::Photo(_) => "photo_id",
            Target::Video(_) => "video_id",
        }
    }

    fn from_columns(post: Option<i64>, photo: Option<i64>, video: Option<i64>) -> Option<Self> {
        match (post, photo, video) {
            (Some(id), None, None) => Some(Target::Post(id)),
            (None, Some(id), None) => Some(Target::Photo(id)),
            (None, None, Some(id)) => Some(Target::Video(id)),
            _ => None,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Post(id) => write!(f, "post {id}"),
            Self::Photo(id) => write!(f, "photo {id}"),
            Self::Video(id) => write!(f, "video {id}"),
        }
    }
}

fn comment_from_row(row: &Row<'_>) -> rusqlite::Result<Comment> {
    let target = Target::from_columns(row.get(4)?, row.get(5)?, row.get(6)?).ok_or_else(|| {
        rusqlite::Error::InvalidColumnType(4, "target".into(), rusqlite::types::Type::Null)
    })?;
    Ok(Comment {
        id: row.get(0)?,
        body: row.get(1)?,
        author_id: row.get(2)?,
        author: row.get(3)?,
        target,
        timestamp: row.get(7)?,
    })
}

const COMMENT_SELECT: &str = "SELECT c.id, c.body, c.author_id, u.username, c.post_id, \
     c.photo_id, c.video_id, c.timestamp FROM comments c JOIN users u ON u.id = c.author_id";

pub fn add_comment(conn: &Connection, author_id: i64, target: Target, body: &str) -> AppResult<Comment> {
    let sql = format!(
        "INSERT INTO comments (body, author_id, {}) VALUES (?1, ?2, ?3)",
        target.column()
    );
    conn.execute(&sql, params![body, author_id, target.id()])?;

    let id = conn.last_insert_rowid();
    let sql = format!("{COMMENT_SELECT} WHERE c.id = ?1");
    Ok(conn.query_row(&sql, params![id], comment_from_row)?)
}

/// Comments on `target`, newest first.
pub fn comments_for(conn: &Connection, target: Target) -> AppResult<Vec<Comment>> {
    let sql = format!(
        "{COMMENT_SELECT} WHERE c.{} = ?1 ORDER BY c.timestamp DESC, c.id DESC",
        target.column()
    );
    let mut stmt = conn.prepare(&sql)?;
    let comments = stmt
        .query_map(params![target.id()], comment_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(comments)
}

pub fn comment_count(conn: &Connection, target: Target) -> AppResult<i64> {
    let sql = format!("SELECT COUNT(*) FROM comments WHERE {} = ?1", target.column());
    Ok(conn.query_row(&sql, params![target.id()], |row| row.get(0))?)
}

/// Record a like. Liking twice leaves a single row; the partial unique
/// indexes make this hold under concurrent requests too.
/// Returns whether a row was inserted.
pub fn like(conn: &Connection, user_id: i64, target: Target) -> AppResult<bool> {
    let sql = format!(
        "INSERT OR IGNORE INTO likes (user_id, {}) VALUES (?1, ?2)",
        target.column()
    );
    let rows = conn.execute(&sql, params![user_id, target.id()]).map_err(|e| match e {
        rusqlite::Error::SqliteFailure(ref err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            // Foreign key failure: the target vanished
            AppError::NotFound
        }
        other => other.into(),
    })?;
    Ok(rows > 0)
}

/// Remove a like. Unliking something not liked is a no-op.
/// Returns whether a row was removed.
pub fn unlike(conn: &Connection, user_id: i64, target: Target) -> AppResult<bool> {
    let sql = format!("DELETE FROM likes WHERE user_id = ?1 AND {} = ?2", target.column());
    let rows = conn.execute(&sql, params![user_id, target.id()])?;
    Ok(rows > 0)
}

pub fn has_liked(conn: &Connection, user_id: i64, target: Target) -> AppResult<bool> {
    let sql = format!(
        "SELECT COUNT(*) > 0 FROM likes WHERE user_id = ?1 AND {} = ?2",
        target.column()
    );
    Ok(conn.query_row(&sql, params![user_id, target.id()], |row| row.get(0))?)
}

pub fn like_count(conn: &Connection, target: Target) -> AppResult<i64> {
    let sql = format!("SELECT COUNT(*) FROM likes WHERE {} = ?1", target.column());
    Ok(conn.query_row(&sql, params![target.id()], |row| row.get(0))?)
}
