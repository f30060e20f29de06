//! Content store: posts and the photos and videos they own.
//!
//! Photos and videos always hang off a post; deleting a post removes its
//! attachments and every comment and like on any of them through the
//! schema's cascading foreign keys. Callers get back the blob filenames that
//! were orphaned so the files can be removed after commit.

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::models::{Photo, Post, Video};
use crate::engagement::Target;
use crate::error::{AppError, AppResult};
use crate::forms::FieldErrors;

const POST_SELECT: &str = "SELECT p.id, p.body, p.author_id, u.username, p.timestamp, \
     p.is_discussion, p.is_public FROM posts p JOIN users u ON u.id = p.author_id";

const PHOTO_SELECT: &str = "SELECT ph.id, ph.filename, ph.title, ph.post_id, p.author_id, \
     u.username, ph.is_public, ph.timestamp FROM photos ph \
     JOIN posts p ON p.id = ph.post_id JOIN users u ON u.id = p.author_id";

const VIDEO_SELECT: &str = "SELECT v.id, v.filename, v.title, v.post_id, p.author_id, \
     u.username, v.is_public, v.timestamp FROM videos v \
     JOIN posts p ON p.id = v.post_id JOIN users u ON u.id = p.author_id";

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        body: row.get(1)?,
        author_id: row.get(2)?,
        author: row.get(3)?,
        timestamp: row.get(4)?,
        is_discussion: row.get(5)?,
        is_public: row.get(6)?,
    })
}

fn photo_from_row(row: &Row<'_>) -> rusqlite::Result<Photo> {
    Ok(Photo {
        id: row.get(0)?,
        filename: row.get(1)?,
        title: row.get(2)?,
        post_id: row.get(3)?,
        author_id: row.get(4)?,
        author: row.get(5)?,
        is_public: row.get(6)?,
        timestamp: row.get(7)?,
    })
}

fn video_from_row(row: &Row<'_>) -> rusqlite::Result<Video> {
    Ok(Video {
        id: row.get(0)?,
        filename: row.get(1)?,
        title: row.get(2)?,
        post_id: row.get(3)?,
        author_id: row.get(4)?,
        author: row.get(5)?,
        is_public: row.get(6)?,
        timestamp: row.get(7)?,
    })
}

fn query_list<T>(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
    map: fn(&Row<'_>) -> rusqlite::Result<T>,
) -> AppResult<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, map)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    pub author_id: i64,
    pub body: String,
    pub is_discussion: bool,
    pub is_public: bool,
}

/// A post together with the attachments created with it.
#[derive(Debug, Clone, Default)]
pub struct Publication {
    pub photos: Vec<String>,
    /// (filename, title)
    pub videos: Vec<(String, String)>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct Published {
    pub post: Post,
    pub photos: Vec<Photo>,
    pub videos: Vec<Video>,
}

pub fn create_post(conn: &Connection, new: &NewPost) -> AppResult<Post> {
    conn.execute(
        "INSERT INTO posts (body, author_id, is_discussion, is_public) VALUES (?1, ?2, ?3, ?4)",
        params![new.body, new.author_id, new.is_discussion, new.is_public],
    )?;
    get_post(conn, conn.last_insert_rowid())?.ok_or(AppError::NotFound)
}

pub fn attach_photo(
    conn: &Connection,
    post_id: i64,
    filename: &str,
    title: Option<&str>,
    is_public: bool,
) -> AppResult<Photo> {
    conn.execute(
        "INSERT INTO photos (filename, title, post_id, is_public) VALUES (?1, ?2, ?3, ?4)",
        params![filename, title, post_id, is_public],
    )?;
    get_photo(conn, conn.last_insert_rowid())?.ok_or(AppError::NotFound)
}

pub fn attach_video(
    conn: &Connection,
    post_id: i64,
    filename: &str,
    title: &str,
    is_public: bool,
) -> AppResult<Video> {
    conn.execute(
        "INSERT INTO videos (filename, title, post_id, is_public) VALUES (?1, ?2, ?3, ?4)",
        params![filename, title, post_id, is_public],
    )?;
    get_video(conn, conn.last_insert_rowid())?.ok_or(AppError::NotFound)
}

/// Create a post and its attachments. Attachments inherit the post's
/// visibility. Run inside a transaction for all-or-nothing behaviour.
pub fn publish(conn: &Connection, new: &NewPost, attachments: &Publication) -> AppResult<Published> {
    if new.body.trim().is_empty() && attachments.photos.is_empty() && attachments.videos.is_empty() {
        return Err(FieldErrors::single("body", "This field is required.").into());
    }

    let post = create_post(conn, new)?;
    let photos = attachments
        .photos
        .iter()
        .map(|filename| attach_photo(conn, post.id, filename, None, new.is_public))
        .collect::<AppResult<Vec<_>>>()?;
    let videos = attachments
        .videos
        .iter()
        .map(|(filename, title)| attach_video(conn, post.id, filename, title, new.is_public))
        .collect::<AppResult<Vec<_>>>()?;

    Ok(Published {
        post,
        photos,
        videos,
    })
}

pub fn get_post(conn: &Connection, id: i64) -> AppResult<Option<Post>> {
    let sql = format!("{POST_SELECT} WHERE p.id = ?1");
    Ok(conn.query_row(&sql, params![id], post_from_row).optional()?)
}

pub fn get_photo(conn: &Connection, id: i64) -> AppResult<Option<Photo>> {
    let sql = format!("{PHOTO_SELECT} WHERE ph.id = ?1");
    Ok(conn.query_row(&sql, params![id], photo_from_row).optional()?)
}

pub fn get_video(conn: &Connection, id: i64) -> AppResult<Option<Video>> {
    let sql = format!("{VIDEO_SELECT} WHERE v.id = ?1");
    Ok(conn.query_row(&sql, params![id], video_from_row).optional()?)
}

/// Who may see a stored file: the author of the photo or video it belongs
/// to, and whether that item is publicly listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlobOwner {
    pub author_id: i64,
    pub is_public: bool,
}

pub fn blob_owner(conn: &Connection, filename: &str) -> AppResult<Option<BlobOwner>> {
    let sql = "SELECT p.author_id, ph.is_public AND p.is_public FROM photos ph \
               JOIN posts p ON p.id = ph.post_id WHERE ph.filename = ?1 \
               UNION ALL \
               SELECT p.author_id, v.is_public AND p.is_public FROM videos v \
               JOIN posts p ON p.id = v.post_id WHERE v.filename = ?1 \
               LIMIT 1";
    Ok(conn
        .query_row(sql, params![filename], |row| {
            Ok(BlobOwner {
                author_id: row.get(0)?,
                is_public: row.get(1)?,
            })
        })
        .optional()?)
}

/// Author of whatever `target` points at, if it exists.
pub fn owner_of(conn: &Connection, target: Target) -> AppResult<Option<i64>> {
    let sql = match target {
        Target::Post(_) => "SELECT author_id FROM posts WHERE id = ?1",
        Target::Photo(_) => {
            "SELECT p.author_id FROM photos ph JOIN posts p ON p.id = ph.post_id WHERE ph.id = ?1"
        }
        Target::Video(_) => {
            "SELECT p.author_id FROM videos v JOIN posts p ON p.id = v.post_id WHERE v.id = ?1"
        }
    };
    Ok(conn
        .query_row(sql, params![target.id()], |row| row.get(0))
        .optional()?)
}

pub fn photos_for_post(conn: &Connection, post_id: i64) -> AppResult<Vec<Photo>> {
    let sql = format!("{PHOTO_SELECT} WHERE ph.post_id = ?1 ORDER BY ph.id");
    query_list(conn, &sql, params![post_id], photo_from_row)
}

pub fn videos_for_post(conn: &Connection, post_id: i64) -> AppResult<Vec<Video>> {
    let sql = format!("{VIDEO_SELECT} WHERE v.post_id = ?1 ORDER BY v.id");
    query_list(conn, &sql, params![post_id], video_from_row)
}

fn attachment_count(conn: &Connection, post_id: i64) -> AppResult<i64> {
    Ok(conn.query_row(
        "SELECT (SELECT COUNT(*) FROM photos WHERE post_id = ?1) + \
                (SELECT COUNT(*) FROM videos WHERE post_id = ?1)",
        params![post_id],
        |row| row.get(0),
    )?)
}

// -- Feeds --

/// Public discussion posts, newest first.
pub fn list_public_discussion(conn: &Connection) -> AppResult<Vec<Post>> {
    let sql = format!(
        "{POST_SELECT} WHERE p.is_public = 1 AND p.is_discussion = 1 \
         ORDER BY p.timestamp DESC, p.id DESC"
    );
    query_list(conn, &sql, params![], post_from_row)
}

/// Public photos on public posts, newest first.
pub fn list_public_photos(conn: &Connection) -> AppResult<Vec<Photo>> {
    let sql = format!(
        "{PHOTO_SELECT} WHERE ph.is_public = 1 AND p.is_public = 1 \
         ORDER BY ph.timestamp DESC, ph.id DESC"
    );
    query_list(conn, &sql, params![], photo_from_row)
}

/// Public videos on public posts, newest first.
pub fn list_public_videos(conn: &Connection) -> AppResult<Vec<Video>> {
    let sql = format!(
        "{VIDEO_SELECT} WHERE v.is_public = 1 AND p.is_public = 1 \
         ORDER BY v.timestamp DESC, v.id DESC"
    );
    query_list(conn, &sql, params![], video_from_row)
}

/// One page of an author's posts, newest first.
pub fn list_by_author(
    conn: &Connection,
    author_id: i64,
    include_private: bool,
    limit: usize,
    offset: usize,
) -> AppResult<Vec<Post>> {
    let sql = format!(
        "{POST_SELECT} WHERE p.author_id = ?1 AND (p.is_public = 1 OR ?2) \
         ORDER BY p.timestamp DESC, p.id DESC LIMIT ?3 OFFSET ?4"
    );
    query_list(
        conn,
        &sql,
        params![
            author_id,
            include_private,
            i64::try_from(limit).unwrap_or(i64::MAX),
            i64::try_from(offset).unwrap_or(i64::MAX)
        ],
        post_from_row,
    )
}

pub fn count_by_author(conn: &Connection, author_id: i64, include_private: bool) -> AppResult<usize> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM posts WHERE author_id = ?1 AND (is_public = 1 OR ?2)",
        params![author_id, include_private],
        |row| row.get(0),
    )?;
    Ok(count as usize)
}

// -- Edits --

/// Replace a post's body. It may only become empty while attachments remain.
pub fn edit_post(conn: &Connection, id: i64, body: &str) -> AppResult<Post> {
    if body.trim().is_empty() && attachment_count(conn, id)? == 0 {
        return Err(FieldErrors::single("body", "This field is required.").into());
    }
    let rows = conn.execute("UPDATE posts SET body = ?1 WHERE id = ?2", params![body, id])?;
    if rows == 0 {
        return Err(AppError::NotFound);
    }
    get_post(conn, id)?.ok_or(AppError::NotFound)
}

pub fn edit_photo_title(conn: &Connection, id: i64, title: &str) -> AppResult<Photo> {
    let rows = conn.execute("UPDATE photos SET title = ?1 WHERE id = ?2", params![title, id])?;
    if rows == 0 {
        return Err(AppError::NotFound);
    }
    get_photo(conn, id)?.ok_or(AppError::NotFound)
}

pub fn edit_video_title(conn: &Connection, id: i64, title: &str) -> AppResult<Video> {
    let rows = conn.execute("UPDATE videos SET title = ?1 WHERE id = ?2", params![title, id])?;
    if rows == 0 {
        return Err(AppError::NotFound);
    }
    get_video(conn, id)?.ok_or(AppError::NotFound)
}

// -- Deletes --

/// Delete a post with its photos, videos, comments and likes.
/// Returns the blob filenames no longer referenced.
pub fn delete_post(conn: &Connection, id: i64) -> AppResult<Vec<String>> {
    let mut blobs: Vec<String> = photos_for_post(conn, id)?
        .into_iter()
        .map(|photo| photo.filename)
        .collect();
    blobs.extend(videos_for_post(conn, id)?.into_iter().map(|video| video.filename));

    let rows = conn.execute("DELETE FROM posts WHERE id = ?1", params![id])?;
    if rows == 0 {
        return Err(AppError::NotFound);
    }
    Ok(blobs)
}

/// Remove `post_id` if it has nothing left to show.
fn delete_if_hollow(conn: &Connection, post_id: i64, blobs: &mut Vec<String>) -> AppResult<()> {
    let Some(post) = get_post(conn, post_id)? else {
        return Ok(());
    };
    if post.body.trim().is_empty() && attachment_count(conn, post_id)? == 0 {
        blobs.extend(delete_post(conn, post_id)?);
    }
    Ok(())
}

/// Delete a photo with its comments and likes. A post left with neither body
/// nor attachments goes with it.
pub fn delete_photo(conn: &Connection, id: i64) -> AppResult<Vec<String>> {
    let photo = get_photo(conn, id)?.ok_or(AppError::NotFound)?;
    conn.execute("DELETE FROM photos WHERE id = ?1", params![id])?;
    let mut blobs = vec![photo.filename];
    delete_if_hollow(conn, photo.post_id, &mut blobs)?;
    Ok(blobs)
}

pub fn delete_video(conn: &Connection, id: i64) -> AppResult<Vec<String>> {
    let video = get_video(conn, id)?.ok_or(AppError::NotFound)?;
    conn.execute("DELETE FROM videos WHERE id = ?1", params![id])?;
    let mut blobs = vec![video.filename];
    delete_if_hollow(conn, video.post_id, &mut blobs)?;
    Ok(blobs)
}
