use crate::blobs::BlobKind;
use crate::content::{self, NewPost, Publication, Published};
use crate::db::models::{Photo, Post, Video};
use crate::engagement::Target;
use crate::error::{AppError, AppResult};
use crate::forms::{EditPostForm, PhotoForm, PostForm, TitleForm, VideoForm};
use crate::forms::{PHOTO_TITLE_MAX, VIDEO_TITLE_MAX};
use crate::identity as users;
use crate::policy::{self, Action, Actor};

use super::{photos_only, MediaView, PostView, SocialService};

impl SocialService {
    /// Public discussion posts with their attachments, newest first.
    pub fn discussion_feed(&self, actor: &Actor) -> AppResult<Vec<PostView>> {
        policy::require_member(actor, Action::ReadContent, None)?;
        let conn = self.db.get()?;
        content::list_public_discussion(&conn)?
            .into_iter()
            .map(|post| self.post_view(&conn, post))
            .collect()
    }

    pub fn photo_feed(&self, actor: &Actor) -> AppResult<Vec<Photo>> {
        policy::require_member(actor, Action::ReadContent, None)?;
        let conn = self.db.get()?;
        content::list_public_photos(&conn)
    }

    pub fn video_feed(&self, actor: &Actor) -> AppResult<Vec<Video>> {
        policy::require_member(actor, Action::ReadContent, None)?;
        let conn = self.db.get()?;
        content::list_public_videos(&conn)
    }

    pub fn media_feed(&self, actor: &Actor) -> AppResult<MediaView> {
        policy::require_member(actor, Action::ReadContent, None)?;
        let conn = self.db.get()?;
        Ok(MediaView {
            photos: content::list_public_photos(&conn)?,
            videos: content::list_public_videos(&conn)?,
        })
    }

    /// New public discussion post, optionally with photos.
    pub fn create_discussion_post(&self, actor: &Actor, form: PostForm) -> AppResult<Published> {
        let member = policy::require_member(actor, Action::CreateContent, None)?;
        let input = form.validate()?;
        let new = NewPost {
            author_id: member.id,
            body: input.body,
            is_discussion: true,
            is_public: true,
        };
        let published = self.publish_with_uploads(BlobKind::Image, &input.files, |tx, names| {
            content::publish(tx, &new, &photos_only(names))
        })?;
        tracing::info!("User {} posted {}", member.username, published.post.id);
        Ok(published)
    }

    /// One or more public photos under a new post carrying the caption.
    pub fn create_photo_post(&self, actor: &Actor, form: PhotoForm) -> AppResult<Published> {
        let member = policy::require_member(actor, Action::CreateContent, None)?;
        let input = form.validate()?;
        let new = NewPost {
            author_id: member.id,
            body: input.body,
            is_discussion: false,
            is_public: true,
        };
        let published = self.publish_with_uploads(BlobKind::Image, &input.files, |tx, names| {
            content::publish(tx, &new, &photos_only(names))
        })?;
        tracing::info!(
            "User {} uploaded {} photo(s)",
            member.username,
            published.photos.len()
        );
        Ok(published)
    }

    pub fn create_video_post(&self, actor: &Actor, form: VideoForm) -> AppResult<Published> {
        let member = policy::require_member(actor, Action::CreateContent, None)?;
        let input = form.validate()?;
        let new = NewPost {
            author_id: member.id,
            body: String::new(),
            is_discussion: false,
            is_public: true,
        };
        let published = self.publish_with_uploads(BlobKind::Video, &input.files, |tx, names| {
            let publication = Publication {
                photos: Vec::new(),
                videos: names
                    .into_iter()
                    .map(|name| (name, input.title.clone()))
                    .collect(),
            };
            content::publish(tx, &new, &publication)
        })?;
        tracing::info!(
            "User {} uploaded {} video(s)",
            member.username,
            published.videos.len()
        );
        Ok(published)
    }

    pub fn edit_post(&self, actor: &Actor, id: i64, form: &EditPostForm) -> AppResult<Post> {
        policy::require_member(actor, Action::EditContent, None)?;
        let body = form.validate()?;
        self.transaction(|tx| {
            self.authorize_owner(tx, actor, Action::EditContent, Target::Post(id))?;
            content::edit_post(tx, id, &body)
        })
    }

    pub fn edit_photo(&self, actor: &Actor, id: i64, form: &TitleForm) -> AppResult<Photo> {
        policy::require_member(actor, Action::EditContent, None)?;
        let title = form.validate(PHOTO_TITLE_MAX)?;
        self.transaction(|tx| {
            self.authorize_owner(tx, actor, Action::EditContent, Target::Photo(id))?;
            content::edit_photo_title(tx, id, &title)
        })
    }

    pub fn edit_video(&self, actor: &Actor, id: i64, form: &TitleForm) -> AppResult<Video> {
        policy::require_member(actor, Action::EditContent, None)?;
        let title = form.validate(VIDEO_TITLE_MAX)?;
        self.transaction(|tx| {
            self.authorize_owner(tx, actor, Action::EditContent, Target::Video(id))?;
            content::edit_video_title(tx, id, &title)
        })
    }

    /// Delete a post, photo or video with everything hanging off it.
    /// Stored files are removed once the rows are gone.
    pub fn delete(&self, actor: &Actor, target: Target) -> AppResult<()> {
        let blobs = self.transaction(|tx| {
            let member = self.authorize_owner(tx, actor, Action::DeleteContent, target)?;
            let blobs = match target {
                Target::Post(id) => content::delete_post(tx, id)?,
                Target::Photo(id) => content::delete_photo(tx, id)?,
                Target::Video(id) => content::delete_video(tx, id)?,
            };
            users::clear_profile_pictures(tx, &blobs)?;
            tracing::info!("User {} deleted {}", member.username, target);
            Ok(blobs)
        })?;
        self.blobs.remove_all(&blobs);
        Ok(())
    }

    /// Contents of an uploaded file. Files of private items are only served
    /// to their author; anything else looks missing.
    pub fn read_upload(&self, actor: &Actor, filename: &str) -> AppResult<Vec<u8>> {
        let member = policy::require_member(actor, Action::ReadContent, None)?;
        let conn = self.db.get()?;
        let owner = content::blob_owner(&conn, filename)?.ok_or(AppError::NotFound)?;
        if !owner.is_public && owner.author_id != member.id {
            return Err(AppError::NotFound);
        }
        self.blobs.read(filename)
    }
}
