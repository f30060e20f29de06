use std::str::FromStr;

use rusqlite::Connection;

use crate::content;
use crate::db::models::Comment;
use crate::engagement::{self, Target};
use crate::error::{AppError, AppResult};
use crate::forms::CommentForm;
use crate::policy::{self, Action, Actor, Member};

use super::{Item, ItemView, LikeState, SocialService};

/// The `{action}` segment of a like route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeAction {
    Like,
    Unlike,
}

impl FromStr for LikeAction {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "like" => Ok(LikeAction::Like),
            "unlike" => Ok(LikeAction::Unlike),
            _ => Err(AppError::NotFound),
        }
    }
}

impl SocialService {
    /// Load the item behind `target`. Private items exist only for their author.
    fn load_item(&self, conn: &Connection, member: &Member, target: Target) -> AppResult<Item> {
        let item = match target {
            Target::Post(id) => {
                let post = content::get_post(conn, id)?.ok_or(AppError::NotFound)?;
                Item::Post(self.post_view(conn, post)?)
            }
            Target::Photo(id) => Item::Photo(content::get_photo(conn, id)?.ok_or(AppError::NotFound)?),
            Target::Video(id) => Item::Video(content::get_video(conn, id)?.ok_or(AppError::NotFound)?),
        };
        if !item.is_public() && item.author_id() != member.id {
            return Err(AppError::NotFound);
        }
        Ok(item)
    }

    /// An item page: the item, its comments newest first, and its likes.
    pub fn view_item(&self, actor: &Actor, target: Target) -> AppResult<ItemView> {
        let member = policy::require_member(actor, Action::ReadContent, None)?;
        let conn = self.db.get()?;
        let item = self.load_item(&conn, member, target)?;
        Ok(ItemView {
            item,
            comments: engagement::comments_for(&conn, target)?,
            like_count: engagement::like_count(&conn, target)?,
            has_liked: engagement::has_liked(&conn, member.id, target)?,
        })
    }

    pub fn comment(&self, actor: &Actor, target: Target, form: &CommentForm) -> AppResult<Comment> {
        let member = policy::require_member(actor, Action::Comment, None)?;
        let body = form.validate()?;
        let comment = self.transaction(|tx| {
            self.load_item(tx, member, target)?;
            engagement::add_comment(tx, member.id, target, &body)
        })?;
        tracing::info!("User {} commented on {}", member.username, target);
        Ok(comment)
    }

    /// Like or unlike. Repeating either is a no-op.
    pub fn set_like(&self, actor: &Actor, target: Target, action: LikeAction) -> AppResult<LikeState> {
        let member = policy::require_member(actor, Action::Like, None)?;
        self.transaction(|tx| {
            self.load_item(tx, member, target)?;
            let changed = match action {
                LikeAction::Like => engagement::like(tx, member.id, target)?,
                LikeAction::Unlike => engagement::unlike(tx, member.id, target)?,
            };
            if changed {
                tracing::debug!("User {} {:?} {}", member.username, action, target);
            }
            Ok(LikeState {
                target,
                liked: engagement::has_liked(tx, member.id, target)?,
                like_count: engagement::like_count(tx, target)?,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::{PostForm, ProfilePictureForm};
    use crate::policy::Denial;
    use crate::service::testing::{harness, png};

    fn post(h: &crate::service::testing::Harness, author: &Actor) -> i64 {
        h.service
            .create_discussion_post(
                author,
                PostForm {
                    body: "hello".into(),
                    files: vec![],
                },
            )
            .unwrap()
            .post
            .id
    }

    #[test]
    fn like_action_parses_route_segment() {
        assert_eq!("like".parse::<LikeAction>().unwrap(), LikeAction::Like);
        assert_eq!("unlike".parse::<LikeAction>().unwrap(), LikeAction::Unlike);
        assert!(matches!("love".parse::<LikeAction>(), Err(AppError::NotFound)));
    }

    #[test]
    fn like_is_idempotent() {
        let h = harness();
        let alice = h.verified("alice");
        let bob = h.verified("bob");
        let target = Target::Post(post(&h, &alice));

        h.service.set_like(&bob, target, LikeAction::Like).unwrap();
        let state = h.service.set_like(&bob, target, LikeAction::Like).unwrap();
        assert!(state.liked);
        assert_eq!(state.like_count, 1);

        let state = h.service.set_like(&bob, target, LikeAction::Unlike).unwrap();
        assert!(!state.liked);
        let state = h.service.set_like(&bob, target, LikeAction::Unlike).unwrap();
        assert_eq!(state.like_count, 0);
    }

    #[test]
    fn unverified_member_cannot_engage() {
        let h = harness();
        let alice = h.verified("alice");
        let carol = h.member("carol");
        let target = Target::Post(post(&h, &alice));

        assert!(matches!(
            h.service.set_like(&carol, target, LikeAction::Like),
            Err(AppError::Denied(Denial::Unverified))
        ));
        assert!(matches!(
            h.service.comment(&carol, target, &CommentForm { body: "hi".into() }),
            Err(AppError::Denied(Denial::Unverified))
        ));
    }

    #[test]
    fn item_view_shows_comments_and_likes() {
        let h = harness();
        let alice = h.verified("alice");
        let bob = h.verified("bob");
        let target = Target::Post(post(&h, &alice));

        h.service.comment(&bob, target, &CommentForm { body: "first".into() }).unwrap();
        let latest = h
            .service
            .comment(&alice, target, &CommentForm { body: "second".into() })
            .unwrap();
        h.service.set_like(&bob, target, LikeAction::Like).unwrap();

        let view = h.service.view_item(&bob, target).unwrap();
        assert_eq!(view.comments.len(), 2);
        assert_eq!(view.comments[0].id, latest.id);
        assert_eq!(view.like_count, 1);
        assert!(view.has_liked);
        assert!(!h.service.view_item(&alice, target).unwrap().has_liked);
    }

    #[test]
    fn empty_comment_is_a_validation_error() {
        let h = harness();
        let alice = h.verified("alice");
        let target = Target::Post(post(&h, &alice));
        assert!(matches!(
            h.service.comment(&alice, target, &CommentForm { body: " ".into() }),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn missing_or_private_targets_are_not_found() {
        let h = harness();
        let alice = h.verified("alice");
        let bob = h.verified("bob");
        assert!(matches!(
            h.service.set_like(&bob, Target::Photo(42), LikeAction::Like),
            Err(AppError::NotFound)
        ));

        let picture = h
            .service
            .change_profile_picture(&alice, ProfilePictureForm { photo: Some(png("me.png")) })
            .unwrap();
        let target = Target::Photo(picture.photos[0].id);
        assert!(matches!(h.service.view_item(&bob, target), Err(AppError::NotFound)));
        assert!(h.service.view_item(&alice, target).is_ok());
    }

    #[test]
    fn deleting_post_takes_its_engagement_along() {
        let h = harness();
        let alice = h.verified("alice");
        let bob = h.verified("bob");
        let id = post(&h, &alice);
        let target = Target::Post(id);
        h.service.comment(&bob, target, &CommentForm { body: "hey".into() }).unwrap();
        h.service.set_like(&bob, target, LikeAction::Like).unwrap();

        h.service.delete(&alice, target).unwrap();

        let conn = h.service.db.get().unwrap();
        let comments: i64 = conn
            .query_row("SELECT COUNT(*) FROM comments", [], |row| row.get(0))
            .unwrap();
        let likes: i64 = conn
            .query_row("SELECT COUNT(*) FROM likes", [], |row| row.get(0))
            .unwrap();
        assert_eq!((comments, likes), (0, 0));
    }
}
