//! Application service: one method per user action.
//!
//! Every method takes the acting [`Actor`] explicitly, consults the access
//! policy before touching the stores, and runs its mutations in a single
//! transaction.

mod content;
mod engagement;
mod identity;
pub mod views;

use std::sync::Arc;

use rusqlite::Transaction;

use crate::auth::{session, Mailer, ResetTokens};
use crate::blobs::{BlobKind, BlobStore};
use crate::config::Config;
use crate::content::{Publication, Published};
use crate::engagement::Target;
use crate::error::{AppError, AppResult};
use crate::forms::Upload;
use crate::identity as users;
use crate::policy::{self, Action, Actor, Member, Resource};
use crate::state::DbPool;

pub use engagement::LikeAction;
pub use views::{Item, ItemView, LikeState, LoginOutcome, MediaView, PostView, ProfileView};

#[derive(Clone)]
pub struct SocialService {
    db: DbPool,
    blobs: BlobStore,
    reset_tokens: ResetTokens,
    mailer: Arc<dyn Mailer>,
    password_cost: u32,
    session_hours: u64,
    posts_per_page: usize,
}

impl SocialService {
    pub fn new(db: DbPool, config: &Config, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            db,
            blobs: BlobStore::new(config.uploads_path(), &config.storage),
            reset_tokens: ResetTokens::new(&config.auth.secret_key, config.auth.reset_token_ttl_secs),
            mailer,
            password_cost: config.auth.password_cost,
            session_hours: config.auth.session_hours,
            posts_per_page: config.feed.posts_per_page.max(1),
        }
    }

    pub fn blobs(&self) -> &BlobStore {
        &self.blobs
    }

    pub fn reset_tokens(&self) -> &ResetTokens {
        &self.reset_tokens
    }

    /// Resolve a session token to the actor behind it. Unknown or expired
    /// tokens are anonymous. A member's `last_seen` is refreshed.
    pub fn actor_for_session(&self, token: Option<&str>) -> AppResult<Actor> {
        let Some(token) = token else {
            return Ok(Actor::Anonymous);
        };
        let conn = self.db.get()?;
        match session::find_member(&conn, token)? {
            Some(member) => {
                users::touch_last_seen(&conn, member.id)?;
                Ok(Actor::Member(member))
            }
            None => Ok(Actor::Anonymous),
        }
    }

    fn transaction<T>(&self, f: impl FnOnce(&Transaction<'_>) -> AppResult<T>) -> AppResult<T> {
        let mut conn = self.db.get()?;
        let tx = conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Gate on the actor, then on ownership of `target` once it is known to exist.
    fn authorize_owner<'a>(
        &self,
        tx: &Transaction<'_>,
        actor: &'a Actor,
        action: Action,
        target: Target,
    ) -> AppResult<&'a Member> {
        policy::require_member(actor, action, None)?;
        let author_id = crate::content::owner_of(tx, target)?.ok_or(AppError::NotFound)?;
        Ok(policy::require_member(
            actor,
            action,
            Some(&Resource::owned_by(author_id)),
        )?)
    }

    /// Store `uploads`, then publish inside one transaction. Blobs written
    /// for a publication that fails are removed again.
    fn publish_with_uploads(
        &self,
        kind: BlobKind,
        uploads: &[Upload],
        publish: impl FnOnce(&Transaction<'_>, Vec<String>) -> AppResult<Published>,
    ) -> AppResult<Published> {
        let names = self.blobs.save_all(kind, uploads)?;
        match self.transaction(|tx| publish(tx, names.clone())) {
            Ok(published) => Ok(published),
            Err(e) => {
                self.blobs.remove_all(&names);
                Err(e)
            }
        }
    }
}

fn photos_only(names: Vec<String>) -> Publication {
    Publication {
        photos: names,
        videos: Vec::new(),
    }
}
