use crate::auth::mailer::ResetMail;
use crate::auth::session;
use crate::blobs::BlobKind;
use crate::content::{self, NewPost, Published};
use crate::db::models::User;
use crate::error::{AppError, AppResult};
use crate::forms::{
    EditProfileForm, LoginForm, ProfilePictureForm, RegistrationForm, ResetPasswordForm,
    ResetPasswordRequestForm,
};
use crate::identity::{self as users, verification};
use crate::policy::{self, Action, Actor};

use super::{photos_only, LoginOutcome, PostView, ProfileView, SocialService};

/// `next` only when it stays on this site.
fn local_redirect(next: Option<&str>) -> String {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path.to_string()
        }
        _ => "/".to_string(),
    }
}

impl SocialService {
    pub fn register(&self, actor: &Actor, form: &RegistrationForm) -> AppResult<User> {
        policy::authorize(actor, Action::Authenticate, None)?;
        let registration = form.validate()?;
        let user = self.transaction(|tx| users::create_user(tx, &registration, self.password_cost))?;
        tracing::info!("Registered user {}", user.username);
        Ok(user)
    }

    pub fn login(&self, actor: &Actor, form: &LoginForm) -> AppResult<LoginOutcome> {
        policy::authorize(actor, Action::Authenticate, None)?;
        let credentials = form.validate()?;

        let (user, token) = self.transaction(|tx| {
            let user = match users::authenticate(tx, &credentials.username, &credentials.password) {
                Ok(user) => user,
                Err(e) => {
                    tracing::warn!("Failed login for {}", credentials.username);
                    return Err(e);
                }
            };
            users::touch_last_seen(tx, user.id)?;
            let token = session::create_session(tx, user.id, self.session_hours)?;
            Ok((user, token))
        })?;

        tracing::info!("User {} logged in", user.username);
        Ok(LoginOutcome {
            user,
            token,
            remember_me: credentials.remember_me,
            redirect: local_redirect(form.next.as_deref()),
        })
    }

    pub fn logout(&self, actor: &Actor, token: Option<&str>) -> AppResult<()> {
        let member = policy::require_member(actor, Action::Logout, None)?;
        if let Some(token) = token {
            let conn = self.db.get()?;
            session::delete_session(&conn, token)?;
        }
        tracing::info!("User {} logged out", member.username);
        Ok(())
    }

    pub fn edit_profile(&self, actor: &Actor, form: &EditProfileForm) -> AppResult<User> {
        let member = policy::require_member(actor, Action::EditProfile, None)?;
        let update = form.validate()?;
        self.transaction(|tx| users::update_profile(tx, member.id, &update))
    }

    /// Store a new profile picture as a private post with a private photo.
    pub fn change_profile_picture(
        &self,
        actor: &Actor,
        form: ProfilePictureForm,
    ) -> AppResult<Published> {
        let member = policy::require_member(actor, Action::EditProfile, None)?;
        let upload = form.validate()?;

        let new = NewPost {
            author_id: member.id,
            body: String::new(),
            is_discussion: false,
            is_public: false,
        };
        let published = self.publish_with_uploads(BlobKind::Image, &[upload], |tx, names| {
            let published = content::publish(tx, &new, &photos_only(names))?;
            if let Some(photo) = published.photos.first() {
                users::set_profile_picture(tx, member.id, &photo.filename)?;
            }
            Ok(published)
        })?;

        tracing::info!("User {} changed profile picture", member.username);
        Ok(published)
    }

    pub fn verification_questions(
        &self,
        actor: &Actor,
    ) -> AppResult<&'static [verification::Question]> {
        policy::require_member(actor, Action::AttemptVerification, None)?;
        Ok(&verification::QUESTIONS)
    }

    /// Submit quiz answers. Passing marks the member verified for good.
    pub fn verify(&self, actor: &Actor, form: &verification::VerificationForm) -> AppResult<User> {
        let member = policy::require_member(actor, Action::AttemptVerification, None)?;
        if !form.is_correct() {
            tracing::info!("User {} failed verification", member.username);
            return Err(AppError::VerificationFailed);
        }

        let user = self.transaction(|tx| {
            users::mark_verified(tx, member.id)?;
            users::find_by_id(tx, member.id)?.ok_or(AppError::NotFound)
        })?;
        tracing::info!("User {} verified", member.username);
        Ok(user)
    }

    /// Mail a reset link if the address is known. The outcome looks the same
    /// either way.
    pub fn request_password_reset(
        &self,
        actor: &Actor,
        form: &ResetPasswordRequestForm,
    ) -> AppResult<()> {
        policy::authorize(actor, Action::Authenticate, None)?;
        let email = form.validate()?;

        let conn = self.db.get()?;
        let Some(user) = users::find_by_email(&conn, &email)? else {
            tracing::debug!("Reset requested for unknown address");
            return Ok(());
        };
        drop(conn);

        let token = self.reset_tokens.issue(user.id)?;
        self.mailer.send_reset(ResetMail {
            to: user.email,
            username: user.username.clone(),
            token,
        })?;
        tracing::info!("Issued password reset token for {}", user.username);
        Ok(())
    }

    /// Check a reset link before showing the new-password form.
    pub fn check_reset_token(&self, actor: &Actor, token: &str) -> AppResult<()> {
        policy::authorize(actor, Action::Authenticate, None)?;
        self.reset_tokens.verify(token).map(|_| ())
    }

    pub fn reset_password(
        &self,
        actor: &Actor,
        token: &str,
        form: &ResetPasswordForm,
    ) -> AppResult<()> {
        policy::authorize(actor, Action::Authenticate, None)?;
        let user_id = self.reset_tokens.verify(token)?;
        let password = form.validate()?;

        self.transaction(|tx| match users::set_password(tx, user_id, &password, self.password_cost) {
            Err(AppError::NotFound) => Err(AppError::InvalidResetToken),
            other => other,
        })?;
        tracing::info!("Password reset for user {}", user_id);
        Ok(())
    }

    /// A member's profile with one page of their posts, newest first.
    /// Private posts are listed only to their author.
    pub fn profile(&self, actor: &Actor, username: &str, page: usize) -> AppResult<ProfileView> {
        let viewer = policy::require_member(actor, Action::ViewProfile, None)?;
        let page = page.max(1);
        let conn = self.db.get()?;

        let user = users::find_by_username(&conn, username)?.ok_or(AppError::NotFound)?;
        let is_self = user.id == viewer.id;
        let total_posts = content::count_by_author(&conn, user.id, is_self)?;
        // A page past any addressable offset cannot hold posts
        let offset = (page - 1)
            .checked_mul(self.posts_per_page)
            .ok_or(AppError::NotFound)?;

        let posts = content::list_by_author(&conn, user.id, is_self, self.posts_per_page, offset)?
            .into_iter()
            .map(|post| self.post_view(&conn, post))
            .collect::<AppResult<Vec<_>>>()?;

        let link = |p: usize| format!("/profile/{}?page={}", user.username, p);
        let next = page
            .checked_add(1)
            .filter(|_| offset.saturating_add(posts.len()) < total_posts)
            .map(link);
        let prev = (page > 1).then(|| link(page - 1));

        Ok(ProfileView {
            is_self,
            posts,
            page,
            total_posts,
            next,
            prev,
            user,
        })
    }

    pub(super) fn post_view(
        &self,
        conn: &rusqlite::Connection,
        post: crate::db::models::Post,
    ) -> AppResult<PostView> {
        Ok(PostView {
            photos: content::photos_for_post(conn, post.id)?,
            videos: content::videos_for_post(conn, post.id)?,
            post,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::Upload;
    use crate::identity::verification::VerificationForm;
    use crate::policy::{Denial, Member};
    use crate::service::testing::{harness, png};

    fn login_form(username: &str, password: &str) -> LoginForm {
        LoginForm {
            username: username.into(),
            password: password.into(),
            ..Default::default()
        }
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let h = harness();
        h.member("alice");
        let err = h
            .service
            .register(
                &Actor::Anonymous,
                &RegistrationForm {
                    username: "alice".into(),
                    email: "other@example.com".into(),
                    password: "pw".into(),
                    confirm: "pw".into(),
                },
            )
            .unwrap_err();
        assert!(matches!(err, AppError::Duplicate { field: "username" }));
    }

    #[test]
    fn logged_in_member_cannot_register_or_log_in() {
        let h = harness();
        let alice = h.member("alice");
        let err = h.service.login(&alice, &login_form("alice", "hunter22")).unwrap_err();
        assert!(matches!(err, AppError::Denied(Denial::AlreadyAuthenticated)));
    }

    #[test]
    fn login_creates_session_and_sanitizes_next() {
        let h = harness();
        h.member("alice");

        let mut form = login_form("alice", "hunter22");
        form.next = Some("//evil.example.com".into());
        let outcome = h.service.login(&Actor::Anonymous, &form).unwrap();
        assert_eq!(outcome.redirect, "/");

        let actor = h.service.actor_for_session(Some(&outcome.token)).unwrap();
        assert_eq!(actor.member().map(|m| m.username.as_str()), Some("alice"));

        form.next = Some("/discussion".into());
        assert_eq!(h.service.login(&Actor::Anonymous, &form).unwrap().redirect, "/discussion");
    }

    #[test]
    fn wrong_password_and_unknown_user_fail_alike() {
        let h = harness();
        h.member("alice");
        for form in [login_form("alice", "nope"), login_form("nobody", "hunter22")] {
            let err = h.service.login(&Actor::Anonymous, &form).unwrap_err();
            assert!(matches!(err, AppError::InvalidCredentials));
        }
    }

    #[test]
    fn logout_ends_session() {
        let h = harness();
        h.member("alice");
        let outcome = h
            .service
            .login(&Actor::Anonymous, &login_form("alice", "hunter22"))
            .unwrap();
        let actor = h.service.actor_for_session(Some(&outcome.token)).unwrap();

        h.service.logout(&actor, Some(&outcome.token)).unwrap();
        let after = h.service.actor_for_session(Some(&outcome.token)).unwrap();
        assert_eq!(after, Actor::Anonymous);
    }

    #[test]
    fn wrong_answers_leave_member_unverified() {
        let h = harness();
        let alice = h.member("alice");
        let err = h
            .service
            .verify(&alice, &VerificationForm::default())
            .unwrap_err();
        assert!(matches!(err, AppError::VerificationFailed));

        let conn = h.service.db.get().unwrap();
        let id = alice.member().unwrap().id;
        assert!(!users::find_by_id(&conn, id).unwrap().unwrap().verified);
    }

    #[test]
    fn anonymous_cannot_attempt_verification() {
        let h = harness();
        let err = h
            .service
            .verify(&Actor::Anonymous, &VerificationForm::default())
            .unwrap_err();
        assert!(matches!(err, AppError::Denied(Denial::Unauthenticated)));
    }

    #[test]
    fn reset_flow_changes_password() {
        let h = harness();
        h.member("alice");

        h.service
            .request_password_reset(
                &Actor::Anonymous,
                &ResetPasswordRequestForm {
                    email: "alice@example.com".into(),
                },
            )
            .unwrap();
        let sent = h.mailer.sent();
        assert_eq!(sent.len(), 1);

        let form = ResetPasswordForm {
            password: "new-secret".into(),
            repeat_password: "new-secret".into(),
        };
        h.service
            .reset_password(&Actor::Anonymous, &sent[0].token, &form)
            .unwrap();

        assert!(h
            .service
            .login(&Actor::Anonymous, &login_form("alice", "new-secret"))
            .is_ok());
    }

    #[test]
    fn reset_request_for_unknown_email_sends_nothing() {
        let h = harness();
        h.service
            .request_password_reset(
                &Actor::Anonymous,
                &ResetPasswordRequestForm {
                    email: "ghost@example.com".into(),
                },
            )
            .unwrap();
        assert!(h.mailer.sent().is_empty());
    }

    #[test]
    fn expired_reset_token_is_rejected() {
        let h = harness();
        let alice = h.member("alice");
        let id = alice.member().unwrap().id;
        let token = h
            .service
            .reset_tokens()
            .issue_at(id, chrono::Utc::now().timestamp() - 601)
            .unwrap();
        let form = ResetPasswordForm {
            password: "new-secret".into(),
            repeat_password: "new-secret".into(),
        };
        let err = h
            .service
            .reset_password(&Actor::Anonymous, &token, &form)
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidResetToken));
    }

    #[test]
    fn profile_picture_is_private() {
        let h = harness();
        let alice = h.member("alice");
        let published = h
            .service
            .change_profile_picture(&alice, ProfilePictureForm { photo: Some(png("me.png")) })
            .unwrap();
        assert!(!published.post.is_public);
        assert!(!published.photos[0].is_public);

        let conn = h.service.db.get().unwrap();
        let id = alice.member().unwrap().id;
        let user = users::find_by_id(&conn, id).unwrap().unwrap();
        assert_eq!(user.profile_picture.as_deref(), Some(published.photos[0].filename.as_str()));
        assert!(content::list_public_photos(&conn).unwrap().is_empty());
    }

    #[test]
    fn rejected_profile_picture_changes_nothing() {
        let h = harness();
        let alice = h.member("alice");
        let bad = Upload {
            filename: "me.exe".into(),
            data: bytes::Bytes::from_static(b"MZ"),
        };
        let err = h
            .service
            .change_profile_picture(&alice, ProfilePictureForm { photo: Some(bad) })
            .unwrap_err();
        assert!(matches!(err, AppError::UploadRejected(_)));
    }

    #[test]
    fn profile_paginates_and_hides_private_posts_from_others() {
        let h = harness();
        let alice = h.verified("alice");
        let bob = h.verified("bob");
        for i in 0..4 {
            h.service
                .create_discussion_post(
                    &alice,
                    crate::forms::PostForm {
                        body: format!("post {i}"),
                        files: vec![],
                    },
                )
                .unwrap();
        }
        h.service
            .change_profile_picture(&alice, ProfilePictureForm { photo: Some(png("me.png")) })
            .unwrap();

        let own = h.service.profile(&alice, "alice", 1).unwrap();
        assert_eq!(own.total_posts, 5);
        assert_eq!(own.posts.len(), 3);
        assert_eq!(own.next.as_deref(), Some("/profile/alice?page=2"));
        assert!(own.prev.is_none());

        let seen_by_bob = h.service.profile(&bob, "alice", 2).unwrap();
        assert_eq!(seen_by_bob.total_posts, 4);
        assert_eq!(seen_by_bob.posts.len(), 1);
        assert_eq!(seen_by_bob.posts[0].post.body, "post 0");
        assert!(seen_by_bob.next.is_none());
        assert_eq!(seen_by_bob.prev.as_deref(), Some("/profile/alice?page=1"));
    }

    #[test]
    fn huge_profile_pages_do_not_overflow() {
        let h = harness();
        let alice = h.verified("alice");
        h.service
            .create_discussion_post(
                &alice,
                crate::forms::PostForm {
                    body: "only".into(),
                    files: vec![],
                },
            )
            .unwrap();

        assert!(matches!(
            h.service.profile(&alice, "alice", usize::MAX),
            Err(AppError::NotFound)
        ));
        let far = h.service.profile(&alice, "alice", usize::MAX / 3).unwrap();
        assert!(far.posts.is_empty());
        assert!(far.next.is_none());
        assert_eq!(far.total_posts, 1);
    }

    #[test]
    fn unknown_profile_is_not_found() {
        let h = harness();
        let alice = h.member("alice");
        assert!(matches!(
            h.service.profile(&alice, "nobody", 1),
            Err(AppError::NotFound)
        ));
    }

    #[test]
    fn edit_profile_keeps_own_username() {
        let h = harness();
        let alice = h.member("alice");
        h.member("bob");
        let user = h
            .service
            .edit_profile(
                &alice,
                &EditProfileForm {
                    username: "alice".into(),
                    about_me: "hi".into(),
                },
            )
            .unwrap();
        assert_eq!(user.about_me.as_deref(), Some("hi"));

        let err = h
            .service
            .edit_profile(
                &alice,
                &EditProfileForm {
                    username: "bob".into(),
                    about_me: String::new(),
                },
            )
            .unwrap_err();
        assert!(matches!(err, AppError::Duplicate { field: "username" }));
    }

    #[test]
    fn stale_actor_is_harmless() {
        let h = harness();
        let ghost = Actor::Member(Member {
            id: 999,
            username: "ghost".into(),
            verified: true,
        });
        assert!(matches!(
            h.service.verify(
                &ghost,
                &VerificationForm {
                    choices1: Some("choice3".into()),
                    choices2: Some("choice1".into()),
                    choices3: Some("choice2".into()),
                }
            ),
            Err(AppError::NotFound)
        ));
    }
}
