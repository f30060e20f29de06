//! Request inputs and their validation.
//!
//! Every form is a plain struct deserialized from the request and checked by
//! a pure `validate` that yields either the cleaned payload or the list of
//! field errors. Uniqueness and other store-backed rules live in the stores.

use serde::{Deserialize, Serialize};

pub const USERNAME_MAX: usize = 60;
pub const EMAIL_MIN: usize = 6;
pub const EMAIL_MAX: usize = 35;
pub const ABOUT_ME_MAX: usize = 140;
pub const POST_BODY_MAX: usize = 140;
pub const COMMENT_MAX: usize = 1000;
pub const PHOTO_TITLE_MAX: usize = 1000;
pub const VIDEO_TITLE_MAX: usize = 100;

const REQUIRED: &str = "This field is required.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.add(field, message);
        errors
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    fn finish<T>(self, value: T) -> Result<T, FieldErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

/// Trimmed, required, bounded text.
fn required_text(
    errors: &mut FieldErrors,
    field: &'static str,
    value: &str,
    max: usize,
) -> String {
    let value = value.trim();
    if value.is_empty() {
        errors.add(field, REQUIRED);
    } else {
        check_max(errors, field, value, max);
    }
    value.to_string()
}

fn check_max(errors: &mut FieldErrors, field: &'static str, value: &str, max: usize) {
    if value.chars().count() > max {
        errors.add(field, format!("Field must be at most {max} characters long."));
    }
}

fn looks_like_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !value.chars().any(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}

// -- Identity --

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub remember_me: Option<String>,
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub remember_me: bool,
}

impl LoginForm {
    pub fn validate(&self) -> Result<Credentials, FieldErrors> {
        let mut errors = FieldErrors::default();
        let username = self.username.trim().to_string();
        if username.is_empty() {
            errors.add("username", REQUIRED);
        }
        if self.password.is_empty() {
            errors.add("password", REQUIRED);
        }
        let remember_me = self
            .remember_me
            .as_deref()
            .is_some_and(|v| matches!(v, "on" | "true" | "1" | "y" | "yes"));
        errors.finish(Credentials {
            username,
            password: self.password.clone(),
            remember_me,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistrationForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl RegistrationForm {
    pub fn validate(&self) -> Result<Registration, FieldErrors> {
        let mut errors = FieldErrors::default();
        let username = required_text(&mut errors, "username", &self.username, USERNAME_MAX);

        let email = self.email.trim().to_string();
        if email.is_empty() {
            errors.add("email", REQUIRED);
        } else {
            if !looks_like_email(&email) {
                errors.add("email", "Invalid email address.");
            }
            let len = email.chars().count();
            if !(EMAIL_MIN..=EMAIL_MAX).contains(&len) {
                errors.add(
                    "email",
                    format!("Field must be between {EMAIL_MIN} and {EMAIL_MAX} characters long."),
                );
            }
        }

        if self.password.is_empty() {
            errors.add("password", REQUIRED);
        }
        if self.confirm.is_empty() {
            errors.add("confirm", REQUIRED);
        } else if self.confirm != self.password {
            errors.add("confirm", "Must Match Password");
        }

        errors.finish(Registration {
            username,
            email,
            password: self.password.clone(),
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EditProfileForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub about_me: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub username: String,
    pub about_me: String,
}

impl EditProfileForm {
    pub fn validate(&self) -> Result<ProfileUpdate, FieldErrors> {
        let mut errors = FieldErrors::default();
        let username = required_text(&mut errors, "username", &self.username, USERNAME_MAX);
        let about_me = self.about_me.trim().to_string();
        check_max(&mut errors, "about_me", &about_me, ABOUT_ME_MAX);
        errors.finish(ProfileUpdate { username, about_me })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResetPasswordRequestForm {
    #[serde(default)]
    pub email: String,
}

impl ResetPasswordRequestForm {
    pub fn validate(&self) -> Result<String, FieldErrors> {
        let mut errors = FieldErrors::default();
        let email = self.email.trim().to_string();
        if email.is_empty() {
            errors.add("email", REQUIRED);
        }
        errors.finish(email)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResetPasswordForm {
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub repeat_password: String,
}

impl ResetPasswordForm {
    pub fn validate(&self) -> Result<String, FieldErrors> {
        let mut errors = FieldErrors::default();
        if self.password.is_empty() {
            errors.add("password", REQUIRED);
        }
        if self.repeat_password.is_empty() {
            errors.add("repeat_password", REQUIRED);
        } else if self.repeat_password != self.password {
            errors.add("repeat_password", "Field must be equal to password.");
        }
        errors.finish(self.password.clone())
    }
}

// -- Content --

/// An uploaded file, as received.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub data: bytes::Bytes,
}

/// Discussion post with optional photos.
#[derive(Debug, Clone, Default)]
pub struct PostForm {
    pub body: String,
    pub files: Vec<Upload>,
}

#[derive(Debug, Clone)]
pub struct NewPostInput {
    pub body: String,
    pub files: Vec<Upload>,
}

impl PostForm {
    pub fn validate(self) -> Result<NewPostInput, FieldErrors> {
        let mut errors = FieldErrors::default();
        let body = self.body.trim().to_string();
        if body.is_empty() && self.files.is_empty() {
            errors.add("body", REQUIRED);
        }
        check_max(&mut errors, "body", &body, POST_BODY_MAX);
        errors.finish(NewPostInput {
            body,
            files: self.files,
        })
    }
}

/// One or more photos with an optional caption.
#[derive(Debug, Clone, Default)]
pub struct PhotoForm {
    pub body: String,
    pub files: Vec<Upload>,
}

impl PhotoForm {
    pub fn validate(self) -> Result<NewPostInput, FieldErrors> {
        let mut errors = FieldErrors::default();
        let body = self.body.trim().to_string();
        check_max(&mut errors, "body", &body, POST_BODY_MAX);
        if self.files.is_empty() {
            errors.add("files", REQUIRED);
        }
        errors.finish(NewPostInput {
            body,
            files: self.files,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct VideoForm {
    pub title: String,
    pub files: Vec<Upload>,
}

#[derive(Debug, Clone)]
pub struct NewVideoInput {
    pub title: String,
    pub files: Vec<Upload>,
}

impl VideoForm {
    pub fn validate(self) -> Result<NewVideoInput, FieldErrors> {
        let mut errors = FieldErrors::default();
        let title = required_text(&mut errors, "title", &self.title, VIDEO_TITLE_MAX);
        if self.files.is_empty() {
            errors.add("files", REQUIRED);
        }
        errors.finish(NewVideoInput {
            title,
            files: self.files,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProfilePictureForm {
    pub photo: Option<Upload>,
}

impl ProfilePictureForm {
    pub fn validate(self) -> Result<Upload, FieldErrors> {
        self.photo
            .ok_or_else(|| FieldErrors::single("photo", REQUIRED))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EditPostForm {
    #[serde(default)]
    pub body: String,
}

impl EditPostForm {
    /// Emptiness is checked against the post's attachments by the caller.
    pub fn validate(&self) -> Result<String, FieldErrors> {
        let mut errors = FieldErrors::default();
        let body = self.body.trim().to_string();
        check_max(&mut errors, "body", &body, POST_BODY_MAX);
        errors.finish(body)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TitleForm {
    #[serde(default)]
    pub title: String,
}

impl TitleForm {
    pub fn validate(&self, max: usize) -> Result<String, FieldErrors> {
        let mut errors = FieldErrors::default();
        let title = required_text(&mut errors, "title", &self.title, max);
        errors.finish(title)
    }
}

// -- Engagement --

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentForm {
    #[serde(default)]
    pub body: String,
}

impl CommentForm {
    pub fn validate(&self) -> Result<String, FieldErrors> {
        let mut errors = FieldErrors::default();
        let body = required_text(&mut errors, "body", &self.body, COMMENT_MAX);
        errors.finish(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(username: &str, email: &str, password: &str, confirm: &str) -> RegistrationForm {
        RegistrationForm {
            username: username.into(),
            email: email.into(),
            password: password.into(),
            confirm: confirm.into(),
        }
    }

    fn upload(name: &str) -> Upload {
        Upload {
            filename: name.into(),
            data: bytes::Bytes::from_static(b"data"),
        }
    }

    #[test]
    fn registration_accepts_valid_input() {
        let valid = registration(" alice ", "a@x.com", "pw", "pw").validate().unwrap();
        assert_eq!(valid.username, "alice");
        assert_eq!(valid.email, "a@x.com");
    }

    #[test]
    fn registration_reports_every_bad_field() {
        let errors = registration("", "nope", "pw", "other").validate().unwrap_err();
        assert!(errors.has("username"));
        assert!(errors.has("email"));
        assert!(errors.has("confirm"));
        assert!(!errors.has("password"));
    }

    #[test]
    fn registration_bounds_email_length() {
        let long = format!("{}@example.com", "a".repeat(30));
        assert!(registration("bob", &long, "pw", "pw").validate().unwrap_err().has("email"));
        assert!(registration("bob", "a@b.c", "pw", "pw").validate().unwrap_err().has("email"));
    }

    #[test]
    fn email_shape() {
        assert!(looks_like_email("a@x.com"));
        assert!(!looks_like_email("a@x"));
        assert!(!looks_like_email("@x.com"));
        assert!(!looks_like_email("a@@x.com"));
        assert!(!looks_like_email("a b@x.com"));
    }

    #[test]
    fn login_requires_both_fields() {
        let errors = LoginForm::default().validate().unwrap_err();
        assert!(errors.has("username"));
        assert!(errors.has("password"));

        let form = LoginForm {
            username: "alice".into(),
            password: "pw".into(),
            remember_me: Some("on".into()),
            next: None,
        };
        assert!(form.validate().unwrap().remember_me);
    }

    #[test]
    fn post_body_may_be_empty_only_with_attachments() {
        assert!(PostForm::default().validate().unwrap_err().has("body"));
        let with_photo = PostForm {
            body: String::new(),
            files: vec![upload("a.png")],
        };
        assert!(with_photo.validate().is_ok());
    }

    #[test]
    fn post_body_is_bounded() {
        let form = PostForm {
            body: "x".repeat(POST_BODY_MAX + 1),
            files: vec![],
        };
        assert!(form.validate().unwrap_err().has("body"));
        let form = PostForm {
            body: "é".repeat(POST_BODY_MAX),
            files: vec![],
        };
        assert!(form.validate().is_ok());
    }

    #[test]
    fn uploads_require_files() {
        assert!(PhotoForm::default().validate().unwrap_err().has("files"));
        let errors = VideoForm::default().validate().unwrap_err();
        assert!(errors.has("title"));
        assert!(errors.has("files"));
        assert!(ProfilePictureForm::default().validate().unwrap_err().has("photo"));
    }

    #[test]
    fn comment_is_required_and_bounded() {
        assert!(CommentForm::default().validate().unwrap_err().has("body"));
        let long = CommentForm {
            body: "x".repeat(COMMENT_MAX + 1),
        };
        assert!(long.validate().unwrap_err().has("body"));
        let ok = CommentForm { body: " hi ".into() };
        assert_eq!(ok.validate().unwrap(), "hi");
    }

    #[test]
    fn reset_password_must_repeat() {
        let form = ResetPasswordForm {
            password: "a".into(),
            repeat_password: "b".into(),
        };
        assert!(form.validate().unwrap_err().has("repeat_password"));
    }

    #[test]
    fn about_me_is_bounded() {
        let form = EditProfileForm {
            username: "alice".into(),
            about_me: "x".repeat(ABOUT_ME_MAX + 1),
        };
        assert!(form.validate().unwrap_err().has("about_me"));
    }
}
