use std::sync::Mutex;

use crate::error::{AppError, AppResult};

/// A password reset message waiting to be delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetMail {
    pub to: String,
    pub username: String,
    pub token: String,
}

impl ResetMail {
    pub fn link(&self) -> String {
        format!("/reset_password/{}", self.token)
    }
}

pub trait Mailer: Send + Sync {
    fn send_reset(&self, mail: ResetMail) -> AppResult<()>;
}

/// Writes reset links to the log instead of sending mail.
#[derive(Debug, Default)]
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send_reset(&self, mail: ResetMail) -> AppResult<()> {
        tracing::info!(to = %mail.to, user = %mail.username, "Password reset link: {}", mail.link());
        Ok(())
    }
}

/// Keeps outgoing mail in memory.
#[derive(Debug, Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<ResetMail>>,
}

impl MemoryMailer {
    pub fn sent(&self) -> Vec<ResetMail> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }
}

impl Mailer for MemoryMailer {
    fn send_reset(&self, mail: ResetMail) -> AppResult<()> {
        self.sent
            .lock()
            .map_err(|_| AppError::Internal("mailbox poisoned".into()))?
            .push(mail);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_mailer_records_messages() {
        let mailer = MemoryMailer::default();
        mailer
            .send_reset(ResetMail {
                to: "a@x.com".into(),
                username: "alice".into(),
                token: "abc".into(),
            })
            .unwrap();
        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].link(), "/reset_password/abc");
    }
}
