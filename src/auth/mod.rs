pub mod mailer;
pub mod reset;
pub mod session;

pub use mailer::{LogMailer, Mailer};
pub use reset::ResetTokens;
