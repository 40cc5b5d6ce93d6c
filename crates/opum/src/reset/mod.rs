//! Password reset links for newly uploaded employees.
//!
//! The upload flow notifies through [`PasswordResetService`], which signs a
//! per-employee token, mails the link and later accepts the new password.

pub mod mailer;
pub mod password;
pub mod router;
pub mod service;
pub mod token;

pub use mailer::{MailError, MailTransport, OutboundEmail, ResetEmailTemplate, SmtpMailTransport};
pub use router::{reset_router, ResetLinkRequest};
pub use service::{
    CredentialStore, PasswordResetService, ResetError, ResetPassword, ResetPasswordToken,
};
pub use token::{ResetClaims, ResetTokenIssuer, TokenError};
