use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info, warn};

use super::mailer::{MailError, MailTransport, OutboundEmail, ResetEmailTemplate};
use super::password::{check_strength, hash_password};
use super::token::{ResetTokenIssuer, TokenError};
use crate::config::ResetConfig;
use crate::upload::repository::{Notifier, NotifyError, StoreError};

/// Account credentials backing the reset flow.
pub trait CredentialStore: Send + Sync {
    /// Per-account signing salt, `None` when the account does not exist.
    fn retrieve_salt(&self, email: &str) -> Result<Option<String>, StoreError>;
    /// Stores the new hash and must replace the account's salt, which revokes
    /// every reset token signed with the old one.
    fn update_password(&self, email: &str, password_hash: &str) -> Result<(), StoreError>;
}

/// Token presented back by the reset page.
#[derive(Debug, Clone, Deserialize)]
pub struct ResetPasswordToken {
    pub email: String,
    pub token: String,
}

/// New password submitted together with the reset token.
#[derive(Debug, Clone, Deserialize)]
pub struct ResetPassword {
    pub email: String,
    pub token: String,
    pub new_password: String,
}

/// Mails reset links, validates returned tokens and stores new passwords.
pub struct PasswordResetService<S, M> {
    store: Arc<S>,
    transport: Arc<M>,
    issuer: ResetTokenIssuer,
    template: ResetEmailTemplate,
    sender: String,
}

impl<S, M> PasswordResetService<S, M>
where
    S: CredentialStore + 'static,
    M: MailTransport + 'static,
{
    pub fn new(store: Arc<S>, transport: Arc<M>, config: &ResetConfig) -> Self {
        Self {
            store,
            transport,
            issuer: ResetTokenIssuer::new(config),
            template: ResetEmailTemplate::default(),
            sender: config.sender.clone(),
        }
    }

    pub fn with_template(mut self, template: ResetEmailTemplate) -> Self {
        self.template = template;
        self
    }

    pub fn issuer(&self) -> &ResetTokenIssuer {
        &self.issuer
    }

    /// Sends one reset email per recipient, stopping at the first failure.
    /// Returns how many emails went out.
    pub fn email_reset_links(&self, recipients: &[String]) -> Result<usize, ResetError> {
        let hours = self.issuer.ttl().num_hours();
        for recipient in recipients {
            let salt = self.salt_for(recipient)?;
            let token = self.issuer.generate(recipient, &salt)?;
            let link = self.issuer.reset_link(recipient, &token)?;

            let email = OutboundEmail {
                from: self.sender.clone(),
                to: recipient.clone(),
                subject: self.template.subject.clone(),
                body: self.template.render(&link, hours),
            };
            self.transport
                .send(&email)
                .map_err(|source| ResetError::Mail {
                    recipient: recipient.clone(),
                    source,
                })?;
        }

        info!(recipients = recipients.len(), "reset links dispatched");
        Ok(recipients.len())
    }

    /// True when the token was signed with the account's salt for this email
    /// and has not expired.
    pub fn validate_token(&self, request: &ResetPasswordToken) -> Result<bool, ResetError> {
        let salt = self.salt_for(&request.email)?;
        Ok(self
            .issuer
            .is_issued_for(&request.email, &request.token, &salt))
    }

    pub fn reset_password(&self, request: &ResetPassword) -> Result<(), ResetError> {
        let presented = ResetPasswordToken {
            email: request.email.clone(),
            token: request.token.clone(),
        };
        if !self.validate_token(&presented)? {
            warn!(email = %request.email, "password reset with invalid token");
            return Err(ResetError::InvalidToken);
        }

        check_strength(&request.new_password).map_err(ResetError::WeakPassword)?;
        let hash = hash_password(&request.new_password)
            .map_err(|err| ResetError::Hash(err.to_string()))?;
        self.store.update_password(&request.email, &hash)?;

        info!(email = %request.email, "password reset");
        Ok(())
    }

    fn salt_for(&self, email: &str) -> Result<String, ResetError> {
        match self.store.retrieve_salt(email)? {
            Some(salt) => Ok(salt),
            None => {
                debug!(%email, "reset requested for unknown account");
                Err(ResetError::UnknownAccount {
                    email: email.to_string(),
                })
            }
        }
    }
}

impl<S, M> Notifier for PasswordResetService<S, M>
where
    S: CredentialStore + 'static,
    M: MailTransport + 'static,
{
    fn send_password_reset_emails(&self, recipients: &[String]) -> Result<(), NotifyError> {
        match self.email_reset_links(recipients) {
            Ok(_) => Ok(()),
            Err(ResetError::Mail { recipient, source }) => Err(NotifyError::Delivery {
                recipient,
                reason: source.to_string(),
            }),
            Err(other) => Err(NotifyError::Transport(other.to_string())),
        }
    }
}

/// Error raised by the password reset service.
#[derive(Debug, thiserror::Error)]
pub enum ResetError {
    #[error("no account registered for {email}")]
    UnknownAccount { email: String },
    #[error("reset token is invalid or expired")]
    InvalidToken,
    #[error("{0}")]
    WeakPassword(String),
    #[error("password could not be hashed: {0}")]
    Hash(String),
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("reset email to {recipient} failed: {source}")]
    Mail {
        recipient: String,
        #[source]
        source: MailError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reset::password::verify_password;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryCredentials {
        salts: Mutex<HashMap<String, String>>,
        hashes: Mutex<HashMap<String, String>>,
    }

    impl MemoryCredentials {
        fn with_accounts(accounts: &[(&str, &str)]) -> Self {
            let salts = accounts
                .iter()
                .map(|(email, salt)| (email.to_string(), salt.to_string()))
                .collect();
            Self {
                salts: Mutex::new(salts),
                hashes: Mutex::new(HashMap::new()),
            }
        }

        fn with_account(email: &str, salt: &str) -> Self {
            Self::with_accounts(&[(email, salt)])
        }

        fn hash_for(&self, email: &str) -> Option<String> {
            self.hashes
                .lock()
                .expect("hash mutex poisoned")
                .get(email)
                .cloned()
        }
    }

    impl CredentialStore for MemoryCredentials {
        fn retrieve_salt(&self, email: &str) -> Result<Option<String>, StoreError> {
            Ok(self
                .salts
                .lock()
                .expect("salt mutex poisoned")
                .get(email)
                .cloned())
        }

        fn update_password(&self, email: &str, password_hash: &str) -> Result<(), StoreError> {
            if let Some(salt) = self.salts.lock().expect("salt mutex poisoned").get_mut(email) {
                salt.push_str("-rotated");
            }
            self.hashes
                .lock()
                .expect("hash mutex poisoned")
                .insert(email.to_string(), password_hash.to_string());
            Ok(())
        }
    }

    #[derive(Default)]
    struct CapturingTransport {
        sent: Mutex<Vec<OutboundEmail>>,
    }

    impl CapturingTransport {
        fn sent(&self) -> Vec<OutboundEmail> {
            self.sent.lock().expect("outbox mutex poisoned").clone()
        }
    }

    impl MailTransport for CapturingTransport {
        fn send(&self, email: &OutboundEmail) -> Result<(), MailError> {
            self.sent
                .lock()
                .expect("outbox mutex poisoned")
                .push(email.clone());
            Ok(())
        }
    }

    struct RejectingTransport;

    impl MailTransport for RejectingTransport {
        fn send(&self, _email: &OutboundEmail) -> Result<(), MailError> {
            Err(MailError::Build("relay refused message".to_string()))
        }
    }

    fn config() -> ResetConfig {
        ResetConfig {
            server_url: "https://opum.example.com".to_string(),
            token_ttl_hours: 24,
            sender: "opum@example.com".to_string(),
        }
    }

    fn token_from(body: &str) -> String {
        let start = body.find("token=").expect("token in link") + "token=".len();
        body[start..]
            .split_whitespace()
            .next()
            .expect("token value")
            .to_string()
    }

    #[test]
    fn emails_one_link_per_recipient() {
        let transport = Arc::new(CapturingTransport::default());
        let store = Arc::new(MemoryCredentials::with_accounts(&[
            ("jane@x.com", "salt-a"),
            ("john@x.com", "salt-b"),
        ]));
        let service = PasswordResetService::new(store, transport.clone(), &config());

        let sent = service
            .email_reset_links(&["jane@x.com".to_string(), "john@x.com".to_string()])
            .expect("links sent");

        assert_eq!(sent, 2);
        let outbox = transport.sent();
        assert_eq!(outbox.len(), 2);
        assert_eq!(outbox[0].to, "jane@x.com");
        assert_eq!(outbox[0].from, "opum@example.com");
        assert!(outbox[0].body.contains(
            "https://opum.example.com/online-pum-ui/resetPassword/resetPasswordLink?email=jane%40x.com"
        ));
        assert_eq!(outbox[1].to, "john@x.com");
    }

    #[test]
    fn unknown_recipient_stops_dispatch() {
        let store = Arc::new(MemoryCredentials::with_account("jane@x.com", "salt-a"));
        let transport = Arc::new(CapturingTransport::default());
        let service = PasswordResetService::new(store, transport.clone(), &config());

        let err = service
            .email_reset_links(&["ghost@x.com".to_string(), "jane@x.com".to_string()])
            .expect_err("unknown account");

        assert!(matches!(err, ResetError::UnknownAccount { .. }));
        assert!(transport.sent().is_empty());
    }

    #[test]
    fn emailed_token_validates_and_resets_password() {
        let store = Arc::new(MemoryCredentials::with_account("jane@x.com", "salt-a"));
        let transport = Arc::new(CapturingTransport::default());
        let service = PasswordResetService::new(store.clone(), transport.clone(), &config());

        service
            .email_reset_links(&["jane@x.com".to_string()])
            .expect("link sent");
        let token = token_from(&transport.sent()[0].body);

        let presented = ResetPasswordToken {
            email: "jane@x.com".to_string(),
            token: token.clone(),
        };
        assert!(service.validate_token(&presented).expect("validates"));

        service
            .reset_password(&ResetPassword {
                email: "jane@x.com".to_string(),
                token,
                new_password: "s3cure-passphrase".to_string(),
            })
            .expect("password reset");

        let hash = store.hash_for("jane@x.com").expect("hash stored");
        assert!(verify_password("s3cure-passphrase", &hash).expect("verify"));
    }

    #[test]
    fn reset_link_works_only_once() {
        let store = Arc::new(MemoryCredentials::with_account("jane@x.com", "salt-a"));
        let service =
            PasswordResetService::new(store.clone(), Arc::new(CapturingTransport::default()), &config());
        let token = service
            .issuer()
            .generate("jane@x.com", "salt-a")
            .expect("token");
        let request = |password: &str| ResetPassword {
            email: "jane@x.com".to_string(),
            token: token.clone(),
            new_password: password.to_string(),
        };

        service
            .reset_password(&request("first-passphrase"))
            .expect("first reset");
        let err = service
            .reset_password(&request("second-passphrase"))
            .expect_err("token already used");

        assert!(matches!(err, ResetError::InvalidToken));
        let hash = store.hash_for("jane@x.com").expect("hash stored");
        assert!(verify_password("first-passphrase", &hash).expect("verify"));
    }

    #[test]
    fn reset_with_foreign_token_is_refused() {
        let store = Arc::new(MemoryCredentials::with_account("jane@x.com", "salt-a"));
        let service =
            PasswordResetService::new(store.clone(), Arc::new(CapturingTransport::default()), &config());
        let forged = service
            .issuer()
            .generate("jane@x.com", "attacker-salt")
            .expect("token");

        let err = service
            .reset_password(&ResetPassword {
                email: "jane@x.com".to_string(),
                token: forged,
                new_password: "s3cure-passphrase".to_string(),
            })
            .expect_err("forged token");

        assert!(matches!(err, ResetError::InvalidToken));
        assert!(store.hash_for("jane@x.com").is_none());
    }

    #[test]
    fn weak_password_is_refused_after_token_check() {
        let store = Arc::new(MemoryCredentials::with_account("jane@x.com", "salt-a"));
        let service =
            PasswordResetService::new(store, Arc::new(CapturingTransport::default()), &config());
        let token = service
            .issuer()
            .generate("jane@x.com", "salt-a")
            .expect("token");

        let err = service
            .reset_password(&ResetPassword {
                email: "jane@x.com".to_string(),
                token,
                new_password: "short".to_string(),
            })
            .expect_err("weak password");

        assert!(matches!(err, ResetError::WeakPassword(_)));
    }

    #[test]
    fn notifier_maps_mail_failures_to_delivery_errors() {
        let store = Arc::new(MemoryCredentials::with_account("jane@x.com", "salt-a"));
        let service = PasswordResetService::new(store, Arc::new(RejectingTransport), &config());

        match service.send_password_reset_emails(&["jane@x.com".to_string()]) {
            Err(NotifyError::Delivery { recipient, reason }) => {
                assert_eq!(recipient, "jane@x.com");
                assert!(reason.contains("relay refused"));
            }
            other => panic!("expected delivery error, got {other:?}"),
        }
    }
}
