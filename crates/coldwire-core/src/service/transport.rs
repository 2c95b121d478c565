//! Outbound mail transport seam.
//!
//! The dispatch engine only ever talks to [`MailTransport`]: one bounded
//! call per message, success or a human-readable failure. The production
//! implementation rides lettre's async SMTP transport; tests substitute
//! a scripted fake.

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::account::SmtpOverride;

/// Submission port used when neither the account nor the defaults name one.
const DEFAULT_SUBMISSION_PORT: u16 = 587;

/// Errors that can occur while handing a message to the relay.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Credentials could not be resolved.
    #[error("Incomplete SMTP configuration: {0}")]
    Config(String),

    /// A sender or recipient address did not parse.
    #[error("Invalid address: {0}")]
    Address(String),

    /// The message itself could not be assembled.
    #[error("Failed to build message: {0}")]
    Build(String),

    /// Anything the SMTP conversation rejected: auth, network, recipient.
    #[error("SMTP failure: {0}")]
    Smtp(String),
}

/// One outbound message, resolved except for transport credentials.
#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    /// Recipient address.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// Plain-text body.
    pub body: String,
    /// Sending address.
    pub from_email: String,
    /// Name shown in the `From` header.
    pub display_name: Option<String>,
    /// Per-account credential overrides.
    pub smtp: SmtpOverride,
}

/// A thing that can deliver one message and report the outcome.
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Deliver `email`, once, with no internal retry.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] carrying a reason suitable for the
    /// message's `error` column; the engine does not distinguish subtypes.
    async fn send(&self, email: &OutgoingEmail) -> Result<(), TransportError>;
}

/// Process-wide SMTP defaults that account overrides fall back to.
#[derive(Debug, Clone, Default)]
pub struct SmtpDefaults {
    /// Relay hostname.
    pub host: Option<String>,
    /// Relay port.
    pub port: Option<u16>,
    /// Username for authentication.
    pub username: Option<String>,
    /// Password for authentication.
    pub password: Option<String>,
}

/// lettre-backed SMTP implementation of [`MailTransport`].
pub struct SmtpMailer {
    defaults: SmtpDefaults,
}

impl SmtpMailer {
    /// Create a mailer over the given process-wide defaults.
    #[must_use]
    pub const fn new(defaults: SmtpDefaults) -> Self {
        Self { defaults }
    }

    /// Merge account overrides over the defaults into usable settings.
    fn resolve(&self, over: &SmtpOverride) -> Result<(String, u16, Credentials), TransportError> {
        let host = over
            .host
            .clone()
            .or_else(|| self.defaults.host.clone())
            .ok_or_else(|| TransportError::Config("missing SMTP host".to_string()))?;
        let port = over
            .port
            .or(self.defaults.port)
            .unwrap_or(DEFAULT_SUBMISSION_PORT);
        let username = over
            .username
            .clone()
            .or_else(|| self.defaults.username.clone())
            .ok_or_else(|| TransportError::Config("missing SMTP username".to_string()))?;
        let password = over
            .password
            .clone()
            .or_else(|| self.defaults.password.clone())
            .ok_or_else(|| TransportError::Config("missing SMTP password".to_string()))?;

        Ok((host, port, Credentials::new(username, password)))
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), TransportError> {
        let (host, port, credentials) = self.resolve(&email.smtp)?;

        let from_address = email
            .from_email
            .parse()
            .map_err(|e| TransportError::Address(format!("{}: {e}", email.from_email)))?;
        let from = Mailbox::new(email.display_name.clone(), from_address);
        let to: Mailbox = email
            .to
            .parse()
            .map_err(|e| TransportError::Address(format!("{}: {e}", email.to)))?;

        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(email.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(email.body.clone())
            .map_err(|e| TransportError::Build(e.to_string()))?;

        // Port 465 expects implicit TLS; everything else starts plain and
        // upgrades via STARTTLS.
        let builder = if port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&host)
        }
        .map_err(|e| TransportError::Smtp(e.to_string()))?;

        let mailer = builder.port(port).credentials(credentials).build();

        mailer
            .send(message)
            .await
            .map_err(|e| TransportError::Smtp(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn defaults() -> SmtpDefaults {
        SmtpDefaults {
            host: Some("smtp.example.com".to_string()),
            port: Some(587),
            username: Some("default-user".to_string()),
            password: Some("default-pass".to_string()),
        }
    }

    #[test]
    fn test_resolve_uses_defaults_when_override_is_empty() {
        let mailer = SmtpMailer::new(defaults());
        let (host, port, _) = mailer.resolve(&SmtpOverride::default()).unwrap();
        assert_eq!(host, "smtp.example.com");
        assert_eq!(port, 587);
    }

    #[test]
    fn test_resolve_prefers_account_overrides() {
        let mailer = SmtpMailer::new(defaults());
        let over = SmtpOverride {
            host: Some("relay.other.net".to_string()),
            port: Some(465),
            username: None,
            password: None,
        };
        let (host, port, _) = mailer.resolve(&over).unwrap();
        assert_eq!(host, "relay.other.net");
        assert_eq!(port, 465);
    }

    #[test]
    fn test_resolve_missing_host_is_a_config_error() {
        let mailer = SmtpMailer::new(SmtpDefaults::default());
        let err = mailer.resolve(&SmtpOverride::default()).unwrap_err();
        assert!(matches!(err, TransportError::Config(_)));
    }

    #[test]
    fn test_resolve_falls_back_to_submission_port() {
        let mut partial = defaults();
        partial.port = None;
        let mailer = SmtpMailer::new(partial);
        let (_, port, _) = mailer.resolve(&SmtpOverride::default()).unwrap();
        assert_eq!(port, DEFAULT_SUBMISSION_PORT);
    }
}
