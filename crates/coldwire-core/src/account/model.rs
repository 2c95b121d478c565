//! Sender account model types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a sender account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(pub i64);

impl AccountId {
    /// Create a new account ID.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-account SMTP credential overrides.
///
/// Every field is optional; anything left unset falls back to the
/// process-wide SMTP defaults at send time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SmtpOverride {
    /// Server hostname.
    pub host: Option<String>,
    /// Server port.
    pub port: Option<u16>,
    /// Username for authentication.
    pub username: Option<String>,
    /// Password for authentication. Accepted on writes, never echoed back
    /// in serialized form.
    #[serde(skip_serializing)]
    pub password: Option<String>,
}

impl SmtpOverride {
    /// Whether no field is overridden.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.host.is_none()
            && self.port.is_none()
            && self.username.is_none()
            && self.password.is_none()
    }
}

/// A mailbox identity that coldwire may send outreach from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SenderAccount {
    /// Unique identifier (None for unsaved accounts).
    pub id: Option<AccountId>,
    /// Sending address.
    pub email: String,
    /// Name shown in the `From` header.
    pub display_name: Option<String>,
    /// Only active accounts participate in dispatch.
    pub is_active: bool,
    /// First moment of real sending traffic; anchors the warmup ramp.
    ///
    /// `None` until the account's first dispatch run with queued work.
    /// Once set it is never moved.
    pub warmup_start_date: Option<DateTime<Utc>>,
    /// Daily cap once warmed up. Defaults to 50 when unset.
    pub max_per_day: Option<u32>,
    /// SMTP credential overrides for this mailbox.
    pub smtp: SmtpOverride,
}

impl SenderAccount {
    /// Create a new active, not-yet-warming account for the given address.
    #[must_use]
    pub fn new(email: &str) -> Self {
        Self {
            id: None,
            email: email.to_string(),
            display_name: None,
            is_active: true,
            warmup_start_date: None,
            max_per_day: None,
            smtp: SmtpOverride::default(),
        }
    }

    /// Set the display name.
    #[must_use]
    pub fn with_display_name(mut self, name: &str) -> Self {
        self.display_name = Some(name.to_string());
        self
    }

    /// Set the daily cap.
    #[must_use]
    pub const fn with_max_per_day(mut self, max: u32) -> Self {
        self.max_per_day = Some(max);
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn account_id_display() {
        assert_eq!(format!("{}", AccountId::new(7)), "7");
    }

    #[test]
    fn new_account_is_active_without_warmup() {
        let account = SenderAccount::new("outreach@example.com");
        assert!(account.is_active);
        assert!(account.id.is_none());
        assert!(account.warmup_start_date.is_none());
        assert!(account.max_per_day.is_none());
        assert!(account.smtp.is_empty());
    }

    #[test]
    fn builder_helpers() {
        let account = SenderAccount::new("outreach@example.com")
            .with_display_name("Sam")
            .with_max_per_day(80);
        assert_eq!(account.display_name.as_deref(), Some("Sam"));
        assert_eq!(account.max_per_day, Some(80));
    }

    #[test]
    fn smtp_override_is_empty() {
        let mut smtp = SmtpOverride::default();
        assert!(smtp.is_empty());
        smtp.port = Some(465);
        assert!(!smtp.is_empty());
    }
}
