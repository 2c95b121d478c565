//! Lead model types.

use serde::{Deserialize, Serialize};

/// Unique identifier for a lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LeadId(pub i64);

impl LeadId {
    /// Create a new lead ID.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for LeadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A prospective contact.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Lead {
    /// Unique identifier (None for unsaved leads).
    pub id: Option<LeadId>,
    /// Contact address (unique across the book).
    pub email: String,
    /// Contact name, if known.
    pub name: Option<String>,
    /// Company, if known.
    pub company: Option<String>,
}

impl Lead {
    /// Create a new lead for the given address.
    #[must_use]
    pub fn new(email: &str) -> Self {
        Self {
            id: None,
            email: email.to_lowercase(),
            name: None,
            company: None,
        }
    }
}
