//! LinkedIn content model types.

use coldwire_llm::LinkedInKind;
use serde::{Deserialize, Serialize};

/// Review state of a LinkedIn item. No dispatch lanes here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    /// Waiting for human review.
    #[default]
    Draft,
    /// Cleared for posting.
    Approved,
    /// Rejected by a reviewer.
    Declined,
    /// Parked.
    Archived,
}

impl ReviewStatus {
    /// Parse from database string representation.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "approved" => Self::Approved,
            "declined" => Self::Declined,
            "archived" => Self::Archived,
            _ => Self::Draft,
        }
    }

    /// Convert to database string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Approved => "approved",
            Self::Declined => "declined",
            Self::Archived => "archived",
        }
    }

    /// Whether a move from `self` to `to` is legal.
    #[must_use]
    pub const fn can_transition(self, to: Self) -> bool {
        matches!(
            (self, to),
            (Self::Draft, Self::Approved)
                | (Self::Approved, Self::Draft)
                | (Self::Approved, Self::Declined)
                | (Self::Declined, Self::Approved)
                | (Self::Draft, Self::Archived)
                | (Self::Approved, Self::Archived)
        )
    }
}

impl std::fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A generated LinkedIn post or DM.
#[derive(Debug, Clone, Serialize)]
pub struct LinkedInItem {
    /// Unique identifier.
    pub id: Option<i64>,
    /// Post or DM.
    pub kind: LinkedInKind,
    /// The generated text.
    pub content: String,
    /// Review state.
    pub status: ReviewStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        for status in [
            ReviewStatus::Draft,
            ReviewStatus::Approved,
            ReviewStatus::Declined,
            ReviewStatus::Archived,
        ] {
            assert_eq!(ReviewStatus::parse(status.as_str()), status);
        }
    }

    #[test]
    fn test_transitions() {
        use ReviewStatus::{Approved, Archived, Declined, Draft};

        assert!(Draft.can_transition(Approved));
        assert!(Approved.can_transition(Declined));
        assert!(Declined.can_transition(Approved));
        assert!(Approved.can_transition(Archived));

        assert!(!Archived.can_transition(Draft));
        assert!(!Declined.can_transition(Archived));
        assert!(!Draft.can_transition(Declined));
    }
}
