//! Prompt construction and completion salvage.
//!
//! Models are asked for strict JSON but routinely wrap it in prose or
//! code fences. The salvage helpers here cut the first JSON value out of
//! the raw completion and fall back to using the raw text itself rather
//! than failing the whole job over formatting.

use serde::{Deserialize, Serialize};

/// Subject used when the model's answer could not be parsed.
const FALLBACK_SUBJECT: &str = "Quick question";

/// Language the email copy should be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// English.
    #[default]
    En,
    /// Dutch.
    Nl,
}

impl Language {
    /// Human-readable name, used in prompt instructions.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::En => "English",
            Self::Nl => "Dutch",
        }
    }
}

/// Inputs for drafting one cold email.
#[derive(Debug, Clone, Default)]
pub struct EmailDraftRequest {
    /// Language for the copy.
    pub language: Language,
    /// Lead name, if known.
    pub lead_name: Option<String>,
    /// Lead's company, if known.
    pub company: Option<String>,
    /// Extra context woven into the prompt.
    pub extra_context: Option<String>,
}

/// A drafted email: subject and plain-text body.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EmailDraft {
    /// Subject line.
    pub subject: String,
    /// Plain-text body.
    pub body: String,
}

/// Whether a LinkedIn batch is posts or direct messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkedInKind {
    /// Public feed post.
    Post,
    /// Direct message.
    Dm,
}

impl LinkedInKind {
    /// Parse from database string representation.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "dm" => Self::Dm,
            _ => Self::Post,
        }
    }

    /// Convert to database string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Dm => "dm",
        }
    }
}

/// Inputs for drafting a batch of LinkedIn content.
#[derive(Debug, Clone)]
pub struct LinkedInDraftRequest {
    /// Posts or DMs.
    pub kind: LinkedInKind,
    /// How many items to generate.
    pub count: u32,
    /// Tone-of-voice hint.
    pub tone: Option<String>,
}

pub(crate) fn email_system_prompt(product: &str, language: Language) -> String {
    format!(
        "You are a sales copywriter writing short, personal cold emails for {product}. \
         You write in clear, professional but friendly {}.",
        language.display_name()
    )
}

pub(crate) fn email_user_prompt(product: &str, request: &EmailDraftRequest) -> String {
    format!(
        r#"Write one email in JSON format:

{{
  "subject": "...",
  "body": "..."
}}

Context:
- Product: {product}
- Lead name: {}
- Company: {}
- Extra context: {}

Rules:
- Max 120 words in the body.
- No hard push, focus on "this might help you reduce risk / save time".
- Use a single clear call to action (reply or book a short demo).
- Write everything in {}.
"#,
        request.lead_name.as_deref().unwrap_or("unknown"),
        request.company.as_deref().unwrap_or("unknown"),
        request.extra_context.as_deref().unwrap_or(""),
        request.language.display_name(),
    )
}

pub(crate) fn linkedin_system_prompt(product: &str) -> String {
    format!("You write short, punchy LinkedIn content about {product}.")
}

pub(crate) fn linkedin_user_prompt(product: &str, request: &LinkedInDraftRequest) -> String {
    let what = match request.kind {
        LinkedInKind::Post => "LinkedIn posts",
        LinkedInKind::Dm => "LinkedIn DM messages",
    };
    let tone = request
        .tone
        .as_deref()
        .unwrap_or("approachable, professional, slightly opinionated");

    format!(
        r#"Generate {count} unique {what} as a JSON array of strings.

Example output:
[
  "First text...",
  "Second text..."
]

Context:
- Product: {product}
- Target audience: founders, agencies, small teams, consultants.
- Tone of voice: {tone}.
- CTA: soft call to action ("reply if you want a quick look", "try it out", etc.).

Post rules:
- For posts: 60-130 words per post, no hashtag spam (max 3 hashtags or none).
- No empty hype, share concrete benefits and examples.

DM rules:
- For DMs: 40-80 words, personal, no mass-spam feel.
- No hard selling, more like: "I think this could help, want me to take a look?".

Write everything in English.
"#,
        count = request.count,
    )
}

/// Best-effort parse of a completion into an [`EmailDraft`].
///
/// Takes the first `{{...}}` span and deserializes it; on any miss the raw
/// text becomes the body under a stock subject, so a sloppy completion
/// still lands in the outbox for review instead of failing the job.
pub(crate) fn salvage_email(raw: &str) -> EmailDraft {
    let parsed = extract_json_object(raw)
        .and_then(|json| serde_json::from_str::<EmailDraft>(json).ok());

    match parsed {
        Some(draft) if !draft.subject.trim().is_empty() && !draft.body.trim().is_empty() => {
            EmailDraft {
                subject: draft.subject.trim().to_string(),
                body: draft.body.trim().to_string(),
            }
        }
        Some(draft) => EmailDraft {
            subject: non_empty(&draft.subject).unwrap_or_else(|| FALLBACK_SUBJECT.to_string()),
            body: non_empty(&draft.body).unwrap_or_else(|| raw.trim().to_string()),
        },
        None => EmailDraft {
            subject: FALLBACK_SUBJECT.to_string(),
            body: raw.trim().to_string(),
        },
    }
}

/// Best-effort parse of a completion into a list of content items.
///
/// Falls back to treating the whole completion as one item.
pub(crate) fn salvage_items(raw: &str) -> Vec<String> {
    let parsed = extract_json_array(raw)
        .and_then(|json| serde_json::from_str::<Vec<serde_json::Value>>(json).ok());

    if let Some(values) = parsed {
        let items: Vec<String> = values
            .iter()
            .filter_map(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
            .collect();
        if !items.is_empty() {
            return items;
        }
    }

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        Vec::new()
    } else {
        vec![trimmed.to_string()]
    }
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// The span from the first `{` to the last `}`, if any.
fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

/// The span from the first `[` to the last `]`, if any.
fn extract_json_array(raw: &str) -> Option<&str> {
    let start = raw.find('[')?;
    let end = raw.rfind(']')?;
    (end > start).then(|| &raw[start..=end])
}
