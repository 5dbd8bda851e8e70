//! Reminder message template rendering.
//!
//! Templates use `{placeholder}` tokens. Rendering is total: a known
//! placeholder without a value becomes the empty string and an unknown
//! placeholder is left verbatim.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Regex pattern matching `{placeholder}` tokens in message templates.
pub const PLACEHOLDER_PATTERN: &str = r"\{([a-zA-Z_][a-zA-Z0-9_]*)\}";

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(PLACEHOLDER_PATTERN).expect("valid regex"));

/// Placeholder names a template may reference.
pub const KNOWN_PLACEHOLDERS: [&str; 7] = [
    "guestName",
    "eventTitle",
    "eventDate",
    "eventLocation",
    "rsvpDeadline",
    "rsvpLink",
    "organizerName",
];

/// `Saturday, June 20, 2026`
const EVENT_DATE_FORMAT: &str = "%A, %B %-d, %Y";

/// `June 1, 2026`
const DEADLINE_FORMAT: &str = "%B %-d, %Y";

// ---------------------------------------------------------------------------
// Variables
// ---------------------------------------------------------------------------

/// Values substituted into a template. Missing values render empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateVars {
    pub guest_name: Option<String>,
    pub event_title: Option<String>,
    pub event_date: Option<String>,
    pub event_location: Option<String>,
    pub rsvp_deadline: Option<String>,
    pub rsvp_link: Option<String>,
    pub organizer_name: Option<String>,
}

impl TemplateVars {
    /// Look up a placeholder. `None` means the name is not a known placeholder.
    fn lookup(&self, name: &str) -> Option<&str> {
        let value = match name {
            "guestName" => &self.guest_name,
            "eventTitle" => &self.event_title,
            "eventDate" => &self.event_date,
            "eventLocation" => &self.event_location,
            "rsvpDeadline" => &self.rsvp_deadline,
            "rsvpLink" => &self.rsvp_link,
            "organizerName" => &self.organizer_name,
            _ => return None,
        };
        Some(value.as_deref().unwrap_or(""))
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Substitute every known placeholder in `template`.
pub fn render(template: &str, vars: &TemplateVars) -> String {
    PLACEHOLDER_RE
        .replace_all(template, |caps: &Captures| match vars.lookup(&caps[1]) {
            Some(value) => value.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Placeholders in `template` that no value will ever fill.
pub fn unknown_placeholders(template: &str) -> Vec<String> {
    let mut unknown: Vec<String> = PLACEHOLDER_RE
        .captures_iter(template)
        .map(|caps| caps[1].to_string())
        .filter(|name| !KNOWN_PLACEHOLDERS.contains(&name.as_str()))
        .collect();
    unknown.sort();
    unknown.dedup();
    unknown
}

pub fn format_event_date(date: Timestamp) -> String {
    date.format(EVENT_DATE_FORMAT).to_string()
}

pub fn format_deadline(deadline: Timestamp) -> String {
    deadline.format(DEADLINE_FORMAT).to_string()
}

/// Guest-specific RSVP link.
pub fn rsvp_link(base_url: &str, event_id: DbId, guest_id: DbId) -> String {
    format!("{}/rsvp/{event_id}/{guest_id}", base_url.trim_end_matches('/'))
}
