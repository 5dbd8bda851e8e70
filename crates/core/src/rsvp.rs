//! Guest RSVP status.
//!
//! Stored as lowercase text in `guests.rsvp_status`; the values here must
//! match the column's CHECK constraint.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Where a guest stands with respect to the invitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RsvpStatus {
    NotInvited,
    Pending,
    Accepted,
    Declined,
    NoResponse,
}

impl RsvpStatus {
    pub const ALL: [RsvpStatus; 5] = [
        RsvpStatus::NotInvited,
        RsvpStatus::Pending,
        RsvpStatus::Accepted,
        RsvpStatus::Declined,
        RsvpStatus::NoResponse,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RsvpStatus::NotInvited => "not_invited",
            RsvpStatus::Pending => "pending",
            RsvpStatus::Accepted => "accepted",
            RsvpStatus::Declined => "declined",
            RsvpStatus::NoResponse => "no_response",
        }
    }

    /// Guests who answered are never reminded again for that event.
    pub fn is_terminal(self) -> bool {
        matches!(self, RsvpStatus::Accepted | RsvpStatus::Declined)
    }
}

impl fmt::Display for RsvpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RsvpStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RsvpStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("Unknown RSVP status: {s}")))
    }
}

impl TryFrom<String> for RsvpStatus {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_accepted_and_declined_are_terminal() {
        let terminal: Vec<_> = RsvpStatus::ALL
            .into_iter()
            .filter(|s| s.is_terminal())
            .collect();
        assert_eq!(terminal, vec![RsvpStatus::Accepted, RsvpStatus::Declined]);
    }

    #[test]
    fn parses_database_values() {
        for status in RsvpStatus::ALL {
            assert_eq!(status.as_str().parse::<RsvpStatus>().unwrap(), status);
        }
    }

    #[test]
    fn rejects_unknown_value() {
        let err = "maybe".parse::<RsvpStatus>().unwrap_err();
        assert!(err.to_string().contains("Unknown RSVP status: maybe"));
    }

    #[test]
    fn display_matches_column_value() {
        assert_eq!(RsvpStatus::NoResponse.to_string(), "no_response");
        assert_eq!(RsvpStatus::NotInvited.to_string(), "not_invited");
    }
}
