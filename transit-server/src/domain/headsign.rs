//! Destination headsigns.

use serde::{Deserialize, Serialize};

/// A destination headsign split into a headline and an optional "via"
/// subtitle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Headsign {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
}

impl Headsign {
    /// A headsign with only a headline.
    pub fn headline(text: impl Into<String>) -> Self {
        Headsign {
            headline: Some(text.into()),
            subtitle: None,
        }
    }

    /// Split a raw headsign on its "via" separator.
    ///
    /// The schedule data is inconsistent about capitalisation, so a
    /// lowercase " via " split is tried first and " Via " second. Both
    /// halves are trimmed; empty halves become `None`.
    pub fn split(raw: &str) -> Self {
        let parts: Vec<&str> = if raw.split(" via ").count() > 1 {
            raw.splitn(2, " via ").collect()
        } else {
            raw.splitn(2, " Via ").collect()
        };
        let clean = |s: &&str| {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        };
        Headsign {
            headline: parts.first().and_then(clean),
            subtitle: parts.get(1).and_then(clean),
        }
    }
}
