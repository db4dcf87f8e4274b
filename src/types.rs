use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bearer token for the listening-history provider. Opaque to this crate;
/// refreshing it is the caller's business.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(****)")
    }
}

/// Listening-history window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeRange {
    Short,
    Medium,
    Long,
}

impl TimeRange {
    /// Query order; also the first-seen tie-break order when merging
    pub const ALL: [TimeRange; 3] = [TimeRange::Short, TimeRange::Medium, TimeRange::Long];

    pub fn as_param(&self) -> &'static str {
        match self {
            TimeRange::Short => "short_term",
            TimeRange::Medium => "medium_term",
            TimeRange::Long => "long_term",
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_param())
    }
}

/// One artist as returned by the provider for a single window, in rank order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderArtist {
    pub id: String,
    pub name: String,
    pub image_url: Option<String>,
    pub genres: Vec<String>,
}

impl ProviderArtist {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            image_url: None,
            genres: Vec::new(),
        }
    }
}

/// A user's artist after merging all windows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artist {
    pub name: String,
    pub provider_id: String,
    /// Best 1-based rank reached in any window
    pub rank_score: u32,
    /// Number of windows the artist showed up in
    pub appearances: u32,
    pub image_url: Option<String>,
    pub genres: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Catalog identifier, when the catalog supplied one
    pub id: Option<String>,
    pub name: String,
    pub venue: String,
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    pub ticket_url: String,
    /// Artist whose query surfaced this event
    pub source_artist: String,
    pub image_url: Option<String>,
    pub city: Option<String>,
}

impl Event {
    /// Two events with the same key are the same performance
    pub fn dedup_key(&self) -> (&str, &str, NaiveDate) {
        (&self.name, &self.venue, self.date)
    }

    /// "Aug 01, 2024" or "Aug 01, 2024 at 08:00 PM"
    pub fn display_date(&self) -> String {
        let date = self.date.format("%b %d, %Y").to_string();
        match self.time {
            Some(time) => format!("{} at {}", date, time.format("%I:%M %p")),
            None => date,
        }
    }
}

/// Concerts found in one pipeline run, ordered by date then name
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub query_date: NaiveDate,
    pub city: String,
    pub artists_considered: usize,
    pub failed_lookups: usize,
    pub events: Vec<Event>,
}

impl MatchResult {
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Event> {
        self.events.iter()
    }

    pub fn into_events(self) -> Vec<Event> {
        self.events
    }
}

impl<'a> IntoIterator for &'a MatchResult {
    type Item = &'a Event;
    type IntoIter = std::slice::Iter<'a, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_token_debug_is_redacted() {
        let token = AccessToken::new("secret-token");
        assert_eq!(format!("{:?}", token), "AccessToken(****)");
        assert_eq!(token.as_str(), "secret-token");
    }

    #[test]
    fn test_time_range_params() {
        let params: Vec<_> = TimeRange::ALL.iter().map(|r| r.as_param()).collect();
        assert_eq!(params, vec!["short_term", "medium_term", "long_term"]);
    }

    #[test]
    fn test_display_date_with_and_without_time() {
        let mut event = Event {
            id: None,
            name: "Show".into(),
            venue: "Fillmore".into(),
            date: NaiveDate::from_ymd_opt(2024, 8, 1).unwrap(),
            time: None,
            ticket_url: "https://example.com".into(),
            source_artist: "X".into(),
            image_url: None,
            city: None,
        };
        assert_eq!(event.display_date(), "Aug 01, 2024");

        event.time = NaiveTime::from_hms_opt(20, 0, 0);
        assert_eq!(event.display_date(), "Aug 01, 2024 at 08:00 PM");
    }
}
