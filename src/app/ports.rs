use crate::error::Result;
use crate::types::{AccessToken, Event, ProviderArtist, TimeRange};
use async_trait::async_trait;
use chrono::NaiveDate;

/// Source of a user's top artists per listening window
#[async_trait]
pub trait ListeningHistoryPort: Send + Sync {
    /// Ranked artists for one window, best first. Implementations return
    /// `Auth` when the token is rejected and `Upstream` once their own retry
    /// budget is spent.
    async fn top_artists(
        &self,
        token: &AccessToken,
        window: TimeRange,
        limit: u32,
    ) -> Result<Vec<ProviderArtist>>;
}

/// Events catalog searchable by artist and city
#[async_trait]
pub trait EventCatalogPort: Send + Sync {
    /// Events for `artist_name` in `city` dated `from` or later
    async fn find_events(
        &self,
        artist_name: &str,
        city: &str,
        from: NaiveDate,
    ) -> Result<Vec<Event>>;
}
