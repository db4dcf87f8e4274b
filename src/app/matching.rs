use crate::apis::spotify::SpotifyClient;
use crate::apis::ticketmaster::TicketmasterClient;
use crate::app::aggregator::TopArtistAggregator;
use crate::app::ports::{EventCatalogPort, ListeningHistoryPort};
use crate::config::{Config, MatchingConfig};
use crate::error::Result;
use crate::types::{AccessToken, Artist, Event, MatchResult};
use chrono::{Local, NaiveDate};
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Stages of one run, in order. There is no failure stage: an auth error
/// returns from wherever it occurs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Authenticated,
    ArtistsFetched,
    EventsCollected,
    Deduplicated,
    Sorted,
    Done,
}

fn enter(stage: PipelineStage) {
    debug!(stage = ?stage, "Pipeline stage");
}

/// Matches a user's top artists against the events catalog for one city
pub struct ConcertMatcher {
    aggregator: TopArtistAggregator,
    catalog: Arc<dyn EventCatalogPort>,
    city: String,
    matching: MatchingConfig,
}

impl ConcertMatcher {
    pub fn new(
        history: Arc<dyn ListeningHistoryPort>,
        catalog: Arc<dyn EventCatalogPort>,
        config: &Config,
    ) -> Self {
        Self {
            aggregator: TopArtistAggregator::new(history, config.spotify.per_window_limit),
            catalog,
            city: config.ticketmaster.city.clone(),
            matching: config.matching.clone(),
        }
    }

    /// Wires the Spotify and Ticketmaster clients
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate_for_matching()?;
        let history = Arc::new(SpotifyClient::new(config)?);
        let catalog = Arc::new(TicketmasterClient::new(config)?);
        Ok(Self::new(history, catalog, config))
    }

    pub fn city(&self) -> &str {
        &self.city
    }

    pub async fn top_artists(&self, token: &AccessToken) -> Result<Vec<Artist>> {
        self.aggregator.fetch_top_artists(token).await
    }

    /// Upcoming concerts for the user's top artists, as of today
    pub async fn build_concert_list(&self, token: &AccessToken) -> Result<MatchResult> {
        self.build_concert_list_on(token, Local::now().date_naive())
            .await
    }

    /// Same as `build_concert_list` with the query date pinned
    #[instrument(skip(self, token), fields(city = %self.city))]
    pub async fn build_concert_list_on(
        &self,
        token: &AccessToken,
        today: NaiveDate,
    ) -> Result<MatchResult> {
        let started = Instant::now();
        enter(PipelineStage::Authenticated);

        let mut artists = self.aggregator.fetch_top_artists(token).await?;
        artists.truncate(self.matching.max_artists);
        enter(PipelineStage::ArtistsFetched);

        let (events, failed_lookups) = self.collect_events(&artists, today).await;
        enter(PipelineStage::EventsCollected);

        let mut events = dedupe_events(
            events
                .into_iter()
                .filter(|e| e.date >= today)
                .collect(),
        );
        enter(PipelineStage::Deduplicated);

        sort_events(&mut events);
        enter(PipelineStage::Sorted);

        metrics::counter!("concert_finder_events_returned_total").increment(events.len() as u64);
        metrics::histogram!("concert_finder_pipeline_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        info!(
            artists = artists.len(),
            events = events.len(),
            failed_lookups,
            "Concert matching finished"
        );
        enter(PipelineStage::Done);

        Ok(MatchResult {
            query_date: today,
            city: self.city.clone(),
            artists_considered: artists.len(),
            failed_lookups,
            events,
        })
    }

    /// One catalog lookup per artist, at most `concurrency` in flight.
    /// Results come back in artist rank order whatever order they finish
    /// in; a failed lookup contributes no events.
    async fn collect_events(&self, artists: &[Artist], today: NaiveDate) -> (Vec<Event>, usize) {
        let catalog = &self.catalog;
        let city = self.city.as_str();

        let mut results: Vec<(usize, Result<Vec<Event>>)> = stream::iter(artists.iter().enumerate())
            .map(|(idx, artist)| async move {
                (idx, catalog.find_events(&artist.name, city, today).await)
            })
            .buffer_unordered(self.matching.concurrency.max(1))
            .collect()
            .await;
        results.sort_by_key(|(idx, _)| *idx);

        let mut events = Vec::new();
        let mut failed = 0;
        for (idx, result) in results {
            match result {
                Ok(found) => {
                    debug!(artist = %artists[idx].name, count = found.len(), "Catalog lookup finished");
                    events.extend(found);
                }
                Err(e) => {
                    failed += 1;
                    warn!(artist = %artists[idx].name, error = %e, "Catalog lookup failed, skipping artist");
                    metrics::counter!("concert_finder_lookup_failures_total").increment(1);
                }
            }
        }
        (events, failed)
    }
}

/// Drops later events that share (name, venue, date) with an earlier one
pub fn dedupe_events(events: Vec<Event>) -> Vec<Event> {
    let mut seen = HashSet::new();
    events
        .into_iter()
        .filter(|e| seen.insert((e.name.clone(), e.venue.clone(), e.date)))
        .collect()
}

/// Date ascending, then name ascending. Stable, so full ties keep rank order.
pub fn sort_events(events: &mut [Event]) {
    events.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.name.cmp(&b.name)));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(name: &str, venue: &str, date: (i32, u32, u32), artist: &str) -> Event {
        Event {
            id: None,
            name: name.to_string(),
            venue: venue.to_string(),
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            time: None,
            ticket_url: format!("https://tickets/{}", name),
            source_artist: artist.to_string(),
            image_url: None,
            city: None,
        }
    }

    #[test]
    fn test_dedupe_keeps_first_occurrence() {
        let events = vec![
            event("Show", "Fillmore", (2024, 8, 1), "X"),
            event("Other", "Fillmore", (2024, 8, 1), "X"),
            event("Show", "Fillmore", (2024, 8, 1), "Y"),
            event("Show", "Warfield", (2024, 8, 1), "Y"),
            event("Show", "Fillmore", (2024, 8, 2), "Y"),
        ];
        let deduped = dedupe_events(events);
        assert_eq!(deduped.len(), 4);
        assert_eq!(deduped[0].source_artist, "X");
        assert!(!deduped
            .iter()
            .skip(1)
            .any(|e| e.dedup_key() == deduped[0].dedup_key()));
    }

    #[test]
    fn test_sort_by_date_then_name() {
        let mut events = vec![
            event("Zed", "A", (2024, 9, 1), "1"),
            event("Beta", "A", (2024, 8, 1), "1"),
            event("Alpha", "B", (2024, 8, 1), "2"),
            event("Alpha", "A", (2024, 8, 1), "3"),
        ];
        sort_events(&mut events);
        let order: Vec<_> = events
            .iter()
            .map(|e| (e.name.as_str(), e.source_artist.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![("Alpha", "2"), ("Alpha", "3"), ("Beta", "1"), ("Zed", "1")]
        );
    }
}
