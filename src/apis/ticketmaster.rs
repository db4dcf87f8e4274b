use crate::apis::status_error;
use crate::app::ports::EventCatalogPort;
use crate::config::{Config, TicketmasterConfig};
use crate::constants::{MIN_EVENT_IMAGE_WIDTH, TICKETMASTER_SERVICE, UNKNOWN_VENUE};
use crate::error::{ConcertError, Result};
use crate::rate_limiter::RateLimiter;
use crate::retry::{with_retry, RetryPolicy};
use crate::types::Event;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};

#[derive(Debug, Deserialize)]
struct EventsResponse {
    #[serde(rename = "_embedded")]
    embedded: Option<EmbeddedEvents>,
}

#[derive(Debug, Deserialize)]
struct EmbeddedEvents {
    #[serde(default)]
    events: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    id: Option<String>,
    name: Option<String>,
    url: Option<String>,
    dates: Option<RawDates>,
    #[serde(default)]
    images: Vec<RawImage>,
    #[serde(rename = "_embedded")]
    embedded: Option<RawEventEmbedded>,
}

#[derive(Debug, Deserialize)]
struct RawDates {
    start: Option<RawStart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStart {
    local_date: Option<String>,
    local_time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawImage {
    url: String,
    #[serde(default)]
    width: u32,
}

#[derive(Debug, Default, Deserialize)]
struct RawEventEmbedded {
    #[serde(default)]
    venues: Vec<RawVenue>,
    #[serde(default)]
    attractions: Vec<RawAttraction>,
}

#[derive(Debug, Deserialize)]
struct RawVenue {
    name: Option<String>,
    city: Option<RawCity>,
}

#[derive(Debug, Deserialize)]
struct RawCity {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawAttraction {
    name: Option<String>,
}

/// Filters applied while turning catalog records into events
#[derive(Debug, Clone)]
pub struct EventFilter<'a> {
    pub artist_name: &'a str,
    pub city: &'a str,
    pub from: NaiveDate,
    pub strict_artist_match: bool,
}

fn missing(field: &str) -> ConcertError {
    ConcertError::Validation(format!("{} not found", field))
}

/// Exact or substring match, ignoring case
fn attraction_matches(attraction: &str, artist: &str) -> bool {
    let attraction = attraction.trim().to_lowercase();
    let artist = artist.trim().to_lowercase();
    attraction == artist || attraction.contains(&artist)
}

/// Maps one catalog record. Records that cannot be displayed, or fall
/// outside the requested city, date range or artist, are rejected with a
/// `Validation` error naming the reason.
pub fn map_event(record: Value, filter: &EventFilter<'_>) -> Result<Event> {
    let raw: RawEvent = serde_json::from_value(record)
        .map_err(|e| ConcertError::Validation(format!("unreadable event record: {}", e)))?;

    let name = raw
        .name
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| missing("name"))?;
    let ticket_url = raw
        .url
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| missing("url"))?;

    let start = raw.dates.and_then(|d| d.start);
    let date_str = start
        .as_ref()
        .and_then(|s| s.local_date.as_deref())
        .ok_or_else(|| missing("dates.start.localDate"))?;
    let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
        ConcertError::Validation(format!("Failed to parse localDate '{}': {}", date_str, e))
    })?;
    if date < filter.from {
        return Err(ConcertError::Validation(format!(
            "event date {} is before {}",
            date, filter.from
        )));
    }
    let time = start
        .as_ref()
        .and_then(|s| s.local_time.as_deref())
        .and_then(|t| NaiveTime::parse_from_str(t, "%H:%M:%S").ok());

    let embedded = raw.embedded.unwrap_or_default();
    let venue = embedded.venues.first();
    let venue_name = venue
        .and_then(|v| v.name.clone())
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN_VENUE.to_string());
    let venue_city = venue
        .and_then(|v| v.city.as_ref())
        .and_then(|c| c.name.clone())
        .filter(|s| !s.trim().is_empty());

    if let Some(ref c) = venue_city {
        if !c.trim().eq_ignore_ascii_case(filter.city.trim()) {
            return Err(ConcertError::Validation(format!(
                "venue city '{}' is not '{}'",
                c, filter.city
            )));
        }
    }

    if filter.strict_artist_match && !embedded.attractions.is_empty() {
        let matched = embedded
            .attractions
            .iter()
            .filter_map(|a| a.name.as_deref())
            .any(|a| attraction_matches(a, filter.artist_name));
        if !matched {
            return Err(ConcertError::Validation(format!(
                "no attraction matches '{}'",
                filter.artist_name
            )));
        }
    }

    let image_url = raw
        .images
        .into_iter()
        .find(|img| img.width >= MIN_EVENT_IMAGE_WIDTH)
        .map(|img| img.url);

    Ok(Event {
        id: raw.id,
        name,
        venue: venue_name,
        date,
        time,
        ticket_url,
        source_artist: filter.artist_name.to_string(),
        image_url,
        city: venue_city,
    })
}

/// Ticketmaster Discovery API client, one bounded query per artist
pub struct TicketmasterClient {
    client: reqwest::Client,
    config: TicketmasterConfig,
    retry: RetryPolicy,
    limiter: RateLimiter,
}

impl TicketmasterClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ConcertError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            config: config.ticketmaster.clone(),
            retry: RetryPolicy::new(&config.retry, config.ticketmaster.timeout()),
            limiter: RateLimiter::new(config.ticketmaster.requests_per_second),
        })
    }

    async fn request_events(&self, artist_name: &str, city: &str, from: NaiveDate) -> Result<Vec<Value>> {
        self.limiter.acquire().await;

        let url = format!("{}/events.json", self.config.api_base.trim_end_matches('/'));
        let start = format!("{}T00:00:00Z", from.format("%Y-%m-%d"));
        let size = self.config.page_size.to_string();
        let mut params = vec![
            ("apikey", self.config.api_key.as_str()),
            ("keyword", artist_name),
            ("city", city),
            ("classificationName", "Music"),
            ("size", size.as_str()),
            ("sort", "date,asc"),
            ("startDateTime", start.as_str()),
        ];
        if let Some(ref cc) = self.config.country_code {
            params.push(("countryCode", cc.as_str()));
        }

        let resp = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|e| ConcertError::from_reqwest(TICKETMASTER_SERVICE, e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(status_error(TICKETMASTER_SERVICE, status, &body));
        }

        let body: EventsResponse = resp.json().await.map_err(|e| {
            ConcertError::upstream(TICKETMASTER_SERVICE, format!("events parse failed: {}", e))
        })?;
        Ok(body.embedded.map(|e| e.events).unwrap_or_default())
    }
}

#[async_trait]
impl EventCatalogPort for TicketmasterClient {
    #[instrument(skip(self))]
    async fn find_events(&self, artist_name: &str, city: &str, from: NaiveDate) -> Result<Vec<Event>> {
        if artist_name.trim().is_empty() {
            return Err(ConcertError::Validation("artist name is empty".into()));
        }

        let records = with_retry(TICKETMASTER_SERVICE, "find_events", &self.retry, || {
            self.request_events(artist_name, city, from)
        })
        .await?;

        let filter = EventFilter {
            artist_name,
            city,
            from,
            strict_artist_match: self.config.strict_artist_match,
        };
        let total = records.len();
        let events: Vec<Event> = records
            .into_iter()
            .filter_map(|record| match map_event(record, &filter) {
                Ok(event) => Some(event),
                Err(e) => {
                    debug!("Dropping event record: {}", e);
                    None
                }
            })
            .collect();

        debug!("Kept {} of {} events", events.len(), total);
        Ok(events)
    }
}
