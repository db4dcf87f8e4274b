use chrono::NaiveDate;
use concert_finder::apis::spotify::SpotifyClient;
use concert_finder::apis::ticketmaster::TicketmasterClient;
use concert_finder::config::Config;
use concert_finder::{AccessToken, ConcertError, ConcertMatcher};
use serde_json::{json, Value};
use std::sync::Arc;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn artist(id: &str, name: &str) -> Value {
    json!({"id": id, "name": name, "images": [], "genres": []})
}

fn tm_event(id: &str, name: &str, venue: &str, date: &str, attraction: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "url": format!("https://www.ticketmaster.com/event/{}", id),
        "dates": {"start": {"localDate": date, "localTime": "19:30:00"}},
        "_embedded": {
            "venues": [{"name": venue, "city": {"name": "San Francisco"}}],
            "attractions": [{"name": attraction}]
        }
    })
}

async fn mount_window(server: &MockServer, range: &str, items: Value) {
    Mock::given(method("GET"))
        .and(path("/me/top/artists"))
        .and(query_param("time_range", range))
        .and(header("authorization", "Bearer user-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": items })))
        .mount(server)
        .await;
}

fn config(spotify: &MockServer, tm: &MockServer) -> Config {
    let mut config = Config::default();
    config.spotify.api_base = spotify.uri();
    config.ticketmaster.api_base = tm.uri();
    config.ticketmaster.api_key = "tm-key".into();
    config.ticketmaster.requests_per_second = 0;
    config.retry.initial_backoff_ms = 1;
    config.retry.max_backoff_ms = 2;
    config
}

fn matcher(config: &Config) -> ConcertMatcher {
    ConcertMatcher::new(
        Arc::new(SpotifyClient::new(config).unwrap()),
        Arc::new(TicketmasterClient::new(config).unwrap()),
        config,
    )
}

#[tokio::test]
async fn test_concerts_end_to_end() {
    let spotify = MockServer::start().await;
    let tm = MockServer::start().await;

    mount_window(
        &spotify,
        "short_term",
        json!([artist("a", "Alvvays"), artist("b", "Big Thief")]),
    )
    .await;
    mount_window(&spotify, "medium_term", json!([artist("b", "Big Thief")])).await;
    // long window is down for good
    Mock::given(method("GET"))
        .and(path("/me/top/artists"))
        .and(query_param("time_range", "long_term"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&spotify)
        .await;

    Mock::given(method("GET"))
        .and(path("/events.json"))
        .and(query_param("keyword", "Big Thief"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_embedded": {"events": [
                tm_event("e2", "Big Thief", "The Warfield", "2024-10-02", "Big Thief"),
                tm_event("e1", "Double Bill", "The Fillmore", "2024-09-01", "Big Thief")
            ]}
        })))
        .mount(&tm)
        .await;
    Mock::given(method("GET"))
        .and(path("/events.json"))
        .and(query_param("keyword", "Alvvays"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_embedded": {"events": [
                tm_event("e1", "Double Bill", "The Fillmore", "2024-09-01", "Alvvays"),
                {"name": "No Link", "dates": {"start": {"localDate": "2024-09-05"}}}
            ]}
        })))
        .mount(&tm)
        .await;

    let config = config(&spotify, &tm);
    let today = NaiveDate::from_ymd_opt(2024, 8, 1).unwrap();
    let result = matcher(&config)
        .build_concert_list_on(&AccessToken::new("user-token"), today)
        .await
        .unwrap();

    assert_eq!(result.artists_considered, 2);
    assert_eq!(result.failed_lookups, 0);
    let summary: Vec<_> = result
        .iter()
        .map(|e| (e.name.as_str(), e.source_artist.as_str()))
        .collect();
    // Big Thief ranks first after the merge, so it keeps the shared bill
    assert_eq!(summary, vec![("Double Bill", "Big Thief"), ("Big Thief", "Big Thief")]);
}

#[tokio::test]
async fn test_expired_token_surfaces_auth_error() {
    let spotify = MockServer::start().await;
    let tm = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/me/top/artists"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&spotify)
        .await;
    Mock::given(method("GET"))
        .and(path("/events.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&tm)
        .await;

    let config = config(&spotify, &tm);
    let err = matcher(&config)
        .build_concert_list(&AccessToken::new("stale"))
        .await
        .unwrap_err();
    assert!(matches!(err, ConcertError::Auth(_)));
}

#[tokio::test]
async fn test_catalog_outage_returns_empty_result() {
    let spotify = MockServer::start().await;
    let tm = MockServer::start().await;

    mount_window(&spotify, "short_term", json!([artist("a", "Alvvays")])).await;
    mount_window(&spotify, "medium_term", json!([])).await;
    mount_window(&spotify, "long_term", json!([])).await;
    Mock::given(method("GET"))
        .and(path("/events.json"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&tm)
        .await;

    let config = config(&spotify, &tm);
    let result = matcher(&config)
        .build_concert_list(&AccessToken::new("user-token"))
        .await
        .unwrap();
    assert!(result.is_empty());
    assert_eq!(result.failed_lookups, 1);
}
