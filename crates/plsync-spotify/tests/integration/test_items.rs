//! Integration tests for paginated playlist reads

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use plsync_core::domain::PlaylistId;
use plsync_spotify::playlist;
use plsync_spotify::SpotifyError;

use crate::common::{client_for, item, mount_items_pages, setup_spotify_mock, TEST_TOKEN};

fn pid(s: &str) -> PlaylistId {
    s.parse().unwrap()
}

fn track_ids(entries: &[plsync_core::domain::PlaylistEntry]) -> Vec<String> {
    entries
        .iter()
        .map(|e| e.track_id.as_ref().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_single_page_fetch() {
    let (server, client) = setup_spotify_mock().await;

    Mock::given(method("GET"))
        .and(path("/playlists/src/tracks"))
        .and(query_param("fields", "items(added_at,track(id)),next"))
        .and(query_param("limit", "100"))
        .and(header("authorization", format!("Bearer {TEST_TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                item("t1", "2024-01-01T00:00:00Z"),
                item("t2", "2024-01-02T00:00:00Z")
            ],
            "next": null
        })))
        .expect(1)
        .mount(&server)
        .await;

    let entries = playlist::fetch_items(&client, &pid("src")).await.unwrap();

    assert_eq!(track_ids(&entries), vec!["t1", "t2"]);
    assert_eq!(entries[0].playlist_id.as_str(), "src");
    assert_eq!(
        entries[1].added_at.unwrap().to_rfc3339(),
        "2024-01-02T00:00:00+00:00"
    );
}

#[tokio::test]
async fn test_pagination_returns_all_entries_in_page_order() {
    let (server, client) = setup_spotify_mock().await;

    let pages: Vec<Vec<_>> = (0..3)
        .map(|p| {
            (0..4)
                .map(|i| item(&format!("p{p}i{i}"), "2024-01-01T00:00:00Z"))
                .collect()
        })
        .collect();
    mount_items_pages(&server, "src", pages).await;

    let entries = playlist::fetch_items(&client, &pid("src")).await.unwrap();

    assert_eq!(entries.len(), 12);
    let ids = track_ids(&entries);
    assert_eq!(ids.first().map(String::as_str), Some("p0i0"));
    assert_eq!(ids[4], "p1i0");
    assert_eq!(ids.last().map(String::as_str), Some("p2i3"));
}

#[tokio::test]
async fn test_empty_playlist() {
    let (server, client) = setup_spotify_mock().await;
    mount_items_pages(&server, "empty", vec![vec![]]).await;

    let entries = playlist::fetch_items(&client, &pid("empty")).await.unwrap();
    assert!(entries.is_empty());
}

#[tokio::test]
async fn test_entries_without_track_are_kept_unidentified() {
    let (server, client) = setup_spotify_mock().await;
    mount_items_pages(
        &server,
        "src",
        vec![vec![
            item("t1", "2024-01-01T00:00:00Z"),
            json!({ "added_at": "2024-01-01T00:00:00Z", "track": null }),
        ]],
    )
    .await;

    let entries = playlist::fetch_items(&client, &pid("src")).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries[1].track_id.is_none());
}

#[tokio::test]
async fn test_mid_pagination_failure_fails_whole_fetch() {
    let (server, client) = setup_spotify_mock().await;

    Mock::given(method("GET"))
        .and(path("/playlists/src/tracks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [item("t1", "2024-01-01T00:00:00Z")],
            "next": format!("{}/playlists/src/tracks?offset=100&limit=100", server.uri())
        })))
        .with_priority(10)
        .mount(&server)
        .await;

    // Initial attempt plus two retries
    Mock::given(method("GET"))
        .and(path("/playlists/src/tracks"))
        .and(query_param("offset", "100"))
        .respond_with(ResponseTemplate::new(503))
        .with_priority(1)
        .expect(3)
        .mount(&server)
        .await;

    let err = playlist::fetch_items(&client, &pid("src")).await.unwrap_err();

    assert!(format!("{err:#}").contains("page 2"));
    assert!(matches!(
        err.downcast_ref::<SpotifyError>(),
        Some(SpotifyError::ServerError { status: 503, .. })
    ));
}

#[tokio::test]
async fn test_next_link_to_other_origin_is_not_followed() {
    let (server, client) = setup_spotify_mock().await;
    let other = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/playlists/src/tracks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [item("t1", "2024-01-01T00:00:00Z")],
            "next": format!("{}/playlists/src/tracks?offset=100&limit=100", other.uri())
        })))
        .mount(&server)
        .await;

    // The token must never reach the other host
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [], "next": null
        })))
        .expect(0)
        .mount(&other)
        .await;

    let err = playlist::fetch_items(&client, &pid("src")).await.unwrap_err();
    assert!(err.to_string().contains("origin differs"));
}

#[tokio::test]
async fn test_transient_page_failure_is_retried() {
    let (server, client) = setup_spotify_mock().await;

    Mock::given(method("GET"))
        .and(path("/playlists/src/tracks"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    mount_items_pages(&server, "src", vec![vec![item("t1", "2024-01-01T00:00:00Z")]]).await;

    let entries = playlist::fetch_items(&client, &pid("src")).await.unwrap();
    assert_eq!(track_ids(&entries), vec!["t1"]);
}

#[tokio::test]
async fn test_429_honours_retry_after() {
    let (server, client) = setup_spotify_mock().await;

    Mock::given(method("GET"))
        .and(path("/playlists/src/tracks"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    mount_items_pages(&server, "src", vec![vec![item("t9", "2024-01-01T00:00:00Z")]]).await;

    let entries = playlist::fetch_items(&client, &pid("src")).await.unwrap();
    assert_eq!(track_ids(&entries), vec!["t9"]);
}

#[tokio::test]
async fn test_429_exhausted_surfaces_too_many_requests() {
    let (server, client) = setup_spotify_mock().await;

    Mock::given(method("GET"))
        .and(path("/playlists/src/tracks"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .expect(3)
        .mount(&server)
        .await;

    let err = playlist::fetch_items(&client, &pid("src")).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SpotifyError>(),
        Some(SpotifyError::TooManyRequests { .. })
    ));
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let (server, client) = setup_spotify_mock().await;

    Mock::given(method("GET"))
        .and(path("/playlists/missing/tracks"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": { "status": 404, "message": "Invalid playlist Id" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = playlist::fetch_items(&client, &pid("missing")).await.unwrap_err();
    match err.downcast_ref::<SpotifyError>() {
        Some(SpotifyError::NotFound(msg)) => assert!(msg.contains("Invalid playlist Id")),
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unauthorized() {
    let (server, client) = setup_spotify_mock().await;

    Mock::given(method("GET"))
        .and(path("/playlists/src/tracks"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = playlist::fetch_items(&client, &pid("src")).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SpotifyError>(),
        Some(SpotifyError::Unauthorized(_))
    ));
}

#[tokio::test]
async fn test_request_timeout() {
    let (server, _) = setup_spotify_mock().await;
    let client = client_for(&server)
        .with_max_retries(0)
        .with_timeout(Duration::from_millis(100))
        .unwrap();

    Mock::given(method("GET"))
        .and(path("/playlists/slow/tracks"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "items": [], "next": null }))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let err = playlist::fetch_items(&client, &pid("slow")).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SpotifyError>(),
        Some(SpotifyError::Timeout(_))
    ));
}
