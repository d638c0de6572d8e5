//! Shared test helpers for Spotify Web API integration tests
//!
//! Provides wiremock-based mock server setup. Each helper mounts the
//! endpoints a test needs and returns a client pointing at the mock server.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use plsync_spotify::auth::StaticTokenProvider;
use plsync_spotify::client::SpotifyClient;
use plsync_spotify::provider::SpotifyCatalogProvider;

pub const TEST_TOKEN: &str = "test-access-token";

/// Starts a mock server and returns a client with fast retries against it.
pub async fn setup_spotify_mock() -> (MockServer, SpotifyClient) {
    let server = MockServer::start().await;
    let client = client_for(&server);
    (server, client)
}

/// Client with two retries and a 1 ms backoff, so failure tests stay fast.
pub fn client_for(server: &MockServer) -> SpotifyClient {
    SpotifyClient::with_base_url(Arc::new(StaticTokenProvider::new(TEST_TOKEN)), server.uri())
        .expect("valid mock server URL")
        .with_max_retries(2)
        .with_retry_backoff(Duration::from_millis(1))
}

#[allow(dead_code)]
pub async fn setup_provider_mock() -> (MockServer, SpotifyCatalogProvider) {
    let (server, client) = setup_spotify_mock().await;
    (server, SpotifyCatalogProvider::new(client))
}

/// JSON for one playlist item
pub fn item(track_id: &str, added_at: &str) -> Value {
    json!({ "added_at": added_at, "track": { "id": track_id } })
}

/// Serves `pages` of items for `playlist`.
///
/// The first page answers the plain item URL; page `n` answers
/// `?offset=<n*100>`. Every page except the last links to the next one.
pub async fn mount_items_pages(server: &MockServer, playlist: &str, pages: Vec<Vec<Value>>) {
    let items_path = format!("/playlists/{playlist}/tracks");
    let count = pages.len();

    for (n, items) in pages.into_iter().enumerate() {
        let next = if n + 1 < count {
            Value::String(format!(
                "{}{}?offset={}&limit=100",
                server.uri(),
                items_path,
                (n + 1) * 100
            ))
        } else {
            Value::Null
        };
        let body = json!({ "items": items, "next": next });

        let builder = Mock::given(method("GET")).and(path(items_path.as_str()));
        // The first page has the lowest precedence so it does not shadow the
        // offset-specific pages.
        let (builder, priority) = if n == 0 {
            (builder, 10)
        } else {
            (builder.and(query_param("offset", (n * 100).to_string())), 1)
        };

        builder
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .with_priority(priority)
            .mount(server)
            .await;
    }
}

/// Accepts appends to `playlist` with 201 Created.
#[allow(dead_code)]
pub async fn mount_append(server: &MockServer, playlist: &str) {
    Mock::given(method("POST"))
        .and(path(format!("/playlists/{playlist}/tracks")))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "snapshot_id": "snap" })))
        .mount(server)
        .await;
}

/// Serves `GET /me` for `user_id`.
#[allow(dead_code)]
pub async fn mount_me(server: &MockServer, user_id: &str) {
    Mock::given(method("GET"))
        .and(path("/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": user_id,
            "display_name": "Test User"
        })))
        .mount(server)
        .await;
}

/// Serves the user's playlist listing split across `pages`.
#[allow(dead_code)]
pub async fn mount_user_playlists(server: &MockServer, pages: Vec<Vec<Value>>) {
    let count = pages.len();
    for (n, items) in pages.into_iter().enumerate() {
        let next = if n + 1 < count {
            Value::String(format!(
                "{}/me/playlists?offset={}&limit=50",
                server.uri(),
                (n + 1) * 50
            ))
        } else {
            Value::Null
        };
        let body = json!({ "items": items, "next": next });

        let builder = Mock::given(method("GET")).and(path("/me/playlists"));
        let (builder, priority) = if n == 0 {
            (builder, 10)
        } else {
            (builder.and(query_param("offset", (n * 50).to_string())), 1)
        };

        builder
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .with_priority(priority)
            .mount(server)
            .await;
    }
}
