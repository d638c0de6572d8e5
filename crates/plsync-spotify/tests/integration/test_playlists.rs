//! Integration tests for playlist metadata, lookup by name and creation

use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use plsync_core::domain::PlaylistId;
use plsync_core::ports::ICatalogProvider;
use plsync_spotify::playlist;
use plsync_spotify::provider::SpotifyCatalogProvider;

use crate::common::{
    client_for, mount_me, mount_user_playlists, setup_provider_mock, setup_spotify_mock,
};

fn playlist_obj(id: &str, name: &str) -> serde_json::Value {
    json!({ "id": id, "name": name, "snapshot_id": format!("snap-{id}") })
}

#[tokio::test]
async fn test_get_metadata() {
    let (server, client) = setup_spotify_mock().await;

    Mock::given(method("GET"))
        .and(path("/playlists/src"))
        .and(query_param("fields", "id,name,description,snapshot_id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "src",
            "name": "Discover Weekly",
            "description": "Fresh picks",
            "snapshot_id": "abc"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let pid: PlaylistId = "src".parse().unwrap();
    let meta = playlist::get_metadata(&client, &pid).await.unwrap();

    assert_eq!(meta.id, pid);
    assert_eq!(meta.name, "Discover Weekly");
    assert_eq!(meta.description.as_deref(), Some("Fresh picks"));
    assert_eq!(meta.snapshot_id.as_deref(), Some("abc"));
}

#[tokio::test]
async fn test_find_by_name_is_case_insensitive_across_pages() {
    let (server, client) = setup_spotify_mock().await;
    mount_user_playlists(
        &server,
        vec![
            vec![playlist_obj("p1", "Road Trip"), playlist_obj("p2", "Focus")],
            vec![playlist_obj("p3", "Discover Weekly-Archive")],
        ],
    )
    .await;

    let found = playlist::find_playlist_by_name(&client, "discover weekly-archive")
        .await
        .unwrap()
        .expect("playlist on second page");

    assert_eq!(found.id.as_str(), "p3");
    assert_eq!(found.name.as_deref(), Some("Discover Weekly-Archive"));
    assert_eq!(found.snapshot_id.as_deref(), Some("snap-p3"));
}

#[tokio::test]
async fn test_find_by_name_first_match_wins() {
    let (server, client) = setup_spotify_mock().await;
    mount_user_playlists(
        &server,
        vec![vec![playlist_obj("first", "Mix"), playlist_obj("second", "MIX")]],
    )
    .await;

    let found = playlist::find_playlist_by_name(&client, "mix")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id.as_str(), "first");
}

#[tokio::test]
async fn test_find_by_name_requires_exact_match() {
    let (server, client) = setup_spotify_mock().await;
    mount_user_playlists(&server, vec![vec![playlist_obj("p1", "Mix 2024")]]).await;

    let found = playlist::find_playlist_by_name(&client, "Mix").await.unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn test_create_playlist_resolves_user_once() {
    let (server, client) = setup_spotify_mock().await;
    mount_me(&server, "alice").await;

    Mock::given(method("POST"))
        .and(path("/users/alice/playlists"))
        .and(body_json(json!({ "name": "Chill-Archive", "public": false })))
        .respond_with(ResponseTemplate::new(201).set_body_json(playlist_obj("new1", "Chill-Archive")))
        .expect(2)
        .mount(&server)
        .await;

    let created = playlist::create_playlist(&client, "Chill-Archive", false)
        .await
        .unwrap();
    assert_eq!(created.id.as_str(), "new1");
    playlist::create_playlist(&client, "Chill-Archive", false)
        .await
        .unwrap();

    let me_calls = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == "/me")
        .count();
    assert_eq!(me_calls, 1);
}

#[tokio::test]
async fn test_create_playlist_with_configured_user_skips_me() {
    let (server, _) = setup_spotify_mock().await;
    let client = client_for(&server).with_user_id("bob");

    Mock::given(method("GET"))
        .and(path("/me"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/users/bob/playlists"))
        .respond_with(ResponseTemplate::new(201).set_body_json(playlist_obj("p9", "X")))
        .expect(1)
        .mount(&server)
        .await;

    playlist::create_playlist(&client, "X", true).await.unwrap();
}

#[tokio::test]
async fn test_get_or_create_returns_existing_without_creating() {
    let (server, provider) = setup_provider_mock().await;
    mount_user_playlists(&server, vec![vec![playlist_obj("arch", "Src-Archive")]]).await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let found = provider
        .get_or_create_playlist_by_name("src-archive", false)
        .await
        .unwrap();
    assert_eq!(found.id.as_str(), "arch");
}

#[tokio::test]
async fn test_get_or_create_creates_when_absent() {
    let (server, client) = setup_spotify_mock().await;
    let provider = SpotifyCatalogProvider::new(client.with_user_id("carol"));
    mount_user_playlists(&server, vec![vec![playlist_obj("other", "Other")]]).await;

    Mock::given(method("POST"))
        .and(path("/users/carol/playlists"))
        .respond_with(ResponseTemplate::new(201).set_body_json(playlist_obj("made", "Src-Archive")))
        .expect(1)
        .mount(&server)
        .await;

    let created = provider
        .get_or_create_playlist_by_name("Src-Archive", false)
        .await
        .unwrap();
    assert_eq!(created.id.as_str(), "made");
}
