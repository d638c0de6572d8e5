//! Integration tests for batched appends

use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use plsync_core::domain::{PlaylistId, TrackId};
use plsync_spotify::playlist;
use plsync_spotify::SpotifyError;

use crate::common::{mount_append, setup_spotify_mock};

fn ids(n: usize) -> Vec<TrackId> {
    (0..n).map(|i| TrackId::new(format!("t{i}")).unwrap()).collect()
}

fn dst() -> PlaylistId {
    "dst".parse().unwrap()
}

async fn posted_bodies(server: &wiremock::MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .expect("request recording enabled")
        .iter()
        .filter(|r| r.method.as_str() == "POST")
        .map(|r| r.body_json::<Value>().unwrap())
        .collect()
}

#[tokio::test]
async fn test_append_splits_into_batches_in_order() {
    let (server, client) = setup_spotify_mock().await;
    mount_append(&server, "dst").await;

    playlist::append_items(&client, &dst(), &ids(250), 100)
        .await
        .unwrap();

    let bodies = posted_bodies(&server).await;
    let sizes: Vec<usize> = bodies
        .iter()
        .map(|b| b["uris"].as_array().unwrap().len())
        .collect();
    assert_eq!(sizes, vec![100, 100, 50]);

    assert_eq!(bodies[0]["uris"][0], "spotify:track:t0");
    assert_eq!(bodies[1]["uris"][0], "spotify:track:t100");
    assert_eq!(bodies[2]["uris"][49], "spotify:track:t249");
}

#[tokio::test]
async fn test_append_respects_smaller_batch_size() {
    let (server, client) = setup_spotify_mock().await;
    mount_append(&server, "dst").await;

    playlist::append_items(&client, &dst(), &ids(5), 2).await.unwrap();

    assert_eq!(posted_bodies(&server).await.len(), 3);
}

#[tokio::test]
async fn test_empty_append_issues_no_request() {
    let (server, client) = setup_spotify_mock().await;

    Mock::given(method("POST"))
        .and(path("/playlists/dst/tracks"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    playlist::append_items(&client, &dst(), &[], 100).await.unwrap();
}

#[tokio::test]
async fn test_failed_batch_stops_sequence_without_rollback() {
    let (server, client) = setup_spotify_mock().await;

    Mock::given(method("POST"))
        .and(path("/playlists/dst/tracks"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "snapshot_id": "s1" })))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/playlists/dst/tracks"))
        .respond_with(ResponseTemplate::new(500))
        .with_priority(5)
        .mount(&server)
        .await;

    let err = playlist::append_items(&client, &dst(), &ids(250), 100)
        .await
        .unwrap_err();

    assert!(format!("{err:#}").contains("batch 2/3"));
    assert!(matches!(
        err.downcast_ref::<SpotifyError>(),
        Some(SpotifyError::ServerError { status: 500, .. })
    ));

    // First batch landed, second failed once (POST is not retried on 5xx),
    // third never sent. Nothing was removed.
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    assert!(requests.iter().all(|r| r.method.as_str() == "POST"));
}

#[tokio::test]
async fn test_append_retries_after_429() {
    let (server, client) = setup_spotify_mock().await;

    Mock::given(method("POST"))
        .and(path("/playlists/dst/tracks"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    mount_append(&server, "dst").await;

    playlist::append_items(&client, &dst(), &ids(3), 100)
        .await
        .unwrap();

    let bodies = posted_bodies(&server).await;
    assert_eq!(bodies.len(), 2);
    assert_eq!(bodies[0], bodies[1]);
}
