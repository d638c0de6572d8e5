//! Integration tests for plsync-spotify
//!
//! Uses wiremock to simulate the Spotify Web API and verifies end-to-end
//! behavior of pagination, batched appends, name lookup, creation and the
//! client's retry policy.

mod common;

mod test_append;
mod test_items;
mod test_playlists;
