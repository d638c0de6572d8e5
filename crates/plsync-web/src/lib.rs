//! plsync Web - HTTP surface over the action file
//!
//! Provides:
//! - `ActionStore`: serialized read-modify-write access to the action file
//! - `ActionsServer`: HTTP/1 server exposing list, add, replace and validate
//!
//! | Route | Result |
//! |---|---|
//! | `GET /actions` | the action document |
//! | `POST /actions` | append a record: `201`, or `400` if the document no longer validates |
//! | `PUT /actions/{idx}` | replace a record: `200`, `404` out of range, `400` invalid |
//! | `GET /validate` | `{"code": 0 or 1, "errors": [...]}` |

pub mod server;
pub mod store;

pub use server::{handle_request, ActionsServer};
pub use store::{ActionStore, StoreError};
