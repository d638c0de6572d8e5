//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. The reconciliation engine depends on these
//! interfaces; their implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`ICatalogProvider`] - Playlist reads and mutations against the remote catalog
//! - [`ICredentialProvider`] - Supplies a ready-to-use bearer token

pub mod catalog_provider;
pub mod credentials;

pub use catalog_provider::ICatalogProvider;
pub use credentials::ICredentialProvider;
