//! plsync Core - Domain logic for playlist reconciliation
//!
//! This crate contains the pieces every other plsync crate builds on:
//! - **Domain types** - `TrackId`, `PlaylistId`, `PlaylistEntry`, `PlaylistRef`, `Action`
//! - **Identity mapping** - turning fetched playlist entries into comparable sets
//! - **Action files** - loading and validating the declarative action list
//! - **Port definitions** - the `ICatalogProvider` trait implemented by catalog adapters
//! - **Configuration** - the YAML configuration file
//!
//! # Architecture
//!
//! The domain module is pure and has no I/O. Ports define the trait
//! interfaces that adapter crates (`plsync-spotify`) implement, and the
//! engine crate (`plsync-engine`) orchestrates domain logic through them.

pub mod action_file;
pub mod config;
pub mod domain;
pub mod mapper;
pub mod ports;
