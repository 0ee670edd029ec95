// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared test doubles and fixtures for Ripple crates.
#![forbid(unsafe_code)]
//!
//! # Modules
//!
//! - [`config`] - In-memory config store fake for testing without filesystem
//! - [`mirror`] - Replays position diffs onto a plain key list
//! - [`observers`] - Recording and failing view observers
//! - [`updates`] - Item update and feed builders

pub mod config;
pub mod mirror;
pub mod observers;
pub mod updates;

pub use config::InMemoryConfigStore;
pub use mirror::MirrorView;
pub use observers::{FailingObserver, RecordingObserver};
pub use updates::{FeedBuilder, UpdateBuilder};
