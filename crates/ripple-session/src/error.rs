// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Session error type.

use ripple_app_core::ValidationError;
use ripple_core::{InvalidEvent, SortError, StoreError, ViewFailure};
use thiserror::Error;

/// Errors surfaced by a session, either to a caller or on the error channel.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    /// The subscription config was rejected before the session started.
    #[error("invalid subscription: {0}")]
    Config(#[from] ValidationError),
    /// The driver task has stopped; no further commands are accepted.
    #[error("session is closed")]
    Closed,
    /// A pushed update was dropped (error channel only).
    #[error("dropped update: {0}")]
    Invalid(#[from] InvalidEvent),
    /// One view failed while processing a pushed event (error channel only).
    #[error("view failure: {0}")]
    View(#[from] ViewFailure),
    /// A query ordering failed.
    #[error("query failed: {0}")]
    Sort(#[from] SortError),
    /// The named view is gone.
    #[error(transparent)]
    Store(#[from] StoreError),
}
