// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared application services for Ripple tools: the config storage port and
//! the subscription configuration it persists.
//! Keeps runtime adapters (session driver, CLI) thin.

pub mod config;
pub mod subscription;

pub use subscription::{
    BufferSize, MaxFrequency, SnapshotRequest, SubscriptionConfig, SubscriptionMode,
    UnknownMode, ValidationError,
};
