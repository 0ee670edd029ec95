// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Session driver: one [`Store`](ripple_core::Store) per subscription, owned by
//! a single tokio task.
//!
//! Every mutation and every read goes through one unbounded mpsc queue, so the
//! store sees exactly one event at a time no matter how many tasks hold a
//! [`SessionHandle`]. Observers run inside the driver task.
//!
//! ```no_run
//! # async fn demo() -> Result<(), ripple_session::SessionError> {
//! use ripple_app_core::{SubscriptionConfig, SubscriptionMode};
//! use ripple_core::{Change, MatchAll, ObserverError, ViewSpec};
//! use ripple_feed::{FeedEvent, ItemUpdate};
//! use ripple_session::Session;
//!
//! let config = SubscriptionConfig::new(SubscriptionMode::Merge)
//!     .with_items(["item1"])
//!     .with_fields(["last_price"]);
//! let (session, driver, _errors) = Session::spawn(config)?;
//!
//! let observer = |c: &Change| {
//!     tracing::info!(key = %c.key, diff = ?c.as_diff(), "view changed");
//!     Ok::<(), ObserverError>(())
//! };
//! let (_view, _cancel) = session.register_view(ViewSpec::new(MatchAll), observer).await?;
//!
//! session.push(FeedEvent::from(ItemUpdate::new(0).with("last_price", 10)))?;
//! session.push(FeedEvent::EndOfSnapshot)?;
//! session.snapshot_ready().await?;
//!
//! session.shutdown()?;
//! let _ = driver.await;
//! # Ok(())
//! # }
//! ```
#![forbid(unsafe_code)]

mod driver;
mod error;
mod handle;

pub use driver::Session;
pub use error::SessionError;
pub use handle::{pump, SessionHandle};
