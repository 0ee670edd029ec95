// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Driver task: owns the store and serves commands in arrival order.

use std::sync::Arc;

use ripple_app_core::SubscriptionConfig;
use ripple_core::{
    ApplyReport, Cancel, Filter, QueryOptions, SortError, Store, StoreError, StoredObject,
    ViewEntry, ViewHandle, ViewObserver, ViewSpec,
};
use ripple_feed::{FeedEvent, Key};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::error::SessionError;
use crate::handle::SessionHandle;

/// Requests served by the driver task, in arrival order.
pub(crate) enum Command {
    Push(FeedEvent),
    Register {
        spec: ViewSpec,
        observer: Box<dyn ViewObserver + Send>,
        reply: oneshot::Sender<(ViewHandle, Cancel)>,
    },
    Seed {
        view: ViewHandle,
        reply: oneshot::Sender<Result<ApplyReport, StoreError>>,
    },
    Unregister {
        view: ViewHandle,
        reply: oneshot::Sender<bool>,
    },
    Get {
        key: Key,
        reply: oneshot::Sender<Option<Arc<StoredObject>>>,
    },
    Query {
        filter: Arc<dyn Filter>,
        options: QueryOptions,
        reply: oneshot::Sender<Result<Vec<Arc<StoredObject>>, SortError>>,
    },
    Entries {
        view: ViewHandle,
        reply: oneshot::Sender<Option<Vec<ViewEntry>>>,
    },
    Shutdown,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Push(_) => "Push",
            Self::Register { .. } => "Register",
            Self::Seed { .. } => "Seed",
            Self::Unregister { .. } => "Unregister",
            Self::Get { .. } => "Get",
            Self::Query { .. } => "Query",
            Self::Entries { .. } => "Entries",
            Self::Shutdown => "Shutdown",
        };
        f.write_str(name)
    }
}

/// Entry point for starting sessions.
#[derive(Debug)]
pub struct Session;

impl Session {
    /// Validates `config`, then spawns the driver task on the current tokio
    /// runtime.
    ///
    /// Returns the handle, the driver's join handle, and the error channel on
    /// which dropped updates and per-view failures are reported. The driver
    /// keeps running after reporting an error; it stops on
    /// [`SessionHandle::shutdown`] or once every handle is dropped.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(
        config: SubscriptionConfig,
    ) -> Result<
        (
            SessionHandle,
            JoinHandle<()>,
            mpsc::UnboundedReceiver<SessionError>,
        ),
        SessionError,
    > {
        config.validate()?;
        let store = Store::new(config.resolved_identity());
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (errors_tx, errors_rx) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = watch::channel(false);
        let driver = Driver {
            store,
            ready: ready_tx,
            errors: errors_tx,
        };
        let task = tokio::spawn(driver.run(commands_rx, config));
        Ok((SessionHandle::new(commands_tx, ready_rx), task, errors_rx))
    }
}

struct Driver {
    store: Store,
    ready: watch::Sender<bool>,
    errors: mpsc::UnboundedSender<SessionError>,
}

impl Driver {
    #[instrument(
        name = "session",
        skip_all,
        fields(mode = %config.mode, identity = ?config.resolved_identity())
    )]
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        config: SubscriptionConfig,
    ) {
        info!(items = ?config.items, group = ?config.item_group, "session started");
        while let Some(command) = commands.recv().await {
            match command {
                Command::Push(event) => self.push(event),
                Command::Register {
                    spec,
                    observer,
                    reply,
                } => {
                    let (view, cancel) = self.store.register_view(spec);
                    if let Err(err) = self.store.subscribe_boxed(view, observer) {
                        warn!(%err, "observer could not be attached");
                    }
                    let _ = reply.send((view, cancel));
                }
                Command::Seed { view, reply } => {
                    let seeded = self.store.seed_view(view).map(|report| {
                        self.report(&report);
                        report
                    });
                    let _ = reply.send(seeded);
                }
                Command::Unregister { view, reply } => {
                    let _ = reply.send(self.store.unregister_view(view));
                }
                Command::Get { key, reply } => {
                    let _ = reply.send(self.store.get(&key).cloned());
                }
                Command::Query {
                    filter,
                    options,
                    reply,
                } => {
                    let _ = reply.send(self.store.query(filter.as_ref(), &options));
                }
                Command::Entries { view, reply } => {
                    let _ = reply.send(self.store.view_entries(view).map(<[ViewEntry]>::to_vec));
                }
                Command::Shutdown => break,
            }
        }
        info!(objects = self.store.len(), "session stopped");
    }

    fn push(&mut self, event: FeedEvent) {
        match self.store.apply(event) {
            Ok(report) => {
                debug!(key = ?report.key, changes = report.changes, "event applied");
                self.report(&report);
            }
            Err(err) => {
                let _ = self.errors.send(SessionError::Invalid(err));
            }
        }
        let complete = self.store.snapshot_complete();
        self.ready.send_if_modified(|ready| {
            let changed = *ready != complete;
            *ready = complete;
            changed
        });
    }

    fn report(&self, report: &ApplyReport) {
        for failure in &report.failures {
            let _ = self.errors.send(SessionError::View(failure.clone()));
        }
    }
}
