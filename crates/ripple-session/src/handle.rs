// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Cloneable handle for talking to a running session.

use std::sync::Arc;

use ripple_core::{
    ApplyReport, Cancel, Filter, QueryOptions, StoreError, StoredObject, ViewEntry, ViewHandle,
    ViewObserver, ViewSpec,
};
use ripple_feed::{FeedEvent, Key};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::debug;

use crate::driver::Command;
use crate::error::SessionError;

/// Cloneable front door to a running session.
///
/// Commands are served in the order they were sent, across all clones.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<Command>,
    ready: watch::Receiver<bool>,
}

impl SessionHandle {
    pub(crate) fn new(commands: mpsc::UnboundedSender<Command>, ready: watch::Receiver<bool>) -> Self {
        Self { commands, ready }
    }

    /// Queues one feed event. Returns as soon as it is queued.
    pub fn push(&self, event: FeedEvent) -> Result<(), SessionError> {
        self.send(Command::Push(event))
    }

    /// Registers a view with its observer.
    ///
    /// The view starts empty and sees only events queued after this call; use
    /// [`SessionHandle::seed_view`] to fill it from the current cache.
    pub async fn register_view<O>(
        &self,
        spec: ViewSpec,
        observer: O,
    ) -> Result<(ViewHandle, Cancel), SessionError>
    where
        O: ViewObserver + Send + 'static,
    {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Register {
            spec,
            observer: Box::new(observer),
            reply,
        })?;
        rx.await.map_err(|_| SessionError::Closed)
    }

    /// Feeds the current cache through one view, notifying its observer.
    pub async fn seed_view(&self, view: ViewHandle) -> Result<ApplyReport, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Seed { view, reply })?;
        Ok(rx.await.map_err(|_| SessionError::Closed)??)
    }

    /// Removes a view. `Ok(false)` if it was already gone.
    pub async fn unregister_view(&self, view: ViewHandle) -> Result<bool, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Unregister { view, reply })?;
        rx.await.map_err(|_| SessionError::Closed)
    }

    /// Point lookup.
    pub async fn get(&self, key: Key) -> Result<Option<Arc<StoredObject>>, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Get { key, reply })?;
        rx.await.map_err(|_| SessionError::Closed)
    }

    /// One-shot query against the cache as of the events queued so far.
    pub async fn query<F>(
        &self,
        filter: F,
        options: QueryOptions,
    ) -> Result<Vec<Arc<StoredObject>>, SessionError>
    where
        F: Filter + 'static,
    {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Query {
            filter: Arc::new(filter),
            options,
            reply,
        })?;
        Ok(rx.await.map_err(|_| SessionError::Closed)??)
    }

    /// Copy of a view's current rows, in view order.
    pub async fn view_entries(&self, view: ViewHandle) -> Result<Vec<ViewEntry>, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Entries { view, reply })?;
        rx.await
            .map_err(|_| SessionError::Closed)?
            .ok_or_else(|| StoreError::UnknownView(view.id()).into())
    }

    /// Resolves once end-of-snapshot has been processed since the last reset.
    pub async fn snapshot_ready(&self) -> Result<(), SessionError> {
        let mut ready = self.ready.clone();
        ready
            .wait_for(|complete| *complete)
            .await
            .map(|_| ())
            .map_err(|_| SessionError::Closed)
    }

    /// True if end-of-snapshot has been processed since the last reset.
    pub fn is_snapshot_ready(&self) -> bool {
        *self.ready.borrow()
    }

    /// Asks the driver to stop after the commands already queued.
    pub fn shutdown(&self) -> Result<(), SessionError> {
        self.send(Command::Shutdown)
    }

    /// True once the driver has stopped.
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    fn send(&self, command: Command) -> Result<(), SessionError> {
        self.commands
            .send(command)
            .map_err(|_| SessionError::Closed)
    }
}

/// Forwards every event from a transport's channel into the session until the
/// channel closes. Returns the number of events forwarded.
pub async fn pump(
    mut source: mpsc::Receiver<FeedEvent>,
    session: SessionHandle,
) -> Result<usize, SessionError> {
    let mut forwarded = 0usize;
    while let Some(event) = source.recv().await {
        session.push(event)?;
        forwarded += 1;
    }
    debug!(forwarded, "feed source closed");
    Ok(forwarded)
}
