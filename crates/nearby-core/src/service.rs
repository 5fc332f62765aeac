//! Start/stop API object for a discovery session.
//!
//! The embedding application owns a [`DiscoveryService`], registers a
//! [`DiscoveryListener`], and forwards connectivity changes through
//! [`DiscoveryService::on_network_changed`].

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::DiscoveryConfig;
use crate::dispatcher::{DiscoveryListener, EventDispatcher, ListenerSlot};
use crate::error::{DiscoveryError, Result};
use crate::listener::{broadcast_binder, BroadcastListener, Command, SocketBinder};
use crate::local_addrs::LocalAddressSet;
use crate::peer::HostSnapshot;

struct Session {
    commands: mpsc::Sender<Command>,
    dispatcher: Arc<EventDispatcher>,
    worker: JoinHandle<()>,
    /// Ends once every handle to the dispatcher is dropped.
    delivery: JoinHandle<()>,
}

/// Discovers peers announcing themselves by UDP broadcast.
pub struct DiscoveryService {
    config: DiscoveryConfig,
    local_addrs: LocalAddressSet,
    listener: ListenerSlot,
    binder: fn() -> SocketBinder,
    session: Option<Session>,
}

impl DiscoveryService {
    /// Create a service that filters against the system's interface addresses.
    pub fn new(config: DiscoveryConfig) -> Self {
        Self::with_local_addrs(config, LocalAddressSet::system())
    }

    /// Create a service with a caller-supplied local address set.
    pub fn with_local_addrs(config: DiscoveryConfig, local_addrs: LocalAddressSet) -> Self {
        Self {
            config,
            local_addrs,
            listener: ListenerSlot::default(),
            binder: broadcast_binder,
            session: None,
        }
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    pub fn local_addrs(&self) -> &LocalAddressSet {
        &self.local_addrs
    }

    /// Register or clear the listener. Only events emitted afterwards are
    /// affected; events still queued for a cleared listener are dropped.
    pub fn set_listener(&self, listener: Option<Arc<dyn DiscoveryListener>>) {
        self.listener.set(listener);
    }

    /// Re-read the local addresses after a connectivity change.
    ///
    /// Runs synchronously, so the next datagram is filtered against the new set.
    pub fn on_network_changed(&self) {
        self.local_addrs.refresh();
    }

    pub fn is_running(&self) -> bool {
        self.session.is_some()
    }

    /// Start listening. Must be called from within a tokio runtime.
    ///
    /// With `self_inclusive`, announcements from this host's own addresses are
    /// accepted instead of filtered.
    pub fn start(&mut self, self_inclusive: bool) -> Result<()> {
        if self.session.is_some() {
            return Err(DiscoveryError::AlreadyRunning);
        }
        self.config.validate()?;

        let (dispatcher, delivery) = EventDispatcher::spawn(self.listener.clone());
        let dispatcher = Arc::new(dispatcher);
        let (commands, command_rx) = mpsc::channel(16);

        let listener = BroadcastListener::new(
            self.config.clone(),
            self_inclusive,
            self.local_addrs.clone(),
            dispatcher.clone(),
            (self.binder)(),
        );
        let worker = tokio::spawn(listener.run(command_rx));

        info!(port = self.config.port, "Discovery started");
        self.session = Some(Session {
            commands,
            dispatcher,
            worker,
            delivery,
        });
        Ok(())
    }

    /// Current hosts as seen by the running session.
    pub async fn hosts(&self) -> Result<HostSnapshot> {
        let session = self.session.as_ref().ok_or(DiscoveryError::NotRunning)?;

        let (reply, rx) = oneshot::channel();
        session
            .commands
            .send(Command::Snapshot(reply))
            .await
            .map_err(|_| DiscoveryError::NotRunning)?;
        rx.await.map_err(|_| DiscoveryError::NotRunning)
    }

    /// Stop listening, release the socket and forget all hosts.
    ///
    /// Nothing is delivered to the listener once this returns, including
    /// events for datagrams that raced with the shutdown. A callback already
    /// running when `stop` is called has finished by the time it returns.
    pub async fn stop(&mut self) -> Result<()> {
        let Session {
            commands,
            dispatcher,
            worker,
            delivery,
        } = self.session.take().ok_or(DiscoveryError::NotRunning)?;

        dispatcher.close();
        let _ = commands.send(Command::Stop).await;
        if let Err(e) = worker.await {
            warn!("Discovery worker ended abnormally: {}", e);
        }

        drop(dispatcher);
        if let Err(e) = delivery.await {
            warn!("Event delivery ended abnormally: {}", e);
        }

        info!(port = self.config.port, "Discovery stopped");
        Ok(())
    }
}

impl Drop for DiscoveryService {
    fn drop(&mut self) {
        // The worker exits on its own once the command sender is gone.
        if let Some(session) = &self.session {
            session.dispatcher.close();
        }
    }
}

#[cfg(test)]
impl DiscoveryService {
    pub(crate) fn set_binder(&mut self, binder: fn() -> SocketBinder) {
        self.binder = binder;
    }
}
