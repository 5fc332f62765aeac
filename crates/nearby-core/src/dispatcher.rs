//! Asynchronous delivery of discovery events to the registered listener.
//!
//! The worker posts events into an unbounded queue and never waits for the
//! listener. A separate task drains the queue in order and invokes the
//! listener callbacks there.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::trace;

use crate::peer::HostSnapshot;

/// Receives discovery notifications.
///
/// Callbacks run on the dispatcher's delivery task, never on the receive
/// loop, and must not block for long: later events queue behind them.
pub trait DiscoveryListener: Send + Sync + 'static {
    /// The set of hosts changed.
    fn on_hosts_update(&self, hosts: &HostSnapshot);

    /// Receiving a datagram failed. The loop keeps running.
    fn on_receive_failed(&self) {}

    /// The discovery socket could not be set up. It will be retried.
    fn on_setup_failed(&self, _cause: &str) {}
}

/// A discovery notification as a value.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum DiscoveryEvent {
    HostsChanged { hosts: HostSnapshot },
    ReceiveFailed,
    SetupFailed { cause: String },
}

impl DiscoveryEvent {
    /// Invoke the matching callback on `listener`.
    pub fn dispatch_to(&self, listener: &dyn DiscoveryListener) {
        match self {
            DiscoveryEvent::HostsChanged { hosts } => listener.on_hosts_update(hosts),
            DiscoveryEvent::ReceiveFailed => listener.on_receive_failed(),
            DiscoveryEvent::SetupFailed { cause } => listener.on_setup_failed(cause),
        }
    }
}

/// Forwards every callback as a [`DiscoveryEvent`] into a channel.
impl DiscoveryListener for mpsc::UnboundedSender<DiscoveryEvent> {
    fn on_hosts_update(&self, hosts: &HostSnapshot) {
        let _ = self.send(DiscoveryEvent::HostsChanged {
            hosts: hosts.clone(),
        });
    }

    fn on_receive_failed(&self) {
        let _ = self.send(DiscoveryEvent::ReceiveFailed);
    }

    fn on_setup_failed(&self, cause: &str) {
        let _ = self.send(DiscoveryEvent::SetupFailed {
            cause: cause.to_string(),
        });
    }
}

/// The currently registered listener, shared between the owning service and
/// every dispatcher it creates.
#[derive(Clone, Default)]
pub struct ListenerSlot {
    inner: Arc<Mutex<Option<Arc<dyn DiscoveryListener>>>>,
}

impl ListenerSlot {
    pub fn set(&self, listener: Option<Arc<dyn DiscoveryListener>>) {
        *self.inner.lock() = listener;
    }

    pub fn get(&self) -> Option<Arc<dyn DiscoveryListener>> {
        self.inner.lock().clone()
    }

    pub fn is_set(&self) -> bool {
        self.inner.lock().is_some()
    }
}

struct Posted {
    listener: Arc<dyn DiscoveryListener>,
    event: DiscoveryEvent,
}

/// Posts events for one discovery session.
///
/// An event goes to the listener registered when it was posted. It is dropped
/// if, by the time the delivery task reaches it, the listener slot has been
/// cleared or the dispatcher has been closed.
pub struct EventDispatcher {
    slot: ListenerSlot,
    open: Arc<AtomicBool>,
    tx: mpsc::UnboundedSender<Posted>,
}

impl EventDispatcher {
    /// Create a dispatcher and spawn its delivery task on the current runtime.
    pub fn spawn(slot: ListenerSlot) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<Posted>();
        let open = Arc::new(AtomicBool::new(true));

        let task_slot = slot.clone();
        let task_open = open.clone();
        let handle = tokio::spawn(async move {
            while let Some(posted) = rx.recv().await {
                if !task_open.load(Ordering::Acquire) || !task_slot.is_set() {
                    trace!("Dropping {:?}, listener gone", posted.event);
                    continue;
                }
                posted.event.dispatch_to(posted.listener.as_ref());
            }
        });

        (Self { slot, open, tx }, handle)
    }

    /// Replace the registered listener. Affects events posted afterwards.
    pub fn set_consumer(&self, listener: Option<Arc<dyn DiscoveryListener>>) {
        self.slot.set(listener);
    }

    pub fn deliver_hosts_changed(&self, hosts: HostSnapshot) {
        self.post(DiscoveryEvent::HostsChanged { hosts });
    }

    pub fn deliver_receive_failed(&self) {
        self.post(DiscoveryEvent::ReceiveFailed);
    }

    pub fn deliver_setup_failed(&self, cause: impl Into<String>) {
        self.post(DiscoveryEvent::SetupFailed {
            cause: cause.into(),
        });
    }

    /// Stop delivering. Events already queued are dropped.
    pub fn close(&self) {
        self.open.store(false, Ordering::Release);
    }

    fn post(&self, event: DiscoveryEvent) {
        if !self.open.load(Ordering::Acquire) {
            return;
        }
        let Some(listener) = self.slot.get() else {
            return;
        };
        // The delivery task only ends once every sender is gone.
        let _ = self.tx.send(Posted { listener, event });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peer::Peer;
    use std::net::{IpAddr, Ipv4Addr};
    use std::time::Duration;
    use tokio::time::timeout;

    fn snapshot(names: &[&str]) -> HostSnapshot {
        HostSnapshot::from_peers(
            names
                .iter()
                .enumerate()
                .map(|(i, name)| Peer::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, i as u8 + 1)), *name))
                .collect(),
        )
    }

    fn channel_listener() -> (
        Arc<dyn DiscoveryListener>,
        mpsc::UnboundedReceiver<DiscoveryEvent>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(tx), rx)
    }

    async fn next(rx: &mut mpsc::UnboundedReceiver<DiscoveryEvent>) -> Option<DiscoveryEvent> {
        timeout(Duration::from_secs(1), rx.recv()).await.ok().flatten()
    }

    #[tokio::test]
    async fn test_events_delivered_in_order() {
        let slot = ListenerSlot::default();
        let (dispatcher, _task) = EventDispatcher::spawn(slot);
        let (listener, mut rx) = channel_listener();
        dispatcher.set_consumer(Some(listener));

        dispatcher.deliver_hosts_changed(snapshot(&["a"]));
        dispatcher.deliver_receive_failed();
        dispatcher.deliver_setup_failed("bind failed");
        dispatcher.deliver_hosts_changed(snapshot(&["a", "b"]));

        match next(&mut rx).await {
            Some(DiscoveryEvent::HostsChanged { hosts }) => assert_eq!(hosts.len(), 1),
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(matches!(next(&mut rx).await, Some(DiscoveryEvent::ReceiveFailed)));
        match next(&mut rx).await {
            Some(DiscoveryEvent::SetupFailed { cause }) => assert_eq!(cause, "bind failed"),
            other => panic!("unexpected event: {:?}", other),
        }
        match next(&mut rx).await {
            Some(DiscoveryEvent::HostsChanged { hosts }) => assert_eq!(hosts.len(), 2),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_no_listener_drops_events() {
        let (dispatcher, _task) = EventDispatcher::spawn(ListenerSlot::default());
        dispatcher.deliver_receive_failed();

        // Registering afterwards does not replay the earlier event.
        let (listener, mut rx) = channel_listener();
        dispatcher.set_consumer(Some(listener));
        dispatcher.deliver_hosts_changed(snapshot(&["late"]));

        match next(&mut rx).await {
            Some(DiscoveryEvent::HostsChanged { hosts }) => {
                assert_eq!(hosts.as_slice()[0].name(), "late")
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_clearing_listener_drops_queued_events() {
        // Current-thread runtime: the delivery task cannot run until we yield.
        let (dispatcher, _task) = EventDispatcher::spawn(ListenerSlot::default());
        let (listener, mut rx) = channel_listener();
        dispatcher.set_consumer(Some(listener));

        dispatcher.deliver_hosts_changed(snapshot(&["a"]));
        dispatcher.deliver_receive_failed();
        dispatcher.set_consumer(None);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_replacing_listener_keeps_in_flight_target() {
        let (dispatcher, _task) = EventDispatcher::spawn(ListenerSlot::default());
        let (first, mut first_rx) = channel_listener();
        let (second, mut second_rx) = channel_listener();

        dispatcher.set_consumer(Some(first));
        dispatcher.deliver_receive_failed();
        dispatcher.set_consumer(Some(second));
        dispatcher.deliver_hosts_changed(snapshot(&["x"]));

        assert!(matches!(next(&mut first_rx).await, Some(DiscoveryEvent::ReceiveFailed)));
        assert!(matches!(
            next(&mut second_rx).await,
            Some(DiscoveryEvent::HostsChanged { .. })
        ));
        assert!(first_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_close_drops_queued_and_future_events() {
        let (dispatcher, _task) = EventDispatcher::spawn(ListenerSlot::default());
        let (listener, mut rx) = channel_listener();
        dispatcher.set_consumer(Some(listener));

        dispatcher.deliver_receive_failed();
        dispatcher.close();
        dispatcher.deliver_receive_failed();

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_delivery_task_ends_with_dispatcher() {
        let (dispatcher, task) = EventDispatcher::spawn(ListenerSlot::default());
        drop(dispatcher);
        assert!(timeout(Duration::from_secs(1), task).await.is_ok());
    }

    #[test]
    fn test_event_serialization() {
        let json = serde_json::to_string(&DiscoveryEvent::SetupFailed {
            cause: "port in use".to_string(),
        })
        .unwrap();
        assert_eq!(json, r#"{"event":"setupFailed","cause":"port in use"}"#);
    }
}
