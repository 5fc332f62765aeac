//! Registry of discovered hosts with per-host staleness timers.
//!
//! The registry is owned by the listener's worker task. Expiration timers live
//! in a `DelayQueue` next to the map, and the worker awaits
//! [`HostRegistry::next_expired`] in the same `select!` as the socket, so
//! packets and expirations never touch the map concurrently.

use std::collections::HashMap;
use std::future::poll_fn;
use std::net::IpAddr;
use std::time::Duration;

use tokio_util::time::delay_queue::{DelayQueue, Key};

use crate::peer::{HostSnapshot, Peer};

/// Result of applying an announcement or expiration to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    Changed,
    Unchanged,
}

impl Observation {
    pub fn is_changed(self) -> bool {
        self == Observation::Changed
    }
}

struct Entry {
    peer: Peer,
    timer: Option<Key>,
}

/// Host registry keyed by sender address.
pub struct HostRegistry {
    entries: HashMap<IpAddr, Entry>,
    timers: DelayQueue<IpAddr>,
    stale_interval: Duration,
}

impl HostRegistry {
    /// Create an empty registry.
    ///
    /// Must be called within a tokio runtime; the timer queue registers with
    /// the runtime's clock on first insert.
    pub fn new(stale_interval: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            timers: DelayQueue::new(),
            stale_interval,
        }
    }

    /// Insert a new host or rename a known one.
    pub fn observe(&mut self, address: IpAddr, name: &str) -> Observation {
        match self.entries.get_mut(&address) {
            None => {
                self.entries.insert(
                    address,
                    Entry {
                        peer: Peer::new(address, name),
                        timer: None,
                    },
                );
                Observation::Changed
            }
            Some(entry) if entry.peer.name() != name => {
                entry.peer.set_name(name.to_string());
                Observation::Changed
            }
            Some(_) => Observation::Unchanged,
        }
    }

    /// Restart the staleness timer for a host.
    ///
    /// A host has at most one pending expiration; an existing one is pushed
    /// back rather than duplicated. Unknown addresses are ignored.
    pub fn refresh(&mut self, address: IpAddr) {
        let Some(entry) = self.entries.get_mut(&address) else {
            return;
        };

        match entry.timer.clone() {
            Some(key) => self.timers.reset(&key, self.stale_interval),
            None => entry.timer = Some(self.timers.insert(address, self.stale_interval)),
        }
    }

    /// Remove a host whose timer fired.
    ///
    /// Only call this with an address returned by [`next_expired`]: the queue
    /// has already released that host's timer key.
    ///
    /// [`next_expired`]: HostRegistry::next_expired
    pub fn expire(&mut self, address: IpAddr) -> Observation {
        match self.entries.remove(&address) {
            Some(_) => Observation::Changed,
            None => Observation::Unchanged,
        }
    }

    /// Wait for the next host whose staleness interval ran out.
    ///
    /// Resolves to `None` immediately when no timer is pending.
    pub async fn next_expired(&mut self) -> Option<IpAddr> {
        poll_fn(|cx| self.timers.poll_expired(cx))
            .await
            .map(|expired| expired.into_inner())
    }

    /// Point-in-time copy of all hosts.
    pub fn snapshot(&self) -> HostSnapshot {
        HostSnapshot::from_peers(self.entries.values().map(|e| e.peer.clone()).collect())
    }

    /// Drop every host and cancel every pending timer.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.timers.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of pending expirations.
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }
}
