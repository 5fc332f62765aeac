//! Peer model and announcement parsing.

use std::hash::{Hash, Hasher};
use std::net::IpAddr;
use std::sync::Arc;

use serde::Serialize;

/// A device discovered on the local network.
///
/// Identity is the address alone: two peers with the same address are equal
/// whatever names they advertise.
#[derive(Debug, Clone, Serialize)]
pub struct Peer {
    address: IpAddr,
    name: String,
}

impl Peer {
    pub fn new(address: IpAddr, name: impl Into<String>) -> Self {
        Self {
            address,
            name: name.into(),
        }
    }

    pub fn address(&self) -> IpAddr {
        self.address
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }
}

impl PartialEq for Peer {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
    }
}

impl Eq for Peer {}

impl Hash for Peer {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address.hash(state);
    }
}

/// A single received datagram interpreted as (sender, advertised name).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    pub sender: IpAddr,
    pub name: String,
}

/// Parse a datagram payload into an announcement.
///
/// The payload is decoded as lossy UTF-8 and trimmed of surrounding
/// whitespace and control characters, so NUL padded names decode cleanly.
pub fn parse_announcement(data: &[u8], sender: IpAddr) -> Announcement {
    let text = String::from_utf8_lossy(data);
    let name = text
        .trim_matches(|c: char| c.is_whitespace() || c.is_control())
        .to_string();

    Announcement { sender, name }
}

/// Immutable point-in-time copy of the registry, ordered by address.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct HostSnapshot {
    peers: Arc<[Peer]>,
}

impl HostSnapshot {
    pub(crate) fn from_peers(mut peers: Vec<Peer>) -> Self {
        peers.sort_by_key(|peer| peer.address);
        Self {
            peers: peers.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Peer> {
        self.peers.iter()
    }

    pub fn get(&self, address: IpAddr) -> Option<&Peer> {
        self.peers.iter().find(|peer| peer.address == address)
    }

    pub fn contains(&self, address: IpAddr) -> bool {
        self.get(address).is_some()
    }

    pub fn as_slice(&self) -> &[Peer] {
        &self.peers
    }
}

impl FromIterator<Peer> for HostSnapshot {
    fn from_iter<I: IntoIterator<Item = Peer>>(peers: I) -> Self {
        Self::from_peers(peers.into_iter().collect())
    }
}
