//! Discovery of nearby devices by UDP broadcast.
//!
//! Devices announce their display name as a plain UDP datagram on a shared
//! port. [`DiscoveryService`] listens for those announcements, keeps a
//! registry of peers that announced recently, evicts the ones that fall
//! silent, and reports every change to a [`DiscoveryListener`].

pub mod announce;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod listener;
pub mod local_addrs;
pub mod peer;
pub mod registry;
pub mod service;

pub use announce::Announcer;
pub use config::DiscoveryConfig;
pub use dispatcher::{DiscoveryEvent, DiscoveryListener};
pub use error::{DiscoveryError, Result};
pub use local_addrs::LocalAddressSet;
pub use peer::{HostSnapshot, Peer};
pub use service::DiscoveryService;
