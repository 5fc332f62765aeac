//! The host's own addresses, used to filter self-originated announcements.

use std::collections::HashSet;
use std::io;
use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

/// Enumerates the addresses bound to this host's network interfaces.
pub trait AddressSource: Send + Sync {
    fn enumerate(&self) -> io::Result<HashSet<IpAddr>>;
}

/// Reads addresses of the system's non-loopback interfaces that are up.
///
/// `if-addrs` does not report link state. On Linux the kernel's operstate is
/// read from sysfs; elsewhere every interface carrying an address counts as up.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemInterfaces;

impl AddressSource for SystemInterfaces {
    fn enumerate(&self) -> io::Result<HashSet<IpAddr>> {
        let addrs = if_addrs::get_if_addrs()?
            .into_iter()
            .filter(|iface| !iface.is_loopback() && !is_down(&iface.name))
            .map(|iface| iface.ip())
            .collect();
        Ok(addrs)
    }
}

#[cfg(target_os = "linux")]
fn is_down(name: &str) -> bool {
    operstate_is_down(Path::new("/sys/class/net"), name)
}

#[cfg(not(target_os = "linux"))]
fn is_down(_name: &str) -> bool {
    false
}

/// Alias labels such as `eth0:1` have no entry of their own and follow the
/// base interface. A missing or unreadable entry counts as up.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn operstate_is_down(sysfs_net: &Path, name: &str) -> bool {
    let base = name.split(':').next().unwrap_or(name);
    match std::fs::read_to_string(sysfs_net.join(base).join("operstate")) {
        Ok(state) => matches!(state.trim(), "down" | "lowerlayerdown" | "notpresent"),
        Err(_) => false,
    }
}

/// Shared, refreshable set of local addresses.
///
/// Cloning is cheap and every clone sees the same set.
#[derive(Clone)]
pub struct LocalAddressSet {
    addrs: Arc<RwLock<HashSet<IpAddr>>>,
    source: Arc<dyn AddressSource>,
}

impl LocalAddressSet {
    /// Create a set backed by `source` and fill it once.
    pub fn new(source: Arc<dyn AddressSource>) -> Self {
        let set = Self {
            addrs: Arc::new(RwLock::new(HashSet::new())),
            source,
        };
        set.refresh();
        set
    }

    /// Create a set backed by the system's interfaces.
    pub fn system() -> Self {
        Self::new(Arc::new(SystemInterfaces))
    }

    /// Re-enumerate and replace the held set.
    ///
    /// On failure the previous set is kept and `false` is returned.
    pub fn refresh(&self) -> bool {
        match self.source.enumerate() {
            Ok(addrs) => {
                debug!(count = addrs.len(), "Local address set refreshed");
                *self.addrs.write() = addrs;
                true
            }
            Err(e) => {
                warn!("Failed to enumerate local addresses, keeping previous set: {}", e);
                false
            }
        }
    }

    pub fn contains(&self, address: &IpAddr) -> bool {
        self.addrs.read().contains(address)
    }

    /// Sorted copy of the current addresses.
    pub fn addresses(&self) -> Vec<IpAddr> {
        let mut addrs: Vec<IpAddr> = self.addrs.read().iter().copied().collect();
        addrs.sort();
        addrs
    }
}

impl std::fmt::Debug for LocalAddressSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalAddressSet")
            .field("addrs", &self.addresses())
            .finish()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::FakeSource;
    use super::*;
    use std::net::Ipv4Addr;

    fn ip(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(192, 168, 0, last))
    }

    #[test]
    fn test_initial_enumeration() {
        let set = LocalAddressSet::new(FakeSource::new(&[ip(2), ip(1)]));
        assert!(set.contains(&ip(1)));
        assert!(set.contains(&ip(2)));
        assert!(!set.contains(&ip(3)));
        assert_eq!(set.addresses(), vec![ip(1), ip(2)]);
    }

    #[test]
    fn test_refresh_replaces_set() {
        let source = FakeSource::new(&[ip(1)]);
        let set = LocalAddressSet::new(source.clone());

        source.set(&[ip(5)]);
        assert!(set.refresh());

        assert!(!set.contains(&ip(1)));
        assert!(set.contains(&ip(5)));
    }

    #[test]
    fn test_failed_refresh_keeps_previous_set() {
        let source = FakeSource::new(&[ip(1)]);
        let set = LocalAddressSet::new(source.clone());

        source.fail();
        assert!(!set.refresh());

        assert!(set.contains(&ip(1)));
    }

    #[test]
    fn test_clones_share_state() {
        let source = FakeSource::new(&[]);
        let set = LocalAddressSet::new(source.clone());
        let view = set.clone();

        source.set(&[ip(7)]);
        set.refresh();

        assert!(view.contains(&ip(7)));
    }

    fn fake_sysfs(entries: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (name, state) in entries {
            let iface = dir.path().join(name);
            std::fs::create_dir(&iface).unwrap();
            std::fs::write(iface.join("operstate"), format!("{}\n", state)).unwrap();
        }
        dir
    }

    #[test]
    fn test_operstate_down_interfaces_excluded() {
        let sysfs = fake_sysfs(&[
            ("eth0", "up"),
            ("wlan0", "down"),
            ("usb0", "lowerlayerdown"),
            ("wg0", "unknown"),
        ]);

        assert!(!operstate_is_down(sysfs.path(), "eth0"));
        assert!(operstate_is_down(sysfs.path(), "wlan0"));
        assert!(operstate_is_down(sysfs.path(), "usb0"));
        // Tunnels commonly report "unknown" while carrying traffic.
        assert!(!operstate_is_down(sysfs.path(), "wg0"));
    }

    #[test]
    fn test_operstate_alias_and_missing_entry() {
        let sysfs = fake_sysfs(&[("eth1", "down")]);

        assert!(operstate_is_down(sysfs.path(), "eth1:0"));
        assert!(!operstate_is_down(sysfs.path(), "missing0"));
    }

    #[test]
    fn test_system_interfaces_excludes_loopback() {
        // Enumeration may fail in restricted sandboxes; only check the filter.
        if let Ok(addrs) = SystemInterfaces.enumerate() {
            assert!(addrs.iter().all(|addr| !addr.is_loopback()));
        }
    }
}
