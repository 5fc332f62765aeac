//! Sending side of discovery: broadcast this device's display name.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use tokio::net::UdpSocket;
use tracing::{debug, warn};

use crate::error::Result;

/// How often [`Announcer::run`] repeats the announcement by default.
///
/// Well under the staleness interval so a single lost datagram does not
/// evict this device on its peers.
pub const ANNOUNCE_INTERVAL: Duration = Duration::from_secs(2);

/// Limited broadcast address on the given port.
pub fn broadcast_target(port: u16) -> SocketAddr {
    SocketAddr::from((Ipv4Addr::BROADCAST, port))
}

/// Periodically sends a display name to a discovery port.
pub struct Announcer {
    socket: UdpSocket,
    target: SocketAddr,
    payload: Vec<u8>,
}

impl Announcer {
    /// Bind an ephemeral broadcast-capable socket for announcing `name` to `target`.
    pub async fn bind(name: &str, target: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await?;
        socket.set_broadcast(true)?;

        Ok(Self {
            socket,
            target,
            payload: name.trim().as_bytes().to_vec(),
        })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    /// Send a single announcement.
    pub async fn announce_once(&self) -> Result<()> {
        self.socket.send_to(&self.payload, self.target).await?;
        debug!(target = %self.target, "Announcement sent");
        Ok(())
    }

    /// Announce every `every` until the future is dropped.
    ///
    /// Send failures are logged and the next tick tries again.
    pub async fn run(&self, every: Duration) {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            if let Err(e) = self.announce_once().await {
                warn!(target = %self.target, "Failed to send announcement: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peer::parse_announcement;
    use tokio::time::timeout;

    #[test]
    fn test_broadcast_target() {
        assert_eq!(broadcast_target(8888).to_string(), "255.255.255.255:8888");
    }

    #[tokio::test]
    async fn test_announce_once_sends_trimmed_name() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let target = receiver.local_addr().unwrap();

        let announcer = Announcer::bind("  Kitchen Tablet \n", target).await.unwrap();
        announcer.announce_once().await.unwrap();

        let mut buf = [0u8; 64];
        let (len, from) = timeout(Duration::from_secs(2), receiver.recv_from(&mut buf))
            .await
            .unwrap()
            .unwrap();
        let announcement = parse_announcement(&buf[..len], from.ip());
        assert_eq!(announcement.name, "Kitchen Tablet");
    }

    #[tokio::test]
    async fn test_run_repeats() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let target = receiver.local_addr().unwrap();
        let announcer = Announcer::bind("repeat", target).await.unwrap();

        let running = tokio::spawn(async move { announcer.run(Duration::from_millis(20)).await });

        let mut buf = [0u8; 64];
        for _ in 0..3 {
            let (len, _) = timeout(Duration::from_secs(2), receiver.recv_from(&mut buf))
                .await
                .unwrap()
                .unwrap();
            assert_eq!(&buf[..len], b"repeat");
        }

        running.abort();
    }
}
