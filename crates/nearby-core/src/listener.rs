//! Broadcast receive loop.
//!
//! One worker task owns the socket and the [`HostRegistry`]. Datagrams,
//! staleness expirations and commands from the owning service are handled
//! one at a time from a single `select!`, so the registry has exactly one
//! writer. Socket and receive errors are absorbed here and never end the
//! loop; only [`Command::Stop`] does.

use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use async_trait::async_trait;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, trace, warn};

use crate::config::DiscoveryConfig;
use crate::dispatcher::EventDispatcher;
use crate::error::DiscoveryError;
use crate::local_addrs::LocalAddressSet;
use crate::peer::{parse_announcement, HostSnapshot};
use crate::registry::HostRegistry;

/// Create a UDP socket on the wildcard address that receives broadcasts.
///
/// Address reuse lets other listeners share the port.
pub fn create_broadcast_socket(port: u16) -> Result<std::net::UdpSocket, io::Error> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;

    socket.set_reuse_address(true)?;

    #[cfg(unix)]
    socket.set_reuse_port(true)?;

    socket.set_broadcast(true)?;

    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    socket.bind(&addr.into())?;

    socket.set_nonblocking(true)?;

    Ok(socket.into())
}

/// The receive half of a datagram socket.
#[async_trait]
pub trait DatagramSocket: Send + Sync {
    async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)>;
}

#[async_trait]
impl DatagramSocket for UdpSocket {
    async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        UdpSocket::recv_from(self, buf).await
    }
}

/// Opens the listening socket for a port.
pub type SocketBinder = Box<dyn FnMut(u16) -> io::Result<Box<dyn DatagramSocket>> + Send>;

/// Binder for real broadcast sockets.
pub fn broadcast_binder() -> SocketBinder {
    Box::new(|port| {
        let socket = UdpSocket::from_std(create_broadcast_socket(port)?)?;
        Ok(Box::new(socket) as Box<dyn DatagramSocket>)
    })
}

/// Requests from the owning service to the worker.
#[derive(Debug)]
pub enum Command {
    /// Reply with the current hosts.
    Snapshot(oneshot::Sender<HostSnapshot>),
    /// Clear the registry, release the socket and exit.
    Stop,
}

enum Step {
    Command(Option<Command>),
    Expired(IpAddr),
    Received(io::Result<(usize, SocketAddr)>),
    Resume,
}

/// Receive loop state for one discovery session.
pub struct BroadcastListener {
    config: DiscoveryConfig,
    self_inclusive: bool,
    local_addrs: LocalAddressSet,
    dispatcher: Arc<EventDispatcher>,
    binder: SocketBinder,
    registry: HostRegistry,
    socket: Option<Box<dyn DatagramSocket>>,
    /// Set while backing off after an error.
    paused_until: Option<Instant>,
    /// Whether the current streak of bind failures was already reported.
    setup_failure_reported: bool,
}

impl BroadcastListener {
    pub fn new(
        config: DiscoveryConfig,
        self_inclusive: bool,
        local_addrs: LocalAddressSet,
        dispatcher: Arc<EventDispatcher>,
        binder: SocketBinder,
    ) -> Self {
        let registry = HostRegistry::new(config.stale_interval);
        Self {
            config,
            self_inclusive,
            local_addrs,
            dispatcher,
            binder,
            registry,
            socket: None,
            paused_until: None,
            setup_failure_reported: false,
        }
    }

    /// Run until [`Command::Stop`] arrives or the command channel closes.
    pub async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        let mut buf = vec![0u8; self.config.recv_buffer_size];
        info!(
            port = self.config.port,
            self_inclusive = self.self_inclusive,
            "Broadcast listener started"
        );

        loop {
            if self.socket.is_none() && self.paused_until.is_none() {
                self.open_socket();
            }

            let resume_at = self.paused_until.unwrap_or_else(Instant::now);
            let receiving = self.paused_until.is_none();

            let step = tokio::select! {
                biased;
                command = commands.recv() => Step::Command(command),
                Some(address) = self.registry.next_expired() => Step::Expired(address),
                _ = sleep_until(resume_at), if !receiving => Step::Resume,
                result = receive(self.socket.as_deref(), &mut buf), if receiving => Step::Received(result),
            };

            match step {
                Step::Command(Some(Command::Snapshot(reply))) => {
                    let _ = reply.send(self.registry.snapshot());
                }
                Step::Command(Some(Command::Stop)) | Step::Command(None) => break,
                Step::Expired(address) => {
                    if self.registry.expire(address).is_changed() {
                        info!(%address, "Host went stale");
                        self.dispatcher.deliver_hosts_changed(self.registry.snapshot());
                    }
                }
                Step::Received(Ok((len, from))) => self.handle_datagram(&buf[..len], from.ip()),
                Step::Received(Err(e)) => {
                    warn!("UDP receive error: {}", e);
                    self.dispatcher.deliver_receive_failed();
                    self.pause();
                }
                Step::Resume => self.paused_until = None,
            }
        }

        self.registry.clear();
        self.socket = None;
        info!(port = self.config.port, "Broadcast listener stopped");
    }

    fn open_socket(&mut self) {
        match (self.binder)(self.config.port) {
            Ok(socket) => {
                info!(port = self.config.port, "UDP discovery listening");
                self.socket = Some(socket);
                self.setup_failure_reported = false;
            }
            Err(source) => {
                let err = DiscoveryError::Bind {
                    port: self.config.port,
                    source,
                };
                warn!("{}", err);
                if !self.setup_failure_reported {
                    self.setup_failure_reported = true;
                    self.dispatcher.deliver_setup_failed(err.to_string());
                }
                self.pause();
            }
        }
    }

    fn handle_datagram(&mut self, data: &[u8], sender: IpAddr) {
        let announcement = parse_announcement(data, sender);

        if !self.self_inclusive && self.local_addrs.contains(&announcement.sender) {
            trace!(sender = %announcement.sender, "Ignoring own announcement");
            return;
        }

        debug!(
            sender = %announcement.sender,
            name = %announcement.name,
            "Announcement received"
        );

        let observation = self
            .registry
            .observe(announcement.sender, &announcement.name);
        self.registry.refresh(announcement.sender);

        if observation.is_changed() {
            self.dispatcher.deliver_hosts_changed(self.registry.snapshot());
        }
    }

    fn pause(&mut self) {
        self.paused_until = Some(Instant::now() + self.config.error_backoff);
    }
}

async fn receive(
    socket: Option<&dyn DatagramSocket>,
    buf: &mut [u8],
) -> io::Result<(usize, SocketAddr)> {
    match socket {
        Some(socket) => socket.recv_from(buf).await,
        None => std::future::pending().await,
    }
}
