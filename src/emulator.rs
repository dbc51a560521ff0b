//! Emulator facade.
//!
//! [`Emulator::start`] is the single entry point: it binds the
//! ECHONET Lite port, resolves the local interface snapshot, joins the
//! multicast group, and spawns the receive task. A constructed
//! [`Emulator`] is always fully initialized; there is no separate
//! init step to call twice or forget.

use std::net::Ipv4Addr;
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::{EmulatorError, Result};
use crate::netif::list_interfaces;
use crate::packet::PacketRequest;
use crate::transport::{spawn_recv_task, Destination, PacketEvent, Transport, UdpEndpoint, EL_PORT};

/// Emulator startup options.
#[derive(Debug, Clone)]
pub struct EmulatorConfig {
    /// Join the ECHONET Lite multicast group on every local interface.
    /// Disable to run unicast-only (e.g. alongside another stack that
    /// owns the group membership).
    pub join_multicast: bool,
    /// Capacity of the received/sent event channels. Slow subscribers
    /// that fall more than this far behind start losing events.
    pub event_capacity: usize,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            join_multicast: true,
            event_capacity: 64,
        }
    }
}

/// A running ECHONET Lite emulator node.
///
/// Cheap to clone; all clones share the socket, queue, and event
/// channels. Dropping the last clone aborts the receive task.
pub struct Emulator {
    transport: Transport<UdpEndpoint>,
    recv_tx: broadcast::Sender<PacketEvent>,
    recv_task: Arc<AbortOnDrop>,
}

impl Clone for Emulator {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            recv_tx: self.recv_tx.clone(),
            recv_task: self.recv_task.clone(),
        }
    }
}

struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

impl Emulator {
    /// Bind the ECHONET Lite port and start the emulator.
    ///
    /// Fails only if the bind itself fails; per-interface multicast
    /// joins are best-effort.
    pub fn start(config: EmulatorConfig) -> Result<Self> {
        let endpoint = Arc::new(UdpEndpoint::bind(EL_PORT)?);
        let interfaces = list_interfaces();
        debug!("emulator bound on port {EL_PORT}, interfaces: {interfaces:?}");

        let transport = Transport::new(
            endpoint.clone(),
            interfaces.clone(),
            config.join_multicast,
            config.event_capacity,
        );

        let (recv_tx, _) = broadcast::channel(config.event_capacity);
        let recv_task = spawn_recv_task(endpoint, interfaces, recv_tx.clone());

        Ok(Self {
            transport,
            recv_tx,
            recv_task: Arc::new(AbortOnDrop(recv_task)),
        })
    }

    /// Send a packet.
    ///
    /// `address` is a dotted-quad IPv4 string for unicast, or `None`
    /// for the multicast group. The future resolves once the packet
    /// has actually been transmitted, not when it is queued.
    pub async fn send(&self, address: Option<&str>, packet: &PacketRequest) -> Result<()> {
        let dest = parse_destination(address)?;
        self.transport.send(dest, packet).await
    }

    /// Subscribe to packets received from other nodes.
    pub fn subscribe_received(&self) -> broadcast::Receiver<PacketEvent> {
        self.recv_tx.subscribe()
    }

    /// Subscribe to packets this node has transmitted.
    pub fn subscribe_sent(&self) -> broadcast::Receiver<PacketEvent> {
        self.transport.subscribe_sent()
    }
}

fn parse_destination(address: Option<&str>) -> Result<Destination> {
    match address {
        None => Ok(Destination::Multicast),
        Some(addr) => addr
            .parse::<Ipv4Addr>()
            .map(Destination::Unicast)
            .map_err(|_| EmulatorError::InvalidAddress(addr.to_string())),
    }
}
