//! Transport module - UDP socket, multicast membership, and the
//! paced outbound send queue.
//!
//! The [`Transport`] engine owns all mutable protocol state (TID
//! counter, queue, last-transmission clock); the [`Endpoint`] trait is
//! the socket seam it drives.

use std::net::Ipv4Addr;

mod endpoint;
mod engine;

pub use endpoint::{BoxFuture, Endpoint, UdpEndpoint};
pub use engine::{
    spawn_recv_task, Destination, PacketEvent, Transport, SEND_INTERVAL, SEND_QUEUE_MAX,
};

/// UDP port for all ECHONET Lite traffic.
pub const EL_PORT: u16 = 3610;

/// IPv4 multicast group for ECHONET Lite discovery and notification.
pub const EL_MULTICAST_ADDR: Ipv4Addr = Ipv4Addr::new(224, 0, 23, 0);
