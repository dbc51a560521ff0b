//! Socket seam for the transport engine.
//!
//! The engine is generic over [`Endpoint`] so the pacing and
//! membership logic can be exercised against a test double; the real
//! implementation is [`UdpEndpoint`], a thin wrapper over a tokio UDP
//! socket plus the `socket2` options tokio does not expose
//! (`SO_REUSEADDR` at bind time, `IP_MULTICAST_IF` for selecting the
//! multicast egress interface).

use std::future::Future;
use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::pin::Pin;

use socket2::{Domain, Protocol, SockRef, Socket, Type};
use tokio::net::UdpSocket;

use crate::transport::EL_MULTICAST_ADDR;

/// Boxed future for endpoint operations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The operations the transport engine needs from a UDP socket.
///
/// Membership and egress selection are synchronous setsockopt-style
/// calls; only transmission is asynchronous.
pub trait Endpoint: Send + Sync + 'static {
    /// Transmit one datagram to `dest`.
    fn send_to<'a>(&'a self, buf: &'a [u8], dest: SocketAddrV4) -> BoxFuture<'a, io::Result<()>>;

    /// Select `ifaddr` as the egress interface for subsequent
    /// multicast transmissions.
    fn set_multicast_if(&self, ifaddr: Ipv4Addr) -> io::Result<()>;

    /// Join the ECHONET Lite multicast group on `ifaddr`.
    fn join_group(&self, ifaddr: Ipv4Addr) -> io::Result<()>;

    /// Leave the ECHONET Lite multicast group on `ifaddr`.
    fn leave_group(&self, ifaddr: Ipv4Addr) -> io::Result<()>;
}

/// UDP socket bound for ECHONET Lite traffic.
pub struct UdpEndpoint {
    socket: UdpSocket,
}

impl UdpEndpoint {
    /// Bind `0.0.0.0:port` with `SO_REUSEADDR`, so the emulator can
    /// coexist with other ECHONET Lite stacks on the same host.
    pub fn bind(port: u16) -> io::Result<Self> {
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;
        socket.set_nonblocking(true)?;
        socket.bind(&SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port).into())?;

        let socket = UdpSocket::from_std(socket.into())?;
        Ok(Self { socket })
    }

    /// Receive one datagram. Reads may run concurrently with sends on
    /// the same socket; they are not mutually exclusive.
    pub async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        self.socket.recv_from(buf).await
    }
}

impl Endpoint for UdpEndpoint {
    fn send_to<'a>(&'a self, buf: &'a [u8], dest: SocketAddrV4) -> BoxFuture<'a, io::Result<()>> {
        Box::pin(async move {
            self.socket.send_to(buf, SocketAddr::V4(dest)).await?;
            Ok(())
        })
    }

    fn set_multicast_if(&self, ifaddr: Ipv4Addr) -> io::Result<()> {
        SockRef::from(&self.socket).set_multicast_if_v4(&ifaddr)
    }

    fn join_group(&self, ifaddr: Ipv4Addr) -> io::Result<()> {
        self.socket.join_multicast_v4(EL_MULTICAST_ADDR, ifaddr)
    }

    fn leave_group(&self, ifaddr: Ipv4Addr) -> io::Result<()> {
        self.socket.leave_multicast_v4(EL_MULTICAST_ADDR, ifaddr)
    }
}
