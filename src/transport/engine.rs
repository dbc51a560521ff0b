//! Outbound send queue, pacing loop, and inbound dispatch.
//!
//! All outbound traffic is serialized through a bounded FIFO queue
//! drained by exactly one pacing task at a time:
//!
//! ```text
//! send() ──┬─► queue (max 10) ─► pacing task ─► Endpoint::send_to
//! send() ──┘                        │
//!                                   └─► sent broadcast + completion
//! ```
//!
//! The single-drainer guarantee is what keeps multicast membership
//! toggling sane: a multicast item drops the group, waits for the
//! membership change to settle, fans out once per local interface,
//! and rejoins, with no second transmission interleaved anywhere in
//! that sequence. The pacing task exits when the queue drains and is
//! restarted by the next enqueue.
//!
//! ECHONET Lite timing conventions enforced here:
//! - at least [`SEND_INTERVAL`] between any two transmissions, even
//!   across idle gaps;
//! - [`MULTICAST_SETTLE`] after dropping membership and before each
//!   per-interface multicast egress selection takes effect.
//!
//! A hung `send_to` on the underlying socket blocks that pacing step
//! indefinitely; there is no timeout or retry at this layer.

use std::collections::VecDeque;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, trace, warn};

use crate::error::{EmulatorError, Result};
use crate::packet::{compose, hex_upper, parse, Packet, PacketRequest};
use crate::transport::{Endpoint, UdpEndpoint, EL_MULTICAST_ADDR, EL_PORT};

/// Maximum number of enqueued-but-undispatched items.
pub const SEND_QUEUE_MAX: usize = 10;

/// Minimum interval between two completed transmissions.
pub const SEND_INTERVAL: Duration = Duration::from_millis(100);

/// Settle time after a multicast membership change, and before each
/// per-interface egress selection. Membership drops are asynchronous
/// on some platforms.
const MULTICAST_SETTLE: Duration = Duration::from_millis(100);

/// Destination of an outbound packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    /// A single peer; transmitted once.
    Unicast(Ipv4Addr),
    /// The ECHONET Lite group; fanned out once per local interface.
    Multicast,
}

impl Destination {
    /// The wire destination, always on the ECHONET Lite port.
    fn socket_addr(self) -> SocketAddrV4 {
        match self {
            Destination::Unicast(addr) => SocketAddrV4::new(addr, EL_PORT),
            Destination::Multicast => SocketAddrV4::new(EL_MULTICAST_ADDR, EL_PORT),
        }
    }

    /// The `address` field of the sent notification.
    fn address_string(self) -> String {
        match self {
            Destination::Unicast(addr) => addr.to_string(),
            Destination::Multicast => EL_MULTICAST_ADDR.to_string(),
        }
    }
}

/// Notification payload for received and sent packets.
///
/// `hex` is the uppercase hex encoding of the raw frame; `packet` is
/// its structured form. The bridge forwards this value verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketEvent {
    /// Peer address (source for received, destination for sent).
    pub address: String,
    /// Raw frame as uppercase hex.
    pub hex: String,
    /// Structured packet.
    pub packet: Packet,
}

/// One queued outbound item.
struct QueuedPacket {
    dest: Destination,
    frame: Bytes,
    done: oneshot::Sender<Result<()>>,
}

struct Inner<E> {
    endpoint: Arc<E>,
    /// Memoized local interface snapshot; multicast fan-out targets
    /// and membership scope.
    interfaces: Vec<Ipv4Addr>,
    join_multicast: bool,
    queue: Mutex<VecDeque<QueuedPacket>>,
    /// Re-entrancy guard: true while a pacing task is draining.
    processing: AtomicBool,
    /// Completion time of the last transmission, for the pacing floor.
    last_sent: Mutex<Instant>,
    /// Last auto-assigned TID; cycles through 1..=0xFFFE, skipping 0.
    last_tid: AtomicU16,
    sent_tx: broadcast::Sender<PacketEvent>,
}

/// The transport engine: validates and queues outbound packets, and
/// drives the pacing loop. Cheap to clone; all clones share state.
pub struct Transport<E> {
    inner: Arc<Inner<E>>,
}

impl<E> Clone for Transport<E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<E: Endpoint> Transport<E> {
    /// Create an engine over an already-bound endpoint.
    ///
    /// `interfaces` is the process-lifetime interface snapshot (see
    /// [`crate::netif::list_interfaces`]). When `join_multicast` is
    /// set, group membership is joined on every interface immediately,
    /// best-effort.
    pub fn new(
        endpoint: Arc<E>,
        interfaces: Vec<Ipv4Addr>,
        join_multicast: bool,
        event_capacity: usize,
    ) -> Self {
        let (sent_tx, _) = broadcast::channel(event_capacity);
        let transport = Self {
            inner: Arc::new(Inner {
                endpoint,
                interfaces,
                join_multicast,
                queue: Mutex::new(VecDeque::new()),
                processing: AtomicBool::new(false),
                last_sent: Mutex::new(Instant::now()),
                last_tid: AtomicU16::new(0),
                sent_tx,
            }),
        };
        transport.inner.join_membership();
        transport
    }

    /// Subscribe to sent notifications: one event per transmission
    /// attempt the engine completed, success or failure.
    pub fn subscribe_sent(&self) -> broadcast::Receiver<PacketEvent> {
        self.inner.sent_tx.subscribe()
    }

    /// Validate, compose, enqueue, and await transmission of a packet.
    ///
    /// A missing TID is auto-assigned from the engine's counter; the
    /// caller's request is never mutated. Compose failures and a full
    /// queue are reported synchronously; otherwise the future resolves
    /// only once the item has actually been transmitted (or its
    /// transmission failed).
    pub async fn send(&self, dest: Destination, packet: &PacketRequest) -> Result<()> {
        let rx = self.submit(dest, packet)?;
        rx.await.map_err(|_| EmulatorError::EngineClosed)?
    }

    /// Synchronous half of [`send`]: everything up to and including
    /// the enqueue. Returns the completion receiver.
    fn submit(
        &self,
        dest: Destination,
        packet: &PacketRequest,
    ) -> Result<oneshot::Receiver<Result<()>>> {
        let frame = match packet.tid {
            Some(_) => compose(packet)?,
            // Auto-assign onto a copy; the counter only advances here.
            None => compose(&packet.with_tid(self.inner.next_tid()))?,
        };

        let (done, rx) = oneshot::channel();
        {
            let mut queue = self.inner.queue.lock().unwrap();
            if queue.len() >= SEND_QUEUE_MAX {
                return Err(EmulatorError::QueueFull);
            }
            queue.push_back(QueuedPacket { dest, frame, done });
        }

        self.start_pacing();
        Ok(rx)
    }

    /// Start the pacing task unless one is already draining the queue.
    fn start_pacing(&self) {
        if self
            .inner
            .processing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            let inner = self.inner.clone();
            tokio::spawn(pacing_loop(inner));
        }
    }
}

impl<E: Endpoint> Inner<E> {
    /// Next auto-assigned TID: the previous value plus one, wrapping
    /// from 0xFFFE back to 1 (0 is skipped).
    fn next_tid(&self) -> u16 {
        self.last_tid
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
                Some(last % 0xFFFE + 1)
            })
            .map(|last| last % 0xFFFE + 1)
            .unwrap_or(1)
    }

    /// Join the multicast group on every interface, best-effort.
    fn join_membership(&self) {
        if !self.join_multicast {
            return;
        }
        for &ifaddr in &self.interfaces {
            if let Err(e) = self.endpoint.join_group(ifaddr) {
                warn!("multicast join on {ifaddr} failed: {e}");
            }
        }
    }

    /// Leave the multicast group on every interface, best-effort.
    fn drop_membership(&self) {
        if !self.join_multicast {
            return;
        }
        for &ifaddr in &self.interfaces {
            if let Err(e) = self.endpoint.leave_group(ifaddr) {
                warn!("multicast drop on {ifaddr} failed: {e}");
            }
        }
    }

    /// Transmit one dequeued item, then notify.
    async fn process_item(&self, item: QueuedPacket) {
        let multicast = item.dest == Destination::Multicast;

        // Multicast first leaves the group so the datagram is not
        // looped back to us; the drop needs time to take effect.
        let mut wait = Duration::ZERO;
        if multicast {
            self.drop_membership();
            wait += MULTICAST_SETTLE;
        }

        // If nothing else is queued right now, stretch the wait so the
        // global pacing floor holds across idle gaps.
        if self.queue.lock().unwrap().is_empty() {
            let elapsed = self.last_sent.lock().unwrap().elapsed();
            if elapsed < SEND_INTERVAL {
                wait += SEND_INTERVAL - elapsed;
            }
        }
        sleep(wait).await;

        let result = self.transmit(&item).await;

        *self.last_sent.lock().unwrap() = Instant::now();
        if multicast {
            self.join_membership();
        }

        // Sent notification carries the re-parsed frame, symmetric
        // with the receive notification.
        if let Some(packet) = parse(&item.frame) {
            let _ = self.sent_tx.send(PacketEvent {
                address: item.dest.address_string(),
                hex: hex_upper(&item.frame),
                packet,
            });
        }

        let outcome = result.map_err(EmulatorError::from);
        if let Err(ref e) = outcome {
            debug!("transmission to {} failed: {e}", item.dest.address_string());
        }
        let _ = item.done.send(outcome);
    }

    /// The actual wire transmission: once for unicast, once per local
    /// interface for multicast with the egress explicitly selected
    /// before each send.
    async fn transmit(&self, item: &QueuedPacket) -> std::io::Result<()> {
        let dest = item.dest.socket_addr();
        match item.dest {
            Destination::Unicast(_) => self.endpoint.send_to(&item.frame, dest).await,
            Destination::Multicast => {
                for &ifaddr in &self.interfaces {
                    self.endpoint.set_multicast_if(ifaddr)?;
                    sleep(MULTICAST_SETTLE).await;
                    self.endpoint.send_to(&item.frame, dest).await?;
                    sleep(SEND_INTERVAL).await;
                }
                Ok(())
            }
        }
    }
}

/// Drain the queue one item at a time; exits when empty.
async fn pacing_loop<E: Endpoint>(inner: Arc<Inner<E>>) {
    loop {
        // The guard must not be held across the awaits below.
        let next = inner.queue.lock().unwrap().pop_front();

        let Some(item) = next else {
            inner.processing.store(false, Ordering::Release);

            // An enqueue may have slipped in between the final pop and
            // the flag clearing above; reclaim the drainer role if so.
            if inner.queue.lock().unwrap().is_empty()
                || inner
                    .processing
                    .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                    .is_err()
            {
                return;
            }
            continue;
        };

        inner.process_item(item).await;
        sleep(SEND_INTERVAL).await;
    }
}

/// Spawn the inbound dispatch task.
///
/// Every datagram is filtered against the local interface snapshot
/// (multicast self-delivery) and run through the codec; only valid
/// frames from other hosts reach the receive broadcast.
pub fn spawn_recv_task(
    endpoint: Arc<UdpEndpoint>,
    interfaces: Vec<Ipv4Addr>,
    recv_tx: broadcast::Sender<PacketEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut buf = vec![0u8; 65535];
        loop {
            match endpoint.recv_from(&mut buf).await {
                Ok((n, src)) => {
                    if let Some(event) = inbound_event(&buf[..n], src, &interfaces) {
                        let _ = recv_tx.send(event);
                    }
                }
                Err(e) => {
                    error!("receive loop error: {e}");
                    return;
                }
            }
        }
    })
}

/// Classify one inbound datagram. `None` means a routine drop:
/// self-originated, IPv6-sourced, or not an ECHONET Lite frame.
fn inbound_event(data: &[u8], src: SocketAddr, self_addrs: &[Ipv4Addr]) -> Option<PacketEvent> {
    let src_ip = match src.ip() {
        IpAddr::V4(ip) => ip,
        IpAddr::V6(_) => return None,
    };
    if self_addrs.contains(&src_ip) {
        return None;
    }
    let Some(packet) = parse(data) else {
        trace!("dropping non-ECHONET datagram from {src_ip}");
        return None;
    };
    Some(PacketEvent {
        address: src_ip.to_string(),
        hex: hex_upper(data),
        packet,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::OperationRequest;
    use crate::transport::BoxFuture;
    use std::sync::atomic::AtomicUsize;

    /// What the mock endpoint observed, in order.
    #[derive(Debug, Clone, PartialEq, Eq)]
    enum MockEvent {
        Join(Ipv4Addr),
        Leave(Ipv4Addr),
        SelectIf(Ipv4Addr),
        Send(SocketAddrV4),
    }

    struct MockEndpoint {
        events: Mutex<Vec<MockEvent>>,
        frames: Mutex<Vec<Vec<u8>>>,
        send_times: Mutex<Vec<Instant>>,
        send_delay: Duration,
        fail_sends: AtomicBool,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl MockEndpoint {
        fn new() -> Arc<Self> {
            Self::with_delay(Duration::ZERO)
        }

        fn with_delay(send_delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                events: Mutex::new(Vec::new()),
                frames: Mutex::new(Vec::new()),
                send_times: Mutex::new(Vec::new()),
                send_delay,
                fail_sends: AtomicBool::new(false),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            })
        }

        fn events(&self) -> Vec<MockEvent> {
            self.events.lock().unwrap().clone()
        }

        fn sent_frames(&self) -> Vec<Vec<u8>> {
            self.frames.lock().unwrap().clone()
        }
    }

    impl Endpoint for MockEndpoint {
        fn send_to<'a>(
            &'a self,
            buf: &'a [u8],
            dest: SocketAddrV4,
        ) -> BoxFuture<'a, std::io::Result<()>> {
            Box::pin(async move {
                let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                self.max_in_flight
                    .fetch_max(now_in_flight, Ordering::SeqCst);

                sleep(self.send_delay).await;

                self.events.lock().unwrap().push(MockEvent::Send(dest));
                self.frames.lock().unwrap().push(buf.to_vec());
                self.send_times.lock().unwrap().push(Instant::now());
                self.in_flight.fetch_sub(1, Ordering::SeqCst);

                if self.fail_sends.load(Ordering::SeqCst) {
                    Err(std::io::Error::new(std::io::ErrorKind::Other, "mock failure"))
                } else {
                    Ok(())
                }
            })
        }

        fn set_multicast_if(&self, ifaddr: Ipv4Addr) -> std::io::Result<()> {
            self.events.lock().unwrap().push(MockEvent::SelectIf(ifaddr));
            Ok(())
        }

        fn join_group(&self, ifaddr: Ipv4Addr) -> std::io::Result<()> {
            self.events.lock().unwrap().push(MockEvent::Join(ifaddr));
            Ok(())
        }

        fn leave_group(&self, ifaddr: Ipv4Addr) -> std::io::Result<()> {
            self.events.lock().unwrap().push(MockEvent::Leave(ifaddr));
            Ok(())
        }
    }

    fn test_interfaces() -> Vec<Ipv4Addr> {
        vec![
            Ipv4Addr::new(192, 168, 0, 10),
            Ipv4Addr::new(10, 0, 0, 10),
            Ipv4Addr::new(172, 16, 0, 10),
        ]
    }

    fn get_request() -> PacketRequest {
        PacketRequest {
            tid: None,
            seoj: "0x05FF01".into(),
            deoj: "0x013001".into(),
            esv: "GET".into(),
            operations: vec![OperationRequest {
                epc: "0x80".into(),
                edt: None,
            }],
            operations2: None,
        }
    }

    fn peer() -> Destination {
        Destination::Unicast(Ipv4Addr::new(192, 168, 0, 77))
    }

    #[tokio::test(start_paused = true)]
    async fn unicast_send_completes() {
        let mock = MockEndpoint::new();
        let transport = Transport::new(mock.clone(), test_interfaces(), false, 16);

        transport.send(peer(), &get_request()).await.unwrap();

        let frames = mock.sent_frames();
        assert_eq!(frames.len(), 1);
        let packet = parse(&frames[0]).unwrap();
        assert_eq!(packet.esv, "0x62");
        // No membership toggling for unicast.
        assert!(!mock
            .events()
            .iter()
            .any(|e| matches!(e, MockEvent::Join(_) | MockEvent::Leave(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn queue_rejects_eleventh_item() {
        let mock = MockEndpoint::with_delay(Duration::from_secs(3600));
        let transport = Transport::new(mock.clone(), test_interfaces(), false, 16);

        // First item is dequeued by the pacing task and stuck in the
        // slow mock send; let that happen before filling the queue.
        let first = transport.submit(peer(), &get_request()).unwrap();
        tokio::time::sleep(Duration::from_millis(1)).await;

        let mut pending = vec![first];
        for _ in 0..SEND_QUEUE_MAX {
            pending.push(transport.submit(peer(), &get_request()).unwrap());
        }

        let err = transport.submit(peer(), &get_request()).unwrap_err();
        assert!(matches!(err, EmulatorError::QueueFull));
        drop(pending);
    }

    #[tokio::test(start_paused = true)]
    async fn single_transmission_in_flight() {
        let mock = MockEndpoint::with_delay(Duration::from_millis(50));
        let transport = Transport::new(mock.clone(), test_interfaces(), false, 16);

        let t1 = transport.clone();
        let t2 = transport.clone();
        let h1 = tokio::spawn(async move { t1.send(peer(), &get_request()).await });
        let h2 = tokio::spawn(async move { t2.send(peer(), &get_request()).await });
        h1.await.unwrap().unwrap();
        h2.await.unwrap().unwrap();

        assert_eq!(mock.max_in_flight.load(Ordering::SeqCst), 1);
        assert_eq!(mock.sent_frames().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn tid_auto_assignment_is_sequential() {
        let mock = MockEndpoint::new();
        let transport = Transport::new(mock.clone(), test_interfaces(), false, 16);

        for _ in 0..3 {
            transport.send(peer(), &get_request()).await.unwrap();
        }

        let tids: Vec<u16> = mock
            .sent_frames()
            .iter()
            .map(|f| parse(f).unwrap().tid)
            .collect();
        assert_eq!(tids, vec![1, 2, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn tid_wraps_skipping_zero() {
        let mock = MockEndpoint::new();
        let transport = Transport::new(mock.clone(), test_interfaces(), false, 16);
        transport.inner.last_tid.store(0xFFFD, Ordering::SeqCst);

        for _ in 0..3 {
            transport.send(peer(), &get_request()).await.unwrap();
        }

        let tids: Vec<u16> = mock
            .sent_frames()
            .iter()
            .map(|f| parse(f).unwrap().tid)
            .collect();
        assert_eq!(tids, vec![0xFFFE, 1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn explicit_tid_does_not_advance_counter() {
        let mock = MockEndpoint::new();
        let transport = Transport::new(mock.clone(), test_interfaces(), false, 16);

        let mut req = get_request();
        req.tid = Some(500);
        transport.send(peer(), &req).await.unwrap();
        transport.send(peer(), &get_request()).await.unwrap();

        let tids: Vec<u16> = mock
            .sent_frames()
            .iter()
            .map(|f| parse(f).unwrap().tid)
            .collect();
        assert_eq!(tids, vec![500, 1]);
    }

    #[tokio::test(start_paused = true)]
    async fn multicast_fans_out_per_interface() {
        let interfaces = test_interfaces();
        let mock = MockEndpoint::new();
        let transport = Transport::new(mock.clone(), interfaces.clone(), true, 16);

        // Skip the initial best-effort join from construction.
        let skip = mock.events().len();
        transport
            .send(Destination::Multicast, &get_request())
            .await
            .unwrap();

        let events = mock.events()[skip..].to_vec();
        let group = SocketAddrV4::new(EL_MULTICAST_ADDR, EL_PORT);

        let mut expected = Vec::new();
        for &ifaddr in &interfaces {
            expected.push(MockEvent::Leave(ifaddr));
        }
        for &ifaddr in &interfaces {
            expected.push(MockEvent::SelectIf(ifaddr));
            expected.push(MockEvent::Send(group));
        }
        for &ifaddr in &interfaces {
            expected.push(MockEvent::Join(ifaddr));
        }
        assert_eq!(events, expected);
    }

    #[tokio::test(start_paused = true)]
    async fn multicast_skips_membership_when_not_joined() {
        let mock = MockEndpoint::new();
        let transport = Transport::new(mock.clone(), test_interfaces(), false, 16);

        transport
            .send(Destination::Multicast, &get_request())
            .await
            .unwrap();

        assert!(!mock
            .events()
            .iter()
            .any(|e| matches!(e, MockEvent::Join(_) | MockEvent::Leave(_))));
        // Fan-out still happens on every interface.
        let sends = mock
            .events()
            .iter()
            .filter(|e| matches!(e, MockEvent::Send(_)))
            .count();
        assert_eq!(sends, test_interfaces().len());
    }

    #[tokio::test(start_paused = true)]
    async fn multicast_waits_compound() {
        let mock = MockEndpoint::new();
        let transport = Transport::new(mock.clone(), test_interfaces(), true, 16);

        let start = Instant::now();
        transport
            .send(Destination::Multicast, &get_request())
            .await
            .unwrap();

        let times = mock.send_times.lock().unwrap().clone();
        assert_eq!(times.len(), 3);
        // Membership settle, pacing floor, and the first egress
        // selection delay all apply before the first datagram.
        assert!(times[0] - start >= MULTICAST_SETTLE + SEND_INTERVAL + MULTICAST_SETTLE);
        // Each further interface adds the post-send and selection
        // delays.
        assert!(times[1] - times[0] >= SEND_INTERVAL + MULTICAST_SETTLE);
        assert!(times[2] - times[1] >= SEND_INTERVAL + MULTICAST_SETTLE);
    }

    #[tokio::test(start_paused = true)]
    async fn pacing_floor_spans_idle_gaps() {
        let mock = MockEndpoint::new();
        let transport = Transport::new(mock.clone(), test_interfaces(), false, 16);

        transport.send(peer(), &get_request()).await.unwrap();
        // Immediately issue another; the engine must stretch the wait.
        transport.send(peer(), &get_request()).await.unwrap();

        let times = mock.send_times.lock().unwrap().clone();
        assert_eq!(times.len(), 2);
        assert!(times[1] - times[0] >= SEND_INTERVAL);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_item_reports_error_and_loop_continues() {
        let mock = MockEndpoint::new();
        let transport = Transport::new(mock.clone(), test_interfaces(), false, 16);

        mock.fail_sends.store(true, Ordering::SeqCst);
        let err = transport.send(peer(), &get_request()).await.unwrap_err();
        assert!(matches!(err, EmulatorError::Io(_)));

        mock.fail_sends.store(false, Ordering::SeqCst);
        transport.send(peer(), &get_request()).await.unwrap();
        assert_eq!(mock.sent_frames().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn compose_failure_reaches_caller_before_io() {
        let mock = MockEndpoint::new();
        let transport = Transport::new(mock.clone(), test_interfaces(), false, 16);

        let mut req = get_request();
        req.operations.clear();
        let err = transport.send(peer(), &req).await.unwrap_err();
        assert!(matches!(err, EmulatorError::Compose(_)));
        assert!(mock.sent_frames().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn sent_notification_carries_reparsed_packet() {
        let mock = MockEndpoint::new();
        let transport = Transport::new(mock.clone(), test_interfaces(), false, 16);
        let mut sent_rx = transport.subscribe_sent();

        transport.send(peer(), &get_request()).await.unwrap();

        let event = sent_rx.recv().await.unwrap();
        assert_eq!(event.address, "192.168.0.77");
        assert_eq!(event.packet.esv, "0x62");
        assert_eq!(event.packet.tid, 1);
        assert!(event.hex.starts_with("1081"));
    }

    #[test]
    fn inbound_event_filters_self_and_garbage() {
        let self_addrs = test_interfaces();
        let frame = compose(&get_request().with_tid(1)).unwrap();
        let from = |ip: Ipv4Addr| SocketAddr::V4(SocketAddrV4::new(ip, EL_PORT));

        // Own address: multicast self-delivery, dropped.
        assert!(inbound_event(&frame, from(self_addrs[0]), &self_addrs).is_none());

        // Foreign address with a valid frame: surfaced.
        let peer_ip = Ipv4Addr::new(192, 168, 0, 42);
        let event = inbound_event(&frame, from(peer_ip), &self_addrs).unwrap();
        assert_eq!(event.address, "192.168.0.42");
        assert_eq!(event.hex, hex_upper(&frame));
        assert_eq!(event.packet.tid, 1);

        // Non-ECHONET payload: silently dropped.
        assert!(inbound_event(b"not echonet", from(peer_ip), &self_addrs).is_none());
    }
}
