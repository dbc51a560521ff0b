//! ECHONET Lite emulator core.
//!
//! A UDP node speaking the ECHONET Lite home-automation protocol:
//! a pure frame codec, a local interface resolver, and a paced
//! transport engine over port 3610, fronted by a small facade.
//!
//! ```text
//!             ┌────────────────────────────────────────────┐
//!             │                 Emulator                   │
//!             │  send() ─► Transport ─► queue ─► UDP 3610  │
//!             │  subscribe_received() ◄── recv task ◄──────│── datagrams
//!             │  subscribe_sent()     ◄── pacing loop      │
//!             └────────────────────────────────────────────┘
//!                         ▲                 ▲
//!                  packet::compose    packet::parse
//! ```
//!
//! # Quick start
//!
//! ```no_run
//! use echonet_emulator::{Emulator, EmulatorConfig, OperationRequest, PacketRequest};
//!
//! # async fn run() -> echonet_emulator::Result<()> {
//! let emulator = Emulator::start(EmulatorConfig::default())?;
//!
//! let mut received = emulator.subscribe_received();
//!
//! // Multicast a Get for the operating-status property of the node
//! // profile object.
//! emulator
//!     .send(
//!         None,
//!         &PacketRequest {
//!             tid: None, // auto-assigned
//!             seoj: "0x05FF01".into(),
//!             deoj: "0x0EF001".into(),
//!             esv: "GET".into(),
//!             operations: vec![OperationRequest {
//!                 epc: "0x80".into(),
//!                 edt: None,
//!             }],
//!             operations2: None,
//!         },
//!     )
//!     .await?;
//!
//! let event = received.recv().await.unwrap();
//! println!("{} replied: {}", event.address, event.hex);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod netif;
pub mod packet;
pub mod transport;

mod emulator;

pub use emulator::{Emulator, EmulatorConfig};
pub use error::{EmulatorError, Result};
pub use packet::{
    compose, parse, Edt, EdtByte, Operation, OperationRequest, Packet, PacketRequest,
};
pub use transport::{Destination, PacketEvent, EL_MULTICAST_ADDR, EL_PORT};
