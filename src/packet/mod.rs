//! Packet module - the ECHONET Lite codec.
//!
//! Pure, stateless transformation between wire bytes and the
//! structured packet form:
//! - service-code table ([`esv`])
//! - structured types ([`Packet`], [`PacketRequest`])
//! - [`parse`] / [`compose`]

mod codec;
mod types;

pub mod esv;

pub use codec::{compose, hex_upper, parse, EHD1, EHD2, MIN_FRAME_SIZE};
pub use types::{Edt, EdtByte, Operation, OperationRequest, Packet, PacketRequest};
