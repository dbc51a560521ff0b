//! ECHONET Lite frame parsing and construction.
//!
//! Implements the fixed binary frame layout:
//!
//! ```text
//! ┌──────┬──────┬─────────┬──────┬──────┬─────┬─────┬──────────────────┐
//! │ EHD1 │ EHD2 │ TID     │ SEOJ │ DEOJ │ ESV │ OPC │ OPC × {EPC,PDC,  │
//! │ 0x10 │ 0x81 │ 2B BE   │ 3B   │ 3B   │ 1B  │ 1B  │        EDT[PDC]} │
//! └──────┴──────┴─────────┴──────┴──────┴─────┴─────┴──────────────────┘
//! ```
//!
//! SetGet-family frames (ESV 0x6E/0x7E/0x5E) append a second
//! OPC + property-list block after the first.
//!
//! [`parse`] is deliberately forgiving: anything that is not a valid
//! ECHONET Lite frame yields `None`, because arbitrary broadcast
//! traffic on port 3610 is routine, not an error. [`compose`] is
//! strict: every invalid field is a named [`EmulatorError::Compose`].

use bytes::Bytes;

use crate::error::{EmulatorError, Result};
use crate::packet::esv;
use crate::packet::types::{Edt, EdtByte, Operation, OperationRequest, Packet, PacketRequest};

/// First header byte, fixed.
pub const EHD1: u8 = 0x10;
/// Second header byte, fixed (format 1).
pub const EHD2: u8 = 0x81;
/// Smallest possible frame: header through OPC = 0.
pub const MIN_FRAME_SIZE: usize = 12;

/// Uppercase hex encoding of a byte slice, no prefix.
///
/// This is the `hex` field of receive/sent notifications.
pub fn hex_upper(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{b:02X}"));
    }
    out
}

/// `"0x" + uppercase hex` token for a byte slice.
fn hex_token(bytes: &[u8]) -> String {
    format!("0x{}", hex_upper(bytes))
}

/// Parse a received datagram as an ECHONET Lite frame.
///
/// Returns `None` for anything that is not a well-formed frame: input
/// shorter than 12 bytes, wrong EHD bytes, or a property list that
/// would overrun the buffer. A SetGet-family ESV with bytes remaining
/// after the first property block but a malformed second block is
/// also a parse failure.
///
/// # Example
///
/// ```
/// use echonet_emulator::packet::parse;
///
/// let frame = [
///     0x10, 0x81, 0x00, 0x06, 0x01, 0x30, 0x01, 0x0E, 0xF0, 0x01,
///     0x73, 0x01, 0x80, 0x01, 0x31,
/// ];
/// let packet = parse(&frame).unwrap();
/// assert_eq!(packet.tid, 6);
/// assert_eq!(packet.esv, "0x73");
/// assert_eq!(packet.operations[0].epc, "0x80");
/// assert_eq!(packet.operations[0].edt, vec!["0x31"]);
/// ```
pub fn parse(buf: &[u8]) -> Option<Packet> {
    if buf.len() < MIN_FRAME_SIZE {
        return None;
    }
    if buf[0] != EHD1 || buf[1] != EHD2 {
        return None;
    }

    let tid = u16::from_be_bytes([buf[2], buf[3]]);
    let seoj = hex_token(&buf[4..7]);
    let deoj = hex_token(&buf[7..10]);
    let esv_byte = buf[10];

    let (operations, rest) = parse_property_block(&buf[11..])?;

    // A second block is only structurally present for the SetGet
    // family, and only when bytes remain after the first block.
    let mut operations2 = None;
    if !rest.is_empty() && esv::is_setget_family(esv_byte) {
        let (ops2, _) = parse_property_block(rest)?;
        operations2 = Some(ops2);
    }

    Some(Packet {
        tid,
        seoj,
        deoj,
        esv: hex_token(&[esv_byte]),
        operations,
        operations2,
    })
}

/// Parse one OPC + property-list block.
///
/// Returns the operations and the unconsumed tail, or `None` if any
/// EPC/PDC/EDT field would overrun the buffer.
fn parse_property_block(buf: &[u8]) -> Option<(Vec<Operation>, &[u8])> {
    let (&opc, mut rest) = buf.split_first()?;

    let mut operations = Vec::with_capacity(opc as usize);
    for _ in 0..opc {
        let (&epc, after_epc) = rest.split_first()?;
        let (&pdc, after_pdc) = after_epc.split_first()?;
        if after_pdc.len() < pdc as usize {
            return None;
        }
        let (edt_bytes, tail) = after_pdc.split_at(pdc as usize);
        operations.push(Operation {
            epc: hex_token(&[epc]),
            edt: edt_bytes.iter().map(|&b| hex_token(&[b])).collect(),
        });
        rest = tail;
    }

    Some((operations, rest))
}

/// Construct the wire bytes for a packet request.
///
/// Fails with a named [`EmulatorError::Compose`] on any invalid field;
/// no partial frame is ever returned. `compose` and [`parse`] round-
/// trip: `parse(&compose(req)?)` yields the structurally equal packet.
///
/// # Example
///
/// ```
/// use echonet_emulator::packet::{compose, PacketRequest, OperationRequest};
///
/// let req = PacketRequest {
///     tid: Some(6),
///     seoj: "0x013001".into(),
///     deoj: "0x0EF001".into(),
///     esv: "0x73".into(),
///     operations: vec![OperationRequest {
///         epc: "0x80".into(),
///         edt: Some(vec![0x31].into()),
///     }],
///     operations2: None,
/// };
/// let frame = compose(&req).unwrap();
/// assert_eq!(
///     &frame[..],
///     &[0x10, 0x81, 0x00, 0x06, 0x01, 0x30, 0x01, 0x0E, 0xF0, 0x01,
///       0x73, 0x01, 0x80, 0x01, 0x31][..]
/// );
/// ```
pub fn compose(packet: &PacketRequest) -> Result<Bytes> {
    let mut buf = Vec::with_capacity(MIN_FRAME_SIZE);
    buf.push(EHD1);
    buf.push(EHD2);

    // TID. The u16 type carries the 0..0xFFFF range; only presence is
    // checked here (auto-assignment happens at the transport layer).
    let tid = packet
        .tid
        .ok_or_else(|| EmulatorError::compose("the `tid` is required"))?;
    buf.extend_from_slice(&tid.to_be_bytes());

    // SEOJ / DEOJ: exactly 6 hex digits each.
    buf.extend_from_slice(&parse_eoj(&packet.seoj, "seoj")?);
    buf.extend_from_slice(&parse_eoj(&packet.deoj, "deoj")?);

    // ESV: hex literal or mnemonic.
    let esv_byte = esv::resolve(&packet.esv)
        .ok_or_else(|| EmulatorError::compose("the `esv` is unknown"))?;
    buf.push(esv_byte);

    // SETGET_SNA carries no properties by protocol convention: both
    // OPC bytes are zero regardless of any supplied operations.
    if esv_byte == esv::SETGET_SNA {
        buf.push(0x00);
        buf.push(0x00);
        return Ok(Bytes::from(buf));
    }

    if packet.operations.is_empty() {
        return Err(EmulatorError::compose("the `operations` must not be empty"));
    }

    let mut blocks: Vec<&[OperationRequest]> = vec![&packet.operations];
    if esv::requires_operations2(esv_byte) {
        let ops2 = packet
            .operations2
            .as_deref()
            .filter(|ops| !ops.is_empty())
            .ok_or_else(|| {
                EmulatorError::compose("the `operations2` is required for SETGET and SETGET_RES")
            })?;
        blocks.push(ops2);
    }

    for operations in blocks {
        let opc = u8::try_from(operations.len())
            .map_err(|_| EmulatorError::compose("the `operations` must hold at most 255 items"))?;
        buf.push(opc);

        for operation in operations {
            buf.push(parse_hex_byte(&operation.epc, "epc")?);

            let edt_bytes = match &operation.edt {
                Some(edt) => normalize_edt(edt)?,
                None => Vec::new(),
            };
            let pdc = u8::try_from(edt_bytes.len())
                .map_err(|_| EmulatorError::compose("the `edt` must hold at most 255 bytes"))?;
            buf.push(pdc);
            buf.extend_from_slice(&edt_bytes);
        }
    }

    Ok(Bytes::from(buf))
}

/// Normalize any accepted EDT input shape to raw bytes.
fn normalize_edt(edt: &Edt) -> Result<Vec<u8>> {
    match edt {
        Edt::Hex(hex) => hex_to_bytes(hex, "edt"),
        Edt::List(items) => items
            .iter()
            .map(|item| match item {
                EdtByte::Num(n) => Ok(*n),
                EdtByte::Hex(hex) => parse_hex_byte(hex, "edt"),
            })
            .collect(),
    }
}

/// Parse a 6-hex-digit object code into its 3 bytes.
fn parse_eoj(value: &str, field: &str) -> Result<[u8; 3]> {
    let bytes = hex_to_bytes(value, field)?;
    bytes
        .try_into()
        .map_err(|_| EmulatorError::compose(format!("the `{field}` must be 6 hex digits")))
}

/// Parse a single 2-hex-digit byte token.
fn parse_hex_byte(value: &str, field: &str) -> Result<u8> {
    let bytes = hex_to_bytes(value, field)?;
    if bytes.len() != 1 {
        return Err(EmulatorError::compose(format!(
            "the `{field}` must be 2 hex digits"
        )));
    }
    Ok(bytes[0])
}

/// Decode an even-length hex string (optional `0x` prefix) to bytes.
fn hex_to_bytes(value: &str, field: &str) -> Result<Vec<u8>> {
    let hex = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);

    if hex.is_empty() || hex.len() % 2 != 0 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(EmulatorError::compose(format!("the `{field}` is invalid")));
    }

    (0..hex.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|_| EmulatorError::compose(format!("the `{field}` is invalid")))
        })
        .collect()
}
