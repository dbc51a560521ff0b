//! Structured packet types.
//!
//! Two shapes cross this module's boundary:
//!
//! - [`Packet`] is the parsed form produced by
//!   [`parse`](crate::packet::parse) and surfaced in notifications.
//!   All byte-valued fields are text-safe uppercase hex tokens
//!   (`"0x.."`), so the value can be forwarded verbatim as JSON.
//! - [`PacketRequest`] is the construction form accepted by
//!   [`compose`](crate::packet::compose) and `send`. It is looser:
//!   the ESV may be a mnemonic, the TID may be absent (auto-assigned
//!   at the transport layer), and EDT accepts several input shapes.

use serde::{Deserialize, Serialize};

/// A parsed ECHONET Lite packet.
///
/// # Example (JSON form)
///
/// ```json
/// {
///   "tid": 6,
///   "seoj": "0x013001",
///   "deoj": "0x0EF001",
///   "esv": "0x73",
///   "operations": [{ "epc": "0x80", "edt": ["0x31"] }]
/// }
/// ```
///
/// `operations2` is present only for SetGet-family frames that carry a
/// second property list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Packet {
    /// Transaction identifier.
    pub tid: u16,
    /// Source object code, e.g. `"0x013001"`.
    pub seoj: String,
    /// Destination object code, e.g. `"0x0EF001"`.
    pub deoj: String,
    /// Service code, e.g. `"0x73"`.
    pub esv: String,
    /// First property list.
    pub operations: Vec<Operation>,
    /// Second property list (SetGet family only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operations2: Option<Vec<Operation>>,
}

/// One parsed property operation: EPC plus EDT as hex byte tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// Property code, e.g. `"0x80"`.
    pub epc: String,
    /// Property data as `"0xNN"` tokens, one per byte. Empty when the
    /// frame carried PDC = 0.
    #[serde(default)]
    pub edt: Vec<String>,
}

/// A packet construction request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketRequest {
    /// Transaction identifier. When absent, the transport engine
    /// auto-assigns one; [`compose`](crate::packet::compose) itself
    /// requires it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tid: Option<u16>,
    /// Source object code: 6 hex digits, optional `0x` prefix.
    pub seoj: String,
    /// Destination object code: 6 hex digits, optional `0x` prefix.
    pub deoj: String,
    /// Service code: 2-hex-digit literal or mnemonic (e.g. `"GET"`).
    pub esv: String,
    /// First property list.
    #[serde(default)]
    pub operations: Vec<OperationRequest>,
    /// Second property list. Required iff the ESV resolves to SETGET
    /// or SETGET_RES.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operations2: Option<Vec<OperationRequest>>,
}

impl PacketRequest {
    /// Return a copy of this request carrying the given TID.
    ///
    /// Used for auto-assignment: the caller's value is never mutated.
    pub fn with_tid(&self, tid: u16) -> Self {
        Self {
            tid: Some(tid),
            ..self.clone()
        }
    }
}

/// One property operation in a construction request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationRequest {
    /// Property code: 2 hex digits, optional `0x` prefix.
    pub epc: String,
    /// Property data. Absence emits PDC = 0 with no EDT bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edt: Option<Edt>,
}

/// Accepted EDT input shapes, all normalized to a byte sequence.
///
/// - `"0102"` or `"0x0102"`: a single hex string
/// - `["0x01", "0x02"]`: hex-string byte tokens
/// - `[1, 2]`: numeric bytes
///
/// The two list forms may be mixed element-wise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Edt {
    /// Single hex string covering all bytes.
    Hex(String),
    /// One element per byte.
    List(Vec<EdtByte>),
}

/// One EDT byte given either numerically or as a 2-hex-digit token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EdtByte {
    /// Numeric byte, `0..=255` enforced by the type.
    Num(u8),
    /// Hex token, e.g. `"0x31"`.
    Hex(String),
}

impl From<Vec<u8>> for Edt {
    fn from(bytes: Vec<u8>) -> Self {
        Edt::List(bytes.into_iter().map(EdtByte::Num).collect())
    }
}

impl From<&str> for Edt {
    fn from(hex: &str) -> Self {
        Edt::Hex(hex.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packet_json_shape() {
        let packet = Packet {
            tid: 6,
            seoj: "0x013001".into(),
            deoj: "0x0EF001".into(),
            esv: "0x73".into(),
            operations: vec![Operation {
                epc: "0x80".into(),
                edt: vec!["0x31".into()],
            }],
            operations2: None,
        };

        let json = serde_json::to_value(&packet).unwrap();
        assert_eq!(json["tid"], 6);
        assert_eq!(json["seoj"], "0x013001");
        assert_eq!(json["operations"][0]["edt"][0], "0x31");
        // Absent second list is omitted, not null.
        assert!(json.get("operations2").is_none());

        let back: Packet = serde_json::from_value(json).unwrap();
        assert_eq!(back, packet);
    }

    #[test]
    fn request_deserializes_edt_shapes() {
        let json = serde_json::json!({
            "seoj": "0x013001",
            "deoj": "0x0EF001",
            "esv": "SETGET",
            "operations": [
                { "epc": "0x80", "edt": "0x3101" },
                { "epc": "0x81", "edt": ["0x31", "0x01"] }
            ],
            "operations2": [
                { "epc": "0x82", "edt": [0x31, 1] },
                { "epc": "0x83" }
            ]
        });

        let req: PacketRequest = serde_json::from_value(json).unwrap();
        assert_eq!(req.tid, None);
        assert_eq!(req.operations[0].edt, Some(Edt::Hex("0x3101".into())));
        assert_eq!(
            req.operations[1].edt,
            Some(Edt::List(vec![
                EdtByte::Hex("0x31".into()),
                EdtByte::Hex("0x01".into())
            ]))
        );
        let ops2 = req.operations2.as_ref().unwrap();
        assert_eq!(
            ops2[0].edt,
            Some(Edt::List(vec![EdtByte::Num(0x31), EdtByte::Num(1)]))
        );
        assert_eq!(ops2[1].edt, None);
    }

    #[test]
    fn with_tid_leaves_source_request_untouched() {
        let req = PacketRequest {
            tid: None,
            seoj: "0x013001".into(),
            deoj: "0x0EF001".into(),
            esv: "GET".into(),
            operations: vec![OperationRequest {
                epc: "0x80".into(),
                edt: None,
            }],
            operations2: None,
        };

        let assigned = req.with_tid(42);
        assert_eq!(assigned.tid, Some(42));
        assert_eq!(req.tid, None);
        assert_eq!(assigned.seoj, req.seoj);
    }
}
