//! ECHONET Lite service codes (ESV).
//!
//! The ESV byte identifies the operation a frame carries. Requests and
//! responses live in disjoint ranges; the `*_SNA` variants signal
//! "service not available". SETGET, SETGET_RES and SETGET_SNA form
//! the SetGet family, whose frames carry a second property list.

/// SetI: property write, no response requested.
pub const SETI: u8 = 0x60;
/// SetC: property write, response requested.
pub const SETC: u8 = 0x61;
/// Get: property read.
pub const GET: u8 = 0x62;
/// INF_REQ: notification request.
pub const INF_REQ: u8 = 0x63;
/// SetGet: combined write + read, two property lists.
pub const SETGET: u8 = 0x6E;
/// SetC response.
pub const SET_RES: u8 = 0x71;
/// Get response.
pub const GET_RES: u8 = 0x72;
/// INF: spontaneous notification.
pub const INF: u8 = 0x73;
/// INFC: notification with response required.
pub const INFC: u8 = 0x74;
/// INFC response.
pub const INFC_RES: u8 = 0x7A;
/// SetGet response, two property lists.
pub const SETGET_RES: u8 = 0x7E;
/// SetI not available.
pub const SETI_SNA: u8 = 0x50;
/// SetC not available.
pub const SETC_SNA: u8 = 0x51;
/// Get not available.
pub const GET_SNA: u8 = 0x52;
/// INF not available.
pub const INF_SNA: u8 = 0x53;
/// SetGet not available. Carries OPC = 0 and no properties.
pub const SETGET_SNA: u8 = 0x5E;

/// Fixed mnemonic table, as accepted by [`resolve`].
const NAME_CODE_MAP: &[(&str, u8)] = &[
    ("SETI", SETI),
    ("SETC", SETC),
    ("GET", GET),
    ("INF_REQ", INF_REQ),
    ("SETGET", SETGET),
    ("SET_RES", SET_RES),
    ("GET_RES", GET_RES),
    ("INF", INF),
    ("INFC", INFC),
    ("INFC_RES", INFC_RES),
    ("SETGET_RES", SETGET_RES),
    ("SETI_SNA", SETI_SNA),
    ("SETC_SNA", SETC_SNA),
    ("GET_SNA", GET_SNA),
    ("INF_SNA", INF_SNA),
    ("SETGET_SNA", SETGET_SNA),
];

/// Resolve an ESV given either as a 2-hex-digit literal (with optional
/// `0x` prefix) or as a mnemonic from the fixed table.
///
/// Matching is case-insensitive on both forms. Returns `None` for
/// anything else.
///
/// # Example
///
/// ```
/// use echonet_emulator::packet::esv;
///
/// assert_eq!(esv::resolve("0x62"), Some(esv::GET));
/// assert_eq!(esv::resolve("GET"), Some(esv::GET));
/// assert_eq!(esv::resolve("get"), Some(esv::GET));
/// assert_eq!(esv::resolve("NOPE"), None);
/// ```
pub fn resolve(name: &str) -> Option<u8> {
    let stripped = name
        .strip_prefix("0x")
        .or_else(|| name.strip_prefix("0X"))
        .unwrap_or(name);
    let upper = stripped.to_ascii_uppercase();

    if upper.len() == 2 && upper.bytes().all(|b| b.is_ascii_hexdigit()) {
        return u8::from_str_radix(&upper, 16).ok();
    }

    NAME_CODE_MAP
        .iter()
        .find(|(n, _)| *n == upper)
        .map(|&(_, code)| code)
}

/// Whether this ESV byte belongs to the SetGet family, i.e. whether a
/// frame with this ESV structurally carries a second property list.
#[inline]
pub fn is_setget_family(esv: u8) -> bool {
    matches!(esv, SETGET | SETGET_RES | SETGET_SNA)
}

/// Whether this ESV byte requires a non-empty second property list at
/// composition time (SETGET and SETGET_RES; SETGET_SNA carries none).
#[inline]
pub fn requires_operations2(esv: u8) -> bool {
    matches!(esv, SETGET | SETGET_RES)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_all_mnemonics() {
        for &(name, code) in NAME_CODE_MAP {
            assert_eq!(resolve(name), Some(code), "mnemonic {name}");
        }
    }

    #[test]
    fn resolve_hex_literal_forms() {
        assert_eq!(resolve("0x73"), Some(INF));
        assert_eq!(resolve("73"), Some(INF));
        assert_eq!(resolve("0X7E"), Some(SETGET_RES));
        assert_eq!(resolve("5e"), Some(SETGET_SNA));
    }

    #[test]
    fn resolve_case_insensitive_mnemonic() {
        assert_eq!(resolve("setget_res"), Some(SETGET_RES));
        assert_eq!(resolve("inf_req"), Some(INF_REQ));
    }

    #[test]
    fn resolve_rejects_unknown() {
        assert_eq!(resolve(""), None);
        assert_eq!(resolve("GETT"), None);
        assert_eq!(resolve("0x7"), None);
        assert_eq!(resolve("0x123"), None);
        assert_eq!(resolve("zz"), None);
    }

    #[test]
    fn setget_family_membership() {
        assert!(is_setget_family(SETGET));
        assert!(is_setget_family(SETGET_RES));
        assert!(is_setget_family(SETGET_SNA));
        assert!(!is_setget_family(GET));
        assert!(!is_setget_family(INF));

        assert!(requires_operations2(SETGET));
        assert!(requires_operations2(SETGET_RES));
        assert!(!requires_operations2(SETGET_SNA));
    }
}
