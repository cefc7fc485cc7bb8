//! Wire-format helpers for the gateway protocol.
//!
//! Every value on the wire is an ASCII field terminated by a NUL byte.
//! The connect handshake is: client sends its protocol version, the server
//! answers with its own version and a formatted connection time, the client
//! finishes by announcing its client id.

/// Protocol version this client announces during the handshake.
pub const CLIENT_VERSION: i32 = 63;

/// Hard cap on a single field, to bound reads against a garbled peer.
pub const MAX_FIELD_LEN: usize = 1024;

/// Error code the gateway uses for "couldn't connect".
pub const ERR_CODE_CONNECT_FAIL: i64 = 502;

/// Encode one value as a NUL-terminated field.
pub fn encode_field(value: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(value.len() + 1);
    buf.extend_from_slice(value.as_bytes());
    buf.push(0);
    buf
}

/// Split the first field off a buffer, returning `(field, rest)`.
///
/// Returns `None` when the buffer holds no complete field yet.
pub fn parse_field(buf: &[u8]) -> Option<(&str, &[u8])> {
    let nul = buf.iter().position(|&b| b == 0)?;
    let field = std::str::from_utf8(&buf[..nul]).ok()?;
    Some((field, &buf[nul + 1..]))
}

/// Names of every incoming message type the gateway can deliver.
///
/// The demo harness reports the size of this catalog as an import sanity
/// check; the list follows the gateway's reader tables.
pub fn message_type_names() -> &'static [&'static str] {
    MESSAGE_TYPE_NAMES
}

static MESSAGE_TYPE_NAMES: &[&str] = &[
    "tickPrice",
    "tickSize",
    "tickOptionComputation",
    "tickGeneric",
    "tickString",
    "tickEFP",
    "orderStatus",
    "openOrder",
    "openOrderEnd",
    "updateAccountValue",
    "updatePortfolio",
    "updateAccountTime",
    "accountDownloadEnd",
    "nextValidId",
    "contractDetails",
    "contractDetailsEnd",
    "bondContractDetails",
    "execDetails",
    "execDetailsEnd",
    "updateMktDepth",
    "updateMktDepthL2",
    "updateNewsBulletin",
    "managedAccounts",
    "receiveFA",
    "historicalData",
    "scannerParameters",
    "scannerData",
    "scannerDataEnd",
    "realtimeBar",
    "currentTime",
    "fundamentalData",
    "deltaNeutralValidation",
    "tickSnapshotEnd",
    "marketDataType",
    "commissionReport",
    "position",
    "positionEnd",
    "accountSummary",
    "accountSummaryEnd",
    "verifyMessageAPI",
    "verifyCompleted",
    "displayGroupList",
    "displayGroupUpdated",
    "error",
    "connectionClosed",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_field_terminates() {
        assert_eq!(encode_field("63"), b"63\0");
        assert_eq!(encode_field(""), b"\0");
    }

    #[test]
    fn test_parse_field_splits_at_nul() {
        let buf = b"76\x0020260808 09:30:00 EST\x00";
        let (version, rest) = parse_field(buf).unwrap();
        assert_eq!(version, "76");
        let (time, rest) = parse_field(rest).unwrap();
        assert_eq!(time, "20260808 09:30:00 EST");
        assert!(rest.is_empty());
        assert!(parse_field(b"incomplete").is_none());
    }

    #[test]
    fn test_catalog_covers_connection_notices() {
        let names = message_type_names();
        assert_eq!(names.len(), 45);
        assert!(names.contains(&"error"));
        assert!(names.contains(&"connectionClosed"));
        assert!(names.contains(&"nextValidId"));
    }
}
