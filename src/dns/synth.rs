//! Blocked-response synthesis.
//!
//! Blocked queries are answered locally by rewriting the query bytes into
//! an NXDOMAIN response: the transaction id and question section echo
//! verbatim, only the flag bytes and the answer count change.

use serde_json::{Value, json};

use super::wire::HEADER_LEN;

/// QR bit of header byte 2.
const FLAG_QR: u8 = 0x80;

/// RA bit of header byte 3.
const FLAG_RA: u8 = 0x80;

/// NXDOMAIN response code, low nibble of header byte 3.
const RCODE_NXDOMAIN: u8 = 0x03;

/// Build an NXDOMAIN response from the raw query bytes.
///
/// Byte 2 gets QR set with opcode and RD left as the client sent them;
/// byte 3 becomes RA plus RCODE 3. ANCOUNT is zeroed explicitly since no
/// answer records are appended, regardless of what the query declared.
///
/// Never fails: input shorter than a header is padded to one, so even a
/// garbage query produces a well-formed (if empty) response.
pub fn blocked_response(raw_query: &[u8]) -> Vec<u8> {
    let mut response = raw_query.to_vec();
    if response.len() < HEADER_LEN {
        response.resize(HEADER_LEN, 0);
    }

    response[2] |= FLAG_QR;
    response[3] = FLAG_RA | RCODE_NXDOMAIN;
    response[6] = 0;
    response[7] = 0;

    response
}

/// Build the dns-json body for a blocked name: NXDOMAIN status, the
/// question echoed, no answers.
pub fn blocked_json(name: &str, rtype: &str) -> Value {
    json!({
        "Status": 3,
        "Question": [{ "name": name, "type": rtype }],
        "Answer": [],
    })
}
