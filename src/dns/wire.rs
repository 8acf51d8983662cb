//! Question extraction from raw DNS messages.
//!
//! Works directly on the wire bytes instead of decoding a full message:
//! the proxy only needs the queried name and type, and malformed input
//! must degrade to "unparsed" rather than fail the request.

/// Fixed DNS header length.
pub const HEADER_LEN: usize = 12;

/// QTYPE for A records, also the default when the type cannot be read.
pub const QTYPE_A: u16 = 1;

/// Longest permitted label.
const MAX_LABEL_LEN: usize = 63;

/// Top two bits set marks a compression pointer.
const POINTER_MASK: usize = 0xC0;

/// Upper bound on pointer follows. A crafted message can point at itself
/// or form a cycle; past this bound extraction stops with whatever labels
/// were collected.
const MAX_POINTER_JUMPS: usize = 5;

/// The question section of a DNS message.
///
/// `name` is the normalized (lower-cased, dot-joined) queried domain. An
/// empty name means the message could not be parsed; such queries are
/// never classified, only forwarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub name: String,
    pub qtype: u16,
}

impl Question {
    /// Whether extraction failed to produce a domain name.
    #[inline]
    pub fn is_unparsed(&self) -> bool {
        self.name.is_empty()
    }
}

/// Extract the question from a raw DNS message.
///
/// Parsing starts at the question section (offset 12) and walks the
/// length-prefixed labels:
///
/// - `0` terminates the name,
/// - `>= 192` is a compression pointer (14-bit offset from the low 6 bits
///   plus the following byte),
/// - `1..=63` is an ordinary label,
/// - anything else is invalid and stops extraction with the labels
///   collected so far.
///
/// Only the first pointer advances the post-name cursor; pointer chains
/// after that move the read position without touching where the query
/// type is read from. Labels are decoded byte-for-byte, so names that
/// are not valid UTF-8 on the wire still classify deterministically.
///
/// This function never fails: truncated or hostile input yields a
/// partial (possibly empty) name and the default query type.
pub fn parse_question(raw: &[u8]) -> Question {
    if raw.len() < HEADER_LEN {
        return Question {
            name: String::new(),
            qtype: QTYPE_A,
        };
    }

    let mut labels: Vec<String> = Vec::new();
    // `pos` is where the next length byte is read; `cursor` tracks the
    // position in the original stream just past the encoded name.
    let mut pos = HEADER_LEN;
    let mut cursor = HEADER_LEN;
    let mut followed_pointer = false;
    let mut jumps = 0;

    loop {
        let Some(&len_byte) = raw.get(pos) else {
            break;
        };
        let len = len_byte as usize;

        if len == 0 {
            if !followed_pointer {
                cursor = pos + 1;
            }
            break;
        }

        if len & POINTER_MASK == POINTER_MASK {
            if jumps >= MAX_POINTER_JUMPS {
                break;
            }
            let Some(&low) = raw.get(pos + 1) else {
                break;
            };
            if !followed_pointer {
                cursor = pos + 2;
                followed_pointer = true;
            }
            pos = ((len & 0x3F) << 8) | low as usize;
            jumps += 1;
            continue;
        }

        if len > MAX_LABEL_LEN {
            // 64..=191 is not a valid label length and not a pointer.
            break;
        }

        let Some(bytes) = raw.get(pos + 1..pos + 1 + len) else {
            break;
        };
        labels.push(bytes.iter().map(|&b| b as char).collect());
        pos += 1 + len;
        if !followed_pointer {
            cursor = pos;
        }
    }

    let mut name = labels.join(".");
    name.make_ascii_lowercase();

    let qtype = match raw.get(cursor..cursor + 2) {
        Some(bytes) => u16::from_be_bytes([bytes[0], bytes[1]]),
        None => QTYPE_A,
    };

    Question { name, qtype }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a single-question message the way a stub resolver would.
    fn build_query(domain: &str, qtype: u16) -> Vec<u8> {
        let mut message = vec![
            0x12, 0x34, // transaction id
            0x01, 0x00, // flags: RD set
            0x00, 0x01, // QDCOUNT = 1
            0x00, 0x00, // ANCOUNT
            0x00, 0x00, // NSCOUNT
            0x00, 0x00, // ARCOUNT
        ];
        for label in domain.split('.') {
            message.push(label.len() as u8);
            message.extend_from_slice(label.as_bytes());
        }
        message.push(0);
        message.extend_from_slice(&qtype.to_be_bytes());
        message.extend_from_slice(&[0x00, 0x01]); // QCLASS = IN
        message
    }

    #[test]
    fn should_extract_name_and_type_from_simple_query() {
        let raw = build_query("example.com", 1);
        let question = parse_question(&raw);

        assert_eq!(question.name, "example.com");
        assert_eq!(question.qtype, 1);
        assert!(!question.is_unparsed());
    }

    #[test]
    fn should_extract_aaaa_query_type() {
        let raw = build_query("example.com", 28);
        assert_eq!(parse_question(&raw).qtype, 28);
    }

    #[test]
    fn should_lowercase_extracted_names() {
        let raw = build_query("ExAmPlE.COM", 1);
        assert_eq!(parse_question(&raw).name, "example.com");
    }

    #[test]
    fn should_return_empty_name_for_short_message() {
        let question = parse_question(&[0x12, 0x34, 0x01]);

        assert!(question.is_unparsed());
        assert_eq!(question.qtype, QTYPE_A);
    }

    #[test]
    fn should_return_empty_name_for_header_only_message() {
        let raw = build_query("example.com", 1);
        let question = parse_question(&raw[..HEADER_LEN]);

        assert!(question.is_unparsed());
        assert_eq!(question.qtype, QTYPE_A);
    }

    #[test]
    fn should_resolve_compression_pointer_to_same_name() {
        // Question holds only a pointer to a name stored later in the
        // message; must parse identically to the uncompressed form.
        let mut raw = vec![
            0xab, 0xcd, 0x01, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ];
        raw.extend_from_slice(&[0xC0, 0x14]); // pointer to offset 20
        raw.extend_from_slice(&[0x00, 0x1C]); // QTYPE = AAAA, read after the pointer
        raw.extend_from_slice(&[0x00, 0x01]); // QCLASS
        raw.extend_from_slice(&[0x00, 0x00]); // padding up to offset 20
        raw.push(7);
        raw.extend_from_slice(b"example");
        raw.push(3);
        raw.extend_from_slice(b"com");
        raw.push(0);

        let question = parse_question(&raw);
        let uncompressed = parse_question(&build_query("example.com", 28));

        assert_eq!(question.name, uncompressed.name);
        assert_eq!(question.qtype, 28);
    }

    #[test]
    fn should_follow_pointer_mid_name_and_keep_cursor_at_first_pointer() {
        // "www" label inline, then a pointer to "example.com" stored at
        // offset 22. The query type sits right after the first pointer.
        let mut raw = vec![
            0xab, 0xcd, 0x01, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ];
        raw.push(3);
        raw.extend_from_slice(b"www"); // bytes 12..16
        raw.extend_from_slice(&[0xC0, 0x16]); // pointer to offset 22
        raw.extend_from_slice(&[0x00, 0x0F]); // QTYPE = MX at bytes 18..20
        raw.extend_from_slice(&[0x00, 0x01]); // QCLASS
        raw.push(7);
        raw.extend_from_slice(b"example");
        raw.push(3);
        raw.extend_from_slice(b"com");
        raw.push(0);

        let question = parse_question(&raw);

        assert_eq!(question.name, "www.example.com");
        assert_eq!(question.qtype, 15);
    }

    #[test]
    fn should_terminate_on_self_referencing_pointer() {
        // Pointer at offset 12 referencing offset 12: a cycle. Must stop
        // within the jump bound instead of spinning.
        let raw = vec![
            0x00, 0x01, 0x01, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xC0, 0x0C,
        ];

        let question = parse_question(&raw);

        assert!(question.is_unparsed());
        assert_eq!(question.qtype, QTYPE_A);
    }

    #[test]
    fn should_keep_labels_collected_before_pointer_cycle() {
        // One real label, then a pointer back to the start of the name.
        let mut raw = vec![
            0x00, 0x01, 0x01, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ];
        raw.push(3);
        raw.extend_from_slice(b"ads");
        raw.extend_from_slice(&[0xC0, 0x0C]); // back to offset 12

        let question = parse_question(&raw);

        // Each bounded jump re-reads the same label; the name is partial
        // but extraction terminates.
        assert!(question.name.starts_with("ads"));
        assert!(question.name.split('.').count() <= 1 + MAX_POINTER_JUMPS);
    }

    #[test]
    fn should_stop_gracefully_on_invalid_label_length() {
        // 0x40 is neither a label (<= 63), a terminator, nor a pointer.
        let mut raw = vec![
            0x00, 0x01, 0x01, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ];
        raw.push(7);
        raw.extend_from_slice(b"example");
        raw.push(0x40);

        let question = parse_question(&raw);

        assert_eq!(question.name, "example");
        assert_eq!(question.qtype, QTYPE_A);
    }

    #[test]
    fn should_return_partial_name_for_truncated_label() {
        let raw = build_query("sub.example.com", 1);
        // Cut inside the "example" label bytes.
        let question = parse_question(&raw[..17]);

        assert_eq!(question.name, "sub");
        assert_eq!(question.qtype, QTYPE_A);
    }

    #[test]
    fn should_default_query_type_when_truncated_after_name() {
        let raw = build_query("example.com", 28);
        // Keep the name and terminator, drop QTYPE/QCLASS.
        let question = parse_question(&raw[..raw.len() - 4]);

        assert_eq!(question.name, "example.com");
        assert_eq!(question.qtype, QTYPE_A);
    }

    #[test]
    fn should_decode_labels_as_raw_bytes() {
        let mut raw = vec![
            0x00, 0x01, 0x01, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ];
        raw.push(2);
        raw.extend_from_slice(&[0xE9, 0x21]); // not valid UTF-8 as a label
        raw.push(0);
        raw.extend_from_slice(&[0x00, 0x01, 0x00, 0x01]);

        let question = parse_question(&raw);

        assert_eq!(question.name.chars().count(), 2);
        assert_eq!(question.qtype, 1);
    }
}
