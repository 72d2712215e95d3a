// SPDX-License-Identifier: GPL-3.0-or-later

//! Decoding of the string literals the tracer prints for buffer arguments.
//!
//! The tracer prints buffers as C string literals: non-printable bytes are
//! escaped (`\n`, `\t`, `\"`, `\\`, octal `\NNN` or hexadecimal `\xHH`),
//! and buffers longer than the configured string size are cut and followed
//! by `...` after the closing quote.

const IOV_BASE: &str = "iov_base=";

/// Decodes the first string literal in the given argument text.
///
/// Returns `None` when the text does not start with a quote (e.g. the
/// tracer printed an address instead of the content).
pub fn decode_string(text: &str) -> Option<String> {
    let text = text.trim_start();
    scan_literal(text).map(|(bytes, _)| String::from_utf8_lossy(&bytes).into_owned())
}

/// Decodes and concatenates every `iov_base` literal of a vectored write.
///
/// ```
/// use adapter::trace::decode_strings;
///
/// let iov = r#"[{iov_base="foo", iov_len=3}, {iov_base="bar\n", iov_len=4}]"#;
/// assert_eq!(decode_strings(iov), "foobar\n");
/// ```
pub fn decode_strings(text: &str) -> String {
    let mut result = Vec::new();
    let mut index = 0;
    while index < text.len() {
        let rest = &text[index..];
        if let Some(literal) = rest.strip_prefix(IOV_BASE) {
            match scan_literal(literal) {
                Some((bytes, consumed)) => {
                    result.extend_from_slice(&bytes);
                    index += IOV_BASE.len() + consumed;
                }
                None => index += IOV_BASE.len(),
            }
        } else if rest.starts_with('"') {
            // Skip unrelated literals, so their content is never matched.
            index += scan_literal(rest).map_or(1, |(_, consumed)| consumed);
        } else {
            index += rest.chars().next().map_or(1, char::len_utf8);
        }
    }
    String::from_utf8_lossy(&result).into_owned()
}

/// Scans a literal that starts at the beginning of the text. Returns the
/// decoded bytes and the number of input bytes consumed (including both
/// quotes). A literal without a closing quote runs to the end of the text.
fn scan_literal(text: &str) -> Option<(Vec<u8>, usize)> {
    let body = text.strip_prefix('"')?;
    let bytes = body.as_bytes();
    let mut result = Vec::with_capacity(bytes.len());
    let mut index = 0;

    while index < bytes.len() {
        match bytes[index] {
            b'"' => return Some((result, index + 2)),
            b'\\' if index + 1 < bytes.len() => match unescape(&bytes[index + 1..]) {
                Some((byte, length)) => {
                    result.push(byte);
                    index += 1 + length;
                }
                // Kept as it was printed, the digits follow as plain bytes.
                None => {
                    result.push(b'\\');
                    index += 1;
                }
            },
            byte => {
                result.push(byte);
                index += 1;
            }
        }
    }
    Some((result, text.len()))
}

/// Decodes one escape sequence (the part after the backslash). Returns the
/// byte and the length of the sequence, or `None` when the value does not
/// fit into a byte.
fn unescape(sequence: &[u8]) -> Option<(u8, usize)> {
    let decoded = match sequence[0] {
        b'n' => (b'\n', 1),
        b't' => (b'\t', 1),
        b'r' => (b'\r', 1),
        b'v' => (0x0b, 1),
        b'f' => (0x0c, 1),
        b'a' => (0x07, 1),
        b'b' => (0x08, 1),
        b'x' => {
            let digits = count_while(&sequence[1..], 2, |b| b.is_ascii_hexdigit());
            match digits {
                0 => (b'x', 1),
                _ => (parse_radix(&sequence[1..=digits], 16)?, 1 + digits),
            }
        }
        b'0'..=b'7' => {
            let digits = count_while(sequence, 3, |b| (b'0'..=b'7').contains(&b));
            (parse_radix(&sequence[..digits], 8)?, digits)
        }
        other => (other, 1),
    };
    Some(decoded)
}

fn count_while(bytes: &[u8], limit: usize, predicate: impl Fn(u8) -> bool) -> usize {
    bytes.iter().take(limit).take_while(|b| predicate(**b)).count()
}

fn parse_radix(digits: &[u8], radix: u32) -> Option<u8> {
    let value = digits
        .iter()
        .filter_map(|digit| (*digit as char).to_digit(radix))
        .fold(0u32, |acc, digit| acc * radix + digit);
    u8::try_from(value).ok()
}
