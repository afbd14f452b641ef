//! MIME transfer encodings.
//!
//! Supports Base64 (with fixed-width line wrapping for message bodies) and
//! Quoted-Printable.

use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use base64::write::EncoderWriter;
use std::fmt::Write as _;
use std::io::{self, Write};

/// Maximum number of Base64 characters on one body line.
pub const BASE64_LINE_LENGTH: usize = 72;

/// Maximum line length for Quoted-Printable encoding, soft break included.
const QP_MAX_LINE_LENGTH: usize = 76;

/// Encodes data as Base64 on a single line.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decodes Base64 data.
///
/// # Errors
///
/// Returns an error if the input is not valid Base64.
pub fn decode_base64(data: &str) -> Result<Vec<u8>> {
    STANDARD.decode(data).map_err(Into::into)
}

/// Writer that breaks its output into lines of a fixed width.
///
/// Every byte written is forwarded to the inner sink; a CRLF is inserted
/// before a byte that would exceed the line width. Writes that straddle a
/// line end are split, so nothing is lost or duplicated. No CRLF follows the
/// final byte.
#[derive(Debug)]
pub struct LineWrapWriter<W> {
    inner: W,
    width: usize,
    column: usize,
}

impl<W: Write> LineWrapWriter<W> {
    /// Wraps `inner`, breaking lines after `width` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `width` is zero.
    #[must_use]
    pub fn new(inner: W, width: usize) -> Self {
        assert!(width > 0, "line width must be non-zero");
        Self {
            inner,
            width,
            column: 0,
        }
    }

    /// Returns the number of bytes on the current line.
    #[must_use]
    pub const fn column(&self) -> usize {
        self.column
    }

    /// Returns the inner sink.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for LineWrapWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut rest = buf;
        while !rest.is_empty() {
            if self.column == self.width {
                self.inner.write_all(b"\r\n")?;
                self.column = 0;
            }

            let take = (self.width - self.column).min(rest.len());
            self.inner.write_all(&rest[..take])?;
            self.column += take;
            rest = &rest[take..];
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Streams `data` as Base64 into `out`, wrapped at [`BASE64_LINE_LENGTH`].
///
/// # Errors
///
/// Returns an error if writing to `out` fails.
pub fn write_base64_wrapped<W: Write>(data: &[u8], out: W) -> io::Result<W> {
    let wrap = LineWrapWriter::new(out, BASE64_LINE_LENGTH);
    let mut encoder = EncoderWriter::new(wrap, &STANDARD);
    encoder.write_all(data)?;
    let wrap = encoder.finish()?;
    Ok(wrap.into_inner())
}

/// Encodes data as Base64 wrapped at [`BASE64_LINE_LENGTH`] with CRLF.
#[must_use]
pub fn encode_base64_wrapped(data: &[u8]) -> String {
    // Writing into a Vec cannot fail and Base64 output is ASCII.
    let out = write_base64_wrapped(data, Vec::new()).unwrap_or_default();
    String::from_utf8(out).unwrap_or_default()
}

/// Encodes bytes using Quoted-Printable encoding (RFC 2045).
///
/// CRLF pairs are kept as hard line breaks. Bare CR and LF, `=`, control
/// characters and non-ASCII bytes are escaped as `=XX`. Spaces and tabs are
/// escaped when they would end a line. Long lines get `=` soft breaks so no
/// line exceeds 76 characters.
#[must_use]
pub fn encode_quoted_printable(data: &[u8]) -> String {
    let mut result = String::with_capacity(data.len() + data.len() / 8);
    let mut line_length = 0;
    let mut i = 0;

    while i < data.len() {
        let byte = data[i];

        if byte == b'\r' && data.get(i + 1) == Some(&b'\n') {
            result.push_str("\r\n");
            line_length = 0;
            i += 2;
            continue;
        }

        let at_line_end = i + 1 == data.len() || data[i + 1..].starts_with(b"\r\n");
        let literal = match byte {
            b'!'..=b'<' | b'>'..=b'~' => true,
            b' ' | b'\t' => !at_line_end,
            _ => false,
        };
        let width = if literal { 1 } else { 3 };

        // Leave room for the '=' of a soft break
        if line_length + width > QP_MAX_LINE_LENGTH - 1 {
            result.push_str("=\r\n");
            line_length = 0;
        }

        if literal {
            result.push(char::from(byte));
        } else {
            let _ = write!(result, "={byte:02X}");
        }
        line_length += width;
        i += 1;
    }

    result
}

/// Decodes Quoted-Printable text (RFC 2045).
///
/// # Errors
///
/// Returns an error if the input contains invalid escape sequences.
pub fn decode_quoted_printable(text: &str) -> Result<Vec<u8>> {
    let bytes = text.as_bytes();
    let mut result = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'=' {
            result.push(bytes[i]);
            i += 1;
            continue;
        }

        let rest = &bytes[i + 1..];
        if rest.starts_with(b"\r\n") {
            i += 3;
        } else if rest.starts_with(b"\n") {
            i += 2;
        } else if rest.len() >= 2 {
            let hex = std::str::from_utf8(&rest[..2])
                .map_err(|_| Error::InvalidEncoding("Invalid hex escape".to_string()))?;
            let byte = u8::from_str_radix(hex, 16)
                .map_err(|e| Error::InvalidEncoding(format!("Invalid hex: {e}")))?;
            result.push(byte);
            i += 3;
        } else {
            return Err(Error::InvalidEncoding(
                "Incomplete escape sequence".to_string(),
            ));
        }
    }

    Ok(result)
}

/// Converts bare LF and CR line breaks to CRLF.
///
/// MIME text bodies use CRLF line breaks in canonical form.
#[must_use]
pub fn normalize_line_endings(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 32);
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push_str("\r\n");
            }
            '\n' => out.push_str("\r\n"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn unwrap_lines(wrapped: &str) -> String {
        wrapped.replace("\r\n", "")
    }

    #[test]
    fn test_base64_encode_decode() {
        let data = b"Hello, World!";
        let encoded = encode_base64(data);
        assert_eq!(encoded, "SGVsbG8sIFdvcmxkIQ==");

        let decoded = decode_base64(&encoded).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn test_line_wrap_splits_writes() {
        let mut wrap = LineWrapWriter::new(Vec::new(), 4);
        wrap.write_all(b"abc").unwrap();
        wrap.write_all(b"defgh").unwrap();
        wrap.write_all(b"ijkl").unwrap();
        assert_eq!(wrap.column(), 4);
        assert_eq!(wrap.into_inner(), b"abcd\r\nefgh\r\nijkl");
    }

    #[test]
    fn test_line_wrap_empty_write() {
        let mut wrap = LineWrapWriter::new(Vec::new(), 4);
        assert_eq!(wrap.write(b"").unwrap(), 0);
        assert!(wrap.into_inner().is_empty());
    }

    #[test]
    fn test_base64_wrapped_lengths() {
        for len in [0_usize, 1, 53, 54, 55, 71, 72, 73, 1000, 4099] {
            let data: Vec<u8> = (0..len).map(|i| (i * 7 % 256) as u8).collect();
            let wrapped = encode_base64_wrapped(&data);

            for line in wrapped.split("\r\n") {
                assert!(line.len() <= BASE64_LINE_LENGTH, "len {len}: {line}");
            }
            assert!(!wrapped.ends_with("\r\n"));

            let decoded = decode_base64(&unwrap_lines(&wrapped)).unwrap();
            assert_eq!(decoded, data, "round trip failed for length {len}");
        }
    }

    #[test]
    fn test_base64_wrapped_full_lines() {
        // 54 input bytes make exactly one 72 character line
        let wrapped = encode_base64_wrapped(&[0u8; 108]);
        let lines: Vec<&str> = wrapped.split("\r\n").collect();
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|l| l.len() == BASE64_LINE_LENGTH));
    }

    #[test]
    fn test_base64_wrapped_literal() {
        assert_eq!(encode_base64_wrapped(b"Hello, world!"), "SGVsbG8sIHdvcmxkIQ==");
    }

    #[test]
    fn test_quoted_printable_encode() {
        assert_eq!(encode_quoted_printable(b"Hello, World!"), "Hello, World!");
        assert_eq!(encode_quoted_printable(b""), "");

        let encoded = encode_quoted_printable("Héllo, Wørld!".as_bytes());
        assert_eq!(encoded, "H=C3=A9llo, W=C3=B8rld!");
    }

    #[test]
    fn test_quoted_printable_escapes_equals_and_controls() {
        assert_eq!(encode_quoted_printable(b"a=b"), "a=3Db");
        assert_eq!(encode_quoted_printable(b"a\nb"), "a=0Ab");
        assert_eq!(encode_quoted_printable(b"\x00\x7f"), "=00=7F");
    }

    #[test]
    fn test_quoted_printable_trailing_whitespace() {
        assert_eq!(encode_quoted_printable(b"end \r\nnext\t"), "end=20\r\nnext=09");
        assert_eq!(encode_quoted_printable(b"a b"), "a b");
    }

    #[test]
    fn test_quoted_printable_soft_breaks() {
        let text = "x".repeat(200);
        let encoded = encode_quoted_printable(text.as_bytes());
        for line in encoded.split("\r\n") {
            assert!(line.len() <= QP_MAX_LINE_LENGTH);
        }
        assert_eq!(decode_quoted_printable(&encoded).unwrap(), text.as_bytes());
    }

    #[test]
    fn test_quoted_printable_never_splits_escape() {
        let text = "é".repeat(60);
        let encoded = encode_quoted_printable(text.as_bytes());
        for line in encoded.split("\r\n") {
            let body = line.strip_suffix('=').unwrap_or(line);
            assert_eq!(body.len() % 3, 0, "escape split in {line}");
        }
    }

    #[test]
    fn test_quoted_printable_decode() {
        assert_eq!(decode_quoted_printable("Hello, World!").unwrap(), b"Hello, World!");
        assert_eq!(decode_quoted_printable("H=C3=A9llo").unwrap(), "Héllo".as_bytes());
        assert_eq!(decode_quoted_printable("h=c3=a9").unwrap(), "hé".as_bytes());
    }

    #[test]
    fn test_quoted_printable_soft_line_break() {
        let decoded = decode_quoted_printable("Hello=\r\nWorld").unwrap();
        assert_eq!(decoded, b"HelloWorld");
        let decoded = decode_quoted_printable("Hello=\nWorld").unwrap();
        assert_eq!(decoded, b"HelloWorld");
    }

    #[test]
    fn test_quoted_printable_decode_errors() {
        assert!(decode_quoted_printable("abc=4").is_err());
        assert!(decode_quoted_printable("abc=ZZ").is_err());
    }

    #[test]
    fn test_normalize_line_endings() {
        assert_eq!(normalize_line_endings("a\nb\r\nc\rd"), "a\r\nb\r\nc\r\nd");
        assert_eq!(normalize_line_endings(""), "");
    }

    proptest! {
        #[test]
        fn prop_quoted_printable_round_trip(data in proptest::collection::vec(any::<u8>(), 0..600)) {
            let encoded = encode_quoted_printable(&data);
            prop_assert!(encoded.is_ascii());
            for line in encoded.split("\r\n") {
                prop_assert!(line.len() <= QP_MAX_LINE_LENGTH);
            }
            prop_assert_eq!(decode_quoted_printable(&encoded).unwrap(), data);
        }

        #[test]
        fn prop_base64_wrapped_round_trip(data in proptest::collection::vec(any::<u8>(), 0..2000)) {
            let wrapped = encode_base64_wrapped(&data);
            for line in wrapped.split("\r\n") {
                prop_assert!(line.len() <= BASE64_LINE_LENGTH);
            }
            prop_assert_eq!(decode_base64(&unwrap_lines(&wrapped)).unwrap(), data);
        }
    }
}
