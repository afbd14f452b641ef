//! MIME message structure and parsing.

use crate::content_type::ContentType;
use crate::encoding::{decode_base64, decode_quoted_printable};
use crate::error::{Error, Result};
use crate::header::Headers;
use std::fmt;

/// Transfer encoding types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    /// 7-bit ASCII.
    SevenBit,
    /// 8-bit binary.
    EightBit,
    /// Base64 encoding.
    Base64,
    /// Quoted-Printable encoding.
    QuotedPrintable,
    /// Binary (no encoding).
    Binary,
}

impl TransferEncoding {
    /// Parses transfer encoding from string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "8bit" => Self::EightBit,
            "base64" => Self::Base64,
            "quoted-printable" => Self::QuotedPrintable,
            "binary" => Self::Binary,
            _ => Self::SevenBit, // Default (includes "7bit")
        }
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SevenBit => write!(f, "7bit"),
            Self::EightBit => write!(f, "8bit"),
            Self::Base64 => write!(f, "base64"),
            Self::QuotedPrintable => write!(f, "quoted-printable"),
            Self::Binary => write!(f, "binary"),
        }
    }
}

/// One node of a MIME tree.
///
/// Multipart nodes keep their children in `parts`; leaf nodes keep their
/// still-encoded content in `body`.
#[derive(Debug, Clone, Default)]
pub struct Part {
    /// Part headers.
    pub headers: Headers,
    /// Raw body bytes (the preamble area for multipart nodes).
    pub body: Vec<u8>,
    /// Child parts of a multipart node.
    pub parts: Vec<Part>,
}

impl Part {
    /// Parses a header block and body, descending into multipart bodies.
    ///
    /// # Errors
    ///
    /// Returns an error if headers are malformed, a multipart type lacks a
    /// boundary, or a multipart body is not terminated.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let (head, body) = split_head(raw);
        let headers = Headers::parse(&String::from_utf8_lossy(head))?;

        let mut part = Self {
            headers,
            body: body.to_vec(),
            parts: Vec::new(),
        };

        let content_type = part.content_type()?;
        if content_type.is_multipart() {
            let boundary = content_type.boundary().ok_or(Error::MissingBoundary)?;
            part.parts = split_multipart(body, boundary)?
                .into_iter()
                .map(Self::parse)
                .collect::<Result<_>>()?;
            part.body.clear();
        }

        Ok(part)
    }

    /// Gets the content type, defaulting to `text/plain`.
    ///
    /// # Errors
    ///
    /// Returns an error if content type header is invalid.
    pub fn content_type(&self) -> Result<ContentType> {
        self.headers
            .get("content-type")
            .map_or_else(|| Ok(ContentType::text_plain()), ContentType::parse)
    }

    /// Gets the transfer encoding.
    #[must_use]
    pub fn transfer_encoding(&self) -> TransferEncoding {
        self.headers
            .get("content-transfer-encoding")
            .map_or(TransferEncoding::SevenBit, TransferEncoding::parse)
    }

    /// Returns the `Content-ID` without angle brackets.
    #[must_use]
    pub fn content_id(&self) -> Option<&str> {
        self.headers
            .get("content-id")
            .map(|id| id.trim().trim_start_matches('<').trim_end_matches('>'))
    }

    /// Decodes the body according to the transfer encoding.
    ///
    /// # Errors
    ///
    /// Returns an error if decoding fails.
    pub fn decode_body(&self) -> Result<Vec<u8>> {
        match self.transfer_encoding() {
            TransferEncoding::Base64 => {
                let body_str = String::from_utf8_lossy(&self.body);
                // Remove line breaks for lenient parsing
                let cleaned: String = body_str.chars().filter(|c| !c.is_whitespace()).collect();
                decode_base64(&cleaned)
            }
            TransferEncoding::QuotedPrintable => {
                decode_quoted_printable(&String::from_utf8_lossy(&self.body))
            }
            _ => Ok(self.body.clone()),
        }
    }

    /// Gets the decoded body as a string.
    ///
    /// # Errors
    ///
    /// Returns an error if decoding or UTF-8 conversion fails.
    pub fn body_text(&self) -> Result<String> {
        let decoded = self.decode_body()?;
        String::from_utf8(decoded).map_err(Into::into)
    }

    /// Finds the first leaf part with the given type, depth first.
    ///
    /// # Errors
    ///
    /// Returns an error if a content type header is invalid.
    pub fn find(&self, main_type: &str, sub_type: &str) -> Result<Option<&Self>> {
        if self.content_type()?.is(main_type, sub_type) {
            return Ok(Some(self));
        }
        for part in &self.parts {
            if let Some(found) = part.find(main_type, sub_type)? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }
}

/// A parsed MIME message: top-level headers plus the body tree.
#[derive(Debug, Clone)]
pub struct Message {
    /// Message headers.
    pub headers: Headers,
    /// Body of a single-part message.
    pub body: Vec<u8>,
    /// Parts of a multipart message.
    pub parts: Vec<Part>,
}

impl Message {
    /// Parses a serialized message.
    ///
    /// # Errors
    ///
    /// Returns an error if the message structure is invalid.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let Part {
            headers,
            body,
            parts,
        } = Part::parse(raw)?;
        Ok(Self {
            headers,
            body,
            parts,
        })
    }

    /// Gets the content type.
    ///
    /// # Errors
    ///
    /// Returns an error if content type header is invalid.
    pub fn content_type(&self) -> Result<ContentType> {
        self.headers
            .get("content-type")
            .map_or_else(|| Ok(ContentType::text_plain()), ContentType::parse)
    }

    /// Gets the From header.
    #[must_use]
    pub fn from(&self) -> Option<&str> {
        self.headers.get("from")
    }

    /// Gets the To header.
    #[must_use]
    pub fn to(&self) -> Option<&str> {
        self.headers.get("to")
    }

    /// Gets the Subject header.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.headers.get("subject")
    }

    /// Finds the first text/plain part and decodes it.
    ///
    /// # Errors
    ///
    /// Returns an error if no text part is found or decoding fails.
    pub fn text_part(&self) -> Result<String> {
        self.find_text("plain")
    }

    /// Finds the first text/html part and decodes it.
    ///
    /// # Errors
    ///
    /// Returns an error if no HTML part is found or decoding fails.
    pub fn html_part(&self) -> Result<String> {
        self.find_text("html")
    }

    fn find_text(&self, sub_type: &str) -> Result<String> {
        for part in &self.parts {
            if let Some(found) = part.find("text", sub_type)? {
                return found.body_text();
            }
        }
        Err(Error::Parse(format!("No text/{sub_type} part found")))
    }
}

/// Splits raw bytes at the blank line ending the header block.
fn split_head(raw: &[u8]) -> (&[u8], &[u8]) {
    if raw.starts_with(b"\r\n") {
        return (&[], &raw[2..]);
    }
    if let Some(pos) = find(raw, b"\r\n\r\n") {
        (&raw[..pos + 2], &raw[pos + 4..])
    } else if let Some(pos) = find(raw, b"\n\n") {
        (&raw[..pos + 1], &raw[pos + 2..])
    } else {
        (raw, &[])
    }
}

/// Returns the raw contents of each part between `--boundary` delimiters.
fn split_multipart<'a>(body: &'a [u8], boundary: &str) -> Result<Vec<&'a [u8]>> {
    let delimiter = format!("--{boundary}");
    let delimiter = delimiter.as_bytes();

    // The first delimiter may open the body without a preceding CRLF
    let mut rest = if body.starts_with(delimiter) {
        &body[delimiter.len()..]
    } else {
        let pos = find(body, &[&b"\r\n"[..], delimiter].concat())
            .ok_or_else(|| Error::InvalidMultipart(format!("No delimiter for {boundary}")))?;
        &body[pos + 2 + delimiter.len()..]
    };

    let mut parts = Vec::new();
    loop {
        if rest.starts_with(b"--") {
            return Ok(parts);
        }
        let Some(content_start) = find(rest, b"\r\n") else {
            return Err(Error::InvalidMultipart("Truncated delimiter line".into()));
        };
        let content = &rest[content_start + 2..];

        let next = [&b"\r\n"[..], delimiter].concat();
        let end = find(content, &next)
            .ok_or_else(|| Error::InvalidMultipart(format!("Unterminated part in {boundary}")))?;
        parts.push(&content[..end]);
        rest = &content[end + next.len()..];
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
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

    #[test]
    fn test_transfer_encoding_parse() {
        assert_eq!(TransferEncoding::parse("7bit"), TransferEncoding::SevenBit);
        assert_eq!(TransferEncoding::parse("BASE64"), TransferEncoding::Base64);
        assert_eq!(
            TransferEncoding::parse("quoted-printable"),
            TransferEncoding::QuotedPrintable
        );
    }

    #[test]
    fn test_message_single_part() {
        let raw = b"From: sender@example.com\r\nTo: recipient@example.com\r\nSubject: Test\r\n\r\nHello, World!";
        let message = Message::parse(raw).unwrap();

        assert_eq!(message.from(), Some("sender@example.com"));
        assert_eq!(message.to(), Some("recipient@example.com"));
        assert_eq!(message.subject(), Some("Test"));
        assert!(message.parts.is_empty());
        assert_eq!(message.body, b"Hello, World!");
    }

    #[test]
    fn test_message_nested_multipart() {
        let raw = concat!(
            "Content-Type: multipart/mixed; boundary=outer\r\n",
            "\r\n",
            "--outer\r\n",
            "Content-Type: multipart/alternative; boundary=inner\r\n",
            "\r\n",
            "--inner\r\n",
            "Content-Type: text/plain\r\n",
            "Content-Transfer-Encoding: quoted-printable\r\n",
            "\r\n",
            "caf=C3=A9\r\n",
            "--inner\r\n",
            "Content-Type: text/html\r\n",
            "\r\n",
            "<p>hi</p>\r\n",
            "--inner--\r\n",
            "\r\n",
            "--outer\r\n",
            "Content-Type: image/png\r\n",
            "Content-ID: <7>\r\n",
            "Content-Transfer-Encoding: base64\r\n",
            "\r\n",
            "AAEC\r\n",
            "AwQ=\r\n",
            "--outer--\r\n",
        );

        let message = Message::parse(raw.as_bytes()).unwrap();
        assert_eq!(message.parts.len(), 2);

        let alternative = &message.parts[0];
        assert!(alternative.content_type().unwrap().is("multipart", "alternative"));
        assert_eq!(alternative.parts.len(), 2);

        assert_eq!(message.text_part().unwrap(), "café");
        assert_eq!(message.html_part().unwrap(), "<p>hi</p>");

        let image = &message.parts[1];
        assert_eq!(image.content_id(), Some("7"));
        assert_eq!(image.decode_body().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_missing_boundary() {
        let raw = b"Content-Type: multipart/mixed\r\n\r\nbody";
        assert!(matches!(Message::parse(raw), Err(Error::MissingBoundary)));
    }

    #[test]
    fn test_unterminated_multipart() {
        let raw = b"Content-Type: multipart/mixed; boundary=b\r\n\r\n--b\r\n\r\nno end";
        assert!(matches!(Message::parse(raw), Err(Error::InvalidMultipart(_))));
    }
}
