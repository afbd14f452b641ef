//! Encoding of single body parts.
//!
//! Text is always sent quoted-printable, binary content always as wrapped
//! Base64.

use crate::content_type::ContentType;
use crate::encoding::{encode_quoted_printable, normalize_line_endings, write_base64_wrapped};
use crate::error::{Error, Result};
use crate::header::Headers;
use crate::message::TransferEncoding;
use crate::multipart::MultipartWriter;
use std::fmt;
use std::io::{self, Write};

/// How a binary part is presented by the reader's mail client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Disposition {
    /// Displayed within the body, referenced by `cid:` URIs.
    Inline,
    /// Offered as a separate download.
    Attachment,
}

impl Disposition {
    /// Returns the `Content-Disposition` type token.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inline => "inline",
            Self::Attachment => "attachment",
        }
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A text body part, encoded quoted-printable.
#[derive(Debug, Clone)]
pub struct TextPart<'a> {
    content_type: ContentType,
    text: &'a str,
}

impl<'a> TextPart<'a> {
    /// Creates a `text/plain; charset=utf-8` part.
    #[must_use]
    pub fn plain(text: &'a str) -> Self {
        Self {
            content_type: ContentType::text_plain(),
            text,
        }
    }

    /// Creates a `text/html; charset=utf-8` part.
    #[must_use]
    pub fn html(text: &'a str) -> Self {
        Self {
            content_type: ContentType::text_html(),
            text,
        }
    }

    /// Returns the part headers.
    #[must_use]
    pub fn headers(&self) -> Headers {
        let mut headers = Headers::new();
        headers.set("content-type", self.content_type.to_string());
        headers.set(
            "content-transfer-encoding",
            TransferEncoding::QuotedPrintable.to_string(),
        );
        headers
    }

    /// Returns the encoded body with CRLF line breaks.
    #[must_use]
    pub fn encoded_body(&self) -> String {
        encode_quoted_printable(normalize_line_endings(self.text).as_bytes())
    }

    /// Appends this part to a multipart body.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to the multipart sink fails.
    pub fn write_to<W: Write>(&self, multipart: &mut MultipartWriter<W>) -> io::Result<()> {
        let body = self.encoded_body();
        multipart
            .start_part(&self.headers())?
            .write_all(body.as_bytes())
    }
}

/// A binary body part, encoded as Base64 wrapped at 72 columns.
#[derive(Debug, Clone, Copy)]
pub struct BinaryPart<'a> {
    /// Value of the `Content-Type` header.
    pub media_type: &'a str,
    /// Inline or attachment.
    pub disposition: Disposition,
    /// File name offered to the reader.
    pub filename: &'a str,
    /// Identifier without angle brackets.
    pub content_id: &'a str,
    /// Raw content.
    pub data: &'a [u8],
}

impl BinaryPart<'_> {
    /// Returns the part headers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHeader`] if the media type, file name or
    /// content ID contains a line break.
    pub fn headers(&self) -> Result<Headers> {
        let media_type = single_line("media type", self.media_type)?;
        let filename = single_line("file name", self.filename)?;
        let content_id = single_line("content ID", self.content_id)?;

        let mut headers = Headers::new();
        headers.set("content-type", media_type);
        headers.set(
            "content-disposition",
            format!("{}; filename={}", self.disposition, quoted_string(filename)),
        );
        headers.set("content-id", format!("<{content_id}>"));
        headers.set(
            "content-transfer-encoding",
            TransferEncoding::Base64.to_string(),
        );
        Ok(headers)
    }

    /// Appends this part to a multipart body.
    ///
    /// # Errors
    ///
    /// Returns an error if a header value is invalid or writing to the
    /// multipart sink fails.
    pub fn write_to<W: Write>(&self, multipart: &mut MultipartWriter<W>) -> Result<()> {
        let headers = self.headers()?;
        let body = multipart.start_part(&headers)?;
        write_base64_wrapped(self.data, body)?;
        Ok(())
    }
}

fn single_line<'a>(what: &str, value: &'a str) -> Result<&'a str> {
    if value.contains(['\r', '\n']) {
        return Err(Error::InvalidHeader(format!(
            "{what} must not contain line breaks: {value:?}"
        )));
    }
    Ok(value)
}

/// RFC 2045 quoted-string: `"` and `\` are backslash escaped.
fn quoted_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        if matches!(c, '"' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::content_type::MultipartKind;

    #[test]
    fn test_binary_part_literal() {
        let part = BinaryPart {
            media_type: "text/plain",
            disposition: Disposition::Inline,
            filename: "test.txt",
            content_id: "1",
            data: b"Hello, world!",
        };

        let mut multipart = MultipartWriter::with_boundary(Vec::new(), MultipartKind::Related, "B");
        part.write_to(&mut multipart).unwrap();
        let out = String::from_utf8(multipart.finish().unwrap()).unwrap();

        let expected = "--B
Content-Disposition: inline; filename=\"test.txt\"
Content-ID: <1>
Content-Transfer-Encoding: base64
Content-Type: text/plain

SGVsbG8sIHdvcmxkIQ==
--B--
"
        .replace('\n', "\r\n");
        assert_eq!(out, expected);
    }

    #[test]
    fn test_binary_part_wraps_long_data() {
        let data = vec![0xAB; 200];
        let part = BinaryPart {
            media_type: "application/octet-stream",
            disposition: Disposition::Attachment,
            filename: "blob.bin",
            content_id: "2",
            data: &data,
        };

        let mut multipart = MultipartWriter::with_boundary(Vec::new(), MultipartKind::Mixed, "B");
        part.write_to(&mut multipart).unwrap();
        let out = String::from_utf8(multipart.finish().unwrap()).unwrap();

        assert!(out.contains("Content-Disposition: attachment; filename=\"blob.bin\"\r\n"));
        let body = out.split("\r\n\r\n").nth(1).unwrap();
        let lines: Vec<&str> = body.lines().take_while(|l| !l.starts_with("--B")).collect();
        assert_eq!(lines.len(), 4);
        assert!(lines.iter().all(|l| l.len() <= 72));
    }

    #[test]
    fn test_text_part() {
        let part = TextPart::plain("caf\u{e9}\nbye");
        let headers = part.headers();
        assert_eq!(headers.get("content-type"), Some("text/plain; charset=utf-8"));
        assert_eq!(
            headers.get("content-transfer-encoding"),
            Some("quoted-printable")
        );
        assert_eq!(part.encoded_body(), "caf=C3=A9\r\nbye");
    }

    fn named(filename: &str) -> BinaryPart<'_> {
        BinaryPart {
            media_type: "text/plain",
            disposition: Disposition::Attachment,
            filename,
            content_id: "1",
            data: b"x",
        }
    }

    #[test]
    fn test_filename_quoted_string_escapes() {
        let headers = named(r#"say "hi"\now.txt"#).headers().unwrap();
        assert_eq!(
            headers.get("content-disposition"),
            Some(r#"attachment; filename="say \"hi\"\\now.txt""#)
        );
    }

    #[test]
    fn test_line_breaks_in_part_headers_rejected() {
        let err = named("a\".txt\r\nX-Injected: yes").headers().unwrap_err();
        assert!(matches!(err, Error::InvalidHeader(_)));

        let part = BinaryPart {
            content_id: "1>\nX-Injected: <2",
            ..named("a.txt")
        };
        assert!(part.headers().is_err());

        let part = BinaryPart {
            media_type: "text/plain\r\nX-Injected: yes",
            ..named("a.txt")
        };
        let mut multipart = MultipartWriter::with_boundary(Vec::new(), MultipartKind::Mixed, "B");
        assert!(part.write_to(&mut multipart).is_err());
        assert_eq!(multipart.part_count(), 0);
    }

    #[test]
    fn test_html_part_headers() {
        let headers = TextPart::html("<p>hi</p>").headers();
        assert_eq!(headers.get("content-type"), Some("text/html; charset=utf-8"));
    }
}
