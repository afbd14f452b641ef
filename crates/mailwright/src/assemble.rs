//! Serializes an [`Email`] into a multipart MIME message.
//!
//! The structure is always rooted in `multipart/mixed`:
//!
//! ```text
//! multipart/mixed
//! ├── text/plain                      (no HTML)
//! │   or
//! ├── multipart/alternative
//! │   ├── text/plain
//! │   └── multipart/related
//! │       ├── text/html
//! │       └── inline attachments...
//! └── standalone attachments...
//! ```

use std::io::Write;

use mailwright_mime::{
    BoundaryGenerator, ContentType, Error as MimeError, Headers, MultipartKind, MultipartWriter,
    TextPart,
};
use tracing::{debug, warn};

use crate::email::Email;
use crate::error::Result;

/// Assembles `email` into a complete message.
///
/// # Errors
///
/// Returns [`Error::Encoding`](crate::Error::Encoding) if a header value
/// cannot be written.
pub fn assemble(email: &Email, boundaries: &mut dyn BoundaryGenerator) -> Result<Vec<u8>> {
    let message = write_message(email, boundaries, Vec::new())?;
    debug!(bytes = message.len(), to = %email.to, "assembled message");
    Ok(message)
}

/// Writes `email` as a complete message to `sink` and returns the sink.
///
/// # Errors
///
/// Returns [`Error::Encoding`](crate::Error::Encoding) if a header value
/// cannot be written or writing to the sink fails.
pub fn write_message<W: Write>(
    email: &Email,
    boundaries: &mut dyn BoundaryGenerator,
    sink: W,
) -> Result<W> {
    Ok(write_mixed(email, boundaries, sink)?)
}

fn write_mixed<W: Write>(
    email: &Email,
    boundaries: &mut dyn BoundaryGenerator,
    mut sink: W,
) -> mailwright_mime::Result<W> {
    let boundary = boundaries.next_boundary();

    write_header(&mut sink, "From", email.header_from())?;
    write_header(&mut sink, "To", &email.to)?;
    if !email.subject.is_empty() {
        write_header(&mut sink, "Subject", &email.subject)?;
    }
    write_header(&mut sink, "MIME-Version", "1.0")?;
    let content_type = ContentType::multipart(MultipartKind::Mixed, boundary.as_str());
    write_header(&mut sink, "Content-Type", &content_type.to_string())?;
    sink.write_all(b"\r\n")?;

    let mut mixed = MultipartWriter::with_boundary(sink, MultipartKind::Mixed, boundary);
    if email.has_html() {
        write_alternative(email, boundaries, &mut mixed)?;
    } else {
        if email.attachments.iter().any(|a| a.is_inline()) {
            warn!("inline attachments dropped from message without HTML body");
        }
        TextPart::plain(&email.text).write_to(&mut mixed)?;
    }

    for attachment in email.attachments.iter().filter(|a| !a.is_inline()) {
        attachment.to_part().write_to(&mut mixed)?;
    }

    Ok(mixed.finish()?)
}

/// `multipart/alternative` holding the text part and the related HTML tree.
fn write_alternative<W: Write>(
    email: &Email,
    boundaries: &mut dyn BoundaryGenerator,
    parent: &mut MultipartWriter<W>,
) -> mailwright_mime::Result<()> {
    let boundary = boundaries.next_boundary();
    let body = parent.start_part(&multipart_headers(MultipartKind::Alternative, &boundary))?;

    let mut alternative = MultipartWriter::with_boundary(body, MultipartKind::Alternative, boundary);
    TextPart::plain(&email.text).write_to(&mut alternative)?;
    write_related(email, boundaries, &mut alternative)?;
    alternative.finish()?;
    Ok(())
}

/// `multipart/related` holding the HTML part and the inline attachments it
/// references by `cid:`.
fn write_related<W: Write>(
    email: &Email,
    boundaries: &mut dyn BoundaryGenerator,
    parent: &mut MultipartWriter<W>,
) -> mailwright_mime::Result<()> {
    let boundary = boundaries.next_boundary();
    let body = parent.start_part(&multipart_headers(MultipartKind::Related, &boundary))?;

    let mut related = MultipartWriter::with_boundary(body, MultipartKind::Related, boundary);
    TextPart::html(&email.html).write_to(&mut related)?;
    for attachment in email.attachments.iter().filter(|a| a.is_inline()) {
        attachment.to_part().write_to(&mut related)?;
    }
    related.finish()?;
    Ok(())
}

fn multipart_headers(kind: MultipartKind, boundary: &str) -> Headers {
    let mut headers = Headers::new();
    headers.set(
        "content-type",
        ContentType::multipart(kind, boundary).to_string(),
    );
    headers
}

fn write_header<W: Write>(sink: &mut W, name: &str, value: &str) -> mailwright_mime::Result<()> {
    if value.contains(['\r', '\n']) {
        return Err(MimeError::InvalidHeader(format!(
            "{name} must not contain line breaks"
        )));
    }
    write!(sink, "{name}: {value}\r\n")?;
    Ok(())
}
