//! Streaming multipart body writer (RFC 2046 §5.1.1).

use crate::boundary::BoundaryGenerator;
use crate::content_type::{ContentType, MultipartKind};
use crate::header::Headers;
use std::io::{self, Write};

/// Writes the parts of one multipart body to a sink.
///
/// The first delimiter is `--boundary` at the start of the body; later
/// delimiters are preceded by the CRLF that ends the previous part, and
/// [`finish`](Self::finish) writes the closing `--boundary--` line.
#[derive(Debug)]
pub struct MultipartWriter<W> {
    sink: W,
    kind: MultipartKind,
    boundary: String,
    parts: usize,
}

impl<W: Write> MultipartWriter<W> {
    /// Creates a writer with a fresh boundary from `boundaries`.
    pub fn new(sink: W, kind: MultipartKind, boundaries: &mut dyn BoundaryGenerator) -> Self {
        Self::with_boundary(sink, kind, boundaries.next_boundary())
    }

    /// Creates a writer with a fixed boundary.
    #[must_use]
    pub fn with_boundary(sink: W, kind: MultipartKind, boundary: impl Into<String>) -> Self {
        Self {
            sink,
            kind,
            boundary: boundary.into(),
            parts: 0,
        }
    }

    /// Returns the boundary string.
    #[must_use]
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Returns the `multipart/*` content type announcing this boundary.
    #[must_use]
    pub fn content_type(&self) -> ContentType {
        ContentType::multipart(self.kind, self.boundary.clone())
    }

    /// Returns the number of parts started so far.
    #[must_use]
    pub const fn part_count(&self) -> usize {
        self.parts
    }

    /// Starts a new part and returns the sink for its body.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to the sink fails.
    pub fn start_part(&mut self, headers: &Headers) -> io::Result<&mut W> {
        if self.parts > 0 {
            self.sink.write_all(b"\r\n")?;
        }
        write!(self.sink, "--{}\r\n{headers}\r\n", self.boundary)?;
        self.parts += 1;
        Ok(&mut self.sink)
    }

    /// Writes the closing delimiter and returns the sink.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to the sink fails.
    pub fn finish(mut self) -> io::Result<W> {
        if self.parts > 0 {
            self.sink.write_all(b"\r\n")?;
        }
        write!(self.sink, "--{}--\r\n", self.boundary)?;
        Ok(self.sink)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::boundary::SequentialBoundary;

    #[test]
    fn test_two_parts() {
        let mut writer = MultipartWriter::with_boundary(Vec::new(), MultipartKind::Mixed, "XYZ");
        let mut headers = Headers::new();
        headers.set("content-type", "text/plain");

        writer.start_part(&headers).unwrap().write_all(b"one").unwrap();
        writer.start_part(&headers).unwrap().write_all(b"two").unwrap();
        assert_eq!(writer.part_count(), 2);

        let out = String::from_utf8(writer.finish().unwrap()).unwrap();
        assert_eq!(
            out,
            concat!(
                "--XYZ\r\nContent-Type: text/plain\r\n\r\none",
                "\r\n--XYZ\r\nContent-Type: text/plain\r\n\r\ntwo",
                "\r\n--XYZ--\r\n"
            )
        );
    }

    #[test]
    fn test_empty_multipart() {
        let writer = MultipartWriter::with_boundary(Vec::new(), MultipartKind::Mixed, "E");
        assert_eq!(writer.finish().unwrap(), b"--E--\r\n");
    }

    #[test]
    fn test_boundary_from_generator() {
        let mut boundaries = SequentialBoundary::new("b");
        let outer = MultipartWriter::new(Vec::new(), MultipartKind::Mixed, &mut boundaries);
        let inner = MultipartWriter::new(Vec::new(), MultipartKind::Related, &mut boundaries);
        assert_eq!(outer.boundary(), "b1");
        assert_eq!(inner.boundary(), "b2");
        assert_eq!(
            inner.content_type().to_string(),
            "multipart/related; boundary=b2"
        );
    }
}
