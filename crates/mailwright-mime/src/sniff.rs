//! Media type detection from content.
//!
//! Only the bytes are inspected, never a file name. Binary formats are
//! recognized by their magic numbers; remaining data is classified as UTF-8
//! text or `application/octet-stream`.

/// Fallback for content that is neither recognized nor text.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Type reported for UTF-8 text without a more specific signature.
pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Number of leading bytes inspected for text signatures.
const TEXT_SNIFF_LEN: usize = 512;

/// Fixed-offset magic numbers.
const SIGNATURES: &[(usize, &[u8], &str)] = &[
    (0, b"\x89PNG\r\n\x1a\n", "image/png"),
    (0, b"GIF87a", "image/gif"),
    (0, b"GIF89a", "image/gif"),
    (0, b"\xff\xd8\xff", "image/jpeg"),
    (0, b"\x00\x00\x01\x00", "image/x-icon"),
    (0, b"II*\x00", "image/tiff"),
    (0, b"MM\x00*", "image/tiff"),
    (0, b"%PDF-", "application/pdf"),
    (0, b"%!PS", "application/postscript"),
    (0, b"{\\rtf", "text/rtf"),
    (0, b"PK\x03\x04", "application/zip"),
    (0, b"\x1f\x8b", "application/gzip"),
    (0, b"7z\xbc\xaf\x27\x1c", "application/x-7z-compressed"),
    (0, b"Rar!\x1a\x07", "application/x-rar-compressed"),
    (0, b"OggS", "audio/ogg"),
    (0, b"ID3", "audio/mpeg"),
    (0, b"fLaC", "audio/flac"),
    (0, b"wOFF", "font/woff"),
    (0, b"wOF2", "font/woff2"),
    (4, b"ftyp", "video/mp4"),
];

/// Detects the media type of `data`.
#[must_use]
pub fn detect(data: &[u8]) -> &'static str {
    if data.is_empty() {
        return "text/plain";
    }

    if let Some(riff) = detect_riff(data) {
        return riff;
    }

    // "BM" alone is too common in text; the reserved header words are zero
    if data.len() >= 14 && data.starts_with(b"BM") && data[6..10] == [0, 0, 0, 0] {
        return "image/bmp";
    }

    for &(offset, magic, media_type) in SIGNATURES {
        if data.len() >= offset + magic.len() && &data[offset..offset + magic.len()] == magic {
            return media_type;
        }
    }

    if is_text(data) {
        return detect_markup(data).unwrap_or(TEXT_PLAIN);
    }

    OCTET_STREAM
}

/// RIFF containers carry their format at offset 8.
fn detect_riff(data: &[u8]) -> Option<&'static str> {
    if data.len() < 12 || &data[..4] != b"RIFF" {
        return None;
    }
    match &data[8..12] {
        b"WEBP" => Some("image/webp"),
        b"WAVE" => Some("audio/wav"),
        b"AVI " => Some("video/x-msvideo"),
        _ => None,
    }
}

/// Checks that the leading bytes are UTF-8 without NUL characters.
fn is_text(data: &[u8]) -> bool {
    let head = &data[..data.len().min(TEXT_SNIFF_LEN)];
    if head.contains(&0) {
        return false;
    }
    match std::str::from_utf8(head) {
        Ok(_) => true,
        // A multi-byte sequence cut off by the sniff window is still text
        Err(e) => e.error_len().is_none(),
    }
}

fn detect_markup(data: &[u8]) -> Option<&'static str> {
    let head = &data[..data.len().min(TEXT_SNIFF_LEN)];
    let head = head.strip_prefix(b"\xef\xbb\xbf").unwrap_or(head);
    let start = head.iter().position(|b| !b.is_ascii_whitespace())?;
    let head = head[start..].to_ascii_lowercase();

    if head.starts_with(b"<!doctype html") || head.starts_with(b"<html") {
        Some("text/html; charset=utf-8")
    } else if head.starts_with(b"<svg") {
        Some("image/svg+xml")
    } else if head.starts_with(b"<?xml") {
        if contains(&head, b"<svg") {
            Some("image/svg+xml")
        } else {
            Some("text/xml; charset=utf-8")
        }
    } else {
        None
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}
