//! # mailwright-mime
//!
//! MIME message generation for outgoing email.
//!
//! ## Features
//!
//! - **Transfer encodings**: Quoted-Printable for text, Base64 wrapped at 72
//!   columns for binary content
//! - **Multipart writer**: Streaming mixed, alternative and related bodies
//!   with per-writer boundaries
//! - **Content sniffing**: Media type detection from file contents
//! - **Parsing**: Enough of a MIME parser to inspect generated messages
//!
//! ## Building a multipart body
//!
//! ```
//! use mailwright_mime::{BinaryPart, Disposition, MultipartKind, MultipartWriter, TextPart};
//! use mailwright_mime::boundary::RandomBoundary;
//!
//! let mut boundaries = RandomBoundary::new();
//! let mut body = MultipartWriter::new(Vec::new(), MultipartKind::Mixed, &mut boundaries);
//!
//! TextPart::plain("Hello, World!").write_to(&mut body)?;
//! BinaryPart {
//!     media_type: "image/gif",
//!     disposition: Disposition::Attachment,
//!     filename: "pixel.gif",
//!     content_id: "1",
//!     data: b"GIF89a",
//! }
//! .write_to(&mut body)?;
//!
//! let bytes = body.finish()?;
//! assert!(bytes.ends_with(b"--\r\n"));
//! # Ok::<(), mailwright_mime::Error>(())
//! ```
//!
//! ### Encoding/Decoding
//!
//! ```
//! use mailwright_mime::encoding::{decode_quoted_printable, encode_base64_wrapped, encode_quoted_printable};
//!
//! let encoded = encode_quoted_printable("Héllo".as_bytes());
//! assert_eq!(encoded, "H=C3=A9llo");
//! assert_eq!(decode_quoted_printable(&encoded)?, "Héllo".as_bytes());
//!
//! let wrapped = encode_base64_wrapped(&[0u8; 100]);
//! assert!(wrapped.split("\r\n").all(|line| line.len() <= 72));
//! # Ok::<(), mailwright_mime::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod content_type;
mod error;
mod header;
mod message;
mod multipart;
mod part;

pub mod boundary;
pub mod encoding;
pub mod sniff;

pub use boundary::{BoundaryGenerator, RandomBoundary, SequentialBoundary};
pub use content_type::{ContentType, MultipartKind};
pub use error::{Error, Result};
pub use header::Headers;
pub use message::{Message, Part, TransferEncoding};
pub use multipart::MultipartWriter;
pub use part::{BinaryPart, Disposition, TextPart};
