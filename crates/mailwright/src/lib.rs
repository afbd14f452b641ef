//! # mailwright
//!
//! Turns rendered email content into a MIME message and delivers it.
//!
//! This crate provides:
//! - [`AttachmentRegistry`]: files attached or inlined while a template
//!   renders, with sequential IDs for `cid:` references
//! - [`assemble`]: the `multipart/mixed` → `multipart/alternative` →
//!   `multipart/related` message tree
//! - [`SmtpSender`] and [`MockSender`] behind the [`Sender`] trait
//! - [`Config`]: JSON configuration selecting the sender and per-message
//!   subjects
//!
//! ## Example
//!
//! ```no_run
//! use mailwright::{AttachmentRegistry, Config, Rendered, Sender, sender_for};
//!
//! # fn run() -> mailwright::Result<()> {
//! let config = Config::load("mail.json")?;
//! let registry = AttachmentRegistry::new();
//!
//! let inline = registry.inline_fn(&config.template_path);
//! let logo = inline("logo.png")?;
//! let rendered = Rendered {
//!     text: "Welcome aboard!".into(),
//!     html: format!("<img src=\"cid:{logo}\"><p>Welcome aboard!</p>"),
//! };
//! drop(inline);
//!
//! let email = config.email_for(
//!     "welcome",
//!     "new.user@example.com",
//!     rendered,
//!     registry.into_attachments(),
//! )?;
//! sender_for(&config).send_blocking(&email)?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod assemble;
pub mod attachment;
pub mod config;
pub mod email;
mod error;
pub mod transport;

pub use assemble::{assemble, write_message};
pub use attachment::{Attachment, AttachmentRegistry, AttachmentType};
pub use config::{Config, MessageConfig, SenderKind, SmtpConfig, TlsMode};
pub use email::{Email, Rendered};
pub use error::{Error, Result, TransportError};
pub use transport::{ConfiguredSender, MockSender, Sender, SentMessage, SmtpSender, sender_for};
