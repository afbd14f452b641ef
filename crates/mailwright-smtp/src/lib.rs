//! # mailwright-smtp
//!
//! SMTP submission client (RFC 5321) used to deliver assembled messages.
//!
//! ## Features
//!
//! - **Type-state client**: invalid command orderings do not compile
//! - **TLS**: implicit TLS (port 465) and STARTTLS, verified against the
//!   Mozilla root store
//! - **Authentication**: SASL PLAIN with initial response
//! - **Extensions**: EHLO keywords are parsed; SIZE limits are enforced
//!   before the message is transmitted
//!
//! ## Sending a message
//!
//! ```no_run
//! use mailwright_smtp::connection::connect;
//! use mailwright_smtp::{Address, Client};
//!
//! # async fn run() -> mailwright_smtp::Result<()> {
//! let stream = connect("smtp.example.com", 587).await?;
//! let client = Client::from_stream(stream)
//!     .await?
//!     .ehlo("client.example.com")
//!     .await?
//!     .starttls("smtp.example.com", "client.example.com")
//!     .await?
//!     .auth_plain("user@example.com", "password")
//!     .await?;
//!
//! let message = b"Subject: Test\r\n\r\nHello, World!\r\n";
//! let client = client
//!     .mail_from(Address::new("sender@example.com")?, Some(message.len()))
//!     .await?
//!     .rcpt_to(Address::new("recipient@example.com")?)
//!     .await?
//!     .data()
//!     .await?
//!     .send_message(message)
//!     .await?;
//!
//! client.quit().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Connection States
//!
//! ```text
//! ┌──────────────┐
//! │  Connected   │ ─── auth_plain() ───→ Authenticated
//! └──────────────┘                            │
//!        │                                    │
//!        └───────────── mail_from() ──────────┘
//!                           │
//!                           ▼
//!                    MailTransaction ─── rcpt_to() ───→ RecipientAdded ─── data() ───→ Data
//! ```
//!
//! `send_message()` returns the client to `Connected`; `quit()` is
//! available in every state.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod types;

pub use connection::{
    Authenticated, Client, Connected, Data, MailTransaction, Ready, RecipientAdded, Security,
    ServerInfo, SmtpConnection,
};
pub use error::{Error, Result};
pub use types::{Address, AuthMechanism, Extension, Mailbox, Reply, ReplyCode};
