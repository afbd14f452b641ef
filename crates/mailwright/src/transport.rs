//! Delivery of assembled messages.

use std::future::Future;
use std::sync::{Mutex, PoisonError};

use mailwright_mime::RandomBoundary;
use mailwright_smtp::connection::{connect, connect_tls, stuffed_len};
use mailwright_smtp::{Address, Client, Connected, Mailbox, Ready, Security};
use tracing::{debug, info, warn};

use crate::assemble::assemble;
use crate::config::{Config, SenderKind, SmtpConfig};
use crate::email::Email;
use crate::error::{Error, Result, TransportError};

/// Name announced in EHLO.
const CLIENT_HOSTNAME: &str = "localhost";

/// Something that can deliver an [`Email`].
pub trait Sender {
    /// Assembles and delivers `email`.
    ///
    /// # Errors
    ///
    /// Returns an error if assembly or delivery fails.
    fn send(&self, email: &Email) -> impl Future<Output = Result<()>> + Send;

    /// Runs [`send`](Self::send) to completion on a fresh current-thread
    /// runtime, for callers outside async code.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BlockingInRuntime`] when called from a thread that
    /// is already running a tokio runtime, and an error if the runtime
    /// cannot be created or the send fails.
    fn send_blocking(&self, email: &Email) -> Result<()> {
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(Error::BlockingInRuntime);
        }
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        runtime.block_on(self.send(email))
    }
}

/// Delivers messages over SMTP, one connection per message.
#[derive(Debug, Clone)]
pub struct SmtpSender {
    config: SmtpConfig,
}

impl SmtpSender {
    /// Creates a sender for the given server.
    #[must_use]
    pub const fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    /// Returns the server settings.
    #[must_use]
    pub const fn config(&self) -> &SmtpConfig {
        &self.config
    }

    async fn connect(&self) -> std::result::Result<Client<Connected>, TransportError> {
        let SmtpConfig {
            server, port, tls, ..
        } = &self.config;
        let security = Security::from(*tls);
        debug!(server = %server, port, ?security, "connecting to SMTP server");

        let stream = match security {
            Security::Implicit => connect_tls(server, *port).await,
            Security::StartTls | Security::None => connect(server, *port).await,
        }
        .map_err(connect_error)?;

        let client = Client::from_stream(stream)
            .await
            .map_err(|e| TransportError::Connection(e.to_string()))?
            .ehlo(CLIENT_HOSTNAME)
            .await
            .map_err(|e| TransportError::Connection(e.to_string()))?;

        if security == Security::StartTls {
            client
                .starttls(server, CLIENT_HOSTNAME)
                .await
                .map_err(|e| TransportError::Tls(e.to_string()))
        } else {
            Ok(client)
        }
    }
}

impl Sender for SmtpSender {
    async fn send(&self, email: &Email) -> Result<()> {
        let message = assemble(email, &mut RandomBoundary::new())?;
        let from = envelope_address(email.envelope_from())?;
        let to = envelope_address(&email.to)?;

        let client = self.connect().await?;
        let client = match &self.config.username {
            Some(username) => {
                let client = client
                    .auth_plain(username, &self.config.password)
                    .await
                    .map_err(|e| TransportError::Auth(e.to_string()))?;
                deliver(client, from, to, &message).await?
            }
            None => deliver(client, from, to, &message).await?,
        };

        if let Err(e) = client.quit().await {
            warn!(error = %e, "QUIT failed after message was accepted");
        }
        info!(to = %email.to, bytes = message.len(), "email sent");
        Ok(())
    }
}

async fn deliver<S: Ready>(
    client: Client<S>,
    from: Address,
    to: Address,
    message: &[u8],
) -> std::result::Result<Client<Connected>, TransportError> {
    let send_error = |e: mailwright_smtp::Error| {
        debug!(
            error = %e,
            permanent = e.is_permanent(),
            transient = e.is_transient(),
            "mail transaction failed"
        );
        TransportError::Send(e.to_string())
    };
    client
        .mail_from(from, Some(stuffed_len(message)))
        .await
        .map_err(send_error)?
        .rcpt_to(to)
        .await
        .map_err(send_error)?
        .data()
        .await
        .map_err(send_error)?
        .send_message(message)
        .await
        .map_err(send_error)
}

/// Extracts the addr-spec from `user@host` or `Name <user@host>`.
fn envelope_address(value: &str) -> std::result::Result<Address, TransportError> {
    Mailbox::parse(value)
        .map(|mailbox| mailbox.address)
        .map_err(|e| TransportError::InvalidAddress(e.to_string()))
}

fn connect_error(err: mailwright_smtp::Error) -> TransportError {
    match err {
        mailwright_smtp::Error::Tls(_) | mailwright_smtp::Error::InvalidServerName(_) => {
            TransportError::Tls(err.to_string())
        }
        _ => TransportError::Connection(err.to_string()),
    }
}

/// A message handed to [`MockSender`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    /// Envelope sender.
    pub envelope_from: String,
    /// Recipient.
    pub to: String,
    /// Assembled message.
    pub data: Vec<u8>,
}

/// Assembles messages and records them instead of sending.
#[derive(Debug, Default)]
pub struct MockSender {
    sent: Mutex<Vec<SentMessage>>,
}

impl MockSender {
    /// Creates a mock sender with no recorded messages.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the messages recorded so far.
    #[must_use]
    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Sender for MockSender {
    async fn send(&self, email: &Email) -> Result<()> {
        let data = assemble(email, &mut RandomBoundary::new())?;
        info!(
            from = %email.envelope_from(),
            to = %email.to,
            subject = %email.subject,
            bytes = data.len(),
            "mock send"
        );
        debug!(message = %String::from_utf8_lossy(&data), "mock message");

        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(SentMessage {
                envelope_from: email.envelope_from().to_string(),
                to: email.to.clone(),
                data,
            });
        Ok(())
    }
}

/// The sender selected by a [`Config`].
#[derive(Debug)]
pub enum ConfiguredSender {
    /// Records messages.
    Mock(MockSender),
    /// Delivers over SMTP.
    Smtp(SmtpSender),
}

impl Sender for ConfiguredSender {
    async fn send(&self, email: &Email) -> Result<()> {
        match self {
            Self::Mock(sender) => sender.send(email).await,
            Self::Smtp(sender) => sender.send(email).await,
        }
    }
}

/// Builds the sender named by the configuration's `use` setting.
#[must_use]
pub fn sender_for(config: &Config) -> ConfiguredSender {
    match config.use_sender {
        SenderKind::Mock => ConfiguredSender::Mock(MockSender::new()),
        SenderKind::Smtp => ConfiguredSender::Smtp(SmtpSender::new(config.smtp_or_default())),
    }
}
