//! Type-state SMTP client.

use std::collections::HashSet;
use std::marker::PhantomData;

use base64::Engine;
use tracing::debug;

use super::{ServerInfo, SmtpStream};
use crate::command::Command;
use crate::error::{Error, Result};
use crate::types::{Address, AuthMechanism, Extension, Reply, ReplyCode};

/// Type-state marker for connected state.
#[derive(Debug)]
pub struct Connected;

/// Type-state marker for authenticated state.
#[derive(Debug)]
pub struct Authenticated;

/// Type-state marker for mail transaction started.
#[derive(Debug)]
pub struct MailTransaction;

/// Type-state marker for recipient added.
#[derive(Debug)]
pub struct RecipientAdded;

/// Type-state marker for data mode.
#[derive(Debug)]
pub struct Data;

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Connected {}
    impl Sealed for super::Authenticated {}
}

/// States in which a mail transaction may be started.
pub trait Ready: sealed::Sealed {}
impl Ready for Connected {}
impl Ready for Authenticated {}

/// SMTP client with type-state pattern.
#[derive(Debug)]
pub struct Client<State> {
    stream: SmtpStream,
    server_info: ServerInfo,
    _state: PhantomData<State>,
}

/// Connection trait for all states.
pub trait SmtpConnection {
    /// Returns the server information.
    fn server_info(&self) -> &ServerInfo;
}

impl<S> SmtpConnection for Client<S> {
    fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }
}

impl Client<Connected> {
    /// Creates a client from a stream and reads the server greeting.
    ///
    /// # Errors
    ///
    /// Returns an error if reading the greeting fails or if the server returns an error.
    pub async fn from_stream(mut stream: SmtpStream) -> Result<Self> {
        let greeting = stream.read_reply().await?;
        if greeting.code != ReplyCode::SERVICE_READY {
            return Err(greeting.into_error());
        }

        let hostname = greeting
            .message
            .first()
            .and_then(|msg| msg.split_whitespace().next())
            .unwrap_or("unknown")
            .to_string();
        debug!(server = %hostname, "SMTP greeting received");

        Ok(Self {
            stream,
            server_info: ServerInfo {
                hostname,
                extensions: HashSet::new(),
            },
            _state: PhantomData,
        })
    }

    /// Sends EHLO and records the advertised extensions.
    ///
    /// # Errors
    ///
    /// Returns an error if the EHLO command fails.
    pub async fn ehlo(mut self, client_hostname: &str) -> Result<Self> {
        let reply = self
            .expect_success(Command::Ehlo {
                hostname: client_hostname.to_string(),
            })
            .await?;

        // First line is the server's greeting text
        self.server_info.extensions = reply
            .message
            .iter()
            .skip(1)
            .map(String::as_str)
            .map(Extension::parse)
            .collect();
        Ok(self)
    }

    /// Upgrades the connection with STARTTLS and repeats EHLO over the
    /// encrypted channel.
    ///
    /// `server_name` is verified against the certificate; `client_hostname`
    /// is announced in the second EHLO.
    ///
    /// # Errors
    ///
    /// Returns an error if STARTTLS is not supported or if the upgrade fails.
    pub async fn starttls(mut self, server_name: &str, client_hostname: &str) -> Result<Self> {
        if !self.server_info.supports_starttls() {
            return Err(Error::NotSupported("STARTTLS".into()));
        }

        self.expect_success(Command::StartTls).await?;
        self.stream = self.stream.upgrade_to_tls(server_name).await?;
        debug!(server = server_name, "TLS established");

        // Extensions offered before the upgrade are no longer valid
        self.server_info.extensions.clear();
        self.ehlo(client_hostname).await
    }

    /// Authenticates using the PLAIN mechanism with an initial response.
    ///
    /// # Errors
    ///
    /// Returns an error if authentication fails.
    pub async fn auth_plain(
        mut self,
        username: &str,
        password: &str,
    ) -> Result<Client<Authenticated>> {
        let cmd = Command::Auth {
            mechanism: AuthMechanism::Plain,
            initial_response: Some(plain_response(username, password)),
        };
        self.expect_success(cmd).await?;
        Ok(self.transition())
    }
}

impl<S: Ready> Client<S> {
    /// Starts a mail transaction.
    ///
    /// `size` is announced with the SIZE parameter when the server supports
    /// it; a message larger than the advertised limit is refused before
    /// anything is sent. Pass [`stuffed_len`] of the message so the value
    /// matches the bytes written during DATA.
    ///
    /// # Errors
    ///
    /// Returns an error if the MAIL FROM command fails.
    pub async fn mail_from(
        mut self,
        from: Address,
        size: Option<usize>,
    ) -> Result<Client<MailTransaction>> {
        if let (Some(size), Some(limit)) = (size, self.server_info.max_message_size())
            && size > limit
        {
            return Err(Error::MessageTooLarge { size, limit });
        }

        let size = size.filter(|_| self.server_info.supports_size());
        self.expect_success(Command::MailFrom { from, size }).await?;
        Ok(self.transition())
    }
}

impl Client<MailTransaction> {
    /// Adds a recipient to the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the RCPT TO command fails.
    pub async fn rcpt_to(mut self, to: Address) -> Result<Client<RecipientAdded>> {
        self.expect_success(Command::RcptTo { to }).await?;
        Ok(self.transition())
    }
}

impl Client<RecipientAdded> {
    /// Adds another recipient to the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the RCPT TO command fails.
    pub async fn rcpt_to(mut self, to: Address) -> Result<Self> {
        self.expect_success(Command::RcptTo { to }).await?;
        Ok(self)
    }

    /// Begins sending message data.
    ///
    /// # Errors
    ///
    /// Returns an error if the DATA command fails.
    pub async fn data(mut self) -> Result<Client<Data>> {
        let reply = self.send_command(Command::Data).await?;
        if reply.code != ReplyCode::START_DATA {
            return Err(reply.into_error());
        }
        Ok(self.transition())
    }
}

impl Client<Data> {
    /// Sends the message content and completes the transaction.
    ///
    /// Line endings are normalized to CRLF, lines starting with `.` are
    /// stuffed and the terminating `.` line is appended.
    ///
    /// # Errors
    ///
    /// Returns an error if sending the message fails or server rejects it.
    pub async fn send_message(mut self, message: &[u8]) -> Result<Client<Connected>> {
        let mut payload = dot_stuff(message);
        payload.extend_from_slice(b".\r\n");
        debug!(bytes = payload.len(), "sending message data");
        self.stream.write_all(&payload).await?;

        let reply = self.stream.read_reply().await?;
        debug!(code = %reply.code, "message data accepted");
        if !reply.is_success() {
            return Err(reply.into_error());
        }
        Ok(self.transition())
    }
}

impl<S> Client<S> {
    fn transition<T>(self) -> Client<T> {
        Client {
            stream: self.stream,
            server_info: self.server_info,
            _state: PhantomData,
        }
    }

    async fn send_command(&mut self, cmd: Command) -> Result<Reply> {
        debug!(command = %cmd.redacted(), "SMTP >");
        self.stream.write_all(&cmd.serialize()).await?;
        let reply = self.stream.read_reply().await?;
        debug!(code = %reply.code, "SMTP <");
        Ok(reply)
    }

    async fn expect_success(&mut self, cmd: Command) -> Result<Reply> {
        let reply = self.send_command(cmd).await?;
        if reply.is_success() {
            Ok(reply)
        } else {
            Err(reply.into_error())
        }
    }

    /// Sends QUIT and closes the connection (available in any state).
    ///
    /// # Errors
    ///
    /// Returns an error if the QUIT command fails.
    pub async fn quit(mut self) -> Result<()> {
        let reply = self.send_command(Command::Quit).await?;
        if reply.code != ReplyCode::CLOSING && !reply.is_success() {
            return Err(reply.into_error());
        }
        Ok(())
    }
}

/// SASL PLAIN initial response: base64 of `\0user\0password`.
fn plain_response(username: &str, password: &str) -> String {
    base64::engine::general_purpose::STANDARD.encode(format!("\0{username}\0{password}"))
}

/// Prepares message content for the DATA phase.
///
/// Every line ends in CRLF (bare LF is converted) and lines starting with
/// `.` get an extra leading `.`. The terminating `.` line is not included.
#[must_use]
pub fn dot_stuff(message: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(message.len() + message.len() / 64 + 2);
    let body = message.strip_suffix(b"\n").unwrap_or(message);
    if message.is_empty() {
        return out;
    }

    for line in body.split(|&b| b == b'\n') {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if line.first() == Some(&b'.') {
            out.push(b'.');
        }
        out.extend_from_slice(line);
        out.extend_from_slice(b"\r\n");
    }
    out
}

/// Length of [`dot_stuff`]'s output for `message`, without building it.
///
/// This is the size to announce in `MAIL FROM ... SIZE=`.
#[must_use]
pub fn stuffed_len(message: &[u8]) -> usize {
    let body = message.strip_suffix(b"\n").unwrap_or(message);
    if message.is_empty() {
        return 0;
    }

    body.split(|&b| b == b'\n')
        .map(|line| {
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            usize::from(line.first() == Some(&b'.')) + line.len() + 2
        })
        .sum()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::connection::connect;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;

    #[test]
    fn test_dot_stuff() {
        assert_eq!(dot_stuff(b"Hello\r\n.hidden\r\n..two\r\n"), b"Hello\r\n..hidden\r\n...two\r\n");
        assert_eq!(dot_stuff(b"bare\nlf"), b"bare\r\nlf\r\n");
        assert_eq!(dot_stuff(b"."), b"..\r\n");
        assert_eq!(dot_stuff(b"a\r\n\r\nb"), b"a\r\n\r\nb\r\n");
        assert_eq!(dot_stuff(b""), b"");
    }

    #[test]
    fn test_stuffed_len_matches_dot_stuff() {
        for message in [
            &b"Hello\r\n.hidden\r\n..two\r\n"[..],
            b"bare\nlf",
            b".",
            b"a\r\n\r\nb",
            b"",
            b"\n",
            b".\n.\n.",
        ] {
            assert_eq!(stuffed_len(message), dot_stuff(message).len(), "{message:?}");
        }
        assert!(stuffed_len(b".\n.\n") > b".\n.\n".len());
    }

    #[test]
    fn test_plain_response() {
        assert_eq!(plain_response("user", "pass"), "AHVzZXIAcGFzcw==");
    }

    /// Serves one scripted session: for each `(expected_prefix, reply)` the
    /// server reads a line, checks its prefix and answers.
    async fn scripted_server(
        script: Vec<(&'static str, &'static str)>,
    ) -> (u16, tokio::task::JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let (read, mut write) = socket.into_split();
            let mut reader = BufReader::new(read);
            let mut seen = Vec::new();
            write.write_all(b"220 mx.test ESMTP ready\r\n").await.unwrap();
            for (expected, reply) in script {
                let mut line = String::new();
                reader.read_line(&mut line).await.unwrap();
                assert!(line.starts_with(expected), "expected {expected:?}, got {line:?}");
                seen.push(line.trim_end().to_string());
                if expected == "DATA" {
                    write.write_all(b"354 go ahead\r\n").await.unwrap();
                    loop {
                        let mut data = String::new();
                        reader.read_line(&mut data).await.unwrap();
                        if data == ".\r\n" {
                            break;
                        }
                        seen.push(data.trim_end().to_string());
                    }
                }
                write.write_all(reply.as_bytes()).await.unwrap();
            }
            seen
        });
        (port, handle)
    }

    #[tokio::test]
    async fn test_full_transaction() {
        let (port, server) = scripted_server(vec![
            ("EHLO", "250-mx.test\r\n250-SIZE 1000\r\n250 AUTH PLAIN\r\n"),
            ("AUTH PLAIN AHVzZXIAcGFzcw==", "235 ok\r\n"),
            ("MAIL FROM:<a@x.test> SIZE=", "250 ok\r\n"),
            ("RCPT TO:<b@y.test>", "250 ok\r\n"),
            ("DATA", "250 queued\r\n"),
            ("QUIT", "221 bye\r\n"),
        ])
        .await;

        let stream = connect("127.0.0.1", port).await.unwrap();
        let client = Client::from_stream(stream).await.unwrap();
        assert_eq!(client.server_info().hostname, "mx.test");
        let client = client.ehlo("client.test").await.unwrap();
        assert_eq!(client.server_info().max_message_size(), Some(1000));

        let message = b"Subject: hi\r\n\r\n.dot\r\n";
        let client = client.auth_plain("user", "pass").await.unwrap();
        let client = client
            .mail_from(Address::new("a@x.test").unwrap(), Some(message.len()))
            .await
            .unwrap();
        let client = client.rcpt_to(Address::new("b@y.test").unwrap()).await.unwrap();
        let client = client.data().await.unwrap();
        let client = client.send_message(message).await.unwrap();
        client.quit().await.unwrap();

        let seen = server.await.unwrap();
        assert!(seen.contains(&"..dot".to_string()));
        assert!(seen.contains(&"Subject: hi".to_string()));
    }

    #[tokio::test]
    async fn test_rejections_surface_reply() {
        let (port, _server) = scripted_server(vec![
            ("EHLO", "250 mx.test\r\n"),
            ("AUTH PLAIN", "535 5.7.8 bad credentials\r\n"),
        ])
        .await;

        let stream = connect("127.0.0.1", port).await.unwrap();
        let client = Client::from_stream(stream).await.unwrap().ehlo("c").await.unwrap();
        let err = client.auth_plain("user", "wrong").await.unwrap_err();
        assert!(matches!(err, Error::SmtpError { code: 535, .. }));
    }

    #[tokio::test]
    async fn test_starttls_requires_extension() {
        let (port, _server) = scripted_server(vec![("EHLO", "250 mx.test\r\n")]).await;

        let stream = connect("127.0.0.1", port).await.unwrap();
        let client = Client::from_stream(stream).await.unwrap().ehlo("c").await.unwrap();
        let err = client.starttls("localhost", "c").await.unwrap_err();
        assert!(matches!(err, Error::NotSupported(_)));
    }

    #[tokio::test]
    async fn test_message_too_large() {
        let (port, _server) = scripted_server(vec![("EHLO", "250-mx.test\r\n250 SIZE 10\r\n")]).await;

        let stream = connect("127.0.0.1", port).await.unwrap();
        let client = Client::from_stream(stream).await.unwrap().ehlo("c").await.unwrap();
        let err = client
            .mail_from(Address::new("a@x.test").unwrap(), Some(11))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MessageTooLarge { size: 11, limit: 10 }));
    }

    #[tokio::test]
    async fn test_closed_connection_is_an_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            drop(socket);
        });

        let stream = connect("127.0.0.1", port).await.unwrap();
        let err = Client::from_stream(stream).await.unwrap_err();
        assert!(matches!(err, Error::Io(e) if e.kind() == std::io::ErrorKind::UnexpectedEof));
    }
}
