//! Sender configuration loaded from JSON.
//!
//! ```json
//! {
//!   "from": "noreply@example.com",
//!   "template_path": "templates",
//!   "use": "smtp",
//!   "messages": {
//!     "welcome": { "subject": "Welcome!" },
//!     "receipt": { "subject": "Your receipt", "from": "billing@example.com" }
//!   },
//!   "smtp": { "server": "smtp.example.com", "port": 465, "tls": "ssl",
//!             "username": "noreply", "password": "secret" }
//! }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use mailwright_smtp::Security;
use serde::{Deserialize, Serialize};

use crate::attachment::Attachment;
use crate::email::{Email, Rendered};
use crate::error::{Error, Result};

/// Which sender delivers messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderKind {
    /// Log and record messages instead of sending them.
    #[default]
    Mock,
    /// Deliver over SMTP.
    Smtp,
}

/// TLS policy for the SMTP connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TlsMode {
    /// Implicit TLS from the first byte.
    Ssl,
    /// Plaintext connection upgraded with STARTTLS.
    #[default]
    StartTls,
    /// No encryption.
    None,
}

impl From<TlsMode> for Security {
    fn from(mode: TlsMode) -> Self {
        match mode {
            TlsMode::Ssl => Self::Implicit,
            TlsMode::StartTls => Self::StartTls,
            TlsMode::None => Self::None,
        }
    }
}

/// SMTP server settings.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpConfig {
    /// Server hostname.
    pub server: String,
    /// Server port.
    pub port: u16,
    /// TLS policy.
    pub tls: TlsMode,
    /// Username; authentication is skipped when absent.
    pub username: Option<String>,
    /// Password.
    pub password: String,
}

impl SmtpConfig {
    /// Get default port for the TLS mode.
    #[must_use]
    pub fn default_port(tls: TlsMode) -> u16 {
        Security::from(tls).default_port()
    }
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            server: "localhost".to_string(),
            port: 587,
            tls: TlsMode::default(),
            username: None,
            password: String::new(),
        }
    }
}

impl fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("tls", &self.tls)
            .field("username", &self.username)
            .field("password", &"****")
            .finish()
    }
}

/// Per message type settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MessageConfig {
    /// Subject line.
    pub subject: String,
    /// Sender overriding the global `from`.
    #[serde(default)]
    pub from: Option<String>,
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Default sender address.
    pub from: String,
    /// Settings for each message type, keyed by name.
    #[serde(default)]
    pub messages: HashMap<String, MessageConfig>,
    /// Directory holding templates and the files they attach.
    #[serde(default = "default_template_path")]
    pub template_path: PathBuf,
    /// Sender used for delivery.
    #[serde(default, rename = "use")]
    pub use_sender: SenderKind,
    /// SMTP settings, used when `use` is `smtp`.
    #[serde(default)]
    pub smtp: Option<SmtpConfig>,
}

fn default_template_path() -> PathBuf {
    PathBuf::from("templates")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            from: String::new(),
            messages: HashMap::new(),
            template_path: default_template_path(),
            use_sender: SenderKind::default(),
            smtp: None,
        }
    }
}

impl Config {
    /// Parses a configuration from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the JSON is malformed or misses
    /// required fields.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Loads a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read and [`Error::Config`]
    /// if it is not a valid configuration.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Returns the settings for a message type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the message type is not configured.
    pub fn message(&self, kind: &str) -> Result<&MessageConfig> {
        self.messages
            .get(kind)
            .ok_or_else(|| Error::Config(format!("email type not found: {kind}")))
    }

    /// Returns the sender for a message type: its own `from` if set,
    /// otherwise the global one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the message type is not configured.
    pub fn sender_address(&self, kind: &str) -> Result<&str> {
        let message = self.message(kind)?;
        Ok(message
            .from
            .as_deref()
            .filter(|from| !from.is_empty())
            .unwrap_or(&self.from))
    }

    /// Builds the email for one message type from its rendered content.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the message type is not configured.
    pub fn email_for(
        &self,
        kind: &str,
        to: impl Into<String>,
        rendered: Rendered,
        attachments: Vec<Attachment>,
    ) -> Result<Email> {
        let subject = self.message(kind)?.subject.clone();
        Ok(Email::new(self.sender_address(kind)?, to)
            .subject(subject)
            .body(rendered)
            .attachments(attachments))
    }

    /// Returns the SMTP settings, falling back to the defaults.
    #[must_use]
    pub fn smtp_or_default(&self) -> SmtpConfig {
        self.smtp.clone().unwrap_or_default()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    const CONFIG: &str = r#"{
        "from": "noreply@example.com",
        "template_path": "templates",
        "use": "smtp",
        "messages": {
            "welcome": { "subject": "Welcome!" },
            "receipt": { "subject": "Your receipt", "from": "billing@example.com" }
        },
        "smtp": { "server": "smtp.example.com", "port": 465, "tls": "ssl",
                  "username": "noreply", "password": "secret" }
    }"#;

    #[test]
    fn test_parse_full() {
        let config = Config::from_json(CONFIG).unwrap();
        assert_eq!(config.use_sender, SenderKind::Smtp);
        assert_eq!(config.template_path, PathBuf::from("templates"));

        let smtp = config.smtp.unwrap();
        assert_eq!(smtp.server, "smtp.example.com");
        assert_eq!(smtp.port, 465);
        assert_eq!(smtp.tls, TlsMode::Ssl);
        assert_eq!(smtp.username.as_deref(), Some("noreply"));
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_json(r#"{ "from": "a@x.test" }"#).unwrap();
        assert_eq!(config.use_sender, SenderKind::Mock);
        assert!(config.messages.is_empty());
        assert!(config.smtp.is_none());
        assert_eq!(config.template_path, PathBuf::from("templates"));

        let smtp = config.smtp_or_default();
        assert_eq!(smtp.server, "localhost");
        assert_eq!(smtp.port, 587);
        assert_eq!(smtp.tls, TlsMode::StartTls);
        assert!(smtp.username.is_none());

        let smtp: SmtpConfig = serde_json::from_str(r#"{ "tls": "none" }"#).unwrap();
        assert_eq!(smtp.tls, TlsMode::None);
        assert_eq!(smtp.port, 587);
    }

    #[test]
    fn test_default_matches_empty_json() {
        let config = Config::from_json(r#"{ "from": "" }"#).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_sender_address_fallback() {
        let config = Config::from_json(CONFIG).unwrap();
        assert_eq!(config.sender_address("welcome").unwrap(), "noreply@example.com");
        assert_eq!(config.sender_address("receipt").unwrap(), "billing@example.com");
        assert!(matches!(config.sender_address("unknown"), Err(Error::Config(_))));
    }

    #[test]
    fn test_email_for() {
        let config = Config::from_json(CONFIG).unwrap();
        let email = config
            .email_for(
                "receipt",
                "customer@example.org",
                Rendered {
                    text: "Thanks".into(),
                    html: String::new(),
                },
                Vec::new(),
            )
            .unwrap();
        assert_eq!(email.from, "billing@example.com");
        assert_eq!(email.to, "customer@example.org");
        assert_eq!(email.subject, "Your receipt");
        assert_eq!(email.text, "Thanks");
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(Config::from_json("{"), Err(Error::Config(_))));
        assert!(matches!(
            Config::from_json(r#"{ "from": "a@x.test", "use": "carrier-pigeon" }"#),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), CONFIG).unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.from, "noreply@example.com");

        assert!(matches!(
            Config::load(file.path().with_extension("missing")),
            Err(Error::Io(_))
        ));
    }

    #[test]
    fn test_default_ports() {
        assert_eq!(SmtpConfig::default_port(TlsMode::Ssl), 465);
        assert_eq!(SmtpConfig::default_port(TlsMode::StartTls), 587);
        assert_eq!(SmtpConfig::default_port(TlsMode::None), 25);
    }

    #[test]
    fn test_password_not_in_debug() {
        let smtp = SmtpConfig {
            password: "hunter2".into(),
            ..SmtpConfig::default()
        };
        assert!(!format!("{smtp:?}").contains("hunter2"));
    }
}
