//! Email address types.

use std::fmt;

use crate::error::{Error, Result};

/// Email address for the SMTP envelope.
///
/// Only the addr-spec is stored; it is written between angle brackets in
/// `MAIL FROM` and `RCPT TO`, so characters that would break the command
/// line are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address(String);

impl Address {
    /// Creates a new address from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid.
    pub fn new(addr: impl Into<String>) -> Result<Self> {
        let addr = addr.into();
        Self::validate(&addr)?;
        Ok(Self(addr))
    }

    /// Returns the address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(addr: &str) -> Result<()> {
        if addr.is_empty() {
            return Err(Error::InvalidAddress("Address cannot be empty".into()));
        }

        if let Some(c) = addr
            .chars()
            .find(|c| c.is_control() || c.is_whitespace() || matches!(c, '<' | '>'))
        {
            return Err(Error::InvalidAddress(format!(
                "Address contains forbidden character {c:?}: {addr:?}"
            )));
        }

        let Some((local, domain)) = addr.rsplit_once('@') else {
            return Err(Error::InvalidAddress(format!("Address must contain @: {addr}")));
        };

        if local.is_empty() || domain.is_empty() {
            return Err(Error::InvalidAddress(format!(
                "Local and domain parts cannot be empty: {addr}"
            )));
        }

        if domain.contains('@') || (local.contains('@') && !local.starts_with('"')) {
            return Err(Error::InvalidAddress(format!(
                "Address must have exactly one @: {addr}"
            )));
        }

        Ok(())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Mailbox as written in a `From` or `To` header: an optional display name
/// plus an address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mailbox {
    /// Display name (optional).
    pub name: Option<String>,
    /// Email address.
    pub address: Address,
}

impl Mailbox {
    /// Parses `user@example.com` or `Display Name <user@example.com>`.
    ///
    /// # Errors
    ///
    /// Returns an error if no valid address can be extracted.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        match s.rfind('<') {
            Some(open) if s.ends_with('>') => {
                let address = Address::new(&s[open + 1..s.len() - 1])?;
                let name = s[..open].trim().trim_matches('"').trim();
                Ok(Self {
                    name: (!name.is_empty()).then(|| name.to_string()),
                    address,
                })
            }
            _ => Ok(Self {
                name: None,
                address: Address::new(s)?,
            }),
        }
    }
}

impl fmt::Display for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{name} <{}>", self.address),
            None => write!(f, "{}", self.address),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_address() {
        let addr = Address::new("user@example.com").unwrap();
        assert_eq!(addr.as_str(), "user@example.com");
        assert_eq!(addr.to_string(), "user@example.com");
    }

    #[test]
    fn test_invalid_addresses() {
        assert!(Address::new("").is_err());
        assert!(Address::new("userexample.com").is_err());
        assert!(Address::new("@example.com").is_err());
        assert!(Address::new("user@").is_err());
        assert!(Address::new("a@b@c").is_err());
    }

    #[test]
    fn test_rejects_command_injection() {
        assert!(Address::new("user@example.com>\r\nRCPT TO:<evil@x").is_err());
        assert!(Address::new("user@example.com\n").is_err());
        assert!(Address::new("<user@example.com>").is_err());
        assert!(Address::new("us er@example.com").is_err());
    }

    #[test]
    fn test_mailbox_bare() {
        let mailbox = Mailbox::parse("user@example.com").unwrap();
        assert_eq!(mailbox.address.as_str(), "user@example.com");
        assert!(mailbox.name.is_none());
    }

    #[test]
    fn test_mailbox_with_name() {
        let mailbox = Mailbox::parse("\"John Doe\" <john@example.com>").unwrap();
        assert_eq!(mailbox.name.as_deref(), Some("John Doe"));
        assert_eq!(mailbox.address.as_str(), "john@example.com");
        assert_eq!(mailbox.to_string(), "John Doe <john@example.com>");

        let mailbox = Mailbox::parse("<john@example.com>").unwrap();
        assert!(mailbox.name.is_none());
    }

    #[test]
    fn test_mailbox_invalid() {
        assert!(Mailbox::parse("John <>").is_err());
        assert!(Mailbox::parse("not an address").is_err());
    }
}
