//! The outgoing email value.

use crate::attachment::Attachment;

/// Output of a template render.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rendered {
    /// Plain text body.
    pub text: String,
    /// HTML body; empty when the template has no HTML variant.
    pub html: String,
}

/// An email ready to be assembled and sent.
#[derive(Debug, Clone, Default)]
pub struct Email {
    /// Sender shown in the `From` header.
    pub from: String,
    /// Envelope sender, if different from `from`.
    pub smtp_from: Option<String>,
    /// Single recipient.
    pub to: String,
    /// Subject line; no header is written when empty.
    pub subject: String,
    /// Attachments in registration order.
    pub attachments: Vec<Attachment>,
    /// Plain text body.
    pub text: String,
    /// HTML body; empty for text-only messages.
    pub html: String,
}

impl Email {
    /// Creates a new email.
    #[must_use]
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            ..Self::default()
        }
    }

    /// Sets the envelope sender.
    #[must_use]
    pub fn smtp_from(mut self, smtp_from: impl Into<String>) -> Self {
        self.smtp_from = Some(smtp_from.into());
        self
    }

    /// Sets the subject.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Sets the text and HTML bodies.
    #[must_use]
    pub fn body(mut self, rendered: Rendered) -> Self {
        self.text = rendered.text;
        self.html = rendered.html;
        self
    }

    /// Sets the attachments.
    #[must_use]
    pub fn attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }

    /// Address for `MAIL FROM`: `smtp_from` unless empty, else `from`.
    #[must_use]
    pub fn envelope_from(&self) -> &str {
        match self.smtp_from.as_deref() {
            Some(smtp_from) if !smtp_from.is_empty() => smtp_from,
            _ => &self.from,
        }
    }

    /// Value of the `From` header: `from` unless empty, else `smtp_from`.
    #[must_use]
    pub fn header_from(&self) -> &str {
        if self.from.is_empty() {
            self.smtp_from.as_deref().unwrap_or_default()
        } else {
            &self.from
        }
    }

    /// Returns true if the message has an HTML alternative.
    #[must_use]
    pub fn has_html(&self) -> bool {
        !self.html.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_prefers_smtp_from() {
        let email = Email::new("disp@y.test", "to@z.test").smtp_from("env@x.test");
        assert_eq!(email.envelope_from(), "env@x.test");
        assert_eq!(email.header_from(), "disp@y.test");
    }

    #[test]
    fn test_empty_smtp_from_is_ignored() {
        let email = Email::new("disp@y.test", "to@z.test").smtp_from("");
        assert_eq!(email.envelope_from(), "disp@y.test");

        let email = Email::new("disp@y.test", "to@z.test");
        assert_eq!(email.envelope_from(), "disp@y.test");
        assert_eq!(email.header_from(), "disp@y.test");
    }

    #[test]
    fn test_header_from_falls_back() {
        let email = Email::new("", "to@z.test").smtp_from("env@x.test");
        assert_eq!(email.header_from(), "env@x.test");
    }

    #[test]
    fn test_builder() {
        let email = Email::new("a@x.test", "b@y.test")
            .subject("Hi")
            .body(Rendered {
                text: "Hello".into(),
                html: String::new(),
            });
        assert_eq!(email.subject, "Hi");
        assert_eq!(email.text, "Hello");
        assert!(!email.has_html());
        assert!(email.attachments.is_empty());
    }
}
