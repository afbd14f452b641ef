//! Attachments registered while a message body is rendered.
//!
//! A template calls `attach("report.pdf")` or `inline("logo.png")` and puts
//! the returned ID into its output (`cid:1` for inline images). The registry
//! reads the file, sniffs its media type and keeps the attachments in
//! registration order for the assembler.

use std::cell::RefCell;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use mailwright_mime::sniff;
use mailwright_mime::{BinaryPart, Disposition};
use tracing::debug;

/// Where an attachment is placed in the assembled message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachmentType {
    /// Referenced from the HTML body by `cid:<id>`.
    Inline,
    /// Offered as a separate file.
    Standalone,
}

impl AttachmentType {
    /// Returns the `Content-Disposition` used for this type.
    #[must_use]
    pub const fn disposition(self) -> Disposition {
        match self {
            Self::Inline => Disposition::Inline,
            Self::Standalone => Disposition::Attachment,
        }
    }
}

impl fmt::Display for AttachmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.disposition().as_str())
    }
}

/// A file attached to an outgoing message.
#[derive(Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Decimal ID, unique within one registry.
    pub id: String,
    /// Base file name.
    pub name: String,
    /// File contents.
    pub data: Vec<u8>,
    /// Media type detected from the contents.
    pub media_type: String,
    /// Inline or standalone.
    pub attachment_type: AttachmentType,
}

impl Attachment {
    /// Returns the MIME part for this attachment.
    #[must_use]
    pub fn to_part(&self) -> BinaryPart<'_> {
        BinaryPart {
            media_type: &self.media_type,
            disposition: self.attachment_type.disposition(),
            filename: &self.name,
            content_id: &self.id,
            data: &self.data,
        }
    }

    /// Returns true for attachments placed next to the HTML body.
    #[must_use]
    pub fn is_inline(&self) -> bool {
        self.attachment_type == AttachmentType::Inline
    }
}

impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("data", &format_args!("{} bytes", self.data.len()))
            .field("media_type", &self.media_type)
            .field("attachment_type", &self.attachment_type)
            .finish()
    }
}

#[derive(Debug, Default)]
struct Registered {
    last_id: u64,
    attachments: Vec<Attachment>,
}

/// Collects the attachments of one outgoing message.
///
/// The registry is shared by the `attach` and `inline` callbacks handed to
/// the renderer, so it takes `&self` and keeps its state in a [`RefCell`].
/// Use one registry per message.
#[derive(Debug, Default)]
pub struct AttachmentRegistry {
    inner: RefCell<Registered>,
}

impl AttachmentRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `base_dir/filename` and registers it.
    ///
    /// Returns the new attachment's ID. IDs are `"1"`, `"2"`, ... in call
    /// order; a failed read does not consume an ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn add(
        &self,
        attachment_type: AttachmentType,
        base_dir: &Path,
        filename: &str,
    ) -> io::Result<String> {
        let path = base_dir.join(filename);
        let data = fs::read(&path)?;
        let media_type = sniff::detect(&data).to_string();
        let name = Path::new(filename)
            .file_name()
            .map_or_else(|| filename.to_string(), |n| n.to_string_lossy().into_owned());

        let mut inner = self.inner.borrow_mut();
        inner.last_id += 1;
        let id = inner.last_id.to_string();
        debug!(
            id = %id,
            path = %path.display(),
            media_type = %media_type,
            kind = %attachment_type,
            "registered attachment"
        );

        inner.attachments.push(Attachment {
            id: id.clone(),
            name,
            data,
            media_type,
            attachment_type,
        });
        Ok(id)
    }

    /// Returns a callback registering standalone attachments relative to
    /// `base_dir`.
    pub fn attach_fn(
        &self,
        base_dir: impl Into<PathBuf>,
    ) -> impl Fn(&str) -> io::Result<String> + '_ {
        self.bound(AttachmentType::Standalone, base_dir.into())
    }

    /// Returns a callback registering inline attachments relative to
    /// `base_dir`.
    pub fn inline_fn(
        &self,
        base_dir: impl Into<PathBuf>,
    ) -> impl Fn(&str) -> io::Result<String> + '_ {
        self.bound(AttachmentType::Inline, base_dir.into())
    }

    fn bound(
        &self,
        attachment_type: AttachmentType,
        base_dir: PathBuf,
    ) -> impl Fn(&str) -> io::Result<String> + '_ {
        move |filename| self.add(attachment_type, &base_dir, filename)
    }

    /// Returns the number of registered attachments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.borrow().attachments.len()
    }

    /// Returns true if nothing has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consumes the registry, returning the attachments in registration
    /// order.
    #[must_use]
    pub fn into_attachments(self) -> Vec<Attachment> {
        self.inner.into_inner().attachments
    }
}
