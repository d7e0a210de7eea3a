//! Attachment metadata.
//!
//! The binary payload is NOT held here. It stays with the mail host until
//! the submission asks for it through [`crate::host::MailHost::materialize`].

/// Opaque handle to an attachment's content inside its source message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ContentRef(pub(crate) usize);

/// Metadata about an email attachment.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Attachment {
    /// Filename of the attachment. Generated if missing from the headers.
    pub file_name: String,

    /// MIME content type (e.g. `"image/jpeg"`, `"application/pdf"`).
    pub content_type: String,

    /// Decoded size in bytes.
    pub size: u64,

    /// Where the host finds the content when it is materialized.
    pub content: ContentRef,
}

impl Attachment {
    /// Human-readable size, e.g. `"12.5 KiB"`.
    pub fn size_human(&self) -> String {
        humansize::format_size(self.size, humansize::BINARY)
    }
}
