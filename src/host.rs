//! The mail host: where the message being clipped comes from.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::error::Result;
use crate::model::attachment::Attachment;
use crate::model::mail::MailMessage;
use crate::parser::{eml, mime};

/// Read-only source of one message.
///
/// [`download`](Self::download) is called once per session. Attachment
/// bytes stay with the host until [`materialize`](Self::materialize) is
/// asked for them.
#[async_trait]
pub trait MailHost: Send + Sync {
    async fn download(&self) -> Result<MailMessage>;

    async fn materialize(&self, attachment: &Attachment) -> Result<Vec<u8>>;
}

/// A message stored as an `.eml` file on disk.
#[derive(Debug, Clone)]
pub struct EmlFile {
    path: PathBuf,
}

impl EmlFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl MailHost for EmlFile {
    async fn download(&self) -> Result<MailMessage> {
        let raw = eml::read_message(&self.path).await?;
        let message = mime::parse_message(&raw)?;
        debug!(
            path = %self.path.display(),
            bytes = raw.len(),
            attachments = message.attachments.len(),
            "Message loaded"
        );
        Ok(message)
    }

    async fn materialize(&self, attachment: &Attachment) -> Result<Vec<u8>> {
        // Re-read rather than keep every attachment of the message in memory.
        let raw = eml::read_message(&self.path).await?;
        let data = mime::extract_attachment(&raw, attachment.content)?;
        debug!(file_name = %attachment.file_name, bytes = data.len(), "Attachment materialized");
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[tokio::test]
    async fn test_eml_file_download_and_materialize() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            b"From: a@x.com\r\nTo: b@x.com\r\nSubject: Hi\r\n\
Content-Type: multipart/mixed; boundary=\"B\"\r\n\r\n\
--B\r\nContent-Type: text/plain\r\n\r\nBody\r\n\
--B\r\nContent-Type: text/plain\r\nContent-Disposition: attachment; filename=\"a.txt\"\r\n\r\nhello\r\n\
--B--\r\n",
        )
        .unwrap();

        let host = EmlFile::new(file.path());
        let msg = host.download().await.unwrap();
        assert_eq!(msg.subject, "Hi");
        assert_eq!(msg.attachments.len(), 1);

        let data = host.materialize(&msg.attachments[0]).await.unwrap();
        assert_eq!(data, b"hello");
    }
}
