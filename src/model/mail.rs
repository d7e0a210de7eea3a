//! The message snapshot supplied by the mail host.

use super::attachment::Attachment;

/// Read-only view of the displayed message, fetched once by
/// [`crate::host::MailHost::download`].
///
/// Header values are already decoded (RFC 2047 encoded-words resolved).
/// Optional headers are `None` when absent or empty.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct MailMessage {
    pub from: String,
    pub to: String,
    pub cc: Option<String>,
    pub bcc: Option<String>,
    /// Date header formatted for display.
    pub date: Option<String>,
    pub subject: String,
    /// Plain-text body (HTML-only messages are converted to text).
    pub plain_body: String,
    pub attachments: Vec<Attachment>,
}

impl MailMessage {
    /// Title for the note: the subject, or a placeholder when it is empty.
    pub fn note_title(&self) -> String {
        if self.subject.trim().is_empty() {
            "(no subject)".to_string()
        } else {
            self.subject.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_title_falls_back_for_empty_subject() {
        let msg = MailMessage {
            subject: "  ".to_string(),
            ..MailMessage::default()
        };
        assert_eq!(msg.note_title(), "(no subject)");

        let msg = MailMessage {
            subject: "Quarterly report".to_string(),
            ..MailMessage::default()
        };
        assert_eq!(msg.note_title(), "Quarterly report");
    }
}
