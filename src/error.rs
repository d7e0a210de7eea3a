//! Centralized error types for emailclipper.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// All errors produced by the emailclipper library.
#[derive(Error, Debug)]
pub enum ClipperError {
    /// The service answered outside 2xx, the connection failed, or the
    /// request timed out. `status` is 0 when no response was received.
    #[error("Service error {status}: {status_text}")]
    Transport { status: u16, status_text: String },

    /// A 2xx response whose body could not be decoded.
    #[error("Malformed response from '{path}': {reason}")]
    MalformedResponse { path: String, reason: String },

    /// The client was used before a service port was located.
    #[error("Not connected to the clipper service")]
    NotConnected,

    /// A failure after the connection was established, tagged with the
    /// submission step that raised it.
    #[error("{step} failed: {source}")]
    Submission {
        step: SubmitStep,
        #[source]
        source: Box<ClipperError>,
    },

    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The message file does not exist.
    #[error("Message file not found: {0}")]
    FileNotFound(PathBuf),

    /// A MIME decoding error.
    #[error("MIME decoding error: {0}")]
    MimeError(String),

    /// The requested attachment is not part of the message.
    #[error("Attachment '{0}' not found in message")]
    AttachmentNotFound(String),

    /// The HTTP client could not be built or a request could not be assembled.
    #[error("HTTP client error: {0}")]
    HttpClient(String),
}

/// Convenience alias for `Result<T, ClipperError>`.
pub type Result<T> = std::result::Result<T, ClipperError>;

/// The network step of a submission that failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitStep {
    ListNotebooks,
    ListTags,
    UploadResource(String),
    CreateNote,
    AssociateTag(String),
}

impl fmt::Display for SubmitStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ListNotebooks => write!(f, "Listing notebooks"),
            Self::ListTags => write!(f, "Listing tags"),
            Self::UploadResource(name) => write!(f, "Uploading attachment '{name}'"),
            Self::CreateNote => write!(f, "Creating note"),
            Self::AssociateTag(id) => write!(f, "Tagging note with '{id}'"),
        }
    }
}

impl ClipperError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Transport error for a request that never produced a response.
    pub fn transport_failed(status: u16) -> Self {
        Self::Transport {
            status,
            status_text: "transport failed".to_string(),
        }
    }

    /// Transport error for a request abandoned after its timeout.
    pub fn timed_out() -> Self {
        Self::Transport {
            status: 504,
            status_text: "timed out".to_string(),
        }
    }

    /// Wrap this error with the submission step it occurred in.
    pub fn during(self, step: SubmitStep) -> Self {
        Self::Submission {
            step,
            source: Box::new(self),
        }
    }

    /// HTTP status carried by a transport error, looking through step wrappers.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } => Some(*status),
            Self::Submission { source, .. } => source.status(),
            _ => None,
        }
    }

    /// The submission step this error was raised in, if any.
    pub fn step(&self) -> Option<&SubmitStep> {
        match self {
            Self::Submission { step, .. } => Some(step),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_through_submission_wrapper() {
        let err = ClipperError::Transport {
            status: 500,
            status_text: "Internal Server Error".to_string(),
        }
        .during(SubmitStep::CreateNote);
        assert_eq!(err.status(), Some(500));
        assert_eq!(err.step(), Some(&SubmitStep::CreateNote));
        assert_eq!(
            err.to_string(),
            "Creating note failed: Service error 500: Internal Server Error"
        );
    }

    #[test]
    fn test_timed_out_is_504() {
        assert_eq!(ClipperError::timed_out().status(), Some(504));
        assert_eq!(ClipperError::NotConnected.status(), None);
    }
}
