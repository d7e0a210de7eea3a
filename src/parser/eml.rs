//! Reading individual `.eml` files (RFC 5322 messages, optionally with an
//! mbox `From ` line in front).

use std::path::Path;

use crate::error::{ClipperError, Result};

/// Read the raw bytes of a message file.
pub async fn read_message(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ClipperError::FileNotFound(path.to_path_buf())
        } else {
            ClipperError::io(path, e)
        }
    })
}
