//! services/client/src/adapters/audio_file.rs
//!
//! Reads recordings from the local file system into upload-ready `AudioFile`s.

use std::path::Path;
use tracing::debug;
use voice_word_core::domain::AudioFile;

use crate::error::ClientError;

/// Loads `path`, keeping its file name for the upload. Unsupported extensions are
/// rejected before the file is read.
pub async fn load_audio_file(path: &Path) -> Result<AudioFile, ClientError> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ClientError::Internal(format!("'{}' has no file name", path.display())))?
        .to_string();

    // Validate the name first so a wrong file is not read for nothing.
    AudioFile::new(file_name.clone(), Vec::new())?;

    let bytes = tokio::fs::read(path).await?;
    debug!("Read {} bytes from {}", bytes.len(), path.display());
    Ok(AudioFile::new(file_name, bytes)?)
}
