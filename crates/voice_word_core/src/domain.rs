//! crates/voice_word_core/src/domain.rs
//!
//! Defines the pure data structures exchanged with the voice-word backend.
//! These structs carry no transport or storage concerns beyond their JSON shape.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::ports::PortError;

/// Audio extensions the backend accepts for upload.
pub const ALLOWED_AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "m4a", "ogg", "flac", "webm"];

//=========================================================================================
// Users and Authentication
//=========================================================================================

/// The authenticated user, as returned by `GET /auth/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

/// Credentials posted to `POST /auth/login`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// The token pair returned by a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
}

//=========================================================================================
// Records
//=========================================================================================

/// Processing state of a record. Transitions are driven by the backend only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Pending,
    Processing,
    Completed,
    Error,
}

impl RecordStatus {
    /// True once the backend will no longer move the record on its own.
    pub fn is_terminal(self) -> bool {
        matches!(self, RecordStatus::Completed | RecordStatus::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RecordStatus::Pending => "pending",
            RecordStatus::Processing => "processing",
            RecordStatus::Completed => "completed",
            RecordStatus::Error => "error",
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One audio-to-document conversion job and its artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub original_text: Option<String>,
    #[serde(default)]
    pub processed_text: Option<String>,
    #[serde(default)]
    pub audio_file_path: Option<String>,
    #[serde(default)]
    pub word_file_path: Option<String>,
    pub status: RecordStatus,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

/// The listing projection of a `Record`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordListItem {
    pub id: i64,
    pub title: String,
    pub status: RecordStatus,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

/// Partial update sent with `PATCH /records/{id}`. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecordUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_text: Option<String>,
}

impl RecordUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.processed_text.is_none()
    }
}

/// Which artifact of a record to download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadKind {
    Audio,
    Word,
}

impl DownloadKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DownloadKind::Audio => "audio",
            DownloadKind::Word => "word",
        }
    }
}

impl fmt::Display for DownloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DownloadKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "audio" => Ok(DownloadKind::Audio),
            "word" => Ok(DownloadKind::Word),
            other => Err(format!("unknown download type '{}', expected audio or word", other)),
        }
    }
}

//=========================================================================================
// Uploads
//=========================================================================================

/// An audio file ready to be uploaded as the `audio_file` form part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFile {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Bytes,
}

impl AudioFile {
    /// Wraps raw audio bytes, rejecting extensions the backend would refuse.
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Result<Self, PortError> {
        let file_name = file_name.into();
        let extension = Path::new(&file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        if !ALLOWED_AUDIO_EXTENSIONS.contains(&extension.as_str()) {
            return Err(PortError::InvalidInput(format!(
                "unsupported audio format '{}', allowed: {}",
                file_name,
                ALLOWED_AUDIO_EXTENSIONS.join(", ")
            )));
        }

        Ok(Self {
            content_type: content_type_for(&extension),
            file_name,
            bytes: bytes.into(),
        })
    }
}

fn content_type_for(extension: &str) -> &'static str {
    match extension {
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "m4a" => "audio/mp4",
        "ogg" => "audio/ogg",
        "flac" => "audio/flac",
        "webm" => "audio/webm",
        _ => "application/octet-stream",
    }
}

//=========================================================================================
// Timestamp (de)serialization
//=========================================================================================

/// The backend emits naive ISO-8601 timestamps for some columns and offset-qualified
/// ones for others. Naive values are read as UTC.
mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if let Ok(parsed) = DateTime::parse_from_rfc3339(&raw) {
            return Ok(parsed.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .map_err(|e| de::Error::custom(format!("invalid timestamp '{}': {}", raw, e)))
    }
}
