//! crates/voice_word_core/src/ports.rs
//!
//! Defines the service contracts (traits) the client core needs from the outside world.
//! These traits are the boundary of the hexagonal architecture: the session manager and
//! records store only ever talk to an HTTP transport, a token store and a navigator.

use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;

use crate::domain::AudioFile;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },
    #[error("Network error: {0}")]
    Transport(String),
    #[error("Invalid response body: {0}")]
    Decode(String),
    #[error("Token storage error: {0}")]
    Storage(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

impl PortError {
    /// The human-facing part of the error, without the category prefix.
    pub fn detail(&self) -> &str {
        match self {
            PortError::Unauthorized(m)
            | PortError::NotFound(m)
            | PortError::Transport(m)
            | PortError::Decode(m)
            | PortError::Storage(m)
            | PortError::InvalidInput(m)
            | PortError::Unexpected(m) => m,
            PortError::Http { message, .. } => message,
        }
    }

    /// The full message, or `fallback` when the error carries no text.
    pub fn message_or(&self, fallback: &str) -> String {
        if self.detail().trim().is_empty() {
            fallback.to_string()
        } else {
            self.to_string()
        }
    }
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// HTTP Exchange Types
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One part of a multipart form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormPart {
    Text { name: String, value: String },
    File { name: String, file: AudioFile },
}

/// A multipart/form-data body, kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartForm {
    pub parts: Vec<FormPart>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(FormPart::Text {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn file(mut self, name: impl Into<String>, file: AudioFile) -> Self {
        self.parts.push(FormPart::File {
            name: name.into(),
            file,
        });
        self
    }

    pub fn text_value(&self, name: &str) -> Option<&str> {
        self.parts.iter().find_map(|part| match part {
            FormPart::Text { name: n, value } if n == name => Some(value.as_str()),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    Empty,
    Json(serde_json::Value),
    Multipart(MultipartForm),
}

/// A fully resolved outbound request: absolute URL, final header set, body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl HttpRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn json(status: u16, value: &serde_json::Value) -> Self {
        Self::new(status, value.to_string())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Performs one HTTP exchange. Returns `Err` only when no response was received;
    /// non-2xx statuses are returned as ordinary responses.
    async fn execute(&self, request: HttpRequest) -> PortResult<HttpResponse>;
}

/// Durable storage for the bearer token (the browser's `auth_token` cookie).
pub trait TokenStore: Send + Sync {
    /// The current token, or `None` if absent or expired.
    fn load(&self) -> Option<String>;

    fn store(&self, token: &str) -> PortResult<()>;

    fn clear(&self) -> PortResult<()>;
}

/// Where the application currently is, in route terms.
pub trait Navigator: Send + Sync {
    fn push(&self, path: &str);

    fn current(&self) -> String;
}
