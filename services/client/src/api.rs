//! services/client/src/api.rs
//!
//! The API client: builds backend URLs, attaches the bearer token and maps HTTP
//! responses onto `PortResult`s. Both the session manager and the records store share
//! one instance.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};
use voice_word_core::ports::{
    HttpMethod, HttpRequest, HttpResponse, HttpTransport, MultipartForm, PortError, PortResult,
    RequestBody, TokenStore,
};

//=========================================================================================
// Request Options
//=========================================================================================

/// Per-call options for `ApiClient::request`.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: HttpMethod,
    pub body: Option<serde_json::Value>,
    /// Caller headers. These win over the bearer header on a name clash.
    pub headers: Vec<(String, String)>,
    /// Skip the stored bearer token entirely.
    pub anonymous: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: HttpMethod::Get,
            body: None,
            headers: Vec::new(),
            anonymous: false,
        }
    }
}

impl RequestOptions {
    pub fn method(method: HttpMethod) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    pub fn json<B: Serialize>(mut self, body: &B) -> PortResult<Self> {
        let value =
            serde_json::to_value(body).map_err(|e| PortError::InvalidInput(e.to_string()))?;
        self.body = Some(value);
        Ok(self)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn anonymous(mut self) -> Self {
        self.anonymous = true;
        self
    }
}

//=========================================================================================
// ApiClient
//=========================================================================================

pub struct ApiClient {
    api_base: String,
    transport: Arc<dyn HttpTransport>,
    tokens: Arc<dyn TokenStore>,
}

impl ApiClient {
    pub fn new(
        api_base: impl Into<String>,
        transport: Arc<dyn HttpTransport>,
        tokens: Arc<dyn TokenStore>,
    ) -> Self {
        Self {
            api_base: api_base.into(),
            transport,
            tokens,
        }
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// The stored bearer token, if any.
    pub fn token(&self) -> Option<String> {
        self.tokens.load()
    }

    pub fn tokens(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    /// `Authorization: Bearer <token>` when a token is stored, otherwise nothing.
    pub fn auth_headers(&self) -> Vec<(String, String)> {
        match self.tokens.load() {
            Some(token) => vec![("Authorization".to_string(), format!("Bearer {}", token))],
            None => Vec::new(),
        }
    }

    /// Issues a JSON request against `<api_base><endpoint>` and decodes the response.
    pub async fn request<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> PortResult<T> {
        let base_headers = if options.anonymous {
            Vec::new()
        } else {
            self.auth_headers()
        };
        let request = HttpRequest {
            method: options.method,
            url: self.url(endpoint),
            headers: merge_headers(base_headers, options.headers),
            body: options.body.map(RequestBody::Json).unwrap_or(RequestBody::Empty),
        };
        let response = self.send(request).await?;
        decode(&response)
    }

    /// Posts a multipart form to `<api_base><endpoint>` with only the bearer header.
    pub async fn upload_file<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        form: MultipartForm,
    ) -> PortResult<T> {
        let request = HttpRequest {
            method: HttpMethod::Post,
            url: self.url(endpoint),
            headers: self.auth_headers(),
            body: RequestBody::Multipart(form),
        };
        let response = self.send(request).await?;
        decode(&response)
    }

    /// Fetches an absolute URL without any auth header and returns the raw body.
    pub async fn fetch_bytes(&self, url: &str) -> PortResult<Bytes> {
        let request = HttpRequest {
            method: HttpMethod::Get,
            url: url.to_string(),
            headers: Vec::new(),
            body: RequestBody::Empty,
        };
        Ok(self.send(request).await?.body)
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.api_base, endpoint)
    }

    async fn send(&self, request: HttpRequest) -> PortResult<HttpResponse> {
        let method = request.method;
        let url = loggable(&request.url).to_string();
        debug!("{} {}", method, url);

        let response = self.transport.execute(request).await?;
        if response.is_success() {
            return Ok(response);
        }

        let err = error_for_status(&response);
        warn!("{} {} returned {}: {}", method, url, response.status, err);
        Err(err)
    }
}

/// The URL without its query string, which may carry the download token.
pub(crate) fn loggable(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

fn merge_headers(
    mut base: Vec<(String, String)>,
    overrides: Vec<(String, String)>,
) -> Vec<(String, String)> {
    for (name, value) in overrides {
        base.retain(|(existing, _)| !existing.eq_ignore_ascii_case(&name));
        base.push((name, value));
    }
    base
}

fn decode<T: DeserializeOwned>(response: &HttpResponse) -> PortResult<T> {
    let body: &[u8] = if response.body.iter().all(u8::is_ascii_whitespace) {
        b"null"
    } else {
        &response.body
    };
    serde_json::from_slice(body).map_err(|e| PortError::Decode(e.to_string()))
}

/// Maps a non-2xx response onto the port error taxonomy.
fn error_for_status(response: &HttpResponse) -> PortError {
    let message = backend_detail(&response.body).unwrap_or_else(|| {
        reqwest::StatusCode::from_u16(response.status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("Request failed")
            .to_string()
    });
    match response.status {
        401 => PortError::Unauthorized(message),
        404 => PortError::NotFound(message),
        status => PortError::Http { status, message },
    }
}

/// Extracts `detail` from `{"detail": ...}` error bodies.
fn backend_detail(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    match value.get("detail")? {
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
