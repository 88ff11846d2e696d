//! services/client/src/adapters/http.rs
//!
//! This module contains the HTTP adapter backed by `reqwest`.
//! It implements the `HttpTransport` port from the `core` crate.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method};
use tracing::{debug, warn};
use voice_word_core::ports::{
    FormPart, HttpMethod, HttpRequest, HttpResponse, HttpTransport, MultipartForm, PortError,
    PortResult, RequestBody,
};

use crate::api::loggable;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `HttpTransport` port using a shared `reqwest::Client`.
#[derive(Clone, Default)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Creates a new `ReqwestTransport`.
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn to_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}

fn to_form(form: MultipartForm) -> PortResult<Form> {
    let mut out = Form::new();
    for part in form.parts {
        out = match part {
            FormPart::Text { name, value } => out.text(name, value),
            FormPart::File { name, file } => {
                let part = Part::bytes(file.bytes.to_vec())
                    .file_name(file.file_name)
                    .mime_str(file.content_type)
                    .map_err(|e| PortError::InvalidInput(e.to_string()))?;
                out.part(name, part)
            }
        };
    }
    Ok(out)
}

//=========================================================================================
// `HttpTransport` Trait Implementation
//=========================================================================================

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> PortResult<HttpResponse> {
        let mut builder = self
            .client
            .request(to_method(request.method), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Multipart(form) => builder.multipart(to_form(form)?),
        };

        // Call the server and manually map the error, which respects the orphan rule.
        let response = builder.send().await.map_err(|e| {
            let e = e.without_url();
            warn!("{} {} failed: {}", request.method, loggable(&request.url), e);
            PortError::Transport(e.to_string())
        })?;

        let status = response.status().as_u16();
        debug!("{} {} -> {}", request.method, loggable(&request.url), status);
        let body = response
            .bytes()
            .await
            .map_err(|e| PortError::Transport(e.without_url().to_string()))?;

        Ok(HttpResponse { status, body })
    }
}
