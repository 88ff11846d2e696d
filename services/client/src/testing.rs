//! Test doubles for the transport port, shared by the unit tests of this crate.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot};
use voice_word_core::ports::{HttpRequest, HttpResponse, HttpTransport, PortResult};

pub(crate) const API_BASE: &str = "http://localhost:8000/api";

type Handler = Box<dyn Fn(&HttpRequest) -> PortResult<HttpResponse> + Send + Sync>;

/// Answers every request synchronously through a closure and records what it saw.
pub(crate) struct ScriptedTransport {
    handler: Handler,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new<F>(handler: F) -> Arc<Self>
    where
        F: Fn(&HttpRequest) -> PortResult<HttpResponse> + Send + Sync + 'static,
    {
        Arc::new(Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn paths(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .map(|r| format!("{} {}", r.method, r.url.trim_start_matches(API_BASE)))
            .collect()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn execute(&self, request: HttpRequest) -> PortResult<HttpResponse> {
        self.requests.lock().unwrap().push(request.clone());
        (self.handler)(&request)
    }
}

/// Parks every request until the test answers it, so tests control completion order.
pub(crate) struct GatedTransport {
    pending: mpsc::UnboundedSender<(HttpRequest, Reply)>,
}

pub(crate) type Reply = oneshot::Sender<PortResult<HttpResponse>>;
pub(crate) type Gate = mpsc::UnboundedReceiver<(HttpRequest, Reply)>;

impl GatedTransport {
    pub(crate) fn new() -> (Arc<Self>, Gate) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { pending: tx }), rx)
    }
}

#[async_trait]
impl HttpTransport for GatedTransport {
    async fn execute(&self, request: HttpRequest) -> PortResult<HttpResponse> {
        let (tx, rx) = oneshot::channel();
        self.pending.send((request, tx)).unwrap();
        rx.await.unwrap()
    }
}

pub(crate) fn user_json(id: i64, username: &str) -> Value {
    json!({ "id": id, "username": username, "created_at": "2024-01-10T09:00:00" })
}

pub(crate) fn record_json(id: i64, title: &str, status: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "original_text": null,
        "processed_text": null,
        "audio_file_path": format!("uploads/audio/{}.mp3", id),
        "word_file_path": null,
        "status": status,
        "error_message": null,
        "created_at": "2024-03-01T10:15:00",
        "updated_at": "2024-03-01T10:15:00"
    })
}

pub(crate) fn list_item_json(id: i64, title: &str, status: &str) -> Value {
    json!({ "id": id, "title": title, "status": status, "created_at": "2024-03-01T10:15:00" })
}

pub(crate) fn ok(value: Value) -> PortResult<HttpResponse> {
    Ok(HttpResponse::json(200, &value))
}

pub(crate) fn status(code: u16, detail: &str) -> PortResult<HttpResponse> {
    Ok(HttpResponse::json(code, &json!({ "detail": detail })))
}
