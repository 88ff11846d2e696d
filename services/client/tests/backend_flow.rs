//! End-to-end flow against an in-process fake of the voice-word backend, driven through
//! the real `reqwest` transport and the on-disk cookie store.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use client_lib::{
    adapters::{FileCookieStore, HistoryNavigator, ReqwestTransport},
    config::Config,
    ClientContext,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::Level;
use voice_word_core::domain::{AudioFile, DownloadKind, RecordStatus, RecordUpdate};
use voice_word_core::ports::{Navigator, PortError, TokenStore};

//=========================================================================================
// Fake backend
//=========================================================================================

const TOKEN: &str = "T1";
const STAMP: &str = "2024-03-01T10:15:00";

#[derive(Default)]
struct Backend {
    records: Vec<Value>,
    next_id: i64,
    uploads: Vec<(String, String, Vec<u8>)>,
}

type Shared = Arc<Mutex<Backend>>;
type Reply = Result<Json<Value>, (StatusCode, Json<Value>)>;

fn reject(code: StatusCode, detail: &str) -> (StatusCode, Json<Value>) {
    (code, Json(json!({ "detail": detail })))
}

fn require_bearer(headers: &HeaderMap) -> Result<(), (StatusCode, Json<Value>)> {
    let expected = format!("Bearer {}", TOKEN);
    match headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        Some(value) if value == expected => Ok(()),
        _ => Err(reject(StatusCode::UNAUTHORIZED, "Could not validate credentials")),
    }
}

fn find(backend: &mut Backend, id: i64) -> Result<&mut Value, (StatusCode, Json<Value>)> {
    backend
        .records
        .iter_mut()
        .find(|r| r["id"] == id)
        .ok_or_else(|| reject(StatusCode::NOT_FOUND, "Record not found"))
}

async fn login(Json(body): Json<Value>) -> Reply {
    if body["username"] == "alice" && body["password"] == "pw" {
        Ok(Json(json!({ "access_token": TOKEN, "token_type": "bearer" })))
    } else {
        Err(reject(StatusCode::UNAUTHORIZED, "Invalid username or password"))
    }
}

async fn me(headers: HeaderMap) -> Reply {
    require_bearer(&headers)?;
    Ok(Json(json!({ "id": 1, "username": "alice", "created_at": STAMP })))
}

async fn list(State(state): State<Shared>, headers: HeaderMap) -> Reply {
    require_bearer(&headers)?;
    let backend = state.lock().unwrap();
    let items: Vec<Value> = backend
        .records
        .iter()
        .map(|r| {
            json!({
                "id": r["id"],
                "title": r["title"],
                "status": r["status"],
                "created_at": r["created_at"]
            })
        })
        .collect();
    Ok(Json(Value::Array(items)))
}

async fn create(
    State(state): State<Shared>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Reply {
    require_bearer(&headers)?;
    let mut title = None;
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| reject(StatusCode::BAD_REQUEST, &e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "title" {
            title = Some(field.text().await.unwrap());
        } else if name == "audio_file" {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let content_type = field.content_type().unwrap_or_default().to_string();
            let bytes = field.bytes().await.unwrap().to_vec();
            upload = Some((file_name, content_type, bytes));
        }
    }
    let (Some(title), Some(upload)) = (title, upload) else {
        return Err(reject(StatusCode::UNPROCESSABLE_ENTITY, "title and audio_file are required"));
    };

    let mut backend = state.lock().unwrap();
    backend.next_id += 1;
    let record = json!({
        "id": backend.next_id,
        "title": title,
        "original_text": null,
        "processed_text": null,
        "audio_file_path": format!("uploads/audio/{}", upload.0),
        "word_file_path": null,
        "status": "pending",
        "error_message": null,
        "created_at": STAMP,
        "updated_at": STAMP
    });
    backend.records.insert(0, record.clone());
    backend.uploads.push(upload);
    Ok(Json(record))
}

async fn get_one(State(state): State<Shared>, headers: HeaderMap, Path(id): Path<i64>) -> Reply {
    require_bearer(&headers)?;
    let mut backend = state.lock().unwrap();
    Ok(Json(find(&mut backend, id)?.clone()))
}

async fn patch_one(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Reply {
    require_bearer(&headers)?;
    let mut backend = state.lock().unwrap();
    let record = find(&mut backend, id)?;
    for key in ["title", "processed_text"] {
        if let Some(value) = body.get(key) {
            record[key] = value.clone();
        }
    }
    record["status"] = json!("completed");
    Ok(Json(record.clone()))
}

async fn delete_one(State(state): State<Shared>, headers: HeaderMap, Path(id): Path<i64>) -> Reply {
    require_bearer(&headers)?;
    let mut backend = state.lock().unwrap();
    find(&mut backend, id)?;
    backend.records.retain(|r| r["id"] != id);
    Ok(Json(json!({ "message": "Record deleted" })))
}

async fn regenerate(State(state): State<Shared>, headers: HeaderMap, Path(id): Path<i64>) -> Reply {
    require_bearer(&headers)?;
    let mut backend = state.lock().unwrap();
    let record = find(&mut backend, id)?;
    if record["processed_text"].is_null() {
        return Err(reject(StatusCode::BAD_REQUEST, "No text to generate the document from"));
    }
    record["word_file_path"] = json!(format!("uploads/documents/{}.docx", id));
    Ok(Json(record.clone()))
}

async fn download(
    State(state): State<Shared>,
    Path((id, kind)): Path<(i64, String)>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Vec<u8>, (StatusCode, Json<Value>)> {
    if query.get("token").map(String::as_str) != Some(TOKEN) {
        return Err(reject(StatusCode::UNAUTHORIZED, "Unauthorized"));
    }
    let backend = state.lock().unwrap();
    let record = backend
        .records
        .iter()
        .find(|r| r["id"] == id)
        .ok_or_else(|| reject(StatusCode::NOT_FOUND, "Record not found"))?;
    match kind.as_str() {
        "audio" => Ok(backend.uploads[0].2.clone()),
        "word" if !record["word_file_path"].is_null() => Ok(b"PK\x03\x04docx".to_vec()),
        _ => Err(reject(StatusCode::NOT_FOUND, "File not found")),
    }
}

/// Starts the fake backend on an ephemeral port and returns its API base URL.
async fn spawn_backend() -> (String, Shared) {
    let state: Shared = Arc::new(Mutex::new(Backend::default()));
    let app = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/me", get(me))
        .route("/api/records/", get(list).post(create))
        .route("/api/records/{id}", get(get_one).patch(patch_one).delete(delete_one))
        .route("/api/records/{id}/regenerate-word", post(regenerate))
        .route("/api/records/{id}/download/{kind}", get(download))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}/api", addr), state)
}

fn context(
    api_base: &str,
    token_path: std::path::PathBuf,
) -> (ClientContext, Arc<FileCookieStore>) {
    let config = Arc::new(Config {
        api_base: api_base.to_string(),
        token_path: token_path.clone(),
        log_level: Level::DEBUG,
    });
    let tokens = Arc::new(FileCookieStore::new(token_path));
    let ctx = ClientContext::new(
        config,
        Arc::new(ReqwestTransport::default()),
        tokens.clone(),
        Arc::new(HistoryNavigator::default()),
    );
    (ctx, tokens)
}

//=========================================================================================
// Tests
//=========================================================================================

#[tokio::test]
async fn full_session_and_record_lifecycle() {
    let (api_base, backend) = spawn_backend().await;
    let dir = tempfile::tempdir().unwrap();
    let cookie_path = dir.path().join("auth_token.json");
    let (ctx, tokens) = context(&api_base, cookie_path.clone());

    // Not logged in: every route lands on /login.
    assert_eq!(ctx.guard.navigate("/records/1").await.unwrap(), "/login");

    let err = ctx.auth.login("alice", "nope").await.unwrap_err();
    assert_eq!(err, PortError::Unauthorized("Invalid username or password".into()));
    assert_eq!(tokens.load(), None);

    ctx.auth.login("alice", "pw").await.unwrap();
    assert!(ctx.auth.is_authenticated());
    assert_eq!(tokens.load().as_deref(), Some(TOKEN));
    assert_eq!(ctx.guard.navigate("/login").await.unwrap(), "/");

    // A fresh context over the same cookie file picks the session back up.
    let (restarted, _) = context(&api_base, cookie_path.clone());
    assert!(!restarted.auth.is_authenticated());
    assert!(restarted.auth.check_auth().await);
    assert_eq!(restarted.auth.user().unwrap().username, "alice");

    // Upload.
    let audio = AudioFile::new("meeting.wav", b"RIFF....WAVE".to_vec()).unwrap();
    let created = ctx.records.create_record("Meeting", audio).await.unwrap();
    assert_eq!(created.status, RecordStatus::Pending);
    let listed = ctx.records.records();
    assert_eq!(listed.len(), 1);
    assert_eq!((listed[0].id, listed[0].title.as_str()), (created.id, "Meeting"));
    {
        let backend = backend.lock().unwrap();
        let (file_name, content_type, bytes) = &backend.uploads[0];
        assert_eq!(file_name, "meeting.wav");
        assert_eq!(content_type, "audio/wav");
        assert_eq!(bytes.as_slice(), b"RIFF....WAVE");
    }

    // Regenerating before there is text fails and is reported.
    let err = ctx.records.regenerate_word(created.id).await.unwrap_err();
    assert!(matches!(err, PortError::Http { status: 400, .. }));
    assert!(ctx.records.error().unwrap().contains("No text"));

    // Edit, then regenerate.
    let update = RecordUpdate {
        title: Some("Weekly meeting".into()),
        processed_text: Some("Agreed on the release date.".into()),
    };
    let updated = ctx.records.update_record(created.id, &update).await.unwrap();
    assert_eq!(updated.processed_text.as_deref(), Some("Agreed on the release date."));
    assert_eq!(ctx.records.records()[0].title, "Weekly meeting");
    assert_eq!(ctx.records.records()[0].status, RecordStatus::Completed);

    let regenerated = ctx.records.regenerate_word(created.id).await.unwrap();
    assert!(regenerated.word_file_path.is_some());
    assert_eq!(ctx.records.current_record(), Some(regenerated));
    assert_eq!(ctx.records.error(), None);

    // Downloads authenticate through the query string.
    assert_eq!(
        ctx.records.get_download_url(created.id, DownloadKind::Word),
        format!("{}/records/{}/download/word?token={}", api_base, created.id, TOKEN)
    );
    let word = ctx.records.download(created.id, DownloadKind::Word).await.unwrap();
    assert_eq!(word.as_ref(), b"PK\x03\x04docx");
    let audio = ctx.records.download(created.id, DownloadKind::Audio).await.unwrap();
    assert_eq!(audio.as_ref(), b"RIFF....WAVE");

    // Missing record: no throw, error recorded, current record kept.
    assert_eq!(ctx.records.fetch_record(99).await, None);
    assert_eq!(ctx.records.error().as_deref(), Some("Not found: Record not found"));
    assert_eq!(ctx.records.current_record().map(|r| r.id), Some(created.id));

    // Delete.
    ctx.records.delete_record(created.id).await.unwrap();
    assert!(ctx.records.records().is_empty());
    assert_eq!(ctx.records.current_record(), None);
    assert!(!ctx.records.loading());

    // Logout drops the cookie and lands on /login.
    ctx.auth.logout();
    assert!(!cookie_path.exists());
    assert_eq!(ctx.navigator.current(), "/login");
    let err = ctx.records.download(created.id, DownloadKind::Audio).await.unwrap_err();
    assert!(matches!(err, PortError::Unauthorized(_)));
}

#[tokio::test]
async fn stale_cookie_is_cleared_on_first_guarded_navigation() {
    let (api_base, _) = spawn_backend().await;
    let dir = tempfile::tempdir().unwrap();
    let cookie_path = dir.path().join("auth_token.json");
    FileCookieStore::new(cookie_path.clone()).store("revoked").unwrap();

    let (ctx, tokens) = context(&api_base, cookie_path.clone());
    assert_eq!(ctx.guard.navigate("/").await.unwrap(), "/login");
    assert_eq!(tokens.load(), None);
    assert!(!cookie_path.exists());
}

#[tokio::test]
async fn unreachable_backend_is_a_network_error() {
    // Bind then drop to get a port nothing listens on.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let dir = tempfile::tempdir().unwrap();
    let (ctx, _) = context(&format!("http://{}/api", addr), dir.path().join("auth_token.json"));

    let err = ctx.auth.login("alice", "pw").await.unwrap_err();
    assert!(matches!(err, PortError::Transport(_)));

    ctx.records.fetch_records().await;
    assert!(ctx.records.error().unwrap().starts_with("Network error"));
    assert!(!ctx.records.loading());
}
