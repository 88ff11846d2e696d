//! services/client/src/store.rs
//!
//! The records store: list and detail state for voice records plus the CRUD actions
//! that keep it in sync with the backend.
//!
//! Every action marks the store as loading, clears the previous error, talks to the
//! backend and records a message on failure. Read actions swallow their errors; mutating
//! actions hand them back to the caller as well.
//!
//! List and detail responses carry a sequence number. A response that is older than the
//! last one applied to the same slot is dropped, so overlapping calls settle on the
//! newest request instead of whichever response happened to arrive last.

use bytes::Bytes;
use serde::de::IgnoredAny;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info};
use voice_word_core::domain::{AudioFile, DownloadKind, Record, RecordListItem, RecordUpdate};
use voice_word_core::ports::{HttpMethod, MultipartForm, PortError, PortResult};

use crate::api::{ApiClient, RequestOptions};

const LOAD_RECORDS_FAILED: &str = "Failed to load records";
const LOAD_RECORD_FAILED: &str = "Failed to load record";
const CREATE_FAILED: &str = "Failed to create record";
const UPDATE_FAILED: &str = "Failed to update record";
const DELETE_FAILED: &str = "Failed to delete record";
const REGENERATE_FAILED: &str = "Failed to generate document";

//=========================================================================================
// State
//=========================================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordsState {
    pub records: Vec<RecordListItem>,
    pub current_record: Option<Record>,
    pub loading: bool,
    pub error: Option<String>,
}

/// Issues and checks sequence numbers for one slot of state.
#[derive(Default)]
struct Sequence {
    issued: AtomicU64,
    applied: AtomicU64,
}

impl Sequence {
    fn next(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Marks `id` as applied unless something newer already was.
    fn accept(&self, id: u64) -> bool {
        self.applied.fetch_max(id, Ordering::SeqCst) < id
    }

    /// True once a newer request has been issued for the slot. Leaves `applied` alone.
    fn superseded(&self, id: u64) -> bool {
        self.issued.load(Ordering::SeqCst) > id
    }
}

//=========================================================================================
// RecordsStore
//=========================================================================================

pub struct RecordsStore {
    api: Arc<ApiClient>,
    state: watch::Sender<RecordsState>,
    in_flight: AtomicUsize,
    list_seq: Sequence,
    detail_seq: Sequence,
}

/// Holds the store in the loading state until dropped, including when the action's
/// future is dropped before completion.
struct InFlight<'a> {
    store: &'a RecordsStore,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.store.in_flight.fetch_sub(1, Ordering::SeqCst);
        let in_flight = &self.store.in_flight;
        self.store
            .state
            .send_modify(|s| s.loading = in_flight.load(Ordering::SeqCst) > 0);
    }
}

impl RecordsStore {
    pub fn new(api: Arc<ApiClient>) -> Self {
        let (state, _) = watch::channel(RecordsState::default());
        Self {
            api,
            state,
            in_flight: AtomicUsize::new(0),
            list_seq: Sequence::default(),
            detail_seq: Sequence::default(),
        }
    }

    // --- Snapshots ---

    pub fn state(&self) -> RecordsState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<RecordsState> {
        self.state.subscribe()
    }

    pub fn records(&self) -> Vec<RecordListItem> {
        self.state.borrow().records.clone()
    }

    pub fn current_record(&self) -> Option<Record> {
        self.state.borrow().current_record.clone()
    }

    pub fn loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn error(&self) -> Option<String> {
        self.state.borrow().error.clone()
    }

    // --- Actions ---

    /// Replaces the list with the backend's. Failures are recorded, not returned.
    pub async fn fetch_records(&self) {
        let _in_flight = self.begin();
        let seq = self.list_seq.next();

        match self
            .api
            .request::<Vec<RecordListItem>>("/records/", RequestOptions::default())
            .await
        {
            Ok(records) => {
                if self.list_seq.accept(seq) {
                    debug!("Loaded {} records", records.len());
                    self.state.send_modify(|s| s.records = records);
                } else {
                    debug!("Discarding stale record list (request {})", seq);
                }
            }
            Err(e) if self.list_seq.superseded(seq) => {
                debug!("Ignoring failure of superseded record list (request {}): {}", seq, e);
            }
            Err(e) => {
                error!("Failed to load records: {}", e);
                self.fail(&e, LOAD_RECORDS_FAILED);
            }
        }
    }

    /// Loads one record into `current_record`. Returns `None` on failure and leaves the
    /// current record untouched.
    pub async fn fetch_record(&self, id: i64) -> Option<Record> {
        self.load_record(id).await.ok()
    }

    /// Uploads a new recording, then refreshes the list.
    pub async fn create_record(&self, title: &str, audio: AudioFile) -> PortResult<Record> {
        let _in_flight = self.begin();

        let form = MultipartForm::new()
            .text("title", title)
            .file("audio_file", audio);
        match self.api.upload_file::<Record>("/records/", form).await {
            Ok(record) => {
                info!("Created record {} ({})", record.id, record.status);
                self.fetch_records().await;
                Ok(record)
            }
            Err(e) => {
                error!("Failed to create record: {}", e);
                self.fail(&e, CREATE_FAILED);
                Err(e)
            }
        }
    }

    /// Applies a partial update, makes the result current, then refreshes the list.
    pub async fn update_record(&self, id: i64, update: &RecordUpdate) -> PortResult<Record> {
        let _in_flight = self.begin();
        let seq = self.detail_seq.next();

        let result = async {
            let options = RequestOptions::method(HttpMethod::Patch).json(update)?;
            self.api
                .request::<Record>(&format!("/records/{}", id), options)
                .await
        }
        .await;

        match result {
            Ok(record) => {
                self.set_current(seq, record.clone());
                self.fetch_records().await;
                Ok(record)
            }
            Err(e) => {
                error!("Failed to update record {}: {}", id, e);
                self.fail(&e, UPDATE_FAILED);
                Err(e)
            }
        }
    }

    /// Deletes a record and drops it from local state.
    pub async fn delete_record(&self, id: i64) -> PortResult<()> {
        let _in_flight = self.begin();
        let list_seq = self.list_seq.next();
        let detail_seq = self.detail_seq.next();

        match self
            .api
            .request::<IgnoredAny>(
                &format!("/records/{}", id),
                RequestOptions::method(HttpMethod::Delete),
            )
            .await
        {
            Ok(_) => {
                info!("Deleted record {}", id);
                // Older in-flight reads must not bring the record back.
                self.list_seq.accept(list_seq);
                self.detail_seq.accept(detail_seq);
                self.state.send_modify(|s| {
                    s.records.retain(|r| r.id != id);
                    if s.current_record.as_ref().map(|r| r.id) == Some(id) {
                        s.current_record = None;
                    }
                });
                Ok(())
            }
            Err(e) => {
                error!("Failed to delete record {}: {}", id, e);
                self.fail(&e, DELETE_FAILED);
                Err(e)
            }
        }
    }

    /// Asks the backend to rebuild the Word document from the current processed text.
    pub async fn regenerate_word(&self, id: i64) -> PortResult<Record> {
        let _in_flight = self.begin();
        let seq = self.detail_seq.next();

        match self
            .api
            .request::<Record>(
                &format!("/records/{}/regenerate-word", id),
                RequestOptions::method(HttpMethod::Post),
            )
            .await
        {
            Ok(record) => {
                info!("Regenerated document for record {}", id);
                self.set_current(seq, record.clone());
                Ok(record)
            }
            Err(e) => {
                error!("Failed to regenerate document for record {}: {}", id, e);
                self.fail(&e, REGENERATE_FAILED);
                Err(e)
            }
        }
    }

    /// The download link for an artifact. The download endpoints authenticate through
    /// the `token` query parameter rather than a header; with no token stored the
    /// parameter is left empty.
    pub fn get_download_url(&self, id: i64, kind: DownloadKind) -> String {
        format!(
            "{}/records/{}/download/{}?token={}",
            self.api.api_base(),
            id,
            kind,
            self.api.token().unwrap_or_default()
        )
    }

    /// Fetches an artifact's bytes through its download link. Store state is untouched.
    pub async fn download(&self, id: i64, kind: DownloadKind) -> PortResult<Bytes> {
        let url = self.get_download_url(id, kind);
        let bytes = self.api.fetch_bytes(&url).await?;
        debug!("Downloaded {} bytes of {} for record {}", bytes.len(), kind, id);
        Ok(bytes)
    }

    /// Polls the record until the backend finishes with it (completed or error).
    pub async fn wait_for_completion(
        &self,
        id: i64,
        interval: Duration,
        max_attempts: u32,
    ) -> PortResult<Record> {
        let mut last_status = None;
        for attempt in 1..=max_attempts {
            let record = self.load_record(id).await?;
            if record.status.is_terminal() {
                return Ok(record);
            }
            debug!("Record {} is {} (check {}/{})", id, record.status, attempt, max_attempts);
            last_status = Some(record.status);
            if attempt < max_attempts {
                tokio::time::sleep(interval).await;
            }
        }
        Err(PortError::Unexpected(format!(
            "record {} still {} after {} checks",
            id,
            last_status.map(|s| s.as_str()).unwrap_or("unchecked"),
            max_attempts
        )))
    }

    // --- Internals ---

    async fn load_record(&self, id: i64) -> PortResult<Record> {
        let _in_flight = self.begin();
        let seq = self.detail_seq.next();

        match self
            .api
            .request::<Record>(&format!("/records/{}", id), RequestOptions::default())
            .await
        {
            Ok(record) => {
                self.set_current(seq, record.clone());
                Ok(record)
            }
            Err(e) if self.detail_seq.superseded(seq) => {
                debug!("Ignoring failure of superseded record {} (request {}): {}", id, seq, e);
                Err(e)
            }
            Err(e) => {
                error!("Failed to load record {}: {}", id, e);
                self.fail(&e, LOAD_RECORD_FAILED);
                Err(e)
            }
        }
    }

    fn begin(&self) -> InFlight<'_> {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        self.state.send_modify(|s| {
            s.loading = true;
            s.error = None;
        });
        InFlight { store: self }
    }

    fn set_current(&self, seq: u64, record: Record) {
        if self.detail_seq.accept(seq) {
            self.state.send_modify(|s| s.current_record = Some(record));
        } else {
            debug!("Discarding stale record {} (request {})", record.id, seq);
        }
    }

    fn fail(&self, err: &PortError, fallback: &str) {
        let message = err.message_or(fallback);
        self.state.send_modify(|s| s.error = Some(message));
    }
}
