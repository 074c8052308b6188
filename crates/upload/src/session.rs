//! Per-file chunked upload state machine.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chatkit_protocol::constants::{CHUNK_SIZE, FILE_TOKEN_PATH, chunk_path, commit_path, total_chunks};
use chatkit_protocol::types::{FileDescriptor, FileKind, FileTokenResponse, UploadResult};
use reqwest::header::{AUTHORIZATION, CACHE_CONTROL, CONTENT_TYPE};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::UploadError;
use crate::auth::SessionAuth;
use crate::multipart::MultipartBody;
use crate::naming::{normalize_extension, sanitize_file_name};
use crate::reader::ChunkSource;

/// Progress observer: integer percent, 0-100, non-decreasing.
pub type ProgressFn = dyn Fn(u8) + Send + Sync;

/// Drives one file through token acquisition, sequential chunk upload,
/// and commit against the attachment service.
///
/// Steps are strictly ordered: the token response is awaited before chunk
/// 0, chunk `i` is acknowledged before chunk `i + 1` is sent, and the
/// commit goes out only after the final chunk. Every network round-trip
/// is a suspension point; the cancellation flag is re-checked before each
/// request is issued and after each response arrives, so a cancelled
/// session never reports success even when the in-flight request lands.
pub struct ChunkedUploadSession {
    file: FileDescriptor,
    user_id: String,
    file_context: String,
    auth: Arc<dyn SessionAuth>,
    source: Arc<dyn ChunkSource>,
    http: reqwest::Client,
    base_url: String,
    kind: FileKind,
    /// Server-safe filename sent on the wire and echoed in results.
    upload_name: String,
    extension: String,
    total_chunks: u64,
    current_chunk: AtomicU64,
    cancel: CancellationToken,
}

impl ChunkedUploadSession {
    /// Creates a session for `file`.
    ///
    /// The base URL is resolved from `auth` once, here; the token and
    /// user agent are re-read from `auth` at every request.
    pub fn new(
        file: FileDescriptor,
        user_id: impl Into<String>,
        file_context: impl Into<String>,
        auth: Arc<dyn SessionAuth>,
        source: Arc<dyn ChunkSource>,
    ) -> Self {
        let raw_extension = file
            .name
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .unwrap_or_default();
        let extension = normalize_extension(raw_extension, &file.mime_type);
        let upload_name = sanitize_file_name(&file.name, &extension);
        let kind = file.kind();
        let base_url = auth.base_url();
        let total_chunks = total_chunks(file.size);

        Self {
            file,
            user_id: user_id.into(),
            file_context: file_context.into(),
            auth,
            source,
            http: reqwest::Client::new(),
            base_url,
            kind,
            upload_name,
            extension,
            total_chunks,
            current_chunk: AtomicU64::new(0),
            cancel: CancellationToken::new(),
        }
    }

    /// The descriptor this session uploads.
    pub fn file(&self) -> &FileDescriptor {
        &self.file
    }

    /// Number of chunk requests this session will issue.
    pub fn total_chunks(&self) -> u64 {
        self.total_chunks
    }

    /// Index of the next chunk to be acknowledged.
    pub fn current_chunk(&self) -> u64 {
        self.current_chunk.load(Ordering::SeqCst)
    }

    /// Requests cooperative cancellation. Idempotent.
    ///
    /// An HTTP request already in flight is not aborted, but its result
    /// is discarded: the session fails with [`UploadError::Cancelled`]
    /// at the next checkpoint instead of ever reporting success.
    pub fn stop_loading(&self) {
        self.cancel.cancel();
    }

    /// Whether [`stop_loading`](Self::stop_loading) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Spawns the upload and routes the outcome to callbacks.
    ///
    /// `on_progress` fires before each chunk transfer with an integer
    /// percentage; exactly one of `on_success` / `on_error` fires once
    /// the session reaches a terminal state.
    pub fn start(
        self: &Arc<Self>,
        on_progress: impl Fn(u8) + Send + Sync + 'static,
        on_success: impl FnOnce(UploadResult) + Send + 'static,
        on_error: impl FnOnce(String) + Send + 'static,
    ) -> tokio::task::JoinHandle<()> {
        let session = Arc::clone(self);
        tokio::spawn(async move {
            match session.run(&on_progress).await {
                Ok(result) => on_success(result),
                Err(e) => {
                    warn!(file = %session.file.id, error = %e, "upload failed");
                    on_error(e.to_string());
                }
            }
        })
    }

    /// Runs the full upload to completion.
    ///
    /// Fails with [`UploadError::InvalidFile`] before any network
    /// activity when the descriptor has no name. No retries: the first
    /// error at any step is terminal.
    pub async fn run(&self, on_progress: &ProgressFn) -> Result<UploadResult, UploadError> {
        if self.file.name.is_empty() {
            return Err(UploadError::InvalidFile);
        }
        self.check_cancelled()?;

        debug!(
            file = %self.file.id,
            name = %self.upload_name,
            size = self.file.size,
            chunks = self.total_chunks,
            "starting chunked upload"
        );

        let token = self.request_token().await?;

        for chunk_no in 0..self.total_chunks {
            let start = chunk_no * CHUNK_SIZE;
            let length = CHUNK_SIZE.min(self.file.size - start);

            let percent = ((chunk_no + 1) * 100 / self.total_chunks) as u8;
            on_progress(percent);

            // Not reachable through normal flow; stops a runaway index.
            if self.current_chunk.load(Ordering::SeqCst) == self.total_chunks {
                break;
            }

            // Zero-byte files (and the trailing chunk of an exact
            // multiple of CHUNK_SIZE) upload an empty part without
            // touching the reader.
            let payload = if length == 0 {
                String::new()
            } else {
                self.source
                    .read_chunk(&self.file.path, length, start)
                    .await?
            };

            self.upload_chunk(&token, chunk_no, &payload).await?;
            self.current_chunk.fetch_add(1, Ordering::SeqCst);
        }

        self.commit(&token).await
    }

    async fn request_token(&self) -> Result<String, UploadError> {
        self.check_cancelled()?;

        let url = format!("{}{}", self.base_url, FILE_TOKEN_PATH);
        let response = self
            .http
            .post(&url)
            .header(AUTHORIZATION, self.auth.auth_token())
            .json(&serde_json::json!({ "User-Agent": self.auth.user_agent() }))
            .send()
            .await
            .map_err(|e| self.network_error("token", e.to_string()))?;

        self.check_cancelled()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(self.network_error("token", format!("status {status}: {body}")));
        }

        let token: FileTokenResponse = response
            .json()
            .await
            .map_err(|e| self.network_error("token", e.to_string()))?;
        debug!(file = %self.file.id, expires_on = ?token.expires_on, "file token issued");
        Ok(token.file_token)
    }

    async fn upload_chunk(
        &self,
        token: &str,
        chunk_no: u64,
        base64_data: &str,
    ) -> Result<(), UploadError> {
        self.check_cancelled()?;

        let mut form = MultipartBody::new();
        form.append_field("chunkNo", &chunk_no.to_string());
        form.append_field("fileToken", token);
        form.append_field("User-Agent", &self.auth.user_agent());
        form.append_file("chunk", &self.upload_name, base64_data);

        let url = format!("{}{}", self.base_url, chunk_path(&self.user_id, token));
        let response = self
            .http
            .post(&url)
            .header(AUTHORIZATION, self.auth.auth_token())
            .header(CONTENT_TYPE, form.content_type())
            .header(CACHE_CONTROL, "no-cache")
            .body(form.render())
            .send()
            .await
            .map_err(|e| self.network_error("chunk", format!("chunk {chunk_no}: {e}")))?;

        self.check_cancelled()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(self.network_error(
                "chunk",
                format!("chunk {chunk_no} status {status}: {body}"),
            ));
        }

        debug!(
            file = %self.file.id,
            chunk = chunk_no,
            total = self.total_chunks,
            "chunk accepted"
        );
        Ok(())
    }

    async fn commit(&self, token: &str) -> Result<UploadResult, UploadError> {
        self.check_cancelled()?;

        let mut form = MultipartBody::new();
        form.append_field("totalChunks", &self.total_chunks.to_string());
        form.append_field("fileToken", token);
        form.append_field("fileExtension", &self.extension);
        form.append_field("filename", &self.upload_name);
        form.append_field("fileContext", &self.file_context);
        form.append_field("thumbnailUpload", "false");
        form.append_field("User-Agent", &self.auth.user_agent());
        form.append_field("fileSize", &self.file.size.to_string());
        form.append_field("fileType", self.kind.as_str());
        if !self.file.mime_type.is_empty() {
            form.append_field("fileContentType", &self.file.mime_type);
        }

        let url = format!("{}{}", self.base_url, commit_path(&self.user_id, token));
        let response = self
            .http
            .put(&url)
            .header(AUTHORIZATION, self.auth.auth_token())
            .header(CONTENT_TYPE, form.content_type())
            .header(CACHE_CONTROL, "no-cache")
            .body(form.render())
            .send()
            .await
            .map_err(|e| self.network_error("commit", e.to_string()))?;

        self.check_cancelled()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(self.network_error("commit", format!("status {status}: {body}")));
        }

        let file_url = response
            .text()
            .await
            .map_err(|e| self.network_error("commit", e.to_string()))?;

        info!(file = %self.file.id, name = %self.upload_name, url = %file_url, "upload committed");
        Ok(UploadResult {
            kind: self.kind,
            file_name: self.upload_name.clone(),
            file_size: self.file.size,
            file_url,
        })
    }

    fn check_cancelled(&self) -> Result<(), UploadError> {
        if self.cancel.is_cancelled() {
            Err(UploadError::Cancelled(self.file.id.clone()))
        } else {
            Ok(())
        }
    }

    fn network_error(&self, stage: &'static str, detail: String) -> UploadError {
        UploadError::Network {
            file_id: self.file.id.clone(),
            stage,
            detail,
        }
    }
}
