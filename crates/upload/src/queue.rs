//! Serial multi-file upload queue.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chatkit_protocol::types::{FileDescriptor, UploadProgress, UploadReport};
use tracing::{debug, info, warn};

use crate::auth::SessionAuth;
use crate::reader::ChunkSource;
use crate::session::ChunkedUploadSession;

/// Receives one terminal [`UploadReport`] per enqueued file.
pub type ResultCallback = Box<dyn Fn(UploadReport) + Send + Sync>;
/// Receives progress ticks from whichever file is in flight, tagged with
/// the file id.
pub type ProgressCallback = Box<dyn Fn(UploadProgress) + Send + Sync>;

/// Serializes file uploads: at most one in-flight
/// [`ChunkedUploadSession`] per queue, FIFO order among pending files,
/// removal by id at any stage.
///
/// A file's failure never halts the queue; the drain loop reports it and
/// moves straight on to the next pending file.
pub struct UploadQueue {
    inner: Arc<QueueInner>,
}

struct QueueInner {
    auth: Arc<dyn SessionAuth>,
    source: Arc<dyn ChunkSource>,
    file_context: String,
    on_result: ResultCallback,
    on_progress: ProgressCallback,
    state: Mutex<QueueState>,
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<FileDescriptor>,
    active: Option<(String, Arc<ChunkedUploadSession>)>,
    uploading: bool,
}

impl UploadQueue {
    /// Creates a queue that uploads with the given collaborators and
    /// surfaces outcomes through the two callbacks.
    pub fn new(
        auth: Arc<dyn SessionAuth>,
        source: Arc<dyn ChunkSource>,
        file_context: impl Into<String>,
        on_result: ResultCallback,
        on_progress: ProgressCallback,
    ) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                auth,
                source,
                file_context: file_context.into(),
                on_result,
                on_progress,
                state: Mutex::new(QueueState::default()),
            }),
        }
    }

    /// Appends `file` to the pending list and starts draining if idle.
    ///
    /// Must be called within a tokio runtime: the drain loop runs as a
    /// spawned task.
    pub fn add_to_queue(&self, file: FileDescriptor) {
        let mut state = self.inner.state.lock().unwrap();
        debug!(file = %file.id, pending = state.pending.len(), "file enqueued");
        state.pending.push_back(file);

        if !state.uploading {
            state.uploading = true;
            drop(state);
            let inner = Arc::clone(&self.inner);
            tokio::spawn(QueueInner::drain(inner));
        }
    }

    /// Removes any entry matching `file.id`.
    ///
    /// A pending entry is dropped before a session ever exists for it
    /// and produces no report. An in-flight entry has its session
    /// cancelled cooperatively; its failure report fires once the
    /// current network step resolves, and the queue moves on.
    pub fn remove_from_queue(&self, file: &FileDescriptor) {
        let mut state = self.inner.state.lock().unwrap();
        state.pending.retain(|pending| pending.id != file.id);

        if let Some((active_id, session)) = state.active.as_ref()
            && *active_id == file.id
        {
            debug!(file = %file.id, "cancelling in-flight upload");
            session.stop_loading();
        }
    }

    /// Number of files waiting to start (excludes the in-flight one).
    pub fn pending_len(&self) -> usize {
        self.inner.state.lock().unwrap().pending.len()
    }

    /// Whether a drain loop is currently running.
    pub fn is_uploading(&self) -> bool {
        self.inner.state.lock().unwrap().uploading
    }
}

impl QueueInner {
    /// Pops and uploads pending files until none remain.
    ///
    /// This loop is the only place sessions are constructed and started,
    /// which is what guarantees a single active upload per queue.
    async fn drain(inner: Arc<QueueInner>) {
        loop {
            let file = {
                let mut state = inner.state.lock().unwrap();
                match state.pending.pop_front() {
                    Some(file) => file,
                    None => {
                        state.uploading = false;
                        state.active = None;
                        break;
                    }
                }
            };

            // Credentials are resolved now, not at enqueue time, so a
            // token rotated while the file waited is the one used.
            let session = Arc::new(ChunkedUploadSession::new(
                file.clone(),
                inner.auth.user_id(),
                inner.file_context.clone(),
                Arc::clone(&inner.auth),
                Arc::clone(&inner.source),
            ));
            {
                let mut state = inner.state.lock().unwrap();
                state.active = Some((file.id.clone(), Arc::clone(&session)));
            }

            let id = file.id.clone();
            let inner_cb = Arc::clone(&inner);
            let id_cb = id.clone();
            let on_progress = move |percent: u8| {
                (inner_cb.on_progress)(UploadProgress {
                    id: id_cb.clone(),
                    progress: percent,
                });
            };

            let report = match session.run(&on_progress).await {
                Ok(result) => {
                    info!(file = %id, "upload finished");
                    UploadReport::completed(file, result)
                }
                Err(e) => {
                    warn!(file = %id, error = %e, "upload failed, continuing with queue");
                    UploadReport::failed(file, e.to_string())
                }
            };
            (inner.on_result)(report);
        }
        debug!("upload queue drained");
    }
}
