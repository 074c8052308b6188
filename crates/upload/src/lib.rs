//! Chunked attachment uploads for the ChatKit mobile SDK.
//!
//! A [`ChunkedUploadSession`] drives one file through token acquisition,
//! sequential chunk transfer, and commit against the attachment service.
//! [`UploadQueue`] accepts many files and serializes them into at most one
//! in-flight session, forwarding per-file progress and terminal reports.

mod auth;
mod multipart;
mod naming;
mod queue;
mod reader;
mod session;
#[cfg(test)]
pub(crate) mod testutil;

pub use auth::{SessionAuth, StaticAuth};
pub use multipart::MultipartBody;
pub use naming::{normalize_extension, sanitize_file_name};
pub use queue::{ProgressCallback, ResultCallback, UploadQueue};
pub use reader::{ChunkSource, FsChunkSource};
pub use session::{ChunkedUploadSession, ProgressFn};

/// Errors produced by the upload pipeline.
///
/// Every variant is terminal for its session: there is no retry of a
/// failed token, chunk, or commit call at this layer.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// The descriptor has no usable file name; detected before any I/O.
    #[error("invalid file: missing file name")]
    InvalidFile,

    /// A chunk read with an out-of-bounds length or position.
    #[error("invalid read: {0}")]
    InvalidRead(String),

    /// The session was cancelled via `stop_loading`.
    #[error("upload cancelled: {0}")]
    Cancelled(String),

    /// Transport-level failure at the token, chunk, or commit step.
    #[error("network error uploading {file_id} ({stage}): {detail}")]
    Network {
        file_id: String,
        stage: &'static str,
        detail: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
