pub mod constants;
pub mod types;

// Re-export primary types for convenience.
pub use constants::CHUNK_SIZE;
pub use types::{
    FileDescriptor, FileKind, FileTokenResponse, UploadProgress, UploadReport, UploadResult,
};
