/// Size for upload chunks (512 KiB).
///
/// Kept well inside 32-bit signed integer range: byte offsets computed
/// from it are handed to native file APIs on constrained mobile runtimes.
pub const CHUNK_SIZE: u64 = 512 * 1024;

/// Largest byte offset or length accepted by the chunk reader (2^31 - 1).
pub const MAX_BYTE_RANGE: u64 = i32::MAX as u64;

/// User-Agent sent when the host application does not supply one.
pub const DEFAULT_USER_AGENT: &str = "ChatKit/1.0";

/// Path for requesting a file upload token.
pub const FILE_TOKEN_PATH: &str = "/api/1.1/attachment/file/token";

/// Returns the path for uploading one chunk of a tokenized file.
pub fn chunk_path(user_id: &str, file_token: &str) -> String {
    format!("/api/1.1/users/{user_id}/file/{file_token}/chunk")
}

/// Returns the path for committing a fully-chunked file.
pub fn commit_path(user_id: &str, file_token: &str) -> String {
    format!("/api/1.1/users/{user_id}/file/{file_token}")
}

/// Number of chunks a file of `size` bytes uploads as.
///
/// Always at least 1: a zero-byte file still goes through one (empty)
/// chunk request, and an exact multiple of [`CHUNK_SIZE`] gets a trailing
/// empty chunk.
pub fn total_chunks(size: u64) -> u64 {
    size / CHUNK_SIZE + 1
}
