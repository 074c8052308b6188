use std::future::Future;
use std::io::{Read, Seek, SeekFrom};
use std::pin::Pin;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chatkit_protocol::constants::MAX_BYTE_RANGE;

use crate::UploadError;

/// Reads byte ranges of local files as base64.
///
/// Implemented over whatever file access the host platform provides.
/// Using a trait keeps the session testable and portable; a plain
/// filesystem implementation ships as [`FsChunkSource`].
pub trait ChunkSource: Send + Sync {
    /// Reads `length` bytes at `position` from the file at `path`,
    /// base64-encoded.
    ///
    /// Fails with [`UploadError::InvalidRead`] for a zero length, a
    /// position at or past end-of-file, or either value above 2^31 - 1
    /// (offsets are handed to 32-bit native file APIs downstream).
    fn read_chunk(
        &self,
        path: &str,
        length: u64,
        position: u64,
    ) -> Pin<Box<dyn Future<Output = Result<String, UploadError>> + Send + '_>>;
}

/// [`ChunkSource`] over the local filesystem.
///
/// Range reads run on the blocking thread pool. A range reaching past
/// end-of-file is clamped to the bytes actually present.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsChunkSource;

impl ChunkSource for FsChunkSource {
    fn read_chunk(
        &self,
        path: &str,
        length: u64,
        position: u64,
    ) -> Pin<Box<dyn Future<Output = Result<String, UploadError>> + Send + '_>> {
        let path = path.to_string();
        Box::pin(async move {
            validate_range(length, position)?;
            let data = tokio::task::spawn_blocking(move || read_range(&path, length, position))
                .await
                .map_err(|e| UploadError::InvalidRead(format!("read task failed: {e}")))??;
            Ok(STANDARD.encode(data))
        })
    }
}

fn validate_range(length: u64, position: u64) -> Result<(), UploadError> {
    if length == 0 {
        return Err(UploadError::InvalidRead("zero-length read".to_string()));
    }
    if length > MAX_BYTE_RANGE {
        return Err(UploadError::InvalidRead(format!(
            "length {length} exceeds the 32-bit range"
        )));
    }
    if position > MAX_BYTE_RANGE {
        return Err(UploadError::InvalidRead(format!(
            "position {position} exceeds the 32-bit range"
        )));
    }
    Ok(())
}

fn read_range(path: &str, length: u64, position: u64) -> Result<Vec<u8>, UploadError> {
    let mut file = std::fs::File::open(path)?;
    let file_size = file.metadata()?.len();
    if position >= file_size {
        return Err(UploadError::InvalidRead(format!(
            "position {position} is past the end of the file ({file_size} bytes)"
        )));
    }

    file.seek(SeekFrom::Start(position))?;
    let want = length.min(file_size - position) as usize;
    let mut buf = vec![0u8; want];
    file.read_exact(&mut buf)?;
    Ok(buf)
}
