//! Uploads a single local file to an attachment service.
//!
//! Usage: upload_file <BASE_URL> <AUTH_TOKEN> <USER_ID> <PATH>

use std::sync::Arc;

use chatkit_protocol::types::FileDescriptor;
use chatkit_upload::{ChunkedUploadSession, FsChunkSource, StaticAuth};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let (Some(base_url), Some(token), Some(user_id), Some(path)) =
        (args.next(), args.next(), args.next(), args.next())
    else {
        eprintln!("usage: upload_file <BASE_URL> <AUTH_TOKEN> <USER_ID> <PATH>");
        std::process::exit(2);
    };

    let size = std::fs::metadata(&path)?.len();
    let name = std::path::Path::new(&path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let file = FileDescriptor {
        id: "cli-upload".into(),
        name,
        path: path.clone(),
        size,
        mime_type: String::new(),
    };

    let auth = Arc::new(StaticAuth::new(base_url, token, user_id.clone()));
    let session = ChunkedUploadSession::new(file, user_id, "chat", auth, Arc::new(FsChunkSource));

    let result = session.run(&|percent| println!("{percent}%")).await?;
    println!("uploaded {} ({} bytes) -> {}", result.file_name, result.file_size, result.file_url);
    Ok(())
}
