use serde::{Deserialize, Serialize};

/// A file the host application wants uploaded.
///
/// Host file pickers disagree on the size field name (`size` vs
/// `fileSize`); both spellings deserialize into [`size`](Self::size),
/// missing values normalize to 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDescriptor {
    /// Caller-assigned stable identifier, used for queue removal and
    /// result correlation.
    pub id: String,
    pub name: String,
    /// Local filesystem path or URI.
    pub path: String,
    #[serde(default, alias = "fileSize")]
    pub size: u64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub mime_type: String,
}

impl FileDescriptor {
    /// Classifies the file for the attachment service.
    pub fn kind(&self) -> FileKind {
        FileKind::from_mime(&self.mime_type)
    }
}

/// Attachment-service classification of an uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileKind {
    #[serde(rename = "image")]
    Image,
    #[serde(rename = "attachment")]
    Attachment,
}

impl FileKind {
    /// `Image` for any MIME type mentioning "image", `Attachment` otherwise.
    pub fn from_mime(mime: &str) -> Self {
        if mime.contains("image") {
            FileKind::Image
        } else {
            FileKind::Attachment
        }
    }

    /// Wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Image => "image",
            FileKind::Attachment => "attachment",
        }
    }
}

/// Response to a file-token request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileTokenResponse {
    pub file_token: String,
    /// Token expiry, epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_on: Option<i64>,
}

/// Terminal result of one successful file upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResult {
    #[serde(rename = "type")]
    pub kind: FileKind,
    pub file_name: String,
    pub file_size: u64,
    /// Commit response body: where the assembled file lives.
    pub file_url: String,
}

/// Per-file outcome surfaced by the upload queue.
///
/// Failures carry the originating descriptor too, so a caller with several
/// files in flight can tell which one failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReport {
    #[serde(flatten)]
    pub file: FileDescriptor,
    pub status: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<UploadResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UploadReport {
    /// Builds a success report.
    pub fn completed(file: FileDescriptor, result: UploadResult) -> Self {
        Self {
            file,
            status: true,
            result: Some(result),
            error: None,
        }
    }

    /// Builds a failure report.
    pub fn failed(file: FileDescriptor, error: impl Into<String>) -> Self {
        Self {
            file,
            status: false,
            result: None,
            error: Some(error.into()),
        }
    }
}

/// Progress tick for an in-flight upload, tagged with the file id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadProgress {
    pub id: String,
    /// Integer percentage, 0-100, non-decreasing per file.
    pub progress: u8,
}
