//! File extension and name normalization before upload.
//!
//! Host file pickers hand over names with characters and extensions the
//! attachment service rejects; everything is normalized once, up front,
//! and the sanitized name is what goes on the wire and comes back in
//! results.

/// Extensions the attachment service is known to accept.
const ALLOWED_EXTENSIONS: &[&str] = &[
    // Images
    "jpg", "jpeg", "png", "gif", "bmp", "webp", "svg", "tiff", "ico",
    // Documents
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "txt", "rtf", "csv",
    // Archives
    "zip", "rar", "7z", "tar", "gz",
    // Audio
    "mp3", "wav", "aac", "m4a", "ogg", "flac",
    // Video
    "mp4", "avi", "mov", "wmv", "flv", "webm", "mkv",
    // Other
    "json", "xml", "html", "css", "js",
];

/// Fallback extension per MIME type, for files whose name carries none.
fn mime_extension(mime: &str) -> Option<&'static str> {
    let ext = match mime {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/bmp" => "bmp",
        "image/webp" => "webp",
        "image/svg+xml" => "svg",
        "image/tiff" => "tiff",
        "application/pdf" => "pdf",
        "application/msword" => "doc",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => "docx",
        "application/vnd.ms-excel" => "xls",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => "xlsx",
        "text/plain" => "txt",
        "text/csv" => "csv",
        "application/json" => "json",
        "text/html" => "html",
        "video/mp4" => "mp4",
        "video/quicktime" => "mov",
        "audio/mpeg" => "mp3",
        "audio/wav" => "wav",
        _ => return None,
    };
    Some(ext)
}

/// Produces a lowercase extension the attachment service will accept.
///
/// Order of preference: the cleaned raw extension when on the allowlist,
/// an extension derived from the MIME type, `jpg` for unknown image
/// types, a short plausible-looking extension as-is, `txt` as the last
/// resort.
pub fn normalize_extension(raw: &str, mime: &str) -> String {
    let clean: String = raw
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();

    if ALLOWED_EXTENSIONS.contains(&clean.as_str()) {
        return clean;
    }

    if let Some(ext) = mime_extension(mime) {
        return ext.to_string();
    }

    if mime.starts_with("image/") {
        return "jpg".to_string();
    }

    match clean.as_str() {
        "tif" => "tiff".to_string(),
        "htm" => "html".to_string(),
        _ if !clean.is_empty() && clean.len() <= 5 => clean,
        _ => "txt".to_string(),
    }
}

/// Rewrites `name` into a server-safe filename carrying `extension`.
///
/// Characters outside `[A-Za-z0-9_-]` become underscores, runs collapse
/// to one, leading/trailing underscores are trimmed, and the stem is
/// capped at 50 characters. An empty stem falls back to `file`.
pub fn sanitize_file_name(name: &str, extension: &str) -> String {
    let stem = match name.rfind('.') {
        Some(i) if i > 0 => &name[..i],
        _ => name,
    };

    let mut sanitized = String::with_capacity(stem.len());
    let mut last_underscore = false;
    for c in stem.chars() {
        if c.is_ascii_alphanumeric() || c == '-' {
            sanitized.push(c);
            last_underscore = false;
        } else if !last_underscore {
            sanitized.push('_');
            last_underscore = true;
        }
    }

    let mut sanitized = sanitized.trim_matches('_').to_string();
    if sanitized.is_empty() {
        sanitized = "file".to_string();
    }
    // All-ASCII by construction, so a byte cap is a char cap.
    sanitized.truncate(50);

    format!("{sanitized}.{extension}")
}
