use std::fmt::Write as _;

use uuid::Uuid;

/// Builder for the `multipart/form-data` bodies of chunk and commit
/// requests.
///
/// The attachment service takes the whole body as text: plain fields are
/// standard sections, file parts carry `Content-Transfer-Encoding:
/// base64` with the payload inline. The boundary gets a fresh random
/// suffix per request.
pub struct MultipartBody {
    boundary: String,
    body: String,
}

impl MultipartBody {
    /// Creates an empty body with a unique boundary.
    pub fn new() -> Self {
        Self {
            boundary: format!("--------MultipartData{}", Uuid::new_v4().simple()),
            body: String::new(),
        }
    }

    /// The boundary marker, without the leading dashes of a section line.
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Value for the request's `Content-Type` header.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Appends a plain form field.
    pub fn append_field(&mut self, name: &str, value: &str) {
        let _ = write!(
            self.body,
            "--{}\r\nContent-Disposition: form-data; name=\"{name}\";\r\n\r\n{value}\r\n",
            self.boundary,
        );
    }

    /// Appends a base64-encoded file part.
    pub fn append_file(&mut self, name: &str, file_name: &str, base64_data: &str) {
        let _ = write!(
            self.body,
            "--{}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Transfer-Encoding: base64\r\n\r\n{base64_data}\r\n",
            self.boundary,
        );
    }

    /// Renders the terminated body.
    pub fn render(&self) -> String {
        format!("{}--{}--", self.body, self.boundary)
    }
}

impl Default for MultipartBody {
    fn default() -> Self {
        Self::new()
    }
}
