use std::sync::RwLock;

use chatkit_protocol::constants::DEFAULT_USER_AGENT;

/// Access to the host session: server location and current credentials.
///
/// Implemented by the embedding application on top of its socket/auth
/// client. Using a trait keeps the upload pipeline decoupled from the
/// session layer and testable with fixed credentials. The token and user
/// id are re-read at the start of every request, so a token rotated
/// mid-upload is honored.
pub trait SessionAuth: Send + Sync {
    /// Attachment service origin, e.g. `https://bots.example.com`.
    fn base_url(&self) -> String;

    /// Current value for the `Authorization` header.
    fn auth_token(&self) -> String;

    /// Current user id, interpolated into chunk and commit paths.
    fn user_id(&self) -> String;

    /// User-Agent advertised to the attachment service.
    fn user_agent(&self) -> String {
        DEFAULT_USER_AGENT.to_string()
    }
}

/// Fixed-credential [`SessionAuth`] for tests and simple embeddings.
///
/// The token can still be swapped at runtime with
/// [`set_auth_token`](Self::set_auth_token).
pub struct StaticAuth {
    base_url: String,
    user_id: String,
    token: RwLock<String>,
}

impl StaticAuth {
    /// Creates a provider with a fixed base URL, token, and user id.
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            user_id: user_id.into(),
            token: RwLock::new(token.into()),
        }
    }

    /// Replaces the stored token; subsequent requests use the new value.
    pub fn set_auth_token(&self, token: impl Into<String>) {
        *self.token.write().unwrap() = token.into();
    }
}

impl SessionAuth for StaticAuth {
    fn base_url(&self) -> String {
        self.base_url.clone()
    }

    fn auth_token(&self) -> String {
        self.token.read().unwrap().clone()
    }

    fn user_id(&self) -> String {
        self.user_id.clone()
    }
}
