/// Failure of a Coolify API call.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("failed to build HTTP client")]
    Client { source: reqwest::Error },

    /// Connection, timeout, or body read failure.
    #[error("request to {path} failed")]
    Transport {
        path: String,
        source: reqwest::Error,
    },

    #[error("API error (status {status}) on {path}: {body}")]
    Status {
        status: u16,
        path: String,
        body: String,
    },

    #[error("unexpected response from {path}")]
    Decode {
        path: String,
        source: serde_json::Error,
    },
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// 409: the resource already exists.
    pub fn is_conflict(&self) -> bool {
        self.status() == Some(409)
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status(), Some(401 | 403))
    }

    /// The request never produced an HTTP status.
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport { .. })
    }
}
