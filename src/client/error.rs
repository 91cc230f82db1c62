use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("http error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("server responded {status} ({code}): {message}")]
    Server {
        status: StatusCode,
        code: String,
        message: String,
    },
    #[error("failed to parse body: {0}")]
    Decode(String),
    #[error("no workspace selected")]
    NoWorkspace,
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Server { status, .. } => Some(*status),
            Self::Network(err) => err.status(),
            _ => None,
        }
    }

    /// Client-side rejections (4xx) will fail again if retried unchanged.
    pub fn is_rejection(&self) -> bool {
        self.status().is_some_and(|status| status.is_client_error())
    }
}
