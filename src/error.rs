use thiserror::Error;

#[derive(Debug, Error)]
pub enum IllustrateError {
    #[error("api error ({status}): {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("failed to decode image payload: {0}")]
    Decode(String),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("missing required configuration: {}", .0.join(", "))]
    MissingConfig(Vec<String>),
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl IllustrateError {
    /// Short stable label used in operator-facing failure lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Api { .. } => "api",
            Self::Http(err) if err.is_timeout() => "timeout",
            Self::Http(err) if err.is_connect() => "connect",
            Self::Http(_) => "http",
            Self::Io(err) if err.kind() == std::io::ErrorKind::TimedOut => "timeout",
            // Body read failures arrive as reqwest errors wrapped in io::Error.
            Self::Io(err) => match err
                .get_ref()
                .and_then(|inner| inner.downcast_ref::<reqwest::Error>())
            {
                Some(inner) if inner.is_timeout() => "timeout",
                Some(_) => "http",
                None => "io",
            },
            Self::InvalidResponse(_) => "invalid_response",
            Self::Decode(_) => "decode",
            Self::Json(_) => "json",
            Self::MissingConfig(_) | Self::Config(_) => "config",
        }
    }
}

impl From<base64::DecodeError> for IllustrateError {
    fn from(err: base64::DecodeError) -> Self {
        Self::Decode(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, IllustrateError>;
