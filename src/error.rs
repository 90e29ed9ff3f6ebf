use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LimiterError {
    #[error("File missing")]
    MissingFile,

    #[error("Invalid values: `{field}` must be an integer, got {value:?}")]
    InvalidBound { field: &'static str, value: String },

    #[error("Malformed upload: {0}")]
    Multipart(String),

    #[error("Upload exceeds the {limit} byte limit")]
    PayloadTooLarge { limit: usize },

    #[error("Malformed MIDI input: {0}")]
    Decode(String),

    #[error("Failed to encode MIDI: {0}")]
    Encode(#[from] std::io::Error),
}

impl From<midly::Error> for LimiterError {
    fn from(e: midly::Error) -> Self {
        LimiterError::Decode(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LimiterError>;

impl LimiterError {
    pub fn status(&self) -> StatusCode {
        match self {
            LimiterError::MissingFile
            | LimiterError::InvalidBound { .. }
            | LimiterError::Multipart(_) => StatusCode::BAD_REQUEST,
            LimiterError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            LimiterError::Decode(_) => StatusCode::UNPROCESSABLE_ENTITY,
            LimiterError::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for LimiterError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}
