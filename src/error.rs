use axum::http::StatusCode;
use tracing::error;

/// Failures raised by the store, the entity services and the auth primitives.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("record not found")]
    NotFound,
    #[error("email already registered")]
    DuplicateEmail,
    #[error("invalid credentials")]
    Authentication,
    #[error("forbidden")]
    Forbidden,
    #[error("chirp is too long")]
    BodyTooLong,
    #[error("invalid token signature")]
    InvalidSignature,
    #[error("invalid token issuer")]
    IssuerMismatch,
    #[error("token expired")]
    Expired,
    #[error("missing Authorization header")]
    MissingCredential,
    #[error("malformed Authorization header")]
    MalformedCredential,
    #[error("corrupt store: {0}")]
    CorruptStore(String),
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("hashing failed: {0}")]
    Hashing(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Error::NotFound => StatusCode::NOT_FOUND,
            Error::DuplicateEmail => StatusCode::CONFLICT,
            Error::Authentication
            | Error::InvalidSignature
            | Error::IssuerMismatch
            | Error::Expired
            | Error::MissingCredential
            | Error::MalformedCredential => StatusCode::UNAUTHORIZED,
            Error::Forbidden => StatusCode::FORBIDDEN,
            Error::BodyTooLong => StatusCode::BAD_REQUEST,
            Error::CorruptStore(_) | Error::StoreUnavailable(_) | Error::Hashing(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<Error> for (StatusCode, String) {
    fn from(e: Error) -> Self {
        let status = e.status();
        if status.is_server_error() {
            error!(error = %e, "request failed");
            return (status, "Something went wrong".into());
        }
        (status, e.to_string())
    }
}
