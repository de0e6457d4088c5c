use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

/// Error kinds surfaced by the detection pipeline, each carrying its own retry/skip policy.
#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("transient I/O failure: {0}")]
    TransientIo(String),

    #[error("malformed event: {0}")]
    MalformedEvent(String),

    #[error("config invariant violated: {0}")]
    ConfigInvariantViolation(String),

    #[error("scheduler data loss: pointer lag exceeded threshold")]
    DataLoss,

    #[error("fatal error: {0}")]
    Fatal(String),

    #[error("user not found")]
    UserNotFound,

    #[error("database error: {0}")]
    DatabaseError(String),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("internal server error: {0}")]
    InternalServerError(String),
}

impl DetectorError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::UserNotFound => StatusCode::NOT_FOUND,
            Self::MalformedEvent(_) | Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::ConfigInvariantViolation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::DataLoss => StatusCode::CONFLICT,
            Self::TransientIo(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::DatabaseError(_) | Self::Fatal(_) | Self::InternalServerError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            Self::TransientIo(_) => "TRANSIENT_IO",
            Self::MalformedEvent(_) => "MALFORMED_EVENT",
            Self::ConfigInvariantViolation(_) => "CONFIG_INVARIANT_VIOLATION",
            Self::DataLoss => "DATA_LOSS",
            Self::Fatal(_) => "FATAL",
            Self::UserNotFound => "USER_NOT_FOUND",
            Self::DatabaseError(_) => "DATABASE_ERROR",
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    status_code: u16,
}

impl ResponseError for DetectorError {
    fn status_code(&self) -> StatusCode {
        self.status_code()
    }

    fn error_response(&self) -> HttpResponse {
        let status_code = self.status_code();
        let body = ErrorResponse {
            error: self.error_type().to_string(),
            message: self.to_string(),
            status_code: status_code.as_u16(),
        };
        HttpResponse::build(status_code).json(body)
    }
}

impl From<diesel::result::Error> for DetectorError {
    fn from(err: diesel::result::Error) -> Self {
        match err {
            diesel::result::Error::NotFound => DetectorError::UserNotFound,
            _ => DetectorError::DatabaseError(err.to_string()),
        }
    }
}

impl From<std::io::Error> for DetectorError {
    fn from(err: std::io::Error) -> Self {
        DetectorError::InternalServerError(err.to_string())
    }
}
