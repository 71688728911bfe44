use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use dispatch_engine::traits::{DispatchError, ErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("{0}")]
    Dispatch(#[from] DispatchError),
}

impl ServerError {
    /// The dispatch error category, for errors that came out of the engine.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Dispatch(e) => Some(e.kind()),
            _ => None,
        }
    }
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Dispatch(e) => match e.kind() {
                ErrorKind::Validation => StatusCode::BAD_REQUEST,
                ErrorKind::InvalidTransition => StatusCode::CONFLICT,
                ErrorKind::Conflict => StatusCode::CONFLICT,
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Forbidden => StatusCode::FORBIDDEN,
                ErrorKind::AlreadySettled => StatusCode::CONFLICT,
                ErrorKind::DependencyUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            },
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self.kind() {
            Some(kind) => serde_json::json!({ "error": self.to_string(), "kind": kind }),
            None => serde_json::json!({ "error": self.to_string() }),
        };
        HttpResponse::build(self.status_code()).insert_header(ContentType::json()).body(body.to_string())
    }
}

#[cfg(test)]
mod test {
    use dispatch_engine::db_types::{MissionId, MissionStatus};

    use super::*;

    #[test]
    fn dispatch_errors_map_to_http_statuses() {
        let err = ServerError::from(DispatchError::MissionConflict(MissionId(4)));
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        let err = ServerError::from(DispatchError::InvalidTransition {
            mission: MissionId(4),
            from: MissionStatus::Completed,
            action: "accept".into(),
        });
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.kind(), Some(ErrorKind::InvalidTransition));
        let err = ServerError::from(DispatchError::OperatorNotFound(9));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        let err = ServerError::from(DispatchError::DatabaseError("disk full".into()));
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(ServerError::InvalidRequestPath("x".into()).kind(), None);
    }
}
