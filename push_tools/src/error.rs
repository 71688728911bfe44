use thiserror::Error;

#[derive(Debug, Error)]
pub enum PushApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("No push server key has been configured")]
    NotConfigured,
    #[error("Could not send the push request: {0}")]
    RequestError(String),
    #[error("Invalid response from the push provider: {0}")]
    ResponseError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Push request failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
}
