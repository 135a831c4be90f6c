//! Session registry error types

use http::StatusCode;
use thiserror::Error;

/// Errors produced by the session registry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
	/// The secure random source could not produce identifier bytes
	#[error("Random source error: {0}")]
	RandomSource(String),

	/// A cookie header value could not be built
	#[error("Invalid header: {0}")]
	InvalidHeader(String),

	/// No Tokio runtime is available to run the sweeper
	#[error("Runtime unavailable: {0}")]
	Runtime(String),

	/// A session payload could not be serialized
	#[error("Serialization error: {0}")]
	Serialization(String),
}

impl SessionError {
	/// HTTP status the surrounding request should fail with
	///
	/// # Examples
	///
	/// ```
	/// use http::StatusCode;
	/// use reinhardt_session_registry::SessionError;
	///
	/// let err = SessionError::RandomSource("entropy unavailable".to_string());
	/// assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
	/// ```
	pub fn status_code(&self) -> StatusCode {
		StatusCode::INTERNAL_SERVER_ERROR
	}
}

impl From<getrandom::Error> for SessionError {
	fn from(err: getrandom::Error) -> Self {
		SessionError::RandomSource(err.to_string())
	}
}

/// Result type for session registry operations
pub type Result<T> = std::result::Result<T, SessionError>;
