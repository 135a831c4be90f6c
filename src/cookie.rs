//! Identifier transport over cookies
//!
//! The HTTP layer itself lives outside this crate. These helpers read the
//! session cookie from request headers and produce the `Set-Cookie` values
//! that carry a session's identifier and expiry back to the client.

use crate::error::{Result, SessionError};
use crate::registry::SessionRegistry;
use crate::session::Session;
use http::HeaderMap;
use http::header::{COOKIE, HeaderValue, SET_COOKIE};
use std::sync::Arc;

/// Value of the cookie named `cookie_name`, if the request carries one
///
/// Every `Cookie` header is searched; the first match wins.
///
/// # Examples
///
/// ```
/// use http::HeaderMap;
/// use http::header::{COOKIE, HeaderValue};
/// use reinhardt_session_registry::cookie::session_id_from_headers;
///
/// let mut headers = HeaderMap::new();
/// headers.insert(COOKIE, HeaderValue::from_static("theme=dark; SessionId=abc123"));
///
/// assert_eq!(session_id_from_headers(&headers, "SessionId"), Some("abc123".to_string()));
/// assert_eq!(session_id_from_headers(&headers, "other"), None);
/// ```
pub fn session_id_from_headers(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
	headers
		.get_all(COOKIE)
		.iter()
		.filter_map(|value| value.to_str().ok())
		.flat_map(|cookies| cookies.split(';'))
		.find_map(|cookie| {
			let (name, value) = cookie.trim().split_once('=')?;
			(name == cookie_name).then(|| value.to_string())
		})
}

/// `Set-Cookie` value that clears the session cookie on the client
///
/// # Examples
///
/// ```
/// use reinhardt_session_registry::cookie::clear_cookie_value;
///
/// assert_eq!(clear_cookie_value("SessionId", "/"), "SessionId=; path=/;");
/// ```
pub fn clear_cookie_value(cookie_name: &str, path: &str) -> String {
	format!("{}=; path={};", cookie_name, path)
}

fn header_value(value: String) -> Result<HeaderValue> {
	HeaderValue::try_from(value).map_err(|e| SessionError::InvalidHeader(e.to_string()))
}

impl SessionRegistry {
	/// Session for an incoming request
	///
	/// With the session cookie present this is `get_or_create(value)`; without
	/// it a fresh session is created, exactly as `get_or_create("")` would.
	///
	/// # Examples
	///
	/// ```
	/// use http::HeaderMap;
	/// use reinhardt_session_registry::SessionRegistry;
	///
	/// # #[tokio::main]
	/// # async fn main() {
	/// let registry = SessionRegistry::with_defaults();
	///
	/// let session = registry.session_for_request(&HeaderMap::new()).unwrap();
	/// assert!(registry.has(session.id()));
	/// # }
	/// ```
	pub fn session_for_request(&self, request_headers: &HeaderMap) -> Result<Arc<Session>> {
		match session_id_from_headers(request_headers, self.cookie_name()) {
			Some(candidate) => self.get_or_create(&candidate),
			None => self.get_or_create(""),
		}
	}

	/// `Set-Cookie` header value for `session`
	pub fn set_cookie_header(&self, session: &Session) -> Result<HeaderValue> {
		header_value(session.cookie(&self.inner().cookie_name, &self.inner().cookie_path))
	}

	/// Append the session's `Set-Cookie` header to a response
	pub fn attach_session_cookie(
		&self,
		response_headers: &mut HeaderMap,
		session: &Session,
	) -> Result<()> {
		let value = self.set_cookie_header(session)?;
		response_headers.append(SET_COOKIE, value);
		Ok(())
	}

	/// Abandon `session` and tell the client to drop its cookie
	pub fn abandon_for_response(
		&self,
		response_headers: &mut HeaderMap,
		session: &Session,
	) -> Result<()> {
		self.abandon(session.id());
		let value = header_value(clear_cookie_value(
			&self.inner().cookie_name,
			&self.inner().cookie_path,
		))?;
		response_headers.append(SET_COOKIE, value);
		Ok(())
	}
}
