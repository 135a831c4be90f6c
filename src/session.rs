//! Session record
//!
//! A [`Session`] is shared between the registry map and any caller that
//! obtained it, as an `Arc<Session>`. Once the registry drops its entry the
//! record is unreachable from lookups; a caller still holding it can read and
//! write it, but those writes never reappear in the registry.

use crate::error::{Result, SessionError};
use crate::registry::{RegistryInner, SessionRegistry};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::Weak;

/// Format used for the cookie `expires` attribute
pub const COOKIE_DATE_FORMAT: &str = "%a, %d-%b-%Y %H:%M:%S %z";

/// Server-held state for one client
pub struct Session {
	id: String,
	value: Mutex<Option<Value>>,
	expires_at: Mutex<DateTime<Utc>>,
	registry: Weak<RegistryInner>,
}

impl Session {
	pub(crate) fn new(
		id: String,
		expires_at: DateTime<Utc>,
		registry: Weak<RegistryInner>,
	) -> Self {
		Self {
			id,
			value: Mutex::new(None),
			expires_at: Mutex::new(expires_at),
			registry,
		}
	}

	/// Session not attached to any registry
	#[cfg(test)]
	pub(crate) fn detached(id: String, expires_at: DateTime<Utc>) -> Self {
		Self::new(id, expires_at, Weak::new())
	}

	/// Session identifier
	pub fn id(&self) -> &str {
		&self.id
	}

	/// Absolute expiry instant
	pub fn expires_at(&self) -> DateTime<Utc> {
		*self.expires_at.lock()
	}

	/// Whether the session is past its expiry at `now`
	pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
		self.expires_at() < now
	}

	/// Whether the session is past its expiry
	pub fn is_expired(&self) -> bool {
		self.is_expired_at(Utc::now())
	}

	/// Reset the expiry to `new_expiry`
	pub(crate) fn refresh(&self, new_expiry: DateTime<Utc>) {
		*self.expires_at.lock() = new_expiry;
	}

	/// Application payload, if any
	pub fn value(&self) -> Option<Value> {
		self.value.lock().clone()
	}

	/// Replace the application payload
	pub fn set_value(&self, value: Value) {
		*self.value.lock() = Some(value);
	}

	/// Remove and return the application payload
	pub fn take_value(&self) -> Option<Value> {
		self.value.lock().take()
	}

	/// Unset the application payload
	pub fn clear_value(&self) {
		*self.value.lock() = None;
	}

	/// Payload deserialized into `T`
	///
	/// Returns `None` when unset or when the payload has another shape.
	pub fn get<T>(&self) -> Option<T>
	where
		T: DeserializeOwned,
	{
		self.value
			.lock()
			.as_ref()
			.and_then(|v| serde_json::from_value(v.clone()).ok())
	}

	/// Serialize `value` into the payload
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_session_registry::SessionRegistry;
	///
	/// # #[tokio::main]
	/// # async fn main() {
	/// let registry = SessionRegistry::with_defaults();
	/// let session = registry.get_or_create("").unwrap();
	///
	/// session.set("alice").unwrap();
	/// assert_eq!(session.get::<String>(), Some("alice".to_string()));
	/// # }
	/// ```
	pub fn set<T>(&self, value: T) -> Result<()>
	where
		T: Serialize,
	{
		let value =
			serde_json::to_value(value).map_err(|e| SessionError::Serialization(e.to_string()))?;
		self.set_value(value);
		Ok(())
	}

	/// Remove this session from its registry
	///
	/// A no-op when the registry is gone or the session was already removed.
	pub fn abandon(&self) {
		if let Some(inner) = self.registry.upgrade() {
			SessionRegistry::from_inner(inner).abandon(&self.id);
		}
	}

	/// `Set-Cookie` value carrying this session's identifier and expiry
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_session_registry::SessionRegistry;
	///
	/// # #[tokio::main]
	/// # async fn main() {
	/// let registry = SessionRegistry::with_defaults();
	/// let session = registry.get_or_create("").unwrap();
	///
	/// let cookie = session.cookie("SessionId", "/");
	/// assert!(cookie.starts_with(&format!("SessionId={}; path=/; expires=", session.id())));
	/// assert!(cookie.ends_with(" +0000;"));
	/// # }
	/// ```
	pub fn cookie(&self, cookie_name: &str, path: &str) -> String {
		format!(
			"{}={}; path={}; expires={};",
			cookie_name,
			self.id,
			path,
			self.expires_at().format(COOKIE_DATE_FORMAT)
		)
	}
}

impl fmt::Debug for Session {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Session")
			.field("id", &self.id)
			.field("expires_at", &self.expires_at())
			.field("has_value", &self.value.lock().is_some())
			.finish()
	}
}
