//! Session registry
//!
//! Owns the map from identifier to [`Session`] and the single reader/writer
//! lock guarding it. Lookups that only read (membership, snapshots) share the
//! lock; creation, refresh and removal take it exclusively, as does every
//! sweeper pass.

use crate::config::SessionRegistryConfig;
use crate::error::{Result, SessionError};
use crate::hooks::{HookSlot, SessionHook};
use crate::id::{EntropySource, OsEntropy, generate_session_id};
use crate::session::Session;
use crate::sweeper::{ExpirationSweeper, sweep_expired};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

pub(crate) struct RegistryInner {
	pub(crate) sessions: RwLock<HashMap<String, Arc<Session>>>,
	timeout: RwLock<Duration>,
	sweep_interval: Duration,
	pub(crate) cookie_name: String,
	pub(crate) cookie_path: String,
	end_hook_on_abandon: bool,
	on_start: HookSlot,
	pub(crate) on_end: HookSlot,
	entropy: Box<dyn EntropySource>,
	sweeper: Mutex<Option<ExpirationSweeper>>,
}

impl Drop for RegistryInner {
	fn drop(&mut self) {
		if let Some(sweeper) = self.sweeper.get_mut().take() {
			sweeper.signal();
		}
	}
}

/// In-process session registry
///
/// Cloning is cheap and yields another handle to the same registry. The
/// background sweeper stops when the last handle is dropped or when
/// [`SessionRegistry::shutdown`] is called.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use reinhardt_session_registry::{SessionRegistry, SessionRegistryConfig};
///
/// # #[tokio::main]
/// # async fn main() {
/// let registry = SessionRegistry::new(SessionRegistryConfig::new(Duration::from_secs(10)));
///
/// let session = registry.get_or_create("").unwrap();
/// assert!(registry.has(session.id()));
///
/// let same = registry.get_or_create(session.id()).unwrap();
/// assert_eq!(same.id(), session.id());
///
/// registry.abandon(session.id());
/// assert!(!registry.has(session.id()));
/// # }
/// ```
#[derive(Clone)]
pub struct SessionRegistry {
	inner: Arc<RegistryInner>,
}

impl SessionRegistry {
	/// Create a registry and start its sweeper
	///
	/// # Panics
	///
	/// Panics when called outside of a Tokio runtime. Use
	/// [`SessionRegistry::try_new`] to get an error instead.
	pub fn new(config: SessionRegistryConfig) -> Self {
		Self::with_entropy(config, OsEntropy)
	}

	/// Create a registry with the default configuration
	///
	/// # Panics
	///
	/// Panics when called outside of a Tokio runtime.
	pub fn with_defaults() -> Self {
		Self::new(SessionRegistryConfig::default())
	}

	/// Create a registry drawing identifiers from `entropy`
	///
	/// # Panics
	///
	/// Panics when called outside of a Tokio runtime.
	pub fn with_entropy(
		config: SessionRegistryConfig,
		entropy: impl EntropySource + 'static,
	) -> Self {
		match Self::try_with_entropy(config, entropy) {
			Ok(registry) => registry,
			Err(e) => panic!("cannot create session registry: {}", e),
		}
	}

	/// Create a registry, failing when no Tokio runtime is available
	///
	/// # Errors
	///
	/// Returns [`SessionError::Runtime`](crate::SessionError::Runtime) when
	/// called outside of a Tokio runtime.
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_session_registry::{SessionError, SessionRegistry, SessionRegistryConfig};
	///
	/// let err = SessionRegistry::try_new(SessionRegistryConfig::default()).unwrap_err();
	/// assert!(matches!(err, SessionError::Runtime(_)));
	/// ```
	pub fn try_new(config: SessionRegistryConfig) -> Result<Self> {
		Self::try_with_entropy(config, OsEntropy)
	}

	/// Fallible counterpart of [`SessionRegistry::with_entropy`]
	pub fn try_with_entropy(
		config: SessionRegistryConfig,
		entropy: impl EntropySource + 'static,
	) -> Result<Self> {
		let runtime = Handle::try_current().map_err(|e| SessionError::Runtime(e.to_string()))?;

		let inner = Arc::new(RegistryInner {
			sessions: RwLock::new(HashMap::new()),
			timeout: RwLock::new(config.timeout),
			sweep_interval: config.sweep_interval,
			cookie_name: config.cookie_name,
			cookie_path: config.cookie_path,
			end_hook_on_abandon: config.end_hook_on_abandon,
			on_start: HookSlot::default(),
			on_end: HookSlot::default(),
			entropy: Box::new(entropy),
			sweeper: Mutex::new(None),
		});

		// Spawned only once the Arc exists so the sweeper's first upgrade succeeds.
		let sweeper = ExpirationSweeper::spawn(&runtime, Arc::downgrade(&inner), inner.sweep_interval);
		*inner.sweeper.lock() = Some(sweeper);

		Ok(Self { inner })
	}

	pub(crate) fn from_inner(inner: Arc<RegistryInner>) -> Self {
		Self { inner }
	}

	pub(crate) fn inner(&self) -> &RegistryInner {
		&self.inner
	}

	/// Look up a session by identifier, creating one when unknown
	///
	/// An empty or unknown `candidate_id` yields a brand-new session with a
	/// freshly generated identifier; the client-supplied value is never adopted.
	/// A known identifier has its expiry reset to `now + timeout`, using the
	/// timeout in effect at the time of the call.
	///
	/// The start hook runs synchronously, under the registry lock, when a
	/// session is created.
	///
	/// # Errors
	///
	/// Returns [`SessionError::RandomSource`](crate::SessionError::RandomSource)
	/// when identifier bytes cannot be drawn.
	pub fn get_or_create(&self, candidate_id: &str) -> Result<Arc<Session>> {
		let timeout = self.timeout();
		let mut fresh_id: Option<String> = None;

		loop {
			// Entropy is drawn before taking the write lock.
			if fresh_id.is_none() && (candidate_id.is_empty() || !self.has(candidate_id)) {
				fresh_id = Some(generate_session_id(self.inner.entropy.as_ref())?);
			}

			let new_expiry = expiry_after(Utc::now(), timeout);
			let mut sessions = self.inner.sessions.write();

			let id = if !candidate_id.is_empty() && sessions.contains_key(candidate_id) {
				candidate_id.to_string()
			} else if let Some(id) = fresh_id.take() {
				id
			} else {
				// The candidate was evicted between the membership check and the lock.
				continue;
			};

			return Ok(match sessions.entry(id) {
				Entry::Occupied(entry) => {
					let session = Arc::clone(entry.get());
					session.refresh(new_expiry);
					tracing::debug!(
						session_id = %session.id(),
						expires_at = %session.expires_at(),
						"Refreshed session"
					);
					session
				}
				Entry::Vacant(entry) => {
					let session = Arc::new(Session::new(
						entry.key().clone(),
						new_expiry,
						Arc::downgrade(&self.inner),
					));
					entry.insert(Arc::clone(&session));
					tracing::debug!(session_id = %session.id(), "Started session");
					self.inner.on_start.fire(&session);
					session
				}
			});
		}
	}

	/// Remove a session
	///
	/// Idempotent: unknown identifiers are ignored. The end hook only fires here
	/// when the registry was configured with `end_hook_on_abandon`.
	pub fn abandon(&self, id: &str) {
		let mut sessions = self.inner.sessions.write();
		let Some(session) = sessions.remove(id) else {
			return;
		};
		tracing::debug!(session_id = %id, "Abandoned session");
		if self.inner.end_hook_on_abandon {
			self.inner.on_end.fire(&session);
		}
	}

	/// Whether `id` is currently registered
	///
	/// Does not refresh the session.
	pub fn has(&self, id: &str) -> bool {
		self.inner.sessions.read().contains_key(id)
	}

	/// Registered session without creating or refreshing it
	pub fn get(&self, id: &str) -> Option<Arc<Session>> {
		self.inner.sessions.read().get(id).cloned()
	}

	/// Number of registered sessions
	pub fn len(&self) -> usize {
		self.inner.sessions.read().len()
	}

	/// Whether no session is registered
	pub fn is_empty(&self) -> bool {
		self.inner.sessions.read().is_empty()
	}

	/// Snapshot of registered identifiers
	pub fn session_ids(&self) -> Vec<String> {
		self.inner.sessions.read().keys().cloned().collect()
	}

	/// Change the idle timeout
	///
	/// Applies to subsequent refreshes only; stored expiries are left untouched.
	pub fn set_timeout(&self, timeout: Duration) {
		*self.inner.timeout.write() = timeout;
	}

	/// Current idle timeout
	pub fn timeout(&self) -> Duration {
		*self.inner.timeout.read()
	}

	/// Name of the cookie carrying the session identifier
	pub fn cookie_name(&self) -> &str {
		&self.inner.cookie_name
	}

	/// Register the start hook, replacing any previous one
	///
	/// # Deadlocks
	///
	/// The hook runs synchronously while the registry's map lock is held
	/// exclusively. A hook that calls back into the registry (`has`, `get`,
	/// `get_or_create`, `abandon`, [`Session::abandon`]) deadlocks the calling
	/// thread.
	///
	/// # Examples
	///
	/// ```
	/// use std::sync::Arc;
	/// use std::sync::atomic::{AtomicUsize, Ordering};
	/// use reinhardt_session_registry::SessionRegistry;
	///
	/// # #[tokio::main]
	/// # async fn main() {
	/// let registry = SessionRegistry::with_defaults();
	/// let started = Arc::new(AtomicUsize::new(0));
	/// let counter = Arc::clone(&started);
	/// registry.on_start(move |_session| {
	///     counter.fetch_add(1, Ordering::SeqCst);
	/// });
	///
	/// let session = registry.get_or_create("").unwrap();
	/// registry.get_or_create(session.id()).unwrap();
	/// assert_eq!(started.load(Ordering::SeqCst), 1);
	/// # }
	/// ```
	pub fn on_start<F>(&self, hook: F)
	where
		F: Fn(&Session) + Send + Sync + 'static,
	{
		self.inner.on_start.set(Arc::new(hook) as SessionHook);
	}

	/// Register the end hook, replacing any previous one
	///
	/// It fires for every session the sweeper evicts, and on explicit
	/// abandonment when the registry was configured with `end_hook_on_abandon`.
	///
	/// # Deadlocks
	///
	/// The hook runs synchronously while the registry's map lock is held
	/// exclusively. A hook that calls back into the registry (`has`, `get`,
	/// `get_or_create`, `abandon`, [`Session::abandon`]) deadlocks the calling
	/// thread, or the sweeper task when fired during eviction.
	pub fn on_end<F>(&self, hook: F)
	where
		F: Fn(&Session) + Send + Sync + 'static,
	{
		self.inner.on_end.set(Arc::new(hook) as SessionHook);
	}

	/// Run one eviction pass now
	///
	/// Returns the number of evicted sessions.
	pub fn sweep(&self) -> usize {
		sweep_expired(&self.inner, Utc::now())
	}

	/// Whether the background sweeper is still running
	pub fn is_sweeping(&self) -> bool {
		self.inner
			.sweeper
			.lock()
			.as_ref()
			.is_some_and(|sweeper| !sweeper.is_finished())
	}

	/// Stop the background sweeper and wait for it to exit
	///
	/// Idempotent. Sessions remain registered and usable; they simply stop
	/// expiring unless [`SessionRegistry::sweep`] is called.
	pub async fn shutdown(&self) {
		let sweeper = self.inner.sweeper.lock().take();
		if let Some(sweeper) = sweeper {
			sweeper.stop().await;
		}
	}
}

impl fmt::Debug for SessionRegistry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SessionRegistry")
			.field("sessions", &self.len())
			.field("timeout", &self.timeout())
			.field("sweep_interval", &self.inner.sweep_interval)
			.field("cookie_name", &self.inner.cookie_name)
			.field("on_start", &self.inner.on_start)
			.field("on_end", &self.inner.on_end)
			.finish()
	}
}

/// `now + timeout`, saturating at the largest representable instant
fn expiry_after(now: DateTime<Utc>, timeout: Duration) -> DateTime<Utc> {
	chrono::Duration::from_std(timeout)
		.ok()
		.and_then(|delta| now.checked_add_signed(delta))
		.unwrap_or(DateTime::<Utc>::MAX_UTC)
}
