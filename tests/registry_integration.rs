//! Session Registry Integration Tests
//!
//! Exercises the registry through its public API only:
//! - Identifier uniqueness
//! - Sliding expiration on lookup
//! - Background sweeper eviction and the end hook
//! - Idempotent abandonment
//! - Concurrent creation and refresh
//! - Request-level lookup without a session cookie

use http::HeaderMap;
use http::header::{COOKIE, HeaderValue};
use parking_lot::Mutex;
use reinhardt_session_registry::{
	EntropySource, Result, SessionError, SessionRegistry, SessionRegistryConfig,
};
use rstest::*;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[fixture]
fn config() -> SessionRegistryConfig {
	SessionRegistryConfig::new(Duration::from_secs(60))
}

struct ExhaustedEntropy;

impl EntropySource for ExhaustedEntropy {
	fn fill(&self, _buf: &mut [u8]) -> Result<()> {
		Err(SessionError::RandomSource("entropy pool unavailable".to_string()))
	}
}

// ============================================================================
// Identifier Tests
// ============================================================================

/// **Test Intent**: every session created from an empty candidate gets its own
/// identifier
#[rstest]
#[tokio::test]
async fn test_generated_identifiers_are_pairwise_distinct(config: SessionRegistryConfig) {
	// Arrange
	let registry = SessionRegistry::new(config);

	// Act
	let ids: HashSet<String> = (0..10_000)
		.map(|_| registry.get_or_create("").unwrap().id().to_string())
		.collect();

	// Assert
	assert_eq!(ids.len(), 10_000);
	assert_eq!(registry.len(), 10_000);
	assert!(ids.iter().all(|id| id.len() == 32
		&& id.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f'))));
}

/// **Test Intent**: an unavailable random source fails the request instead of
/// producing a predictable identifier
#[rstest]
#[tokio::test]
async fn test_random_source_failure_fails_request(config: SessionRegistryConfig) {
	// Arrange
	let registry = SessionRegistry::with_entropy(config, ExhaustedEntropy);

	// Act
	let err = registry.session_for_request(&HeaderMap::new()).unwrap_err();

	// Assert
	assert!(matches!(err, SessionError::RandomSource(_)));
	assert_eq!(err.status_code(), http::StatusCode::INTERNAL_SERVER_ERROR);
	assert!(registry.is_empty());
}

// ============================================================================
// Expiration Tests
// ============================================================================

/// **Test Intent**: looking up an existing session moves its expiry forward to
/// `now + timeout`
#[rstest]
#[tokio::test]
async fn test_lookup_slides_expiry_forward(config: SessionRegistryConfig) {
	// Arrange
	let registry = SessionRegistry::new(config);
	let session = registry.get_or_create("").unwrap();
	let first_expiry = session.expires_at();
	tokio::time::sleep(Duration::from_millis(20)).await;

	// Act
	let before = chrono::Utc::now();
	let refreshed = registry.get_or_create(session.id()).unwrap();
	let after = chrono::Utc::now();

	// Assert
	assert_eq!(refreshed.id(), session.id());
	assert!(refreshed.expires_at() > first_expiry);
	assert!(refreshed.expires_at() >= before + chrono::Duration::seconds(60));
	assert!(refreshed.expires_at() <= after + chrono::Duration::seconds(60));
}

/// **Test Intent**: after the timeout is shortened, the next refresh grants the
/// shorter idle window and the sweeper evicts the session once it runs out
#[rstest]
#[tokio::test]
async fn test_refresh_after_shrinking_timeout_applies_new_timeout() {
	// Arrange
	let registry = SessionRegistry::new(
		SessionRegistryConfig::new(Duration::from_secs(3600))
			.with_sweep_interval(Duration::from_millis(50)),
	);
	let session = registry.get_or_create("").unwrap();

	// Act
	registry.set_timeout(Duration::from_millis(100));
	let before = chrono::Utc::now();
	let refreshed = registry.get_or_create(session.id()).unwrap();
	let after = chrono::Utc::now();

	// Assert
	assert!(refreshed.expires_at() >= before + chrono::Duration::milliseconds(100));
	assert!(refreshed.expires_at() <= after + chrono::Duration::milliseconds(100));
	tokio::time::sleep(Duration::from_millis(500)).await;
	assert!(!registry.has(session.id()));
}

/// **Test Intent**: an idle session is evicted by the sweeper and the end hook
/// sees it exactly once
#[rstest]
#[tokio::test]
async fn test_sweeper_evicts_idle_session_and_reports_once() {
	// Arrange
	let registry = SessionRegistry::new(
		SessionRegistryConfig::new(Duration::from_millis(100))
			.with_sweep_interval(Duration::from_millis(100)),
	);
	let ended = Arc::new(Mutex::new(Vec::new()));
	let sink = Arc::clone(&ended);
	registry.on_end(move |session| sink.lock().push(session.id().to_string()));
	let session = registry.get_or_create("").unwrap();

	// Act - past the expiry plus at least one sweep interval
	tokio::time::sleep(Duration::from_millis(400)).await;

	// Assert
	assert!(!registry.has(session.id()));
	assert_eq!(*ended.lock(), vec![session.id().to_string()]);
}

/// **Test Intent**: a stopped sweeper leaves sessions in place
#[rstest]
#[tokio::test]
async fn test_shutdown_stops_eviction() {
	// Arrange
	let registry = SessionRegistry::new(
		SessionRegistryConfig::new(Duration::from_millis(20))
			.with_sweep_interval(Duration::from_millis(20)),
	);
	registry.shutdown().await;
	let session = registry.get_or_create("").unwrap();

	// Act
	tokio::time::sleep(Duration::from_millis(100)).await;

	// Assert
	assert!(!registry.is_sweeping());
	assert!(registry.has(session.id()));
	assert!(session.is_expired());
	assert_eq!(registry.sweep(), 1);
	assert!(!registry.has(session.id()));
}

// ============================================================================
// Abandonment Tests
// ============================================================================

/// **Test Intent**: abandoning twice behaves like abandoning once
#[rstest]
#[tokio::test]
async fn test_abandon_is_idempotent(config: SessionRegistryConfig) {
	// Arrange
	let registry = SessionRegistry::new(config);
	let keep = registry.get_or_create("").unwrap();
	let session = registry.get_or_create("").unwrap();

	// Act
	registry.abandon(session.id());
	assert!(!registry.has(session.id()));
	registry.abandon(session.id());
	registry.abandon("never-issued");

	// Assert
	assert!(!registry.has(session.id()));
	assert!(registry.has(keep.id()));
	assert_eq!(registry.len(), 1);
}

// ============================================================================
// Concurrency Tests
// ============================================================================

/// **Test Intent**: concurrent creations neither lose nor overwrite entries
#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creation_registers_every_session(config: SessionRegistryConfig) {
	// Arrange
	const N: usize = 256;
	let registry = SessionRegistry::new(config);
	let started = Arc::new(AtomicUsize::new(0));
	let counter = Arc::clone(&started);
	registry.on_start(move |_| {
		counter.fetch_add(1, Ordering::SeqCst);
	});

	// Act
	let handles: Vec<_> = (0..N)
		.map(|_| {
			let registry = registry.clone();
			tokio::task::spawn_blocking(move || {
				registry.get_or_create("").unwrap().id().to_string()
			})
		})
		.collect();
	let mut ids = Vec::with_capacity(N);
	for handle in handles {
		ids.push(handle.await.unwrap());
	}

	// Assert
	assert_eq!(registry.len(), N);
	assert_eq!(started.load(Ordering::SeqCst), N);
	assert_eq!(ids.iter().collect::<HashSet<_>>().len(), N);
	for id in &ids {
		assert_eq!(registry.get(id).unwrap().id(), id);
	}
}

/// **Test Intent**: concurrent lookups of one identifier refresh a single entry
#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_refresh_keeps_single_entry(config: SessionRegistryConfig) {
	// Arrange
	let registry = SessionRegistry::new(config);
	let session = registry.get_or_create("").unwrap();
	let id = session.id().to_string();
	let granted = session.expires_at();

	// Act
	let handles: Vec<_> = (0..64)
		.map(|_| {
			let registry = registry.clone();
			let id = id.clone();
			tokio::task::spawn_blocking(move || registry.get_or_create(&id).unwrap())
		})
		.collect();
	for handle in handles {
		let refreshed = handle.await.unwrap();
		assert!(Arc::ptr_eq(&refreshed, &session));
	}

	// Assert
	assert_eq!(registry.len(), 1);
	assert!(session.expires_at() >= granted);
}

// ============================================================================
// Request Contract Tests
// ============================================================================

/// **Test Intent**: a request without the session cookie gets a fresh session
/// rather than an error
#[rstest]
#[tokio::test]
async fn test_request_without_cookie_creates_session(config: SessionRegistryConfig) {
	// Arrange
	let registry = SessionRegistry::new(config);
	let mut headers = HeaderMap::new();
	headers.insert(COOKIE, HeaderValue::from_static("theme=dark"));

	// Act
	let first = registry.session_for_request(&HeaderMap::new()).unwrap();
	let second = registry.session_for_request(&headers).unwrap();

	// Assert
	assert_ne!(first.id(), second.id());
	assert!(registry.has(first.id()));
	assert!(registry.has(second.id()));
	assert_eq!(registry.len(), 2);
}

/// **Test Intent**: the cookie handed back identifies the same session on the
/// next request
#[rstest]
#[tokio::test]
async fn test_set_cookie_roundtrips_through_next_request(config: SessionRegistryConfig) {
	// Arrange
	let registry = SessionRegistry::new(config);
	let session = registry.session_for_request(&HeaderMap::new()).unwrap();
	session.set(serde_json::json!({"name": "alice"})).unwrap();
	let set_cookie = registry.set_cookie_header(&session).unwrap();

	// Act - the client echoes only the name=value pair
	let pair = set_cookie.to_str().unwrap().split(';').next().unwrap().to_string();
	let mut headers = HeaderMap::new();
	headers.insert(COOKIE, HeaderValue::from_str(&pair).unwrap());
	let next = registry.session_for_request(&headers).unwrap();

	// Assert
	assert_eq!(next.id(), session.id());
	assert_eq!(next.value(), Some(serde_json::json!({"name": "alice"})));
}
