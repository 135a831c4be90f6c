//! Expiration sweeper
//!
//! A single background task per registry that wakes up every sweep interval,
//! scans the whole session map under the write lock and evicts every session
//! whose expiry lies in the past. A full scan keeps the registry free of any
//! secondary expiry index; its cost is bounded by the number of live sessions.
//!
//! The task holds only a weak handle to the registry and stops on the first
//! of: an explicit shutdown signal, the shutdown sender being dropped, or the
//! registry itself being dropped.

use crate::registry::RegistryInner;
use chrono::{DateTime, Utc};
use std::sync::Weak;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Lower bound on the tick so a zero interval cannot spin
const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(10);

/// Handle to a running sweeper task
pub(crate) struct ExpirationSweeper {
	shutdown_tx: broadcast::Sender<()>,
	handle: JoinHandle<()>,
}

impl ExpirationSweeper {
	pub(crate) fn spawn(
		runtime: &Handle,
		registry: Weak<RegistryInner>,
		interval: Duration,
	) -> Self {
		let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
		let interval = interval.max(MIN_SWEEP_INTERVAL);
		let handle = runtime.spawn(run(registry, interval, shutdown_rx));
		Self {
			shutdown_tx,
			handle,
		}
	}

	/// Ask the task to stop without waiting for it
	pub(crate) fn signal(&self) {
		let _ = self.shutdown_tx.send(());
	}

	pub(crate) fn is_finished(&self) -> bool {
		self.handle.is_finished()
	}

	/// Stop the task and wait for it to exit
	pub(crate) async fn stop(self) {
		self.signal();
		if let Err(e) = self.handle.await {
			tracing::error!(error = %e, "Session sweeper task failed");
		}
	}
}

async fn run(
	registry: Weak<RegistryInner>,
	interval: Duration,
	mut shutdown_rx: broadcast::Receiver<()>,
) {
	let interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
	tracing::debug!(interval_ms, "Session sweeper started");

	let mut ticker = tokio::time::interval(interval);
	ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
	// The first tick completes immediately.
	ticker.tick().await;

	loop {
		tokio::select! {
			_ = ticker.tick() => {}
			_ = shutdown_rx.recv() => {
				break;
			}
		}

		let Some(inner) = registry.upgrade() else {
			break;
		};
		let evicted = sweep_expired(&inner, Utc::now());
		if evicted > 0 {
			let remaining = inner.sessions.read().len();
			tracing::debug!(evicted, remaining, "Session sweep finished");
		}
	}

	tracing::debug!("Session sweeper stopped");
}

/// Evict every session that expired before `now`
///
/// The end hook runs for each evicted session before its entry is removed. A
/// panicking hook is logged and the pass carries on.
pub(crate) fn sweep_expired(inner: &RegistryInner, now: DateTime<Utc>) -> usize {
	let mut sessions = inner.sessions.write();

	let expired: Vec<String> = sessions
		.iter()
		.filter(|(_, session)| session.is_expired_at(now))
		.map(|(id, _)| id.clone())
		.collect();

	for id in &expired {
		if let Some(session) = sessions.get(id) {
			tracing::info!(session_id = %id, expires_at = %session.expires_at(), "Expired session");
			inner.on_end.fire_isolated(session);
		}
		sessions.remove(id);
	}

	expired.len()
}
