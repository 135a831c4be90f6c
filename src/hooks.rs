//! Lifecycle hooks
//!
//! Each lifecycle event has exactly one slot. Registering a hook replaces the
//! previous one. Hooks run synchronously on the thread that triggered the
//! event while the registry's map lock is held, so a slow hook stalls request
//! handling (start hook) or the sweep tick (end hook), and a hook must not call
//! back into the registry.

use crate::session::Session;
use parking_lot::RwLock;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

/// Callback invoked with the affected session
pub type SessionHook = Arc<dyn Fn(&Session) + Send + Sync>;

/// Single-subscriber hook slot
#[derive(Default)]
pub(crate) struct HookSlot {
	hook: RwLock<Option<SessionHook>>,
}

impl HookSlot {
	pub(crate) fn set(&self, hook: SessionHook) {
		*self.hook.write() = Some(hook);
	}

	pub(crate) fn is_set(&self) -> bool {
		self.hook.read().is_some()
	}

	// The slot lock is released before the hook runs so a hook may re-register.
	fn current(&self) -> Option<SessionHook> {
		self.hook.read().clone()
	}

	/// Invoke the hook, letting a panic unwind into the caller
	pub(crate) fn fire(&self, session: &Session) {
		if let Some(hook) = self.current() {
			hook(session);
		}
	}

	/// Invoke the hook, containing a panic
	///
	/// Returns `false` if the hook panicked.
	pub(crate) fn fire_isolated(&self, session: &Session) -> bool {
		let Some(hook) = self.current() else {
			return true;
		};
		match catch_unwind(AssertUnwindSafe(|| hook(session))) {
			Ok(()) => true,
			Err(_) => {
				tracing::error!(session_id = %session.id(), "Session hook panicked");
				false
			}
		}
	}
}

impl fmt::Debug for HookSlot {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("HookSlot")
			.field("set", &self.is_set())
			.finish()
	}
}
