//! Lifecycle callbacks
//!
//! Callbacks that may run repeatedly (before/after update) are reference
//! counted and carry a [`CallbackId`], which the scheduler uses to run each
//! one at most once per flush. One-shot callbacks (binding, flush, mount)
//! are plain boxed closures.

use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};
use std::rc::Rc;

use crate::error::BoxError;
use crate::scheduler::Scheduler;

/// Identity of a [`Callback`], shared by all its clones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CallbackId(u64);

impl CallbackId {
	fn next() -> Self {
		static COUNTER: AtomicU64 = AtomicU64::new(0);
		Self(COUNTER.fetch_add(1, Ordering::Relaxed))
	}
}

type CallbackFn = dyn Fn(&Scheduler) -> Result<(), BoxError>;

/// A reusable callback with a stable identity.
#[derive(Clone)]
pub struct Callback {
	id: CallbackId,
	f: Rc<CallbackFn>,
}

impl Callback {
	/// Wraps a closure, giving it a fresh identity.
	pub fn new<F>(f: F) -> Self
	where
		F: Fn(&Scheduler) -> Result<(), BoxError> + 'static,
	{
		Self {
			id: CallbackId::next(),
			f: Rc::new(f),
		}
	}

	/// The identity used for per-flush deduplication.
	pub fn id(&self) -> CallbackId {
		self.id
	}

	pub(crate) fn call(&self, scheduler: &Scheduler) -> Result<(), BoxError> {
		(self.f)(scheduler)
	}
}

impl fmt::Debug for Callback {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Callback").field("id", &self.id).finish()
	}
}

/// A callback that runs once: bindings and end-of-flush hooks.
pub type OnceCallback = Box<dyn FnOnce(&Scheduler) -> Result<(), BoxError>>;

/// Cleanup run when a component is destroyed.
pub type Teardown = Box<dyn FnOnce()>;

/// Runs after a component is first mounted, optionally returning a teardown.
pub type MountCallback = Box<dyn FnOnce(&Scheduler) -> Result<Option<Teardown>, BoxError>>;

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_clones_share_identity() {
		let callback = Callback::new(|_| Ok(()));
		let clone = callback.clone();
		let other = Callback::new(|_| Ok(()));

		assert_eq!(callback.id(), clone.id());
		assert_ne!(callback.id(), other.id());
	}
}
