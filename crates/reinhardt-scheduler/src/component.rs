//! Component contract
//!
//! Components own their state and rendered output; the scheduler only knows
//! them by [`ComponentId`] and drives their updates through [`Component`].

use core::fmt;

use crate::dirty::DirtyMask;
use crate::error::{BoxError, SchedulerError};
use crate::scheduler::Scheduler;

/// Handle to a component registered with a [`Scheduler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentId(u64);

impl ComponentId {
	/// Builds a handle from a raw value.
	pub const fn from_raw(raw: u64) -> Self {
		Self(raw)
	}

	/// The raw value.
	pub const fn as_raw(self) -> u64 {
		self.0
	}
}

impl fmt::Display for ComponentId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "component#{}", self.0)
	}
}

/// A unit of state plus the output rendered from it.
///
/// On each flush a dirty component is updated in three steps: [`derive`],
/// its before-update callbacks, then [`patch`] with the slots that changed
/// since the last update.
///
/// [`derive`]: Component::derive
/// [`patch`]: Component::patch
pub trait Component {
	/// Runs once after registration, before the first render. Lifecycle
	/// callbacks for the component are registered here.
	fn init(&mut self, cx: &UpdateContext<'_>) -> Result<(), BoxError> {
		let _ = cx;
		Ok(())
	}

	/// Recomputes derived state. Marks made here are folded into the
	/// current update.
	fn derive(&mut self, cx: &UpdateContext<'_>) -> Result<(), BoxError> {
		let _ = cx;
		Ok(())
	}

	/// Re-renders the output that depends on the `dirty` slots.
	fn patch(&mut self, dirty: &DirtyMask, cx: &UpdateContext<'_>) -> Result<(), BoxError>;
}

/// What a component sees of the scheduler while it is updated.
#[derive(Clone, Copy)]
pub struct UpdateContext<'a> {
	scheduler: &'a Scheduler,
	component: ComponentId,
}

impl<'a> UpdateContext<'a> {
	pub(crate) fn new(scheduler: &'a Scheduler, component: ComponentId) -> Self {
		Self {
			scheduler,
			component,
		}
	}

	/// The owning scheduler.
	pub fn scheduler(&self) -> &'a Scheduler {
		self.scheduler
	}

	/// The component this context belongs to.
	pub fn component(&self) -> ComponentId {
		self.component
	}

	/// Marks one of this component's slots as changed.
	pub fn invalidate(&self, slot: usize) -> Result<(), SchedulerError> {
		self.scheduler.make_dirty(self.component, slot)
	}

	/// Writes `value` into `state` and invalidates `slot` if it changed.
	///
	/// Returns whether the value changed.
	pub fn set_state<T: PartialEq>(
		&self,
		state: &mut T,
		value: T,
		slot: usize,
	) -> Result<bool, SchedulerError> {
		if *state == value {
			return Ok(false);
		}
		*state = value;
		self.invalidate(slot)?;
		Ok(true)
	}
}

impl fmt::Debug for UpdateContext<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("UpdateContext")
			.field("component", &self.component)
			.finish_non_exhaustive()
	}
}
