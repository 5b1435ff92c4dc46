//! Scheduler errors

use crate::component::ComponentId;

/// Error type returned by user components and callbacks.
pub type BoxError = Box<dyn std::error::Error + 'static>;

/// Errors produced by the [`Scheduler`](crate::Scheduler).
///
/// Errors from components and callbacks are not recovered from: they abort
/// the running flush and leave the remaining queued work in place.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
	/// The component is not registered, or was destroyed.
	#[error("Unknown component: {0}")]
	UnknownComponent(ComponentId),

	/// A lifecycle function was used while no component was being updated.
	#[error("Function called outside component initialization")]
	NoCurrentComponent,

	/// A component's `derive` or `patch` failed.
	#[error("Update of {component} failed: {source}")]
	Update {
		/// The component being updated.
		component: ComponentId,
		/// The error it returned.
		#[source]
		source: BoxError,
	},

	/// A lifecycle or binding callback failed.
	#[error("Callback failed: {source}")]
	Callback {
		/// The error it returned.
		#[source]
		source: BoxError,
	},

	/// The slot number is at or above [`DirtyMask::MAX_SLOTS`](crate::DirtyMask::MAX_SLOTS).
	#[error("Slot {slot} of {component} is out of range")]
	SlotOutOfRange {
		/// The component being marked.
		component: ComponentId,
		/// The rejected slot.
		slot: usize,
	},

	/// Updates kept re-dirtying components past the configured limit.
	#[error("Flush exceeded {passes} passes")]
	PassLimitExceeded {
		/// The configured limit.
		passes: usize,
	},
}

impl SchedulerError {
	pub(crate) fn callback(source: BoxError) -> Self {
		Self::Callback { source }
	}
}
