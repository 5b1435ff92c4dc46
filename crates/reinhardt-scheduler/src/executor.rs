//! Deferred task execution
//!
//! A scheduled flush never runs synchronously. It is handed to an
//! [`Executor`] which runs it once the current turn of work is over. On the
//! browser that is a microtask; elsewhere the host drives a
//! [`MicrotaskQueue`] explicitly.

use std::cell::RefCell;
use std::collections::VecDeque;

use crate::error::SchedulerError;

/// A unit of deferred work.
pub type Task = Box<dyn FnOnce() -> Result<(), SchedulerError>>;

/// Runs tasks after the current synchronous work has finished.
pub trait Executor {
	/// Queues `task` to run later, never before `defer` returns.
	fn defer(&self, task: Task);
}

/// A FIFO of deferred tasks drained by the host.
#[derive(Default)]
pub struct MicrotaskQueue {
	tasks: RefCell<VecDeque<Task>>,
}

impl MicrotaskQueue {
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of queued tasks.
	pub fn len(&self) -> usize {
		self.tasks.borrow().len()
	}

	pub fn is_empty(&self) -> bool {
		self.tasks.borrow().is_empty()
	}

	/// Runs queued tasks, including ones queued while draining, until the
	/// queue is empty.
	///
	/// Stops at the first failing task; the remaining tasks stay queued.
	/// Returns the number of tasks run.
	pub fn run_until_stalled(&self) -> Result<usize, SchedulerError> {
		let mut ran = 0;
		loop {
			let task = self.tasks.borrow_mut().pop_front();
			let Some(task) = task else {
				return Ok(ran);
			};
			ran += 1;
			task()?;
		}
	}
}

impl Executor for MicrotaskQueue {
	fn defer(&self, task: Task) {
		self.tasks.borrow_mut().push_back(task);
	}
}

impl core::fmt::Debug for MicrotaskQueue {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		f.debug_struct("MicrotaskQueue")
			.field("len", &self.len())
			.finish()
	}
}

/// Runs tasks as browser microtasks through `wasm_bindgen_futures`.
#[cfg(all(target_family = "wasm", target_os = "unknown"))]
#[derive(Debug, Default, Clone, Copy)]
pub struct SpawnLocalExecutor;

#[cfg(all(target_family = "wasm", target_os = "unknown"))]
impl Executor for SpawnLocalExecutor {
	fn defer(&self, task: Task) {
		wasm_bindgen_futures::spawn_local(async move {
			if let Err(error) = task() {
				tracing::error!(%error, "deferred flush failed");
			}
		});
	}
}
