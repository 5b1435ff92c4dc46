//! Batched update scheduler
//!
//! ## Flush cycle
//!
//! 1. The first [`Scheduler::make_dirty`] on a clean component appends it to
//!    the dirty list and, if nothing is scheduled yet, defers one flush to the
//!    [`Executor`]. Later marks only set bits in the component's mask.
//! 2. A flush updates dirty components in the order they were first marked.
//!    Components marked while the pass runs are appended and handled in the
//!    same pass.
//! 3. Binding callbacks then run last-registered-first, followed by render
//!    callbacks in registration order, each [`CallbackId`] at most once per
//!    flush. If callbacks marked components, another pass starts.
//! 4. Flush callbacks run once after the final pass. Work they leave
//!    behind (marks, or callbacks queued by a nested `flush()`) is picked up
//!    by another scheduled flush.
//!
//! The cursor into the dirty list survives re-entrant calls: a `flush()`
//! issued while a flush is running keeps draining the same list instead of
//! starting a second pass, and stops at a component that is still being
//! updated further up the stack.

use core::cell::{Cell, RefCell};
use core::fmt;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::rc::{Rc, Weak};

use tracing::{debug, trace, warn};

use crate::callback::{Callback, CallbackId, MountCallback, OnceCallback, Teardown};
use crate::component::{Component, ComponentId, UpdateContext};
use crate::dirty::DirtyMask;
use crate::error::{BoxError, SchedulerError};
use crate::executor::Executor;

/// Where the scheduler is in its flush cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlushState {
	/// Nothing is dirty, or a failed flush left work for a later one.
	#[default]
	Idle,
	/// A deferred flush is queued on the executor.
	Scheduled,
	/// A flush is running.
	Flushing,
}

/// Tuning knobs for a [`Scheduler`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerConfig {
	/// Upper bound on passes per flush. `None` lets a flush loop until no
	/// component is dirty.
	pub max_passes: Option<usize>,
}

struct ComponentRecord {
	component: Rc<RefCell<dyn Component>>,
	/// `None` while the component is clean.
	dirty: Option<DirtyMask>,
	before_update: Vec<Callback>,
	after_update: Vec<Callback>,
	on_mount: Vec<MountCallback>,
	on_destroy: Vec<Teardown>,
}

impl ComponentRecord {
	fn new(component: Rc<RefCell<dyn Component>>) -> Self {
		Self {
			component,
			dirty: None,
			before_update: Vec::new(),
			after_update: Vec::new(),
			on_mount: Vec::new(),
			on_destroy: Vec::new(),
		}
	}
}

/// Owns the dirty list, the callback queues and the flush state machine.
pub struct Scheduler {
	this: Weak<Scheduler>,
	executor: Rc<dyn Executor>,
	config: SchedulerConfig,
	next_component: Cell<u64>,
	components: RefCell<BTreeMap<ComponentId, ComponentRecord>>,
	dirty_components: RefCell<Vec<ComponentId>>,
	cursor: Cell<usize>,
	updating: RefCell<BTreeSet<ComponentId>>,
	binding_callbacks: RefCell<Vec<OnceCallback>>,
	render_callbacks: RefCell<Vec<Callback>>,
	flush_callbacks: RefCell<Vec<OnceCallback>>,
	seen: RefCell<HashSet<CallbackId>>,
	state: Cell<FlushState>,
	current: Cell<Option<ComponentId>>,
	flush_count: Cell<u64>,
}

impl Scheduler {
	/// Creates a scheduler deferring its flushes to `executor`.
	pub fn new(executor: Rc<dyn Executor>) -> Rc<Self> {
		Self::with_config(executor, SchedulerConfig::default())
	}

	pub fn with_config(executor: Rc<dyn Executor>, config: SchedulerConfig) -> Rc<Self> {
		Rc::new_cyclic(|this| Self {
			this: this.clone(),
			executor,
			config,
			next_component: Cell::new(0),
			components: RefCell::new(BTreeMap::new()),
			dirty_components: RefCell::new(Vec::new()),
			cursor: Cell::new(0),
			updating: RefCell::new(BTreeSet::new()),
			binding_callbacks: RefCell::new(Vec::new()),
			render_callbacks: RefCell::new(Vec::new()),
			flush_callbacks: RefCell::new(Vec::new()),
			seen: RefCell::new(HashSet::new()),
			state: Cell::new(FlushState::Idle),
			current: Cell::new(None),
			flush_count: Cell::new(0),
		})
	}

	pub fn state(&self) -> FlushState {
		self.state.get()
	}

	pub fn config(&self) -> SchedulerConfig {
		self.config
	}

	/// Number of outermost flushes started so far.
	pub fn flush_count(&self) -> u64 {
		self.flush_count.get()
	}

	/// Registers a clean component and returns its handle.
	pub fn register<C>(&self, component: Rc<RefCell<C>>) -> ComponentId
	where
		C: Component + 'static,
	{
		let id = ComponentId::from_raw(self.next_component.get());
		self.next_component.set(id.as_raw() + 1);
		self.components
			.borrow_mut()
			.insert(id, ComponentRecord::new(component));
		trace!(component = %id, "registered component");
		id
	}

	/// Whether `id` is registered and not destroyed.
	pub fn contains(&self, id: ComponentId) -> bool {
		self.components.borrow().contains_key(&id)
	}

	/// Whether `id` has marks waiting for an update.
	pub fn is_dirty(&self, id: ComponentId) -> bool {
		self.components
			.borrow()
			.get(&id)
			.is_some_and(|record| record.dirty.is_some())
	}

	/// Number of dirty list entries not yet updated.
	pub fn pending(&self) -> usize {
		self.dirty_components
			.borrow()
			.len()
			.saturating_sub(self.cursor.get())
	}

	fn with_record<R>(
		&self,
		id: ComponentId,
		f: impl FnOnce(&mut ComponentRecord) -> R,
	) -> Result<R, SchedulerError> {
		let mut components = self.components.borrow_mut();
		let record = components
			.get_mut(&id)
			.ok_or(SchedulerError::UnknownComponent(id))?;
		Ok(f(record))
	}

	/// Runs `callback` before every update of `id`, after `derive`.
	pub fn before_update(&self, id: ComponentId, callback: Callback) -> Result<(), SchedulerError> {
		self.with_record(id, |record| record.before_update.push(callback))
	}

	/// Runs `callback` after every update of `id` and after its first mount.
	pub fn after_update(
		&self,
		id: ComponentId,
		callback: Callback,
	) -> Result<CallbackId, SchedulerError> {
		let callback_id = callback.id();
		self.with_record(id, |record| record.after_update.push(callback))?;
		Ok(callback_id)
	}

	/// Runs `callback` once when `id` is mounted.
	///
	/// A teardown it returns runs when the component is destroyed.
	pub fn on_mount(&self, id: ComponentId, callback: MountCallback) -> Result<(), SchedulerError> {
		self.with_record(id, |record| record.on_mount.push(callback))
	}

	/// Runs `teardown` when `id` is destroyed.
	pub fn on_destroy(&self, id: ComponentId, teardown: Teardown) -> Result<(), SchedulerError> {
		self.with_record(id, |record| record.on_destroy.push(teardown))
	}

	/// Queues a binding callback for the end of the current pass.
	pub fn add_binding_callback(&self, callback: OnceCallback) {
		self.binding_callbacks.borrow_mut().push(callback);
	}

	/// Queues a render callback for the end of the current pass.
	pub fn add_render_callback(&self, callback: Callback) {
		self.render_callbacks.borrow_mut().push(callback);
	}

	/// Queues a callback for the end of the flush.
	pub fn add_flush_callback(&self, callback: OnceCallback) {
		self.flush_callbacks.borrow_mut().push(callback);
	}

	/// Marks `slot` of `id` as changed.
	///
	/// Slots at or above [`DirtyMask::MAX_SLOTS`] are rejected.
	pub fn make_dirty(&self, id: ComponentId, slot: usize) -> Result<(), SchedulerError> {
		if slot >= DirtyMask::MAX_SLOTS {
			return Err(SchedulerError::SlotOutOfRange {
				component: id,
				slot,
			});
		}
		let first_mark = self.with_record(id, |record| {
			let clean = record.dirty.is_none();
			record.dirty.get_or_insert_with(DirtyMask::new).set(slot);
			clean
		})?;

		if first_mark {
			trace!(component = %id, slot, "component marked dirty");
			self.dirty_components.borrow_mut().push(id);
			self.schedule_update();
		}
		Ok(())
	}

	/// An update context for code running outside an update, such as event
	/// handlers.
	pub fn context(&self, id: ComponentId) -> Result<UpdateContext<'_>, SchedulerError> {
		if !self.contains(id) {
			return Err(SchedulerError::UnknownComponent(id));
		}
		Ok(UpdateContext::new(self, id))
	}

	/// The component being initialized or updated.
	pub fn current_component(&self) -> Result<ComponentId, SchedulerError> {
		self.current.get().ok_or(SchedulerError::NoCurrentComponent)
	}

	/// Runs `f` with `id` as the current component.
	pub fn with_current<R>(&self, id: ComponentId, f: impl FnOnce() -> R) -> R {
		let saved = self.current.replace(Some(id));
		let result = f();
		self.current.set(saved);
		result
	}

	/// Queues the mount hooks of `id` to run at the end of the next pass,
	/// followed by its after-update callbacks.
	pub fn mount_component(&self, id: ComponentId) -> Result<(), SchedulerError> {
		let (mounts, after_update) = self.with_record(id, |record| {
			(
				std::mem::take(&mut record.on_mount),
				record.after_update.clone(),
			)
		})?;

		let mounts = RefCell::new(mounts);
		self.add_render_callback(Callback::new(move |scheduler| {
			let mut teardowns = Vec::new();
			for mount in mounts.take() {
				if let Some(teardown) = mount(scheduler)? {
					teardowns.push(teardown);
				}
			}
			scheduler.adopt_teardowns(id, teardowns);
			Ok(())
		}));
		for callback in after_update {
			self.add_render_callback(callback);
		}
		Ok(())
	}

	fn adopt_teardowns(&self, id: ComponentId, teardowns: Vec<Teardown>) {
		let orphans = {
			let mut components = self.components.borrow_mut();
			match components.get_mut(&id) {
				Some(record) => {
					record.on_destroy.extend(teardowns);
					return;
				}
				None => teardowns,
			}
		};
		// Destroyed before its mount hooks ran.
		for teardown in orphans {
			teardown();
		}
	}

	/// Destroys `id`: runs its queued after-update callbacks and teardowns,
	/// then forgets it. A pending update of `id` is skipped.
	pub fn destroy_component(&self, id: ComponentId) -> Result<(), SchedulerError> {
		let record = self
			.components
			.borrow_mut()
			.remove(&id)
			.ok_or(SchedulerError::UnknownComponent(id))?;

		let owned: HashSet<CallbackId> = record.after_update.iter().map(Callback::id).collect();
		let queued: Vec<Callback> = {
			let mut render = self.render_callbacks.borrow_mut();
			let (queued, kept): (Vec<Callback>, Vec<Callback>) = std::mem::take(&mut *render)
				.into_iter()
				.partition(|callback| owned.contains(&callback.id()));
			*render = kept;
			queued
		};
		for callback in queued {
			callback.call(self).map_err(SchedulerError::callback)?;
		}
		for teardown in record.on_destroy {
			teardown();
		}
		debug!(component = %id, "component destroyed");
		Ok(())
	}

	/// Queues one deferred flush unless one is queued or running.
	pub fn schedule_update(&self) {
		if self.state.get() != FlushState::Idle {
			return;
		}
		self.state.set(FlushState::Scheduled);
		let this = self.this.clone();
		self.executor.defer(Box::new(move || {
			let Some(scheduler) = this.upgrade() else {
				return Ok(());
			};
			// An explicit flush may have run in the meantime.
			if scheduler.state() != FlushState::Scheduled {
				return Ok(());
			}
			scheduler.flush()
		}));
		trace!("flush scheduled");
	}

	/// Updates every dirty component and runs the queued callbacks.
	///
	/// Errors abort the flush with partial progress: finished updates stay
	/// applied, unprocessed entries stay queued and the state returns to
	/// [`FlushState::Idle`].
	pub fn flush(&self) -> Result<(), SchedulerError> {
		let saved = self.current.get();

		if self.state.get() == FlushState::Flushing {
			trace!(cursor = self.cursor.get(), "re-entrant flush");
			let result = self.drain_dirty();
			self.current.set(saved);
			return result;
		}

		self.state.set(FlushState::Flushing);
		self.flush_count.set(self.flush_count.get() + 1);
		debug!(
			flush = self.flush_count.get(),
			pending = self.pending(),
			"flush started"
		);

		let result = self.run_passes();
		self.current.set(saved);

		match result {
			Ok(passes) => {
				self.seen.borrow_mut().clear();
				self.state.set(FlushState::Idle);
				debug!(flush = self.flush_count.get(), passes, "flush finished");
				if self.has_leftover_work() {
					// Queued by flush callbacks after the last pass.
					self.schedule_update();
				}
				if self.pending() == 0 {
					self.dirty_components.borrow_mut().clear();
					self.cursor.set(0);
				}
				Ok(())
			}
			Err(error) => {
				self.seen.borrow_mut().clear();
				self.state.set(FlushState::Idle);
				warn!(
					%error,
					pending = self.pending(),
					"flush aborted, remaining work stays queued"
				);
				Err(error)
			}
		}
	}

	fn run_passes(&self) -> Result<usize, SchedulerError> {
		let mut passes = 0;
		loop {
			if let Some(limit) = self.config.max_passes.filter(|&limit| passes >= limit) {
				return Err(SchedulerError::PassLimitExceeded { passes: limit });
			}
			passes += 1;

			self.drain_dirty()?;
			self.current.set(None);
			self.dirty_components.borrow_mut().clear();
			self.cursor.set(0);

			loop {
				let callback = self.binding_callbacks.borrow_mut().pop();
				let Some(callback) = callback else {
					break;
				};
				callback(self).map_err(SchedulerError::callback)?;
			}

			let mut index = 0;
			loop {
				let callback = self.render_callbacks.borrow().get(index).cloned();
				let Some(callback) = callback else {
					break;
				};
				index += 1;
				if !self.seen.borrow_mut().insert(callback.id()) {
					continue;
				}
				if let Err(source) = callback.call(self) {
					// Only the callbacks after the failing one stay queued.
					self.render_callbacks.borrow_mut().drain(..index);
					return Err(SchedulerError::callback(source));
				}
			}
			self.render_callbacks.borrow_mut().clear();

			if self.pending() == 0 {
				break;
			}
			trace!(passes, pending = self.pending(), "callbacks marked components, next pass");
		}

		loop {
			let callback = self.flush_callbacks.borrow_mut().pop();
			let Some(callback) = callback else {
				break;
			};
			callback(self).map_err(SchedulerError::callback)?;
		}
		Ok(passes)
	}

	fn has_leftover_work(&self) -> bool {
		self.pending() > 0
			|| !self.binding_callbacks.borrow().is_empty()
			|| !self.render_callbacks.borrow().is_empty()
	}

	fn drain_dirty(&self) -> Result<(), SchedulerError> {
		loop {
			let index = self.cursor.get();
			let id = self.dirty_components.borrow().get(index).copied();
			let Some(id) = id else {
				return Ok(());
			};
			if self.updating.borrow().contains(&id) {
				trace!(component = %id, "component mid-update, leaving it to the outer drain");
				return Ok(());
			}
			self.cursor.set(index + 1);
			self.current.set(Some(id));
			self.update(id)?;
		}
	}

	fn update(&self, id: ComponentId) -> Result<(), SchedulerError> {
		let component = self
			.components
			.borrow()
			.get(&id)
			.map(|record| Rc::clone(&record.component));
		let Some(component) = component else {
			trace!(component = %id, "skipping destroyed component");
			return Ok(());
		};

		self.updating.borrow_mut().insert(id);
		let result = self.run_update(id, &component);
		self.updating.borrow_mut().remove(&id);
		if result.is_err() {
			// Clean again so a later mark re-enqueues it.
			if let Some(record) = self.components.borrow_mut().get_mut(&id) {
				record.dirty = None;
			}
		}
		result
	}

	fn run_update(
		&self,
		id: ComponentId,
		component: &RefCell<dyn Component>,
	) -> Result<(), SchedulerError> {
		let update_error = |source: BoxError| SchedulerError::Update {
			component: id,
			source,
		};
		let cx = UpdateContext::new(self, id);
		let mut component = component.borrow_mut();

		component.derive(&cx).map_err(update_error)?;

		let before_update = self
			.components
			.borrow()
			.get(&id)
			.map(|record| record.before_update.clone())
			.unwrap_or_default();
		for callback in &before_update {
			callback.call(self).map_err(SchedulerError::callback)?;
		}

		let dirty = self
			.components
			.borrow_mut()
			.get_mut(&id)
			.map(|record| record.dirty.take());
		let Some(dirty) = dirty else {
			trace!(component = %id, "component destroyed during update");
			return Ok(());
		};
		let dirty = dirty.unwrap_or_default();

		trace!(component = %id, slots = ?dirty.iter().collect::<Vec<_>>(), "patching component");
		component.patch(&dirty, &cx).map_err(update_error)?;

		let after_update = self
			.components
			.borrow()
			.get(&id)
			.map(|record| record.after_update.clone())
			.unwrap_or_default();
		self.render_callbacks.borrow_mut().extend(after_update);
		Ok(())
	}
}

impl fmt::Debug for Scheduler {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Scheduler")
			.field("state", &self.state.get())
			.field("config", &self.config)
			.field("components", &self.components.borrow().len())
			.field("pending", &self.pending())
			.field("flush_count", &self.flush_count.get())
			.finish_non_exhaustive()
	}
}
