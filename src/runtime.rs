//! Component runtime
//!
//! [`Runtime`] ties the hydration and scheduling cores together. Mounting a
//! view registers it with the scheduler, builds or claims its nodes, inserts
//! them into the document and flushes once so mount hooks run before
//! [`Runtime::mount`] returns.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use reinhardt_hydration::{ClaimList, Document, DomError, Fragment, NodeId};
use reinhardt_scheduler::{
	BoxError, Component, ComponentId, MicrotaskQueue, Scheduler, SchedulerError,
};
use tracing::{debug, info, warn};

use crate::settings::{RuntimeSettings, SettingsError};

/// Errors raised by the [`Runtime`].
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
	#[error(transparent)]
	Dom(#[from] DomError),

	#[error(transparent)]
	Scheduler(#[from] SchedulerError),

	#[error(transparent)]
	Settings(#[from] SettingsError),

	/// A view's `init` hook failed.
	#[error("Initialization of {component} failed: {source}")]
	Init {
		component: ComponentId,
		#[source]
		source: BoxError,
	},

	/// No mounted view has this id.
	#[error("Component {0} is not mounted")]
	NotMounted(ComponentId),
}

/// Where and how to mount a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MountOptions {
	/// Parent node receiving the view's root nodes.
	pub target: NodeId,
	/// Sibling to insert before; appends when `None`.
	pub anchor: Option<NodeId>,
	/// Claim the target's existing children instead of creating new nodes.
	pub hydrate: bool,
}

impl MountOptions {
	/// Appends freshly created nodes to `target`.
	pub fn new(target: NodeId) -> Self {
		Self {
			target,
			anchor: None,
			hydrate: false,
		}
	}

	/// Reuses the pre-rendered children of `target`.
	pub fn hydrate(target: NodeId) -> Self {
		Self {
			hydrate: true,
			..Self::new(target)
		}
	}

	pub fn with_anchor(mut self, anchor: NodeId) -> Self {
		self.anchor = Some(anchor);
		self
	}
}

/// Owns the document, the scheduler and the mounted views.
pub struct Runtime {
	settings: RuntimeSettings,
	document: Rc<RefCell<Document>>,
	queue: Rc<MicrotaskQueue>,
	scheduler: Rc<Scheduler>,
	fragments: BTreeMap<ComponentId, Rc<RefCell<dyn Fragment>>>,
}

impl Runtime {
	/// Creates a runtime over an empty document.
	pub fn new(settings: RuntimeSettings) -> Result<Self, RuntimeError> {
		Self::with_document(settings, Document::new())
	}

	/// Creates a runtime over `document`, typically holding server-rendered
	/// markup to hydrate.
	pub fn with_document(
		settings: RuntimeSettings,
		document: Document,
	) -> Result<Self, RuntimeError> {
		settings.validate()?;
		let queue = Rc::new(MicrotaskQueue::new());
		let scheduler = Scheduler::with_config(queue.clone(), settings.scheduler.to_config());
		info!(max_passes = ?settings.scheduler.max_passes, "runtime started");
		Ok(Self {
			settings,
			document: Rc::new(RefCell::new(document)),
			queue,
			scheduler,
			fragments: BTreeMap::new(),
		})
	}

	pub fn settings(&self) -> &RuntimeSettings {
		&self.settings
	}

	/// Shared handle to the document, for views that patch their nodes.
	pub fn document(&self) -> &Rc<RefCell<Document>> {
		&self.document
	}

	pub fn scheduler(&self) -> &Rc<Scheduler> {
		&self.scheduler
	}

	/// Whether `id` is mounted.
	pub fn is_mounted(&self, id: ComponentId) -> bool {
		self.fragments.contains_key(&id)
	}

	/// Mounts `view` and flushes once.
	///
	/// The view's `init` hook runs first with the view as current
	/// component, then its nodes are created, or claimed when
	/// `options.hydrate` is set.
	///
	/// Mounting is all or nothing: if any step fails, including the final
	/// flush, the view is unregistered and its nodes are detached before the
	/// error is returned.
	pub fn mount<V>(
		&mut self,
		view: Rc<RefCell<V>>,
		options: MountOptions,
	) -> Result<ComponentId, RuntimeError>
	where
		V: Component + Fragment + 'static,
	{
		let id = self.scheduler.register(Rc::clone(&view));
		let fragment: Rc<RefCell<dyn Fragment>> = view.clone();

		if let Err(error) = self.init_view(id, &view) {
			self.discard(id, None);
			return Err(error);
		}
		if let Err(error) = self.attach(id, &fragment, options) {
			self.discard(id, Some(&*fragment));
			return Err(error);
		}

		self.fragments.insert(id, Rc::clone(&fragment));
		debug!(component = %id, hydrate = options.hydrate, "view mounted");
		if let Err(error) = self.scheduler.flush() {
			self.fragments.remove(&id);
			self.discard(id, Some(&*fragment));
			return Err(error.into());
		}
		Ok(id)
	}

	fn init_view<V: Component>(
		&self,
		id: ComponentId,
		view: &RefCell<V>,
	) -> Result<(), RuntimeError> {
		let cx = self.scheduler.context(id)?;
		self.scheduler
			.with_current(id, || view.borrow_mut().init(&cx))
			.map_err(|source| RuntimeError::Init {
				component: id,
				source,
			})
	}

	fn attach(
		&self,
		id: ComponentId,
		fragment: &RefCell<dyn Fragment>,
		options: MountOptions,
	) -> Result<(), RuntimeError> {
		{
			let mut doc = self.document.borrow_mut();
			if options.hydrate {
				doc.start_hydrating();
			}
			let rendered = self.scheduler.with_current(id, || {
				self.render(&mut doc, &mut *fragment.borrow_mut(), options)
			});
			doc.end_hydrating();
			rendered?;
		}
		self.scheduler.mount_component(id)?;
		Ok(())
	}

	/// Undoes a partial mount. Cleanup failures are logged; the caller sees
	/// the error that stopped the mount.
	fn discard(&self, id: ComponentId, fragment: Option<&RefCell<dyn Fragment>>) {
		if let Err(error) = self.scheduler.destroy_component(id) {
			warn!(component = %id, %error, "failed to unregister view after failed mount");
		}
		if let Some(fragment) = fragment {
			let detached = fragment
				.borrow_mut()
				.detach(&mut self.document.borrow_mut(), true);
			if let Err(error) = detached {
				warn!(component = %id, %error, "failed to detach view after failed mount");
			}
		}
		debug!(component = %id, "mount rolled back");
	}

	fn render(
		&self,
		doc: &mut Document,
		fragment: &mut dyn Fragment,
		options: MountOptions,
	) -> Result<(), DomError> {
		if options.hydrate {
			let mut nodes = ClaimList::from_children(doc, options.target)?;
			fragment.claim(doc, &mut nodes)?;
			if self.settings.hydration.detach_unclaimed {
				let detached = nodes.detach_unclaimed(doc)?;
				if detached > 0 {
					debug!(target_node = %options.target, detached, "detached unclaimed nodes");
				}
			}
		} else {
			fragment.create(doc)?;
		}
		fragment.mount(doc, options.target, options.anchor)
	}

	/// Destroys `id`, running its teardowns, then detaches its nodes when
	/// `detaching`.
	pub fn destroy(&mut self, id: ComponentId, detaching: bool) -> Result<(), RuntimeError> {
		let fragment = self
			.fragments
			.remove(&id)
			.ok_or(RuntimeError::NotMounted(id))?;
		self.scheduler.destroy_component(id)?;
		fragment
			.borrow_mut()
			.detach(&mut self.document.borrow_mut(), detaching)?;
		debug!(component = %id, detaching, "view destroyed");
		Ok(())
	}

	/// Runs deferred work, including scheduled flushes, until none is left.
	///
	/// Returns the number of tasks run.
	pub fn tick(&self) -> Result<usize, RuntimeError> {
		Ok(self.queue.run_until_stalled()?)
	}
}

impl std::fmt::Debug for Runtime {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Runtime")
			.field("settings", &self.settings)
			.field("scheduler", &self.scheduler)
			.field("mounted", &self.fragments.len())
			.finish_non_exhaustive()
	}
}
