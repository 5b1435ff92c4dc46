//! # Reinhardt Scheduler
//!
//! Batched update scheduling for the Reinhardt component runtime.
//!
//! Components mark numbered state slots dirty; the [`Scheduler`] coalesces
//! every mark made before its deferred flush fires into a single pass,
//! updates components in the order they were first marked, and then runs
//! lifecycle callbacks in a fixed order.
//!
//! ## Example
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use reinhardt_scheduler::{
//!     BoxError, Component, DirtyMask, MicrotaskQueue, Scheduler, UpdateContext,
//! };
//!
//! struct Label {
//!     renders: usize,
//! }
//!
//! impl Component for Label {
//!     fn patch(&mut self, _dirty: &DirtyMask, _cx: &UpdateContext<'_>) -> Result<(), BoxError> {
//!         self.renders += 1;
//!         Ok(())
//!     }
//! }
//!
//! let queue = Rc::new(MicrotaskQueue::new());
//! let scheduler = Scheduler::new(queue.clone());
//! let label = Rc::new(RefCell::new(Label { renders: 0 }));
//! let id = scheduler.register(Rc::clone(&label));
//!
//! scheduler.make_dirty(id, 0).unwrap();
//! scheduler.make_dirty(id, 1).unwrap();
//! queue.run_until_stalled().unwrap();
//!
//! assert_eq!(label.borrow().renders, 1);
//! ```

pub mod callback;
pub mod component;
pub mod dirty;
pub mod error;
pub mod executor;
pub mod scheduler;

pub use callback::{Callback, CallbackId, MountCallback, OnceCallback, Teardown};
pub use component::{Component, ComponentId, UpdateContext};
pub use dirty::DirtyMask;
pub use error::{BoxError, SchedulerError};
#[cfg(all(target_family = "wasm", target_os = "unknown"))]
pub use executor::SpawnLocalExecutor;
pub use executor::{Executor, MicrotaskQueue, Task};
pub use scheduler::{FlushState, Scheduler, SchedulerConfig};
