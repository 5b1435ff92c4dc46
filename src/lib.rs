//! # Reinhardt Runtime
//!
//! Client-side component runtime for Reinhardt pages.
//!
//! The runtime combines two cores:
//!
//! - [`hydration`]: reuses server-rendered nodes and restores their order
//!   with a minimal number of moves
//! - [`scheduler`]: batches state changes into one flush per turn and runs
//!   lifecycle callbacks in a fixed order
//!
//! [`Runtime`] owns the document and the scheduler, mounts views (types that
//! are both a [`Component`](scheduler::Component) and a
//! [`Fragment`](hydration::Fragment)) and drives deferred flushes through
//! [`Runtime::tick`].
//!
//! ## Quick Example
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use reinhardt_runtime::hydration::{Document, DomError, Fragment, NodeId, insert_hydration};
//! use reinhardt_runtime::scheduler::{BoxError, Component, DirtyMask, UpdateContext};
//! use reinhardt_runtime::{MountOptions, Runtime, RuntimeSettings};
//!
//! struct Greeting {
//!     document: Rc<RefCell<Document>>,
//!     name: String,
//!     text: Option<NodeId>,
//! }
//!
//! impl Component for Greeting {
//!     fn patch(&mut self, dirty: &DirtyMask, _cx: &UpdateContext<'_>) -> Result<(), BoxError> {
//!         if let (true, Some(text)) = (dirty.contains(0), self.text) {
//!             self.document.borrow_mut().set_text(text, format!("Hello, {}", self.name))?;
//!         }
//!         Ok(())
//!     }
//! }
//!
//! impl Fragment for Greeting {
//!     fn create(&mut self, doc: &mut Document) -> Result<(), DomError> {
//!         self.text = Some(doc.create_text(format!("Hello, {}", self.name)));
//!         Ok(())
//!     }
//!
//!     fn mount(&mut self, doc: &mut Document, target: NodeId, anchor: Option<NodeId>) -> Result<(), DomError> {
//!         match self.text {
//!             Some(text) => insert_hydration(doc, target, text, anchor),
//!             None => Ok(()),
//!         }
//!     }
//!
//!     fn detach(&mut self, doc: &mut Document, detaching: bool) -> Result<(), DomError> {
//!         match (detaching, self.text) {
//!             (true, Some(text)) => doc.remove(text),
//!             _ => Ok(()),
//!         }
//!     }
//! }
//!
//! let mut runtime = Runtime::new(RuntimeSettings::default()).unwrap();
//! let root = runtime.document().borrow().root();
//! let view = Rc::new(RefCell::new(Greeting {
//!     document: Rc::clone(runtime.document()),
//!     name: "world".to_string(),
//!     text: None,
//! }));
//! let id = runtime.mount(Rc::clone(&view), MountOptions::new(root)).unwrap();
//!
//! let cx = runtime.scheduler().context(id).unwrap();
//! cx.set_state(&mut view.borrow_mut().name, "Reinhardt".to_string(), 0).unwrap();
//! runtime.tick().unwrap();
//!
//! assert_eq!(runtime.document().borrow().text_content(root).unwrap(), "Hello, Reinhardt");
//! ```

pub mod runtime;
pub mod settings;

pub use reinhardt_hydration as hydration;
pub use reinhardt_scheduler as scheduler;

pub use runtime::{MountOptions, Runtime, RuntimeError};
pub use settings::{HydrationSettings, RuntimeSettings, SchedulerSettings, SettingsError};
