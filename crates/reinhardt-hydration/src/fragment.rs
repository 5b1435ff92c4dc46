//! Fragment lifecycle
//!
//! A fragment is the DOM-facing half of a component: it builds its nodes
//! from scratch, or claims them from pre-rendered markup, then mounts and
//! eventually detaches them.

use crate::claim::ClaimList;
use crate::error::DomError;
use crate::node::{Document, NodeId};

/// DOM lifecycle of a rendered component.
pub trait Fragment {
	/// Creates the fragment's nodes.
	fn create(&mut self, doc: &mut Document) -> Result<(), DomError>;

	/// Claims the fragment's nodes from pre-rendered candidates.
	///
	/// Fragments that cannot hydrate fall back to [`Fragment::create`].
	fn claim(&mut self, doc: &mut Document, nodes: &mut ClaimList) -> Result<(), DomError> {
		let _ = nodes;
		self.create(doc)
	}

	/// Inserts the fragment's root nodes into `target` before `anchor`.
	fn mount(
		&mut self,
		doc: &mut Document,
		target: NodeId,
		anchor: Option<NodeId>,
	) -> Result<(), DomError>;

	/// Tears the fragment down, removing its nodes when `detaching`.
	fn detach(&mut self, doc: &mut Document, detaching: bool) -> Result<(), DomError>;
}
