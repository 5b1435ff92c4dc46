//! Errors raised by document operations.

use crate::node::NodeId;

/// Errors that can occur while manipulating a [`Document`](crate::Document).
///
/// The reconciler itself is total; these errors only surface when a caller
/// hands it a malformed tree (stale handles, text nodes used as parents,
/// cyclic insertions).
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
	/// The handle does not belong to this document.
	#[error("Unknown node: {0}")]
	UnknownNode(NodeId),

	/// Text nodes cannot own children.
	#[error("Node {0} cannot have children")]
	NotAContainer(NodeId),

	/// The operation requires a text node.
	#[error("Node {0} is not a text node")]
	NotText(NodeId),

	/// The insertion would make a node its own ancestor.
	#[error("Inserting {node} into {parent} would create a cycle")]
	HierarchyRequest {
		/// The would-be parent.
		parent: NodeId,
		/// The node being inserted.
		node: NodeId,
	},

	/// The insertion anchor is not a child of the target container.
	#[error("Anchor {anchor} is not a child of {parent}")]
	AnchorNotChild {
		/// The target container.
		parent: NodeId,
		/// The anchor that was requested.
		anchor: NodeId,
	},

	/// A text split offset does not fall on a character boundary.
	#[error("Offset {offset} is not a character boundary of text node {node}")]
	InvalidOffset {
		/// The text node.
		node: NodeId,
		/// The requested byte offset.
		offset: usize,
	},
}
