//! Document arena
//!
//! A minimal DOM-like tree used by the reconciler. Nodes live in an arena
//! owned by [`Document`] and are addressed by [`NodeId`] handles. A parent
//! owns the ordered list of its children; a child only records the id of its
//! parent, it does not own it.
//!
//! Only the operations hydration needs are provided: creation, claim-order
//! tagging, `insert_before`, removal, text splitting and attribute edits.

use core::fmt;

use crate::error::DomError;

/// Handle to a node stored in a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
	/// Builds a handle from a raw arena index.
	///
	/// Handles built this way are not checked until they are used.
	pub const fn from_raw(raw: usize) -> Self {
		Self(raw)
	}

	/// Returns the raw arena index.
	pub const fn as_raw(self) -> usize {
		self.0
	}
}

impl fmt::Display for NodeId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{}", self.0)
	}
}

/// The kind of a node and the data attached to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
	/// A text node.
	Text {
		/// The character data.
		data: String,
	},
	/// An element with a tag name and ordered attributes.
	Element {
		/// The tag name as written by the renderer.
		tag: String,
		/// Attributes in insertion order.
		attributes: Vec<(String, String)>,
	},
	/// A tag-less container (document root or detached fragment).
	Container,
}

impl NodeKind {
	/// Whether nodes of this kind may own children.
	pub fn accepts_children(&self) -> bool {
		!matches!(self, Self::Text { .. })
	}
}

/// Cursor used by `append_hydration` to track the next expected child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum EndChild {
	/// Never positioned.
	#[default]
	Unset,
	/// Positioned on a child.
	At(NodeId),
	/// Positioned past the last child.
	Past,
}

impl EndChild {
	pub(crate) fn from_option(node: Option<NodeId>) -> Self {
		match node {
			Some(id) => Self::At(id),
			None => Self::Past,
		}
	}

	pub(crate) fn node(self) -> Option<NodeId> {
		match self {
			Self::At(id) => Some(id),
			Self::Unset | Self::Past => None,
		}
	}
}

#[derive(Debug)]
struct Node {
	kind: NodeKind,
	parent: Option<NodeId>,
	children: Vec<NodeId>,
	claim_order: Option<u32>,
	hydrate_init: bool,
	end_child: EndChild,
}

impl Node {
	fn new(kind: NodeKind) -> Self {
		Self {
			kind,
			parent: None,
			children: Vec::new(),
			claim_order: None,
			hydrate_init: false,
			end_child: EndChild::Unset,
		}
	}
}

/// Arena-backed node tree.
///
/// Removed nodes are detached, never freed, so handles stay valid for the
/// lifetime of the document.
#[derive(Debug)]
pub struct Document {
	nodes: Vec<Node>,
	root: NodeId,
	hydrating: bool,
}

impl Default for Document {
	fn default() -> Self {
		Self::new()
	}
}

impl Document {
	/// Creates a document with an empty root container.
	pub fn new() -> Self {
		Self {
			nodes: vec![Node::new(NodeKind::Container)],
			root: NodeId(0),
			hydrating: false,
		}
	}

	/// The root container.
	pub fn root(&self) -> NodeId {
		self.root
	}

	/// Number of nodes ever created in this document.
	pub fn node_count(&self) -> usize {
		self.nodes.len()
	}

	fn push(&mut self, kind: NodeKind) -> NodeId {
		let id = NodeId(self.nodes.len());
		self.nodes.push(Node::new(kind));
		id
	}

	/// Creates a detached element without attributes.
	pub fn create_element(&mut self, tag: impl Into<String>) -> NodeId {
		self.create_element_with(tag, Vec::new())
	}

	/// Creates a detached element with the given attributes.
	pub fn create_element_with(
		&mut self,
		tag: impl Into<String>,
		attributes: Vec<(String, String)>,
	) -> NodeId {
		self.push(NodeKind::Element {
			tag: tag.into(),
			attributes,
		})
	}

	/// Creates a detached text node.
	pub fn create_text(&mut self, data: impl Into<String>) -> NodeId {
		self.push(NodeKind::Text { data: data.into() })
	}

	/// Creates a detached container.
	pub fn create_container(&mut self) -> NodeId {
		self.push(NodeKind::Container)
	}

	fn node(&self, id: NodeId) -> Result<&Node, DomError> {
		self.nodes.get(id.0).ok_or(DomError::UnknownNode(id))
	}

	fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, DomError> {
		self.nodes.get_mut(id.0).ok_or(DomError::UnknownNode(id))
	}

	/// The kind of a node.
	pub fn kind(&self, id: NodeId) -> Result<&NodeKind, DomError> {
		Ok(&self.node(id)?.kind)
	}

	/// Tag name of an element, `None` for text nodes and containers.
	pub fn tag(&self, id: NodeId) -> Result<Option<&str>, DomError> {
		Ok(match &self.node(id)?.kind {
			NodeKind::Element { tag, .. } => Some(tag.as_str()),
			_ => None,
		})
	}

	/// Whether the node is a text node.
	pub fn is_text(&self, id: NodeId) -> Result<bool, DomError> {
		Ok(matches!(self.node(id)?.kind, NodeKind::Text { .. }))
	}

	/// The parent of a node, if attached.
	pub fn parent(&self, id: NodeId) -> Result<Option<NodeId>, DomError> {
		Ok(self.node(id)?.parent)
	}

	/// Children of a node in physical order.
	pub fn children(&self, id: NodeId) -> Result<&[NodeId], DomError> {
		Ok(&self.node(id)?.children)
	}

	/// First child of a node.
	pub fn first_child(&self, id: NodeId) -> Result<Option<NodeId>, DomError> {
		Ok(self.node(id)?.children.first().copied())
	}

	/// Last child of a node.
	pub fn last_child(&self, id: NodeId) -> Result<Option<NodeId>, DomError> {
		Ok(self.node(id)?.children.last().copied())
	}

	/// The sibling following a node, if any.
	pub fn next_sibling(&self, id: NodeId) -> Result<Option<NodeId>, DomError> {
		let Some(parent) = self.node(id)?.parent else {
			return Ok(None);
		};
		let siblings = &self.node(parent)?.children;
		Ok(siblings
			.iter()
			.position(|&c| c == id)
			.and_then(|i| siblings.get(i + 1).copied()))
	}

	/// Claim order assigned during hydration.
	pub fn claim_order(&self, id: NodeId) -> Result<Option<u32>, DomError> {
		Ok(self.node(id)?.claim_order)
	}

	/// Sets or clears the claim order of a node.
	pub fn set_claim_order(&mut self, id: NodeId, order: Option<u32>) -> Result<(), DomError> {
		self.node_mut(id)?.claim_order = order;
		Ok(())
	}

	pub(crate) fn hydrate_init(&self, id: NodeId) -> Result<bool, DomError> {
		Ok(self.node(id)?.hydrate_init)
	}

	pub(crate) fn set_hydrate_init(&mut self, id: NodeId) -> Result<(), DomError> {
		self.node_mut(id)?.hydrate_init = true;
		Ok(())
	}

	pub(crate) fn end_child(&self, id: NodeId) -> Result<EndChild, DomError> {
		Ok(self.node(id)?.end_child)
	}

	pub(crate) fn set_end_child(&mut self, id: NodeId, end: EndChild) -> Result<(), DomError> {
		self.node_mut(id)?.end_child = end;
		Ok(())
	}

	/// Whether `ancestor` is `node` or one of its ancestors.
	fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> Result<bool, DomError> {
		let mut current = Some(node);
		while let Some(id) = current {
			if id == ancestor {
				return Ok(true);
			}
			current = self.node(id)?.parent;
		}
		Ok(false)
	}

	/// Moves `node` under `parent`, directly before `anchor`.
	///
	/// With no anchor the node is appended. The node is first removed from
	/// its current parent, if any. Inserting a node before itself is a no-op.
	pub fn insert_before(
		&mut self,
		parent: NodeId,
		node: NodeId,
		anchor: Option<NodeId>,
	) -> Result<(), DomError> {
		if !self.node(parent)?.kind.accepts_children() {
			return Err(DomError::NotAContainer(parent));
		}
		self.node(node)?;
		if self.is_inclusive_ancestor(node, parent)? {
			return Err(DomError::HierarchyRequest { parent, node });
		}
		if let Some(anchor) = anchor {
			if self.node(anchor)?.parent != Some(parent) {
				return Err(DomError::AnchorNotChild { parent, anchor });
			}
			if anchor == node {
				return Ok(());
			}
		}

		self.remove(node)?;

		let children = &mut self.node_mut(parent)?.children;
		let index = match anchor {
			Some(anchor) => children
				.iter()
				.position(|&c| c == anchor)
				.ok_or(DomError::AnchorNotChild { parent, anchor })?,
			None => children.len(),
		};
		children.insert(index, node);
		self.node_mut(node)?.parent = Some(parent);
		Ok(())
	}

	/// Appends `node` as the last child of `parent`.
	pub fn append_child(&mut self, parent: NodeId, node: NodeId) -> Result<(), DomError> {
		self.insert_before(parent, node, None)
	}

	/// Detaches a node from its parent. Detached nodes are left untouched.
	pub fn remove(&mut self, node: NodeId) -> Result<(), DomError> {
		let Some(parent) = self.node(node)?.parent else {
			return Ok(());
		};
		self.node_mut(parent)?.children.retain(|&c| c != node);
		self.node_mut(node)?.parent = None;
		Ok(())
	}

	/// Character data of a text node.
	pub fn text(&self, id: NodeId) -> Result<&str, DomError> {
		match &self.node(id)?.kind {
			NodeKind::Text { data } => Ok(data),
			_ => Err(DomError::NotText(id)),
		}
	}

	/// Replaces the character data of a text node.
	pub fn set_text(&mut self, id: NodeId, value: impl Into<String>) -> Result<(), DomError> {
		match &mut self.node_mut(id)?.kind {
			NodeKind::Text { data } => {
				*data = value.into();
				Ok(())
			}
			_ => Err(DomError::NotText(id)),
		}
	}

	/// Splits a text node at a byte offset.
	///
	/// The node keeps the data before `offset`; a new text node
	/// holding the rest is returned and, if it is attached,
	/// inserted right after it.
	pub fn split_text(&mut self, id: NodeId, offset: usize) -> Result<NodeId, DomError> {
		let data = self.text(id)?;
		if !data.is_char_boundary(offset) {
			return Err(DomError::InvalidOffset { node: id, offset });
		}
		let rest = data[offset..].to_string();
		if let NodeKind::Text { data } = &mut self.node_mut(id)?.kind {
			data.truncate(offset);
		}

		let tail = self.create_text(rest);
		if let Some(parent) = self.parent(id)? {
			let anchor = self.next_sibling(id)?;
			self.insert_before(parent, tail, anchor)?;
		}
		Ok(tail)
	}

	/// Attributes of an element; empty for other kinds.
	pub fn attributes(&self, id: NodeId) -> Result<&[(String, String)], DomError> {
		Ok(match &self.node(id)?.kind {
			NodeKind::Element { attributes, .. } => attributes,
			_ => &[],
		})
	}

	/// Value of one attribute.
	pub fn get_attribute(&self, id: NodeId, name: &str) -> Result<Option<&str>, DomError> {
		Ok(self
			.attributes(id)?
			.iter()
			.find(|(key, _)| key == name)
			.map(|(_, value)| value.as_str()))
	}

	/// Sets an attribute, keeping its position if it already exists.
	/// Non-element nodes are ignored.
	pub fn set_attribute(
		&mut self,
		id: NodeId,
		name: &str,
		value: impl Into<String>,
	) -> Result<(), DomError> {
		if let NodeKind::Element { attributes, .. } = &mut self.node_mut(id)?.kind {
			let value = value.into();
			match attributes.iter_mut().find(|(key, _)| key == name) {
				Some((_, existing)) => *existing = value,
				None => attributes.push((name.to_string(), value)),
			}
		}
		Ok(())
	}

	/// Removes an attribute if present.
	pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Result<(), DomError> {
		if let NodeKind::Element { attributes, .. } = &mut self.node_mut(id)?.kind {
			attributes.retain(|(key, _)| key != name);
		}
		Ok(())
	}

	/// Concatenated text of all descendant text nodes.
	pub fn text_content(&self, id: NodeId) -> Result<String, DomError> {
		let mut out = String::new();
		self.collect_text(id, &mut out)?;
		Ok(out)
	}

	fn collect_text(&self, id: NodeId, out: &mut String) -> Result<(), DomError> {
		let node = self.node(id)?;
		if let NodeKind::Text { data } = &node.kind {
			out.push_str(data);
		}
		for &child in &node.children {
			self.collect_text(child, out)?;
		}
		Ok(())
	}

	/// Marks the start of a hydration pass.
	pub fn start_hydrating(&mut self) {
		self.hydrating = true;
	}

	/// Marks the end of a hydration pass.
	pub fn end_hydrating(&mut self) {
		self.hydrating = false;
	}

	/// Whether a hydration pass is in progress.
	pub fn is_hydrating(&self) -> bool {
		self.hydrating
	}
}
