//! Claiming pre-rendered nodes
//!
//! When a component hydrates, it walks the expected output and asks the
//! [`ClaimList`] for an existing node matching each piece. Matching prefers
//! nodes after the previously claimed one, which tends to lengthen the run of
//! nodes already in claim order and so reduces the moves done later by
//! [`init_hydrate`](crate::reconcile::init_hydrate). Every returned node,
//! reused or freshly created, gets the next claim order.

use tracing::trace;

use crate::error::DomError;
use crate::node::{Document, NodeId};

/// What a claim processor did with a matched node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claimed {
	/// The node is taken out of the candidate list.
	Consumed,
	/// The node is taken; `0` stays in the list in its place.
	Replace(NodeId),
}

/// Candidate nodes for claiming, with the running claim counters.
#[derive(Debug, Clone, Default)]
pub struct ClaimList {
	nodes: Vec<NodeId>,
	last_index: usize,
	total_claimed: u32,
}

impl ClaimList {
	/// Wraps a list of candidate nodes.
	pub fn new(nodes: Vec<NodeId>) -> Self {
		Self {
			nodes,
			last_index: 0,
			total_claimed: 0,
		}
	}

	/// Uses the current children of `target` as candidates.
	pub fn from_children(doc: &Document, target: NodeId) -> Result<Self, DomError> {
		Ok(Self::new(doc.children(target)?.to_vec()))
	}

	/// Candidates that have not been claimed yet.
	pub fn nodes(&self) -> &[NodeId] {
		&self.nodes
	}

	/// Number of unclaimed candidates.
	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	/// Whether every candidate has been claimed.
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	/// Number of claims made so far, reused or created.
	pub fn total_claimed(&self) -> u32 {
		self.total_claimed
	}

	/// Finds the first candidate matching `predicate`, searching forward from
	/// the last claimed position and then backward from just before it.
	fn find<P>(&self, doc: &Document, predicate: &P) -> Option<(usize, bool)>
	where
		P: Fn(&Document, NodeId) -> bool,
	{
		let start = self.last_index.min(self.nodes.len());
		(start..self.nodes.len())
			.find(|&i| predicate(doc, self.nodes[i]))
			.map(|i| (i, true))
			.or_else(|| {
				(0..start)
					.rev()
					.find(|&i| predicate(doc, self.nodes[i]))
					.map(|i| (i, false))
			})
	}

	/// Claims a node matching `predicate`, or creates one with `create`.
	///
	/// `process` adapts a matched node and decides whether it leaves the
	/// candidate list. With `dont_update_last_index` the search origin is
	/// kept, only compensated when a node before it was removed.
	pub fn claim_node<P, F, C>(
		&mut self,
		doc: &mut Document,
		predicate: P,
		process: F,
		create: C,
		dont_update_last_index: bool,
	) -> Result<NodeId, DomError>
	where
		P: Fn(&Document, NodeId) -> bool,
		F: FnOnce(&mut Document, NodeId) -> Result<Claimed, DomError>,
		C: FnOnce(&mut Document) -> NodeId,
	{
		let node = match self.find(doc, &predicate) {
			Some((index, forward)) => {
				let node = self.nodes[index];
				let consumed = match process(doc, node)? {
					Claimed::Consumed => {
						self.nodes.remove(index);
						true
					}
					Claimed::Replace(replacement) => {
						self.nodes[index] = replacement;
						false
					}
				};
				if !dont_update_last_index {
					self.last_index = index;
				} else if !forward && consumed {
					self.last_index = self.last_index.saturating_sub(1);
				}
				node
			}
			None => {
				let node = create(doc);
				trace!(node = %node, "no pre-rendered match, created node");
				node
			}
		};

		doc.set_claim_order(node, Some(self.total_claimed))?;
		self.total_claimed += 1;
		Ok(node)
	}

	/// Claims an element by tag name, stripping attributes not listed in
	/// `attributes`.
	pub fn claim_element(
		&mut self,
		doc: &mut Document,
		tag: &str,
		attributes: &[&str],
	) -> Result<NodeId, DomError> {
		self.claim_node(
			doc,
			|doc, node| {
				doc.tag(node)
					.ok()
					.flatten()
					.is_some_and(|t| t.eq_ignore_ascii_case(tag))
			},
			|doc, node| {
				let stale: Vec<String> = doc
					.attributes(node)?
					.iter()
					.filter(|(name, _)| !attributes.contains(&name.as_str()))
					.map(|(name, _)| name.clone())
					.collect();
				for name in stale {
					doc.remove_attribute(node, &name)?;
				}
				Ok(Claimed::Consumed)
			},
			|doc| doc.create_element(tag),
			false,
		)
	}

	/// Claims a text node holding `data`.
	///
	/// A longer pre-rendered text starting with `data` is split and its tail
	/// stays claimable; a mismatching one is overwritten. Text claims do not
	/// move the search origin.
	pub fn claim_text(&mut self, doc: &mut Document, data: &str) -> Result<NodeId, DomError> {
		self.claim_node(
			doc,
			|doc, node| doc.is_text(node).unwrap_or(false),
			|doc, node| {
				let existing = doc.text(node)?;
				if existing.starts_with(data) {
					if existing.len() != data.len() {
						return Ok(Claimed::Replace(doc.split_text(node, data.len())?));
					}
				} else {
					doc.set_text(node, data)?;
				}
				Ok(Claimed::Consumed)
			},
			|doc| doc.create_text(data),
			true,
		)
	}

	/// Claims a single-space text node.
	pub fn claim_space(&mut self, doc: &mut Document) -> Result<NodeId, DomError> {
		self.claim_text(doc, " ")
	}

	/// Detaches every candidate that was not claimed and empties the list.
	///
	/// Returns the number of detached nodes.
	pub fn detach_unclaimed(&mut self, doc: &mut Document) -> Result<usize, DomError> {
		let leftovers = std::mem::take(&mut self.nodes);
		for &node in &leftovers {
			doc.remove(node)?;
		}
		self.last_index = 0;
		Ok(leftovers.len())
	}
}
