//! Hydration reconciler
//!
//! During hydration, pre-rendered nodes are claimed in the order the client
//! render expects them, and each claimed node gets a `claim_order`. The
//! physical order of the children may differ from that logical order.
//!
//! Claimed children are reordered optimally by finding the longest
//! subsequence that is already in claim order and moving only the rest.
//! Nodes that do not move always form a non-decreasing subsequence of claim
//! orders (they cannot swap relative to each other without one of them
//! moving), so keeping a longest such subsequence minimises the moves.
//!
//! Children without a claim order (nodes inserted by third parties, for
//! instance into a document head) are left out of the computation entirely:
//! they are never moved and never used as anchors.

use tracing::trace;

use crate::error::DomError;
use crate::lis::longest_non_decreasing;
use crate::node::{Document, EndChild, NodeId};

/// A single relocation in a [`ReorderPlan`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
	/// Index of the node to move, into the planned sequence.
	pub index: usize,
	/// Index of the stationary node to insert before; `None` appends.
	pub anchor: Option<usize>,
}

/// Result of [`plan_reorder`]: which nodes stay and how the others move.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReorderPlan {
	/// Indices of nodes that are never moved, ascending.
	pub stationary: Vec<usize>,
	/// Moves to apply in order, sorted by claim order.
	pub moves: Vec<Move>,
}

impl ReorderPlan {
	/// Number of insert operations the plan performs.
	pub fn move_count(&self) -> usize {
		self.moves.len()
	}

	/// Whether the sequence is already in claim order.
	pub fn is_noop(&self) -> bool {
		self.moves.is_empty()
	}
}

/// Computes the minimal set of moves that sorts `orders` ascending.
///
/// Moved nodes are inserted before the first stationary node whose order is
/// strictly greater than their own, or appended if there is none. Nodes with
/// equal orders keep the order in which they are inserted.
pub fn plan_reorder(orders: &[u32]) -> ReorderPlan {
	let stationary = longest_non_decreasing(orders);

	let mut keep = vec![false; orders.len()];
	for &i in &stationary {
		keep[i] = true;
	}

	// Collected back to front, then stably sorted by order.
	let mut to_move: Vec<usize> = (0..orders.len()).rev().filter(|&i| !keep[i]).collect();
	to_move.sort_by_key(|&i| orders[i]);

	let mut next = 0;
	let moves = to_move
		.into_iter()
		.map(|index| {
			while next < stationary.len() && orders[index] >= orders[stationary[next]] {
				next += 1;
			}
			Move {
				index,
				anchor: stationary.get(next).copied(),
			}
		})
		.collect();

	ReorderPlan { stationary, moves }
}

/// Reorders the claimed children of `target` into claim order.
///
/// Runs at most once per container; later calls are no-ops.
pub fn init_hydrate(doc: &mut Document, target: NodeId) -> Result<(), DomError> {
	if doc.hydrate_init(target)? {
		return Ok(());
	}
	doc.set_hydrate_init(target)?;

	let mut claimed = Vec::new();
	for &child in doc.children(target)? {
		if let Some(order) = doc.claim_order(child)? {
			claimed.push((child, order));
		}
	}
	let orders: Vec<u32> = claimed.iter().map(|&(_, order)| order).collect();
	let plan = plan_reorder(&orders);

	trace!(
		container = %target,
		claimed = claimed.len(),
		moves = plan.move_count(),
		"reordering claimed children"
	);

	for mv in &plan.moves {
		let node = claimed[mv.index].0;
		let anchor = mv.anchor.map(|i| claimed[i].0);
		doc.insert_before(target, node, anchor)?;
	}
	Ok(())
}

/// Appends `node` to `target`, reusing the current position when possible.
///
/// While hydrating, `target` is reordered once, then a cursor walks its
/// children: a node already sitting at the cursor only advances it, anything
/// else is inserted at the cursor. Outside hydration this is a plain append
/// that skips nodes already in last position.
pub fn append_hydration(doc: &mut Document, target: NodeId, node: NodeId) -> Result<(), DomError> {
	if !doc.is_hydrating() {
		if doc.parent(node)? != Some(target) || doc.next_sibling(node)?.is_some() {
			doc.append_child(target, node)?;
		}
		return Ok(());
	}

	init_hydrate(doc, target)?;

	let stale = match doc.end_child(target)? {
		EndChild::Unset => true,
		EndChild::At(end) => doc.parent(end)? != Some(target),
		EndChild::Past => false,
	};
	if stale {
		let first = doc.first_child(target)?;
		doc.set_end_child(target, EndChild::from_option(first))?;
	}

	// Unordered nodes stay where they are.
	while let EndChild::At(end) = doc.end_child(target)? {
		if doc.claim_order(end)?.is_some() {
			break;
		}
		let next = doc.next_sibling(end)?;
		doc.set_end_child(target, EndChild::from_option(next))?;
	}

	let end = doc.end_child(target)?.node();
	if Some(node) == end {
		let next = doc.next_sibling(node)?;
		doc.set_end_child(target, EndChild::from_option(next))?;
	} else if doc.claim_order(node)?.is_some() || doc.parent(node)? != Some(target) {
		doc.insert_before(target, node, end)?;
	}
	Ok(())
}

/// Inserts `node` into `target` before `anchor`.
///
/// Hydration without an anchor goes through [`append_hydration`]; otherwise
/// the node is only touched if it is not already right before `anchor`.
pub fn insert_hydration(
	doc: &mut Document,
	target: NodeId,
	node: NodeId,
	anchor: Option<NodeId>,
) -> Result<(), DomError> {
	if doc.is_hydrating() && anchor.is_none() {
		return append_hydration(doc, target, node);
	}
	if doc.parent(node)? != Some(target) || doc.next_sibling(node)? != anchor {
		doc.insert_before(target, node, anchor)?;
	}
	Ok(())
}

/// Removes `node` from its parent, if any.
pub fn detach(doc: &mut Document, node: NodeId) -> Result<(), DomError> {
	doc.remove(node)
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn container_with_orders(doc: &mut Document, orders: &[Option<u32>]) -> (NodeId, Vec<NodeId>) {
		let container = doc.create_element("div");
		let root = doc.root();
		doc.append_child(root, container).unwrap();
		let nodes = orders
			.iter()
			.enumerate()
			.map(|(i, &order)| {
				let node = doc.create_text(format!("n{i}"));
				doc.append_child(container, node).unwrap();
				doc.set_claim_order(node, order).unwrap();
				node
			})
			.collect();
		(container, nodes)
	}

	fn orders_of(doc: &Document, container: NodeId) -> Vec<Option<u32>> {
		doc.children(container)
			.unwrap()
			.iter()
			.map(|&c| doc.claim_order(c).unwrap())
			.collect()
	}

	#[rstest]
	#[case(&[], 0)]
	#[case(&[0], 0)]
	#[case(&[0, 1, 2, 3], 0)]
	#[case(&[2, 0, 1], 1)]
	#[case(&[3, 2, 1, 0], 3)]
	#[case(&[1, 0, 3, 2, 5, 4], 3)]
	fn test_plan_move_count(#[case] orders: &[u32], #[case] expected: usize) {
		let plan = plan_reorder(orders);
		assert_eq!(plan.move_count(), expected);
		assert_eq!(plan.stationary.len() + plan.move_count(), orders.len());
	}

	#[rstest]
	fn test_plan_anchors() {
		let plan = plan_reorder(&[1, 2, 0]);
		assert_eq!(plan.stationary, vec![0, 1]);
		assert_eq!(
			plan.moves,
			vec![Move {
				index: 2,
				anchor: Some(0)
			}]
		);

		let plan = plan_reorder(&[2, 0, 1]);
		assert_eq!(plan.stationary, vec![1, 2]);
		assert_eq!(
			plan.moves,
			vec![Move {
				index: 0,
				anchor: None
			}]
		);
	}

	#[rstest]
	fn test_plan_is_noop_for_sorted_input() {
		assert!(plan_reorder(&[0, 1, 1, 4, 9]).is_noop());
	}

	#[rstest]
	fn test_init_hydrate_sorts_children() {
		let mut doc = Document::new();
		let (container, _) = container_with_orders(
			&mut doc,
			&[Some(4), Some(0), Some(3), Some(1), Some(2)],
		);

		init_hydrate(&mut doc, container).unwrap();

		assert_eq!(
			orders_of(&doc, container),
			vec![Some(0), Some(1), Some(2), Some(3), Some(4)]
		);
	}

	#[rstest]
	fn test_init_hydrate_runs_once_per_container() {
		let mut doc = Document::new();
		let (container, nodes) = container_with_orders(&mut doc, &[Some(1), Some(0)]);

		init_hydrate(&mut doc, container).unwrap();
		assert_eq!(doc.children(container).unwrap(), &[nodes[1], nodes[0]]);

		// Shuffle again by hand; the second call must not touch anything.
		doc.append_child(container, nodes[1]).unwrap();
		init_hydrate(&mut doc, container).unwrap();
		assert_eq!(doc.children(container).unwrap(), &[nodes[0], nodes[1]]);
	}

	#[rstest]
	fn test_init_hydrate_ignores_unordered_children() {
		let mut doc = Document::new();
		let (container, nodes) =
			container_with_orders(&mut doc, &[Some(2), None, Some(0), None, Some(1)]);

		init_hydrate(&mut doc, container).unwrap();

		assert_eq!(
			doc.children(container).unwrap(),
			&[nodes[1], nodes[2], nodes[3], nodes[4], nodes[0]]
		);
	}

	#[rstest]
	fn test_append_hydration_keeps_matching_nodes_in_place() {
		let mut doc = Document::new();
		let (container, nodes) = container_with_orders(&mut doc, &[Some(0), Some(1), Some(2)]);

		doc.start_hydrating();
		for &node in &nodes {
			append_hydration(&mut doc, container, node).unwrap();
		}
		doc.end_hydrating();

		assert_eq!(doc.children(container).unwrap(), nodes.as_slice());
	}

	#[rstest]
	fn test_append_hydration_inserts_new_nodes_at_cursor() {
		let mut doc = Document::new();
		let (container, nodes) = container_with_orders(&mut doc, &[Some(0), Some(2)]);
		let fresh = doc.create_element("span");
		doc.set_claim_order(fresh, Some(1)).unwrap();

		doc.start_hydrating();
		append_hydration(&mut doc, container, nodes[0]).unwrap();
		append_hydration(&mut doc, container, fresh).unwrap();
		append_hydration(&mut doc, container, nodes[1]).unwrap();
		doc.end_hydrating();

		assert_eq!(
			doc.children(container).unwrap(),
			&[nodes[0], fresh, nodes[1]]
		);
	}

	#[rstest]
	fn test_append_hydration_skips_unordered_nodes() {
		let mut doc = Document::new();
		let (container, nodes) = container_with_orders(&mut doc, &[None, Some(0), None, Some(1)]);

		doc.start_hydrating();
		append_hydration(&mut doc, container, nodes[1]).unwrap();
		append_hydration(&mut doc, container, nodes[3]).unwrap();
		doc.end_hydrating();

		assert_eq!(doc.children(container).unwrap(), nodes.as_slice());
	}

	#[rstest]
	fn test_append_without_hydration() {
		let mut doc = Document::new();
		let root = doc.root();
		let a = doc.create_element("a");
		let b = doc.create_element("b");

		append_hydration(&mut doc, root, a).unwrap();
		append_hydration(&mut doc, root, b).unwrap();
		append_hydration(&mut doc, root, a).unwrap();

		assert_eq!(doc.children(root).unwrap(), &[b, a]);
	}

	#[rstest]
	fn test_insert_hydration_with_anchor() {
		let mut doc = Document::new();
		let root = doc.root();
		let a = doc.create_element("a");
		let b = doc.create_element("b");
		doc.append_child(root, b).unwrap();

		doc.start_hydrating();
		insert_hydration(&mut doc, root, a, Some(b)).unwrap();
		// Already in place.
		insert_hydration(&mut doc, root, a, Some(b)).unwrap();
		doc.end_hydrating();

		assert_eq!(doc.children(root).unwrap(), &[a, b]);
	}

	#[rstest]
	fn test_detach() {
		let mut doc = Document::new();
		let root = doc.root();
		let a = doc.create_element("a");
		doc.append_child(root, a).unwrap();

		detach(&mut doc, a).unwrap();
		detach(&mut doc, a).unwrap();

		assert!(doc.children(root).unwrap().is_empty());
		assert_eq!(doc.parent(a).unwrap(), None);
	}
}
