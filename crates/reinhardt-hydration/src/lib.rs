//! Reinhardt Hydration - DOM reconciliation for server-rendered markup
//!
//! Reuses pre-rendered nodes when a component mounts on the client, and puts
//! them back into the order the client render expects with as few moves as
//! possible.
//!
//! ## Architecture
//!
//! - [`node`]: arena-backed node tree ([`Document`], [`NodeId`], [`NodeKind`])
//! - [`lis`]: O(n log n) longest non-decreasing subsequence
//! - [`reconcile`]: reorder planning and the hydration insert protocol
//! - [`claim`]: matching expected output against pre-rendered candidates
//! - [`fragment`]: create/claim/mount/detach lifecycle implemented by views
//!
//! ## Example
//!
//! ```
//! use reinhardt_hydration::{ClaimList, Document, append_hydration};
//!
//! let mut doc = Document::new();
//! let root = doc.root();
//! let text = doc.create_text("Contact");
//! let heading = doc.create_element("h2");
//! doc.append_child(root, text).unwrap();
//! doc.append_child(root, heading).unwrap();
//!
//! // The client render expects the heading first.
//! doc.start_hydrating();
//! let mut nodes = ClaimList::from_children(&doc, root).unwrap();
//! let h2 = nodes.claim_element(&mut doc, "h2", &[]).unwrap();
//! let label = nodes.claim_text(&mut doc, "Contact").unwrap();
//! append_hydration(&mut doc, root, h2).unwrap();
//! append_hydration(&mut doc, root, label).unwrap();
//! doc.end_hydrating();
//!
//! assert_eq!(doc.children(root).unwrap(), &[heading, text]);
//! ```

pub mod claim;
pub mod error;
pub mod fragment;
pub mod lis;
pub mod node;
pub mod reconcile;

pub use claim::{ClaimList, Claimed};
pub use error::DomError;
pub use fragment::Fragment;
pub use node::{Document, NodeId, NodeKind};
pub use reconcile::{
	Move, ReorderPlan, append_hydration, detach, init_hydrate, insert_hydration, plan_reorder,
};
