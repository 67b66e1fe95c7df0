//! Incremental reconstruction of the module dependency tree
//!
//! Load events arrive one at a time as `(requester, request, resolved)`
//! triples. Each event is placed under the node that represents its
//! requester; events whose requester is not (yet) in the tree are dropped.
//!
//! # Node matching
//!
//! A single breadth-first walk evaluates several named predicates per node
//! and stops as soon as every predicate has a match:
//!
//! - `parent`: canonical path equals the requester identity
//! - `parent_stem`: canonical path equals the requester after stripping a
//!   directory-index suffix or extension (fallback; may pick the wrong node
//!   when two units share a stripped form)
//! - `existing_child`: a node under a requester match that already
//!   represents the load target
//!
//! # Storage
//!
//! Nodes live in an arena indexed by [`NodeId`]. The parent link is a plain
//! index used for lookup only; ownership flows root to leaves through the
//! `children` lists.

use crate::json_output::TreeDocument;
use crate::resolver::{same_unit, unit_stem, RequestKind, ENTRY_ID};
use std::collections::VecDeque;
use tracing::debug;

/// Index of a node in the tree arena
pub type NodeId = usize;

/// A loaded unit in the tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleNode {
    /// Absolute identity; withheld for packages when dependency detail is off
    pub canonical_path: Option<String>,
    /// Bare package name for packages, canonical path otherwise
    pub display_name: String,
    /// First-observed order
    pub children: Vec<NodeId>,
    pub parent: Option<NodeId>,
}

/// One observed load
#[derive(Debug, Clone, Copy)]
pub struct LoadEvent<'a> {
    /// Identity of the requesting unit (`.` for the entry unit)
    pub requester: &'a str,
    /// Raw request string as written by the requester
    pub request: &'a str,
    /// Identity produced by the resolver
    pub resolved: &'a str,
    pub kind: RequestKind,
}

/// Outcome of submitting a load event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// A new child was appended
    Inserted(NodeId),
    /// The parent already had a child for this target
    AlreadyPresent(NodeId),
    /// No node represents the requester; the event was dropped
    Orphaned,
}

impl Placement {
    /// Whether the requester was located in the tree
    pub fn is_placed(self) -> bool {
        !matches!(self, Placement::Orphaned)
    }
}

/// A named node predicate. Receives the node and its parent, if any.
pub struct NodeMatcher<'a> {
    pub name: &'static str,
    matches: Box<dyn Fn(&ModuleNode, Option<&ModuleNode>) -> bool + 'a>,
}

impl<'a> NodeMatcher<'a> {
    pub fn new<F>(name: &'static str, matches: F) -> Self
    where
        F: Fn(&ModuleNode, Option<&ModuleNode>) -> bool + 'a,
    {
        Self {
            name,
            matches: Box::new(matches),
        }
    }
}

impl std::fmt::Debug for NodeMatcher<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeMatcher").field("name", &self.name).finish()
    }
}

/// The reconstructed dependency tree. Node 0 is the entry unit.
#[derive(Debug, Clone)]
pub struct DependencyTree {
    nodes: Vec<ModuleNode>,
    /// Keep canonical paths of package nodes
    keep_dependency_paths: bool,
}

impl Default for DependencyTree {
    fn default() -> Self {
        Self::new(false)
    }
}

impl DependencyTree {
    pub const ROOT: NodeId = 0;

    /// Create a tree holding only the entry unit
    pub fn new(keep_dependency_paths: bool) -> Self {
        Self {
            nodes: vec![ModuleNode {
                canonical_path: Some(ENTRY_ID.to_string()),
                display_name: ENTRY_ID.to_string(),
                children: Vec::new(),
                parent: None,
            }],
            keep_dependency_paths,
        }
    }

    pub fn root(&self) -> &ModuleNode {
        &self.nodes[Self::ROOT]
    }

    pub fn node(&self, id: NodeId) -> Option<&ModuleNode> {
        self.nodes.get(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: the root exists from construction
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = &ModuleNode> {
        self.nodes
            .get(id)
            .into_iter()
            .flat_map(|n| n.children.iter())
            .map(move |&c| &self.nodes[c])
    }

    /// First node, in breadth-first order, whose canonical path is `identity`
    pub fn find(&self, identity: &str) -> Option<NodeId> {
        let matcher = NodeMatcher::new("identity", |n, _| {
            n.canonical_path.as_deref() == Some(identity)
        });
        self.traverse_with_criteria(&[matcher])[0]
    }

    /// First node, in breadth-first order, whose display name is `name`
    pub fn find_by_display_name(&self, name: &str) -> Option<NodeId> {
        let matcher = NodeMatcher::new("display_name", |n, _| n.display_name == name);
        self.traverse_with_criteria(&[matcher])[0]
    }

    /// Walk the tree breadth-first, recording the first node satisfying each
    /// matcher. Stops as soon as every matcher has a result.
    pub fn traverse_with_criteria(&self, matchers: &[NodeMatcher<'_>]) -> Vec<Option<NodeId>> {
        let mut results = vec![None; matchers.len()];
        let mut remaining = matchers.len();
        if remaining == 0 {
            return results;
        }

        let mut queue = VecDeque::from([Self::ROOT]);
        while let Some(id) = queue.pop_front() {
            let node = &self.nodes[id];
            let parent = node.parent.map(|p| &self.nodes[p]);

            for (slot, matcher) in results.iter_mut().zip(matchers) {
                if slot.is_none() && (matcher.matches)(node, parent) {
                    *slot = Some(id);
                    remaining -= 1;
                }
            }
            if remaining == 0 {
                break;
            }
            queue.extend(node.children.iter().copied());
        }
        results
    }

    /// Place one load event in the tree
    pub fn submit(&mut self, event: LoadEvent<'_>) -> Placement {
        let requester = event.requester;
        let requester_stem = unit_stem(requester);

        let is_requester = |n: &ModuleNode| {
            n.canonical_path
                .as_deref()
                .is_some_and(|p| p == requester || unit_stem(p) == requester_stem)
        };
        let matchers = [
            NodeMatcher::new("parent", |n, _| n.canonical_path.as_deref() == Some(requester)),
            NodeMatcher::new("parent_stem", |n, _| {
                n.canonical_path
                    .as_deref()
                    .is_some_and(|p| unit_stem(p) == requester_stem)
            }),
            NodeMatcher::new("existing_child", |n, parent| {
                parent.is_some_and(is_requester) && represents(n, &event)
            }),
        ];

        let [exact, stem, existing] = match self.traverse_with_criteria(&matchers)[..] {
            [a, b, c] => [a, b, c],
            _ => [None; 3],
        };

        let Some(parent) = exact.or(stem) else {
            debug!(requester, request = event.request, "load event dropped: requester not in tree");
            return Placement::Orphaned;
        };

        if let Some(existing) = existing.filter(|&e| self.nodes[e].parent == Some(parent)) {
            return Placement::AlreadyPresent(existing);
        }
        // The walk may have matched a sibling under another requester candidate
        if let Some(&existing) = self.nodes[parent]
            .children
            .iter()
            .find(|&&c| represents(&self.nodes[c], &event))
        {
            return Placement::AlreadyPresent(existing);
        }

        let is_package = event.kind == RequestKind::Package;
        let node = ModuleNode {
            canonical_path: if is_package && !self.keep_dependency_paths {
                None
            } else {
                Some(event.resolved.to_string())
            },
            display_name: if is_package {
                event.request.to_string()
            } else {
                event.resolved.to_string()
            },
            children: Vec::new(),
            parent: Some(parent),
        };

        let id = self.nodes.len();
        self.nodes.push(node);
        self.nodes[parent].children.push(id);
        debug!(parent, id, display = %self.nodes[id].display_name, "inserted tree node");
        Placement::Inserted(id)
    }

    /// Copy the tree into its exported `{name, children}` form, labelling the
    /// root with the entry-unit identity
    pub fn to_document(&self, entry_name: &str) -> TreeDocument {
        let mut doc = self.document_at(Self::ROOT);
        doc.name = entry_name.to_string();
        doc
    }

    fn document_at(&self, id: NodeId) -> TreeDocument {
        let node = &self.nodes[id];
        TreeDocument {
            name: node.display_name.clone(),
            children: node.children.iter().map(|&c| self.document_at(c)).collect(),
        }
    }
}

/// Whether `node` already stands for the target of `event`
fn represents(node: &ModuleNode, event: &LoadEvent<'_>) -> bool {
    match node.canonical_path.as_deref() {
        Some(path) => {
            path == event.resolved
                || path == event.request
                || (event.kind == RequestKind::RelativeFile && same_unit(path, event.resolved))
        }
        None => node.display_name == event.request,
    }
}
