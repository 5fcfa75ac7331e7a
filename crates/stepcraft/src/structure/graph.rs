//! Placement graph and the walker that resolves it.
//!
//! Nodes of one scope (a step, or a page) live in an arena indexed by
//! [`NodeIndex`]. An edge runs from an anchor to every node placed against
//! it, so each node has at most one incoming edge and the graph is a forest
//! rooted at the scope's root when well formed.
//!
//! The walker resolves anchors before their dependents. Nodes placed against
//! the step group wait for a second pass, after everything else in the scope
//! is resolved.

use log::{debug, warn};
use petgraph::{
    Direction,
    algo::is_cyclic_directed,
    graph::{DiGraph, NodeIndex},
    visit::EdgeRef,
};

use stepcraft_core::{
    geometry::Point,
    node::{NodeKind, PlacedNode, SizedNode},
    placement::{self, RelativeTo},
};

use crate::LayoutIssue;

/// Longest anchor chain the walker follows before giving up on a branch.
pub const MAX_EXPANSIONS: usize = 100;

/// Nodes of one scope and who is placed against whom.
#[derive(Debug, Clone)]
pub struct PlacementGraph {
    graph: DiGraph<SizedNode, ()>,
    root: NodeIndex,
}

/// The result of walking a graph.
#[derive(Debug, Clone)]
pub struct Walk {
    /// Every node, in insertion order. Unresolved nodes sit at the origin.
    pub placed: Vec<PlacedNode>,
    /// Resolved nodes in resolution order, root first.
    pub order: Vec<NodeIndex>,
    pub issues: Vec<LayoutIssue>,
}

impl Walk {
    pub fn offset(&self, index: NodeIndex) -> Point {
        self.placed
            .get(index.index())
            .map(PlacedNode::offset)
            .unwrap_or_default()
    }

    pub fn is_resolved(&self, index: NodeIndex) -> bool {
        self.order.contains(&index)
    }
}

impl PlacementGraph {
    /// Creates a graph whose root sits at the origin.
    pub fn new(root: SizedNode) -> Self {
        let mut graph = DiGraph::new();
        let root = graph.add_node(root);
        Self { graph, root }
    }

    pub fn add(&mut self, node: SizedNode) -> NodeIndex {
        self.graph.add_node(node)
    }

    pub fn root(&self) -> NodeIndex {
        self.root
    }

    /// Makes an already added node the root. Unknown indices are ignored.
    pub fn set_root(&mut self, root: NodeIndex) {
        if root.index() < self.graph.node_count() {
            self.root = root;
        }
    }

    pub fn node(&self, index: NodeIndex) -> &SizedNode {
        &self.graph[index]
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn indices(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    /// Returns the node `index` is placed against, once linked.
    pub fn anchor_of(&self, index: NodeIndex) -> Option<NodeIndex> {
        self.graph
            .edges_directed(index, Direction::Incoming)
            .next()
            .map(|edge| edge.source())
    }

    /// Returns the nodes placed against `index`, in insertion order.
    pub fn dependents(&self, index: NodeIndex) -> Vec<NodeIndex> {
        let mut dependents: Vec<_> = self
            .graph
            .edges_directed(index, Direction::Outgoing)
            .map(|edge| edge.target())
            .collect();
        dependents.sort();
        dependents
    }

    /// Binds every non-root node to its anchor.
    ///
    /// A callout binds to the nearest callout inserted before it, so
    /// callouts can chain. Every other role binds to the first node of that
    /// role. Nodes whose anchor does not exist stay unbound and are reported.
    pub fn link(&mut self) -> Vec<LayoutIssue> {
        self.graph.clear_edges();
        let mut issues = Vec::new();

        let indices: Vec<_> = self.graph.node_indices().collect();
        for &index in &indices {
            if index == self.root {
                continue;
            }
            let relative_to = self.graph[index].spec().relative_to;
            match self.find_anchor(index, relative_to) {
                Some(anchor) => {
                    self.graph.add_edge(anchor, index, ());
                }
                None => {
                    let label = self.graph[index].label().to_string();
                    warn!(node = label, relative_to:% = relative_to; "Anchor not found");
                    issues.push(LayoutIssue::DanglingRelativeTo {
                        node: label,
                        relative_to,
                    });
                }
            }
        }
        issues
    }

    fn find_anchor(&self, index: NodeIndex, relative_to: RelativeTo) -> Option<NodeIndex> {
        let has_role = |candidate: &NodeIndex| {
            *candidate != index && self.graph[*candidate].kind().role() == Some(relative_to)
        };

        if relative_to == RelativeTo::Callout {
            self.graph
                .node_indices()
                .take_while(|candidate| *candidate < index)
                .filter(has_role)
                .last()
        } else {
            self.graph.node_indices().find(has_role)
        }
    }

    /// Links the graph and resolves every reachable node against its anchor.
    ///
    /// Problems are reported in [`Walk::issues`] and never abort the walk:
    /// a node with a missing anchor, a node on an anchor loop and a node past
    /// [`MAX_EXPANSIONS`] keep the zero offset.
    pub fn walk(&mut self) -> Walk {
        let issues = self.link();
        if is_cyclic_directed(&self.graph) {
            debug!("Placement graph contains an anchor loop");
        }

        let mut state = WalkState {
            offsets: vec![None; self.graph.node_count()],
            order: Vec::with_capacity(self.graph.node_count()),
            deferred: Vec::new(),
            issues,
        };

        state.offsets[self.root.index()] = Some(Point::default());
        state.order.push(self.root);
        self.expand(self.root, 0, &mut state);

        // Nodes placed against the step group go last, once the group and
        // everything else in the scope is settled.
        while !state.deferred.is_empty() {
            for (group, depth) in std::mem::take(&mut state.deferred) {
                debug!(group = self.graph[group].label(); "Resolving against the step group");
                self.expand_children(group, depth, &mut state);
            }
        }

        let reported: Vec<_> = state
            .issues
            .iter()
            .map(|issue| issue.subject().to_string())
            .collect();
        for index in self.graph.node_indices() {
            let label = self.graph[index].label();
            if state.offsets[index.index()].is_none() && !reported.iter().any(|r| r == label) {
                warn!(node = label; "Node is unreachable from the root");
                state.issues.push(LayoutIssue::CycleGuardTripped {
                    node: label.to_string(),
                });
            }
        }

        let placed = self
            .graph
            .node_indices()
            .map(|index| {
                let offset = state.offsets[index.index()].unwrap_or_default();
                PlacedNode::new(self.graph[index].clone(), offset)
            })
            .collect();

        Walk {
            placed,
            order: state.order,
            issues: state.issues,
        }
    }

    fn expand(&self, anchor: NodeIndex, depth: usize, state: &mut WalkState) {
        if self.graph[anchor].kind() == NodeKind::StepGroup {
            state.deferred.push((anchor, depth));
            return;
        }
        self.expand_children(anchor, depth, state);
    }

    fn expand_children(&self, anchor: NodeIndex, depth: usize, state: &mut WalkState) {
        let Some(anchor_offset) = state.offsets[anchor.index()] else {
            return;
        };
        let anchor_node = PlacedNode::new(self.graph[anchor].clone(), anchor_offset);

        for dependent in self.dependents(anchor) {
            let node = &self.graph[dependent];
            if depth + 1 > MAX_EXPANSIONS || state.offsets[dependent.index()].is_some() {
                warn!(node = node.label(), depth; "Placement walk stopped");
                state.issues.push(LayoutIssue::CycleGuardTripped {
                    node: node.label().to_string(),
                });
                continue;
            }

            let offset = placement::resolve(&anchor_node, node);
            state.offsets[dependent.index()] = Some(offset);
            state.order.push(dependent);
            self.expand(dependent, depth + 1, state);
        }
    }
}

/// Bookkeeping of one walk.
struct WalkState {
    offsets: Vec<Option<Point>>,
    order: Vec<NodeIndex>,
    /// Step groups whose dependents wait for the second pass.
    deferred: Vec<(NodeIndex, usize)>,
    issues: Vec<LayoutIssue>,
}
