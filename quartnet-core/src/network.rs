use std::collections::{BTreeSet, HashSet};
use std::fmt;

use crate::cyclic_order::CyclicOrder;
use crate::split::Split;
use crate::tree::Tree;
use crate::{Error, Result, Taxon};

/// Index of a node in a [`Level1Network`] arena.
pub type NodeId = usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Singleton(Taxon),
    Edge(NodeId, NodeId),
    /// Children in cyclic order.
    Circle(Vec<NodeId>),
    /// Children without any order.
    Blob(Vec<NodeId>),
}

/// A level-1 network stored as an arena of nodes.
///
/// Every edit is an explicit operation on the arena; nodes that drop out of
/// the structure stay allocated but are unreachable from the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Level1Network {
    nodes: Vec<NodeKind>,
    root: NodeId,
}

impl Level1Network {
    /// A single circle holding the taxa in the given order.
    pub fn circle(taxa: &[Taxon]) -> Self {
        let mut nodes: Vec<NodeKind> = taxa.iter().map(|&t| NodeKind::Singleton(t)).collect();
        nodes.push(NodeKind::Circle((0..taxa.len()).collect()));
        Self {
            root: taxa.len(),
            nodes,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id]
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        match &self.nodes[id] {
            NodeKind::Singleton(_) => Vec::new(),
            NodeKind::Edge(a, b) => vec![*a, *b],
            NodeKind::Circle(c) | NodeKind::Blob(c) => c.clone(),
        }
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.push(kind);
        self.nodes.len() - 1
    }

    /// Taxa below `id`, left to right.
    pub fn leaves(&self, id: NodeId) -> Vec<Taxon> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            match &self.nodes[id] {
                NodeKind::Singleton(t) => out.push(*t),
                NodeKind::Edge(a, b) => {
                    stack.push(*b);
                    stack.push(*a);
                }
                NodeKind::Circle(c) | NodeKind::Blob(c) => stack.extend(c.iter().rev()),
            }
        }
        out
    }

    /// Every taxon of the network.
    pub fn taxa(&self) -> Vec<Taxon> {
        self.leaves(self.root)
    }

    /// Whether each of `0..taxon_count` appears as exactly one leaf.
    pub fn covers_taxa(&self, taxon_count: usize) -> bool {
        let taxa = self.taxa();
        let mut seen = vec![false; taxon_count];
        taxa.len() == taxon_count
            && taxa
                .into_iter()
                .all(|t| t < taxon_count && !std::mem::replace(&mut seen[t], true))
    }

    /// Reachable nodes with every child before its parent.
    fn post_order(&self) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![(self.root, false)];
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                order.push(id);
                continue;
            }
            stack.push((id, true));
            for child in self.children(id).into_iter().rev() {
                stack.push((child, false));
            }
        }
        order
    }

    /// Gather the taxa of `split` under one new node.
    ///
    /// Descends from the root while a single child holds all of the
    /// members; the node reached must be a circle whose children holding
    /// members hold exactly the members. Those children are replaced by an
    /// `Edge` (two of them) or a new circle, at the position of the first.
    pub fn apply_split(&mut self, order: &CyclicOrder, split: Split) -> Result<NodeId> {
        let incompatible = Error::IncompatibleSplit {
            start: split.start,
            end: split.end,
        };
        let members: HashSet<Taxon> = split.members(order).iter().copied().collect();
        let mut node = self.root;
        let containing = loop {
            let containing: Vec<(NodeId, usize)> = self
                .children(node)
                .into_iter()
                .filter_map(|c| {
                    let leaves = self.leaves(c);
                    let hits = leaves.iter().filter(|t| members.contains(*t)).count();
                    (hits > 0).then_some((c, leaves.len()))
                })
                .collect();
            if let [(only, _)] = containing[..] {
                node = only;
            } else {
                break containing;
            }
        };
        let covered: usize = containing.iter().map(|&(_, len)| len).sum();
        if containing.len() < 2 || covered != members.len() {
            return Err(incompatible);
        }
        let NodeKind::Circle(_) = &self.nodes[node] else {
            return Err(incompatible);
        };

        let grouped: Vec<NodeId> = containing.iter().map(|&(c, _)| c).collect();
        let new = match grouped.as_slice() {
            [a, b] => self.push(NodeKind::Edge(*a, *b)),
            _ => self.push(NodeKind::Circle(grouped.clone())),
        };
        if let NodeKind::Circle(children) = &mut self.nodes[node] {
            let first = grouped[0];
            children.retain(|c| *c == first || !grouped.contains(c));
            for c in children.iter_mut() {
                if *c == first {
                    *c = new;
                }
            }
        }
        tracing::trace!(%split, node = new, "split applied");
        Ok(new)
    }

    /// Rewrite circles that only stand for tree edges.
    ///
    /// A circle with two children is an edge, its parent link being the
    /// missing third side. The root circle has no parent link, so it is an
    /// edge already with three children.
    pub fn collapse_trivial_circles(&mut self) {
        for id in self.post_order() {
            let children = match &self.nodes[id] {
                NodeKind::Circle(children) => children.clone(),
                _ => continue,
            };
            match children[..] {
                [a, b] => self.nodes[id] = NodeKind::Edge(a, b),
                [a, b, c] if id == self.root => {
                    let inner = self.push(NodeKind::Edge(b, c));
                    self.nodes[id] = NodeKind::Edge(a, inner);
                }
                _ => {}
            }
        }
    }

    /// The non-trivial bipartitions cut off below each node, each given by
    /// its side without taxon 0.
    pub fn splits(&self) -> BTreeSet<Vec<Taxon>> {
        let n = self.taxa().len();
        self.post_order()
            .into_iter()
            .filter(|&id| id != self.root)
            .filter_map(|id| normalized_side(self.leaves(id), n))
            .collect()
    }

    /// Flatten into an undirected graph. Leaves are labelled with their
    /// taxon; the root's attachment vertex is suppressed.
    pub fn to_graph(&self) -> NetworkGraph {
        let mut graph = NetworkGraph::default();
        match &self.nodes[self.root] {
            NodeKind::Edge(a, b) => {
                let a = self.attach(*a, &mut graph);
                let b = self.attach(*b, &mut graph);
                graph.edges.push((a, b));
            }
            NodeKind::Circle(children) => {
                let ring = self.ring(children, &mut graph);
                if let (Some(&first), Some(&last)) = (ring.first(), ring.last()) {
                    graph.edges.push((last, first));
                }
            }
            _ => {
                self.attach(self.root, &mut graph);
            }
        }
        graph
    }

    /// Add the subgraph of `id` and return the vertex its parent links to.
    fn attach(&self, id: NodeId, graph: &mut NetworkGraph) -> usize {
        match &self.nodes[id] {
            NodeKind::Singleton(t) => graph.vertex(Some(*t)),
            NodeKind::Edge(a, b) => {
                let v = graph.vertex(None);
                for child in [*a, *b] {
                    let c = self.attach(child, graph);
                    graph.edges.push((v, c));
                }
                v
            }
            NodeKind::Circle(children) => {
                let v = graph.vertex(None);
                let ring = self.ring(children, graph);
                if let (Some(&first), Some(&last)) = (ring.first(), ring.last()) {
                    graph.edges.push((v, first));
                    graph.edges.push((last, v));
                }
                v
            }
            NodeKind::Blob(children) => {
                let hub = graph.vertex(None);
                for &child in children {
                    let c = self.attach(child, graph);
                    graph.edges.push((hub, c));
                }
                hub
            }
        }
    }

    /// An open path of cycle vertices, one per child, each with the child
    /// hanging off it.
    fn ring(&self, children: &[NodeId], graph: &mut NetworkGraph) -> Vec<usize> {
        let mut ring = Vec::with_capacity(children.len());
        for &child in children {
            let u = graph.vertex(None);
            let c = self.attach(child, graph);
            graph.edges.push((u, c));
            if let Some(&prev) = ring.last() {
                graph.edges.push((prev, u));
            }
            ring.push(u);
        }
        ring
    }

    fn fmt_node(&self, id: NodeId, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.nodes[id] {
            NodeKind::Singleton(t) => write!(f, "{t}"),
            NodeKind::Edge(a, b) => {
                f.write_str("{")?;
                self.fmt_node(*a, f)?;
                f.write_str(", ")?;
                self.fmt_node(*b, f)?;
                f.write_str("}")
            }
            NodeKind::Circle(children) => self.fmt_list(children, "(", ")", f),
            NodeKind::Blob(children) => self.fmt_list(children, "<", ">", f),
        }
    }

    fn fmt_list(
        &self,
        children: &[NodeId],
        open: &str,
        close: &str,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(open)?;
        for (k, &child) in children.iter().enumerate() {
            if k > 0 {
                f.write_str(" ")?;
            }
            self.fmt_node(child, f)?;
        }
        f.write_str(close)
    }
}

/// Side of a bipartition of `0..n` without taxon 0, when both sides hold
/// at least two taxa.
pub(crate) fn normalized_side(mut side: Vec<Taxon>, n: usize) -> Option<Vec<Taxon>> {
    if side.contains(&0) {
        let inside: HashSet<Taxon> = side.into_iter().collect();
        side = (0..n).filter(|t| !inside.contains(t)).collect();
    }
    side.sort_unstable();
    (side.len() >= 2 && n - side.len() >= 2).then_some(side)
}

impl From<&Tree> for Level1Network {
    fn from(tree: &Tree) -> Self {
        fn build(tree: &Tree, nodes: &mut Vec<NodeKind>) -> NodeId {
            let kind = match tree {
                Tree::Leaf(t) => NodeKind::Singleton(*t),
                Tree::Node(a, b) => {
                    let a = build(a, nodes);
                    let b = build(b, nodes);
                    NodeKind::Edge(a, b)
                }
            };
            nodes.push(kind);
            nodes.len() - 1
        }
        let mut nodes = Vec::new();
        let root = build(tree, &mut nodes);
        Self { nodes, root }
    }
}

impl fmt::Display for Level1Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_node(self.root, f)
    }
}

/// Undirected vertex/edge view of a network.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkGraph {
    /// `Some(taxon)` for leaves.
    pub vertices: Vec<Option<Taxon>>,
    pub edges: Vec<(usize, usize)>,
}

impl NetworkGraph {
    fn vertex(&mut self, label: Option<Taxon>) -> usize {
        self.vertices.push(label);
        self.vertices.len() - 1
    }

    pub fn degree(&self, vertex: usize) -> usize {
        self.edges
            .iter()
            .filter(|&&(a, b)| a == vertex || b == vertex)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(network: &mut Level1Network, order: &CyclicOrder, start: usize, end: usize) {
        network.apply_split(order, Split::new(start, end)).unwrap();
    }

    #[test]
    fn test_flat_circle() {
        let network = Level1Network::circle(&[0, 4, 3, 2, 1]);
        assert_eq!(network.to_string(), "(0 4 3 2 1)");
        assert!(network.covers_taxa(5));
        assert!(network.splits().is_empty());
    }

    #[test]
    fn test_single_split_on_four_taxa() {
        let order = CyclicOrder::from_taxa(vec![0, 3, 2, 1]).unwrap();
        let mut network = Level1Network::circle(order.taxa());
        apply(&mut network, &order, 1, 3);
        assert_eq!(network.to_string(), "(0 {3, 2} 1)");
        network.collapse_trivial_circles();
        assert_eq!(network.to_string(), "{0, {{3, 2}, 1}}");
        assert_eq!(network.splits(), [vec![2, 3]].into_iter().collect());
    }

    #[test]
    fn test_nested_splits_build_a_caterpillar() {
        let order = CyclicOrder::from_taxa(vec![0, 5, 4, 3, 2, 1]).unwrap();
        let mut network = Level1Network::circle(order.taxa());
        apply(&mut network, &order, 1, 3);
        apply(&mut network, &order, 1, 4);
        apply(&mut network, &order, 1, 5);
        network.collapse_trivial_circles();
        assert_eq!(network.to_string(), "{0, {{{{5, 4}, 3}, 2}, 1}}");
        assert!(network.covers_taxa(6));
    }

    #[test]
    fn test_cycle_with_cherry_keeps_circle() {
        let order = CyclicOrder::from_taxa(vec![0, 4, 3, 2, 1]).unwrap();
        let mut network = Level1Network::circle(order.taxa());
        apply(&mut network, &order, 2, 4);
        network.collapse_trivial_circles();
        assert_eq!(network.to_string(), "(0 4 {3, 2} 1)");
        assert_eq!(network.splits(), [vec![2, 3]].into_iter().collect());
    }

    #[test]
    fn test_split_straddling_a_group_is_incompatible() {
        let order = CyclicOrder::identity(6);
        let mut network = Level1Network::circle(order.taxa());
        apply(&mut network, &order, 1, 3);
        let err = network.apply_split(&order, Split::new(2, 4)).unwrap_err();
        assert!(matches!(err, Error::IncompatibleSplit { start: 2, end: 4 }));
    }

    #[test]
    fn test_from_tree() {
        let tree = Tree::node(
            Tree::node(Tree::Leaf(0), Tree::Leaf(1)),
            Tree::node(Tree::Leaf(2), Tree::node(Tree::Leaf(3), Tree::Leaf(4))),
        );
        let network = Level1Network::from(&tree);
        assert_eq!(network.to_string(), "{{0, 1}, {2, {3, 4}}}");
        assert_eq!(network.splits(), tree.splits());
    }

    #[test]
    fn test_graph_of_tree_is_unrooted() {
        let tree = Tree::node(
            Tree::node(Tree::Leaf(0), Tree::Leaf(1)),
            Tree::node(Tree::Leaf(2), Tree::Leaf(3)),
        );
        let graph = Level1Network::from(&tree).to_graph();
        // 4 leaves, 2 inner vertices, 5 edges
        assert_eq!(graph.vertices.len(), 6);
        assert_eq!(graph.edges.len(), 5);
        for (v, label) in graph.vertices.iter().enumerate() {
            let expected = if label.is_some() { 1 } else { 3 };
            assert_eq!(graph.degree(v), expected);
        }
    }

    #[test]
    fn test_graph_of_circle_is_cubic() {
        let order = CyclicOrder::from_taxa(vec![0, 4, 3, 2, 1]).unwrap();
        let mut network = Level1Network::circle(order.taxa());
        apply(&mut network, &order, 2, 4);
        network.collapse_trivial_circles();
        let graph = network.to_graph();
        let leaves = graph.vertices.iter().filter(|l| l.is_some()).count();
        assert_eq!(leaves, 5);
        for (v, label) in graph.vertices.iter().enumerate() {
            let expected = if label.is_some() { 1 } else { 3 };
            assert_eq!(graph.degree(v), expected, "vertex {v}");
        }
    }

    #[test]
    fn test_blob_display() {
        let network = Level1Network {
            nodes: vec![
                NodeKind::Singleton(0),
                NodeKind::Singleton(1),
                NodeKind::Singleton(2),
                NodeKind::Blob(vec![0, 1, 2]),
            ],
            root: 3,
        };
        assert_eq!(network.to_string(), "<0 1 2>");
        assert_eq!(network.to_graph().edges.len(), 3);
    }
}
