//! Rooted phylogeny stored as an index arena.
//!
//! # Overview
//! A [`Phylogeny`] keeps one entry per node in parallel arrays: parent
//! index, children, length of the branch above the node and an optional
//! label. A post-order is computed once at construction so every
//! bottom-up sweep (pruning, occupancy propagation) is a flat loop over
//! indices instead of a recursive walk.
//!
//! Trees come either from raw parent arrays ([`Phylogeny::from_parents`])
//! or from a tree parsed by `phylotree` ([`Phylogeny::from_phylotree`]).
//!
//! # Pruning
//! ```text
//!          root                        root
//!         /    \                      /    \
//!      n1:1     C:1     prune C     A:2     B:1
//!      /  \          ─────────▶
//!    A:2  B:1
//! ```
//! Dropping `C` leaves the root with a single child `n1`, which is promoted
//! to root (its own edge is discarded). Single-child internal nodes deeper
//! in the tree are collapsed by adding their branch length to the child,
//! so root-to-leaf path lengths among retained nodes are preserved.

use crate::error::{DiversityError, Result};
use phylotree::tree::Tree as PhyloTree;
use std::collections::{HashMap, HashSet};

/// Index of a node in a [`Phylogeny`] arena.
pub type NodeIndex = usize;

/// An immutable rooted tree with non-negative branch lengths.
#[derive(Debug, Clone, PartialEq)]
pub struct Phylogeny {
    parents: Vec<Option<NodeIndex>>,
    children: Vec<Vec<NodeIndex>>,
    /// Length of the branch leading to each node; 0 for the root
    lengths: Vec<f64>,
    labels: Vec<Option<String>>,
    root: NodeIndex,
    postorder: Vec<NodeIndex>,
}

impl Phylogeny {
    /// Build a tree from parallel parent / length / label arrays.
    ///
    /// Exactly one node must have no parent. Leaves (nodes without
    /// children) must carry unique labels; labels on internal nodes are
    /// kept but never used for lookups. The root's branch length is forced
    /// to 0.
    ///
    /// # Example
    /// ```
    /// # use phylo_diversity::tree::Phylogeny;
    /// // ((A:1,B:1):1,C:1);
    /// let tree = Phylogeny::from_parents(
    ///     vec![Some(2), Some(2), Some(4), Some(4), None],
    ///     vec![1.0, 1.0, 1.0, 1.0, 0.0],
    ///     vec![Some("A".into()), Some("B".into()), None, Some("C".into()), None],
    /// ).unwrap();
    /// assert_eq!(tree.num_leaves(), 3);
    /// assert_eq!(tree.root(), 4);
    /// ```
    ///
    /// # Errors
    /// Returns [`DiversityError::InvalidTree`] for mismatched array sizes,
    /// zero or several roots, out-of-range parents, cycles, negative or
    /// non-finite branch lengths, and unlabeled or duplicated leaves.
    pub fn from_parents(
        parents: Vec<Option<NodeIndex>>,
        mut lengths: Vec<f64>,
        labels: Vec<Option<String>>,
    ) -> Result<Self> {
        let n = parents.len();
        if n == 0 {
            return Err(DiversityError::InvalidTree("tree has no nodes".into()));
        }
        if lengths.len() != n || labels.len() != n {
            return Err(DiversityError::InvalidTree(format!(
                "{n} parents but {} branch lengths and {} labels",
                lengths.len(),
                labels.len()
            )));
        }

        let mut children = vec![Vec::new(); n];
        let mut root = None;
        for (node, parent) in parents.iter().enumerate() {
            match *parent {
                None if root.is_some() => {
                    return Err(DiversityError::InvalidTree(format!(
                        "nodes {} and {node} both lack a parent",
                        root.unwrap_or_default()
                    )));
                }
                None => root = Some(node),
                Some(p) if p >= n || p == node => {
                    return Err(DiversityError::InvalidTree(format!(
                        "node {node} has invalid parent {p}"
                    )));
                }
                Some(p) => children[p].push(node),
            }
        }
        let root = root.ok_or_else(|| DiversityError::InvalidTree("tree has no root".into()))?;

        if let Some((node, length)) = lengths
            .iter()
            .enumerate()
            .find(|&(_, l)| !l.is_finite() || *l < 0.0)
        {
            return Err(DiversityError::InvalidTree(format!(
                "node {node} has invalid branch length {length}"
            )));
        }
        lengths[root] = 0.0;

        let postorder = Self::compute_postorder(root, &children);
        if postorder.len() != n {
            return Err(DiversityError::InvalidTree(format!(
                "{} of {n} nodes are not reachable from the root",
                n - postorder.len()
            )));
        }

        let mut seen = HashSet::new();
        for node in (0..n).filter(|&v| children[v].is_empty()) {
            match labels[node].as_deref() {
                None => {
                    return Err(DiversityError::InvalidTree(format!(
                        "leaf {node} has no label"
                    )));
                }
                Some(label) if !seen.insert(label) => {
                    return Err(DiversityError::InvalidTree(format!(
                        "duplicate leaf label '{label}'"
                    )));
                }
                Some(_) => {}
            }
        }

        Ok(Phylogeny {
            parents,
            children,
            lengths,
            labels,
            root,
            postorder,
        })
    }

    /// Convert a tree parsed by `phylotree`.
    ///
    /// Nodes are renumbered in pre-order from the root, keeping the child
    /// order of the source tree. Missing edge lengths are treated as 0.0
    /// and internal node names are dropped.
    ///
    /// # Errors
    /// Returns `TreeError` if the source tree has no root or dangling node
    /// ids, or [`DiversityError::InvalidTree`] if a leaf is unnamed.
    pub fn from_phylotree(tree: &PhyloTree) -> Result<Self> {
        let root_id = tree.get_root()?;

        let mut parents = Vec::new();
        let mut lengths = Vec::new();
        let mut labels = Vec::new();

        let mut stack = vec![(root_id, None)];
        while let Some((node_id, parent)) = stack.pop() {
            let node = tree.get(&node_id)?;
            let index = parents.len();

            parents.push(parent);
            lengths.push(match parent {
                Some(_) => node.parent_edge.unwrap_or(0.0),
                None => 0.0,
            });
            labels.push(if node.children.is_empty() {
                node.name.clone()
            } else {
                None
            });

            for &child_id in node.children.iter().rev() {
                stack.push((child_id, Some(index)));
            }
        }

        Self::from_parents(parents, lengths, labels)
    }

    /// Parse a Newick string with `phylotree` and convert it.
    pub fn from_newick(newick: &str) -> Result<Self> {
        let tree = PhyloTree::from_newick(newick)
            .map_err(|e| DiversityError::InvalidTree(e.to_string()))?;
        Self::from_phylotree(&tree)
    }

    fn compute_postorder(root: NodeIndex, children: &[Vec<NodeIndex>]) -> Vec<NodeIndex> {
        let mut order = Vec::with_capacity(children.len());
        let mut stack = vec![(root, false)];
        while let Some((node, expanded)) = stack.pop() {
            if expanded {
                order.push(node);
                continue;
            }
            stack.push((node, true));
            for &child in children[node].iter().rev() {
                stack.push((child, false));
            }
        }
        order
    }

    pub fn num_nodes(&self) -> usize {
        self.parents.len()
    }

    pub fn num_leaves(&self) -> usize {
        self.children.iter().filter(|c| c.is_empty()).count()
    }

    /// Number of branches, one per non-root node.
    pub fn num_branches(&self) -> usize {
        self.num_nodes() - 1
    }

    pub fn root(&self) -> NodeIndex {
        self.root
    }

    pub fn parent(&self, node: NodeIndex) -> Option<NodeIndex> {
        self.parents[node]
    }

    pub fn children(&self, node: NodeIndex) -> &[NodeIndex] {
        &self.children[node]
    }

    /// Length of the branch leading to `node` (0 for the root).
    pub fn branch_length(&self, node: NodeIndex) -> f64 {
        self.lengths[node]
    }

    pub fn label(&self, node: NodeIndex) -> Option<&str> {
        self.labels[node].as_deref()
    }

    pub fn is_leaf(&self, node: NodeIndex) -> bool {
        self.children[node].is_empty()
    }

    /// Nodes ordered children-before-parent, root last.
    pub fn postorder(&self) -> &[NodeIndex] {
        &self.postorder
    }

    /// Leaves in post-order.
    pub fn leaves(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.postorder.iter().copied().filter(|&v| self.is_leaf(v))
    }

    /// Maps every leaf label to its node index.
    pub fn leaf_map(&self) -> HashMap<&str, NodeIndex> {
        self.leaves()
            .filter_map(|v| self.label(v).map(|label| (label, v)))
            .collect()
    }

    /// Sum of all branch lengths.
    pub fn total_length(&self) -> f64 {
        self.lengths.iter().sum()
    }

    /// Distance from the root to every node.
    pub fn root_distances(&self) -> Vec<f64> {
        let mut dist = vec![0.0; self.num_nodes()];
        for &node in self.postorder.iter().rev() {
            if let Some(parent) = self.parents[node] {
                dist[node] = dist[parent] + self.lengths[node];
            }
        }
        dist
    }

    /// Restrict the tree to the leaves whose labels are in `keep`.
    ///
    /// Unused leaves are removed, internal nodes left with one child are
    /// collapsed into that child (lengths summed) and internal nodes left
    /// without children disappear. New indices are assigned in post-order.
    ///
    /// # Errors
    /// Returns [`DiversityError::EmptyTree`] when no leaf is retained.
    pub fn prune(&self, keep: &HashSet<&str>) -> Result<Phylogeny> {
        let mut parents: Vec<Option<NodeIndex>> = Vec::new();
        let mut lengths = Vec::new();
        let mut labels = Vec::new();
        // Pruned index standing in for each original node
        let mut kept: Vec<Option<NodeIndex>> = vec![None; self.num_nodes()];

        for &node in &self.postorder {
            if self.is_leaf(node) {
                if self.label(node).is_some_and(|label| keep.contains(label)) {
                    kept[node] = Some(parents.len());
                    parents.push(None);
                    lengths.push(self.lengths[node]);
                    labels.push(self.labels[node].clone());
                }
                continue;
            }

            let retained: Vec<NodeIndex> = self.children[node]
                .iter()
                .filter_map(|&child| kept[child])
                .collect();
            match retained.as_slice() {
                [] => {}
                [only] => {
                    lengths[*only] += self.lengths[node];
                    kept[node] = Some(*only);
                }
                _ => {
                    let index = parents.len();
                    for &child in &retained {
                        parents[child] = Some(index);
                    }
                    kept[node] = Some(index);
                    parents.push(None);
                    lengths.push(self.lengths[node]);
                    labels.push(self.labels[node].clone());
                }
            }
        }

        if kept[self.root].is_none() {
            return Err(DiversityError::EmptyTree { leaves: 0 });
        }
        // The surviving top node loses its incoming edge in from_parents.
        Phylogeny::from_parents(parents, lengths, labels)
    }
}
