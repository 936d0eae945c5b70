//! Encode a tree and a community matrix as a sparse branch incidence.
//!
//! # Overview
//! Every branch of the (pruned) tree becomes a row of a sparse
//! branch × community matrix. A branch is occupied by a community when at
//! least one species below it occurs there:
//!
//! ```text
//!            root                 communities: s0 = {A, B}, s1 = {C}
//!           /    \
//!        n1:1    C:1              branch   s0  s1   length
//!        /  \                       A   [  1   .  ]   1
//!      A:1  B:1                     B   [  1   .  ]   1
//!                                   n1  [  1   .  ]   1
//!                                   C   [  .   1  ]   1
//! ```
//!
//! # Algorithm
//! 1. Check that every species label names a tree leaf.
//! 2. Prune the tree to species occurring in at least one community.
//! 3. Sweep the pruned post-order once: leaves take the communities their
//!    species occurs in, internal nodes OR the [`Bitset`]s of their
//!    children. Under [`Weighting::RelativeAbundance`] a sparse list of
//!    relative abundances is summed the same way.
//! 4. Emit one row per non-root node, rows ordered by post-order.

use crate::bitset::Bitset;
use crate::community::CommunityMatrix;
use crate::config::Weighting;
use crate::error::{DiversityError, Result};
use crate::sparse;
use crate::tree::{NodeIndex, Phylogeny};
use log::debug;
use sprs::{CsMat, TriMat};
use std::collections::HashMap;

/// Encoder output: pruned tree, branch lengths and branch incidence, all
/// indexed by branch.
#[derive(Debug, Clone)]
pub struct EncodedCommunities {
    tree: Phylogeny,
    /// Pruned-tree node below each branch
    branch_nodes: Vec<NodeIndex>,
    branch_lengths: Vec<f64>,
    /// 0/1 occupancy, CSR (branches × communities)
    incidence: CsMat<f64>,
    /// Same occupancy in CSC, one column per community
    incidence_by_community: CsMat<f64>,
    /// Incidence weights, CSR; equals `incidence` under presence/absence
    weights: CsMat<f64>,
    communities: Vec<String>,
    weighting: Weighting,
}

impl EncodedCommunities {
    /// The tree restricted to species occurring in the matrix.
    pub fn tree(&self) -> &Phylogeny {
        &self.tree
    }

    pub fn branch_nodes(&self) -> &[NodeIndex] {
        &self.branch_nodes
    }

    pub fn branch_lengths(&self) -> &[f64] {
        &self.branch_lengths
    }

    pub fn incidence(&self) -> &CsMat<f64> {
        &self.incidence
    }

    pub fn incidence_by_community(&self) -> &CsMat<f64> {
        &self.incidence_by_community
    }

    pub fn weights(&self) -> &CsMat<f64> {
        &self.weights
    }

    pub fn communities(&self) -> &[String] {
        &self.communities
    }

    pub fn weighting(&self) -> Weighting {
        self.weighting
    }

    pub fn n_branches(&self) -> usize {
        self.branch_lengths.len()
    }

    pub fn n_communities(&self) -> usize {
        self.communities.len()
    }

    /// Summed incidence weight per branch: the number of occupying
    /// communities under presence/absence.
    pub fn branch_ranges(&self) -> Vec<f64> {
        sparse::row_sums(&self.weights)
    }
}

/// Build the branch incidence of `matrix` on `tree`.
///
/// Neither input is modified; the output owns fresh copies of everything
/// it needs. Encoding the same inputs twice yields identical structures.
///
/// # Errors
/// - [`DiversityError::EmptyCommunity`] if the matrix has no rows.
/// - [`DiversityError::InputMismatch`] if a species has no tree leaf.
/// - [`DiversityError::EmptyTree`] if fewer than 2 leaves survive pruning.
pub fn encode(
    tree: &Phylogeny,
    matrix: &CommunityMatrix,
    weighting: Weighting,
) -> Result<EncodedCommunities> {
    if matrix.n_communities() == 0 {
        return Err(DiversityError::EmptyCommunity);
    }

    let leaves = tree.leaf_map();
    let missing: Vec<String> = matrix
        .species()
        .iter()
        .filter(|label| !leaves.contains_key(label.as_str()))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(DiversityError::InputMismatch { missing });
    }

    let occurring = matrix.occurring_species();
    let pruned = tree.prune(&occurring)?;
    if pruned.num_leaves() < 2 {
        return Err(DiversityError::EmptyTree {
            leaves: pruned.num_leaves(),
        });
    }
    debug!(
        "Pruned tree from {} to {} leaves ({} branches)",
        tree.num_leaves(),
        pruned.num_leaves(),
        pruned.num_branches()
    );

    let n = matrix.n_communities();
    let by_species = sparse::as_csc(matrix.data());
    let column_of: HashMap<&str, usize> = matrix
        .species()
        .iter()
        .enumerate()
        .map(|(col, label)| (label.as_str(), col))
        .collect();
    let relative = weighting == Weighting::RelativeAbundance;
    let row_totals = if relative {
        matrix.row_totals()
    } else {
        Vec::new()
    };

    let words = Bitset::words_for(n);
    let mut occupancy = vec![Bitset::zeros(words); pruned.num_nodes()];
    let mut abundance: Vec<Vec<(usize, f64)>> = if relative {
        vec![Vec::new(); pruned.num_nodes()]
    } else {
        Vec::new()
    };

    for &node in pruned.postorder() {
        if pruned.is_leaf(node) {
            let column = pruned
                .label(node)
                .and_then(|label| column_of.get(label))
                .copied()
                .ok_or_else(|| {
                    DiversityError::InvalidTree(format!("pruned leaf {node} lost its species"))
                })?;
            let Some(occurrences) = by_species.outer_view(column) else {
                continue;
            };
            for (&community, &value) in occurrences.indices().iter().zip(occurrences.data()) {
                if value > 0.0 {
                    occupancy[node].set(community);
                    if relative {
                        abundance[node].push((community, value / row_totals[community]));
                    }
                }
            }
        } else {
            let mut bits = Bitset::zeros(words);
            for &child in pruned.children(node) {
                bits.or_assign(&occupancy[child]);
            }
            occupancy[node] = bits;
            if relative {
                abundance[node] = merge_children(pruned.children(node), &abundance);
            }
        }
    }

    let branch_nodes: Vec<NodeIndex> = pruned
        .postorder()
        .iter()
        .copied()
        .filter(|&node| node != pruned.root())
        .collect();
    let branch_lengths: Vec<f64> = branch_nodes
        .iter()
        .map(|&node| pruned.branch_length(node))
        .collect();

    let shape = (branch_nodes.len(), n);
    let mut tri = TriMat::new(shape);
    for (branch, &node) in branch_nodes.iter().enumerate() {
        for community in occupancy[node].iter_ones() {
            tri.add_triplet(branch, community, 1.0);
        }
    }
    let incidence: CsMat<f64> = tri.to_csr();

    let weights = if relative {
        let mut tri = TriMat::new(shape);
        for (branch, &node) in branch_nodes.iter().enumerate() {
            for &(community, weight) in &abundance[node] {
                tri.add_triplet(branch, community, weight);
            }
        }
        tri.to_csr()
    } else {
        incidence.clone()
    };

    debug!(
        "Encoded {} branches x {} communities ({} occupied cells)",
        shape.0,
        shape.1,
        incidence.nnz()
    );

    Ok(EncodedCommunities {
        incidence_by_community: incidence.to_csc(),
        incidence,
        weights,
        branch_nodes,
        branch_lengths,
        tree: pruned,
        communities: matrix.communities().to_vec(),
        weighting,
    })
}

/// Sum the children's sorted `(community, value)` lists into one sorted list.
fn merge_children(children: &[NodeIndex], lists: &[Vec<(usize, f64)>]) -> Vec<(usize, f64)> {
    let mut merged: Vec<(usize, f64)> = children
        .iter()
        .flat_map(|&child| lists[child].iter().copied())
        .collect();
    merged.sort_by_key(|&(community, _)| community);
    merged.dedup_by(|next, kept| {
        if next.0 == kept.0 {
            kept.1 += next.1;
            true
        } else {
            false
        }
    });
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|s| s.to_string()).collect()
    }

    fn three_leaf() -> Phylogeny {
        Phylogeny::from_newick("((A:1,B:1):1,C:1);").unwrap()
    }

    fn two_communities() -> CommunityMatrix {
        CommunityMatrix::from_presence(
            names(&["s0", "s1"]),
            names(&["A", "B", "C"]),
            &[("s0", "A"), ("s0", "B"), ("s1", "C")],
        )
        .unwrap()
    }

    #[test]
    fn test_incidence_of_three_leaf_tree() {
        let enc = encode(&three_leaf(), &two_communities(), Weighting::Presence).unwrap();
        assert_eq!(enc.n_branches(), 4);
        assert_eq!(enc.branch_lengths(), &[1.0, 1.0, 1.0, 1.0]);
        // post-order: A, B, n1, C
        assert_eq!(
            sparse::entries(enc.incidence()),
            vec![(0, 0, 1.0), (1, 0, 1.0), (2, 0, 1.0), (3, 1, 1.0)]
        );
        assert_eq!(enc.branch_ranges(), vec![1.0; 4]);
        assert!(enc.incidence_by_community().is_csc());
    }

    #[test]
    fn test_unused_species_are_pruned() {
        let matrix = CommunityMatrix::from_dense(
            names(&["s0", "s1"]),
            names(&["A", "B", "C"]),
            &[vec![1.0, 0.0, 0.0], vec![0.0, 0.0, 1.0]],
        )
        .unwrap();
        let enc = encode(&three_leaf(), &matrix, Weighting::Presence).unwrap();
        // B is gone and n1 collapses into A (length 2)
        assert_eq!(enc.tree().num_leaves(), 2);
        assert_eq!(enc.n_branches(), 2);
        let mut lengths = enc.branch_lengths().to_vec();
        lengths.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(lengths, vec![1.0, 2.0]);
    }

    #[test]
    fn test_missing_species_is_input_mismatch() {
        let matrix = CommunityMatrix::from_presence(
            names(&["s0"]),
            names(&["A", "Z"]),
            &[("s0", "A"), ("s0", "Z")],
        )
        .unwrap();
        let err = encode(&three_leaf(), &matrix, Weighting::Presence).unwrap_err();
        match err {
            DiversityError::InputMismatch { missing } => assert_eq!(missing, vec!["Z"]),
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_single_species_is_empty_tree() {
        let matrix =
            CommunityMatrix::from_presence(names(&["s0"]), names(&["A"]), &[("s0", "A")]).unwrap();
        let err = encode(&three_leaf(), &matrix, Weighting::Presence).unwrap_err();
        assert!(matches!(err, DiversityError::EmptyTree { leaves: 1 }));

        let nothing = CommunityMatrix::from_dense(names(&["s0"]), names(&["A"]), &[vec![0.0]])
            .unwrap();
        let err = encode(&three_leaf(), &nothing, Weighting::Presence).unwrap_err();
        assert!(matches!(err, DiversityError::EmptyTree { leaves: 0 }));
    }

    #[test]
    fn test_no_communities() {
        let matrix = CommunityMatrix::from_dense(Vec::new(), names(&["A"]), &[]).unwrap();
        let err = encode(&three_leaf(), &matrix, Weighting::Presence).unwrap_err();
        assert!(matches!(err, DiversityError::EmptyCommunity));
    }

    #[test]
    fn test_relative_abundance_weights() {
        let matrix = CommunityMatrix::from_dense(
            names(&["s0", "s1"]),
            names(&["A", "B", "C"]),
            &[vec![3.0, 1.0, 0.0], vec![1.0, 0.0, 1.0]],
        )
        .unwrap();
        let enc = encode(&three_leaf(), &matrix, Weighting::RelativeAbundance).unwrap();
        let w = enc.weights();
        // branch 2 is n1 = {A, B}
        assert_eq!(w.get(2, 0).copied(), Some(1.0));
        assert_eq!(w.get(2, 1).copied(), Some(0.5));
        assert_eq!(w.get(0, 0).copied(), Some(0.75));
        assert_eq!(w.get(3, 1).copied(), Some(0.5));
        assert_eq!(w.get(3, 0), None);
        // occupancy is unaffected by weighting
        assert_eq!(enc.incidence().nnz(), 6);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let tree = three_leaf();
        let matrix = two_communities();
        let a = encode(&tree, &matrix, Weighting::Presence).unwrap();
        let b = encode(&tree, &matrix, Weighting::Presence).unwrap();
        assert_eq!(sparse::entries(a.incidence()), sparse::entries(b.incidence()));
        assert_eq!(a.branch_lengths(), b.branch_lengths());
        assert_eq!(a.branch_nodes(), b.branch_nodes());
    }
}
