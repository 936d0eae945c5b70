//! Per-community (alpha) diversity metrics.
//!
//! 1. **Phylogenetic diversity (PD)**: sum of the lengths of branches
//!    occupied by a community, `PD = lᵗ · M`.
//! 2. **Phylogenetic endemism (PE)**: every occupied branch contributes
//!    its length divided by its range (number of occupying communities, or
//!    summed relative abundance), `PE = (l / range)ᵗ · W`.
//! 3. **Weighted endemism (WE)**: the species-level analogue of PE, each
//!    present species contributes `1 / range(species)`.
//! 4. **Species richness**: number of species present.

use crate::community::CommunityMatrix;
use crate::encoder::EncodedCommunities;
use crate::result::{AlphaDiversity, AlphaMetric};
use crate::sparse;

/// PD of every community.
///
/// # Example
/// ```text
///        root            s0 = {A, B}: A + B + n1 = 3
///       /    \           s1 = {C}:    C          = 1
///    n1:1    C:1
///    /  \
///  A:1  B:1
/// ```
pub fn phylo_diversity(encoded: &EncodedCommunities) -> AlphaDiversity {
    let values = sparse::column_dot(encoded.incidence_by_community(), encoded.branch_lengths());
    AlphaDiversity::new(
        AlphaMetric::PhyloDiversity,
        encoded.communities().to_vec(),
        values,
    )
}

/// PE of every community.
///
/// Under presence/absence a branch occupied by a single community adds its
/// full length; a branch shared by `k` communities adds `length / k` to
/// each. Every branch of the pruned tree is occupied by at least one
/// community, so ranges are never zero.
pub fn phylo_endemism(encoded: &EncodedCommunities) -> AlphaDiversity {
    let ranges = encoded.branch_ranges();
    let scaled: Vec<f64> = encoded
        .branch_lengths()
        .iter()
        .zip(&ranges)
        .map(|(&length, &range)| if range > 0.0 { length / range } else { 0.0 })
        .collect();
    let values = sparse::column_dot(encoded.weights(), &scaled);
    AlphaDiversity::new(
        AlphaMetric::PhyloEndemism,
        encoded.communities().to_vec(),
        values,
    )
}

/// Weighted endemism: `Σ 1 / range(species)` over the species present.
pub fn weighted_endemism(matrix: &CommunityMatrix) -> AlphaDiversity {
    let presence = matrix.presence();
    let inverse_ranges: Vec<f64> = sparse::column_sums(&presence)
        .into_iter()
        .map(|range| if range > 0.0 { 1.0 / range } else { 0.0 })
        .collect();
    let values = sparse::row_dot(&presence, &inverse_ranges);
    AlphaDiversity::new(
        AlphaMetric::WeightedEndemism,
        matrix.communities().to_vec(),
        values,
    )
}

/// Number of species present in every community.
pub fn species_richness(matrix: &CommunityMatrix) -> AlphaDiversity {
    let values = sparse::row_sums(&matrix.presence());
    AlphaDiversity::new(
        AlphaMetric::SpeciesRichness,
        matrix.communities().to_vec(),
        values,
    )
}
