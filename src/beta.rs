//! Pairwise (beta) diversity decomposed into turnover and nestedness.
//!
//! For communities `i` and `j` let
//! - `a` = what they share,
//! - `b` = what only `i` has,
//! - `c` = what only `j` has.
//!
//! Taxonomic beta counts species; phylogenetic beta sums the lengths of
//! branches. Both families below split total dissimilarity into a
//! turnover part (replacement) and a nestedness part (loss):
//!
//! | family   | turnover                  | total                 |
//! |----------|---------------------------|-----------------------|
//! | Sorensen | `min(b,c) / (a+min(b,c))` | `(b+c) / (2a+b+c)`    |
//! | Jaccard  | `2min(b,c) / (a+2min(b,c))` | `(b+c) / (a+b+c)`   |
//!
//! and `nestedness = total - turnover` in both cases.
//!
//! # Algorithm
//! `a` for every pair comes from one sparse weighted Gram product of the
//! incidence matrix ([`sparse::weighted_gram_upper`]); `b` and `c` follow
//! from per-community totals (richness or PD) minus `a`. Pairs sharing
//! nothing never materialise in the Gram matrix.

use crate::community::CommunityMatrix;
use crate::encoder::EncodedCommunities;
use crate::result::{BetaDiversity, BetaKind, PairwiseMatrix};
use crate::sparse;
use log::warn;
use rayon::prelude::*;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use sprs::CsMat;

/// Dissimilarity index family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "snake_case"))]
pub enum BetaFamily {
    #[default]
    Sorensen,
    Jaccard,
}

/// Turnover, nestedness and total dissimilarity of one pair.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BetaComponents {
    pub turnover: f64,
    pub nestedness: f64,
    pub total: f64,
}

impl BetaComponents {
    /// No dissimilarity at all.
    pub const IDENTICAL: Self = Self {
        turnover: 0.0,
        nestedness: 0.0,
        total: 0.0,
    };

    /// One community holds nothing the other lacks: pure loss.
    pub const NESTED: Self = Self {
        turnover: 0.0,
        nestedness: 1.0,
        total: 1.0,
    };

    /// Components from shared (`a`) and unique (`b`, `c`) amounts.
    ///
    /// Returns `None` when `a + b + c == 0`, where the amounts alone cannot
    /// tell the pair apart. When only one side is empty the pair is pure
    /// nestedness: turnover 0, total 1.
    ///
    /// # Example
    /// ```
    /// # use phylo_diversity::beta::{BetaComponents, BetaFamily};
    /// let c = BetaComponents::from_counts(BetaFamily::Sorensen, 2.0, 1.0, 3.0).unwrap();
    /// assert!((c.turnover - 1.0 / 3.0).abs() < 1e-12);
    /// assert!((c.total - 0.5).abs() < 1e-12);
    /// ```
    pub fn from_counts(family: BetaFamily, shared: f64, unique_i: f64, unique_j: f64) -> Option<Self> {
        let (a, b, c) = (shared.max(0.0), unique_i.max(0.0), unique_j.max(0.0));
        if a + b + c <= 0.0 {
            return None;
        }
        let min = b.min(c);
        let (turnover, total) = match family {
            BetaFamily::Sorensen => (ratio(min, a + min), (b + c) / (2.0 * a + b + c)),
            BetaFamily::Jaccard => (ratio(2.0 * min, a + 2.0 * min), (b + c) / (a + b + c)),
        };
        let total = total.clamp(0.0, 1.0);
        let turnover = turnover.clamp(0.0, total);
        Some(Self {
            turnover,
            nestedness: total - turnover,
            total,
        })
    }
}

fn ratio(num: f64, den: f64) -> f64 {
    if den > 0.0 { num / den } else { 0.0 }
}

/// Taxonomic beta diversity between all pairs of communities.
///
/// Shared and unique amounts are species counts; abundances are reduced to
/// presence/absence.
pub fn taxonomic_beta(matrix: &CommunityMatrix, family: BetaFamily) -> BetaDiversity {
    let presence = matrix.presence();
    let richness = sparse::row_sums(&presence);
    let occupied: Vec<bool> = richness.iter().map(|&r| r > 0.0).collect();
    let by_species = sparse::transpose(&presence);
    let shared = sparse::weighted_gram_upper(&by_species, &vec![1.0; matrix.n_species()]);
    beta_from_shared(
        BetaKind::Taxonomic,
        family,
        matrix.communities(),
        &richness,
        &occupied,
        &shared,
    )
}

/// Phylogenetic beta diversity between all pairs of communities.
///
/// Shared and unique amounts are summed branch lengths. With a star tree
/// and unit branch lengths this equals [`taxonomic_beta`].
///
/// Two occupied communities sharing every branch of positive length (for
/// instance species on zero-length branches only) are indistinguishable
/// and get 0 in all three components.
pub fn phylo_beta(encoded: &EncodedCommunities, family: BetaFamily) -> BetaDiversity {
    let by_community = encoded.incidence_by_community();
    let pd = sparse::column_dot(by_community, encoded.branch_lengths());
    let occupied: Vec<bool> = sparse::column_sums(by_community)
        .into_iter()
        .map(|branches| branches > 0.0)
        .collect();
    let shared = sparse::weighted_gram_upper_views(
        encoded.incidence(),
        by_community,
        encoded.branch_lengths(),
    );
    beta_from_shared(
        BetaKind::Phylogenetic,
        family,
        encoded.communities(),
        &pd,
        &occupied,
        &shared,
    )
}

/// Components of pair `(i, j)`, `None` only when neither community has an
/// occurrence. Zero amounts on occupied communities fall back to the
/// occupancy: both occupied is identity, one occupied is pure nestedness.
fn pair_components(
    family: BetaFamily,
    shared: f64,
    unique: (f64, f64),
    occupied: (bool, bool),
) -> Option<BetaComponents> {
    let fallback = match occupied {
        (false, false) => return None,
        (true, true) => BetaComponents::IDENTICAL,
        _ => BetaComponents::NESTED,
    };
    Some(BetaComponents::from_counts(family, shared, unique.0, unique.1).unwrap_or(fallback))
}

/// Turn per-community totals and the upper-triangular shared amounts into
/// the three condensed component matrices.
///
/// Each community `i` owns the condensed run of pairs `(i, i+1..n)`; rayon
/// workers fill those runs in place.
fn beta_from_shared(
    kind: BetaKind,
    family: BetaFamily,
    labels: &[String],
    totals: &[f64],
    occupied: &[bool],
    shared: &CsMat<f64>,
) -> BetaDiversity {
    let n = labels.len();
    let pairs = n * n.saturating_sub(1) / 2;
    let mut turnover = vec![0.0; pairs];
    let mut nestedness = vec![0.0; pairs];
    let mut total = vec![0.0; pairs];

    let mut runs = Vec::with_capacity(n);
    let (mut t_rest, mut n_rest, mut o_rest) = (&mut turnover[..], &mut nestedness[..], &mut total[..]);
    for i in 0..n {
        let len = n - i - 1;
        let (t_run, t_tail) = std::mem::take(&mut t_rest).split_at_mut(len);
        let (n_run, n_tail) = std::mem::take(&mut n_rest).split_at_mut(len);
        let (o_run, o_tail) = std::mem::take(&mut o_rest).split_at_mut(len);
        runs.push((i, t_run, n_run, o_run));
        (t_rest, n_rest, o_rest) = (t_tail, n_tail, o_tail);
    }

    let degenerate_pairs: usize = runs
        .into_par_iter()
        .map(|(i, t_run, n_run, o_run)| {
            let row = shared.outer_view(i);
            let (cols, values) = match &row {
                Some(row) => (row.indices(), row.data()),
                None => (&[][..], &[][..]),
            };
            let mut cursor = 0;
            let mut degenerate = 0;
            for (k, j) in (i + 1..n).enumerate() {
                let a = if cursor < cols.len() && cols[cursor] == j {
                    cursor += 1;
                    values[cursor - 1]
                } else {
                    0.0
                };
                let unique = (totals[i] - a, totals[j] - a);
                match pair_components(family, a, unique, (occupied[i], occupied[j])) {
                    Some(c) => {
                        t_run[k] = c.turnover;
                        n_run[k] = c.nestedness;
                        o_run[k] = c.total;
                    }
                    None => {
                        degenerate += 1;
                        t_run[k] = f64::NAN;
                        n_run[k] = f64::NAN;
                        o_run[k] = f64::NAN;
                    }
                }
            }
            degenerate
        })
        .sum();

    if degenerate_pairs > 0 {
        warn!(
            "{degenerate_pairs} of {pairs} community pairs have no occurrences on either side; reported as NaN"
        );
    }

    let diagonal: Vec<f64> = occupied
        .iter()
        .map(|&occ| if occ { 0.0 } else { f64::NAN })
        .collect();
    let labels = labels.to_vec();
    BetaDiversity {
        kind,
        family,
        turnover: PairwiseMatrix::new(labels.clone(), turnover, diagonal.clone()),
        nestedness: PairwiseMatrix::new(labels.clone(), nestedness, diagonal.clone()),
        total: PairwiseMatrix::new(labels, total, diagonal),
        degenerate_pairs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Weighting;
    use crate::encoder::encode;
    use crate::error::DiversityError;
    use crate::tree::Phylogeny;

    fn names(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|s| s.to_string()).collect()
    }

    fn matrix(rows: &[Vec<f64>]) -> CommunityMatrix {
        let communities: Vec<String> = (0..rows.len()).map(|i| format!("s{i}")).collect();
        CommunityMatrix::from_dense(communities, names(&["A", "B", "C", "D"]), rows).unwrap()
    }

    fn tree() -> Phylogeny {
        Phylogeny::from_newick("(((A:1,B:1):1,C:2):1,D:3);").unwrap()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_from_counts_edge_cases() {
        assert!(BetaComponents::from_counts(BetaFamily::Sorensen, 0.0, 0.0, 0.0).is_none());

        let identical = BetaComponents::from_counts(BetaFamily::Sorensen, 4.0, 0.0, 0.0).unwrap();
        assert_eq!(identical.total, 0.0);
        assert_eq!(identical.turnover, 0.0);
        assert_eq!(identical.nestedness, 0.0);

        let disjoint = BetaComponents::from_counts(BetaFamily::Jaccard, 0.0, 2.0, 3.0).unwrap();
        assert_eq!(disjoint.total, 1.0);
        assert_eq!(disjoint.turnover, 1.0);

        let one_empty = BetaComponents::from_counts(BetaFamily::Sorensen, 0.0, 3.0, 0.0).unwrap();
        assert_eq!(one_empty.total, 1.0);
        assert_eq!(one_empty.turnover, 0.0);
        assert_eq!(one_empty.nestedness, 1.0);

        // nested: j is a strict subset of i
        let nested = BetaComponents::from_counts(BetaFamily::Sorensen, 2.0, 2.0, 0.0).unwrap();
        assert_eq!(nested.turnover, 0.0);
        assert!(close(nested.total, 2.0 / 6.0));
    }

    #[test]
    fn test_jaccard_values() {
        let c = BetaComponents::from_counts(BetaFamily::Jaccard, 2.0, 1.0, 3.0).unwrap();
        assert!(close(c.total, 4.0 / 6.0));
        assert!(close(c.turnover, 2.0 / 4.0));
        assert!(close(c.turnover + c.nestedness, c.total));
    }

    #[test]
    fn test_taxonomic_beta() {
        let m = matrix(&[
            vec![1.0, 1.0, 0.0, 0.0],
            vec![0.0, 0.0, 1.0, 0.0],
            vec![1.0, 1.0, 0.0, 0.0],
            vec![1.0, 1.0, 1.0, 0.0],
        ]);
        let beta = taxonomic_beta(&m, BetaFamily::Sorensen);
        assert_eq!(beta.kind, BetaKind::Taxonomic);
        assert_eq!(beta.degenerate_pairs, 0);
        assert_eq!(beta.total.get(0, 1), 1.0);
        assert_eq!(beta.total.get(0, 2), 0.0);
        assert_eq!(beta.turnover.get(0, 2), 0.0);
        // s0 nested in s3: a = 2, b = 0, c = 1
        assert!(close(beta.total.get(0, 3), 1.0 / 5.0));
        assert_eq!(beta.turnover.get(0, 3), 0.0);
        assert!(close(beta.nestedness.get(3, 0), 1.0 / 5.0));
        assert_eq!(beta.total.get(1, 1), 0.0);
    }

    #[test]
    fn test_phylo_beta_uses_branch_lengths() {
        let m = matrix(&[vec![1.0, 0.0, 0.0, 0.0], vec![0.0, 1.0, 0.0, 0.0]]);
        let enc = encode(&tree(), &m, Weighting::Presence).unwrap();
        let beta = phylo_beta(&enc, BetaFamily::Sorensen);
        // pruned to (A:1,B:1); no shared branch
        assert_eq!(beta.total.get(0, 1), 1.0);

        let m = matrix(&[vec![1.0, 0.0, 0.0, 1.0], vec![0.0, 1.0, 0.0, 1.0]]);
        let enc = encode(&tree(), &m, Weighting::Presence).unwrap();
        let beta = phylo_beta(&enc, BetaFamily::Sorensen);
        // pruned to ((A:1,B:1):2,D:3); shared = 2 + 3, unique = 1 each
        let c = beta.components(0, 1).unwrap();
        assert!(close(c.total, 2.0 / 12.0));
        assert!(close(c.turnover, 1.0 / 6.0));
        assert!(close(c.nestedness, 0.0));
    }

    #[test]
    fn test_empty_pairs_are_nan() {
        let m = matrix(&[
            vec![1.0, 1.0, 0.0, 0.0],
            vec![0.0; 4],
            vec![0.0; 4],
        ]);
        let beta = taxonomic_beta(&m, BetaFamily::Jaccard);
        assert_eq!(beta.degenerate_pairs, 1);
        assert!(beta.total.get(1, 2).is_nan());
        assert!(beta.turnover.get(2, 1).is_nan());
        assert!(beta.total.get(1, 1).is_nan());
        assert_eq!(beta.total.get(0, 1), 1.0);
        assert_eq!(beta.nestedness.get(0, 1), 1.0);
        assert!(matches!(
            beta.pair("s1", "s2"),
            Err(DiversityError::DegenerateCommunity { .. })
        ));
    }

    #[test]
    fn test_zero_length_branches_are_not_empty() {
        let tree = Phylogeny::from_newick("((A:0,B:0):0,C:1);").unwrap();
        let m = CommunityMatrix::from_dense(
            names(&["s0", "s1", "s2", "s3"]),
            names(&["A", "B", "C"]),
            &[
                vec![1.0, 0.0, 0.0],
                vec![0.0, 1.0, 0.0],
                vec![0.0, 0.0, 1.0],
                vec![0.0, 0.0, 0.0],
            ],
        )
        .unwrap();
        let enc = encode(&tree, &m, Weighting::Presence).unwrap();
        let beta = phylo_beta(&enc, BetaFamily::Sorensen);

        assert_eq!(beta.degenerate_pairs, 0);
        // s0 and s1 only differ on zero-length branches
        assert_eq!(beta.pair("s0", "s1").unwrap(), BetaComponents::IDENTICAL);
        assert_eq!(beta.total.get(0, 0), 0.0);
        assert_eq!(beta.total.get(1, 1), 0.0);
        // an occupied community against the empty one is pure loss
        assert_eq!(beta.pair("s0", "s3").unwrap(), BetaComponents::NESTED);
        assert!(beta.total.get(3, 3).is_nan());

        let c = beta.pair("s0", "s2").unwrap();
        assert_eq!(c.total, 1.0);
        assert_eq!(c.turnover + c.nestedness, 1.0);
    }

    #[test]
    fn test_condensed_layout_matches_pairwise_counts() {
        let m = matrix(&[
            vec![1.0, 0.0, 1.0, 0.0],
            vec![0.0, 1.0, 1.0, 1.0],
            vec![0.0; 4],
            vec![1.0, 1.0, 0.0, 0.0],
            vec![0.0, 0.0, 0.0, 1.0],
            vec![1.0, 1.0, 1.0, 1.0],
        ]);
        let presence = m.presence();
        let richness = sparse::row_sums(&presence);
        let rows = sparse::entries(&presence);
        let beta = taxonomic_beta(&m, BetaFamily::Jaccard);

        for (i, j, value) in beta.total.iter_pairs() {
            let shared = rows
                .iter()
                .filter(|&&(r, c, _)| r == i && rows.contains(&(j, c, 1.0)))
                .count() as f64;
            let want = pair_components(
                BetaFamily::Jaccard,
                shared,
                (richness[i] - shared, richness[j] - shared),
                (richness[i] > 0.0, richness[j] > 0.0),
            )
            .unwrap();
            assert!(close(value, want.total), "({i},{j}): {value} != {}", want.total);
            assert!(close(beta.turnover.get(i, j), want.turnover));
        }
    }

    #[test]
    fn test_star_tree_matches_taxonomic() {
        let star = Phylogeny::from_newick("(A:1,B:1,C:1,D:1);").unwrap();
        let m = matrix(&[
            vec![1.0, 1.0, 0.0, 0.0],
            vec![0.0, 1.0, 1.0, 1.0],
            vec![1.0, 0.0, 0.0, 1.0],
        ]);
        let enc = encode(&star, &m, Weighting::Presence).unwrap();
        for family in [BetaFamily::Sorensen, BetaFamily::Jaccard] {
            let phylo = phylo_beta(&enc, family);
            let taxo = taxonomic_beta(&m, family);
            for ((x, y), (p, q)) in phylo
                .total
                .condensed()
                .iter()
                .zip(phylo.turnover.condensed())
                .zip(taxo.total.condensed().iter().zip(taxo.turnover.condensed()))
            {
                assert!(close(*x, *p) && close(*y, *q));
            }
        }
    }
}
