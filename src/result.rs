//! Labeled result containers handed back to callers.
//!
//! Alpha metrics come back as an [`AlphaDiversity`] (one value per
//! community, input row order). Beta metrics come back as a
//! [`BetaDiversity`] holding three symmetric [`PairwiseMatrix`]
//! components. Pairwise matrices store only the strict upper triangle
//! (condensed form):
//!
//! ```text
//!        s0   s1   s2   s3
//!   s0   .    0    1    2
//!   s1        .    3    4        condensed = [d01, d02, d03, d12, d13, d23]
//!   s2             .    5
//! ```

use crate::beta::{BetaComponents, BetaFamily};
use crate::error::{DiversityError, Result};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Which per-community metric a vector holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "snake_case"))]
pub enum AlphaMetric {
    PhyloDiversity,
    PhyloEndemism,
    WeightedEndemism,
    SpeciesRichness,
}

impl AlphaMetric {
    pub fn name(&self) -> &'static str {
        match self {
            AlphaMetric::PhyloDiversity => "PD",
            AlphaMetric::PhyloEndemism => "PE",
            AlphaMetric::WeightedEndemism => "WE",
            AlphaMetric::SpeciesRichness => "SR",
        }
    }
}

/// One value per community, in the row order of the occurrence matrix.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AlphaDiversity {
    metric: AlphaMetric,
    labels: Vec<String>,
    values: Vec<f64>,
}

impl AlphaDiversity {
    /// # Panics
    /// Panics if `labels` and `values` differ in length.
    pub fn new(metric: AlphaMetric, labels: Vec<String>, values: Vec<f64>) -> Self {
        assert_eq!(labels.len(), values.len(), "one value per label required");
        Self {
            metric,
            labels,
            values,
        }
    }

    pub fn metric(&self) -> AlphaMetric {
        self.metric
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value for a community label, `None` if the label is unknown.
    pub fn get(&self, label: &str) -> Option<f64> {
        self.labels
            .iter()
            .position(|l| l == label)
            .map(|i| self.values[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.labels
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }
}

/// A symmetric community × community matrix in condensed form.
///
/// The diagonal is 0, except for communities without occurrences whose
/// self-comparison is undefined (NaN).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PairwiseMatrix {
    labels: Vec<String>,
    condensed: Vec<f64>,
    diagonal: Vec<f64>,
}

impl PairwiseMatrix {
    /// # Panics
    /// Panics if `condensed` does not hold `n(n-1)/2` values or `diagonal`
    /// does not hold `n` values, with `n = labels.len()`.
    pub fn new(labels: Vec<String>, condensed: Vec<f64>, diagonal: Vec<f64>) -> Self {
        let n = labels.len();
        assert_eq!(condensed.len(), n * n.saturating_sub(1) / 2);
        assert_eq!(diagonal.len(), n);
        Self {
            labels,
            condensed,
            diagonal,
        }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Number of communities.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Upper-triangle values, row by row.
    pub fn condensed(&self) -> &[f64] {
        &self.condensed
    }

    /// Value at `(i, j)`; symmetric.
    ///
    /// # Panics
    /// Panics if `i` or `j` is out of range.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        let n = self.len();
        assert!(i < n && j < n, "index ({i}, {j}) out of range for {n} communities");
        match i.cmp(&j) {
            std::cmp::Ordering::Equal => self.diagonal[i],
            std::cmp::Ordering::Less => self.condensed[condensed_index(n, i, j)],
            std::cmp::Ordering::Greater => self.condensed[condensed_index(n, j, i)],
        }
    }

    pub fn get_by_label(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.position(a)?;
        let j = self.position(b)?;
        Some(self.get(i, j))
    }

    pub fn position(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    /// `(i, j, value)` for every `i < j`, in condensed order.
    pub fn iter_pairs(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        let n = self.len();
        (0..n)
            .flat_map(move |i| (i + 1..n).map(move |j| (i, j)))
            .zip(self.condensed.iter().copied())
            .map(|((i, j), value)| (i, j, value))
    }

    /// Expand into a full square matrix.
    pub fn to_square(&self) -> Vec<Vec<f64>> {
        let n = self.len();
        let mut mat = vec![vec![0.0; n]; n];
        for (i, row) in mat.iter_mut().enumerate() {
            row[i] = self.diagonal[i];
        }
        for (i, j, value) in self.iter_pairs() {
            mat[i][j] = value;
            mat[j][i] = value;
        }
        mat
    }
}

/// Position of `(i, j)`, `i < j`, in the condensed upper triangle.
fn condensed_index(n: usize, i: usize, j: usize) -> usize {
    i * n - i * (i + 1) / 2 + (j - i - 1)
}

/// Whether pairs were compared by species or by branches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "snake_case"))]
pub enum BetaKind {
    Taxonomic,
    Phylogenetic,
}

/// Pairwise dissimilarity split into turnover and nestedness.
///
/// For every pair `turnover + nestedness == total`. Pairs of two empty
/// communities are NaN in all three components and counted in
/// `degenerate_pairs`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BetaDiversity {
    pub kind: BetaKind,
    pub family: BetaFamily,
    pub turnover: PairwiseMatrix,
    pub nestedness: PairwiseMatrix,
    pub total: PairwiseMatrix,
    pub degenerate_pairs: usize,
}

impl BetaDiversity {
    pub fn labels(&self) -> &[String] {
        self.total.labels()
    }

    /// The three components of pair `(i, j)`, `None` when undefined.
    pub fn components(&self, i: usize, j: usize) -> Option<BetaComponents> {
        let total = self.total.get(i, j);
        if total.is_nan() {
            return None;
        }
        Some(BetaComponents {
            turnover: self.turnover.get(i, j),
            nestedness: self.nestedness.get(i, j),
            total,
        })
    }

    /// The three components for a pair of community labels.
    ///
    /// # Errors
    /// [`DiversityError::InvalidMatrix`] for an unknown label and
    /// [`DiversityError::DegenerateCommunity`] when both communities are
    /// empty.
    pub fn pair(&self, a: &str, b: &str) -> Result<BetaComponents> {
        let unknown = |label: &str| DiversityError::InvalidMatrix(format!("unknown community '{label}'"));
        let i = self.total.position(a).ok_or_else(|| unknown(a))?;
        let j = self.total.position(b).ok_or_else(|| unknown(b))?;
        self.components(i, j)
            .ok_or_else(|| DiversityError::DegenerateCommunity {
                first: a.to_string(),
                second: b.to_string(),
            })
    }
}
