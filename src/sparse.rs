//! Sparse linear-algebra kernel shared by every metric.
//!
//! # Overview
//! All metrics reduce to three operations on a non-negative sparse matrix
//! `M` (rows = features such as branches or species, columns =
//! communities) and a feature weight vector `w`:
//!
//! 1. **Column dot**: `wᵗ · M`, one value per community. With branch
//!    lengths as `w` and the branch incidence as `M` this is PD for every
//!    community in a single pass over the non-zeros.
//! 2. **Row sums**: number (or summed weight) of communities per feature,
//!    i.e. branch or species ranges.
//! 3. **Weighted Gram, upper triangle**: `Mᵗ · diag(w) · M` restricted to
//!    `i < j`. Entry `(i, j)` is the weight shared by communities `i` and
//!    `j`. Only pairs sharing at least one feature produce an entry.
//!
//! Column- and row-partitioned work runs on rayon; each worker writes its
//! own output slot.

use rayon::prelude::*;
use sprs::{CsMat, TriMat};
use std::borrow::Cow;

/// All stored entries as `(row, col, value)`, in storage order.
pub fn entries(mat: &CsMat<f64>) -> Vec<(usize, usize, f64)> {
    let csr = mat.is_csr();
    let mut out = Vec::with_capacity(mat.nnz());
    for (outer, vec) in mat.outer_iterator().enumerate() {
        for (&inner, &value) in vec.indices().iter().zip(vec.data().iter()) {
            if csr {
                out.push((outer, inner, value));
            } else {
                out.push((inner, outer, value));
            }
        }
    }
    out
}

/// Borrow `mat` as CSR, converting only when needed.
pub fn as_csr(mat: &CsMat<f64>) -> Cow<'_, CsMat<f64>> {
    if mat.is_csr() {
        Cow::Borrowed(mat)
    } else {
        Cow::Owned(mat.to_csr())
    }
}

/// Borrow `mat` as CSC, converting only when needed.
pub fn as_csc(mat: &CsMat<f64>) -> Cow<'_, CsMat<f64>> {
    if mat.is_csc() {
        Cow::Borrowed(mat)
    } else {
        Cow::Owned(mat.to_csc())
    }
}

/// Transposed copy in CSR format.
pub fn transpose(mat: &CsMat<f64>) -> CsMat<f64> {
    let (rows, cols) = mat.shape();
    let mut tri = TriMat::new((cols, rows));
    for (row, col, value) in entries(mat) {
        tri.add_triplet(col, row, value);
    }
    tri.to_csr()
}

/// 0/1 matrix marking the positive entries of `mat`, same storage order.
pub fn binary_pattern(mat: &CsMat<f64>) -> CsMat<f64> {
    let mut tri = TriMat::new(mat.shape());
    for (row, col, value) in entries(mat) {
        if value > 0.0 {
            tri.add_triplet(row, col, 1.0);
        }
    }
    if mat.is_csr() { tri.to_csr() } else { tri.to_csc() }
}

/// Sum of each row.
pub fn row_sums(mat: &CsMat<f64>) -> Vec<f64> {
    outer_dot(&as_csr(mat), None)
}

/// Sum of each column.
pub fn column_sums(mat: &CsMat<f64>) -> Vec<f64> {
    outer_dot(&as_csc(mat), None)
}

/// `weightsᵗ · M`: for every column `c`, `Σ_r M[r, c] · weights[r]`.
///
/// # Panics
/// Panics if `weights.len()` differs from the number of rows.
pub fn column_dot(mat: &CsMat<f64>, weights: &[f64]) -> Vec<f64> {
    assert_eq!(weights.len(), mat.rows(), "one weight per row required");
    outer_dot(&as_csc(mat), Some(weights))
}

/// `M · weights`: for every row `r`, `Σ_c M[r, c] · weights[c]`.
///
/// # Panics
/// Panics if `weights.len()` differs from the number of columns.
pub fn row_dot(mat: &CsMat<f64>, weights: &[f64]) -> Vec<f64> {
    assert_eq!(weights.len(), mat.cols(), "one weight per column required");
    outer_dot(&as_csr(mat), Some(weights))
}

/// Dot product of every outer vector with `weights` (or plain sums).
fn outer_dot(mat: &CsMat<f64>, weights: Option<&[f64]>) -> Vec<f64> {
    (0..mat.outer_dims())
        .into_par_iter()
        .map(|outer| {
            let Some(vec) = mat.outer_view(outer) else {
                return 0.0;
            };
            let pairs = vec.indices().iter().zip(vec.data().iter());
            match weights {
                Some(w) => pairs.map(|(&inner, &value)| value * w[inner]).sum(),
                None => pairs.map(|(_, &value)| value).sum(),
            }
        })
        .collect()
}

/// Strict upper triangle of `Mᵗ · diag(weights) · M` as an N × N CSR
/// matrix, where N is the number of columns of `mat`.
///
/// # Algorithm
/// For community `i`, walk the features it occupies (column `i` of `M`)
/// and, for each feature `f`, every community `j > i` occupying `f`
/// (row `f` of `M`), accumulating `M[f, i] · weights[f] · M[f, j]`.
/// Work per community is proportional to the non-zeros it touches, and
/// each rayon worker reuses one dense accumulator of length N.
///
/// # Example
/// ```text
///          s0  s1  s2        weights
///    f0 [  1   1   .  ]        2.0
///    f1 [  1   .   1  ]        0.5
///    f2 [  .   1   1  ]        1.0
///
///    upper Gram: (0,1) = 2.0, (0,2) = 0.5, (1,2) = 1.0
/// ```
///
/// # Panics
/// Panics if `weights.len()` differs from the number of rows.
pub fn weighted_gram_upper(mat: &CsMat<f64>, weights: &[f64]) -> CsMat<f64> {
    weighted_gram_upper_views(&as_csr(mat), &as_csc(mat), weights)
}

/// [`weighted_gram_upper`] for a matrix already held in both storage
/// orders, so neither copy is rebuilt.
///
/// # Panics
/// Panics if `by_feature` is not CSR, `by_community` is not CSC, their
/// shapes differ, or `weights.len()` differs from the number of rows.
pub fn weighted_gram_upper_views(
    by_feature: &CsMat<f64>,
    by_community: &CsMat<f64>,
    weights: &[f64],
) -> CsMat<f64> {
    assert!(
        by_feature.is_csr() && by_community.is_csc(),
        "expected a CSR and a CSC view"
    );
    assert_eq!(by_feature.shape(), by_community.shape(), "views of different matrices");
    assert_eq!(weights.len(), by_feature.rows(), "one weight per row required");
    let n = by_feature.cols();

    let rows: Vec<Vec<(usize, f64)>> = (0..n)
        .into_par_iter()
        .map_init(
            || (vec![0.0f64; n], vec![false; n], Vec::new()),
            |(acc, seen, touched), i| {
                let Some(column) = by_community.outer_view(i) else {
                    return Vec::new();
                };
                for (&feature, &w_i) in column.indices().iter().zip(column.data().iter()) {
                    let scale = weights[feature] * w_i;
                    let Some(row) = by_feature.outer_view(feature) else {
                        continue;
                    };
                    for (&j, &w_j) in row.indices().iter().zip(row.data().iter()) {
                        if j <= i {
                            continue;
                        }
                        if !seen[j] {
                            seen[j] = true;
                            touched.push(j);
                        }
                        acc[j] += scale * w_j;
                    }
                }

                touched.sort_unstable();
                let out = touched
                    .iter()
                    .map(|&j| (j, acc[j]))
                    .filter(|&(_, v)| v != 0.0)
                    .collect();
                for &j in touched.iter() {
                    acc[j] = 0.0;
                    seen[j] = false;
                }
                touched.clear();
                out
            },
        )
        .collect();

    let mut tri = TriMat::new((n, n));
    for (i, row) in rows.into_iter().enumerate() {
        for (j, value) in row {
            tri.add_triplet(i, j, value);
        }
    }
    tri.to_csr()
}
