//! Sparse site-by-species occurrence matrix.

use crate::error::{DiversityError, Result};
use crate::sparse;
use sprs::{CsMat, TriMat};
use std::collections::{HashMap, HashSet};

/// A sparse occurrence matrix of species across communities.
///
/// Rows represent communities (sites), columns represent species (tree tip
/// labels). Entries are presences (1.0) or non-negative abundances; a zero
/// entry, explicit or not, is an absence. Stored in CSR format so each
/// community's species list is a contiguous slice.
#[derive(Debug, Clone)]
pub struct CommunityMatrix {
    /// Sparse matrix in CSR format (communities × species)
    data: CsMat<f64>,
    communities: Vec<String>,
    species: Vec<String>,
}

impl CommunityMatrix {
    /// Wrap a sparse matrix together with its row and column labels.
    ///
    /// CSC input is converted to CSR.
    ///
    /// # Errors
    /// [`DiversityError::InvalidMatrix`] on shape/label mismatches,
    /// duplicated labels or negative / non-finite entries.
    pub fn new(data: CsMat<f64>, communities: Vec<String>, species: Vec<String>) -> Result<Self> {
        let (nrows, ncols) = data.shape();
        if nrows != communities.len() || ncols != species.len() {
            return Err(DiversityError::InvalidMatrix(format!(
                "matrix is {nrows} x {ncols} but {} community and {} species labels were given",
                communities.len(),
                species.len()
            )));
        }
        check_unique("community", &communities)?;
        check_unique("species", &species)?;

        let data = if data.is_csr() { data } else { data.to_csr() };
        if let Some((row, col, value)) = sparse::entries(&data)
            .into_iter()
            .find(|&(_, _, v)| !v.is_finite() || v < 0.0)
        {
            return Err(DiversityError::InvalidMatrix(format!(
                "invalid occurrence value {value} for '{}' in '{}'",
                species[col], communities[row]
            )));
        }

        Ok(Self {
            data,
            communities,
            species,
        })
    }

    /// Build from `(community, species, value)` index triplets.
    /// Duplicate triplets are summed.
    pub fn from_triplets(
        communities: Vec<String>,
        species: Vec<String>,
        triplets: &[(usize, usize, f64)],
    ) -> Result<Self> {
        let shape = (communities.len(), species.len());
        let mut tri = TriMat::new(shape);
        for &(row, col, value) in triplets {
            if row >= shape.0 || col >= shape.1 {
                return Err(DiversityError::InvalidMatrix(format!(
                    "triplet ({row}, {col}) outside {} x {} matrix",
                    shape.0, shape.1
                )));
            }
            tri.add_triplet(row, col, value);
        }
        Self::new(tri.to_csr(), communities, species)
    }

    /// Build a presence/absence matrix from `(community, species)` label
    /// records. Repeated records count once.
    ///
    /// # Example
    /// ```
    /// # use phylo_diversity::CommunityMatrix;
    /// let m = CommunityMatrix::from_presence(
    ///     vec!["s1".into(), "s2".into()],
    ///     vec!["A".into(), "B".into(), "C".into()],
    ///     &[("s1", "A"), ("s1", "B"), ("s2", "C"), ("s1", "A")],
    /// ).unwrap();
    /// assert_eq!(m.nnz(), 3);
    /// ```
    pub fn from_presence<S: AsRef<str>>(
        communities: Vec<String>,
        species: Vec<String>,
        records: &[(S, S)],
    ) -> Result<Self> {
        let row_of = index_of(&communities);
        let col_of = index_of(&species);

        let mut seen = HashSet::new();
        let mut triplets = Vec::with_capacity(records.len());
        for (community, taxon) in records {
            let (community, taxon) = (community.as_ref(), taxon.as_ref());
            let row = *row_of.get(community).ok_or_else(|| {
                DiversityError::InvalidMatrix(format!("unknown community '{community}'"))
            })?;
            let col = *col_of.get(taxon).ok_or_else(|| {
                DiversityError::InvalidMatrix(format!("unknown species '{taxon}'"))
            })?;
            if seen.insert((row, col)) {
                triplets.push((row, col, 1.0));
            }
        }
        Self::from_triplets(communities, species, &triplets)
    }

    /// Build from dense rows (one `Vec` per community); zeros are dropped.
    pub fn from_dense(
        communities: Vec<String>,
        species: Vec<String>,
        rows: &[Vec<f64>],
    ) -> Result<Self> {
        if rows.len() != communities.len() {
            return Err(DiversityError::InvalidMatrix(format!(
                "{} rows for {} communities",
                rows.len(),
                communities.len()
            )));
        }
        let mut triplets = Vec::new();
        for (row, values) in rows.iter().enumerate() {
            if values.len() != species.len() {
                return Err(DiversityError::InvalidMatrix(format!(
                    "row '{}' has {} values for {} species",
                    communities[row],
                    values.len(),
                    species.len()
                )));
            }
            triplets.extend(
                values
                    .iter()
                    .enumerate()
                    .filter(|&(_, v)| *v != 0.0)
                    .map(|(col, &v)| (row, col, v)),
            );
        }
        Self::from_triplets(communities, species, &triplets)
    }

    pub fn data(&self) -> &CsMat<f64> {
        &self.data
    }

    pub fn communities(&self) -> &[String] {
        &self.communities
    }

    pub fn species(&self) -> &[String] {
        &self.species
    }

    pub fn n_communities(&self) -> usize {
        self.communities.len()
    }

    pub fn n_species(&self) -> usize {
        self.species.len()
    }

    /// Number of stored entries (explicit zeros included).
    pub fn nnz(&self) -> usize {
        self.data.nnz()
    }

    /// 0/1 copy of the matrix marking every positive entry.
    pub fn presence(&self) -> CsMat<f64> {
        sparse::binary_pattern(&self.data)
    }

    /// Total abundance per community.
    pub fn row_totals(&self) -> Vec<f64> {
        sparse::row_sums(&self.data)
    }

    /// Labels of species present in at least one community.
    pub fn occurring_species(&self) -> HashSet<&str> {
        sparse::entries(&self.data)
            .into_iter()
            .filter(|&(_, _, v)| v > 0.0)
            .map(|(_, col, _)| self.species[col].as_str())
            .collect()
    }

    /// Whether community `row` has no positive entry.
    pub fn is_empty_community(&self, row: usize) -> bool {
        self.data
            .outer_view(row)
            .is_none_or(|r| r.data().iter().all(|&v| v <= 0.0))
    }
}

fn check_unique(kind: &str, labels: &[String]) -> Result<()> {
    let mut seen = HashSet::with_capacity(labels.len());
    match labels.iter().find(|label| !seen.insert(label.as_str())) {
        Some(label) => Err(DiversityError::InvalidMatrix(format!(
            "duplicate {kind} label '{label}'"
        ))),
        None => Ok(()),
    }
}

fn index_of(labels: &[String]) -> HashMap<&str, usize> {
    labels
        .iter()
        .enumerate()
        .map(|(i, label)| (label.as_str(), i))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(prefix: &str, n: usize) -> Vec<String> {
        (0..n).map(|i| format!("{prefix}{i}")).collect()
    }

    #[test]
    fn test_from_dense_drops_zeros() {
        let m = CommunityMatrix::from_dense(
            names("s", 2),
            names("sp", 3),
            &[vec![1.0, 0.0, 2.0], vec![0.0, 0.0, 0.0]],
        )
        .unwrap();
        assert_eq!(m.nnz(), 2);
        assert_eq!(m.row_totals(), vec![3.0, 0.0]);
        assert!(!m.is_empty_community(0));
        assert!(m.is_empty_community(1));
    }

    #[test]
    fn test_presence_pattern() {
        let m = CommunityMatrix::from_triplets(
            names("s", 2),
            names("sp", 2),
            &[(0, 0, 5.0), (1, 1, 0.5), (1, 0, 0.0)],
        )
        .unwrap();
        let p = m.presence();
        assert_eq!(sparse::row_sums(&p), vec![1.0, 1.0]);
        let occurring = m.occurring_species();
        assert_eq!(occurring.len(), 2);
    }

    #[test]
    fn test_rejects_negative_values() {
        let err = CommunityMatrix::from_triplets(names("s", 1), names("sp", 1), &[(0, 0, -1.0)])
            .unwrap_err();
        assert!(matches!(err, DiversityError::InvalidMatrix(_)));
    }

    #[test]
    fn test_rejects_duplicate_labels() {
        let err = CommunityMatrix::from_dense(
            vec!["s".into(), "s".into()],
            names("sp", 1),
            &[vec![1.0], vec![1.0]],
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate community"));
    }

    #[test]
    fn test_from_presence_unknown_species() {
        let err = CommunityMatrix::from_presence(names("s", 1), names("sp", 1), &[("s0", "sp9")])
            .unwrap_err();
        assert!(err.to_string().contains("sp9"));
    }

    #[test]
    fn test_csc_input_is_converted() {
        let mut tri = TriMat::new((2, 2));
        tri.add_triplet(0, 1, 1.0);
        tri.add_triplet(1, 0, 1.0);
        let m = CommunityMatrix::new(tri.to_csc(), names("s", 2), names("sp", 2)).unwrap();
        assert!(m.data().is_csr());
        assert_eq!(sparse::entries(m.data()), vec![(0, 1, 1.0), (1, 0, 1.0)]);
    }
}
