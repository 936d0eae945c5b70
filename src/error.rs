//! Error types for diversity calculations.

use phylotree::tree::TreeError;
use thiserror::Error;

/// Everything that can go wrong while encoding a tree and a community
/// matrix, or while evaluating a single community pair.
///
/// Input-shape errors are raised before any numeric work starts, so a
/// rejected input never yields partial results.
#[derive(Error, Debug)]
pub enum DiversityError {
    /// Species in the community matrix without a matching tree leaf.
    #[error("{} species have no matching tree leaf: {}", missing.len(), preview(missing))]
    InputMismatch { missing: Vec<String> },

    #[error("tree has {leaves} leaves after pruning, at least 2 are required")]
    EmptyTree { leaves: usize },

    #[error("community matrix has no communities")]
    EmptyCommunity,

    /// Both communities of a pair are empty, so no dissimilarity is defined.
    #[error("communities '{first}' and '{second}' are both empty")]
    DegenerateCommunity { first: String, second: String },

    #[error("invalid tree: {0}")]
    InvalidTree(String),

    #[error("invalid community matrix: {0}")]
    InvalidMatrix(String),

    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, DiversityError>;

fn preview(labels: &[String]) -> String {
    const SHOWN: usize = 5;
    let mut out = labels.iter().take(SHOWN).cloned().collect::<Vec<_>>().join(", ");
    if labels.len() > SHOWN {
        out.push_str(", ...");
    }
    out
}
