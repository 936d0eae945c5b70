//! Crate root: lightweight module orchestration and public re-exports.
//!
//! Modules:
//! - `tree`: rooted phylogeny as an index arena, with pruning.
//! - `community`: sparse site-by-species occurrence matrix.
//! - `bitset`: compact bitset for community occupancy.
//! - `sparse`: sparse kernel (column dots, row sums, weighted Gram).
//! - `encoder`: tree + matrix → branch incidence and branch lengths.
//! - `alpha`: PD, PE, weighted endemism, richness.
//! - `beta`: Sorensen / Jaccard turnover–nestedness decomposition.
//! - `result`: labeled vectors and condensed pairwise matrices.
//! - `session`: caller-owned cache of the encoder output.
//! - `io`: TSV export of results.
//! - `api`: Python bindings via `pyo3` (gated behind "python" feature).

pub mod alpha;
pub mod beta;
pub mod bitset;
pub mod community;
pub mod config;
pub mod encoder;
pub mod error;
pub mod io;
pub mod result;
pub mod session;
pub mod sparse;
pub mod tree;

#[cfg(feature = "python")]
pub mod api;

// Re-export frequently used types & functions
pub use beta::{BetaComponents, BetaFamily};
pub use community::CommunityMatrix;
pub use config::{SessionConfig, Weighting};
pub use encoder::{EncodedCommunities, encode};
pub use error::{DiversityError, Result};
pub use io::{write_alpha_tsv, write_beta_tsv, write_matrix_tsv};
pub use result::{AlphaDiversity, AlphaMetric, BetaDiversity, BetaKind, PairwiseMatrix};
pub use session::DiversitySession;
pub use tree::{NodeIndex, Phylogeny};
