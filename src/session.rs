//! Caller-owned calculation session.
//!
//! Encoding is the most expensive step and every metric reads the same
//! encoder output, so a [`DiversitySession`] encodes once and answers any
//! number of metric queries. Dropping the session releases everything; there
//! is no global cache.

use crate::alpha;
use crate::beta::{self, BetaFamily};
use crate::community::CommunityMatrix;
use crate::config::SessionConfig;
use crate::encoder::{self, EncodedCommunities};
use crate::error::Result;
use crate::result::{AlphaDiversity, BetaDiversity};
use crate::tree::Phylogeny;
use phylotree::tree::Tree as PhyloTree;

/// A community matrix encoded against a tree, ready for metric queries.
///
/// # Example
/// ```
/// # use phylo_diversity::{CommunityMatrix, DiversitySession, Phylogeny, SessionConfig};
/// # use phylo_diversity::beta::BetaFamily;
/// let tree = Phylogeny::from_newick("((A:1,B:1):1,C:1);").unwrap();
/// let matrix = CommunityMatrix::from_presence(
///     vec!["s1".into(), "s2".into()],
///     vec!["A".into(), "B".into(), "C".into()],
///     &[("s1", "A"), ("s1", "B"), ("s2", "C")],
/// ).unwrap();
///
/// let session = DiversitySession::new(&tree, matrix, SessionConfig::default()).unwrap();
/// assert_eq!(session.phylo_diversity().values(), &[3.0, 1.0]);
/// assert_eq!(session.phylo_beta(BetaFamily::Sorensen).total.get(0, 1), 1.0);
/// ```
#[derive(Debug, Clone)]
pub struct DiversitySession {
    matrix: CommunityMatrix,
    encoded: EncodedCommunities,
    config: SessionConfig,
}

impl DiversitySession {
    /// Validate and encode `matrix` against `tree`.
    ///
    /// # Errors
    /// Every input problem is reported here, before any metric is computed;
    /// see [`encoder::encode`].
    pub fn new(tree: &Phylogeny, matrix: CommunityMatrix, config: SessionConfig) -> Result<Self> {
        let encoded = encoder::encode(tree, &matrix, config.weighting)?;
        Ok(Self {
            matrix,
            encoded,
            config,
        })
    }

    /// Same as [`DiversitySession::new`] for a tree parsed by `phylotree`.
    pub fn from_phylotree(
        tree: &PhyloTree,
        matrix: CommunityMatrix,
        config: SessionConfig,
    ) -> Result<Self> {
        Self::new(&Phylogeny::from_phylotree(tree)?, matrix, config)
    }

    pub fn matrix(&self) -> &CommunityMatrix {
        &self.matrix
    }

    pub fn encoded(&self) -> &EncodedCommunities {
        &self.encoded
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn phylo_diversity(&self) -> AlphaDiversity {
        alpha::phylo_diversity(&self.encoded)
    }

    pub fn phylo_endemism(&self) -> AlphaDiversity {
        alpha::phylo_endemism(&self.encoded)
    }

    pub fn weighted_endemism(&self) -> AlphaDiversity {
        alpha::weighted_endemism(&self.matrix)
    }

    pub fn species_richness(&self) -> AlphaDiversity {
        alpha::species_richness(&self.matrix)
    }

    pub fn phylo_beta(&self, family: BetaFamily) -> BetaDiversity {
        beta::phylo_beta(&self.encoded, family)
    }

    pub fn taxonomic_beta(&self, family: BetaFamily) -> BetaDiversity {
        beta::taxonomic_beta(&self.matrix, family)
    }
}
