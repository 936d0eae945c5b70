//! Session configuration.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How occurrence values become branch incidence weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "snake_case"))]
pub enum Weighting {
    /// Any positive entry counts as one occurrence.
    #[default]
    Presence,
    /// A branch carries the share of the community's total abundance held
    /// by the species below it. Only phylogenetic endemism uses these
    /// weights; PD and beta diversity stay presence/absence.
    RelativeAbundance,
}

/// Options for building a [`crate::DiversitySession`].
///
/// # Example
/// ```
/// # use phylo_diversity::{SessionConfig, Weighting};
/// let config = SessionConfig::default().with_weighting(Weighting::RelativeAbundance);
/// assert_eq!(config.weighting, Weighting::RelativeAbundance);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct SessionConfig {
    pub weighting: Weighting,
}

impl SessionConfig {
    pub fn with_weighting(mut self, weighting: Weighting) -> Self {
        self.weighting = weighting;
        self
    }
}
