//! Python binding layer for diversity calculations.
//!
//! Every function takes a Newick string, community and species labels and
//! a dense occurrence table (one row per community), and returns plain
//! Python lists.

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::beta::BetaFamily;
use crate::community::CommunityMatrix;
use crate::config::{SessionConfig, Weighting};
use crate::error::DiversityError;
use crate::result::{AlphaDiversity, BetaDiversity};
use crate::session::DiversitySession;
use crate::tree::Phylogeny;

type BetaTables = (Vec<String>, Vec<Vec<f64>>, Vec<Vec<f64>>, Vec<Vec<f64>>);

fn to_py_err(e: DiversityError) -> PyErr {
    PyValueError::new_err(e.to_string())
}

fn parse_family(family: &str) -> PyResult<BetaFamily> {
    match family.to_ascii_lowercase().as_str() {
        "sorensen" => Ok(BetaFamily::Sorensen),
        "jaccard" => Ok(BetaFamily::Jaccard),
        other => Err(PyValueError::new_err(format!(
            "Unknown beta family '{other}', expected 'sorensen' or 'jaccard'"
        ))),
    }
}

/// Helper function to build an encoded session from Python inputs
fn build_session(
    newick: &str,
    communities: Vec<String>,
    species: Vec<String>,
    occurrences: &[Vec<f64>],
    weighting: Weighting,
) -> PyResult<DiversitySession> {
    let tree = Phylogeny::from_newick(newick).map_err(to_py_err)?;
    let matrix =
        CommunityMatrix::from_dense(communities, species, occurrences).map_err(to_py_err)?;
    DiversitySession::new(&tree, matrix, SessionConfig::default().with_weighting(weighting))
        .map_err(to_py_err)
}

fn alpha_pairs(alpha: AlphaDiversity) -> Vec<(String, f64)> {
    alpha.iter().map(|(label, v)| (label.to_string(), v)).collect()
}

fn beta_tables(beta: BetaDiversity) -> BetaTables {
    (
        beta.labels().to_vec(),
        beta.turnover.to_square(),
        beta.nestedness.to_square(),
        beta.total.to_square(),
    )
}

/// Phylogenetic diversity per community.
///
/// Args:
///     newick: Tree in Newick format
///     communities: Community (row) labels
///     species: Species (column) labels, all present in the tree
///     occurrences: One row of non-negative values per community
///
/// Returns:
///     A list of (community, PD) tuples in row order
///
/// Raises:
///     ValueError: If the tree or matrix is invalid or species are missing from the tree
#[pyfunction]
#[pyo3(signature = (newick, communities, species, occurrences))]
fn pd(
    newick: &str,
    communities: Vec<String>,
    species: Vec<String>,
    occurrences: Vec<Vec<f64>>,
) -> PyResult<Vec<(String, f64)>> {
    let session = build_session(newick, communities, species, &occurrences, Weighting::Presence)?;
    Ok(alpha_pairs(session.phylo_diversity()))
}

/// Phylogenetic endemism per community.
///
/// Args:
///     newick, communities, species, occurrences: as for `pd`
///     weighted: Weight branches by relative abundance (default: False)
///
/// Returns:
///     A list of (community, PE) tuples in row order
#[pyfunction]
#[pyo3(signature = (newick, communities, species, occurrences, weighted=false))]
fn pe(
    newick: &str,
    communities: Vec<String>,
    species: Vec<String>,
    occurrences: Vec<Vec<f64>>,
    weighted: bool,
) -> PyResult<Vec<(String, f64)>> {
    let weighting = if weighted {
        Weighting::RelativeAbundance
    } else {
        Weighting::Presence
    };
    let session = build_session(newick, communities, species, &occurrences, weighting)?;
    Ok(alpha_pairs(session.phylo_endemism()))
}

/// Pairwise phylogenetic beta diversity.
///
/// Args:
///     newick, communities, species, occurrences: as for `pd`
///     family: "sorensen" (default) or "jaccard"
///
/// Returns:
///     A tuple of (labels, turnover, nestedness, total) with square matrices.
///     Pairs of empty communities are NaN.
#[pyfunction]
#[pyo3(signature = (newick, communities, species, occurrences, family="sorensen"))]
fn phylo_beta(
    newick: &str,
    communities: Vec<String>,
    species: Vec<String>,
    occurrences: Vec<Vec<f64>>,
    family: &str,
) -> PyResult<BetaTables> {
    let family = parse_family(family)?;
    let session = build_session(newick, communities, species, &occurrences, Weighting::Presence)?;
    Ok(beta_tables(session.phylo_beta(family)))
}

/// Pairwise taxonomic beta diversity (no tree required).
///
/// Returns:
///     A tuple of (labels, turnover, nestedness, total) with square matrices.
#[pyfunction]
#[pyo3(signature = (communities, species, occurrences, family="sorensen"))]
fn beta_diss(
    communities: Vec<String>,
    species: Vec<String>,
    occurrences: Vec<Vec<f64>>,
    family: &str,
) -> PyResult<BetaTables> {
    let family = parse_family(family)?;
    let matrix =
        CommunityMatrix::from_dense(communities, species, &occurrences).map_err(to_py_err)?;
    Ok(beta_tables(crate::beta::taxonomic_beta(&matrix, family)))
}

/// Python module definition
#[pymodule]
fn phylo_diversity(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(pd, m)?)?;
    m.add_function(wrap_pyfunction!(pe, m)?)?;
    m.add_function(wrap_pyfunction!(phylo_beta, m)?)?;
    m.add_function(wrap_pyfunction!(beta_diss, m)?)?;
    Ok(())
}
