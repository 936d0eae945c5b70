use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use flate2::Compression;
use flate2::write::GzEncoder;
use itertools::Itertools;

use crate::result::{AlphaDiversity, BetaDiversity, PairwiseMatrix};

/// Open `path` for writing: `-` is stdout, a `.gz` suffix gzip-compresses.
fn create_writer(path: &Path) -> io::Result<Box<dyn Write>> {
    if path.as_os_str() == "-" {
        return Ok(Box::new(BufWriter::new(io::stdout().lock())));
    }

    let file = File::create(path)?;
    if path.to_string_lossy().ends_with(".gz") {
        let enc = GzEncoder::new(file, Compression::default());
        Ok(Box::new(BufWriter::new(enc)))
    } else {
        Ok(Box::new(BufWriter::new(file)))
    }
}

/// Write a labeled square matrix as TSV to a file or stdout.
/// If `path` ends with `.gz`, the output is gzip-compressed.
/// If `path` equals `-`, the matrix is written to stdout (uncompressed).
pub fn write_matrix_tsv<P: AsRef<Path>>(path: P, matrix: &PairwiseMatrix) -> io::Result<()> {
    let mut out = create_writer(path.as_ref())?;

    writeln!(out, "\t{}", matrix.labels().iter().join("\t"))?;
    for (label, row) in matrix.labels().iter().zip(matrix.to_square()) {
        writeln!(out, "{label}\t{}", row.iter().join("\t"))?;
    }

    out.flush()
}

/// Write one `community<TAB>value` line per community under a header
/// naming the metric.
pub fn write_alpha_tsv<P: AsRef<Path>>(path: P, alpha: &AlphaDiversity) -> io::Result<()> {
    let mut out = create_writer(path.as_ref())?;

    writeln!(out, "community\t{}", alpha.metric().name())?;
    for (label, value) in alpha.iter() {
        writeln!(out, "{label}\t{value}")?;
    }

    out.flush()
}

/// Write all three beta components in long format, one line per
/// community pair.
pub fn write_beta_tsv<P: AsRef<Path>>(path: P, beta: &BetaDiversity) -> io::Result<()> {
    let mut out = create_writer(path.as_ref())?;
    let labels = beta.labels();

    writeln!(out, "community_1\tcommunity_2\tturnover\tnestedness\ttotal")?;
    let components = beta
        .turnover
        .iter_pairs()
        .zip(beta.nestedness.condensed())
        .zip(beta.total.condensed());
    for (((i, j, turnover), nestedness), total) in components {
        writeln!(
            out,
            "{}\t{}\t{turnover}\t{nestedness}\t{total}",
            labels[i], labels[j]
        )?;
    }

    out.flush()
}
