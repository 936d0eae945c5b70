use std::sync::Mutex;

use log::{Level, LevelFilter, Log, Metadata, Record};

use phylo_diversity::{BetaFamily, CommunityMatrix, DiversitySession, Phylogeny, SessionConfig};

/// Keeps every record so tests can inspect what the crate logged.
struct CaptureLogger {
    records: Mutex<Vec<(Level, String)>>,
}

impl Log for CaptureLogger {
    fn enabled(&self, _: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if let Ok(mut records) = self.records.lock() {
            records.push((record.level(), record.args().to_string()));
        }
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger {
    records: Mutex::new(Vec::new()),
};

fn install() -> &'static CaptureLogger {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(LevelFilter::Trace);
    }
    &LOGGER
}

fn warnings_mentioning(logger: &CaptureLogger, needle: &str) -> usize {
    logger
        .records
        .lock()
        .unwrap()
        .iter()
        .filter(|(level, message)| *level == Level::Warn && message.contains(needle))
        .count()
}

fn session(rows: &[Vec<f64>]) -> DiversitySession {
    let tree = Phylogeny::from_newick("((A:1,B:1):1,(C:1,D:2):0.5);").unwrap();
    let communities = (0..rows.len()).map(|i| format!("site{i}")).collect();
    let species = ["A", "B", "C", "D"].iter().map(|s| s.to_string()).collect();
    let matrix = CommunityMatrix::from_dense(communities, species, rows).unwrap();
    DiversitySession::new(&tree, matrix, SessionConfig::default()).unwrap()
}

#[test]
fn empty_pairs_raise_one_warning_per_batch() {
    let logger = install();
    // four empty sites out of five: 6 degenerate pairs among 10
    let session = session(&[
        vec![1.0, 0.0, 1.0, 1.0],
        vec![0.0; 4],
        vec![0.0; 4],
        vec![0.0; 4],
        vec![0.0; 4],
    ]);

    let beta = session.phylo_beta(BetaFamily::Sorensen);
    assert_eq!(beta.degenerate_pairs, 6);
    assert_eq!(warnings_mentioning(logger, "6 of 10 community pairs"), 1);

    session.taxonomic_beta(BetaFamily::Jaccard);
    assert_eq!(warnings_mentioning(logger, "6 of 10 community pairs"), 2);
}

#[test]
fn occupied_communities_log_no_warning() {
    let logger = install();
    // every site occupied; 7 sites give 21 pairs
    let rows: Vec<Vec<f64>> = (0..7)
        .map(|i| (0..4).map(|c| if (i + c) % 3 == 0 { 1.0 } else { 0.0 }).collect())
        .collect();
    let session = session(&rows);

    let beta = session.phylo_beta(BetaFamily::Sorensen);
    assert_eq!(beta.degenerate_pairs, 0);
    assert_eq!(warnings_mentioning(logger, "of 21 community pairs"), 0);
}
