pub mod caller;
pub mod dispatch;
pub mod em;
pub mod glf;
pub mod result;
pub mod sites;
pub mod stats;

use std::sync::atomic::AtomicBool;

use anyhow::{Context, Result};
use itertools::Itertools;
use log::{info, warn};

use ngsld_io::{
    read::{read_glf, read_positions, PositionArray},
    write::GenericWriter,
};

use caller::Dosages;
use dispatch::{DispatchOpts, PairwiseDispatcher};
use glf::{GlfEncoding, GlfStore};
use result::{LabelledResult, PairResult, PairStatus};

/// End-of-run accounting, also handed back to callers for inspection.
#[derive(Debug, Default, Clone, Copy)]
pub struct RunSummary {
    pub n_pairs: usize,
    pub n_emitted: usize,
    pub n_non_converged: usize,
    pub n_monomorphic: usize,
    pub n_insufficient: usize,
    pub n_aborted: usize,
}

/// Load the inputs, run every eligible pair through the EM engine, and
/// write the canonical (site_i, site_j)-sorted result stream.
pub fn run(cli: &parser::Cli) -> Result<RunSummary> {
    // ----------------------------- Load the likelihood store.
    let geno = cli.geno.as_ref().ok_or(parser::ParserError::MissingGenoFile)?;
    info!("Reading genotype likelihoods from {}...", geno.display());
    let raw = read_glf(geno, cli.n_ind, cli.n_sites)
        .with_context(|| format!("While reading {}", geno.display()))?;
    let encoding = GlfEncoding { probs: cli.probs, log_scale: cli.log_scale };
    let mut store = GlfStore::from_raw(raw, encoding).context("Invalid genotype likelihood matrix")?;

    if cli.call_geno {
        info!("Calling genotypes (call_thresh: {}, n_thresh: {})...", cli.call_thresh, cli.n_thresh);
        caller::call_genotypes(&mut store, cli.call_thresh, cli.n_thresh);
    }

    // ----------------------------- Load positions, if any.
    let positions: Option<PositionArray> = match &cli.pos {
        Some(path) => {
            info!("Reading positions from {}...", path.display());
            let positions = read_positions(path, cli.n_sites)
                .with_context(|| format!("While reading {}", path.display()))?;
            Some(positions)
        }
        None => None,
    };

    // ----------------------------- Cache per-site dosages before dispatch.
    let dosages: Option<Dosages> = cli.pearson.then(|| {
        info!("Computing expected genotype dosages...");
        Dosages::compute(&store, cli.call_geno, cli.call_thresh)
    });

    // ----------------------------- Pairwise dispatch.
    info!("Estimating pairwise LD on {} threads...", cli.n_threads);
    let dispatcher = PairwiseDispatcher::new(
        &store,
        positions.as_ref(),
        dosages.as_ref(),
        DispatchOpts { n_threads: cli.n_threads, max_dist: cli.max_dist_bp() },
    );
    let abort = AtomicBool::new(false);
    let results = dispatcher.run(&abort)?;

    // ----------------------------- Emit, in canonical order.
    let emitted: Vec<&PairResult> = results.iter().filter(|result| keep(result, cli.min_r2)).collect();

    let mut writer = GenericWriter::new(cli.out.as_ref()).context("While opening the output sink")?;
    writer
        .write_iter(
            emitted
                .iter()
                .copied()
                .map(|result| LabelledResult { result, positions: positions.as_ref() }),
        )
        .context("While writing pair results")?;

    let summary = summarize(&results, emitted.len());
    log_summary(&summary);
    Ok(summary)
}

/// Output filter: aborted jobs never get emitted, and a strictly positive
/// `--min-r2` additionally drops pairs whose EM r2 is undefined or below
/// the threshold.
fn keep(result: &PairResult, min_r2: f64) -> bool {
    if result.status == PairStatus::Aborted {
        return false
    }
    min_r2 <= 0.0 || result.r2 >= min_r2
}

fn summarize(results: &[PairResult], n_emitted: usize) -> RunSummary {
    let counts = results.iter().map(|result| result.status).counts();
    RunSummary {
        n_pairs: results.len(),
        n_emitted,
        n_non_converged: counts.get(&PairStatus::NonConverged).copied().unwrap_or(0),
        n_monomorphic: counts.get(&PairStatus::Monomorphic).copied().unwrap_or(0),
        n_insufficient: counts.get(&PairStatus::InsufficientData).copied().unwrap_or(0),
        n_aborted: counts.get(&PairStatus::Aborted).copied().unwrap_or(0),
    }
}

fn log_summary(summary: &RunSummary) {
    info!("{} / {} eligible pairs written", summary.n_emitted, summary.n_pairs);
    if summary.n_non_converged > 0 {
        warn!("{} pairs did not converge within the EM iteration cap", summary.n_non_converged);
    }
    if summary.n_monomorphic > 0 {
        warn!("{} pairs involve a monomorphic site (r2 undefined)", summary.n_monomorphic);
    }
    if summary.n_insufficient > 0 {
        warn!("{} pairs had no individual with usable data at both sites", summary.n_insufficient);
    }
    if summary.n_aborted > 0 {
        warn!("{} pairs were skipped after an abort request", summary.n_aborted);
    }
}
