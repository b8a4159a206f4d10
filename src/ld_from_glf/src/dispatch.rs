use std::sync::atomic::{AtomicBool, Ordering};

use indicatif::{ProgressBar, ProgressStyle};
use log::debug;
use ngsld_io::read::PositionArray;
use rayon::prelude::*;
use thiserror::Error;

use crate::{
    caller::Dosages,
    em::{argmax_allele_freq, FrequencyEstimator, HapFreqs},
    glf::GlfStore,
    result::{PairResult, PairStatus},
    sites::{eligible_pairs, SitePair},
    stats::{monomorphic, pearson_r, LdStats},
};

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Failed to build the worker thread pool")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

#[derive(Debug, Clone, Copy)]
pub struct DispatchOpts {
    pub n_threads: usize,
    /// Maximum pair distance in bp; `None` disables distance filtering.
    pub max_dist: Option<u64>,
}

/// Schedules one independent job per eligible site pair onto a fixed-size
/// worker pool.
///
/// Workers only share read-only state (store, positions, dosages), so no
/// locking is involved anywhere: every job writes its `PairResult` into its
/// own pre-assigned slot of the result vector. The output is therefore in
/// canonical (i, j) order by construction, whatever the thread interleaving.
pub struct PairwiseDispatcher<'a> {
    store: &'a GlfStore,
    positions: Option<&'a PositionArray>,
    dosages: Option<&'a Dosages>,
    opts: DispatchOpts,
}

impl<'a> PairwiseDispatcher<'a> {
    #[must_use]
    pub fn new(
        store: &'a GlfStore,
        positions: Option<&'a PositionArray>,
        dosages: Option<&'a Dosages>,
        opts: DispatchOpts,
    ) -> Self {
        Self { store, positions, dosages, opts }
    }

    /// Run every eligible pair to completion.
    ///
    /// Cancellation is cooperative: raising `abort` lets in-flight jobs
    /// finish, skips the remaining ones (flagged [`PairStatus::Aborted`]),
    /// and preserves every already-completed result.
    ///
    /// # Errors
    /// Only on worker-pool construction failure. Numeric degeneracies never
    /// cross a job boundary; they come back as flagged results.
    pub fn run(&self, abort: &AtomicBool) -> Result<Vec<PairResult>, DispatchError> {
        let pairs = eligible_pairs(self.store.n_sites(), self.positions, self.opts.max_dist);
        debug!("{} eligible site pairs, {} worker threads", pairs.len(), self.opts.n_threads);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.opts.n_threads)
            .build()?;

        let bar = match logger::Logger::try_multi() {
            Some(multi) => multi.add(ProgressBar::new(pairs.len() as u64).with_style(
                ProgressStyle::with_template("{bar:40} {pos}/{len} pairs ({eta})")
                    .expect("valid progress bar template"),
            )),
            None => ProgressBar::hidden(),
        };

        let results = pool.install(|| {
            pairs
                .par_iter()
                .map(|&pair| {
                    let result = self.compute_pair(pair, abort);
                    bar.inc(1);
                    result
                })
                .collect()
        });
        bar.finish_and_clear();
        Ok(results)
    }

    /// One independent unit of work. Every failure mode is converted into a
    /// flagged result; this never panics on degenerate data.
    #[must_use]
    pub fn compute_pair(&self, pair: SitePair, abort: &AtomicBool) -> PairResult {
        if abort.load(Ordering::Relaxed) {
            return PairResult::degenerate(pair, None, PairStatus::Aborted)
        }

        let n_ind = self.store.n_ind();
        let rows1 = self.store.site_rows(pair.i);
        let rows2 = self.store.site_rows(pair.j);

        let pearson = self
            .dosages
            .and_then(|dosages| pearson_r(dosages.site(pair.i), dosages.site(pair.j)));

        // Seed at linkage equilibrium of the two marginal estimates
        // whenever the sites are informative at all.
        let init = match (argmax_allele_freq(rows1, n_ind), argmax_allele_freq(rows2, n_ind)) {
            (Some(alt1), Some(alt2)) => HapFreqs::from_marginals(alt1, alt2),
            _ => HapFreqs::uniform(),
        };

        let Some(fit) = FrequencyEstimator::new(rows1, rows2, n_ind).with_init(init).run() else {
            return PairResult::degenerate(pair, pearson, PairStatus::InsufficientData)
        };

        let stats = LdStats::from_freqs(&fit.freqs, fit.n_used);
        let status = if !fit.converged {
            PairStatus::NonConverged
        } else if monomorphic(&fit.freqs) {
            PairStatus::Monomorphic
        } else {
            PairStatus::Ok
        };
        PairResult::new(pair, stats, fit.n_used, pearson, status)
    }
}
