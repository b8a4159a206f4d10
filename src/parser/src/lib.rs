use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::{info, warn};
use serde::Serialize;

mod error;
pub use error::ParserError;

/// ngsLD-rs: pairwise linkage disequilibrium from genotype likelihoods
///
/// Estimates D, D', r2 and a chi-square statistic for every pair of sites
/// within a maximum genomic distance, directly from per-individual genotype
/// likelihoods or probabilities. Haplotype frequencies are obtained through
/// an EM algorithm, so no hard genotype calls are required beforehand.
#[derive(Parser, Debug, Serialize)]
#[clap(name="ngsld-rs", author, version, about, long_about = None)]
pub struct Cli {
    /// Genotype likelihood matrix.
    ///
    /// One row per site, three values per individual (one per genotype).
    /// Plain or gzipped text is accepted, as well as raw little-endian
    /// doubles when the file size matches n_sites * n_ind * 3 * 8 bytes.
    /// Text rows may carry the three leading beagle columns
    /// (marker, allele1, allele2); these are skipped.
    #[clap(short, long)]
    pub geno: Option<PathBuf>,

    /// Number of individuals in the genotype likelihood matrix.
    #[clap(short, long, default_value("0"))]
    pub n_ind: usize,

    /// Number of sites in the genotype likelihood matrix.
    #[clap(short='s', long, default_value("0"))]
    pub n_sites: usize,

    /// Input values are genotype probabilities/posteriors, not likelihoods.
    #[clap(short, long)]
    pub probs: bool,

    /// Input values are log-scaled.
    #[clap(short, long)]
    pub log_scale: bool,

    /// Position file: one "chromosome<TAB>position" row per site.
    ///
    /// Rows must be sorted, with non-decreasing positions within each
    /// chromosome. Required whenever distance filtering is active.
    #[clap(short='Z', long)]
    pub pos: Option<PathBuf>,

    /// Maximum distance between two sites, in kb. Values <= 0 disable
    /// distance filtering altogether and compare all pairs of sites.
    #[clap(short='d', long, default_value("100"), allow_hyphen_values(true))]
    pub max_kb_dist: f64,

    /// Minimum EM r2 a pair must reach to be printed. Pairs with an
    /// undefined r2 are only printed when this filter is disabled (0).
    #[clap(short='r', long, default_value("0"))]
    pub min_r2: f64,

    /// Call genotypes before computing expected genotype dosages.
    #[clap(short, long)]
    pub call_geno: bool,

    /// Minimum posterior probability required to call a genotype.
    /// Implies --call-geno.
    #[clap(short='C', long, default_value("0"))]
    pub call_thresh: f64,

    /// Posterior probability below which an individual's data at a site is
    /// considered missing. Implies --call-geno.
    #[clap(short='N', long, default_value("0"))]
    pub n_thresh: f64,

    /// Also report the Pearson correlation between the two sites'
    /// per-individual expected genotype dosages.
    #[clap(short='P', long)]
    pub pearson: bool,

    /// Output file. Results are written to stdout when omitted.
    #[clap(short, long)]
    pub out: Option<PathBuf>,

    /// Number of worker threads draining the pairwise job queue.
    #[clap(short='x', long, default_value("1"))]
    pub n_threads: usize,

    ///Set the verbosity level (-v -vv -vvv)
    ///
    /// Set the verbosity level of this program. Multiple levels allowed {n}
    ///
    /// -v: Info  |  -vv: Debug  | -vvv: Trace {n}
    ///
    /// Note that the program will still output warnings by default, even when
    /// this flag is off. Use --quiet/-q to disable them.
    #[clap(short='v', long, parse(from_occurrences))]
    pub verbose: u8,

    /// Disable warnings. Only errors will be displayed.
    #[clap(short='q', long)]
    pub quiet: bool,

    /// Print the citation for the method this program implements, and exit.
    #[clap(long)]
    pub cite: bool,
}

impl Cli {
    /// Log the parsed command line arguments as yaml.
    ///
    /// # Errors
    /// Sends an unrecoverable error if `serde_yaml` fails to parse `Self`
    /// into a string.
    pub fn serialize(&self) -> Result<()> {
        let serialized = serde_yaml::to_string(&self)?;
        info!("\n---- Command line args ----\n{serialized}\n---");
        Ok(())
    }

    /// Whether pairs should be filtered on genomic distance at all.
    #[must_use]
    pub fn distance_filtering(&self) -> bool {
        self.max_kb_dist > 0.0
    }

    /// Maximum pair distance in bp, `None` when filtering is disabled.
    #[must_use]
    pub fn max_dist_bp(&self) -> Option<u64> {
        self.distance_filtering().then(|| (self.max_kb_dist * 1000.0) as u64)
    }

    /// Providing a calling threshold without --call-geno is accepted, but
    /// switches genotype calling on. Mirror that here, loudly.
    pub fn normalize(&mut self) {
        if !self.call_geno && (self.call_thresh > 0.0 || self.n_thresh > 0.0) {
            warn!("--call-thresh/--n-thresh imply --call-geno. Enabling genotype calling...");
            self.call_geno = true;
        }
    }

    /// Validate cross-argument constraints that clap cannot express.
    ///
    /// # Errors
    /// Returns the first violated [`ParserError`] constraint, if any.
    pub fn check(&self) -> Result<(), ParserError> {
        if self.geno.is_none() {
            return Err(ParserError::MissingGenoFile)
        }
        if self.n_ind == 0 {
            return Err(ParserError::EmptyDimension { arg: "n-ind" })
        }
        if self.n_sites == 0 {
            return Err(ParserError::EmptyDimension { arg: "n-sites" })
        }
        if self.n_threads < 1 {
            return Err(ParserError::InvalidThreadCount)
        }
        if self.pos.is_none() && self.distance_filtering() {
            return Err(ParserError::MissingPositionFile)
        }
        if self.call_geno && !self.probs {
            return Err(ParserError::CallGenoWithoutProbs)
        }
        for (arg, value) in [
            ("call-thresh", self.call_thresh),
            ("n-thresh",    self.n_thresh),
            ("min-r2",      self.min_r2),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ParserError::InvalidThreshold { arg, value })
            }
        }
        Ok(())
    }
}
