use std::fmt::{self, Display, Formatter};

use ngsld_io::{
    read::PositionArray,
    write::{MISSING, WRITER_SEPARATOR},
};

use crate::{sites::SitePair, stats::LdStats};

/// Per-pair diagnostic, carried through to the output stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PairStatus {
    Ok,
    /// EM hit its iteration cap; the last estimate was kept.
    NonConverged,
    /// A marginal allele frequency converged to 0 or 1.
    Monomorphic,
    /// No individual carried usable data at both sites.
    InsufficientData,
    /// The job was skipped after a cooperative abort.
    Aborted,
}

impl PairStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok               => "ok",
            Self::NonConverged     => "non_converged",
            Self::Monomorphic      => "monomorphic",
            Self::InsufficientData => "insufficient_data",
            Self::Aborted          => "aborted",
        }
    }
}

impl Display for PairStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output record for one eligible site pair. Created by a worker thread,
/// immutable afterwards.
#[derive(Debug, Clone, Copy)]
pub struct PairResult {
    pub i: usize,
    pub j: usize,
    pub dist: Option<u64>,
    /// Individuals contributing non-zero weight to the EM fit.
    pub n_used: usize,
    pub d: f64,
    pub d_prime: f64,
    pub r2: f64,
    pub chi2: f64,
    pub pearson_r: Option<f64>,
    pub status: PairStatus,
}

impl PairResult {
    #[must_use]
    pub fn new(pair: SitePair, stats: LdStats, n_used: usize, pearson_r: Option<f64>, status: PairStatus) -> Self {
        Self {
            i: pair.i,
            j: pair.j,
            dist: pair.dist,
            n_used,
            d: stats.d,
            d_prime: stats.d_prime,
            r2: stats.r2,
            chi2: stats.chi2,
            pearson_r,
            status,
        }
    }

    /// A record whose statistics never got computed.
    #[must_use]
    pub fn degenerate(pair: SitePair, pearson_r: Option<f64>, status: PairStatus) -> Self {
        Self {
            i: pair.i,
            j: pair.j,
            dist: pair.dist,
            n_used: 0,
            d: f64::NAN,
            d_prime: f64::NAN,
            r2: f64::NAN,
            chi2: f64::NAN,
            pearson_r,
            status,
        }
    }
}

/// Display adapter attaching site labels to a [`PairResult`].
///
/// Field order: `Site1 Site2 Dist nInd D D' r2 chi2 r_ExpG status`, with
/// `NA` for every undefined value. Sites fall back to their 0-based index
/// when no position file was given.
pub struct LabelledResult<'a> {
    pub result: &'a PairResult,
    pub positions: Option<&'a PositionArray>,
}

impl LabelledResult<'_> {
    fn label(&self, site: usize) -> String {
        match self.positions {
            Some(positions) => positions.label(site).to_string(),
            None            => site.to_string(),
        }
    }
}

fn fmt_stat(value: f64) -> String {
    match value.is_nan() {
        true  => MISSING.to_string(),
        false => format!("{value:.6}"),
    }
}

impl Display for LabelledResult<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let result = self.result;
        let fields = [
            self.label(result.i),
            self.label(result.j),
            result.dist.map_or_else(|| MISSING.to_string(), |dist| dist.to_string()),
            result.n_used.to_string(),
            fmt_stat(result.d),
            fmt_stat(result.d_prime),
            fmt_stat(result.r2),
            fmt_stat(result.chi2),
            result.pearson_r.map_or_else(|| MISSING.to_string(), fmt_stat),
            result.status.to_string(),
        ];
        f.write_str(&fields.join(WRITER_SEPARATOR))
    }
}
