use ngsld_io::read::{RawGlf, N_GENO};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GlfError {
    #[error("individual {ind}, site {site}: negative genotype likelihood ({value})")]
    NegativeValue { ind: usize, site: usize, value: f64 },

    #[error("individual {ind}, site {site}: non-finite genotype likelihood")]
    NonFinite { ind: usize, site: usize },

    #[error("likelihood matrix holds {found} values, expected {expected} (n_sites x n_ind x {N_GENO})")]
    SizeMismatch { found: usize, expected: usize },
}

/// Scale and meaning of the raw input values.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlfEncoding {
    /// Values are genotype probabilities/posteriors (rows sum to 1).
    pub probs: bool,
    /// Values are log-scaled.
    pub log_scale: bool,
}

/// In-memory genotype likelihood store.
///
/// One contiguous buffer, packed site-major so that a pairwise job touches
/// two dense stretches of memory: `values[(site * n_ind + ind) * N_GENO + g]`.
/// Values are kept in linear (non-log) space: log-scaled input is
/// exponentiated on construction, probability input is re-normalized per
/// row. Read-only once built; a genotype-calling pass (see [`crate::caller`])
/// may rewrite rows once, before any pairwise computation starts.
#[derive(Debug)]
pub struct GlfStore {
    n_ind: usize,
    n_sites: usize,
    values: Vec<f64>,
}

impl GlfStore {
    /// Build a store from a raw matrix, converting every row to linear
    /// space.
    ///
    /// Log-scaled rows are shifted by their maximum before exponentiation,
    /// so that very negative log-likelihoods do not underflow all the way
    /// to a zero row. The shift is harmless: likelihood rows carry an
    /// arbitrary scale, and probability rows get re-normalized afterwards.
    ///
    /// # Errors
    /// A malformed value (NaN anywhere; negative or infinite values in
    /// linear space; +inf in log space) is a fatal data error, reported
    /// with the offending (individual, site) coordinates.
    pub fn from_raw(raw: RawGlf, encoding: GlfEncoding) -> Result<Self, GlfError> {
        let RawGlf { n_ind, n_sites, mut values } = raw;

        let expected = n_ind * n_sites * N_GENO;
        if values.len() != expected {
            return Err(GlfError::SizeMismatch { found: values.len(), expected })
        }

        for (row_idx, row) in values.chunks_exact_mut(N_GENO).enumerate() {
            let (site, ind) = (row_idx / n_ind, row_idx % n_ind);

            for value in row.iter() {
                // In log space, -inf is a legitimate zero likelihood.
                let valid = match encoding.log_scale {
                    true  => !value.is_nan() && *value != f64::INFINITY,
                    false => value.is_finite(),
                };
                if !valid {
                    return Err(GlfError::NonFinite { ind, site })
                }
                if !encoding.log_scale && *value < 0.0 {
                    return Err(GlfError::NegativeValue { ind, site, value: *value })
                }
            }

            if encoding.log_scale {
                let shift = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                match shift.is_finite() {
                    true  => row.iter_mut().for_each(|value| *value = (*value - shift).exp()),
                    false => row.iter_mut().for_each(|value| *value = 0.0), // all-zero row.
                }
            }

            if encoding.probs {
                let sum: f64 = row.iter().sum();
                if sum > 0.0 {
                    row.iter_mut().for_each(|value| *value /= sum);
                }
            }
        }

        Ok(Self { n_ind, n_sites, values })
    }

    #[must_use]
    pub fn n_ind(&self) -> usize {
        self.n_ind
    }

    #[must_use]
    pub fn n_sites(&self) -> usize {
        self.n_sites
    }

    /// The `N_GENO` linear-space values of one (individual, site) cell.
    #[must_use]
    pub fn likelihoods(&self, ind: usize, site: usize) -> &[f64] {
        let offset = (site * self.n_ind + ind) * N_GENO;
        &self.values[offset..offset + N_GENO]
    }

    /// All individuals' rows at one site: `n_ind * N_GENO` values.
    #[must_use]
    pub fn site_rows(&self, site: usize) -> &[f64] {
        let offset = site * self.n_ind * N_GENO;
        &self.values[offset..offset + self.n_ind * N_GENO]
    }

    pub(crate) fn site_rows_mut(&mut self, site: usize) -> &mut [f64] {
        let offset = site * self.n_ind * N_GENO;
        &mut self.values[offset..offset + self.n_ind * N_GENO]
    }
}
