use ngsld_io::read::N_GENO;

use crate::glf::GlfStore;

/// Index of the first maximum of a likelihood row (ties resolve to the
/// lowest genotype, as the original caller did).
fn argmax(row: &[f64]) -> usize {
    let mut best = 0;
    for (state, value) in row.iter().enumerate().skip(1) {
        if *value > row[best] {
            best = state;
        }
    }
    best
}

/// Rewrite every store row according to the genotype-calling thresholds,
/// once, before pairwise dispatch:
/// - max posterior >= `call_thresh`: the row becomes a one-hot hard call
///   (with `call_thresh` 0, every informative row is called);
/// - max posterior <  `n_thresh`: the row is considered missing data and
///   becomes uniform;
/// - anything in between keeps its posteriors.
///
/// Zero-sum rows are left untouched; they are excluded per pair downstream.
pub fn call_genotypes(store: &mut GlfStore, call_thresh: f64, n_thresh: f64) {
    for site in 0..store.n_sites() {
        for row in store.site_rows_mut(site).chunks_exact_mut(N_GENO) {
            let sum: f64 = row.iter().sum();
            if sum <= 0.0 {
                continue
            }
            let best = argmax(row);
            let max_pp = row[best] / sum;

            if max_pp >= call_thresh {
                row.iter_mut().for_each(|value| *value = 0.0);
                row[best] = 1.0;
            } else if max_pp < n_thresh {
                row.iter_mut().for_each(|value| *value = 1.0 / N_GENO as f64);
            }
        }
    }
}

/// Per-site, per-individual expected genotype dosages in [0, 2].
///
/// Computed once per site before dispatch, since every site takes part in
/// up to `n_sites - 1` pairs. `None` marks a missing dosage: zero-sum rows
/// always, plus every row whose call falls below `call_thresh` when hard
/// calls were requested (below-threshold individuals are dropped from the
/// correlation, never imputed).
#[derive(Debug)]
pub struct Dosages {
    n_ind: usize,
    values: Vec<Option<f64>>,
}

impl Dosages {
    #[must_use]
    pub fn compute(store: &GlfStore, call_geno: bool, call_thresh: f64) -> Self {
        let mut values = Vec::with_capacity(store.n_ind() * store.n_sites());

        for site in 0..store.n_sites() {
            for row in store.site_rows(site).chunks_exact(N_GENO) {
                let sum: f64 = row.iter().sum();
                if sum <= 0.0 {
                    values.push(None);
                    continue
                }
                let dosage = match call_geno {
                    true => {
                        let best = argmax(row);
                        (row[best] / sum >= call_thresh).then(|| best as f64)
                    }
                    false => {
                        let expected = row
                            .iter()
                            .enumerate()
                            .map(|(geno, value)| geno as f64 * value / sum)
                            .sum();
                        Some(expected)
                    }
                };
                values.push(dosage);
            }
        }
        Self { n_ind: store.n_ind(), values }
    }

    /// All individuals' dosages at one site.
    #[must_use]
    pub fn site(&self, site: usize) -> &[Option<f64>] {
        &self.values[site * self.n_ind..(site + 1) * self.n_ind]
    }
}

#[cfg(test)]
mod tests {
    use float_cmp::assert_approx_eq;
    use ngsld_io::read::RawGlf;

    use crate::glf::GlfEncoding;

    use super::*;

    fn store(n_ind: usize, n_sites: usize, values: Vec<f64>) -> GlfStore {
        GlfStore::from_raw(
            RawGlf { n_ind, n_sites, values },
            GlfEncoding { probs: true, log_scale: false },
        )
        .expect("valid store")
    }

    #[test]
    fn confident_rows_become_hard_calls() {
        let mut store = store(1, 1, vec![0.02, 0.95, 0.03]);
        call_genotypes(&mut store, 0.9, 0.0);
        assert_eq!(store.likelihoods(0, 0), &[0.0, 1.0, 0.0]);
    }

    #[test]
    fn hopeless_rows_become_uniform() {
        let mut store = store(1, 1, vec![0.4, 0.35, 0.25]);
        call_genotypes(&mut store, 0.9, 0.5);
        let third = 1.0 / 3.0;
        assert_eq!(store.likelihoods(0, 0), &[third, third, third]);
    }

    #[test]
    fn uncertain_rows_keep_their_posteriors() {
        let mut store = store(1, 1, vec![0.7, 0.2, 0.1]);
        call_genotypes(&mut store, 0.9, 0.5);
        assert_eq!(store.likelihoods(0, 0), &[0.7, 0.2, 0.1]);
    }

    #[test]
    fn zero_call_thresh_calls_everything() {
        let mut store = store(1, 1, vec![0.4, 0.35, 0.25]);
        call_genotypes(&mut store, 0.0, 0.0);
        assert_eq!(store.likelihoods(0, 0), &[1.0, 0.0, 0.0]);
    }

    #[test]
    fn expected_dosage_is_the_posterior_mean() {
        let store = store(2, 1, vec![0.5, 0.5, 0.0, 0.0, 0.0, 1.0]);
        let dosages = Dosages::compute(&store, false, 0.0);
        assert_approx_eq!(f64, dosages.site(0)[0].unwrap(), 0.5);
        assert_approx_eq!(f64, dosages.site(0)[1].unwrap(), 2.0);
    }

    #[test]
    fn below_threshold_calls_are_missing_not_imputed() {
        let store = store(2, 1, vec![0.6, 0.3, 0.1, 0.05, 0.05, 0.9]);
        let dosages = Dosages::compute(&store, true, 0.8);
        assert_eq!(dosages.site(0)[0], None);
        assert_eq!(dosages.site(0)[1], Some(2.0));
    }

    #[test]
    fn zero_sum_rows_have_no_dosage() {
        let store = store(2, 1, vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
        let dosages = Dosages::compute(&store, false, 0.0);
        assert_eq!(dosages.site(0)[0], None);
        assert_eq!(dosages.site(0)[1], Some(0.0));
    }
}
