use ngsld_io::read::N_GENO;

/// Number of two-locus haplotype classes at a pair of biallelic sites.
pub const N_HAP: usize = 4;

/// Convergence tolerance on the max absolute per-iteration frequency change.
pub const EM_TOL: f64 = 1e-8;

/// Iteration cap. Hitting it flags the pair as non-converged, but the last
/// estimate is still returned.
pub const EM_MAX_ITER: usize = 100;

/// Frequencies of the four two-locus haplotype classes. Haplotype `k`
/// carries allele `k >> 1` at the first site and allele `k & 1` at the
/// second, so index 0 is the "first allele at both sites" class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HapFreqs(pub [f64; N_HAP]);

impl HapFreqs {
    /// The default starting guess: 0.25 each.
    #[must_use]
    pub fn uniform() -> Self {
        Self([1.0 / N_HAP as f64; N_HAP])
    }

    /// Linkage-equilibrium product of two per-site second-allele
    /// frequencies. The usual EM seed, since it starts at D = 0.
    #[must_use]
    pub fn from_marginals(alt1: f64, alt2: f64) -> Self {
        Self([
            (1.0 - alt1) * (1.0 - alt2),
            (1.0 - alt1) * alt2,
            alt1 * (1.0 - alt2),
            alt1 * alt2,
        ])
    }

    /// Frequency of the first allele at the first site.
    #[must_use]
    pub fn p1(&self) -> f64 {
        self.0[0] + self.0[1]
    }

    /// Frequency of the first allele at the second site.
    #[must_use]
    pub fn p2(&self) -> f64 {
        self.0[0] + self.0[2]
    }
}

/// Converged (or capped) output of one pairwise EM run.
#[derive(Debug, Clone, Copy)]
pub struct EmFit {
    pub freqs: HapFreqs,
    pub n_iter: usize,
    pub converged: bool,
    /// Individuals that carried usable likelihoods at both sites.
    pub n_used: usize,
}

/// Two-locus haplotype frequency estimator.
///
/// Maximizes the likelihood of the four haplotype frequencies given every
/// individual's genotype likelihoods at the two sites, assuming
/// Hardy-Weinberg random mating. Each E-step weighs all 16 ordered
/// haplotype pairs, which resolves the double-heterozygote phase ambiguity
/// by construction: both phase classes enter the sum with their own
/// haplotype-pair probability.
pub struct FrequencyEstimator {
    pdg1: Vec<[f64; N_GENO]>,
    pdg2: Vec<[f64; N_GENO]>,
    init: HapFreqs,
    tol: f64,
    max_iter: usize,
}

impl FrequencyEstimator {
    /// Set up an estimator over two sites' likelihood rows
    /// (`n_ind * N_GENO` values each, as handed out by the store).
    ///
    /// Rows are normalized here, once, so that probability and raw
    /// likelihood input behave identically. Individuals whose row sums to
    /// zero at either site are excluded from the fit.
    #[must_use]
    pub fn new(rows1: &[f64], rows2: &[f64], n_ind: usize) -> Self {
        let mut pdg1 = Vec::with_capacity(n_ind);
        let mut pdg2 = Vec::with_capacity(n_ind);

        for ind in 0..n_ind {
            let (Some(p1), Some(p2)) = (normalize(rows1, ind), normalize(rows2, ind)) else {
                continue
            };
            pdg1.push(p1);
            pdg2.push(p2);
        }

        Self { pdg1, pdg2, init: HapFreqs::uniform(), tol: EM_TOL, max_iter: EM_MAX_ITER }
    }

    #[must_use]
    pub fn with_init(mut self, init: HapFreqs) -> Self {
        self.init = init;
        self
    }

    /// Run the EM fixed point to convergence (or to the iteration cap).
    /// `None` when no individual carries usable data at both sites.
    #[must_use]
    pub fn run(&self) -> Option<EmFit> {
        let n_used = self.pdg1.len();
        if n_used == 0 {
            return None
        }

        let mut freqs = self.init.0;
        let mut n_iter = 0;
        let mut converged = false;

        while n_iter < self.max_iter {
            n_iter += 1;

            let mut expected = [0.0; N_HAP];
            for (p1, p2) in self.pdg1.iter().zip(&self.pdg2) {
                let mut weights = [0.0; N_HAP];
                let mut sum = 0.0;
                for (k, weight) in weights.iter_mut().enumerate() {
                    for (h, freq) in freqs.iter().enumerate() {
                        // Genotypes count copies of the second allele.
                        let g1 = (k >> 1) + (h >> 1);
                        let g2 = (k & 1) + (h & 1);
                        let w = freqs[k] * freq * p1[g1] * p2[g2];
                        *weight += w;
                        sum += w;
                    }
                }
                if sum <= 0.0 {
                    continue
                }
                for (hap, weight) in expected.iter_mut().zip(weights) {
                    *hap += weight / sum;
                }
            }

            let total: f64 = expected.iter().sum();
            if total <= 0.0 {
                break
            }

            let mut delta: f64 = 0.0;
            for (freq, hap) in freqs.iter_mut().zip(expected) {
                let updated = hap / total;
                delta = delta.max((updated - *freq).abs());
                *freq = updated;
            }
            if delta < self.tol {
                converged = true;
                break
            }
        }

        Some(EmFit { freqs: HapFreqs(freqs), n_iter, converged, n_used })
    }
}

fn normalize(rows: &[f64], ind: usize) -> Option<[f64; N_GENO]> {
    let row = &rows[ind * N_GENO..(ind + 1) * N_GENO];
    let sum: f64 = row.iter().sum();
    if sum <= 0.0 {
        return None
    }
    let mut out = [0.0; N_GENO];
    for (target, value) in out.iter_mut().zip(row) {
        *target = value / sum;
    }
    Some(out)
}

/// Crude per-site second-allele frequency from argmax genotype counts,
/// used to seed the EM at linkage equilibrium. `None` when no individual
/// carries usable data at the site.
#[must_use]
pub fn argmax_allele_freq(rows: &[f64], n_ind: usize) -> Option<f64> {
    let mut counts = [0usize; N_GENO];
    for ind in 0..n_ind {
        let row = &rows[ind * N_GENO..(ind + 1) * N_GENO];
        if row.iter().sum::<f64>() <= 0.0 {
            continue
        }
        let mut best = 0;
        for (geno, value) in row.iter().enumerate().skip(1) {
            if *value > row[best] {
                best = geno;
            }
        }
        counts[best] += 1;
    }

    let n: usize = counts.iter().sum();
    match n {
        0 => None,
        n => Some((0.5 * counts[1] as f64 + counts[2] as f64) / n as f64),
    }
}

#[cfg(test)]
mod tests {
    use float_cmp::assert_approx_eq;

    use super::*;

    /// One-hot likelihood row for a known genotype.
    fn geno_row(geno: usize) -> [f64; N_GENO] {
        let mut row = [0.0; N_GENO];
        row[geno] = 1.0;
        row
    }

    fn flatten(genos: &[usize]) -> Vec<f64> {
        genos.iter().flat_map(|&g| geno_row(g)).collect()
    }

    #[test]
    fn uniform_is_the_default_start() {
        let freqs = HapFreqs::uniform();
        assert_eq!(freqs.0, [0.25; 4]);
        assert_approx_eq!(f64, freqs.p1(), 0.5);
        assert_approx_eq!(f64, freqs.p2(), 0.5);
    }

    #[test]
    fn marginal_seed_sits_at_linkage_equilibrium() {
        let freqs = HapFreqs::from_marginals(0.3, 0.8);
        assert_approx_eq!(f64, freqs.0.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        // D = p11 - p1 * p2 = 0 by construction.
        assert_approx_eq!(f64, freqs.0[0], freqs.p1() * freqs.p2(), epsilon = 1e-12);
    }

    #[test]
    fn independent_sites_converge_to_equilibrium() {
        // 16 individuals whose joint genotype table sits exactly at the
        // Hardy-Weinberg linkage-equilibrium proportions for p1 = p2 = 0.5.
        let g1 = [0, 0, 0, 0, 1, 1, 1, 1, 1, 1, 1, 1, 2, 2, 2, 2];
        let g2 = [0, 1, 1, 2, 0, 0, 1, 1, 1, 1, 2, 2, 0, 1, 1, 2];
        let fit = FrequencyEstimator::new(&flatten(&g1), &flatten(&g2), g1.len())
            .with_init(HapFreqs::from_marginals(0.4, 0.6)) // deliberately off.
            .run()
            .expect("informative individuals");

        assert!(fit.converged, "EM should converge on {} individuals", fit.n_used);
        let d = fit.freqs.0[0] - fit.freqs.p1() * fit.freqs.p2();
        assert_approx_eq!(f64, d, 0.0, epsilon = 1e-3);
    }

    #[test]
    fn fully_linked_sites_converge_to_coupling() {
        // Genotypes at site 2 deterministically mirror site 1.
        let g = [0, 0, 0, 1, 1, 1, 2, 2, 2, 0, 1, 2];
        let fit = FrequencyEstimator::new(&flatten(&g), &flatten(&g), g.len())
            .with_init(HapFreqs::from_marginals(0.45, 0.45))
            .run()
            .expect("informative individuals");

        // All mass on the two coupling haplotypes.
        assert!(fit.freqs.0[1] < 1e-6 && fit.freqs.0[2] < 1e-6, "freqs: {:?}", fit.freqs);
        let denom = fit.freqs.p1() * (1.0 - fit.freqs.p1());
        let d = fit.freqs.0[0] - fit.freqs.p1() * fit.freqs.p2();
        assert_approx_eq!(f64, d * d / (denom * denom), 1.0, epsilon = 1e-4);
    }

    #[test]
    fn estimates_are_symmetric_in_the_pair() {
        let g1 = [0, 1, 2, 1, 0, 2, 2, 1];
        let g2 = [0, 1, 2, 2, 1, 2, 2, 0];
        let (rows1, rows2) = (flatten(&g1), flatten(&g2));

        let fwd = FrequencyEstimator::new(&rows1, &rows2, g1.len()).run().unwrap();
        let rev = FrequencyEstimator::new(&rows2, &rows1, g1.len()).run().unwrap();

        // Swapping sites transposes the haplotype table.
        assert_approx_eq!(f64, fwd.freqs.0[0], rev.freqs.0[0], epsilon = 1e-9);
        assert_approx_eq!(f64, fwd.freqs.0[1], rev.freqs.0[2], epsilon = 1e-9);
        assert_approx_eq!(f64, fwd.freqs.0[2], rev.freqs.0[1], epsilon = 1e-9);
        assert_approx_eq!(f64, fwd.freqs.0[3], rev.freqs.0[3], epsilon = 1e-9);
    }

    #[test]
    fn zero_sum_individuals_are_excluded() {
        let mut rows1 = flatten(&[0, 1, 2]);
        let rows2 = flatten(&[0, 1, 2]);
        rows1[3..6].copy_from_slice(&[0.0, 0.0, 0.0]); // individual 1, site 1.

        let fit = FrequencyEstimator::new(&rows1, &rows2, 3).run().unwrap();
        assert_eq!(fit.n_used, 2);
    }

    #[test]
    fn no_usable_individuals_yields_none() {
        let rows = vec![0.0; 2 * N_GENO];
        assert!(FrequencyEstimator::new(&rows, &rows, 2).run().is_none());
    }

    #[test]
    fn frequencies_stay_normalized() {
        let g1 = [0, 1, 1, 2, 0, 2, 1, 0];
        let g2 = [1, 1, 0, 2, 0, 2, 2, 0];
        let fit = FrequencyEstimator::new(&flatten(&g1), &flatten(&g2), g1.len()).run().unwrap();
        assert_approx_eq!(f64, fit.freqs.0.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn argmax_seed_counts_genotypes() {
        let rows = flatten(&[0, 1, 1, 2]);
        // (0.5 * 2 + 1) / 4
        assert_approx_eq!(f64, argmax_allele_freq(&rows, 4).unwrap(), 0.5);
    }

    #[test]
    fn argmax_seed_without_data_is_none() {
        let rows = vec![0.0; 3 * N_GENO];
        assert!(argmax_allele_freq(&rows, 3).is_none());
    }
}
