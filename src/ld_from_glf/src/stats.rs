use crate::em::HapFreqs;

/// Derived pairwise LD summary statistics. Undefined values (monomorphic
/// marginals) are `NaN` and rendered with the missing sentinel downstream.
#[derive(Debug, Clone, Copy)]
pub struct LdStats {
    pub d: f64,
    pub d_prime: f64,
    pub r2: f64,
    pub chi2: f64,
}

/// Whether either marginal allele frequency of the pair is 0 or 1, which
/// leaves r2 (and D') undefined.
#[must_use]
pub fn monomorphic(freqs: &HapFreqs) -> bool {
    let (p1, p2) = (freqs.p1(), freqs.p2());
    p1 * (1.0 - p1) * p2 * (1.0 - p2) <= 0.0
}

impl LdStats {
    /// Standard population-genetics derivations from a converged
    /// haplotype-frequency vector.
    ///
    /// - D  = p11 - p1 * p2
    /// - D' = D / D_max, D_max depending on the sign of D
    /// - r2 = D^2 / (p1 (1 - p1) p2 (1 - p2))
    /// - chi2 = r2 * 2 * n_used, the usual significance approximation
    #[must_use]
    pub fn from_freqs(freqs: &HapFreqs, n_used: usize) -> Self {
        let (p1, p2) = (freqs.p1(), freqs.p2());
        let d = freqs.0[0] - p1 * p2;

        let d_max = match d >= 0.0 {
            true  => f64::min(p1 * (1.0 - p2), (1.0 - p1) * p2),
            false => f64::min(p1 * p2, (1.0 - p1) * (1.0 - p2)),
        };
        let d_prime = match d_max > 0.0 {
            true  => (d / d_max).clamp(-1.0, 1.0),
            false => f64::NAN,
        };

        let denom = p1 * (1.0 - p1) * p2 * (1.0 - p2);
        let r2 = match denom > 0.0 {
            true  => (d * d / denom).clamp(0.0, 1.0),
            false => f64::NAN,
        };

        Self { d, d_prime, r2, chi2: r2 * 2.0 * n_used as f64 }
    }
}

/// Pearson correlation between two dosage vectors, over
/// pairwise-complete individuals only. `None` when fewer than two complete
/// observations remain, or either side has zero variance.
#[must_use]
pub fn pearson_r(x: &[Option<f64>], y: &[Option<f64>]) -> Option<f64> {
    let complete: Vec<(f64, f64)> = x
        .iter()
        .zip(y)
        .filter_map(|(a, b)| a.zip(*b))
        .collect();

    let n = complete.len();
    if n < 2 {
        return None
    }

    let mean_x: f64 = complete.iter().map(|(a, _)| a).sum::<f64>() / n as f64;
    let mean_y: f64 = complete.iter().map(|(_, b)| b).sum::<f64>() / n as f64;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (a, b) in &complete {
        let (dx, dy) = (a - mean_x, b - mean_y);
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x <= 0.0 || var_y <= 0.0 {
        return None
    }
    Some((cov / (var_x * var_y).sqrt()).clamp(-1.0, 1.0))
}
