//! Lambert-W branch W₋₁, computed via the Chapeau-Blondeau–Monir series
//! (spec.md §4.8, §9 design note).

/// Evaluate W₋₁(x) via `n` terms of the series expansion around the
/// branch point, in the auxiliary variable `p = -sqrt(2*(e*x+1))`.
pub fn lambert_w_minus1(x: f64, n: usize) -> f64 {
    let p = -(2.0 * (std::f64::consts::E * x + 1.0)).sqrt();

    let mut mus = vec![0.0_f64; n];
    let mut alphas = vec![0.0_f64; n];
    let mut result = 0.0_f64;

    for k in 0..n {
        match k {
            0 => {
                mus[0] = -1.0;
                alphas[0] = 2.0;
            }
            1 => {
                mus[1] = 1.0;
                alphas[1] = -1.0;
            }
            _ => {
                let mut alpha_k = 0.0_f64;
                for j in 2..k {
                    alpha_k += mus[j] * mus[k - j + 1];
                }
                alphas[k] = alpha_k;

                let kf = k as f64;
                mus[k] = ((kf - 1.0) / (kf + 1.0)) * ((mus[k - 2] / 2.0) + (alphas[k - 2] / 4.0))
                    - (alphas[k] / 2.0)
                    - (mus[k - 1] / (kf + 1.0));
            }
        }
        result += mus[k] * p.powi(k as i32);
    }

    result
}

/// The learning-rate time constant `T`, derived analytically so that the
/// learning rate drops below `cutoff` after `n` steps: `T = K * exp(W₋₁(-n/K))`
/// with `K = m*n*e/cutoff`.
pub fn learning_time_constant(m: f64, n: usize, cutoff: f64, series_terms: usize) -> f64 {
    let nf = n as f64;
    let k = m * nf * std::f64::consts::E / cutoff;
    let w = lambert_w_minus1(-nf / k, series_terms);
    k * w.exp()
}

/// `η(t) = M * (t/T) * exp(1 - t/T)`.
pub fn learning_rate(t: f64, learning_t: f64, m: f64) -> f64 {
    let ratio = t / learning_t;
    m * ratio * (1.0 - ratio).exp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn learning_rate_decays_below_cutoff_by_n_steps() {
        let m = 0.8;
        let n = 200usize;
        let cutoff = 0.01;
        let t = learning_time_constant(m, n, cutoff, 64);
        let eta_n = learning_rate(n as f64, t, m);
        assert!(eta_n <= cutoff * 1.1, "eta(N)={eta_n} should be near the {cutoff} cutoff");
    }

    #[test]
    fn learning_rate_peaks_near_t_and_decays_after() {
        let m = 0.8;
        let n = 200usize;
        let t = learning_time_constant(m, n, 0.01, 64);
        let eta_t = learning_rate(t, t, m);
        let eta_2t = learning_rate(2.0 * t, t, m);
        assert!(eta_t > eta_2t);
    }
}
