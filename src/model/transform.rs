//! Reparameterisation keeping AR polynomials stationary and MA polynomials invertible.
//!
//! Each unconstrained value `x` maps to a partial autocorrelation
//! `r = x / sqrt(1 + x^2)` in (-1, 1); the Durbin–Levinson recursion turns
//! the partial autocorrelations into polynomial coefficients. Every
//! unconstrained vector therefore lands inside the stationary region, which
//! lets the optimiser search freely.

/// Map unconstrained values to stationary AR coefficients
/// (`1 - phi_1 z - ... - phi_p z^p` has all roots outside the unit circle).
pub fn constrain_stationary(unconstrained: &[f64]) -> Vec<f64> {
    let pacf: Vec<f64> = unconstrained
        .iter()
        .map(|x| x / (1.0 + x * x).sqrt())
        .collect();
    pacf_to_coefficients(&pacf)
}

/// Inverse of [`constrain_stationary`]. Coefficients must be stationary.
pub fn unconstrain_stationary(constrained: &[f64]) -> Vec<f64> {
    coefficients_to_pacf(constrained)
        .into_iter()
        .map(|r| {
            let r = r.clamp(-1.0 + 1e-8, 1.0 - 1e-8);
            r / (1.0 - r * r).sqrt()
        })
        .collect()
}

/// Map unconstrained values to invertible MA coefficients
/// (`1 + theta_1 z + ... + theta_q z^q` has all roots outside the unit circle).
pub fn constrain_invertible(unconstrained: &[f64]) -> Vec<f64> {
    constrain_stationary(unconstrained)
        .into_iter()
        .map(|c| -c)
        .collect()
}

/// Inverse of [`constrain_invertible`].
pub fn unconstrain_invertible(constrained: &[f64]) -> Vec<f64> {
    let negated: Vec<f64> = constrained.iter().map(|c| -c).collect();
    unconstrain_stationary(&negated)
}

fn pacf_to_coefficients(pacf: &[f64]) -> Vec<f64> {
    let mut coeffs: Vec<f64> = Vec::with_capacity(pacf.len());
    for (k, &r) in pacf.iter().enumerate() {
        let previous = coeffs.clone();
        for j in 0..k {
            coeffs[j] = previous[j] - r * previous[k - 1 - j];
        }
        coeffs.push(r);
    }
    coeffs
}

fn coefficients_to_pacf(coeffs: &[f64]) -> Vec<f64> {
    let p = coeffs.len();
    let mut current = coeffs.to_vec();
    let mut pacf = vec![0.0; p];
    for k in (0..p).rev() {
        let r = current[k];
        pacf[k] = r;
        let denom = 1.0 - r * r;
        if denom <= 0.0 {
            break;
        }
        let previous: Vec<f64> = (0..k)
            .map(|j| (current[j] + r * current[k - 1 - j]) / denom)
            .collect();
        current = previous;
    }
    pacf
}

/// True when every root of `1 - sum(phi_i z^i)` lies outside the unit circle
pub fn is_stationary(coeffs: &[f64]) -> bool {
    coefficients_to_pacf(coeffs).iter().all(|r| r.abs() < 1.0)
}
