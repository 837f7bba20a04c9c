//! State-space form of a zero-differencing ARMA process and its Kalman filter.
//!
//! With `r = max(p, q + 1)` the process `y_t - mu` is the first element of
//! a state vector evolving as `alpha_{t+1} = T alpha_t + R eps_{t+1}`, where
//! `T` carries the AR coefficients in its first column and ones on the
//! superdiagonal, and `R = (1, theta_1, ..., theta_{r-1})`. All covariances
//! here are scaled by the innovation variance, which is concentrated out of
//! the likelihood.

use std::f64::consts::PI;

/// Companion-form system matrices for ARMA(p, 0, q)
#[derive(Debug, Clone)]
pub struct ArmaStateSpace {
    dim: usize,
    /// Row-major `dim x dim`
    transition: Vec<f64>,
    selection: Vec<f64>,
}

impl ArmaStateSpace {
    pub fn new(ar: &[f64], ma: &[f64]) -> Self {
        let dim = ar.len().max(ma.len() + 1);
        let mut transition = vec![0.0; dim * dim];
        for (i, phi) in ar.iter().enumerate() {
            transition[i * dim] = *phi;
        }
        for i in 0..dim - 1 {
            transition[i * dim + i + 1] = 1.0;
        }
        let mut selection = vec![0.0; dim];
        selection[0] = 1.0;
        for (j, theta) in ma.iter().enumerate() {
            selection[j + 1] = *theta;
        }
        Self {
            dim,
            transition,
            selection,
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    fn transition_times(&self, state: &[f64]) -> Vec<f64> {
        let n = self.dim;
        (0..n)
            .map(|i| (0..n).map(|k| self.transition[i * n + k] * state[k]).sum())
            .collect()
    }

    /// `T P T' + R R'`
    fn propagate_covariance(&self, cov: &[f64]) -> Vec<f64> {
        let n = self.dim;
        let t = &self.transition;
        let mut tp = vec![0.0; n * n];
        for i in 0..n {
            for j in 0..n {
                tp[i * n + j] = (0..n).map(|k| t[i * n + k] * cov[k * n + j]).sum();
            }
        }
        let mut out = vec![0.0; n * n];
        for i in 0..n {
            for j in 0..n {
                let tpt: f64 = (0..n).map(|k| tp[i * n + k] * t[j * n + k]).sum();
                out[i * n + j] = tpt + self.selection[i] * self.selection[j];
            }
        }
        out
    }

    /// Unconditional state covariance: the solution of `P = T P T' + R R'`.
    ///
    /// Solved with the doubling iteration `P <- P + A P A'`, `A <- A^2`, which
    /// converges for stationary `T`. Returns `None` if it fails to settle.
    pub fn stationary_covariance(&self) -> Option<Vec<f64>> {
        let n = self.dim;
        let mut p: Vec<f64> = (0..n * n)
            .map(|idx| self.selection[idx / n] * self.selection[idx % n])
            .collect();
        let mut a = self.transition.clone();

        for _ in 0..64 {
            let mut ap = vec![0.0; n * n];
            for i in 0..n {
                for j in 0..n {
                    ap[i * n + j] = (0..n).map(|k| a[i * n + k] * p[k * n + j]).sum();
                }
            }
            let mut delta_max = 0.0_f64;
            let mut scale = 0.0_f64;
            let mut next = vec![0.0; n * n];
            for i in 0..n {
                for j in 0..n {
                    let apa: f64 = (0..n).map(|k| ap[i * n + k] * a[j * n + k]).sum();
                    next[i * n + j] = p[i * n + j] + apa;
                    delta_max = delta_max.max(apa.abs());
                    scale = scale.max(next[i * n + j].abs());
                }
            }
            p = next;
            if !scale.is_finite() {
                return None;
            }
            if delta_max <= 1e-15 * scale.max(1.0) {
                return Some(p);
            }
            let mut squared = vec![0.0; n * n];
            for i in 0..n {
                for j in 0..n {
                    squared[i * n + j] = (0..n).map(|k| a[i * n + k] * a[k * n + j]).sum();
                }
            }
            a = squared;
        }
        None
    }

    /// Run the filter over `observations` (already demeaned by the caller's `mean`)
    pub fn filter(&self, observations: &[f64], mean: f64) -> Option<FilterOutput> {
        let n = self.dim;
        let mut state = vec![0.0; n];
        let mut cov = self.stationary_covariance()?;

        let mut predictions = Vec::with_capacity(observations.len());
        let mut innovations = Vec::with_capacity(observations.len());
        let mut sum_scaled_sq = 0.0;
        let mut sum_log_f = 0.0;

        for &y in observations {
            let prediction = mean + state[0];
            let innovation = y - prediction;
            let f = cov[0];
            if !(f.is_finite() && f > 0.0) {
                return None;
            }

            predictions.push(prediction);
            innovations.push(innovation);
            sum_scaled_sq += innovation * innovation / f;
            sum_log_f += f.ln();

            // Measurement update
            let gain: Vec<f64> = (0..n).map(|i| cov[i * n] / f).collect();
            let updated_state: Vec<f64> = (0..n).map(|i| state[i] + gain[i] * innovation).collect();
            let mut updated_cov = cov.clone();
            for i in 0..n {
                for j in 0..n {
                    updated_cov[i * n + j] -= gain[i] * cov[j];
                }
            }

            // Time update
            state = self.transition_times(&updated_state);
            cov = self.propagate_covariance(&updated_cov);
        }

        Some(FilterOutput {
            predictions,
            innovations,
            sum_scaled_sq,
            sum_log_f,
            next_state: state,
            next_cov: cov,
        })
    }

    /// Project the predicted state `steps` periods ahead.
    ///
    /// Returns `(mean, scaled_variance)` pairs; multiply the variance by the
    /// innovation variance to get the forecast-error variance.
    pub fn project(
        &self,
        state: &[f64],
        cov: &[f64],
        mean: f64,
        steps: usize,
    ) -> Vec<(f64, f64)> {
        let mut state = state.to_vec();
        let mut cov = cov.to_vec();
        let mut out = Vec::with_capacity(steps);
        for _ in 0..steps {
            out.push((mean + state[0], cov[0]));
            state = self.transition_times(&state);
            cov = self.propagate_covariance(&cov);
        }
        out
    }
}

/// Result of one filtering pass
#[derive(Debug, Clone)]
pub struct FilterOutput {
    /// One-step predictions `E[y_t | y_1..y_{t-1}]`
    pub predictions: Vec<f64>,
    pub innovations: Vec<f64>,
    /// `sum(v_t^2 / F_t)`
    pub sum_scaled_sq: f64,
    /// `sum(ln F_t)`
    pub sum_log_f: f64,
    /// State prediction for the period after the sample
    pub next_state: Vec<f64>,
    pub next_cov: Vec<f64>,
}

impl FilterOutput {
    /// Maximum-likelihood innovation variance
    pub fn sigma2(&self) -> f64 {
        self.sum_scaled_sq / self.predictions.len() as f64
    }

    /// Gaussian log-likelihood with the innovation variance concentrated out
    pub fn concentrated_log_likelihood(&self) -> f64 {
        let n = self.predictions.len() as f64;
        -0.5 * n * ((2.0 * PI).ln() + 1.0 + self.sigma2().ln()) - 0.5 * self.sum_log_f
    }
}
