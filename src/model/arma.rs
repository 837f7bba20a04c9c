//! ARMA(p, 0, q) estimation by exact Gaussian maximum likelihood.
//!
//! The likelihood comes from the Kalman filter in [`super::kalman`]; the
//! innovation variance is concentrated out and the remaining parameters
//! (mean, AR, MA) are searched with Nelder–Mead over an unconstrained
//! reparameterisation that keeps the process stationary and invertible.
//! Estimation runs on a standardised copy of the series so that the
//! optimiser's tolerances do not depend on the scale of the rates.
//!
//! ## Example
//!
//! ```rust
//! use fx_deviation::model::{ArmaEstimator, ArmaOrder};
//!
//! let series: Vec<f64> = (0..60)
//!     .map(|i| 0.05 + 0.01 * ((i * 7919 % 101) as f64 / 101.0 - 0.5))
//!     .collect();
//! let model = ArmaEstimator::new(ArmaOrder::default()).fit("USD/MAD", &series).unwrap();
//! assert_eq!(model.fitted_values().len(), series.len());
//!
//! let forecast = model.forecast(20, 0.95).unwrap();
//! assert_eq!(forecast.len(), 20);
//! ```

use super::kalman::{ArmaStateSpace, FilterOutput};
use super::optimize::{nelder_mead, NelderMeadConfig};
use super::transform::{
    constrain_invertible, constrain_stationary, is_stationary, unconstrain_invertible,
    unconstrain_stationary,
};
use crate::error::{DashboardError, Result};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use std::fmt;

/// Largest AR or MA order accepted
pub const MAX_ORDER: usize = 5;

/// Relative standard deviation under which a series counts as constant
const DEGENERATE_SCALE: f64 = 1e-12;

/// Bound on the unconstrained coefficients; keeps |pacf| <= 0.9998
const MAX_UNCONSTRAINED: f64 = 50.0;

/// ARMA order `(p, 0, q)`; differencing is always zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArmaOrder {
    pub ar: usize,
    pub ma: usize,
}

impl ArmaOrder {
    pub fn new(ar: usize, ma: usize) -> Result<Self> {
        if ar > MAX_ORDER || ma > MAX_ORDER {
            return Err(DashboardError::ConfigError(format!(
                "ARMA order ({},0,{}) exceeds the maximum of {}",
                ar, ma, MAX_ORDER
            )));
        }
        Ok(Self { ar, ma })
    }

    /// Mean, AR and MA coefficients, innovation variance
    pub fn num_params(&self) -> usize {
        self.ar + self.ma + 2
    }
}

impl Default for ArmaOrder {
    fn default() -> Self {
        Self { ar: 1, ma: 1 }
    }
}

impl fmt::Display for ArmaOrder {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ARMA({},0,{})", self.ar, self.ma)
    }
}

/// Estimated parameters on the scale of the input series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArmaParams {
    pub mean: f64,
    pub ar: Vec<f64>,
    pub ma: Vec<f64>,
    /// Innovation variance
    pub sigma2: f64,
}

/// ARMA estimator with a fixed order
#[derive(Debug, Clone)]
pub struct ArmaEstimator {
    order: ArmaOrder,
    min_observations: usize,
    optimizer: NelderMeadConfig,
}

impl ArmaEstimator {
    pub fn new(order: ArmaOrder) -> Self {
        Self {
            order,
            min_observations: 30,
            optimizer: NelderMeadConfig::default(),
        }
    }

    pub fn with_min_observations(mut self, min_observations: usize) -> Self {
        self.min_observations = min_observations;
        self
    }

    pub fn with_optimizer(mut self, optimizer: NelderMeadConfig) -> Self {
        self.optimizer = optimizer;
        self
    }

    pub fn order(&self) -> ArmaOrder {
        self.order
    }

    /// Smallest series length accepted by [`fit`](Self::fit)
    pub fn required_observations(&self) -> usize {
        self.min_observations.max(self.order.num_params() + 1)
    }

    /// Fit the model to `series`; `label` names the series in errors and logs.
    pub fn fit(&self, label: &str, series: &[f64]) -> Result<FittedArma> {
        let required = self.required_observations();
        if series.len() < required {
            return Err(DashboardError::InsufficientData {
                series: label.to_string(),
                required,
                actual: series.len(),
            });
        }
        if let Some(idx) = series.iter().position(|x| !x.is_finite()) {
            return Err(DashboardError::ModelFit {
                series: label.to_string(),
                reason: format!("non-finite value at row {}", idx),
            });
        }

        let n = series.len() as f64;
        let sample_mean = series.iter().sum::<f64>() / n;
        let sample_std = (series.iter().map(|x| (x - sample_mean).powi(2)).sum::<f64>() / n).sqrt();

        if sample_std <= DEGENERATE_SCALE * sample_mean.abs().max(1.0) {
            log::debug!(
                "{}: constant deviation {:.6}, using zero-variance {}",
                label,
                sample_mean,
                self.order
            );
            let params = ArmaParams {
                mean: sample_mean,
                ar: vec![0.0; self.order.ar],
                ma: vec![0.0; self.order.ma],
                sigma2: 0.0,
            };
            return FittedArma::from_params(label, self.order, params, series, 0, true);
        }

        let standardized: Vec<f64> = series
            .iter()
            .map(|x| (x - sample_mean) / sample_std)
            .collect();

        let p = self.order.ar;
        let q = self.order.ma;
        let objective = |theta: &[f64]| -> f64 {
            if theta[1..].iter().any(|x| x.abs() > MAX_UNCONSTRAINED) {
                return f64::INFINITY;
            }
            let (mean, ar, ma) = split_unconstrained(theta, p, q);
            let ss = ArmaStateSpace::new(&ar, &ma);
            match ss.filter(&standardized, mean) {
                Some(out) => -out.concentrated_log_likelihood() / standardized.len() as f64,
                None => f64::INFINITY,
            }
        };

        let start = self.initial_point(&standardized);
        let mut result = nelder_mead(&objective, &start, &self.optimizer);
        let mut iterations = result.iterations;
        if !result.converged && result.optimal_value.is_finite() {
            log::debug!("{}: restarting simplex after {} iterations", label, iterations);
            result = nelder_mead(&objective, &result.optimal_point, &self.optimizer);
            iterations += result.iterations;
        }

        if !result.optimal_value.is_finite() {
            return Err(DashboardError::ModelFit {
                series: label.to_string(),
                reason: "likelihood is not finite at any trial point".to_string(),
            });
        }
        if !result.converged {
            return Err(DashboardError::ModelFit {
                series: label.to_string(),
                reason: format!("optimizer did not converge after {} iterations", iterations),
            });
        }

        let (mean_z, ar, ma) = split_unconstrained(&result.optimal_point, p, q);
        let params = ArmaParams {
            mean: sample_mean + sample_std * mean_z,
            ar,
            ma,
            sigma2: 0.0,
        };
        log::debug!(
            "{}: {} converged in {} iterations (ar={:?}, ma={:?})",
            label,
            self.order,
            iterations,
            params.ar,
            params.ma
        );
        FittedArma::from_params(label, self.order, params, series, iterations, false)
    }

    /// Mean zero, AR from the lag-one autocorrelation, MA zero
    fn initial_point(&self, standardized: &[f64]) -> Vec<f64> {
        let n = standardized.len();
        let lag1 = standardized
            .windows(2)
            .map(|w| w[0] * w[1])
            .sum::<f64>()
            / n as f64;
        let mut ar = vec![0.0; self.order.ar];
        if let Some(first) = ar.first_mut() {
            *first = lag1.clamp(-0.9, 0.9);
        }
        let ma = vec![0.0; self.order.ma];

        let mut point = Vec::with_capacity(1 + ar.len() + ma.len());
        point.push(0.0);
        point.extend(unconstrain_stationary(&ar));
        point.extend(unconstrain_invertible(&ma));
        point
    }
}

fn split_unconstrained(theta: &[f64], p: usize, q: usize) -> (f64, Vec<f64>, Vec<f64>) {
    let ar = constrain_stationary(&theta[1..1 + p]);
    let ma = constrain_invertible(&theta[1 + p..1 + p + q]);
    (theta[0], ar, ma)
}

/// A fitted ARMA model.
///
/// [`fitted_values`](Self::fitted_values) are in-sample one-step predictions
/// made with parameters estimated from the whole sample; they describe how
/// well the model explains the past. Genuine out-of-sample values come only
/// from [`forecast`](Self::forecast).
#[derive(Debug, Clone)]
pub struct FittedArma {
    label: String,
    order: ArmaOrder,
    params: ArmaParams,
    fitted: Vec<f64>,
    residuals: Vec<f64>,
    log_likelihood: f64,
    iterations: usize,
    degenerate: bool,
    state_space: ArmaStateSpace,
    next_state: Vec<f64>,
    next_cov: Vec<f64>,
}

impl FittedArma {
    fn from_params(
        label: &str,
        order: ArmaOrder,
        mut params: ArmaParams,
        series: &[f64],
        iterations: usize,
        degenerate: bool,
    ) -> Result<Self> {
        let state_space = ArmaStateSpace::new(&params.ar, &params.ma);
        let FilterOutput {
            predictions,
            innovations,
            sum_scaled_sq,
            sum_log_f,
            next_state,
            next_cov,
        } = state_space
            .filter(series, params.mean)
            .ok_or_else(|| DashboardError::ModelFit {
                series: label.to_string(),
                reason: "Kalman filter failed at the estimated parameters".to_string(),
            })?;

        let n = series.len() as f64;
        params.sigma2 = if degenerate { 0.0 } else { sum_scaled_sq / n };
        let log_likelihood = if degenerate {
            f64::INFINITY
        } else {
            -0.5 * n * ((2.0 * std::f64::consts::PI).ln() + 1.0 + params.sigma2.ln())
                - 0.5 * sum_log_f
        };

        Ok(Self {
            label: label.to_string(),
            order,
            params,
            fitted: predictions,
            residuals: innovations,
            log_likelihood,
            iterations,
            degenerate,
            state_space,
            next_state,
            next_cov,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn order(&self) -> ArmaOrder {
        self.order
    }

    pub fn params(&self) -> &ArmaParams {
        &self.params
    }

    /// In-sample fitted values, aligned 1:1 with the input series
    pub fn fitted_values(&self) -> &[f64] {
        &self.fitted
    }

    /// Input minus fitted value, per row
    pub fn residuals(&self) -> &[f64] {
        &self.residuals
    }

    pub fn nobs(&self) -> usize {
        self.fitted.len()
    }

    /// Optimiser iterations spent (zero for a constant series)
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// True when the series was constant and the model has zero innovation variance
    pub fn is_degenerate(&self) -> bool {
        self.degenerate
    }

    /// Exact Gaussian log-likelihood (`+inf` for a constant series)
    pub fn log_likelihood(&self) -> f64 {
        self.log_likelihood
    }

    pub fn aic(&self) -> f64 {
        -2.0 * self.log_likelihood + 2.0 * self.order.num_params() as f64
    }

    pub fn bic(&self) -> f64 {
        -2.0 * self.log_likelihood + self.order.num_params() as f64 * (self.nobs() as f64).ln()
    }

    /// Forecast `horizon` steps beyond the sample with `level` confidence bounds.
    ///
    /// Bounds assume Gaussian innovations:
    /// `mean ± z_{(1+level)/2} * sqrt(sigma2 * F_h)`.
    pub fn forecast(&self, horizon: usize, level: f64) -> Result<DeviationForecast> {
        if !(level > 0.0 && level < 1.0) {
            return Err(DashboardError::Forecast(format!(
                "confidence level must be in (0, 1), got {}",
                level
            )));
        }
        if !is_stationary(&self.params.ar)
            || self.next_state.iter().chain(&self.next_cov).any(|x| !x.is_finite())
        {
            return Err(DashboardError::Forecast(format!(
                "model for {} is not usable for forecasting",
                self.label
            )));
        }

        let normal = Normal::new(0.0, 1.0)
            .map_err(|e| DashboardError::Forecast(format!("normal distribution: {}", e)))?;
        let z = normal.inverse_cdf((1.0 + level) / 2.0);

        let path = self
            .state_space
            .project(&self.next_state, &self.next_cov, self.params.mean, horizon);

        let mut forecast = DeviationForecast {
            level,
            mean: Vec::with_capacity(horizon),
            std_errors: Vec::with_capacity(horizon),
            lower: Vec::with_capacity(horizon),
            upper: Vec::with_capacity(horizon),
        };
        for (mean, scaled_var) in path {
            let se = (self.params.sigma2 * scaled_var).max(0.0).sqrt();
            forecast.mean.push(mean);
            forecast.std_errors.push(se);
            forecast.lower.push(mean - z * se);
            forecast.upper.push(mean + z * se);
        }
        Ok(forecast)
    }
}

/// Out-of-sample forecast of the modelled series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviationForecast {
    pub level: f64,
    pub mean: Vec<f64>,
    pub std_errors: Vec<f64>,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

impl DeviationForecast {
    pub fn len(&self) -> usize {
        self.mean.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }

    /// Upper minus lower, per step
    pub fn widths(&self) -> Vec<f64> {
        self.upper.iter().zip(&self.lower).map(|(u, l)| u - l).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::testing::simulate_arma;
    use approx::assert_abs_diff_eq;

    fn wavy(n: usize) -> Vec<f64> {
        simulate_arma(n, 0.05, 0.6, 0.3, 0.01, 7)
    }

    #[test]
    fn test_order_display_and_limits() {
        assert_eq!(ArmaOrder::default().to_string(), "ARMA(1,0,1)");
        assert_eq!(ArmaOrder::default().num_params(), 4);
        assert!(ArmaOrder::new(6, 1).is_err());
        assert!(ArmaOrder::new(2, 2).is_ok());
    }

    #[test]
    fn test_insufficient_data() {
        let estimator = ArmaEstimator::new(ArmaOrder::default());
        let result = estimator.fit("short", &wavy(10));
        assert!(matches!(
            result,
            Err(DashboardError::InsufficientData {
                required: 30,
                actual: 10,
                ..
            })
        ));
    }

    #[test]
    fn test_nan_rejected() {
        let mut data = wavy(40);
        data[17] = f64::NAN;
        let result = ArmaEstimator::new(ArmaOrder::default()).fit("gappy", &data);
        match result {
            Err(DashboardError::ModelFit { series, reason }) => {
                assert_eq!(series, "gappy");
                assert!(reason.contains("17"));
            }
            other => panic!("expected ModelFit, got {:?}", other.map(|m| m.nobs())),
        }
    }

    #[test]
    fn test_constant_series_is_degenerate_fit() {
        let data = vec![0.05; 50];
        let model = ArmaEstimator::new(ArmaOrder::default())
            .fit("constant", &data)
            .unwrap();

        assert!(model.is_degenerate());
        assert_eq!(model.params().sigma2, 0.0);
        for value in model.fitted_values() {
            assert_abs_diff_eq!(*value, 0.05, epsilon = 1e-12);
        }

        let forecast = model.forecast(5, 0.95).unwrap();
        for i in 0..5 {
            assert_abs_diff_eq!(forecast.mean[i], 0.05, epsilon = 1e-12);
            assert_abs_diff_eq!(forecast.lower[i], forecast.upper[i], epsilon = 1e-15);
        }
    }

    #[test]
    fn test_fit_shapes_and_criteria() {
        let data = wavy(80);
        let model = ArmaEstimator::new(ArmaOrder::default())
            .fit("wavy", &data)
            .unwrap();

        assert_eq!(model.fitted_values().len(), 80);
        assert_eq!(model.residuals().len(), 80);
        assert_eq!(model.params().ar.len(), 1);
        assert_eq!(model.params().ma.len(), 1);
        assert!(model.params().ar[0].abs() < 1.0);
        assert!(model.params().ma[0].abs() < 1.0);
        assert!(model.params().sigma2 > 0.0);
        assert!(model.log_likelihood().is_finite());
        assert!(model.bic() > model.aic());

        for ((y, f), r) in data.iter().zip(model.fitted_values()).zip(model.residuals()) {
            assert_abs_diff_eq!(y - f, *r, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_forecast_bounds() {
        let model = ArmaEstimator::new(ArmaOrder::default())
            .fit("wavy", &wavy(80))
            .unwrap();
        let forecast = model.forecast(20, 0.95).unwrap();

        assert_eq!(forecast.len(), 20);
        for i in 0..20 {
            assert!(forecast.lower[i] < forecast.mean[i]);
            assert!(forecast.mean[i] < forecast.upper[i]);
            let half = 1.959964 * forecast.std_errors[i];
            assert_abs_diff_eq!(forecast.upper[i] - forecast.mean[i], half, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_forecast_rejects_bad_level() {
        let model = ArmaEstimator::new(ArmaOrder::default())
            .fit("wavy", &wavy(80))
            .unwrap();
        assert!(matches!(model.forecast(5, 1.5), Err(DashboardError::Forecast(_))));
        assert!(matches!(model.forecast(5, 0.0), Err(DashboardError::Forecast(_))));
    }

    #[test]
    fn test_zero_horizon() {
        let model = ArmaEstimator::new(ArmaOrder::default())
            .fit("wavy", &wavy(80))
            .unwrap();
        assert!(model.forecast(0, 0.95).unwrap().is_empty());
    }

    #[test]
    fn test_white_noise_order() {
        let model = ArmaEstimator::new(ArmaOrder::new(0, 0).unwrap())
            .fit("wavy", &wavy(60))
            .unwrap();
        let data = wavy(60);
        let mean = data.iter().sum::<f64>() / 60.0;

        assert_abs_diff_eq!(model.params().mean, mean, epsilon = 1e-6);
        assert!(model.fitted_values().iter().all(|f| (f - model.params().mean).abs() < 1e-12));
    }
}
