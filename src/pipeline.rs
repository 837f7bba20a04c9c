//! Dashboard pipeline
//!
//! One run recomputes everything from the loaded input:
//!
//! 1. per pair, fit the deviation model and build the comparison table
//!    (adjusted rate, post-adjustment error, fluctuation band);
//! 2. per pair, forecast the next business days;
//! 3. simulate the basket from the two adjusted series.
//!
//! Failures are isolated per panel. A pair whose model cannot be fitted
//! loses its comparison, forecast and the basket; the other pair is
//! unaffected. A forecast failure only removes that pair's forecast.

use crate::band::{fluctuation_bands, Band};
use crate::basket::{simulate_basket, AlignmentPolicy, BasketRow};
use crate::config::{DashboardConfig, DashboardParams};
use crate::currency::CurrencyPair;
use crate::data::{load_input, open_workbook, DashboardInput};
use crate::error::{DashboardError, Result};
use crate::forecast::RateForecast;
use crate::model::{DeviationFit, DeviationModel, FittedArma};
use crate::types::{Rate, RateSeries};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One row of the central / official / adjusted comparison
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub date: NaiveDate,
    pub central_rate: Rate,
    pub official_rate: Rate,
    pub fitted_deviation: f64,
    pub adjusted_rate: Rate,
    pub adjusted_error: f64,
    pub band_lower: Rate,
    pub band_upper: Rate,
}

/// Estimated model, flattened for reporting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub order: String,
    pub nobs: usize,
    pub mean: f64,
    pub ar: Vec<f64>,
    pub ma: Vec<f64>,
    pub sigma2: f64,
    /// `None` for a constant series, whose likelihood is unbounded
    pub log_likelihood: Option<f64>,
    pub aic: Option<f64>,
    pub bic: Option<f64>,
    pub iterations: usize,
    pub degenerate: bool,
}

impl From<&FittedArma> for ModelSummary {
    fn from(model: &FittedArma) -> Self {
        let finite = |x: f64| Some(x).filter(|v| v.is_finite());
        let params = model.params();
        Self {
            order: model.order().to_string(),
            nobs: model.nobs(),
            mean: params.mean,
            ar: params.ar.clone(),
            ma: params.ma.clone(),
            sigma2: params.sigma2,
            log_likelihood: finite(model.log_likelihood()),
            aic: finite(model.aic()),
            bic: finite(model.bic()),
            iterations: model.iterations(),
            degenerate: model.is_degenerate(),
        }
    }
}

/// Everything computed for a pair with a fitted model
#[derive(Debug)]
pub struct PairPanel {
    pub fit: DeviationFit,
    pub comparison: Vec<ComparisonRow>,
    pub summary: ModelSummary,
    pub forecast: Result<RateForecast>,
}

/// Outcome for one currency pair
#[derive(Debug)]
pub struct PairReport {
    pub pair: CurrencyPair,
    pub panel: Result<PairPanel>,
}

impl PairReport {
    pub fn is_ok(&self) -> bool {
        self.panel.is_ok()
    }

    fn adjusted_series(&self) -> Option<Vec<(NaiveDate, Rate)>> {
        self.panel.as_ref().ok().map(|p| p.fit.adjusted_series())
    }
}

/// Result of one dashboard run
#[derive(Debug)]
pub struct DashboardReport {
    /// Parameters after clamping, as used by the run
    pub params: DashboardParams,
    pub alignment: AlignmentPolicy,
    pub pair_a: PairReport,
    pub pair_b: PairReport,
    pub basket: Result<Vec<BasketRow>>,
}

impl DashboardReport {
    pub fn pairs(&self) -> [&PairReport; 2] {
        [&self.pair_a, &self.pair_b]
    }

    /// Number of panels that failed
    pub fn failed_panels(&self) -> usize {
        let pair_failures: usize = self
            .pairs()
            .iter()
            .map(|p| match &p.panel {
                Err(_) => 2,
                Ok(panel) => usize::from(panel.forecast.is_err()),
            })
            .sum();
        pair_failures + usize::from(self.basket.is_err())
    }
}

/// Runs the pipeline with a fixed configuration
#[derive(Debug, Clone)]
pub struct Dashboard {
    config: DashboardConfig,
    model: DeviationModel,
}

impl Dashboard {
    /// Fails only when the estimator settings are invalid; a bad horizon or
    /// confidence level surfaces in each pair's forecast panel instead.
    pub fn new(config: DashboardConfig) -> Result<Self> {
        let model = config.model.deviation_model()?;
        Ok(Self { config, model })
    }

    fn forecast(&self, fit: &DeviationFit) -> Result<RateForecast> {
        self.config.model.forecaster()?.forecast(fit)
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    /// Run with `params`, clamped into range first
    pub fn run(&self, input: &DashboardInput, params: &DashboardParams) -> Result<DashboardReport> {
        let params = params.clamped();
        let scenario = params.scenario()?;
        log::info!(
            "running dashboard: band={}%, shock_a={}%, shock_b={}%, weight_a={}",
            params.band_pct,
            params.shock_a_pct,
            params.shock_b_pct,
            params.weight_a
        );

        let pair_a = self.pair_report(&input.pair_a, params.band_fraction());
        let pair_b = self.pair_report(&input.pair_b, params.band_fraction());

        let basket = match (pair_a.adjusted_series(), pair_b.adjusted_series()) {
            (Some(a), Some(b)) => Ok(simulate_basket(
                &a,
                &b,
                &input.reference,
                &scenario,
                self.config.alignment,
            )),
            _ => {
                let missing: Vec<String> = [&pair_a, &pair_b]
                    .iter()
                    .filter(|p| !p.is_ok())
                    .map(|p| p.pair.to_string())
                    .collect();
                log::warn!("basket skipped: no adjusted series for {}", missing.join(", "));
                Err(DashboardError::ModelFit {
                    series: "basket".to_string(),
                    reason: format!("no adjusted series for {}", missing.join(", ")),
                })
            }
        };

        Ok(DashboardReport {
            params,
            alignment: self.config.alignment,
            pair_a,
            pair_b,
            basket,
        })
    }

    fn pair_report(&self, series: &RateSeries, band_fraction: f64) -> PairReport {
        let pair = series.pair();
        let panel = self.pair_panel(series, band_fraction);
        if let Err(e) = &panel {
            log::warn!("{}: {}", pair, e);
        }
        PairReport { pair, panel }
    }

    fn pair_panel(&self, series: &RateSeries, band_fraction: f64) -> Result<PairPanel> {
        let fit = self.model.fit(series)?;
        let bands = fluctuation_bands(&fit.central_rates(), band_fraction)?;
        let comparison = comparison_rows(&fit, &bands);
        let summary = ModelSummary::from(fit.model());

        let forecast = self.forecast(&fit);
        if let Err(e) = &forecast {
            log::warn!("{}: forecast unavailable: {}", fit.pair(), e);
        }

        Ok(PairPanel {
            fit,
            comparison,
            summary,
            forecast,
        })
    }
}

fn comparison_rows(fit: &DeviationFit, bands: &[Band]) -> Vec<ComparisonRow> {
    fit.rows()
        .iter()
        .zip(bands)
        .map(|(row, band)| ComparisonRow {
            date: row.date,
            central_rate: row.central_rate,
            official_rate: row.official_rate,
            fitted_deviation: row.fitted_deviation,
            adjusted_rate: row.adjusted_rate,
            adjusted_error: row.adjusted_error,
            band_lower: band.lower,
            band_upper: band.upper,
        })
        .collect()
}

/// Open the workbook at `path`, load it with the configured layout and run.
/// Input problems are returned before any model is fitted.
pub fn load_and_run<P: AsRef<Path>>(
    path: P,
    config: DashboardConfig,
    params: &DashboardParams,
) -> Result<DashboardReport> {
    let dashboard = Dashboard::new(config)?;
    let mut workbook = open_workbook(path)?;
    let input = load_input(workbook.as_mut(), &dashboard.config().layout)?;
    dashboard.run(&input, params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::currency::Currency;
    use crate::model::testing::simulate_arma;
    use crate::types::{RateObservation, ReferenceObservation, ReferenceSeries};
    use approx::assert_abs_diff_eq;
    use chrono::Duration;

    fn series(pair: CurrencyPair, base: f64, deviations: &[f64]) -> RateSeries {
        let start = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let observations = deviations
            .iter()
            .enumerate()
            .map(|(i, d)| {
                let central = base + 0.001 * (i % 7) as f64;
                RateObservation::new(start + Duration::days(i as i64), central, central + d)
            })
            .collect();
        RateSeries::new(pair, observations).unwrap()
    }

    fn input(deviations_a: &[f64], deviations_b: &[f64]) -> DashboardInput {
        let pair_a = series(CurrencyPair::new(Currency::USD, Currency::MAD), 10.0, deviations_a);
        let pair_b = series(CurrencyPair::new(Currency::EUR, Currency::MAD), 10.9, deviations_b);
        let reference = ReferenceSeries::new(
            pair_a
                .dates()
                .into_iter()
                .map(|date| ReferenceObservation {
                    date,
                    cross_rate: None,
                })
                .collect(),
        )
        .unwrap();
        DashboardInput {
            pair_a,
            pair_b,
            reference,
        }
    }

    #[test]
    fn test_full_run() {
        let input = input(
            &simulate_arma(80, 0.04, 0.6, 0.2, 0.01, 1),
            &simulate_arma(80, -0.02, 0.4, 0.3, 0.01, 2),
        );
        let dashboard = Dashboard::new(DashboardConfig::default()).unwrap();
        let report = dashboard.run(&input, &DashboardParams::default()).unwrap();

        assert_eq!(report.failed_panels(), 0);
        let panel = report.pair_a.panel.as_ref().unwrap();
        assert_eq!(panel.comparison.len(), 80);
        assert_eq!(panel.forecast.as_ref().unwrap().rows.len(), 20);
        for row in &panel.comparison {
            assert_abs_diff_eq!(row.band_lower, row.central_rate * 0.95, epsilon = 1e-12);
            assert_abs_diff_eq!(row.band_upper, row.central_rate * 1.05, epsilon = 1e-12);
        }

        let basket = report.basket.as_ref().unwrap();
        assert_eq!(basket.len(), 80);
        let a = &report.pair_a.panel.as_ref().unwrap().comparison[0];
        let b = &report.pair_b.panel.as_ref().unwrap().comparison[0];
        assert_abs_diff_eq!(
            basket[0].basket_value,
            0.4 * a.adjusted_rate + 0.6 * b.adjusted_rate,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_failed_pair_is_isolated() {
        let mut broken = simulate_arma(80, -0.02, 0.4, 0.3, 0.01, 2);
        broken[40] = f64::NAN;
        let input = input(&simulate_arma(80, 0.04, 0.6, 0.2, 0.01, 1), &broken);

        let report = Dashboard::new(DashboardConfig::default())
            .unwrap()
            .run(&input, &DashboardParams::default())
            .unwrap();

        assert!(report.pair_a.is_ok());
        assert!(report.pair_a.panel.as_ref().unwrap().forecast.is_ok());
        let err = report.pair_b.panel.as_ref().unwrap_err();
        assert!(err.is_model_fit_error());
        assert!(report.basket.is_err());
        assert_eq!(report.failed_panels(), 3);
    }

    #[test]
    fn test_params_are_clamped() {
        let input = input(&[0.05; 40], &[0.03; 40]);
        let params = DashboardParams {
            band_pct: 50.0,
            shock_a_pct: 25.0,
            shock_b_pct: 0.0,
            weight_a: 0.4,
        };
        let report = Dashboard::new(DashboardConfig::default())
            .unwrap()
            .run(&input, &params)
            .unwrap();

        assert_eq!(report.params.band_pct, 20.0);
        assert_eq!(report.params.shock_a_pct, 10.0);
        let row = &report.pair_a.panel.as_ref().unwrap().comparison[0];
        assert_abs_diff_eq!(row.band_upper, row.central_rate * 1.2, epsilon = 1e-12);
    }

    #[test]
    fn test_summary_of_constant_series() {
        let input = input(&[0.05; 40], &[0.03; 40]);
        let report = Dashboard::new(DashboardConfig::default())
            .unwrap()
            .run(&input, &DashboardParams::default())
            .unwrap();

        let summary = &report.pair_a.panel.as_ref().unwrap().summary;
        assert!(summary.degenerate);
        assert_eq!(summary.sigma2, 0.0);
        assert!(summary.log_likelihood.is_none());
        assert_eq!(summary.order, "ARMA(1,0,1)");
    }

    #[test]
    fn test_invalid_forecast_settings_only_fail_forecasts() {
        let input = input(
            &simulate_arma(80, 0.04, 0.6, 0.2, 0.01, 1),
            &simulate_arma(80, -0.02, 0.4, 0.3, 0.01, 2),
        );
        for (horizon, level) in [(0, 0.95), (20, 1.0), (20, 0.0)] {
            let mut config = DashboardConfig::default();
            config.model.horizon = horizon;
            config.model.confidence_level = level;
            let report = Dashboard::new(config)
                .unwrap()
                .run(&input, &DashboardParams::default())
                .unwrap();

            assert_eq!(report.failed_panels(), 2);
            for pair in report.pairs() {
                let panel = pair.panel.as_ref().unwrap();
                assert_eq!(panel.comparison.len(), 80);
                assert!(matches!(panel.forecast, Err(DashboardError::Forecast(_))));
            }
            assert_eq!(report.basket.as_ref().unwrap().len(), 80);
        }
    }

    #[test]
    fn test_invalid_order_rejected() {
        let mut config = DashboardConfig::default();
        config.model.ar_order = 9;
        assert!(matches!(Dashboard::new(config), Err(DashboardError::ConfigError(_))));
    }
}
