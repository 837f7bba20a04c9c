//! Deviation model: official minus central rate, fitted with ARMA and turned
//! into an adjusted rate series.

use super::arma::{ArmaEstimator, ArmaOrder, FittedArma};
use crate::currency::CurrencyPair;
use crate::error::Result;
use crate::types::{Rate, RateSeries};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One in-sample row of the deviation fit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdjustedRow {
    pub date: NaiveDate,
    pub central_rate: Rate,
    pub official_rate: Rate,
    /// `official - central`
    pub deviation: f64,
    /// In-sample fitted deviation (not an out-of-sample prediction)
    pub fitted_deviation: f64,
    /// `central + fitted_deviation`
    pub adjusted_rate: Rate,
    /// `official - adjusted`
    pub adjusted_error: f64,
}

/// Fits the deviation series of a currency pair
#[derive(Debug, Clone)]
pub struct DeviationModel {
    estimator: ArmaEstimator,
}

impl DeviationModel {
    pub fn new(estimator: ArmaEstimator) -> Self {
        Self { estimator }
    }

    pub fn order(&self) -> ArmaOrder {
        self.estimator.order()
    }

    pub fn fit(&self, series: &RateSeries) -> Result<DeviationFit> {
        let pair = series.pair();
        let deviations = series.deviations();
        let model = self.estimator.fit(&pair.to_string(), &deviations)?;

        let rows = series
            .observations()
            .iter()
            .zip(&deviations)
            .zip(model.fitted_values())
            .map(|((obs, &deviation), &fitted)| {
                let adjusted = obs.central_rate + fitted;
                AdjustedRow {
                    date: obs.date,
                    central_rate: obs.central_rate,
                    official_rate: obs.official_rate,
                    deviation,
                    fitted_deviation: fitted,
                    adjusted_rate: adjusted,
                    adjusted_error: obs.official_rate - adjusted,
                }
            })
            .collect();

        log::info!(
            "{}: fitted {} on {} observations (sigma2={:.3e})",
            pair,
            model.order(),
            model.nobs(),
            model.params().sigma2
        );

        Ok(DeviationFit { pair, rows, model })
    }
}

impl Default for DeviationModel {
    fn default() -> Self {
        Self::new(ArmaEstimator::new(ArmaOrder::default()))
    }
}

/// Deviation model fitted to one currency pair
#[derive(Debug, Clone)]
pub struct DeviationFit {
    pair: CurrencyPair,
    rows: Vec<AdjustedRow>,
    model: FittedArma,
}

impl DeviationFit {
    pub fn pair(&self) -> CurrencyPair {
        self.pair
    }

    pub fn rows(&self) -> &[AdjustedRow] {
        &self.rows
    }

    pub fn model(&self) -> &FittedArma {
        &self.model
    }

    /// `(date, adjusted_rate)` pairs
    pub fn adjusted_series(&self) -> Vec<(NaiveDate, Rate)> {
        self.rows.iter().map(|r| (r.date, r.adjusted_rate)).collect()
    }

    pub fn central_rates(&self) -> Vec<Rate> {
        self.rows.iter().map(|r| r.central_rate).collect()
    }

    pub fn last_row(&self) -> &AdjustedRow {
        // RateSeries is never empty, and fitted values align 1:1
        &self.rows[self.rows.len() - 1]
    }
}
