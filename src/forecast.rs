//! Business-day forecasts of the deviation, translated into rate space

use crate::calendar::{TradingCalendar, WeekdayCalendar};
use crate::currency::CurrencyPair;
use crate::error::{DashboardError, Result};
use crate::model::DeviationFit;
use crate::types::Rate;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One future business day
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastRow {
    pub date: NaiveDate,
    pub predicted_deviation: f64,
    /// `last_central + predicted_deviation`
    pub predicted_rate: Rate,
    pub lower_bound: Rate,
    pub upper_bound: Rate,
}

/// Forecast for one currency pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateForecast {
    pub pair: CurrencyPair,
    pub last_date: NaiveDate,
    /// Central rate held flat over the horizon
    pub last_central: Rate,
    pub level: f64,
    pub rows: Vec<ForecastRow>,
}

impl RateForecast {
    /// Interval width per step
    pub fn widths(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.upper_bound - r.lower_bound).collect()
    }
}

/// Extends fitted deviation models over the next business days
#[derive(Clone)]
pub struct Forecaster {
    calendar: Arc<dyn TradingCalendar>,
    horizon: usize,
    level: f64,
}

impl Forecaster {
    pub fn new(calendar: Arc<dyn TradingCalendar>, horizon: usize, level: f64) -> Result<Self> {
        if horizon == 0 {
            return Err(DashboardError::Forecast(
                "forecast horizon must be at least one day".to_string(),
            ));
        }
        if !(level > 0.0 && level < 1.0) {
            return Err(DashboardError::Forecast(format!(
                "confidence level must be in (0, 1), got {}",
                level
            )));
        }
        Ok(Self {
            calendar,
            horizon,
            level,
        })
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    pub fn level(&self) -> f64 {
        self.level
    }

    pub fn forecast(&self, fit: &DeviationFit) -> Result<RateForecast> {
        let last = fit.last_row();
        let dates = self.calendar.trading_days_after(last.date, self.horizon)?;
        let deviation = fit.model().forecast(self.horizon, self.level)?;

        let rows = dates
            .into_iter()
            .enumerate()
            .map(|(i, date)| ForecastRow {
                date,
                predicted_deviation: deviation.mean[i],
                predicted_rate: last.central_rate + deviation.mean[i],
                lower_bound: last.central_rate + deviation.lower[i],
                upper_bound: last.central_rate + deviation.upper[i],
            })
            .collect::<Vec<_>>();

        if let (Some(first), Some(end)) = (rows.first(), rows.last()) {
            log::info!(
                "{}: forecast {} business days, {} to {}",
                fit.pair(),
                rows.len(),
                first.date,
                end.date
            );
        }

        Ok(RateForecast {
            pair: fit.pair(),
            last_date: last.date,
            last_central: last.central_rate,
            level: self.level,
            rows,
        })
    }
}

impl Default for Forecaster {
    fn default() -> Self {
        Self {
            calendar: Arc::new(WeekdayCalendar::new()),
            horizon: 20,
            level: 0.95,
        }
    }
}

impl std::fmt::Debug for Forecaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Forecaster")
            .field("horizon", &self.horizon)
            .field("level", &self.level)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::currency::Currency;
    use crate::model::testing::simulate_arma;
    use crate::model::DeviationModel;
    use crate::types::{RateObservation, RateSeries};
    use approx::assert_abs_diff_eq;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Business-day series ending on Friday 2025-01-10
    fn series(deviations: &[f64]) -> RateSeries {
        let calendar = WeekdayCalendar::new();
        let end = ymd(2025, 1, 10);
        let mut dates = calendar.trading_days_between(ymd(2024, 1, 1), end);
        let dates = dates.split_off(dates.len() - deviations.len());
        let observations = dates
            .into_iter()
            .zip(deviations)
            .map(|(date, d)| RateObservation::new(date, 10.0, 10.0 + d))
            .collect();
        RateSeries::new(CurrencyPair::new(Currency::EUR, Currency::MAD), observations).unwrap()
    }

    #[test]
    fn test_future_dates_skip_weekend() {
        let fit = DeviationModel::default()
            .fit(&series(&simulate_arma(80, 0.02, 0.5, 0.2, 0.01, 5)))
            .unwrap();
        let forecast = Forecaster::default().forecast(&fit).unwrap();

        assert_eq!(forecast.rows.len(), 20);
        assert_eq!(forecast.last_date, ymd(2025, 1, 10));
        assert_eq!(forecast.rows[0].date, ymd(2025, 1, 13));
        assert_eq!(forecast.rows[1].date, ymd(2025, 1, 14));
        assert_eq!(forecast.rows[2].date, ymd(2025, 1, 15));
        assert_eq!(forecast.rows[19].date, ymd(2025, 2, 7));
    }

    #[test]
    fn test_rates_offset_by_last_central() {
        let fit = DeviationModel::default()
            .fit(&series(&simulate_arma(80, 0.02, 0.5, 0.2, 0.01, 5)))
            .unwrap();
        let forecast = Forecaster::default().forecast(&fit).unwrap();

        for row in &forecast.rows {
            assert_abs_diff_eq!(
                row.predicted_rate,
                10.0 + row.predicted_deviation,
                epsilon = 1e-12
            );
            assert!(row.lower_bound <= row.predicted_rate);
            assert!(row.predicted_rate <= row.upper_bound);
        }
    }

    #[test]
    fn test_interval_width_non_decreasing() {
        let fit = DeviationModel::default()
            .fit(&series(&simulate_arma(150, 0.02, 0.7, 0.3, 0.01, 9)))
            .unwrap();
        let widths = Forecaster::default().forecast(&fit).unwrap().widths();

        for pair in widths.windows(2) {
            assert!(pair[1] >= pair[0] - 1e-12, "{:?}", widths);
        }
    }

    #[test]
    fn test_constant_deviation_has_flat_forecast() {
        let fit = DeviationModel::default().fit(&series(&[0.05; 50])).unwrap();
        let forecast = Forecaster::default().forecast(&fit).unwrap();

        for row in &forecast.rows {
            assert_abs_diff_eq!(row.predicted_rate, 10.05, epsilon = 1e-9);
            assert_abs_diff_eq!(row.upper_bound - row.lower_bound, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_invalid_settings() {
        let calendar: Arc<dyn TradingCalendar> = Arc::new(WeekdayCalendar::new());
        assert!(matches!(
            Forecaster::new(calendar.clone(), 0, 0.95),
            Err(DashboardError::Forecast(_))
        ));
        assert!(Forecaster::new(calendar.clone(), 20, 1.0).is_err());
        assert!(Forecaster::new(calendar, 5, 0.8).is_ok());
    }
}
