//! Core types: rate observations and the series built from them

use crate::currency::CurrencyPair;
use crate::error::{DashboardError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// Exchange rate value
pub type Rate = f64;

/// Fraction (0.05 == 5%)
pub type Fraction = f64;

/// One trading day of a currency pair: computed central rate and published official rate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateObservation {
    pub date: NaiveDate,
    pub central_rate: Rate,
    pub official_rate: Rate,
}

impl RateObservation {
    pub fn new(date: NaiveDate, central_rate: Rate, official_rate: Rate) -> Self {
        Self {
            date,
            central_rate,
            official_rate,
        }
    }

    /// Official minus central
    pub fn deviation(&self) -> f64 {
        self.official_rate - self.central_rate
    }
}

/// Date-ordered observations for a single currency pair.
///
/// Dates are strictly increasing; this is checked on construction and when
/// deserializing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateSeries {
    pair: CurrencyPair,
    observations: Vec<RateObservation>,
}

impl RateSeries {
    pub fn new(pair: CurrencyPair, observations: Vec<RateObservation>) -> Result<Self> {
        if observations.is_empty() {
            return Err(DashboardError::InputFormat(format!(
                "No observations for {}",
                pair
            )));
        }
        ensure_increasing(observations.iter().map(|o| o.date), &pair.to_string())?;
        Ok(Self { pair, observations })
    }

    pub fn pair(&self) -> CurrencyPair {
        self.pair
    }

    pub fn observations(&self) -> &[RateObservation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.observations.iter().map(|o| o.date).collect()
    }

    pub fn central_rates(&self) -> Vec<Rate> {
        self.observations.iter().map(|o| o.central_rate).collect()
    }

    pub fn official_rates(&self) -> Vec<Rate> {
        self.observations.iter().map(|o| o.official_rate).collect()
    }

    /// Deviation series: official minus central, same indexing
    pub fn deviations(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.deviation()).collect()
    }

    /// Most recent observation
    pub fn last(&self) -> &RateObservation {
        // Non-empty by construction
        &self.observations[self.observations.len() - 1]
    }
}

impl<'de> Deserialize<'de> for RateSeries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Raw {
            pair: CurrencyPair,
            observations: Vec<RateObservation>,
        }

        let raw = Raw::deserialize(deserializer)?;
        Self::new(raw.pair, raw.observations).map_err(serde::de::Error::custom)
    }
}

/// One row of the reference FX sheet
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceObservation {
    pub date: NaiveDate,
    /// Raw cross rate, when the layout names a value column
    pub cross_rate: Option<Rate>,
}

/// Reference date axis for the basket simulation
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ReferenceSeries {
    observations: Vec<ReferenceObservation>,
}

impl ReferenceSeries {
    pub fn new(observations: Vec<ReferenceObservation>) -> Result<Self> {
        ensure_increasing(observations.iter().map(|o| o.date), "reference series")?;
        Ok(Self { observations })
    }

    pub fn observations(&self) -> &[ReferenceObservation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.observations.iter().map(|o| o.date).collect()
    }
}

impl<'de> Deserialize<'de> for ReferenceSeries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Raw {
            observations: Vec<ReferenceObservation>,
        }

        let raw = Raw::deserialize(deserializer)?;
        Self::new(raw.observations).map_err(serde::de::Error::custom)
    }
}

fn ensure_increasing(dates: impl Iterator<Item = NaiveDate>, label: &str) -> Result<()> {
    let mut previous: Option<NaiveDate> = None;
    for date in dates {
        if let Some(prev) = previous {
            if date <= prev {
                return Err(DashboardError::InputFormat(format!(
                    "Dates of {} must be strictly increasing: {} follows {}",
                    label, date, prev
                )));
            }
        }
        previous = Some(date);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::currency::Currency;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn usd_mad() -> CurrencyPair {
        CurrencyPair::new(Currency::USD, Currency::MAD)
    }

    #[test]
    fn test_deviation() {
        let obs = RateObservation::new(ymd(2025, 1, 2), 10.00, 10.05);
        assert!((obs.deviation() - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_series_accessors() {
        let series = RateSeries::new(
            usd_mad(),
            vec![
                RateObservation::new(ymd(2025, 1, 2), 10.0, 10.1),
                RateObservation::new(ymd(2025, 1, 3), 10.2, 10.1),
            ],
        )
        .unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(series.central_rates(), vec![10.0, 10.2]);
        assert_eq!(series.last().date, ymd(2025, 1, 3));
        let dev = series.deviations();
        assert!((dev[0] - 0.1).abs() < 1e-12);
        assert!((dev[1] + 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_series_rejects_unordered_dates() {
        let result = RateSeries::new(
            usd_mad(),
            vec![
                RateObservation::new(ymd(2025, 1, 3), 10.0, 10.1),
                RateObservation::new(ymd(2025, 1, 2), 10.0, 10.1),
            ],
        );
        assert!(matches!(result, Err(DashboardError::InputFormat(_))));
    }

    #[test]
    fn test_series_rejects_duplicate_dates() {
        let result = RateSeries::new(
            usd_mad(),
            vec![
                RateObservation::new(ymd(2025, 1, 2), 10.0, 10.1),
                RateObservation::new(ymd(2025, 1, 2), 10.0, 10.1),
            ],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_series_rejects_empty() {
        assert!(RateSeries::new(usd_mad(), vec![]).is_err());
    }

    #[test]
    fn test_deserialize_checks_series() {
        let series = RateSeries::new(
            usd_mad(),
            vec![
                RateObservation::new(ymd(2025, 1, 2), 10.0, 10.1),
                RateObservation::new(ymd(2025, 1, 3), 10.2, 10.1),
            ],
        )
        .unwrap();
        let json = serde_json::to_string(&series).unwrap();
        assert_eq!(serde_json::from_str::<RateSeries>(&json).unwrap(), series);

        let unordered = json.replace("2025-01-03", "2025-01-01");
        let err = serde_json::from_str::<RateSeries>(&unordered).unwrap_err();
        assert!(err.to_string().contains("strictly increasing"));

        let empty = r#"{"pair":"USD/MAD","observations":[]}"#;
        assert!(serde_json::from_str::<RateSeries>(empty).is_err());

        let reference = r#"{"observations":[
            {"date":"2025-01-03","cross_rate":null},
            {"date":"2025-01-02","cross_rate":1.08}
        ]}"#;
        assert!(serde_json::from_str::<ReferenceSeries>(reference).is_err());
    }
}
