//! Dashboard configuration: workbook layout, model settings and user parameters
//!
//! Every field has a serde default, so a TOML file only needs the keys it
//! overrides:
//!
//! ```toml
//! alignment = "positional"
//!
//! [model]
//! horizon = 10
//!
//! [params]
//! band_pct = 2.5
//!
//! [layout.pair_b]
//! sheet = "EUR"
//! ```

use crate::band::MAX_BAND_FRACTION;
use crate::basket::{AlignmentPolicy, BasketScenario, MAX_SHOCK};
use crate::calendar::{TradingCalendar, WeekdayCalendar};
use crate::currency::{Currency, CurrencyPair};
use crate::error::{DashboardError, Result};
use crate::forecast::Forecaster;
use crate::model::{ArmaEstimator, ArmaOrder, DeviationModel};
use crate::types::Fraction;
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// User-facing parameters, in the units the user types them
/// (percentages for band and shocks, a fraction for the weight).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DashboardParams {
    #[serde(default = "default_band_pct")]
    pub band_pct: f64,
    #[serde(default)]
    pub shock_a_pct: f64,
    #[serde(default)]
    pub shock_b_pct: f64,
    #[serde(default = "default_weight_a")]
    pub weight_a: f64,
}

fn default_band_pct() -> f64 {
    5.0
}

fn default_weight_a() -> f64 {
    0.4
}

impl Default for DashboardParams {
    fn default() -> Self {
        Self {
            band_pct: default_band_pct(),
            shock_a_pct: 0.0,
            shock_b_pct: 0.0,
            weight_a: default_weight_a(),
        }
    }
}

impl DashboardParams {
    /// Clamp every parameter into its range. The weight is rounded to 0.01
    /// and non-finite input falls back to the default value.
    pub fn clamped(&self) -> Self {
        let defaults = Self::default();
        let band_max = MAX_BAND_FRACTION * 100.0;
        let shock_max = MAX_SHOCK * 100.0;
        Self {
            band_pct: clamp_or(self.band_pct, 0.0, band_max, defaults.band_pct),
            shock_a_pct: clamp_or(self.shock_a_pct, -shock_max, shock_max, 0.0),
            shock_b_pct: clamp_or(self.shock_b_pct, -shock_max, shock_max, 0.0),
            weight_a: round_cents(clamp_or(self.weight_a, 0.0, 1.0, defaults.weight_a)),
        }
    }

    /// Reject out-of-range values instead of clamping them
    pub fn validate(&self) -> Result<()> {
        check_range("band_pct", self.band_pct, 0.0, MAX_BAND_FRACTION * 100.0)?;
        check_range("shock_a_pct", self.shock_a_pct, -MAX_SHOCK * 100.0, MAX_SHOCK * 100.0)?;
        check_range("shock_b_pct", self.shock_b_pct, -MAX_SHOCK * 100.0, MAX_SHOCK * 100.0)?;
        check_range("weight_a", self.weight_a, 0.0, 1.0)?;
        Ok(())
    }

    pub fn band_fraction(&self) -> Fraction {
        self.band_pct / 100.0
    }

    pub fn shock_a(&self) -> Fraction {
        self.shock_a_pct / 100.0
    }

    pub fn shock_b(&self) -> Fraction {
        self.shock_b_pct / 100.0
    }

    pub fn weight_b(&self) -> Fraction {
        1.0 - self.weight_a
    }

    pub fn scenario(&self) -> Result<BasketScenario> {
        BasketScenario::new(self.shock_a(), self.shock_b(), self.weight_a)
    }
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn clamp_or(value: f64, min: f64, max: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        fallback
    }
}

fn check_range(name: &'static str, value: f64, min: f64, max: f64) -> Result<()> {
    if !(min..=max).contains(&value) {
        return Err(DashboardError::ParameterRange {
            name,
            value,
            min,
            max,
        });
    }
    Ok(())
}

/// Estimator and forecaster settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_order")]
    pub ar_order: usize,
    #[serde(default = "default_order")]
    pub ma_order: usize,
    #[serde(default = "default_min_observations")]
    pub min_observations: usize,
    #[serde(default = "default_horizon")]
    pub horizon: usize,
    #[serde(default = "default_confidence_level")]
    pub confidence_level: f64,
}

fn default_order() -> usize {
    1
}

fn default_min_observations() -> usize {
    30
}

fn default_horizon() -> usize {
    20
}

fn default_confidence_level() -> f64 {
    0.95
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            ar_order: default_order(),
            ma_order: default_order(),
            min_observations: default_min_observations(),
            horizon: default_horizon(),
            confidence_level: default_confidence_level(),
        }
    }
}

impl ModelConfig {
    pub fn order(&self) -> Result<ArmaOrder> {
        ArmaOrder::new(self.ar_order, self.ma_order)
    }

    pub fn deviation_model(&self) -> Result<DeviationModel> {
        let estimator =
            ArmaEstimator::new(self.order()?).with_min_observations(self.min_observations);
        Ok(DeviationModel::new(estimator))
    }

    /// Forecaster on the Monday–Friday calendar
    pub fn forecaster(&self) -> Result<Forecaster> {
        let calendar: Arc<dyn TradingCalendar> = Arc::new(WeekdayCalendar::new());
        Forecaster::new(calendar, self.horizon, self.confidence_level)
    }
}

/// Where one currency pair lives in the workbook
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SheetLayout {
    pub pair: CurrencyPair,
    pub sheet: String,
    pub date_column: String,
    pub official_column: String,
    pub central_column: String,
}

impl SheetLayout {
    /// Layout of the USD/MAD sheet
    pub fn usd_mad() -> Self {
        Self {
            pair: CurrencyPair::new(Currency::USD, Currency::MAD),
            sheet: "Feuil1".to_string(),
            date_column: "quote_date".to_string(),
            official_column: "mid_rate_USD".to_string(),
            central_column: "USD_MAD_central".to_string(),
        }
    }

    /// Layout of the EUR/MAD sheet
    pub fn eur_mad() -> Self {
        Self {
            pair: CurrencyPair::new(Currency::EUR, Currency::MAD),
            sheet: "Feuil3".to_string(),
            date_column: "quote_date".to_string(),
            official_column: "Mid_EUR".to_string(),
            central_column: "EUR_MAD_central".to_string(),
        }
    }
}

/// A `[layout.pair_*]` table: keys left out keep the built-in layout's value
#[derive(Deserialize)]
struct SheetLayoutOverride {
    pair: Option<CurrencyPair>,
    sheet: Option<String>,
    date_column: Option<String>,
    official_column: Option<String>,
    central_column: Option<String>,
}

impl SheetLayoutOverride {
    fn apply(self, base: SheetLayout) -> SheetLayout {
        SheetLayout {
            pair: self.pair.unwrap_or(base.pair),
            sheet: self.sheet.unwrap_or(base.sheet),
            date_column: self.date_column.unwrap_or(base.date_column),
            official_column: self.official_column.unwrap_or(base.official_column),
            central_column: self.central_column.unwrap_or(base.central_column),
        }
    }
}

fn pair_a_layout<'de, D>(deserializer: D) -> std::result::Result<SheetLayout, D::Error>
where
    D: Deserializer<'de>,
{
    SheetLayoutOverride::deserialize(deserializer).map(|o| o.apply(SheetLayout::usd_mad()))
}

fn pair_b_layout<'de, D>(deserializer: D) -> std::result::Result<SheetLayout, D::Error>
where
    D: Deserializer<'de>,
{
    SheetLayoutOverride::deserialize(deserializer).map(|o| o.apply(SheetLayout::eur_mad()))
}

/// Where the reference FX series lives in the workbook
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceLayout {
    #[serde(default = "default_reference_sheet")]
    pub sheet: String,
    #[serde(default = "default_reference_date_column")]
    pub date_column: String,
    /// Cross-rate column; only dates are read when absent
    #[serde(default)]
    pub value_column: Option<String>,
}

fn default_reference_sheet() -> String {
    "EURUSD_2024-01-01_to_2026-02-18".to_string()
}

fn default_reference_date_column() -> String {
    "Date".to_string()
}

impl Default for ReferenceLayout {
    fn default() -> Self {
        Self {
            sheet: default_reference_sheet(),
            date_column: default_reference_date_column(),
            value_column: None,
        }
    }
}

/// The three sheets the dashboard reads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkbookLayout {
    #[serde(default = "SheetLayout::usd_mad", deserialize_with = "pair_a_layout")]
    pub pair_a: SheetLayout,
    #[serde(default = "SheetLayout::eur_mad", deserialize_with = "pair_b_layout")]
    pub pair_b: SheetLayout,
    #[serde(default)]
    pub reference: ReferenceLayout,
}

impl Default for WorkbookLayout {
    fn default() -> Self {
        Self {
            pair_a: SheetLayout::usd_mad(),
            pair_b: SheetLayout::eur_mad(),
            reference: ReferenceLayout::default(),
        }
    }
}

/// Complete dashboard configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default)]
    pub layout: WorkbookLayout,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub params: DashboardParams,
    #[serde(default)]
    pub alignment: AlignmentPolicy,
}

impl DashboardConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: DashboardConfig = toml::from_str(contents)?;
        config.model.order()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            DashboardError::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&contents)?;
        log::debug!("loaded configuration from {}", path.display());
        Ok(config)
    }
}
