//! # fx-deviation
//!
//! Compares a centrally computed exchange rate with the officially published
//! rate for two currency pairs, models the deviation between them with an
//! ARMA process, and derives an adjusted rate, a fluctuation band, a
//! business-day forecast and a what-if basket valuation.
//!
//! ## Example
//!
//! ```rust,no_run
//! use fx_deviation::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let config = DashboardConfig::default();
//!     let params = DashboardParams {
//!         band_pct: 2.5,
//!         ..Default::default()
//!     };
//!     let report = load_and_run("rates.xlsx", config, &params)?;
//!
//!     for pair in report.pairs() {
//!         if let Ok(panel) = &pair.panel {
//!             println!("{}: {}", pair.pair, panel.summary.order);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod band;
pub mod basket;
pub mod calendar;
pub mod config;
pub mod currency;
pub mod data;
pub mod error;
pub mod forecast;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod types;

pub mod prelude {
    //! Commonly used types and traits
    pub use crate::band::{fluctuation_bands, Band};
    pub use crate::basket::{simulate_basket, AlignmentPolicy, BasketRow, BasketScenario};
    pub use crate::calendar::{TradingCalendar, WeekdayCalendar};
    pub use crate::config::{DashboardConfig, DashboardParams, ModelConfig, WorkbookLayout};
    pub use crate::currency::{Currency, CurrencyPair};
    pub use crate::data::{load_input, open_workbook, DashboardInput, WorkbookSource};
    pub use crate::error::{DashboardError, Result};
    pub use crate::forecast::{ForecastRow, Forecaster, RateForecast};
    pub use crate::model::{ArmaEstimator, ArmaOrder, DeviationFit, DeviationModel, FittedArma};
    pub use crate::pipeline::{load_and_run, Dashboard, DashboardReport, PairReport};
    pub use crate::types::*;
}
