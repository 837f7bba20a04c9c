//! Report output: JSON documents and CSV tables
//!
//! A [`DashboardReport`] holds a `Result` per panel; [`ReportView`] turns it
//! into a serialisable tree where each panel is either data or the error
//! message that replaced it.

use crate::basket::{AlignmentPolicy, BasketRow};
use crate::config::DashboardParams;
use crate::currency::CurrencyPair;
use crate::error::Result;
use crate::forecast::{ForecastRow, RateForecast};
use crate::pipeline::{ComparisonRow, DashboardReport, ModelSummary, PairReport};
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// A panel that either holds data or explains why it is missing
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Panel<T> {
    Ok { data: T },
    Failed { error: String },
}

impl<T> Panel<T> {
    fn from_result<U>(result: &Result<U>, view: impl FnOnce(&U) -> T) -> Self {
        match result {
            Ok(value) => Panel::Ok { data: view(value) },
            Err(e) => Panel::Failed {
                error: e.to_string(),
            },
        }
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            Panel::Ok { data } => Some(data),
            Panel::Failed { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ForecastView {
    pub level: f64,
    pub last_central: f64,
    pub rows: Vec<ForecastRow>,
}

impl From<&RateForecast> for ForecastView {
    fn from(forecast: &RateForecast) -> Self {
        Self {
            level: forecast.level,
            last_central: forecast.last_central,
            rows: forecast.rows.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PairView {
    pub pair: CurrencyPair,
    pub model: Panel<ModelSummary>,
    pub comparison: Panel<Vec<ComparisonRow>>,
    pub forecast: Panel<ForecastView>,
}

impl From<&PairReport> for PairView {
    fn from(report: &PairReport) -> Self {
        let (forecast, model, comparison) = match &report.panel {
            Ok(panel) => (
                Panel::from_result(&panel.forecast, |f| ForecastView::from(f)),
                Panel::Ok {
                    data: panel.summary.clone(),
                },
                Panel::Ok {
                    data: panel.comparison.clone(),
                },
            ),
            Err(e) => {
                let failed = || e.to_string();
                (
                    Panel::Failed { error: failed() },
                    Panel::Failed { error: failed() },
                    Panel::Failed { error: failed() },
                )
            }
        };
        Self {
            pair: report.pair,
            model,
            comparison,
            forecast,
        }
    }
}

/// Serialisable form of a whole run
#[derive(Debug, Clone, Serialize)]
pub struct ReportView {
    pub params: DashboardParams,
    pub alignment: AlignmentPolicy,
    pub pairs: Vec<PairView>,
    pub basket: Panel<Vec<BasketRow>>,
}

impl From<&DashboardReport> for ReportView {
    fn from(report: &DashboardReport) -> Self {
        Self {
            params: report.params,
            alignment: report.alignment,
            pairs: report.pairs().iter().map(|p| PairView::from(*p)).collect(),
            basket: Panel::from_result(&report.basket, |rows| rows.clone()),
        }
    }
}

/// Pretty-printed JSON of the whole report
pub fn write_json<W: Write>(report: &DashboardReport, writer: W) -> Result<()> {
    serde_json::to_writer_pretty(writer, &ReportView::from(report))?;
    Ok(())
}

fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write every successful table as CSV into `dir`:
/// `<PAIR>_comparison.csv`, `<PAIR>_forecast.csv`, `<PAIR>_model.json` and
/// `basket.csv`. Returns the files written.
pub fn write_csv_tables<P: AsRef<Path>>(report: &DashboardReport, dir: P) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    let mut written = Vec::new();

    for pair in report.pairs() {
        let Ok(panel) = &pair.panel else {
            log::warn!("{}: no tables written", pair.pair);
            continue;
        };
        let stem = pair.pair.file_stem();

        let path = dir.join(format!("{}_comparison.csv", stem));
        write_rows(&path, &panel.comparison)?;
        written.push(path);

        if let Ok(forecast) = &panel.forecast {
            let path = dir.join(format!("{}_forecast.csv", stem));
            write_rows(&path, &forecast.rows)?;
            written.push(path);
        }

        let path = dir.join(format!("{}_model.json", stem));
        fs::write(&path, serde_json::to_string_pretty(&panel.summary)?)?;
        written.push(path);
    }

    if let Ok(rows) = &report.basket {
        let path = dir.join("basket.csv");
        write_rows(&path, rows)?;
        written.push(path);
    }

    log::info!("wrote {} files to {}", written.len(), dir.display());
    Ok(written)
}
