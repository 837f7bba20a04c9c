//! Sheet parsing: dates, numbers and the three series the dashboard reads

use super::workbook::{Cell, Sheet, WorkbookSource};
use crate::config::{ReferenceLayout, SheetLayout, WorkbookLayout};
use crate::error::{DashboardError, Result};
use crate::types::{RateObservation, RateSeries, ReferenceObservation, ReferenceSeries};
use chrono::{Duration, NaiveDate, NaiveDateTime};

/// Spreadsheet serial day zero (serial 1 is 1899-12-31, with the 1900 leap-year quirk folded in)
const SERIAL_EPOCH: (i32, u32, u32) = (1899, 12, 30);

/// Serial numbers accepted as dates (1900-01-01 .. 9999-12-31)
const SERIAL_RANGE: std::ops::RangeInclusive<f64> = 1.0..=2_958_465.0;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d", "%d-%m-%Y", "%d.%m.%Y"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

/// Everything the pipeline reads from the workbook
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardInput {
    pub pair_a: RateSeries,
    pub pair_b: RateSeries,
    pub reference: ReferenceSeries,
}

/// Date from a spreadsheet serial number
pub fn date_from_serial(serial: f64) -> Option<NaiveDate> {
    if !SERIAL_RANGE.contains(&serial) {
        return None;
    }
    let (y, m, d) = SERIAL_EPOCH;
    NaiveDate::from_ymd_opt(y, m, d)?.checked_add_signed(Duration::days(serial.floor() as i64))
}

/// Parse a date cell: ISO dates and date-times, `dd/mm/yyyy`, or serial numbers
pub fn parse_date(cell: &Cell) -> Option<NaiveDate> {
    match cell {
        Cell::Empty => None,
        Cell::Number(serial) => date_from_serial(*serial),
        Cell::Text(text) => parse_date_str(text.trim()),
    }
}

fn parse_date_str(text: &str) -> Option<NaiveDate> {
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Some(date);
        }
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt.date());
        }
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(text) {
        return Some(dt.date_naive());
    }
    text.parse::<f64>().ok().and_then(date_from_serial)
}

/// Parse a numeric cell. Empty cells give `None`; decimal commas and
/// thousands separators of either convention are accepted.
pub(crate) fn parse_number(cell: &Cell) -> std::result::Result<Option<f64>, ()> {
    match cell {
        Cell::Empty => Ok(None),
        Cell::Number(n) => Ok(Some(*n)),
        Cell::Text(text) => {
            let text = text.trim();
            if text.is_empty() {
                return Ok(None);
            }
            normalize_separators(text).parse::<f64>().map(Some).map_err(|_| ())
        }
    }
}

/// With both separators present the last one is the decimal mark; a lone
/// comma is a decimal comma and repeated commas group thousands.
fn normalize_separators(text: &str) -> String {
    match (text.rfind('.'), text.rfind(',')) {
        (Some(dot), Some(comma)) if comma > dot => text.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => text.replace(',', ""),
        (None, Some(_)) if text.matches(',').count() == 1 => text.replace(',', "."),
        (None, Some(_)) => text.replace(',', ""),
        _ => text.to_string(),
    }
}

/// 1-based spreadsheet row of data row `idx` (the header is row 1)
fn sheet_row(idx: usize) -> usize {
    idx + 2
}

fn date_at(sheet: &Sheet, row: usize, col: usize) -> Result<NaiveDate> {
    let cell = sheet.cell(row, col);
    parse_date(cell).ok_or_else(|| DashboardError::UnparsableCell {
        sheet: sheet.name.clone(),
        row: sheet_row(row),
        kind: "date",
        value: cell.display(),
    })
}

/// Missing numbers read as NaN and surface later as a model-fit failure for the pair
fn number_at(sheet: &Sheet, row: usize, col: usize, column: &str) -> Result<f64> {
    let cell = sheet.cell(row, col);
    match parse_number(cell) {
        Ok(Some(value)) => Ok(value),
        Ok(None) => {
            log::warn!(
                "sheet '{}', row {}: empty '{}' cell",
                sheet.name,
                sheet_row(row),
                column
            );
            Ok(f64::NAN)
        }
        Err(()) => Err(DashboardError::UnparsableCell {
            sheet: sheet.name.clone(),
            row: sheet_row(row),
            kind: "number",
            value: cell.display(),
        }),
    }
}

/// Read one currency pair's sheet
pub fn load_rate_series(
    workbook: &mut dyn WorkbookSource,
    layout: &SheetLayout,
) -> Result<RateSeries> {
    let sheet = workbook.sheet(&layout.sheet)?;
    let date_col = sheet.column_index(&layout.date_column)?;
    let official_col = sheet.column_index(&layout.official_column)?;
    let central_col = sheet.column_index(&layout.central_column)?;

    let mut observations = Vec::with_capacity(sheet.rows.len());
    for row in 0..sheet.rows.len() {
        if sheet.row_is_empty(row) {
            continue;
        }
        let date = date_at(&sheet, row, date_col)?;
        let central = number_at(&sheet, row, central_col, &layout.central_column)?;
        let official = number_at(&sheet, row, official_col, &layout.official_column)?;
        observations.push(RateObservation::new(date, central, official));
    }

    let series = RateSeries::new(layout.pair, observations)?;
    log::info!(
        "loaded {} observations for {} from sheet '{}' ({} to {})",
        series.len(),
        layout.pair,
        layout.sheet,
        series.observations()[0].date,
        series.last().date
    );
    Ok(series)
}

/// Read the reference FX sheet; may be empty
pub fn load_reference(
    workbook: &mut dyn WorkbookSource,
    layout: &ReferenceLayout,
) -> Result<ReferenceSeries> {
    let sheet = workbook.sheet(&layout.sheet)?;
    let date_col = sheet.column_index(&layout.date_column)?;
    let value_col = layout
        .value_column
        .as_deref()
        .map(|column| sheet.column_index(column).map(|idx| (idx, column)))
        .transpose()?;

    let mut observations = Vec::with_capacity(sheet.rows.len());
    for row in 0..sheet.rows.len() {
        if sheet.row_is_empty(row) {
            continue;
        }
        let date = date_at(&sheet, row, date_col)?;
        let cross_rate = match value_col {
            Some((col, column)) => {
                Some(number_at(&sheet, row, col, column)?).filter(|v| v.is_finite())
            }
            None => None,
        };
        observations.push(ReferenceObservation { date, cross_rate });
    }

    let series = ReferenceSeries::new(observations)?;
    log::info!(
        "loaded {} reference dates from sheet '{}'",
        series.len(),
        layout.sheet
    );
    Ok(series)
}

/// Read all three sheets. Any layout or parse problem aborts here, before
/// any model is fitted.
pub fn load_input(
    workbook: &mut dyn WorkbookSource,
    layout: &WorkbookLayout,
) -> Result<DashboardInput> {
    Ok(DashboardInput {
        pair_a: load_rate_series(workbook, &layout.pair_a)?,
        pair_b: load_rate_series(workbook, &layout.pair_b)?,
        reference: load_reference(workbook, &layout.reference)?,
    })
}
