//! Shared fixtures for integration tests

#![allow(dead_code)]

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use std::fs;
use std::path::Path;

#[path = "../../src/model/testing.rs"]
mod testing;

pub use testing::simulate_arma;

/// `n` Monday-to-Friday dates ending on `last`
pub fn business_days_ending(last: NaiveDate, n: usize) -> Vec<NaiveDate> {
    let mut dates = Vec::with_capacity(n);
    let mut current = last;
    while dates.len() < n {
        if !matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
            dates.push(current);
        }
        current -= Duration::days(1);
    }
    dates.reverse();
    dates
}

/// CSV body for a pair sheet with the given headers
pub fn pair_sheet(
    headers: (&str, &str, &str),
    dates: &[NaiveDate],
    central: impl Fn(usize) -> f64,
    deviations: &[f64],
) -> String {
    let mut body = format!("{},{},{}\n", headers.0, headers.1, headers.2);
    for (i, (date, d)) in dates.iter().zip(deviations).enumerate() {
        let c = central(i);
        body.push_str(&format!("{},{},{}\n", date, c + d, c));
    }
    body
}

/// Write the default three-sheet workbook as CSV files into `dir`
pub fn write_default_workbook(dir: &Path, n: usize, last: NaiveDate) -> Vec<NaiveDate> {
    let dates = business_days_ending(last, n);
    fs::write(
        dir.join("Feuil1.csv"),
        pair_sheet(
            ("quote_date", "mid_rate_USD", "USD_MAD_central"),
            &dates,
            |i| 9.95 + 0.002 * (i % 11) as f64,
            &simulate_arma(n, 0.03, 0.6, 0.2, 0.008, 21),
        ),
    )
    .unwrap();
    fs::write(
        dir.join("Feuil3.csv"),
        pair_sheet(
            ("quote_date", "Mid_EUR", "EUR_MAD_central"),
            &dates,
            |i| 10.85 + 0.003 * (i % 7) as f64,
            &simulate_arma(n, -0.01, 0.5, 0.3, 0.01, 22),
        ),
    )
    .unwrap();

    let mut reference = String::from("Date,Close\n");
    for (i, date) in dates.iter().enumerate() {
        reference.push_str(&format!("{},{}\n", date, 1.08 + 0.0005 * (i % 13) as f64));
    }
    fs::write(dir.join("EURUSD_2024-01-01_to_2026-02-18.csv"), reference).unwrap();
    dates
}
