//! End-to-end runs over CSV workbooks

mod common;

use approx::assert_abs_diff_eq;
use chrono::NaiveDate;
use common::{business_days_ending, pair_sheet, simulate_arma, write_default_workbook};
use fx_deviation::basket::AlignmentPolicy;
use fx_deviation::config::{DashboardConfig, DashboardParams};
use fx_deviation::error::DashboardError;
use fx_deviation::pipeline::load_and_run;
use fx_deviation::report::{write_csv_tables, write_json};
use std::fs;
use tempfile::TempDir;

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn test_default_workbook_run() {
    let dir = TempDir::new().unwrap();
    let dates = write_default_workbook(dir.path(), 120, ymd(2025, 1, 10));

    let report = load_and_run(dir.path(), DashboardConfig::default(), &DashboardParams::default())
        .unwrap();

    assert_eq!(report.failed_panels(), 0);
    for pair in report.pairs() {
        let panel = pair.panel.as_ref().unwrap();
        assert_eq!(panel.comparison.len(), 120);
        assert_eq!(panel.comparison.last().unwrap().date, *dates.last().unwrap());

        let forecast = panel.forecast.as_ref().unwrap();
        assert_eq!(forecast.rows.len(), 20);
        assert_eq!(forecast.rows[0].date, ymd(2025, 1, 13));
        assert_eq!(forecast.rows[1].date, ymd(2025, 1, 14));
        assert_eq!(forecast.rows[2].date, ymd(2025, 1, 15));
    }

    let basket = report.basket.as_ref().unwrap();
    assert_eq!(basket.len(), 120);
    assert!(basket.iter().all(|row| row.reference_rate.is_none()));
}

#[test]
fn test_reference_cross_rate_carried() {
    let dir = TempDir::new().unwrap();
    write_default_workbook(dir.path(), 60, ymd(2025, 1, 10));

    let mut config = DashboardConfig::default();
    config.layout.reference.value_column = Some("Close".to_string());
    let report = load_and_run(dir.path(), config, &DashboardParams::default()).unwrap();

    let basket = report.basket.as_ref().unwrap();
    assert_eq!(basket[0].reference_rate, Some(1.08));
}

#[test]
fn test_zero_shock_basket_is_weighted_average() {
    let dir = TempDir::new().unwrap();
    write_default_workbook(dir.path(), 80, ymd(2025, 1, 10));

    let params = DashboardParams {
        shock_a_pct: 0.0,
        shock_b_pct: 0.0,
        weight_a: 0.4,
        ..Default::default()
    };
    let report = load_and_run(dir.path(), DashboardConfig::default(), &params).unwrap();

    let a = &report.pair_a.panel.as_ref().unwrap().comparison;
    let b = &report.pair_b.panel.as_ref().unwrap().comparison;
    for ((row, ra), rb) in report.basket.as_ref().unwrap().iter().zip(a).zip(b) {
        assert_eq!(row.date, ra.date);
        assert_abs_diff_eq!(
            row.basket_value,
            0.4 * ra.adjusted_rate + 0.6 * rb.adjusted_rate,
            epsilon = 1e-12
        );
    }
}

#[test]
fn test_missing_column_fails_before_output() {
    let dir = TempDir::new().unwrap();
    write_default_workbook(dir.path(), 60, ymd(2025, 1, 10));
    let dates = business_days_ending(ymd(2025, 1, 10), 60);
    fs::write(
        dir.path().join("Feuil3.csv"),
        pair_sheet(
            ("quote_date", "Mid", "EUR_MAD_central"),
            &dates,
            |_| 10.9,
            &simulate_arma(60, 0.0, 0.5, 0.2, 0.01, 4),
        ),
    )
    .unwrap();

    let err = load_and_run(dir.path(), DashboardConfig::default(), &DashboardParams::default())
        .unwrap_err();
    assert!(err.is_input_error());
    match err {
        DashboardError::MissingColumn { sheet, column } => {
            assert_eq!(sheet, "Feuil3");
            assert_eq!(column, "Mid_EUR");
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_missing_sheet_fails() {
    let dir = TempDir::new().unwrap();
    write_default_workbook(dir.path(), 60, ymd(2025, 1, 10));
    fs::remove_file(dir.path().join("EURUSD_2024-01-01_to_2026-02-18.csv")).unwrap();

    let err = load_and_run(dir.path(), DashboardConfig::default(), &DashboardParams::default())
        .unwrap_err();
    assert!(matches!(err, DashboardError::MissingSheet { .. }));
}

#[test]
fn test_short_pair_only_loses_its_panels() {
    let dir = TempDir::new().unwrap();
    write_default_workbook(dir.path(), 60, ymd(2025, 1, 10));
    let dates = business_days_ending(ymd(2025, 1, 10), 12);
    fs::write(
        dir.path().join("Feuil1.csv"),
        pair_sheet(
            ("quote_date", "mid_rate_USD", "USD_MAD_central"),
            &dates,
            |_| 10.0,
            &simulate_arma(12, 0.03, 0.5, 0.2, 0.01, 5),
        ),
    )
    .unwrap();

    let report = load_and_run(dir.path(), DashboardConfig::default(), &DashboardParams::default())
        .unwrap();

    assert!(matches!(
        report.pair_a.panel,
        Err(DashboardError::InsufficientData { required: 30, actual: 12, .. })
    ));
    assert!(report.pair_b.panel.is_ok());
    assert!(report.basket.is_err());
}

#[test]
fn test_zero_horizon_only_loses_forecasts() {
    let dir = TempDir::new().unwrap();
    write_default_workbook(dir.path(), 80, ymd(2025, 1, 10));

    let mut config = DashboardConfig::default();
    config.model.horizon = 0;
    let report = load_and_run(dir.path(), config, &DashboardParams::default()).unwrap();

    assert_eq!(report.failed_panels(), 2);
    for pair in report.pairs() {
        let panel = pair.panel.as_ref().unwrap();
        assert_eq!(panel.comparison.len(), 80);
        let err = panel.forecast.as_ref().unwrap_err();
        assert!(matches!(err, DashboardError::Forecast(_)));
    }
    assert_eq!(report.basket.as_ref().unwrap().len(), 80);

    let out = dir.path().join("out");
    let written = write_csv_tables(&report, &out).unwrap();
    assert_eq!(written.len(), 5);
    assert!(!out.join("USD_MAD_forecast.csv").exists());
}

#[test]
fn test_positional_alignment_from_config() {
    let dir = TempDir::new().unwrap();
    write_default_workbook(dir.path(), 70, ymd(2025, 1, 10));
    let reference: String = std::iter::once("Date\n".to_string())
        .chain(business_days_ending(ymd(2024, 6, 28), 50).iter().map(|d| format!("{}\n", d)))
        .collect();
    fs::write(dir.path().join("EURUSD_2024-01-01_to_2026-02-18.csv"), reference).unwrap();

    let inner = load_and_run(dir.path(), DashboardConfig::default(), &DashboardParams::default())
        .unwrap();
    assert_eq!(inner.basket.as_ref().unwrap().len(), 0);

    let config = DashboardConfig {
        alignment: AlignmentPolicy::Positional,
        ..Default::default()
    };
    let positional = load_and_run(dir.path(), config, &DashboardParams::default()).unwrap();
    let rows = positional.basket.as_ref().unwrap();
    assert_eq!(rows.len(), 50);
    assert_eq!(rows[49].date, ymd(2024, 6, 28));
}

#[test]
fn test_report_outputs() {
    let dir = TempDir::new().unwrap();
    write_default_workbook(dir.path(), 60, ymd(2025, 1, 10));
    let report = load_and_run(dir.path(), DashboardConfig::default(), &DashboardParams::default())
        .unwrap();

    let out = TempDir::new().unwrap();
    let written = write_csv_tables(&report, out.path()).unwrap();
    assert_eq!(written.len(), 7);
    let comparison = fs::read_to_string(out.path().join("USD_MAD_comparison.csv")).unwrap();
    assert!(comparison
        .starts_with("date,central_rate,official_rate,fitted_deviation,adjusted_rate"));
    assert_eq!(comparison.lines().count(), 61);
    let forecast = fs::read_to_string(out.path().join("EUR_MAD_forecast.csv")).unwrap();
    assert!(forecast.lines().nth(1).unwrap().starts_with("2025-01-13,"));

    let mut buffer = Vec::new();
    write_json(&report, &mut buffer).unwrap();
    let json: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
    assert_eq!(json["pairs"][0]["pair"], "USD/MAD");
    assert_eq!(json["pairs"][1]["forecast"]["status"], "ok");
    assert_eq!(json["basket"]["data"].as_array().unwrap().len(), 60);
    assert_eq!(json["alignment"], "inner");
}
