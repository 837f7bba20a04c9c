//! fx-dashboard CLI - central vs. official rate dashboard
//!
//! ## Example Usage
//!
//! ```bash
//! # Run with the default parameters and print the tables
//! fx-dashboard run rates.xlsx
//!
//! # Widen the band, shock USD/MAD by +3% and write CSV tables
//! fx-dashboard run rates.xlsx --band 7.5 --shock-a 3 --format csv --output out/
//!
//! # List the sheets and columns of a workbook
//! fx-dashboard inspect rates.xlsx
//! ```

use anyhow::{bail, Context as _};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use fx_deviation::basket::AlignmentPolicy;
use fx_deviation::config::{DashboardConfig, DashboardParams};
use fx_deviation::data::open_workbook;
use fx_deviation::pipeline::{load_and_run, DashboardReport, PairPanel};
use fx_deviation::report::{write_csv_tables, write_json};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;

/// fx-dashboard: central vs. official exchange rate dashboard
#[derive(Parser)]
#[command(name = "fx-dashboard")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "Robert Fall")]
#[command(about = "Central vs. official exchange rate dashboard", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fit the deviation models and print the dashboard tables
    Run {
        /// Workbook file (.xlsx/.xls/.ods) or directory of <sheet>.csv files
        #[arg(value_name = "WORKBOOK")]
        workbook: PathBuf,

        /// Fluctuation band in percent [0, 20]
        #[arg(short = 'b', long)]
        band: Option<f64>,

        /// Shock on pair A in percent [-10, 10]
        #[arg(long, allow_hyphen_values = true)]
        shock_a: Option<f64>,

        /// Shock on pair B in percent [-10, 10]
        #[arg(long, allow_hyphen_values = true)]
        shock_b: Option<f64>,

        /// Basket weight of pair A [0, 1]
        #[arg(short = 'w', long)]
        weight_a: Option<f64>,

        /// Forecast horizon in business days
        #[arg(long)]
        horizon: Option<usize>,

        /// Basket date alignment (inner, positional)
        #[arg(long)]
        alignment: Option<String>,

        /// Reject out-of-range parameters instead of clamping them
        #[arg(long)]
        strict: bool,

        /// Rows shown from the end of each history table
        #[arg(long, default_value = "10")]
        rows: usize,

        /// Output directory for csv/json results
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short = 'f', long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// List the sheets and columns of a workbook
    Inspect {
        #[arg(value_name = "WORKBOOK")]
        workbook: PathBuf,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Csv,
    Json,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            process::exit(1);
        }
    };

    if cli.verbose {
        println!(
            "{} v{}",
            "fx-dashboard".cyan().bold(),
            env!("CARGO_PKG_VERSION")
        );
    }

    let result = match cli.command {
        Commands::Run {
            workbook,
            band,
            shock_a,
            shock_b,
            weight_a,
            horizon,
            alignment,
            strict,
            rows,
            output,
            format,
        } => run_dashboard(RunConfig {
            workbook,
            band,
            shock_a,
            shock_b,
            weight_a,
            horizon,
            alignment,
            strict,
            rows,
            output,
            format,
            verbose: cli.verbose,
            config,
        }),
        Commands::Inspect { workbook } => inspect_workbook(&workbook),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

/// `--config` must load; the default location is optional
fn load_config(path: Option<&Path>) -> anyhow::Result<DashboardConfig> {
    if let Some(path) = path {
        return DashboardConfig::from_file(path)
            .with_context(|| format!("loading configuration {}", path.display()));
    }

    if let Some(home) = dirs::home_dir() {
        let default_config = home.join(".fx-dashboard").join("config.toml");
        if default_config.exists() {
            match DashboardConfig::from_file(&default_config) {
                Ok(config) => return Ok(config),
                Err(e) => eprintln!(
                    "{} Ignoring {}: {}",
                    "Warning:".yellow(),
                    default_config.display(),
                    e
                ),
            }
        }
    }

    Ok(DashboardConfig::default())
}

struct RunConfig {
    workbook: PathBuf,
    band: Option<f64>,
    shock_a: Option<f64>,
    shock_b: Option<f64>,
    weight_a: Option<f64>,
    horizon: Option<usize>,
    alignment: Option<String>,
    strict: bool,
    rows: usize,
    output: Option<PathBuf>,
    format: OutputFormat,
    verbose: bool,
    config: DashboardConfig,
}

/// Apply command-line overrides on top of the loaded configuration
fn resolve_settings(run: &RunConfig) -> anyhow::Result<(DashboardConfig, DashboardParams)> {
    let mut config = run.config.clone();
    if let Some(horizon) = run.horizon {
        config.model.horizon = horizon;
    }
    if let Some(alignment) = &run.alignment {
        config.alignment = alignment.parse::<AlignmentPolicy>()?;
    }

    let params = DashboardParams {
        band_pct: run.band.unwrap_or(config.params.band_pct),
        shock_a_pct: run.shock_a.unwrap_or(config.params.shock_a_pct),
        shock_b_pct: run.shock_b.unwrap_or(config.params.shock_b_pct),
        weight_a: run.weight_a.unwrap_or(config.params.weight_a),
    };
    if run.strict {
        params.validate()?;
    } else if params.clamped() != params {
        eprintln!(
            "{} parameters clamped into range: {:?}",
            "Warning:".yellow(),
            params.clamped()
        );
    }
    Ok((config, params))
}

fn run_dashboard(run: RunConfig) -> anyhow::Result<()> {
    if run.format == OutputFormat::Csv && run.output.is_none() {
        bail!("--format csv requires --output <DIR>");
    }
    let (config, params) = resolve_settings(&run)?;

    if run.verbose {
        println!("Workbook: {}", run.workbook.display().to_string().dimmed());
        println!(
            "Model: ARMA({},0,{}), horizon {} days, {}% intervals",
            config.model.ar_order,
            config.model.ma_order,
            config.model.horizon,
            config.model.confidence_level * 100.0
        );
    }

    let start = Instant::now();
    let report = load_and_run(&run.workbook, config, &params)
        .with_context(|| format!("running dashboard on {}", run.workbook.display()))?;
    let elapsed = start.elapsed();

    match run.format {
        OutputFormat::Table => print_report(&report, run.rows),
        OutputFormat::Json => match &run.output {
            Some(dir) => {
                fs::create_dir_all(dir)?;
                let path = dir.join("report.json");
                write_json(&report, fs::File::create(&path)?)?;
                println!("{} {}", "Wrote".green(), path.display());
            }
            None => {
                write_json(&report, io::stdout().lock())?;
                println!();
            }
        },
        OutputFormat::Csv => {
            if let Some(dir) = &run.output {
                for path in write_csv_tables(&report, dir)? {
                    println!("{} {}", "Wrote".green(), path.display());
                }
            }
        }
    }

    if run.verbose {
        println!("Completed in {:.2?}", elapsed);
    }

    let failed = report.failed_panels();
    if failed > 0 {
        eprintln!("{} {} panel(s) unavailable", "Warning:".yellow(), failed);
    }
    Ok(())
}

fn print_report(report: &DashboardReport, tail: usize) {
    let params = &report.params;
    println!(
        "{} band ±{}%  shocks {}% / {}%  weights {:.2} / {:.2}  ({} alignment)",
        "Parameters:".bold(),
        params.band_pct,
        params.shock_a_pct,
        params.shock_b_pct,
        params.weight_a,
        params.weight_b(),
        report.alignment
    );

    for pair in report.pairs() {
        println!();
        println!("{}", format!("═══ {} ═══", pair.pair).cyan().bold());
        match &pair.panel {
            Ok(panel) => print_pair(panel, tail),
            Err(e) => println!("{} {}", "Unavailable:".red().bold(), e),
        }
    }

    println!();
    println!("{}", "═══ Basket simulation ═══".cyan().bold());
    match &report.basket {
        Ok(rows) => {
            println!(
                "{:<12} {:>12} {:>12} {:>12} {:>12}",
                "Date", "Reference", "Sim A", "Sim B", "Basket"
            );
            for row in rows.iter().skip(rows.len().saturating_sub(tail)) {
                let reference = row
                    .reference_rate
                    .map(|r| format!("{:.4}", r))
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{:<12} {:>12} {:>12.4} {:>12.4} {:>12.4}",
                    row.date, reference, row.simulated_a, row.simulated_b, row.basket_value
                );
            }
            println!("{} rows", rows.len().to_string().dimmed());
        }
        Err(e) => println!("{} {}", "Unavailable:".red().bold(), e),
    }
}

fn print_pair(panel: &PairPanel, tail: usize) {
    let s = &panel.summary;
    let fmt_opt = |x: Option<f64>| {
        x.map(|v| format!("{:.2}", v))
            .unwrap_or_else(|| "n/a".to_string())
    };
    println!(
        "{} {}  n={}  mean={:.6}  ar={:?}  ma={:?}  sigma2={:.3e}",
        "Model:".bold(),
        s.order,
        s.nobs,
        s.mean,
        s.ar,
        s.ma,
        s.sigma2
    );
    println!(
        "       loglik={}  AIC={}  BIC={}{}",
        fmt_opt(s.log_likelihood),
        fmt_opt(s.aic),
        fmt_opt(s.bic),
        if s.degenerate { "  (constant deviation)".yellow().to_string() } else { String::new() }
    );

    println!();
    println!(
        "{:<12} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10}",
        "Date", "Central", "Official", "Adjusted", "Adj. err", "Band low", "Band high"
    );
    let rows = &panel.comparison;
    for row in rows.iter().skip(rows.len().saturating_sub(tail)) {
        let official = format!("{:>10.4}", row.official_rate);
        let official = if row.official_rate < row.band_lower || row.official_rate > row.band_upper {
            official.red().to_string()
        } else {
            official
        };
        println!(
            "{:<12} {:>10.4} {} {:>10.4} {:>10.4} {:>10.4} {:>10.4}",
            row.date,
            row.central_rate,
            official,
            row.adjusted_rate,
            row.adjusted_error,
            row.band_lower,
            row.band_upper
        );
    }

    println!();
    match &panel.forecast {
        Ok(forecast) => {
            println!(
                "{} {} business days from {} ({:.0}% bounds)",
                "Forecast:".bold(),
                forecast.rows.len(),
                forecast.last_date,
                forecast.level * 100.0
            );
            println!(
                "{:<12} {:>10} {:>10} {:>10} {:>10}",
                "Date", "Deviation", "Rate", "Lower", "Upper"
            );
            for row in &forecast.rows {
                println!(
                    "{:<12} {:>10.5} {:>10.4} {:>10.4} {:>10.4}",
                    row.date,
                    row.predicted_deviation,
                    row.predicted_rate,
                    row.lower_bound,
                    row.upper_bound
                );
            }
        }
        Err(e) => println!("{} {}", "Forecast unavailable:".red().bold(), e),
    }
}

fn inspect_workbook(path: &Path) -> anyhow::Result<()> {
    let mut workbook =
        open_workbook(path).with_context(|| format!("opening {}", path.display()))?;
    let names = workbook.sheet_names();
    if names.is_empty() {
        println!("{}", "No sheets found".yellow());
        return Ok(());
    }

    println!("{} {}", "Workbook:".bold(), path.display());
    for name in names {
        let sheet = workbook.sheet(&name)?;
        println!(
            "  {} ({} rows)",
            sheet.name.green().bold(),
            sheet.rows.len()
        );
        for header in &sheet.headers {
            println!("    - {}", header);
        }
    }
    Ok(())
}
