//! Error types for fx-deviation

use thiserror::Error;

/// Main error type for the deviation dashboard
#[derive(Error, Debug)]
pub enum DashboardError {
    /// Workbook content does not match the expected layout
    #[error("Input format error: {0}")]
    InputFormat(String),

    #[error("Missing sheet '{sheet}' in workbook")]
    MissingSheet { sheet: String },

    #[error("Missing column '{column}' in sheet '{sheet}'")]
    MissingColumn { sheet: String, column: String },

    #[error("Unparsable {kind} '{value}' in sheet '{sheet}', row {row}")]
    UnparsableCell {
        sheet: String,
        row: usize,
        kind: &'static str,
        value: String,
    },

    #[error("Model fit error for {series}: {reason}")]
    ModelFit { series: String, reason: String },

    #[error("Insufficient data for {series}: required {required}, got {actual}")]
    InsufficientData {
        series: String,
        required: usize,
        actual: usize,
    },

    #[error("Forecast error: {0}")]
    Forecast(String),

    #[error("Parameter '{name}' out of range: {value} not in [{min}, {max}]")]
    ParameterRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Calendar error: {0}")]
    CalendarError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
}

impl DashboardError {
    /// True for the error classes that abort the pipeline before any computation
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            DashboardError::InputFormat(_)
                | DashboardError::MissingSheet { .. }
                | DashboardError::MissingColumn { .. }
                | DashboardError::UnparsableCell { .. }
        )
    }

    /// True for estimator failures (including too-short series)
    pub fn is_model_fit_error(&self) -> bool {
        matches!(
            self,
            DashboardError::ModelFit { .. } | DashboardError::InsufficientData { .. }
        )
    }
}

/// Result type alias for dashboard operations
pub type Result<T> = std::result::Result<T, DashboardError>;
