//! Workbook input: sheet sources and the loader that turns sheets into rate series

pub mod loader;
pub mod workbook;

pub use loader::{load_input, load_rate_series, load_reference, DashboardInput};
pub use workbook::{open_workbook, Cell, CsvWorkbook, Sheet, WorkbookSource};

#[cfg(feature = "xlsx")]
pub use workbook::XlsxWorkbook;
