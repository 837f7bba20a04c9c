//! Workbook sources
//!
//! A workbook is a set of named sheets, each a header row followed by data
//! rows. Two sources are supported: spreadsheet files read through
//! `calamine` (feature `xlsx`) and a directory holding one `<sheet>.csv` per
//! sheet.

use crate::error::{DashboardError, Result};
use csv::ReaderBuilder;
use std::fs;
use std::path::{Path, PathBuf};

/// A single cell value
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    /// Numeric cell; spreadsheet dates arrive here as serial numbers
    Number(f64),
    Text(String),
}

impl Cell {
    /// Blank text counts as empty
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(_) => false,
        }
    }

    pub fn display(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Number(n) => n.to_string(),
            Cell::Text(s) => s.clone(),
        }
    }
}

/// One sheet: header names and data rows
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    /// Index of the column named exactly `column` (surrounding whitespace ignored)
    pub fn column_index(&self, column: &str) -> Result<usize> {
        self.headers
            .iter()
            .position(|h| h.trim() == column)
            .ok_or_else(|| DashboardError::MissingColumn {
                sheet: self.name.clone(),
                column: column.to_string(),
            })
    }

    /// Cell at `(row, col)`; short rows read as empty
    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&Cell::Empty)
    }

    pub fn row_is_empty(&self, row: usize) -> bool {
        self.rows
            .get(row)
            .map_or(true, |r| r.iter().all(Cell::is_empty))
    }
}

/// Source of named sheets
pub trait WorkbookSource {
    fn sheet_names(&self) -> Vec<String>;

    fn sheet(&mut self, name: &str) -> Result<Sheet>;
}

/// Directory of CSV files, one per sheet
#[derive(Debug, Clone)]
pub struct CsvWorkbook {
    root: PathBuf,
}

impl CsvWorkbook {
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(DashboardError::InputFormat(format!(
                "{} is not a directory",
                root.display()
            )));
        }
        Ok(Self { root })
    }

    fn sheet_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.csv", name))
    }
}

impl WorkbookSource for CsvWorkbook {
    fn sheet_names(&self) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(&self.root)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.path())
                    .filter(|p| p.extension().map_or(false, |ext| ext == "csv"))
                    .filter_map(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }

    fn sheet(&mut self, name: &str) -> Result<Sheet> {
        let path = self.sheet_path(name);
        if !path.is_file() {
            return Err(DashboardError::MissingSheet {
                sheet: name.to_string(),
            });
        }

        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(&path)?;

        let headers = rdr.headers()?.iter().map(|h| h.to_string()).collect();
        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record?;
            rows.push(
                record
                    .iter()
                    .map(|field| {
                        if field.is_empty() {
                            Cell::Empty
                        } else {
                            Cell::Text(field.to_string())
                        }
                    })
                    .collect(),
            );
        }

        log::debug!("read sheet '{}' from {} ({} rows)", name, path.display(), rows.len());
        Ok(Sheet {
            name: name.to_string(),
            headers,
            rows,
        })
    }
}

#[cfg(feature = "xlsx")]
mod spreadsheet {
    use super::{Cell, Sheet, WorkbookSource};
    use crate::error::{DashboardError, Result};
    use calamine::{open_workbook_auto, Data, Reader, Sheets};
    use std::fs::File;
    use std::io::BufReader;
    use std::path::Path;

    /// `.xlsx`, `.xlsm`, `.xlsb`, `.xls` or `.ods` file
    pub struct XlsxWorkbook {
        inner: Sheets<BufReader<File>>,
    }

    impl XlsxWorkbook {
        pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
            let path = path.as_ref();
            let inner = open_workbook_auto(path).map_err(|e| {
                DashboardError::InputFormat(format!("Failed to open {}: {}", path.display(), e))
            })?;
            Ok(Self { inner })
        }
    }

    fn to_cell(data: &Data) -> Cell {
        match data {
            Data::Int(i) => Cell::Number(*i as f64),
            Data::Float(f) => Cell::Number(*f),
            Data::DateTime(dt) => Cell::Number(dt.as_f64()),
            Data::String(s) | Data::DateTimeIso(s) => Cell::Text(s.clone()),
            Data::Bool(b) => Cell::Text(b.to_string()),
            _ => Cell::Empty,
        }
    }

    impl WorkbookSource for XlsxWorkbook {
        fn sheet_names(&self) -> Vec<String> {
            self.inner.sheet_names().to_vec()
        }

        fn sheet(&mut self, name: &str) -> Result<Sheet> {
            if !self.inner.sheet_names().iter().any(|s| s == name) {
                return Err(DashboardError::MissingSheet {
                    sheet: name.to_string(),
                });
            }
            let range = self.inner.worksheet_range(name).map_err(|e| {
                DashboardError::InputFormat(format!("Failed to read sheet '{}': {}", name, e))
            })?;

            let mut rows = range.rows();
            let headers = rows
                .next()
                .map(|r| r.iter().map(|c| to_cell(c).display()).collect())
                .unwrap_or_default();
            let rows: Vec<Vec<Cell>> = rows.map(|r| r.iter().map(to_cell).collect()).collect();

            log::debug!("read sheet '{}' ({} rows)", name, rows.len());
            Ok(Sheet {
                name: name.to_string(),
                headers,
                rows,
            })
        }
    }
}

#[cfg(feature = "xlsx")]
pub use spreadsheet::XlsxWorkbook;

/// Open a workbook: a directory becomes a [`CsvWorkbook`], a spreadsheet
/// file an `XlsxWorkbook`.
pub fn open_workbook<P: AsRef<Path>>(path: P) -> Result<Box<dyn WorkbookSource>> {
    let path = path.as_ref();
    if path.is_dir() {
        return Ok(Box::new(CsvWorkbook::open(path)?));
    }
    if !path.exists() {
        return Err(DashboardError::InputFormat(format!(
            "Workbook {} does not exist",
            path.display()
        )));
    }

    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        #[cfg(feature = "xlsx")]
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Ok(Box::new(XlsxWorkbook::open(path)?)),
        #[cfg(not(feature = "xlsx"))]
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Err(DashboardError::InputFormat(format!(
            "{}: spreadsheet support requires the `xlsx` feature",
            path.display()
        ))),
        _ => Err(DashboardError::InputFormat(format!(
            "{}: expected a spreadsheet file or a directory of CSV sheets",
            path.display()
        ))),
    }
}
