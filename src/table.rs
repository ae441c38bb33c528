//! Columnar telemetry table loaded from CSV.
//!
//! Columns are typed once at load time: the requested timestamp column is
//! parsed into `NaiveDateTime`, columns whose every non-empty cell parses
//! as a float become numeric (empty cells are NaN), everything else stays
//! text.

use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, Trim};
use tracing::debug;

use crate::error::TableError;

/// Date-time layouts accepted for the timestamp column, tried in order.
const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// A single typed column.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Timestamp(Vec<NaiveDateTime>),
    Numeric(Vec<f64>),
    Text(Vec<String>),
}

impl Column {
    fn len(&self) -> usize {
        match self {
            Self::Timestamp(v) => v.len(),
            Self::Numeric(v) => v.len(),
            Self::Text(v) => v.len(),
        }
    }

    /// Returns the cell at `row` rendered as a string. NaN renders empty.
    pub fn display(&self, row: usize) -> String {
        match self {
            Self::Timestamp(v) => v[row].format("%Y-%m-%d %H:%M:%S").to_string(),
            Self::Numeric(v) if v[row].is_nan() => String::new(),
            Self::Numeric(v) => v[row].to_string(),
            Self::Text(v) => v[row].clone(),
        }
    }

    /// Renders every cell as a string.
    pub fn to_strings(&self) -> Vec<String> {
        (0..self.len()).map(|row| self.display(row)).collect()
    }

    fn filter(&self, mask: &[bool]) -> Column {
        fn keep<T: Clone>(values: &[T], mask: &[bool]) -> Vec<T> {
            values
                .iter()
                .zip(mask)
                .filter(|(_, keep)| **keep)
                .map(|(v, _)| v.clone())
                .collect()
        }

        match self {
            Self::Timestamp(v) => Self::Timestamp(keep(v, mask)),
            Self::Numeric(v) => Self::Numeric(keep(v, mask)),
            Self::Text(v) => Self::Text(keep(v, mask)),
        }
    }
}

/// An ordered set of named, equally long columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataTable {
    names: Vec<String>,
    columns: Vec<Column>,
    rows: usize,
}

impl DataTable {
    /// Builds a table from named columns. All columns must have the same length.
    pub fn new(columns: Vec<(String, Column)>) -> Self {
        let rows = columns.first().map(|(_, c)| c.len()).unwrap_or(0);
        debug_assert!(columns.iter().all(|(_, c)| c.len() == rows));

        let (names, columns) = columns.into_iter().unzip();
        Self {
            names,
            columns,
            rows,
        }
    }

    /// Reads a CSV file, parsing `timestamp_column` as date-times when given.
    pub fn read_csv(path: &Path, timestamp_column: Option<&str>) -> Result<Self, TableError> {
        let reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::All)
            .from_path(path)?;
        let table = Self::from_csv_reader(reader, timestamp_column)?;

        debug!(
            "Loaded {} rows x {} columns from {}",
            table.num_rows(),
            table.num_columns(),
            path.display()
        );
        Ok(table)
    }

    /// Reads CSV content from any reader.
    pub fn from_reader<R: Read>(reader: R, timestamp_column: Option<&str>) -> Result<Self, TableError> {
        let reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::All)
            .from_reader(reader);
        Self::from_csv_reader(reader, timestamp_column)
    }

    fn from_csv_reader<R: Read>(
        mut reader: csv::Reader<R>,
        timestamp_column: Option<&str>,
    ) -> Result<Self, TableError> {
        let names: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let mut cells: Vec<Vec<String>> = vec![Vec::new(); names.len()];

        for record in reader.records() {
            let record = record?;
            for (column, value) in cells.iter_mut().zip(record.iter()) {
                column.push(value.to_string());
            }
        }

        let mut columns = Vec::with_capacity(names.len());
        for (name, raw) in names.iter().zip(cells) {
            let column = if timestamp_column == Some(name.as_str()) {
                parse_timestamp_column(name, raw)?
            } else {
                infer_column(raw)
            };
            columns.push((name.clone(), column));
        }

        Ok(Self::new(columns))
    }

    pub fn num_rows(&self) -> usize {
        self.rows
    }

    pub fn num_columns(&self) -> usize {
        self.names.len()
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.position(name).map(|i| &self.columns[i])
    }

    /// Returns a numeric column's values.
    pub fn numeric(&self, name: &str) -> Result<&[f64], TableError> {
        match self.column(name) {
            Some(Column::Numeric(values)) => Ok(values),
            Some(_) => Err(TableError::NotNumeric(name.to_string())),
            None => Err(TableError::MissingColumn(name.to_string())),
        }
    }

    /// Returns a timestamp column's values.
    pub fn timestamps(&self, name: &str) -> Result<&[NaiveDateTime], TableError> {
        match self.column(name) {
            Some(Column::Timestamp(values)) => Ok(values),
            Some(_) => Err(TableError::NotTimestamp(name.to_string())),
            None => Err(TableError::MissingColumn(name.to_string())),
        }
    }

    /// Renames columns in place. `rename` returns the new name, or `None` to keep it.
    pub fn rename_with<F>(&mut self, mut rename: F)
    where
        F: FnMut(&str) -> Option<String>,
    {
        for name in &mut self.names {
            if let Some(new_name) = rename(name) {
                *name = new_name;
            }
        }
    }

    /// Removes a column, returning it. Absent columns are ignored.
    pub fn drop_column(&mut self, name: &str) -> Option<Column> {
        let idx = self.position(name)?;
        self.names.remove(idx);
        let column = self.columns.remove(idx);
        if self.columns.is_empty() {
            self.rows = 0;
        }
        Some(column)
    }

    /// Returns a new table with exactly `names`, in that order.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<DataTable, TableError> {
        let mut columns = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            let column = self
                .column(name)
                .ok_or_else(|| TableError::MissingColumn(name.to_string()))?;
            columns.push((name.to_string(), column.clone()));
        }

        let mut table = Self::new(columns);
        table.rows = self.rows;
        Ok(table)
    }

    /// Row-major values of the numeric columns `names`, in that order.
    /// Missing cells (NaN) are rejected.
    pub fn numeric_rows<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<Vec<f64>>, TableError> {
        let columns = names
            .iter()
            .map(|name| self.numeric(name.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        let mut rows = Vec::with_capacity(self.rows);
        for row in 0..self.rows {
            let mut values = Vec::with_capacity(columns.len());
            for (name, column) in names.iter().zip(&columns) {
                let value = column[row];
                if value.is_nan() {
                    return Err(TableError::MissingValue {
                        column: name.as_ref().to_string(),
                        row,
                    });
                }
                values.push(value);
            }
            rows.push(values);
        }
        Ok(rows)
    }

    /// Keeps only the rows whose mask entry is true.
    pub fn filter_rows(&self, mask: &[bool]) -> DataTable {
        debug_assert_eq!(mask.len(), self.rows);

        Self {
            names: self.names.clone(),
            columns: self.columns.iter().map(|c| c.filter(mask)).collect(),
            rows: mask.iter().filter(|keep| **keep).count(),
        }
    }

    /// Keeps rows whose timestamp lies in `[start, end]`, inclusive on both ends.
    pub fn filter_time_range(
        &self,
        column: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<DataTable, TableError> {
        let mask: Vec<bool> = self
            .timestamps(column)?
            .iter()
            .map(|ts| *ts >= start && *ts <= end)
            .collect();
        Ok(self.filter_rows(&mask))
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }
}

/// Parses a timestamp in any of the accepted layouts.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    for format in TIMESTAMP_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(value, format) {
            return Some(ts);
        }
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.naive_utc());
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

fn parse_timestamp_column(name: &str, raw: Vec<String>) -> Result<Column, TableError> {
    let mut values = Vec::with_capacity(raw.len());
    for (row, value) in raw.into_iter().enumerate() {
        match parse_timestamp(&value) {
            Some(ts) => values.push(ts),
            None => {
                return Err(TableError::InvalidTimestamp {
                    column: name.to_string(),
                    row,
                    value,
                })
            }
        }
    }
    Ok(Column::Timestamp(values))
}

fn infer_column(raw: Vec<String>) -> Column {
    let numeric = raw
        .iter()
        .all(|cell| cell.is_empty() || cell.parse::<f64>().is_ok());

    if numeric {
        Column::Numeric(
            raw.iter()
                .map(|cell| cell.parse::<f64>().unwrap_or(f64::NAN))
                .collect(),
        )
    } else {
        Column::Text(raw)
    }
}
