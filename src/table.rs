//! In-memory tabular representation shared by every layer.
//!
//! Raw upstream payloads are heterogeneous, so bronze data is kept as a
//! loosely typed [`Table`] of [`Cell`]s. The operations here are the small
//! set the per-source normalizers need: row filtering, column pruning,
//! renaming and per-column conversion, plus CSV round-tripping for the
//! layer files.

use std::fmt;
use std::io;

use chrono::NaiveDate;
use serde_json::Value;

use crate::error::TableError;

/// A single loosely typed value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    /// NaN floats count as null, like a missing value upstream.
    pub fn is_null(&self) -> bool {
        match self {
            Cell::Null => true,
            Cell::Float(v) => v.is_nan(),
            _ => false,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Int(i) => Some(*i as f64),
            Cell::Float(v) if !v.is_nan() => Some(*v),
            Cell::Text(s) if looks_numeric(s.trim()) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Integer view. Finite floats are truncated toward zero.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Cell::Int(i) => Some(*i),
            Cell::Float(v) if v.is_finite() => Some(v.trunc() as i64),
            Cell::Text(s) => {
                let s = s.trim();
                s.parse::<i64>().ok().or_else(|| {
                    Cell::text(s)
                        .as_f64()
                        .filter(|v| v.is_finite())
                        .map(|v| v.trunc() as i64)
                })
            }
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// String form used as a join key. Integral floats lose their fraction
    /// so `3550308.0` and `3550308` meet on the same key.
    pub fn to_key(&self) -> Option<String> {
        match self {
            Cell::Null => None,
            Cell::Bool(b) => Some(b.to_string()),
            Cell::Int(i) => Some(i.to_string()),
            Cell::Float(v) if v.is_nan() => None,
            Cell::Float(v) if v.fract() == 0.0 && v.abs() < 1e15 => Some((*v as i64).to_string()),
            Cell::Float(v) => Some(v.to_string()),
            Cell::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
            Cell::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
        }
    }

    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Cell::Null,
            Value::Bool(b) => Cell::Bool(*b),
            Value::Number(n) => n
                .as_i64()
                .map(Cell::Int)
                .or_else(|| n.as_f64().map(Cell::Float))
                .unwrap_or(Cell::Null),
            Value::String(s) => Cell::Text(s.clone()),
            other => Cell::Text(other.to_string()),
        }
    }

    /// Type inference for cells read back from CSV.
    pub fn infer(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == "NA" || trimmed == "NaN" {
            return Cell::Null;
        }
        if let Ok(i) = trimmed.parse::<i64>() {
            return Cell::Int(i);
        }
        if looks_numeric(trimmed) {
            if let Ok(v) = trimmed.parse::<f64>() {
                return Cell::Float(v);
            }
        }
        if let Ok(d) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
            return Cell::Date(d);
        }
        match trimmed {
            "true" | "TRUE" => Cell::Bool(true),
            "false" | "FALSE" => Cell::Bool(false),
            _ => Cell::Text(raw.to_string()),
        }
    }
}

// Rejects words like "inf" or "nan" that f64::from_str would accept.
fn looks_numeric(s: &str) -> bool {
    s.starts_with(|c: char| c.is_ascii_digit() || c == '-' || c == '+' || c == '.')
        && s.chars().any(|c| c.is_ascii_digit())
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => Ok(()),
            Cell::Bool(b) => write!(f, "{b}"),
            Cell::Int(i) => write!(f, "{i}"),
            Cell::Float(v) if v.is_nan() => Ok(()),
            Cell::Float(v) => write!(f, "{v:?}"),
            Cell::Text(s) => f.write_str(s),
            Cell::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

/// Ordered, named columns over rows of cells.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new<I, S>(columns: I) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        for (i, column) in columns.iter().enumerate() {
            if columns[..i].contains(column) {
                return Err(TableError::DuplicateColumn(column.clone()));
            }
        }
        Ok(Self {
            columns,
            rows: Vec::new(),
        })
    }

    pub fn push_row(&mut self, row: Vec<Cell>) -> Result<(), TableError> {
        if row.len() != self.columns.len() {
            return Err(TableError::RowWidth {
                expected: self.columns.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn require_column(&self, name: &str) -> Result<usize, TableError> {
        self.column_index(name)
            .ok_or_else(|| TableError::MissingColumn(name.to_string()))
    }

    /// First column whose name satisfies `pred`.
    pub fn find_column(&self, pred: impl Fn(&str) -> bool) -> Option<&str> {
        self.columns.iter().map(String::as_str).find(|c| pred(c))
    }

    pub fn column_values(&self, name: &str) -> Result<impl Iterator<Item = &Cell> + '_, TableError> {
        let idx = self.require_column(name)?;
        Ok(self.rows.iter().map(move |row| &row[idx]))
    }

    /// Keep rows whose `column` equals `expected`.
    pub fn filter_eq(mut self, column: &str, expected: &Cell) -> Result<Self, TableError> {
        let idx = self.require_column(column)?;
        self.rows.retain(|row| &row[idx] == expected);
        Ok(self)
    }

    /// Every named column must exist.
    pub fn drop_columns(mut self, names: &[&str]) -> Result<Self, TableError> {
        let mut drop = Vec::with_capacity(names.len());
        for name in names {
            drop.push(self.require_column(name)?);
        }
        let keep: Vec<usize> = (0..self.columns.len()).filter(|i| !drop.contains(i)).collect();

        self.columns = keep.iter().map(|&i| self.columns[i].clone()).collect();
        for row in &mut self.rows {
            let old = std::mem::take(row);
            *row = old
                .into_iter()
                .enumerate()
                .filter(|(i, _)| keep.contains(i))
                .map(|(_, cell)| cell)
                .collect();
        }
        Ok(self)
    }

    pub fn rename_columns(mut self, renames: &[(&str, &str)]) -> Result<Self, TableError> {
        for (from, to) in renames {
            let idx = self.require_column(from)?;
            if let Some(existing) = self.column_index(to) {
                if existing != idx {
                    return Err(TableError::DuplicateColumn((*to).to_string()));
                }
            }
            self.columns[idx] = (*to).to_string();
        }
        Ok(self)
    }

    pub fn map_column<F>(mut self, column: &str, mut f: F) -> Result<Self, TableError>
    where
        F: FnMut(&Cell) -> Cell,
    {
        let idx = self.require_column(column)?;
        for row in &mut self.rows {
            row[idx] = f(&row[idx]);
        }
        Ok(self)
    }

    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut out = csv::Writer::from_writer(writer);
        out.write_record(&self.columns)?;
        for row in &self.rows {
            out.write_record(row.iter().map(|cell| cell.to_string()))?;
        }
        out.flush()?;
        Ok(())
    }

    pub fn read_csv<R: io::Read>(reader: R) -> Result<Self, csv::Error> {
        let mut input = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);
        let columns: Vec<String> = input.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for record in input.records() {
            let record = record?;
            rows.push(record.iter().map(Cell::infer).collect());
        }
        Ok(Self { columns, rows })
    }
}
