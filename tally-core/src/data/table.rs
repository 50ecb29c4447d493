//! Typed Tables
//!
//! A table is an ordered set of named columns of equal length. Each column is
//! homogeneous; individual cells may be missing. Keeping the column type
//! explicit turns "mean of a text column" into an anticipated
//! [`ComputeError::NonNumericColumn`] instead of a surprise.

use indexmap::IndexMap;
use serde::Serialize;

use super::stats::{self, Summary};
use crate::error::ComputeError;
use crate::value::Value;

/// A homogeneous column of optional cells.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "cells", rename_all = "snake_case")]
pub enum Column {
    Int(Vec<Option<i64>>),
    Float(Vec<Option<f64>>),
    Bool(Vec<Option<bool>>),
    Text(Vec<Option<String>>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Int(cells) => cells.len(),
            Column::Float(cells) => cells.len(),
            Column::Bool(cells) => cells.len(),
            Column::Text(cells) => cells.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Column::Int(_) => "int",
            Column::Float(_) => "float",
            Column::Bool(_) => "bool",
            Column::Text(_) => "text",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Column::Int(_) | Column::Float(_))
    }

    /// The column as floats, or `None` for non-numeric columns.
    pub fn numbers(&self) -> Option<Vec<Option<f64>>> {
        match self {
            Column::Int(cells) => Some(cells.iter().map(|c| c.map(|v| v as f64)).collect()),
            Column::Float(cells) => Some(cells.clone()),
            _ => None,
        }
    }

    /// The cell at `row` as a [`Value`]; missing cells are `Value::Null`.
    /// `None` if `row` is out of range.
    pub fn cell(&self, row: usize) -> Option<Value> {
        match self {
            Column::Int(cells) => cells.get(row).map(|&c| c.into()),
            Column::Float(cells) => cells.get(row).map(|&c| c.into()),
            Column::Bool(cells) => cells.get(row).map(|&c| c.into()),
            Column::Text(cells) => cells.get(row).map(|c| c.clone().into()),
        }
    }

    fn number_at(&self, row: usize) -> Option<f64> {
        match self {
            Column::Int(cells) => cells[row].map(|v| v as f64),
            Column::Float(cells) => cells[row],
            _ => None,
        }
    }

    /// A new column holding the given rows, in order.
    fn take(&self, rows: &[usize]) -> Column {
        match self {
            Column::Int(cells) => Column::Int(rows.iter().map(|&r| cells[r]).collect()),
            Column::Float(cells) => Column::Float(rows.iter().map(|&r| cells[r]).collect()),
            Column::Bool(cells) => Column::Bool(rows.iter().map(|&r| cells[r]).collect()),
            Column::Text(cells) => {
                Column::Text(rows.iter().map(|&r| cells[r].clone()).collect())
            }
        }
    }
}

/// A row filter, as produced by the selection widgets of a dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Predicate {
    /// Keep rows whose cell equals one of `values` (multiselect).
    OneOf { column: String, values: Vec<Value> },
    /// Keep rows whose numeric cell lies in `min..=max` (range slider).
    Between { column: String, min: f64, max: f64 },
}

/// How [`Table::group_by`] folds the values of one group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Agg {
    /// Mean of the present values; missing if there are none.
    Mean,
    /// Sum of the present values.
    Sum,
    /// Number of present values.
    Count,
}

/// A table of named, typed columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    columns: IndexMap<String, Column>,
    rows: usize,
}

impl Table {
    /// Create an empty table with no columns.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a column. Fails if its length differs from the existing columns or
    /// the name is already taken.
    pub fn with_column(
        mut self,
        name: impl Into<String>,
        column: Column,
    ) -> Result<Self, ComputeError> {
        let name = name.into();
        if self.columns.contains_key(&name) {
            return Err(ComputeError::failed(format!("duplicate column '{name}'")));
        }
        if !self.columns.is_empty() && column.len() != self.rows {
            return Err(ComputeError::failed(format!(
                "column '{name}' has {} rows, table has {}",
                column.len(),
                self.rows
            )));
        }
        self.rows = column.len();
        self.columns.insert(name, column);
        Ok(self)
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.columns.iter().map(|(name, column)| (name.as_str(), column))
    }

    pub fn column(&self, name: &str) -> Result<&Column, ComputeError> {
        self.columns
            .get(name)
            .ok_or_else(|| ComputeError::UnknownColumn {
                column: name.to_owned(),
            })
    }

    /// A numeric column as floats.
    pub fn numeric(&self, name: &str) -> Result<Vec<Option<f64>>, ComputeError> {
        self.column(name)?
            .numbers()
            .ok_or_else(|| ComputeError::NonNumericColumn {
                column: name.to_owned(),
            })
    }

    /// Distinct present values of a column, in first-seen order.
    pub fn unique(&self, name: &str) -> Result<Vec<Value>, ComputeError> {
        let column = self.column(name)?;
        let mut seen: Vec<Value> = Vec::new();
        for cell in (0..self.rows).filter_map(|row| column.cell(row)) {
            if !cell.is_null() && !seen.contains(&cell) {
                seen.push(cell);
            }
        }
        Ok(seen)
    }

    /// Keep only the rows matching every predicate.
    pub fn filter(&self, predicates: &[Predicate]) -> Result<Table, ComputeError> {
        let mut keep = vec![true; self.rows];
        for predicate in predicates {
            match predicate {
                Predicate::OneOf { column, values } => {
                    let column = self.column(column)?;
                    for (row, kept) in keep.iter_mut().enumerate() {
                        *kept = *kept
                            && column
                                .cell(row)
                                .is_some_and(|cell| matches_any(&cell, values));
                    }
                }
                Predicate::Between { column: name, min, max } => {
                    let column = self.column(name)?;
                    if !column.is_numeric() {
                        return Err(ComputeError::NonNumericColumn {
                            column: name.clone(),
                        });
                    }
                    for (row, kept) in keep.iter_mut().enumerate() {
                        *kept = *kept
                            && column
                                .number_at(row)
                                .is_some_and(|v| v >= *min && v <= *max);
                    }
                }
            }
        }

        let rows: Vec<usize> = keep
            .iter()
            .enumerate()
            .filter_map(|(row, kept)| kept.then_some(row))
            .collect();
        Ok(self.take(&rows))
    }

    /// Summary statistics of one numeric column.
    pub fn summary(&self, name: &str) -> Result<Summary, ComputeError> {
        Summary::of(&self.numeric(name)?)
    }

    /// Pearson correlation between two numeric columns.
    pub fn correlation(&self, x: &str, y: &str) -> Result<f64, ComputeError> {
        stats::correlation(&self.numeric(x)?, &self.numeric(y)?)
    }

    /// Only the named columns, in the given order.
    pub fn select(&self, names: &[&str]) -> Result<Table, ComputeError> {
        let mut selected = Table::new();
        for &name in names {
            selected = selected.with_column(name, self.column(name)?.clone())?;
        }
        Ok(selected)
    }

    /// The first `n` rows.
    pub fn head(&self, n: usize) -> Table {
        let rows: Vec<usize> = (0..self.rows.min(n)).collect();
        self.take(&rows)
    }

    /// One row per distinct present value of `key`, in first-seen order, with
    /// the numeric column `value` folded by `agg`. Rows with a missing key are
    /// dropped.
    pub fn group_by(&self, key: &str, value: &str, agg: Agg) -> Result<Table, ComputeError> {
        let keys = self.column(key)?;
        let values = self.numeric(value)?;

        // Cells of one column share a type, so their text form identifies them.
        let mut groups: IndexMap<String, Vec<usize>> = IndexMap::new();
        for row in 0..self.rows {
            match keys.cell(row) {
                Some(cell) if !cell.is_null() => {
                    groups.entry(cell.to_string()).or_default().push(row)
                }
                _ => {}
            }
        }

        let firsts: Vec<usize> = groups.values().filter_map(|rows| rows.first().copied()).collect();
        let folded = groups.values().map(|rows| {
            let group: Vec<Option<f64>> = rows.iter().map(|&row| values[row]).collect();
            match agg {
                Agg::Mean => stats::mean(&group).ok(),
                Agg::Sum => Some(stats::sum(&group)),
                Agg::Count => Some(stats::count(&group) as f64),
            }
        });
        let aggregated = match agg {
            Agg::Count => Column::Int(folded.map(|v| v.map(|n| n as i64)).collect()),
            Agg::Mean | Agg::Sum => Column::Float(folded.collect()),
        };

        let grouped = Table::new().with_column(key, keys.take(&firsts))?;
        if key == value {
            return Ok(grouped);
        }
        grouped.with_column(value, aggregated)
    }

    /// Pairwise Pearson correlations of numeric columns. The first column
    /// holds the names; pairs without enough data are missing.
    pub fn correlation_matrix(&self, names: &[&str]) -> Result<Table, ComputeError> {
        let columns = names
            .iter()
            .map(|&name| self.numeric(name))
            .collect::<Result<Vec<_>, _>>()?;

        let mut matrix = Table::new().with_column(
            "column",
            Column::Text(names.iter().map(|&name| Some(name.to_owned())).collect()),
        )?;
        for (name, x) in names.iter().zip(&columns) {
            let cells = columns
                .iter()
                .map(|y| stats::correlation(x, y).ok())
                .collect();
            matrix = matrix.with_column(*name, Column::Float(cells))?;
        }
        Ok(matrix)
    }

    fn take(&self, rows: &[usize]) -> Table {
        Table {
            columns: self
                .columns
                .iter()
                .map(|(name, column)| (name.clone(), column.take(rows)))
                .collect(),
            rows: rows.len(),
        }
    }

    /// One row per numeric column with its summary statistics. Columns without
    /// any present value get missing cells rather than failing the whole table.
    pub fn describe(&self) -> Table {
        let mut names = Vec::new();
        let mut counts = Vec::new();
        let mut means = Vec::new();
        let mut medians = Vec::new();
        let mut stds = Vec::new();
        let mut mins = Vec::new();
        let mut maxs = Vec::new();

        for (name, column) in &self.columns {
            let Some(values) = column.numbers() else {
                continue;
            };
            let summary = Summary::of(&values).ok();
            names.push(Some(name.clone()));
            counts.push(Some(stats::count(&values) as i64));
            means.push(summary.as_ref().map(|s| s.mean));
            medians.push(summary.as_ref().map(|s| s.median));
            stds.push(summary.as_ref().and_then(|s| s.std));
            mins.push(summary.as_ref().map(|s| s.min));
            maxs.push(summary.as_ref().map(|s| s.max));
        }

        let rows = names.len();
        let columns = IndexMap::from([
            ("column".to_owned(), Column::Text(names)),
            ("count".to_owned(), Column::Int(counts)),
            ("mean".to_owned(), Column::Float(means)),
            ("median".to_owned(), Column::Float(medians)),
            ("std".to_owned(), Column::Float(stds)),
            ("min".to_owned(), Column::Float(mins)),
            ("max".to_owned(), Column::Float(maxs)),
        ]);
        Table { columns, rows }
    }
}

/// Equality between a cell and a selected value. Numbers compare by value so
/// an integer column can be filtered with float selections.
fn matches_any(cell: &Value, values: &[Value]) -> bool {
    if cell.is_null() {
        return false;
    }
    values.iter().any(|value| match (cell.as_f64(), value.as_f64()) {
        (Ok(a), Ok(b)) => a == b,
        _ => cell == value,
    })
}
