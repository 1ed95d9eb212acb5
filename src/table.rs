//! Loosely-structured tabular data with best-effort typing.
//!
//! Sales CSV exports do not agree on column names or value formats, so the
//! table keeps every cell as a [`Value`] and leaves typing to explicit
//! coercion passes. Coercion consumes the table and returns the re-typed
//! table; nothing is rewritten behind the caller's back, and the coerced
//! table can then be shared immutably between the chart writers and the KPI
//! aggregator.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};

use crate::util::{parse_date_safe, parse_f64_safe};

/// A single cell. Raw CSV input loads as `Text` (or `Missing` for empty
/// fields); coercion re-types cells to `Number`/`Date`, turning unparseable
/// values into `Missing` rather than failing.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Number(f64),
    Date(NaiveDate),
    Missing,
}

impl Value {
    pub fn from_field(field: &str) -> Value {
        if field.is_empty() {
            Value::Missing
        } else {
            Value::Text(field.to_string())
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    /// Label used when grouping by this value (region names, customers, ...).
    /// Missing cells yield `None` and the row is excluded from the grouping.
    pub fn label(&self) -> Option<String> {
        match self {
            Value::Text(s) => Some(s.clone()),
            Value::Number(v) => Some(v.to_string()),
            Value::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
            Value::Missing => None,
        }
    }

    /// Rendering used when writing the value back out to CSV. Missing cells
    /// become empty fields; integral numbers print without a decimal point.
    pub fn to_field(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Number(v) => format!("{}", v),
            Value::Date(d) => d.format("%Y-%m-%d").to_string(),
            Value::Missing => String::new(),
        }
    }
}

/// An ordered set of named columns over row-major cells. Every row holds
/// exactly `headers.len()` values; the constructor pads short rows with
/// `Missing` and truncates long ones, matching the flexible CSV reader.
#[derive(Debug, Clone)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(headers: Vec<String>, mut rows: Vec<Vec<Value>>) -> Table {
        let width = headers.len();
        for row in &mut rows {
            row.resize(width, Value::Missing);
        }
        Table { headers, rows }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Resolve a semantic column from an ordered list of accepted spellings.
    ///
    /// Actual headers are matched case-insensitively after trimming
    /// whitespace, and the first candidate present wins. Returns `None` when
    /// no candidate matches. If two headers collapse to the same key after
    /// normalization, the last-declared column wins in the lookup; that is a
    /// property of how the map is built, not a guaranteed tie-break.
    pub fn resolve(&self, candidates: &[&str]) -> Option<usize> {
        let lookup: HashMap<String, usize> = self
            .headers
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.trim().to_lowercase(), idx))
            .collect();
        candidates
            .iter()
            .find_map(|cand| lookup.get(&cand.trim().to_lowercase()).copied())
    }

    pub fn column(&self, idx: usize) -> impl Iterator<Item = &Value> {
        self.rows.iter().map(move |row| &row[idx])
    }

    /// Non-missing numeric values of a column, in row order.
    pub fn numbers(&self, idx: usize) -> impl Iterator<Item = f64> + '_ {
        self.column(idx).filter_map(Value::as_number)
    }

    /// Rename a header in place (used by the cleaning pass).
    pub fn set_header(&mut self, idx: usize, name: String) {
        self.headers[idx] = name;
    }

    /// Append a derived column. `values` must be one per row.
    pub fn push_column(&mut self, name: String, values: Vec<Value>) {
        debug_assert_eq!(values.len(), self.rows.len());
        self.headers.push(name);
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(value);
        }
    }

    /// Keep only the rows for which `keep` returns true.
    pub fn retain_rows<F>(&mut self, mut keep: F)
    where
        F: FnMut(&[Value]) -> bool,
    {
        self.rows.retain(|row| keep(row));
    }

    /// Reorder columns to the given header indices, dropping none.
    pub fn reorder_columns(self, order: &[usize]) -> Table {
        debug_assert_eq!(order.len(), self.headers.len());
        let headers = order.iter().map(|&i| self.headers[i].clone()).collect();
        let rows = self
            .rows
            .into_iter()
            .map(|row| order.iter().map(|&i| row[i].clone()).collect())
            .collect();
        Table { headers, rows }
    }
}

/// Re-type a column as floating-point numbers. Values that fail to parse
/// become `Missing`; this transform never errors.
pub fn coerce_numeric(mut table: Table, column: usize) -> Table {
    for row in &mut table.rows {
        row[column] = match &row[column] {
            Value::Text(s) => match parse_f64_safe(Some(s)) {
                Some(v) => Value::Number(v),
                None => Value::Missing,
            },
            Value::Number(v) => Value::Number(*v),
            Value::Date(_) | Value::Missing => Value::Missing,
        };
    }
    table
}

/// Re-type a column as calendar dates. Unparseable values become `Missing`;
/// this transform never errors.
pub fn coerce_datetime(mut table: Table, column: usize) -> Table {
    for row in &mut table.rows {
        row[column] = match &row[column] {
            Value::Text(s) => match parse_date_safe(Some(s)) {
                Some(d) => Value::Date(d),
                None => Value::Missing,
            },
            Value::Date(d) => Value::Date(*d),
            Value::Number(_) | Value::Missing => Value::Missing,
        };
    }
    table
}

/// Year of a date cell, for derived columns.
pub fn date_year(value: &Value) -> Option<i32> {
    value.as_date().map(|d| d.year())
}

/// `YYYY-MM` rendering of a date cell, for derived columns.
pub fn date_month(value: &Value) -> Option<String> {
    value.as_date().map(|d| d.format("%Y-%m").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_row(fields: &[&str]) -> Vec<Value> {
        fields.iter().map(|f| Value::from_field(f)).collect()
    }

    fn sample(headers: &[&str], rows: &[&[&str]]) -> Table {
        Table::new(
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter().map(|r| text_row(r)).collect(),
        )
    }

    #[test]
    fn resolve_is_case_and_whitespace_insensitive() {
        let padded = sample(&[" profit "], &[]);
        let plain = sample(&["Profit"], &[]);
        assert_eq!(padded.resolve(&["Profit"]), Some(0));
        assert_eq!(plain.resolve(&[" PROFIT "]), Some(0));
    }

    #[test]
    fn resolve_honors_candidate_priority() {
        let table = sample(&["CustomerName", "Customer"], &[]);
        // "Customer" is listed before "CustomerName" by the caller, so it
        // wins even though "CustomerName" appears first in the file.
        assert_eq!(table.resolve(&["Customer", "CustomerName"]), Some(1));
    }

    #[test]
    fn resolve_returns_none_when_absent() {
        let table = sample(&["Sales"], &[]);
        assert_eq!(table.resolve(&["Profit"]), None);
    }

    #[test]
    fn resolve_duplicate_headers_last_declared_wins() {
        let table = sample(&["Profit", " profit "], &[]);
        assert_eq!(table.resolve(&["profit"]), Some(1));
    }

    #[test]
    fn coerce_numeric_turns_failures_into_missing() {
        let table = sample(&["Discount"], &[&["12.5"], &["abc"], &[""]]);
        let table = coerce_numeric(table, 0);
        let values: Vec<&Value> = table.column(0).collect();
        assert_eq!(values[0], &Value::Number(12.5));
        assert_eq!(values[1], &Value::Missing);
        assert_eq!(values[2], &Value::Missing);
    }

    #[test]
    fn coerce_datetime_turns_failures_into_missing() {
        let table = sample(&["Order Date"], &[&["2016-11-08"], &["soon"]]);
        let table = coerce_datetime(table, 0);
        let values: Vec<&Value> = table.column(0).collect();
        assert_eq!(
            values[0].as_date(),
            NaiveDate::from_ymd_opt(2016, 11, 8)
        );
        assert!(values[1].is_missing());
    }

    #[test]
    fn short_rows_are_padded_with_missing() {
        let table = sample(&["A", "B"], &[&["x"]]);
        assert_eq!(table.rows()[0].len(), 2);
        assert!(table.rows()[0][1].is_missing());
    }

    #[test]
    fn derived_date_parts() {
        let d = Value::Date(NaiveDate::from_ymd_opt(2017, 3, 5).unwrap());
        assert_eq!(date_year(&d), Some(2017));
        assert_eq!(date_month(&d), Some("2017-03".to_string()));
        assert_eq!(date_year(&Value::Missing), None);
    }
}
