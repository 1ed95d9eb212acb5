//! Cleaning pass that turns a raw sales export into an analysis-ready table.
//!
//! Steps, in order: normalize header spellings, trim text cells, type the
//! numeric and date columns, fill postal codes, drop rows with no order id,
//! derive `order_year`/`order_month`, and move the well-known columns to the
//! front.

use crate::table::{coerce_datetime, coerce_numeric, date_month, date_year, Table, Value};

/// Preferred output column order; anything not listed keeps its relative
/// position after these.
const CANONICAL_ORDER: &[&str] = &[
    "order_id",
    "order_date",
    "ship_date",
    "ship_mode",
    "customer_id",
    "customer_name",
    "segment",
    "country",
    "region",
    "state",
    "city",
    "postal_code",
    "product_id",
    "category",
    "sub_category",
    "product_name",
    "sales",
    "quantity",
    "discount",
    "profit",
    "order_year",
    "order_month",
];

const NUMERIC_COLUMNS: &[&str] = &["sales", "profit", "discount", "quantity"];
const DATE_COLUMNS: &[&str] = &["order_date", "ship_date"];

/// Counters describing what the cleaning pass changed.
#[derive(Debug, Clone, Copy)]
pub struct CleanSummary {
    pub input_rows: usize,
    pub kept_rows: usize,
    pub dropped_missing_order_id: usize,
}

/// `"Order Date"` → `"order_date"`. Hyphens normalize too, so the export
/// spelling `Sub-Category` lines up with the canonical `sub_category`.
fn normalize_header(name: &str) -> String {
    name.trim().to_lowercase().replace([' ', '-'], "_")
}

pub fn clean_table(mut table: Table) -> (Table, CleanSummary) {
    let input_rows = table.row_count();

    for idx in 0..table.headers().len() {
        let normalized = normalize_header(&table.headers()[idx]);
        table.set_header(idx, normalized);
    }

    // Trim free-text cells; fields that become empty turn into Missing.
    let mut trimmed = Vec::with_capacity(table.row_count());
    for row in table.rows() {
        let row = row
            .iter()
            .map(|value| match value {
                Value::Text(s) => Value::from_field(s.trim()),
                other => other.clone(),
            })
            .collect();
        trimmed.push(row);
    }
    let mut table = Table::new(table.headers().to_vec(), trimmed);

    for &name in NUMERIC_COLUMNS {
        if let Some(idx) = table.resolve(&[name]) {
            table = coerce_numeric(table, idx);
        }
    }
    for &name in DATE_COLUMNS {
        if let Some(idx) = table.resolve(&[name]) {
            table = coerce_datetime(table, idx);
        }
    }

    // Postal codes: numeric, missing filled with 0, written as integers.
    if let Some(idx) = table.resolve(&["postal_code"]) {
        table = coerce_numeric(table, idx);
        let filled: Vec<Value> = table
            .column(idx)
            .map(|v| Value::Number(v.as_number().unwrap_or(0.0).trunc()))
            .collect();
        let mut rows = table.rows().to_vec();
        for (row, value) in rows.iter_mut().zip(filled) {
            row[idx] = value;
        }
        table = Table::new(table.headers().to_vec(), rows);
    }

    let mut dropped = 0usize;
    if let Some(idx) = table.resolve(&["order_id"]) {
        table.retain_rows(|row| {
            let keep = !row[idx].is_missing();
            if !keep {
                dropped += 1;
            }
            keep
        });
    }

    if let Some(idx) = table.resolve(&["order_date"]) {
        let years: Vec<Value> = table
            .column(idx)
            .map(|v| match date_year(v) {
                Some(y) => Value::Number(f64::from(y)),
                None => Value::Missing,
            })
            .collect();
        let months: Vec<Value> = table
            .column(idx)
            .map(|v| match date_month(v) {
                Some(m) => Value::Text(m),
                None => Value::Missing,
            })
            .collect();
        table.push_column("order_year".to_string(), years);
        table.push_column("order_month".to_string(), months);
    }

    let table = reorder_canonical(table);

    let summary = CleanSummary {
        input_rows,
        kept_rows: table.row_count(),
        dropped_missing_order_id: dropped,
    };
    (table, summary)
}

/// Move the canonical columns to the front, in their canonical order; any
/// remaining columns follow in their original order.
fn reorder_canonical(table: Table) -> Table {
    let mut order: Vec<usize> = Vec::with_capacity(table.headers().len());
    for name in CANONICAL_ORDER {
        if let Some(idx) = table.headers().iter().position(|h| h == name) {
            order.push(idx);
        }
    }
    for (idx, _) in table.headers().iter().enumerate() {
        if !order.contains(&idx) {
            order.push(idx);
        }
    }
    table.reorder_columns(&order)
}
