//! KPI aggregation over a resolved sales table.
//!
//! The chart writers and the PDF report both consume the same aggregation
//! logic: resolve semantic columns through their alias lists, group, sum,
//! rank. Any metric whose columns do not resolve is omitted from the result
//! rather than set to a placeholder; missing cells are skipped everywhere.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::table::{coerce_datetime, coerce_numeric, Table};

/// Accepted surface spellings per semantic column, in priority order.
pub mod aliases {
    pub const SALES: &[&str] = &["Sales"];
    pub const PROFIT: &[&str] = &["Profit"];
    pub const REGION: &[&str] = &["Region"];
    pub const DISCOUNT: &[&str] = &["Discount"];
    pub const QUANTITY: &[&str] = &["Quantity"];
    pub const CATEGORY: &[&str] = &["Category"];
    pub const CUSTOMER: &[&str] = &["Customer Name", "Customer", "CustomerName", "Customer_Name"];
    pub const PRODUCT: &[&str] = &["Product Name", "Product", "Product_Name"];
    pub const ORDER_DATE: &[&str] = &["Order Date", "OrderDate", "Order_Date"];
}

/// Number of equal-width bins used for the discount loss-threshold scan.
const DISCOUNT_BINS: usize = 20;

/// Summary statistics of one table. `None` fields are left out of the JSON
/// entirely (the consuming report renders a dash for anything absent).
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct KpiReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_sales: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_profit: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_region_by_profit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_discount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_profit_per_order: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_3_regions_by_profit: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_10_customers_by_profit: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_threshold_loss: Option<f64>,
}

/// One-time typing pass applied before charting and KPI computation: the
/// analysis columns become numbers, the order date becomes a date. Takes the
/// table by value and hands back the re-typed table.
pub fn coerce_analysis_columns(mut table: Table) -> Table {
    for candidates in [
        aliases::SALES,
        aliases::PROFIT,
        aliases::DISCOUNT,
        aliases::QUANTITY,
    ] {
        if let Some(idx) = table.resolve(candidates) {
            table = coerce_numeric(table, idx);
        }
    }
    if let Some(idx) = table.resolve(aliases::ORDER_DATE) {
        table = coerce_datetime(table, idx);
    }
    table
}

/// Sum `value` per distinct `label`, keeping first-seen label order.
///
/// Rows with a missing label are excluded; rows with a missing value still
/// register the label so a group of entirely-missing values sums to zero.
pub fn grouped_sum(table: &Table, label: usize, value: usize) -> Vec<(String, f64)> {
    let mut order: Vec<(String, f64)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for row in table.rows() {
        let Some(key) = row[label].label() else {
            continue;
        };
        let slot = match index.get(&key) {
            Some(&i) => i,
            None => {
                index.insert(key.clone(), order.len());
                order.push((key, 0.0));
                order.len() - 1
            }
        };
        if let Some(v) = row[value].as_number() {
            order[slot].1 += v;
        }
    }
    order
}

/// Groups ranked by summed value, descending, truncated to `n`.
///
/// The sort is stable over the first-seen grouping order, so exact ties keep
/// the order in which the labels first appeared in the data. No secondary
/// sort key is applied.
pub fn rank_groups(mut groups: Vec<(String, f64)>, n: usize) -> Vec<(String, f64)> {
    groups.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    groups.truncate(n);
    groups
}

fn top_n_labels(groups: Vec<(String, f64)>, n: usize) -> Vec<String> {
    rank_groups(groups, n)
        .into_iter()
        .map(|(label, _)| label)
        .collect()
}

/// The label with the maximal summed value, first-encountered winning ties.
fn top_label(groups: &[(String, f64)]) -> Option<String> {
    let mut best: Option<(&str, f64)> = None;
    for (label, sum) in groups {
        if best.map_or(true, |(_, bv)| *sum > bv) {
            best = Some((label.as_str(), *sum));
        }
    }
    best.map(|(label, _)| label.to_string())
}

/// Compute the fixed KPI set over an already-coerced table.
pub fn compute_kpis(table: &Table) -> KpiReport {
    let sales = table.resolve(aliases::SALES);
    let profit = table.resolve(aliases::PROFIT);
    let region = table.resolve(aliases::REGION);
    let discount = table.resolve(aliases::DISCOUNT);
    let customer = table.resolve(aliases::CUSTOMER);

    let mut out = KpiReport::default();

    if let Some(idx) = sales {
        out.total_sales = Some(table.numbers(idx).sum());
    }
    if let Some(idx) = profit {
        out.total_profit = Some(table.numbers(idx).sum());
        out.avg_profit_per_order = mean_of(table, idx);
    }
    if let Some(idx) = discount {
        out.avg_discount = mean_of(table, idx);
    }
    if let (Some(r), Some(p)) = (region, profit) {
        let groups = grouped_sum(table, r, p);
        out.top_region_by_profit = top_label(&groups);
        if !groups.is_empty() {
            out.top_3_regions_by_profit = Some(top_n_labels(groups, 3));
        }
    }
    if let (Some(c), Some(p)) = (customer, profit) {
        let groups = grouped_sum(table, c, p);
        if !groups.is_empty() {
            out.top_10_customers_by_profit = Some(top_n_labels(groups, 10));
        }
    }
    if let (Some(d), Some(p)) = (discount, profit) {
        out.discount_threshold_loss = discount_threshold_loss(table, d, p);
    }

    out
}

/// Arithmetic mean of the non-missing values, `None` when there are none.
/// One row counts as one order; no deduplication by order id is performed.
fn mean_of(table: &Table, idx: usize) -> Option<f64> {
    let values: Vec<f64> = table.numbers(idx).collect();
    if values.is_empty() {
        None
    } else {
        Some(crate::util::mean(&values))
    }
}

/// Scan for the discount level at which orders start losing money.
///
/// The observed discount range is split into [`DISCOUNT_BINS`] equal-width
/// bins; the result is the left edge of the lowest-discount bin whose mean
/// profit is negative. `None` when no bin is negative or the range is
/// degenerate (all discounts equal), in which case the metric is omitted.
fn discount_threshold_loss(table: &Table, discount: usize, profit: usize) -> Option<f64> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for d in table.numbers(discount) {
        min = min.min(d);
        max = max.max(d);
    }
    let width = (max - min) / DISCOUNT_BINS as f64;
    if !width.is_finite() || width <= 0.0 {
        return None;
    }

    let mut sums = [0.0f64; DISCOUNT_BINS];
    let mut counts = [0usize; DISCOUNT_BINS];
    for row in table.rows() {
        let (Some(d), Some(p)) = (row[discount].as_number(), row[profit].as_number()) else {
            continue;
        };
        let bin = (((d - min) / width) as usize).min(DISCOUNT_BINS - 1);
        sums[bin] += p;
        counts[bin] += 1;
    }

    (0..DISCOUNT_BINS)
        .find(|&bin| counts[bin] > 0 && sums[bin] / (counts[bin] as f64) < 0.0)
        .map(|bin| min + bin as f64 * width)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Value;

    fn table_of(headers: &[&str], rows: Vec<Vec<Value>>) -> Table {
        Table::new(headers.iter().map(|h| h.to_string()).collect(), rows)
    }

    fn row(region: &str, profit: f64) -> Vec<Value> {
        vec![Value::Text(region.to_string()), Value::Number(profit)]
    }

    fn east_west_table() -> Table {
        table_of(
            &["Region", "Profit"],
            vec![row("East", 100.0), row("East", -50.0), row("West", 30.0)],
        )
    }

    #[test]
    fn end_to_end_region_scenario() {
        let kpis = compute_kpis(&east_west_table());
        assert_eq!(kpis.total_profit, Some(80.0));
        assert_eq!(kpis.top_region_by_profit.as_deref(), Some("East"));
        assert_eq!(
            kpis.top_3_regions_by_profit,
            Some(vec!["East".to_string(), "West".to_string()])
        );
        assert_eq!(kpis.total_sales, None);
    }

    #[test]
    fn total_profit_is_row_order_independent() {
        let forward = compute_kpis(&east_west_table());
        let reversed = compute_kpis(&table_of(
            &["Region", "Profit"],
            vec![row("West", 30.0), row("East", -50.0), row("East", 100.0)],
        ));
        assert_eq!(forward.total_profit, reversed.total_profit);
    }

    #[test]
    fn missing_region_omits_region_metrics() {
        let kpis = compute_kpis(&table_of(
            &["Profit"],
            vec![vec![Value::Number(5.0)], vec![Value::Number(7.0)]],
        ));
        assert_eq!(kpis.top_region_by_profit, None);
        assert_eq!(kpis.top_3_regions_by_profit, None);
        assert_eq!(kpis.total_profit, Some(12.0));
    }

    #[test]
    fn missing_values_are_skipped_in_sums_and_means() {
        let kpis = compute_kpis(&table_of(
            &["Profit"],
            vec![
                vec![Value::Number(10.0)],
                vec![Value::Missing],
                vec![Value::Number(2.0)],
            ],
        ));
        assert_eq!(kpis.total_profit, Some(12.0));
        assert_eq!(kpis.avg_profit_per_order, Some(6.0));
    }

    #[test]
    fn resolver_feeds_kpis_case_insensitively() {
        let kpis = compute_kpis(&table_of(&[" profit "], vec![vec![Value::Number(4.0)]]));
        assert_eq!(kpis.total_profit, Some(4.0));
    }

    #[test]
    fn top_customers_capped_descending_first_seen_ties() {
        let mut rows = Vec::new();
        for i in 0..12 {
            rows.push(vec![
                Value::Text(format!("Customer {:02}", i)),
                Value::Number(f64::from(i)),
            ]);
        }
        // Two customers tied at the top; the first one seen must rank first.
        rows.push(vec![Value::Text("Tied A".into()), Value::Number(50.0)]);
        rows.push(vec![Value::Text("Tied B".into()), Value::Number(50.0)]);
        let kpis = compute_kpis(&table_of(&["Customer Name", "Profit"], rows));

        let top = kpis.top_10_customers_by_profit.unwrap();
        assert_eq!(top.len(), 10);
        assert_eq!(top[0], "Tied A");
        assert_eq!(top[1], "Tied B");
        // Strictly descending apart from the documented tie handling.
        assert_eq!(top[2], "Customer 11");
    }

    #[test]
    fn customer_alias_spellings_resolve() {
        let kpis = compute_kpis(&table_of(
            &["Customer_Name", "Profit"],
            vec![vec![Value::Text("Acme".into()), Value::Number(9.0)]],
        ));
        assert_eq!(
            kpis.top_10_customers_by_profit,
            Some(vec!["Acme".to_string()])
        );
    }

    #[test]
    fn discount_threshold_detects_loss_boundary() {
        // Discounts below 0.4 are profitable, 0.4 and above lose money.
        let mut rows = Vec::new();
        for i in 0..=16 {
            let d = i as f64 * 0.05; // 0.0 .. 0.8
            let p = if d >= 0.4 { -20.0 } else { 15.0 };
            rows.push(vec![Value::Number(d), Value::Number(p)]);
        }
        let kpis = compute_kpis(&table_of(&["Discount", "Profit"], rows));
        let threshold = kpis.discount_threshold_loss.unwrap();
        let bin_width = 0.8 / 20.0;
        assert!((threshold - 0.4).abs() <= bin_width + 1e-9);
    }

    #[test]
    fn discount_threshold_omitted_when_no_bin_is_negative() {
        let kpis = compute_kpis(&table_of(
            &["Discount", "Profit"],
            vec![
                vec![Value::Number(0.0), Value::Number(5.0)],
                vec![Value::Number(0.5), Value::Number(2.0)],
            ],
        ));
        assert_eq!(kpis.discount_threshold_loss, None);
    }

    #[test]
    fn discount_threshold_omitted_for_degenerate_range() {
        let kpis = compute_kpis(&table_of(
            &["Discount", "Profit"],
            vec![
                vec![Value::Number(0.2), Value::Number(-5.0)],
                vec![Value::Number(0.2), Value::Number(-2.0)],
            ],
        ));
        assert_eq!(kpis.discount_threshold_loss, None);
    }

    #[test]
    fn coerce_analysis_columns_types_numbers_and_dates() {
        let table = table_of(
            &["Sales", "Order Date"],
            vec![vec![
                Value::Text("19.99".into()),
                Value::Text("2017-01-15".into()),
            ]],
        );
        let table = coerce_analysis_columns(table);
        assert_eq!(table.rows()[0][0].as_number(), Some(19.99));
        assert!(table.rows()[0][1].as_date().is_some());
    }

    #[test]
    fn kpi_json_omits_absent_metrics() {
        let kpis = compute_kpis(&table_of(&["Region"], vec![]));
        let json = serde_json::to_string_pretty(&kpis).unwrap();
        assert_eq!(json, "{}");
    }
}
