//! Dashboard chart rendering.
//!
//! Every chart writer returns `Ok(true)` when the PNG was written and
//! `Ok(false)` when the table lacks the columns (or rows) the chart needs,
//! so one incomplete export never aborts the whole dashboard run. Charts are
//! rendered with the [`plotters`] bitmap backend, which keeps the binary
//! usable in headless environments.

use std::path::Path;

use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use thiserror::Error;

use crate::kpis::{aliases, grouped_sum, rank_groups};
use crate::table::Table;

#[derive(Error, Debug)]
pub enum ChartError {
    #[error("failed to prepare drawing area: {0}")]
    DrawingArea(String),
    #[error("failed to configure chart: {0}")]
    ChartConfig(String),
    #[error("failed to draw chart elements: {0}")]
    Drawing(String),
}

type Result<T> = core::result::Result<T, ChartError>;

pub type ChartFn = fn(&Table, &Path) -> Result<bool>;

/// All dashboard charts with their output file names, in render order.
pub const CHARTS: &[(&str, ChartFn)] = &[
    ("profit_by_region.png", profit_by_region),
    ("discount_vs_profit.png", discount_vs_profit),
    ("top_customers.png", top_customers),
    ("sales_by_category.png", sales_by_category),
    ("monthly_sales_trend.png", monthly_sales_trend),
    ("top_products.png", top_products),
    ("discount_distribution.png", discount_distribution),
    ("correlation_heatmap.png", correlation_heatmap),
];

const BAR_FILL: RGBColor = RGBColor(66, 110, 180);

pub fn profit_by_region(table: &Table, out: &Path) -> Result<bool> {
    let (Some(region), Some(profit)) = (
        table.resolve(aliases::REGION),
        table.resolve(aliases::PROFIT),
    ) else {
        return Ok(false);
    };
    let mut groups = grouped_sum(table, region, profit);
    groups.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    if groups.is_empty() {
        return Ok(false);
    }
    draw_vertical_bars(
        out,
        (800, 500),
        "Total Profit by Region",
        "Region",
        "Profit",
        &groups,
    )?;
    Ok(true)
}

pub fn discount_vs_profit(table: &Table, out: &Path) -> Result<bool> {
    let (Some(discount), Some(profit)) = (
        table.resolve(aliases::DISCOUNT),
        table.resolve(aliases::PROFIT),
    ) else {
        return Ok(false);
    };
    let points: Vec<(f64, f64)> = table
        .rows()
        .iter()
        .filter_map(|row| Some((row[discount].as_number()?, row[profit].as_number()?)))
        .collect();
    if points.is_empty() {
        return Ok(false);
    }

    let (x_lo, x_hi) = padded_range(points.iter().map(|p| p.0));
    let (y_lo, y_hi) = padded_range(points.iter().map(|p| p.1));

    let root = BitMapBackend::new(out, (800, 600)).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| ChartError::DrawingArea(e.to_string()))?;
    let mut chart = ChartBuilder::on(&root)
        .caption("Discount vs Profit", ("sans-serif", 30))
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(70)
        .build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)
        .map_err(|e| ChartError::ChartConfig(e.to_string()))?;
    chart
        .configure_mesh()
        .x_desc("Discount")
        .y_desc("Profit")
        .draw()
        .map_err(|e| ChartError::Drawing(e.to_string()))?;
    chart
        .draw_series(
            points
                .iter()
                .map(|&(x, y)| Circle::new((x, y), 3, BAR_FILL.mix(0.5).filled())),
        )
        .map_err(|e| ChartError::Drawing(e.to_string()))?;

    // Least-squares trend line, skipped for a degenerate x spread.
    if let Some((slope, intercept)) = linear_fit(&points) {
        chart
            .draw_series(LineSeries::new(
                [(x_lo, slope * x_lo + intercept), (x_hi, slope * x_hi + intercept)],
                RED.stroke_width(2),
            ))
            .map_err(|e| ChartError::Drawing(e.to_string()))?;
    }

    root.present()
        .map_err(|e| ChartError::Drawing(e.to_string()))?;
    Ok(true)
}

pub fn top_customers(table: &Table, out: &Path) -> Result<bool> {
    let (Some(customer), Some(profit)) = (
        table.resolve(aliases::CUSTOMER),
        table.resolve(aliases::PROFIT),
    ) else {
        return Ok(false);
    };
    let groups = rank_groups(grouped_sum(table, customer, profit), 10);
    if groups.is_empty() {
        return Ok(false);
    }
    draw_horizontal_bars(
        out,
        (800, 600),
        "Top 10 Customers by Profit",
        "Profit",
        &groups,
    )?;
    Ok(true)
}

pub fn sales_by_category(table: &Table, out: &Path) -> Result<bool> {
    let (Some(category), Some(sales)) = (
        table.resolve(aliases::CATEGORY),
        table.resolve(aliases::SALES),
    ) else {
        return Ok(false);
    };
    let mut groups = grouped_sum(table, category, sales);
    groups.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    if groups.is_empty() {
        return Ok(false);
    }
    draw_vertical_bars(
        out,
        (800, 500),
        "Sales by Category",
        "Category",
        "Sales",
        &groups,
    )?;
    Ok(true)
}

pub fn monthly_sales_trend(table: &Table, out: &Path) -> Result<bool> {
    let (Some(date), Some(sales)) = (
        table.resolve(aliases::ORDER_DATE),
        table.resolve(aliases::SALES),
    ) else {
        return Ok(false);
    };

    use chrono::Datelike;
    let mut by_month: std::collections::BTreeMap<(i32, u32), f64> = std::collections::BTreeMap::new();
    for row in table.rows() {
        let (Some(d), Some(s)) = (row[date].as_date(), row[sales].as_number()) else {
            continue;
        };
        *by_month.entry((d.year(), d.month())).or_insert(0.0) += s;
    }
    if by_month.is_empty() {
        return Ok(false);
    }
    let labels: Vec<String> = by_month
        .keys()
        .map(|(y, m)| format!("{:04}-{:02}", y, m))
        .collect();
    let points: Vec<(f64, f64)> = by_month
        .values()
        .enumerate()
        .map(|(i, &v)| (i as f64, v))
        .collect();
    let (y_lo, y_hi) = padded_range(points.iter().map(|p| p.1));

    let root = BitMapBackend::new(out, (1000, 500)).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| ChartError::DrawingArea(e.to_string()))?;
    let mut chart = ChartBuilder::on(&root)
        .caption("Monthly Sales Trend", ("sans-serif", 30))
        .margin(15)
        .x_label_area_size(55)
        .y_label_area_size(80)
        .build_cartesian_2d(-0.5..points.len() as f64 - 0.5, y_lo..y_hi)
        .map_err(|e| ChartError::ChartConfig(e.to_string()))?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(labels.len().min(12))
        .x_label_formatter(&|x| index_label(*x, &labels))
        .x_desc("Month")
        .y_desc("Sales")
        .draw()
        .map_err(|e| ChartError::Drawing(e.to_string()))?;
    chart
        .draw_series(LineSeries::new(points.iter().copied(), BAR_FILL.stroke_width(2)))
        .map_err(|e| ChartError::Drawing(e.to_string()))?;
    chart
        .draw_series(
            points
                .iter()
                .map(|&(x, y)| Circle::new((x, y), 4, BAR_FILL.filled())),
        )
        .map_err(|e| ChartError::Drawing(e.to_string()))?;
    root.present()
        .map_err(|e| ChartError::Drawing(e.to_string()))?;
    Ok(true)
}

pub fn top_products(table: &Table, out: &Path) -> Result<bool> {
    let (Some(product), Some(sales)) = (
        table.resolve(aliases::PRODUCT),
        table.resolve(aliases::SALES),
    ) else {
        return Ok(false);
    };
    let groups = rank_groups(grouped_sum(table, product, sales), 10);
    if groups.is_empty() {
        return Ok(false);
    }
    draw_horizontal_bars(
        out,
        (800, 600),
        "Top 10 Products by Sales",
        "Sales",
        &groups,
    )?;
    Ok(true)
}

pub fn discount_distribution(table: &Table, out: &Path) -> Result<bool> {
    let Some(discount) = table.resolve(aliases::DISCOUNT) else {
        return Ok(false);
    };
    let values: Vec<f64> = table.numbers(discount).collect();
    if values.is_empty() {
        return Ok(false);
    }

    const BINS: usize = 30;
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    // A constant column still gets a single visible bar.
    let (min, max) = if max > min { (min, max) } else { (min - 0.5, max + 0.5) };
    let width = (max - min) / BINS as f64;
    let mut counts = [0usize; BINS];
    for &v in &values {
        let bin = (((v - min) / width) as usize).min(BINS - 1);
        counts[bin] += 1;
    }
    let tallest = counts.iter().copied().max().unwrap_or(0) as f64;

    let root = BitMapBackend::new(out, (800, 500)).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| ChartError::DrawingArea(e.to_string()))?;
    let mut chart = ChartBuilder::on(&root)
        .caption("Discount Distribution", ("sans-serif", 30))
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(60)
        .build_cartesian_2d(min..max, 0.0..tallest * 1.05)
        .map_err(|e| ChartError::ChartConfig(e.to_string()))?;
    chart
        .configure_mesh()
        .x_desc("Discount")
        .y_desc("Count")
        .draw()
        .map_err(|e| ChartError::Drawing(e.to_string()))?;
    chart
        .draw_series(counts.iter().enumerate().map(|(i, &count)| {
            let left = min + i as f64 * width;
            Rectangle::new(
                [(left, 0.0), (left + width, count as f64)],
                BAR_FILL.mix(0.7).filled(),
            )
        }))
        .map_err(|e| ChartError::Drawing(e.to_string()))?;
    root.present()
        .map_err(|e| ChartError::Drawing(e.to_string()))?;
    Ok(true)
}

pub fn correlation_heatmap(table: &Table, out: &Path) -> Result<bool> {
    let mut columns: Vec<(String, usize)> = Vec::new();
    for candidates in [
        aliases::SALES,
        aliases::PROFIT,
        aliases::DISCOUNT,
        aliases::QUANTITY,
    ] {
        if let Some(idx) = table.resolve(candidates) {
            columns.push((table.headers()[idx].trim().to_string(), idx));
        }
    }
    if columns.len() < 2 {
        return Ok(false);
    }

    let k = columns.len();
    let mut corr = vec![vec![f64::NAN; k]; k];
    for i in 0..k {
        for j in 0..k {
            corr[i][j] = pearson(table, columns[i].1, columns[j].1).unwrap_or(f64::NAN);
        }
    }

    let names: Vec<&str> = columns.iter().map(|(name, _)| name.as_str()).collect();
    let span = -0.5..k as f64 - 0.5;
    let root = BitMapBackend::new(out, (600, 500)).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| ChartError::DrawingArea(e.to_string()))?;
    let mut chart = ChartBuilder::on(&root)
        .caption("Correlation Heatmap", ("sans-serif", 30))
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(80)
        .build_cartesian_2d(span.clone(), span)
        .map_err(|e| ChartError::ChartConfig(e.to_string()))?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .x_labels(k)
        .y_labels(k)
        .x_label_formatter(&|x| index_label(*x, &names))
        .y_label_formatter(&|y| index_label(k as f64 - 1.0 - *y, &names))
        .draw()
        .map_err(|e| ChartError::Drawing(e.to_string()))?;

    let label_style = TextStyle::from(("sans-serif", 18))
        .pos(Pos::new(HPos::Center, VPos::Center));
    for (i, row) in corr.iter().enumerate() {
        for (j, &c) in row.iter().enumerate() {
            // First column row at the top, like the axis labels.
            let (x, y) = (j as f64, (k - 1 - i) as f64);
            chart
                .draw_series(std::iter::once(Rectangle::new(
                    [(x - 0.5, y - 0.5), (x + 0.5, y + 0.5)],
                    correlation_color(c).filled(),
                )))
                .map_err(|e| ChartError::Drawing(e.to_string()))?;
            chart
                .draw_series(std::iter::once(Text::new(
                    format!("{:.2}", c),
                    (x, y),
                    label_style.clone(),
                )))
                .map_err(|e| ChartError::Drawing(e.to_string()))?;
        }
    }
    root.present()
        .map_err(|e| ChartError::Drawing(e.to_string()))?;
    Ok(true)
}

fn draw_vertical_bars(
    out: &Path,
    size: (u32, u32),
    title: &str,
    x_desc: &str,
    y_desc: &str,
    groups: &[(String, f64)],
) -> Result<()> {
    let n = groups.len();
    let labels: Vec<&str> = groups.iter().map(|(label, _)| label.as_str()).collect();
    let (y_lo, y_hi) = padded_range(groups.iter().map(|g| g.1).chain([0.0]));

    let root = BitMapBackend::new(out, size).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| ChartError::DrawingArea(e.to_string()))?;
    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 30))
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(80)
        .build_cartesian_2d(-0.5..n as f64 - 0.5, y_lo..y_hi)
        .map_err(|e| ChartError::ChartConfig(e.to_string()))?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n)
        .x_label_formatter(&|x| index_label(*x, &labels))
        .x_desc(x_desc)
        .y_desc(y_desc)
        .draw()
        .map_err(|e| ChartError::Drawing(e.to_string()))?;
    chart
        .draw_series(groups.iter().enumerate().map(|(i, (_, value))| {
            Rectangle::new(
                [(i as f64 - 0.3, 0.0), (i as f64 + 0.3, *value)],
                BAR_FILL.mix(0.8).filled(),
            )
        }))
        .map_err(|e| ChartError::Drawing(e.to_string()))?;
    root.present()
        .map_err(|e| ChartError::Drawing(e.to_string()))?;
    Ok(())
}

fn draw_horizontal_bars(
    out: &Path,
    size: (u32, u32),
    title: &str,
    x_desc: &str,
    groups: &[(String, f64)],
) -> Result<()> {
    // Highest value at the top: y grows upward, so plot in reverse order.
    let n = groups.len();
    let labels: Vec<&str> = groups
        .iter()
        .rev()
        .map(|(label, _)| label.as_str())
        .collect();
    let (x_lo, x_hi) = padded_range(groups.iter().map(|g| g.1).chain([0.0]));

    let root = BitMapBackend::new(out, size).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| ChartError::DrawingArea(e.to_string()))?;
    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 30))
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(220)
        .build_cartesian_2d(x_lo..x_hi, -0.5..n as f64 - 0.5)
        .map_err(|e| ChartError::ChartConfig(e.to_string()))?;
    chart
        .configure_mesh()
        .disable_y_mesh()
        .y_labels(n)
        .y_label_formatter(&|y| index_label(*y, &labels))
        .x_desc(x_desc)
        .draw()
        .map_err(|e| ChartError::Drawing(e.to_string()))?;
    chart
        .draw_series(groups.iter().rev().enumerate().map(|(i, (_, value))| {
            Rectangle::new(
                [(0.0, i as f64 - 0.3), (*value, i as f64 + 0.3)],
                BAR_FILL.mix(0.8).filled(),
            )
        }))
        .map_err(|e| ChartError::Drawing(e.to_string()))?;
    root.present()
        .map_err(|e| ChartError::Drawing(e.to_string()))?;
    Ok(())
}

/// Label for an axis tick that lands on (or near) a category index.
fn index_label<S: AsRef<str>>(position: f64, labels: &[S]) -> String {
    let idx = position.round();
    if (position - idx).abs() > 0.3 || idx < 0.0 {
        return String::new();
    }
    labels
        .get(idx as usize)
        .map(|s| s.as_ref().to_string())
        .unwrap_or_default()
}

/// Axis range with 5% headroom, widened when the values are constant.
fn padded_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for v in values {
        lo = lo.min(v);
        hi = hi.max(v);
    }
    if !lo.is_finite() || !hi.is_finite() {
        return (0.0, 1.0);
    }
    let span = hi - lo;
    if span <= 0.0 {
        return (lo - 0.5, hi + 0.5);
    }
    (lo - span * 0.05, hi + span * 0.05)
}

/// Least-squares fit over (x, y) points; `None` when x has no spread.
fn linear_fit(points: &[(f64, f64)]) -> Option<(f64, f64)> {
    let n = points.len() as f64;
    if points.len() < 2 {
        return None;
    }
    let mean_x = points.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p.1).sum::<f64>() / n;
    let var_x: f64 = points.iter().map(|p| (p.0 - mean_x).powi(2)).sum();
    if var_x == 0.0 {
        return None;
    }
    let cov: f64 = points
        .iter()
        .map(|p| (p.0 - mean_x) * (p.1 - mean_y))
        .sum();
    let slope = cov / var_x;
    Some((slope, mean_y - slope * mean_x))
}

/// Pearson correlation over the rows where both columns are numeric.
fn pearson(table: &Table, a: usize, b: usize) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = table
        .rows()
        .iter()
        .filter_map(|row| Some((row[a].as_number()?, row[b].as_number()?)))
        .collect();
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mean_a = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_b = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in &pairs {
        cov += (x - mean_a) * (y - mean_b);
        var_a += (x - mean_a).powi(2);
        var_b += (y - mean_b).powi(2);
    }
    let denom = (var_a * var_b).sqrt();
    if denom == 0.0 {
        return None;
    }
    Some(cov / denom)
}

/// Blue→white→red ramp over [-1, 1]; NaN renders gray.
fn correlation_color(c: f64) -> RGBColor {
    if c.is_nan() {
        return RGBColor(180, 180, 180);
    }
    let c = c.clamp(-1.0, 1.0);
    let blend = |from: u8, to: u8, t: f64| (f64::from(from) + (f64::from(to) - f64::from(from)) * t) as u8;
    if c < 0.0 {
        let t = c + 1.0; // -1 → 0, 0 → 1
        RGBColor(
            blend(59, 245, t),
            blend(76, 245, t),
            blend(192, 245, t),
        )
    } else {
        RGBColor(
            blend(245, 180, c),
            blend(245, 4, c),
            blend(245, 38, c),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Value;

    fn table_of(headers: &[&str], rows: Vec<Vec<Value>>) -> Table {
        Table::new(headers.iter().map(|h| h.to_string()).collect(), rows)
    }

    #[test]
    fn charts_skip_when_columns_are_missing() {
        let table = table_of(&["Unrelated"], vec![vec![Value::Text("x".into())]]);
        let out = std::env::temp_dir().join("sales_insights_should_not_exist.png");
        for (_, chart) in CHARTS {
            assert_eq!(chart(&table, &out).unwrap(), false);
        }
        assert!(!out.exists());
    }

    #[test]
    fn scatter_skips_without_numeric_rows() {
        let table = table_of(
            &["Discount", "Profit"],
            vec![vec![Value::Missing, Value::Missing]],
        );
        let out = std::env::temp_dir().join("sales_insights_scatter_skip.png");
        assert_eq!(discount_vs_profit(&table, &out).unwrap(), false);
    }

    #[test]
    fn linear_fit_recovers_slope_and_intercept() {
        let points = vec![(0.0, 1.0), (1.0, 3.0), (2.0, 5.0)];
        let (slope, intercept) = linear_fit(&points).unwrap();
        assert!((slope - 2.0).abs() < 1e-12);
        assert!((intercept - 1.0).abs() < 1e-12);
    }

    #[test]
    fn linear_fit_rejects_degenerate_x() {
        assert_eq!(linear_fit(&[(1.0, 2.0), (1.0, 5.0)]), None);
    }

    #[test]
    fn pearson_of_identical_columns_is_one() {
        let table = table_of(
            &["Sales", "Profit"],
            vec![
                vec![Value::Number(1.0), Value::Number(1.0)],
                vec![Value::Number(2.0), Value::Number(2.0)],
                vec![Value::Number(3.0), Value::Number(3.0)],
            ],
        );
        let r = pearson(&table, 0, 1).unwrap();
        assert!((r - 1.0).abs() < 1e-12);
    }

    #[test]
    fn pearson_skips_rows_with_missing_values() {
        let table = table_of(
            &["Sales", "Profit"],
            vec![
                vec![Value::Number(1.0), Value::Number(2.0)],
                vec![Value::Missing, Value::Number(100.0)],
                vec![Value::Number(2.0), Value::Number(4.0)],
            ],
        );
        let r = pearson(&table, 0, 1).unwrap();
        assert!((r - 1.0).abs() < 1e-12);
    }

    #[test]
    fn padded_range_handles_constant_values() {
        let (lo, hi) = padded_range([2.0, 2.0].into_iter());
        assert!(lo < 2.0 && hi > 2.0);
    }

    #[test]
    fn index_label_maps_only_near_ticks() {
        let labels = ["East", "West"];
        assert_eq!(index_label(0.0, &labels), "East");
        assert_eq!(index_label(1.1, &labels), "West");
        assert_eq!(index_label(0.5, &labels), "");
        assert_eq!(index_label(5.0, &labels), "");
    }
}
