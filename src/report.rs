//! One-page executive summary PDF.
//!
//! Reads the KPI JSON and chart PNGs produced by the `charts` subcommand and
//! lays them out on a single A4 page: header, three KPI stats, insight
//! bullets on the left, charts on the right. Absent KPIs render as a dash
//! and missing chart images are skipped, so the report builds from whatever
//! the dashboard run produced.

use std::error::Error;
use std::fs;
use std::path::Path;

use genpdf::{elements, style, Alignment, Element, Scale, SimplePageDecorator};
use log::warn;

use crate::fonts;
use crate::kpis::KpiReport;
use crate::util::format_number;

const MM_PER_INCH: f64 = 25.4;
/// DPI genpdf assumes when sizing embedded raster images.
const RENDER_DPI: f64 = 300.0;
/// Rendered width of each embedded chart.
const CHART_WIDTH_MM: f64 = 85.0;

const ACCENT: style::Color = style::Color::Rgb(11, 110, 79);
const MUTED: style::Color = style::Color::Rgb(102, 102, 102);

/// Chart images embedded in the report, in order.
const REPORT_CHARTS: &[&str] = &[
    "profit_by_region.png",
    "discount_vs_profit.png",
    "top_customers.png",
];

pub fn generate(charts_dir: &Path, out_path: &Path) -> Result<(), Box<dyn Error>> {
    let kpis = load_kpis(&charts_dir.join("kpis.json"));

    let font_family = fonts::load_font_family()?;
    let mut doc = genpdf::Document::new(font_family);
    doc.set_title("Superstore — Executive Summary");
    let mut decorator = SimplePageDecorator::new();
    decorator.set_margins(15);
    doc.set_page_decorator(decorator);

    doc.push(
        elements::Paragraph::new("Superstore — Executive Summary")
            .styled(style::Style::new().bold().with_font_size(18).with_color(ACCENT)),
    );
    doc.push(
        elements::Paragraph::new("One-page summary — generated automatically")
            .styled(style::Style::new().with_font_size(9).with_color(MUTED)),
    );
    doc.push(elements::Break::new(1.0));

    doc.push(kpi_row(&kpis));
    doc.push(elements::Break::new(1.0));

    // Two columns like the dashboard: insights on the left, charts right.
    let mut body = elements::TableLayout::new(vec![45, 55]);
    let mut row = body.row();
    row.push_element(insights_column(&kpis));
    row.push_element(charts_column(charts_dir)?);
    row.push()?;
    doc.push(body);

    doc.push(elements::Break::new(1.0));
    doc.push(
        elements::Paragraph::new("Generated automatically from the latest dashboard run.")
            .styled(style::Style::new().italic().with_font_size(8).with_color(MUTED)),
    );

    doc.render_to_file(out_path)?;
    Ok(())
}

/// Read the KPI JSON written by the `charts` subcommand; a missing or broken
/// file degrades to an empty KPI set rather than failing the report.
fn load_kpis(path: &Path) -> KpiReport {
    match fs::read_to_string(path) {
        Ok(text) => serde_json::from_str(&text).unwrap_or_else(|err| {
            warn!("ignoring unreadable {}: {}", path.display(), err);
            KpiReport::default()
        }),
        Err(err) => {
            warn!("no KPI file at {}: {}", path.display(), err);
            KpiReport::default()
        }
    }
}

fn kpi_row(kpis: &KpiReport) -> elements::TableLayout {
    let mut table = elements::TableLayout::new(vec![1, 1, 1]);
    let mut row = table.row();
    row.push_element(kpi_cell("Total sales", kpis.total_sales.map(fmt_money)));
    row.push_element(kpi_cell("Total profit", kpis.total_profit.map(fmt_money)));
    row.push_element(kpi_cell("Average discount", kpis.avg_discount.map(fmt_pct)));
    // A fixed three-column row cannot be invalid.
    row.push().expect("three-column KPI row");
    table
}

fn kpi_cell(label: &str, value: Option<String>) -> impl Element {
    let mut cell = elements::LinearLayout::vertical();
    cell.push(
        elements::Paragraph::new(label)
            .styled(style::Style::new().bold().with_font_size(10).with_color(ACCENT)),
    );
    cell.push(
        elements::Paragraph::new(value.unwrap_or_else(|| "—".to_string()))
            .styled(style::Style::new().bold().with_font_size(12)),
    );
    cell.padded(2)
}

fn insights_column(kpis: &KpiReport) -> impl Element {
    let mut column = elements::LinearLayout::vertical();
    column.push(
        elements::Paragraph::new("Key insights")
            .styled(style::Style::new().bold().with_font_size(11)),
    );

    let mut list = elements::UnorderedList::new();
    for bullet in insight_bullets(kpis) {
        list.push(
            elements::Paragraph::new(bullet).styled(style::Style::new().with_font_size(10)),
        );
    }
    column.push(list);
    column.padded(2)
}

/// Bullet lines derived from whichever KPIs are present.
fn insight_bullets(kpis: &KpiReport) -> Vec<String> {
    let mut bullets = Vec::new();
    if let Some(regions) = kpis.top_3_regions_by_profit.as_deref() {
        bullets.push(format!("Top regions by profit: {}", regions.join(", ")));
    }
    if let Some(avg) = kpis.avg_discount {
        let mut line = format!("Average discount: {}", fmt_pct(avg));
        if let Some(threshold) = kpis.discount_threshold_loss {
            line.push_str(&format!(
                "; average profit turns negative near {}",
                fmt_pct(threshold)
            ));
        }
        bullets.push(line);
    }
    if let Some(customers) = kpis.top_10_customers_by_profit.as_deref() {
        let leaders: Vec<&str> = customers.iter().take(5).map(String::as_str).collect();
        let suffix = if customers.len() > 5 { ", ..." } else { "" };
        bullets.push(format!("Top customers: {}{}", leaders.join(", "), suffix));
    }
    bullets.push(
        "Action: tighten high discounts, prioritize top customers, focus merchandising on top products."
            .to_string(),
    );
    bullets
}

fn charts_column(charts_dir: &Path) -> Result<impl Element, Box<dyn Error>> {
    let mut column = elements::LinearLayout::vertical();
    for name in REPORT_CHARTS {
        let path = charts_dir.join(name);
        if !path.is_file() {
            warn!("chart {} not found, leaving it out", path.display());
            continue;
        }
        column.push(chart_image(&path)?);
        column.push(elements::Break::new(0.5));
    }
    Ok(column.padded(2))
}

/// Load a chart PNG scaled to [`CHART_WIDTH_MM`], preserving aspect ratio.
fn chart_image(path: &Path) -> Result<elements::Image, Box<dyn Error>> {
    let (px_width, _) = image::image_dimensions(path)?;
    let natural_mm = f64::from(px_width) * MM_PER_INCH / RENDER_DPI;
    let scale = if natural_mm > f64::EPSILON {
        CHART_WIDTH_MM / natural_mm
    } else {
        1.0
    };
    let mut element = elements::Image::from_path(path)?;
    element.set_scale(Scale::new(scale, scale));
    element.set_alignment(Alignment::Center);
    Ok(element)
}

fn fmt_money(v: f64) -> String {
    format_number(v, 2)
}

fn fmt_pct(v: f64) -> String {
    format!("{:.1}%", v * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bullets_reflect_available_kpis() {
        let kpis = KpiReport {
            avg_discount: Some(0.156),
            discount_threshold_loss: Some(0.3),
            top_3_regions_by_profit: Some(vec!["East".into(), "West".into()]),
            ..KpiReport::default()
        };
        let bullets = insight_bullets(&kpis);
        assert_eq!(bullets.len(), 3);
        assert_eq!(bullets[0], "Top regions by profit: East, West");
        assert!(bullets[1].contains("15.6%"));
        assert!(bullets[1].contains("30.0%"));
        assert!(bullets[2].starts_with("Action:"));
    }

    #[test]
    fn bullets_always_include_the_action_line() {
        let bullets = insight_bullets(&KpiReport::default());
        assert_eq!(bullets.len(), 1);
        assert!(bullets[0].starts_with("Action:"));
    }

    #[test]
    fn customer_bullet_truncates_to_five() {
        let kpis = KpiReport {
            top_10_customers_by_profit: Some(
                (0..8).map(|i| format!("Customer {}", i)).collect(),
            ),
            ..KpiReport::default()
        };
        let bullets = insight_bullets(&kpis);
        assert!(bullets[0].contains("Customer 4"));
        assert!(!bullets[0].contains("Customer 5"));
        assert!(bullets[0].ends_with(", ..."));
    }

    #[test]
    fn missing_kpi_file_degrades_to_empty_report() {
        let kpis = load_kpis(Path::new("/nowhere/kpis.json"));
        assert!(kpis.total_sales.is_none());
    }

    #[test]
    fn percent_formatting() {
        assert_eq!(fmt_pct(0.4), "40.0%");
        assert_eq!(fmt_money(1234.5), "1,234.50");
    }
}
