//! Artifact writers and console previews.

use std::error::Error;
use std::path::Path;

use serde::Serialize;
use tabled::builder::Builder;
use tabled::settings::Style;

use crate::table::Table;

/// Serialize `value` as pretty-printed JSON (2-space indentation).
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), Box<dyn Error>> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

/// Write a table back out as CSV. Missing cells become empty fields, dates
/// render ISO, integral numbers render without a decimal point.
pub fn write_table_csv(path: &Path, table: &Table) -> Result<(), Box<dyn Error>> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(table.headers())?;
    for row in table.rows() {
        wtr.write_record(row.iter().map(|v| v.to_field()))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Print the first `max_rows` rows as a markdown table.
pub fn preview_table(table: &Table, max_rows: usize) {
    let rows = table
        .rows()
        .iter()
        .take(max_rows)
        .map(|row| row.iter().map(|v| v.to_field()).collect())
        .collect();
    preview_records(table.headers().to_vec(), rows);
}

/// Markdown preview for ad-hoc record lists (reports, product issues).
pub fn preview_records(headers: Vec<String>, rows: Vec<Vec<String>>) {
    if rows.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let mut builder = Builder::default();
    builder.push_record(headers);
    for row in rows {
        builder.push_record(row);
    }
    let mut rendered = builder.build();
    rendered.with(Style::markdown());
    println!("{}\n", rendered);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Value;
    use std::fs;

    #[test]
    fn csv_round_trip_formats_values() {
        let table = Table::new(
            vec!["order_id".into(), "sales".into(), "order_date".into()],
            vec![vec![
                Value::Text("CA-1001".into()),
                Value::Number(100.0),
                Value::Date(chrono::NaiveDate::from_ymd_opt(2016, 11, 8).unwrap()),
            ]],
        );
        let path = std::env::temp_dir().join("sales_insights_out.csv");
        write_table_csv(&path, &table).unwrap();
        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(written, "order_id,sales,order_date\nCA-1001,100,2016-11-08\n");
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn json_is_two_space_indented() {
        #[derive(Serialize)]
        struct Sample {
            total: f64,
        }
        let path = std::env::temp_dir().join("sales_insights_out.json");
        write_json(&path, &Sample { total: 80.0 }).unwrap();
        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(written, "{\n  \"total\": 80.0\n}");
        let _ = fs::remove_file(&path);
    }
}
