//! Products that sell but lose money.
//!
//! Groups the table by product, sums sales and profit, and keeps the ten
//! highest-grossing products whose total profit is negative — the items most
//! worth repricing first.

use std::collections::HashMap;

use serde::Serialize;

use crate::kpis::aliases;
use crate::table::Table;
use crate::util::format_number;

#[derive(Debug, Clone, Serialize)]
pub struct ProductIssue {
    pub product: String,
    pub sales: f64,
    pub profit: f64,
}

/// `None` when the product, sales, or profit column is unavailable.
pub fn negative_profit_products(table: &Table, top_n: usize) -> Option<Vec<ProductIssue>> {
    let product = table.resolve(aliases::PRODUCT)?;
    let sales = table.resolve(aliases::SALES)?;
    let profit = table.resolve(aliases::PROFIT)?;

    // Sum both measures per product, keeping first-seen product order so
    // ranking ties stay deterministic for a given file.
    let mut order: Vec<ProductIssue> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for row in table.rows() {
        let Some(key) = row[product].label() else {
            continue;
        };
        let slot = match index.get(&key) {
            Some(&i) => i,
            None => {
                index.insert(key.clone(), order.len());
                order.push(ProductIssue {
                    product: key,
                    sales: 0.0,
                    profit: 0.0,
                });
                order.len() - 1
            }
        };
        if let Some(s) = row[sales].as_number() {
            order[slot].sales += s;
        }
        if let Some(p) = row[profit].as_number() {
            order[slot].profit += p;
        }
    }

    let mut losing: Vec<ProductIssue> = order.into_iter().filter(|p| p.profit < 0.0).collect();
    losing.sort_by(|a, b| b.sales.partial_cmp(&a.sales).unwrap_or(std::cmp::Ordering::Equal));
    losing.truncate(top_n);
    Some(losing)
}

/// Rows for the console preview table.
pub fn preview_rows(issues: &[ProductIssue]) -> Vec<Vec<String>> {
    issues
        .iter()
        .map(|issue| {
            vec![
                issue.product.clone(),
                format_number(issue.sales, 2),
                format_number(issue.profit, 2),
            ]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Value;

    fn row(product: &str, sales: f64, profit: f64) -> Vec<Value> {
        vec![
            Value::Text(product.to_string()),
            Value::Number(sales),
            Value::Number(profit),
        ]
    }

    fn sample() -> Table {
        Table::new(
            vec!["Product Name".into(), "Sales".into(), "Profit".into()],
            vec![
                row("Binder", 50.0, 5.0),
                row("Lamp", 200.0, -20.0),
                row("Lamp", 100.0, -10.0),
                row("Desk", 500.0, -1.0),
                row("Chair", 400.0, 30.0),
            ],
        )
    }

    #[test]
    fn keeps_only_negative_profit_products() {
        let issues = negative_profit_products(&sample(), 10).unwrap();
        let names: Vec<&str> = issues.iter().map(|i| i.product.as_str()).collect();
        assert_eq!(names, vec!["Desk", "Lamp"]);
    }

    #[test]
    fn sorts_by_sales_descending_and_sums_groups() {
        let issues = negative_profit_products(&sample(), 10).unwrap();
        assert_eq!(issues[0].sales, 500.0);
        assert_eq!(issues[1].sales, 300.0);
        assert_eq!(issues[1].profit, -30.0);
    }

    #[test]
    fn truncates_to_requested_count() {
        let issues = negative_profit_products(&sample(), 1).unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].product, "Desk");
    }

    #[test]
    fn missing_columns_yield_none() {
        let table = Table::new(
            vec!["Product Name".into(), "Sales".into()],
            vec![vec![Value::Text("Lamp".into()), Value::Number(1.0)]],
        );
        assert!(negative_profit_products(&table, 10).is_none());
    }
}
