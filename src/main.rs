// Entry point and CLI surface.
//
// Each subcommand is one independent run: load a CSV, compute, write the
// artifacts, exit. Ingestion problems are fatal; a chart or metric whose
// columns are missing is skipped and the run keeps going.
mod charts;
mod clean;
mod fonts;
mod kpis;
mod loader;
mod output;
mod product_issues;
mod report;
mod table;
mod util;

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::warn;

use crate::util::format_int;

#[derive(Parser)]
#[command(author, version, about = "Clean, chart, and summarize retail sales CSV exports")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize a raw sales export into an analysis-ready CSV.
    Clean {
        /// Path to the raw sales CSV.
        #[arg(long)]
        input: PathBuf,
        /// Path for the cleaned CSV.
        #[arg(long)]
        output: PathBuf,
    },

    /// Render the dashboard charts and KPI JSON.
    Charts {
        /// Path to the sales CSV.
        input_csv: PathBuf,
        /// Output directory for the PNGs and kpis.json.
        out_dir: PathBuf,
    },

    /// Assemble the one-page PDF summary from a charts directory.
    Report {
        /// Directory holding the chart PNGs and kpis.json.
        #[arg(long)]
        charts_dir: PathBuf,
        /// Path for the PDF.
        #[arg(long)]
        output: PathBuf,
    },

    /// List the highest-grossing products with negative total profit.
    #[command(name = "product-issues")]
    ProductIssues {
        /// Path to the sales CSV.
        #[arg(long)]
        input: PathBuf,
        /// Path for the JSON report.
        #[arg(long)]
        output: PathBuf,
    },
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Clean { input, output } => run_clean(&input, &output),
        Commands::Charts { input_csv, out_dir } => run_charts(&input_csv, &out_dir),
        Commands::Report { charts_dir, output } => run_report(&charts_dir, &output),
        Commands::ProductIssues { input, output } => run_product_issues(&input, &output),
    };

    if let Err(err) = result {
        eprintln!("Error: {}", err);
        print_error_sources(err.as_ref());
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn print_error_sources(mut error: &(dyn Error + 'static)) {
    while let Some(source) = error.source() {
        eprintln!("  caused by: {}", source);
        error = source;
    }
}

fn run_clean(input: &Path, output: &Path) -> Result<(), Box<dyn Error>> {
    let (table, load) = loader::load_table(input)?;
    if load.skipped_rows > 0 {
        println!(
            "Note: {} rows skipped due to parse errors.",
            format_int(load.skipped_rows as i64)
        );
    }

    let (cleaned, summary) = clean::clean_table(table);
    println!(
        "Processing dataset... ({} rows in, {} rows out)",
        format_int(summary.input_rows as i64),
        format_int(summary.kept_rows as i64)
    );
    if summary.dropped_missing_order_id > 0 {
        println!(
            "Note: {} rows dropped for missing order id.",
            format_int(summary.dropped_missing_order_id as i64)
        );
    }

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    output::write_table_csv(output, &cleaned)?;
    output::preview_table(&cleaned, 3);
    println!(
        "WROTE: {} ({} rows)",
        output.display(),
        format_int(summary.kept_rows as i64)
    );
    Ok(())
}

fn run_charts(input_csv: &Path, out_dir: &Path) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(out_dir)?;

    println!("Reading {} ...", input_csv.display());
    let (table, load) = loader::load_table(input_csv)?;
    println!(
        "Loaded {} of {} rows.",
        format_int(load.kept_rows as i64),
        format_int(load.total_rows as i64)
    );
    if load.skipped_rows > 0 {
        warn!("{} records skipped while reading", load.skipped_rows);
    }
    let table = kpis::coerce_analysis_columns(table);

    for (name, chart) in charts::CHARTS {
        let path = out_dir.join(name);
        if chart(&table, &path)? {
            println!("WROTE: {}", path.display());
        } else {
            println!("SKIPPED: {} (missing columns)", name);
        }
    }

    let report = kpis::compute_kpis(&table);
    let kpi_path = out_dir.join("kpis.json");
    output::write_json(&kpi_path, &report)?;
    println!("WROTE: {}", kpi_path.display());
    Ok(())
}

fn run_report(charts_dir: &Path, output: &Path) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    report::generate(charts_dir, output)?;
    println!("WROTE: {}", output.display());
    Ok(())
}

fn run_product_issues(input: &Path, output: &Path) -> Result<(), Box<dyn Error>> {
    let (table, _) = loader::load_table(input)?;
    let table = kpis::coerce_analysis_columns(table);

    let Some(issues) = product_issues::negative_profit_products(&table, 10) else {
        println!("Required columns missing (product, sales, profit); nothing to report.");
        return Ok(());
    };

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    output::write_json(output, &issues)?;
    output::preview_records(
        vec!["Product".into(), "Sales".into(), "Profit".into()],
        product_issues::preview_rows(&issues),
    );
    println!("WROTE: {}", output.display());
    Ok(())
}
