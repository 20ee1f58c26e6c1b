//! property-sheet: parses a directory of property-management reports
use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use property_sheet::config::ParserConfig;
use property_sheet::dispatch::BatchReport;
use property_sheet::dispatch::Dispatcher;
use property_sheet::kpi;
use property_sheet::reports::ReportBody;
use property_sheet::reports::ReportKind;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "property-sheet")]
#[command(about = "Parse weekly property-management Excel reports")]
#[command(version)]
struct Args {
    /// Directory holding the .xlsx reports
    #[arg(value_name = "DIR")]
    dir: PathBuf,

    /// Only parse files whose name contains this property code
    #[arg(long, value_name = "CODE")]
    property: Option<String>,

    /// TOML parser configuration
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print the whole batch as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => ParserConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ParserConfig::default(),
    };

    let dispatcher = Dispatcher::standard(&config);
    let batch = dispatcher
        .parse_directory(&args.dir, args.property.as_deref())
        .with_context(|| format!("Failed to parse reports in {}", args.dir.display()))?;

    if args.json {
        let json = serde_json::to_string_pretty(&batch).context("Failed to serialize batch")?;
        println!("{}", json);
    } else {
        print_summary(&batch);
    }
    Ok(())
}

fn print_summary(batch: &BatchReport) {
    let summary = &batch.summary;
    println!(
        "{}: {} files, {} parsed, {} with errors",
        batch.directory, summary.total_files_found, summary.files_successfully_parsed, summary.files_with_errors
    );
    for (pattern, count) in &summary.file_types_found {
        println!("  {:<28} {}", pattern, count);
    }

    for (filename, report) in &batch.parsed {
        let rows: usize = match report.body() {
            ReportBody::Table(table) => table.len(),
            ReportBody::Sections(sections) => sections.iter().map(|section| section.table.len()).sum(),
        };
        println!("{} [{}] {} rows", filename, report.kind(), rows);
        match report.kind() {
            ReportKind::BoxScore => {
                let metrics = kpi::box_score_metrics(report);
                println!(
                    "  units {} occupied {} ({:.1}%) leased {:.1}%",
                    metrics.total_units, metrics.occupied_units, metrics.percent_occupied, metrics.percent_leased
                );
            }
            ReportKind::Delinquency => {
                println!("  collections rate {:.1}%", kpi::collections_rate(report));
            }
            _ => {}
        }
    }

    for error in &batch.errors {
        eprintln!("{}: {}", error.filename, error.error);
    }
}
