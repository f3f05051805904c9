//! friction-lab: CLI entry point.
//!
//! Processes the built-in measurement session, writes the CSV table, the JSON
//! view summary and the comparison charts, then prints the error budgets.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

use friction_lab::config::{ChartFormat, LabConfig};
use friction_lab::dataset;
use friction_lab::output::write_outputs;
use friction_lab::pipeline::{comparison_views, process, ComparisonView, ProcessedRow, ViewKind};
use friction_lab::report::{error_budget, load_trend, ErrorBudget, LoadTrend};
use friction_lab::stats::AggregationPolicy;
use friction_lab::Estimate;

#[derive(Parser, Debug)]
#[command(name = "friction-lab")]
#[command(about = "Friction coefficient analysis with interval readings and error propagation")]
#[command(version)]
struct Cli {
    /// YAML configuration file.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Per-measurement CSV output.
    #[arg(long, value_name = "FILE")]
    csv: Option<PathBuf>,

    /// Comparison view summary (JSON).
    #[arg(long, value_name = "FILE")]
    json_out: Option<PathBuf>,

    /// Directory for chart images.
    #[arg(long, value_name = "DIR")]
    plots: Option<PathBuf>,

    /// Chart formats (comma separated).
    #[arg(long, value_enum, value_delimiter = ',')]
    format: Vec<ChartFormat>,

    /// Aggregation policy: pooled-endpoints or widest-interval.
    #[arg(short, long)]
    policy: Option<AggregationPolicy>,

    /// Confidence level for the pooled policy.
    #[arg(long)]
    confidence: Option<f64>,

    /// Skip the error-budget report.
    #[arg(long)]
    no_report: bool,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_tracing(&cli);

    let config = load_config(&cli)?;
    let start = Instant::now();

    println!("{}", "friction-lab".bold());
    println!("  Policy: {}", config.statistics.policy);
    if config.statistics.policy == AggregationPolicy::PooledEndpoints {
        println!("  Confidence: {:.1}%", config.statistics.confidence * 100.0);
    }
    println!("  Gravity: {} m/s²", config.gravity);
    println!();

    info!("processing measurements");
    let measurements = dataset::measurements();
    let rows = process(&measurements, &config);
    let undefined = rows.iter().filter(|r| r.undefined_reason().is_some()).count();
    info!(rows = rows.len(), undefined, "measurements processed");

    let views = comparison_views(&rows, &config.statistics);

    let summary = write_outputs(&rows, &views, &config.output);

    if !cli.no_report {
        print_report(&rows, &views, &config);
    }

    println!();
    println!("{}", "=".repeat(60));
    for path in &summary.written {
        println!("  {} {}", "✓".green(), path.display());
    }
    for err in &summary.failed {
        println!("  {} {err}", "✗".red());
    }
    if summary.is_complete() {
        println!(
            "  {} {} rows, {} outputs in {:.2}s",
            "DONE".green(),
            rows.len(),
            summary.written.len().to_string().green(),
            start.elapsed().as_secs_f64()
        );
    } else {
        println!(
            "  {} {} rows, {} outputs, {} failed in {:.2}s",
            "PARTIAL".yellow(),
            rows.len(),
            summary.written.len(),
            summary.failed.len().to_string().yellow(),
            start.elapsed().as_secs_f64()
        );
    }
    println!("{}", "=".repeat(60));

    Ok(())
}

fn setup_tracing(cli: &Cli) {
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if cli.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .compact()
            .init();
    }
}

/// Config file (or defaults) with CLI overrides applied.
fn load_config(cli: &Cli) -> anyhow::Result<LabConfig> {
    let mut config = match &cli.config {
        Some(path) => LabConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => LabConfig::default(),
    };

    if let Some(path) = &cli.csv {
        config.output.csv.clone_from(path);
    }
    if let Some(path) = &cli.json_out {
        config.output.json.clone_from(path);
    }
    if let Some(dir) = &cli.plots {
        config.output.plots.clone_from(dir);
    }
    if !cli.format.is_empty() {
        config.output.formats.clone_from(&cli.format);
    }
    if let Some(policy) = cli.policy {
        config.statistics.policy = policy;
    }
    if let Some(confidence) = cli.confidence {
        config.statistics.confidence = confidence;
    }

    config.validate().context("invalid command-line override")?;
    Ok(config)
}

fn print_report(rows: &[ProcessedRow], views: &[ComparisonView], config: &LabConfig) {
    println!();
    println!("{}", "Error budgets".cyan());

    for case in &config.report.cases {
        match error_budget(rows, case, config.meter_resolution) {
            Estimate::Known(budget) => print_budget(&budget),
            Estimate::Undefined(reason) => {
                println!(
                    "  {} {} {} {}V: {reason}",
                    "SKIP".yellow(),
                    case.material.label(),
                    case.configuration,
                    case.voltage
                );
            }
        }
    }

    if let Some(view) = views.iter().find(|v| v.kind == ViewKind::NormalForce) {
        println!();
        println!("{}", "Load trend".cyan());
        for trend in load_trend(view) {
            print_trend(&trend);
        }
    }
}

fn print_budget(budget: &ErrorBudget) {
    let readings: Vec<String> = budget.readings.iter().map(|f| format!("{f:.3}")).collect();

    println!();
    println!(
        "{}",
        format!(
            "{} | {} | {}V",
            budget.material.label(),
            budget.configuration,
            budget.voltage
        )
        .bold()
    );
    println!("{}", "-".repeat(50));
    println!("  Mass m [kg]:                  {:.4}", budget.mass_kg.center);
    println!("  Area A [cm²]:                 {:.1}", budget.area_cm2);
    println!("  Voltage U [V]:                {}", budget.voltage);
    println!("  Readings F [N]:               [{}]", readings.join(", "));
    println!("  Number of readings n:         {}", budget.readings.len());
    println!("  Mean friction force <F> [N]:  {:.4}", budget.mean_force);
    println!("  Meter resolution [N]:         {}", budget.resolution);
    println!("  Fluctuation [N]:              {:.4}", budget.fluctuation);
    println!("  ΔF (larger of both) [N]:      {:.4}", budget.delta_force);
    println!("  Normal force Fn [N]:          {:.4}", budget.normal_force.center);
    println!("  Friction coefficient <μ>:     {:.4}", budget.mu.center);
    println!("  Term 1 (ΔF / Fn)²:            {:.8}", budget.force_term);
    println!("  Term 2 (F·ΔFn / Fn²)²:        {:.8}", budget.normal_term);
    println!("  Δμ:                           {:.4}", budget.mu.half_width);
    println!("  {} {}", "Result:".bold(), budget.rounded().green());
}

fn print_trend(trend: &LoadTrend) {
    println!("  {}", trend.label.bold());
    for step in &trend.steps {
        let force = step
            .mean_force
            .known()
            .map_or_else(|| "-".to_string(), |f| format!("{f:.3}"));
        let normal = step
            .normal_force
            .known()
            .map_or_else(|| "-".to_string(), |v| format!("{:.3}", v.center));
        let mu = step
            .mu
            .known()
            .map_or_else(|| "-".to_string(), |v| format!("{v}"));
        println!(
            "    {:<11} F = {force:>6} N   Fn = {normal:>6} N   μ = {mu}",
            step.configuration
        );
    }
    let percent = |g: Option<f64>| g.map_or_else(|| "-".to_string(), |g| format!("{g:+.1}%"));
    println!(
        "    growth      F {}   Fn {}",
        percent(trend.force_growth),
        percent(trend.normal_force_growth)
    );
}
