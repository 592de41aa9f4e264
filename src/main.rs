//! Widecheck - codegen quality tables
//!
//! Grades every harness function of the header under test on every
//! compiler/type column and prints the markdown tables to stdout.

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use widecheck::{
    default_tables, jobs, render_tables, GodboltClient, Grader, GradingRun, Template,
    WidecheckConfig,
};

#[derive(Parser)]
#[command(name = "widecheck")]
#[command(version)]
#[command(about = "Grade wide-integer codegen on Compiler Explorer", long_about = None)]
struct Cli {
    /// Bypass Compiler Explorer's cache
    #[arg(long)]
    bypass: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = WidecheckConfig::load_from_cwd().context("Failed to load widecheck.toml")?;

    let template = Template::load(&config.grading.template).with_context(|| {
        format!(
            "Failed to load template {}",
            config.grading.template.display()
        )
    })?;
    let grader = Grader::new(config.perfect_baseline()?);
    let client = GodboltClient::new(
        &config.explorer.base_url,
        config.explorer.timeout(),
        cli.bypass,
    );

    let tables = default_tables();
    let rows = &config.grading.rows;
    let jobs = jobs(&tables, rows);
    tracing::info!(
        jobs = jobs.len(),
        workers = config.grading.workers,
        explorer = %client.base_url(),
        "starting grading run"
    );

    let measurements = GradingRun::new(&client, &template)
        .with_workers(config.grading.workers)
        .precompute(&jobs)?;

    let report = render_tables(&tables, rows, &measurements, &grader)?;
    println!("{}", report);
    Ok(())
}
