#![deny(clippy::pedantic, clippy::all, clippy::nursery)]
#![allow(clippy::must_use_candidate)]

#[cfg(not(any(target_os = "macos", unix)))]
compile_error!("Only macos and unix are currently supported");

use std::path::PathBuf;

use clap::Parser;
use herald::{Herald, controller::load_job};
use herald_common::{internal, logging};

/// Send one batch of messages, rotating across accounts
#[derive(Parser, Debug)]
#[command(name = "herald")]
#[command(version)]
struct Cli {
    /// Batch job file (RON)
    #[arg(short, long)]
    job: PathBuf,

    /// Config file; discovered from HERALD_CONFIG and the default locations when absent
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init();

    let herald = Herald::load_or_default(cli.config.as_deref())?;
    let job = load_job(&cli.job)?;
    internal!(
        level = INFO,
        "Loaded job from {} with {} recipient(s)",
        cli.job.display(),
        job.recipients.len()
    );

    let report = herald.run_job(job).await?;
    println!(
        "{}",
        ron::ser::to_string_pretty(&report, ron::ser::PrettyConfig::default())?
    );

    Ok(())
}
