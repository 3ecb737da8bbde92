//! Command-line utility for inspecting and administering herald
//!
//! - Send statistics from the outcome log
//! - Account profiles on disk, with their send statistics
//! - Checking which numbers are registered with the messaging service
//! - Issuing and redeeming access keys

#![allow(clippy::single_match_else)]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use herald::{AccountStore, Herald, KeyGate, check_numbers};
use herald_ledger::Recorder;

/// Inspect and administer herald
#[derive(Parser, Debug)]
#[command(name = "heraldctl")]
#[command(about = "Inspect and administer herald", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file; discovered from HERALD_CONFIG and the default locations when absent
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Send statistics
    Stats {
        /// Only count sends made as this account
        #[arg(short, long)]
        account: Option<String>,
    },
    /// Account profiles
    Accounts {
        #[command(subcommand)]
        action: AccountAction,
    },
    /// Check which numbers are registered with the messaging service
    Check {
        /// Account to check as
        #[arg(short, long)]
        account: String,

        /// Numbers to check
        #[arg(required = true)]
        numbers: Vec<String>,
    },
    /// Access keys
    Keys {
        #[command(subcommand)]
        action: KeyAction,
    },
}

#[derive(Subcommand, Debug)]
enum AccountAction {
    /// List every profile
    List,
    /// Show the recorded details of one profile
    Info {
        /// Profile name
        name: String,
    },
}

#[derive(Subcommand, Debug)]
enum KeyAction {
    /// Generate new keys
    Issue {
        /// How many keys to generate
        count: usize,
    },
    /// Redeem a key
    Validate {
        key: String,
    },
    /// Show active and used keys
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    herald_common::logging::init();

    let cli = Cli::parse();
    let config = Herald::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Stats { account } => {
            let recorder = Recorder::new(config.ledger.into_store().await?);
            cmd_stats(&recorder, account).await?;
        }
        Commands::Accounts { action } => {
            let store = config.accounts.into_store();
            let recorder = Recorder::new(config.ledger.into_store().await?);
            match action {
                AccountAction::List => cmd_accounts_list(&store, &recorder).await?,
                AccountAction::Info { name } => cmd_accounts_info(&store, &recorder, &name).await?,
            }
        }
        Commands::Check { account, numbers } => {
            let account = config.accounts.into_store().get(&account)?;
            let checker = config.sender.into_checker();
            let report = check_numbers(checker.as_ref(), &account, &numbers).await?;

            println!("Registered ({}):", report.registered.len());
            for number in &report.registered {
                println!("  {number}");
            }
            println!("Unregistered ({}):", report.unregistered.len());
            for number in &report.unregistered {
                println!("  {number}");
            }
        }
        Commands::Keys { action } => {
            let gate = config.gate.into_gate();
            match action {
                KeyAction::Issue { count } => {
                    for key in gate.issue(count).await? {
                        println!("{key}");
                    }
                }
                KeyAction::Validate { key } => {
                    let validation = gate.validate(&key).await?;
                    println!("{}", validation.message);
                    if !validation.valid {
                        std::process::exit(1);
                    }
                }
                KeyAction::List => cmd_keys_list(&gate).await?,
            }
        }
    }

    Ok(())
}

/// Percentage with one decimal place, or zero when nothing was sent
fn success_rate(successful: usize, sent: usize) -> f64 {
    if sent == 0 {
        return 0.0;
    }

    #[allow(clippy::cast_precision_loss)]
    let rate = successful as f64 / sent as f64 * 100.0;
    (rate * 10.0).round() / 10.0
}

async fn cmd_stats(recorder: &Recorder, account: Option<String>) -> anyhow::Result<()> {
    if let Some(account) = account {
        let stats = recorder.stats_for_account(&account.as_str().into()).await?;
        println!("Account: {account}");
        println!("  Sent:       {}", stats.messages_sent);
        println!("  Successful: {}", stats.successful);
        println!("  Failed:     {}", stats.failed);
        println!(
            "  Success:    {:.1}%",
            success_rate(stats.successful, stats.messages_sent)
        );
        return Ok(());
    }

    let stats = recorder.load_stats().await?;
    println!("Sent:       {}", stats.total_sent);
    println!("Delivered:  {}", stats.total_delivered);
    println!("Failed:     {}", stats.total_failed);
    println!(
        "Success:    {:.1}%",
        success_rate(stats.total_delivered, stats.total_sent)
    );

    if !stats.recent_messages.is_empty() {
        println!();
        println!("{:<26} {:<16} {:<20} {:<8}", "TIME", "ACCOUNT", "RECIPIENT", "STATUS");
        println!("{}", "-".repeat(72));
        for outcome in &stats.recent_messages {
            println!(
                "{:<26} {:<16} {:<20} {:<8}",
                outcome.timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
                outcome.account.as_str(),
                outcome.recipient,
                if outcome.succeeded() { "sent" } else { "failed" }
            );
        }
    }

    Ok(())
}

async fn cmd_accounts_list(store: &AccountStore, recorder: &Recorder) -> anyhow::Result<()> {
    let accounts = store.list_with_stats(recorder).await?;

    println!("{:<24} {:>8}", "ACCOUNT", "SENT");
    println!("{}", "-".repeat(33));
    for (account, stats) in &accounts {
        println!("{:<24} {:>8}", account.id.as_str(), stats.messages_sent);
    }
    println!("\nTotal: {} account(s) in {}", accounts.len(), store.root().display());

    Ok(())
}

async fn cmd_accounts_info(
    store: &AccountStore,
    recorder: &Recorder,
    name: &str,
) -> anyhow::Result<()> {
    let overview = store.overview(name, recorder).await?;
    let (info, stats) = (&overview.info, &overview.statistics);

    println!("Profile: {name}");
    println!("  Name:       {}", info.name);
    println!("  Phone:      {}", info.phone);
    println!("  Created:    {}", info.created_at);
    println!("  Last used:  {}", info.last_used);
    println!("  Sent:       {}", stats.messages_sent);
    println!("  Successful: {}", stats.successful);
    println!("  Failed:     {}", stats.failed);
    println!(
        "  Success:    {:.1}%",
        success_rate(stats.successful, stats.messages_sent)
    );

    Ok(())
}

async fn cmd_keys_list(gate: &KeyGate) -> anyhow::Result<()> {
    let keys = gate.list().await?;

    println!("Active ({}):", keys.active.len());
    for key in &keys.active {
        println!("  {key}");
    }
    println!("Used ({}):", keys.used.len());
    for key in &keys.used {
        println!("  {key}");
    }

    Ok(())
}
