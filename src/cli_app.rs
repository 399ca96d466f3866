//! qnotify CLI: argument parsing and subcommand dispatch.

use std::path::PathBuf;

use chrono::Utc;
use clap::{Parser, Subcommand};
use colored::Colorize;

use quota_notify::cache::store::QuotaCache;
use quota_notify::core::config::Config;
use quota_notify::core::errors::Result;
use quota_notify::logger::RunLog;
use quota_notify::notify::mailer::SendmailNotifier;
use quota_notify::probe::accounts::SystemAccounts;
use quota_notify::probe::quotatool::QuotatoolProbe;
use quota_notify::quota::state::QuotaState;
use quota_notify::runner::Runner;

/// Per-account disk-quota monitoring and owner notification.
#[derive(Debug, Parser)]
#[command(name = "qnotify", version, about)]
pub struct Cli {
    /// Location of the configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Reroute all mail to the configured debug recipient.
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create the quota cache (idempotent) and exit.
    Init,
    /// Probe every account on every quota filesystem and refresh cached
    /// snapshots. Never sends mail.
    Update,
    /// Evaluate every cached account and mail owners whose quota state
    /// warrants it.
    Run {
        /// Decide and log, but send no mail and write nothing.
        #[arg(long)]
        dry_run: bool,
    },
    /// Print cached quota state.
    Show {
        /// Restrict to one account uid.
        #[arg(long)]
        uid: Option<u32>,
    },
}

/// Entry point called from `main`.
pub fn run(cli: &Cli) -> Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    if cli.debug {
        config.mail.debug = true;
    }

    match &cli.command {
        Command::Init => {
            let cache = QuotaCache::open(&config.cache.path)?;
            println!("cache ready at {}", cache.path().display());
            Ok(())
        }
        Command::Update => {
            let log = RunLog::new(config.log.jsonl_path.clone());
            let mut cache = QuotaCache::open(&config.cache.path)?;
            let probe = QuotatoolProbe::new(config.probe.command.clone());
            let notifier = SendmailNotifier::from_config(&config.mail);
            let summary = Runner::new(
                &config,
                &mut cache,
                &probe,
                &notifier,
                &SystemAccounts,
                &log,
            )
            .update_run()?;
            println!("update complete: {summary}");
            Ok(())
        }
        Command::Run { dry_run } => {
            let log = RunLog::new(config.log.jsonl_path.clone());
            let mut cache = QuotaCache::open(&config.cache.path)?;
            let probe = QuotatoolProbe::new(config.probe.command.clone());
            let notifier = SendmailNotifier::from_config(&config.mail);
            let summary = Runner::new(
                &config,
                &mut cache,
                &probe,
                &notifier,
                &SystemAccounts,
                &log,
            )
            .with_dry_run(*dry_run)
            .notify_run()?;
            println!("run complete: {summary}");
            Ok(())
        }
        Command::Show { uid } => show(&config, *uid),
    }
}

fn show(config: &Config, only_uid: Option<u32>) -> Result<()> {
    let cache = QuotaCache::open(&config.cache.path)?;
    let now = Utc::now();

    let uids = match only_uid {
        Some(uid) => vec![uid],
        None => cache.all_accounts()?,
    };

    for uid in uids {
        let records = cache.records_for_account(uid)?;
        if records.is_empty() {
            continue;
        }
        println!("{}", format!("uid {uid}").bold());
        for record in records {
            let state = record.snapshot.state_at(now);
            let state_text = match state {
                QuotaState::NoQuota => state.as_str().dimmed(),
                QuotaState::UnderQuota => state.as_str().green(),
                QuotaState::SoftLimit => state.as_str().yellow(),
                QuotaState::HardLimit | QuotaState::GraceExpired => state.as_str().red(),
            };
            let notified = record.last_notify_date.map_or_else(
                || "never notified".to_string(),
                |ts| {
                    format!(
                        "last notified {} ({})",
                        ts.format("%Y-%m-%d %H:%M"),
                        record.effective_notify_state()
                    )
                },
            );
            println!(
                "  {:<16} {:<6} {:<13} {:>10}/{}/{}  {}",
                record.filesystem,
                record.kind.to_string(),
                state_text,
                record.snapshot.used,
                record.snapshot.soft_limit,
                record.snapshot.hard_limit,
                notified.dimmed(),
            );
        }
    }
    Ok(())
}
