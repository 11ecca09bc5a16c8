//! # netrecon-cli
//!
//! Binary entry point for netrecon.
//!
//! This crate provides:
//! - `netrecon validate-config` to check a reconcile request file
//! - `netrecon validate-command` to check a command request file
//!
//! Device transports are plugged in by embedding `netrecon-core`, so the
//! binary never contacts a device.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use netrecon_core::{
    CandidateSource, CommandRequest, ReconcileRequest, filter_read_only, render_candidate,
};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// netrecon - network device configuration reconciler
#[derive(Parser, Debug)]
#[command(name = "netrecon", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load and validate a reconcile request file
    ValidateConfig(ValidateConfigArgs),

    /// Load and validate a command request file
    ValidateCommand(ValidateCommandArgs),
}

#[derive(Parser, Debug)]
struct ValidateConfigArgs {
    /// Path to the YAML request file
    file: PathBuf,

    /// Print the loaded request as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Parser, Debug)]
struct ValidateCommandArgs {
    /// Path to the YAML request file
    file: PathBuf,

    /// Print the loaded request as JSON
    #[arg(long)]
    json: bool,

    /// Show which commands survive check-mode filtering
    #[arg(long)]
    check_mode: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let report = match cli.command {
        Commands::ValidateConfig(args) => validate_config(&args.file, args.json)?,
        Commands::ValidateCommand(args) => {
            validate_command(&args.file, args.json, args.check_mode)?
        }
    };

    for line in report {
        println!("{line}");
    }
    Ok(())
}

fn validate_config(path: &Path, json: bool) -> Result<Vec<String>> {
    let request = ReconcileRequest::from_file(path)
        .with_context(|| format!("Failed to load reconcile request {}", path.display()))?;
    let warnings = request
        .validate()
        .with_context(|| format!("Invalid reconcile request {}", path.display()))?;
    debug!(path = %path.display(), warnings = warnings.len(), "Reconcile request is valid");

    if json {
        return Ok(vec![serde_json::to_string_pretty(&request)?]);
    }

    let mut report = vec![format!("{}: valid reconcile request", path.display())];
    match request.candidate_source() {
        Some(CandidateSource::SrcText) => report.push("  candidate: src".to_string()),
        Some(CandidateSource::InlineLines) => {
            report.push("  candidate: lines".to_string());
            for line in render_candidate(&request.lines, &request.parents).lines() {
                report.push(format!("    {line}"));
            }
        }
        None => report.push("  candidate: none".to_string()),
    }
    report.push(format!(
        "  match: {}, replace: {}",
        request.match_mode, request.replace_mode
    ));
    report.push(format!("  save_when: {}", request.save_when));
    if request.diff_requested
        && let Some(against) = request.diff_against
    {
        report.push(format!("  diff_against: {against}"));
    }
    if request.check_mode {
        report.push("  check_mode: true".to_string());
    }
    push_warnings(&mut report, warnings);
    Ok(report)
}

fn validate_command(path: &Path, json: bool, check_mode: bool) -> Result<Vec<String>> {
    let mut request = CommandRequest::from_file(path)
        .with_context(|| format!("Failed to load command request {}", path.display()))?;
    request.check_mode |= check_mode;
    let mut warnings = request
        .validate()
        .with_context(|| format!("Invalid command request {}", path.display()))?;
    let policy = request.retry_policy()?;
    debug!(path = %path.display(), warnings = warnings.len(), "Command request is valid");

    if json {
        return Ok(vec![serde_json::to_string_pretty(&request)?]);
    }

    let mut report = vec![format!("{}: valid command request", path.display())];
    report.push(format!(
        "  retries: {}, interval: {:?}, match: {}",
        policy.retries, policy.interval, policy.match_policy
    ));
    for condition in &request.wait_for {
        report.push(format!("  wait_for: {condition}"));
    }

    let commands = if request.check_mode {
        let filtered = filter_read_only(request.commands, &request.read_only_prefixes);
        warnings.extend(filtered.warnings);
        filtered.commands
    } else {
        request.commands
    };
    for command in &commands {
        report.push(format!("  command: {command}"));
    }
    push_warnings(&mut report, warnings);
    Ok(report)
}

fn push_warnings(report: &mut Vec<String>, warnings: Vec<String>) {
    for warning in warnings {
        warn!("{}", warning);
        report.push(format!("  warning: {warning}"));
    }
}
