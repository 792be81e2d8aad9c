//! carechain Reference Hospital — Demo CLI
//!
//! Runs one or all of the reference hospital scenarios. Each scenario uses
//! real carechain components (routing policy, transition engine, audit log,
//! simulated computation) with fictional intake data.
//!
//! Usage:
//!   cargo run -p demo -- run-all
//!   cargo run -p demo -- full-chain --json
//!   COHERE_API_KEY=... cargo run -p demo -- triage
//!   cargo run -p demo -- manifest
//!   cargo run -p demo -- routes

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use carechain_contracts::{error::CarechainResult, role::AgentRole};
use carechain_core::traits::AdvisoryProvider;
use carechain_ref_hospital::{
    advisory::{CohereAdvisor, FallbackAdvisor},
    config::{hospital_routing, HospitalConfig},
    run_named,
    scenarios::{bypass, describe, double_compute, full_chain, triage},
    SCENARIOS,
};

// ── CLI definition ────────────────────────────────────────────────────────────

/// carechain — clinical record workflow demo.
///
/// Each subcommand runs one or all of the reference hospital scenarios, or
/// prints the hospital's static configuration.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "carechain reference hospital demo",
    long_about = "Runs carechain reference hospital scenarios showing table-driven routing,\n\
                  ignored out-of-route actions, in-flight rejection, and audit chain integrity."
)]
struct Cli {
    /// Print reports as JSON instead of plain text.
    #[arg(long, global = true)]
    json: bool,

    /// Cohere API key. Without one, every advisor answer is the fixed fallback.
    #[arg(long, env = "COHERE_API_KEY", global = true, hide_env_values = true)]
    cohere_key: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run all four scenarios in sequence.
    RunAll,
    /// Scenario 1: Full Care Chain (every agent contributes).
    FullChain,
    /// Scenario 2: Triage straight to billing (amend before lock).
    Triage,
    /// Scenario 3: Out-of-route requests are ignored.
    Bypass,
    /// Scenario 4: A second compute while the first is in flight.
    DoubleCompute,
    /// Print the facility manifest.
    Manifest,
    /// Print what each role may attempt under the routing table.
    Routes,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    // Initialize structured logging. Set RUST_LOG=debug for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    if !cli.json {
        print_banner();
    }

    let result = match cli.command {
        Command::RunAll => run_scenarios(&cli, &SCENARIOS).await,
        Command::FullChain => run_scenarios(&cli, &[full_chain::NAME]).await,
        Command::Triage => run_scenarios(&cli, &[triage::NAME]).await,
        Command::Bypass => run_scenarios(&cli, &[bypass::NAME]).await,
        Command::DoubleCompute => run_scenarios(&cli, &[double_compute::NAME]).await,
        Command::Manifest => print_manifest(cli.json),
        Command::Routes => print_routes(cli.json),
    };

    if let Err(e) = result {
        eprintln!("Demo error: {}", e);
        std::process::exit(1);
    }
}

// ── Scenario dispatch ─────────────────────────────────────────────────────────

fn advisor(cli: &Cli, config: &HospitalConfig) -> CarechainResult<Box<dyn AdvisoryProvider>> {
    let fallback = FallbackAdvisor::from_config(config);
    match cli.cohere_key.as_deref().filter(|k| !k.is_empty()) {
        Some(key) => {
            info!("using Cohere advisor");
            Ok(Box::new(CohereAdvisor::new(key, fallback)?))
        }
        None => Ok(Box::new(fallback)),
    }
}

async fn run_scenarios(cli: &Cli, names: &[&str]) -> CarechainResult<()> {
    let config = HospitalConfig::embedded()?;
    let mut reports = Vec::with_capacity(names.len());

    for name in names {
        let report = run_named(name, advisor(cli, &config)?).await?;
        if !cli.json {
            report.print();
        }
        reports.push(report);
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        println!("All selected scenarios completed.");
    }
    Ok(())
}

// ── Static configuration ──────────────────────────────────────────────────────

fn print_manifest(json: bool) -> CarechainResult<()> {
    let facility = HospitalConfig::embedded()?.facility;
    if json {
        println!("{}", serde_json::to_string_pretty(&facility)?);
        return Ok(());
    }

    println!("  Facility:     {}", facility.name);
    println!("  UUID:         {}", facility.uuid);
    println!("  Departments:  {}", facility.departments.join(", "));
    println!("  Security:     {}", facility.security);
    println!();
    Ok(())
}

fn print_routes(json: bool) -> CarechainResult<()> {
    let policy = hospital_routing()?;
    if json {
        println!("{}", serde_json::to_string_pretty(policy.table())?);
        return Ok(());
    }

    for role in AgentRole::ALL {
        let actions: Vec<String> = policy.permitted_actions(role).iter().map(describe).collect();
        let owner = if policy.table().owner() == Some(role) { " (owner)" } else { "" };
        println!("  {:<15}{:<9} {}", role.display_name(), owner, actions.join(", "));
    }
    println!();
    Ok(())
}

// ── Banner ────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("carechain — Clinical Record Workflow");
    println!("Reference Hospital Demo");
    println!("====================================");
    println!();
    println!("Per request:");
    println!("  [1] Routing table lookup: may this role attempt this action?");
    println!("  [2] Preconditions: slot contents, confidentiality state, busy slots");
    println!("  [3] Claim the slots involved; await the advisor if configured");
    println!("  [4] Run the computation; commit slots + hash-chained audit entry atomically");
    println!("  [5] Any failed check: ignored, nothing changes");
    println!();
}
