//! Reference hospital demo scenarios.
//!
//! Each scenario wires real carechain components (routing policy, audit log,
//! simulated computation, transition engine) to the advisor the caller
//! supplies, drives the record along one path, and returns a
//! `ScenarioReport` the demo prints or serializes.

pub mod bypass;
pub mod double_compute;
pub mod full_chain;
pub mod triage;

use serde::Serialize;
use tracing::info;

use carechain_audit::{AuditLog, InMemoryAuditLog};
use carechain_contracts::{
    action::{Action, Outcome},
    error::CarechainResult,
    record::{ConfidentialityState, Record},
    role::AgentRole,
};
use carechain_core::{traits::AdvisoryProvider, TransitionEngine};

use crate::{compute::SimulatedComputation, config::hospital_routing};

// ── Report types ──────────────────────────────────────────────────────────────

/// One submitted action and what the engine did with it.
#[derive(Debug, Clone, Serialize)]
pub struct StepLine {
    pub role: AgentRole,
    pub action: String,
    pub applied: bool,
    /// Audit actions appended, or the reason the action was ignored.
    pub note: String,
}

/// One slot at the end of a scenario.
#[derive(Debug, Clone, Serialize)]
pub struct SlotView {
    pub role: AgentRole,
    pub status: String,
    pub state: Option<ConfidentialityState>,
}

/// Everything a scenario produced.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub name: &'static str,
    pub title: &'static str,
    pub steps: Vec<StepLine>,
    pub slots: Vec<SlotView>,
    /// The single live record, wherever it ended up.
    pub record: Option<Record>,
    pub audit: AuditLog,
    pub chain_verified: bool,
}

impl ScenarioReport {
    /// Print the report in the demo's plain-text layout.
    pub fn print(&self) {
        println!("=== {} ===", self.title);
        println!();
        for (i, step) in self.steps.iter().enumerate() {
            let verdict = if step.applied { "APPLIED" } else { "IGNORED" };
            println!(
                "  {:>2}. {:<15} {:<28} {:<8} {}",
                i + 1,
                step.role.display_name(),
                step.action,
                verdict,
                step.note
            );
        }
        println!();
        println!("  Slots:");
        for slot in &self.slots {
            let state = slot.state.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string());
            println!("    {:<15} {:<14} {}", slot.role.display_name(), state, slot.status);
        }
        if let Some(record) = &self.record {
            println!();
            println!("  Record {}", record.id);
            println!("    State:       {}", record.state);
            for line in record.charges.iter() {
                println!("    Charge:      {:<15} ${:.2}", line.agent, line.amount);
            }
            if let Some(total) = record.total_charge {
                println!("    Total:       ${:.2}", total);
            }
            if let Some(severity) = record.severity {
                println!("    Severity:    {:.0}", severity);
            }
            println!("    Provenance:  {}", record.provenance.join(" → "));
        }
        println!();
        println!(
            "  Audit chain integrity:  {} ({} entr{})",
            if self.chain_verified { "VERIFIED" } else { "FAILED" },
            self.audit.entries.len(),
            if self.audit.entries.len() == 1 { "y" } else { "ies" }
        );
        println!("  Terminal tag:           {}", short_tag(&self.audit.terminal_tag));
        println!();
    }
}

fn short_tag(tag: &str) -> &str {
    tag.get(..16).unwrap_or(tag)
}

// ── Walkthrough harness ───────────────────────────────────────────────────────

/// A freshly wired hospital engine plus a running list of submitted steps.
pub struct Walkthrough {
    engine: TransitionEngine,
    audit: InMemoryAuditLog,
    steps: Vec<StepLine>,
}

impl Walkthrough {
    /// Wire the embedded routing table, a new audit log, the simulated
    /// computation provider, and `advisor`.
    pub fn new(advisor: Box<dyn AdvisoryProvider>) -> CarechainResult<Self> {
        let routes = hospital_routing()?.into_table();
        let audit = InMemoryAuditLog::new(uuid::Uuid::new_v4().to_string());
        let engine = TransitionEngine::new(
            routes,
            Box::new(SimulatedComputation::new()),
            advisor,
            Box::new(audit.clone()),
        )?;
        Ok(Self {
            engine,
            audit,
            steps: Vec::new(),
        })
    }

    pub fn engine(&self) -> &TransitionEngine {
        &self.engine
    }

    /// Submit one action and note the outcome.
    pub async fn step(&mut self, role: AgentRole, action: Action) -> Outcome {
        let label = describe(&action);
        let outcome = self.engine.submit(role, action).await;
        self.record(role, label, &outcome);
        outcome
    }

    /// Note an outcome produced outside `step`, e.g. by concurrent submits.
    pub fn record(&mut self, role: AgentRole, action: String, outcome: &Outcome) {
        let note = match outcome {
            Outcome::Applied { entries } => entries
                .iter()
                .map(|e| e.action.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            Outcome::Ignored(rejection) => rejection.to_string(),
        };
        self.steps.push(StepLine {
            role,
            action,
            applied: outcome.is_applied(),
            note,
        });
    }

    /// Close the walkthrough and collect the report.
    pub fn finish(self, name: &'static str, title: &'static str) -> ScenarioReport {
        let slots = self.engine.slots();
        let record = slots.iter().find_map(|(_, slot)| slot.record.clone());
        let slots = slots
            .into_iter()
            .map(|(role, slot)| SlotView {
                role,
                status: slot.status,
                state: slot.record.map(|r| r.state),
            })
            .collect();

        let chain_verified = self.engine.verify_audit();
        let audit = self.audit.export_log();
        info!(
            scenario = name,
            entries = audit.entries.len(),
            verified = chain_verified,
            "scenario finished"
        );

        ScenarioReport {
            name,
            title,
            steps: self.steps,
            slots,
            record,
            audit,
            chain_verified,
        }
    }
}

/// Short label for an action, e.g. "forward → Medical Lab".
pub fn describe(action: &Action) -> String {
    match action {
        Action::Forward { target } => format!("forward → {}", target),
        other => other.name().to_string(),
    }
}
