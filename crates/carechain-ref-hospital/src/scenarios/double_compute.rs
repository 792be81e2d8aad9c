//! Scenario 4: Double Compute
//!
//! The Specialist's advisor answers slowly. Two `compute` requests for the
//! Specialist arrive back to back; the second finds the slot mid-transition
//! and is ignored. Exactly one diagnosis is recorded and charged.

use std::time::Duration;

use carechain_contracts::{action::Action, error::CarechainResult, role::AgentRole};
use carechain_core::traits::AdvisoryProvider;

use crate::advisory::LatencyAdvisor;

use super::{describe, ScenarioReport, Walkthrough};

pub const NAME: &str = "double-compute";
pub const TITLE: &str = "Scenario 4: Double Compute";

/// How long each advisory answer is held back.
pub const ADVISORY_DELAY: Duration = Duration::from_millis(150);

pub async fn run_scenario(advisor: Box<dyn AdvisoryProvider>) -> CarechainResult<ScenarioReport> {
    use AgentRole::*;

    let mut walk = Walkthrough::new(Box::new(LatencyAdvisor::new(advisor, ADVISORY_DELAY)))?;

    walk.step(Patient, Action::Admit { payload: None }).await;
    walk.step(Patient, Action::Lock).await;
    walk.step(Patient, Action::Forward { target: GeneralDoctor }).await;
    walk.step(GeneralDoctor, Action::Forward { target: Specialist }).await;

    let (first, second) = {
        let engine = walk.engine();
        tokio::join!(
            engine.submit(Specialist, Action::Compute),
            engine.submit(Specialist, Action::Compute),
        )
    };
    walk.record(Specialist, describe(&Action::Compute), &first);
    walk.record(Specialist, describe(&Action::Compute), &second);

    Ok(walk.finish(NAME, TITLE))
}

#[cfg(test)]
mod tests {
    use carechain_contracts::action::Rejection;

    use crate::{advisory::FallbackAdvisor, config::HospitalConfig};

    use super::*;

    #[tokio::test]
    async fn test_second_compute_is_ignored_while_first_in_flight() {
        let advisor = FallbackAdvisor::from_config(&HospitalConfig::embedded().unwrap());
        let report = run_scenario(Box::new(advisor)).await.unwrap();

        let computes: Vec<_> = report.steps.iter().rev().take(2).collect();
        assert!(computes[1].applied);
        assert!(!computes[0].applied);
        assert_eq!(
            computes[0].note,
            Rejection::Busy { role: AgentRole::Specialist }.to_string()
        );

        let diagnoses = report.audit.entries.iter().filter(|e| e.action == "DIAGNOSIS").count();
        assert_eq!(diagnoses, 1);
        let record = report.record.unwrap();
        assert_eq!(record.charges.get("Specialist"), Some(250.0));
        assert_eq!(report.slots[2].status, "Diagnosis Ready");
    }
}
