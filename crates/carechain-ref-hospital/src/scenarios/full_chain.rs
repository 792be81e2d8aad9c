//! Scenario 1: Full Care Chain
//!
//! The record travels the whole hospital and comes back:
//!
//!   Patient → General Doctor → Medical Lab → Specialist → Human Doctor
//!           → Billing → Patient
//!
//! Every agent with a fee contributes exactly once. Billing settles the sum
//! and returns the record; the patient unlocks it. With the fallback advisor
//! the charges are 150 + 200 + 250 + 10 = 610.

use carechain_contracts::{action::Action, error::CarechainResult, role::AgentRole};
use carechain_core::traits::AdvisoryProvider;

use crate::mock_data::standard_intake;

use super::{ScenarioReport, Walkthrough};

pub const NAME: &str = "full-chain";
pub const TITLE: &str = "Scenario 1: Full Care Chain";

pub async fn run_scenario(advisor: Box<dyn AdvisoryProvider>) -> CarechainResult<ScenarioReport> {
    use AgentRole::*;

    let mut walk = Walkthrough::new(advisor)?;

    walk.step(Patient, Action::Admit { payload: Some(standard_intake()) }).await;
    walk.step(Patient, Action::Lock).await;
    walk.step(Patient, Action::Forward { target: GeneralDoctor }).await;
    walk.step(GeneralDoctor, Action::Forward { target: MedicalLab }).await;
    walk.step(MedicalLab, Action::Compute).await;
    walk.step(MedicalLab, Action::Forward { target: Specialist }).await;
    walk.step(Specialist, Action::Compute).await;
    walk.step(Specialist, Action::Forward { target: HumanDoctor }).await;
    // Approval chains into billing; billing chains back to the patient.
    walk.step(HumanDoctor, Action::Compute).await;
    walk.step(Billing, Action::Compute).await;
    walk.step(Patient, Action::Unlock).await;

    Ok(walk.finish(NAME, TITLE))
}

#[cfg(test)]
mod tests {
    use carechain_contracts::record::ConfidentialityState;

    use crate::{advisory::FallbackAdvisor, config::HospitalConfig};

    use super::*;

    fn fallback() -> Box<dyn AdvisoryProvider> {
        Box::new(FallbackAdvisor::from_config(&HospitalConfig::embedded().unwrap()))
    }

    #[tokio::test]
    async fn test_full_chain_totals_610_and_reveals() {
        let report = run_scenario(fallback()).await.unwrap();

        assert!(report.steps.iter().all(|s| s.applied), "every step must apply: {:?}", report.steps);
        let record = report.record.unwrap();
        assert_eq!(record.state, ConfidentialityState::Revealed);
        assert_eq!(record.total_charge, Some(610.0));
        assert_eq!(record.severity, Some(65.0));

        let agents: Vec<&str> = record.charges.iter().map(|c| c.agent.as_str()).collect();
        assert_eq!(agents, vec!["General Doctor", "Medical Lab", "Specialist", "Human Doctor"]);
    }

    #[tokio::test]
    async fn test_full_chain_audit_trail() {
        let report = run_scenario(fallback()).await.unwrap();

        assert!(report.chain_verified);
        let actions: Vec<&str> = report.audit.entries.iter().map(|e| e.action.as_str()).collect();
        assert_eq!(
            actions,
            vec![
                "ADMIT",
                "LOCK",
                "SUBMIT",
                "REFERRAL",
                "LAB_WORK",
                "FORWARD",
                "DIAGNOSIS",
                "CONSULT",
                "APPROVAL",
                "FORWARD_BILLING",
                "BILLING",
                "COMPLETE",
                "UNLOCK",
            ]
        );

        let patient = &report.slots[0];
        assert_eq!(patient.role, AgentRole::Patient);
        assert_eq!(patient.status, "Complete");
        assert_eq!(
            report.slots.iter().filter(|s| s.state.is_some()).count(),
            1,
            "exactly one slot holds the record"
        );
    }

    #[tokio::test]
    async fn test_lab_entry_carries_biomarkers() {
        let report = run_scenario(fallback()).await.unwrap();
        let lab = report.audit.entries.iter().find(|e| e.action == "LAB_WORK").unwrap();
        let metrics = lab.metrics.as_ref().unwrap();
        assert!(metrics.contains_key("hemoglobin"));
        assert!(metrics.contains_key("abnormality_index"));
        assert!(lab.formula.is_some());
    }
}
