//! Scenario 3: Out-of-Route Requests
//!
//! A locked record sits with the patient while a series of actions the
//! routing table does not allow arrives. Each is ignored: no slot changes and
//! no audit entry, however often it is repeated.
//!
//! Attempted:
//!   - Patient forwards straight to Billing (only General Doctor is allowed)
//!   - Specialist computes on an empty slot
//!   - General Doctor tries to admit a second record
//!   - Billing tries to unlock the patient's record

use carechain_contracts::{action::Action, error::CarechainResult, role::AgentRole};
use carechain_core::traits::AdvisoryProvider;

use super::{ScenarioReport, Walkthrough};

pub const NAME: &str = "bypass";
pub const TITLE: &str = "Scenario 3: Out-of-Route Requests";

pub async fn run_scenario(advisor: Box<dyn AdvisoryProvider>) -> CarechainResult<ScenarioReport> {
    use AgentRole::*;

    let mut walk = Walkthrough::new(advisor)?;

    walk.step(Patient, Action::Admit { payload: None }).await;
    walk.step(Patient, Action::Lock).await;

    for _ in 0..2 {
        walk.step(Patient, Action::Forward { target: Billing }).await;
    }
    walk.step(Specialist, Action::Compute).await;
    walk.step(GeneralDoctor, Action::Admit { payload: None }).await;
    walk.step(Billing, Action::Unlock).await;

    Ok(walk.finish(NAME, TITLE))
}

#[cfg(test)]
mod tests {
    use carechain_contracts::record::ConfidentialityState;

    use crate::{advisory::FallbackAdvisor, config::HospitalConfig};

    use super::*;

    #[tokio::test]
    async fn test_bypass_attempts_leave_no_trace() {
        let advisor = FallbackAdvisor::from_config(&HospitalConfig::embedded().unwrap());
        let report = run_scenario(Box::new(advisor)).await.unwrap();

        let applied: Vec<bool> = report.steps.iter().map(|s| s.applied).collect();
        assert_eq!(applied, vec![true, true, false, false, false, false, false]);
        assert_eq!(report.audit.entries.len(), 2);
        assert!(report.chain_verified);

        let record = report.record.unwrap();
        assert_eq!(record.state, ConfidentialityState::Confidential);
        assert_eq!(report.slots[0].status, "Locked");
        assert!(report.slots[1..].iter().all(|s| s.state.is_none()));
        assert!(report.steps[2].note.contains("may not forward"));
    }
}
