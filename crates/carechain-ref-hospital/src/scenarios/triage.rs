//! Scenario 2: Triage Straight to Billing
//!
//! The patient corrects the intake vitals before locking, then the General
//! Doctor settles the visit without any referral. Only the triage fee is on
//! the bill; absent contributors are simply absent.

use carechain_contracts::{action::Action, error::CarechainResult, role::AgentRole};
use carechain_core::traits::AdvisoryProvider;

use crate::mock_data::{febrile_intake, standard_intake};

use super::{ScenarioReport, Walkthrough};

pub const NAME: &str = "triage";
pub const TITLE: &str = "Scenario 2: Triage Straight to Billing";

pub async fn run_scenario(advisor: Box<dyn AdvisoryProvider>) -> CarechainResult<ScenarioReport> {
    use AgentRole::*;

    let mut walk = Walkthrough::new(advisor)?;

    walk.step(Patient, Action::Admit { payload: Some(standard_intake()) }).await;
    walk.step(Patient, Action::Amend { payload: febrile_intake() }).await;
    walk.step(Patient, Action::Lock).await;
    // Locked records are no longer editable.
    walk.step(Patient, Action::Amend { payload: standard_intake() }).await;
    walk.step(Patient, Action::Forward { target: GeneralDoctor }).await;
    walk.step(GeneralDoctor, Action::Forward { target: Billing }).await;
    walk.step(Billing, Action::Compute).await;
    walk.step(Patient, Action::Unlock).await;

    Ok(walk.finish(NAME, TITLE))
}
