//! # carechain-policy
//!
//! A TOML-driven, deny-by-default routing table for the carechain workflow.
//!
//! ## Overview
//!
//! This crate provides [`TomlRoutingPolicy`], which loads and validates the
//! per-role routing table the transition engine consults. A role that is not
//! listed may do nothing; a listed role may do exactly what its route says.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::path::Path;
//! use carechain_policy::TomlRoutingPolicy;
//!
//! let policy = TomlRoutingPolicy::from_file(Path::new("policies/routing.toml"))?;
//! // Pass `policy.into_table()` to `carechain_core::TransitionEngine::new(...)`.
//! ```
//!
//! ## Table rules
//!
//! Exactly one route is the data owner, no role appears twice, and no role
//! forwards or chains into its own slot. See [`rule::validate`].

pub mod engine;
pub mod rule;

pub use engine::TomlRoutingPolicy;
pub use rule::{validate, RouteVerdict};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use carechain_contracts::{
        action::Action, error::CarechainError, record::Payload, role::AgentRole,
    };

    use crate::{RouteVerdict, TomlRoutingPolicy};

    // ── Helpers ───────────────────────────────────────────────────────────────

    const SMALL_TABLE: &str = r#"
        [[routes]]
        role = "patient"
        owner = true
        forward_targets = ["general-doctor"]
        forward_action = "SUBMIT"

        [[routes]]
        role = "general-doctor"
        forward_targets = ["billing"]
        forward_action = "REFERRAL"
        advise_on_forward = true

        [[routes]]
        role = "billing"

        [routes.compute]
        operation = "billing"
        action = "BILLING"
        settle = true
        busy_status = "Calculating..."
        done_status = "Billed"

        [routes.compute.then]
        target = "patient"
        action = "COMPLETE"
        details = "Bill settled and returned to patient."
    "#;

    fn config_reason(result: Result<TomlRoutingPolicy, CarechainError>) -> String {
        match result {
            Err(CarechainError::ConfigError { reason }) => reason,
            other => panic!("expected ConfigError, got {:?}", other),
        }
    }

    // ── 1. loading ────────────────────────────────────────────────────────────

    #[test]
    fn test_load_applies_defaults() {
        let policy = TomlRoutingPolicy::from_toml_str(SMALL_TABLE).unwrap();
        let table = policy.table();

        assert_eq!(table.routes.len(), 3);
        assert_eq!(table.owner(), Some(AgentRole::Patient));

        let billing = table.route(AgentRole::Billing).unwrap();
        assert!(billing.forward_targets.is_empty());
        assert_eq!(billing.forward_action, "FORWARD");
        assert_eq!(billing.forwarded_status, "Forwarded");

        let compute = billing.compute.as_ref().unwrap();
        assert!(compute.settle);
        assert!(!compute.advise);
        let then = compute.then.as_ref().unwrap();
        assert_eq!(then.target, AgentRole::Patient);
        assert_eq!(then.target_status, "Received");
    }

    // ── 2. deny-by-default ────────────────────────────────────────────────────

    #[test]
    fn test_unlisted_role_is_denied_by_default() {
        let policy = TomlRoutingPolicy::from_toml_str(SMALL_TABLE).unwrap();
        match policy.evaluate(AgentRole::Specialist, &Action::Compute) {
            RouteVerdict::Deny { reason } => {
                assert!(reason.contains("denied by default"), "unexpected reason: {reason}");
            }
            other => panic!("expected Deny, got {:?}", other),
        }
        assert!(policy.permitted_actions(AgentRole::Specialist).is_empty());
    }

    // ── 3. owner-only actions ─────────────────────────────────────────────────

    #[test]
    fn test_owner_actions() {
        let policy = TomlRoutingPolicy::from_toml_str(SMALL_TABLE).unwrap();
        assert_eq!(policy.evaluate(AgentRole::Patient, &Action::Lock), RouteVerdict::Allow);
        assert!(!policy.evaluate(AgentRole::GeneralDoctor, &Action::Unlock).is_allowed());
    }

    // ── 4. forward targets ────────────────────────────────────────────────────

    #[test]
    fn test_forward_targets() {
        let policy = TomlRoutingPolicy::from_toml_str(SMALL_TABLE).unwrap();
        let to_gd = Action::Forward { target: AgentRole::GeneralDoctor };
        let to_billing = Action::Forward { target: AgentRole::Billing };

        assert!(policy.evaluate(AgentRole::Patient, &to_gd).is_allowed());
        match policy.evaluate(AgentRole::Patient, &to_billing) {
            RouteVerdict::Deny { reason } => assert!(reason.contains("Billing")),
            other => panic!("expected Deny, got {:?}", other),
        }
        assert!(policy.evaluate(AgentRole::GeneralDoctor, &to_billing).is_allowed());
    }

    #[test]
    fn test_permitted_actions_lists_owner_verbs_then_routes() {
        let policy = TomlRoutingPolicy::from_toml_str(SMALL_TABLE).unwrap();
        assert_eq!(
            policy.permitted_actions(AgentRole::Patient),
            vec![
                Action::Admit { payload: None },
                Action::Amend { payload: Payload::default() },
                Action::Lock,
                Action::Unlock,
                Action::Forward { target: AgentRole::GeneralDoctor },
            ]
        );
        assert_eq!(policy.permitted_actions(AgentRole::Billing), vec![Action::Compute]);
    }

    fn every_action() -> Vec<Action> {
        let mut actions = vec![
            Action::Admit { payload: None },
            Action::Amend { payload: Payload::default() },
            Action::Lock,
            Action::Unlock,
            Action::Compute,
        ];
        actions.extend(AgentRole::ALL.iter().map(|t| Action::Forward { target: *t }));
        actions
    }

    #[test]
    fn test_permitted_actions_match_evaluate() {
        let owner_only = r#"
            [[routes]]
            role = "patient"
            owner = true
            forward_targets = ["general-doctor"]
        "#;

        for toml in [SMALL_TABLE, owner_only] {
            let policy = TomlRoutingPolicy::from_toml_str(toml).unwrap();
            for role in AgentRole::ALL {
                let listed = policy.permitted_actions(role);
                for action in every_action() {
                    let allowed = policy.evaluate(role, &action).is_allowed();
                    assert_eq!(
                        allowed,
                        listed.contains(&action),
                        "{role} {}: evaluate and permitted_actions disagree",
                        action.name()
                    );
                }
            }
        }
    }

    #[test]
    fn test_owner_may_amend_but_others_may_not() {
        let policy = TomlRoutingPolicy::from_toml_str(SMALL_TABLE).unwrap();
        let amend = Action::Amend { payload: Payload::default() };
        assert!(policy.evaluate(AgentRole::Patient, &amend).is_allowed());
        match policy.evaluate(AgentRole::Billing, &amend) {
            RouteVerdict::Deny { reason } => assert!(reason.contains("amend"), "unexpected reason: {reason}"),
            other => panic!("expected Deny, got {:?}", other),
        }
    }

    // ── 5. table rules ────────────────────────────────────────────────────────

    #[test]
    fn test_missing_owner_rejected() {
        let toml = r#"
            [[routes]]
            role = "billing"
        "#;
        let reason = config_reason(TomlRoutingPolicy::from_toml_str(toml));
        assert!(reason.contains("exactly one owner"), "unexpected reason: {reason}");
    }

    #[test]
    fn test_two_owners_rejected() {
        let toml = r#"
            [[routes]]
            role = "patient"
            owner = true

            [[routes]]
            role = "human-doctor"
            owner = true
        "#;
        let reason = config_reason(TomlRoutingPolicy::from_toml_str(toml));
        assert!(reason.contains("found 2"), "unexpected reason: {reason}");
    }

    #[test]
    fn test_duplicate_role_rejected() {
        let toml = r#"
            [[routes]]
            role = "patient"
            owner = true

            [[routes]]
            role = "billing"

            [[routes]]
            role = "billing"
        "#;
        let reason = config_reason(TomlRoutingPolicy::from_toml_str(toml));
        assert!(reason.contains("'billing' has more than one route"), "unexpected reason: {reason}");
    }

    #[test]
    fn test_self_target_rejected() {
        let toml = r#"
            [[routes]]
            role = "patient"
            owner = true
            forward_targets = ["patient"]
        "#;
        let reason = config_reason(TomlRoutingPolicy::from_toml_str(toml));
        assert!(reason.contains("itself"), "unexpected reason: {reason}");
    }

    #[test]
    fn test_chain_into_own_slot_rejected() {
        let toml = r#"
            [[routes]]
            role = "patient"
            owner = true

            [[routes]]
            role = "human-doctor"

            [routes.compute]
            operation = "review"
            action = "APPROVAL"
            busy_status = "Reviewing..."
            done_status = "Approved"

            [routes.compute.then]
            target = "human-doctor"
            action = "LOOP"
            details = "loops"
        "#;
        let reason = config_reason(TomlRoutingPolicy::from_toml_str(toml));
        assert!(reason.contains("chains back"), "unexpected reason: {reason}");
    }

    // ── 6. parse errors ───────────────────────────────────────────────────────

    #[test]
    fn test_toml_parse_error() {
        let reason = config_reason(TomlRoutingPolicy::from_toml_str("this is not valid toml ][[["));
        assert!(reason.contains("failed to parse routing TOML"), "unexpected reason: {reason}");
    }

    #[test]
    fn test_unknown_role_name_is_parse_error() {
        let toml = r#"
            [[routes]]
            role = "janitor"
            owner = true
        "#;
        let reason = config_reason(TomlRoutingPolicy::from_toml_str(toml));
        assert!(reason.contains("failed to parse routing TOML"), "unexpected reason: {reason}");
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let path = std::path::Path::new("/definitely/not/here/routing.toml");
        let reason = config_reason(TomlRoutingPolicy::from_file(path));
        assert!(reason.contains("failed to read routing file"), "unexpected reason: {reason}");
    }
}
