//! # carechain-ref-hospital
//!
//! Reference hospital for the carechain clinical workflow.
//!
//! Provides the pieces a real deployment would swap out:
//!
//! - **Routing and facility configuration** embedded from
//!   `policies/routing.toml` and `config/hospital.toml`
//! - **`SimulatedComputation`**, a deterministic stand-in for the compute enclave
//! - **Advisors**: `FallbackAdvisor` (fixed per-role answers),
//!   `CohereAdvisor` (HTTP text generation with fallback), and
//!   `LatencyAdvisor` (adds a fixed delay)
//!
//! and four scenarios built on them:
//!
//! 1. **Full Care Chain**: every agent contributes, total 610.
//! 2. **Triage**: amend before lock, then straight to billing.
//! 3. **Out-of-Route Requests**: illegal actions leave no trace.
//! 4. **Double Compute**: a second compute during the first is ignored.
//!
//! All patient data is fictional.

pub mod advisory;
pub mod compute;
pub mod config;
pub mod mock_data;
pub mod scenarios;

use carechain_contracts::error::{CarechainError, CarechainResult};
use carechain_core::traits::AdvisoryProvider;

use scenarios::ScenarioReport;

/// Names accepted by [`run_named`], in presentation order.
pub const SCENARIOS: [&str; 4] = [
    scenarios::full_chain::NAME,
    scenarios::triage::NAME,
    scenarios::bypass::NAME,
    scenarios::double_compute::NAME,
];

/// Run one scenario by name.
pub async fn run_named(
    name: &str,
    advisor: Box<dyn AdvisoryProvider>,
) -> CarechainResult<ScenarioReport> {
    match name {
        scenarios::full_chain::NAME => scenarios::full_chain::run_scenario(advisor).await,
        scenarios::triage::NAME => scenarios::triage::run_scenario(advisor).await,
        scenarios::bypass::NAME => scenarios::bypass::run_scenario(advisor).await,
        scenarios::double_compute::NAME => scenarios::double_compute::run_scenario(advisor).await,
        other => Err(CarechainError::ConfigError {
            reason: format!("unknown scenario '{}'", other),
        }),
    }
}
