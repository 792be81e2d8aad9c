//! The carechain transition engine: the single mutator of the slot registry.
//!
//! Every request runs the same pipeline:
//!
//!   Route lookup → Preconditions → Claim → [Advisory] → [Computation] → Commit → [Chain]
//!
//! Any failed precondition makes the request a no-op: no slot changes, no
//! audit entry, and `Outcome::Ignored` carrying the reason. The engine never
//! branches on a particular role. What a role may do comes from the
//! `RoutingTable`; the data owner is whichever route is marked `owner`.
//!
//! A commit replaces the affected slots and appends its audit entries while
//! holding the registry lock, so readers never observe a half-applied step.
//! Lock order is always registry, then audit sink.

use tracing::{debug, info, warn};

use carechain_contracts::{
    action::{Action, Outcome, Rejection},
    audit::{AuditDraft, AuditEntry, Metrics},
    error::CarechainResult,
    provider::{Advice, AdvisoryRequest, Computation},
    record::{ConfidentialityState, Payload, Record},
    role::AgentRole,
    routing::{ChainRoute, ComputeRoute, RoleRoute, RoutingTable},
};

use crate::{
    registry::{Claim, Slot, SlotRegistry, SlotTable},
    traits::{AdvisoryProvider, AuditSink, ComputationProvider},
};

/// Audit entries a committed request appended, or why it was ignored.
type Transition = Result<Vec<AuditEntry>, Rejection>;

/// Validates and executes agent requests against the slot registry.
///
/// Construct one engine per workflow run. The engine owns the registry and
/// the three collaborators; callers observe effects through `slots()` and
/// `audit_entries()`.
pub struct TransitionEngine {
    routes: RoutingTable,
    computation: Box<dyn ComputationProvider>,
    advisor: Box<dyn AdvisoryProvider>,
    audit: Box<dyn AuditSink>,
    registry: SlotRegistry,
}

impl TransitionEngine {
    /// Create an engine with empty slots.
    ///
    /// Returns `CarechainError::ConfigError` if `routes` breaks a table rule
    /// (see `RoutingTable::validate`).
    pub fn new(
        routes: RoutingTable,
        computation: Box<dyn ComputationProvider>,
        advisor: Box<dyn AdvisoryProvider>,
        audit: Box<dyn AuditSink>,
    ) -> CarechainResult<Self> {
        routes.validate()?;
        Ok(Self {
            routes,
            computation,
            advisor,
            audit,
            registry: SlotRegistry::new(),
        })
    }

    pub fn routes(&self) -> &RoutingTable {
        &self.routes
    }

    /// Read-only access to the registry.
    pub fn registry(&self) -> &SlotRegistry {
        &self.registry
    }

    pub fn slot(&self, role: AgentRole) -> Slot {
        self.registry.get(role)
    }

    /// All six slots, in role order.
    pub fn slots(&self) -> Vec<(AgentRole, Slot)> {
        self.registry.snapshot()
    }

    /// The full audit log, in append order.
    pub fn audit_entries(&self) -> Vec<AuditEntry> {
        self.audit.entries()
    }

    /// True when the audit log's integrity tags still check out.
    pub fn verify_audit(&self) -> bool {
        self.audit.verify()
    }

    /// Clear every slot and the audit log back to the initial empty state.
    ///
    /// Transitions that were in flight when the reset happened are
    /// discarded when they try to commit.
    pub fn reset(&self) {
        let mut table = self.registry.table();
        table.reset();
        self.audit.clear();
        info!("workflow reset");
    }

    /// Submit one request.
    ///
    /// Effects are visible through `slots()` and `audit_entries()` once the
    /// returned future resolves. The `Outcome` is informational only.
    pub async fn submit(&self, role: AgentRole, action: Action) -> Outcome {
        let name = action.name();
        debug!(role = %role, action = name, "transition requested");

        match self.dispatch(role, action).await {
            Ok(entries) => {
                info!(
                    role = %role,
                    action = name,
                    entries = entries.len(),
                    "transition committed"
                );
                Outcome::Applied { entries }
            }
            Err(rejection) => {
                debug!(role = %role, action = name, reason = %rejection, "action ignored");
                Outcome::Ignored(rejection)
            }
        }
    }

    /// Submit a request from the loose string surface a UI or CLI speaks.
    ///
    /// Unparsable input is ignored like any other invalid request.
    pub async fn submit_raw(
        &self,
        role: &str,
        action: &str,
        payload: Option<Payload>,
        target: Option<&str>,
    ) -> Outcome {
        match parse_request(role, action, payload, target) {
            Ok((role, action)) => self.submit(role, action).await,
            Err(e) => {
                debug!(error = %e, "unrecognized request ignored");
                Outcome::Ignored(Rejection::Unrecognized { reason: e.to_string() })
            }
        }
    }

    // ── Dispatch ─────────────────────────────────────────────────────────────

    async fn dispatch(&self, role: AgentRole, action: Action) -> Transition {
        let name = action.name();
        let route = self
            .routes
            .route(role)
            .ok_or(Rejection::NotPermitted { role, action: name })?;
        route.permits(&action)?;

        match action {
            Action::Admit { payload } => self.admit(role, payload),
            Action::Amend { payload } => self.amend(role, payload),
            Action::Lock => self.lock(role),
            Action::Unlock => self.unlock(role),
            Action::Forward { target } => self.forward(route, target).await,
            Action::Compute => {
                let compute = route
                    .compute
                    .as_ref()
                    .ok_or(Rejection::NotPermitted { role, action: name })?;
                self.compute(route, compute).await
            }
        }
    }

    // ── Owner lifecycle ──────────────────────────────────────────────────────

    fn admit(&self, role: AgentRole, payload: Option<Payload>) -> Transition {
        let mut table = self.registry.table();
        table.ensure_idle(&[role])?;
        if !table.get(role).is_empty() {
            return Err(Rejection::SlotOccupied { role });
        }

        let record = Record::admit(payload.unwrap_or_default());
        let details = format!("Record {} admitted. Vitals recorded.", record.id);
        table.set(role, Some(record), "Admitted");

        Ok(vec![self.audit.append(AuditDraft::new(role, "ADMIT", details))])
    }

    fn amend(&self, role: AgentRole, payload: Payload) -> Transition {
        let mut table = self.registry.table();
        table.ensure_idle(&[role])?;
        let mut record = held(&table, role)?;
        if record.state != ConfidentialityState::Plaintext {
            return Err(Rejection::WrongState { state: record.state, action: "amend" });
        }
        if !record.payload.same_shape(&payload) {
            return Err(Rejection::PayloadShape);
        }

        record.payload = payload;
        record.note("amended");
        table.set(role, Some(record), "Amended");

        let draft = AuditDraft::new(role, "AMEND", "Plaintext payload amended by owner.");
        Ok(vec![self.audit.append(draft)])
    }

    fn lock(&self, role: AgentRole) -> Transition {
        let mut table = self.registry.table();
        table.ensure_idle(&[role])?;
        let record = held(&table, role)?;
        if record.state != ConfidentialityState::Plaintext {
            return Err(Rejection::WrongState { state: record.state, action: "lock" });
        }

        let computed = self.run_computation("lock", &record)?;
        let mut locked = merge_computation(&record, &computed.record);
        locked.advance(ConfidentialityState::Confidential);
        locked.note("locked");
        table.set(role, Some(locked), "Locked");

        Ok(vec![self.audit.append(draft_from(role, "LOCK", &computed, Metrics::new(), Vec::new()))])
    }

    fn unlock(&self, role: AgentRole) -> Transition {
        let mut table = self.registry.table();
        table.ensure_idle(&[role])?;
        let mut record = held(&table, role)?;
        if !record.state.is_sealed() {
            return Err(Rejection::WrongState { state: record.state, action: "unlock" });
        }

        record.advance(ConfidentialityState::Revealed);
        record.note("revealed");
        let details = format!(
            "Record unlocked by owner. Results: {}",
            serde_json::to_string(&record.payload).unwrap_or_default()
        );
        table.set(role, Some(record), "Complete");

        Ok(vec![self.audit.append(AuditDraft::new(role, "UNLOCK", details))])
    }

    // ── Forward ──────────────────────────────────────────────────────────────

    async fn forward(&self, route: &RoleRoute, target: AgentRole) -> Transition {
        let source = route.role;
        let (record, claim) = {
            let mut table = self.registry.table();
            table.ensure_idle(&[source, target])?;
            let record = held(&table, source)?;
            if !record.state.is_sealed() {
                return Err(Rejection::WrongState { state: record.state, action: "forward" });
            }
            if route.owner && record.is_settled() {
                return Err(Rejection::AlreadySettled);
            }
            if !table.get(target).is_empty() {
                return Err(Rejection::SlotOccupied { role: target });
            }
            if route.advise_on_forward && record.charges.contains(source.display_name()) {
                return Err(Rejection::AlreadyContributed {
                    agent: source.display_name().to_string(),
                });
            }

            let claim = table.claim(&[source, target])?;
            table.set_status(source, route.forwarding_status.clone());
            (record, claim)
        };

        let advice = if route.advise_on_forward {
            Some(self.consult(source, &record).await)
        } else {
            None
        };

        let mut table = self.registry.table();
        if !claim.is_current(&table) {
            return Err(Rejection::Superseded);
        }

        let mut moved = record;
        let mut metrics = Metrics::new();
        if let Some(advice) = &advice {
            apply_advice(source, &mut moved, advice, &mut metrics);
        }
        moved.note(format!("forwarded by {source} to {target}"));
        table.set(target, Some(moved), "Received");
        table.set(source, None, route.forwarded_status.clone());

        let draft = AuditDraft::new(
            source,
            &route.forward_action,
            format!("{source} forwarded the record to {target}. Data remains sealed."),
        )
        .with_metrics(metrics);
        Ok(vec![self.audit.append(draft)])
    }

    // ── Compute ──────────────────────────────────────────────────────────────

    /// Claims only the computing role's slot. The chain target, if any, is
    /// checked when the chained forward runs, as its own atomic step.
    async fn compute(&self, route: &RoleRoute, compute: &ComputeRoute) -> Transition {
        let role = route.role;
        let agent = role.display_name();
        let milestone = format!("{} by {agent}", compute.operation);

        let (record, prior_status, claim) = {
            let mut table = self.registry.table();
            table.ensure_idle(&[role])?;
            let record = held(&table, role)?;
            if !record.state.is_sealed() {
                return Err(Rejection::WrongState { state: record.state, action: "compute" });
            }
            if compute.advise && record.charges.contains(agent) {
                return Err(Rejection::AlreadyContributed { agent: agent.to_string() });
            }
            if compute.settle && record.is_settled() {
                return Err(Rejection::AlreadySettled);
            }
            if record.provenance.contains(&milestone) {
                return Err(Rejection::AlreadyPerformed { milestone });
            }

            let prior_status = table.get(role).status.clone();
            let claim = table.claim(&[role])?;
            table.set_status(role, compute.busy_status.clone());
            (record, prior_status, claim)
        };

        let advice = if compute.advise {
            Some(self.consult(role, &record).await)
        } else {
            None
        };

        let computed = match self.run_computation(&compute.operation, &record) {
            Ok(computed) => computed,
            Err(rejection) => {
                let mut table = self.registry.table();
                if claim.is_current(&table) {
                    table.set_status(role, prior_status);
                }
                return Err(rejection);
            }
        };

        let mut next = merge_computation(&record, &computed.record);
        let mut metrics = Metrics::new();
        let mut derivation = Vec::new();
        if let Some(advice) = &advice {
            apply_advice(role, &mut next, advice, &mut metrics);
        }
        next.advance(ConfidentialityState::Annotated);
        if compute.settle {
            let total = next.charges.total();
            for line in next.charges.iter() {
                derivation.push(format!("{} = {:.2}", line.agent, line.amount));
            }
            derivation.push(format!("total = {total:.2}"));
            next.total_charge = Some(total);
            metrics.insert("total_charge".to_string(), total.into());
        }
        next.note(milestone);

        let mut entries = Vec::new();
        {
            let mut table = self.registry.table();
            if !claim.is_current(&table) {
                return Err(Rejection::Superseded);
            }
            table.set(role, Some(next), compute.done_status.clone());
            entries.push(self.audit.append(draft_from(
                role,
                &compute.action,
                &computed,
                metrics,
                derivation,
            )));
        }

        if let Some(chain) = &compute.then {
            if let Some(entry) = self.chain_forward(route, chain, &claim) {
                entries.push(entry);
            }
        }

        Ok(entries)
    }

    /// The automatic forward that follows a committed compute step.
    ///
    /// Subject to the same rules as a requested forward: a busy or occupied
    /// target makes it a no-op and the record stays where it is.
    fn chain_forward(
        &self,
        route: &RoleRoute,
        chain: &ChainRoute,
        claim: &Claim<'_>,
    ) -> Option<AuditEntry> {
        let source = route.role;
        let mut table = self.registry.table();
        if !claim.is_current(&table) {
            return None;
        }
        if table.is_busy(chain.target) || !table.get(chain.target).is_empty() {
            debug!(
                role = %source,
                target = %chain.target,
                "chained forward skipped: target unavailable"
            );
            return None;
        }

        let mut record = table.get(source).record.clone()?;
        record.note(format!("forwarded by {source} to {}", chain.target));
        table.set(chain.target, Some(record), chain.target_status.clone());
        table.set(source, None, route.forwarded_status.clone());

        Some(self.audit.append(AuditDraft::new(source, &chain.action, &chain.details)))
    }

    // ── Collaborators ────────────────────────────────────────────────────────

    async fn consult(&self, role: AgentRole, record: &Record) -> Advice {
        let request = AdvisoryRequest {
            role,
            inputs: record.payload.clone(),
            prior_severity: record.severity,
        };
        self.advisor.advise(request).await
    }

    /// Run the computation provider, rejecting any result that changes the
    /// record's identity or payload shape.
    fn run_computation(&self, operation: &str, record: &Record) -> Result<Computation, Rejection> {
        let computed = self.computation.transform(operation, record).map_err(|e| {
            warn!(operation, error = %e, "computation provider failed");
            Rejection::Provider { reason: e.to_string() }
        })?;

        if computed.record.id != record.id || !computed.record.payload.same_shape(&record.payload) {
            warn!(operation, "computation provider changed record identity");
            return Err(Rejection::Provider {
                reason: format!("operation '{operation}' changed record identity or shape"),
            });
        }
        Ok(computed)
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn parse_request(
    role: &str,
    action: &str,
    payload: Option<Payload>,
    target: Option<&str>,
) -> CarechainResult<(AgentRole, Action)> {
    let role: AgentRole = role.parse()?;
    let target = target.map(str::parse::<AgentRole>).transpose()?;
    Ok((role, Action::from_parts(action, payload, target)?))
}

/// A copy of the record `role` holds, or `EmptySlot`.
fn held(table: &SlotTable<'_>, role: AgentRole) -> Result<Record, Rejection> {
    table
        .get(role)
        .record
        .clone()
        .ok_or(Rejection::EmptySlot { role })
}

/// Take the fields a computation may change; the engine keeps ownership of
/// state, provenance, and the charge ledger.
fn merge_computation(original: &Record, computed: &Record) -> Record {
    let mut next = original.clone();
    next.payload = computed.payload.clone();
    if computed.sealed.is_some() {
        next.sealed = computed.sealed.clone();
    }
    if computed.severity.is_some() {
        next.severity = computed.severity;
    }
    next
}

fn apply_advice(role: AgentRole, record: &mut Record, advice: &Advice, metrics: &mut Metrics) {
    record.charges.insert(role.display_name(), advice.amount);
    metrics.insert("charge".to_string(), advice.amount.into());
    if let Some(severity) = advice.annotation {
        record.severity = Some(severity);
        metrics.insert("severity".to_string(), severity.into());
    }
    for (name, value) in &advice.findings {
        metrics.insert(name.clone(), (*value).into());
    }
    metrics.insert("advisory".to_string(), advice.narrative.clone().into());
}

fn draft_from(
    role: AgentRole,
    action: &str,
    computed: &Computation,
    extra_metrics: Metrics,
    extra_steps: Vec<String>,
) -> AuditDraft {
    let mut metrics = computed.metrics.clone();
    metrics.extend(extra_metrics);
    let mut derivation = computed.derivation.clone();
    derivation.extend(extra_steps);

    AuditDraft::new(role, action, computed.description.clone())
        .with_metrics(metrics)
        .with_formula(computed.formula.clone())
        .with_derivation(derivation)
}
