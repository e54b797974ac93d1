//! Batch driver: validate everything, then reconcile realm by realm

use super::Reconciler;
use super::error::EngineResult;
use super::projection::project_flow;
use super::validator::{ValidationIssue, ValidationReport, validate};
use crate::schema::{FlowDefinition, RealmDefinition};
use declarative::{
    ManagedResource, ObservedMap, ReconcileSummary, RemovalDecision, RemovalPolicy, classify,
    compare,
};
use realmkit::{Backend, Result};

/// Reconciliation result for one realm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealmSummary {
    pub realm: String,
    pub summary: ReconcileSummary,
}

/// Result of a completed batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub realms: Vec<RealmSummary>,
    /// Validation warnings that did not block the run
    pub warnings: Vec<ValidationIssue>,
}

impl BatchSummary {
    pub fn total(&self) -> ReconcileSummary {
        let mut total = ReconcileSummary::default();
        for realm in &self.realms {
            total.merge(&realm.summary);
        }
        total
    }
}

/// How a batch ended.
#[derive(Debug)]
pub enum BatchOutcome {
    /// Every realm was reconciled
    Completed(BatchSummary),
    /// Validation failed; nothing was written
    Aborted(ValidationReport),
}

/// Validate the whole batch, then reconcile every realm in order.
///
/// A remote or invariant failure halts the run where it happened; writes
/// already made stay in place.
pub fn run_batch<B: Backend + ?Sized>(
    backend: &B,
    realms: &[RealmDefinition],
    policy: RemovalPolicy,
) -> EngineResult<BatchOutcome> {
    let report = validate(backend, realms)?;
    if !report.is_ok() {
        log::error!(
            "Validation failed with {} error(s); no changes made",
            report.errors.len()
        );
        return Ok(BatchOutcome::Aborted(report));
    }

    let mut summary = BatchSummary {
        realms: Vec::with_capacity(realms.len()),
        warnings: report.warnings,
    };
    for definition in realms {
        summary
            .realms
            .push(reconcile_realm(backend, definition, policy)?);
    }
    Ok(BatchOutcome::Completed(summary))
}

/// Reconcile one realm: declared flows in order, then removals.
pub fn reconcile_realm<B: Backend + ?Sized>(
    backend: &B,
    definition: &RealmDefinition,
    policy: RemovalPolicy,
) -> EngineResult<RealmSummary> {
    log::info!(
        "Reconciling realm '{}' ({} flows)",
        definition.realm,
        definition.flows.len()
    );
    let mut reconciler = Reconciler::new(backend, &definition.realm, policy);
    for flow in &definition.flows {
        reconciler.reconcile_flow(flow)?;
    }
    reconciler.remove_undeclared_flows(&definition.flows)?;
    log::info!(
        "Realm '{}' reconciled with {} change(s)",
        definition.realm,
        reconciler.summary().total_changes()
    );

    Ok(RealmSummary {
        realm: definition.realm.clone(),
        summary: reconciler.into_summary(),
    })
}

// ============================================================================
// Plan (read-only)
// ============================================================================

/// What `apply` would do to one top-level flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedAction {
    Create,
    /// Human-readable change lines
    Update(Vec<String>),
    Unchanged,
    /// Declared, but exists and is not managed
    SkipUnmanaged,
    /// Not declared; what the removal policy decides
    Remove(RemovalDecision),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedFlow {
    pub alias: String,
    pub action: PlannedAction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealmPlan {
    pub realm: String,
    pub flows: Vec<PlannedFlow>,
}

impl RealmPlan {
    pub fn has_changes(&self) -> bool {
        self.flows.iter().any(|f| match &f.action {
            PlannedAction::Create | PlannedAction::Update(_) => true,
            PlannedAction::Remove(decision) => decision.is_mutation(),
            PlannedAction::Unchanged | PlannedAction::SkipUnmanaged => false,
        })
    }
}

/// Compare declared flows with live ones without writing anything.
pub fn plan_realm<B: Backend + ?Sized>(
    backend: &B,
    definition: &RealmDefinition,
    policy: RemovalPolicy,
) -> Result<RealmPlan> {
    let realm = definition.realm.as_str();
    let live = backend.list_top_level_flows(realm)?;
    let observed = ObservedMap::new(realm, &live);
    let classification = classify(&definition.flows, &observed);

    let mut flows = Vec::new();
    for declared in &definition.flows {
        let action = match observed.get(declared) {
            None => PlannedAction::Create,
            Some(current) if !current.is_managed() => PlannedAction::SkipUnmanaged,
            Some(current) => {
                let projected = project_flow(backend, realm, current)?;
                plan_update(&projected, declared)
            }
        };
        flows.push(PlannedFlow {
            alias: declared.alias.clone(),
            action,
        });
    }
    for stale in classification.removals {
        flows.push(PlannedFlow {
            alias: stale.alias.clone(),
            action: PlannedAction::Remove(policy.decide(stale)),
        });
    }

    Ok(RealmPlan {
        realm: realm.to_string(),
        flows,
    })
}

fn plan_update(current: &FlowDefinition, declared: &FlowDefinition) -> PlannedAction {
    let changes = compare(current, declared);
    if changes.is_empty() {
        PlannedAction::Unchanged
    } else {
        PlannedAction::Update(changes.iter().map(ToString::to_string).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AuthenticatorStep, StepDefinition, SubFlowStep, assign_positions};
    use realmkit::{BASIC_FLOW, MemoryBackend, RealmFlowBindings, Requirement};

    const REALM: &str = "acme";

    fn flow(alias: &str, providers: &[&str]) -> FlowDefinition {
        let mut steps: Vec<StepDefinition> = providers
            .iter()
            .map(|p| {
                StepDefinition::Authenticator(AuthenticatorStep {
                    provider_id: (*p).into(),
                    requirement: Requirement::Alternative,
                    config: None,
                    position: 0,
                })
            })
            .collect();
        assign_positions(&mut steps);
        FlowDefinition {
            alias: alias.into(),
            description: String::new(),
            provider_id: BASIC_FLOW.into(),
            steps,
        }
    }

    fn realm(flows: Vec<FlowDefinition>) -> RealmDefinition {
        RealmDefinition {
            realm: REALM.into(),
            flows,
            ..Default::default()
        }
    }

    #[test]
    fn test_validation_failure_writes_nothing() {
        let backend = MemoryBackend::with_realm(REALM);
        backend.seed_flow(REALM, "custom-browser", true, false).unwrap();
        backend
            .set_realm_bindings(
                REALM,
                RealmFlowBindings {
                    browser_flow: Some("custom-browser".into()),
                    ..Default::default()
                },
            )
            .unwrap();

        let batch = [realm(vec![flow("login", &["auth-cookie"])])];
        let outcome = run_batch(&backend, &batch, RemovalPolicy::new(true)).unwrap();

        assert!(matches!(outcome, BatchOutcome::Aborted(ref r) if r.errors.len() == 1));
        assert!(backend.calls().is_empty());
        assert!(backend.flow_by_alias(REALM, "custom-browser").is_some());
    }

    #[test]
    fn test_shared_sub_flow_alias_aborts_before_any_write() {
        let backend = MemoryBackend::with_realm(REALM);
        let forms = || {
            StepDefinition::SubFlow(SubFlowStep {
                alias: "forms".into(),
                description: String::new(),
                provider_id: BASIC_FLOW.into(),
                requirement: Requirement::Required,
                steps: vec![],
                position: 0,
            })
        };
        let mut login = flow("login", &[]);
        login.steps.push(forms());
        let mut register = flow("register", &[]);
        register.steps.push(forms());

        let outcome = run_batch(&backend, &[realm(vec![login, register])], RemovalPolicy::default())
            .unwrap();
        assert!(matches!(outcome, BatchOutcome::Aborted(ref r) if r.errors.len() == 1));
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn test_completed_batch_is_idempotent() {
        let backend = MemoryBackend::with_realm(REALM);
        let batch = [realm(vec![
            flow("login", &["auth-cookie", "auth-otp-form"]),
            flow("api", &["client-secret"]),
        ])];

        let first = run_batch(&backend, &batch, RemovalPolicy::default()).unwrap();
        let BatchOutcome::Completed(summary) = first else {
            panic!("expected completed batch");
        };
        assert!(summary.total().has_changes());

        backend.clear_calls();
        let second = run_batch(&backend, &batch, RemovalPolicy::default()).unwrap();
        let BatchOutcome::Completed(summary) = second else {
            panic!("expected completed batch");
        };
        assert!(!summary.total().has_changes());
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn test_realm_removes_undeclared_managed_flows_with_flag() {
        let backend = MemoryBackend::with_realm(REALM);
        backend.seed_flow(REALM, "legacy", true, false).unwrap();

        let outcome = run_batch(&backend, &[realm(vec![])], RemovalPolicy::new(true)).unwrap();
        let BatchOutcome::Completed(summary) = outcome else {
            panic!("expected completed batch");
        };
        assert_eq!(summary.total().deleted, 1);
        assert!(backend.flow_by_alias(REALM, "legacy").is_none());
    }

    #[test]
    fn test_plan_is_read_only() {
        let backend = MemoryBackend::with_realm(REALM);
        let login = backend.seed_flow(REALM, "login", true, false).unwrap();
        backend
            .seed_leaf(REALM, &login, "auth-cookie", Requirement::Required)
            .unwrap();
        backend.seed_flow(REALM, "legacy", true, false).unwrap();
        backend.seed_flow(REALM, "browser", false, true).unwrap();

        let definition = realm(vec![
            flow("login", &["auth-cookie"]),
            flow("new-flow", &[]),
            flow("browser", &[]),
        ]);
        let plan = plan_realm(&backend, &definition, RemovalPolicy::default()).unwrap();
        assert!(backend.calls().is_empty());
        assert!(plan.has_changes());

        let action = |alias: &str| {
            plan.flows
                .iter()
                .find(|f| f.alias == alias)
                .map(|f| f.action.clone())
                .unwrap()
        };
        let PlannedAction::Update(lines) = action("login") else {
            panic!("expected update");
        };
        assert_eq!(
            lines,
            vec![r#"steps[0].requirement changed from "REQUIRED" to "ALTERNATIVE""#]
        );
        assert_eq!(action("new-flow"), PlannedAction::Create);
        assert_eq!(action("browser"), PlannedAction::SkipUnmanaged);
        assert_eq!(
            action("legacy"),
            PlannedAction::Remove(RemovalDecision::Retain)
        );
    }
}
