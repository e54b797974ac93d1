//! Top-level flow reconciliation and removal of undeclared flows

use super::Reconciler;
use super::error::EngineResult;
use super::projection::flow_header;
use crate::schema::FlowDefinition;
use declarative::{ChangeKind, ManagedResource, ObservedMap, RemovalDecision, classify, compare};
use realmkit::{Backend, FlowDraft};

impl<B: Backend + ?Sized> Reconciler<'_, B> {
    /// Converge one declared flow.
    ///
    /// Missing flows are created and stamped as managed. Existing flows are
    /// only touched if managed; built-in and foreign flows are skipped with
    /// a warning. Returns whether anything was written.
    pub fn reconcile_flow(&mut self, definition: &FlowDefinition) -> EngineResult<bool> {
        let flows = self.backend.list_top_level_flows(self.realm)?;
        let observed = ObservedMap::new(self.realm, &flows);

        let Some(current) = observed.get(definition) else {
            log::info!("Creating flow '{}' in realm '{}'", definition.alias, self.realm);
            let id = self.backend.create_flow(self.realm, &draft(definition))?;
            self.record(ChangeKind::Created);
            let flow = self.backend.get_flow(self.realm, &id)?;
            self.reconcile_steps(&flow, &definition.steps)?;
            return Ok(true);
        };

        if !current.is_managed() {
            log::warn!(
                "Flow '{}' in realm '{}' is {}, not managed by realmsync; skipping",
                current.alias,
                self.realm,
                if current.built_in { "built-in" } else { "pre-existing" }
            );
            self.record(ChangeKind::Skipped);
            return Ok(false);
        }

        let changes = compare(
            &flow_header(&current.alias, &current.description, &current.provider_id),
            &flow_header(&definition.alias, &definition.description, &definition.provider_id),
        );
        let mut changed = false;
        if !changes.is_empty() {
            for change in &changes {
                log::info!("Flow '{}': {change}", definition.alias);
            }
            self.backend
                .update_flow(self.realm, &current.id, &draft(definition))?;
            self.record(ChangeKind::Updated);
            changed = true;
        }

        let flow = self.backend.get_flow(self.realm, &current.id)?;
        if self.reconcile_steps(&flow, &definition.steps)? {
            changed = true;
        }
        if !changed {
            log::debug!("Flow '{}' unchanged", definition.alias);
            self.record(ChangeKind::Unchanged);
        }
        Ok(changed)
    }

    /// Apply the removal policy to top-level flows not in `declared`.
    pub fn remove_undeclared_flows(&mut self, declared: &[FlowDefinition]) -> EngineResult<()> {
        let flows = self.backend.list_top_level_flows(self.realm)?;
        let observed = ObservedMap::new(self.realm, &flows);
        let plan = classify(declared, &observed);

        for stale in plan.removals {
            match self.policy.decide(stale) {
                RemovalDecision::Unmanaged => {
                    log::debug!("Flow '{}' is not managed, leaving it alone", stale.alias);
                }
                RemovalDecision::Delete => {
                    log::info!("Deleting undeclared flow '{}'", stale.alias);
                    self.backend.delete_flow(self.realm, &stale.id)?;
                    self.record(ChangeKind::Deleted);
                }
                RemovalDecision::Disable => {
                    log::warn!(
                        "Flow '{}' is no longer declared and flows cannot be disabled; \
                         retaining it. Pass --delete-removed to delete it",
                        stale.alias
                    );
                    self.record(ChangeKind::Skipped);
                }
                decision @ (RemovalDecision::AlreadyDisabled | RemovalDecision::Retain) => {
                    log::info!(
                        "Flow '{}' is no longer declared; retaining it ({}). \
                         Pass --delete-removed to delete it",
                        stale.alias,
                        decision.label()
                    );
                    self.record(ChangeKind::Skipped);
                }
            }
        }
        Ok(())
    }
}

/// Writable fields of a declared top-level flow; always stamped managed
fn draft(definition: &FlowDefinition) -> FlowDraft {
    FlowDraft {
        alias: definition.alias.clone(),
        description: definition.description.clone(),
        provider_id: definition.provider_id.clone(),
        top_level: true,
        managed: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AuthenticatorStep, StepDefinition, assign_positions};
    use declarative::RemovalPolicy;
    use realmkit::{BASIC_FLOW, Call, MemoryBackend, Requirement};

    const REALM: &str = "acme";

    fn flow(alias: &str, providers: &[&str]) -> FlowDefinition {
        let mut steps: Vec<StepDefinition> = providers
            .iter()
            .map(|p| {
                StepDefinition::Authenticator(AuthenticatorStep {
                    provider_id: (*p).into(),
                    requirement: Requirement::Required,
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

    #[test]
    fn test_missing_flow_is_created_managed() {
        let backend = MemoryBackend::with_realm(REALM);
        let mut reconciler = Reconciler::new(&backend, REALM, RemovalPolicy::default());

        assert!(reconciler.reconcile_flow(&flow("login", &["auth-cookie"])).unwrap());
        let created = backend.flow_by_alias(REALM, "login").unwrap();
        assert!(created.managed);
        assert!(created.top_level);
        assert_eq!(backend.tree(REALM, "login"), vec!["auth-cookie [REQUIRED]"]);
        assert_eq!(reconciler.summary().created, 2);
    }

    #[test]
    fn test_built_in_and_foreign_flows_are_skipped() {
        let backend = MemoryBackend::with_realm(REALM);
        let browser = backend.seed_flow(REALM, "browser", false, true).unwrap();
        backend
            .seed_leaf(REALM, &browser, "auth-cookie", Requirement::Alternative)
            .unwrap();
        backend.seed_flow(REALM, "hand-made", false, false).unwrap();

        let mut reconciler = Reconciler::new(&backend, REALM, RemovalPolicy::new(true));
        assert!(!reconciler.reconcile_flow(&flow("Browser", &["other"])).unwrap());
        assert!(!reconciler.reconcile_flow(&flow("hand-made", &["x"])).unwrap());
        reconciler.remove_undeclared_flows(&[]).unwrap();

        assert!(backend.calls().is_empty());
        assert_eq!(reconciler.summary().skipped, 2);
        assert_eq!(backend.tree(REALM, "browser"), vec!["auth-cookie [ALTERNATIVE]"]);
    }

    #[test]
    fn test_description_drift_updates_record() {
        let backend = MemoryBackend::with_realm(REALM);
        backend.seed_flow(REALM, "login", true, false).unwrap();
        let mut definition = flow("login", &[]);
        definition.description = "Cookie first".into();

        let mut reconciler = Reconciler::new(&backend, REALM, RemovalPolicy::default());
        assert!(reconciler.reconcile_flow(&definition).unwrap());
        assert_eq!(
            backend.flow_by_alias(REALM, "login").unwrap().description,
            "Cookie first"
        );
        assert!(matches!(backend.calls().as_slice(), [Call::UpdateFlow { .. }]));
    }

    #[test]
    fn test_unchanged_flow_makes_no_writes() {
        let backend = MemoryBackend::with_realm(REALM);
        let definition = flow("login", &["auth-cookie", "auth-otp-form"]);
        let mut reconciler = Reconciler::new(&backend, REALM, RemovalPolicy::default());
        reconciler.reconcile_flow(&definition).unwrap();
        backend.clear_calls();

        let mut again = Reconciler::new(&backend, REALM, RemovalPolicy::default());
        assert!(!again.reconcile_flow(&definition).unwrap());
        assert!(backend.calls().is_empty());
        assert_eq!(again.summary().unchanged, 3);
    }

    #[test]
    fn test_undeclared_managed_flow_retained_without_flag() {
        let backend = MemoryBackend::with_realm(REALM);
        backend.seed_flow(REALM, "old-login", true, false).unwrap();

        let mut reconciler = Reconciler::new(&backend, REALM, RemovalPolicy::default());
        reconciler.remove_undeclared_flows(&[]).unwrap();
        assert!(backend.flow_by_alias(REALM, "old-login").is_some());
        assert!(backend.calls().is_empty());
        assert_eq!(reconciler.summary().skipped, 1);
    }

    #[test]
    fn test_undeclared_flow_is_retained_never_disabled() {
        let backend = MemoryBackend::with_realm(REALM);
        let id = backend.seed_flow(REALM, "old-login", true, false).unwrap();
        let flow = backend.get_flow(REALM, &id).unwrap();

        assert_eq!(flow.is_disabled(), None);
        assert_eq!(
            RemovalPolicy::default().decide(&flow),
            RemovalDecision::Retain
        );
    }

    #[test]
    fn test_undeclared_managed_flow_deleted_with_flag() {
        let backend = MemoryBackend::with_realm(REALM);
        backend.seed_flow(REALM, "old-login", true, false).unwrap();
        backend.seed_flow(REALM, "kept", true, false).unwrap();
        backend.seed_flow(REALM, "foreign", false, false).unwrap();

        let mut reconciler = Reconciler::new(&backend, REALM, RemovalPolicy::new(true));
        reconciler
            .remove_undeclared_flows(&[flow("kept", &[])])
            .unwrap();

        assert!(backend.flow_by_alias(REALM, "old-login").is_none());
        assert!(backend.flow_by_alias(REALM, "kept").is_some());
        assert!(backend.flow_by_alias(REALM, "foreign").is_some());
        assert_eq!(reconciler.summary().deleted, 1);
    }
}
