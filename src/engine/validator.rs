//! Cross-reference validation of flow bindings
//!
//! Runs over the whole batch before any write. For every realm it gathers
//! the bindings that will be in effect after the run (declared ones, plus
//! live ones of holders the batch does not redefine) and checks that each
//! points at a flow that will still exist: a declared flow, a platform
//! default alias, or a live built-in flow.
//!
//! Validation is all-or-nothing: one error anywhere aborts the batch.

use crate::schema::{RealmDefinition, StepDefinition};
use declarative::{IdentityKey, Keyed};
use realmkit::{Backend, Flow, Result};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Aliases of the flows every realm ships with.
pub const BUILT_IN_FLOW_ALIASES: [&str; 8] = [
    "browser",
    "direct grant",
    "registration",
    "reset credentials",
    "clients",
    "first broker login",
    "docker auth",
    "http challenge",
];

/// Where a binding comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingSource {
    Declared,
    Live,
}

impl fmt::Display for BindingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Declared => f.write_str("declared"),
            Self::Live => f.write_str("live"),
        }
    }
}

/// What a binding points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingTarget {
    Alias(String),
    /// A live flow id that matches no existing flow
    Unresolved(String),
}

/// A reference to a flow from a realm, client or identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    /// e.g. `realm acme`, `client web-app`, `identity provider google`
    pub holder: String,
    pub slot: String,
    pub source: BindingSource,
    pub target: BindingTarget,
}

/// One validation finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub realm: String,
    pub subject: String,
    pub message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.realm, self.subject, self.message)
    }
}

/// Outcome of validating a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, realm: &str, subject: impl Into<String>, message: impl Into<String>) {
        let issue = ValidationIssue {
            realm: realm.to_string(),
            subject: subject.into(),
            message: message.into(),
        };
        log::error!("Validation: {issue}");
        self.errors.push(issue);
    }

    fn warning(&mut self, realm: &str, subject: impl Into<String>, message: impl Into<String>) {
        let issue = ValidationIssue {
            realm: realm.to_string(),
            subject: subject.into(),
            message: message.into(),
        };
        log::warn!("Validation: {issue}");
        self.warnings.push(issue);
    }
}

/// Validate every realm of the batch. Reads remote state, never writes.
pub fn validate<B: Backend + ?Sized>(
    backend: &B,
    realms: &[RealmDefinition],
) -> Result<ValidationReport> {
    let mut report = ValidationReport::default();
    for definition in realms {
        validate_realm(backend, definition, &mut report)?;
    }
    Ok(report)
}

fn validate_realm<B: Backend + ?Sized>(
    backend: &B,
    definition: &RealmDefinition,
    report: &mut ValidationReport,
) -> Result<()> {
    let realm = definition.realm.as_str();
    log::debug!("Validating bindings of realm '{realm}'");

    let nested = check_declarations(definition, report);

    let live_flows = backend.list_top_level_flows(realm)?;
    let bindings = collect_bindings(backend, definition, &live_flows)?;

    let surviving: HashSet<IdentityKey> = definition
        .flows
        .iter()
        .map(|f| f.identity_key(realm))
        .chain(
            BUILT_IN_FLOW_ALIASES
                .iter()
                .map(|alias| IdentityKey::new(realm, alias)),
        )
        .collect();
    let live_by_key: HashMap<IdentityKey, &Flow> = live_flows
        .iter()
        .map(|f| (f.identity_key(realm), f))
        .collect();

    let declared: HashSet<IdentityKey> =
        definition.flows.iter().map(|f| f.identity_key(realm)).collect();
    for (parent, alias) in &nested {
        let key = IdentityKey::new(realm, alias);
        if live_by_key.contains_key(&key) && !declared.contains(&key) {
            report.error(
                realm,
                format!("flow {parent}"),
                format!("sub-flow alias '{alias}' is taken by an existing top-level flow"),
            );
        }
    }

    for binding in &bindings {
        let subject = format!("{} {}", binding.holder, binding.slot);
        match &binding.target {
            BindingTarget::Unresolved(id) => report.warning(
                realm,
                subject,
                format!("{} binding points at unknown flow id {id}", binding.source),
            ),
            BindingTarget::Alias(alias) => {
                let key = IdentityKey::new(realm, alias);
                if surviving.contains(&key) {
                    continue;
                }
                match live_by_key.get(&key) {
                    Some(flow) if flow.built_in => {}
                    Some(_) => report.error(
                        realm,
                        subject,
                        format!(
                            "{} binding points at flow '{alias}', which is not declared",
                            binding.source
                        ),
                    ),
                    None => report.error(
                        realm,
                        subject,
                        format!(
                            "{} binding points at flow '{alias}', which does not exist",
                            binding.source
                        ),
                    ),
                }
            }
        }
    }
    Ok(())
}

/// Declaration-only checks: flow aliases are unique realm-wide (top-level
/// and nested alike), step keys are unique among siblings.
///
/// Returns every declared sub-flow as `(parent alias, sub-flow alias)`.
fn check_declarations(
    definition: &RealmDefinition,
    report: &mut ValidationReport,
) -> Vec<(String, String)> {
    let realm = definition.realm.as_str();
    let mut aliases = HashSet::new();
    let mut nested = Vec::new();
    for flow in &definition.flows {
        if !aliases.insert(flow.identity_key(realm)) {
            report.error(
                realm,
                format!("flow {}", flow.alias),
                "alias is already used by another flow in the realm",
            );
        }
        check_siblings(realm, &flow.alias, &flow.steps, &mut aliases, &mut nested, report);
    }
    nested
}

fn check_siblings(
    realm: &str,
    parent: &str,
    steps: &[StepDefinition],
    aliases: &mut HashSet<IdentityKey>,
    nested: &mut Vec<(String, String)>,
    report: &mut ValidationReport,
) {
    let mut seen = HashSet::new();
    for step in steps {
        if !seen.insert(step.identity_key(parent)) {
            report.error(
                realm,
                format!("flow {parent}"),
                format!("step '{}' appears more than once among siblings", step.natural_name()),
            );
        }
        if let StepDefinition::SubFlow(sub) = step {
            nested.push((parent.to_string(), sub.alias.clone()));
            if !aliases.insert(IdentityKey::new(realm, &sub.alias)) {
                report.error(
                    realm,
                    format!("flow {parent}"),
                    format!(
                        "sub-flow alias '{}' is already used by another flow in the realm",
                        sub.alias
                    ),
                );
            }
            check_siblings(realm, &sub.alias, &sub.steps, aliases, nested, report);
        }
    }
}

/// Bindings in effect after the run.
///
/// A declared realm slot replaces the live one; a declared client or
/// identity provider replaces all of its live bindings.
pub fn collect_bindings<B: Backend + ?Sized>(
    backend: &B,
    definition: &RealmDefinition,
    live_flows: &[Flow],
) -> Result<Vec<Binding>> {
    let realm = definition.realm.as_str();
    let mut bindings = Vec::new();

    let live_realm = backend.get_realm(realm)?;
    let declared_slots = definition.bindings.slots();
    for ((slot, declared), (_, live)) in declared_slots.iter().zip(live_realm.bindings.slots()) {
        let (source, value) = match declared {
            Some(alias) => (BindingSource::Declared, Some(*alias)),
            None => (BindingSource::Live, live),
        };
        push_alias(&mut bindings, format!("realm {realm}"), slot, source, value);
    }

    for provider in &definition.identity_providers {
        let holder = format!("identity provider {}", provider.alias);
        push_alias(
            &mut bindings,
            holder.clone(),
            "firstBrokerLoginFlow",
            BindingSource::Declared,
            provider.first_broker_login_flow.as_deref(),
        );
        push_alias(
            &mut bindings,
            holder,
            "postBrokerLoginFlow",
            BindingSource::Declared,
            provider.post_broker_login_flow.as_deref(),
        );
    }
    let declared_providers: HashSet<IdentityKey> = definition
        .identity_providers
        .iter()
        .map(|p| p.identity_key(realm))
        .collect();
    for provider in backend.list_identity_providers(realm)? {
        if declared_providers.contains(&IdentityKey::new(realm, &provider.alias)) {
            continue;
        }
        let holder = format!("identity provider {}", provider.alias);
        push_alias(
            &mut bindings,
            holder.clone(),
            "firstBrokerLoginFlow",
            BindingSource::Live,
            provider.first_broker_login_flow.as_deref(),
        );
        push_alias(
            &mut bindings,
            holder,
            "postBrokerLoginFlow",
            BindingSource::Live,
            provider.post_broker_login_flow.as_deref(),
        );
    }

    for client in &definition.clients {
        for (slot, alias) in &client.flow_overrides {
            push_alias(
                &mut bindings,
                format!("client {}", client.client_id),
                slot,
                BindingSource::Declared,
                Some(alias.as_str()),
            );
        }
    }
    let declared_clients: HashSet<IdentityKey> = definition
        .clients
        .iter()
        .map(|c| c.identity_key(realm))
        .collect();
    let alias_by_id: HashMap<&str, &str> = live_flows
        .iter()
        .map(|f| (f.id.as_str(), f.alias.as_str()))
        .collect();
    for client in backend.list_clients(realm)? {
        if declared_clients.contains(&IdentityKey::new(realm, &client.client_id)) {
            continue;
        }
        for (slot, flow_id) in &client.flow_overrides {
            if flow_id.is_empty() {
                continue;
            }
            let target = match alias_by_id.get(flow_id.as_str()) {
                Some(alias) => BindingTarget::Alias((*alias).to_string()),
                None => BindingTarget::Unresolved(flow_id.clone()),
            };
            bindings.push(Binding {
                holder: format!("client {}", client.client_id),
                slot: slot.clone(),
                source: BindingSource::Live,
                target,
            });
        }
    }

    Ok(bindings)
}

fn push_alias(
    bindings: &mut Vec<Binding>,
    holder: String,
    slot: &str,
    source: BindingSource,
    alias: Option<&str>,
) {
    let Some(alias) = alias.filter(|a| !a.trim().is_empty()) else {
        return;
    };
    bindings.push(Binding {
        holder,
        slot: slot.to_string(),
        source,
        target: BindingTarget::Alias(alias.to_string()),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{
        AuthenticatorStep, ClientDefinition, FlowDefinition, IdentityProviderDefinition,
        SubFlowStep,
    };
    use realmkit::{
        BASIC_FLOW, Client, IdentityProvider, MemoryBackend, RealmFlowBindings, Requirement,
    };
    use std::collections::BTreeMap;

    const REALM: &str = "acme";

    fn flow(alias: &str) -> FlowDefinition {
        FlowDefinition {
            alias: alias.into(),
            description: String::new(),
            provider_id: BASIC_FLOW.into(),
            steps: vec![],
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
    fn test_binding_to_removed_flow_fails() {
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

        let report = validate(&backend, &[realm(vec![])]).unwrap();
        assert!(!report.is_ok());
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].message.contains("custom-browser"));
        assert!(report.errors[0].subject.contains("browserFlow"));
    }

    #[test]
    fn test_declared_flow_satisfies_binding() {
        let backend = MemoryBackend::with_realm(REALM);
        backend.seed_flow(REALM, "custom-browser", true, false).unwrap();
        backend
            .set_realm_bindings(
                REALM,
                RealmFlowBindings {
                    browser_flow: Some("Custom-Browser".into()),
                    ..Default::default()
                },
            )
            .unwrap();

        let report = validate(&backend, &[realm(vec![flow("custom-browser")])]).unwrap();
        assert!(report.is_ok());
    }

    #[test]
    fn test_built_in_aliases_always_survive() {
        let backend = MemoryBackend::with_realm(REALM);
        let mut definition = realm(vec![]);
        definition.bindings.browser_flow = Some("browser".into());
        definition.bindings.direct_grant_flow = Some("direct grant".into());

        assert!(validate(&backend, &[definition]).unwrap().is_ok());
    }

    #[test]
    fn test_declared_slot_replaces_live_slot() {
        let backend = MemoryBackend::with_realm(REALM);
        backend
            .set_realm_bindings(
                REALM,
                RealmFlowBindings {
                    browser_flow: Some("gone".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        let mut definition = realm(vec![flow("login")]);
        definition.bindings.browser_flow = Some("login".into());

        assert!(validate(&backend, &[definition]).unwrap().is_ok());
    }

    #[test]
    fn test_declared_identity_provider_binding_to_unknown_flow() {
        let backend = MemoryBackend::with_realm(REALM);
        let mut definition = realm(vec![]);
        definition.identity_providers.push(IdentityProviderDefinition {
            alias: "google".into(),
            first_broker_login_flow: Some("broker-onboarding".into()),
            post_broker_login_flow: None,
        });

        let report = validate(&backend, &[definition]).unwrap();
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].message.contains("does not exist"));
    }

    #[test]
    fn test_redefined_identity_provider_hides_live_bindings() {
        let backend = MemoryBackend::with_realm(REALM);
        backend
            .add_identity_provider(
                REALM,
                IdentityProvider {
                    alias: "google".into(),
                    first_broker_login_flow: Some("stale".into()),
                    post_broker_login_flow: None,
                },
            )
            .unwrap();
        let mut definition = realm(vec![]);
        definition.identity_providers.push(IdentityProviderDefinition {
            alias: "Google".into(),
            first_broker_login_flow: Some("first broker login".into()),
            post_broker_login_flow: None,
        });

        assert!(validate(&backend, &[definition]).unwrap().is_ok());
    }

    #[test]
    fn test_unresolved_live_client_override_is_warning() {
        let backend = MemoryBackend::with_realm(REALM);
        backend
            .add_client(
                REALM,
                Client {
                    id: "c1".into(),
                    client_id: "web".into(),
                    flow_overrides: BTreeMap::from([("browser".to_string(), "deadbeef".to_string())]),
                },
            )
            .unwrap();

        let report = validate(&backend, &[realm(vec![])]).unwrap();
        assert!(report.is_ok());
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].message.contains("deadbeef"));
    }

    #[test]
    fn test_live_client_override_resolved_by_id() {
        let backend = MemoryBackend::with_realm(REALM);
        let id = backend.seed_flow(REALM, "web-login", true, false).unwrap();
        backend
            .add_client(
                REALM,
                Client {
                    id: "c1".into(),
                    client_id: "web".into(),
                    flow_overrides: BTreeMap::from([("browser".to_string(), id)]),
                },
            )
            .unwrap();

        // Keeping the flow declared is fine; dropping it is not
        assert!(validate(&backend, &[realm(vec![flow("web-login")])]).unwrap().is_ok());
        let report = validate(&backend, &[realm(vec![])]).unwrap();
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].subject.starts_with("client web"));
    }

    #[test]
    fn test_declared_client_override() {
        let backend = MemoryBackend::with_realm(REALM);
        let mut definition = realm(vec![flow("api-login")]);
        definition.clients.push(ClientDefinition {
            client_id: "api".into(),
            flow_overrides: BTreeMap::from([
                ("direct_grant".to_string(), "api-login".to_string()),
                ("browser".to_string(), "missing".to_string()),
            ]),
        });

        let report = validate(&backend, &[definition]).unwrap();
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].message.contains("missing"));
    }

    #[test]
    fn test_duplicate_declarations_rejected() {
        let backend = MemoryBackend::with_realm(REALM);
        let mut login = flow("login");
        for _ in 0..2 {
            login.steps.push(StepDefinition::Authenticator(AuthenticatorStep {
                provider_id: "auth-cookie".into(),
                requirement: Requirement::Required,
                config: None,
                position: 0,
            }));
        }
        let report = validate(&backend, &[realm(vec![login, flow("LOGIN")])]).unwrap();
        assert_eq!(report.errors.len(), 2);
    }

    fn with_sub_flow(alias: &str, sub_alias: &str) -> FlowDefinition {
        let mut definition = flow(alias);
        definition.steps.push(StepDefinition::SubFlow(SubFlowStep {
            alias: sub_alias.into(),
            description: String::new(),
            provider_id: BASIC_FLOW.into(),
            requirement: Requirement::Required,
            steps: vec![],
            position: 0,
        }));
        definition
    }

    #[test]
    fn test_sub_flow_alias_shared_across_flows_rejected() {
        let backend = MemoryBackend::with_realm(REALM);
        let batch = realm(vec![
            with_sub_flow("login", "forms"),
            with_sub_flow("register", "Forms"),
        ]);

        let report = validate(&backend, &[batch]).unwrap();
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].subject, "flow register");
        assert!(report.errors[0].message.contains("'Forms'"));
    }

    #[test]
    fn test_sub_flow_alias_clashing_with_top_level_rejected() {
        let backend = MemoryBackend::with_realm(REALM);
        let report =
            validate(&backend, &[realm(vec![with_sub_flow("login", "api"), flow("api")])]).unwrap();
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].subject, "flow api");
    }

    #[test]
    fn test_sub_flow_alias_taken_by_live_flow_rejected() {
        let backend = MemoryBackend::with_realm(REALM);
        backend.seed_flow(REALM, "forms", false, false).unwrap();

        let report = validate(&backend, &[realm(vec![with_sub_flow("login", "forms")])]).unwrap();
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].message.contains("existing top-level flow"));
    }

    #[test]
    fn test_all_realms_checked() {
        let backend = MemoryBackend::with_realm(REALM);
        backend.add_realm("other");
        let mut bad = RealmDefinition {
            realm: "other".into(),
            ..Default::default()
        };
        bad.bindings.reset_credentials_flow = Some("nope".into());

        let report = validate(&backend, &[realm(vec![]), bad]).unwrap();
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].realm, "other");
    }
}
