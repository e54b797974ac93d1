//! In-process platform backend.
//!
//! [`MemoryBackend`] keeps realms, flows, steps and step configs in memory
//! with the same observable semantics as the real platform:
//! - sibling indices are always contiguous from zero
//! - new steps start out `DISABLED` and are appended last
//! - `raise_priority` swaps a step with its previous sibling (no-op at 0)
//! - deleting a sub-flow step deletes the sub-flow and everything under it
//! - built-in flows refuse updates and deletion
//!
//! Every mutating call is appended to a journal so tests can assert on the
//! exact sequence of remote writes.

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::types::{
    Client, ExecutionStep, Flow, FlowDraft, IdentityProvider, Realm, RealmFlowBindings,
    Requirement, StepConfig, StepConfigDraft, SubFlowDraft, BASIC_FLOW,
};
use std::cell::RefCell;
use std::collections::BTreeMap;

/// A mutating call recorded by [`MemoryBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateFlow { alias: String },
    UpdateFlow { id: String },
    DeleteFlow { id: String },
    CreateLeafStep { parent: String, provider_id: String },
    CreateBranchStep { parent: String, alias: String },
    UpdateStep { id: String, requirement: Requirement },
    DeleteStep { id: String },
    RaisePriority { id: String },
    CreateStepConfig { step_id: String },
    UpdateStepConfig { id: String },
    DeleteStepConfig { id: String },
}

#[derive(Debug, Clone)]
struct StepRecord {
    id: String,
    display_name: String,
    provider_id: Option<String>,
    requirement: Requirement,
    sub_flow_id: Option<String>,
    config_id: Option<String>,
}

#[derive(Debug, Clone)]
struct FlowRecord {
    flow: Flow,
    steps: Vec<StepRecord>,
}

#[derive(Debug, Clone)]
struct RealmState {
    realm: Realm,
    flows: BTreeMap<String, FlowRecord>,
    configs: BTreeMap<String, StepConfig>,
    clients: Vec<Client>,
    identity_providers: Vec<IdentityProvider>,
}

impl RealmState {
    fn new(name: &str) -> Self {
        Self {
            realm: Realm {
                name: name.to_string(),
                bindings: RealmFlowBindings::default(),
            },
            flows: BTreeMap::new(),
            configs: BTreeMap::new(),
            clients: Vec::new(),
            identity_providers: Vec::new(),
        }
    }

    fn flow(&self, id: &str) -> Result<&FlowRecord> {
        self.flows.get(id).ok_or_else(|| Error::not_found("flow", id))
    }

    fn flow_mut(&mut self, id: &str) -> Result<&mut FlowRecord> {
        self.flows
            .get_mut(id)
            .ok_or_else(|| Error::not_found("flow", id))
    }

    fn alias_taken(&self, alias: &str, except_id: Option<&str>) -> bool {
        self.flows.values().any(|r| {
            r.flow.alias.eq_ignore_ascii_case(alias) && Some(r.flow.id.as_str()) != except_id
        })
    }

    /// Locate a step: (owning flow id, position)
    fn locate_step(&self, step_id: &str) -> Result<(String, usize)> {
        self.flows
            .values()
            .find_map(|r| {
                r.steps
                    .iter()
                    .position(|s| s.id == step_id)
                    .map(|pos| (r.flow.id.clone(), pos))
            })
            .ok_or_else(|| Error::not_found("execution", step_id))
    }

    /// Remove a flow with all nested sub-flows and their configs
    fn remove_flow(&mut self, id: &str) {
        if let Some(record) = self.flows.remove(id) {
            for step in record.steps {
                self.remove_step_record(&step);
            }
        }
    }

    fn remove_step_record(&mut self, step: &StepRecord) {
        if let Some(config_id) = &step.config_id {
            self.configs.remove(config_id);
        }
        if let Some(sub_flow_id) = &step.sub_flow_id {
            self.remove_flow(sub_flow_id);
        }
    }
}

#[derive(Debug, Default)]
struct State {
    next_id: u64,
    realms: BTreeMap<String, RealmState>,
    journal: Vec<Call>,
}

impl State {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{:04}", self.next_id)
    }

    fn realm(&self, name: &str) -> Result<&RealmState> {
        self.realms
            .get(name)
            .ok_or_else(|| Error::not_found("realm", name))
    }

    fn realm_mut(&mut self, name: &str) -> Result<&mut RealmState> {
        self.realms
            .get_mut(name)
            .ok_or_else(|| Error::not_found("realm", name))
    }
}

/// In-memory platform.
///
/// # Example
///
/// ```
/// use realmkit::backend::Backend;
/// use realmkit::backend::memory::MemoryBackend;
/// use realmkit::Requirement;
///
/// let backend = MemoryBackend::with_realm("acme");
/// let flow_id = backend.seed_flow("acme", "login", true, false).unwrap();
/// backend.seed_leaf("acme", &flow_id, "auth-cookie", Requirement::Alternative).unwrap();
///
/// let flow = backend.get_flow("acme", &flow_id).unwrap();
/// assert_eq!(backend.list_children("acme", &flow).unwrap().len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: RefCell<State>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend holding one empty realm.
    pub fn with_realm(name: &str) -> Self {
        let backend = Self::new();
        backend.add_realm(name);
        backend
    }

    // =========================================================================
    // Seeding (not journaled)
    // =========================================================================

    pub fn add_realm(&self, name: &str) {
        self.state
            .borrow_mut()
            .realms
            .entry(name.to_string())
            .or_insert_with(|| RealmState::new(name));
    }

    /// Seed a top-level flow, returning its id.
    pub fn seed_flow(&self, realm: &str, alias: &str, managed: bool, built_in: bool) -> Result<String> {
        let mut state = self.state.borrow_mut();
        let id = state.next_id("flow");
        let realm_state = state.realm_mut(realm)?;
        if realm_state.alias_taken(alias, None) {
            return Err(Error::Conflict {
                message: format!("flow alias '{alias}' already exists"),
            });
        }
        realm_state.flows.insert(
            id.clone(),
            FlowRecord {
                flow: Flow {
                    id: id.clone(),
                    alias: alias.to_string(),
                    description: String::new(),
                    provider_id: BASIC_FLOW.to_string(),
                    top_level: true,
                    built_in,
                    managed,
                },
                steps: Vec::new(),
            },
        );
        Ok(id)
    }

    /// Seed a leaf step at the end of `flow_id`, returning the step id.
    pub fn seed_leaf(
        &self,
        realm: &str,
        flow_id: &str,
        provider_id: &str,
        requirement: Requirement,
    ) -> Result<String> {
        let mut state = self.state.borrow_mut();
        let id = state.next_id("exec");
        state.realm_mut(realm)?.flow_mut(flow_id)?.steps.push(StepRecord {
            id: id.clone(),
            display_name: provider_id.to_string(),
            provider_id: Some(provider_id.to_string()),
            requirement,
            sub_flow_id: None,
            config_id: None,
        });
        Ok(id)
    }

    /// Seed a sub-flow step at the end of `flow_id`, returning the sub-flow id.
    pub fn seed_branch(
        &self,
        realm: &str,
        flow_id: &str,
        alias: &str,
        requirement: Requirement,
    ) -> Result<String> {
        let draft = SubFlowDraft {
            alias: alias.to_string(),
            description: String::new(),
            provider_id: BASIC_FLOW.to_string(),
        };
        let mut state = self.state.borrow_mut();
        let sub_flow_id = insert_branch(&mut state, realm, flow_id, &draft)?;
        let realm_state = state.realm_mut(realm)?;
        if let Some(step) = realm_state.flow_mut(flow_id)?.steps.last_mut() {
            step.requirement = requirement;
        }
        Ok(sub_flow_id)
    }

    /// Seed a config on a step, returning the config id.
    pub fn seed_config(
        &self,
        realm: &str,
        step_id: &str,
        alias: &str,
        values: &[(&str, &str)],
    ) -> Result<String> {
        let draft = StepConfigDraft {
            alias: alias.to_string(),
            values: values
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        };
        let mut state = self.state.borrow_mut();
        insert_config(&mut state, realm, step_id, &draft)
    }

    pub fn set_realm_bindings(&self, realm: &str, bindings: RealmFlowBindings) -> Result<()> {
        self.state.borrow_mut().realm_mut(realm)?.realm.bindings = bindings;
        Ok(())
    }

    pub fn add_client(&self, realm: &str, client: Client) -> Result<()> {
        self.state.borrow_mut().realm_mut(realm)?.clients.push(client);
        Ok(())
    }

    pub fn add_identity_provider(&self, realm: &str, provider: IdentityProvider) -> Result<()> {
        self.state
            .borrow_mut()
            .realm_mut(realm)?
            .identity_providers
            .push(provider);
        Ok(())
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Mutating calls made so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.state.borrow().journal.clone()
    }

    pub fn clear_calls(&self) {
        self.state.borrow_mut().journal.clear();
    }

    /// Step ids passed to `raise_priority`, in order.
    pub fn raised(&self) -> Vec<String> {
        self.state
            .borrow()
            .journal
            .iter()
            .filter_map(|c| match c {
                Call::RaisePriority { id } => Some(id.clone()),
                _ => None,
            })
            .collect()
    }

    /// Find a flow (top-level or nested) by alias.
    pub fn flow_by_alias(&self, realm: &str, alias: &str) -> Option<Flow> {
        let state = self.state.borrow();
        state.realms.get(realm).and_then(|r| {
            r.flows
                .values()
                .find(|rec| rec.flow.alias.eq_ignore_ascii_case(alias))
                .map(|rec| rec.flow.clone())
        })
    }

    /// Render a flow's subtree, one line per step, nesting by two spaces.
    ///
    /// Lines look like `auth-cookie [ALTERNATIVE]`, with ` {alias: k=v}`
    /// appended for steps carrying a config.
    pub fn tree(&self, realm: &str, flow_alias: &str) -> Vec<String> {
        let state = self.state.borrow();
        let mut lines = Vec::new();
        if let Some(realm_state) = state.realms.get(realm)
            && let Some(record) = realm_state
                .flows
                .values()
                .find(|r| r.flow.alias.eq_ignore_ascii_case(flow_alias))
        {
            render(realm_state, record, 0, &mut lines);
        }
        lines
    }
}

fn render(realm: &RealmState, record: &FlowRecord, depth: usize, lines: &mut Vec<String>) {
    for step in &record.steps {
        let mut line = format!("{}{} [{}]", "  ".repeat(depth), step.display_name, step.requirement);
        if let Some(config) = step.config_id.as_ref().and_then(|id| realm.configs.get(id)) {
            let values: Vec<String> = config.values.iter().map(|(k, v)| format!("{k}={v}")).collect();
            line.push_str(&format!(" {{{}: {}}}", config.alias, values.join(", ")));
        }
        lines.push(line);
        if let Some(sub) = step.sub_flow_id.as_ref().and_then(|id| realm.flows.get(id)) {
            render(realm, sub, depth + 1, lines);
        }
    }
}

fn insert_branch(state: &mut State, realm: &str, parent_id: &str, draft: &SubFlowDraft) -> Result<String> {
    let sub_flow_id = state.next_id("flow");
    let step_id = state.next_id("exec");
    let realm_state = state.realm_mut(realm)?;
    realm_state.flow(parent_id)?;
    if realm_state.alias_taken(&draft.alias, None) {
        return Err(Error::Conflict {
            message: format!("flow alias '{}' already exists", draft.alias),
        });
    }
    realm_state.flows.insert(
        sub_flow_id.clone(),
        FlowRecord {
            flow: Flow {
                id: sub_flow_id.clone(),
                alias: draft.alias.clone(),
                description: draft.description.clone(),
                provider_id: draft.provider_id.clone(),
                top_level: false,
                built_in: false,
                managed: false,
            },
            steps: Vec::new(),
        },
    );
    realm_state.flow_mut(parent_id)?.steps.push(StepRecord {
        id: step_id,
        display_name: draft.alias.clone(),
        provider_id: None,
        requirement: Requirement::Disabled,
        sub_flow_id: Some(sub_flow_id.clone()),
        config_id: None,
    });
    Ok(sub_flow_id)
}

fn insert_config(state: &mut State, realm: &str, step_id: &str, draft: &StepConfigDraft) -> Result<String> {
    let config_id = state.next_id("config");
    let realm_state = state.realm_mut(realm)?;
    let (flow_id, pos) = realm_state.locate_step(step_id)?;
    let step = &mut realm_state.flow_mut(&flow_id)?.steps[pos];
    let previous = step.config_id.replace(config_id.clone());
    if let Some(previous) = previous {
        realm_state.configs.remove(&previous);
    }
    realm_state.configs.insert(
        config_id.clone(),
        StepConfig {
            id: config_id.clone(),
            alias: draft.alias.clone(),
            values: draft.values.clone(),
        },
    );
    Ok(config_id)
}

impl Backend for MemoryBackend {
    fn list_top_level_flows(&self, realm: &str) -> Result<Vec<Flow>> {
        let state = self.state.borrow();
        Ok(state
            .realm(realm)?
            .flows
            .values()
            .filter(|r| r.flow.top_level)
            .map(|r| r.flow.clone())
            .collect())
    }

    fn get_flow(&self, realm: &str, id: &str) -> Result<Flow> {
        let state = self.state.borrow();
        Ok(state.realm(realm)?.flow(id)?.flow.clone())
    }

    fn create_flow(&self, realm: &str, draft: &FlowDraft) -> Result<String> {
        let mut state = self.state.borrow_mut();
        let id = state.next_id("flow");
        let realm_state = state.realm_mut(realm)?;
        if realm_state.alias_taken(&draft.alias, None) {
            return Err(Error::Conflict {
                message: format!("flow alias '{}' already exists", draft.alias),
            });
        }
        realm_state.flows.insert(
            id.clone(),
            FlowRecord {
                flow: Flow {
                    id: id.clone(),
                    alias: draft.alias.clone(),
                    description: draft.description.clone(),
                    provider_id: draft.provider_id.clone(),
                    top_level: draft.top_level,
                    built_in: false,
                    managed: draft.managed,
                },
                steps: Vec::new(),
            },
        );
        state.journal.push(Call::CreateFlow {
            alias: draft.alias.clone(),
        });
        Ok(id)
    }

    fn update_flow(&self, realm: &str, id: &str, draft: &FlowDraft) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let realm_state = state.realm_mut(realm)?;
        if realm_state.flow(id)?.flow.built_in {
            return Err(Error::Rejected {
                message: format!("built-in flow {id} cannot be modified"),
                status: Some(400),
            });
        }
        if realm_state.alias_taken(&draft.alias, Some(id)) {
            return Err(Error::Conflict {
                message: format!("flow alias '{}' already exists", draft.alias),
            });
        }
        let flow = &mut realm_state.flow_mut(id)?.flow;
        flow.alias = draft.alias.clone();
        flow.description = draft.description.clone();
        flow.provider_id = draft.provider_id.clone();
        flow.managed = draft.managed;
        state.journal.push(Call::UpdateFlow { id: id.to_string() });
        Ok(())
    }

    fn delete_flow(&self, realm: &str, id: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let realm_state = state.realm_mut(realm)?;
        if realm_state.flow(id)?.flow.built_in {
            return Err(Error::Rejected {
                message: format!("built-in flow {id} cannot be deleted"),
                status: Some(400),
            });
        }
        realm_state.remove_flow(id);
        state.journal.push(Call::DeleteFlow { id: id.to_string() });
        Ok(())
    }

    fn list_children(&self, realm: &str, flow: &Flow) -> Result<Vec<ExecutionStep>> {
        let state = self.state.borrow();
        let record = state.realm(realm)?.flow(&flow.id)?;
        Ok(record
            .steps
            .iter()
            .enumerate()
            .map(|(index, s)| ExecutionStep {
                id: s.id.clone(),
                parent_flow_id: flow.id.clone(),
                display_name: s.display_name.clone(),
                provider_id: s.provider_id.clone(),
                requirement: s.requirement,
                index,
                sub_flow_id: s.sub_flow_id.clone(),
                config_id: s.config_id.clone(),
            })
            .collect())
    }

    fn create_leaf_step(&self, realm: &str, parent: &Flow, provider_id: &str) -> Result<String> {
        let mut state = self.state.borrow_mut();
        let id = state.next_id("exec");
        state.realm_mut(realm)?.flow_mut(&parent.id)?.steps.push(StepRecord {
            id: id.clone(),
            display_name: provider_id.to_string(),
            provider_id: Some(provider_id.to_string()),
            requirement: Requirement::Disabled,
            sub_flow_id: None,
            config_id: None,
        });
        state.journal.push(Call::CreateLeafStep {
            parent: parent.alias.clone(),
            provider_id: provider_id.to_string(),
        });
        Ok(id)
    }

    fn create_branch_step(
        &self,
        realm: &str,
        parent: &Flow,
        draft: &SubFlowDraft,
    ) -> Result<String> {
        let mut state = self.state.borrow_mut();
        let sub_flow_id = insert_branch(&mut state, realm, &parent.id, draft)?;
        state.journal.push(Call::CreateBranchStep {
            parent: parent.alias.clone(),
            alias: draft.alias.clone(),
        });
        Ok(sub_flow_id)
    }

    fn update_step(&self, realm: &str, parent: &Flow, step: &ExecutionStep) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let record = state
            .realm_mut(realm)?
            .flow_mut(&parent.id)?
            .steps
            .iter_mut()
            .find(|s| s.id == step.id)
            .ok_or_else(|| Error::not_found("execution", &step.id))?;
        record.requirement = step.requirement;
        state.journal.push(Call::UpdateStep {
            id: step.id.clone(),
            requirement: step.requirement,
        });
        Ok(())
    }

    fn delete_step(&self, realm: &str, step_id: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let realm_state = state.realm_mut(realm)?;
        let (flow_id, pos) = realm_state.locate_step(step_id)?;
        let removed = realm_state.flow_mut(&flow_id)?.steps.remove(pos);
        realm_state.remove_step_record(&removed);
        state.journal.push(Call::DeleteStep {
            id: step_id.to_string(),
        });
        Ok(())
    }

    fn raise_priority(&self, realm: &str, step_id: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let realm_state = state.realm_mut(realm)?;
        let (flow_id, pos) = realm_state.locate_step(step_id)?;
        if pos > 0 {
            realm_state.flow_mut(&flow_id)?.steps.swap(pos - 1, pos);
        }
        state.journal.push(Call::RaisePriority {
            id: step_id.to_string(),
        });
        Ok(())
    }

    fn get_step_config(&self, realm: &str, config_id: &str) -> Result<StepConfig> {
        let state = self.state.borrow();
        state
            .realm(realm)?
            .configs
            .get(config_id)
            .cloned()
            .ok_or_else(|| Error::not_found("config", config_id))
    }

    fn create_step_config(
        &self,
        realm: &str,
        step_id: &str,
        draft: &StepConfigDraft,
    ) -> Result<String> {
        let mut state = self.state.borrow_mut();
        let id = insert_config(&mut state, realm, step_id, draft)?;
        state.journal.push(Call::CreateStepConfig {
            step_id: step_id.to_string(),
        });
        Ok(id)
    }

    fn update_step_config(&self, realm: &str, config: &StepConfig) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let stored = state
            .realm_mut(realm)?
            .configs
            .get_mut(&config.id)
            .ok_or_else(|| Error::not_found("config", &config.id))?;
        *stored = config.clone();
        state.journal.push(Call::UpdateStepConfig {
            id: config.id.clone(),
        });
        Ok(())
    }

    fn delete_step_config(&self, realm: &str, config_id: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let realm_state = state.realm_mut(realm)?;
        if realm_state.configs.remove(config_id).is_none() {
            return Err(Error::not_found("config", config_id));
        }
        for record in realm_state.flows.values_mut() {
            for step in &mut record.steps {
                if step.config_id.as_deref() == Some(config_id) {
                    step.config_id = None;
                }
            }
        }
        state.journal.push(Call::DeleteStepConfig {
            id: config_id.to_string(),
        });
        Ok(())
    }

    fn get_realm(&self, realm: &str) -> Result<Realm> {
        Ok(self.state.borrow().realm(realm)?.realm.clone())
    }

    fn list_clients(&self, realm: &str) -> Result<Vec<Client>> {
        Ok(self.state.borrow().realm(realm)?.clients.clone())
    }

    fn list_identity_providers(&self, realm: &str) -> Result<Vec<IdentityProvider>> {
        Ok(self.state.borrow().realm(realm)?.identity_providers.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(backend: &MemoryBackend, flow_id: &str) -> Vec<String> {
        let flow = backend.get_flow("acme", flow_id).unwrap();
        backend
            .list_children("acme", &flow)
            .unwrap()
            .into_iter()
            .map(|s| s.display_name)
            .collect()
    }

    #[test]
    fn test_raise_priority_swaps_and_renumbers() {
        let backend = MemoryBackend::with_realm("acme");
        let flow_id = backend.seed_flow("acme", "login", true, false).unwrap();
        backend.seed_leaf("acme", &flow_id, "a", Requirement::Required).unwrap();
        let b = backend.seed_leaf("acme", &flow_id, "b", Requirement::Required).unwrap();

        backend.raise_priority("acme", &b).unwrap();
        assert_eq!(names(&backend, &flow_id), vec!["b", "a"]);

        // Already first: no-op, but still journaled
        backend.raise_priority("acme", &b).unwrap();
        assert_eq!(names(&backend, &flow_id), vec!["b", "a"]);
        assert_eq!(backend.raised(), vec![b.clone(), b]);
    }

    #[test]
    fn test_new_steps_start_disabled() {
        let backend = MemoryBackend::with_realm("acme");
        let flow_id = backend.seed_flow("acme", "login", true, false).unwrap();
        let flow = backend.get_flow("acme", &flow_id).unwrap();
        backend.create_leaf_step("acme", &flow, "auth-cookie").unwrap();

        let children = backend.list_children("acme", &flow).unwrap();
        assert_eq!(children[0].requirement, Requirement::Disabled);
        assert_eq!(children[0].index, 0);
    }

    #[test]
    fn test_delete_branch_removes_subtree() {
        let backend = MemoryBackend::with_realm("acme");
        let flow_id = backend.seed_flow("acme", "login", true, false).unwrap();
        let sub = backend
            .seed_branch("acme", &flow_id, "forms", Requirement::Alternative)
            .unwrap();
        let leaf = backend.seed_leaf("acme", &sub, "otp", Requirement::Required).unwrap();
        backend.seed_config("acme", &leaf, "otp-cfg", &[("digits", "6")]).unwrap();

        let flow = backend.get_flow("acme", &flow_id).unwrap();
        let step = backend.list_children("acme", &flow).unwrap().remove(0);
        backend.delete_step("acme", &step.id).unwrap();

        assert!(backend.get_flow("acme", &sub).unwrap_err().is_not_found());
        assert!(backend.tree("acme", "login").is_empty());
    }

    #[test]
    fn test_built_in_flow_refuses_deletion() {
        let backend = MemoryBackend::with_realm("acme");
        let id = backend.seed_flow("acme", "browser", false, true).unwrap();
        assert!(backend.delete_flow("acme", &id).is_err());
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn test_duplicate_alias_conflicts() {
        let backend = MemoryBackend::with_realm("acme");
        backend.seed_flow("acme", "login", true, false).unwrap();
        let draft = FlowDraft {
            alias: "LOGIN".into(),
            description: String::new(),
            provider_id: BASIC_FLOW.into(),
            top_level: true,
            managed: true,
        };
        assert!(matches!(
            backend.create_flow("acme", &draft),
            Err(Error::Conflict { .. })
        ));
    }

    #[test]
    fn test_tree_rendering() {
        let backend = MemoryBackend::with_realm("acme");
        let flow_id = backend.seed_flow("acme", "login", true, false).unwrap();
        let leaf = backend
            .seed_leaf("acme", &flow_id, "auth-otp-form", Requirement::Required)
            .unwrap();
        backend.seed_config("acme", &leaf, "otp", &[("digits", "6")]).unwrap();
        let sub = backend
            .seed_branch("acme", &flow_id, "forms", Requirement::Alternative)
            .unwrap();
        backend.seed_leaf("acme", &sub, "auth-cookie", Requirement::Required).unwrap();

        assert_eq!(
            backend.tree("acme", "login"),
            vec![
                "auth-otp-form [REQUIRED] {otp: digits=6}",
                "forms [ALTERNATIVE]",
                "  auth-cookie [REQUIRED]",
            ]
        );
    }

    #[test]
    fn test_unknown_realm_is_not_found() {
        let backend = MemoryBackend::new();
        assert!(backend.list_top_level_flows("nope").unwrap_err().is_not_found());
    }
}
