//! Step-list reconciliation for one flow node
//!
//! Per node, depth first:
//! 1. Fetch the current children and match them to the desired steps by
//!    identity key
//! 2. Delete undeclared steps (sub-flows are emptied first, configs are
//!    deleted before their step)
//! 3. Create missing steps, then set their requirement, since the platform
//!    creates every step `DISABLED`
//! 4. Update drifted steps, recursing into sub-flows
//! 5. Converge sibling order using only "raise priority by one"
//!
//! Order convergence re-fetches the children before every single move. A
//! move renumbers the siblings remotely, so no local bookkeeping of
//! neighbors is kept.

use super::error::{EngineError, EngineResult, Violation};
use super::projection::{project_config, project_step};
use super::Reconciler;
use crate::schema::{AuthenticatorStep, StepConfigDefinition, StepDefinition, SubFlowStep};
use declarative::{ChangeKind, Keyed, ObservedMap, classify, compare};
use realmkit::{
    Backend, ExecutionStep, Flow, FlowDraft, Requirement, StepConfig, StepConfigDraft,
    SubFlowDraft,
};

/// States of the order convergence loop.
#[derive(Debug)]
enum Convergence {
    /// Re-fetch children and look for the first misplaced step
    Scan,
    /// Raise one step by one position, then scan again
    MoveOne { step_id: String, name: String },
    Converged,
    Violation(Violation),
}

impl<B: Backend + ?Sized> Reconciler<'_, B> {
    /// Reconcile the direct children of `flow` against `desired`.
    ///
    /// Returns whether any remote write was made at this level or below.
    pub fn reconcile_steps(&mut self, flow: &Flow, desired: &[StepDefinition]) -> EngineResult<bool> {
        let children = self.backend.list_children(self.realm, flow)?;
        let observed = ObservedMap::new(&flow.id, &children);
        let plan = classify(desired, &observed);

        let misordered = children.len() != desired.len()
            || plan
                .updates
                .iter()
                .any(|m| m.current.index != m.desired.position());
        let mut changed = false;

        for stale in &plan.removals {
            self.remove_step(flow, stale)?;
            changed = true;
        }

        for step in &plan.inserts {
            self.insert_step(flow, step)?;
            changed = true;
        }

        for matched in &plan.updates {
            if self.update_step(flow, matched.current, matched.desired)? {
                changed = true;
            }
        }

        if changed || misordered {
            let moves = self.converge_order(flow, desired)?;
            changed |= moves > 0;
        }
        Ok(changed)
    }

    // =========================================================================
    // Removal
    // =========================================================================

    fn remove_step(&mut self, flow: &Flow, stale: &ExecutionStep) -> EngineResult<()> {
        let name = stale.natural_name().to_string();

        if let Some(sub_flow_id) = &stale.sub_flow_id {
            match self.backend.get_flow(self.realm, sub_flow_id) {
                Ok(sub) => {
                    log::debug!("Emptying sub-flow '{}' before deleting it", sub.alias);
                    self.reconcile_steps(&sub, &[])?;
                }
                Err(err) if err.is_not_found() => {
                    log::debug!("Sub-flow {sub_flow_id} of step '{name}' is already gone");
                }
                Err(err) => return Err(err.into()),
            }
        } else if let Some(config_id) = &stale.config_id {
            log::info!("Deleting config of step '{name}' in flow '{}'", flow.alias);
            match self.backend.delete_step_config(self.realm, config_id) {
                Ok(()) => {}
                Err(err) if err.is_not_found() => {}
                Err(err) => return Err(err.into()),
            }
        }

        log::info!("Deleting step '{name}' from flow '{}'", flow.alias);
        self.backend.delete_step(self.realm, &stale.id)?;
        self.record(ChangeKind::Deleted);
        Ok(())
    }

    // =========================================================================
    // Insertion
    // =========================================================================

    fn insert_step(&mut self, flow: &Flow, step: &StepDefinition) -> EngineResult<()> {
        match step {
            StepDefinition::Authenticator(leaf) => self.insert_leaf(flow, leaf),
            StepDefinition::SubFlow(branch) => self.insert_branch(flow, branch),
        }
    }

    fn insert_leaf(&mut self, flow: &Flow, leaf: &AuthenticatorStep) -> EngineResult<()> {
        log::info!(
            "Adding authenticator '{}' to flow '{}'",
            leaf.provider_id,
            flow.alias
        );
        let step_id = self
            .backend
            .create_leaf_step(self.realm, flow, &leaf.provider_id)?;
        self.record(ChangeKind::Created);

        let created = self.find_child(flow, &leaf.provider_id, |c| c.id == step_id)?;
        self.set_requirement(flow, &created, leaf.requirement)?;

        if let Some(config) = &leaf.config {
            log::info!("Attaching config '{}' to '{}'", config.alias, leaf.provider_id);
            self.backend
                .create_step_config(self.realm, &step_id, &config_draft(config))?;
        }
        Ok(())
    }

    fn insert_branch(&mut self, flow: &Flow, branch: &SubFlowStep) -> EngineResult<()> {
        log::info!("Adding sub-flow '{}' to flow '{}'", branch.alias, flow.alias);
        let draft = SubFlowDraft {
            alias: branch.alias.clone(),
            description: branch.description.clone(),
            provider_id: branch.provider_id.clone(),
        };
        let sub_flow_id = self.backend.create_branch_step(self.realm, flow, &draft)?;
        self.record(ChangeKind::Created);

        let created = self.find_child(flow, &branch.alias, |c| {
            c.sub_flow_id.as_deref() == Some(sub_flow_id.as_str())
        })?;
        self.set_requirement(flow, &created, branch.requirement)?;

        let sub = self.backend.get_flow(self.realm, &sub_flow_id)?;
        self.reconcile_steps(&sub, &branch.steps)?;
        Ok(())
    }

    /// Re-fetch the children of `flow` and pick the one matching `pred`
    fn find_child(
        &self,
        flow: &Flow,
        name: &str,
        pred: impl Fn(&ExecutionStep) -> bool,
    ) -> EngineResult<ExecutionStep> {
        self.backend
            .list_children(self.realm, flow)?
            .into_iter()
            .find(|c| pred(c))
            .ok_or_else(|| {
                EngineError::violation(
                    &flow.alias,
                    Violation::MissingChild {
                        name: name.to_string(),
                    },
                )
            })
    }

    /// Write a step's requirement if it differs from what the platform holds
    fn set_requirement(
        &self,
        flow: &Flow,
        step: &ExecutionStep,
        requirement: Requirement,
    ) -> EngineResult<bool> {
        if step.requirement == requirement {
            return Ok(false);
        }
        log::debug!(
            "Setting requirement of '{}' in '{}' to {requirement}",
            step.natural_name(),
            flow.alias
        );
        let mut updated = step.clone();
        updated.requirement = requirement;
        self.backend.update_step(self.realm, flow, &updated)?;
        Ok(true)
    }

    // =========================================================================
    // Update
    // =========================================================================

    fn update_step(
        &mut self,
        flow: &Flow,
        current: &ExecutionStep,
        desired: &StepDefinition,
    ) -> EngineResult<bool> {
        let name = desired.natural_name();

        // Same key, different kind: replace the step outright
        if current.is_branch() != matches!(desired, StepDefinition::SubFlow(_)) {
            log::info!("Step '{name}' in flow '{}' changed kind, replacing it", flow.alias);
            self.remove_step(flow, current)?;
            self.insert_step(flow, desired)?;
            return Ok(true);
        }

        let projected = project_step(self.backend, self.realm, current)?;
        let changes = compare(&projected, desired);
        if changes.is_empty() {
            log::debug!("Step '{name}' in flow '{}' unchanged", flow.alias);
            self.record(ChangeKind::Unchanged);
            return Ok(false);
        }
        for change in &changes {
            log::info!("Step '{name}' in flow '{}': {change}", flow.alias);
        }

        self.set_requirement(flow, current, desired.requirement())?;
        match desired {
            StepDefinition::Authenticator(leaf) => {
                self.sync_config(current, leaf.config.as_ref())?;
            }
            StepDefinition::SubFlow(branch) => self.update_branch(current, branch)?,
        }
        self.record(ChangeKind::Updated);
        Ok(true)
    }

    fn update_branch(&mut self, current: &ExecutionStep, branch: &SubFlowStep) -> EngineResult<()> {
        let Some(sub_flow_id) = &current.sub_flow_id else {
            return Ok(());
        };
        let sub = self.backend.get_flow(self.realm, sub_flow_id)?;
        if sub.description != branch.description || sub.provider_id != branch.provider_id {
            log::info!("Updating sub-flow '{}'", sub.alias);
            let draft = FlowDraft {
                description: branch.description.clone(),
                provider_id: branch.provider_id.clone(),
                ..FlowDraft::from_flow(&sub)
            };
            self.backend.update_flow(self.realm, &sub.id, &draft)?;
        }
        let sub = self.backend.get_flow(self.realm, sub_flow_id)?;
        self.reconcile_steps(&sub, &branch.steps)?;
        Ok(())
    }

    /// Create, update or delete a leaf's config to match `desired`
    fn sync_config(
        &self,
        step: &ExecutionStep,
        desired: Option<&StepConfigDefinition>,
    ) -> EngineResult<()> {
        let current = project_config(self.backend, self.realm, step)?;
        match (step.config_id.as_ref(), current, desired) {
            (_, None, None) => {}
            (_, None, Some(config)) => {
                log::info!("Attaching config '{}' to '{}'", config.alias, step.natural_name());
                self.backend
                    .create_step_config(self.realm, &step.id, &config_draft(config))?;
            }
            (Some(config_id), Some(_), None) => {
                log::info!("Deleting config of step '{}'", step.natural_name());
                self.backend.delete_step_config(self.realm, config_id)?;
            }
            (Some(config_id), Some(existing), Some(config)) => {
                if existing != *config {
                    log::info!("Updating config '{}' of '{}'", config.alias, step.natural_name());
                    self.backend.update_step_config(
                        self.realm,
                        &StepConfig {
                            id: config_id.clone(),
                            alias: config.alias.clone(),
                            values: config.values.clone(),
                        },
                    )?;
                }
            }
            // A config read back without an id cannot happen
            (None, Some(_), _) => {}
        }
        Ok(())
    }

    // =========================================================================
    // Order convergence
    // =========================================================================

    /// Raise steps one position at a time until remote order matches the
    /// declared order. Returns the number of moves made.
    fn converge_order(&mut self, flow: &Flow, desired: &[StepDefinition]) -> EngineResult<usize> {
        let mut expected: Vec<&StepDefinition> = desired.iter().collect();
        expected.sort_by_key(|s| s.position());
        let cap = expected.len() * expected.len() + 1;
        let mut moves = 0;
        let mut state = Convergence::Scan;

        loop {
            state = match state {
                Convergence::Scan => self.scan_order(flow, &expected)?,
                Convergence::MoveOne { step_id, name } => {
                    if moves >= cap {
                        Convergence::Violation(Violation::ConvergenceCapExceeded { cap })
                    } else {
                        log::info!("Raising priority of '{name}' in flow '{}'", flow.alias);
                        self.backend.raise_priority(self.realm, &step_id)?;
                        self.record(ChangeKind::Moved);
                        moves += 1;
                        Convergence::Scan
                    }
                }
                Convergence::Converged => {
                    log::debug!("Flow '{}' in order after {moves} move(s)", flow.alias);
                    return Ok(moves);
                }
                Convergence::Violation(violation) => {
                    return Err(EngineError::violation(&flow.alias, violation));
                }
            };
        }
    }

    fn scan_order(&self, flow: &Flow, expected: &[&StepDefinition]) -> EngineResult<Convergence> {
        let children = self.backend.list_children(self.realm, flow)?;
        if children.len() != expected.len() {
            return Ok(Convergence::Violation(Violation::ChildCountMismatch {
                expected: expected.len(),
                observed: children.len(),
            }));
        }

        let observed = ObservedMap::new(&flow.id, &children);
        for (index, step) in expected.iter().enumerate() {
            let name = step.natural_name().to_string();
            let Some(current) = observed.get(*step) else {
                return Ok(Convergence::Violation(Violation::MissingChild { name }));
            };
            if current.index > index {
                return Ok(Convergence::MoveOne {
                    step_id: current.id.clone(),
                    name,
                });
            }
            if current.index < index {
                return Ok(Convergence::Violation(Violation::PriorityWouldDecrease {
                    name,
                    observed: current.index,
                    expected: index,
                }));
            }
        }
        Ok(Convergence::Converged)
    }
}

fn config_draft(config: &StepConfigDefinition) -> StepConfigDraft {
    StepConfigDraft {
        alias: config.alias.clone(),
        values: config.values.clone(),
    }
}

// ============================================================================
// Tests
// ============================================================================
