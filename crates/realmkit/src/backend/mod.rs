//! Backend abstraction for the identity platform's admin API.
//!
//! The [`Backend`] trait is the complete set of remote operations the
//! reconciler consumes, allowing for different implementations:
//! - [`http::HttpBackend`] talks to a real server over blocking HTTP
//! - [`memory::MemoryBackend`] is an in-process platform for tests and
//!   offline rehearsals
//!
//! Every call is one blocking round trip. Nothing is cached between calls.

pub mod http;
pub mod memory;

use crate::error::Result;
use crate::types::{
    Client, ExecutionStep, Flow, FlowDraft, IdentityProvider, Realm, StepConfig,
    StepConfigDraft, SubFlowDraft,
};

/// Remote operations on flows, steps, step configs and binding holders.
pub trait Backend {
    // =========================================================================
    // Flows
    // =========================================================================

    /// List the realm's top-level flows.
    fn list_top_level_flows(&self, realm: &str) -> Result<Vec<Flow>>;

    /// Fetch one flow (top-level or nested) by id.
    fn get_flow(&self, realm: &str, id: &str) -> Result<Flow>;

    /// Create a top-level flow, returning its id.
    fn create_flow(&self, realm: &str, draft: &FlowDraft) -> Result<String>;

    /// Overwrite a flow's writable fields.
    fn update_flow(&self, realm: &str, id: &str, draft: &FlowDraft) -> Result<()>;

    /// Delete a flow.
    fn delete_flow(&self, realm: &str, id: &str) -> Result<()>;

    // =========================================================================
    // Steps
    // =========================================================================

    /// List the direct children of `flow`, ordered by index.
    fn list_children(&self, realm: &str, flow: &Flow) -> Result<Vec<ExecutionStep>>;

    /// Append a leaf authenticator step, returning the step id.
    fn create_leaf_step(&self, realm: &str, parent: &Flow, provider_id: &str) -> Result<String>;

    /// Append a sub-flow step, returning the new sub-flow's id.
    fn create_branch_step(&self, realm: &str, parent: &Flow, draft: &SubFlowDraft)
    -> Result<String>;

    /// Write a step's requirement level.
    fn update_step(&self, realm: &str, parent: &Flow, step: &ExecutionStep) -> Result<()>;

    /// Delete a step.
    fn delete_step(&self, realm: &str, step_id: &str) -> Result<()>;

    /// Move a step up one position among its siblings.
    ///
    /// This is the only reordering primitive; the platform renumbers the
    /// siblings as a side effect.
    fn raise_priority(&self, realm: &str, step_id: &str) -> Result<()>;

    // =========================================================================
    // Step configs
    // =========================================================================

    fn get_step_config(&self, realm: &str, config_id: &str) -> Result<StepConfig>;

    /// Attach a config to a step, returning the config id.
    fn create_step_config(
        &self,
        realm: &str,
        step_id: &str,
        draft: &StepConfigDraft,
    ) -> Result<String>;

    fn update_step_config(&self, realm: &str, config: &StepConfig) -> Result<()>;

    fn delete_step_config(&self, realm: &str, config_id: &str) -> Result<()>;

    // =========================================================================
    // Binding holders (read-only)
    // =========================================================================

    fn get_realm(&self, realm: &str) -> Result<Realm>;

    fn list_clients(&self, realm: &str) -> Result<Vec<Client>>;

    fn list_identity_providers(&self, realm: &str) -> Result<Vec<IdentityProvider>>;
}
