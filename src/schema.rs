//! Definition file schema
//!
//! A definition file describes one realm: the authentication flows it
//! should contain and, optionally, the bindings that reference them.
//!
//! ```toml
//! realm = "acme"
//!
//! [bindings]
//! browser_flow = "login"
//!
//! [[flows]]
//! alias = "login"
//! description = "Cookie, then password form"
//!
//! [[flows.steps]]
//! type = "authenticator"
//! provider_id = "auth-cookie"
//! requirement = "ALTERNATIVE"
//!
//! [[flows.steps]]
//! type = "sub_flow"
//! alias = "login-forms"
//! requirement = "ALTERNATIVE"
//!
//! [[flows.steps.steps]]
//! type = "authenticator"
//! provider_id = "auth-username-password-form"
//! requirement = "REQUIRED"
//! ```

use declarative::Keyed;
use realmkit::{BASIC_FLOW, RealmFlowBindings, Requirement};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Realm
// ============================================================================

/// Desired state of one realm.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealmDefinition {
    pub realm: String,

    #[serde(default)]
    pub flows: Vec<FlowDefinition>,

    /// Realm default-flow slots, by flow alias
    #[serde(default)]
    pub bindings: RealmFlowBindings,

    #[serde(default)]
    pub clients: Vec<ClientDefinition>,

    #[serde(default)]
    pub identity_providers: Vec<IdentityProviderDefinition>,
}

impl RealmDefinition {
    /// Fold a later definition of the same realm into this one.
    ///
    /// Lists concatenate; a binding slot set by `other` overrides ours.
    pub fn merge(&mut self, other: Self) {
        self.flows.extend(other.flows);
        self.clients.extend(other.clients);
        self.identity_providers.extend(other.identity_providers);

        let b = other.bindings;
        let slots = [
            (&mut self.bindings.browser_flow, b.browser_flow),
            (&mut self.bindings.registration_flow, b.registration_flow),
            (&mut self.bindings.direct_grant_flow, b.direct_grant_flow),
            (
                &mut self.bindings.reset_credentials_flow,
                b.reset_credentials_flow,
            ),
            (
                &mut self.bindings.client_authentication_flow,
                b.client_authentication_flow,
            ),
            (
                &mut self.bindings.docker_authentication_flow,
                b.docker_authentication_flow,
            ),
        ];
        for (slot, value) in slots {
            if value.is_some() {
                *slot = value;
            }
        }
    }

    /// Number every step list from declaration order
    pub fn assign_positions(&mut self) {
        for flow in &mut self.flows {
            assign_positions(&mut flow.steps);
        }
    }
}

// ============================================================================
// Flows and steps
// ============================================================================

fn default_flow_provider() -> String {
    BASIC_FLOW.to_string()
}

/// Desired state of a top-level authentication flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowDefinition {
    pub alias: String,

    #[serde(default)]
    pub description: String,

    /// `basic-flow` or `client-flow`
    #[serde(default = "default_flow_provider")]
    pub provider_id: String,

    #[serde(default)]
    pub steps: Vec<StepDefinition>,
}

impl Keyed for FlowDefinition {
    fn natural_name(&self) -> &str {
        &self.alias
    }
}

/// One step of a flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepDefinition {
    /// Leaf authenticator
    Authenticator(AuthenticatorStep),
    /// Nested sub-flow with its own ordered children
    SubFlow(SubFlowStep),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatorStep {
    pub provider_id: String,

    #[serde(default)]
    pub requirement: Requirement,

    #[serde(default)]
    pub config: Option<StepConfigDefinition>,

    /// Zero-based declaration order among siblings
    #[serde(skip)]
    pub position: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubFlowStep {
    pub alias: String,

    #[serde(default)]
    pub description: String,

    /// `basic-flow` or `form-flow`
    #[serde(default = "default_flow_provider")]
    pub provider_id: String,

    #[serde(default)]
    pub requirement: Requirement,

    #[serde(default)]
    pub steps: Vec<StepDefinition>,

    /// Zero-based declaration order among siblings
    #[serde(skip)]
    pub position: usize,
}

/// Key/value bundle attached to an authenticator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepConfigDefinition {
    pub alias: String,

    #[serde(default)]
    pub values: BTreeMap<String, String>,
}

impl StepDefinition {
    pub fn position(&self) -> usize {
        match self {
            Self::Authenticator(step) => step.position,
            Self::SubFlow(step) => step.position,
        }
    }

    pub fn requirement(&self) -> Requirement {
        match self {
            Self::Authenticator(step) => step.requirement,
            Self::SubFlow(step) => step.requirement,
        }
    }

    fn set_position(&mut self, position: usize) {
        match self {
            Self::Authenticator(step) => step.position = position,
            Self::SubFlow(step) => step.position = position,
        }
    }
}

impl Keyed for StepDefinition {
    fn natural_name(&self) -> &str {
        match self {
            Self::Authenticator(step) => &step.provider_id,
            Self::SubFlow(step) => &step.alias,
        }
    }
}

/// Number `steps` (and all nested children) from declaration order
pub fn assign_positions(steps: &mut [StepDefinition]) {
    for (position, step) in steps.iter_mut().enumerate() {
        step.set_position(position);
        if let StepDefinition::SubFlow(sub) = step {
            assign_positions(&mut sub.steps);
        }
    }
}

// ============================================================================
// Binding holders
// ============================================================================

/// Flow overrides declared for a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientDefinition {
    pub client_id: String,

    /// Override slot (`browser`, `direct_grant`) to flow alias
    #[serde(default)]
    pub flow_overrides: BTreeMap<String, String>,
}

impl Keyed for ClientDefinition {
    fn natural_name(&self) -> &str {
        &self.client_id
    }
}

/// Flow bindings declared for an identity broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityProviderDefinition {
    pub alias: String,

    #[serde(default)]
    pub first_broker_login_flow: Option<String>,

    #[serde(default)]
    pub post_broker_login_flow: Option<String>,
}

impl Keyed for IdentityProviderDefinition {
    fn natural_name(&self) -> &str {
        &self.alias
    }
}

// ============================================================================
// Tests
// ============================================================================
