//! Observed-state model of the identity platform.
//!
//! These are snapshots of remote resources. Every one carries the remote
//! identifier and enough scope (realm, parent flow) to address it for
//! mutation. Snapshots go stale after any write; callers re-fetch.

use declarative::{Keyed, ManagedResource, Observed};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Provider id of a generic (browser-style) flow.
pub const BASIC_FLOW: &str = "basic-flow";

/// Per-step requirement level.
///
/// Newly created steps start out [`Requirement::Disabled`]; the platform
/// does not accept a requirement at creation time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Requirement {
    Required,
    Alternative,
    Conditional,
    #[default]
    Disabled,
}

impl Requirement {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Required => "REQUIRED",
            Self::Alternative => "ALTERNATIVE",
            Self::Conditional => "CONDITIONAL",
            Self::Disabled => "DISABLED",
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Requirement {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "REQUIRED" => Ok(Self::Required),
            "ALTERNATIVE" => Ok(Self::Alternative),
            "CONDITIONAL" => Ok(Self::Conditional),
            "DISABLED" => Ok(Self::Disabled),
            other => Err(format!("unknown requirement level: {other}")),
        }
    }
}

// =============================================================================
// Flows
// =============================================================================

/// An authentication flow, top-level or nested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flow {
    pub id: String,
    pub alias: String,
    pub description: String,
    pub provider_id: String,
    pub top_level: bool,
    /// Shipped with the platform; never managed by this system
    pub built_in: bool,
    /// Ownership marker stamped at creation time
    pub managed: bool,
}

impl Keyed for Flow {
    fn natural_name(&self) -> &str {
        &self.alias
    }
}

impl Observed for Flow {
    fn remote_id(&self) -> &str {
        &self.id
    }
}

impl ManagedResource for Flow {
    fn is_managed(&self) -> bool {
        self.managed && !self.built_in
    }

    /// Flows have no enabled flag; an undeclared flow is deleted or kept.
    fn is_disabled(&self) -> Option<bool> {
        None
    }
}

/// Writable fields of a flow, used for create and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowDraft {
    pub alias: String,
    pub description: String,
    pub provider_id: String,
    pub top_level: bool,
    pub managed: bool,
}

impl FlowDraft {
    /// Draft carrying the current writable fields of `flow`
    pub fn from_flow(flow: &Flow) -> Self {
        Self {
            alias: flow.alias.clone(),
            description: flow.description.clone(),
            provider_id: flow.provider_id.clone(),
            top_level: flow.top_level,
            managed: flow.managed,
        }
    }
}

/// Fields for creating a nested sub-flow step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubFlowDraft {
    pub alias: String,
    pub description: String,
    pub provider_id: String,
}

// =============================================================================
// Executions (steps)
// =============================================================================

/// One direct child of a flow: a leaf authenticator or a nested sub-flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionStep {
    pub id: String,
    /// Id of the flow this step is a direct child of
    pub parent_flow_id: String,
    pub display_name: String,
    /// Authenticator provider; `None` for sub-flows
    pub provider_id: Option<String>,
    pub requirement: Requirement,
    /// Zero-based sibling position, renumbered by the platform on every move
    pub index: usize,
    /// Set when the step is a sub-flow
    pub sub_flow_id: Option<String>,
    /// Attached secret config, if any
    pub config_id: Option<String>,
}

impl ExecutionStep {
    pub fn is_branch(&self) -> bool {
        self.sub_flow_id.is_some()
    }
}

impl Keyed for ExecutionStep {
    /// Leaves are named by provider, sub-flows by their alias (the
    /// platform reports a sub-flow's alias as its display name).
    fn natural_name(&self) -> &str {
        match (&self.sub_flow_id, &self.provider_id) {
            (None, Some(provider)) => provider.as_str(),
            _ => self.display_name.as_str(),
        }
    }
}

impl Observed for ExecutionStep {
    fn remote_id(&self) -> &str {
        &self.id
    }
}

/// Secret/config bundle attached to a leaf step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepConfig {
    pub id: String,
    pub alias: String,
    pub values: BTreeMap<String, String>,
}

/// Fields for creating a step config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepConfigDraft {
    pub alias: String,
    pub values: BTreeMap<String, String>,
}

// =============================================================================
// Binding holders (read-only)
// =============================================================================

/// Realm default-flow slots, each holding a flow alias.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealmFlowBindings {
    pub browser_flow: Option<String>,
    pub registration_flow: Option<String>,
    pub direct_grant_flow: Option<String>,
    pub reset_credentials_flow: Option<String>,
    pub client_authentication_flow: Option<String>,
    pub docker_authentication_flow: Option<String>,
}

impl RealmFlowBindings {
    /// Slot names paired with their values, in a fixed order
    pub fn slots(&self) -> [(&'static str, Option<&str>); 6] {
        [
            ("browserFlow", self.browser_flow.as_deref()),
            ("registrationFlow", self.registration_flow.as_deref()),
            ("directGrantFlow", self.direct_grant_flow.as_deref()),
            ("resetCredentialsFlow", self.reset_credentials_flow.as_deref()),
            (
                "clientAuthenticationFlow",
                self.client_authentication_flow.as_deref(),
            ),
            (
                "dockerAuthenticationFlow",
                self.docker_authentication_flow.as_deref(),
            ),
        ]
    }
}

/// A realm as far as flow bindings are concerned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Realm {
    pub name: String,
    pub bindings: RealmFlowBindings,
}

/// A client and its per-protocol flow overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: String,
    pub client_id: String,
    /// Override slot (`browser`, `direct_grant`) to flow **id**
    pub flow_overrides: BTreeMap<String, String>,
}

/// An identity broker and the flows it runs around brokered logins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityProvider {
    pub alias: String,
    pub first_broker_login_flow: Option<String>,
    pub post_broker_login_flow: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(provider: Option<&str>, sub_flow: Option<&str>) -> ExecutionStep {
        ExecutionStep {
            id: "e1".into(),
            parent_flow_id: "f1".into(),
            display_name: "Cookie".into(),
            provider_id: provider.map(String::from),
            requirement: Requirement::Alternative,
            index: 0,
            sub_flow_id: sub_flow.map(String::from),
            config_id: None,
        }
    }

    #[test]
    fn test_step_natural_name() {
        assert_eq!(step(Some("auth-cookie"), None).natural_name(), "auth-cookie");
        assert_eq!(step(None, Some("sub")).natural_name(), "Cookie");
    }

    #[test]
    fn test_requirement_parse_roundtrip() {
        for r in [
            Requirement::Required,
            Requirement::Alternative,
            Requirement::Conditional,
            Requirement::Disabled,
        ] {
            assert_eq!(r.as_str().parse::<Requirement>(), Ok(r));
        }
        assert!("maybe".parse::<Requirement>().is_err());
    }

    #[test]
    fn test_built_in_flow_is_never_managed() {
        let flow = Flow {
            id: "1".into(),
            alias: "browser".into(),
            description: String::new(),
            provider_id: BASIC_FLOW.into(),
            top_level: true,
            built_in: true,
            managed: true,
        };
        assert!(!flow.is_managed());
    }
}
