//! Admin REST API backend.
//!
//! This module provides the [`HttpBackend`] implementation, which talks to a
//! Keycloak-style admin API (`/admin/realms/{realm}/...`) with a blocking
//! `ureq` agent and a pre-issued bearer token.
//!
//! # Tokens
//!
//! Token issuance and refresh are the caller's business. A run is expected
//! to finish well within the token's lifetime.

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::types::{
    Client, ExecutionStep, Flow, FlowDraft, IdentityProvider, Realm, RealmFlowBindings,
    Requirement, StepConfig, StepConfigDraft, SubFlowDraft,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Admin REST API backend.
///
/// # Example
///
/// ```no_run
/// use realmkit::backend::Backend;
/// use realmkit::backend::http::HttpBackend;
///
/// let backend = HttpBackend::new("https://id.example.com", "eyJhbGciOi...");
/// let flows = backend.list_top_level_flows("acme").unwrap();
/// println!("Found {} flows", flows.len());
/// ```
pub struct HttpBackend {
    /// HTTP agent for requests.
    agent: ureq::Agent,
    /// Server base URL, without trailing slash.
    base_url: String,
    /// `Authorization` header value.
    bearer: String,
}

impl HttpBackend {
    /// Create a backend for `base_url` authenticating with `token`.
    pub fn new(base_url: impl Into<String>, token: &str) -> Self {
        Self::with_agent(ureq::Agent::new_with_defaults(), base_url, token)
    }

    /// Create a backend with a preconfigured agent (proxy, TLS, timeouts).
    pub fn with_agent(agent: ureq::Agent, base_url: impl Into<String>, token: &str) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            agent,
            base_url,
            bearer: format!("Bearer {token}"),
        }
    }

    /// Get the server base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn realm_url(&self, realm: &str) -> String {
        format!("{}/admin/realms/{}", self.base_url, urlencoding::encode(realm))
    }

    fn auth_url(&self, realm: &str, path: &str) -> String {
        format!("{}/authentication/{}", self.realm_url(realm), path)
    }

    fn flow_executions_url(&self, realm: &str, flow_alias: &str) -> String {
        self.auth_url(
            realm,
            &format!("flows/{}/executions", urlencoding::encode(flow_alias)),
        )
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str, kind: &'static str, id: &str) -> Result<T> {
        log::trace!("GET {url}");
        let mut response = check(
            self.agent
                .get(url)
                .header("Authorization", self.bearer.as_str())
                .header("Accept", "application/json")
                .call(),
            kind,
            id,
        )?;
        response
            .body_mut()
            .read_json::<T>()
            .map_err(|e| Error::InvalidResponse(e.to_string()))
    }

    fn post_for_id<B: Serialize>(
        &self,
        url: &str,
        body: &B,
        kind: &'static str,
        id: &str,
    ) -> Result<String> {
        log::trace!("POST {url}");
        let response = check(
            self.agent
                .post(url)
                .header("Authorization", self.bearer.as_str())
                .send_json(body),
            kind,
            id,
        )?;
        created_id(&response)
    }

    fn post_empty(&self, url: &str, kind: &'static str, id: &str) -> Result<()> {
        log::trace!("POST {url}");
        check(
            self.agent
                .post(url)
                .header("Authorization", self.bearer.as_str())
                .send_empty(),
            kind,
            id,
        )?;
        Ok(())
    }

    fn put_json<B: Serialize>(&self, url: &str, body: &B, kind: &'static str, id: &str) -> Result<()> {
        log::trace!("PUT {url}");
        check(
            self.agent
                .put(url)
                .header("Authorization", self.bearer.as_str())
                .send_json(body),
            kind,
            id,
        )?;
        Ok(())
    }

    fn delete(&self, url: &str, kind: &'static str, id: &str) -> Result<()> {
        log::trace!("DELETE {url}");
        check(
            self.agent
                .delete(url)
                .header("Authorization", self.bearer.as_str())
                .call(),
            kind,
            id,
        )?;
        Ok(())
    }
}

impl Backend for HttpBackend {
    fn list_top_level_flows(&self, realm: &str) -> Result<Vec<Flow>> {
        let flows: Vec<FlowRepresentation> =
            self.get_json(&self.auth_url(realm, "flows"), "realm", realm)?;
        flows.into_iter().map(TryInto::try_into).collect()
    }

    fn get_flow(&self, realm: &str, id: &str) -> Result<Flow> {
        let url = self.auth_url(realm, &format!("flows/{}", urlencoding::encode(id)));
        self.get_json::<FlowRepresentation>(&url, "flow", id)?
            .try_into()
    }

    fn create_flow(&self, realm: &str, draft: &FlowDraft) -> Result<String> {
        let body = FlowRepresentation::from_draft(None, draft);
        self.post_for_id(&self.auth_url(realm, "flows"), &body, "flow", &draft.alias)
    }

    fn update_flow(&self, realm: &str, id: &str, draft: &FlowDraft) -> Result<()> {
        let url = self.auth_url(realm, &format!("flows/{}", urlencoding::encode(id)));
        let body = FlowRepresentation::from_draft(Some(id), draft);
        self.put_json(&url, &body, "flow", id)
    }

    fn delete_flow(&self, realm: &str, id: &str) -> Result<()> {
        let url = self.auth_url(realm, &format!("flows/{}", urlencoding::encode(id)));
        self.delete(&url, "flow", id)
    }

    fn list_children(&self, realm: &str, flow: &Flow) -> Result<Vec<ExecutionStep>> {
        let url = self.flow_executions_url(realm, &flow.alias);
        let all: Vec<ExecutionInfo> = self.get_json(&url, "flow", &flow.alias)?;

        // The platform returns the whole subtree flattened; keep direct children.
        let mut children = all
            .into_iter()
            .filter(|e| e.level == 0)
            .map(|e| e.into_step(&flow.id))
            .collect::<Result<Vec<_>>>()?;
        children.sort_by_key(|s| s.index);
        Ok(children)
    }

    fn create_leaf_step(&self, realm: &str, parent: &Flow, provider_id: &str) -> Result<String> {
        let url = format!("{}/execution", self.flow_executions_url(realm, &parent.alias));
        let body = NewExecution {
            provider: provider_id,
        };
        self.post_for_id(&url, &body, "flow", &parent.alias)
    }

    fn create_branch_step(
        &self,
        realm: &str,
        parent: &Flow,
        draft: &SubFlowDraft,
    ) -> Result<String> {
        let url = format!("{}/flow", self.flow_executions_url(realm, &parent.alias));
        let body = NewSubFlow {
            alias: &draft.alias,
            kind: &draft.provider_id,
            description: &draft.description,
        };
        self.post_for_id(&url, &body, "flow", &parent.alias)
    }

    fn update_step(&self, realm: &str, parent: &Flow, step: &ExecutionStep) -> Result<()> {
        let url = self.flow_executions_url(realm, &parent.alias);
        let body = ExecutionUpdate {
            id: &step.id,
            requirement: step.requirement,
        };
        self.put_json(&url, &body, "execution", &step.id)
    }

    fn delete_step(&self, realm: &str, step_id: &str) -> Result<()> {
        let url = self.auth_url(realm, &format!("executions/{}", urlencoding::encode(step_id)));
        self.delete(&url, "execution", step_id)
    }

    fn raise_priority(&self, realm: &str, step_id: &str) -> Result<()> {
        let url = self.auth_url(
            realm,
            &format!("executions/{}/raise-priority", urlencoding::encode(step_id)),
        );
        self.post_empty(&url, "execution", step_id)
    }

    fn get_step_config(&self, realm: &str, config_id: &str) -> Result<StepConfig> {
        let url = self.auth_url(realm, &format!("config/{}", urlencoding::encode(config_id)));
        let config: ConfigRepresentation = self.get_json(&url, "config", config_id)?;
        Ok(StepConfig {
            id: config.id.unwrap_or_else(|| config_id.to_string()),
            alias: config.alias,
            values: config.config,
        })
    }

    fn create_step_config(
        &self,
        realm: &str,
        step_id: &str,
        draft: &StepConfigDraft,
    ) -> Result<String> {
        let url = self.auth_url(
            realm,
            &format!("executions/{}/config", urlencoding::encode(step_id)),
        );
        let body = ConfigRepresentation {
            id: None,
            alias: draft.alias.clone(),
            config: draft.values.clone(),
        };
        self.post_for_id(&url, &body, "execution", step_id)
    }

    fn update_step_config(&self, realm: &str, config: &StepConfig) -> Result<()> {
        let url = self.auth_url(realm, &format!("config/{}", urlencoding::encode(&config.id)));
        let body = ConfigRepresentation {
            id: Some(config.id.clone()),
            alias: config.alias.clone(),
            config: config.values.clone(),
        };
        self.put_json(&url, &body, "config", &config.id)
    }

    fn delete_step_config(&self, realm: &str, config_id: &str) -> Result<()> {
        let url = self.auth_url(realm, &format!("config/{}", urlencoding::encode(config_id)));
        self.delete(&url, "config", config_id)
    }

    fn get_realm(&self, realm: &str) -> Result<Realm> {
        let rep: RealmRepresentation = self.get_json(&self.realm_url(realm), "realm", realm)?;
        Ok(Realm {
            name: rep.realm,
            bindings: RealmFlowBindings {
                browser_flow: rep.browser_flow,
                registration_flow: rep.registration_flow,
                direct_grant_flow: rep.direct_grant_flow,
                reset_credentials_flow: rep.reset_credentials_flow,
                client_authentication_flow: rep.client_authentication_flow,
                docker_authentication_flow: rep.docker_authentication_flow,
            },
        })
    }

    fn list_clients(&self, realm: &str) -> Result<Vec<Client>> {
        let url = format!("{}/clients", self.realm_url(realm));
        let clients: Vec<ClientRepresentation> = self.get_json(&url, "realm", realm)?;
        Ok(clients
            .into_iter()
            .map(|c| Client {
                id: c.id,
                client_id: c.client_id,
                flow_overrides: c.authentication_flow_binding_overrides,
            })
            .collect())
    }

    fn list_identity_providers(&self, realm: &str) -> Result<Vec<IdentityProvider>> {
        let url = format!("{}/identity-provider/instances", self.realm_url(realm));
        let providers: Vec<IdentityProviderRepresentation> = self.get_json(&url, "realm", realm)?;
        Ok(providers
            .into_iter()
            .map(|p| IdentityProvider {
                alias: p.alias,
                first_broker_login_flow: p.first_broker_login_flow_alias,
                post_broker_login_flow: p.post_broker_login_flow_alias,
            })
            .collect())
    }
}

/// Map a ureq outcome, resolving error statuses against the addressed resource.
fn check<T>(result: std::result::Result<T, ureq::Error>, kind: &'static str, id: &str) -> Result<T> {
    result.map_err(|err| match err {
        ureq::Error::StatusCode(code) => Error::from_status(code, kind, id),
        other => other.into(),
    })
}

/// Extract the new resource's id from the `Location` header of a 201.
fn created_id(response: &ureq::http::Response<ureq::Body>) -> Result<String> {
    response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .and_then(|location| location.trim_end_matches('/').rsplit('/').next())
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| Error::InvalidResponse("created resource without Location header".into()))
}

// =============================================================================
// Wire representations
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FlowRepresentation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    alias: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    provider_id: String,
    #[serde(default)]
    top_level: bool,
    #[serde(default)]
    built_in: bool,
}

impl FlowRepresentation {
    fn from_draft(id: Option<&str>, draft: &FlowDraft) -> Self {
        Self {
            id: id.map(String::from),
            alias: draft.alias.clone(),
            description: Some(draft.description.clone()),
            provider_id: draft.provider_id.clone(),
            top_level: draft.top_level,
            built_in: false,
        }
    }
}

impl TryFrom<FlowRepresentation> for Flow {
    type Error = Error;

    fn try_from(rep: FlowRepresentation) -> Result<Self> {
        let id = rep
            .id
            .ok_or_else(|| Error::InvalidResponse(format!("flow '{}' without id", rep.alias)))?;
        // Flows carry no attribute bag; every non-built-in flow is ours
        let managed = !rep.built_in;
        Ok(Self {
            id,
            alias: rep.alias,
            description: rep.description.unwrap_or_default(),
            provider_id: rep.provider_id,
            top_level: rep.top_level,
            built_in: rep.built_in,
            managed,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExecutionInfo {
    id: String,
    #[serde(default)]
    requirement: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    provider_id: Option<String>,
    #[serde(default)]
    authentication_flow: bool,
    #[serde(default)]
    flow_id: Option<String>,
    #[serde(default)]
    authentication_config: Option<String>,
    #[serde(default)]
    level: usize,
    #[serde(default)]
    index: usize,
}

impl ExecutionInfo {
    fn into_step(self, parent_flow_id: &str) -> Result<ExecutionStep> {
        let requirement = match self.requirement.as_deref() {
            Some(raw) => raw.parse::<Requirement>().map_err(Error::InvalidResponse)?,
            None => Requirement::Disabled,
        };
        let sub_flow_id = if self.authentication_flow {
            Some(self.flow_id.ok_or_else(|| {
                Error::InvalidResponse(format!("sub-flow execution {} without flowId", self.id))
            })?)
        } else {
            None
        };
        Ok(ExecutionStep {
            display_name: self
                .display_name
                .or_else(|| self.provider_id.clone())
                .unwrap_or_default(),
            id: self.id,
            parent_flow_id: parent_flow_id.to_string(),
            provider_id: if sub_flow_id.is_some() {
                None
            } else {
                self.provider_id
            },
            requirement,
            index: self.index,
            sub_flow_id,
            config_id: self.authentication_config,
        })
    }
}

#[derive(Debug, Serialize)]
struct NewExecution<'a> {
    provider: &'a str,
}

#[derive(Debug, Serialize)]
struct NewSubFlow<'a> {
    alias: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
    description: &'a str,
}

#[derive(Debug, Serialize)]
struct ExecutionUpdate<'a> {
    id: &'a str,
    requirement: Requirement,
}

#[derive(Debug, Serialize, Deserialize)]
struct ConfigRepresentation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    alias: String,
    #[serde(default)]
    config: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RealmRepresentation {
    realm: String,
    browser_flow: Option<String>,
    registration_flow: Option<String>,
    direct_grant_flow: Option<String>,
    reset_credentials_flow: Option<String>,
    client_authentication_flow: Option<String>,
    docker_authentication_flow: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClientRepresentation {
    id: String,
    client_id: String,
    #[serde(default)]
    authentication_flow_binding_overrides: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentityProviderRepresentation {
    alias: String,
    first_broker_login_flow_alias: Option<String>,
    post_broker_login_flow_alias: Option<String>,
}
