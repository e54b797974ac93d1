//! Structural projections for the dirty check
//!
//! Definitions and remote state are both lowered to [`Shape`]s. Remote
//! steps are first projected back into definitions (fetching configs and
//! nested children), so the comparison is definition against definition.
//! Positions are never part of a shape: order is carried by list position.

use crate::schema::{
    AuthenticatorStep, FlowDefinition, StepConfigDefinition, StepDefinition, SubFlowStep,
};
use declarative::{Shape, Shaped};
use realmkit::{Backend, ExecutionStep, Flow, Result};

impl Shaped for StepConfigDefinition {
    fn shape(&self) -> Shape {
        Shape::record([
            ("alias", Shape::from(&self.alias)),
            ("values", Shape::text_map(&self.values)),
        ])
    }
}

impl Shaped for StepDefinition {
    fn shape(&self) -> Shape {
        match self {
            Self::Authenticator(step) => Shape::record([
                ("type", Shape::from("authenticator")),
                ("provider_id", Shape::from(&step.provider_id)),
                ("requirement", Shape::from(step.requirement.as_str())),
                ("config", step.config.as_ref().map_or(Shape::Null, Shaped::shape)),
            ]),
            Self::SubFlow(step) => Shape::record([
                ("type", Shape::from("sub_flow")),
                ("alias", Shape::from(&step.alias)),
                ("description", Shape::from(&step.description)),
                ("provider_id", Shape::from(&step.provider_id)),
                ("requirement", Shape::from(step.requirement.as_str())),
                ("steps", Shape::list(&step.steps)),
            ]),
        }
    }
}

impl Shaped for FlowDefinition {
    fn shape(&self) -> Shape {
        Shape::record([
            ("alias", Shape::from(&self.alias)),
            ("description", Shape::from(&self.description)),
            ("provider_id", Shape::from(&self.provider_id)),
            ("steps", Shape::list(&self.steps)),
        ])
    }
}

/// Shape of a flow record without its steps
pub fn flow_header(alias: &str, description: &str, provider_id: &str) -> Shape {
    Shape::record([
        ("alias", Shape::from(alias)),
        ("description", Shape::from(description)),
        ("provider_id", Shape::from(provider_id)),
    ])
}

/// Fetch a step's config as a definition; a dangling config id reads as none
pub fn project_config<B: Backend + ?Sized>(
    backend: &B,
    realm: &str,
    step: &ExecutionStep,
) -> Result<Option<StepConfigDefinition>> {
    let Some(config_id) = &step.config_id else {
        return Ok(None);
    };
    match backend.get_step_config(realm, config_id) {
        Ok(config) => Ok(Some(StepConfigDefinition {
            alias: config.alias,
            values: config.values,
        })),
        Err(err) if err.is_not_found() => {
            log::debug!("Config {config_id} of step {} is gone", step.id);
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

/// Project a remote step (and, for sub-flows, its whole subtree)
pub fn project_step<B: Backend + ?Sized>(
    backend: &B,
    realm: &str,
    step: &ExecutionStep,
) -> Result<StepDefinition> {
    match (&step.sub_flow_id, &step.provider_id) {
        (None, Some(provider_id)) => Ok(StepDefinition::Authenticator(AuthenticatorStep {
            provider_id: provider_id.clone(),
            requirement: step.requirement,
            config: project_config(backend, realm, step)?,
            position: step.index,
        })),
        (Some(sub_flow_id), _) => {
            let sub = backend.get_flow(realm, sub_flow_id)?;
            Ok(StepDefinition::SubFlow(SubFlowStep {
                alias: sub.alias.clone(),
                description: sub.description.clone(),
                provider_id: sub.provider_id.clone(),
                requirement: step.requirement,
                steps: project_children(backend, realm, &sub)?,
                position: step.index,
            }))
        }
        (None, None) => Err(realmkit::Error::InvalidResponse(format!(
            "step {} has neither a provider nor a sub-flow",
            step.id
        ))),
    }
}

/// Project all direct children of `flow`, in remote order
pub fn project_children<B: Backend + ?Sized>(
    backend: &B,
    realm: &str,
    flow: &Flow,
) -> Result<Vec<StepDefinition>> {
    backend
        .list_children(realm, flow)?
        .iter()
        .map(|child| project_step(backend, realm, child))
        .collect()
}

/// Project a top-level flow with its full step tree
pub fn project_flow<B: Backend + ?Sized>(
    backend: &B,
    realm: &str,
    flow: &Flow,
) -> Result<FlowDefinition> {
    Ok(FlowDefinition {
        alias: flow.alias.clone(),
        description: flow.description.clone(),
        provider_id: flow.provider_id.clone(),
        steps: project_children(backend, realm, flow)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::{compare, is_unchanged};
    use realmkit::{MemoryBackend, Requirement};
    use std::collections::BTreeMap;

    fn leaf(provider: &str, requirement: Requirement) -> StepDefinition {
        StepDefinition::Authenticator(AuthenticatorStep {
            provider_id: provider.into(),
            requirement,
            config: None,
            position: 0,
        })
    }

    #[test]
    fn test_position_is_not_compared() {
        let a = leaf("auth-cookie", Requirement::Required);
        let mut b = a.clone();
        if let StepDefinition::Authenticator(step) = &mut b {
            step.position = 7;
        }
        assert!(is_unchanged(&a, &b));
    }

    #[test]
    fn test_dirty_check_is_symmetric() {
        let a = leaf("auth-cookie", Requirement::Required);
        let b = leaf("auth-cookie", Requirement::Alternative);
        assert!(!is_unchanged(&a, &b));
        assert!(!is_unchanged(&b, &a));
        assert!(is_unchanged(&a, &a.clone()));

        let changes = compare(&a, &b);
        assert_eq!(changes.len(), 1);
        assert_eq!(
            changes[0].to_string(),
            r#"requirement changed from "REQUIRED" to "ALTERNATIVE""#
        );
    }

    #[test]
    fn test_config_presence_is_a_change() {
        let bare = leaf("auth-otp-form", Requirement::Required);
        let mut configured = bare.clone();
        if let StepDefinition::Authenticator(step) = &mut configured {
            step.config = Some(StepConfigDefinition {
                alias: "otp".into(),
                values: BTreeMap::from([("digits".to_string(), "6".to_string())]),
            });
        }
        let changes = compare(&bare, &configured);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].path, "config");
    }

    #[test]
    fn test_projection_roundtrips_remote_tree() {
        let backend = MemoryBackend::with_realm("acme");
        let flow_id = backend.seed_flow("acme", "login", true, false).unwrap();
        let otp = backend
            .seed_leaf("acme", &flow_id, "auth-otp-form", Requirement::Required)
            .unwrap();
        backend
            .seed_config("acme", &otp, "otp", &[("digits", "6")])
            .unwrap();
        let sub = backend
            .seed_branch("acme", &flow_id, "forms", Requirement::Alternative)
            .unwrap();
        backend
            .seed_leaf("acme", &sub, "auth-cookie", Requirement::Required)
            .unwrap();

        let flow = backend.get_flow("acme", &flow_id).unwrap();
        let projected = project_flow(&backend, "acme", &flow).unwrap();

        assert_eq!(projected.steps.len(), 2);
        let StepDefinition::SubFlow(forms) = &projected.steps[1] else {
            panic!("expected sub-flow");
        };
        assert_eq!(forms.alias, "forms");
        assert_eq!(forms.position, 1);
        assert_eq!(forms.steps.len(), 1);
        let StepDefinition::Authenticator(first) = &projected.steps[0] else {
            panic!("expected authenticator");
        };
        assert_eq!(first.config.as_ref().unwrap().alias, "otp");
    }
}
