//! Ownership and removal policy for observed resources
//!
//! Resources created by this system carry an ownership marker. Only those
//! may be mutated or removed; everything else (built-ins, resources created
//! by hand or by other tools) is left alone.

use serde::{Deserialize, Serialize};

/// Attribute key under which the ownership marker is persisted remotely.
///
/// Structural comparison of attribute maps always skips this key.
pub const MANAGED_MARKER_KEY: &str = "realmsync.managed";

/// An observed resource subject to the managed-resource policy.
pub trait ManagedResource {
    /// Whether this system owns the resource
    fn is_managed(&self) -> bool;

    /// Disabled state, or `None` if the resource kind cannot be disabled
    fn is_disabled(&self) -> Option<bool> {
        None
    }
}

/// What to do with a resource that is no longer declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemovalDecision {
    /// Hard delete
    Delete,
    /// Soft removal: disable and leave in place
    Disable,
    /// Already disabled, nothing to do
    AlreadyDisabled,
    /// Managed, but neither deletable under this policy nor disableable
    Retain,
    /// Not owned by this system; never touched
    Unmanaged,
}

impl RemovalDecision {
    /// Whether carrying out this decision writes to the remote platform
    pub fn is_mutation(self) -> bool {
        matches!(self, Self::Delete | Self::Disable)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Delete => "delete",
            Self::Disable => "disable",
            Self::AlreadyDisabled => "already disabled",
            Self::Retain => "retain",
            Self::Unmanaged => "unmanaged",
        }
    }
}

/// Batch-wide removal policy.
///
/// Hard deletion is opt-in so that an incomplete configuration snapshot
/// (one file of a multi-file deployment) cannot destroy what it simply
/// did not mention.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovalPolicy {
    pub delete_managed_resources_when_removed: bool,
}

impl RemovalPolicy {
    pub fn new(delete_managed_resources_when_removed: bool) -> Self {
        Self {
            delete_managed_resources_when_removed,
        }
    }

    /// Decide what happens to an undeclared resource
    pub fn decide<R: ManagedResource + ?Sized>(&self, resource: &R) -> RemovalDecision {
        if !resource.is_managed() {
            return RemovalDecision::Unmanaged;
        }
        if self.delete_managed_resources_when_removed {
            return RemovalDecision::Delete;
        }
        match resource.is_disabled() {
            Some(true) => RemovalDecision::AlreadyDisabled,
            Some(false) => RemovalDecision::Disable,
            None => RemovalDecision::Retain,
        }
    }
}
