//! Identity keys for matching desired definitions to observed resources

use serde::{Deserialize, Serialize};
use std::fmt;

/// Case-insensitive composite of a scope and a natural name.
///
/// The scope is whatever a name is unique within: a realm for top-level
/// flows, the parent flow id for steps. Two keys are equal when
/// `uppercase(scope + ":" + name)` is equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IdentityKey(String);

impl IdentityKey {
    /// Build a key from a scope and a natural name
    pub fn new(scope: &str, name: &str) -> Self {
        Self(format!("{scope}:{name}").to_uppercase())
    }

    /// The normalized key text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Anything addressable by a natural name within a scope.
///
/// Implemented by both definitions (desired state) and resources
/// (observed state) so the two sides can be joined on [`IdentityKey`].
pub trait Keyed {
    /// Natural name, e.g. a flow alias or a step's display name
    fn natural_name(&self) -> &str;

    /// Identity key of this item within `scope`
    fn identity_key(&self, scope: &str) -> IdentityKey {
        IdentityKey::new(scope, self.natural_name())
    }
}

/// An observed resource, which always carries a remote identifier.
pub trait Observed: Keyed {
    /// Identifier assigned by the remote platform
    fn remote_id(&self) -> &str;
}
