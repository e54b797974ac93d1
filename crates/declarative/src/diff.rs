//! Three-way classification of desired definitions against observed resources

use crate::identity::{IdentityKey, Keyed, Observed};
use std::collections::{HashMap, HashSet};

/// Observed resources of one scope, indexed by [`IdentityKey`].
///
/// Keeps the order in which the remote platform returned the resources so
/// that removal candidates come out in a stable order.
#[derive(Debug)]
pub struct ObservedMap<'a, R> {
    scope: String,
    items: Vec<&'a R>,
    by_key: HashMap<IdentityKey, usize>,
}

impl<'a, R: Observed> ObservedMap<'a, R> {
    /// Index `resources` by their identity key within `scope`.
    ///
    /// If the platform returns two resources with the same key, the first
    /// one wins the key; the other can only ever be a removal candidate.
    pub fn new(scope: &str, resources: &'a [R]) -> Self {
        let mut by_key = HashMap::with_capacity(resources.len());
        for (idx, resource) in resources.iter().enumerate() {
            by_key.entry(resource.identity_key(scope)).or_insert(idx);
        }
        Self {
            scope: scope.to_string(),
            items: resources.iter().collect(),
            by_key,
        }
    }

    /// Look up the observed resource matching a desired item
    pub fn get<D: Keyed + ?Sized>(&self, desired: &D) -> Option<&'a R> {
        self.get_key(&desired.identity_key(&self.scope))
    }

    /// Look up an observed resource by key
    pub fn get_key(&self, key: &IdentityKey) -> Option<&'a R> {
        self.by_key.get(key).map(|&idx| self.items[idx])
    }

    /// All observed resources, in remote order
    pub fn values(&self) -> impl Iterator<Item = &'a R> + '_ {
        self.items.iter().copied()
    }
}

/// A desired item matched to the observed resource it will update.
#[derive(Debug)]
pub struct Matched<'d, 'o, D, R> {
    /// Remote id stamped onto the desired item by the match
    pub id: String,
    pub desired: &'d D,
    pub current: &'o R,
}

/// Output of [`classify`].
///
/// Every desired item is in exactly one of `inserts`/`updates`; every
/// observed item is in exactly one of `referenced`/`removals`.
#[derive(Debug)]
pub struct Classification<'d, 'o, D, R> {
    pub inserts: Vec<&'d D>,
    pub updates: Vec<Matched<'d, 'o, D, R>>,
    pub referenced: Vec<&'o R>,
    pub removals: Vec<&'o R>,
}

/// Classify desired items against observed resources.
///
/// Matching is by [`IdentityKey`] only: a renamed item shows up as one
/// insert plus one removal. Removals are computed by remote id, since they
/// are resources rather than definitions.
pub fn classify<'d, 'o, D, R>(
    desired: &'d [D],
    observed: &ObservedMap<'o, R>,
) -> Classification<'d, 'o, D, R>
where
    D: Keyed,
    R: Observed,
{
    let mut inserts = Vec::new();
    let mut updates = Vec::new();
    let mut referenced = Vec::new();
    let mut referenced_ids: HashSet<&'o str> = HashSet::new();

    for item in desired {
        match observed.get(item) {
            None => inserts.push(item),
            Some(current) => {
                if referenced_ids.insert(current.remote_id()) {
                    referenced.push(current);
                }
                updates.push(Matched {
                    id: current.remote_id().to_string(),
                    desired: item,
                    current,
                });
            }
        }
    }

    let removals = observed
        .values()
        .filter(|r| !referenced_ids.contains(r.remote_id()))
        .collect();

    Classification {
        inserts,
        updates,
        referenced,
        removals,
    }
}
