//! Reconciliation engine for realmsync
//!
//! The engine runs in two phases per batch:
//! 1. Validation - check every flow binding against the flows that will
//!    exist afterwards, without writing anything
//! 2. Reconciliation - per realm, converge each declared flow (record,
//!    steps, step configs, sibling order), then apply the removal policy
//!    to managed flows that are no longer declared
//!
//! All remote access goes through [`realmkit::Backend`]. Every write is
//! followed by a re-fetch before the next decision.

pub mod driver;
pub mod error;
pub mod executions;
pub mod flows;
pub mod projection;
pub mod validator;

pub use driver::{BatchOutcome, BatchSummary, RealmPlan, plan_realm, run_batch};
pub use validator::{ValidationReport, validate};

use declarative::{ChangeKind, ReconcileSummary, RemovalPolicy};
use realmkit::Backend;

/// Per-realm reconciliation state.
///
/// Flow-level operations live in [`flows`], step-level ones in
/// [`executions`].
pub struct Reconciler<'a, B: Backend + ?Sized> {
    backend: &'a B,
    realm: &'a str,
    policy: RemovalPolicy,
    summary: ReconcileSummary,
}

impl<'a, B: Backend + ?Sized> Reconciler<'a, B> {
    pub fn new(backend: &'a B, realm: &'a str, policy: RemovalPolicy) -> Self {
        Self {
            backend,
            realm,
            policy,
            summary: ReconcileSummary::default(),
        }
    }

    pub fn summary(&self) -> &ReconcileSummary {
        &self.summary
    }

    pub fn into_summary(self) -> ReconcileSummary {
        self.summary
    }

    fn record(&mut self, kind: ChangeKind) {
        self.summary.record(kind);
    }
}
