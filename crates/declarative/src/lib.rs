//! # Declarative
//!
//! Generic building blocks for reconciling declared state against
//! observed state.
//!
//! ## Core Concepts
//!
//! - **IdentityKey**: case-insensitive `(scope, name)` join key between a
//!   definition and a resource
//! - **classify**: three-way split of desired items into inserts and
//!   updates, and of observed items into referenced and removals
//! - **RemovalPolicy**: ownership marker check plus hard-delete vs
//!   soft-disable decision for undeclared resources
//! - **compare / is_unchanged**: structural, order-aware dirty check with
//!   human-readable change lines
//!
//! ## Example
//!
//! ```
//! use declarative::{classify, Keyed, Observed, ObservedMap};
//!
//! struct Wanted(&'static str);
//! impl Keyed for Wanted {
//!     fn natural_name(&self) -> &str { self.0 }
//! }
//!
//! struct Live { id: &'static str, name: &'static str }
//! impl Keyed for Live {
//!     fn natural_name(&self) -> &str { self.name }
//! }
//! impl Observed for Live {
//!     fn remote_id(&self) -> &str { self.id }
//! }
//!
//! let live = [Live { id: "1", name: "Browser" }, Live { id: "2", name: "old" }];
//! let map = ObservedMap::new("acme", &live);
//! let plan = classify(&[Wanted("browser"), Wanted("new")], &map);
//!
//! assert_eq!(plan.inserts.len(), 1);
//! assert_eq!(plan.updates[0].id, "1");
//! assert_eq!(plan.removals[0].id, "2");
//! ```

pub mod diff;
pub mod equality;
pub mod identity;
pub mod policy;
pub mod types;

// Re-export main types at crate root
pub use diff::{Classification, Matched, ObservedMap, classify};
pub use equality::{Change, Shape, Shaped, compare, is_unchanged};
pub use identity::{IdentityKey, Keyed, Observed};
pub use policy::{MANAGED_MARKER_KEY, ManagedResource, RemovalDecision, RemovalPolicy};
pub use types::{ChangeKind, ReconcileSummary};
