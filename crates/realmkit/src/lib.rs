//! # realmkit
//!
//! Blocking client for an identity platform's admin API, restricted to
//! what authentication-flow reconciliation needs.
//!
//! This crate provides:
//! - An observed-state model of flows, steps (executions), step configs and
//!   the realms, clients and identity providers that bind flows
//! - A [`Backend`] trait covering every remote operation used
//! - [`HttpBackend`], talking to a real server with a bearer token
//! - [`MemoryBackend`], an in-process platform with a call journal
//!
//! ## Example
//!
//! ```no_run
//! use realmkit::{Backend, HttpBackend};
//!
//! let backend = HttpBackend::new("https://sso.example.com", "token");
//! for flow in backend.list_top_level_flows("acme").expect("list flows") {
//!     println!("{} (built-in: {})", flow.alias, flow.built_in);
//! }
//! ```
//!
//! ## Errors
//!
//! Every failure maps to an [`Error`] with an [`ErrorCategory`]. Only
//! [`ErrorCategory::NotFound`] is ever treated as tolerable by callers;
//! nothing here retries.

#![warn(clippy::all)]

pub mod backend;
pub mod error;
pub mod types;

pub use backend::Backend;
pub use backend::http::HttpBackend;
pub use backend::memory::{Call, MemoryBackend};
pub use error::{Error, ErrorCategory, Result};
pub use types::{
    BASIC_FLOW, Client, ExecutionStep, Flow, FlowDraft, IdentityProvider,
    Realm, RealmFlowBindings, Requirement, StepConfig, StepConfigDraft, SubFlowDraft,
};
