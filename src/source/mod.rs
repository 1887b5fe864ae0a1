//! Source plans, the generic loader executor, and catalog discovery.
//!
//! Ownership model:
//! - `SourcePlan` declares what a source needs: fetch spec, column renames,
//!   and derived-field rules.
//! - `SourceLoader` executes any plan against an injected catalog client.
//! - `DiscoveryLoader` finds one extra dataset at run time and maps it
//!   heuristically onto the same canonical shape.

/// Catalog discovery loader.
pub mod discovery;
/// Generic plan executor.
pub mod loader;
/// Declarative per-source transformation plans.
pub mod plan;
/// Built-in source plans.
pub mod registry;

pub use discovery::{DiscoveryConfig, DiscoveryLoader};
pub use loader::SourceLoader;
pub use plan::{ElapsedRule, FetchSpec, HealthRule, LabelJoin, RowFilter, SourcePlan, StatusRule};
pub use registry::builtin_plans;
