#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Zip archive helpers for downloaded dataset bundles.
pub mod archive;
/// Remote catalog client interfaces.
pub mod catalog;
/// Combiner that merges normalized tables.
pub mod combine;
/// Canonical columns and normalization constants.
pub mod constants;
/// Field normalization rules.
pub mod normalize;
/// Pipeline orchestration and run summaries.
pub mod pipeline;
/// Weekly schedule trigger.
pub mod schedule;
/// Source plans, the generic loader, and catalog discovery.
pub mod source;
/// Column-labeled tables and CSV encoding.
pub mod table;
/// Shared type aliases.
pub mod types;

mod errors;

pub use catalog::{CatalogClient, CatalogEntry, KaggleClient};
pub use combine::combine_tables;
pub use errors::PipelineError;
pub use pipeline::{Pipeline, PipelineConfig, RunSummary};
pub use schedule::{WeeklySchedule, next_run_after, run_weekly};
pub use source::{
    DiscoveryConfig, DiscoveryLoader, ElapsedRule, FetchSpec, HealthRule, LabelJoin, RowFilter,
    SourceLoader, SourcePlan, StatusRule, builtin_plans,
};
pub use table::{Table, Value};
pub use types::{ColumnName, DatasetRef, MemberName, SourceId, SpeciesName};
