//! Declarative transformation plans, one per configured source.
//!
//! A plan is pure data: the loader executes every source through the same
//! code path, so adding a source means adding a registry entry, not a branch.

use std::path::PathBuf;

use indexmap::IndexMap;

use crate::constants::canonical_columns;
use crate::types::{ColumnName, DatasetRef, MemberName, SourceId};

/// Where a source's table comes from.
#[derive(Clone, Debug)]
pub enum FetchSpec {
    /// A catalog dataset archive. `member` names the CSV inside the zip;
    /// `None` means the first CSV found.
    Dataset {
        /// Catalog reference in `owner/slug` form.
        dataset_ref: DatasetRef,
        /// Known CSV member name, when the archive layout is stable.
        member: Option<MemberName>,
    },
    /// A pre-staged local CSV, resolved relative to the data directory.
    LocalCsv {
        /// Relative path of the main table.
        path: PathBuf,
    },
}

/// Keep only rows whose column equals a value (trimmed, case-insensitive).
#[derive(Clone, Debug)]
pub struct RowFilter {
    /// Source column the filter reads.
    pub column: ColumnName,
    /// Lowercased value rows must match.
    pub equals: String,
}

/// Derive the `AdoptionSpeed` bucket from elapsed days between two dates.
#[derive(Clone, Debug)]
pub struct ElapsedRule {
    /// Intake/arrival date column.
    pub start_column: ColumnName,
    /// Outcome/adoption date column.
    pub end_column: ColumnName,
    /// Optional adopted flag; a zero value nulls the elapsed days, sending
    /// the row to the unresolved bucket.
    pub adopted_gate: Option<ColumnName>,
}

/// How the `Health` flag is produced.
#[derive(Clone, Debug)]
pub enum HealthRule {
    /// Coded severity field (2/3 mean unhealthy).
    Code {
        /// Source column holding the code.
        column: ColumnName,
    },
    /// Free-text condition field matched against unhealthy keywords.
    Text {
        /// Source column holding the condition text.
        column: ColumnName,
    },
    /// No health field in the source; every row defaults to healthy. This is
    /// a stated approximation, not a measured fact.
    AssumeHealthy,
}

/// How the `Adoption_Status` flag is produced.
#[derive(Clone, Debug)]
pub enum StatusRule {
    /// Collapse the `AdoptionSpeed` bucket: any bounded bucket counts as
    /// adopted.
    FromSpeed,
    /// The source carries its own status column (possibly via rename).
    PassThrough,
}

/// Resolve an ID-coded column against an auxiliary label table.
#[derive(Clone, Debug)]
pub struct LabelJoin {
    /// ID column in the main table (dropped after the join).
    pub key_column: ColumnName,
    /// Label table path, relative to the data directory.
    pub label_file: PathBuf,
    /// ID column in the label table.
    pub label_key: ColumnName,
    /// Human-readable name column in the label table.
    pub label_value: ColumnName,
    /// Canonical column receiving the resolved name.
    pub target: ColumnName,
}

/// Everything the loader needs to turn one source into canonical shape.
#[derive(Clone, Debug)]
pub struct SourcePlan {
    /// Stable source identifier used in checkpoints, logs, and errors.
    pub source_id: SourceId,
    /// Where the table comes from.
    pub fetch: FetchSpec,
    /// Whether a missing source yields an empty table instead of an error.
    pub optional: bool,
    /// Row filter applied before any derivation.
    pub prefilter: Option<RowFilter>,
    /// Label-table joins resolving ID columns to names.
    pub label_joins: Vec<LabelJoin>,
    /// Elapsed-days rule producing `AdoptionSpeed`.
    pub elapsed: Option<ElapsedRule>,
    /// Year-unit age column converted to canonical months.
    pub age_years_column: Option<ColumnName>,
    /// Health derivation rule.
    pub health: HealthRule,
    /// Status derivation rule.
    pub status: StatusRule,
    /// Source-to-canonical renames for pass-through columns.
    pub renames: IndexMap<ColumnName, ColumnName>,
    /// Columns kept in the normalized output (missing ones are skipped).
    pub keep: Vec<ColumnName>,
}

impl SourcePlan {
    /// Create a plan for a remote catalog dataset.
    pub fn remote(source_id: impl Into<SourceId>, dataset_ref: impl Into<DatasetRef>) -> Self {
        Self::new(
            source_id,
            FetchSpec::Dataset {
                dataset_ref: dataset_ref.into(),
                member: None,
            },
        )
    }

    /// Create a plan for a pre-staged local CSV.
    pub fn local(source_id: impl Into<SourceId>, path: impl Into<PathBuf>) -> Self {
        Self::new(source_id, FetchSpec::LocalCsv { path: path.into() })
    }

    fn new(source_id: impl Into<SourceId>, fetch: FetchSpec) -> Self {
        Self {
            source_id: source_id.into(),
            fetch,
            optional: false,
            prefilter: None,
            label_joins: Vec::new(),
            elapsed: None,
            age_years_column: None,
            health: HealthRule::AssumeHealthy,
            status: StatusRule::PassThrough,
            renames: IndexMap::new(),
            keep: canonical_columns(),
        }
    }

    /// Pin the CSV member inside a remote archive.
    pub fn with_member(mut self, member: impl Into<MemberName>) -> Self {
        if let FetchSpec::Dataset { member: slot, .. } = &mut self.fetch {
            *slot = Some(member.into());
        }
        self
    }

    /// Mark the source as optional: missing inputs yield an empty table.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Keep only rows where `column` equals `value` (case-insensitive).
    pub fn with_prefilter(mut self, column: impl Into<ColumnName>, value: impl Into<String>) -> Self {
        self.prefilter = Some(RowFilter {
            column: column.into(),
            equals: value.into().trim().to_lowercase(),
        });
        self
    }

    /// Derive `AdoptionSpeed` from elapsed days between two date columns.
    pub fn with_elapsed(
        mut self,
        start_column: impl Into<ColumnName>,
        end_column: impl Into<ColumnName>,
    ) -> Self {
        self.elapsed = Some(ElapsedRule {
            start_column: start_column.into(),
            end_column: end_column.into(),
            adopted_gate: None,
        });
        self
    }

    /// Null the elapsed days when the gate column is zero (never adopted).
    pub fn with_adopted_gate(mut self, column: impl Into<ColumnName>) -> Self {
        if let Some(rule) = &mut self.elapsed {
            rule.adopted_gate = Some(column.into());
        }
        self
    }

    /// Convert a year-unit age column to canonical months.
    pub fn with_age_in_years(mut self, column: impl Into<ColumnName>) -> Self {
        self.age_years_column = Some(column.into());
        self
    }

    /// Set the health derivation rule.
    pub fn with_health(mut self, health: HealthRule) -> Self {
        self.health = health;
        self
    }

    /// Set the status derivation rule.
    pub fn with_status(mut self, status: StatusRule) -> Self {
        self.status = status;
        self
    }

    /// Add source-to-canonical column renames.
    pub fn with_renames<K, V>(mut self, renames: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<ColumnName>,
        V: Into<ColumnName>,
    {
        for (from, to) in renames {
            self.renames.insert(from.into(), to.into());
        }
        self
    }

    /// Add a label-table join.
    pub fn with_label_join(
        mut self,
        key_column: impl Into<ColumnName>,
        label_file: impl Into<PathBuf>,
        label_key: impl Into<ColumnName>,
        label_value: impl Into<ColumnName>,
        target: impl Into<ColumnName>,
    ) -> Self {
        self.label_joins.push(LabelJoin {
            key_column: key_column.into(),
            label_file: label_file.into(),
            label_key: label_key.into(),
            label_value: label_value.into(),
            target: target.into(),
        });
        self
    }

    /// Override the kept-column list.
    pub fn with_keep(mut self, keep: impl IntoIterator<Item = impl Into<ColumnName>>) -> Self {
        self.keep = keep.into_iter().map(Into::into).collect();
        self
    }
}
