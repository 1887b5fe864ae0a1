//! Run-time catalog discovery: one best-effort extra source per run.

use std::fs;
use std::path::PathBuf;

use indexmap::IndexMap;
use tracing::info;

use crate::archive::{choose_csv_member, list_csv_members, read_csv_member};
use crate::catalog::CatalogClient;
use crate::constants::catalog::{DISCOVERY_QUERY, FILENAME_HINTS};
use crate::constants::{canonical_columns, columns, output};
use crate::errors::PipelineError;
use crate::normalize::{
    health_from_code, health_from_text, is_numeric_column, normalize_type, truthy_status,
};
use crate::table::{Table, Value};
use crate::types::{ColumnName, SourceId};

/// Synonym table mapping lowercased source column names to canonical names.
///
/// Kept as data so coverage is enumerable; unmatched columns are dropped.
pub const COLUMN_SYNONYMS: &[(&str, &str)] = &[
    ("type", columns::TYPE),
    ("species", columns::TYPE),
    ("breed", columns::BREED),
    ("breedname", columns::BREED),
    ("age", columns::AGE),
    ("agemonths", columns::AGE),
    ("age_months", columns::AGE),
    ("ageyears", columns::AGE),
    ("age_years", columns::AGE),
    ("health", columns::HEALTH),
    ("intake condition", columns::HEALTH),
    ("adoption_status", columns::ADOPTION_STATUS),
    ("adopted", columns::ADOPTION_STATUS),
];

/// Canonical name for a source column, via the synonym table.
pub fn canonical_for(name: &str) -> Option<&'static str> {
    let lowered = name.trim().to_lowercase();
    COLUMN_SYNONYMS
        .iter()
        .find(|(synonym, _)| *synonym == lowered)
        .map(|(_, canonical)| *canonical)
}

/// Settings for the discovery loader.
#[derive(Clone, Debug)]
pub struct DiscoveryConfig {
    /// Source id used for the checkpoint, logs, and errors.
    pub source_id: SourceId,
    /// Catalog search query.
    pub query: String,
    /// Filename substrings marking an archive CSV as relevant.
    pub filename_hints: Vec<String>,
}

impl DiscoveryConfig {
    /// Default discovery settings.
    pub fn new() -> Self {
        Self {
            source_id: "catalog_discovery".to_string(),
            query: DISCOVERY_QUERY.to_string(),
            filename_hints: FILENAME_HINTS.iter().map(|hint| hint.to_string()).collect(),
        }
    }

    /// Override the search query.
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    /// Override the filename hints.
    pub fn with_filename_hints(
        mut self,
        hints: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.filename_hints = hints.into_iter().map(Into::into).collect();
        self
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Searches the catalog for a matching dataset and maps it heuristically
/// onto the canonical shape.
pub struct DiscoveryLoader<'a> {
    client: &'a dyn CatalogClient,
    work_dir: PathBuf,
    data_dir: PathBuf,
    config: DiscoveryConfig,
}

impl<'a> DiscoveryLoader<'a> {
    /// Create a discovery loader over an injected catalog client.
    pub fn new(
        client: &'a dyn CatalogClient,
        work_dir: impl Into<PathBuf>,
        data_dir: impl Into<PathBuf>,
        config: DiscoveryConfig,
    ) -> Self {
        Self {
            client,
            work_dir: work_dir.into(),
            data_dir: data_dir.into(),
            config,
        }
    }

    /// Find, download, and normalize the most recently updated match.
    ///
    /// No results and no usable CSV are non-fatal: both yield an empty
    /// canonical table. Search and download failures propagate.
    pub fn load(&self) -> Result<Table, PipelineError> {
        let entries = self.client.search(&self.config.query)?;
        let Some(latest) = entries.iter().max_by_key(|entry| entry.last_updated) else {
            info!(
                "[petdata:discovery] no datasets returned for '{}', skipping",
                self.config.query
            );
            return Ok(self.empty_table());
        };
        info!(
            "[petdata:discovery] found '{}' ({})",
            latest.title, latest.dataset_ref
        );

        let zip_path = self.client.download(&latest.dataset_ref, &self.work_dir)?;
        let members = list_csv_members(&zip_path)?;
        let hints: Vec<&str> = self
            .config
            .filename_hints
            .iter()
            .map(String::as_str)
            .collect();
        let Some(member) = choose_csv_member(&members, &hints) else {
            info!("[petdata:discovery] archive has no CSV members, skipping");
            return Ok(self.empty_table());
        };

        let table = read_csv_member(&zip_path, &member)?;
        let normalized = self.normalize(table);
        self.write_checkpoint(&normalized)?;
        info!(
            "[petdata:discovery] '{}' normalized rows={}",
            self.config.source_id,
            normalized.len()
        );
        Ok(normalized)
    }

    fn normalize(&self, mut table: Table) -> Table {
        let renames: IndexMap<ColumnName, ColumnName> = table
            .columns()
            .iter()
            .filter_map(|column| {
                canonical_for(column).map(|canonical| (column.clone(), canonical.to_string()))
            })
            .collect();
        table.rename_columns(&renames);

        let keep: Vec<&str> = columns::ALL.to_vec();
        let mut kept = table.select_existing(&keep);
        if kept.columns().is_empty() {
            info!("[petdata:discovery] no columns matched known synonyms, skipping");
            return self.empty_table();
        }

        kept.map_column(columns::TYPE, normalize_type);

        if let Some(idx) = kept.column_index(columns::HEALTH) {
            let numeric = is_numeric_column(kept.rows().iter().map(|row| &row[idx]));
            if numeric {
                kept.map_column(columns::HEALTH, |value| {
                    Value::number(health_from_code(value) as f64)
                });
            } else {
                kept.map_column(columns::HEALTH, |value| {
                    Value::number(health_from_text(value) as f64)
                });
            }
        }

        if let Some(idx) = kept.column_index(columns::ADOPTION_STATUS) {
            // Already-numeric status columns pass through untouched; text
            // encodings are collapsed to 1/0.
            let numeric = is_numeric_column(kept.rows().iter().map(|row| &row[idx]));
            if !numeric {
                kept.map_column(columns::ADOPTION_STATUS, |value| {
                    Value::number(truthy_status(value) as f64)
                });
            }
        }

        kept
    }

    fn empty_table(&self) -> Table {
        Table::new(canonical_columns())
    }

    fn write_checkpoint(&self, table: &Table) -> Result<(), PipelineError> {
        fs::create_dir_all(&self.data_dir)?;
        let path = self.data_dir.join(format!(
            "{}.{}",
            self.config.source_id,
            output::CHECKPOINT_EXTENSION
        ));
        table.write_csv_file(&path)
    }
}
