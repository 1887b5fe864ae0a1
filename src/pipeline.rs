//! One pipeline run: sources, discovery, combine, cleanup.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::catalog::CatalogClient;
use crate::combine::combine_tables;
use crate::constants::{default_target_species, output};
use crate::constants::catalog::DISCOVERY_QUERY;
use crate::errors::PipelineError;
use crate::source::{DiscoveryConfig, DiscoveryLoader, SourceLoader, SourcePlan, builtin_plans};
use crate::table::Table;
use crate::types::{SourceId, SpeciesName};

/// Pipeline settings.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Directory for checkpoints, local inputs, and the combined output.
    pub data_dir: PathBuf,
    /// Scratch directory for downloaded archives.
    pub work_dir: PathBuf,
    /// Species kept in the combined output.
    pub target_species: SpeciesName,
    /// Catalog query used by the discovery loader.
    pub discovery_query: String,
    /// Filename of the combined output inside the data directory.
    pub combined_filename: String,
    /// Whether the discovery loader runs.
    pub run_discovery: bool,
    /// Explicit plan override; `None` means the built-in registry.
    pub plans: Option<Vec<SourcePlan>>,
}

impl PipelineConfig {
    /// Create a config rooted at `data_dir` with default settings.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        let work_dir = data_dir.join("downloads");
        Self {
            data_dir,
            work_dir,
            target_species: default_target_species(),
            discovery_query: DISCOVERY_QUERY.to_string(),
            combined_filename: output::COMBINED_FILENAME.to_string(),
            run_discovery: true,
            plans: None,
        }
    }

    /// Override the scratch directory for downloads.
    pub fn with_work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        self.work_dir = work_dir.into();
        self
    }

    /// Override the target species.
    pub fn with_target_species(mut self, species: impl Into<SpeciesName>) -> Self {
        self.target_species = species.into();
        self
    }

    /// Override the discovery query.
    pub fn with_discovery_query(mut self, query: impl Into<String>) -> Self {
        self.discovery_query = query.into();
        self
    }

    /// Override the combined output filename.
    pub fn with_combined_filename(mut self, filename: impl Into<String>) -> Self {
        self.combined_filename = filename.into();
        self
    }

    /// Disable the discovery loader.
    pub fn without_discovery(mut self) -> Self {
        self.run_discovery = false;
        self
    }

    /// Replace the built-in registry with explicit plans.
    pub fn with_plans(mut self, plans: Vec<SourcePlan>) -> Self {
        self.plans = Some(plans);
        self
    }

    fn effective_plans(&self) -> Vec<SourcePlan> {
        match &self.plans {
            Some(plans) => plans.clone(),
            None => builtin_plans(&self.target_species),
        }
    }
}

/// Row counts and output location for one completed run.
#[derive(Clone, Debug)]
pub struct RunSummary {
    /// Normalized row count per source, in execution order.
    pub source_rows: Vec<(SourceId, usize)>,
    /// Rows in the combined, species-filtered output.
    pub combined_rows: usize,
    /// Path of the combined output file.
    pub output_path: PathBuf,
}

/// The full ETL pipeline, executed against an injected catalog client.
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a pipeline from settings.
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Pipeline settings.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every loader, combine, write the output, and clean up archives.
    ///
    /// A required-source failure aborts the remaining stages of this run;
    /// the next scheduled run is unaffected.
    pub fn run(&self, client: &dyn CatalogClient) -> Result<RunSummary, PipelineError> {
        fs::create_dir_all(&self.config.data_dir)?;
        fs::create_dir_all(&self.config.work_dir)?;

        let loader = SourceLoader::new(
            client,
            self.config.work_dir.as_path(),
            self.config.data_dir.as_path(),
        );
        let mut tables: Vec<Table> = Vec::new();
        let mut source_rows: Vec<(SourceId, usize)> = Vec::new();
        for plan in self.config.effective_plans() {
            let table = loader.load(&plan)?;
            source_rows.push((plan.source_id.clone(), table.len()));
            tables.push(table);
        }

        if self.config.run_discovery {
            let discovery_config =
                DiscoveryConfig::new().with_query(self.config.discovery_query.clone());
            let discovery_id = discovery_config.source_id.clone();
            let discovery = DiscoveryLoader::new(
                client,
                self.config.work_dir.as_path(),
                self.config.data_dir.as_path(),
                discovery_config,
            );
            let table = discovery.load()?;
            source_rows.push((discovery_id, table.len()));
            tables.push(table);
        }

        let combined = combine_tables(tables, &self.config.target_species);
        let output_path = self.config.data_dir.join(&self.config.combined_filename);
        combined.write_csv_file(&output_path)?;
        info!(
            "[petdata:run] wrote {} rows -> {}",
            combined.len(),
            output_path.display()
        );

        self.cleanup_archives();

        Ok(RunSummary {
            source_rows,
            combined_rows: combined.len(),
            output_path,
        })
    }

    /// Delete downloaded archives from the scratch directory, best-effort.
    fn cleanup_archives(&self) {
        for entry in WalkDir::new(&self.config.work_dir)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
        {
            if has_extension(entry.path(), "zip") {
                debug!("[petdata:run] removing archive {}", entry.path().display());
                let _ = fs::remove_file(entry.path());
            }
        }
    }
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(extension))
        .unwrap_or(false)
}
