//! The generic plan executor: one code path for every configured source.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use tracing::info;

use crate::archive::{list_csv_members, read_csv_member};
use crate::catalog::CatalogClient;
use crate::constants::{columns, output};
use crate::errors::PipelineError;
use crate::normalize::{
    days_between, health_from_code, health_from_text, parse_date_permissive, speed_from_days,
    status_from_speed, years_to_months,
};
use crate::source::plan::{FetchSpec, HealthRule, SourcePlan, StatusRule};
use crate::table::{Table, Value, format_number};

/// Executes `SourcePlan`s: fetch, reshape, derive, checkpoint.
pub struct SourceLoader<'a> {
    client: &'a dyn CatalogClient,
    work_dir: PathBuf,
    data_dir: PathBuf,
}

impl<'a> SourceLoader<'a> {
    /// Create a loader over an injected catalog client.
    ///
    /// `work_dir` receives downloaded archives; `data_dir` holds pre-staged
    /// local inputs and receives per-source checkpoints.
    pub fn new(
        client: &'a dyn CatalogClient,
        work_dir: impl Into<PathBuf>,
        data_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            client,
            work_dir: work_dir.into(),
            data_dir: data_dir.into(),
        }
    }

    /// Run one plan to a normalized table.
    ///
    /// Optional sources with missing inputs produce an empty table and keep
    /// the run alive; every other fetch failure is fatal for the run.
    pub fn load(&self, plan: &SourcePlan) -> Result<Table, PipelineError> {
        let Some(mut table) = self.fetch_table(plan)? else {
            info!(
                "[petdata:source] '{}' inputs not found, continuing with empty table",
                plan.source_id
            );
            return Ok(Table::new(plan.keep.clone()));
        };

        self.apply_prefilter(plan, &mut table)?;
        self.apply_label_joins(plan, &mut table)?;
        self.apply_elapsed(plan, &mut table)?;
        self.apply_age(plan, &mut table)?;
        table.rename_columns(&plan.renames);
        self.apply_status(plan, &mut table)?;
        self.apply_health(plan, &mut table)?;

        let keep: Vec<&str> = plan.keep.iter().map(String::as_str).collect();
        let normalized = table.select_existing(&keep);

        self.write_checkpoint(plan, &normalized)?;
        info!(
            "[petdata:source] '{}' normalized rows={}",
            plan.source_id,
            normalized.len()
        );
        Ok(normalized)
    }

    fn fetch_table(&self, plan: &SourcePlan) -> Result<Option<Table>, PipelineError> {
        match &plan.fetch {
            FetchSpec::Dataset {
                dataset_ref,
                member,
            } => {
                let zip_path = self
                    .client
                    .download(dataset_ref, &self.work_dir)
                    .map_err(|err| self.unavailable(plan, err.to_string()))?;
                let member_name = match member {
                    Some(name) => name.clone(),
                    None => list_csv_members(&zip_path)
                        .map_err(|err| self.unavailable(plan, err.to_string()))?
                        .into_iter()
                        .next()
                        .ok_or_else(|| {
                            self.unavailable(plan, "archive contains no CSV".to_string())
                        })?,
                };
                let table = read_csv_member(&zip_path, &member_name)
                    .map_err(|err| self.unavailable(plan, err.to_string()))?;
                Ok(Some(table))
            }
            FetchSpec::LocalCsv { path } => {
                let mut required = vec![self.data_dir.join(path)];
                for join in &plan.label_joins {
                    required.push(self.data_dir.join(&join.label_file));
                }
                if let Some(missing) = required.iter().find(|path| !path.exists()) {
                    if plan.optional {
                        return Ok(None);
                    }
                    return Err(self.unavailable(
                        plan,
                        format!("missing local file {}", missing.display()),
                    ));
                }
                let table = Table::from_csv_file(&required[0])
                    .map_err(|err| self.unavailable(plan, err.to_string()))?;
                Ok(Some(table))
            }
        }
    }

    fn apply_prefilter(&self, plan: &SourcePlan, table: &mut Table) -> Result<(), PipelineError> {
        let Some(filter) = &plan.prefilter else {
            return Ok(());
        };
        let idx = self.require_column(plan, table, &filter.column)?;
        table.retain_rows(|row| {
            filter_text(&row[idx])
                .map(|text| text == filter.equals)
                .unwrap_or(false)
        });
        Ok(())
    }

    fn apply_label_joins(&self, plan: &SourcePlan, table: &mut Table) -> Result<(), PipelineError> {
        for join in &plan.label_joins {
            let key_idx = self.require_column(plan, table, &join.key_column)?;
            let label_path = self.data_dir.join(&join.label_file);
            let labels = Table::from_csv_file(&label_path)
                .map_err(|err| self.unavailable(plan, err.to_string()))?;
            let label_key_idx = self.require_column(plan, &labels, &join.label_key)?;
            let label_value_idx = self.require_column(plan, &labels, &join.label_value)?;

            let mut lookup: HashMap<String, Value> = HashMap::new();
            for row in labels.rows() {
                if let Some(key) = join_key(&row[label_key_idx]) {
                    lookup.insert(key, row[label_value_idx].clone());
                }
            }

            table.derive_column(&join.target, |row| {
                join_key(&row[key_idx])
                    .and_then(|key| lookup.get(&key).cloned())
                    .unwrap_or(Value::Null)
            });
            table.drop_columns(&[join.key_column.as_str()]);
        }
        Ok(())
    }

    fn apply_elapsed(&self, plan: &SourcePlan, table: &mut Table) -> Result<(), PipelineError> {
        let Some(rule) = &plan.elapsed else {
            return Ok(());
        };
        let start_idx = self.require_column(plan, table, &rule.start_column)?;
        let end_idx = self.require_column(plan, table, &rule.end_column)?;
        let gate_idx = match &rule.adopted_gate {
            Some(column) => Some(self.require_column(plan, table, column)?),
            None => None,
        };
        table.derive_column(columns::ADOPTION_SPEED, |row| {
            let mut days = days_between(
                parse_date_permissive(&row[start_idx]),
                parse_date_permissive(&row[end_idx]),
            );
            if let Some(gate_idx) = gate_idx
                && row[gate_idx].coerced_number() == Some(0.0)
            {
                days = None;
            }
            Value::number(speed_from_days(days.map(|value| value as f64)) as f64)
        });
        Ok(())
    }

    fn apply_age(&self, plan: &SourcePlan, table: &mut Table) -> Result<(), PipelineError> {
        let Some(column) = &plan.age_years_column else {
            return Ok(());
        };
        let idx = self.require_column(plan, table, column)?;
        table.derive_column(columns::AGE, |row| years_to_months(&row[idx]));
        table.drop_columns(&[column.as_str()]);
        Ok(())
    }

    fn apply_status(&self, plan: &SourcePlan, table: &mut Table) -> Result<(), PipelineError> {
        match plan.status {
            StatusRule::PassThrough => Ok(()),
            StatusRule::FromSpeed => {
                let idx = self.require_column(plan, table, columns::ADOPTION_SPEED)?;
                table.derive_column(columns::ADOPTION_STATUS, |row| {
                    Value::number(status_from_speed(row[idx].coerced_number()) as f64)
                });
                Ok(())
            }
        }
    }

    fn apply_health(&self, plan: &SourcePlan, table: &mut Table) -> Result<(), PipelineError> {
        match &plan.health {
            HealthRule::Code { column } => {
                let idx = self.require_column(plan, table, column)?;
                table.derive_column(columns::HEALTH, |row| {
                    Value::number(health_from_code(&row[idx]) as f64)
                });
            }
            HealthRule::Text { column } => {
                let idx = self.require_column(plan, table, column)?;
                table.derive_column(columns::HEALTH, |row| {
                    Value::number(health_from_text(&row[idx]) as f64)
                });
            }
            HealthRule::AssumeHealthy => {
                table.derive_column(columns::HEALTH, |_| Value::number(0.0));
            }
        }
        Ok(())
    }

    fn write_checkpoint(&self, plan: &SourcePlan, table: &Table) -> Result<(), PipelineError> {
        fs::create_dir_all(&self.data_dir)?;
        let path = self.checkpoint_path(&plan.source_id);
        table.write_csv_file(&path)
    }

    /// Checkpoint file path for a source id.
    pub fn checkpoint_path(&self, source_id: &str) -> PathBuf {
        self.data_dir
            .join(format!("{source_id}.{}", output::CHECKPOINT_EXTENSION))
    }

    fn require_column(
        &self,
        plan: &SourcePlan,
        table: &Table,
        column: &str,
    ) -> Result<usize, PipelineError> {
        table.column_index(column).ok_or_else(|| {
            PipelineError::SourceInconsistent {
                source_id: plan.source_id.clone(),
                details: format!("expected column '{column}' is missing"),
            }
        })
    }

    fn unavailable(&self, plan: &SourcePlan, reason: String) -> PipelineError {
        PipelineError::SourceUnavailable {
            source_id: plan.source_id.clone(),
            reason,
        }
    }
}

/// Canonical text used for row filtering comparisons.
fn filter_text(value: &Value) -> Option<String> {
    match value {
        Value::Text(text) => Some(text.trim().to_lowercase()),
        Value::Number(number) => Some(format_number(*number)),
        Value::Null => None,
    }
}

/// Canonical join key for label lookups: numeric IDs compare by value, text
/// IDs by trimmed content.
fn join_key(value: &Value) -> Option<String> {
    match value.coerced_number() {
        Some(number) => Some(format_number(number)),
        None => value.as_text().map(|text| text.trim().to_string()),
    }
}
