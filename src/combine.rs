//! The combiner: one canonical table out of many normalized sources.

use tracing::info;

use crate::constants::columns;
use crate::normalize::{coerce_numeric, normalize_type};
use crate::table::{Table, Value};
use crate::types::SpeciesName;

/// Merge per-source tables into the final combined table.
///
/// Empty tables are skipped, every canonical column is guaranteed to exist
/// (missing cells become null), numeric columns are coerced with unparseable
/// values nulled, species labels are normalized, and only rows matching
/// `target_species` survive. Output columns are the canonical seven, in
/// canonical order.
pub fn combine_tables(tables: Vec<Table>, target_species: &SpeciesName) -> Table {
    let non_empty: Vec<Table> = tables.into_iter().filter(|table| !table.is_empty()).collect();
    let sources = non_empty.len();
    let mut combined = Table::concat(non_empty);

    for column in columns::ALL {
        combined.ensure_column(column);
    }
    combined.map_column(columns::TYPE, normalize_type);
    for column in columns::NUMERIC {
        combined.map_column(column, coerce_numeric);
    }

    let target = target_species.trim().to_lowercase();
    let type_idx = combined.ensure_column(columns::TYPE);
    combined.retain_rows(|row| matches!(&row[type_idx], Value::Text(label) if *label == target));

    let combined = combined.select_existing(&columns::ALL);
    info!(
        "[petdata:combine] merged {sources} non-empty sources into {} '{target}' rows",
        combined.len()
    );
    combined
}
