//! Zip archive helpers for downloaded dataset bundles.

use std::fs::File;
use std::path::Path;

use zip::ZipArchive;

use crate::errors::PipelineError;
use crate::table::Table;
use crate::types::MemberName;

/// List the CSV members of an archive in archive order.
pub fn list_csv_members(zip_path: &Path) -> Result<Vec<MemberName>, PipelineError> {
    let mut archive = open_archive(zip_path)?;
    let mut members = Vec::new();
    for idx in 0..archive.len() {
        let member = archive.by_index(idx).map_err(|err| {
            PipelineError::Archive(format!(
                "failed reading member {idx} of {}: {err}",
                zip_path.display()
            ))
        })?;
        if member.is_file() && member.name().to_lowercase().ends_with(".csv") {
            members.push(member.name().to_string());
        }
    }
    Ok(members)
}

/// Pick the most relevant CSV member: the first whose lowercased name
/// contains one of `hints`, else the first CSV at all.
pub fn choose_csv_member(members: &[MemberName], hints: &[&str]) -> Option<MemberName> {
    members
        .iter()
        .find(|member| {
            let lowered = member.to_lowercase();
            hints.iter().any(|hint| lowered.contains(hint))
        })
        .or_else(|| members.first())
        .cloned()
}

/// Read one named CSV member into a table.
pub fn read_csv_member(zip_path: &Path, member: &str) -> Result<Table, PipelineError> {
    let mut archive = open_archive(zip_path)?;
    let entry = archive.by_name(member).map_err(|err| {
        PipelineError::Archive(format!(
            "missing member '{member}' in {}: {err}",
            zip_path.display()
        ))
    })?;
    Table::from_csv(entry)
}

fn open_archive(zip_path: &Path) -> Result<ZipArchive<File>, PipelineError> {
    let file = File::open(zip_path).map_err(|err| {
        PipelineError::Archive(format!("failed opening {}: {err}", zip_path.display()))
    })?;
    ZipArchive::new(file).map_err(|err| {
        PipelineError::Archive(format!("failed reading {}: {err}", zip_path.display()))
    })
}
