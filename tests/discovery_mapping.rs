use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tempfile::tempdir;
use zip::CompressionMethod;
use zip::write::FileOptions;

use petdata::{
    CatalogClient, CatalogEntry, DiscoveryConfig, DiscoveryLoader, PipelineError, Value,
};

#[derive(Default)]
struct FakeCatalog {
    entries: Vec<CatalogEntry>,
    archives: HashMap<String, Vec<u8>>,
}

impl FakeCatalog {
    fn new() -> Self {
        Self::default()
    }

    fn with_dataset(
        mut self,
        dataset_ref: &str,
        last_updated: &str,
        members: &[(&str, &str)],
    ) -> Self {
        self.entries.push(CatalogEntry {
            dataset_ref: dataset_ref.to_string(),
            title: dataset_ref.to_string(),
            last_updated: last_updated
                .parse::<DateTime<Utc>>()
                .expect("fixture timestamp"),
        });
        self.archives
            .insert(dataset_ref.to_string(), zip_bytes(members));
        self
    }
}

impl CatalogClient for FakeCatalog {
    fn search(&self, _query: &str) -> Result<Vec<CatalogEntry>, PipelineError> {
        Ok(self.entries.clone())
    }

    fn download(&self, dataset_ref: &str, dest_dir: &Path) -> Result<PathBuf, PipelineError> {
        let bytes = self.archives.get(dataset_ref).ok_or_else(|| {
            PipelineError::Catalog(format!("unknown dataset '{dataset_ref}'"))
        })?;
        std::fs::create_dir_all(dest_dir)?;
        let slug = dataset_ref.rsplit('/').next().unwrap_or(dataset_ref);
        let path = dest_dir.join(format!("{slug}.zip"));
        std::fs::write(&path, bytes)?;
        Ok(path)
    }
}

fn zip_bytes(members: &[(&str, &str)]) -> Vec<u8> {
    let mut buf = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
        for (name, content) in members {
            let options: FileOptions<'_, ()> =
                FileOptions::default().compression_method(CompressionMethod::Stored);
            zip.start_file(*name, options).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }
    buf
}

fn load_with(catalog: &FakeCatalog) -> petdata::Table {
    let temp = tempdir().unwrap();
    let loader = DiscoveryLoader::new(
        catalog,
        temp.path().join("downloads"),
        temp.path(),
        DiscoveryConfig::new(),
    );
    loader.load().unwrap()
}

#[test]
fn no_search_results_yield_empty_canonical_table() {
    let table = load_with(&FakeCatalog::new());
    assert!(table.is_empty());
    assert_eq!(
        table.columns(),
        ["Type", "Age", "Breed", "Color", "Health", "Adoption_Status", "AdoptionSpeed"]
    );
}

#[test]
fn most_recently_updated_dataset_wins() {
    let catalog = FakeCatalog::new()
        .with_dataset(
            "stale/old-cats",
            "2023-01-01T00:00:00Z",
            &[("cats.csv", "Species,Breed\ncat,Old\n")],
        )
        .with_dataset(
            "fresh/new-cats",
            "2024-05-01T00:00:00Z",
            &[("cats.csv", "Species,Breed\ncat,Fresh\n")],
        );

    let table = load_with(&catalog);
    assert_eq!(table.len(), 1);
    assert_eq!(table.value(0, "Breed"), Some(&Value::text("Fresh")));
}

#[test]
fn filename_hints_steer_member_choice() {
    let catalog = FakeCatalog::new().with_dataset(
        "acme/bundle",
        "2024-05-01T00:00:00Z",
        &[
            ("metadata.csv", "Species,Breed\ndog,Wrong\n"),
            ("shelter_outcomes.csv", "Species,Breed\ncat,Right\n"),
        ],
    );

    let table = load_with(&catalog);
    assert_eq!(table.value(0, "Breed"), Some(&Value::text("Right")));
}

#[test]
fn first_csv_is_the_fallback_without_hints() {
    let catalog = FakeCatalog::new().with_dataset(
        "acme/bundle",
        "2024-05-01T00:00:00Z",
        &[
            ("metadata.csv", "Species,Breed\ncat,First\n"),
            ("numbers.csv", "Species,Breed\ncat,Second\n"),
        ],
    );

    let table = load_with(&catalog);
    assert_eq!(table.value(0, "Breed"), Some(&Value::text("First")));
}

#[test]
fn archive_without_csvs_yields_empty_table() {
    let catalog = FakeCatalog::new().with_dataset(
        "acme/no-tables",
        "2024-05-01T00:00:00Z",
        &[("readme.txt", "nothing tabular here")],
    );

    let table = load_with(&catalog);
    assert!(table.is_empty());
}

#[test]
fn synonym_columns_are_renamed_and_others_dropped() {
    let catalog = FakeCatalog::new().with_dataset(
        "acme/mixed",
        "2024-05-01T00:00:00Z",
        &[(
            "cats.csv",
            "Species,BreedName,age_years,Weight,Adopted\n Cat ,Bobtail,2,4.5,Yes\n",
        )],
    );

    let table = load_with(&catalog);
    assert_eq!(table.columns(), ["Type", "Age", "Breed", "Adoption_Status"]);
    assert_eq!(table.value(0, "Type"), Some(&Value::text("cat")));
    assert_eq!(table.value(0, "Breed"), Some(&Value::text("Bobtail")));
    // truthy "Yes" collapses to 1
    assert_eq!(table.value(0, "Adoption_Status"), Some(&Value::number(1.0)));
}

#[test]
fn numeric_health_uses_the_coded_rule() {
    let catalog = FakeCatalog::new().with_dataset(
        "acme/coded",
        "2024-05-01T00:00:00Z",
        &[("cats.csv", "Species,Health\ncat,2\ncat,0\ncat,\n")],
    );

    let table = load_with(&catalog);
    assert_eq!(table.value(0, "Health"), Some(&Value::number(1.0)));
    assert_eq!(table.value(1, "Health"), Some(&Value::number(0.0)));
    assert_eq!(table.value(2, "Health"), Some(&Value::number(0.0)));
}

#[test]
fn textual_health_uses_the_keyword_rule() {
    let catalog = FakeCatalog::new().with_dataset(
        "acme/textual",
        "2024-05-01T00:00:00Z",
        &[(
            "cats.csv",
            "Species,Intake Condition\ncat,minor injury\ncat,normal\n",
        )],
    );

    let table = load_with(&catalog);
    assert_eq!(table.value(0, "Health"), Some(&Value::number(1.0)));
    assert_eq!(table.value(1, "Health"), Some(&Value::number(0.0)));
}

#[test]
fn numeric_status_columns_pass_through() {
    let catalog = FakeCatalog::new().with_dataset(
        "acme/numeric-status",
        "2024-05-01T00:00:00Z",
        &[("cats.csv", "Species,adoption_status\ncat,1\ncat,0\n")],
    );

    let table = load_with(&catalog);
    assert_eq!(table.value(0, "Adoption_Status"), Some(&Value::text("1")));
    assert_eq!(table.value(1, "Adoption_Status"), Some(&Value::text("0")));
}

#[test]
fn unrecognized_status_spellings_default_to_zero() {
    let catalog = FakeCatalog::new().with_dataset(
        "acme/odd-status",
        "2024-05-01T00:00:00Z",
        &[("cats.csv", "Species,Adopted\ncat,probably\ncat,N\n")],
    );

    let table = load_with(&catalog);
    assert_eq!(table.value(0, "Adoption_Status"), Some(&Value::number(0.0)));
    assert_eq!(table.value(1, "Adoption_Status"), Some(&Value::number(0.0)));
}

#[test]
fn wholly_unknown_schemas_yield_empty_table() {
    let catalog = FakeCatalog::new().with_dataset(
        "acme/alien",
        "2024-05-01T00:00:00Z",
        &[("cats.csv", "Weight,Length\n4.5,50\n")],
    );

    let table = load_with(&catalog);
    assert!(table.is_empty());
    assert_eq!(table.columns().len(), 7);
}
