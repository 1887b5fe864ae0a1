use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tempfile::tempdir;
use zip::CompressionMethod;
use zip::write::FileOptions;

use petdata::{
    CatalogClient, CatalogEntry, HealthRule, Pipeline, PipelineConfig, PipelineError, SourcePlan,
    StatusRule, Value,
};

/// In-memory catalog serving prebuilt zip archives, keyed by dataset ref.
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

    /// Register an archive that search never returns (configured sources
    /// fetch by ref, not by search).
    fn with_unlisted_dataset(mut self, dataset_ref: &str, members: &[(&str, &str)]) -> Self {
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

fn likelihood_plan() -> SourcePlan {
    SourcePlan::remote("likelihood", "acme/likelihood")
        .with_member("pets.csv")
        .with_renames([
            ("PetType", "Type"),
            ("AgeMonths", "Age"),
            ("AdoptionLikelihood", "Adoption_Status"),
        ])
        .with_health(HealthRule::Code {
            column: "HealthCondition".into(),
        })
}

fn center_plan() -> SourcePlan {
    SourcePlan::remote("center", "acme/center")
        .with_elapsed("arrival_date", "adoption_date")
        .with_adopted_gate("adopted")
        .with_age_in_years("age_years")
        .with_status(StatusRule::FromSpeed)
        .with_renames([("species", "Type"), ("breed", "Breed"), ("color", "Color")])
}

const LIKELIHOOD_CSV: &str = "\
PetType,AgeMonths,Breed,Color,HealthCondition,AdoptionLikelihood
Cat,24,Tabby,Black,2,1
Dog,12,Lab,Brown,1,0
2,6,Manx,White,3,1
";

const CENTER_CSV: &str = "\
species,breed,color,age_years,arrival_date,adoption_date,adopted
cat,Siamese,Cream,2,2024-01-01,2024-01-05,1
cat,DSH,Gray,1,2024-01-01,,0
";

const DISCOVERY_CSV: &str = "\
Species,BreedName,Adopted,Intake Condition
Cat,Bobtail,Yes,healthy
Dog,Pug,No,minor injury
";

fn catalog_with_core_sources() -> FakeCatalog {
    FakeCatalog::new()
        .with_unlisted_dataset("acme/likelihood", &[("pets.csv", LIKELIHOOD_CSV)])
        .with_unlisted_dataset("acme/center", &[("records.csv", CENTER_CSV)])
}

#[test]
fn full_run_combines_sources_and_discovery() {
    let temp = tempdir().unwrap();
    let catalog = catalog_with_core_sources().with_dataset(
        "acme/latest-cats",
        "2024-06-01T00:00:00Z",
        &[("cat_data.csv", DISCOVERY_CSV)],
    );

    let config = PipelineConfig::new(temp.path())
        .with_plans(vec![likelihood_plan(), center_plan()]);
    let pipeline = Pipeline::new(config);
    let summary = pipeline.run(&catalog).unwrap();

    assert_eq!(
        summary.source_rows,
        vec![
            ("likelihood".to_string(), 3),
            ("center".to_string(), 2),
            ("catalog_discovery".to_string(), 2),
        ]
    );
    // 2 cats from likelihood ("Cat" and code "2"), 2 from center, 1 from discovery
    assert_eq!(summary.combined_rows, 5);

    let combined = petdata::Table::from_csv_file(&summary.output_path).unwrap();
    assert_eq!(
        combined.columns(),
        ["Type", "Age", "Breed", "Color", "Health", "Adoption_Status", "AdoptionSpeed"]
    );
    assert_eq!(combined.len(), 5);
    for row in 0..combined.len() {
        assert_eq!(combined.value(row, "Type"), Some(&Value::text("cat")));
    }
    // coded health 2 -> unhealthy on the first likelihood row
    assert_eq!(combined.value(0, "Health"), Some(&Value::text("1")));
    // center: 4 elapsed days -> bucket 1 -> adopted, years -> months
    assert_eq!(combined.value(2, "AdoptionSpeed"), Some(&Value::text("1")));
    assert_eq!(combined.value(2, "Adoption_Status"), Some(&Value::text("1")));
    assert_eq!(combined.value(2, "Age"), Some(&Value::text("24")));
    // center: never adopted -> unresolved bucket, not adopted
    assert_eq!(combined.value(3, "AdoptionSpeed"), Some(&Value::text("4")));
    assert_eq!(combined.value(3, "Adoption_Status"), Some(&Value::text("0")));
    // discovery: "Yes" -> 1, healthy text -> 0, no age column -> null
    assert_eq!(combined.value(4, "Breed"), Some(&Value::text("Bobtail")));
    assert_eq!(combined.value(4, "Adoption_Status"), Some(&Value::text("1")));
    assert_eq!(combined.value(4, "Health"), Some(&Value::text("0")));
    assert_eq!(combined.value(4, "Age"), Some(&Value::Null));
}

#[test]
fn checkpoints_are_written_per_source() {
    let temp = tempdir().unwrap();
    let catalog = catalog_with_core_sources().with_dataset(
        "acme/latest-cats",
        "2024-06-01T00:00:00Z",
        &[("cat_data.csv", DISCOVERY_CSV)],
    );

    let config = PipelineConfig::new(temp.path())
        .with_plans(vec![likelihood_plan(), center_plan()]);
    Pipeline::new(config).run(&catalog).unwrap();

    for name in ["likelihood.csv", "center.csv", "catalog_discovery.csv"] {
        assert!(temp.path().join(name).exists(), "missing checkpoint {name}");
    }
}

#[test]
fn downloaded_archives_are_cleaned_up() {
    let temp = tempdir().unwrap();
    let catalog = catalog_with_core_sources();

    let config = PipelineConfig::new(temp.path())
        .with_plans(vec![likelihood_plan(), center_plan()])
        .without_discovery();
    let pipeline = Pipeline::new(config.clone());
    pipeline.run(&catalog).unwrap();

    let leftover_zips: Vec<_> = walkdir::WalkDir::new(&config.work_dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| {
            entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
        })
        .collect();
    assert!(leftover_zips.is_empty(), "archives not removed: {leftover_zips:?}");
}

#[test]
fn empty_discovery_leaves_source_concatenation_intact() {
    let temp = tempdir().unwrap();
    // search returns nothing; configured sources still fetch by ref
    let catalog = catalog_with_core_sources();

    let config = PipelineConfig::new(temp.path())
        .with_plans(vec![likelihood_plan(), center_plan()]);
    let summary = Pipeline::new(config).run(&catalog).unwrap();

    assert_eq!(summary.source_rows.last().unwrap(), &("catalog_discovery".to_string(), 0));
    assert_eq!(summary.combined_rows, 4);
}

#[test]
fn missing_optional_local_source_keeps_the_run_alive() {
    let temp = tempdir().unwrap();
    let catalog = catalog_with_core_sources();

    let plans = vec![
        likelihood_plan(),
        SourcePlan::local("competition", "data/train.csv").optional(),
        center_plan(),
    ];
    let config = PipelineConfig::new(temp.path())
        .with_plans(plans)
        .without_discovery();
    let summary = Pipeline::new(config).run(&catalog).unwrap();

    assert_eq!(summary.source_rows[1], ("competition".to_string(), 0));
    assert_eq!(summary.combined_rows, 4);
}

#[test]
fn required_source_failure_aborts_the_run() {
    let temp = tempdir().unwrap();
    let catalog = FakeCatalog::new(); // knows no datasets at all

    let config = PipelineConfig::new(temp.path())
        .with_plans(vec![likelihood_plan()])
        .without_discovery();
    let output_path = temp.path().join("combined_adoption_data.csv");
    let result = Pipeline::new(config).run(&catalog);

    assert!(matches!(
        result,
        Err(PipelineError::SourceUnavailable { ref source_id, .. }) if source_id == "likelihood"
    ));
    assert!(!output_path.exists(), "failed run must not write output");
}

#[test]
fn target_species_is_configurable() {
    let temp = tempdir().unwrap();
    let catalog = catalog_with_core_sources();

    let config = PipelineConfig::new(temp.path())
        .with_plans(vec![likelihood_plan()])
        .with_target_species("dog")
        .without_discovery();
    let summary = Pipeline::new(config).run(&catalog).unwrap();

    // the "Dog" row plus nothing else
    assert_eq!(summary.combined_rows, 1);
    let combined = petdata::Table::from_csv_file(&summary.output_path).unwrap();
    assert_eq!(combined.value(0, "Type"), Some(&Value::text("dog")));
    assert_eq!(combined.value(0, "Breed"), Some(&Value::text("Lab")));
}

#[test]
fn rerun_fully_replaces_previous_output() {
    let temp = tempdir().unwrap();
    let catalog = catalog_with_core_sources();

    let both = PipelineConfig::new(temp.path())
        .with_plans(vec![likelihood_plan(), center_plan()])
        .without_discovery();
    let first = Pipeline::new(both).run(&catalog).unwrap();
    assert_eq!(first.combined_rows, 4);

    let narrower = PipelineConfig::new(temp.path())
        .with_plans(vec![likelihood_plan()])
        .without_discovery();
    let second = Pipeline::new(narrower).run(&catalog).unwrap();
    assert_eq!(second.combined_rows, 2);

    let combined = petdata::Table::from_csv_file(&second.output_path).unwrap();
    assert_eq!(combined.len(), 2, "old rows must not survive a rerun");
}
