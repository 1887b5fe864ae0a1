use crate::types::{ColumnName, SpeciesName};

/// Canonical column names shared by all normalized tables.
pub mod columns {
    /// Species label column.
    pub const TYPE: &str = "Type";
    /// Age in months.
    pub const AGE: &str = "Age";
    /// Free-text breed descriptor.
    pub const BREED: &str = "Breed";
    /// Free-text color descriptor.
    pub const COLOR: &str = "Color";
    /// Binary health flag, 1 = unhealthy.
    pub const HEALTH: &str = "Health";
    /// Binary adoption outcome, 1 = adopted.
    pub const ADOPTION_STATUS: &str = "Adoption_Status";
    /// Ordinal 0-4 adoption speed bucket, 4 = slowest/unresolved.
    pub const ADOPTION_SPEED: &str = "AdoptionSpeed";

    /// Canonical column order used for combined output.
    pub const ALL: [&str; 7] = [
        TYPE,
        AGE,
        BREED,
        COLOR,
        HEALTH,
        ADOPTION_STATUS,
        ADOPTION_SPEED,
    ];

    /// Columns coerced to numeric by the combiner.
    pub const NUMERIC: [&str; 4] = [AGE, HEALTH, ADOPTION_STATUS, ADOPTION_SPEED];
}

/// Constants used by field normalization rules.
pub mod normalize {
    /// Coded severity values that count as unhealthy (PetFinder style 2/3).
    pub const UNHEALTHY_CODES: [i64; 2] = [2, 3];
    /// Case-insensitive substrings that mark a free-text condition as unhealthy.
    pub const UNHEALTHY_KEYWORDS: [&str; 4] = ["injur", "sick", "ill", "medical"];
    /// Numeric species codes mapped to names during type normalization.
    pub const SPECIES_CODES: [(&str, &str); 2] = [("1", "dog"), ("2", "cat")];
    /// Speed-bucket breakpoints in elapsed days: <=0, <=7, <=30, <=90, else.
    pub const SPEED_DAY_BREAKS: [i64; 4] = [0, 7, 30, 90];
    /// Bucket assigned to null or out-of-range elapsed days.
    pub const SPEED_UNRESOLVED: u8 = 4;
    /// Truthy status spellings normalized to 1 (compared lowercase).
    pub const TRUTHY_STATUS: [&str; 4] = ["1", "true", "yes", "y"];
}

/// Constants used by catalog discovery.
pub mod catalog {
    /// Fixed keyword query used to discover an extra dataset each run.
    pub const DISCOVERY_QUERY: &str = "cat adoption";
    /// Filename substrings that mark an archive CSV as relevant.
    pub const FILENAME_HINTS: [&str; 4] = ["cat", "adopt", "pet", "shelter"];
    /// Default Kaggle API endpoint.
    pub const DEFAULT_ENDPOINT: &str = "https://www.kaggle.com/api/v1";
    /// Environment variable holding the catalog username.
    pub const ENV_USERNAME: &str = "KAGGLE_USERNAME";
    /// Environment variable holding the catalog API key.
    pub const ENV_KEY: &str = "KAGGLE_KEY";
}

/// Constants used for pipeline output layout.
pub mod output {
    /// Filename of the combined, species-filtered table.
    pub const COMBINED_FILENAME: &str = "combined_adoption_data.csv";
    /// Extension used for per-source checkpoint files.
    pub const CHECKPOINT_EXTENSION: &str = "csv";
}

/// Default species kept by the combiner.
pub const DEFAULT_TARGET_SPECIES: &str = "cat";

/// Return the canonical column list as owned names.
pub fn canonical_columns() -> Vec<ColumnName> {
    columns::ALL.iter().map(|name| name.to_string()).collect()
}

/// Return the default target species as an owned label.
pub fn default_target_species() -> SpeciesName {
    DEFAULT_TARGET_SPECIES.to_string()
}
