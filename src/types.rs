/// Identifier for a configured dataset source.
/// Examples: `pet_adoption_status`, `bloomington_shelter`, `catalog_discovery`
pub type SourceId = String;
/// Column name in a source or canonical table.
/// Examples: `Type`, `AgeMonths`, `Intake Condition`
pub type ColumnName = String;
/// Remote catalog dataset reference in `owner/slug` form.
/// Example: `jackdaoud/animal-shelter-analytics`
pub type DatasetRef = String;
/// Normalized species label used for filtering.
/// Examples: `cat`, `dog`
pub type SpeciesName = String;
/// Archive member path inside a downloaded zip.
/// Example: `pet_adoption_data.csv`
pub type MemberName = String;
