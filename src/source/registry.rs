//! The built-in source registry: five plans mirroring the upstream datasets.

use crate::source::plan::{HealthRule, SourcePlan, StatusRule};
use crate::types::SpeciesName;

/// Build the five configured source plans.
///
/// `target_species` drives the per-source prefilters that the shelter exports
/// need before their date math; the combiner applies the same filter again
/// across all sources.
pub fn builtin_plans(target_species: &SpeciesName) -> Vec<SourcePlan> {
    vec![
        // Likelihood-labeled survey data: status arrives precomputed, health
        // is a PetFinder-style severity code.
        SourcePlan::remote(
            "pet_adoption_status",
            "rabieelkharoua/predict-pet-adoption-status-dataset",
        )
        .with_member("pet_adoption_data.csv")
        .with_renames([
            ("PetType", "Type"),
            ("AgeMonths", "Age"),
            ("AdoptionLikelihood", "Adoption_Status"),
        ])
        .with_health(HealthRule::Code {
            column: "HealthCondition".into(),
        }),
        // Adoption-center records: speed from arrival/adoption dates, gated
        // on the adopted flag; age arrives in years.
        SourcePlan::remote(
            "adoption_center_records",
            "chaudharisanika/pet-adoption-records-with-animal-and-adopter-data",
        )
        .with_member("pet_adoption_center.csv")
        .with_elapsed("arrival_date", "adoption_date")
        .with_adopted_gate("adopted")
        .with_age_in_years("age_years")
        .with_status(StatusRule::FromSpeed)
        .with_renames([("species", "Type"), ("breed", "Breed"), ("color", "Color")]),
        // PetFinder competition files, only present when pre-staged locally.
        // Breed and color are ID-coded against label tables.
        SourcePlan::local("petfinder_competition", "data/train.csv")
            .optional()
            .with_label_join(
                "Breed1",
                "data/BreedLabels.csv",
                "BreedID",
                "BreedName",
                "Breed",
            )
            .with_label_join(
                "Color1",
                "data/ColorLabels.csv",
                "ColorID",
                "ColorName",
                "Color",
            )
            .with_status(StatusRule::FromSpeed)
            .with_health(HealthRule::Code {
                column: "Health".into(),
            }),
        // Bloomington shelter outcomes: speed from intake/movement dates.
        SourcePlan::remote(
            "bloomington_shelter",
            "thedevastator/analyzing-adoption-trends-at-the-bloomington-ani",
        )
        .with_prefilter("speciesname", target_species.clone())
        .with_elapsed("intakedate", "movementdate")
        .with_status(StatusRule::FromSpeed)
        .with_renames([
            ("speciesname", "Type"),
            ("breedname", "Breed"),
            ("basecolour", "Color"),
        ]),
        // Austin-style shelter analytics: free-text intake condition drives
        // the health flag; no outcome dates survive the export.
        SourcePlan::remote("shelter_analytics", "jackdaoud/animal-shelter-analytics")
            .with_prefilter("Animal Type", target_species.clone())
            .with_health(HealthRule::Text {
                column: "Intake Condition".into(),
            })
            .with_renames([("Animal Type", "Type")]),
    ]
}
