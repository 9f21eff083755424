pub mod area;
pub mod audit;
pub mod columns;
pub mod config;
pub mod dataset;
pub mod density;
pub mod diversity;
pub mod error;
pub mod indicators;
pub mod normalize;
pub mod phytosociology;
pub mod records;
pub mod schema;
pub mod technique;
pub mod work_unit;

#[cfg(feature = "python")]
mod model;

pub use area::{estimate_area, AreaEstimate};
pub use columns::resolve_column;
pub use config::RestorationTargets;
pub use density::{general_density, regenerant_density, DensityEstimate};
pub use diversity::{diversity_indices, species_abundance, DiversityIndices};
pub use error::{Diagnostic, RestorationError};
pub use indicators::{restoration_indicators, Scorecard, Status};
pub use phytosociology::{phytosociology_census, phytosociology_plots, SpeciesTable};
pub use records::{CharacterizationTable, InventoryTable};
pub use technique::{classify_technique, Technique};

#[cfg(feature = "python")]
use pyo3::prelude::*;
#[cfg(feature = "python")]
use pyo3::types::PyModule;

/// Export column names as Python submodules
#[cfg(feature = "python")]
fn add_schema_exports(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Species table
    let species_table = PyModule::new(m.py(), "species_table")?;
    species_table.add("SPECIES", schema::species_table::SPECIES)?;
    species_table.add("INDIVIDUALS", schema::species_table::INDIVIDUALS)?;
    species_table.add("BASAL_AREA_M2", schema::species_table::BASAL_AREA_M2)?;
    species_table.add("PLOTS", schema::species_table::PLOTS)?;
    species_table.add("ABSOLUTE_DENSITY", schema::species_table::ABSOLUTE_DENSITY)?;
    species_table.add(
        "ABSOLUTE_DOMINANCE",
        schema::species_table::ABSOLUTE_DOMINANCE,
    )?;
    species_table.add("RELATIVE_DENSITY", schema::species_table::RELATIVE_DENSITY)?;
    species_table.add(
        "RELATIVE_DOMINANCE",
        schema::species_table::RELATIVE_DOMINANCE,
    )?;
    species_table.add(
        "RELATIVE_FREQUENCY",
        schema::species_table::RELATIVE_FREQUENCY,
    )?;
    species_table.add("COVERAGE_VALUE", schema::species_table::COVERAGE_VALUE)?;
    species_table.add("IMPORTANCE_VALUE", schema::species_table::IMPORTANCE_VALUE)?;
    m.add_submodule(&species_table)?;

    // Scorecard
    let scorecard = PyModule::new(m.py(), "scorecard")?;
    scorecard.add("PROPERTY", schema::scorecard::PROPERTY)?;
    scorecard.add("CANOPY_COVER", schema::scorecard::CANOPY_COVER)?;
    scorecard.add("RESTORATION_METHOD", schema::scorecard::RESTORATION_METHOD)?;
    scorecard.add("REGENERANT_DENSITY", schema::scorecard::REGENERANT_DENSITY)?;
    scorecard.add("DENSITY_TARGET", schema::scorecard::DENSITY_TARGET)?;
    scorecard.add("OBSERVED_RICHNESS", schema::scorecard::OBSERVED_RICHNESS)?;
    scorecard.add("RICHNESS_TARGET", schema::scorecard::RICHNESS_TARGET)?;
    scorecard.add("CANOPY_OK", schema::scorecard::CANOPY_OK)?;
    scorecard.add("DENSITY_OK", schema::scorecard::DENSITY_OK)?;
    scorecard.add("RICHNESS_OK", schema::scorecard::RICHNESS_OK)?;
    scorecard.add("STATUS", schema::scorecard::STATUS)?;
    m.add_submodule(&scorecard)?;

    // Candidate column names
    let characterization = PyModule::new(m.py(), "characterization")?;
    characterization.add("PROPERTY", schema::characterization::PROPERTY.to_vec())?;
    characterization.add("WORK_UNIT", schema::characterization::WORK_UNIT.to_vec())?;
    characterization.add("TECHNIQUE", schema::characterization::TECHNIQUE.to_vec())?;
    characterization.add("CANOPY_COVER", schema::characterization::CANOPY_COVER.to_vec())?;
    m.add_submodule(&characterization)?;

    let inventory = PyModule::new(m.py(), "inventory")?;
    inventory.add("PLOT_CODE", schema::inventory::PLOT_CODE.to_vec())?;
    inventory.add("TAG", schema::inventory::TAG.to_vec())?;
    inventory.add("SPECIES", schema::inventory::SPECIES.to_vec())?;
    inventory.add("HEIGHT", schema::inventory::HEIGHT.to_vec())?;
    inventory.add("DIAMETER", schema::inventory::DIAMETER.to_vec())?;
    inventory.add("AREA_HA", schema::inventory::AREA_HA.to_vec())?;
    m.add_submodule(&inventory)?;

    Ok(())
}

#[cfg(feature = "python")]
#[pymodule]
fn restoration_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<model::RestorationModel>()?;
    add_schema_exports(m)?;
    Ok(())
}
