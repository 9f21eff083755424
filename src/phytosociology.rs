//! Phytosociological species tables.
//!
//! Basal area is summed per individual (species, tag) before it is summed
//! per species, so a multi-stem individual counts once for density while
//! all its stems contribute to dominance.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::f64::consts::PI;

use polars::prelude::*;

use crate::area::{estimate_area, AreaEstimate};
use crate::error::{merge_diagnostics, Diagnostic};
use crate::records::{CharacterizationTable, InventoryTable};
use crate::schema::{constants, species_table as col};
use crate::technique::{classify_technique, is_census, partition_properties, Technique};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingMode {
    Census,
    Plots,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpeciesRow {
    pub species: String,
    pub individuals: usize,
    pub basal_area_m2: f64,
    /// Distinct plots holding the species (plot mode only).
    pub plots: Option<usize>,
    /// Individuals per sampled hectare.
    pub absolute_density: f64,
    /// Basal area per sampled hectare, m²/ha.
    pub absolute_dominance: f64,
    pub relative_density: f64,
    pub relative_dominance: f64,
    pub relative_frequency: Option<f64>,
    pub coverage_value: f64,
    pub importance_value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpeciesTable {
    pub mode: SamplingMode,
    /// Ranked by coverage value (census) or importance value (plots).
    pub rows: Vec<SpeciesRow>,
    pub total_individuals: usize,
    pub total_basal_area_m2: f64,
    pub dominance_available: bool,
    pub area: AreaEstimate,
    pub diagnostics: Vec<Diagnostic>,
}

impl SpeciesTable {
    fn empty(mode: SamplingMode, diagnostic: Diagnostic) -> Self {
        Self {
            mode,
            rows: Vec::new(),
            total_individuals: 0,
            total_basal_area_m2: 0.0,
            dominance_available: false,
            area: AreaEstimate {
                area_ha: 0.0,
                method: String::new(),
                diagnostics: Vec::new(),
            },
            diagnostics: vec![diagnostic],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, species: &str) -> Option<&SpeciesRow> {
        self.rows.iter().find(|r| r.species == species)
    }

    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let species: Vec<&str> = self.rows.iter().map(|r| r.species.as_str()).collect();
        let individuals: Vec<u32> = self.rows.iter().map(|r| r.individuals as u32).collect();
        let floats = |f: fn(&SpeciesRow) -> f64| -> Vec<f64> { self.rows.iter().map(f).collect() };

        let mut columns = vec![
            Column::new(col::SPECIES.into(), &species),
            Column::new(col::INDIVIDUALS.into(), &individuals),
            Column::new(col::BASAL_AREA_M2.into(), &floats(|r| r.basal_area_m2)),
        ];
        if self.mode == SamplingMode::Plots {
            let plots: Vec<u32> = self
                .rows
                .iter()
                .map(|r| r.plots.unwrap_or(0) as u32)
                .collect();
            columns.push(Column::new(col::PLOTS.into(), &plots));
        }
        columns.extend([
            Column::new(col::ABSOLUTE_DENSITY.into(), &floats(|r| r.absolute_density)),
            Column::new(col::ABSOLUTE_DOMINANCE.into(), &floats(|r| r.absolute_dominance)),
            Column::new(col::RELATIVE_DENSITY.into(), &floats(|r| r.relative_density)),
            Column::new(col::RELATIVE_DOMINANCE.into(), &floats(|r| r.relative_dominance)),
        ]);
        if self.mode == SamplingMode::Plots {
            columns.push(Column::new(
                col::RELATIVE_FREQUENCY.into(),
                &floats(|r| r.relative_frequency.unwrap_or(0.0)),
            ));
        }
        columns.push(Column::new(col::COVERAGE_VALUE.into(), &floats(|r| r.coverage_value)));
        if self.mode == SamplingMode::Plots {
            columns.push(Column::new(
                col::IMPORTANCE_VALUE.into(),
                &floats(|r| r.importance_value.unwrap_or(0.0)),
            ));
        }

        DataFrame::new(columns)
    }
}

/// Basal area of one stem in m², diameter in cm.
pub fn basal_area_m2(diameter_cm: f64) -> f64 {
    PI * (diameter_cm / 2.0).powi(2) / constants::M2_PER_HA
}

fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    Some(if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    })
}

/// Diameter factor to centimetres: 0.1 when the median reads as millimetres.
fn diameter_scale(inventory: &InventoryTable) -> f64 {
    let mut diameters: Vec<f64> = inventory.rows.iter().filter_map(|r| r.diameter).collect();
    match median(&mut diameters) {
        Some(m) if m > constants::DIAMETER_MM_MEDIAN => {
            tracing::debug!(median = m, "diameters read as millimetres");
            0.1
        }
        _ => 1.0,
    }
}

#[derive(Default)]
struct SpeciesAcc {
    individuals: usize,
    basal_area_m2: f64,
    plots: BTreeSet<String>,
}

fn tally(inventory: &InventoryTable, with_plots: bool) -> BTreeMap<String, SpeciesAcc> {
    let has_diameter = inventory.columns.diameter.is_some();
    let scale = if has_diameter { diameter_scale(inventory) } else { 1.0 };
    let stem_area = |d: Option<f64>| d.map(|d| basal_area_m2(d * scale)).unwrap_or(0.0);

    let mut species: BTreeMap<String, SpeciesAcc> = BTreeMap::new();

    if inventory.columns.tag.is_some() {
        let mut individuals: BTreeMap<(&str, &str), f64> = BTreeMap::new();
        for row in &inventory.rows {
            let Some(name) = row.species.as_deref() else {
                continue;
            };
            if with_plots {
                let acc = species.entry(name.to_string()).or_default();
                if let Some(plot) = &row.plot_code {
                    acc.plots.insert(plot.clone());
                }
            }
            if let Some(tag) = row.tag.as_deref() {
                *individuals.entry((name, tag)).or_insert(0.0) += stem_area(row.diameter);
            }
        }
        for ((name, _), basal) in individuals {
            let acc = species.entry(name.to_string()).or_default();
            acc.individuals += 1;
            acc.basal_area_m2 += basal;
        }
    } else {
        for row in &inventory.rows {
            let Some(name) = row.species.as_deref() else {
                continue;
            };
            let acc = species.entry(name.to_string()).or_default();
            acc.individuals += 1;
            acc.basal_area_m2 += stem_area(row.diameter);
            if with_plots {
                if let Some(plot) = &row.plot_code {
                    acc.plots.insert(plot.clone());
                }
            }
        }
    }
    species
}

fn percent(part: f64, total: f64) -> f64 {
    if total > 0.0 {
        100.0 * part / total
    } else {
        0.0
    }
}

fn species_table(
    mode: SamplingMode,
    inventory: &InventoryTable,
    characterization: &CharacterizationTable,
) -> SpeciesTable {
    let mut table = build_species_table(mode, inventory, characterization);
    merge_diagnostics(&mut table.diagnostics, &characterization.diagnostics);
    merge_diagnostics(&mut table.diagnostics, &inventory.diagnostics);
    table
}

fn build_species_table(
    mode: SamplingMode,
    inventory: &InventoryTable,
    characterization: &CharacterizationTable,
) -> SpeciesTable {
    if inventory.is_empty() {
        return SpeciesTable::empty(mode, Diagnostic::EmptyInput { what: "inventory" });
    }
    if inventory.columns.species.is_none() {
        return SpeciesTable::empty(mode, Diagnostic::MissingColumn { field: "species" });
    }
    if mode == SamplingMode::Plots && inventory.columns.plot_code.is_none() {
        return SpeciesTable::empty(mode, Diagnostic::MissingColumn { field: "plot_code" });
    }

    let with_plots = mode == SamplingMode::Plots;
    let tallied = tally(inventory, with_plots);

    let total_individuals: usize = tallied.values().map(|a| a.individuals).sum();
    let total_basal: f64 = tallied.values().map(|a| a.basal_area_m2).sum();
    let total_frequency: usize = tallied.values().map(|a| a.plots.len()).sum();
    let dominance_available = inventory.columns.diameter.is_some() && total_basal > 0.0;

    let area = estimate_area(characterization, inventory);
    let per_ha = |v: f64| if area.area_ha > 0.0 { v / area.area_ha } else { 0.0 };

    let mut rows: Vec<SpeciesRow> = tallied
        .into_iter()
        .map(|(species, acc)| {
            let relative_density = percent(acc.individuals as f64, total_individuals as f64);
            let relative_dominance = if dominance_available {
                percent(acc.basal_area_m2, total_basal)
            } else {
                0.0
            };
            let coverage_value = if dominance_available {
                (relative_density + relative_dominance) / 2.0
            } else {
                relative_density / 2.0
            };
            let relative_frequency = with_plots
                .then(|| percent(acc.plots.len() as f64, total_frequency as f64));
            let importance_value = relative_frequency.map(|rf| {
                if dominance_available {
                    (relative_density + relative_dominance + rf) / 3.0
                } else {
                    (relative_density + rf) / 2.0
                }
            });

            SpeciesRow {
                species,
                individuals: acc.individuals,
                basal_area_m2: acc.basal_area_m2,
                plots: with_plots.then_some(acc.plots.len()),
                absolute_density: per_ha(acc.individuals as f64),
                absolute_dominance: per_ha(acc.basal_area_m2),
                relative_density,
                relative_dominance,
                relative_frequency,
                coverage_value,
                importance_value,
            }
        })
        .collect();

    let rank = |r: &SpeciesRow| match mode {
        SamplingMode::Census => r.coverage_value,
        SamplingMode::Plots => r.importance_value.unwrap_or(0.0),
    };
    rows.sort_by(|a, b| {
        rank(b)
            .partial_cmp(&rank(a))
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.species.cmp(&b.species))
    });

    let mut diagnostics = Vec::new();
    if inventory.columns.diameter.is_none() {
        diagnostics.push(Diagnostic::MissingColumn { field: "diameter" });
    }
    diagnostics.extend(area.diagnostics.iter().cloned());
    tracing::debug!(?mode, species = rows.len(), total_individuals, "species table");

    SpeciesTable {
        mode,
        rows,
        total_individuals,
        total_basal_area_m2: total_basal,
        dominance_available,
        area,
        diagnostics,
    }
}

/// Census species table ranked by coverage value.
pub fn phytosociology_census(
    inventory: &InventoryTable,
    characterization: &CharacterizationTable,
) -> SpeciesTable {
    species_table(SamplingMode::Census, inventory, characterization)
}

/// Plot species table with relative frequency, ranked by importance value.
pub fn phytosociology_plots(
    inventory: &InventoryTable,
    characterization: &CharacterizationTable,
) -> SpeciesTable {
    species_table(SamplingMode::Plots, inventory, characterization)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Phytosociology {
    Census(SpeciesTable),
    Plots(SpeciesTable),
    /// Census and plot partitions reported separately.
    Mixed {
        census: SpeciesTable,
        plots: SpeciesTable,
    },
}

/// Species tables for a subset, following its sampling technique.
pub fn phytosociology(
    inventory: &InventoryTable,
    characterization: &CharacterizationTable,
) -> Phytosociology {
    match classify_technique(characterization) {
        Technique::CensusOnly => Phytosociology::Census(phytosociology_census(inventory, characterization)),
        Technique::PlotOnly | Technique::Unknown => {
            Phytosociology::Plots(phytosociology_plots(inventory, characterization))
        }
        Technique::Mixed => {
            let partition = partition_properties(characterization);
            let census_rows = characterization
                .subset(|r| r.technique.as_deref().map(is_census).unwrap_or(false));
            let plot_rows = characterization
                .subset(|r| !r.technique.as_deref().map(is_census).unwrap_or(false));
            Phytosociology::Mixed {
                census: phytosociology_census(&inventory.for_properties(&partition.census), &census_rows),
                plots: phytosociology_plots(&inventory.for_properties(&partition.plot), &plot_rows),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{
        CharacterizationColumns, CharacterizationRecord, InventoryColumns, InventoryRecord,
    };
    use approx::assert_relative_eq;

    fn stem(plot: &str, tag: &str, species: &str, dap: Option<f64>) -> InventoryRecord {
        let (prop, ut) = plot.split_once('_').unwrap();
        InventoryRecord {
            plot_code: Some(plot.into()),
            property: Some(prop.into()),
            work_unit: Some(ut.into()),
            tag: Some(tag.into()),
            species: Some(species.into()),
            diameter: dap,
            area_ha: Some(0.5),
            ..Default::default()
        }
    }

    fn inventory(rows: Vec<InventoryRecord>) -> InventoryTable {
        InventoryTable::from_records(
            InventoryColumns {
                plot_code: Some("cod_parc".into()),
                tag: Some("plaqueta".into()),
                species: Some("especie".into()),
                diameter: Some("dap".into()),
                area_ha: Some("area_ha".into()),
                ..Default::default()
            },
            rows,
        )
    }

    fn carac(technique: &str) -> CharacterizationTable {
        CharacterizationTable::from_records(
            CharacterizationColumns {
                property: Some("cod_prop".into()),
                technique: Some("tecnica_am".into()),
                ..Default::default()
            },
            vec![CharacterizationRecord {
                property: Some("P1".into()),
                technique: Some(technique.into()),
                ..Default::default()
            }],
        )
    }

    #[test]
    fn test_multi_stem_individual() {
        let inv = inventory(vec![
            stem("P1_ut1", "1", "Inga vera", Some(10.0)),
            stem("P1_ut1", "1", "Inga vera", Some(15.0)),
            stem("P1_ut1", "1", "Inga vera", Some(20.0)),
            stem("P1_ut1", "2", "Cecropia", Some(20.0)),
        ]);
        let table = phytosociology_census(&inv, &carac("Censo"));
        let inga = table.get("Inga vera").unwrap();
        assert_eq!(inga.individuals, 1);
        assert_relative_eq!(
            inga.basal_area_m2,
            PI / 4.0 * (0.10f64.powi(2) + 0.15f64.powi(2) + 0.20f64.powi(2)),
            epsilon = 1e-12
        );
        assert_eq!(table.total_individuals, 2);
        assert_relative_eq!(inga.relative_density, 50.0);
        assert_relative_eq!(inga.absolute_density, 2.0);
    }

    #[test]
    fn test_census_ranking_and_coverage() {
        let inv = inventory(vec![
            stem("P1_ut1", "1", "A", Some(10.0)),
            stem("P1_ut1", "2", "B", Some(10.0)),
            stem("P1_ut1", "3", "B", Some(10.0)),
            stem("P1_ut1", "4", "B", Some(10.0)),
        ]);
        let table = phytosociology_census(&inv, &carac("Censo"));
        assert_eq!(table.rows[0].species, "B");
        assert_relative_eq!(table.rows[0].relative_density, 75.0);
        assert_relative_eq!(table.rows[0].relative_dominance, 75.0);
        assert_relative_eq!(table.rows[0].coverage_value, 75.0);
        assert!(table.rows[0].importance_value.is_none());
    }

    #[test]
    fn test_millimetre_diameters_are_rescaled() {
        let cm = inventory(vec![stem("P1_ut1", "1", "A", Some(15.0))]);
        let mm = inventory(vec![stem("P1_ut1", "1", "A", Some(150.0))]);
        let a = phytosociology_census(&cm, &carac("Censo"));
        let b = phytosociology_census(&mm, &carac("Censo"));
        assert_relative_eq!(a.total_basal_area_m2, b.total_basal_area_m2, epsilon = 1e-15);
    }

    #[test]
    fn test_without_diameter() {
        let mut inv = inventory(vec![
            stem("P1_ut1", "1", "A", None),
            stem("P1_ut1", "2", "B", None),
        ]);
        inv.columns.diameter = None;
        let table = phytosociology_census(&inv, &carac("Censo"));
        assert!(!table.dominance_available);
        assert_relative_eq!(table.rows[0].coverage_value, 25.0);
        assert_relative_eq!(table.rows[0].relative_dominance, 0.0);
    }

    #[test]
    fn test_plot_frequency_and_importance() {
        let inv = inventory(vec![
            stem("P1_p1", "1", "A", Some(10.0)),
            stem("P1_p2", "2", "A", Some(10.0)),
            stem("P1_p2", "3", "B", Some(10.0)),
        ]);
        let table = phytosociology_plots(&inv, &carac("Parcela"));
        let a = table.get("A").unwrap();
        assert_eq!(a.plots, Some(2));
        assert_relative_eq!(a.relative_frequency.unwrap(), 200.0 / 3.0, epsilon = 1e-9);
        let dr = 200.0 / 3.0;
        assert_relative_eq!(a.importance_value.unwrap(), (dr + dr + 200.0 / 3.0) / 3.0, epsilon = 1e-9);
        assert_eq!(table.rows[0].species, "A");
        assert_relative_eq!(table.area.area_ha, 0.02);
    }

    #[test]
    fn test_plot_importance_without_diameter() {
        let mut inv = inventory(vec![
            stem("P1_p1", "1", "A", None),
            stem("P1_p2", "2", "A", None),
            stem("P1_p2", "3", "B", None),
        ]);
        inv.columns.diameter = None;
        let table = phytosociology_plots(&inv, &carac("Parcela"));
        assert!(!table.dominance_available);

        let a = table.get("A").unwrap();
        assert_relative_eq!(a.relative_density, 200.0 / 3.0, epsilon = 1e-9);
        assert_relative_eq!(a.relative_dominance, 0.0);
        assert_relative_eq!(a.relative_frequency.unwrap(), 200.0 / 3.0, epsilon = 1e-9);
        // (DR + FR) / 2
        assert_relative_eq!(a.importance_value.unwrap(), 200.0 / 3.0, epsilon = 1e-9);
        assert_relative_eq!(a.coverage_value, 100.0 / 3.0, epsilon = 1e-9);

        let b = table.get("B").unwrap();
        assert_relative_eq!(b.relative_frequency.unwrap(), 100.0 / 3.0, epsilon = 1e-9);
        assert_relative_eq!(b.importance_value.unwrap(), 100.0 / 3.0, epsilon = 1e-9);
        assert_eq!(table.rows[0].species, "A");
    }

    #[test]
    fn test_species_table_carries_unparseable_values() {
        let mut inv = inventory(vec![stem("P1_ut1", "1", "A", Some(10.0))]);
        let unparseable = Diagnostic::UnparseableValue { field: "diameter", count: 1 };
        inv.diagnostics.push(unparseable.clone());

        let table = phytosociology_census(&inv, &carac("Censo"));
        assert_eq!(table.diagnostics, vec![unparseable.clone()]);

        inv.columns.species = None;
        let table = phytosociology_census(&inv, &carac("Censo"));
        assert_eq!(
            table.diagnostics,
            vec![Diagnostic::MissingColumn { field: "species" }, unparseable]
        );
    }

    #[test]
    fn test_missing_species_column() {
        let mut inv = inventory(vec![stem("P1_ut1", "1", "A", None)]);
        inv.columns.species = None;
        let table = phytosociology_census(&inv, &carac("Censo"));
        assert!(table.is_empty());
        assert_eq!(table.diagnostics, vec![Diagnostic::MissingColumn { field: "species" }]);
    }

    #[test]
    fn test_dispatch() {
        let inv = inventory(vec![stem("P1_ut1", "1", "A", Some(10.0))]);
        assert!(matches!(phytosociology(&inv, &carac("Censo")), Phytosociology::Census(_)));
        assert!(matches!(phytosociology(&inv, &carac("Parcela")), Phytosociology::Plots(_)));
    }

    #[test]
    fn test_to_dataframe_columns() {
        let inv = inventory(vec![stem("P1_p1", "1", "A", Some(10.0))]);
        let df = phytosociology_plots(&inv, &carac("Parcela")).to_dataframe().unwrap();
        assert_eq!(
            df.get_column_names_str(),
            vec![
                col::SPECIES,
                col::INDIVIDUALS,
                col::BASAL_AREA_M2,
                col::PLOTS,
                col::ABSOLUTE_DENSITY,
                col::ABSOLUTE_DOMINANCE,
                col::RELATIVE_DENSITY,
                col::RELATIVE_DOMINANCE,
                col::RELATIVE_FREQUENCY,
                col::COVERAGE_VALUE,
                col::IMPORTANCE_VALUE,
            ]
        );
        assert_eq!(df.height(), 1);
    }
}
