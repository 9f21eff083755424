//! Sampled-area estimation per sampling technique.
//!
//! Every entry point returns an [`AreaEstimate`]; missing columns and empty
//! subsets give a zero area with diagnostics instead of an error.

use std::collections::BTreeSet;

use crate::error::{merge_diagnostics, Diagnostic};
use crate::records::{CharacterizationTable, InventoryTable};
use crate::schema::constants::{M2_PER_HA, PLOT_AREA_M2};
use crate::technique::{classify_technique, partition_properties, Technique};
use crate::work_unit::work_units;

#[derive(Debug, Clone, PartialEq)]
pub struct AreaEstimate {
    pub area_ha: f64,
    /// Human-readable account of how the area was obtained.
    pub method: String,
    pub diagnostics: Vec<Diagnostic>,
}

impl AreaEstimate {
    fn zero(method: impl Into<String>, diagnostic: Diagnostic) -> Self {
        Self {
            area_ha: 0.0,
            method: method.into(),
            diagnostics: vec![diagnostic],
        }
    }

    pub fn has_inconsistent_area(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_inconsistent_area)
    }
}

/// Census area: one area value per (property, work unit), summed.
pub fn census_area(inventory: &InventoryTable) -> AreaEstimate {
    if inventory.is_empty() {
        return AreaEstimate::zero(
            "Census (no inventory rows)",
            Diagnostic::EmptyInput { what: "inventory" },
        );
    }
    if inventory.columns.area_ha.is_none() {
        return AreaEstimate::zero(
            "Census (area column not found)",
            Diagnostic::MissingColumn { field: "area_ha" },
        );
    }
    if inventory.columns.plot_code.is_none() && inventory.columns.property.is_none() {
        return AreaEstimate::zero(
            "Census (plot code column not found)",
            Diagnostic::MissingColumn { field: "plot_code" },
        );
    }

    let units = work_units(inventory);
    if units.is_empty() {
        return AreaEstimate::zero(
            "Census (property and work unit not identified)",
            Diagnostic::MissingColumn { field: "work_unit" },
        );
    }

    let mut diagnostics = Vec::new();
    for unit in &units {
        if let Some(diagnostic) = unit.inconsistency() {
            tracing::warn!(
                property = %unit.property,
                work_unit = %unit.work_unit,
                values = ?unit.distinct_areas,
                "inconsistent area within work unit"
            );
            diagnostics.push(diagnostic);
        }
    }

    let area_ha: f64 = units.iter().filter_map(|u| u.area_ha).sum();
    let individuals: usize = units.iter().map(|u| u.individuals).sum();
    let method = format!("Census ({} work units, {} individuals)", units.len(), individuals);
    tracing::debug!(area_ha, work_units = units.len(), individuals, "census area");

    AreaEstimate {
        area_ha,
        method,
        diagnostics,
    }
}

/// Plot area: each distinct plot code stands for one 100 m² subplot.
pub fn plot_area(inventory: &InventoryTable) -> AreaEstimate {
    if inventory.is_empty() {
        return AreaEstimate::zero("Plots (no inventory rows)", Diagnostic::EmptyInput { what: "inventory" });
    }
    if inventory.columns.plot_code.is_none() {
        return AreaEstimate::zero(
            "Plots (plot code column not found)",
            Diagnostic::MissingColumn { field: "plot_code" },
        );
    }

    let plots: BTreeSet<&str> = inventory
        .rows
        .iter()
        .filter_map(|r| r.plot_code.as_deref())
        .collect();
    let area_ha = plots.len() as f64 * PLOT_AREA_M2 / M2_PER_HA;
    tracing::debug!(area_ha, plots = plots.len(), "plot area");

    AreaEstimate {
        area_ha,
        method: format!("Plots ({} plots x {} m2)", plots.len(), PLOT_AREA_M2),
        diagnostics: Vec::new(),
    }
}

/// Estimate the sampled area of an inventory subset, choosing the formula
/// from the technique of the matching characterization subset.
///
/// Parse diagnostics of both tables are carried into the result.
pub fn estimate_area(
    characterization: &CharacterizationTable,
    inventory: &InventoryTable,
) -> AreaEstimate {
    let mut estimate = if characterization.is_empty() && inventory.is_empty() {
        AreaEstimate::zero("No data", Diagnostic::EmptyInput { what: "characterization and inventory" })
    } else if characterization.is_empty() {
        plot_area(inventory)
    } else {
        match classify_technique(characterization) {
            Technique::CensusOnly => census_area(inventory),
            Technique::PlotOnly | Technique::Unknown => plot_area(inventory),
            Technique::Mixed => mixed_area(characterization, inventory),
        }
    };
    merge_diagnostics(&mut estimate.diagnostics, &characterization.diagnostics);
    merge_diagnostics(&mut estimate.diagnostics, &inventory.diagnostics);
    estimate
}

/// Census area of the census partition plus plot area of the plot partition.
fn mixed_area(characterization: &CharacterizationTable, inventory: &InventoryTable) -> AreaEstimate {
    if characterization.columns.property.is_none() {
        return AreaEstimate::zero(
            "Mixed (property column not found)",
            Diagnostic::MissingColumn { field: "property" },
        );
    }

    let partition = partition_properties(characterization);
    let mut area_ha = 0.0;
    let mut methods = Vec::new();
    let mut diagnostics = Vec::new();

    let parts: [(&str, &Vec<String>, fn(&InventoryTable) -> AreaEstimate); 2] = [
        ("Census", &partition.census, census_area),
        ("Plots", &partition.plot, plot_area),
    ];
    for (label, properties, estimator) in parts {
        if properties.is_empty() {
            continue;
        }
        let subset = inventory.for_properties(properties);
        if subset.is_empty() {
            continue;
        }
        let part = estimator(&subset);
        area_ha += part.area_ha;
        methods.push(format!("{label}: {}", part.method));
        diagnostics.extend(part.diagnostics);
    }

    if methods.is_empty() {
        return AreaEstimate::zero("Mixed (no data)", Diagnostic::EmptyInput { what: "mixed inventory partitions" });
    }
    tracing::debug!(area_ha, parts = methods.len(), "mixed area");

    AreaEstimate {
        area_ha,
        method: methods.join(" + "),
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{
        CharacterizationColumns, CharacterizationRecord, InventoryColumns, InventoryRecord,
    };
    use approx::assert_relative_eq;

    fn inventory(rows: &[(&str, &str, Option<f64>)]) -> InventoryTable {
        let columns = InventoryColumns {
            plot_code: Some("cod_parc".into()),
            tag: Some("plaqueta".into()),
            area_ha: Some("area_ha".into()),
            ..Default::default()
        };
        let rows = rows
            .iter()
            .map(|(plot, tag, area)| {
                let (prop, ut) = plot.split_once('_').unwrap();
                InventoryRecord {
                    plot_code: Some(plot.to_string()),
                    property: Some(prop.to_string()),
                    work_unit: Some(ut.to_string()),
                    tag: Some(tag.to_string()),
                    area_ha: *area,
                    ..Default::default()
                }
            })
            .collect();
        InventoryTable::from_records(columns, rows)
    }

    fn carac(rows: &[(&str, &str)]) -> CharacterizationTable {
        let columns = CharacterizationColumns {
            property: Some("cod_prop".into()),
            technique: Some("tecnica_am".into()),
            ..Default::default()
        };
        let rows = rows
            .iter()
            .map(|(p, t)| CharacterizationRecord {
                property: Some(p.to_string()),
                technique: Some(t.to_string()),
                ..Default::default()
            })
            .collect();
        CharacterizationTable::from_records(columns, rows)
    }

    #[test]
    fn test_census_area_dedups_work_units() {
        let inv = inventory(&[
            ("P1_ut1", "1", Some(0.1)),
            ("P1_ut1", "1", Some(0.1)),
            ("P1_ut1", "2", Some(0.1)),
            ("P1_ut2", "3", Some(0.07)),
        ]);
        let est = census_area(&inv);
        assert_relative_eq!(est.area_ha, 0.17, epsilon = 1e-12);
        assert_eq!(est.method, "Census (2 work units, 3 individuals)");
        assert!(est.diagnostics.is_empty());
    }

    #[test]
    fn test_census_area_flags_inconsistent_unit() {
        let inv = inventory(&[("P1_ut1", "1", Some(0.1)), ("P1_ut1", "2", Some(0.3))]);
        let est = census_area(&inv);
        assert_relative_eq!(est.area_ha, 0.1);
        assert!(est.has_inconsistent_area());
    }

    #[test]
    fn test_census_area_without_area_column() {
        let mut inv = inventory(&[("P1_ut1", "1", None)]);
        inv.columns.area_ha = None;
        let est = census_area(&inv);
        assert_eq!(est.area_ha, 0.0);
        assert_eq!(est.diagnostics, vec![Diagnostic::MissingColumn { field: "area_ha" }]);
    }

    #[test]
    fn test_plot_area_formula() {
        let rows: Vec<(String, String)> = (0..17).map(|i| (format!("P1_{i}"), i.to_string())).collect();
        let borrowed: Vec<(&str, &str, Option<f64>)> =
            rows.iter().map(|(p, t)| (p.as_str(), t.as_str(), None)).collect();
        let est = plot_area(&inventory(&borrowed));
        assert_eq!(est.area_ha, 0.17);
    }

    #[test]
    fn test_estimate_area_dispatch() {
        let inv = inventory(&[("P1_ut1", "1", Some(0.5)), ("P1_ut2", "2", Some(0.5))]);
        assert_relative_eq!(estimate_area(&carac(&[("P1", "Censo")]), &inv).area_ha, 1.0);
        assert_relative_eq!(estimate_area(&carac(&[("P1", "Parcela")]), &inv).area_ha, 0.02);
        // no marker matched: plot formula
        assert_relative_eq!(estimate_area(&carac(&[("P1", "Outro")]), &inv).area_ha, 0.02);
    }

    #[test]
    fn test_mixed_area_sums_partitions() {
        let inv = inventory(&[
            ("P1_ut1", "1", Some(0.1)),
            ("P1_ut2", "2", Some(0.07)),
            ("P2_a", "3", Some(9.0)),
            ("P2_b", "4", Some(9.0)),
            ("P2_c", "5", Some(9.0)),
        ]);
        let est = estimate_area(&carac(&[("P1", "Censo"), ("P2", "Parcela")]), &inv);
        assert_relative_eq!(est.area_ha, 0.17 + 0.03, epsilon = 1e-12);
        assert_eq!(
            est.method,
            "Census: Census (2 work units, 2 individuals) + Plots: Plots (3 plots x 100 m2)"
        );
    }

    #[test]
    fn test_estimate_carries_unparseable_values() {
        use polars::prelude::*;

        let inv = df!(
            "cod_parc" => ["P1_ut1", "P1_ut1"],
            "plaqueta" => ["1", "2"],
            "area_ha" => ["0.1", "abc"]
        )
        .unwrap();
        let inv = InventoryTable::from_frame(&inv).unwrap();

        let est = estimate_area(&carac(&[("P1", "Censo")]), &inv);
        assert_relative_eq!(est.area_ha, 0.1);
        assert_eq!(
            est.diagnostics,
            vec![Diagnostic::UnparseableValue { field: "area_ha", count: 1 }]
        );
    }

    #[test]
    fn test_empty_inputs() {
        let est = estimate_area(&carac(&[]), &inventory(&[]));
        assert_eq!(est.area_ha, 0.0);
        assert_eq!(est.method, "No data");
    }
}
