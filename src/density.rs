//! Per-hectare density of individuals.
//!
//! The numerator counts distinct tags in the (possibly filtered) inventory;
//! the denominator is always the area of the unfiltered pair.

use std::collections::BTreeSet;

use crate::area::estimate_area;
use crate::columns::contains_any;
use crate::error::{merge_diagnostics, Diagnostic};
use crate::records::{CharacterizationTable, InventoryColumns, InventoryRecord, InventoryTable};
use crate::schema::{constants, markers};

#[derive(Debug, Clone, PartialEq)]
pub struct DensityEstimate {
    /// Individuals per hectare; 0 when the area is not positive.
    pub density: f64,
    pub individuals: usize,
    pub area_ha: f64,
    pub method: String,
    pub diagnostics: Vec<Diagnostic>,
}

impl DensityEstimate {
    fn zero(method: impl Into<String>, diagnostic: Diagnostic) -> Self {
        Self {
            density: 0.0,
            individuals: 0,
            area_ha: 0.0,
            method: method.into(),
            diagnostics: vec![diagnostic],
        }
    }
}

/// One step of the regenerant filter. A step whose column is absent is
/// skipped; rows with a missing value fail every step except `NotDead`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegenerantStep {
    NotDead,
    Native,
    Young,
    MinHeight,
}

/// The regenerant filter, in the order it is applied.
pub const REGENERANT_STEPS: [RegenerantStep; 4] = [
    RegenerantStep::NotDead,
    RegenerantStep::Native,
    RegenerantStep::Young,
    RegenerantStep::MinHeight,
];

impl RegenerantStep {
    pub fn name(&self) -> &'static str {
        match self {
            RegenerantStep::NotDead => "not_dead",
            RegenerantStep::Native => "native",
            RegenerantStep::Young => "young",
            RegenerantStep::MinHeight => "min_height",
        }
    }

    fn column<'a>(&self, columns: &'a InventoryColumns) -> Option<&'a String> {
        match self {
            RegenerantStep::NotDead => columns.species.as_ref(),
            RegenerantStep::Native => columns.origin.as_ref(),
            RegenerantStep::Young => columns.age_class.as_ref(),
            RegenerantStep::MinHeight => columns.height.as_ref(),
        }
    }

    pub fn keeps(&self, row: &InventoryRecord) -> bool {
        match self {
            RegenerantStep::NotDead => !row
                .species
                .as_deref()
                .map(|s| contains_any(s, markers::DEAD))
                .unwrap_or(false),
            RegenerantStep::Native => row
                .origin
                .as_deref()
                .map(|o| contains_any(o, markers::NATIVE))
                .unwrap_or(false),
            RegenerantStep::Young => row
                .age_class
                .as_deref()
                .map(|a| contains_any(a, markers::YOUNG))
                .unwrap_or(false),
            RegenerantStep::MinHeight => row
                .height
                .map(|h| h >= constants::REGENERANT_MIN_HEIGHT)
                .unwrap_or(false),
        }
    }
}

/// Apply `steps` in sequence, skipping any whose column is absent.
pub fn apply_steps(inventory: &InventoryTable, steps: &[RegenerantStep]) -> InventoryTable {
    let mut current = inventory.clone();
    for step in steps {
        if step.column(&current.columns).is_none() {
            tracing::debug!(step = step.name(), "regenerant filter step skipped, column absent");
            continue;
        }
        let before = current.len();
        current = current.subset(|r| step.keeps(r));
        tracing::debug!(step = step.name(), before, after = current.len(), "regenerant filter step");
    }
    current
}

/// Rows that qualify as regenerating individuals.
pub fn regenerants(inventory: &InventoryTable) -> InventoryTable {
    apply_steps(inventory, &REGENERANT_STEPS)
}

fn distinct_tags(rows: &[InventoryRecord]) -> usize {
    rows.iter()
        .filter_map(|r| r.tag.as_deref())
        .collect::<BTreeSet<_>>()
        .len()
}

/// Density plus the parse diagnostics of both input tables.
fn density_over_area(
    counted: &InventoryTable,
    inventory: &InventoryTable,
    characterization: &CharacterizationTable,
) -> DensityEstimate {
    let mut estimate = count_over_area(counted, inventory, characterization);
    merge_diagnostics(&mut estimate.diagnostics, &characterization.diagnostics);
    merge_diagnostics(&mut estimate.diagnostics, &inventory.diagnostics);
    estimate
}

fn count_over_area(
    counted: &InventoryTable,
    inventory: &InventoryTable,
    characterization: &CharacterizationTable,
) -> DensityEstimate {
    if inventory.is_empty() || characterization.is_empty() {
        return DensityEstimate::zero("No data", Diagnostic::EmptyInput { what: "density input" });
    }
    if inventory.columns.tag.is_none() {
        return DensityEstimate::zero(
            "Tag column not found",
            Diagnostic::MissingColumn { field: "tag" },
        );
    }

    let individuals = distinct_tags(&counted.rows);
    let area = estimate_area(characterization, inventory);
    let density = if area.area_ha > 0.0 {
        individuals as f64 / area.area_ha
    } else {
        0.0
    };

    DensityEstimate {
        density,
        individuals,
        area_ha: area.area_ha,
        method: area.method,
        diagnostics: area.diagnostics,
    }
}

/// Distinct tags per hectare, with no restriction on the individuals.
pub fn general_density(
    inventory: &InventoryTable,
    characterization: &CharacterizationTable,
) -> DensityEstimate {
    let mut estimate = density_over_area(inventory, inventory, characterization);
    if estimate.method.contains(" + ") {
        estimate.method = format!("Mixed method: {}", estimate.method);
    }
    estimate
}

/// Regenerating individuals per hectare, over the unfiltered sampled area.
pub fn regenerant_density(
    inventory: &InventoryTable,
    characterization: &CharacterizationTable,
) -> DensityEstimate {
    let qualifying = regenerants(inventory);
    density_over_area(&qualifying, inventory, characterization)
}
