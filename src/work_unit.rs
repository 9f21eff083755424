//! Work-unit aggregate built once from the stem-level inventory.
//!
//! The inventory repeats the work-unit area on every stem row. Grouping the
//! rows here, right after parsing, gives every consumer one area per unit
//! and keeps any disagreement between repeated values visible.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::Diagnostic;
use crate::records::{code_key, InventoryTable};

/// Area values are compared after rounding to this many decimals.
const AREA_DECIMALS: i32 = 8;

#[derive(Debug, Clone, PartialEq)]
pub struct WorkUnit {
    pub property: String,
    pub work_unit: String,
    /// First non-missing area value seen for the unit.
    pub area_ha: Option<f64>,
    pub stems: usize,
    /// Distinct tags, or `stems` when the inventory has no tag column.
    pub individuals: usize,
    /// Distinct area values in ascending order.
    pub distinct_areas: Vec<f64>,
}

impl WorkUnit {
    pub fn is_consistent(&self) -> bool {
        self.distinct_areas.len() <= 1
    }

    pub fn min_area(&self) -> Option<f64> {
        self.distinct_areas.first().copied()
    }

    pub fn max_area(&self) -> Option<f64> {
        self.distinct_areas.last().copied()
    }

    pub fn inconsistency(&self) -> Option<Diagnostic> {
        if self.is_consistent() {
            return None;
        }
        Some(Diagnostic::InconsistentArea {
            property: self.property.clone(),
            work_unit: self.work_unit.clone(),
            values: self.distinct_areas.clone(),
        })
    }
}

#[derive(Default)]
struct Accumulator {
    property: String,
    work_unit: String,
    area_ha: Option<f64>,
    stems: usize,
    tags: BTreeSet<String>,
    areas: BTreeSet<i64>,
}

fn area_bucket(value: f64) -> i64 {
    (value * 10f64.powi(AREA_DECIMALS)).round() as i64
}

/// Group stem rows into work units, ordered by (property, work unit).
///
/// Rows without both a property and a work unit are skipped.
pub fn work_units(inventory: &InventoryTable) -> Vec<WorkUnit> {
    let has_tags = inventory.columns.tag.is_some();
    let mut groups: BTreeMap<(String, String), Accumulator> = BTreeMap::new();

    for row in &inventory.rows {
        let (Some(property), Some(work_unit)) = (row.property.as_deref(), row.work_unit.as_deref())
        else {
            continue;
        };
        let acc = groups
            .entry((code_key(property), code_key(work_unit)))
            .or_insert_with(|| Accumulator {
                property: property.to_string(),
                work_unit: work_unit.to_string(),
                ..Default::default()
            });

        acc.stems += 1;
        if let Some(tag) = &row.tag {
            acc.tags.insert(tag.clone());
        }
        if let Some(area) = row.area_ha {
            acc.area_ha.get_or_insert(area);
            acc.areas.insert(area_bucket(area));
        }
    }

    let scale = 10f64.powi(AREA_DECIMALS);
    groups
        .into_values()
        .map(|acc| WorkUnit {
            individuals: if has_tags { acc.tags.len() } else { acc.stems },
            distinct_areas: acc.areas.iter().map(|b| *b as f64 / scale).collect(),
            property: acc.property,
            work_unit: acc.work_unit,
            area_ha: acc.area_ha,
            stems: acc.stems,
        })
        .collect()
}
