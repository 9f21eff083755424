//! Data-quality reports over the loaded datasets.

use std::collections::{BTreeMap, BTreeSet};

use polars::prelude::*;

use crate::columns::resolve_column;
use crate::error::RestorationError;
use crate::records::{code_key, parse_number, text_cells, CharacterizationTable, InventoryTable};
use crate::schema::{cover, markers};
use crate::work_unit::{work_units, WorkUnit};

// ── Work-unit areas ─────────────────────────────────────────────────────────

/// Work units of the inventory with their area spread.
pub fn work_unit_areas(inventory: &InventoryTable) -> Vec<WorkUnit> {
    work_units(inventory)
}

pub fn work_unit_frame(units: &[WorkUnit]) -> PolarsResult<DataFrame> {
    let property: Vec<&str> = units.iter().map(|u| u.property.as_str()).collect();
    let work_unit: Vec<&str> = units.iter().map(|u| u.work_unit.as_str()).collect();
    let stems: Vec<u32> = units.iter().map(|u| u.stems as u32).collect();
    let individuals: Vec<u32> = units.iter().map(|u| u.individuals as u32).collect();
    let area: Vec<Option<f64>> = units.iter().map(|u| u.area_ha).collect();
    let min: Vec<Option<f64>> = units.iter().map(|u| u.min_area()).collect();
    let max: Vec<Option<f64>> = units.iter().map(|u| u.max_area()).collect();
    let distinct: Vec<u32> = units.iter().map(|u| u.distinct_areas.len() as u32).collect();
    let consistent: Vec<bool> = units.iter().map(|u| u.is_consistent()).collect();

    DataFrame::new(vec![
        Column::new("cod_prop".into(), &property),
        Column::new("ut".into(), &work_unit),
        Column::new("stems".into(), &stems),
        Column::new("individuals".into(), &individuals),
        Column::new("area_ha".into(), &area),
        Column::new("area_min".into(), &min),
        Column::new("area_max".into(), &max),
        Column::new("distinct_areas".into(), &distinct),
        Column::new("consistent".into(), &consistent),
    ])
}

// ── Property cross-check ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyPresence {
    pub property: String,
    pub in_characterization: bool,
    pub in_inventory: bool,
    /// Distinct work units listed for the property in the characterization.
    pub work_units: usize,
}

impl PropertyPresence {
    pub fn is_consistent(&self) -> bool {
        self.in_characterization && self.in_inventory
    }
}

/// Which properties each dataset mentions, ordered by code.
pub fn property_crosscheck(
    characterization: &CharacterizationTable,
    inventory: &InventoryTable,
) -> Vec<PropertyPresence> {
    let mut report: BTreeMap<String, PropertyPresence> = BTreeMap::new();
    let mut units: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

    for row in &characterization.rows {
        let Some(property) = row.property.as_deref() else {
            continue;
        };
        let key = code_key(property);
        report
            .entry(key.clone())
            .or_insert_with(|| PropertyPresence {
                property: property.to_string(),
                in_characterization: false,
                in_inventory: false,
                work_units: 0,
            })
            .in_characterization = true;
        if let Some(ut) = row.work_unit.as_deref() {
            units.entry(key).or_default().insert(code_key(ut));
        }
    }

    for property in inventory.properties() {
        report
            .entry(code_key(&property))
            .or_insert_with(|| PropertyPresence {
                property: property.clone(),
                in_characterization: false,
                in_inventory: false,
                work_units: 0,
            })
            .in_inventory = true;
    }

    report
        .into_iter()
        .map(|(key, mut presence)| {
            presence.work_units = units.get(&key).map(BTreeSet::len).unwrap_or(0);
            presence
        })
        .collect()
}

pub fn crosscheck_frame(report: &[PropertyPresence]) -> PolarsResult<DataFrame> {
    let property: Vec<&str> = report.iter().map(|p| p.property.as_str()).collect();
    let in_carac: Vec<bool> = report.iter().map(|p| p.in_characterization).collect();
    let in_inv: Vec<bool> = report.iter().map(|p| p.in_inventory).collect();
    let uts: Vec<u32> = report.iter().map(|p| p.work_units as u32).collect();
    let ok: Vec<bool> = report.iter().map(|p| p.is_consistent()).collect();

    DataFrame::new(vec![
        Column::new("cod_prop".into(), &property),
        Column::new("in_characterization".into(), &in_carac),
        Column::new("in_inventory".into(), &in_inv),
        Column::new("work_units".into(), &uts),
        Column::new("consistent".into(), &ok),
    ])
}

// ── Outliers ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct OutlierSummary {
    pub field: &'static str,
    pub values: usize,
    pub outliers: usize,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
}

/// Quantile of sorted values with linear interpolation between ranks.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = (sorted.len() - 1) as f64 * q;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Tukey fences (1.5 IQR) over one numeric series. `None` when empty.
pub fn outliers(field: &'static str, values: &[f64]) -> Option<OutlierSummary> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let q1 = quantile(&sorted, 0.25);
    let q3 = quantile(&sorted, 0.75);
    let iqr = q3 - q1;
    let lower_bound = q1 - 1.5 * iqr;
    let upper_bound = q3 + 1.5 * iqr;

    Some(OutlierSummary {
        field,
        values: sorted.len(),
        outliers: sorted
            .iter()
            .filter(|v| **v < lower_bound || **v > upper_bound)
            .count(),
        lower_bound,
        upper_bound,
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        median: quantile(&sorted, 0.5),
    })
}

/// Outlier summary for height, diameter and area, where present.
pub fn outlier_summary(inventory: &InventoryTable) -> Vec<OutlierSummary> {
    let fields: [(&'static str, bool, fn(&crate::records::InventoryRecord) -> Option<f64>); 3] = [
        ("height", inventory.columns.height.is_some(), |r| r.height),
        ("diameter", inventory.columns.diameter.is_some(), |r| r.diameter),
        ("area_ha", inventory.columns.area_ha.is_some(), |r| r.area_ha),
    ];

    fields
        .into_iter()
        .filter(|(_, present, _)| *present)
        .filter_map(|(field, _, value)| {
            let values: Vec<f64> = inventory.rows.iter().filter_map(value).collect();
            outliers(field, &values)
        })
        .collect()
}

pub fn outlier_frame(summary: &[OutlierSummary]) -> PolarsResult<DataFrame> {
    let field: Vec<&str> = summary.iter().map(|s| s.field).collect();
    let values: Vec<u32> = summary.iter().map(|s| s.values as u32).collect();
    let outliers: Vec<u32> = summary.iter().map(|s| s.outliers as u32).collect();
    let pick = |f: fn(&OutlierSummary) -> f64| -> Vec<f64> { summary.iter().map(f).collect() };

    DataFrame::new(vec![
        Column::new("field".into(), &field),
        Column::new("values".into(), &values),
        Column::new("outliers".into(), &outliers),
        Column::new("lower_bound".into(), &pick(|s| s.lower_bound)),
        Column::new("upper_bound".into(), &pick(|s| s.upper_bound)),
        Column::new("min".into(), &pick(|s| s.min)),
        Column::new("max".into(), &pick(|s| s.max)),
        Column::new("median".into(), &pick(|s| s.median)),
    ])
}

// ── Characterization cover and disturbances ─────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct CoverMean {
    pub indicator: &'static str,
    pub column: String,
    /// Percent; a mean of at most 1 is read as a fraction and scaled.
    pub mean_pct: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DisturbanceCount {
    pub disturbance: &'static str,
    pub column: String,
    pub occurrences: usize,
}

/// Mean of every cover indicator found in the characterization frame.
pub fn cover_summary(df: &DataFrame) -> Result<Vec<CoverMean>, RestorationError> {
    let names = df.get_column_names_str();
    let mut summary = Vec::new();

    for &(indicator, candidates) in cover::INDICATORS {
        let Some(column) = resolve_column(&names, candidates) else {
            continue;
        };
        let values: Vec<f64> = text_cells(df, Some(column))?
            .iter()
            .filter_map(|c| c.as_deref().and_then(parse_number))
            .collect();
        let mean_pct = (!values.is_empty()).then(|| {
            let mean = values.iter().sum::<f64>() / values.len() as f64;
            if mean <= 1.0 {
                mean * 100.0
            } else {
                mean
            }
        });
        summary.push(CoverMean {
            indicator,
            column: column.to_string(),
            mean_pct,
        });
    }
    Ok(summary)
}

fn is_occurrence(cell: &str) -> bool {
    let lower = cell.trim().to_lowercase();
    !lower.is_empty() && !markers::ABSENT.contains(&lower.as_str())
}

/// Rows reporting each disturbance: any value other than empty, `não`,
/// `nao` or `0`.
pub fn disturbance_counts(df: &DataFrame) -> Result<Vec<DisturbanceCount>, RestorationError> {
    let names = df.get_column_names_str();
    let mut counts = Vec::new();

    for &(disturbance, candidates) in cover::DISTURBANCES {
        let Some(column) = resolve_column(&names, candidates) else {
            continue;
        };
        let occurrences = text_cells(df, Some(column))?
            .iter()
            .filter(|c| c.as_deref().map(is_occurrence).unwrap_or(false))
            .count();
        counts.push(DisturbanceCount {
            disturbance,
            column: column.to_string(),
            occurrences,
        });
    }
    Ok(counts)
}

pub fn cover_frame(summary: &[CoverMean]) -> PolarsResult<DataFrame> {
    let indicator: Vec<&str> = summary.iter().map(|c| c.indicator).collect();
    let column: Vec<&str> = summary.iter().map(|c| c.column.as_str()).collect();
    let mean: Vec<Option<f64>> = summary.iter().map(|c| c.mean_pct).collect();

    DataFrame::new(vec![
        Column::new("indicator".into(), &indicator),
        Column::new("column".into(), &column),
        Column::new("mean_pct".into(), &mean),
    ])
}

pub fn disturbance_frame(counts: &[DisturbanceCount]) -> PolarsResult<DataFrame> {
    let disturbance: Vec<&str> = counts.iter().map(|d| d.disturbance).collect();
    let column: Vec<&str> = counts.iter().map(|d| d.column.as_str()).collect();
    let occurrences: Vec<u32> = counts.iter().map(|d| d.occurrences as u32).collect();

    DataFrame::new(vec![
        Column::new("disturbance".into(), &disturbance),
        Column::new("column".into(), &column),
        Column::new("occurrences".into(), &occurrences),
    ])
}
