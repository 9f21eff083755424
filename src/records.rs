//! Typed views over the two loaded datasets.
//!
//! Physical column names are resolved once, cells are coerced into typed
//! records, and everything downstream works on these tables instead of on
//! raw frames. Unparseable numeric cells become `None` and are counted.

use std::collections::{BTreeMap, BTreeSet};

use polars::prelude::*;

use crate::columns::resolve_column;
use crate::error::{Diagnostic, RestorationError};
use crate::schema::{characterization as carac, constants, inventory as inv};

/// One characterization row (plot / work-unit observation).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CharacterizationRecord {
    pub property: Option<String>,
    pub work_unit: Option<String>,
    pub technique: Option<String>,
    pub canopy_cover: Option<f64>,
    pub restoration_method: Option<String>,
    pub richness_target: Option<f64>,
}

/// Which logical characterization fields were found in the source frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CharacterizationColumns {
    pub property: Option<String>,
    pub work_unit: Option<String>,
    pub technique: Option<String>,
    pub canopy_cover: Option<String>,
    pub restoration_method: Option<String>,
    pub richness_target: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CharacterizationTable {
    pub columns: CharacterizationColumns,
    pub rows: Vec<CharacterizationRecord>,
    pub diagnostics: Vec<Diagnostic>,
}

/// One inventory row: a single stem measurement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InventoryRecord {
    pub plot_code: Option<String>,
    /// Derived from the plot code prefix, or a dedicated column.
    pub property: Option<String>,
    /// Derived from the plot code suffix, or a dedicated column.
    pub work_unit: Option<String>,
    pub tag: Option<String>,
    pub species: Option<String>,
    pub origin: Option<String>,
    pub age_class: Option<String>,
    pub height: Option<f64>,
    pub diameter: Option<f64>,
    pub area_ha: Option<f64>,
    pub richness_target: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InventoryColumns {
    pub plot_code: Option<String>,
    pub property: Option<String>,
    pub work_unit: Option<String>,
    pub tag: Option<String>,
    pub species: Option<String>,
    pub origin: Option<String>,
    pub age_class: Option<String>,
    pub height: Option<String>,
    pub diameter: Option<String>,
    pub area_ha: Option<String>,
    pub richness_target: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct InventoryTable {
    pub columns: InventoryColumns,
    pub rows: Vec<InventoryRecord>,
    pub diagnostics: Vec<Diagnostic>,
}

// ── Cell coercion ───────────────────────────────────────────────────────────

/// Parse a numeric cell; decimal commas are accepted.
pub fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Key used to compare property / work-unit codes across datasets.
pub fn code_key(code: &str) -> String {
    code.trim().to_lowercase()
}

pub(crate) fn text_cells(
    df: &DataFrame,
    column: Option<&str>,
) -> Result<Vec<Option<String>>, RestorationError> {
    let Some(name) = column else {
        return Ok(vec![None; df.height()]);
    };
    let casted = df.column(name)?.cast(&DataType::String)?;
    let values = casted
        .str()?
        .into_iter()
        .map(|v| {
            v.map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        })
        .collect();
    Ok(values)
}

fn numeric_cells(
    df: &DataFrame,
    column: Option<&str>,
    field: &'static str,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<Vec<Option<f64>>, RestorationError> {
    let cells = text_cells(df, column)?;
    let mut failed = 0usize;
    let values = cells
        .iter()
        .map(|cell| match cell {
            Some(raw) => {
                let parsed = parse_number(raw);
                if parsed.is_none() {
                    failed += 1;
                }
                parsed
            }
            None => None,
        })
        .collect();

    if failed > 0 {
        tracing::warn!(field, count = failed, "unparseable numeric cells");
        diagnostics.push(Diagnostic::UnparseableValue {
            field,
            count: failed,
        });
    }
    Ok(values)
}

fn resolve(names: &[&str], candidates: &[&str]) -> Option<String> {
    resolve_column(names, candidates).map(str::to_string)
}

// ── Characterization ────────────────────────────────────────────────────────

impl CharacterizationTable {
    pub fn from_frame(df: &DataFrame) -> Result<Self, RestorationError> {
        let names = df.get_column_names_str();
        let columns = CharacterizationColumns {
            property: resolve(&names, carac::PROPERTY),
            work_unit: resolve(&names, carac::WORK_UNIT),
            technique: resolve(&names, carac::TECHNIQUE),
            canopy_cover: resolve(&names, carac::CANOPY_COVER),
            restoration_method: resolve(&names, carac::RESTORATION_METHOD),
            richness_target: resolve(&names, carac::RICHNESS_TARGET),
        };

        let mut diagnostics = Vec::new();
        let property = text_cells(df, columns.property.as_deref())?;
        let work_unit = text_cells(df, columns.work_unit.as_deref())?;
        let technique = text_cells(df, columns.technique.as_deref())?;
        let method = text_cells(df, columns.restoration_method.as_deref())?;
        let canopy = numeric_cells(
            df,
            columns.canopy_cover.as_deref(),
            "canopy_cover",
            &mut diagnostics,
        )?;
        let richness = numeric_cells(
            df,
            columns.richness_target.as_deref(),
            "richness_target",
            &mut diagnostics,
        )?;

        let rows = (0..df.height())
            .map(|i| CharacterizationRecord {
                property: property[i].clone(),
                work_unit: work_unit[i].clone(),
                technique: technique[i].clone(),
                canopy_cover: canopy[i],
                restoration_method: method[i].clone(),
                richness_target: richness[i],
            })
            .collect();

        Ok(Self {
            columns,
            rows,
            diagnostics,
        })
    }

    pub fn from_records(columns: CharacterizationColumns, rows: Vec<CharacterizationRecord>) -> Self {
        Self {
            columns,
            rows,
            diagnostics: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Distinct property keys, in first-seen order of their display form.
    pub fn properties(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        self.rows
            .iter()
            .filter_map(|r| r.property.as_deref())
            .filter(|p| seen.insert(code_key(p)))
            .map(str::to_string)
            .collect()
    }

    /// Same columns, keeping only rows for which `keep` holds.
    pub fn subset<F: Fn(&CharacterizationRecord) -> bool>(&self, keep: F) -> Self {
        Self {
            columns: self.columns.clone(),
            rows: self.rows.iter().filter(|r| keep(r)).cloned().collect(),
            diagnostics: self.diagnostics.clone(),
        }
    }

    /// Same columns and parse diagnostics, no rows.
    pub fn empty_like(&self) -> Self {
        Self {
            columns: self.columns.clone(),
            rows: Vec::new(),
            diagnostics: self.diagnostics.clone(),
        }
    }

    /// Rows split by property key in one pass. Rows without a property are dropped.
    pub fn by_property(&self) -> BTreeMap<String, Self> {
        let mut groups: BTreeMap<String, Self> = BTreeMap::new();
        for row in &self.rows {
            let Some(property) = row.property.as_deref() else {
                continue;
            };
            groups
                .entry(code_key(property))
                .or_insert_with(|| self.empty_like())
                .rows
                .push(row.clone());
        }
        groups
    }
}

// ── Inventory ───────────────────────────────────────────────────────────────

impl InventoryTable {
    pub fn from_frame(df: &DataFrame) -> Result<Self, RestorationError> {
        let names = df.get_column_names_str();
        let columns = InventoryColumns {
            plot_code: resolve(&names, inv::PLOT_CODE),
            property: resolve(&names, inv::PROPERTY),
            work_unit: resolve(&names, inv::WORK_UNIT),
            tag: resolve(&names, inv::TAG),
            species: resolve(&names, inv::SPECIES),
            origin: resolve(&names, inv::ORIGIN),
            age_class: resolve(&names, inv::AGE_CLASS),
            height: resolve(&names, inv::HEIGHT),
            diameter: resolve(&names, inv::DIAMETER),
            area_ha: resolve(&names, inv::AREA_HA),
            richness_target: resolve(&names, inv::RICHNESS_TARGET),
        };

        let mut diagnostics = Vec::new();
        let plot_code = text_cells(df, columns.plot_code.as_deref())?;
        let property = text_cells(df, columns.property.as_deref())?;
        let work_unit = text_cells(df, columns.work_unit.as_deref())?;
        let tag = text_cells(df, columns.tag.as_deref())?;
        let species = text_cells(df, columns.species.as_deref())?;
        let origin = text_cells(df, columns.origin.as_deref())?;
        let age_class = text_cells(df, columns.age_class.as_deref())?;
        let height = numeric_cells(df, columns.height.as_deref(), "height", &mut diagnostics)?;
        let diameter =
            numeric_cells(df, columns.diameter.as_deref(), "diameter", &mut diagnostics)?;
        let area_ha = numeric_cells(df, columns.area_ha.as_deref(), "area_ha", &mut diagnostics)?;
        let richness = numeric_cells(
            df,
            columns.richness_target.as_deref(),
            "richness_target",
            &mut diagnostics,
        )?;

        let rows = (0..df.height())
            .map(|i| {
                let (prop, ut) = split_plot_code(
                    plot_code[i].as_deref(),
                    property[i].as_deref(),
                    work_unit[i].as_deref(),
                );
                InventoryRecord {
                    plot_code: plot_code[i].clone(),
                    property: prop,
                    work_unit: ut,
                    tag: tag[i].clone(),
                    species: species[i].clone(),
                    origin: origin[i].clone(),
                    age_class: age_class[i].clone(),
                    height: height[i],
                    diameter: diameter[i],
                    area_ha: area_ha[i],
                    richness_target: richness[i],
                }
            })
            .collect();

        Ok(Self {
            columns,
            rows,
            diagnostics,
        })
    }

    pub fn from_records(columns: InventoryColumns, rows: Vec<InventoryRecord>) -> Self {
        Self {
            columns,
            rows,
            diagnostics: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn subset<F: Fn(&InventoryRecord) -> bool>(&self, keep: F) -> Self {
        Self {
            columns: self.columns.clone(),
            rows: self.rows.iter().filter(|r| keep(r)).cloned().collect(),
            diagnostics: self.diagnostics.clone(),
        }
    }

    /// Same columns and parse diagnostics, no rows.
    pub fn empty_like(&self) -> Self {
        Self {
            columns: self.columns.clone(),
            rows: Vec::new(),
            diagnostics: self.diagnostics.clone(),
        }
    }

    /// Rows split by property key in one pass. Rows without a property are dropped.
    pub fn by_property(&self) -> BTreeMap<String, Self> {
        let mut groups: BTreeMap<String, Self> = BTreeMap::new();
        for row in &self.rows {
            let Some(property) = row.property.as_deref() else {
                continue;
            };
            groups
                .entry(code_key(property))
                .or_insert_with(|| self.empty_like())
                .rows
                .push(row.clone());
        }
        groups
    }

    /// Rows whose derived property is one of `properties` (case-insensitive).
    /// Rows without a derivable property are dropped.
    pub fn for_properties<S: AsRef<str>>(&self, properties: &[S]) -> Self {
        let keys: BTreeSet<String> = properties.iter().map(|p| code_key(p.as_ref())).collect();
        self.subset(|r| {
            r.property
                .as_deref()
                .map(|p| keys.contains(&code_key(p)))
                .unwrap_or(false)
        })
    }

    /// Distinct property keys derived from the plot codes, first-seen order.
    pub fn properties(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        self.rows
            .iter()
            .filter_map(|r| r.property.as_deref())
            .filter(|p| seen.insert(code_key(p)))
            .map(str::to_string)
            .collect()
    }

    /// Number of distinct tags, or `None` without a tag column.
    pub fn distinct_tags(&self) -> Option<usize> {
        self.columns.tag.as_ref()?;
        let tags: BTreeSet<&str> = self.rows.iter().filter_map(|r| r.tag.as_deref()).collect();
        Some(tags.len())
    }
}

/// Split `"{property}_{work_unit}"`; fall back to dedicated columns when the
/// code carries no separator.
fn split_plot_code(
    plot_code: Option<&str>,
    property: Option<&str>,
    work_unit: Option<&str>,
) -> (Option<String>, Option<String>) {
    if let Some(code) = plot_code {
        let mut parts = code.split(constants::PLOT_CODE_SEPARATOR);
        if let (Some(prop), Some(ut)) = (parts.next(), parts.next()) {
            if !prop.is_empty() {
                return (Some(prop.to_string()), Some(ut.to_string()));
            }
        }
    }
    match (property, work_unit) {
        (Some(p), Some(u)) => (Some(p.to_string()), Some(u.to_string())),
        (Some(p), None) => (Some(p.to_string()), None),
        _ => (None, None),
    }
}
