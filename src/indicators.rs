//! Per-property restoration scorecard.
//!
//! Three axes are scored against [`RestorationTargets`]: native canopy cover,
//! regenerant density and native species richness.

use std::collections::BTreeSet;
use std::fmt;

use polars::prelude::*;
use serde::Serialize;

use crate::columns::contains_any;
use crate::config::RestorationTargets;
use crate::density::regenerant_density;
use crate::error::Diagnostic;
use crate::records::{code_key, CharacterizationTable, InventoryTable};
use crate::schema::{constants, markers, scorecard as col};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RestorationMethod {
    Active,
    Assisted,
}

impl RestorationMethod {
    /// Assisted when the text mentions it, Active otherwise.
    pub fn from_text(text: Option<&str>) -> Self {
        match text {
            Some(t) if contains_any(t, markers::ASSISTED) => RestorationMethod::Assisted,
            _ => RestorationMethod::Active,
        }
    }

    pub fn density_target(&self, targets: &RestorationTargets) -> f64 {
        match self {
            RestorationMethod::Active => targets.density_active,
            RestorationMethod::Assisted => targets.density_assisted,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RestorationMethod::Active => "Active",
            RestorationMethod::Assisted => "Assisted",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Status {
    Excellent,
    Good,
    Regular,
    Critical,
}

impl Status {
    pub fn from_axes_met(met: usize) -> Self {
        match met {
            0 => Status::Critical,
            1 => Status::Regular,
            2 => Status::Good,
            _ => Status::Excellent,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Excellent => "Excellent",
            Status::Good => "Good",
            Status::Regular => "Regular",
            Status::Critical => "Critical",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyIndicators {
    pub property: String,
    /// Mean native canopy cover, percent.
    pub canopy_cover: f64,
    pub restoration_method: RestorationMethod,
    pub regenerant_density: f64,
    pub density_target: f64,
    pub observed_richness: usize,
    pub richness_target: f64,
    pub canopy_ok: bool,
    pub density_ok: bool,
    pub richness_ok: bool,
    pub status: Status,
    pub diagnostics: Vec<Diagnostic>,
}

/// Mean canopy cover as a percentage. A mean of at most 1 is read as a
/// fraction and scaled by 100.
fn canopy_cover(characterization: &CharacterizationTable) -> Option<f64> {
    characterization.columns.canopy_cover.as_ref()?;
    let values: Vec<f64> = characterization
        .rows
        .iter()
        .filter_map(|r| r.canopy_cover)
        .collect();
    if values.is_empty() {
        return None;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    Some(if mean <= 1.0 { mean * 100.0 } else { mean })
}

/// Distinct species among native individuals taller than 0.5 m.
/// Either restriction is dropped when its column is absent.
pub fn observed_richness(inventory: &InventoryTable) -> usize {
    let check_origin = inventory.columns.origin.is_some();
    let check_height = inventory.columns.height.is_some();

    inventory
        .rows
        .iter()
        .filter(|r| {
            !check_origin
                || r.origin
                    .as_deref()
                    .map(|o| contains_any(o, markers::NATIVE))
                    .unwrap_or(false)
        })
        .filter(|r| {
            !check_height
                || r.height
                    .map(|h| h > constants::RICHNESS_MIN_HEIGHT)
                    .unwrap_or(false)
        })
        .filter_map(|r| r.species.as_deref())
        .collect::<BTreeSet<_>>()
        .len()
}

fn richness_target(
    inventory: &InventoryTable,
    characterization: &CharacterizationTable,
    targets: &RestorationTargets,
) -> f64 {
    inventory
        .rows
        .iter()
        .find_map(|r| r.richness_target)
        .or_else(|| characterization.rows.iter().find_map(|r| r.richness_target))
        .unwrap_or(targets.default_richness)
}

/// Indicators for one property, from the subsets belonging to it.
pub fn property_indicators(
    property: &str,
    characterization: &CharacterizationTable,
    inventory: &InventoryTable,
    targets: &RestorationTargets,
) -> PropertyIndicators {
    let mut diagnostics = Vec::new();

    let canopy = canopy_cover(characterization).unwrap_or_else(|| {
        diagnostics.push(Diagnostic::MissingColumn { field: "canopy_cover" });
        0.0
    });

    let method = RestorationMethod::from_text(
        characterization
            .rows
            .first()
            .and_then(|r| r.restoration_method.as_deref()),
    );
    let density_target = method.density_target(targets);

    let density = regenerant_density(inventory, characterization);
    diagnostics.extend(density.diagnostics);

    if inventory.columns.species.is_none() {
        diagnostics.push(Diagnostic::MissingColumn { field: "species" });
    }
    let richness = observed_richness(inventory);
    let richness_target = richness_target(inventory, characterization, targets);

    let canopy_ok = canopy >= targets.canopy_cover_pct;
    let density_ok = density.density >= density_target;
    let richness_ok = richness as f64 >= richness_target;
    let met = [canopy_ok, density_ok, richness_ok].iter().filter(|ok| **ok).count();
    let status = Status::from_axes_met(met);

    tracing::debug!(
        property,
        canopy,
        density = density.density,
        richness,
        %status,
        "property indicators"
    );

    PropertyIndicators {
        property: property.to_string(),
        canopy_cover: canopy,
        restoration_method: method,
        regenerant_density: density.density,
        density_target,
        observed_richness: richness,
        richness_target,
        canopy_ok,
        density_ok,
        richness_ok,
        status,
        diagnostics,
    }
}

/// Properties named by either dataset, ordered by code.
pub fn scorecard_properties(
    characterization: &CharacterizationTable,
    inventory: &InventoryTable,
) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut properties: Vec<String> = characterization
        .properties()
        .into_iter()
        .chain(inventory.properties())
        .filter(|p| seen.insert(code_key(p)))
        .collect();
    properties.sort_by_key(|p| code_key(p));
    properties
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scorecard {
    pub rows: Vec<PropertyIndicators>,
}

impl Scorecard {
    pub fn get(&self, property: &str) -> Option<&PropertyIndicators> {
        let key = code_key(property);
        self.rows.iter().find(|r| code_key(&r.property) == key)
    }

    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let rows = &self.rows;
        let property: Vec<&str> = rows.iter().map(|r| r.property.as_str()).collect();
        let method: Vec<&str> = rows.iter().map(|r| r.restoration_method.as_str()).collect();
        let status: Vec<&str> = rows.iter().map(|r| r.status.as_str()).collect();
        let richness: Vec<u32> = rows.iter().map(|r| r.observed_richness as u32).collect();
        let float = |f: fn(&PropertyIndicators) -> f64| -> Vec<f64> { rows.iter().map(f).collect() };
        let flag = |f: fn(&PropertyIndicators) -> bool| -> Vec<bool> { rows.iter().map(f).collect() };

        DataFrame::new(vec![
            Column::new(col::PROPERTY.into(), &property),
            Column::new(col::CANOPY_COVER.into(), &float(|r| r.canopy_cover)),
            Column::new(col::RESTORATION_METHOD.into(), &method),
            Column::new(col::REGENERANT_DENSITY.into(), &float(|r| r.regenerant_density)),
            Column::new(col::DENSITY_TARGET.into(), &float(|r| r.density_target)),
            Column::new(col::OBSERVED_RICHNESS.into(), &richness),
            Column::new(col::RICHNESS_TARGET.into(), &float(|r| r.richness_target)),
            Column::new(col::CANOPY_OK.into(), &flag(|r| r.canopy_ok)),
            Column::new(col::DENSITY_OK.into(), &flag(|r| r.density_ok)),
            Column::new(col::RICHNESS_OK.into(), &flag(|r| r.richness_ok)),
            Column::new(col::STATUS.into(), &status),
        ])
    }
}

/// Scorecard over every property found in either dataset.
///
/// Both tables are split by property once, so the cost stays linear in rows.
pub fn restoration_indicators(
    characterization: &CharacterizationTable,
    inventory: &InventoryTable,
    targets: &RestorationTargets,
) -> Scorecard {
    let mut carac_groups = characterization.by_property();
    let mut inv_groups = inventory.by_property();

    let rows = scorecard_properties(characterization, inventory)
        .into_iter()
        .map(|property| {
            let key = code_key(&property);
            let carac = carac_groups
                .remove(&key)
                .unwrap_or_else(|| characterization.empty_like());
            let inv = inv_groups
                .remove(&key)
                .unwrap_or_else(|| inventory.empty_like());
            property_indicators(&property, &carac, &inv, targets)
        })
        .collect();
    Scorecard { rows }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{
        CharacterizationColumns, CharacterizationRecord, InventoryColumns, InventoryRecord,
    };
    use approx::assert_relative_eq;

    fn carac(rows: Vec<(&str, f64, &str)>) -> CharacterizationTable {
        CharacterizationTable::from_records(
            CharacterizationColumns {
                property: Some("cod_prop".into()),
                technique: Some("tecnica_am".into()),
                canopy_cover: Some("cobertura_nativa".into()),
                restoration_method: Some("metodo_restauracao".into()),
                ..Default::default()
            },
            rows.into_iter()
                .map(|(p, canopy, method)| CharacterizationRecord {
                    property: Some(p.into()),
                    technique: Some("Censo".into()),
                    canopy_cover: Some(canopy),
                    restoration_method: Some(method.into()),
                    ..Default::default()
                })
                .collect(),
        )
    }

    fn stem(plot: &str, tag: &str, species: &str, height: f64) -> InventoryRecord {
        let (prop, ut) = plot.split_once('_').unwrap();
        InventoryRecord {
            plot_code: Some(plot.into()),
            property: Some(prop.into()),
            work_unit: Some(ut.into()),
            tag: Some(tag.into()),
            species: Some(species.into()),
            origin: Some("Nativa".into()),
            age_class: Some("Jovem".into()),
            height: Some(height),
            area_ha: Some(0.001),
            ..Default::default()
        }
    }

    fn inventory(rows: Vec<InventoryRecord>) -> InventoryTable {
        InventoryTable::from_records(
            InventoryColumns {
                plot_code: Some("cod_parc".into()),
                tag: Some("plaqueta".into()),
                species: Some("especie".into()),
                origin: Some("origem".into()),
                age_class: Some("idade".into()),
                height: Some("ht".into()),
                area_ha: Some("area_ha".into()),
                ..Default::default()
            },
            rows,
        )
    }

    #[test]
    fn test_status_tiers() {
        assert_eq!(Status::from_axes_met(3), Status::Excellent);
        assert_eq!(Status::from_axes_met(2), Status::Good);
        assert_eq!(Status::from_axes_met(1), Status::Regular);
        assert_eq!(Status::from_axes_met(0), Status::Critical);
    }

    #[test]
    fn test_method_selects_density_target() {
        let targets = RestorationTargets::default();
        assert_eq!(RestorationMethod::from_text(Some("Regeneracao assistida")), RestorationMethod::Assisted);
        assert_eq!(RestorationMethod::from_text(Some("Plantio total")), RestorationMethod::Active);
        assert_eq!(RestorationMethod::from_text(None), RestorationMethod::Active);
        assert_eq!(RestorationMethod::Assisted.density_target(&targets), 1500.0);
        assert_eq!(RestorationMethod::Active.density_target(&targets), 1333.0);
    }

    #[test]
    fn test_canopy_fraction_is_scaled() {
        assert_relative_eq!(
            canopy_cover(&carac(vec![("P1", 0.85, ""), ("P1", 0.75, "")])).unwrap(),
            80.0,
            epsilon = 1e-9
        );
        assert_relative_eq!(canopy_cover(&carac(vec![("P1", 60.0, "")])).unwrap(), 60.0);
    }

    #[test]
    fn test_richness_threshold_is_strict() {
        let inv = inventory(vec![
            stem("P1_ut1", "1", "A", 0.5),
            stem("P1_ut1", "2", "B", 0.51),
            stem("P1_ut1", "3", "C", 2.0),
        ]);
        assert_eq!(observed_richness(&inv), 2);
    }

    #[test]
    fn test_richness_without_height_column() {
        use polars::prelude::*;

        let df = df!(
            "cod_parc" => ["P1_ut1", "P1_ut1", "P1_ut1"],
            "plaqueta" => ["1", "2", "3"],
            "especie" => ["Inga vera", "Cecropia", "Leucaena"],
            "origem" => ["Nativa", "Nativa", "Exotica"],
            "area_ha" => ["0.1", "0.1", "0.1"]
        )
        .unwrap();
        let inv = InventoryTable::from_frame(&df).unwrap();
        assert_eq!(inv.columns.height, None);
        assert_eq!(observed_richness(&inv), 2);
    }

    #[test]
    fn test_scorecard_rows_carry_unparseable_values() {
        let carac = carac(vec![("P1", 0.9, "Ativa"), ("P2", 0.9, "Ativa")]);
        let mut inv = inventory(vec![
            stem("P1_ut1", "1", "A", 1.0),
            stem("P2_ut1", "2", "A", 1.0),
        ]);
        let unparseable = Diagnostic::UnparseableValue { field: "height", count: 3 };
        inv.diagnostics.push(unparseable.clone());

        let card = restoration_indicators(&carac, &inv, &RestorationTargets::default());
        for row in &card.rows {
            assert_eq!(row.diagnostics, vec![unparseable.clone()]);
        }
    }

    #[test]
    fn test_scorecard() {
        let carac = carac(vec![("P1", 0.9, "Assistida"), ("P2", 10.0, "Ativa")]);
        let inv = inventory(vec![
            stem("P1_ut1", "1", "A", 1.0),
            stem("P1_ut1", "2", "B", 1.0),
            stem("P2_ut1", "3", "A", 1.0),
            stem("P2_ut1", "5", "A", 1.0),
            stem("P3_ut1", "4", "A", 1.0),
        ]);
        let targets = RestorationTargets {
            default_richness: 2.0,
            ..Default::default()
        };

        let card = restoration_indicators(&carac, &inv, &targets);
        assert_eq!(card.rows.len(), 3);

        let p1 = card.get("P1").unwrap();
        assert_relative_eq!(p1.canopy_cover, 90.0, epsilon = 1e-9);
        assert_eq!(p1.restoration_method, RestorationMethod::Assisted);
        assert_relative_eq!(p1.regenerant_density, 2000.0, epsilon = 1e-6);
        assert_eq!(p1.density_target, 1500.0);
        assert_eq!(p1.observed_richness, 2);
        assert_eq!(p1.status, Status::Excellent);

        let p2 = card.get("P2").unwrap();
        assert!(!p2.canopy_ok);
        assert!(p2.density_ok);
        assert!(!p2.richness_ok);
        assert_eq!(p2.status, Status::Regular);

        // inventory only: no characterization rows, no canopy, no density
        let p3 = card.get("P3").unwrap();
        assert_eq!(p3.canopy_cover, 0.0);
        assert_eq!(p3.regenerant_density, 0.0);
        assert_eq!(p3.status, Status::Critical);

        let df = card.to_dataframe().unwrap();
        assert_eq!(df.height(), 3);
        assert_eq!(df.width(), 11);
    }
}
