use std::collections::HashMap;
use std::path::{Path, PathBuf};

use polars::prelude::*;

use pyo3::prelude::*;
use pyo3::types::PyDict;
use pyo3_polars::PyDataFrame;

use crate::area;
use crate::audit;
use crate::columns;
use crate::config::RestorationTargets;
use crate::dataset::load_normalized;
use crate::density;
use crate::diversity;
use crate::error::{Diagnostic, RestorationError};
use crate::indicators;
use crate::normalize;
use crate::phytosociology;
use crate::records::{CharacterizationTable, InventoryTable};
use crate::schema::files;
use crate::technique;

/// Session over the two monitoring datasets.
///
/// Each dataset is read and normalized once; later calls reuse the cached
/// frames unless the caller passes frames of its own.
#[pyclass]
pub struct RestorationModel {
    base_path: PathBuf,
    targets: RestorationTargets,
    characterization: Option<DataFrame>,
    inventory: Option<DataFrame>,
}

#[pymethods]
impl RestorationModel {
    #[new]
    #[pyo3(signature = (base_path, targets_file=None))]
    fn new(base_path: String, targets_file: Option<&str>) -> PyResult<Self> {
        let base_path = PathBuf::from(base_path);
        let targets = match targets_file {
            Some(name) => RestorationTargets::load(&base_path.join(name))?,
            None => RestorationTargets::default(),
        };
        Ok(Self {
            base_path,
            targets,
            characterization: None,
            inventory: None,
        })
    }

    // ── Data loading ────────────────────────────────────────────────────────

    /// Read and normalize any CSV or Parquet file under the base path.
    fn load_table(&self, filename: &str) -> PyResult<PyDataFrame> {
        Ok(PyDataFrame(self.read(filename)?))
    }

    #[pyo3(signature = (filename=None))]
    fn load_characterization(&mut self, filename: Option<&str>) -> PyResult<PyDataFrame> {
        let df = self.read(filename.unwrap_or(files::CHARACTERIZATION))?;
        self.characterization = Some(df.clone());
        Ok(PyDataFrame(df))
    }

    #[pyo3(signature = (filename=None))]
    fn load_inventory(&mut self, filename: Option<&str>) -> PyResult<PyDataFrame> {
        let df = self.read(filename.unwrap_or(files::INVENTORY))?;
        self.inventory = Some(df.clone());
        Ok(PyDataFrame(df))
    }

    // ── Getters ─────────────────────────────────────────────────────────────

    #[getter]
    fn characterization_df(&self) -> PyResult<Option<PyDataFrame>> {
        Ok(self.characterization.clone().map(PyDataFrame))
    }

    #[getter]
    fn inventory_df(&self) -> PyResult<Option<PyDataFrame>> {
        Ok(self.inventory.clone().map(PyDataFrame))
    }

    /// Active targets as JSON.
    #[getter]
    fn targets_json(&self) -> PyResult<String> {
        Ok(serde_json::to_string(&self.targets).map_err(RestorationError::from)?)
    }

    // ── Core operations ─────────────────────────────────────────────────────

    #[staticmethod]
    fn resolve_column(names: Vec<String>, candidates: Vec<String>) -> Option<String> {
        let candidates: Vec<&str> = candidates.iter().map(String::as_str).collect();
        columns::resolve_column(&names, &candidates).map(str::to_string)
    }

    #[staticmethod]
    fn normalize_text(raw: &str) -> Option<String> {
        normalize::clean_text(raw)
    }

    #[staticmethod]
    fn classify_technique(characterization: PyDataFrame) -> PyResult<String> {
        let carac = CharacterizationTable::from_frame(&characterization.0)?;
        Ok(technique::classify_technique(&carac).to_string())
    }

    /// Returns `(area_ha, method, diagnostics)`.
    #[staticmethod]
    fn estimate_area(
        characterization: PyDataFrame,
        inventory: PyDataFrame,
    ) -> PyResult<(f64, String, Vec<String>)> {
        let (carac, inv) = tables(&characterization.0, &inventory.0)?;
        let estimate = area::estimate_area(&carac, &inv);
        Ok((estimate.area_ha, estimate.method, messages(&estimate.diagnostics)))
    }

    /// Returns `(density, method, diagnostics)`.
    #[staticmethod]
    fn general_density(
        inventory: PyDataFrame,
        characterization: PyDataFrame,
    ) -> PyResult<(f64, String, Vec<String>)> {
        let (carac, inv) = tables(&characterization.0, &inventory.0)?;
        let estimate = density::general_density(&inv, &carac);
        Ok((estimate.density, estimate.method, messages(&estimate.diagnostics)))
    }

    #[staticmethod]
    fn regenerant_density(inventory: PyDataFrame, characterization: PyDataFrame) -> PyResult<f64> {
        let (carac, inv) = tables(&characterization.0, &inventory.0)?;
        Ok(density::regenerant_density(&inv, &carac).density)
    }

    #[staticmethod]
    fn phytosociology_census(
        inventory: PyDataFrame,
        characterization: PyDataFrame,
    ) -> PyResult<PyDataFrame> {
        let (carac, inv) = tables(&characterization.0, &inventory.0)?;
        let table = phytosociology::phytosociology_census(&inv, &carac);
        Ok(PyDataFrame(table.to_dataframe().map_err(RestorationError::from)?))
    }

    #[staticmethod]
    fn phytosociology_plots(
        inventory: PyDataFrame,
        characterization: PyDataFrame,
    ) -> PyResult<PyDataFrame> {
        let (carac, inv) = tables(&characterization.0, &inventory.0)?;
        let table = phytosociology::phytosociology_plots(&inv, &carac);
        Ok(PyDataFrame(table.to_dataframe().map_err(RestorationError::from)?))
    }

    /// Species tables keyed by sampling mode (`"census"`, `"plots"`).
    #[staticmethod]
    fn phytosociology(
        inventory: PyDataFrame,
        characterization: PyDataFrame,
    ) -> PyResult<HashMap<String, PyDataFrame>> {
        let (carac, inv) = tables(&characterization.0, &inventory.0)?;
        let frame = |t: &phytosociology::SpeciesTable| -> Result<PyDataFrame, RestorationError> {
            Ok(PyDataFrame(t.to_dataframe()?))
        };

        let mut out = HashMap::new();
        match phytosociology::phytosociology(&inv, &carac) {
            phytosociology::Phytosociology::Census(t) => {
                out.insert("census".to_string(), frame(&t)?);
            }
            phytosociology::Phytosociology::Plots(t) => {
                out.insert("plots".to_string(), frame(&t)?);
            }
            phytosociology::Phytosociology::Mixed { census, plots } => {
                out.insert("census".to_string(), frame(&census)?);
                out.insert("plots".to_string(), frame(&plots)?);
            }
        }
        Ok(out)
    }

    #[staticmethod]
    fn species_abundance(inventory: PyDataFrame) -> PyResult<HashMap<String, usize>> {
        let inv = InventoryTable::from_frame(&inventory.0)?;
        Ok(diversity::species_abundance(&inv).into_iter().collect())
    }

    /// `{richness, shannon, simpson, pielou}` from species counts.
    #[staticmethod]
    fn diversity_indices<'py>(
        py: Python<'py>,
        abundance: HashMap<String, usize>,
    ) -> PyResult<Bound<'py, PyDict>> {
        let indices = diversity::diversity_indices(abundance.into_values());
        let dict = PyDict::new(py);
        dict.set_item("richness", indices.richness)?;
        dict.set_item("shannon", indices.shannon)?;
        dict.set_item("simpson", indices.simpson)?;
        dict.set_item("pielou", indices.pielou)?;
        Ok(dict)
    }

    /// Per-property scorecard; frames default to the loaded datasets.
    #[pyo3(signature = (characterization=None, inventory=None))]
    fn restoration_indicators(
        &self,
        characterization: Option<PyDataFrame>,
        inventory: Option<PyDataFrame>,
    ) -> PyResult<PyDataFrame> {
        let carac_df = match characterization {
            Some(df) => df.0,
            None => self.cached(&self.characterization, "characterization")?,
        };
        let inv_df = match inventory {
            Some(df) => df.0,
            None => self.cached(&self.inventory, "inventory")?,
        };
        let (carac, inv) = tables(&carac_df, &inv_df)?;
        let scorecard = indicators::restoration_indicators(&carac, &inv, &self.targets);
        Ok(PyDataFrame(scorecard.to_dataframe().map_err(RestorationError::from)?))
    }

    // ── Audits ──────────────────────────────────────────────────────────────

    #[staticmethod]
    fn work_unit_areas(inventory: PyDataFrame) -> PyResult<PyDataFrame> {
        let inv = InventoryTable::from_frame(&inventory.0)?;
        let units = audit::work_unit_areas(&inv);
        Ok(PyDataFrame(audit::work_unit_frame(&units).map_err(RestorationError::from)?))
    }

    #[staticmethod]
    fn property_crosscheck(
        characterization: PyDataFrame,
        inventory: PyDataFrame,
    ) -> PyResult<PyDataFrame> {
        let (carac, inv) = tables(&characterization.0, &inventory.0)?;
        let report = audit::property_crosscheck(&carac, &inv);
        Ok(PyDataFrame(audit::crosscheck_frame(&report).map_err(RestorationError::from)?))
    }

    #[staticmethod]
    fn outlier_summary(inventory: PyDataFrame) -> PyResult<PyDataFrame> {
        let inv = InventoryTable::from_frame(&inventory.0)?;
        let summary = audit::outlier_summary(&inv);
        Ok(PyDataFrame(audit::outlier_frame(&summary).map_err(RestorationError::from)?))
    }

    #[staticmethod]
    fn cover_summary(characterization: PyDataFrame) -> PyResult<PyDataFrame> {
        let summary = audit::cover_summary(&characterization.0)?;
        Ok(PyDataFrame(audit::cover_frame(&summary).map_err(RestorationError::from)?))
    }

    #[staticmethod]
    fn disturbance_counts(characterization: PyDataFrame) -> PyResult<PyDataFrame> {
        let counts = audit::disturbance_counts(&characterization.0)?;
        Ok(PyDataFrame(audit::disturbance_frame(&counts).map_err(RestorationError::from)?))
    }
}

// ── Internal helpers (not exposed to Python) ────────────────────────────────

impl RestorationModel {
    fn read(&self, filename: &str) -> Result<DataFrame, RestorationError> {
        load_normalized(&self.base_path.join(Path::new(filename)))
    }

    fn cached(&self, slot: &Option<DataFrame>, what: &str) -> Result<DataFrame, RestorationError> {
        slot.clone()
            .ok_or_else(|| RestorationError::NotLoaded(what.to_string()))
    }
}

fn tables(
    characterization: &DataFrame,
    inventory: &DataFrame,
) -> Result<(CharacterizationTable, InventoryTable), RestorationError> {
    Ok((
        CharacterizationTable::from_frame(characterization)?,
        InventoryTable::from_frame(inventory)?,
    ))
}

fn messages(diagnostics: &[Diagnostic]) -> Vec<String> {
    diagnostics.iter().map(|d| d.to_string()).collect()
}
