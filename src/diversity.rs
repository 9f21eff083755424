use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::records::InventoryTable;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DiversityIndices {
    pub richness: usize,
    pub shannon: f64,
    pub simpson: f64,
    pub pielou: f64,
}

/// Individuals per species: distinct tags when the inventory has a tag
/// column, stem rows otherwise. Rows without a species are ignored.
pub fn species_abundance(inventory: &InventoryTable) -> BTreeMap<String, usize> {
    let mut abundance = BTreeMap::new();

    if inventory.columns.tag.is_some() {
        let mut tags: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for row in &inventory.rows {
            if let (Some(species), Some(tag)) = (row.species.as_deref(), row.tag.as_deref()) {
                tags.entry(species).or_default().insert(tag);
            }
        }
        for (species, set) in tags {
            abundance.insert(species.to_string(), set.len());
        }
    } else {
        for species in inventory.rows.iter().filter_map(|r| r.species.as_deref()) {
            *abundance.entry(species.to_string()).or_insert(0) += 1;
        }
    }
    abundance
}

/// Richness, Shannon H', Simpson 1-D and Pielou J from abundance counts.
///
/// Accumulates N, Σn·ln n and Σn² in one pass, then
/// H' = ln N - Σn·ln n / N and 1-D = 1 - Σn² / N². Zero counts are ignored.
pub fn diversity_indices<I>(counts: I) -> DiversityIndices
where
    I: IntoIterator<Item = usize>,
{
    let mut richness = 0usize;
    let mut total = 0f64;
    let mut sum_n_ln_n = 0f64;
    let mut sum_sq = 0f64;

    for n in counts.into_iter().filter(|n| *n > 0) {
        let n = n as f64;
        richness += 1;
        total += n;
        sum_n_ln_n += n * n.ln();
        sum_sq += n * n;
    }

    if total == 0.0 {
        return DiversityIndices {
            richness: 0,
            shannon: 0.0,
            simpson: 0.0,
            pielou: 0.0,
        };
    }

    let shannon = (total.ln() - sum_n_ln_n / total).max(0.0);
    let simpson = 1.0 - sum_sq / (total * total);
    let pielou = if richness > 1 {
        shannon / (richness as f64).ln()
    } else {
        0.0
    };

    DiversityIndices {
        richness,
        shannon,
        simpson,
        pielou,
    }
}

/// Diversity of an inventory subset.
pub fn inventory_diversity(inventory: &InventoryTable) -> DiversityIndices {
    diversity_indices(species_abundance(inventory).into_values())
}
