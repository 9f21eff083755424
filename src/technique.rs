use std::collections::BTreeSet;
use std::fmt;

use crate::columns::contains_any;
use crate::records::{CharacterizationTable, code_key};
use crate::schema::markers;

/// Sampling technique of a characterization subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Technique {
    CensusOnly,
    PlotOnly,
    Mixed,
    /// No technique column, or no value matched a known marker.
    /// Area estimation treats this as plot-based.
    Unknown,
}

impl Technique {
    pub fn as_str(&self) -> &'static str {
        match self {
            Technique::CensusOnly => "CensusOnly",
            Technique::PlotOnly => "PlotOnly",
            Technique::Mixed => "Mixed",
            Technique::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Technique {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn is_census(technique: &str) -> bool {
    contains_any(technique, markers::CENSUS)
}

pub fn is_plot(technique: &str) -> bool {
    contains_any(technique, markers::PLOT)
}

pub fn classify_technique(characterization: &CharacterizationTable) -> Technique {
    if characterization.columns.technique.is_none() {
        tracing::debug!("no technique column, classification unknown");
        return Technique::Unknown;
    }

    let values: BTreeSet<String> = characterization
        .rows
        .iter()
        .filter_map(|r| r.technique.as_deref())
        .map(str::to_lowercase)
        .collect();
    let census = values.iter().any(|t| is_census(t));
    let plot = values.iter().any(|t| is_plot(t));

    let technique = match (census, plot) {
        (true, true) => Technique::Mixed,
        (true, false) => Technique::CensusOnly,
        (false, true) => Technique::PlotOnly,
        (false, false) => Technique::Unknown,
    };
    tracing::debug!(%technique, distinct_values = values.len(), "classified technique");
    technique
}

/// Property codes of a mixed subset, split by the technique of each row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TechniquePartition {
    pub census: Vec<String>,
    /// Every property with at least one row not tagged as census.
    pub plot: Vec<String>,
}

/// Partition rows individually: census-tagged rows go to `census`, all
/// other rows to `plot`. A property tagged both ways lands in both.
pub fn partition_properties(characterization: &CharacterizationTable) -> TechniquePartition {
    let mut partition = TechniquePartition::default();
    let mut seen_census = BTreeSet::new();
    let mut seen_plot = BTreeSet::new();

    for row in &characterization.rows {
        let Some(property) = row.property.as_deref() else {
            continue;
        };
        let census = row.technique.as_deref().map(is_census).unwrap_or(false);
        let (target, seen) = if census {
            (&mut partition.census, &mut seen_census)
        } else {
            (&mut partition.plot, &mut seen_plot)
        };
        if seen.insert(code_key(property)) {
            target.push(property.to_string());
        }
    }
    partition
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{CharacterizationColumns, CharacterizationRecord};

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
    fn test_classify() {
        assert_eq!(classify_technique(&carac(&[("P1", "Censo")])), Technique::CensusOnly);
        assert_eq!(classify_technique(&carac(&[("P1", "Parcelas")])), Technique::PlotOnly);
        assert_eq!(classify_technique(&carac(&[("P1", "Plot 10x10")])), Technique::PlotOnly);
        assert_eq!(
            classify_technique(&carac(&[("P1", "Censo"), ("P2", "Parcela")])),
            Technique::Mixed
        );
        assert_eq!(classify_technique(&carac(&[("P1", "Transecto")])), Technique::Unknown);
    }

    #[test]
    fn test_missing_column_is_unknown() {
        let table = CharacterizationTable::from_records(
            CharacterizationColumns::default(),
            vec![CharacterizationRecord::default()],
        );
        assert_eq!(classify_technique(&table), Technique::Unknown);
    }

    #[test]
    fn test_partition_is_per_row() {
        let table = carac(&[
            ("P1", "Censo"),
            ("P1", "Censo"),
            ("P2", "Parcela"),
            ("P3", "Censo"),
            ("P3", "Parcela"),
        ]);
        let partition = partition_properties(&table);
        assert_eq!(partition.census, vec!["P1", "P3"]);
        assert_eq!(partition.plot, vec!["P2", "P3"]);
    }
}
