//! Text normalization applied to freshly loaded spreadsheets.
//!
//! Every text cell is trimmed, internal whitespace runs collapse to a single
//! space, the value is lowercased and its first character uppercased.
//! Textual nulls (`""`, `nan`, `none`, `null`) become missing.

use polars::prelude::*;

use crate::error::RestorationError;

const TEXTUAL_NULLS: [&str; 4] = ["", "nan", "none", "null"];

/// Normalize a single cell. Returns `None` for textual nulls.
pub fn clean_text(raw: &str) -> Option<String> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let lower = collapsed.to_lowercase();
    if TEXTUAL_NULLS.contains(&lower.as_str()) {
        return None;
    }

    let mut chars = lower.chars();
    let first = chars.next()?;
    Some(first.to_uppercase().chain(chars).collect())
}

/// Normalize every String column of `df`; other dtypes pass through.
pub fn normalize_frame(df: &DataFrame) -> Result<DataFrame, RestorationError> {
    let mut columns: Vec<Column> = Vec::with_capacity(df.width());

    for column in df.get_columns() {
        if column.dtype() == &DataType::String {
            let cleaned: Vec<Option<String>> = column
                .str()?
                .into_iter()
                .map(|v| v.and_then(clean_text))
                .collect();
            columns.push(Column::new(column.name().clone(), cleaned));
        } else {
            columns.push(column.clone());
        }
    }

    Ok(DataFrame::new(columns)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("   MIMOSA pudica  ").as_deref(), Some("Mimosa pudica"));
        assert_eq!(clean_text("cecropia   HOLOLEUCA").as_deref(), Some("Cecropia hololeuca"));
        assert_eq!(clean_text("  jovem ").as_deref(), Some("Jovem"));
        assert_eq!(clean_text("P1_UT1").as_deref(), Some("P1_ut1"));
    }

    #[test]
    fn test_textual_nulls() {
        assert_eq!(clean_text("  "), None);
        assert_eq!(clean_text("NaN"), None);
        assert_eq!(clean_text("None"), None);
        assert_eq!(clean_text("null"), None);
    }

    #[test]
    fn test_normalize_frame_only_touches_text() {
        let df = df!(
            "origem" => ["NATIVA  ", "  exotica", "nan"],
            "altura" => [1.5, 2.8, 0.3]
        )
        .unwrap();

        let out = normalize_frame(&df).unwrap();
        let origin: Vec<Option<&str>> = out.column("origem").unwrap().str().unwrap().into_iter().collect();
        assert_eq!(origin, vec![Some("Nativa"), Some("Exotica"), None]);
        assert_eq!(out.column("altura").unwrap().dtype(), &DataType::Float64);
    }
}
