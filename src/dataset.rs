use std::fs::File;
use std::path::Path;

use polars::prelude::*;

use crate::error::RestorationError;
use crate::normalize::normalize_frame;

/// Read a spreadsheet snapshot into a DataFrame.
///
/// `.csv` files are read with every column as String; `.parquet` files keep
/// their stored dtypes. Column names are trimmed either way.
pub fn read_table(path: &Path) -> Result<DataFrame, RestorationError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let mut df = match extension.as_str() {
        "csv" => CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0)) // all columns as String
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()?,
        "parquet" => ParquetReader::new(File::open(path)?).finish()?,
        other => return Err(RestorationError::UnsupportedFormat(other.to_string())),
    };

    let trimmed: Vec<String> = df
        .get_column_names_str()
        .iter()
        .map(|c| c.trim().to_string())
        .collect();
    df.set_column_names(trimmed.as_slice())?;

    Ok(df)
}

/// Read and normalize a snapshot in one step.
pub fn load_normalized(path: &Path) -> Result<DataFrame, RestorationError> {
    let df = normalize_frame(&read_table(path)?)?;
    tracing::info!(
        path = %path.display(),
        rows = df.height(),
        columns = df.width(),
        "loaded dataset"
    );
    Ok(df)
}
