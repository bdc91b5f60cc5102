//! Detection file handling for NP/window data

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use ndarray::Array2;
use polars::prelude::*;

use crate::data::{DetectionMatrix, FeatureTable, Window};

/// Leading coordinate columns of a detection file; every other column is an NP
const COORDINATE_COLUMNS: [&str; 3] = ["chrom", "start", "stop"];

/// Load a detection matrix from a tab-separated or Parquet file.
///
/// Window ids are the 0-based row positions in the source file, so they stay
/// stable after region filtering.
pub fn load_detection_matrix(path: &str) -> Result<DetectionMatrix> {
    log::info!("Reading detection file: {}", path);

    if !Path::new(path).exists() {
        return Err(anyhow!("File not found: {}", path));
    }

    let df = read_frame(path, b'\t')?;
    log::info!("Loaded {} windows x {} columns", df.height(), df.width());
    log::debug!("File schema: {:?}", df.schema());

    let chrom_col = df.column("chrom")?.str()?;
    let start_col = df.column("start")?.cast(&DataType::Int64)?;
    let stop_col = df.column("stop")?.cast(&DataType::Int64)?;
    let starts = start_col.i64()?;
    let stops = stop_col.i64()?;

    let mut windows = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let chrom = chrom_col
            .get(i)
            .ok_or_else(|| anyhow!("Missing chrom in row {}", i))?;
        let start = starts
            .get(i)
            .ok_or_else(|| anyhow!("Missing start in row {}", i))?;
        let stop = stops
            .get(i)
            .ok_or_else(|| anyhow!("Missing stop in row {}", i))?;

        windows.push(Window {
            id: i.to_string(),
            chrom: chrom.to_string(),
            start: u64::try_from(start).with_context(|| format!("Negative start in row {}", i))?,
            stop: u64::try_from(stop).with_context(|| format!("Negative stop in row {}", i))?,
        });
    }

    let samples: Vec<String> = df
        .get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .filter(|name| !COORDINATE_COLUMNS.contains(&name.as_str()))
        .collect();

    let values = read_binary_columns(&df, &samples)?;

    log::info!(
        "Built detection matrix with {} windows and {} NPs",
        windows.len(),
        samples.len()
    );

    Ok(DetectionMatrix::new(windows, samples, values)?)
}

/// Load per-window feature flags from a comma-separated file.
///
/// Rows must line up with `window_ids` (the windows kept after region
/// filtering); coordinate columns are ignored, every other column is a flag
/// and any non-zero value counts as set.
pub fn load_feature_table(path: &str, window_ids: &[String]) -> Result<FeatureTable> {
    log::info!("Reading feature file: {}", path);

    if !Path::new(path).exists() {
        return Err(anyhow!("File not found: {}", path));
    }

    let df = read_frame(path, b',')?;
    if df.height() != window_ids.len() {
        return Err(anyhow!(
            "Feature file has {} rows but {} windows are under analysis",
            df.height(),
            window_ids.len()
        ));
    }

    let names: Vec<String> = df
        .get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .filter(|name| !COORDINATE_COLUMNS.contains(&name.as_str()))
        .collect();

    let mut flags = read_binary_columns(&df, &names).or_else(|_| read_flag_columns(&df, &names))?;
    flags.mapv_inplace(|v| u8::from(v != 0));

    log::info!("Loaded {} features: {:?}", names.len(), names);

    Ok(FeatureTable::new(window_ids.to_vec(), names, flags)?)
}

fn read_frame(path: &str, separator: u8) -> Result<DataFrame> {
    let is_parquet = Path::new(path)
        .extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("parquet"));

    let df = if is_parquet {
        LazyFrame::scan_parquet(path, Default::default())?.collect()?
    } else {
        LazyCsvReader::new(path)
            .with_separator(separator)
            .with_has_header(true)
            .finish()?
            .collect()?
    };

    Ok(df)
}

/// Read integer 0/1 columns into a rows x columns array
fn read_binary_columns(df: &DataFrame, names: &[String]) -> Result<Array2<u8>> {
    let mut values = Array2::<u8>::zeros((df.height(), names.len()));

    for (col_idx, name) in names.iter().enumerate() {
        let column = df.column(name.as_str())?.cast(&DataType::Int64)?;
        let cells = column.i64()?;

        for (row_idx, cell) in cells.into_iter().enumerate() {
            let cell = cell.ok_or_else(|| anyhow!("Missing value in column {} row {}", name, row_idx))?;
            values[[row_idx, col_idx]] = u8::try_from(cell)
                .with_context(|| format!("Value {} in column {} row {} is not 0 or 1", cell, name, row_idx))?;
        }
    }

    Ok(values)
}

/// Fallback for flag columns stored as booleans
fn read_flag_columns(df: &DataFrame, names: &[String]) -> Result<Array2<u8>> {
    let mut values = Array2::<u8>::zeros((df.height(), names.len()));

    for (col_idx, name) in names.iter().enumerate() {
        let column = df.column(name.as_str())?.cast(&DataType::Boolean)?;
        let cells = column.bool()?;

        for (row_idx, cell) in cells.into_iter().enumerate() {
            values[[row_idx, col_idx]] = u8::from(cell.unwrap_or(false));
        }
    }

    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_file(suffix: &str, content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::with_suffix(suffix).unwrap();
        write!(file, "{}", content).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn loads_tab_separated_detections() {
        let file = write_file(
            ".txt",
            "chrom\tstart\tstop\tF10A1\tF10A2\n\
             chr13\t21700000\t21730000\t1\t0\n\
             chr13\t21730000\t21760000\t0\t1\n\
             chr1\t0\t30000\t1\t1\n",
        );

        let matrix = load_detection_matrix(file.path().to_str().unwrap()).unwrap();
        assert_eq!(matrix.window_count(), 3);
        assert_eq!(matrix.samples(), &["F10A1".to_string(), "F10A2".to_string()]);
        assert_eq!(matrix.windows()[2].chrom, "chr1");
        assert_eq!(matrix.windows()[1].start, 21_730_000);
        assert_eq!(matrix.window_ids(), vec!["0", "1", "2"]);
        assert_eq!(matrix.sample_vector(1), vec![0, 1, 1]);
    }

    #[test]
    fn rejects_non_binary_detections() {
        let file = write_file(
            ".txt",
            "chrom\tstart\tstop\tF1\n\
             chr13\t0\t30000\t3\n",
        );
        assert!(load_detection_matrix(file.path().to_str().unwrap()).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_detection_matrix("/nonexistent/detections.txt").is_err());
    }

    #[test]
    fn feature_rows_align_with_windows() {
        let file = write_file(
            ".csv",
            "chrom,start,stop,Hist1,LAD\n\
             chr13,21700000,21730000,1,0\n\
             chr13,21730000,21760000,0,2\n",
        );
        let ids = vec!["5".to_string(), "6".to_string()];
        let table = load_feature_table(file.path().to_str().unwrap(), &ids).unwrap();
        assert_eq!(table.names(), &["Hist1".to_string(), "LAD".to_string()]);
        assert_eq!(table.flag("5", "Hist1"), Some(true));
        assert_eq!(table.flag("6", "LAD"), Some(true));
        assert_eq!(table.flag("6", "Hist1"), Some(false));

        let short = vec!["5".to_string()];
        assert!(load_feature_table(file.path().to_str().unwrap(), &short).is_err());
    }
}
