//! CSV ingest into a numeric design matrix.
//!
//! Expected layout: one header row, one sample per row, every column numeric.
//! The target column is named on the command line; all other columns (or an
//! explicit list, e.g. the features a saved model was trained on) become features.
//!
//! Design goals:
//! - **Strict schema** for named columns (clear errors + exit code 2)
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - **Deterministic behavior**: feature order follows the header (or the explicit list)

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use csv::StringRecord;
use nalgebra::{DMatrix, DVector};
use tracing::warn;

use crate::error::AppError;

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: design matrix, optional targets and bookkeeping.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub x: DMatrix<f64>,
    pub y: Option<DVector<f64>>,
    pub feature_names: Vec<String>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    pub rows_used: usize,
}

/// Load a CSV file.
///
/// - `target`: column holding the response; required when `Some`.
/// - `features`: explicit feature columns in order; `None` means "every column except
///   the target".
pub fn load_csv(
    path: &Path,
    target: Option<&str>,
    features: Option<&[String]>,
) -> Result<Dataset, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    let target_idx = match target {
        Some(name) => Some(
            *header_map
                .get(&normalize_header_name(name))
                .ok_or_else(|| AppError::new(2, format!("Missing target column: `{name}`")))?,
        ),
        None => None,
    };

    let (feature_names, feature_idx) = resolve_features(&headers, &header_map, target_idx, features)?;
    if feature_idx.is_empty() {
        return Err(AppError::new(2, "CSV has no feature columns."));
    }

    let mut values: Vec<f64> = Vec::new();
    let mut targets: Vec<f64> = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // +2: records() starts after the header, and CSV lines are 1-based.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match parse_row(&record, &headers, &feature_idx, target_idx) {
            Ok((row, y)) => {
                values.extend(row);
                if let Some(y) = y {
                    targets.push(y);
                }
            }
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    let rows_used = rows_read - row_errors.len();
    if rows_used == 0 {
        return Err(AppError::new(3, "No valid rows remain after parsing."));
    }
    if !row_errors.is_empty() {
        warn!(skipped = row_errors.len(), rows_read, "skipped invalid CSV rows");
    }

    let x = DMatrix::from_row_slice(rows_used, feature_idx.len(), &values);
    let y = target_idx.map(|_| DVector::from_vec(targets));

    Ok(Dataset {
        x,
        y,
        feature_names,
        row_errors,
        rows_read,
        rows_used,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports may prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn resolve_features(
    headers: &StringRecord,
    header_map: &HashMap<String, usize>,
    target_idx: Option<usize>,
    features: Option<&[String]>,
) -> Result<(Vec<String>, Vec<usize>), AppError> {
    match features {
        Some(names) => {
            let mut idx = Vec::with_capacity(names.len());
            for name in names {
                let i = header_map
                    .get(&normalize_header_name(name))
                    .ok_or_else(|| AppError::new(2, format!("Missing feature column: `{name}`")))?;
                idx.push(*i);
            }
            Ok((names.to_vec(), idx))
        }
        None => {
            let mut names = Vec::new();
            let mut idx = Vec::new();
            for (i, name) in headers.iter().enumerate() {
                if Some(i) == target_idx {
                    continue;
                }
                names.push(normalize_header_name(name));
                idx.push(i);
            }
            Ok((names, idx))
        }
    }
}

fn parse_row(
    record: &StringRecord,
    headers: &StringRecord,
    feature_idx: &[usize],
    target_idx: Option<usize>,
) -> Result<(Vec<f64>, Option<f64>), String> {
    let mut row = Vec::with_capacity(feature_idx.len());
    for &i in feature_idx {
        row.push(parse_cell(record, headers, i)?);
    }
    let y = match target_idx {
        Some(i) => Some(parse_cell(record, headers, i)?),
        None => None,
    };
    Ok((row, y))
}

fn parse_cell(record: &StringRecord, headers: &StringRecord, idx: usize) -> Result<f64, String> {
    let name = headers.get(idx).unwrap_or("?");
    let raw = record
        .get(idx)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing value for `{name}`."))?;
    let v: f64 = raw
        .parse()
        .map_err(|_| format!("Invalid number for `{name}`: {raw:?}"))?;
    if !v.is_finite() {
        return Err(format!("Non-finite value for `{name}`."));
    }
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_file(contents: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn loads_features_and_target_skipping_bad_rows() {
        let f = csv_file("\u{feff}X1,count,x2\n1.0,3,2.0\n0.5,abc,1.0\n-1,0,4\n2,1,\n");
        let data = load_csv(f.path(), Some("Count"), None).unwrap();

        assert_eq!(data.feature_names, vec!["x1", "x2"]);
        assert_eq!(data.rows_read, 4);
        assert_eq!(data.rows_used, 2);
        assert_eq!(data.row_errors.len(), 2);
        assert_eq!(data.row_errors[0].line, 3);

        assert_eq!(data.x.nrows(), 2);
        assert_eq!(data.x[(1, 0)], -1.0);
        assert_eq!(data.x[(1, 1)], 4.0);
        assert_eq!(data.y.unwrap().as_slice(), &[3.0, 0.0]);
    }

    #[test]
    fn explicit_features_follow_given_order() {
        let f = csv_file("a,b,c\n1,2,3\n4,5,6\n");
        let names = vec!["c".to_string(), "a".to_string()];
        let data = load_csv(f.path(), None, Some(names.as_slice())).unwrap();
        assert!(data.y.is_none());
        assert_eq!(data.x.row(0).iter().copied().collect::<Vec<_>>(), vec![3.0, 1.0]);
        assert_eq!(data.x.row(1).iter().copied().collect::<Vec<_>>(), vec![6.0, 4.0]);
    }

    #[test]
    fn schema_errors_use_usage_exit_code() {
        let f = csv_file("a,b\n1,2\n");
        let err = load_csv(f.path(), Some("y"), None).unwrap_err();
        assert_eq!(err.exit_code(), 2);

        let missing = vec!["z".to_string()];
        assert_eq!(load_csv(f.path(), None, Some(missing.as_slice())).unwrap_err().exit_code(), 2);

        let empty = csv_file("a,y\nfoo,1\n");
        assert_eq!(load_csv(empty.path(), Some("y"), None).unwrap_err().exit_code(), 3);
    }
}
