//! Export per-sample predictions to CSV.
//!
//! The export is meant to be easy to consume in spreadsheets or downstream scripts.

use std::fs::File;
use std::path::Path;

use nalgebra::DVector;

use crate::error::AppError;

/// Write `row,y_true,y_pred` (or `row,y_pred` without targets).
pub fn write_predictions_csv(
    path: &Path,
    y_true: Option<&DVector<f64>>,
    y_pred: &DVector<f64>,
) -> Result<(), AppError> {
    if let Some(y) = y_true {
        if y.len() != y_pred.len() {
            return Err(AppError::new(
                4,
                format!("Prediction count {} does not match target count {}.", y_pred.len(), y.len()),
            ));
        }
    }

    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    let mut writer = csv::Writer::from_writer(file);

    let header: &[&str] = if y_true.is_some() {
        &["row", "y_true", "y_pred"]
    } else {
        &["row", "y_pred"]
    };
    writer
        .write_record(header)
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV header: {e}")))?;

    for (i, &pred) in y_pred.iter().enumerate() {
        let mut record = vec![i.to_string()];
        if let Some(y) = y_true {
            record.push(format!("{}", y[i]));
        }
        record.push(format!("{pred:.10}"));
        writer
            .write_record(&record)
            .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush export CSV: {e}")))?;
    Ok(())
}
