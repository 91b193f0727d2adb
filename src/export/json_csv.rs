use crate::errors::{AppError, AppResult};
use serde::Serialize;
use std::io::Write;

/// Pretty-printed JSON.
pub(crate) fn write_json<T: Serialize + ?Sized, W: Write>(value: &T, mut out: W) -> AppResult<()> {
    let json_data = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::Export(format!("JSON serialization error: {e}")))?;

    out.write_all(json_data.as_bytes())?;
    out.write_all(b"\n")?;
    out.flush()?;
    Ok(())
}

/// CSV with a header row derived from the field names.
pub(crate) fn write_csv<T: Serialize, W: Write>(rows: &[T], out: W) -> AppResult<()> {
    let mut wtr = csv::Writer::from_writer(out);

    for item in rows {
        wtr.serialize(item)
            .map_err(|e| AppError::Export(format!("CSV write error: {e}")))?;
    }

    wtr.flush()
        .map_err(|e| AppError::Export(format!("CSV flush error: {e}")))?;
    Ok(())
}
