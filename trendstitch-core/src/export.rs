//! CSV export of normalized series.
//!
//! One row per point: `date,<keyword>,overlap`. Values are whole numbers after
//! normalization and are written without a fraction; `overlap` is `1` or `0`.
//! Timestamps at midnight are written as bare dates, shifted ones keep their
//! time of day.

use chrono::{NaiveDateTime, NaiveTime};
use std::io::Write;
use std::path::Path;

use crate::domain::{SeriesPoint, DATE_FORMAT};

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error writing {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV output is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Write `points` as CSV to any writer.
pub fn write_series_csv<W: Write>(
    keyword: &str,
    points: &[SeriesPoint],
    writer: W,
) -> Result<(), ExportError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["date", keyword, "overlap"])?;
    for p in points {
        wtr.write_record([
            format_timestamp(p.timestamp),
            format!("{:.0}", p.value),
            if p.overlap { "1" } else { "0" }.to_string(),
        ])?;
    }
    wtr.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Render `points` as a CSV string.
pub fn export_series_csv(keyword: &str, points: &[SeriesPoint]) -> Result<String, ExportError> {
    let mut buf = Vec::new();
    write_series_csv(keyword, points, &mut buf)?;
    Ok(String::from_utf8(buf)?)
}

/// Write `points` to `path`, creating parent directories as needed.
pub fn save_series_csv(
    keyword: &str,
    points: &[SeriesPoint],
    path: &Path,
) -> Result<(), ExportError> {
    let io_err = |source| ExportError::Io {
        path: path.display().to_string(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let file = std::fs::File::create(path).map_err(io_err)?;
    write_series_csv(keyword, points, std::io::BufWriter::new(file))
}

/// File-name-safe form of a keyword: lowercase alphanumerics joined by `_`.
pub fn keyword_slug(keyword: &str) -> String {
    let slug = keyword
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_");
    if slug.is_empty() {
        "keyword".to_string()
    } else {
        slug
    }
}

fn format_timestamp(ts: NaiveDateTime) -> String {
    if ts.time() == NaiveTime::MIN {
        ts.format(DATE_FORMAT).to_string()
    } else {
        ts.format(DATETIME_FORMAT).to_string()
    }
}
