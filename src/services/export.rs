use std::fs::OpenOptions;
use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Utc};

use crate::models::screener::ScreenRow;

pub const CSV_FILE_NAME: &str = "matched_patterns.csv";

const LOG_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Render matches as CSV with `Symbol,Confidence %,Pattern` columns
pub fn to_csv(rows: &[ScreenRow]) -> anyhow::Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(["Symbol", "Confidence %", "Pattern"])
        .context("failed to write csv header")?;

    for row in rows {
        let confidence = format!("{:.2}", row.confidence);
        writer
            .write_record([row.symbol.as_str(), confidence.as_str(), row.pattern.as_str()])
            .with_context(|| format!("failed to write csv row for {}", row.symbol))?;
    }

    let bytes = writer.into_inner().context("failed to flush csv")?;
    String::from_utf8(bytes).context("csv output is not utf-8")
}

/// Append matches to a local CSV log, each row stamped with `now`.
///
/// The header is written only when the file is new or empty. Returns the number of rows appended.
pub fn append_log(path: &Path, rows: &[ScreenRow], now: DateTime<Utc>) -> anyhow::Result<usize> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open match log {}", path.display()))?;
    let is_empty = file
        .metadata()
        .with_context(|| format!("failed to stat match log {}", path.display()))?
        .len()
        == 0;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    if is_empty {
        writer
            .write_record(["Logged At", "Symbol", "Confidence %", "Pattern"])
            .context("failed to write match log header")?;
    }

    let logged_at = now.format(LOG_TIMESTAMP_FORMAT).to_string();
    for row in rows {
        let confidence = format!("{:.2}", row.confidence);
        writer
            .write_record([
                logged_at.as_str(),
                row.symbol.as_str(),
                confidence.as_str(),
                row.pattern.as_str(),
            ])
            .with_context(|| format!("failed to log match for {}", row.symbol))?;
    }

    writer.flush().context("failed to flush match log")?;
    Ok(rows.len())
}
