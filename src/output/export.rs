//! Export of stored observations to CSV

use crate::sink::{stock_label, Database, ObservationRecord, SinkResult, NOT_FOUND, NO_TARGET, UNSUCCESSFUL};
use crate::state::OutcomeKind;
use chrono::NaiveDate;
use csv::Writer;
use std::path::{Path, PathBuf};

/// Header of an export file
pub const EXPORT_HEADER: [&str; 10] = [
    "TrackingDate",
    "Retailer",
    "ItemId",
    "ProductTitle",
    "Price",
    "NumericPrice",
    "StockAvailability",
    "Outcome",
    "URL",
    "Metadata",
];

/// Default export file name for a date, `observations_<YYYY-MM-DD>.csv`
pub fn export_path(dir: &Path, date: NaiveDate) -> PathBuf {
    dir.join(format!("observations_{}.csv", date.format("%Y-%m-%d")))
}

/// Writes every observation recorded on `date` to a CSV file
///
/// With a non-empty `retailers` list only those retailers are exported. Returns the number of rows
/// written; when nothing matches, no file is created.
pub fn export_observations(
    db: &Database,
    date: NaiveDate,
    retailers: &[String],
    path: &Path,
) -> SinkResult<usize> {
    let observations: Vec<ObservationRecord> = db
        .observations_on(date)?
        .into_iter()
        .filter(|o| retailers.is_empty() || retailers.contains(&o.retailer))
        .collect();

    if observations.is_empty() {
        tracing::info!("No observations found for {}", date);
        return Ok(0);
    }

    let mut writer = Writer::from_path(path)?;
    writer.write_record(EXPORT_HEADER)?;

    let tracking_date = date.format("%Y-%m-%d").to_string();
    for observation in &observations {
        let (title, price, stock) = match observation.outcome {
            OutcomeKind::Success => (
                observation.title.clone().unwrap_or_default(),
                observation.price_text.clone().unwrap_or_default(),
                observation
                    .in_stock
                    .map(stock_label)
                    .unwrap_or_default()
                    .to_string(),
            ),
            OutcomeKind::NotFound => sentinel(NOT_FOUND),
            OutcomeKind::TransientFailure => sentinel(UNSUCCESSFUL),
            OutcomeKind::MissingTarget => sentinel(NO_TARGET),
        };
        let numeric_price = observation
            .price
            .map(|p| format!("{:.2}", p))
            .unwrap_or_default();

        writer.write_record([
            tracking_date.as_str(),
            observation.retailer.as_str(),
            observation.identifier.as_str(),
            title.as_str(),
            price.as_str(),
            numeric_price.as_str(),
            stock.as_str(),
            observation.outcome.to_db_string(),
            observation.target.as_deref().unwrap_or(NO_TARGET),
            observation.metadata.as_str(),
        ])?;
    }

    writer.flush()?;
    tracing::info!(
        "Exported {} observations for {} to {}",
        observations.len(),
        date,
        path.display()
    );
    Ok(observations.len())
}

fn sentinel(text: &str) -> (String, String, String) {
    (text.to_string(), text.to_string(), text.to_string())
}
