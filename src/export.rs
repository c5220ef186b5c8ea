//! CSV export of a lead list.

use crate::error::{LeadError, Result};
use crate::leads::BusinessLead;
use chrono::{NaiveDate, Utc};
use std::path::{Path, PathBuf};
use tracing::info;

const HEADERS: [&str; 7] = ["Company Name", "Rating", "Reviews", "Phone", "Address", "Postal Code", "Maps URL"];

/// Renders leads as CSV: a header row, then one row per lead.
///
/// Text columns are always quoted; rating and review count are bare.
pub fn to_csv(leads: &[BusinessLead]) -> String {
    let mut lines = Vec::with_capacity(leads.len() + 1);
    lines.push(HEADERS.join(","));
    for lead in leads {
        lines.push(
            [
                quote(&lead.company_name),
                lead.rating.to_string(),
                lead.review_count.to_string(),
                quote(&lead.phone_number),
                quote(&lead.address),
                quote(&lead.postal_code),
                quote(&lead.google_maps_url),
            ]
            .join(","),
        );
    }
    lines.join("\n")
}

pub fn export_file_name(date: NaiveDate) -> String {
    format!("leads_{}.csv", date.format("%Y-%m-%d"))
}

/// Writes `leads_<UTC date>.csv` into `dir` and returns its path.
pub fn write_csv(dir: &Path, leads: &[BusinessLead]) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;

    let path = dir.join(export_file_name(Utc::now().date_naive()));
    let tmp = dir.join(format!(".leads.tmp.{}", std::process::id()));

    std::fs::write(&tmp, to_csv(leads))?;
    std::fs::rename(&tmp, &path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp);
        LeadError::Io(e)
    })?;

    info!("Exported {} leads to {}", leads.len(), path.display());
    Ok(path)
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}
