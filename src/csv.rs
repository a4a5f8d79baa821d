use chrono::{NaiveDate, Utc};
use tracing::error;

use crate::error::{Error, Result};
use crate::models::{Radio, RadioForm};
use crate::repo::Repo;

/// Column layout of the exchange format, in order.
pub const HEADERS: [&str; 9] = [
    "ID",
    "Merk",
    "Model",
    "Type",
    "Serienummer",
    "Alias",
    "Afdeling",
    "Registratiedatum",
    "Opmerking",
];

/// Renders the naive export format: a header row, then one comma-joined row
/// per radio. Fields are never quoted or escaped, so a field containing a
/// comma corrupts its row — an accepted limitation of the format, not
/// something this writer papers over.
pub fn export_radios(radios: &[Radio]) -> String {
    let mut lines = vec![HEADERS.join(",")];
    for radio in radios {
        lines.push(
            [
                radio.id.as_str(),
                radio.merk.as_str(),
                radio.model.as_str(),
                &radio.kind.to_string(),
                radio.serienummer.as_str(),
                radio.alias.as_str(),
                radio.afdeling.as_str(),
                &radio.registratiedatum.to_string(),
                radio.opmerking.as_deref().unwrap_or(""),
            ]
            .join(","),
        );
    }
    lines.join("\n")
}

/// Parses the same 9-column layout: the header row is skipped, rows with
/// fewer than 8 populated columns or an empty id are ignored, a missing
/// registration date falls back to `default_date`, and a missing remark
/// becomes the empty string.
pub fn parse_import(text: &str, default_date: NaiveDate) -> Result<Vec<RadioForm>> {
    let mut forms = Vec::new();
    for (line_no, line) in text.split('\n').enumerate().skip(1) {
        let values: Vec<&str> = line.split(',').map(str::trim).collect();
        if values.len() < 8 || values[0].is_empty() {
            continue;
        }
        let kind = values[3].parse().map_err(|reason| Error::CsvRow {
            row: line_no + 1,
            reason,
        })?;
        let registratiedatum = match values.get(7).copied().filter(|v| !v.is_empty()) {
            Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| Error::CsvRow {
                row: line_no + 1,
                reason: format!("bad registration date '{raw}': {e}"),
            })?,
            None => default_date,
        };
        forms.push(RadioForm {
            id: values[0].to_string(),
            merk: values[1].to_string(),
            model: values[2].to_string(),
            kind,
            serienummer: values[4].to_string(),
            alias: values[5].to_string(),
            afdeling: values[6].to_string(),
            registratiedatum,
            opmerking: Some(values.get(8).copied().unwrap_or("").to_string()),
        });
    }
    Ok(forms)
}

/// Creates one radio per parsed row, in file order. There is no batch
/// atomicity: the first failing create aborts the run and every earlier row
/// stays committed, which the returned error spells out.
pub async fn import_radios(repo: &Repo<Radio>, text: &str) -> Result<usize> {
    let forms = parse_import(text, Utc::now().date_naive())?;
    let mut imported = 0usize;
    for form in &forms {
        match repo.create(form).await {
            Ok(_) => imported += 1,
            Err(err) => {
                error!(imported, %err, "csv import aborted; earlier rows stay committed");
                return Err(Error::ImportAborted {
                    imported,
                    source: Box::new(err),
                });
            }
        }
    }
    Ok(imported)
}
