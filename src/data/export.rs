use std::collections::BTreeSet;
use std::io::{Read, Write};
use std::path::Path;

use super::model::{EventColumns, EventRecord};
use crate::error::{ExportError, LoadError};
use crate::signal::matcher::{unique_events, TagResult};

/// Header of the derived column.
pub const MATCHED_TERMS: &str = "Matched Terms";

const SEPARATOR: &str = "; ";

/// Write one row per distinct event plus its matched terms.
///
/// Events missing from `tags` are written with an empty term list.
pub fn write_tag_export<'a, W, I>(
    writer: W,
    events: I,
    tags: &TagResult,
    columns: &EventColumns,
) -> Result<usize, ExportError>
where
    W: Write,
    I: IntoIterator<Item = &'a EventRecord>,
{
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record([
        columns.id.as_str(),
        columns.description.as_str(),
        columns.date.as_str(),
        columns.location.as_str(),
        columns.task.as_str(),
        columns.risk_area.as_str(),
        columns.human_factor.as_str(),
        columns.event_type.as_str(),
        MATCHED_TERMS,
    ])?;

    let mut written = 0;
    for ev in unique_events(events) {
        let terms = tags
            .get(&ev.id)
            .map(|t| t.iter().map(String::as_str).collect::<Vec<_>>().join(SEPARATOR))
            .unwrap_or_default();
        let date = ev.occurred.map(|d| d.to_string()).unwrap_or_default();
        wtr.write_record([
            ev.id.as_str(),
            ev.description.as_str(),
            date.as_str(),
            ev.location.as_deref().unwrap_or(""),
            ev.task.as_deref().unwrap_or(""),
            ev.risk_area.as_deref().unwrap_or(""),
            ev.human_factor.as_deref().unwrap_or(""),
            ev.event_type.as_deref().unwrap_or(""),
            terms.as_str(),
        ])?;
        written += 1;
    }
    wtr.flush()?;
    Ok(written)
}

pub fn write_tag_export_file<'a, I>(
    path: &Path,
    events: I,
    tags: &TagResult,
    columns: &EventColumns,
) -> Result<usize, ExportError>
where
    I: IntoIterator<Item = &'a EventRecord>,
{
    let file = std::fs::File::create(path)?;
    let n = write_tag_export(std::io::BufWriter::new(file), events, tags, columns)?;
    log::info!("exported {n} tagged events to {}", path.display());
    Ok(n)
}

/// Read an export back into an id → terms mapping.
pub fn read_tag_export<R: Read>(reader: R, id_column: &str) -> Result<TagResult, ExportError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers()?.clone();
    let find = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
            .ok_or_else(|| LoadError::MissingColumn {
                column: name.to_string(),
            })
    };
    let id_idx = find(id_column)?;
    let terms_idx = find(MATCHED_TERMS)?;

    let mut tags = TagResult::new();
    for record in rdr.records() {
        let record = record?;
        let id = record.get(id_idx).unwrap_or("").trim().to_string();
        if id.is_empty() {
            continue;
        }
        let terms: BTreeSet<String> = record
            .get(terms_idx)
            .unwrap_or("")
            .split(';')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
        tags.insert(id, terms);
    }
    Ok(tags)
}
