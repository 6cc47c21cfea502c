use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::NaiveDate;

use crate::error::LoadError;

// ---------------------------------------------------------------------------
// CellValue – a single spreadsheet cell
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value mirroring common spreadsheet dtypes.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
    Null,
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::String(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Date(d) => write!(f, "{d}"),
            CellValue::Null => write!(f, ""),
        }
    }
}

impl CellValue {
    /// Text form of the cell, `None` for nulls and blank strings.
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Null => None,
            CellValue::String(s) if s.trim().is_empty() => None,
            CellValue::String(s) => Some(s.trim().to_string()),
            // Whole floats come out of spreadsheets for integer ids.
            CellValue::Float(v) if v.fract() == 0.0 && v.abs() < 1e15 => {
                Some(format!("{}", *v as i64))
            }
            other => Some(other.to_string()),
        }
    }

    /// Interpret the cell as a calendar date. Anything unparseable is `None`.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            CellValue::Date(d) => Some(*d),
            CellValue::String(s) => parse_date(s),
            _ => None,
        }
    }
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%Y/%m/%d", "%d-%m-%Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%d/%m/%Y %H:%M"];

/// Lenient date parser for free-form spreadsheet text.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

// ---------------------------------------------------------------------------
// RawTable – parsed spreadsheet before column validation
// ---------------------------------------------------------------------------

/// Header row plus typed cells; the common output of every format parser.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl RawTable {
    /// Position of a header, trimmed and case-insensitive.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let wanted = name.trim();
        self.headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(wanted))
    }

    pub fn require_column(&self, name: &str) -> Result<usize, LoadError> {
        self.column_index(name).ok_or_else(|| LoadError::MissingColumn {
            column: name.to_string(),
        })
    }

    /// Cell at (row, col); short rows read as null.
    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&CellValue::Null)
    }
}

// ---------------------------------------------------------------------------
// Dimension – the categorical columns operators filter and group by
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Dimension {
    Location,
    Task,
    RiskArea,
    HumanFactor,
    EventType,
}

impl Dimension {
    pub const ALL: [Dimension; 5] = [
        Dimension::Location,
        Dimension::Task,
        Dimension::RiskArea,
        Dimension::HumanFactor,
        Dimension::EventType,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Dimension::Location => "Location",
            Dimension::Task => "Task / Activity",
            Dimension::RiskArea => "Risk Area",
            Dimension::HumanFactor => "Human Factor",
            Dimension::EventType => "Event Type",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// EventColumns – header names in the source spreadsheet
// ---------------------------------------------------------------------------

/// Source header for each modelled field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventColumns {
    pub id: String,
    pub description: String,
    pub date: String,
    pub location: String,
    pub task: String,
    pub risk_area: String,
    pub human_factor: String,
    /// Optional: trend and summary fall back to a single series without it.
    pub event_type: String,
    /// Optional: JSON array of floats per row.
    pub embedding: String,
}

impl Default for EventColumns {
    fn default() -> Self {
        Self {
            id: "Event ID".into(),
            description: "Description".into(),
            date: "Date Occurred".into(),
            location: "Location".into(),
            task: "Task / Activity".into(),
            risk_area: "Risk Area".into(),
            human_factor: "Event: Human Factors".into(),
            event_type: "Event Type".into(),
            embedding: "Embedding".into(),
        }
    }
}

impl EventColumns {
    pub fn for_dimension(&self, dim: Dimension) -> &str {
        match dim {
            Dimension::Location => &self.location,
            Dimension::Task => &self.task,
            Dimension::RiskArea => &self.risk_area,
            Dimension::HumanFactor => &self.human_factor,
            Dimension::EventType => &self.event_type,
        }
    }
}

// ---------------------------------------------------------------------------
// EventRecord – one row of the event table
// ---------------------------------------------------------------------------

/// A single safety-event row. Several rows may share one `id`.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    pub id: String,
    pub description: String,
    /// `None` when the source cell was empty or unparseable.
    pub occurred: Option<NaiveDate>,
    pub location: Option<String>,
    pub task: Option<String>,
    pub risk_area: Option<String>,
    pub human_factor: Option<String>,
    pub event_type: Option<String>,
    /// Precomputed description embedding carried in the source file.
    pub embedding: Option<Vec<f32>>,
    /// Remaining columns, for the sample table.
    pub extra: BTreeMap<String, CellValue>,
}

impl EventRecord {
    /// Minimal record, mostly for fixtures.
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            occurred: None,
            location: None,
            task: None,
            risk_area: None,
            human_factor: None,
            event_type: None,
            embedding: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn category(&self, dim: Dimension) -> Option<&str> {
        match dim {
            Dimension::Location => self.location.as_deref(),
            Dimension::Task => self.task.as_deref(),
            Dimension::RiskArea => self.risk_area.as_deref(),
            Dimension::HumanFactor => self.human_factor.as_deref(),
            Dimension::EventType => self.event_type.as_deref(),
        }
    }

    pub fn with_category(mut self, dim: Dimension, value: impl Into<String>) -> Self {
        let value = Some(value.into());
        match dim {
            Dimension::Location => self.location = value,
            Dimension::Task => self.task = value,
            Dimension::RiskArea => self.risk_area = value,
            Dimension::HumanFactor => self.human_factor = value,
            Dimension::EventType => self.event_type = value,
        }
        self
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.occurred = Some(date);
        self
    }

    /// Display text of a non-modelled column, empty when the row has none.
    pub fn extra_text(&self, column: &str) -> String {
        self.extra.get(column).map(ToString::to_string).unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// EventDataset – the complete loaded dataset
// ---------------------------------------------------------------------------

/// The full parsed event table with pre-computed filter choices.
#[derive(Debug, Clone, Default)]
pub struct EventDataset {
    pub events: Vec<EventRecord>,
    /// Headers of the extra columns, in source order.
    pub extra_columns: Vec<String>,
    /// For each dimension the sorted set of non-missing values.
    pub unique_values: BTreeMap<Dimension, BTreeSet<String>>,
}

impl EventDataset {
    /// Build dimension indices from the loaded events.
    pub fn from_events(events: Vec<EventRecord>, extra_columns: Vec<String>) -> Self {
        let mut unique_values: BTreeMap<Dimension, BTreeSet<String>> = BTreeMap::new();
        for dim in Dimension::ALL {
            unique_values.insert(dim, BTreeSet::new());
        }
        for ev in &events {
            for dim in Dimension::ALL {
                if let Some(v) = ev.category(dim) {
                    unique_values
                        .entry(dim)
                        .or_default()
                        .insert(v.to_string());
                }
            }
        }
        EventDataset {
            events,
            extra_columns,
            unique_values,
        }
    }

    /// Validate the expected columns and convert every row.
    pub fn from_table(table: &RawTable, columns: &EventColumns) -> Result<Self, LoadError> {
        let id_idx = table.require_column(&columns.id)?;
        let desc_idx = table.require_column(&columns.description)?;
        let date_idx = table.require_column(&columns.date)?;
        let location_idx = table.require_column(&columns.location)?;
        let task_idx = table.require_column(&columns.task)?;
        let risk_idx = table.require_column(&columns.risk_area)?;
        let hf_idx = table.require_column(&columns.human_factor)?;
        let type_idx = table.column_index(&columns.event_type);
        let emb_idx = table.column_index(&columns.embedding);

        let mut modelled = vec![id_idx, desc_idx, date_idx, location_idx, task_idx, risk_idx, hf_idx];
        modelled.extend(type_idx);
        modelled.extend(emb_idx);

        let extra_cols: Vec<(usize, String)> = table
            .headers
            .iter()
            .enumerate()
            .filter(|(i, _)| !modelled.contains(i))
            .map(|(i, h)| (i, h.clone()))
            .collect();

        let mut events = Vec::with_capacity(table.rows.len());
        for row in 0..table.rows.len() {
            // Rows without an identifier cannot be tagged or counted.
            let Some(id) = table.cell(row, id_idx).as_text() else {
                log::debug!("row {row}: no event id, skipped");
                continue;
            };
            let embedding = emb_idx.and_then(|i| parse_embedding(table.cell(row, i), row));

            events.push(EventRecord {
                id,
                description: table.cell(row, desc_idx).as_text().unwrap_or_default(),
                occurred: table.cell(row, date_idx).as_date(),
                location: table.cell(row, location_idx).as_text(),
                task: table.cell(row, task_idx).as_text(),
                risk_area: table.cell(row, risk_idx).as_text(),
                human_factor: table.cell(row, hf_idx).as_text(),
                event_type: type_idx.and_then(|i| table.cell(row, i).as_text()),
                embedding,
                extra: extra_cols
                    .iter()
                    .map(|(i, name)| (name.clone(), table.cell(row, *i).clone()))
                    .collect(),
            });
        }

        let extra_columns = extra_cols.into_iter().map(|(_, name)| name).collect();
        Ok(Self::from_events(events, extra_columns))
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Number of distinct event identifiers.
    pub fn unique_event_count(&self) -> usize {
        self.events
            .iter()
            .map(|e| e.id.as_str())
            .collect::<BTreeSet<_>>()
            .len()
    }
}

/// Precomputed embeddings are stored as serialized JSON arrays.
fn parse_embedding(cell: &CellValue, row: usize) -> Option<Vec<f32>> {
    let text = cell.as_text()?;
    match serde_json::from_str::<Vec<f32>>(&text) {
        Ok(v) if !v.is_empty() => Some(v),
        Ok(_) => None,
        Err(e) => {
            log::warn!("row {row}: ignoring unparseable embedding: {e}");
            None
        }
    }
}
