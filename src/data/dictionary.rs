use std::collections::HashSet;

use super::model::RawTable;
use crate::error::DictionaryError;

/// One weak-signal concept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermEntry {
    /// Canonical English phrase; this is what gets matched and exported.
    pub term: String,
    pub translation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictionaryColumns {
    pub term: String,
    pub translation: String,
}

impl Default for DictionaryColumns {
    fn default() -> Self {
        Self {
            term: "Term".into(),
            translation: "Translation".into(),
        }
    }
}

/// Fixed, read-only list of terms for a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TermDictionary {
    entries: Vec<TermEntry>,
}

impl TermDictionary {
    /// Build from entries: blanks skipped, case-insensitive duplicates
    /// collapse to the first, `;` rejected.
    pub fn from_entries(entries: impl IntoIterator<Item = TermEntry>) -> Result<Self, DictionaryError> {
        let mut seen = HashSet::new();
        let mut kept = Vec::new();
        for mut entry in entries {
            entry.term = entry.term.trim().to_string();
            if entry.term.is_empty() {
                continue;
            }
            if entry.term.contains(';') {
                return Err(DictionaryError::ReservedSeparator(entry.term));
            }
            if !seen.insert(entry.term.to_lowercase()) {
                log::warn!("duplicate dictionary term '{}' skipped", entry.term);
                continue;
            }
            kept.push(entry);
        }
        Ok(Self { entries: kept })
    }

    /// Convenience for fixtures and the headless path.
    pub fn from_terms<S: AsRef<str>>(terms: &[S]) -> Result<Self, DictionaryError> {
        Self::from_entries(terms.iter().map(|t| TermEntry {
            term: t.as_ref().to_string(),
            translation: None,
        }))
    }

    pub fn from_table(table: &RawTable, columns: &DictionaryColumns) -> Result<Self, DictionaryError> {
        let term_idx = table.require_column(&columns.term)?;
        let translation_idx = table.column_index(&columns.translation);

        let entries = (0..table.rows.len()).filter_map(|row| {
            let term = table.cell(row, term_idx).as_text()?;
            Some(TermEntry {
                term,
                translation: translation_idx.and_then(|i| table.cell(row, i).as_text()),
            })
        });
        let dict = Self::from_entries(entries)?;
        log::info!("loaded {} dictionary terms", dict.len());
        Ok(dict)
    }

    pub fn entries(&self) -> &[TermEntry] {
        &self.entries
    }

    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.term.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
