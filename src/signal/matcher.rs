use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use super::embedding::EmbeddingScorer;
use super::fuzzy;
use crate::data::dictionary::TermDictionary;
use crate::data::model::EventRecord;
use crate::error::MatchError;

// ---------------------------------------------------------------------------
// MatchMode / Threshold
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MatchMode {
    #[default]
    Embedding,
    Fuzzy,
}

impl MatchMode {
    /// Inclusive bounds of a threshold in this mode's native unit.
    pub fn native_range(self) -> (f32, f32) {
        match self {
            MatchMode::Embedding => (-1.0, 1.0),
            MatchMode::Fuzzy => (0.0, 100.0),
        }
    }

    pub fn default_threshold(self) -> f32 {
        match self {
            MatchMode::Embedding => 0.5,
            MatchMode::Fuzzy => 80.0,
        }
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Embedding => write!(f, "embedding"),
            Self::Fuzzy => write!(f, "fuzzy"),
        }
    }
}

impl FromStr for MatchMode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "embedding" | "semantic" => Ok(Self::Embedding),
            "fuzzy" | "lexical" => Ok(Self::Fuzzy),
            _ => Err(format!("Invalid matching mode: {s}")),
        }
    }
}

/// Minimum score, in the common unit every strategy scores in
/// (cosine for embeddings, ratio / 100 for fuzzy).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Threshold(f32);

impl Threshold {
    /// Build from a value in the mode's native unit (0–100 for fuzzy).
    pub fn new(mode: MatchMode, native: f32) -> Result<Self, MatchError> {
        let (min, max) = mode.native_range();
        if !(min..=max).contains(&native) {
            return Err(MatchError::ThresholdRange { value: native, min, max });
        }
        Ok(match mode {
            MatchMode::Embedding => Self(native),
            MatchMode::Fuzzy => Self(native / 100.0),
        })
    }

    pub fn cosine(value: f32) -> Result<Self, MatchError> {
        Self::new(MatchMode::Embedding, value)
    }

    pub fn percent(value: f32) -> Result<Self, MatchError> {
        Self::new(MatchMode::Fuzzy, value)
    }

    pub fn value(self) -> f32 {
        self.0
    }

    pub fn admits(self, score: f32) -> bool {
        score >= self.0
    }
}

// ---------------------------------------------------------------------------
// Strategy – the one `score` capability, two interchangeable variants
// ---------------------------------------------------------------------------

pub enum Strategy {
    Embedding(EmbeddingScorer),
    Fuzzy,
}

impl Strategy {
    pub fn mode(&self) -> MatchMode {
        match self {
            Strategy::Embedding(_) => MatchMode::Embedding,
            Strategy::Fuzzy => MatchMode::Fuzzy,
        }
    }

    /// Make every given text scoreable. A no-op for fuzzy matching.
    pub fn prepare<'a, I>(&mut self, texts: I) -> Result<(), MatchError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        match self {
            Strategy::Embedding(scorer) => scorer.prepare(texts),
            Strategy::Fuzzy => Ok(()),
        }
    }

    /// Whether `description` carries nothing this strategy can score. The
    /// fuzzy path ignores punctuation, so `"..."` is as blank as `""`.
    pub fn is_blank(&self, description: &str) -> bool {
        match self {
            Strategy::Embedding(_) => description.trim().is_empty(),
            Strategy::Fuzzy => fuzzy::normalize(description).is_empty(),
        }
    }

    /// Similarity in the common threshold unit.
    pub fn score(&self, description: &str, term: &str) -> Result<f32, MatchError> {
        match self {
            Strategy::Embedding(scorer) => scorer.score(description, term),
            Strategy::Fuzzy => Ok((fuzzy::term_score(description, term) / 100.0) as f32),
        }
    }
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

/// Terms whose score against `description` meets `threshold` (inclusive).
pub fn match_terms<'t, I>(
    description: &str,
    terms: I,
    strategy: &Strategy,
    threshold: Threshold,
) -> Result<BTreeSet<String>, MatchError>
where
    I: IntoIterator<Item = &'t str>,
{
    let mut matched = BTreeSet::new();
    if strategy.is_blank(description) {
        return Ok(matched);
    }
    for term in terms {
        if threshold.admits(strategy.score(description, term)?) {
            matched.insert(term.to_string());
        }
    }
    Ok(matched)
}

/// Event id → matched terms.
pub type TagResult = BTreeMap<String, BTreeSet<String>>;

/// One description per event id, first row wins.
pub fn unique_events<'a, I>(events: I) -> Vec<&'a EventRecord>
where
    I: IntoIterator<Item = &'a EventRecord>,
{
    let mut seen = BTreeSet::new();
    events
        .into_iter()
        .filter(|e| seen.insert(e.id.as_str()))
        .collect()
}

/// Tag every distinct event against the full dictionary.
///
/// The strategy is prepared once with all descriptions and terms, so an
/// embedding pass encodes in a single batch.
pub fn tag_events<'a, I>(
    events: I,
    dictionary: &TermDictionary,
    strategy: &mut Strategy,
    threshold: Threshold,
) -> Result<TagResult, MatchError>
where
    I: IntoIterator<Item = &'a EventRecord>,
{
    let unique = unique_events(events);
    strategy.prepare(
        unique
            .iter()
            .map(|e| e.description.as_str())
            .chain(dictionary.terms()),
    )?;

    let mut tags = TagResult::new();
    for ev in &unique {
        let matched = match_terms(&ev.description, dictionary.terms(), strategy, threshold)?;
        tags.insert(ev.id.clone(), matched);
    }
    log::info!(
        "tagged {} events with {} ({} matched at least one term)",
        tags.len(),
        strategy.mode(),
        tags.values().filter(|t| !t.is_empty()).count()
    );
    Ok(tags)
}

/// Seed the embedding cache with vectors carried in the event file.
/// Returns how many were accepted.
pub fn seed_precomputed<'a, I>(scorer: &mut EmbeddingScorer, events: I) -> usize
where
    I: IntoIterator<Item = &'a EventRecord>,
{
    let mut accepted = 0;
    for ev in events {
        if let Some(vector) = &ev.embedding {
            if scorer.seed(&ev.description, vector.clone()) {
                accepted += 1;
            }
        }
    }
    accepted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::embedding::HashingEncoder;
    use pretty_assertions::assert_eq;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn fuzzy_threshold_is_inclusive() {
        let s = Strategy::Fuzzy;
        let exact = match_terms("fatigue", ["fatigue"], &s, Threshold::percent(100.0).unwrap()).unwrap();
        assert_eq!(exact, set(&["fatigue"]));
    }

    #[test]
    fn empty_description_matches_nothing() {
        let s = Strategy::Fuzzy;
        let none = match_terms("   ", ["fatigue"], &s, Threshold::percent(0.0).unwrap()).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn punctuation_only_description_is_blank_for_fuzzy() {
        let s = Strategy::Fuzzy;
        assert!(s.is_blank("... -- !!"));
        let none = match_terms("...", ["fatigue", "leak"], &s, Threshold::percent(0.0).unwrap()).unwrap();
        assert!(none.is_empty());
        let some = match_terms("fatigue.", ["fatigue", "leak"], &s, Threshold::percent(0.0).unwrap()).unwrap();
        assert_eq!(some, set(&["fatigue", "leak"]));
    }

    #[test]
    fn threshold_rejects_out_of_range_values() {
        assert!(Threshold::percent(101.0).is_err());
        assert!(Threshold::cosine(-1.5).is_err());
        assert_eq!(Threshold::percent(70.0).unwrap().value(), 0.7);
    }

    #[test]
    fn mode_parses_case_insensitively() {
        assert_eq!("Fuzzy".parse::<MatchMode>().unwrap(), MatchMode::Fuzzy);
        assert!("regex".parse::<MatchMode>().is_err());
    }

    #[test]
    fn tagging_deduplicates_event_rows() {
        let events = vec![
            EventRecord::new("1", "Operator fatigue noted"),
            EventRecord::new("1", "second row of the same event"),
            EventRecord::new("2", "Valve leak"),
        ];
        let dict = TermDictionary::from_terms(&["fatigue", "leak"]).unwrap();
        let mut s = Strategy::Fuzzy;
        let tags = tag_events(&events, &dict, &mut s, Threshold::percent(90.0).unwrap()).unwrap();
        assert_eq!(tags.len(), 2);
        assert_eq!(tags["1"], set(&["fatigue"]));
        assert_eq!(tags["2"], set(&["leak"]));
    }

    #[test]
    fn embedding_tagging_prepares_in_one_pass() {
        let events = vec![EventRecord::new("7", "fatigue"), EventRecord::new("8", "")];
        let dict = TermDictionary::from_terms(&["fatigue"]).unwrap();
        let mut s = Strategy::Embedding(EmbeddingScorer::new(Box::new(HashingEncoder::default())));
        let tags = tag_events(&events, &dict, &mut s, Threshold::cosine(0.99).unwrap()).unwrap();
        assert_eq!(tags["7"], set(&["fatigue"]));
        assert!(tags["8"].is_empty());
    }

    #[test]
    fn precomputed_vectors_with_matching_dimension_are_seeded() {
        let mut scorer = EmbeddingScorer::new(Box::new(HashingEncoder::new(2)));
        let mut good = EventRecord::new("1", "a");
        good.embedding = Some(vec![1.0, 0.0]);
        let mut bad = EventRecord::new("2", "b");
        bad.embedding = Some(vec![1.0, 0.0, 0.0]);
        assert_eq!(seed_precomputed(&mut scorer, [&good, &bad]), 1);
        assert_eq!(scorer.cached_len(), 1);
    }
}
