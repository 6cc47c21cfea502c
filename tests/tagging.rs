use std::collections::BTreeSet;

use offshore_signals::data::dictionary::TermDictionary;
use offshore_signals::data::model::EventRecord;
use offshore_signals::signal::embedding::{EmbeddingScorer, HashingEncoder};
use offshore_signals::signal::{match_terms, tag_events, Strategy, Threshold};
use proptest::prelude::*;

const TERMS: [&str; 5] = ["dropped object", "fatigue", "leak", "permit to work", "gas alarm"];

fn fuzzy_tags(description: &str, percent: f32) -> BTreeSet<String> {
    match_terms(description, TERMS, &Strategy::Fuzzy, Threshold::percent(percent).unwrap()).unwrap()
}

#[test]
fn dropped_object_matches_at_70_but_not_95() {
    let desc = "A tool was dropped from height striking the deck";
    assert!(fuzzy_tags(desc, 70.0).contains("dropped object"));
    assert!(!fuzzy_tags(desc, 95.0).contains("dropped object"));
}

#[test]
fn empty_description_matches_nothing_in_either_mode() {
    assert!(fuzzy_tags("", 0.0).is_empty());
    assert!(fuzzy_tags("   ", 0.0).is_empty());

    let mut strategy = Strategy::Embedding(EmbeddingScorer::new(Box::new(HashingEncoder::default())));
    strategy.prepare(TERMS).unwrap();
    let tags = match_terms("", TERMS, &strategy, Threshold::cosine(-1.0).unwrap()).unwrap();
    assert!(tags.is_empty());
}

#[test]
fn punctuation_only_description_matches_nothing() {
    assert!(fuzzy_tags("...", 0.0).is_empty());
    assert!(fuzzy_tags(" ;-- !", 0.0).is_empty());
}

#[test]
fn matching_ignores_case() {
    assert_eq!(
        fuzzy_tags("Operator FATIGUE noted on night shift", 90.0),
        fuzzy_tags("operator fatigue noted on night shift", 90.0)
    );
    let upper = match_terms("Operator fatigue", ["Fatigue"], &Strategy::Fuzzy, Threshold::percent(100.0).unwrap())
        .unwrap();
    assert!(upper.contains("Fatigue"));
}

#[test]
fn threshold_is_inclusive() {
    // Exact substring scores 100 and must pass a threshold of exactly 100.
    assert!(fuzzy_tags("Small leak at the flange", 100.0).contains("leak"));
}

#[test]
fn tagging_leaves_inputs_untouched_across_strategies() {
    let events = vec![
        EventRecord::new("1", "Operator fatigue during night shift"),
        EventRecord::new("2", "Valve leak on deck"),
    ];
    let dictionary = TermDictionary::from_terms(&TERMS).unwrap();
    let before_events = events.clone();
    let before_terms: Vec<String> = dictionary.terms().map(str::to_string).collect();

    let mut fuzzy = Strategy::Fuzzy;
    let lexical = tag_events(&events, &dictionary, &mut fuzzy, Threshold::percent(80.0).unwrap()).unwrap();
    let mut embedding = Strategy::Embedding(EmbeddingScorer::new(Box::new(HashingEncoder::default())));
    let semantic = tag_events(&events, &dictionary, &mut embedding, Threshold::cosine(0.3).unwrap()).unwrap();

    assert_eq!(events, before_events);
    assert_eq!(dictionary.terms().collect::<Vec<_>>(), before_terms);
    assert_eq!(lexical.len(), 2);
    assert_eq!(semantic.len(), 2);
    assert!(lexical["1"].contains("fatigue"));
    assert!(lexical["2"].contains("leak"));
}

proptest! {
    #[test]
    fn raising_the_threshold_never_adds_terms(
        description in "[A-Za-z ,.]{0,60}",
        low in 0.0f32..=100.0,
        high in 0.0f32..=100.0,
    ) {
        let (low, high) = if low <= high { (low, high) } else { (high, low) };
        let loose = fuzzy_tags(&description, low);
        let strict = fuzzy_tags(&description, high);
        prop_assert!(strict.is_subset(&loose));
    }

    #[test]
    fn raising_the_cosine_threshold_never_adds_terms(
        description in "[A-Za-z ,.]{0,60}",
        low in -1.0f32..=1.0,
        high in -1.0f32..=1.0,
    ) {
        let (low, high) = if low <= high { (low, high) } else { (high, low) };
        let mut strategy = Strategy::Embedding(EmbeddingScorer::new(Box::new(HashingEncoder::default())));
        strategy.prepare(std::iter::once(description.as_str()).chain(TERMS)).unwrap();
        let loose = match_terms(&description, TERMS, &strategy, Threshold::cosine(low).unwrap()).unwrap();
        let strict = match_terms(&description, TERMS, &strategy, Threshold::cosine(high).unwrap()).unwrap();
        prop_assert!(strict.is_subset(&loose));
    }
}
