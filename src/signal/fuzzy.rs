//! Lexical similarity on the 0–100 scale.
//!
//! Both strings are normalised first (lowercase, punctuation to spaces,
//! whitespace collapsed), so case and incidental punctuation never change a
//! score.  The reported score is the larger of a character-window partial
//! ratio and a token-aligned partial ratio; the latter keeps multi-word terms
//! matchable when their words are spread across the description.

/// Lowercase, map every non-alphanumeric char to a space, collapse runs.
pub fn normalize(text: &str) -> String {
    let mapped: String = text
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    mapped
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Length of the longest common subsequence.
fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let mut prev = vec![0usize; b.len() + 1];
    let mut cur = vec![0usize; b.len() + 1];
    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            cur[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                cur[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}

/// Indel-normalised similarity: `200 * LCS / (|a| + |b|)`.
fn indel_ratio(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 100.0;
    }
    200.0 * lcs_len(a, b) as f64 / total as f64
}

/// Full-string ratio of two raw strings (normalised first).
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = normalize(a).chars().collect();
    let b: Vec<char> = normalize(b).chars().collect();
    indel_ratio(&a, &b)
}

/// Best ratio of the shorter string against every same-length window of
/// the longer one.
pub fn partial_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = normalize(a).chars().collect();
    let b: Vec<char> = normalize(b).chars().collect();
    char_partial_ratio(&a, &b)
}

fn char_partial_ratio(a: &[char], b: &[char]) -> f64 {
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    if short.is_empty() {
        return if long.is_empty() { 100.0 } else { 0.0 };
    }
    let mut best: f64 = 0.0;
    for start in 0..=(long.len() - short.len()) {
        let window = &long[start..start + short.len()];
        best = best.max(indel_ratio(short, window));
        if best >= 100.0 {
            break;
        }
    }
    best
}

/// Each term token is paired with its closest description token; the pairs
/// are pooled into one Indel ratio.
fn token_partial_ratio(term: &str, description: &str) -> f64 {
    let desc_tokens: Vec<Vec<char>> = description
        .split(' ')
        .filter(|t| !t.is_empty())
        .map(|t| t.chars().collect())
        .collect();
    if desc_tokens.is_empty() {
        return 0.0;
    }

    let mut common = 0usize;
    let mut total = 0usize;
    for tok in term.split(' ').filter(|t| !t.is_empty()) {
        let tok: Vec<char> = tok.chars().collect();
        let best = desc_tokens
            .iter()
            .map(|d| (indel_ratio(&tok, d), d))
            .max_by(|x, y| x.0.total_cmp(&y.0));
        if let Some((_, d)) = best {
            common += lcs_len(&tok, d);
            total += tok.len() + d.len();
        }
    }
    if total == 0 {
        return 0.0;
    }
    200.0 * common as f64 / total as f64
}

/// Similarity of a dictionary term to a description, 0–100.
///
/// Empty (after normalisation) inputs score 0.
pub fn term_score(description: &str, term: &str) -> f64 {
    let desc = normalize(description);
    let term = normalize(term);
    if desc.is_empty() || term.is_empty() {
        return 0.0;
    }
    let d: Vec<char> = desc.chars().collect();
    let t: Vec<char> = term.chars().collect();
    char_partial_ratio(&t, &d).max(token_partial_ratio(&term, &desc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_case_punctuation_and_spacing() {
        assert_eq!(normalize("  Dropped,   OBJECT!! "), "dropped object");
        assert_eq!(normalize("--"), "");
    }

    #[test]
    fn lcs_of_known_pairs() {
        let c = |s: &str| s.chars().collect::<Vec<_>>();
        assert_eq!(lcs_len(&c("object"), &c("deck")), 2);
        assert_eq!(lcs_len(&c("abc"), &c("abc")), 3);
        assert_eq!(lcs_len(&c(""), &c("abc")), 0);
    }

    #[test]
    fn exact_substring_scores_full() {
        assert_eq!(partial_ratio("fatigue", "Worker reported FATIGUE after shift"), 100.0);
        assert_eq!(term_score("Worker reported fatigue.", "Fatigue"), 100.0);
    }

    #[test]
    fn ratio_is_symmetric() {
        assert_eq!(ratio("slip", "slips"), ratio("slips", "slip"));
    }

    #[test]
    fn scattered_multiword_term_scores_between_seventy_and_ninety_five() {
        let score = term_score("A tool was dropped from height striking the deck", "dropped object");
        assert!(score >= 70.0, "score {score}");
        assert!(score < 95.0, "score {score}");
    }

    #[test]
    fn empty_inputs_score_zero() {
        assert_eq!(term_score("", "fatigue"), 0.0);
        assert_eq!(term_score("fatigue", "  "), 0.0);
    }
}
