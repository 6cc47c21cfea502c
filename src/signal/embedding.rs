use std::collections::{HashMap, HashSet};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::MatchError;

/// Default Ollama embedding model.
pub const DEFAULT_EMBED_MODEL: &str = "nomic-embed-text";

/// Default dimension for nomic-embed-text.
pub const DEFAULT_EMBED_DIMENSION: usize = 768;

/// Texts per `/api/embed` request.
const EMBED_BATCH: usize = 64;

// ---------------------------------------------------------------------------
// Encoder – text → fixed-length vectors
// ---------------------------------------------------------------------------

/// A pretrained (or stand-in) sentence encoder.
pub trait Encoder {
    /// Identifies the model; vectors from different ids never mix.
    fn model_id(&self) -> &str;

    /// Output dimension.
    fn dimension(&self) -> usize;

    /// Encode a batch, one vector per input, in order.
    fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, MatchError>;
}

// -- Ollama -------------------------------------------------------------------

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Talks to a local Ollama server over its `/api/embed` endpoint.
pub struct OllamaEncoder {
    client: reqwest::blocking::Client,
    base_url: String,
    model: String,
    dimension: usize,
}

impl OllamaEncoder {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        dimension: usize,
        timeout: Duration,
    ) -> Result<Self, MatchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MatchError::Encoder(e.to_string()))?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let model = model.into();
        log::info!("Initializing Ollama encoder: url={base_url}, model={model}");
        Ok(Self {
            client,
            base_url,
            model,
            dimension,
        })
    }

    fn embed_chunk(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, MatchError> {
        let response = self
            .client
            .post(format!("{}/api/embed", self.base_url))
            .json(&EmbedRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .map_err(|e| MatchError::Encoder(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(MatchError::Encoder(format!(
                "Ollama returned {status}: {body}"
            )));
        }

        let parsed: EmbedResponse = response
            .json()
            .map_err(|e| MatchError::Encoder(format!("Failed to parse response: {e}")))?;
        Ok(parsed.embeddings)
    }
}

impl Encoder for OllamaEncoder {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, MatchError> {
        let mut out = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(EMBED_BATCH) {
            let vectors = self.embed_chunk(chunk)?;
            check_batch(&vectors, chunk.len(), self.dimension)?;
            out.extend(vectors);
        }
        Ok(out)
    }
}

/// A server batch must hold one vector per input, each of the configured
/// dimension.
fn check_batch(vectors: &[Vec<f32>], expected: usize, dimension: usize) -> Result<(), MatchError> {
    if vectors.len() != expected {
        return Err(MatchError::BatchSize {
            expected,
            got: vectors.len(),
        });
    }
    if let Some(v) = vectors.iter().find(|v| v.len() != dimension) {
        return Err(MatchError::DimensionMismatch {
            left: v.len(),
            right: dimension,
        });
    }
    Ok(())
}

// -- Hashing ------------------------------------------------------------------

/// Offline encoder: feature-hashes word tokens and character trigrams.
///
/// Deterministic across runs and platforms; shares no semantics with a
/// trained model, but texts with overlapping wording land close together.
pub struct HashingEncoder {
    id: String,
    dimension: usize,
}

impl HashingEncoder {
    pub fn new(dimension: usize) -> Self {
        let dimension = dimension.max(1);
        Self {
            id: format!("hashing-{dimension}"),
            dimension,
        }
    }

    fn encode_one(&self, text: &str) -> Vec<f32> {
        let mut vec = vec![0.0f32; self.dimension];
        let normalized = super::fuzzy::normalize(text);
        for word in normalized.split(' ').filter(|w| !w.is_empty()) {
            vec[self.bucket(word.as_bytes())] += 1.0;
            let padded: Vec<char> = format!(" {word} ").chars().collect();
            for tri in padded.windows(3) {
                let gram: String = tri.iter().collect();
                vec[self.bucket(gram.as_bytes())] += 0.5;
            }
        }
        normalize_in_place(&mut vec);
        vec
    }

    fn bucket(&self, bytes: &[u8]) -> usize {
        (fnv1a(bytes) % self.dimension as u64) as usize
    }
}

impl Default for HashingEncoder {
    fn default() -> Self {
        Self::new(256)
    }
}

impl Encoder for HashingEncoder {
    fn model_id(&self) -> &str {
        &self.id
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, MatchError> {
        Ok(texts.iter().map(|t| self.encode_one(t)).collect())
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for b in bytes {
        hash ^= *b as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

fn normalize_in_place(vec: &mut [f32]) {
    let norm = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vec.iter_mut() {
            *x /= norm;
        }
    }
}

// ---------------------------------------------------------------------------
// Vector math
// ---------------------------------------------------------------------------

/// Cosine similarity in [-1, 1]; zero-norm inputs give 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, MatchError> {
    if a.len() != b.len() {
        return Err(MatchError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    let mut dot = 0.0f32;
    let mut na = 0.0f32;
    let mut nb = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return Ok(0.0);
    }
    Ok((dot / (na.sqrt() * nb.sqrt())).clamp(-1.0, 1.0))
}

// ---------------------------------------------------------------------------
// EmbeddingScorer – encoder plus per-text vector cache
// ---------------------------------------------------------------------------

/// Cosine scorer. Every text is encoded once; later threshold changes only
/// redo the comparisons.
pub struct EmbeddingScorer {
    encoder: Box<dyn Encoder>,
    vectors: HashMap<String, Vec<f32>>,
}

impl EmbeddingScorer {
    pub fn new(encoder: Box<dyn Encoder>) -> Self {
        Self {
            encoder,
            vectors: HashMap::new(),
        }
    }

    pub fn model_id(&self) -> &str {
        self.encoder.model_id()
    }

    /// Replace the encoder; cached vectors belong to the old model and go.
    pub fn set_encoder(&mut self, encoder: Box<dyn Encoder>) {
        if encoder.model_id() != self.encoder.model_id() {
            log::info!(
                "Switching encoder from {} to {}, dropping {} cached vectors",
                self.encoder.model_id(),
                encoder.model_id(),
                self.vectors.len()
            );
            self.vectors.clear();
        }
        self.encoder = encoder;
    }

    /// Seed a precomputed vector. Rejected (returns false) when its
    /// dimension differs from the encoder's.
    pub fn seed(&mut self, text: &str, vector: Vec<f32>) -> bool {
        if vector.len() != self.encoder.dimension() {
            log::warn!(
                "discarding precomputed embedding of dimension {} (model {} expects {})",
                vector.len(),
                self.encoder.model_id(),
                self.encoder.dimension()
            );
            return false;
        }
        self.vectors.insert(text.to_string(), vector);
        true
    }

    /// Encode every text not yet cached, in one batched pass.
    pub fn prepare<'a, I>(&mut self, texts: I) -> Result<(), MatchError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut missing: Vec<String> = Vec::new();
        for t in texts {
            if !t.trim().is_empty() && !self.vectors.contains_key(t) && seen.insert(t) {
                missing.push(t.to_string());
            }
        }
        if missing.is_empty() {
            return Ok(());
        }

        log::info!(
            "encoding {} texts with {}",
            missing.len(),
            self.encoder.model_id()
        );
        let vectors = self.encoder.encode_batch(&missing)?;
        if vectors.len() != missing.len() {
            return Err(MatchError::BatchSize {
                expected: missing.len(),
                got: vectors.len(),
            });
        }
        for (text, vector) in missing.into_iter().zip(vectors) {
            self.vectors.insert(text, vector);
        }
        Ok(())
    }

    fn vector(&self, text: &str) -> Result<&[f32], MatchError> {
        self.vectors
            .get(text)
            .map(Vec::as_slice)
            .ok_or_else(|| MatchError::NotEncoded(text.to_string()))
    }

    pub fn score(&self, description: &str, term: &str) -> Result<f32, MatchError> {
        cosine_similarity(self.vector(description)?, self.vector(term)?)
    }

    pub fn cached_len(&self) -> usize {
        self.vectors.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Records every batch it is asked to encode.
    struct RecordingEncoder {
        inner: HashingEncoder,
        batches: Rc<RefCell<Vec<usize>>>,
    }

    impl Encoder for RecordingEncoder {
        fn model_id(&self) -> &str {
            self.inner.model_id()
        }
        fn dimension(&self) -> usize {
            self.inner.dimension()
        }
        fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, MatchError> {
            self.batches.borrow_mut().push(texts.len());
            self.inner.encode_batch(texts)
        }
    }

    #[test]
    fn cosine_basics() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]).unwrap() - 1.0).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]).unwrap() + 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]).unwrap(), 0.0);
        assert!(matches!(
            cosine_similarity(&[1.0], &[1.0, 0.0]),
            Err(MatchError::DimensionMismatch { left: 1, right: 2 })
        ));
    }

    #[test]
    fn hashing_encoder_is_deterministic_and_unit_length() {
        let enc = HashingEncoder::default();
        let a = enc.encode_batch(&["Dropped object near crane".into()]).unwrap();
        let b = enc.encode_batch(&["Dropped object near crane".into()]).unwrap();
        assert_eq!(a, b);
        let norm: f32 = a[0].iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn related_wording_scores_higher_than_unrelated() {
        let mut scorer = EmbeddingScorer::new(Box::new(HashingEncoder::default()));
        let texts = ["worker fatigue after long shift", "fatigue", "valve corrosion"];
        scorer.prepare(texts).unwrap();
        let close = scorer.score(texts[0], "fatigue").unwrap();
        let far = scorer.score(texts[2], "fatigue").unwrap();
        assert!(close > far, "{close} <= {far}");
    }

    #[test]
    fn prepare_encodes_each_text_once() {
        let batches = Rc::new(RefCell::new(Vec::new()));
        let encoder = RecordingEncoder {
            inner: HashingEncoder::default(),
            batches: Rc::clone(&batches),
        };
        let mut scorer = EmbeddingScorer::new(Box::new(encoder));
        scorer.prepare(["a b", "c d", "a b"]).unwrap();
        scorer.prepare(["a b", "e f"]).unwrap();
        scorer.prepare(["c d"]).unwrap();
        assert_eq!(*batches.borrow(), vec![2, 1]);
    }

    #[test]
    fn unprepared_text_is_an_error() {
        let scorer = EmbeddingScorer::new(Box::new(HashingEncoder::default()));
        assert!(matches!(scorer.score("x", "y"), Err(MatchError::NotEncoded(t)) if t == "x"));
    }

    #[test]
    fn seeds_with_wrong_dimension_are_rejected() {
        let mut scorer = EmbeddingScorer::new(Box::new(HashingEncoder::new(4)));
        assert!(!scorer.seed("a", vec![1.0, 0.0]));
        assert!(scorer.seed("a", vec![1.0, 0.0, 0.0, 0.0]));
        assert_eq!(scorer.cached_len(), 1);
    }

    #[test]
    fn server_vectors_of_the_wrong_dimension_are_rejected() {
        let good = vec![vec![0.0; 3], vec![1.0; 3]];
        assert!(check_batch(&good, 2, 3).is_ok());
        assert!(matches!(
            check_batch(&good, 3, 3),
            Err(MatchError::BatchSize { expected: 3, got: 2 })
        ));
        let short = vec![vec![0.0; 3], vec![1.0; 2]];
        assert!(matches!(
            check_batch(&short, 2, 3),
            Err(MatchError::DimensionMismatch { left: 2, right: 3 })
        ));
    }

    #[test]
    fn zero_dimension_is_clamped_in_the_model_id_too() {
        let enc = HashingEncoder::new(0);
        assert_eq!(enc.dimension(), 1);
        assert_eq!(enc.model_id(), "hashing-1");
        assert_eq!(enc.encode_batch(&["x".into()]).unwrap()[0].len(), 1);
    }

    #[test]
    fn switching_model_clears_cache() {
        let mut scorer = EmbeddingScorer::new(Box::new(HashingEncoder::new(8)));
        scorer.prepare(["alpha"]).unwrap();
        scorer.set_encoder(Box::new(HashingEncoder::new(16)));
        assert_eq!(scorer.cached_len(), 0);
    }
}
