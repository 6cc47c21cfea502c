//! Weak-signal tagging: scores event descriptions against dictionary terms.
//!
//! ```text
//!   descriptions + terms
//!          │
//!          ▼
//!   ┌──────────────┐        ┌───────────────┐
//!   │  Strategy    │──────▶ │ EmbeddingScorer│  encoder + vector cache
//!   │  (score)     │        └───────────────┘
//!   │              │──────▶   fuzzy::term_score
//!   └──────────────┘
//!          │  score >= threshold
//!          ▼
//!      TagResult   event id → {terms}
//! ```

pub mod embedding;
pub mod fuzzy;
pub mod matcher;

pub use matcher::{match_terms, tag_events, MatchMode, Strategy, TagResult, Threshold};
