use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};

use crate::error::MatchError;
use crate::signal::embedding::{
    EmbeddingScorer, Encoder, HashingEncoder, OllamaEncoder, DEFAULT_EMBED_DIMENSION,
    DEFAULT_EMBED_MODEL,
};
use crate::signal::{MatchMode, Strategy, Threshold};

/// Event table used when nothing else is configured.
pub const DEFAULT_EVENTS_URL: &str =
    "https://raw.githubusercontent.com/titetodesco/sphera/main/TRATADO_safeguardOffShore.xlsx";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Embedding,
    Fuzzy,
}

impl From<ModeArg> for MatchMode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::Embedding => MatchMode::Embedding,
            ModeArg::Fuzzy => MatchMode::Fuzzy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EncoderArg {
    /// Local Ollama server
    Ollama,
    /// Offline feature-hashing encoder
    Hashing,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "offshore-signals")]
#[command(about = "Explore offshore safety events and tag weak signals", long_about = None)]
pub struct Settings {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Event spreadsheet (URL or local path)
    #[arg(long, env = "SIGNALS_EVENTS_URL", default_value = DEFAULT_EVENTS_URL)]
    pub events_url: String,

    /// Weak-signal dictionary spreadsheet (URL or local path)
    #[arg(long, env = "SIGNALS_DICTIONARY_URL")]
    pub dictionary_url: Option<String>,

    #[arg(long, value_enum, default_value_t = ModeArg::Fuzzy)]
    pub mode: ModeArg,

    /// Cosine for embedding mode, 0–100 for fuzzy mode
    #[arg(long)]
    pub threshold: Option<f32>,

    #[arg(long, value_enum, env = "SIGNALS_ENCODER", default_value_t = EncoderArg::Ollama)]
    pub encoder: EncoderArg,

    #[arg(long, env = "OLLAMA_BASE", default_value = "http://localhost:11434")]
    pub ollama_url: String,

    #[arg(long, env = "SIGNALS_EMBED_MODEL", default_value = DEFAULT_EMBED_MODEL)]
    pub embedding_model: String,

    #[arg(long, default_value_t = DEFAULT_EMBED_DIMENSION)]
    pub embedding_dimension: usize,

    #[arg(long, default_value_t = 3600)]
    pub cache_ttl_secs: u64,

    #[arg(long, default_value_t = 60)]
    pub http_timeout_secs: u64,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Tag every event and write the export without opening the dashboard
    Tag {
        #[arg(long, default_value = "weak_signals.csv")]
        output: PathBuf,
        /// Keep only these locations (repeatable)
        #[arg(long)]
        location: Vec<String>,
    },
}

impl Settings {
    pub fn match_mode(&self) -> MatchMode {
        self.mode.into()
    }

    pub fn threshold(&self) -> Result<Threshold, MatchError> {
        let mode = self.match_mode();
        Threshold::new(mode, self.threshold.unwrap_or_else(|| mode.default_threshold()))
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn build_encoder(&self) -> Result<Box<dyn Encoder>, MatchError> {
        Ok(match self.encoder {
            EncoderArg::Ollama => Box::new(OllamaEncoder::new(
                &self.ollama_url,
                &self.embedding_model,
                self.embedding_dimension,
                self.http_timeout(),
            )?),
            EncoderArg::Hashing => Box::new(HashingEncoder::default()),
        })
    }

    /// Strategy for `mode`; only the embedding variant needs an encoder.
    pub fn build_strategy(&self, mode: MatchMode) -> Result<Strategy, MatchError> {
        Ok(match mode {
            MatchMode::Embedding => Strategy::Embedding(EmbeddingScorer::new(self.build_encoder()?)),
            MatchMode::Fuzzy => Strategy::Fuzzy,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_parse_without_arguments() {
        let s = Settings::try_parse_from(["offshore-signals"]).unwrap();
        assert!(s.command.is_none());
        assert_eq!(s.match_mode(), MatchMode::Fuzzy);
        assert_eq!(s.threshold().unwrap(), Threshold::percent(80.0).unwrap());
        assert_eq!(s.cache_ttl(), Duration::from_secs(3600));
    }

    #[test]
    fn tag_subcommand_with_filters() {
        let s = Settings::try_parse_from([
            "offshore-signals",
            "--mode",
            "embedding",
            "--threshold",
            "0.6",
            "--encoder",
            "hashing",
            "tag",
            "--output",
            "out.csv",
            "--location",
            "P-50",
            "--location",
            "P-52",
        ])
        .unwrap();
        assert_eq!(s.threshold().unwrap(), Threshold::cosine(0.6).unwrap());
        match &s.command {
            Some(Command::Tag { output, location }) => {
                assert_eq!(output, &PathBuf::from("out.csv"));
                assert_eq!(location, &["P-50", "P-52"]);
            }
            None => panic!("expected tag subcommand"),
        }
        assert!(matches!(s.build_strategy(MatchMode::Embedding), Ok(Strategy::Embedding(_))));
    }

    #[test]
    fn out_of_range_threshold_is_rejected() {
        let s = Settings::try_parse_from(["offshore-signals", "--threshold", "150"]).unwrap();
        assert!(s.threshold().is_err());
    }
}
