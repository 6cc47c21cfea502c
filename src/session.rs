use std::path::Path;

use anyhow::{Context, Result};

use crate::config::Settings;
use crate::data::dictionary::{DictionaryColumns, TermDictionary};
use crate::data::export::write_tag_export_file;
use crate::data::fetch::{HttpTransport, SourceCache, Transport};
use crate::data::filter::{filtered_indices, select, FilterState};
use crate::data::loader::parse_table;
use crate::data::model::{EventColumns, EventDataset};
use crate::signal::embedding::EmbeddingScorer;
use crate::signal::matcher::seed_precomputed;
use crate::signal::{tag_events, MatchMode, Strategy, TagResult, Threshold};

// ---------------------------------------------------------------------------
// Session – one operator's data, dictionary and tagging configuration
// ---------------------------------------------------------------------------

/// Everything a single dashboard (or headless run) works on.
///
/// The dataset and dictionary are replaced wholesale on reload; tags are
/// recomputed whenever mode or threshold change.
pub struct Session<T: Transport = HttpTransport> {
    pub settings: Settings,
    pub columns: EventColumns,
    pub dictionary_columns: DictionaryColumns,
    cache: SourceCache<T>,
    pub dataset: Option<EventDataset>,
    pub dictionary: Option<TermDictionary>,
    strategy: Strategy,
    /// Embedding scorer kept while fuzzy mode is active, so switching back
    /// does not re-encode.
    parked: Option<EmbeddingScorer>,
    threshold: Threshold,
    pub tags: Option<TagResult>,
}

impl Session<HttpTransport> {
    pub fn from_settings(settings: Settings) -> Result<Self> {
        let transport = HttpTransport::new(settings.http_timeout()).context("building HTTP client")?;
        Self::with_transport(settings, transport)
    }
}

impl<T: Transport> Session<T> {
    pub fn with_transport(settings: Settings, transport: T) -> Result<Self> {
        let mode = settings.match_mode();
        let strategy = settings
            .build_strategy(mode)
            .context("building matching strategy")?;
        let threshold = settings.threshold().context("reading threshold")?;
        let cache = SourceCache::new(transport, settings.cache_ttl());
        Ok(Self {
            settings,
            columns: EventColumns::default(),
            dictionary_columns: DictionaryColumns::default(),
            cache,
            dataset: None,
            dictionary: None,
            strategy,
            parked: None,
            threshold,
            tags: None,
        })
    }

    pub fn mode(&self) -> MatchMode {
        self.strategy.mode()
    }

    pub fn threshold(&self) -> Threshold {
        self.threshold
    }

    /// Fetch (or reuse cached bytes of) the event table and dictionary.
    ///
    /// Both sources are read before anything is replaced, so a failure
    /// leaves the previous dataset and dictionary in place.
    pub fn load(&mut self) -> Result<()> {
        let source = self.settings.events_url.clone();
        let dataset = self.read_events(&source)?;
        let dictionary = match self.settings.dictionary_url.clone() {
            Some(dict_source) => Some(self.read_dictionary(&dict_source)?),
            None => None,
        };

        self.commit_events(dataset);
        if let Some(dictionary) = dictionary {
            self.dictionary = Some(dictionary);
        }
        Ok(())
    }

    /// Replace the event table with the one at `source`.
    pub fn load_events_from(&mut self, source: &str) -> Result<()> {
        let dataset = self.read_events(source)?;
        self.commit_events(dataset);
        Ok(())
    }

    fn read_events(&self, source: &str) -> Result<EventDataset> {
        let bytes = self
            .cache
            .fetch(source)
            .with_context(|| format!("downloading events {source}"))?;
        let table = parse_table(source, &bytes).with_context(|| format!("parsing events {source}"))?;
        let dataset = EventDataset::from_table(&table, &self.columns)
            .with_context(|| format!("reading events {source}"))?;
        log::info!(
            "Loaded {} rows ({} events) from {source}",
            dataset.len(),
            dataset.unique_event_count()
        );
        Ok(dataset)
    }

    fn read_dictionary(&self, source: &str) -> Result<TermDictionary> {
        let bytes = self
            .cache
            .fetch(source)
            .with_context(|| format!("downloading dictionary {source}"))?;
        let table = parse_table(source, &bytes).with_context(|| format!("parsing dictionary {source}"))?;
        TermDictionary::from_table(&table, &self.dictionary_columns)
            .with_context(|| format!("reading dictionary {source}"))
    }

    fn commit_events(&mut self, dataset: EventDataset) {
        if let Strategy::Embedding(scorer) = &mut self.strategy {
            seed_precomputed(scorer, &dataset.events);
        }
        self.dataset = Some(dataset);
        self.tags = None;
    }

    /// Drop every cached download and load again.
    pub fn refresh(&mut self) -> Result<()> {
        self.cache.invalidate_all();
        self.load()
    }

    pub fn set_dictionary(&mut self, dictionary: TermDictionary) {
        self.dictionary = Some(dictionary);
        self.tags = None;
    }

    /// Switch strategy. The threshold resets to the new mode's default.
    pub fn set_mode(&mut self, mode: MatchMode) -> Result<()> {
        if mode == self.mode() {
            return Ok(());
        }
        let next = match mode {
            MatchMode::Fuzzy => Strategy::Fuzzy,
            MatchMode::Embedding => match self.parked.take() {
                Some(scorer) => Strategy::Embedding(scorer),
                None => {
                    let mut scorer = EmbeddingScorer::new(self.settings.build_encoder()?);
                    if let Some(ds) = &self.dataset {
                        seed_precomputed(&mut scorer, &ds.events);
                    }
                    Strategy::Embedding(scorer)
                }
            },
        };
        if let Strategy::Embedding(scorer) = std::mem::replace(&mut self.strategy, next) {
            self.parked = Some(scorer);
        }
        self.threshold = Threshold::new(mode, mode.default_threshold())?;
        self.tags = None;
        Ok(())
    }

    /// Threshold in the active mode's native unit.
    pub fn set_threshold(&mut self, native: f32) -> Result<()> {
        self.threshold = Threshold::new(self.mode(), native)?;
        self.tags = None;
        Ok(())
    }

    /// Tag every event in the dataset with the current mode and threshold.
    pub fn retag(&mut self) -> Result<&TagResult> {
        let dataset = self.dataset.as_ref().context("no event data loaded")?;
        let dictionary = self.dictionary.as_ref().context("no dictionary loaded")?;
        let tags = tag_events(&dataset.events, dictionary, &mut self.strategy, self.threshold)
            .context("tagging events")?;
        Ok(self.tags.insert(tags))
    }

    /// Write the current tags; tags are computed first if stale.
    pub fn export(&mut self, path: &Path) -> Result<usize> {
        if self.tags.is_none() {
            self.retag()?;
        }
        let (Some(dataset), Some(tags)) = (&self.dataset, &self.tags) else {
            anyhow::bail!("nothing to export");
        };
        write_tag_export_file(path, &dataset.events, tags, &self.columns)
            .with_context(|| format!("writing {}", path.display()))
    }

    /// Tag and export only the events passing `filters`, leaving the
    /// dashboard's tags alone.
    pub fn export_filtered(&mut self, path: &Path, filters: &FilterState) -> Result<usize> {
        let dataset = self.dataset.as_ref().context("no event data loaded")?;
        let dictionary = self
            .dictionary
            .as_ref()
            .context("a dictionary is required for tagging")?;
        let events = select(dataset, &filtered_indices(dataset, filters));
        let tags = tag_events(events.iter().copied(), dictionary, &mut self.strategy, self.threshold)
            .context("tagging events")?;
        write_tag_export_file(path, events.iter().copied(), &tags, &self.columns)
            .with_context(|| format!("writing {}", path.display()))
    }
}
