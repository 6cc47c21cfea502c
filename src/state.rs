use std::collections::BTreeSet;
use std::path::Path;

use offshore_signals::data::filter::{filtered_indices, init_filter_state, select, FilterState};
use offshore_signals::data::model::{Dimension, EventRecord};
use offshore_signals::session::Session;
use offshore_signals::signal::MatchMode;

// ---------------------------------------------------------------------------
// View selection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Summary,
    Heatmap(Dimension, Dimension),
    Trend,
    TopTasks,
    WeakSignals,
}

impl View {
    pub const ALL: [View; 8] = [
        View::Summary,
        View::Heatmap(Dimension::Location, Dimension::RiskArea),
        View::Heatmap(Dimension::Location, Dimension::HumanFactor),
        View::Heatmap(Dimension::Task, Dimension::HumanFactor),
        View::Heatmap(Dimension::RiskArea, Dimension::HumanFactor),
        View::Trend,
        View::TopTasks,
        View::WeakSignals,
    ];

    pub fn title(self) -> String {
        match self {
            View::Summary => "Data summary".into(),
            View::Heatmap(r, c) => format!("Heatmap {r} × {c}"),
            View::Trend => "Temporal trend".into(),
            View::TopTasks => "Top tasks per risk area".into(),
            View::WeakSignals => "Weak signals".into(),
        }
    }

    /// Task and risk heatmaps get too wide to read; they keep the top rows
    /// and columns only.
    pub fn heatmap_limit(self) -> Option<usize> {
        match self {
            View::Heatmap(Dimension::Task, _) | View::Heatmap(Dimension::RiskArea, _) => Some(20),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    pub session: Session,

    /// Per-dimension filter selections.
    pub filters: FilterState,

    /// Indices of events passing the current filters (cached).
    pub visible_indices: Vec<usize>,

    pub view: View,

    /// Threshold shown on the slider, in the active mode's native unit.
    pub threshold_input: f32,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,

    /// Set when the last tagging pass failed; cleared by any input change.
    tags_failed: bool,
}

impl AppState {
    pub fn new(session: Session) -> Self {
        let threshold_input = session
            .settings
            .threshold
            .unwrap_or_else(|| session.mode().default_threshold());
        Self {
            session,
            filters: FilterState::default(),
            visible_indices: Vec::new(),
            view: View::Summary,
            threshold_input,
            status_message: None,
            tags_failed: false,
        }
    }

    /// Load from the configured sources; `force` drops cached downloads first.
    pub fn reload(&mut self, force: bool) {
        let result = if force {
            self.session.refresh()
        } else {
            self.session.load()
        };
        self.after_load(result);
    }

    pub fn open_local(&mut self, path: &Path) {
        let source = path.to_string_lossy().into_owned();
        let result = self.session.load_events_from(&source);
        self.after_load(result);
    }

    fn after_load(&mut self, result: anyhow::Result<()>) {
        self.tags_failed = false;
        match result {
            Ok(()) => {
                if let Some(ds) = &self.session.dataset {
                    log::info!("{} events visible after load", ds.len());
                    self.filters = init_filter_state(ds);
                    self.visible_indices = (0..ds.len()).collect();
                }
                self.status_message = None;
            }
            Err(e) => {
                log::error!("Failed to load data: {e:#}");
                self.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }

    /// Rows passing the filters.
    pub fn visible_events(&self) -> Vec<&EventRecord> {
        match &self.session.dataset {
            Some(ds) => select(ds, &self.visible_indices),
            None => Vec::new(),
        }
    }

    /// Recompute `visible_indices` after filter change.
    pub fn refilter(&mut self) {
        if let Some(ds) = &self.session.dataset {
            self.visible_indices = filtered_indices(ds, &self.filters);
        }
    }

    /// Toggle a single value in a dimension's filter.
    pub fn toggle_filter_value(&mut self, dim: Dimension, value: &str) {
        let selected = self.filters.entry(dim).or_default();
        if !selected.remove(value) {
            selected.insert(value.to_string());
        }
        self.refilter();
    }

    /// Select all values in a dimension.
    pub fn select_all(&mut self, dim: Dimension) {
        if let Some(ds) = &self.session.dataset {
            if let Some(all_vals) = ds.unique_values.get(&dim) {
                self.filters.insert(dim, all_vals.clone());
                self.refilter();
            }
        }
    }

    /// Deselect all values in a dimension (which shows every row again).
    pub fn select_none(&mut self, dim: Dimension) {
        self.filters.insert(dim, BTreeSet::new());
        self.refilter();
    }

    pub fn set_mode(&mut self, mode: MatchMode) {
        self.tags_failed = false;
        match self.session.set_mode(mode) {
            Ok(()) => self.threshold_input = mode.default_threshold(),
            Err(e) => self.status_message = Some(format!("Error: {e:#}")),
        }
    }

    pub fn apply_threshold(&mut self) {
        self.tags_failed = false;
        if let Err(e) = self.session.set_threshold(self.threshold_input) {
            self.status_message = Some(format!("Error: {e:#}"));
        }
    }

    /// Compute tags if the current ones are stale.
    pub fn ensure_tags(&mut self) {
        if self.tags_failed
            || self.session.tags.is_some()
            || self.session.dataset.is_none()
            || self.session.dictionary.is_none()
        {
            return;
        }
        if let Err(e) = self.session.retag() {
            self.tags_failed = true;
            log::error!("Tagging failed: {e:#}");
            self.status_message = Some(format!("Error: {e:#}"));
        }
    }

    pub fn export(&mut self, path: &Path) {
        match self.session.export(path) {
            Ok(n) => self.status_message = Some(format!("Exported {n} events to {}", path.display())),
            Err(e) => {
                log::error!("Export failed: {e:#}");
                self.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }
}
