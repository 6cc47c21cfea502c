use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use offshore_signals::data::model::Dimension;
use offshore_signals::signal::MatchMode;

use crate::state::{AppState, View};

// ---------------------------------------------------------------------------
// Left side panel – views, filters, matching
// ---------------------------------------------------------------------------

/// Render the left panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Analysis");
    ui.separator();
    for view in View::ALL {
        ui.radio_value(&mut state.view, view, view.title());
    }
    ui.add_space(8.0);

    if state.view == View::WeakSignals {
        matching_controls(ui, state);
        ui.add_space(8.0);
    }

    ui.heading("Filters");
    ui.separator();

    let Some(dataset) = &state.session.dataset else {
        ui.label("No dataset loaded.");
        return;
    };

    // Owned copy: the loop below mutates `state`.
    let unique = dataset.unique_values.clone();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            for dim in Dimension::ALL {
                let Some(all_values) = unique.get(&dim) else {
                    continue;
                };
                if all_values.is_empty() {
                    continue;
                }

                let n_selected = state
                    .filters
                    .get(&dim)
                    .map(|s| s.intersection(all_values).count())
                    .unwrap_or(0);
                let header_text = format!("{dim}  ({n_selected}/{})", all_values.len());

                egui::CollapsingHeader::new(RichText::new(header_text).strong())
                    .id_salt(dim.label())
                    .default_open(dim == Dimension::Location)
                    .show(ui, |ui: &mut Ui| {
                        ui.horizontal(|ui: &mut Ui| {
                            if ui.small_button("All").clicked() {
                                state.select_all(dim);
                            }
                            if ui.small_button("None").clicked() {
                                state.select_none(dim);
                            }
                        });

                        for val in all_values {
                            let mut checked = state
                                .filters
                                .get(&dim)
                                .is_some_and(|s| s.contains(val));
                            if ui.checkbox(&mut checked, val.as_str()).changed() {
                                state.toggle_filter_value(dim, val);
                            }
                        }
                    });
            }
        });
}

fn matching_controls(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Matching");
    ui.separator();

    let mut mode = state.session.mode();
    ui.horizontal(|ui: &mut Ui| {
        ui.radio_value(&mut mode, MatchMode::Embedding, "Embedding");
        ui.radio_value(&mut mode, MatchMode::Fuzzy, "Fuzzy");
    });
    if mode != state.session.mode() {
        state.set_mode(mode);
    }

    let (min, max) = mode.native_range();
    // Negative cosine thresholds match nearly everything; keep the slider useful.
    let min = if mode == MatchMode::Embedding { 0.0 } else { min };
    let slider = egui::Slider::new(&mut state.threshold_input, min..=max)
        .text("threshold")
        .step_by(if mode == MatchMode::Fuzzy { 1.0 } else { 0.01 });
    let response = ui.add(slider);
    if response.drag_stopped() || (response.changed() && !response.dragged()) {
        state.apply_threshold();
    }

    if state.session.dictionary.is_none() {
        ui.label(RichText::new("No dictionary configured (--dictionary-url).").color(Color32::YELLOW));
    } else if let Some(dict) = &state.session.dictionary {
        ui.label(format!("{} dictionary terms", dict.len()));
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open local file…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            if ui.button("Export tags…").clicked() {
                export_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if ui.button("🔁 Reload from source").clicked() {
            state.reload(true);
        }

        ui.separator();

        if let Some(ds) = &state.session.dataset {
            ui.label(format!(
                "{} rows loaded, {} visible",
                ds.len(),
                state.visible_indices.len()
            ));
        }

        if let Some(msg) = &state.status_message {
            let color = if msg.starts_with("Error") {
                Color32::RED
            } else {
                Color32::LIGHT_GREEN
            };
            ui.label(RichText::new(msg).color(color));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open event table")
        .add_filter("Supported files", &["xlsx", "xls", "csv", "json", "parquet", "pq"])
        .add_filter("Excel", &["xlsx", "xls"])
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        state.open_local(&path);
    }
}

pub fn export_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Export weak-signal tags")
        .set_file_name("weak_signals.csv")
        .add_filter("CSV", &["csv"])
        .save_file();

    if let Some(path) = file {
        state.export(&path);
    }
}
