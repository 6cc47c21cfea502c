use std::collections::BTreeMap;

use eframe::egui::{self, RichText, Ui};
use egui_extras::{Column, TableBuilder};

use offshore_signals::data::aggregate::{count_by, monthly_trend, pivot, summarize, top_tasks_by_risk};
use offshore_signals::data::model::{Dimension, EventRecord};
use offshore_signals::signal::matcher::unique_events;
use offshore_signals::signal::TagResult;

use crate::state::{AppState, View};
use crate::ui::plot;

const SAMPLE_ROWS: usize = 25;
const TOP_RISK_AREAS: usize = 12;
const TOP_TASKS: usize = 5;

/// Render the selected view in the central panel.
pub fn central(ui: &mut Ui, state: &mut AppState) {
    if state.session.dataset.is_none() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("No events loaded  (File → Open local file… or Reload)");
        });
        return;
    }

    ui.heading(state.view.title());
    ui.separator();

    match state.view {
        View::Summary => summary(ui, state),
        View::Heatmap(row, col) => {
            let events = state.visible_events();
            let mut table = pivot(events.iter().copied(), row, col);
            if let Some(n) = state.view.heatmap_limit() {
                table = table.top(n);
            }
            plot::heatmap(ui, &table);
        }
        View::Trend => {
            let events = state.visible_events();
            plot::trend_lines(ui, &monthly_trend(events.iter().copied()));
        }
        View::TopTasks => top_tasks(ui, state),
        View::WeakSignals => weak_signals(ui, state),
    }
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

fn summary(ui: &mut Ui, state: &AppState) {
    let events = state.visible_events();
    let stats = summarize(events.iter().copied());

    ui.horizontal(|ui: &mut Ui| {
        ui.label(format!("{} rows", stats.rows));
        ui.separator();
        ui.label(format!("{} distinct events", stats.unique_events));
        if let (Some(first), Some(last)) = (stats.first_date, stats.last_date) {
            ui.separator();
            ui.label(format!("{first} to {last}"));
        }
    });
    if !stats.event_types.is_empty() {
        let types: Vec<String> = stats
            .event_types
            .iter()
            .map(|(t, n)| format!("{t}: {n}"))
            .collect();
        ui.label(types.join("   "));
    }
    ui.add_space(6.0);

    ui.label(RichText::new("Events per location").strong());
    plot::bar_chart(ui, "events_per_location", &count_by(events.iter().copied(), Dimension::Location), 200.0);
    ui.add_space(6.0);

    ui.label(RichText::new(format!("First {SAMPLE_ROWS} rows")).strong());
    ui.push_id("sample_rows", |ui: &mut Ui| {
        let extra = state
            .session
            .dataset
            .as_ref()
            .map(|ds| ds.extra_columns.as_slice())
            .unwrap_or_default();
        egui::ScrollArea::horizontal().show(ui, |ui: &mut Ui| {
            event_table(ui, &events[..events.len().min(SAMPLE_ROWS)], extra, None);
        });
    });
}

// ---------------------------------------------------------------------------
// Top tasks per risk area
// ---------------------------------------------------------------------------

fn top_tasks(ui: &mut Ui, state: &AppState) {
    let events = state.visible_events();
    let groups = top_tasks_by_risk(events.iter().copied(), TOP_RISK_AREAS, TOP_TASKS);
    if groups.is_empty() {
        ui.label("No events with both risk area and task set.");
        return;
    }
    egui::ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            for group in &groups {
                egui::CollapsingHeader::new(RichText::new(&group.risk_area).strong())
                    .id_salt(("risk_area", group.risk_area.as_str()))
                    .default_open(true)
                    .show(ui, |ui: &mut Ui| {
                        plot::bar_chart(ui, &format!("tasks_{}", group.risk_area), &group.tasks, 140.0);
                    });
            }
        });
}

// ---------------------------------------------------------------------------
// Weak signals
// ---------------------------------------------------------------------------

fn weak_signals(ui: &mut Ui, state: &mut AppState) {
    if state.session.dictionary.is_none() {
        ui.label("Load a weak-signal dictionary to tag events.");
        return;
    }
    state.ensure_tags();
    let Some(tags) = &state.session.tags else {
        ui.label("Tags are not available; see the status line.");
        return;
    };

    let events = state.visible_events();
    let unique = unique_events(events.iter().copied());
    let tagged: Vec<&EventRecord> = unique
        .into_iter()
        .filter(|e| tags.get(&e.id).is_some_and(|t| !t.is_empty()))
        .collect();

    let mut frequency: BTreeMap<&str, usize> = BTreeMap::new();
    for ev in &tagged {
        for term in tags.get(&ev.id).into_iter().flatten() {
            *frequency.entry(term.as_str()).or_default() += 1;
        }
    }
    let mut frequency: Vec<(String, usize)> = frequency
        .into_iter()
        .map(|(t, n)| (t.to_string(), n))
        .collect();
    frequency.sort_by(|a, b| b.1.cmp(&a.1));

    ui.label(format!(
        "{} of the visible events match at least one term ({}, threshold {:.2})",
        tagged.len(),
        state.session.mode(),
        state.threshold_input
    ));
    if frequency.is_empty() {
        return;
    }
    plot::bar_chart(ui, "term_frequency", &frequency, 200.0);
    ui.add_space(6.0);

    ui.push_id("tagged_events", |ui: &mut Ui| {
        event_table(ui, &tagged, &[], Some(tags));
    });
}

// ---------------------------------------------------------------------------
// Event table
// ---------------------------------------------------------------------------

/// Modelled columns, then `extra` source columns, then matched terms when
/// `tags` is given.
fn event_table(ui: &mut Ui, events: &[&EventRecord], extra: &[String], tags: Option<&TagResult>) {
    let mut table = TableBuilder::new(ui)
        .striped(true)
        .resizable(true)
        .column(Column::auto())
        .column(Column::auto())
        .column(Column::auto())
        .column(Column::auto())
        .column(Column::initial(360.0).clip(true));
    for _ in extra {
        table = table.column(Column::auto().clip(true));
    }
    if tags.is_some() {
        table = table.column(Column::remainder());
    }

    table
        .header(20.0, |mut header| {
            let titles = ["Event ID", "Date", "Location", "Risk Area", "Description"]
                .into_iter()
                .chain(extra.iter().map(String::as_str))
                .chain(tags.map(|_| "Matched Terms"));
            for title in titles {
                header.col(|ui: &mut Ui| {
                    ui.strong(title);
                });
            }
        })
        .body(|body| {
            body.rows(18.0, events.len(), |mut row| {
                let ev = events[row.index()];
                let date = ev.occurred.map(|d| d.to_string()).unwrap_or_default();
                row.col(|ui: &mut Ui| {
                    ui.label(ev.id.as_str());
                });
                row.col(|ui: &mut Ui| {
                    ui.label(date);
                });
                row.col(|ui: &mut Ui| {
                    ui.label(ev.location.as_deref().unwrap_or(""));
                });
                row.col(|ui: &mut Ui| {
                    ui.label(ev.risk_area.as_deref().unwrap_or(""));
                });
                row.col(|ui: &mut Ui| {
                    ui.label(ev.description.as_str()).on_hover_text(ev.description.as_str());
                });
                for name in extra {
                    let text = ev.extra_text(name);
                    row.col(|ui: &mut Ui| {
                        ui.label(text);
                    });
                }
                if let Some(tags) = tags {
                    let terms = tags
                        .get(&ev.id)
                        .map(|t| t.iter().map(String::as_str).collect::<Vec<_>>().join("; "))
                        .unwrap_or_default();
                    row.col(|ui: &mut Ui| {
                        ui.label(terms);
                    });
                }
            });
        });
}
