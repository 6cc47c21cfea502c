mod app;
mod color;
mod state;
mod ui;

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::Result;
use clap::Parser;
use eframe::egui;

use app::SignalsApp;
use offshore_signals::config::{Command, Settings};
use offshore_signals::data::filter::FilterState;
use offshore_signals::data::model::Dimension;
use offshore_signals::session::Session;
use state::AppState;

fn main() -> Result<()> {
    env_logger::init();

    let mut settings = Settings::parse();
    match settings.command.take() {
        Some(Command::Tag { output, location }) => run_headless(settings, &output, location),
        None => run_dashboard(settings),
    }
}

/// Tag every (optionally location-filtered) event and write the export.
fn run_headless(settings: Settings, output: &Path, locations: Vec<String>) -> Result<()> {
    let mut session = Session::from_settings(settings)?;
    session.load()?;

    let mut filters = FilterState::new();
    if !locations.is_empty() {
        filters.insert(Dimension::Location, locations.into_iter().collect::<BTreeSet<_>>());
    }
    let written = session.export_filtered(output, &filters)?;
    println!("Wrote {written} events to {}", output.display());
    Ok(())
}

fn run_dashboard(settings: Settings) -> Result<()> {
    let mut state = AppState::new(Session::from_settings(settings)?);
    state.reload(false);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 820.0])
            .with_min_inner_size([700.0, 450.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Offshore Weak Signals",
        options,
        Box::new(move |_cc| Ok(Box::new(SignalsApp::new(state)))),
    )
    .map_err(|e| anyhow::anyhow!("dashboard failed: {e}"))
}
