use std::ops::RangeInclusive;

use eframe::egui::{self, Align2, FontId, RichText, Sense, Ui, Vec2};
use egui_plot::{Bar, BarChart, GridMark, Legend, Line, Plot, PlotPoints};

use offshore_signals::data::aggregate::{PivotTable, TrendTable};

use crate::color::{ColorMap, HeatRamp};

const CELL: Vec2 = Vec2::new(56.0, 24.0);
const LABEL_CHARS: usize = 18;

fn shorten(label: &str, max: usize) -> String {
    if label.chars().count() <= max {
        label.to_string()
    } else {
        let head: String = label.chars().take(max.saturating_sub(1)).collect();
        format!("{head}…")
    }
}

// ---------------------------------------------------------------------------
// Heatmap
// ---------------------------------------------------------------------------

/// Paint a pivot as a grid of coloured cells with counts.
pub fn heatmap(ui: &mut Ui, table: &PivotTable) {
    if table.is_empty() {
        ui.label("No events with both dimensions set.");
        return;
    }
    let ramp = HeatRamp::default();
    let max = table.max();
    let row_label = table.row_dim.map_or("Rows", |d| d.label());
    let col_label = table.col_dim.map_or("Columns", |d| d.label());

    egui::ScrollArea::both()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            egui::Grid::new(("heatmap", row_label, col_label))
                .spacing([2.0, 2.0])
                .show(ui, |ui: &mut Ui| {
                    ui.label(
                        RichText::new(format!("{row_label} ↓  {col_label} →")).weak(),
                    );
                    for col in &table.cols {
                        ui.label(RichText::new(shorten(col, 8)).small())
                            .on_hover_text(col.as_str());
                    }
                    ui.end_row();

                    for row in &table.rows {
                        ui.label(shorten(row, LABEL_CHARS)).on_hover_text(row.as_str());
                        for col in &table.cols {
                            let n = table.get(row, col);
                            let (rect, response) = ui.allocate_exact_size(CELL, Sense::hover());
                            let painter = ui.painter();
                            painter.rect_filled(rect, 2.0, ramp.color(n, max));
                            if n > 0 {
                                painter.text(
                                    rect.center(),
                                    Align2::CENTER_CENTER,
                                    n.to_string(),
                                    FontId::proportional(12.0),
                                    ramp.text_color(n, max),
                                );
                            }
                            response.on_hover_text(format!("{row} × {col}: {n} events"));
                        }
                        ui.end_row();
                    }
                });
        });
}

// ---------------------------------------------------------------------------
// Bar chart
// ---------------------------------------------------------------------------

/// Vertical bars, one per label, in the given order.
pub fn bar_chart(ui: &mut Ui, id: &str, counts: &[(String, usize)], height: f32) {
    let labels: Vec<String> = counts.iter().map(|(l, _)| shorten(l, 12)).collect();
    let bars: Vec<Bar> = counts
        .iter()
        .enumerate()
        .map(|(i, (label, n))| Bar::new(i as f64, *n as f64).name(label).width(0.7))
        .collect();

    Plot::new(id)
        .height(height)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .y_axis_label("Events")
        .x_axis_formatter(move |mark: GridMark, _range: &RangeInclusive<f64>| {
            let i = mark.value.round();
            if (mark.value - i).abs() > f64::EPSILON || i < 0.0 {
                return String::new();
            }
            labels.get(i as usize).cloned().unwrap_or_default()
        })
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars));
        });
}

// ---------------------------------------------------------------------------
// Trend lines
// ---------------------------------------------------------------------------

/// One line per event type over the month axis.
pub fn trend_lines(ui: &mut Ui, trend: &TrendTable) {
    if trend.months.is_empty() {
        ui.label("No dated events in the current selection.");
        return;
    }
    let colors = ColorMap::new(trend.series.keys());
    let months: Vec<String> = trend.months.iter().map(ToString::to_string).collect();

    Plot::new("monthly_trend")
        .legend(Legend::default())
        .y_axis_label("Events")
        .allow_boxed_zoom(true)
        .x_axis_formatter(move |mark: GridMark, _range: &RangeInclusive<f64>| {
            let i = mark.value.round();
            if (mark.value - i).abs() > f64::EPSILON || i < 0.0 {
                return String::new();
            }
            months.get(i as usize).cloned().unwrap_or_default()
        })
        .show(ui, |plot_ui| {
            for (kind, counts) in &trend.series {
                let points: PlotPoints = counts
                    .iter()
                    .enumerate()
                    .map(|(i, &n)| [i as f64, n as f64])
                    .collect();
                let line = Line::new(points)
                    .name(kind)
                    .color(colors.color_for(kind))
                    .width(1.5);
                plot_ui.line(line);
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_labels_are_shortened() {
        assert_eq!(shorten("P-50", 8), "P-50");
        assert_eq!(shorten("Dropped Objects", 8), "Dropped…");
    }
}
