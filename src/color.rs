use std::collections::BTreeMap;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, LinSrgb, Mix, Srgb};

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            to_color32(rgb)
        })
        .collect()
}

fn to_color32(rgb: Srgb) -> Color32 {
    Color32::from_rgb(
        (rgb.red.clamp(0.0, 1.0) * 255.0).round() as u8,
        (rgb.green.clamp(0.0, 1.0) * 255.0).round() as u8,
        (rgb.blue.clamp(0.0, 1.0) * 255.0).round() as u8,
    )
}

// ---------------------------------------------------------------------------
// Heatmap ramp
// ---------------------------------------------------------------------------

/// Sequential yellow → green → blue ramp for heatmap cells.
#[derive(Debug, Clone, Copy)]
pub struct HeatRamp {
    stops: [LinSrgb; 3],
}

impl Default for HeatRamp {
    fn default() -> Self {
        let stop = |r: u8, g: u8, b: u8| Srgb::new(r, g, b).into_format::<f32>().into_linear();
        Self {
            stops: [stop(255, 255, 217), stop(65, 182, 196), stop(8, 29, 88)],
        }
    }
}

impl HeatRamp {
    /// Colour for `value` on a 0..=`max` scale.
    pub fn color(&self, value: usize, max: usize) -> Color32 {
        let t = if max == 0 {
            0.0
        } else {
            (value as f32 / max as f32).clamp(0.0, 1.0)
        };
        let mixed = if t < 0.5 {
            self.stops[0].mix(self.stops[1], t * 2.0)
        } else {
            self.stops[1].mix(self.stops[2], (t - 0.5) * 2.0)
        };
        to_color32(Srgb::from_linear(mixed))
    }

    /// Dark text on light cells, light text on dark ones.
    pub fn text_color(&self, value: usize, max: usize) -> Color32 {
        if max > 0 && value as f32 / max as f32 > 0.55 {
            Color32::WHITE
        } else {
            Color32::BLACK
        }
    }
}

// ---------------------------------------------------------------------------
// Color mapping: series name → Color32
// ---------------------------------------------------------------------------

/// Maps series names (event types, say) to distinct colours.
#[derive(Debug, Clone)]
pub struct ColorMap {
    mapping: BTreeMap<String, Color32>,
    default_color: Color32,
}

impl ColorMap {
    /// Build a colour map for the given names.
    pub fn new<'a>(names: impl IntoIterator<Item = &'a String>) -> Self {
        let names: Vec<&String> = names.into_iter().collect();
        let palette = generate_palette(names.len());
        let mapping = names
            .into_iter()
            .zip(palette)
            .map(|(n, c)| (n.clone(), c))
            .collect();

        ColorMap {
            mapping,
            default_color: Color32::GRAY,
        }
    }

    /// Look up the colour for a given name.
    pub fn color_for(&self, name: &str) -> Color32 {
        self.mapping
            .get(name)
            .copied()
            .unwrap_or(self.default_color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_has_requested_size() {
        assert_eq!(generate_palette(0).len(), 0);
        assert_eq!(generate_palette(5).len(), 5);
    }

    #[test]
    fn ramp_endpoints_match_stops() {
        let ramp = HeatRamp::default();
        assert_eq!(ramp.color(0, 10), Color32::from_rgb(255, 255, 217));
        assert_eq!(ramp.color(3, 0), ramp.color(0, 1));
        assert_eq!(ramp.text_color(10, 10), Color32::WHITE);
    }

    #[test]
    fn unknown_series_falls_back_to_gray() {
        let names = vec!["Incident".to_string()];
        let map = ColorMap::new(&names);
        assert_eq!(map.color_for("Near Miss"), Color32::GRAY);
        assert_ne!(map.color_for("Incident"), Color32::GRAY);
    }
}
