//! Cell shading from a continuous RIC value.

use serde::Serialize;

/// Fixed-hue palette. Lightness runs from `base_lightness` at RIC 0 to
/// `base_lightness + span` as RIC approaches 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadePalette {
    pub hue: u16,
    pub base_lightness: f64,
    pub span: f64,
}

impl Default for ShadePalette {
    fn default() -> Self {
        Self {
            hue: 220,
            base_lightness: 10.0,
            span: 90.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Shade {
    /// RIC below 1: the cell carries redundant information.
    Plaque { lightness: f64 },
    Plain,
}

impl ShadePalette {
    pub fn shade(&self, ric: Option<f64>) -> Shade {
        match ric {
            Some(v) if v.is_finite() && v < 1.0 => Shade::Plaque {
                lightness: (self.base_lightness + self.span * v).clamp(0.0, 100.0),
            },
            _ => Shade::Plain,
        }
    }

    pub fn css(&self, shade: Shade) -> String {
        match shade {
            Shade::Plaque { lightness } => format!("hsl({},100%,{}%)", self.hue, lightness),
            Shade::Plain => "white".to_string(),
        }
    }
}

impl Shade {
    pub fn is_plaque(&self) -> bool {
        matches!(self, Shade::Plaque { .. })
    }
}
