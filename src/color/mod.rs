//! Color grading of analysed grids.

mod grade;

pub use grade::{reduce, GradeMesh};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, PersistError, Result};

/// An opaque RGB color, serialized as six hex digits (`"FF8000"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLUE: Self = Self::new(0, 0, 255);
    pub const YELLOW: Self = Self::new(255, 255, 0);
    pub const RED: Self = Self::new(255, 0, 0);
    pub const LIME: Self = Self::new(0, 255, 0);
    pub const MAROON: Self = Self::new(128, 0, 0);

    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Linear mix: `self · (1 − w) + other · w`, with `w` clamped to [0, 1].
    #[must_use]
    pub fn blend(self, other: Self, w: f64) -> Self {
        let w = w.clamp(0.0, 1.0);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let mix = |a: u8, b: u8| {
            (f64::from(a) * (1.0 - w) + f64::from(b) * w)
                .round()
                .clamp(0.0, 255.0) as u8
        };
        Self::new(mix(self.r, other.r), mix(self.g, other.g), mix(self.b, other.b))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl FromStr for Rgb {
    type Err = PersistError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        let invalid = || PersistError::InvalidColor(s.to_string());
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(invalid());
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        Ok(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl TryFrom<String> for Rgb {
    type Error = PersistError;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Rgb> for String {
    fn from(color: Rgb) -> Self {
        color.to_string()
    }
}

/// How the corner values of a cell are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorBasis {
    #[default]
    Average,
    Minimum,
    Maximum,
}

/// The gradient used to color a grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorConfig {
    /// Gradient stops from lowest to highest exposure. At least two.
    pub stops: Vec<Rgb>,
    pub basis: ColorBasis,
    /// Percentage of available sun time at the bottom of the gradient.
    pub low: f64,
    /// Percentage of available sun time at the top of the gradient.
    pub high: f64,
    /// Color for cells above `high`.
    pub above: Rgb,
    /// Color for cells below `low`.
    pub below: Rgb,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            stops: vec![Rgb::BLUE, Rgb::YELLOW, Rgb::RED],
            basis: ColorBasis::Average,
            low: 0.0,
            high: 80.0,
            above: Rgb::MAROON,
            below: Rgb::LIME,
        }
    }
}

/// One entry of a color scale legend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LegendEntry {
    pub color: Rgb,
    /// Share of available sun time, in percent.
    pub percent: f64,
    /// The same share in hours.
    pub hours: f64,
}

/// The color scale of a grid, for display next to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Legend {
    /// One entry per stop, lowest first.
    pub stops: Vec<LegendEntry>,
    /// Override applied above the top of the range.
    pub above: LegendEntry,
    /// Override applied below the bottom of the range.
    pub below: LegendEntry,
}

impl ColorConfig {
    /// Checks the gradient is usable.
    ///
    /// # Errors
    ///
    /// Returns an error for fewer than two stops or an inverted or
    /// non-finite clamp range.
    pub fn validate(&self) -> Result<()> {
        if self.stops.len() < 2 {
            return Err(
                AnalysisError::InvalidColors("at least two colors are needed".into()).into(),
            );
        }
        if !(self.low.is_finite() && self.high.is_finite()) || self.low > self.high {
            return Err(AnalysisError::InvalidColors(format!(
                "clamp range {}..{} is not valid",
                self.low, self.high
            ))
            .into());
        }
        Ok(())
    }

    /// Color for a value given as a fraction of the available sun time.
    #[must_use]
    pub fn color_for(&self, fraction: f64) -> Rgb {
        let (low, high) = (self.low / 100.0, self.high / 100.0);
        if fraction > high {
            return self.above;
        }
        if fraction < low {
            return self.below;
        }
        let Some(&first) = self.stops.first() else {
            return self.below;
        };
        let span = high - low;
        let t = if span > 0.0 {
            ((fraction - low) / span).clamp(0.0, 1.0)
        } else {
            0.0
        };
        #[allow(clippy::cast_precision_loss)]
        let bands = (self.stops.len() - 1) as f64;
        for (i, pair) in self.stops.windows(2).enumerate() {
            #[allow(clippy::cast_precision_loss)]
            let start = i as f64 / bands;
            #[allow(clippy::cast_precision_loss)]
            let end = (i + 1) as f64 / bands;
            if t >= start && t <= end {
                return pair[0].blend(pair[1], (t - start) * bands);
            }
        }
        first
    }

    /// The scale legend for a grid with `total_time` hours of available
    /// sun time.
    #[must_use]
    pub fn legend(&self, total_time: f64) -> Legend {
        let entry = |color, percent: f64| LegendEntry {
            color,
            percent,
            hours: percent / 100.0 * total_time,
        };
        let bands = self.stops.len().saturating_sub(1).max(1);
        let stops = self
            .stops
            .iter()
            .enumerate()
            .map(|(i, &color)| {
                #[allow(clippy::cast_precision_loss)]
                let percent = self.low + (self.high - self.low) * i as f64 / bands as f64;
                entry(color, percent)
            })
            .collect();
        Legend {
            stops,
            above: entry(self.above, self.high),
            below: entry(self.below, self.low),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn hex_round_trip() {
        let color: Rgb = "80ff00".parse().unwrap();
        assert_eq!(color, Rgb::new(128, 255, 0));
        assert_eq!(color.to_string(), "80FF00");
        assert!("12345".parse::<Rgb>().is_err());
        assert!("GG0000".parse::<Rgb>().is_err());
        let json = serde_json::to_string(&Rgb::MAROON).unwrap();
        assert_eq!(json, "\"800000\"");
    }

    #[test]
    fn blend_weights_second_color() {
        assert_eq!(Rgb::BLUE.blend(Rgb::YELLOW, 1.0), Rgb::YELLOW);
        assert_eq!(Rgb::BLUE.blend(Rgb::YELLOW, 0.0), Rgb::BLUE);
        assert_eq!(Rgb::new(0, 0, 0).blend(Rgb::new(200, 100, 50), 0.5), Rgb::new(100, 50, 25));
    }

    #[test]
    fn forty_percent_lands_on_the_middle_stop() {
        let config = ColorConfig::default();
        assert_eq!(config.color_for(0.4), Rgb::YELLOW);
        assert_eq!(config.color_for(0.0), Rgb::BLUE);
        assert_eq!(config.color_for(0.8), Rgb::RED);
        assert_eq!(config.color_for(0.81), Rgb::MAROON);
    }

    #[test]
    fn below_the_range_uses_the_override() {
        let config = ColorConfig {
            low: 10.0,
            ..ColorConfig::default()
        };
        assert_eq!(config.color_for(0.05), Rgb::LIME);
    }

    #[test]
    fn zero_width_range_maps_to_first_stop() {
        let config = ColorConfig {
            low: 50.0,
            high: 50.0,
            ..ColorConfig::default()
        };
        assert_eq!(config.color_for(0.5), Rgb::BLUE);
    }

    #[test]
    fn legend_spreads_stops_over_the_range() {
        let legend = ColorConfig::default().legend(10.0);
        assert_eq!(legend.stops.len(), 3);
        assert_relative_eq!(legend.stops[1].percent, 40.0);
        assert_relative_eq!(legend.stops[1].hours, 4.0);
        assert_relative_eq!(legend.above.hours, 8.0);
        assert_eq!(legend.below.color, Rgb::LIME);
    }

    #[test]
    fn single_stop_is_invalid() {
        let config = ColorConfig {
            stops: vec![Rgb::RED],
            ..ColorConfig::default()
        };
        assert!(config.validate().is_err());
        ColorConfig::default().validate().unwrap();
    }
}
