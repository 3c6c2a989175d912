/// Regulatory water-level lines for Lake Kinneret.
///
/// Levels in meters relative to sea level, in descending order:
///   upper red line > lower red line > black line
///
/// Above the upper red line water must be released to prevent flooding.
/// Below the lower red line pumping is restricted to protect the
/// ecosystem. Below the black line no pumping is allowed, not even for
/// drinking water.

use serde::Serialize;

use crate::model::Series;

pub const UPPER_RED_LINE_M: f64 = -208.80;
pub const LOWER_RED_LINE_M: f64 = -213.00;
pub const BLACK_LINE_M: f64 = -214.87;

/// Axis bounds that always keep both red lines in view.
const AXIS_FLOOR_M: f64 = -213.5;
const AXIS_CEILING_M: f64 = -207.5;
const AXIS_PADDING_M: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelStatus {
    AboveUpperRedLine,
    Normal,
    BelowLowerRedLine,
    BelowBlackLine,
}

impl LevelStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LevelStatus::AboveUpperRedLine => "above_upper_red_line",
            LevelStatus::Normal => "normal",
            LevelStatus::BelowLowerRedLine => "below_lower_red_line",
            LevelStatus::BelowBlackLine => "below_black_line",
        }
    }
}

/// Classifies a level against the regulatory lines. A level exactly on a
/// line counts as inside the band above it.
pub fn classify_level(level_m: f64) -> LevelStatus {
    if level_m > UPPER_RED_LINE_M {
        LevelStatus::AboveUpperRedLine
    } else if level_m >= LOWER_RED_LINE_M {
        LevelStatus::Normal
    } else if level_m >= BLACK_LINE_M {
        LevelStatus::BelowLowerRedLine
    } else {
        LevelStatus::BelowBlackLine
    }
}

/// Y-axis range for the trend chart: the data padded by half a meter,
/// widened so that both red lines are visible.
pub fn trend_axis_range(series: &Series) -> (f64, f64) {
    let levels = series.readings().iter().map(|r| r.water_level);
    let min = levels.clone().reduce(f64::min);
    let max = levels.reduce(f64::max);
    match (min, max) {
        (Some(min), Some(max)) => (
            (min - AXIS_PADDING_M).min(AXIS_FLOOR_M),
            (max + AXIS_PADDING_M).max(AXIS_CEILING_M),
        ),
        _ => (AXIS_FLOOR_M, AXIS_CEILING_M),
    }
}
