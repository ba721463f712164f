use std::sync::Arc;

/// A position along an axis where a grid line and tick label is placed.
#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    /// The value at this tick in data coordinates.
    pub value: f64,

    /// The label text displayed at this tick.
    pub label: String,
}

impl Tick {
    /// Create a new tick.
    pub fn new(value: f64, label: impl Into<String>) -> Self {
        Self {
            value,
            label: label.into(),
        }
    }
}

/// A function which formats tick values into strings for display on the axis.
pub type TickFormatter = Arc<dyn Fn(f64) -> String + Send + Sync>;

/// Format a value with precision matching the tick gap.
///
/// `step` is the gap between adjacent ticks; values are printed with just
/// enough decimal places to distinguish neighboring ticks.
pub fn format_with_step(value: f64, step: f64) -> String {
    let log_step = step.log10();
    if !log_step.is_finite() || log_step >= 0.0 {
        format!("{value:.0}")
    } else {
        let decimal_places = (-log_step).ceil() as usize;
        format!("{value:.decimal_places$}")
    }
}

/// Compute a "nice" gap between axis ticks for the given domain.
///
/// Targets five intervals across the domain, then snaps the gap to a
/// multiple of 1, 2, or 5 times a power of ten. Returns 0 when the domain
/// has zero extent so callers can fall back to fixed padding.
pub fn good_tick_value(min: f64, max: f64) -> f64 {
    let range = if min >= max { min.abs() } else { max - min };
    let gap = range / 5.0;
    if gap == 0.0 || !gap.is_finite() {
        return 0.0;
    }
    let exp = gap.log10().floor();
    let power = 10.0_f64.powi(exp as i32);
    let base = gap / power;
    let digit = if base < 2.0 {
        1.0
    } else if base < 5.0 {
        2.0
    } else {
        5.0
    };
    digit * power
}
