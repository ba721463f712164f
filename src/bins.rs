use serde::{Deserialize, Serialize};

use crate::ticks::{Tick, TickFormatter};

/// Guards the bin count against a maximum value landing exactly on a bin
/// edge, which would otherwise lose that case to rounding.
const BIN_COUNT_EPSILON: f64 = 1e-6;

/// Compute a bin width for the observed value range of a numeric attribute.
///
/// Targets four bins across the range, then snaps the per-bin width to a
/// multiple of 1, 2, or 5 times a power of ten (breakpoints: below 2 snaps
/// to 1, below 5 snaps to 2, otherwise 5).
///
/// Returns `None` when the range is degenerate: equal bounds or a non-finite
/// bound.
pub fn bin_width_from_data(min_value: f64, max_value: f64) -> Option<f64> {
    if !min_value.is_finite() || !max_value.is_finite() || min_value == max_value {
        return None;
    }
    let approx = (max_value - min_value).abs() / 4.0;
    let exp = approx.log10().floor();
    let power = 10.0_f64.powi(exp as i32);
    let base = approx / power;
    let digit = if base < 2.0 {
        1.0
    } else if base < 5.0 {
        2.0
    } else {
        5.0
    };
    Some(digit * power)
}

/// Derived description of the bins spanning a numeric attribute's values.
///
/// `min_bin_edge` is at or below the smallest value, `max_bin_edge` at or
/// above the largest; bins are `[start, end)` half-open intervals of width
/// `bin_width` anchored at a multiple of the width via `bin_alignment`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BinDetails {
    pub bin_alignment: f64,
    pub bin_width: f64,
    pub min_bin_edge: f64,
    pub max_bin_edge: f64,
    pub min_value: f64,
    pub max_value: f64,
    pub total_number_of_bins: usize,
}

/// Persisted and in-drag bin parameters for a binned plot.
///
/// The persisted width/alignment survive serialization and new data; the
/// active values preview an in-progress bin-boundary drag and are discarded
/// unless committed.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BinSettings {
    pub bin_alignment: Option<f64>,
    pub bin_width: Option<f64>,
    #[serde(skip)]
    active_bin_alignment: Option<f64>,
    #[serde(skip)]
    active_bin_width: Option<f64>,
}

impl BinSettings {
    /// The bin width in effect: the drag preview if active, else the
    /// persisted width.
    pub fn effective_width(&self) -> Option<f64> {
        self.active_bin_width.or(self.bin_width)
    }

    /// The bin alignment in effect: the drag preview if active, else the
    /// persisted alignment.
    pub fn effective_alignment(&self) -> Option<f64> {
        self.active_bin_alignment.or(self.bin_alignment)
    }

    /// Set the drag-preview bin width. Non-finite or non-positive input is
    /// ignored.
    pub fn set_active_width(&mut self, width: f64) {
        if width.is_finite() && width > 0.0 {
            self.active_bin_width = Some(width);
        }
    }

    /// Set the drag-preview bin alignment. Non-finite input is ignored.
    pub fn set_active_alignment(&mut self, alignment: f64) {
        if alignment.is_finite() {
            self.active_bin_alignment = Some(alignment);
        }
    }

    /// Persist the drag preview and clear it.
    pub fn commit_active(&mut self) {
        if let Some(w) = self.active_bin_width.take() {
            self.bin_width = Some(w);
        }
        if let Some(a) = self.active_bin_alignment.take() {
            self.bin_alignment = Some(a);
        }
    }

    /// Discard the drag preview without persisting it.
    pub fn abandon_active(&mut self) {
        self.active_bin_width = None;
        self.active_bin_alignment = None;
    }

    /// Compute bin details for the given case values.
    ///
    /// Non-finite values are ignored. The width is recomputed from data only
    /// when `initialize` is set or no width is in effect yet, so a
    /// user-chosen width survives new data; likewise the alignment, which
    /// defaults to the multiple of the width at or below the smallest value.
    /// Degenerate input yields an all-zero result.
    pub fn bin_details(&mut self, values: &[f64], initialize: bool) -> BinDetails {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for &v in values {
            if v.is_finite() {
                lo = lo.min(v);
                hi = hi.max(v);
            }
        }
        if lo > hi {
            return BinDetails::default();
        }

        let width = if initialize || self.effective_width().is_none() {
            let computed = bin_width_from_data(lo, hi);
            self.bin_width = computed;
            self.active_bin_width = None;
            computed
        } else {
            self.effective_width()
        };
        let Some(width) = width else {
            return BinDetails::default();
        };

        let alignment = if initialize || self.effective_alignment().is_none() {
            let anchored = (lo / width).floor() * width;
            self.bin_alignment = Some(anchored);
            self.active_bin_alignment = None;
            anchored
        } else {
            // Effective alignment is present on this branch.
            self.effective_alignment().unwrap_or(0.0)
        };

        // Walk the alignment down (or up) in whole bin widths until the edge
        // is at or below the smallest value.
        let min_bin_edge = alignment - ((alignment - lo) / width).ceil() * width;
        let total_number_of_bins = ((hi - min_bin_edge) / width + BIN_COUNT_EPSILON).ceil() as usize;
        let max_bin_edge = min_bin_edge + total_number_of_bins as f64 * width;

        BinDetails {
            bin_alignment: alignment,
            bin_width: width,
            min_bin_edge,
            max_bin_edge,
            min_value: lo,
            max_value: hi,
            total_number_of_bins,
        }
    }
}

/// Index of the bin containing `value`, if it falls inside the binned range.
pub fn bin_index(details: &BinDetails, value: f64) -> Option<usize> {
    if !value.is_finite() || details.bin_width <= 0.0 || details.total_number_of_bins == 0 {
        return None;
    }
    let idx = ((value - details.min_bin_edge) / details.bin_width).floor();
    (idx >= 0.0 && (idx as usize) < details.total_number_of_bins).then(|| idx as usize)
}

/// Count the values falling in each bin. Non-finite and out-of-range values
/// are ignored.
pub fn bin_counts(details: &BinDetails, values: &[f64]) -> Vec<usize> {
    let mut counts = vec![0usize; details.total_number_of_bins];
    for &v in values {
        if let Some(idx) = bin_index(details, v) {
            counts[idx] += 1;
        }
    }
    counts
}

/// Ticks at each bin center, labeled with the bin's `[start, end)` interval.
pub fn binned_axis_ticks(details: &BinDetails, formatter: &TickFormatter) -> Vec<Tick> {
    let mut ticks = Vec::with_capacity(details.total_number_of_bins);
    if details.bin_width <= 0.0 {
        return ticks;
    }
    for i in 0..details.total_number_of_bins {
        let start = details.min_bin_edge + i as f64 * details.bin_width;
        let end = start + details.bin_width;
        let label = format!("[{}, {})", formatter(start), formatter(end));
        ticks.push(Tick::new(start + details.bin_width / 2.0, label));
    }
    ticks
}

/// Ticks at each bin boundary, for binned axes whose bounds are not
/// draggable and therefore always sit exactly on bin edges.
pub fn non_draggable_axis_ticks(details: &BinDetails, formatter: &TickFormatter) -> Vec<Tick> {
    let mut ticks = Vec::with_capacity(details.total_number_of_bins + 1);
    if details.bin_width <= 0.0 || details.total_number_of_bins == 0 {
        return ticks;
    }
    for i in 0..=details.total_number_of_bins {
        let value = details.min_bin_edge + i as f64 * details.bin_width;
        ticks.push(Tick::new(value, formatter(value)));
    }
    ticks
}
