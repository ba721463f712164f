use serde::{Deserialize, Serialize};

/// Side of the plot area an axis is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AxisPlace {
    Bottom,
    Left,
    Top,
    Right,
}

impl AxisPlace {
    /// Whether the axis runs along the horizontal edge of the plot.
    pub fn is_horizontal(self) -> bool {
        matches!(self, Self::Bottom | Self::Top)
    }

    /// The place orthogonal to this one on the same corner of the plot.
    ///
    /// Bottom pairs with left, top pairs with right.
    pub fn perpendicular(self) -> Self {
        match self {
            Self::Bottom => Self::Left,
            Self::Left => Self::Bottom,
            Self::Top => Self::Right,
            Self::Right => Self::Top,
        }
    }
}

/// How values are spaced along an axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScaleKind {
    /// Evenly spaced numeric values.
    #[default]
    Linear,
    /// Logarithmically spaced numeric values.
    Log,
    /// Discrete positions with no extent, used by the empty axis.
    Ordinal,
    /// Discrete positions with extent, used by categorical axes.
    Band,
}

/// Ratio used when committing a domain: a bound within 1/100 of the span
/// from zero is snapped to exactly zero.
const COMMIT_SNAP_RATIO: f64 = 100.0;

fn snap_to_zero(min: f64, max: f64) -> (f64, f64) {
    if min > 0.0 && max > 0.0 && min <= max / COMMIT_SNAP_RATIO {
        (0.0, max)
    } else if min < 0.0 && max < 0.0 && max >= min / COMMIT_SNAP_RATIO {
        (min, 0.0)
    } else {
        (min, max)
    }
}

/// Shared state for the numeric family of axes.
///
/// Holds the persisted `[min, max]` domain plus a transient "dynamic" domain
/// that previews an in-progress drag. The effective domain is the dynamic
/// bound where present, the persisted bound otherwise; readers never observe
/// a half-committed mixture because `set_domain` clears both dynamic bounds
/// in the same call that writes the persisted ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericAxis {
    pub place: AxisPlace,
    #[serde(default)]
    pub scale: ScaleKind,
    pub min: f64,
    pub max: f64,
    #[serde(skip)]
    dynamic_min: Option<f64>,
    #[serde(skip)]
    dynamic_max: Option<f64>,
    #[serde(skip)]
    allow_range_to_shrink: bool,
}

impl NumericAxis {
    /// Create a linear numeric axis with the given persisted domain.
    pub fn new(place: AxisPlace, min: f64, max: f64) -> Self {
        Self {
            place,
            scale: ScaleKind::Linear,
            min,
            max,
            dynamic_min: None,
            dynamic_max: None,
            allow_range_to_shrink: false,
        }
    }

    /// The effective domain: dynamic bounds where present, persisted otherwise.
    pub fn domain(&self) -> (f64, f64) {
        (
            self.dynamic_min.unwrap_or(self.min),
            self.dynamic_max.unwrap_or(self.max),
        )
    }

    /// True when no drag preview is active.
    pub fn is_settled(&self) -> bool {
        self.dynamic_min.is_none() && self.dynamic_max.is_none()
    }

    /// Arm the one-shot flag permitting the next `set_domain` to shrink the
    /// range instead of only growing it.
    pub fn set_allow_range_to_shrink(&mut self, allow: bool) {
        self.allow_range_to_shrink = allow;
    }

    /// Commit a new persisted domain.
    ///
    /// Non-finite components leave the corresponding bound unchanged. Unless
    /// the shrink flag was armed, bounds are clamped so the domain never
    /// shrinks relative to the current effective domain. Any drag preview is
    /// discarded.
    pub(crate) fn commit_domain(&mut self, new_min: f64, new_max: f64, snap: bool) {
        let (cur_min, cur_max) = self.domain();
        let mut min = if new_min.is_finite() { new_min } else { cur_min };
        let mut max = if new_max.is_finite() { new_max } else { cur_max };
        if snap {
            (min, max) = snap_to_zero(min, max);
        }
        if self.allow_range_to_shrink {
            self.allow_range_to_shrink = false;
        } else {
            min = min.min(cur_min);
            max = max.max(cur_max);
        }
        self.min = min;
        self.max = max;
        self.dynamic_min = None;
        self.dynamic_max = None;
    }

    /// Set the transient drag-preview domain.
    ///
    /// Zero-snapping is deliberately skipped here so interactive feedback
    /// tracks the pointer instead of jumping. Non-finite components leave the
    /// corresponding preview bound unchanged.
    pub fn set_dynamic_domain(&mut self, min: f64, max: f64) {
        if min.is_finite() {
            self.dynamic_min = Some(min);
        }
        if max.is_finite() {
            self.dynamic_max = Some(max);
        }
    }

    /// Discard the drag preview without committing it.
    pub fn clear_dynamic_domain(&mut self) {
        self.dynamic_min = None;
        self.dynamic_max = None;
    }
}

/// An axis installed at one place on a graph.
///
/// One variant per axis kind; the numeric family shares [`NumericAxis`] for
/// its domain state. An axis is replaced, not mutated in place, when the
/// attribute it displays changes type incompatibly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AxisModel {
    /// Placeholder axis when no attribute is assigned.
    Empty { place: AxisPlace },
    /// Plain numeric values.
    Numeric(NumericAxis),
    /// Case counts; displayed minimum is kept at or above zero by callers.
    Count(NumericAxis),
    /// Percentages; displayed minimum is kept at or above zero by callers.
    Percent(NumericAxis),
    /// Date/time values; domain padding never snaps to zero.
    Date(NumericAxis),
    /// Qualitative values mapped onto a fixed `[0, 1]` domain.
    Qualitative(NumericAxis),
    /// Categorical values; category order lives in the data configuration.
    Categorical { place: AxisPlace },
    /// Color values; category order lives in the data configuration.
    Color { place: AxisPlace },
}

impl AxisModel {
    /// Create an empty placeholder axis.
    pub fn empty(place: AxisPlace) -> Self {
        Self::Empty { place }
    }

    /// Create a numeric axis with the given persisted domain.
    pub fn numeric(place: AxisPlace, min: f64, max: f64) -> Self {
        Self::Numeric(NumericAxis::new(place, min, max))
    }

    /// Create a count axis with a unit starting domain.
    pub fn count(place: AxisPlace) -> Self {
        Self::Count(NumericAxis::new(place, 0.0, 1.0))
    }

    /// Create a percent axis spanning 0..100.
    pub fn percent(place: AxisPlace) -> Self {
        Self::Percent(NumericAxis::new(place, 0.0, 100.0))
    }

    /// Create a date axis with the given persisted domain (epoch seconds).
    pub fn date(place: AxisPlace, min: f64, max: f64) -> Self {
        Self::Date(NumericAxis::new(place, min, max))
    }

    /// Create a qualitative axis with its fixed `[0, 1]` domain.
    pub fn qualitative(place: AxisPlace) -> Self {
        Self::Qualitative(NumericAxis::new(place, 0.0, 1.0))
    }

    /// Create a categorical axis.
    pub fn categorical(place: AxisPlace) -> Self {
        Self::Categorical { place }
    }

    /// Create a color axis.
    pub fn color(place: AxisPlace) -> Self {
        Self::Color { place }
    }

    /// The place this axis is installed at.
    pub fn place(&self) -> AxisPlace {
        match self {
            Self::Empty { place } | Self::Categorical { place } | Self::Color { place } => *place,
            Self::Numeric(a)
            | Self::Count(a)
            | Self::Percent(a)
            | Self::Date(a)
            | Self::Qualitative(a) => a.place,
        }
    }

    /// How values are spaced along this axis.
    pub fn scale(&self) -> ScaleKind {
        match self {
            Self::Empty { .. } => ScaleKind::Ordinal,
            Self::Categorical { .. } | Self::Color { .. } => ScaleKind::Band,
            Self::Numeric(a)
            | Self::Count(a)
            | Self::Percent(a)
            | Self::Date(a)
            | Self::Qualitative(a) => a.scale,
        }
    }

    /// True for the numeric family of axes.
    pub fn is_numeric(&self) -> bool {
        self.as_numeric().is_some()
    }

    /// True for the categorical family of axes.
    pub fn is_categorical(&self) -> bool {
        matches!(self, Self::Categorical { .. } | Self::Color { .. })
    }

    /// True for the placeholder axis.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty { .. })
    }

    /// Read access to numeric-family domain state.
    pub fn as_numeric(&self) -> Option<&NumericAxis> {
        match self {
            Self::Numeric(a)
            | Self::Count(a)
            | Self::Percent(a)
            | Self::Date(a)
            | Self::Qualitative(a) => Some(a),
            _ => None,
        }
    }

    /// The effective numeric domain, if this is a numeric-family axis.
    pub fn domain(&self) -> Option<(f64, f64)> {
        self.as_numeric().map(NumericAxis::domain)
    }

    /// Commit a new persisted domain.
    ///
    /// Applies the protocol of [`NumericAxis::commit_domain`]: zero-snap at
    /// the 1/100 ratio (skipped for date axes), grow-only clamping unless the
    /// shrink flag was armed, per-bound rejection of non-finite input, and
    /// clearing of any drag preview. A no-op for qualitative axes, whose
    /// domain is fixed, and for non-numeric axes.
    pub fn set_domain(&mut self, min: f64, max: f64) {
        match self {
            Self::Numeric(a) | Self::Count(a) | Self::Percent(a) => {
                a.commit_domain(min, max, true);
            }
            Self::Date(a) => a.commit_domain(min, max, false),
            _ => {}
        }
    }

    /// Set the transient drag-preview domain. No-op for qualitative and
    /// non-numeric axes.
    pub fn set_dynamic_domain(&mut self, min: f64, max: f64) {
        match self {
            Self::Numeric(a) | Self::Count(a) | Self::Percent(a) | Self::Date(a) => {
                a.set_dynamic_domain(min, max);
            }
            _ => {}
        }
    }

    /// Discard the drag preview without committing it.
    pub fn clear_dynamic_domain(&mut self) {
        match self {
            Self::Numeric(a) | Self::Count(a) | Self::Percent(a) | Self::Date(a) => {
                a.clear_dynamic_domain();
            }
            _ => {}
        }
    }

    /// Arm the one-shot shrink flag. No-op for qualitative and non-numeric axes.
    pub fn set_allow_range_to_shrink(&mut self, allow: bool) {
        match self {
            Self::Numeric(a) | Self::Count(a) | Self::Percent(a) | Self::Date(a) => {
                a.set_allow_range_to_shrink(allow);
            }
            _ => {}
        }
    }
}

/// The four axis slots of one graph, resolved by place.
///
/// This is the axis-provider interface consumed by the plot model when it
/// revalidates its axes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AxisSet {
    bottom: Option<AxisModel>,
    left: Option<AxisModel>,
    top: Option<AxisModel>,
    right: Option<AxisModel>,
}

impl AxisSet {
    fn slot(&self, place: AxisPlace) -> &Option<AxisModel> {
        match place {
            AxisPlace::Bottom => &self.bottom,
            AxisPlace::Left => &self.left,
            AxisPlace::Top => &self.top,
            AxisPlace::Right => &self.right,
        }
    }

    fn slot_mut(&mut self, place: AxisPlace) -> &mut Option<AxisModel> {
        match place {
            AxisPlace::Bottom => &mut self.bottom,
            AxisPlace::Left => &mut self.left,
            AxisPlace::Top => &mut self.top,
            AxisPlace::Right => &mut self.right,
        }
    }

    /// The axis currently installed at `place`, if any.
    pub fn get_axis(&self, place: AxisPlace) -> Option<&AxisModel> {
        self.slot(place).as_ref()
    }

    /// Mutable access to the axis installed at `place`.
    pub fn get_axis_mut(&mut self, place: AxisPlace) -> Option<&mut AxisModel> {
        self.slot_mut(place).as_mut()
    }

    /// The numeric-family axis at `place`, if one is installed there.
    pub fn get_numeric_axis(&self, place: AxisPlace) -> Option<&NumericAxis> {
        self.get_axis(place).and_then(AxisModel::as_numeric)
    }

    /// Install an axis in the slot named by its own place, replacing any
    /// previous occupant.
    pub fn set_axis(&mut self, axis: AxisModel) {
        let place = axis.place();
        *self.slot_mut(place) = Some(axis);
    }

    /// Remove and return the axis at `place`. An in-progress drag on the
    /// removed axis is abandoned with it.
    pub fn remove_axis(&mut self, place: AxisPlace) -> Option<AxisModel> {
        self.slot_mut(place).take()
    }
}
