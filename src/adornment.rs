use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::axis::{AxisPlace, AxisSet, NumericAxis};
use crate::data::{AttrRole, CellKey, DataConfiguration};
use crate::plot::{PlotType, percent_of};

/// Fraction of the axis range a movable adornment starts down from the
/// axis maximum.
const MOVABLE_DEFAULT_FRACTION: f64 = 0.25;

/// Everything an adornment needs to recompute its per-cell state.
pub struct UpdateCategoriesOptions<'a> {
    pub data: &'a dyn DataConfiguration,
    pub axes: &'a AxisSet,
    pub primary_place: AxisPlace,
    /// Reset user-positioned adornments to their defaults instead of
    /// preserving their current positions.
    pub reset_points: bool,
}

impl UpdateCategoriesOptions<'_> {
    fn primary_role(&self) -> AttrRole {
        if self.primary_place.is_horizontal() {
            AttrRole::X
        } else {
            AttrRole::Y
        }
    }

    fn default_position(axis: Option<&NumericAxis>) -> f64 {
        match axis {
            Some(axis) => {
                let (min, max) = axis.domain();
                max - MOVABLE_DEFAULT_FRACTION * (max - min)
            }
            None => 0.0,
        }
    }

    fn default_primary_position(&self) -> f64 {
        Self::default_position(self.axes.get_numeric_axis(self.primary_place))
    }

    fn default_secondary_position(&self) -> f64 {
        Self::default_position(self.axes.get_numeric_axis(self.primary_place.perpendicular()))
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut v: Vec<f64> = values.iter().copied().filter(|x| x.is_finite()).collect();
    v.sort_by(f64::total_cmp);
    v
}

/// Linear-interpolation quantile of already-sorted values.
fn quantile_of_sorted(values: &[f64], p: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let h = (values.len() - 1) as f64 * p;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    Some(values[lo] + (h - lo as f64) * (values[hi] - values[lo]))
}

fn median(values: &[f64]) -> Option<f64> {
    quantile_of_sorted(&sorted(values), 0.5)
}

/// Sample standard deviation; `None` for fewer than two values.
fn std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ssd: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    Some((ssd / (values.len() - 1) as f64).sqrt())
}

/// Five-number summary backing a box plot in one cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoxPlotStats {
    pub min: f64,
    pub lower_quartile: f64,
    pub median: f64,
    pub upper_quartile: f64,
    pub max: f64,
}

fn box_plot_stats(values: &[f64]) -> Option<BoxPlotStats> {
    let v = sorted(values);
    Some(BoxPlotStats {
        min: *v.first()?,
        lower_quartile: quantile_of_sorted(&v, 0.25)?,
        median: quantile_of_sorted(&v, 0.5)?,
        upper_quartile: quantile_of_sorted(&v, 0.75)?,
        max: *v.last()?,
    })
}

/// Least-squares fit for one cell's (x, y) pairs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LsqFit {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
}

/// `None` when fewer than two points or the x values carry no variance.
fn lsq_fit(pairs: &[(f64, f64)]) -> Option<LsqFit> {
    let n = pairs.len();
    if n < 2 {
        return None;
    }
    let n_f = n as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n_f;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n_f;
    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for &(x, y) in pairs {
        cov += (x - mean_x) * (y - mean_y);
        var_x += (x - mean_x) * (x - mean_x);
        var_y += (y - mean_y) * (y - mean_y);
    }
    if var_x == 0.0 {
        return None;
    }
    let slope = cov / var_x;
    let r_squared = if var_y == 0.0 {
        1.0
    } else {
        (cov * cov) / (var_x * var_y)
    };
    Some(LsqFit {
        slope,
        intercept: mean_y - slope * mean_x,
        r_squared,
    })
}

/// A position on both axes, for the movable point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointPosition {
    pub x: f64,
    pub y: f64,
}

/// Which univariate measure an [`AdornmentModel::Measure`] shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MeasureKind {
    Mean,
    Median,
    StdDev,
}

impl MeasureKind {
    fn compute(self, values: &[f64]) -> Option<f64> {
        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        match self {
            Self::Mean => mean(&finite),
            Self::Median => median(&finite),
            Self::StdDev => std_dev(&finite),
        }
    }
}

/// One adornment's model: its visibility plus per-cell state keyed by the
/// canonical cell key.
///
/// Hiding an adornment keeps its state so re-showing restores it exactly;
/// `update_categories` prunes cells that no longer exist and preserves
/// user-positioned values in cells that do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AdornmentModel {
    /// Per-cell case counts and/or percentages of the whole case set.
    Count {
        is_visible: bool,
        show_count: bool,
        show_percent: bool,
    },
    /// A computed univariate measure line per cell.
    Measure {
        is_visible: bool,
        measure: MeasureKind,
        cell_values: IndexMap<String, Option<f64>>,
    },
    /// Five-number summary per cell.
    BoxPlot {
        is_visible: bool,
        cell_stats: IndexMap<String, Option<BoxPlotStats>>,
    },
    /// A user-draggable value line per cell.
    MovableValue {
        is_visible: bool,
        cell_values: IndexMap<String, f64>,
    },
    /// A user-draggable point per cell.
    MovablePoint {
        is_visible: bool,
        cell_positions: IndexMap<String, PointPosition>,
    },
    /// Per-cell least-squares line.
    LsqLine {
        is_visible: bool,
        cell_fits: IndexMap<String, Option<LsqFit>>,
    },
}

pub const COUNT_TYPE: &str = "count";
pub const MEAN_TYPE: &str = "mean";
pub const MEDIAN_TYPE: &str = "median";
pub const STD_DEV_TYPE: &str = "stdDev";
pub const BOX_PLOT_TYPE: &str = "boxPlot";
pub const MOVABLE_VALUE_TYPE: &str = "movableValue";
pub const MOVABLE_POINT_TYPE: &str = "movablePoint";
pub const LSQ_LINE_TYPE: &str = "lsqLine";

/// Retain only the map entries whose key names a still-visible cell.
fn prune_stale<V>(map: &mut IndexMap<String, V>, cells: &[CellKey]) {
    let keep: Vec<String> = cells.iter().map(CellKey::canonical).collect();
    map.retain(|key, _| keep.iter().any(|k| k == key));
}

impl AdornmentModel {
    /// The registry type name of this adornment.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Count { .. } => COUNT_TYPE,
            Self::Measure {
                measure: MeasureKind::Mean,
                ..
            } => MEAN_TYPE,
            Self::Measure {
                measure: MeasureKind::Median,
                ..
            } => MEDIAN_TYPE,
            Self::Measure {
                measure: MeasureKind::StdDev,
                ..
            } => STD_DEV_TYPE,
            Self::BoxPlot { .. } => BOX_PLOT_TYPE,
            Self::MovableValue { .. } => MOVABLE_VALUE_TYPE,
            Self::MovablePoint { .. } => MOVABLE_POINT_TYPE,
            Self::LsqLine { .. } => LSQ_LINE_TYPE,
        }
    }

    pub fn is_visible(&self) -> bool {
        match self {
            Self::Count { is_visible, .. }
            | Self::Measure { is_visible, .. }
            | Self::BoxPlot { is_visible, .. }
            | Self::MovableValue { is_visible, .. }
            | Self::MovablePoint { is_visible, .. }
            | Self::LsqLine { is_visible, .. } => *is_visible,
        }
    }

    pub fn set_visible(&mut self, visible: bool) {
        match self {
            Self::Count { is_visible, .. }
            | Self::Measure { is_visible, .. }
            | Self::BoxPlot { is_visible, .. }
            | Self::MovableValue { is_visible, .. }
            | Self::MovablePoint { is_visible, .. }
            | Self::LsqLine { is_visible, .. } => *is_visible = visible,
        }
    }

    /// The count and whole-set percentage for one cell. The percentage of a
    /// cell in an empty case set is 0.
    pub fn cell_count(data: &dyn DataConfiguration, cell: &CellKey) -> (usize, f64) {
        let count = data.cell_case_count(cell);
        (count, percent_of(count, data.case_count()))
    }

    /// Recompute per-cell state for the current cell space.
    ///
    /// Stale cells are pruned; computed measures are recomputed everywhere;
    /// user-positioned values are preserved in surviving cells unless
    /// `reset_points` is set.
    pub fn update_categories(&mut self, options: &UpdateCategoriesOptions<'_>) {
        let cells = options.data.cell_keys();
        let role = options.primary_role();
        match self {
            Self::Count { .. } => {}
            Self::Measure {
                measure,
                cell_values,
                ..
            } => {
                prune_stale(cell_values, &cells);
                for cell in &cells {
                    let values = options.data.cell_numeric_values(role, cell);
                    cell_values.insert(cell.canonical(), measure.compute(&values));
                }
            }
            Self::BoxPlot { cell_stats, .. } => {
                prune_stale(cell_stats, &cells);
                for cell in &cells {
                    let values = options.data.cell_numeric_values(role, cell);
                    cell_stats.insert(cell.canonical(), box_plot_stats(&values));
                }
            }
            Self::MovableValue { cell_values, .. } => {
                prune_stale(cell_values, &cells);
                let default = options.default_primary_position();
                for cell in &cells {
                    let key = cell.canonical();
                    if options.reset_points || !cell_values.contains_key(&key) {
                        cell_values.insert(key, default);
                    }
                }
            }
            Self::MovablePoint { cell_positions, .. } => {
                prune_stale(cell_positions, &cells);
                let default = PointPosition {
                    x: options.default_primary_position(),
                    y: options.default_secondary_position(),
                };
                for cell in &cells {
                    let key = cell.canonical();
                    if options.reset_points || !cell_positions.contains_key(&key) {
                        cell_positions.insert(key, default);
                    }
                }
            }
            Self::LsqLine { cell_fits, .. } => {
                prune_stale(cell_fits, &cells);
                for cell in &cells {
                    let pairs = options.data.cell_paired_values(cell);
                    cell_fits.insert(cell.canonical(), lsq_fit(&pairs));
                }
            }
        }
    }

    /// Flatten this adornment into the export shape legacy documents expect:
    /// one scalar per cell. Adornments with richer state export their
    /// principal scalar (the median for box plots, the slope for
    /// least-squares lines); the count adornment computes live and exports
    /// no cells.
    pub fn export(&self) -> AdornmentExport {
        let cell_values = match self {
            Self::Count { .. } => Vec::new(),
            Self::Measure { cell_values, .. } => cell_values
                .iter()
                .filter_map(|(k, v)| v.map(|v| (k.clone(), v)))
                .collect(),
            Self::BoxPlot { cell_stats, .. } => cell_stats
                .iter()
                .filter_map(|(k, s)| s.map(|s| (k.clone(), s.median)))
                .collect(),
            Self::MovableValue { cell_values, .. } => cell_values
                .iter()
                .map(|(k, v)| (k.clone(), *v))
                .collect(),
            Self::MovablePoint { cell_positions, .. } => cell_positions
                .iter()
                .map(|(k, p)| (k.clone(), p.x))
                .collect(),
            Self::LsqLine { cell_fits, .. } => cell_fits
                .iter()
                .filter_map(|(k, f)| f.map(|f| (k.clone(), f.slope)))
                .collect(),
        };
        AdornmentExport {
            kind: self.kind(),
            is_visible: self.is_visible(),
            cell_values,
        }
    }

    /// Record a user-dragged value for one cell of a movable value.
    pub fn set_cell_value(&mut self, cell: &CellKey, value: f64) {
        if let Self::MovableValue { cell_values, .. } = self
            && value.is_finite()
        {
            cell_values.insert(cell.canonical(), value);
        }
    }

    /// Record a user-dragged position for one cell of a movable point.
    pub fn set_cell_position(&mut self, cell: &CellKey, x: f64, y: f64) {
        if let Self::MovablePoint { cell_positions, .. } = self
            && x.is_finite()
            && y.is_finite()
        {
            cell_positions.insert(cell.canonical(), PointPosition { x, y });
        }
    }
}

/// Flattened snapshot of one adornment, keyed by canonical cell key, in the
/// shape legacy document exporters consume.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdornmentExport {
    pub kind: &'static str,
    pub is_visible: bool,
    pub cell_values: Vec<(String, f64)>,
}

/// How to construct and where to allow one adornment kind.
#[derive(Debug, Clone, Copy)]
pub struct AdornmentSpec {
    pub type_name: &'static str,
    pub constructor: fn() -> AdornmentModel,
    pub valid_plot_types: &'static [PlotType],
}

const UNIVARIATE_NUMERIC: &[PlotType] = &[
    PlotType::DotPlot,
    PlotType::BinnedDotPlot,
    PlotType::Histogram,
    PlotType::LinePlot,
];

const ALL_BUT_CASE_PLOT: &[PlotType] = &[
    PlotType::DotChart,
    PlotType::BarChart,
    PlotType::DotPlot,
    PlotType::BinnedDotPlot,
    PlotType::Histogram,
    PlotType::LinePlot,
    PlotType::ScatterPlot,
];

const BIVARIATE: &[PlotType] = &[PlotType::ScatterPlot];

fn measure_model(measure: MeasureKind) -> AdornmentModel {
    AdornmentModel::Measure {
        is_visible: false,
        measure,
        cell_values: IndexMap::new(),
    }
}

/// Explicit lookup from adornment type names to their specs.
///
/// Embedders register additional kinds alongside the defaults; nothing is
/// registered implicitly.
#[derive(Debug, Clone, Default)]
pub struct AdornmentRegistry {
    specs: IndexMap<&'static str, AdornmentSpec>,
}

impl AdornmentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every built-in adornment kind registered.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(AdornmentSpec {
            type_name: COUNT_TYPE,
            constructor: || AdornmentModel::Count {
                is_visible: false,
                show_count: true,
                show_percent: false,
            },
            valid_plot_types: ALL_BUT_CASE_PLOT,
        });
        registry.register(AdornmentSpec {
            type_name: MEAN_TYPE,
            constructor: || measure_model(MeasureKind::Mean),
            valid_plot_types: UNIVARIATE_NUMERIC,
        });
        registry.register(AdornmentSpec {
            type_name: MEDIAN_TYPE,
            constructor: || measure_model(MeasureKind::Median),
            valid_plot_types: UNIVARIATE_NUMERIC,
        });
        registry.register(AdornmentSpec {
            type_name: STD_DEV_TYPE,
            constructor: || measure_model(MeasureKind::StdDev),
            valid_plot_types: UNIVARIATE_NUMERIC,
        });
        registry.register(AdornmentSpec {
            type_name: BOX_PLOT_TYPE,
            constructor: || AdornmentModel::BoxPlot {
                is_visible: false,
                cell_stats: IndexMap::new(),
            },
            valid_plot_types: UNIVARIATE_NUMERIC,
        });
        registry.register(AdornmentSpec {
            type_name: MOVABLE_VALUE_TYPE,
            constructor: || AdornmentModel::MovableValue {
                is_visible: false,
                cell_values: IndexMap::new(),
            },
            valid_plot_types: UNIVARIATE_NUMERIC,
        });
        registry.register(AdornmentSpec {
            type_name: MOVABLE_POINT_TYPE,
            constructor: || AdornmentModel::MovablePoint {
                is_visible: false,
                cell_positions: IndexMap::new(),
            },
            valid_plot_types: BIVARIATE,
        });
        registry.register(AdornmentSpec {
            type_name: LSQ_LINE_TYPE,
            constructor: || AdornmentModel::LsqLine {
                is_visible: false,
                cell_fits: IndexMap::new(),
            },
            valid_plot_types: BIVARIATE,
        });
        registry
    }

    /// Register or replace a spec under its type name.
    pub fn register(&mut self, spec: AdornmentSpec) {
        self.specs.insert(spec.type_name, spec);
    }

    /// The spec registered under `type_name`, if any.
    pub fn get(&self, type_name: &str) -> Option<&AdornmentSpec> {
        self.specs.get(type_name)
    }

    /// Whether the named adornment may appear on the given plot type.
    pub fn is_valid_for(&self, type_name: &str, plot_type: PlotType) -> bool {
        self.get(type_name)
            .is_some_and(|spec| spec.valid_plot_types.contains(&plot_type))
    }
}

/// The adornments attached to one graph, in creation order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdornmentStore {
    adornments: Vec<AdornmentModel>,
}

impl AdornmentStore {
    pub fn adornments(&self) -> &[AdornmentModel] {
        &self.adornments
    }

    /// The adornment of the given kind, if one has ever been shown.
    pub fn find(&self, type_name: &str) -> Option<&AdornmentModel> {
        self.adornments.iter().find(|a| a.kind() == type_name)
    }

    /// Mutable access to the adornment of the given kind.
    pub fn find_mut(&mut self, type_name: &str) -> Option<&mut AdornmentModel> {
        self.adornments.iter_mut().find(|a| a.kind() == type_name)
    }

    /// Show the named adornment, constructing it on first use.
    ///
    /// Re-showing a hidden adornment restores its retained state. Returns
    /// false when the name is not registered.
    pub fn show_adornment(
        &mut self,
        registry: &AdornmentRegistry,
        type_name: &str,
        options: &UpdateCategoriesOptions<'_>,
    ) -> bool {
        if self.find(type_name).is_none() {
            let Some(spec) = registry.get(type_name) else {
                debug!("ignoring unregistered adornment kind {type_name:?}");
                return false;
            };
            self.adornments.push((spec.constructor)());
        }
        if let Some(adornment) = self.find_mut(type_name) {
            adornment.set_visible(true);
            adornment.update_categories(options);
            debug!("adornment {type_name} shown");
        }
        true
    }

    /// Hide the named adornment, keeping its state for later re-show.
    pub fn hide_adornment(&mut self, type_name: &str) {
        if let Some(adornment) = self.find_mut(type_name) {
            adornment.set_visible(false);
            debug!("adornment {type_name} hidden");
        }
    }

    /// Propagate a cell-space or data change to every adornment, visible or
    /// not, so hidden state stays consistent with the data.
    pub fn update_categories(&mut self, options: &UpdateCategoriesOptions<'_>) {
        for adornment in &mut self.adornments {
            adornment.update_categories(options);
        }
    }

    /// Drop adornments that are invalid for the given plot type. Runs when
    /// the plot type changes.
    pub fn retain_valid_for(&mut self, registry: &AdornmentRegistry, plot_type: PlotType) {
        self.adornments
            .retain(|a| registry.is_valid_for(a.kind(), plot_type));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::AxisModel;
    use crate::data::{AttributeType, CaseValue, MemoryDataConfig};

    fn dot_plot_world() -> (MemoryDataConfig, AxisSet) {
        let mut data =
            MemoryDataConfig::new().with_attribute(AttrRole::X, "v", AttributeType::Numeric);
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            data.push_case([(AttrRole::X, CaseValue::Numeric(v))]);
        }
        let mut axes = AxisSet::default();
        axes.set_axis(AxisModel::numeric(AxisPlace::Bottom, 0.0, 100.0));
        (data, axes)
    }

    fn options<'a>(
        data: &'a MemoryDataConfig,
        axes: &'a AxisSet,
        reset_points: bool,
    ) -> UpdateCategoriesOptions<'a> {
        UpdateCategoriesOptions {
            data,
            axes,
            primary_place: AxisPlace::Bottom,
            reset_points,
        }
    }

    #[test]
    fn registry_defaults_cover_builtin_kinds() {
        let registry = AdornmentRegistry::with_defaults();
        for name in [
            COUNT_TYPE,
            MEAN_TYPE,
            MEDIAN_TYPE,
            STD_DEV_TYPE,
            BOX_PLOT_TYPE,
            MOVABLE_VALUE_TYPE,
            MOVABLE_POINT_TYPE,
            LSQ_LINE_TYPE,
        ] {
            assert!(registry.get(name).is_some(), "{name} not registered");
        }
        assert!(registry.get("sombrero").is_none());
    }

    #[test]
    fn validity_follows_plot_type() {
        let registry = AdornmentRegistry::with_defaults();
        assert!(registry.is_valid_for(MEAN_TYPE, PlotType::DotPlot));
        assert!(!registry.is_valid_for(MEAN_TYPE, PlotType::ScatterPlot));
        assert!(registry.is_valid_for(LSQ_LINE_TYPE, PlotType::ScatterPlot));
        assert!(!registry.is_valid_for(LSQ_LINE_TYPE, PlotType::DotPlot));
        assert!(registry.is_valid_for(COUNT_TYPE, PlotType::BarChart));
        assert!(!registry.is_valid_for(COUNT_TYPE, PlotType::CasePlot));
    }

    #[test]
    fn show_constructs_then_reuses() {
        let registry = AdornmentRegistry::with_defaults();
        let (data, axes) = dot_plot_world();
        let mut store = AdornmentStore::default();
        assert!(store.show_adornment(&registry, MEAN_TYPE, &options(&data, &axes, false)));
        assert_eq!(store.adornments().len(), 1);
        assert!(store.show_adornment(&registry, MEAN_TYPE, &options(&data, &axes, false)));
        assert_eq!(store.adornments().len(), 1);
        assert!(!store.show_adornment(&registry, "sombrero", &options(&data, &axes, false)));
    }

    #[test]
    fn mean_median_std_dev_values() {
        let (data, axes) = dot_plot_world();
        let registry = AdornmentRegistry::with_defaults();
        let mut store = AdornmentStore::default();
        for name in [MEAN_TYPE, MEDIAN_TYPE, STD_DEV_TYPE] {
            store.show_adornment(&registry, name, &options(&data, &axes, false));
        }
        let key = CellKey::default().canonical();
        let value_of = |name: &str| match store.find(name) {
            Some(AdornmentModel::Measure { cell_values, .. }) => cell_values[&key],
            _ => None,
        };
        assert_eq!(value_of(MEAN_TYPE), Some(3.0));
        assert_eq!(value_of(MEDIAN_TYPE), Some(3.0));
        let sd = value_of(STD_DEV_TYPE).unwrap();
        assert!((sd - 2.5_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn box_plot_five_number_summary() {
        let mut data =
            MemoryDataConfig::new().with_attribute(AttrRole::X, "v", AttributeType::Numeric);
        for v in [1.0, 2.0, 3.0, 4.0] {
            data.push_case([(AttrRole::X, CaseValue::Numeric(v))]);
        }
        let axes = AxisSet::default();
        let registry = AdornmentRegistry::with_defaults();
        let mut store = AdornmentStore::default();
        store.show_adornment(&registry, BOX_PLOT_TYPE, &options(&data, &axes, false));
        let key = CellKey::default().canonical();
        let Some(AdornmentModel::BoxPlot { cell_stats, .. }) = store.find(BOX_PLOT_TYPE) else {
            panic!("box plot missing");
        };
        let stats = cell_stats[&key].unwrap();
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 4.0);
        assert_eq!(stats.median, 2.5);
        assert!((stats.lower_quartile - 1.75).abs() < 1e-12);
        assert!((stats.upper_quartile - 3.25).abs() < 1e-12);
    }

    #[test]
    fn movable_value_defaults_quarter_down_from_max() {
        let (data, axes) = dot_plot_world();
        let registry = AdornmentRegistry::with_defaults();
        let mut store = AdornmentStore::default();
        store.show_adornment(&registry, MOVABLE_VALUE_TYPE, &options(&data, &axes, false));
        let key = CellKey::default().canonical();
        let Some(AdornmentModel::MovableValue { cell_values, .. }) =
            store.find(MOVABLE_VALUE_TYPE)
        else {
            panic!("movable value missing");
        };
        assert_eq!(cell_values[&key], 75.0);
    }

    #[test]
    fn user_value_survives_update_unless_reset() {
        let (data, axes) = dot_plot_world();
        let registry = AdornmentRegistry::with_defaults();
        let mut store = AdornmentStore::default();
        store.show_adornment(&registry, MOVABLE_VALUE_TYPE, &options(&data, &axes, false));
        let cell = CellKey::default();
        store
            .find_mut(MOVABLE_VALUE_TYPE)
            .unwrap()
            .set_cell_value(&cell, 33.3);

        store.update_categories(&options(&data, &axes, false));
        let Some(AdornmentModel::MovableValue { cell_values, .. }) =
            store.find(MOVABLE_VALUE_TYPE)
        else {
            panic!("movable value missing");
        };
        assert_eq!(cell_values[&cell.canonical()], 33.3);

        store.update_categories(&options(&data, &axes, true));
        let Some(AdornmentModel::MovableValue { cell_values, .. }) =
            store.find(MOVABLE_VALUE_TYPE)
        else {
            panic!("movable value missing");
        };
        assert_eq!(cell_values[&cell.canonical()], 75.0);
    }

    #[test]
    fn hide_then_reshow_restores_state() {
        let (data, axes) = dot_plot_world();
        let registry = AdornmentRegistry::with_defaults();
        let mut store = AdornmentStore::default();
        store.show_adornment(&registry, MOVABLE_VALUE_TYPE, &options(&data, &axes, false));
        let cell = CellKey::default();
        store
            .find_mut(MOVABLE_VALUE_TYPE)
            .unwrap()
            .set_cell_value(&cell, 12.5);

        store.hide_adornment(MOVABLE_VALUE_TYPE);
        assert!(!store.find(MOVABLE_VALUE_TYPE).unwrap().is_visible());

        store.show_adornment(&registry, MOVABLE_VALUE_TYPE, &options(&data, &axes, false));
        let adornment = store.find(MOVABLE_VALUE_TYPE).unwrap();
        assert!(adornment.is_visible());
        let AdornmentModel::MovableValue { cell_values, .. } = adornment else {
            panic!("movable value missing");
        };
        assert_eq!(cell_values[&cell.canonical()], 12.5);
    }

    #[test]
    fn update_prunes_stale_cells_and_seeds_new_ones() {
        let mut data = MemoryDataConfig::new()
            .with_attribute(AttrRole::X, "v", AttributeType::Numeric)
            .with_attribute(AttrRole::TopSplit, "kind", AttributeType::Categorical);
        data.push_case([
            (AttrRole::X, CaseValue::Numeric(1.0)),
            (AttrRole::TopSplit, CaseValue::Category("a".into())),
        ]);
        data.push_case([
            (AttrRole::X, CaseValue::Numeric(2.0)),
            (AttrRole::TopSplit, CaseValue::Category("b".into())),
        ]);
        let mut axes = AxisSet::default();
        axes.set_axis(AxisModel::numeric(AxisPlace::Bottom, 0.0, 10.0));
        let registry = AdornmentRegistry::with_defaults();
        let mut store = AdornmentStore::default();
        store.show_adornment(&registry, MEAN_TYPE, &options(&data, &axes, false));

        // Category "b" disappears; "c" arrives.
        data.clear_cases();
        data.push_case([
            (AttrRole::X, CaseValue::Numeric(1.0)),
            (AttrRole::TopSplit, CaseValue::Category("a".into())),
        ]);
        data.push_case([
            (AttrRole::X, CaseValue::Numeric(7.0)),
            (AttrRole::TopSplit, CaseValue::Category("c".into())),
        ]);
        store.update_categories(&options(&data, &axes, false));

        let Some(AdornmentModel::Measure { cell_values, .. }) = store.find(MEAN_TYPE) else {
            panic!("mean missing");
        };
        assert!(cell_values.contains_key("{top:a}"));
        assert!(cell_values.contains_key("{top:c}"));
        assert!(!cell_values.contains_key("{top:b}"));
        assert_eq!(cell_values["{top:c}"], Some(7.0));
    }

    #[test]
    fn double_update_is_idempotent() {
        let (data, axes) = dot_plot_world();
        let registry = AdornmentRegistry::with_defaults();
        let mut store = AdornmentStore::default();
        store.show_adornment(&registry, MEAN_TYPE, &options(&data, &axes, false));
        store.show_adornment(&registry, MOVABLE_VALUE_TYPE, &options(&data, &axes, false));
        let before = store.clone();
        store.update_categories(&options(&data, &axes, false));
        assert_eq!(store, before);
    }

    #[test]
    fn lsq_fit_exact_and_degenerate() {
        let pairs = [(1.0, 2.0), (2.0, 4.0), (3.0, 6.0)];
        let fit = lsq_fit(&pairs).unwrap();
        assert!((fit.slope - 2.0).abs() < 1e-12);
        assert!(fit.intercept.abs() < 1e-12);
        assert!((fit.r_squared - 1.0).abs() < 1e-12);

        assert!(lsq_fit(&[(1.0, 2.0)]).is_none());
        assert!(lsq_fit(&[(1.0, 2.0), (1.0, 5.0)]).is_none());
    }

    #[test]
    fn percent_of_empty_case_set_is_zero() {
        let data = MemoryDataConfig::new().with_attribute(
            AttrRole::X,
            "kind",
            AttributeType::Categorical,
        );
        let (count, percent) = AdornmentModel::cell_count(&data, &CellKey::default());
        assert_eq!(count, 0);
        assert_eq!(percent, 0.0);
    }

    #[test]
    fn retain_valid_drops_incompatible_adornments() {
        let (data, axes) = dot_plot_world();
        let registry = AdornmentRegistry::with_defaults();
        let mut store = AdornmentStore::default();
        store.show_adornment(&registry, MEAN_TYPE, &options(&data, &axes, false));
        store.show_adornment(&registry, COUNT_TYPE, &options(&data, &axes, false));
        store.retain_valid_for(&registry, PlotType::ScatterPlot);
        assert!(store.find(MEAN_TYPE).is_none());
        assert!(store.find(COUNT_TYPE).is_some());
    }

    #[test]
    fn export_flattens_per_cell_scalars() {
        let (data, axes) = dot_plot_world();
        let registry = AdornmentRegistry::with_defaults();
        let mut store = AdornmentStore::default();
        store.show_adornment(&registry, MOVABLE_VALUE_TYPE, &options(&data, &axes, false));
        let export = store.find(MOVABLE_VALUE_TYPE).unwrap().export();
        assert_eq!(export.kind, MOVABLE_VALUE_TYPE);
        assert!(export.is_visible);
        assert_eq!(export.cell_values, vec![("{}".to_owned(), 75.0)]);

        store.show_adornment(&registry, BOX_PLOT_TYPE, &options(&data, &axes, false));
        let export = store.find(BOX_PLOT_TYPE).unwrap().export();
        assert_eq!(export.cell_values, vec![("{}".to_owned(), 3.0)]);
    }

    #[test]
    fn snapshot_round_trip_preserves_positions() {
        let (data, axes) = dot_plot_world();
        let registry = AdornmentRegistry::with_defaults();
        let mut store = AdornmentStore::default();
        store.show_adornment(&registry, MOVABLE_VALUE_TYPE, &options(&data, &axes, false));
        store
            .find_mut(MOVABLE_VALUE_TYPE)
            .unwrap()
            .set_cell_value(&CellKey::default(), 42.0);
        let json = serde_json::to_string(&store).unwrap();
        let restored: AdornmentStore = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, store);
    }
}
