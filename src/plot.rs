use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::axis::{AxisModel, AxisPlace, AxisSet};
use crate::bins::{BinDetails, BinSettings, bin_counts};
use crate::data::{AttrRole, AttributeType, CellKey, DataConfiguration};
use crate::ticks::format_with_step;

/// The plot types a graph can display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlotType {
    CasePlot,
    DotChart,
    BarChart,
    DotPlot,
    BinnedDotPlot,
    Histogram,
    LinePlot,
    ScatterPlot,
}

/// What a bar chart's secondary axis measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BreakdownType {
    #[default]
    Count,
    Percent,
    Formula,
}

/// Formula result for one sub-plot cell of a bar chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FormulaCell {
    pub value: f64,
    pub num_cases: usize,
}

/// State owned by a bar chart plot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BarChartModel {
    pub breakdown_type: BreakdownType,
    /// Formula results keyed by canonical cell key; only consulted when the
    /// breakdown type is `Formula`.
    pub formula_cells: IndexMap<String, FormulaCell>,
}

impl BarChartModel {
    /// Record the formula result for one cell.
    pub fn set_formula_cell(&mut self, cell: &CellKey, value: f64, num_cases: usize) {
        self.formula_cells
            .insert(cell.canonical(), FormulaCell { value, num_cases });
    }

    /// The `[min, max]` of formula values across cells, skipping cells with
    /// zero cases or a non-finite value. An empty or all-invalid map yields
    /// the default `[0, 100]` range.
    pub fn min_max_of_formula_values(&self) -> (f64, f64) {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for cell in self.formula_cells.values() {
            if cell.num_cases == 0 || !cell.value.is_finite() {
                continue;
            }
            lo = lo.min(cell.value);
            hi = hi.max(cell.value);
        }
        if lo > hi { (0.0, 100.0) } else { (lo, hi) }
    }

    /// Drop formula results for cells no longer in the visible cell space.
    pub fn prune_formula_cells(&mut self, cells: &[CellKey]) {
        let keep: Vec<String> = cells.iter().map(CellKey::canonical).collect();
        self.formula_cells.retain(|key, _| keep.iter().any(|k| k == key));
    }
}

/// State owned by a binned plot (histogram or binned dot plot).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BinnedPlotModel {
    #[serde(flatten)]
    pub settings: BinSettings,
    /// Derived from the settings and the current data; not persisted.
    #[serde(skip)]
    pub details: BinDetails,
}

impl BinnedPlotModel {
    /// Recompute and cache the bin details for the given case values.
    pub fn recompute_bins(&mut self, values: &[f64], initialize: bool) -> BinDetails {
        self.details = self.settings.bin_details(values, initialize);
        self.details
    }
}

/// Flags describing what changed ahead of a plot revalidation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlotChange {
    /// The primary attribute was replaced or changed type.
    pub primary_attribute_changed: bool,
    /// The split-attribute category set changed.
    pub categories_changed: bool,
    /// The user asked a binned plot to re-derive its bins from data.
    pub rebin: bool,
}

impl PlotChange {
    pub fn all() -> Self {
        Self {
            primary_attribute_changed: true,
            categories_changed: true,
            rebin: true,
        }
    }
}

/// The active plot of one graph, one variant per plot type.
///
/// Exactly one instance is active per graph; switching plot type replaces
/// the instance rather than mutating it across incompatible types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PlotModel {
    /// Default state with no attribute assigned.
    CasePlot,
    /// Dots grouped by category.
    DotChart,
    /// Bars per category, measured by count, percent, or a formula.
    BarChart(BarChartModel),
    /// Univariate numeric dots at raw positions.
    DotPlot,
    /// Univariate numeric dots grouped into fixed-width bins.
    BinnedDotPlot(BinnedPlotModel),
    /// Binned frequencies drawn as contiguous bars.
    Histogram(BinnedPlotModel),
    /// Univariate numeric values drawn as lollipop lines.
    LinePlot,
    /// Bivariate point plot.
    ScatterPlot,
}

fn role_for(place: AxisPlace) -> AttrRole {
    if place.is_horizontal() { AttrRole::X } else { AttrRole::Y }
}

/// Keep the existing axis when it is already the required variant at the
/// required place, so a user-adjusted domain survives revalidation.
fn reuse_or(new: AxisModel, existing: Option<&AxisModel>) -> AxisModel {
    match existing {
        Some(axis)
            if std::mem::discriminant(axis) == std::mem::discriminant(&new)
                && axis.place() == new.place() =>
        {
            axis.clone()
        }
        _ => new,
    }
}

/// A numeric or date axis depending on the attribute's observed type.
fn continuous_axis(
    place: AxisPlace,
    attr_type: Option<AttributeType>,
    existing: Option<&AxisModel>,
) -> AxisModel {
    match attr_type {
        Some(AttributeType::Date) => reuse_or(AxisModel::date(place, 0.0, 1.0), existing),
        _ => reuse_or(AxisModel::numeric(place, 0.0, 1.0), existing),
    }
}

/// A numeric, date, or qualitative axis depending on the attribute's
/// observed type; used by scatter plots on both axes.
fn point_axis(
    place: AxisPlace,
    attr_type: Option<AttributeType>,
    existing: Option<&AxisModel>,
) -> AxisModel {
    match attr_type {
        Some(AttributeType::Qualitative) => reuse_or(AxisModel::qualitative(place), existing),
        _ => continuous_axis(place, attr_type, existing),
    }
}

impl PlotModel {
    /// Construct the default model for a plot type.
    pub fn new(plot_type: PlotType) -> Self {
        match plot_type {
            PlotType::CasePlot => Self::CasePlot,
            PlotType::DotChart => Self::DotChart,
            PlotType::BarChart => Self::BarChart(BarChartModel::default()),
            PlotType::DotPlot => Self::DotPlot,
            PlotType::BinnedDotPlot => Self::BinnedDotPlot(BinnedPlotModel::default()),
            PlotType::Histogram => Self::Histogram(BinnedPlotModel::default()),
            PlotType::LinePlot => Self::LinePlot,
            PlotType::ScatterPlot => Self::ScatterPlot,
        }
    }

    /// This plot's type tag.
    pub fn plot_type(&self) -> PlotType {
        match self {
            Self::CasePlot => PlotType::CasePlot,
            Self::DotChart => PlotType::DotChart,
            Self::BarChart(_) => PlotType::BarChart,
            Self::DotPlot => PlotType::DotPlot,
            Self::BinnedDotPlot(_) => PlotType::BinnedDotPlot,
            Self::Histogram(_) => PlotType::Histogram,
            Self::LinePlot => PlotType::LinePlot,
            Self::ScatterPlot => PlotType::ScatterPlot,
        }
    }

    /// Whether the primary axis is partitioned into fixed-width bins.
    pub fn is_binned(&self) -> bool {
        matches!(self, Self::BinnedDotPlot(_) | Self::Histogram(_))
    }

    /// Whether both axes carry attribute values.
    pub fn is_bivariate(&self) -> bool {
        matches!(self, Self::ScatterPlot)
    }

    /// Whether the primary axis groups cases by category.
    pub fn is_categorical(&self) -> bool {
        matches!(self, Self::DotChart | Self::BarChart(_))
    }

    /// Whether the user may drag the primary axis bounds.
    ///
    /// A binned dot plot's domain is driven entirely by its bins, so its
    /// primary axis is fixed; a histogram's is draggable.
    pub fn has_draggable_primary_axis(&self) -> bool {
        matches!(
            self,
            Self::DotPlot | Self::Histogram(_) | Self::LinePlot | Self::ScatterPlot
        )
    }

    /// Bin state for binned plot types.
    pub fn binned(&self) -> Option<&BinnedPlotModel> {
        match self {
            Self::BinnedDotPlot(b) | Self::Histogram(b) => Some(b),
            _ => None,
        }
    }

    /// Mutable bin state for binned plot types.
    pub fn binned_mut(&mut self) -> Option<&mut BinnedPlotModel> {
        match self {
            Self::BinnedDotPlot(b) | Self::Histogram(b) => Some(b),
            _ => None,
        }
    }

    /// Bar chart state, when this is a bar chart.
    pub fn bar_chart(&self) -> Option<&BarChartModel> {
        match self {
            Self::BarChart(b) => Some(b),
            _ => None,
        }
    }

    /// Mutable bar chart state, when this is a bar chart.
    pub fn bar_chart_mut(&mut self) -> Option<&mut BarChartModel> {
        match self {
            Self::BarChart(b) => Some(b),
            _ => None,
        }
    }

    /// The axis variant this plot requires for its primary role.
    ///
    /// Pure in (place, observed attribute type, existing axis); reuses the
    /// existing instance when it is already valid.
    pub fn valid_primary_axis(
        &self,
        place: AxisPlace,
        attr_type: Option<AttributeType>,
        existing: Option<&AxisModel>,
    ) -> AxisModel {
        match self {
            Self::CasePlot => AxisModel::empty(place),
            Self::DotChart | Self::BarChart(_) => {
                reuse_or(AxisModel::categorical(place), existing)
            }
            Self::DotPlot | Self::LinePlot => continuous_axis(place, attr_type, existing),
            Self::BinnedDotPlot(_) | Self::Histogram(_) => {
                reuse_or(AxisModel::numeric(place, 0.0, 1.0), existing)
            }
            Self::ScatterPlot => point_axis(place, attr_type, existing),
        }
    }

    /// The axis variant this plot requires for its secondary role.
    pub fn valid_secondary_axis(
        &self,
        place: AxisPlace,
        attr_type: Option<AttributeType>,
        existing: Option<&AxisModel>,
    ) -> AxisModel {
        match self {
            Self::CasePlot | Self::DotPlot | Self::BinnedDotPlot(_) | Self::LinePlot => {
                AxisModel::empty(place)
            }
            Self::DotChart | Self::Histogram(_) => reuse_or(AxisModel::count(place), existing),
            Self::BarChart(bar) => match bar.breakdown_type {
                BreakdownType::Count => reuse_or(AxisModel::count(place), existing),
                BreakdownType::Percent => reuse_or(AxisModel::percent(place), existing),
                BreakdownType::Formula => {
                    reuse_or(AxisModel::numeric(place, 0.0, 100.0), existing)
                }
            },
            Self::ScatterPlot => point_axis(place, attr_type, existing),
        }
    }

    /// Revalidate this plot's two axes and, for binned types, its bins.
    ///
    /// Runs on primary-attribute change, category-set change, and explicit
    /// re-binning; the only observable effect is replacing or updating the
    /// two axis instances and the bin parameters.
    pub fn respond_to_plot_change(
        &mut self,
        data: &dyn DataConfiguration,
        axes: &mut AxisSet,
        primary_place: AxisPlace,
        change: PlotChange,
    ) {
        let secondary_place = primary_place.perpendicular();
        let primary_role = role_for(primary_place);
        let secondary_role = role_for(secondary_place);

        let primary = self.valid_primary_axis(
            primary_place,
            data.attribute_type(primary_role),
            axes.get_axis(primary_place),
        );
        let secondary = self.valid_secondary_axis(
            secondary_place,
            data.attribute_type(secondary_role),
            axes.get_axis(secondary_place),
        );
        debug!(
            "plot {:?} revalidated axes: {:?}/{:?}",
            self.plot_type(),
            primary_place,
            secondary_place
        );
        axes.set_axis(primary);
        axes.set_axis(secondary);

        let initialize = change.primary_attribute_changed || change.rebin;
        let values = data.sub_plot_cases(primary_role);
        if let Some(binned) = self.binned_mut() {
            binned.recompute_bins(&values, initialize);
        }
        if change.primary_attribute_changed || change.categories_changed {
            let cells = data.cell_keys();
            if let Some(bar) = self.bar_chart_mut() {
                bar.prune_formula_cells(&cells);
            }
        }
    }

    /// The extent the secondary axis must cover, as a `[min, max]` pair.
    ///
    /// Count and percent breakdowns scan per-cell case counts; formula
    /// breakdowns scan the formula cell map; histograms scan per-cell bin
    /// counts. Plots whose secondary axis is empty return `None`.
    pub fn secondary_extent(
        &self,
        data: &dyn DataConfiguration,
        primary_role: AttrRole,
    ) -> Option<(f64, f64)> {
        match self {
            Self::DotChart => Some((0.0, max_cell_count(data) as f64)),
            Self::BarChart(bar) => match bar.breakdown_type {
                BreakdownType::Count => Some((0.0, max_cell_count(data) as f64)),
                BreakdownType::Percent => Some((0.0, max_cell_percent(data))),
                BreakdownType::Formula => Some(bar.min_max_of_formula_values()),
            },
            Self::Histogram(binned) => {
                let mut max_count = 0usize;
                for cell in data.cell_keys() {
                    let values = data.cell_numeric_values(primary_role, &cell);
                    let counts = bin_counts(&binned.details, &values);
                    max_count = max_count.max(counts.into_iter().max().unwrap_or(0));
                }
                Some((0.0, max_count as f64))
            }
            _ => None,
        }
    }

    /// Tooltip text for one sub-plot cell of a categorical plot.
    pub fn cell_tooltip(&self, data: &dyn DataConfiguration, cell: &CellKey) -> Option<String> {
        if !self.is_categorical() {
            return None;
        }
        let count = data.cell_case_count(cell);
        let total = data.case_count();
        let percent = percent_of(count, total);
        Some(format!("{count} of {total} cases ({percent:.0}%)"))
    }

    /// Tooltip text for one bin of a binned plot.
    pub fn bin_tooltip(&self, index: usize, count: usize, total: usize) -> Option<String> {
        let binned = self.binned()?;
        let d = &binned.details;
        if index >= d.total_number_of_bins || d.bin_width <= 0.0 {
            return None;
        }
        let start = d.min_bin_edge + index as f64 * d.bin_width;
        let end = start + d.bin_width;
        let percent = percent_of(count, total);
        Some(format!(
            "{count} of {total} values in [{}, {}) ({percent:.0}%)",
            format_with_step(start, d.bin_width),
            format_with_step(end, d.bin_width),
        ))
    }
}

/// Percent with the empty-denominator case defined as 0.
pub(crate) fn percent_of(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        100.0 * count as f64 / total as f64
    }
}

fn max_cell_count(data: &dyn DataConfiguration) -> usize {
    data.cell_keys()
        .iter()
        .map(|cell| data.cell_case_count(cell))
        .max()
        .unwrap_or(0)
}

fn max_cell_percent(data: &dyn DataConfiguration) -> f64 {
    let total = data.case_count();
    data.cell_keys()
        .iter()
        .map(|cell| percent_of(data.cell_case_count(cell), total))
        .fold(0.0, f64::max)
}
