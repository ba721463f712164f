//! Axis, plot, and adornment models for an interactive statistical-graphing
//! application.
//!
//! The crate is the headless core of a graph component: it decides what a
//! graph shows, not how it is painted. [`GraphModel`] owns one plot, four
//! axis slots, and an adornment store; the host document supplies data
//! through the [`DataConfiguration`] trait and drives recomputation by
//! notifying the graph of changes and then calling
//! [`flush`](GraphModel::flush), which coalesces a burst of changes into a
//! single recomputation pass.
//!
//! The building blocks are usable on their own:
//!
//! - [`ticks`] picks "nice" 1-2-5 tick gaps and formats tick labels;
//! - [`nice_bounds`] pads raw data extents into displayable axis domains;
//! - [`axis`] models numeric and categorical axes with grow-only persisted
//!   domains plus transient drag previews;
//! - [`bins`] derives histogram bin widths, edges, and counts;
//! - [`plot`] models the eight plot types and the axis kinds each requires;
//! - [`adornment`] models overlays such as means, box plots, movable values,
//!   and least-squares lines, keyed per sub-plot cell.

pub mod adornment;
pub mod axis;
pub mod bins;
pub mod data;
pub mod graph;
pub mod nice_bounds;
pub mod plot;
pub mod ticks;

pub use adornment::{
    AdornmentExport, AdornmentModel, AdornmentRegistry, AdornmentSpec, AdornmentStore,
};
pub use axis::{AxisModel, AxisPlace, AxisSet, NumericAxis, ScaleKind};
pub use bins::{BinDetails, BinSettings};
pub use data::{AttrRole, AttributeType, CaseValue, CellKey, DataConfiguration, MemoryDataConfig};
pub use graph::GraphModel;
pub use nice_bounds::{NiceBounds, NiceDomainOptions, compute_nice_bounds, set_nice_domain};
pub use plot::{BarChartModel, BinnedPlotModel, BreakdownType, PlotChange, PlotModel, PlotType};
pub use ticks::{Tick, TickFormatter, format_with_step, good_tick_value};
