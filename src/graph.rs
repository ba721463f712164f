use std::sync::Arc;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::adornment::{AdornmentRegistry, AdornmentStore, UpdateCategoriesOptions};
use crate::axis::{AxisModel, AxisPlace, AxisSet};
use crate::bins::{binned_axis_ticks, non_draggable_axis_ticks};
use crate::data::{AttrRole, DataConfiguration};
use crate::nice_bounds::{NiceDomainOptions, set_nice_domain};
use crate::plot::{PlotChange, PlotModel, PlotType};
use crate::ticks::{Tick, TickFormatter, format_with_step, good_tick_value};

/// Pending recomputation work, accumulated between flushes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Dirty {
    domain: bool,
    bins: bool,
    cells: bool,
    change: PlotChange,
}

impl Dirty {
    fn any(&self) -> bool {
        self.domain || self.bins || self.cells
    }
}

/// One graph: a plot, its four axis slots, and its adornments.
///
/// Mutations mark work as pending rather than recomputing eagerly; a burst
/// of changes is coalesced into a single [`flush`](Self::flush) pass in a
/// fixed order: plot/axis revalidation and bin details first, then axis
/// domains, then adornment cell state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphModel {
    pub plot: PlotModel,
    pub axes: AxisSet,
    pub adornments: AdornmentStore,
    primary_place: AxisPlace,
    #[serde(skip, default = "AdornmentRegistry::with_defaults")]
    registry: AdornmentRegistry,
    #[serde(skip)]
    dirty: Dirty,
    #[serde(skip)]
    recompute_passes: usize,
}

impl GraphModel {
    /// Create a graph showing the given plot type, with every derived value
    /// pending until the first flush.
    pub fn new(plot_type: PlotType, primary_place: AxisPlace) -> Self {
        Self {
            plot: PlotModel::new(plot_type),
            axes: AxisSet::default(),
            adornments: AdornmentStore::default(),
            primary_place,
            registry: AdornmentRegistry::with_defaults(),
            dirty: Dirty {
                domain: true,
                bins: true,
                cells: true,
                change: PlotChange::all(),
            },
            recompute_passes: 0,
        }
    }

    pub fn primary_place(&self) -> AxisPlace {
        self.primary_place
    }

    pub fn primary_role(&self) -> AttrRole {
        if self.primary_place.is_horizontal() {
            AttrRole::X
        } else {
            AttrRole::Y
        }
    }

    fn secondary_role(&self) -> AttrRole {
        if self.primary_place.is_horizontal() {
            AttrRole::Y
        } else {
            AttrRole::X
        }
    }

    /// Number of flush passes that did any work; used to verify coalescing.
    pub fn recompute_passes(&self) -> usize {
        self.recompute_passes
    }

    pub fn registry(&self) -> &AdornmentRegistry {
        &self.registry
    }

    /// Register additional adornment kinds beyond the defaults.
    pub fn registry_mut(&mut self) -> &mut AdornmentRegistry {
        &mut self.registry
    }

    /// Switch to a different plot type, replacing the plot instance and
    /// dropping adornments the new type cannot display.
    pub fn set_plot_type(&mut self, plot_type: PlotType) {
        if self.plot.plot_type() == plot_type {
            return;
        }
        debug!("plot type {:?} -> {:?}", self.plot.plot_type(), plot_type);
        self.plot = PlotModel::new(plot_type);
        self.adornments.retain_valid_for(&self.registry, plot_type);
        self.dirty.domain = true;
        self.dirty.bins = true;
        self.dirty.cells = true;
    }

    /// The attribute driving the primary axis was replaced or changed type.
    pub fn notify_primary_attribute_changed(&mut self) {
        self.dirty.change.primary_attribute_changed = true;
        self.dirty.domain = true;
        self.dirty.bins = true;
        self.dirty.cells = true;
    }

    /// Case values were added, removed, or edited.
    pub fn notify_cases_changed(&mut self) {
        self.dirty.domain = true;
        self.dirty.bins = true;
        self.dirty.cells = true;
    }

    /// The split-attribute category set changed.
    pub fn notify_categories_changed(&mut self) {
        self.dirty.change.categories_changed = true;
        self.dirty.domain = true;
        self.dirty.cells = true;
    }

    /// Re-derive bin width and alignment from the data on the next flush,
    /// discarding user-chosen bin parameters.
    pub fn rebin(&mut self) {
        self.dirty.change.rebin = true;
        self.dirty.domain = true;
        self.dirty.bins = true;
        self.dirty.cells = true;
    }

    /// Run the pending recomputation as one pass, in dependency order:
    /// axis/bin revalidation, primary domain, secondary domain, adornment
    /// cells. A flush with nothing pending does nothing.
    pub fn flush(&mut self, data: &dyn DataConfiguration) {
        if !self.dirty.any() {
            return;
        }
        let change = self.dirty.change;
        self.dirty = Dirty::default();
        self.recompute_passes += 1;

        self.plot
            .respond_to_plot_change(data, &mut self.axes, self.primary_place, change);
        self.update_primary_domain(data, change.primary_attribute_changed);
        self.update_secondary_domain(data, change.primary_attribute_changed);

        self.adornments.update_categories(&UpdateCategoriesOptions {
            data,
            axes: &self.axes,
            primary_place: self.primary_place,
            reset_points: false,
        });
        debug!("flush pass {} complete", self.recompute_passes);
    }

    /// Binned plots pin the primary domain to the outermost bin edges; other
    /// numeric primaries get a nice domain around the data. A changed primary
    /// attribute arms the shrink flag so the new attribute's domain is not
    /// clamped against the old attribute's.
    fn update_primary_domain(&mut self, data: &dyn DataConfiguration, attribute_changed: bool) {
        let values = data.sub_plot_cases(self.primary_role());
        let Some(axis) = self.axes.get_axis_mut(self.primary_place) else {
            return;
        };
        if attribute_changed {
            axis.set_allow_range_to_shrink(true);
        }
        if let Some(binned) = self.plot.binned() {
            let details = binned.details;
            if details.total_number_of_bins > 0 {
                axis.set_allow_range_to_shrink(true);
                axis.set_domain(details.min_bin_edge, details.max_bin_edge);
            }
        } else {
            set_nice_domain(&values, axis, NiceDomainOptions::default());
        }
    }

    fn update_secondary_domain(&mut self, data: &dyn DataConfiguration, attribute_changed: bool) {
        let secondary_place = self.primary_place.perpendicular();
        if self.plot.is_bivariate() {
            let values = data.sub_plot_cases(self.secondary_role());
            if let Some(axis) = self.axes.get_axis_mut(secondary_place) {
                if attribute_changed {
                    axis.set_allow_range_to_shrink(true);
                }
                set_nice_domain(&values, axis, NiceDomainOptions::default());
            }
            return;
        }
        let Some(extent) = self.plot.secondary_extent(data, self.primary_role()) else {
            return;
        };
        if let Some(axis) = self.axes.get_axis_mut(secondary_place) {
            set_nice_domain(
                &[extent.0, extent.1],
                axis,
                NiceDomainOptions {
                    clamp_pos_min_at_zero: true,
                },
            );
        }
    }

    /// Preview an axis-bound drag without committing it.
    pub fn drag_axis_domain(&mut self, place: AxisPlace, min: f64, max: f64) {
        if place == self.primary_place && !self.plot.has_draggable_primary_axis() {
            return;
        }
        if let Some(axis) = self.axes.get_axis_mut(place) {
            axis.set_dynamic_domain(min, max);
        }
    }

    /// Commit the previewed drag as the new persisted domain.
    pub fn end_axis_drag(&mut self, place: AxisPlace) {
        let Some(axis) = self.axes.get_axis_mut(place) else {
            return;
        };
        let Some((min, max)) = axis.domain() else {
            return;
        };
        axis.set_allow_range_to_shrink(true);
        axis.set_domain(min, max);
    }

    /// Discard the previewed drag.
    pub fn cancel_axis_drag(&mut self, place: AxisPlace) {
        if let Some(axis) = self.axes.get_axis_mut(place) {
            axis.clear_dynamic_domain();
        }
    }

    /// Preview a bin-boundary drag on a binned plot.
    pub fn drag_bin_width(&mut self, width: f64) {
        if let Some(binned) = self.plot.binned_mut() {
            binned.settings.set_active_width(width);
            self.dirty.bins = true;
            self.dirty.domain = true;
            self.dirty.cells = true;
        }
    }

    /// Commit the previewed bin parameters.
    pub fn end_bin_drag(&mut self) {
        if let Some(binned) = self.plot.binned_mut() {
            binned.settings.commit_active();
            self.dirty.bins = true;
            self.dirty.domain = true;
            self.dirty.cells = true;
        }
    }

    /// Discard the previewed bin parameters.
    pub fn cancel_bin_drag(&mut self) {
        if let Some(binned) = self.plot.binned_mut() {
            binned.settings.abandon_active();
            self.dirty.bins = true;
            self.dirty.domain = true;
            self.dirty.cells = true;
        }
    }

    /// Show an adornment by registry type name. Returns false when the name
    /// is unregistered or invalid for the current plot type.
    pub fn show_adornment(&mut self, data: &dyn DataConfiguration, type_name: &str) -> bool {
        if !self.registry.is_valid_for(type_name, self.plot.plot_type()) {
            return false;
        }
        self.adornments.show_adornment(
            &self.registry,
            type_name,
            &UpdateCategoriesOptions {
                data,
                axes: &self.axes,
                primary_place: self.primary_place,
                reset_points: false,
            },
        )
    }

    /// Hide an adornment, keeping its state for later re-show.
    pub fn hide_adornment(&mut self, type_name: &str) {
        self.adornments.hide_adornment(type_name);
    }

    /// Ticks for the axis at `place`.
    ///
    /// A binned dot plot labels bin centers with their intervals; a settled
    /// histogram axis puts ticks on the bin edges; everything else gets
    /// evenly stepped numeric ticks.
    pub fn axis_ticks(&self, place: AxisPlace) -> Vec<Tick> {
        if place == self.primary_place
            && let Some(binned) = self.plot.binned()
        {
            let details = binned.details;
            let formatter: TickFormatter =
                Arc::new(move |v| format_with_step(v, details.bin_width));
            if !self.plot.has_draggable_primary_axis() {
                return binned_axis_ticks(&details, &formatter);
            }
            let on_edges = self
                .axes
                .get_axis(place)
                .and_then(AxisModel::domain)
                .is_some_and(|(min, max)| {
                    min == details.min_bin_edge && max == details.max_bin_edge
                });
            if on_edges {
                return non_draggable_axis_ticks(&details, &formatter);
            }
        }
        let Some((min, max)) = self.axes.get_axis(place).and_then(AxisModel::domain) else {
            return Vec::new();
        };
        let gap = good_tick_value(min, max);
        if gap <= 0.0 || min >= max {
            return Vec::new();
        }
        let mut ticks = Vec::new();
        let mut i = (min / gap).ceil() as i64;
        while i as f64 * gap <= max + gap * 1e-9 {
            let value = i as f64 * gap;
            ticks.push(Tick::new(value, format_with_step(value, gap)));
            i += 1;
        }
        ticks
    }
}
