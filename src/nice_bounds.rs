use crate::axis::AxisModel;
use crate::ticks::good_tick_value;

/// A numeric axis domain padded and rounded for display.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NiceBounds {
    pub min: f64,
    pub max: f64,
}

/// Amount added on each side when the data collapses to one integer value.
const EQUAL_VALUE_ADDEND: f64 = 5.0;

/// A bound is snapped to zero when the near bound is within 1/2.5 of the far
/// bound's distance from zero.
const ZERO_SNAP_RATIO: f64 = 2.5;

/// Compute a "nice" axis domain from a raw data extent.
///
/// The returned bounds always contain `[min, max]`:
/// - a degenerate all-zero extent becomes `[-10, 10]`;
/// - equal integer values are padded by 5 on each side;
/// - equal non-integer values are padded by 10% of their magnitude;
/// - an extent lying entirely on one side of zero is snapped to include zero
///   when the near bound is close enough (the 1:2.5 ratio rule);
/// - otherwise the bounds are pushed out to between one half and one and a
///   half tick gaps beyond the data, so the first and last tick labels have
///   room to render.
///
/// Deterministic and side-effect-free; this is the single source of truth
/// for nice axis bounds.
pub fn compute_nice_bounds(min: f64, max: f64) -> NiceBounds {
    if !min.is_finite() || !max.is_finite() {
        return NiceBounds { min: 0.0, max: 1.0 };
    }
    if min == max {
        if min == 0.0 {
            return NiceBounds {
                min: -10.0,
                max: 10.0,
            };
        }
        if min.fract() == 0.0 {
            return NiceBounds {
                min: min - EQUAL_VALUE_ADDEND,
                max: max + EQUAL_VALUE_ADDEND,
            };
        }
        let pad = 0.1 * min.abs();
        return NiceBounds {
            min: min - pad,
            max: max + pad,
        };
    }

    let (mut lo, mut hi) = (min, max);
    if lo > 0.0 && hi > 0.0 && lo <= hi / ZERO_SNAP_RATIO {
        lo = 0.0;
    } else if lo < 0.0 && hi < 0.0 && hi >= lo / ZERO_SNAP_RATIO {
        hi = 0.0;
    }

    let gap = good_tick_value(lo, hi);
    if gap != 0.0 {
        lo = ((lo / gap).floor() - 0.5) * gap;
        hi = ((hi / gap).ceil() + 0.5) * gap;
    } else {
        lo -= 1.0;
        hi += 1.0;
    }
    NiceBounds { min: lo, max: hi }
}

/// Options for [`set_nice_domain`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NiceDomainOptions {
    /// Lock the zero side of the domain to exactly zero when the data lies
    /// entirely on one side of it, and permit the commit to shrink the
    /// range. Used for count and percent axes.
    pub clamp_pos_min_at_zero: bool,
}

/// Set an axis domain to nicely contain the given case values.
///
/// Non-finite values are ignored; with no finite values this is a no-op.
/// Date axes are padded by 10% of the observed range on each side with no
/// zero-snapping; other numeric axes go through [`compute_nice_bounds`].
pub fn set_nice_domain(values: &[f64], axis: &mut AxisModel, options: NiceDomainOptions) {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for &v in values {
        if v.is_finite() {
            lo = lo.min(v);
            hi = hi.max(v);
        }
    }
    if lo > hi {
        return;
    }

    if matches!(axis, AxisModel::Date(_)) {
        let range = hi - lo;
        axis.set_allow_range_to_shrink(true);
        axis.set_domain(lo - 0.1 * range, hi + 0.1 * range);
        return;
    }
    if !axis.is_numeric() {
        return;
    }

    let NiceBounds { mut min, mut max } = compute_nice_bounds(lo, hi);
    if options.clamp_pos_min_at_zero {
        if lo >= 0.0 {
            min = 0.0;
        } else if hi <= 0.0 {
            max = 0.0;
        }
        axis.set_allow_range_to_shrink(true);
    }
    axis.set_domain(min, max);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::AxisPlace;

    #[test]
    fn all_zero_extent() {
        assert_eq!(
            compute_nice_bounds(0.0, 0.0),
            NiceBounds {
                min: -10.0,
                max: 10.0
            }
        );
    }

    #[test]
    fn equal_integer_values_pad_by_addend() {
        assert_eq!(
            compute_nice_bounds(5.0, 5.0),
            NiceBounds { min: 0.0, max: 10.0 }
        );
        assert_eq!(
            compute_nice_bounds(-7.0, -7.0),
            NiceBounds {
                min: -12.0,
                max: -2.0
            }
        );
    }

    #[test]
    fn equal_fractional_values_pad_by_percent() {
        let bounds = compute_nice_bounds(2.5, 2.5);
        assert!((bounds.min - 2.25).abs() < 1e-12);
        assert!((bounds.max - 2.75).abs() < 1e-12);
    }

    #[test]
    fn positive_extent_snaps_min_to_zero() {
        // 1 <= 100 / 2.5, so the lower bound snaps to zero before padding.
        let bounds = compute_nice_bounds(1.0, 100.0);
        assert_eq!(bounds, NiceBounds {
            min: -10.0,
            max: 110.0
        });
    }

    #[test]
    fn negative_extent_snaps_max_to_zero() {
        let bounds = compute_nice_bounds(-100.0, -1.0);
        assert_eq!(bounds, NiceBounds {
            min: -110.0,
            max: 10.0
        });
    }

    #[test]
    fn distant_extent_does_not_snap() {
        // 50 > 100 / 2.5, so no zero-snap; padding is tick-gap based.
        let bounds = compute_nice_bounds(50.0, 100.0);
        assert_eq!(bounds, NiceBounds {
            min: 45.0,
            max: 105.0
        });
    }

    #[test]
    fn bounds_always_contain_data() {
        let cases = [
            (0.0, 0.0),
            (5.0, 5.0),
            (2.5, 2.5),
            (1.0, 100.0),
            (-100.0, -1.0),
            (50.0, 100.0),
            (-3.2, 7.9),
            (0.001, 0.002),
            (1e6, 2e6),
            (-1e-4, 1e-4),
        ];
        for (lo, hi) in cases {
            let b = compute_nice_bounds(lo, hi);
            assert!(b.min <= lo, "min {} clips data {lo}", b.min);
            assert!(b.max >= hi, "max {} clips data {hi}", b.max);
            assert!(b.min < b.max);
        }
    }

    #[test]
    fn non_finite_extent_degrades_to_default() {
        assert_eq!(
            compute_nice_bounds(f64::NAN, 1.0),
            NiceBounds { min: 0.0, max: 1.0 }
        );
    }

    #[test]
    fn empty_values_leave_axis_unchanged() {
        let mut axis = AxisModel::numeric(AxisPlace::Bottom, 3.0, 4.0);
        set_nice_domain(&[], &mut axis, NiceDomainOptions::default());
        set_nice_domain(&[f64::NAN], &mut axis, NiceDomainOptions::default());
        assert_eq!(axis.domain(), Some((3.0, 4.0)));
    }

    #[test]
    fn clamp_forces_zero_min_and_allows_shrink() {
        let mut axis = AxisModel::count(AxisPlace::Left);
        set_nice_domain(
            &[2.0, 9.0],
            &mut axis,
            NiceDomainOptions {
                clamp_pos_min_at_zero: true,
            },
        );
        let (min, max) = axis.domain().unwrap();
        assert_eq!(min, 0.0);
        assert!(max >= 9.0);

        // Fewer cases now; the armed shrink lets the axis come back down.
        let before = axis.domain().unwrap();
        set_nice_domain(
            &[1.0, 3.0],
            &mut axis,
            NiceDomainOptions {
                clamp_pos_min_at_zero: true,
            },
        );
        let (min, max) = axis.domain().unwrap();
        assert_eq!(min, 0.0);
        assert!(max < before.1);
        assert!(max >= 3.0);
    }

    #[test]
    fn date_axis_pads_by_ten_percent() {
        let mut axis = AxisModel::date(AxisPlace::Bottom, 0.0, 1.0);
        set_nice_domain(&[100.0, 200.0], &mut axis, NiceDomainOptions::default());
        assert_eq!(axis.domain(), Some((90.0, 210.0)));
    }

    #[test]
    fn ignores_non_finite_values_in_extent() {
        let mut axis = AxisModel::numeric(AxisPlace::Bottom, 50.0, 100.0);
        set_nice_domain(
            &[f64::INFINITY, 50.0, f64::NAN, 100.0],
            &mut axis,
            NiceDomainOptions::default(),
        );
        assert_eq!(axis.domain(), Some((45.0, 105.0)));
    }
}
