//! Ranges and step groups.
//!
//! A range packs its steps along the group's packing axis: down a column
//! for vertical allocation, across a row for horizontal allocation. The
//! ranges of a group are then laid side by side along the other axis,
//! separated by the range margin or a divider.
//!
//! Within a range, steps are aligned on the cross axis so their assembly
//! images start at the same coordinate. Consecutive steps keep the larger
//! of their margins between them; freeform steps only need that clearance
//! between components that face each other, so they may interlock.

use log::{debug, trace};

use stepcraft_core::{
    geometry::{Axis, Bounds, Point, Size},
    node::{NodeKind, SizedNode},
    placement::{Margin, PlacementError},
};

use super::{Composer, fragment::Fragment};
use crate::{
    StepcraftError,
    config::LayoutMode,
    structure::{Allocation, StepGroup, StepsChild},
};

/// Spreads items of the given extents over `available`.
///
/// `gaps[i]` is the minimum gap between items `i` and `i + 1` and may be
/// negative for items that interlock; an item never starts before the
/// previous one. When the items need at least `available`, they are packed
/// with exactly those gaps. Otherwise the slack is spread as evenly as the
/// minimums allow: fewer than three items also get a leading and a
/// trailing gap, three or more sit flush against both ends.
///
/// Returns the start of every item.
pub fn distribute(extents: &[f32], gaps: &[f32], available: f32) -> Vec<f32> {
    let gap = |i: usize| gaps.get(i).copied().unwrap_or_default();

    let natural = place(extents, 0.0, gap);
    if extents.is_empty() || available <= end(extents, &natural) {
        return natural;
    }

    let slack = available - extents.iter().sum::<f32>();
    let mut minimums: Vec<f32> = (0..extents.len() - 1).map(gap).collect();
    let spread_ends = extents.len() < 3;
    if spread_ends {
        minimums.extend([0.0, 0.0]);
    }
    let spacing = even_spacing(&minimums, slack);
    let start = if spread_ends { spacing.max(0.0) } else { 0.0 };
    place(extents, start, |i| gap(i).max(spacing))
}

/// Finds the spacing `s` with `sum(max(s, minimum))` equal to `total`.
fn even_spacing(minimums: &[f32], total: f32) -> f32 {
    let mut sorted = minimums.to_vec();
    sorted.sort_by(f32::total_cmp);

    // Raise the smallest minimums to `s` until the next one is above it.
    let mut fixed: f32 = sorted.iter().sum();
    for (i, minimum) in sorted.iter().enumerate() {
        fixed -= minimum;
        let spacing = (total - fixed) / (i + 1) as f32;
        if sorted.get(i + 1).is_none_or(|next| spacing <= *next) {
            return spacing;
        }
    }
    0.0
}

fn place(extents: &[f32], start: f32, gap: impl Fn(usize) -> f32) -> Vec<f32> {
    let mut positions = Vec::with_capacity(extents.len());
    let mut cursor = start;
    for (i, extent) in extents.iter().enumerate() {
        positions.push(cursor);
        cursor = (cursor + extent + gap(i)).max(cursor);
    }
    positions
}

fn end(extents: &[f32], positions: &[f32]) -> f32 {
    positions
        .iter()
        .zip(extents)
        .map(|(position, extent)| position + extent)
        .fold(0.0, f32::max)
}

pub(super) fn packing_axis(allocation: Allocation) -> Axis {
    match allocation {
        Allocation::Vertical => Axis::Y,
        Allocation::Horizontal => Axis::X,
    }
}

/// A composed step or reserved space waiting for its place in a range.
#[derive(Debug, Clone)]
struct RangeItem {
    fragment: Fragment,
    /// Boxes neighbours keep clear of, in item coordinates.
    profile: Vec<Bounds>,
    image_origin: Option<Point>,
    margin: Margin,
    cross_shift: f32,
}

impl RangeItem {
    fn solid(fragment: Fragment, image_origin: Option<Point>, margin: Margin) -> Self {
        let profile = vec![Bounds::new_from_top_left(Point::default(), fragment.size())];
        Self {
            fragment,
            profile,
            image_origin,
            margin,
            cross_shift: 0.0,
        }
    }

    fn shifted_profile(&self, axis: Axis) -> impl Iterator<Item = Bounds> + '_ {
        let shift = Point::from_axes(axis, 0.0, self.cross_shift);
        self.profile.iter().map(move |bounds| bounds.translate(shift))
    }
}

/// Minimum gap between the ends of `a` and the start of `b` along `axis`.
///
/// Only boxes that overlap on the cross axis, margin included, constrain
/// the gap. Never lets `b` start before `a`.
fn clearance(a: &RangeItem, b: &RangeItem, axis: Axis) -> f32 {
    let cross = axis.cross();
    let margin = a.margin.gap(b.margin);
    let (along, across) = (margin.along(axis), margin.along(cross));
    let a_extent = a.fragment.size().along(axis);

    let mut required = -a_extent;
    for pa in a.shifted_profile(axis) {
        for pb in b.shifted_profile(axis) {
            let facing = pa.min_along(cross) < pb.max_along(cross) + across
                && pb.min_along(cross) < pa.max_along(cross) + across;
            if facing {
                required = required.max(pa.max_along(axis) + along - a_extent - pb.min_along(axis));
            }
        }
    }
    required
}

/// The items of one range with their minimum gaps.
#[derive(Debug, Clone)]
struct PackedRange {
    items: Vec<RangeItem>,
    gaps: Vec<f32>,
    natural: f32,
    cross: f32,
}

impl PackedRange {
    fn new(mut items: Vec<RangeItem>, axis: Axis) -> Self {
        let cross = axis.cross();

        let target = items
            .iter()
            .filter_map(|item| item.image_origin)
            .map(|origin| origin.along(cross))
            .reduce(f32::max);
        if let Some(target) = target {
            for item in &mut items {
                if let Some(origin) = item.image_origin {
                    item.cross_shift = target - origin.along(cross);
                }
            }
        }

        let gaps: Vec<f32> = items
            .windows(2)
            .map(|pair| clearance(&pair[0], &pair[1], axis))
            .collect();
        let extents = Self::extents(&items, axis);
        let natural = end(&extents, &distribute(&extents, &gaps, 0.0));
        let cross_extent = items
            .iter()
            .map(|item| item.cross_shift + item.fragment.size().along(cross))
            .fold(0.0, f32::max);

        Self {
            items,
            gaps,
            natural,
            cross: cross_extent,
        }
    }

    fn extents(items: &[RangeItem], axis: Axis) -> Vec<f32> {
        items
            .iter()
            .map(|item| item.fragment.size().along(axis))
            .collect()
    }

    fn into_fragment(self, label: String, axis: Axis, available: f32) -> Fragment {
        let extents = Self::extents(&self.items, axis);
        let positions = distribute(&extents, &self.gaps, available);
        let along = end(&extents, &positions).max(available);

        let mut fragment = Fragment::leaf(label, NodeKind::Range, Size::from_axes(axis, along, self.cross));
        for (item, position) in self.items.into_iter().zip(positions) {
            fragment.push_child(Point::from_axes(axis, position, item.cross_shift), item.fragment);
        }
        fragment
    }
}

impl Composer<'_> {
    /// Composes a step group.
    ///
    /// Steps are labelled `{scope}step N`. `available` widens every range
    /// to at least that extent along the packing axis; ranges are otherwise
    /// as long as the longest one.
    pub(super) fn compose_group(
        &mut self,
        label: &str,
        scope: &str,
        group: &StepGroup,
        available: Option<f32>,
    ) -> Result<Fragment, StepcraftError> {
        let axis = packing_axis(group.allocation);
        let cross = axis.cross();

        let mut ranges = Vec::with_capacity(group.ranges.len());
        for (r, range) in group.ranges.iter().enumerate() {
            let mut items = Vec::with_capacity(range.children.len());
            for (i, child) in range.children.iter().enumerate() {
                let reserve_label = format!("{label} / range {} / reserve {}", r + 1, i + 1);
                items.push(self.range_item(scope, &reserve_label, child)?);
            }
            ranges.push(PackedRange::new(items, axis));
        }

        let natural = ranges.iter().map(|range| range.natural).fold(0.0, f32::max);
        let available = available.map_or(natural, |available| available.max(natural));
        trace!(group = label, natural, available; "Distributing ranges");

        let range_gap = self.config.defaults().range_margin.along(cross);
        let gap = group
            .divider
            .map_or(range_gap, |divider| range_gap.max(divider.thickness + 2.0 * divider.margin));

        let mut fragments = Vec::with_capacity(ranges.len() * 2);
        let mut cursor = 0.0;
        let mut along = 0.0_f32;
        for (r, range) in ranges.into_iter().enumerate() {
            if r > 0 {
                if let Some(divider) = group.divider {
                    let at = cursor + (gap - divider.thickness) / 2.0;
                    let size = Size::from_axes(axis, available, divider.thickness);
                    let fragment = Fragment::leaf(format!("{label} / divider {r}"), NodeKind::Divider, size);
                    fragments.push((at, fragment));
                }
                cursor += gap;
            }
            let fragment = range.into_fragment(format!("{label} / range {}", r + 1), axis, available);
            let size = fragment.size();
            fragments.push((cursor, fragment));
            cursor += size.along(cross);
            along = along.max(size.along(axis));
        }

        let size = Size::from_axes(axis, along, cursor);
        let mut fragment = Fragment::leaf(label, NodeKind::StepGroup, size);
        for (at, child) in fragments {
            fragment.push_child(Point::from_axes(axis, 0.0, at), child);
        }

        debug!(
            group = label,
            allocation:? = group.allocation,
            ranges = group.ranges.len(),
            width = size.width(),
            height = size.height();
            "Step group composed"
        );
        Ok(fragment)
    }

    fn range_item(
        &mut self,
        scope: &str,
        reserve_label: &str,
        child: &StepsChild,
    ) -> Result<RangeItem, StepcraftError> {
        let defaults = self.config.defaults();
        match child {
            StepsChild::Step(step) => {
                let margin = step.margin.unwrap_or(defaults.step_margin);
                if !margin.is_finite() {
                    return Err(PlacementError::NonFinite {
                        label: format!("{scope}step {}", step.number),
                    }
                    .into());
                }

                let layout = self.compose_step(scope, step)?;
                let mut item = RangeItem::solid(layout.fragment, Some(layout.image_origin), margin);
                if layout.mode == LayoutMode::Freeform {
                    item.profile = layout.profile;
                }
                Ok(item)
            }
            StepsChild::Reserve(space) => {
                let margin = space.margin.unwrap_or(defaults.reserved_space.margin);
                let node = SizedNode::new(reserve_label, NodeKind::ReservedSpace, space.size)?
                    .with_margin(margin);
                node.validate()?;
                let fragment = Fragment::leaf(reserve_label, NodeKind::ReservedSpace, node.size());
                Ok(RangeItem::solid(fragment, None, margin))
            }
        }
    }
}
