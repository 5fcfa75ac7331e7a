//! Tabular step layout.
//!
//! Components are quantized into a grid of levels around the assembly
//! image, which sits at level 0 on both axes. A component outside its
//! anchor takes the cell next to the anchor's cell in the direction of its
//! edge, moving further out while that cell is taken. The grid has three
//! levels on each side of the image for the usual step number, parts list
//! and callout; more crowded directions open further levels instead of
//! doubling up on a cell. Column widths and row heights are the largest
//! extents of their occupants; consecutive occupied columns (rows) are
//! separated by the larger of their margins, and empty ones take no space.
//!
//! Cells left of (above) the image hug it by aligning their occupants to
//! the end of the cell, cells right of (below) it align to the start, and
//! the image's own column (row) follows the component's justification.
//! Inside and center placements, and empty components, take no cell: they
//! are resolved directly against their anchor once the grid is settled.

use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashSet},
};

use log::trace;

use stepcraft_core::{
    geometry::{Axis, Bounds, Point, Size},
    placement::{self, Edge, Justification},
};

use super::step::Arrangement;
use crate::structure::{PlacementGraph, Walk};

/// Levels on each side of the image in an uncrowded grid.
pub const GRID_LEVELS: i32 = 3;

/// A grid cell, in levels relative to the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Cell {
    col: i32,
    row: i32,
}

impl Cell {
    const IMAGE: Cell = Cell { col: 0, row: 0 };

    fn along(self, axis: Axis) -> i32 {
        match axis {
            Axis::X => self.col,
            Axis::Y => self.row,
        }
    }

    /// Moves one cell towards `direction`.
    fn step(self, (dx, dy): (i32, i32)) -> Self {
        Self {
            col: self.col + dx,
            row: self.row + dy,
        }
    }
}

/// Widths (or heights) of the occupied grid levels along one axis.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AxisTrack {
    /// Largest extent and margin of each occupied level, in level order.
    levels: BTreeMap<i32, (f32, f32)>,
}

impl AxisTrack {
    /// Records an occupant of `level`.
    pub fn occupy(&mut self, level: i32, extent: f32, margin: f32) {
        let slot = self.levels.entry(level).or_insert((0.0, 0.0));
        slot.0 = slot.0.max(extent);
        slot.1 = slot.1.max(margin);
    }

    pub fn size(&self, level: i32) -> f32 {
        self.levels.get(&level).map_or(0.0, |(size, _)| *size)
    }

    pub fn margin(&self, level: i32) -> f32 {
        self.levels.get(&level).map_or(0.0, |(_, margin)| *margin)
    }

    pub fn is_occupied(&self, level: i32) -> bool {
        self.levels.contains_key(&level)
    }

    /// Occupied levels, lowest first.
    pub fn levels(&self) -> impl Iterator<Item = i32> + '_ {
        self.levels.keys().copied()
    }

    /// Returns the start coordinate of every occupied level.
    pub fn origins(&self) -> BTreeMap<i32, f32> {
        let mut origins = BTreeMap::new();
        let mut cursor = 0.0;
        let mut previous_margin: Option<f32> = None;

        for (&level, &(size, margin)) in &self.levels {
            if let Some(previous) = previous_margin {
                cursor += previous.max(margin);
            }
            origins.insert(level, cursor);
            cursor += size;
            previous_margin = Some(margin);
        }
        origins
    }

    /// Total length of the track.
    pub fn extent(&self) -> f32 {
        let origins = self.origins();
        self.levels
            .iter()
            .next_back()
            .map(|(level, (size, _))| origins.get(level).copied().unwrap_or_default() + size)
            .unwrap_or_default()
    }
}

/// A tabular step layout together with the grid it was built on.
#[derive(Debug, Clone)]
pub(crate) struct Grid {
    pub arrangement: Arrangement,
    pub columns: AxisTrack,
    pub rows: AxisTrack,
}

/// Lays out a walked step graph on the grid.
///
/// The graph's root must be the assembly image.
pub(crate) fn arrange(graph: &PlacementGraph, walk: &Walk) -> Grid {
    let cells = assign_cells(graph, walk);

    let mut columns = AxisTrack::default();
    let mut rows = AxisTrack::default();
    for index in graph.indices() {
        if let Some(cell) = cells[index.index()] {
            let node = graph.node(index);
            columns.occupy(cell.col, node.size().width(), node.margin().x());
            rows.occupy(cell.row, node.size().height(), node.margin().y());
        }
    }

    let tracks = [(Axis::X, &columns, columns.origins()), (Axis::Y, &rows, rows.origins())];
    let mut offsets: Vec<Option<Point>> = vec![None; graph.len()];

    // Anchors always precede their dependents in walk order.
    for &index in &walk.order {
        let node = graph.node(index);
        let anchor = graph.anchor_of(index);

        let offset = match cells[index.index()] {
            Some(cell) => {
                let [x, y] = tracks.each_ref().map(|(axis, track, origins)| {
                    let axis = *axis;
                    let level = cell.along(axis);
                    let slack = track.size(level) - node.size().along(axis);
                    let nudge = anchor
                        .map(|anchor| node.spec().offset_along(axis) * graph.node(anchor).size().along(axis))
                        .unwrap_or_default();
                    let origin = origins.get(&level).copied().unwrap_or_default();
                    origin + align(level, slack, node.spec().justification) + nudge
                });
                Point::new(x, y)
            }
            None => match anchor.and_then(|anchor| offsets[anchor.index()].map(|at| (anchor, at))) {
                Some((anchor, at)) => {
                    let anchor = graph.node(anchor);
                    placement::resolve_box(
                        Bounds::new_from_top_left(at, anchor.size()),
                        anchor.margin(),
                        node.size(),
                        node.margin(),
                        node.spec(),
                    )
                }
                None => walk.offset(index),
            },
        };
        offsets[index.index()] = Some(offset);
    }

    let frame = Bounds::new_from_top_left(Point::default(), Size::new(columns.extent(), rows.extent()));
    Grid {
        arrangement: Arrangement::new(graph, offsets, Some(frame)),
        columns,
        rows,
    }
}

/// Assigns grid cells in walk order so every anchor has its cell before
/// its dependents look for theirs.
fn assign_cells(graph: &PlacementGraph, walk: &Walk) -> Vec<Option<Cell>> {
    let mut cells: Vec<Option<Cell>> = vec![None; graph.len()];
    let mut taken = HashSet::from([Cell::IMAGE]);

    cells[graph.root().index()] = Some(Cell::IMAGE);

    for &index in &walk.order {
        let node = graph.node(index);
        let spec = node.spec();
        if index == graph.root()
            || spec.is_inside()
            || spec.edge == Edge::Center
            || node.size().is_zero()
        {
            continue;
        }
        // A component anchored to a cell-less one is resolved directly too.
        let Some(anchor_cell) = graph.anchor_of(index).and_then(|anchor| cells[anchor.index()])
        else {
            continue;
        };

        // Every direction moves at least one axis, so this ends past the
        // last taken cell.
        let direction = spec.edge.direction();
        let mut cell = anchor_cell.step(direction);
        while taken.contains(&cell) {
            cell = cell.step(direction);
        }
        if cell.col.abs() > GRID_LEVELS || cell.row.abs() > GRID_LEVELS {
            trace!(node = node.label(), col = cell.col, row = cell.row; "Grid grows past its usual levels");
        }
        taken.insert(cell);
        cells[index.index()] = Some(cell);
    }
    cells
}

/// Offset of an occupant within its cell.
fn align(level: i32, slack: f32, justification: Justification) -> f32 {
    match level.cmp(&0) {
        Ordering::Less => slack,
        Ordering::Greater => 0.0,
        Ordering::Equal => match justification {
            Justification::Start => 0.0,
            Justification::Center => slack / 2.0,
            Justification::End => slack,
        },
    }
}
