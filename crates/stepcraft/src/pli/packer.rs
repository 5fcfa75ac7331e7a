//! Column packing of parts-list entries.
//!
//! Parts are packed into columns left to right. Inside a column they stack
//! top to bottom, each candidate sliding up under the part above as far as
//! the two silhouettes allow. Coordinates are pixels inside the parts-list
//! box, border included, y growing downward.

use std::collections::HashMap;

use log::trace;
use thiserror::Error;

use super::part::{PliPart, sort_parts};

/// Width or height limit large enough to never bind.
pub const UNBOUNDED: i32 = i32::MAX / 4;

/// Why a single packing attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PackError {
    #[error("part `{part}` is {height} px tall but only {limit} px are available")]
    TooTall {
        part: String,
        height: i32,
        limit: i32,
    },

    #[error("part `{part}` does not fit in the remaining {available} px of width")]
    NoFit { part: String, available: i32 },

    #[error("packed size {width}x{height} exceeds the limit {max_width}x{max_height}")]
    Exceeds {
        width: i32,
        height: i32,
        max_width: i32,
        max_height: i32,
    },
}

impl PackError {
    /// Returns the part the failure is attributed to, if any.
    pub fn part(&self) -> Option<&str> {
        match self {
            PackError::TooTall { part, .. } | PackError::NoFit { part, .. } => Some(part),
            PackError::Exceeds { .. } => None,
        }
    }
}

/// Options shared by every attempt on one parts list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PackOptions {
    /// Border thickness plus border margin, on each side.
    pub frame: i32,
    /// Fill the space beside narrow parts with sub-columns.
    pub pack_subs: bool,
}

/// Result of a successful attempt. Sizes include the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackOutcome {
    pub columns: usize,
    pub width: i32,
    pub height: i32,
}

#[derive(Debug, Clone, Copy)]
struct Column {
    left: i32,
    width: i32,
    margin: i32,
    label_margin: i32,
}

/// Packs one parts list, remembering pairwise interlock results between
/// attempts.
#[derive(Debug)]
pub struct Packer {
    options: PackOptions,
    interlock: HashMap<(usize, usize), i32>,
}

impl Packer {
    pub fn new(options: PackOptions) -> Self {
        Self {
            options,
            interlock: HashMap::new(),
        }
    }

    pub fn options(&self) -> PackOptions {
        self.options
    }

    /// Packs `parts` into a box of at most `max_width` x `max_height`.
    ///
    /// On success every part is placed. On failure nothing should be read
    /// from the parts' positions.
    ///
    /// # Errors
    ///
    /// - [`PackError::TooTall`] if any part is taller than the inner height.
    /// - [`PackError::NoFit`] if no unplaced part fits in a new column.
    /// - [`PackError::Exceeds`] if the framed result is larger than allowed.
    pub fn try_pack(
        &mut self,
        parts: &mut [PliPart],
        max_width: i32,
        max_height: i32,
    ) -> Result<PackOutcome, PackError> {
        sort_parts(parts);
        parts.iter_mut().for_each(PliPart::reset);

        let frame = self.options.frame;
        let inner_width = max_width - 2 * frame;
        let inner_height = max_height - 2 * frame;

        if let Some(part) = parts.iter().find(|p| p.height() > inner_height) {
            return Err(PackError::TooTall {
                part: part.key().to_string(),
                height: part.height(),
                limit: inner_height,
            });
        }

        let mut columns: Vec<Column> = Vec::new();
        let mut left = 0;

        while let Some(first_unplaced) = parts.iter().position(|p| !p.is_placed()) {
            let col = columns.len();
            let gap_before = |part: &PliPart| {
                columns
                    .last()
                    .map_or(0, |prev| prev.label_margin.max(part.margin().0))
            };

            let opener = (first_unplaced..parts.len()).find(|&i| {
                let part = &parts[i];
                !part.is_placed() && left + gap_before(part) + part.width() < inner_width
            });
            let Some(opener) = opener else {
                return Err(PackError::NoFit {
                    part: parts[first_unplaced].key().to_string(),
                    available: inner_width - left,
                });
            };

            let x = left + gap_before(&parts[opener]);
            let width = parts[opener].width();
            parts[opener].place(col, x, 0);
            self.fill_column(parts, col, x, width, opener, inner_height);

            let in_column = || parts.iter().filter(move |p| p.is_placed() && p.col() == col);
            columns.push(Column {
                left: x,
                width,
                margin: in_column().map(|p| p.margin().0).max().unwrap_or(0),
                label_margin: in_column().map(|p| p.label_margin().0).max().unwrap_or(0),
            });
            left = x + width;
        }

        let (width, height) = self.apply_margins(parts, &columns);
        let outcome = PackOutcome {
            columns: columns.len(),
            width: width + 2 * frame,
            height: height + 2 * frame,
        };

        if outcome.width > max_width || outcome.height > max_height {
            return Err(PackError::Exceeds {
                width: outcome.width,
                height: outcome.height,
                max_width,
                max_height,
            });
        }

        trace!(
            columns = outcome.columns,
            width = outcome.width,
            height = outcome.height;
            "Packed parts list"
        );
        Ok(outcome)
    }

    /// Places one part per column, bottoms aligned with the tallest part.
    pub fn place_cols(&mut self, parts: &mut [PliPart]) -> PackOutcome {
        sort_parts(parts);
        parts.iter_mut().for_each(PliPart::reset);

        let frame = self.options.frame;
        let tallest = parts.iter().map(PliPart::height).max().unwrap_or(0);
        let mut x = 0;
        let mut prev_label_margin = None;

        for (col, part) in parts.iter_mut().enumerate() {
            if let Some(label_margin) = prev_label_margin {
                x += part.margin().0.max(label_margin);
            }
            part.place(col, x + frame, tallest - part.height() + frame);
            x += part.width();
            prev_label_margin = Some(part.label_margin().0);
        }

        PackOutcome {
            columns: parts.len(),
            width: x + 2 * frame,
            height: tallest + 2 * frame,
        }
    }

    fn fill_column(
        &mut self,
        parts: &mut [PliPart],
        col: usize,
        x: i32,
        width: i32,
        opener: usize,
        inner_height: i32,
    ) {
        let mut prev = opener;
        if self.options.pack_subs {
            pack_subs(parts, col, x, width, prev);
        }

        for cand in 0..parts.len() {
            if parts[cand].is_placed() || parts[cand].width() > width {
                continue;
            }
            let top = self.stack_top(parts, col, prev, cand);
            if top + parts[cand].height() > inner_height {
                continue;
            }
            parts[cand].place(col, x, top);
            prev = cand;
            if self.options.pack_subs {
                pack_subs(parts, col, x, width, prev);
            }
        }
    }

    /// Returns the highest top at which `cand` can sit below `prev`.
    fn stack_top(&mut self, parts: &[PliPart], col: usize, prev: usize, cand: usize) -> i32 {
        let (above, below) = (&parts[prev], &parts[cand]);
        let vgap = above.margin().1.max(below.margin().1);

        // Everything else in the column must stay fully above the candidate.
        let floor = parts
            .iter()
            .enumerate()
            .filter(|&(i, p)| i != prev && p.is_placed() && p.col() == col)
            .map(|(_, p)| p.bottom() + vgap)
            .max()
            .unwrap_or(0);

        let slide = *self
            .interlock
            .entry((above.id(), below.id()))
            .or_insert_with(|| interlock(above, below));

        (above.bottom() + vgap - slide).max(floor)
    }

    /// Recomputes column gaps from the final column contents and shifts the
    /// parts into place, frame included. Returns the inner size.
    fn apply_margins(&self, parts: &mut [PliPart], columns: &[Column]) -> (i32, i32) {
        let frame = self.options.frame;
        let mut x = 0;
        for (col, column) in columns.iter().enumerate() {
            if col > 0 {
                x += columns[col - 1].label_margin.max(column.margin);
            }
            let shift = x - column.left;
            for part in parts.iter_mut().filter(|p| p.col() == col) {
                part.left += shift + frame;
                part.top += frame;
            }
            x += column.width;
        }

        let height = parts
            .iter()
            .map(|p| p.bottom() - frame)
            .max()
            .unwrap_or(0);
        (x, height)
    }
}

/// Greedily fills the slot right of `host`, within its vertical span.
fn pack_subs(parts: &mut [PliPart], col: usize, x: i32, width: i32, host: usize) {
    let host_right = x + parts[host].width();
    let host_margin = parts[host].margin();
    let bottom = parts[host].bottom();
    let mut y = parts[host].top();

    for cand in 0..parts.len() {
        let part = &parts[cand];
        if part.is_placed() {
            continue;
        }
        let cx = host_right + host_margin.0.max(part.margin().0);
        if cx + part.width() > x + width || y + part.height() > bottom {
            continue;
        }
        let step = part.height() + host_margin.1.max(part.margin().1);
        parts[cand].place(col, cx, y);
        y += step;
    }
}

/// How many rows `below` can slide up under `above` before their
/// silhouettes come within the required clearance.
fn interlock(above: &PliPart, below: &PliPart) -> i32 {
    let vgap = above.margin().1.max(below.margin().1).max(0);
    let hgap = above.margin().0.max(below.margin().0);
    let reach = vgap as usize;
    let dilated = above.silhouette().dilate(reach);
    let rows_above = above.height();
    let profile = below.silhouette();

    let collides = |k: i32| {
        (0..below.height()).any(|y| {
            let row = rows_above + vgap - k + y + vgap;
            let span_above = usize::try_from(row)
                .ok()
                .and_then(|r| dilated.get(r).copied().flatten());
            match (span_above, profile.span(y as usize)) {
                (Some((al, ar)), Some((bl, br))) => !(br + hgap < al || ar + hgap < bl),
                _ => false,
            }
        })
    };

    let mut slide = 0;
    for k in 1..=rows_above {
        if collides(k) {
            break;
        }
        slide = k;
    }
    slide
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pli::part::{PartKey, PixelSize};

    fn rect(id: usize, name: &str, width: u32, height: u32) -> PliPart {
        PliPart::new(
            id,
            PartKey::new(name, "red"),
            1,
            PixelSize::new(width, height),
            PixelSize::default(),
        )
    }

    fn scenario_parts() -> Vec<PliPart> {
        vec![
            rect(0, "a", 40, 40),
            rect(1, "b", 40, 40),
            rect(2, "c", 30, 60),
            rect(3, "d", 50, 20),
            rect(4, "e", 20, 20),
        ]
    }

    #[test]
    fn test_too_tall_places_nothing() {
        let mut parts = vec![rect(0, "tall", 10, 500)];
        let mut packer = Packer::new(PackOptions::default());

        let result = packer.try_pack(&mut parts, UNBOUNDED, 300);

        assert!(matches!(result, Err(PackError::TooTall { height: 500, .. })));
        assert!(parts.iter().all(|p| !p.is_placed()));
    }

    #[test]
    fn test_stacks_rectangles_without_overlap() {
        let mut parts = scenario_parts();
        let mut packer = Packer::new(PackOptions::default());

        let outcome = packer.try_pack(&mut parts, UNBOUNDED, 60).expect("fits");

        assert_eq!(outcome.columns, 3);
        assert_eq!(outcome.height, 60);
        assert_eq!(outcome.width, 50 + 40 + 30);

        let find = |name: &str| {
            let part = parts.iter().find(|p| p.key().part_type() == name).expect("part");
            (part.col(), part.left(), part.top())
        };
        // Equal sizes fall back to part type, descending: `b` opens before `a`.
        assert_eq!(find("d"), (0, 0, 0));
        assert_eq!(find("b"), (0, 0, 20));
        assert_eq!(find("a"), (1, 50, 0));
        assert_eq!(find("e"), (1, 50, 40));
        assert_eq!(find("c"), (2, 90, 0));
    }

    #[test]
    fn test_frame_offsets_parts_and_size() {
        let mut parts = vec![rect(0, "a", 10, 10)];
        let mut packer = Packer::new(PackOptions {
            frame: 3,
            pack_subs: false,
        });

        let outcome = packer.try_pack(&mut parts, UNBOUNDED, 16).expect("fits");

        assert_eq!((outcome.width, outcome.height), (16, 16));
        assert_eq!((parts[0].left(), parts[0].top()), (3, 3));
    }

    #[test]
    fn test_no_fit_when_width_is_too_small() {
        let mut parts = vec![rect(0, "a", 40, 10), rect(1, "b", 40, 10)];
        let mut packer = Packer::new(PackOptions::default());

        let result = packer.try_pack(&mut parts, 60, 10);

        assert!(matches!(result, Err(PackError::NoFit { .. })));
    }

    #[test]
    fn test_interlock_slides_under_overhang() {
        // An upside-down L: wide at the top, a thin stem on the left.
        let mut alpha = vec![0u8; 20 * 20];
        for y in 0..20 {
            for x in 0..20 {
                if y < 5 || x < 4 {
                    alpha[y * 20 + x] = 255;
                }
            }
        }
        let above = PliPart::new(0, PartKey::new("l", "red"), 1, PixelSize::new(20, 20), PixelSize::default())
            .with_alpha(&alpha, 1)
            .expect("mask matches");
        // Right-aligned block that fits under the overhang.
        let mut block = vec![0u8; 20 * 10];
        for y in 0..10 {
            for x in 10..20 {
                block[y * 20 + x] = 255;
            }
        }
        let below = PliPart::new(1, PartKey::new("b", "red"), 1, PixelSize::new(20, 10), PixelSize::default())
            .with_alpha(&block, 1)
            .expect("mask matches");

        assert_eq!(interlock(&above, &below), 15);
    }

    #[test]
    fn test_interlock_respects_margin() {
        let above = rect(0, "a", 10, 10).with_margins(
            stepcraft_core::placement::Margin::uniform(2.0),
            stepcraft_core::placement::Margin::default(),
        );
        let below = rect(1, "b", 10, 10);

        assert_eq!(interlock(&above, &below), 0);
    }

    #[test]
    fn test_pack_subs_fills_beside_narrow_part() {
        let mut parts = vec![
            rect(0, "wide", 60, 20),
            rect(1, "narrow", 25, 40),
            rect(2, "small", 20, 15),
        ];
        let mut packer = Packer::new(PackOptions {
            frame: 0,
            pack_subs: true,
        });

        let outcome = packer.try_pack(&mut parts, UNBOUNDED, 60).expect("fits");

        assert_eq!(outcome.columns, 1);
        let small = parts.iter().find(|p| p.key().part_type() == "small").expect("small");
        assert_eq!((small.left(), small.top()), (25, 20));
    }

    #[test]
    fn test_column_gap_uses_larger_margin() {
        let zero = stepcraft_core::placement::Margin::default();
        let mut parts = vec![
            rect(0, "a", 30, 30).with_margins(zero, stepcraft_core::placement::Margin::new(7.0, 0.0)),
            rect(1, "b", 20, 30).with_margins(stepcraft_core::placement::Margin::new(3.0, 0.0), zero),
        ];
        let mut packer = Packer::new(PackOptions::default());

        let outcome = packer.try_pack(&mut parts, UNBOUNDED, 30).expect("fits");

        assert_eq!(outcome.columns, 2);
        assert_eq!(outcome.width, 30 + 7 + 20);
    }

    #[test]
    fn test_place_cols_aligns_bottoms() {
        let mut parts = vec![rect(0, "a", 10, 30), rect(1, "b", 10, 10)];
        let mut packer = Packer::new(PackOptions::default());

        let outcome = packer.place_cols(&mut parts);

        assert_eq!(outcome.columns, 2);
        assert_eq!(outcome.height, 30);
        assert!(parts.iter().all(|p| p.bottom() == 30));
    }
}
