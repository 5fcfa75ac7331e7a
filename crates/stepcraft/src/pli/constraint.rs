//! Shape constraints and the height searches that satisfy them.
//!
//! Every mode except `Height` searches over the packing height, calling
//! [`Packer::try_pack`] once per candidate:
//!
//! | Mode | Scan | Keeps |
//! |------|------|-------|
//! | `Height(h)` | single attempt at `h` | that attempt |
//! | `Columns(n)` | upward, one pixel at a time | first height giving `n` columns |
//! | `Width(w)` | downward, stops at the first failure | smallest height that fits `w` |
//! | `Area` | downward, full range | smallest `width * height` |
//! | `Square` | downward, full range | smallest `abs(width - height)` |
//!
//! `Width` and `Area`/`Square` deliberately differ in whether a failure ends
//! the scan.

use std::fmt;

use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};

use super::{
    packer::{PackError, PackOutcome, Packer, UNBOUNDED},
    part::PliPart,
};

/// How the parts list should be shaped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PliConstraint {
    /// Minimize the bounding area.
    #[default]
    Area,
    /// Minimize the difference between width and height.
    Square,
    /// Fit under a width, in pixels.
    Width(u32),
    /// Fit under a height, in pixels.
    Height(u32),
    /// Use exactly this many columns.
    Columns(u32),
}

impl fmt::Display for PliConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PliConstraint::Area => write!(f, "area"),
            PliConstraint::Square => write!(f, "square"),
            PliConstraint::Width(width) => write!(f, "width {width}"),
            PliConstraint::Height(height) => write!(f, "height {height}"),
            PliConstraint::Columns(columns) => write!(f, "columns {columns}"),
        }
    }
}

/// The packing attempt the search settled on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Choice {
    Pack { max_width: i32, max_height: i32 },
    OnePerColumn,
}

/// Packs `parts` under `constraint`.
///
/// `scan_step` is the height decrement, in pixels, for the downward scans.
/// On success the parts carry the positions of the chosen attempt.
///
/// # Errors
///
/// Returns the most telling [`PackError`] when no scanned height packs.
pub fn pack_constrained(
    packer: &mut Packer,
    parts: &mut [PliPart],
    constraint: PliConstraint,
    scan_step: u32,
) -> Result<PackOutcome, PackError> {
    if parts.is_empty() {
        let frame = packer.options().frame;
        return Ok(PackOutcome {
            columns: 0,
            width: 2 * frame,
            height: 2 * frame,
        });
    }

    let bounds = HeightRange::of(parts, packer.options().frame);
    let step = scan_step.max(1) as i32;

    let choice = match constraint {
        PliConstraint::Height(height) => Choice::Pack {
            max_width: UNBOUNDED,
            max_height: clamp_px(height),
        },
        PliConstraint::Columns(columns) => search_columns(packer, parts, columns, bounds)?,
        PliConstraint::Width(width) => search_width(packer, parts, clamp_px(width), bounds, step)?,
        PliConstraint::Area => search_best(packer, parts, bounds, step, |o| {
            i64::from(o.width) * i64::from(o.height)
        })?,
        PliConstraint::Square => search_best(packer, parts, bounds, step, |o| {
            (i64::from(o.width) - i64::from(o.height)).abs()
        })?,
    };

    debug!(constraint:% = constraint, choice:? = choice; "Parts list search settled");

    // Later attempts overwrite part positions, so replay the chosen one.
    match choice {
        Choice::Pack {
            max_width,
            max_height,
        } => packer.try_pack(parts, max_width, max_height),
        Choice::OnePerColumn => Ok(packer.place_cols(parts)),
    }
}

fn clamp_px(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(UNBOUNDED).min(UNBOUNDED)
}

/// Heights worth scanning: from one column holding everything down to the
/// tallest single part. Both include the frame.
#[derive(Debug, Clone, Copy)]
struct HeightRange {
    total: i32,
    tallest: i32,
}

impl HeightRange {
    fn of(parts: &[PliPart], frame: i32) -> Self {
        let total = parts.iter().map(|p| p.height() + p.margin().1).sum::<i32>() + 2 * frame;
        let tallest = parts.iter().map(PliPart::height).max().unwrap_or(0) + 2 * frame;
        Self { total, tallest }
    }
}

fn search_columns(
    packer: &mut Packer,
    parts: &mut [PliPart],
    columns: u32,
    bounds: HeightRange,
) -> Result<Choice, PackError> {
    let wanted = columns.max(1) as usize;
    if columns == 0 {
        warn!("Parts list column count 0 treated as 1");
    }
    if parts.len() <= wanted {
        return Ok(Choice::OnePerColumn);
    }

    let start = (bounds.total / (4 * wanted as i32)).max(1);
    let mut fallback = None;
    let mut last_error = None;

    for height in start..=bounds.total.saturating_mul(2) {
        match packer.try_pack(parts, UNBOUNDED, height) {
            Ok(outcome) if outcome.columns == wanted => {
                return Ok(Choice::Pack {
                    max_width: UNBOUNDED,
                    max_height: height,
                });
            }
            Ok(outcome) if outcome.columns < wanted => {
                fallback = Some((height, outcome.columns));
                break;
            }
            Ok(outcome) => trace!(height, columns = outcome.columns; "Too many columns"),
            Err(err) => last_error = Some(err),
        }
    }

    match fallback {
        Some((height, got)) => {
            warn!(wanted, got; "No packing height gives the requested column count");
            Ok(Choice::Pack {
                max_width: UNBOUNDED,
                max_height: height,
            })
        }
        None => Err(last_error.unwrap_or_else(|| tallest_part_error(parts, bounds))),
    }
}

fn search_width(
    packer: &mut Packer,
    parts: &mut [PliPart],
    max_width: i32,
    bounds: HeightRange,
    step: i32,
) -> Result<Choice, PackError> {
    let mut best = None;
    let mut first_error = None;
    let mut height = bounds.total;

    while height >= bounds.tallest {
        match packer.try_pack(parts, max_width, height) {
            Ok(outcome) => {
                trace!(height, width = outcome.width; "Width fits");
                best = Some(height);
            }
            Err(err) => {
                trace!(height, error:% = err; "Width scan stopped");
                first_error = Some(err);
                break;
            }
        }
        height -= step;
    }

    match best {
        Some(max_height) => Ok(Choice::Pack {
            max_width,
            max_height,
        }),
        None => Err(first_error.unwrap_or_else(|| tallest_part_error(parts, bounds))),
    }
}

fn search_best(
    packer: &mut Packer,
    parts: &mut [PliPart],
    bounds: HeightRange,
    step: i32,
    metric: impl Fn(&PackOutcome) -> i64,
) -> Result<Choice, PackError> {
    let mut best: Option<(i64, i32)> = None;
    let mut first_error = None;
    let mut height = bounds.total;

    while height >= bounds.tallest {
        match packer.try_pack(parts, UNBOUNDED, height) {
            Ok(outcome) => {
                let score = metric(&outcome);
                trace!(height, score; "Candidate height");
                if best.is_none_or(|(best_score, _)| score < best_score) {
                    best = Some((score, height));
                }
            }
            Err(err) => {
                first_error.get_or_insert(err);
            }
        }
        height -= step;
    }

    match best {
        Some((_, max_height)) => Ok(Choice::Pack {
            max_width: UNBOUNDED,
            max_height,
        }),
        None => Err(first_error.unwrap_or_else(|| tallest_part_error(parts, bounds))),
    }
}

fn tallest_part_error(parts: &[PliPart], bounds: HeightRange) -> PackError {
    let tallest = parts.iter().max_by_key(|p| p.height());
    PackError::TooTall {
        part: tallest.map(|p| p.key().to_string()).unwrap_or_default(),
        height: tallest.map_or(0, PliPart::height),
        limit: bounds.tallest,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pli::{
        packer::PackOptions,
        part::{PartKey, PixelSize},
    };

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

    fn ten_squares() -> Vec<PliPart> {
        (0..10).map(|i| rect(i, &format!("p{i}"), 10, 10)).collect()
    }

    #[test]
    fn test_display() {
        assert_eq!(PliConstraint::Height(300).to_string(), "height 300");
        assert_eq!(PliConstraint::Columns(3).to_string(), "columns 3");
        assert_eq!(PliConstraint::Area.to_string(), "area");
    }

    #[test]
    fn test_columns_exact() {
        let mut parts = scenario_parts();
        let mut packer = Packer::new(PackOptions::default());

        let outcome = pack_constrained(&mut packer, &mut parts, PliConstraint::Columns(3), 1)
            .expect("packs");

        assert_eq!(outcome.columns, 3);
        assert!(parts.iter().all(PliPart::is_placed));
    }

    #[test]
    fn test_columns_uses_one_per_column_for_few_parts() {
        let mut parts = vec![rect(0, "a", 10, 30), rect(1, "b", 10, 10)];
        let mut packer = Packer::new(PackOptions::default());

        let outcome = pack_constrained(&mut packer, &mut parts, PliConstraint::Columns(4), 1)
            .expect("packs");

        assert_eq!(outcome.columns, 2);
        assert_eq!(outcome.height, 30);
    }

    #[test]
    fn test_height_too_tall() {
        let mut parts = vec![rect(0, "tall", 10, 500)];
        let mut packer = Packer::new(PackOptions::default());

        let result = pack_constrained(&mut packer, &mut parts, PliConstraint::Height(300), 15);

        assert!(matches!(result, Err(PackError::TooTall { height: 500, .. })));
    }

    #[test]
    fn test_width_keeps_smallest_fitting_height() {
        // Ten 10x10 squares under width 35 fit three columns of four rows.
        let mut parts = ten_squares();
        let mut packer = Packer::new(PackOptions::default());

        let outcome = pack_constrained(&mut packer, &mut parts, PliConstraint::Width(35), 10)
            .expect("packs");

        assert_eq!(outcome.height, 40);
        assert_eq!(outcome.columns, 3);
        assert!(outcome.width <= 35);
    }

    #[test]
    fn test_width_stops_at_first_failure_but_area_keeps_scanning() {
        // At height 100 both parts share one column. At 90 the tall part
        // needs a second column, which breaks width 60, so the width scan
        // stops. The area scan carries on and prefers the two columns.
        let mut parts = vec![rect(0, "tall", 20, 60), rect(1, "wide", 50, 40)];
        let mut packer = Packer::new(PackOptions::default());

        let width = pack_constrained(&mut packer, &mut parts, PliConstraint::Width(60), 10)
            .expect("packs");
        assert_eq!(width.height, 100);
        assert_eq!(width.columns, 1);

        let mut packer = Packer::new(PackOptions::default());
        let area = pack_constrained(&mut packer, &mut parts, PliConstraint::Area, 10)
            .expect("packs");
        assert_eq!(area.columns, 2);
        assert_eq!((area.width, area.height), (70, 60));
    }

    #[test]
    fn test_square_prefers_balanced_shape() {
        let mut parts = ten_squares();
        let mut packer = Packer::new(PackOptions::default());

        let outcome = pack_constrained(&mut packer, &mut parts, PliConstraint::Square, 10)
            .expect("packs");

        assert!((outcome.width - outcome.height).abs() <= 10);
    }

    #[test]
    fn test_empty_parts_list_is_just_the_frame() {
        let mut packer = Packer::new(PackOptions {
            frame: 4,
            pack_subs: false,
        });

        let outcome = pack_constrained(&mut packer, &mut [], PliConstraint::Area, 10).expect("packs");

        assert_eq!((outcome.width, outcome.height, outcome.columns), (8, 8, 0));
    }
}
