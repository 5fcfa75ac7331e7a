//! Parts-list (PLI) packing.
//!
//! A parts list shows one thumbnail per distinct part/color with its
//! instance count. Entries are merged by identity, sorted into a total
//! order and packed into columns under a [`PliConstraint`].
//!
//! - [`part`]: entries and their per-row silhouettes
//! - [`packer`]: a single packing attempt under a size limit
//! - [`constraint`]: the height searches behind each constraint mode

pub mod constraint;
pub mod packer;
pub mod part;

pub use constraint::{PliConstraint, pack_constrained};
pub use packer::{PackError, PackOptions, PackOutcome, Packer};
pub use part::{PartKey, PixelSize, PliPart, Silhouette};

use indexmap::IndexMap;
use log::{debug, warn};
use serde::Serialize;

use stepcraft_core::geometry::{Point, Size};

use crate::{
    LayoutIssue, StepcraftError, config::PliConfig, structure::tree::PartSource,
};

/// A part's final position inside its parts list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlacedPart {
    pub part_type: String,
    pub color: String,
    pub count: u32,
    pub col: usize,
    pub left: i32,
    pub top: i32,
    pub bottom: i32,
    pub width: i32,
    pub height: i32,
}

/// A packed parts list as handed to the renderer.
///
/// Part coordinates are relative to the parts-list box; `origin` places the
/// box on the page. A failed list has no parts and names the failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PliLayout {
    pub label: String,
    pub constraint: PliConstraint,
    pub origin: Point,
    pub size: Size,
    pub columns: usize,
    pub parts: Vec<PlacedPart>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

/// The distinct entries of one parts list, ready to pack.
#[derive(Debug, Clone)]
pub struct PartsList {
    label: String,
    parts: Vec<PliPart>,
    options: PackOptions,
}

impl PartsList {
    /// Merges `sources` by part/color and builds one entry per identity.
    ///
    /// The first occurrence of an identity supplies its bitmaps; later
    /// occurrences only add to the count.
    ///
    /// # Errors
    ///
    /// Returns [`StepcraftError::InvalidMask`] when an alpha mask does not
    /// match its thumbnail size.
    pub fn build(
        label: impl Into<String>,
        sources: &[PartSource],
        config: &PliConfig,
    ) -> Result<Self, StepcraftError> {
        let label = label.into();
        let mut merged: IndexMap<PartKey, PliPart> = IndexMap::new();

        for source in sources {
            let key = PartKey::new(&source.part_type, &source.color);
            if let Some(existing) = merged.get_mut(&key) {
                existing.merge_count(source.count);
                continue;
            }

            let mut part = PliPart::new(
                merged.len(),
                key.clone(),
                source.count,
                source.thumbnail,
                source.label,
            )
            .with_margins(config.part_margin, config.label_margin);

            if let Some(annotation) = source.annotation {
                part = part.with_annotation(annotation);
            }
            if let Some(classification) = &source.classification {
                part = part.with_classification(classification, config.bom);
            }
            if let Some(alpha) = &source.alpha {
                part = part
                    .with_alpha(alpha, config.alpha_threshold)
                    .map_err(|source| StepcraftError::InvalidMask {
                        part: key.to_string(),
                        source,
                    })?;
            }
            merged.insert(key, part);
        }

        debug!(label = label, parts = merged.len(); "Parts list built");

        Ok(Self {
            label,
            parts: merged.into_values().collect(),
            options: PackOptions {
                frame: config.border.frame().ceil() as i32,
                pack_subs: config.pack_subs,
            },
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn parts(&self) -> &[PliPart] {
        &self.parts
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Packs the list under `constraint`.
    ///
    /// A list that cannot be packed comes back empty, with the issue naming
    /// the offending part.
    pub fn pack(
        mut self,
        constraint: PliConstraint,
        scan_step: u32,
    ) -> (PliLayout, Option<LayoutIssue>) {
        let mut packer = Packer::new(self.options);

        match pack_constrained(&mut packer, &mut self.parts, constraint, scan_step) {
            Ok(outcome) => {
                let parts = self.parts.iter().map(placed_part).collect();
                let layout = PliLayout {
                    label: self.label,
                    constraint,
                    origin: Point::default(),
                    size: Size::new(outcome.width as f32, outcome.height as f32),
                    columns: outcome.columns,
                    parts,
                    failure: None,
                };
                (layout, None)
            }
            Err(err) => {
                warn!(label = self.label, constraint:% = constraint, err:% = err; "Parts list packing failed");
                let part = err
                    .part()
                    .map(str::to_string)
                    .or_else(|| self.parts.first().map(|p| p.key().to_string()))
                    .unwrap_or_default();
                let issue = LayoutIssue::ConstraintInfeasible {
                    parts_list: self.label.clone(),
                    part,
                    constraint,
                    reason: err.to_string(),
                };
                let layout = PliLayout {
                    label: self.label,
                    constraint,
                    origin: Point::default(),
                    size: Size::default(),
                    columns: 0,
                    parts: Vec::new(),
                    failure: Some(err.to_string()),
                };
                (layout, Some(issue))
            }
        }
    }
}

fn placed_part(part: &PliPart) -> PlacedPart {
    PlacedPart {
        part_type: part.key().part_type().to_string(),
        color: part.key().color().to_string(),
        count: part.count(),
        col: part.col(),
        left: part.left(),
        top: part.top(),
        bottom: part.bottom(),
        width: part.width(),
        height: part.height(),
    }
}
