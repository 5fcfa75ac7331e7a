//! Parts-list entries and their silhouettes.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use stepcraft_core::placement::Margin;

/// Integer pixel dimensions of a rendered bitmap or label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelSize {
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

impl PixelSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Identity of a parts-list entry: part type and color.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PartKey {
    part_type: String,
    color: String,
}

impl PartKey {
    pub fn new(part_type: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            part_type: part_type.into(),
            color: color.into(),
        }
    }

    pub fn part_type(&self) -> &str {
        &self.part_type
    }

    pub fn color(&self) -> &str {
        &self.color
    }
}

impl fmt::Display for PartKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.part_type, self.color)
    }
}

/// An alpha mask whose length does not match the declared bitmap size.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("alpha mask has {actual} values, expected {expected}")]
pub struct MaskSizeError {
    pub expected: usize,
    pub actual: usize,
}

/// Per-row horizontal extent of the opaque pixels of a part.
///
/// Rows run top to bottom. A row without opaque pixels has `left == width`
/// and `right == -1`, so it never collides with anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Silhouette {
    width: i32,
    left: Vec<i32>,
    right: Vec<i32>,
}

impl Silhouette {
    /// A fully opaque rectangle.
    pub fn rectangle(width: u32, height: u32) -> Self {
        let mut silhouette = Self {
            width: width as i32,
            left: Vec::with_capacity(height as usize),
            right: Vec::with_capacity(height as usize),
        };
        silhouette.append_block(width, height);
        silhouette
    }

    /// Scans a row-major alpha mask once.
    ///
    /// A pixel is opaque when its alpha is at least `threshold`.
    ///
    /// # Errors
    ///
    /// Returns [`MaskSizeError`] if `alpha` does not hold `width * height`
    /// values.
    pub fn from_alpha(
        width: u32,
        height: u32,
        alpha: &[u8],
        threshold: u8,
    ) -> Result<Self, MaskSizeError> {
        let expected = width as usize * height as usize;
        if alpha.len() != expected {
            return Err(MaskSizeError {
                expected,
                actual: alpha.len(),
            });
        }

        let width_px = width as i32;
        let mut left = Vec::with_capacity(height as usize);
        let mut right = Vec::with_capacity(height as usize);

        if width == 0 {
            left.resize(height as usize, width_px);
            right.resize(height as usize, -1);
        } else {
            for row in alpha.chunks(width as usize) {
                let first = row.iter().position(|&a| a >= threshold);
                let last = row.iter().rposition(|&a| a >= threshold);
                match (first, last) {
                    (Some(first), Some(last)) => {
                        left.push(first as i32);
                        right.push(last as i32);
                    }
                    _ => {
                        left.push(width_px);
                        right.push(-1);
                    }
                }
            }
        }

        Ok(Self {
            width: width_px,
            left,
            right,
        })
    }

    /// Appends `height` rows of a left-aligned opaque block `width` pixels wide.
    pub fn append_block(&mut self, width: u32, height: u32) {
        let (left, right) = if width == 0 {
            (self.width.max(0), -1)
        } else {
            (0, width as i32 - 1)
        };
        self.width = self.width.max(width as i32);
        for _ in 0..height {
            self.left.push(left);
            self.right.push(right);
        }
    }

    pub fn rows(&self) -> usize {
        self.left.len()
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    /// Returns the opaque span of `row`, or `None` for an empty row.
    pub fn span(&self, row: usize) -> Option<(i32, i32)> {
        let left = *self.left.get(row)?;
        let right = *self.right.get(row)?;
        (left <= right).then_some((left, right))
    }

    /// Widens every row by the rows within `reach` of it, above and below.
    ///
    /// The result has `rows() + 2 * reach` entries; entry `i` covers source
    /// row `i - reach`.
    pub(crate) fn dilate(&self, reach: usize) -> Vec<Option<(i32, i32)>> {
        let rows = self.rows();
        (0..rows + 2 * reach)
            .map(|i| {
                let center = i as isize - reach as isize;
                let from = (center - reach as isize).max(0) as usize;
                let to = ((center + reach as isize) as usize).min(rows.saturating_sub(1));
                if rows == 0 || from > to {
                    return None;
                }
                (from..=to)
                    .filter_map(|row| self.span(row))
                    .reduce(|(l1, r1), (l2, r2)| (l1.min(l2), r1.max(r2)))
            })
            .collect()
    }
}

/// One distinct part/color entry of a parts list.
///
/// The entry stacks its thumbnail, an optional annotation and the
/// instance-count label top to bottom. Its silhouette covers all three.
#[derive(Debug, Clone, PartialEq)]
pub struct PliPart {
    id: usize,
    key: PartKey,
    count: u32,
    thumbnail: PixelSize,
    label: PixelSize,
    annotation: PixelSize,
    classification: String,
    bom: bool,
    mask: Silhouette,
    silhouette: Silhouette,
    margin: (i32, i32),
    label_margin: (i32, i32),
    sort_key: String,

    pub(crate) placed: bool,
    pub(crate) col: usize,
    pub(crate) left: i32,
    pub(crate) top: i32,
}

impl PliPart {
    /// Creates an entry with a rectangular thumbnail silhouette and no margins.
    pub fn new(id: usize, key: PartKey, count: u32, thumbnail: PixelSize, label: PixelSize) -> Self {
        let mut part = Self {
            id,
            key,
            count,
            thumbnail,
            label,
            annotation: PixelSize::default(),
            classification: String::new(),
            bom: false,
            mask: Silhouette::rectangle(thumbnail.width, thumbnail.height),
            silhouette: Silhouette::rectangle(0, 0),
            margin: (0, 0),
            label_margin: (0, 0),
            sort_key: String::new(),
            placed: false,
            col: 0,
            left: 0,
            top: 0,
        };
        part.refresh();
        part
    }

    /// Replaces the thumbnail silhouette with one scanned from an alpha mask.
    ///
    /// # Errors
    ///
    /// Returns [`MaskSizeError`] if the mask does not cover the thumbnail.
    pub fn with_alpha(mut self, alpha: &[u8], threshold: u8) -> Result<Self, MaskSizeError> {
        self.mask = Silhouette::from_alpha(
            self.thumbnail.width,
            self.thumbnail.height,
            alpha,
            threshold,
        )?;
        self.refresh();
        Ok(self)
    }

    pub fn with_annotation(mut self, annotation: PixelSize) -> Self {
        self.annotation = annotation;
        self.refresh();
        self
    }

    /// Sets the classification and whether it participates in the sort order.
    pub fn with_classification(mut self, classification: impl Into<String>, bom: bool) -> Self {
        self.classification = classification.into();
        self.bom = bom;
        self.refresh();
        self
    }

    /// Sets the part and count-label clearances, rounded up to whole pixels.
    pub fn with_margins(mut self, margin: Margin, label_margin: Margin) -> Self {
        self.margin = (margin.x().ceil() as i32, margin.y().ceil() as i32);
        self.label_margin = (label_margin.x().ceil() as i32, label_margin.y().ceil() as i32);
        self
    }

    /// Adds instances of the same part/color.
    pub(crate) fn merge_count(&mut self, count: u32) {
        self.count = self.count.saturating_add(count);
    }

    fn refresh(&mut self) {
        let mut silhouette = self.mask.clone();
        silhouette.append_block(self.annotation.width, self.annotation.height);
        silhouette.append_block(self.label.width, self.label.height);
        self.silhouette = silhouette;

        let class = if self.bom { self.classification.as_str() } else { "" };
        self.sort_key = format!(
            "{:010}|{:010}|{}|{}|{}",
            self.width(),
            self.height(),
            class,
            self.key.color,
            self.key.part_type
        );
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn key(&self) -> &PartKey {
        &self.key
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn thumbnail(&self) -> PixelSize {
        self.thumbnail
    }

    pub fn label(&self) -> PixelSize {
        self.label
    }

    pub fn annotation(&self) -> PixelSize {
        self.annotation
    }

    pub fn classification(&self) -> &str {
        &self.classification
    }

    pub fn silhouette(&self) -> &Silhouette {
        &self.silhouette
    }

    pub fn sort_key(&self) -> &str {
        &self.sort_key
    }

    /// Widest of thumbnail, annotation and label.
    pub fn width(&self) -> i32 {
        self.thumbnail
            .width
            .max(self.label.width)
            .max(self.annotation.width) as i32
    }

    /// Thumbnail, annotation and label stacked.
    pub fn height(&self) -> i32 {
        (self.thumbnail.height + self.annotation.height + self.label.height) as i32
    }

    pub fn margin(&self) -> (i32, i32) {
        self.margin
    }

    pub fn label_margin(&self) -> (i32, i32) {
        self.label_margin
    }

    pub fn is_placed(&self) -> bool {
        self.placed
    }

    pub fn col(&self) -> usize {
        self.col
    }

    pub fn left(&self) -> i32 {
        self.left
    }

    pub fn top(&self) -> i32 {
        self.top
    }

    pub fn bottom(&self) -> i32 {
        self.top + self.height()
    }

    pub(crate) fn reset(&mut self) {
        self.placed = false;
        self.col = 0;
        self.left = 0;
        self.top = 0;
    }

    pub(crate) fn place(&mut self, col: usize, left: i32, top: i32) {
        self.placed = true;
        self.col = col;
        self.left = left;
        self.top = top;
    }
}

/// Sorts parts into packing order: descending by sort key.
///
/// Sort keys embed the part identity, so the order is total and does not
/// depend on the input order.
pub fn sort_parts(parts: &mut [PliPart]) {
    parts.sort_by(|a, b| {
        b.sort_key
            .cmp(&a.sort_key)
            .then_with(|| b.key.cmp(&a.key))
    });
}
