//! The page description handed to the composer.
//!
//! Sizes are final pixel sizes from the renderer; placements and margins are
//! already-resolved values. Anything left out falls back to the per-kind
//! defaults of [`crate::config::PlacementDefaults`].

use serde::Deserialize;

use stepcraft_core::{
    geometry::Size,
    placement::{Margin, PlacementSpec},
};

use crate::{
    config::LayoutMode,
    pli::{PixelSize, PliConstraint},
};

/// One page to compose.
#[derive(Debug, Clone, Deserialize)]
pub struct PageDescription {
    #[serde(default)]
    pub number: Option<u32>,
    pub size: Size,
    #[serde(default)]
    pub group: Option<StepGroup>,
    #[serde(default)]
    pub items: Vec<PageItem>,
}

impl PageDescription {
    pub fn new(size: Size) -> Self {
        Self {
            number: None,
            size,
            group: None,
            items: Vec::new(),
        }
    }

    pub fn with_number(mut self, number: u32) -> Self {
        self.number = Some(number);
        self
    }

    pub fn with_group(mut self, group: StepGroup) -> Self {
        self.group = Some(group);
        self
    }

    pub fn with_item(mut self, item: PageItem) -> Self {
        self.items.push(item);
        self
    }
}

/// Which way ranges run.
///
/// `Vertical` ranges are columns of steps placed side by side; `Horizontal`
/// ranges are rows of steps stacked top to bottom.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Allocation {
    #[default]
    Vertical,
    Horizontal,
}

/// A rule drawn between consecutive ranges.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Divider {
    pub thickness: f32,
    #[serde(default)]
    pub margin: f32,
}

/// Several steps packed together as ranges.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StepGroup {
    #[serde(default)]
    pub allocation: Allocation,
    #[serde(default)]
    pub ranges: Vec<Range>,
    #[serde(default)]
    pub divider: Option<Divider>,
    #[serde(default)]
    pub placement: Option<PlacementSpec>,
    #[serde(default)]
    pub margin: Option<Margin>,
}

impl StepGroup {
    pub fn new(allocation: Allocation) -> Self {
        Self {
            allocation,
            ..Self::default()
        }
    }

    pub fn with_range(mut self, range: Range) -> Self {
        self.ranges.push(range);
        self
    }

    pub fn with_divider(mut self, divider: Divider) -> Self {
        self.divider = Some(divider);
        self
    }
}

/// A row or column of steps.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Range {
    #[serde(default)]
    pub children: Vec<StepsChild>,
}

impl Range {
    pub fn new(children: Vec<StepsChild>) -> Self {
        Self { children }
    }
}

/// An entry of a range.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepsChild {
    Step(Step),
    Reserve(ReservedSpace),
}

/// Blank space kept free inside a range.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ReservedSpace {
    pub size: Size,
    #[serde(default)]
    pub margin: Option<Margin>,
}

/// One building step.
#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    pub number: u32,
    /// Size of the rendered assembly image.
    pub image: Size,
    #[serde(default)]
    pub image_margin: Option<Margin>,
    #[serde(default)]
    pub step_number: Option<Element>,
    #[serde(default)]
    pub parts_list: Option<PartsListSource>,
    #[serde(default)]
    pub callouts: Vec<Callout>,
    /// Overrides the configured layout mode for this step.
    #[serde(default)]
    pub layout: Option<LayoutMode>,
    #[serde(default)]
    pub margin: Option<Margin>,
}

impl Step {
    pub fn new(number: u32, image: Size) -> Self {
        Self {
            number,
            image,
            image_margin: None,
            step_number: None,
            parts_list: None,
            callouts: Vec::new(),
            layout: None,
            margin: None,
        }
    }

    pub fn with_step_number(mut self, element: Element) -> Self {
        self.step_number = Some(element);
        self
    }

    pub fn with_parts_list(mut self, parts_list: PartsListSource) -> Self {
        self.parts_list = Some(parts_list);
        self
    }

    pub fn with_callout(mut self, callout: Callout) -> Self {
        self.callouts.push(callout);
        self
    }

    pub fn with_layout(mut self, layout: LayoutMode) -> Self {
        self.layout = Some(layout);
        self
    }

    pub fn with_margin(mut self, margin: Margin) -> Self {
        self.margin = Some(margin);
        self
    }
}

/// A fixed-size element such as a step number or page number.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Element {
    pub size: Size,
    #[serde(default)]
    pub placement: Option<PlacementSpec>,
    #[serde(default)]
    pub margin: Option<Margin>,
}

impl Element {
    pub fn new(size: Size) -> Self {
        Self {
            size,
            placement: None,
            margin: None,
        }
    }

    pub fn with_placement(mut self, placement: PlacementSpec) -> Self {
        self.placement = Some(placement);
        self
    }

    pub fn with_margin(mut self, margin: Margin) -> Self {
        self.margin = Some(margin);
        self
    }
}

/// The parts used by a step, or by a whole page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PartsListSource {
    #[serde(default)]
    pub parts: Vec<PartSource>,
    #[serde(default)]
    pub placement: Option<PlacementSpec>,
    #[serde(default)]
    pub margin: Option<Margin>,
    #[serde(default)]
    pub constraint: Option<PliConstraint>,
}

impl PartsListSource {
    pub fn new(parts: Vec<PartSource>) -> Self {
        Self {
            parts,
            ..Self::default()
        }
    }

    pub fn with_constraint(mut self, constraint: PliConstraint) -> Self {
        self.constraint = Some(constraint);
        self
    }

    pub fn with_placement(mut self, placement: PlacementSpec) -> Self {
        self.placement = Some(placement);
        self
    }
}

fn default_count() -> u32 {
    1
}

/// One part occurrence with its rendered bitmaps.
#[derive(Debug, Clone, Deserialize)]
pub struct PartSource {
    pub part_type: String,
    pub color: String,
    #[serde(default = "default_count")]
    pub count: u32,
    pub thumbnail: PixelSize,
    /// Size of the rendered instance-count label.
    #[serde(default)]
    pub label: PixelSize,
    #[serde(default)]
    pub annotation: Option<PixelSize>,
    #[serde(default)]
    pub classification: Option<String>,
    /// Row-major thumbnail alpha channel.
    #[serde(default)]
    pub alpha: Option<Vec<u8>>,
}

impl PartSource {
    pub fn new(
        part_type: impl Into<String>,
        color: impl Into<String>,
        count: u32,
        thumbnail: PixelSize,
    ) -> Self {
        Self {
            part_type: part_type.into(),
            color: color.into(),
            count,
            thumbnail,
            label: PixelSize::default(),
            annotation: None,
            classification: None,
            alpha: None,
        }
    }

    pub fn with_label(mut self, label: PixelSize) -> Self {
        self.label = label;
        self
    }
}

/// A nested step group drawn inside a border.
#[derive(Debug, Clone, Deserialize)]
pub struct Callout {
    pub group: StepGroup,
    #[serde(default)]
    pub placement: Option<PlacementSpec>,
    #[serde(default)]
    pub margin: Option<Margin>,
}

impl Callout {
    pub fn new(group: StepGroup) -> Self {
        Self {
            group,
            placement: None,
            margin: None,
        }
    }

    pub fn with_placement(mut self, placement: PlacementSpec) -> Self {
        self.placement = Some(placement);
        self
    }
}

/// An element placed directly on the page.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PageItem {
    PageNumber(Element),
    PartsList(PartsListSource),
    Callout(Callout),
    Reserve(Element),
}
