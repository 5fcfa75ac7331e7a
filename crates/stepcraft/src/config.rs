//! Configuration types for Stepcraft page composition.
//!
//! This module provides configuration structures that control how pages are
//! composed. All values arrive already typed; no text is parsed here. Every
//! type implements [`serde::Deserialize`] for loading from external sources.
//!
//! # Overview
//!
//! - [`AppConfig`] - Top-level configuration combining the sections below.
//! - [`LayoutConfig`] - Composer selection, resolution and page margin.
//! - [`PlacementDefaults`] - Per-kind default placement and margin.
//! - [`PliConfig`] - Parts-list packing constraint, border and options.
//! - [`CalloutConfig`] - Callout border and padding.
//!
//! # Example
//!
//! ```
//! # use stepcraft::config::{AppConfig, LayoutMode};
//! let config = AppConfig::default();
//! assert_eq!(config.layout().mode(), LayoutMode::Tabular);
//! ```

use serde::Deserialize;

use stepcraft_core::placement::{
    Edge, Justification, Margin, PlacementSpec, Preposition, RelativeTo,
};

use crate::pli::PliConstraint;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Layout section.
    #[serde(default)]
    layout: LayoutConfig,

    /// Per-kind placement defaults.
    #[serde(default)]
    defaults: PlacementDefaults,

    /// Parts-list section.
    #[serde(default)]
    pli: PliConfig,

    /// Callout section.
    #[serde(default)]
    callout: CalloutConfig,
}

impl AppConfig {
    /// Creates a new [`AppConfig`] from its sections.
    pub fn new(
        layout: LayoutConfig,
        defaults: PlacementDefaults,
        pli: PliConfig,
        callout: CalloutConfig,
    ) -> Self {
        Self {
            layout,
            defaults,
            pli,
            callout,
        }
    }

    /// Returns the layout configuration.
    pub fn layout(&self) -> &LayoutConfig {
        &self.layout
    }

    /// Returns the per-kind placement defaults.
    pub fn defaults(&self) -> &PlacementDefaults {
        &self.defaults
    }

    /// Returns the parts-list configuration.
    pub fn pli(&self) -> &PliConfig {
        &self.pli
    }

    /// Returns the callout configuration.
    pub fn callout(&self) -> &CalloutConfig {
        &self.callout
    }

    /// Replaces the parts-list section (builder style).
    pub fn with_pli(mut self, pli: PliConfig) -> Self {
        self.pli = pli;
        self
    }

    /// Replaces the layout section (builder style).
    pub fn with_layout(mut self, layout: LayoutConfig) -> Self {
        self.layout = layout;
        self
    }

    /// Replaces the placement defaults (builder style).
    pub fn with_defaults(mut self, defaults: PlacementDefaults) -> Self {
        self.defaults = defaults;
        self
    }
}

/// Which composer lays out a step's components.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutMode {
    /// Grid-quantized placement around the assembly image.
    #[default]
    Tabular,
    /// Direct relative placement around a base component.
    Freeform,
}

/// The component every other component is placed around in freeform mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FreeformBase {
    #[default]
    Image,
    PartsList,
    StepNumber,
}

fn default_resolution() -> f32 {
    150.0
}

/// Layout configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LayoutConfig {
    #[serde(default)]
    mode: LayoutMode,

    #[serde(default)]
    freeform_base: FreeformBase,

    /// Device pixels per physical unit.
    #[serde(default = "default_resolution")]
    resolution: f32,

    /// Clearance kept between the page edge and inside-placed elements.
    #[serde(default)]
    page_margin: Margin,

    /// Spread ranges over the whole page content area instead of packing them.
    #[serde(default)]
    fill_page: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            mode: LayoutMode::default(),
            freeform_base: FreeformBase::default(),
            resolution: default_resolution(),
            page_margin: Margin::uniform(20.0),
            fill_page: false,
        }
    }
}

impl LayoutConfig {
    pub fn mode(&self) -> LayoutMode {
        self.mode
    }

    pub fn freeform_base(&self) -> FreeformBase {
        self.freeform_base
    }

    pub fn resolution(&self) -> f32 {
        self.resolution
    }

    pub fn page_margin(&self) -> Margin {
        self.page_margin
    }

    pub fn fill_page(&self) -> bool {
        self.fill_page
    }

    pub fn with_mode(mut self, mode: LayoutMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_freeform_base(mut self, base: FreeformBase) -> Self {
        self.freeform_base = base;
        self
    }

    pub fn with_fill_page(mut self, fill_page: bool) -> Self {
        self.fill_page = fill_page;
        self
    }

    /// Pixel step used when scanning parts-list heights: a tenth of a unit.
    pub fn scan_step(&self) -> u32 {
        ((self.resolution / 10.0).round() as u32).max(1)
    }
}

/// Default placement and margin for one kind of element.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ElementDefaults {
    #[serde(default)]
    pub spec: PlacementSpec,
    #[serde(default)]
    pub margin: Margin,
}

impl ElementDefaults {
    pub fn new(spec: PlacementSpec, margin: Margin) -> Self {
        Self { spec, margin }
    }
}

/// A configured base value with an optional local override.
///
/// The local value wins when present; the base is never modified.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Overridable<T: Copy> {
    base: T,
    local: Option<T>,
}

impl<T: Copy> Overridable<T> {
    pub fn new(base: T) -> Self {
        Self { base, local: None }
    }

    pub fn with_local(mut self, local: Option<T>) -> Self {
        self.local = local;
        self
    }

    /// Returns the effective value.
    pub fn value(&self) -> T {
        self.local.unwrap_or(self.base)
    }

    pub fn is_overridden(&self) -> bool {
        self.local.is_some()
    }
}

/// Per-kind default placements.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlacementDefaults {
    pub step_number: ElementDefaults,
    pub parts_list: ElementDefaults,
    pub callout: ElementDefaults,
    pub page_number: ElementDefaults,
    pub step_group: ElementDefaults,
    pub page_parts_list: ElementDefaults,
    pub page_callout: ElementDefaults,
    pub reserved_space: ElementDefaults,
    /// Margin every step keeps from its siblings in a range.
    pub step_margin: Margin,
    /// Margin every range keeps from its siblings in a group.
    pub range_margin: Margin,
}

impl Default for PlacementDefaults {
    fn default() -> Self {
        Self {
            step_number: ElementDefaults::new(
                PlacementSpec::new(Edge::TopLeft, RelativeTo::Image),
                Margin::uniform(5.0),
            ),
            parts_list: ElementDefaults::new(
                PlacementSpec::new(Edge::Top, RelativeTo::Image)
                    .with_justification(Justification::Start),
                Margin::uniform(8.0),
            ),
            callout: ElementDefaults::new(
                PlacementSpec::new(Edge::Right, RelativeTo::Image),
                Margin::uniform(10.0),
            ),
            page_number: ElementDefaults::new(
                PlacementSpec::new(Edge::BottomRight, RelativeTo::Page)
                    .with_preposition(Preposition::Inside),
                Margin::uniform(10.0),
            ),
            step_group: ElementDefaults::new(
                PlacementSpec::new(Edge::TopLeft, RelativeTo::Page)
                    .with_preposition(Preposition::Inside),
                Margin::default(),
            ),
            page_parts_list: ElementDefaults::new(
                PlacementSpec::new(Edge::Bottom, RelativeTo::StepGroup)
                    .with_justification(Justification::Start),
                Margin::uniform(10.0),
            ),
            page_callout: ElementDefaults::new(
                PlacementSpec::new(Edge::Right, RelativeTo::StepGroup),
                Margin::uniform(10.0),
            ),
            reserved_space: ElementDefaults::new(
                PlacementSpec::new(Edge::TopRight, RelativeTo::Page)
                    .with_preposition(Preposition::Inside),
                Margin::default(),
            ),
            step_margin: Margin::uniform(10.0),
            range_margin: Margin::uniform(20.0),
        }
    }
}

/// Border drawn around a parts list or callout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct BorderConfig {
    #[serde(default)]
    pub thickness: f32,
    #[serde(default)]
    pub margin: f32,
}

impl BorderConfig {
    pub fn new(thickness: f32, margin: f32) -> Self {
        Self { thickness, margin }
    }

    /// Space the border takes on each side.
    pub fn frame(&self) -> f32 {
        self.thickness + self.margin
    }
}

/// Parts-list configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PliConfig {
    pub constraint: PliConstraint,
    pub border: BorderConfig,
    /// Fill the space beside narrow parts with sub-columns.
    pub pack_subs: bool,
    /// Sort by part classification (bill of materials).
    pub bom: bool,
    /// Clearance around each part thumbnail.
    pub part_margin: Margin,
    /// Clearance around each instance-count label.
    pub label_margin: Margin,
    /// Alpha value at or above which a thumbnail pixel counts as opaque.
    pub alpha_threshold: u8,
}

impl Default for PliConfig {
    fn default() -> Self {
        Self {
            constraint: PliConstraint::Area,
            border: BorderConfig::new(1.0, 4.0),
            pack_subs: false,
            bom: false,
            part_margin: Margin::uniform(6.0),
            label_margin: Margin::uniform(4.0),
            alpha_threshold: 1,
        }
    }
}

/// Callout configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CalloutConfig {
    pub border: BorderConfig,
}

impl Default for CalloutConfig {
    fn default() -> Self {
        Self {
            border: BorderConfig::new(1.0, 8.0),
        }
    }
}
