//! Composition of steps, ranges and pages.
//!
//! Composition runs bottom-up: every step is sized from its components, a
//! step group from its ranges, and finally the page from its top-level
//! elements. Each level produces a [`Fragment`](fragment::Fragment) whose
//! children sit at offsets relative to it; the page fragment is flattened
//! into a [`ComposedPage`] at the end.
//!
//! - [`tabular`]: grid-quantized placement around the assembly image
//! - [`freeform`]: direct relative placement around a base component
//! - [`range`]: packing steps into ranges and ranges into a group

mod fragment;
mod freeform;
mod page;
mod range;
mod step;
mod tabular;

pub use fragment::{ComposedPage, PlacedElement};
pub use range::distribute;
pub use tabular::{AxisTrack, GRID_LEVELS};

use stepcraft_core::{
    geometry::Size,
    node::{NodeKind, SizedNode},
    placement::{Margin, PlacementSpec},
};

use crate::{
    LayoutIssue, StepcraftError,
    config::{AppConfig, ElementDefaults, Overridable},
};

/// Composes one page against one configuration, collecting issues as it goes.
pub(crate) struct Composer<'cfg> {
    config: &'cfg AppConfig,
    issues: Vec<LayoutIssue>,
}

impl<'cfg> Composer<'cfg> {
    pub fn new(config: &'cfg AppConfig) -> Self {
        Self {
            config,
            issues: Vec::new(),
        }
    }

    /// Builds a node whose placement and margin fall back to `defaults`.
    fn element_node(
        &self,
        label: &str,
        kind: NodeKind,
        size: Size,
        placement: Option<PlacementSpec>,
        margin: Option<Margin>,
        defaults: &ElementDefaults,
    ) -> Result<SizedNode, StepcraftError> {
        let spec = Overridable::new(defaults.spec).with_local(placement).value();
        let margin = Overridable::new(defaults.margin).with_local(margin).value();
        let node = SizedNode::new(label, kind, size)?
            .with_spec(spec)
            .with_margin(margin);
        node.validate()?;
        Ok(node)
    }
}
