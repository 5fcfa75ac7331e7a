//! Page element nodes.
//!
//! A node goes through two passes, each producing its own value:
//!
//! 1. Sizing yields a [`SizedNode`]: kind, final pixel size, placement spec
//!    and margin. The size is validated once here and never changes.
//! 2. Placement wraps it into a [`PlacedNode`] carrying the offset in the
//!    parent's coordinate space.
//!
//! Keeping the passes apart means a placement can never observe a size that
//! is still being computed.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    geometry::{Bounds, Point, Size},
    placement::{Margin, PlacementError, PlacementSpec, RelativeTo},
};

/// The role of a page element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Page,
    StepGroup,
    Range,
    Step,
    Image,
    StepNumber,
    PartsList,
    Callout,
    PageNumber,
    Divider,
    ReservedSpace,
}

impl NodeKind {
    /// Returns the anchor role this kind can serve, if any.
    ///
    /// Dividers, reserved space, ranges and steps are never anchors.
    pub fn role(self) -> Option<RelativeTo> {
        match self {
            NodeKind::Page => Some(RelativeTo::Page),
            NodeKind::StepGroup => Some(RelativeTo::StepGroup),
            NodeKind::Image => Some(RelativeTo::Image),
            NodeKind::StepNumber => Some(RelativeTo::StepNumber),
            NodeKind::PartsList => Some(RelativeTo::PartsList),
            NodeKind::Callout => Some(RelativeTo::Callout),
            NodeKind::PageNumber => Some(RelativeTo::PageNumber),
            NodeKind::Range | NodeKind::Step | NodeKind::Divider | NodeKind::ReservedSpace => None,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Page => "page",
            NodeKind::StepGroup => "step_group",
            NodeKind::Range => "range",
            NodeKind::Step => "step",
            NodeKind::Image => "image",
            NodeKind::StepNumber => "step_number",
            NodeKind::PartsList => "parts_list",
            NodeKind::Callout => "callout",
            NodeKind::PageNumber => "page_number",
            NodeKind::Divider => "divider",
            NodeKind::ReservedSpace => "reserved_space",
        };
        write!(f, "{name}")
    }
}

/// A node whose size is final.
#[derive(Debug, Clone, PartialEq)]
pub struct SizedNode {
    label: String,
    kind: NodeKind,
    size: Size,
    spec: PlacementSpec,
    margin: Margin,
}

impl SizedNode {
    /// Creates a sized node with a default spec and no margin.
    ///
    /// # Errors
    ///
    /// Returns [`PlacementError::InvalidSize`] when the size is negative or
    /// not finite.
    pub fn new(
        label: impl Into<String>,
        kind: NodeKind,
        size: Size,
    ) -> Result<Self, PlacementError> {
        let label = label.into();
        if !size.is_valid() {
            return Err(PlacementError::InvalidSize { label, size });
        }
        Ok(Self {
            label,
            kind,
            size,
            spec: PlacementSpec::default(),
            margin: Margin::default(),
        })
    }

    pub fn with_spec(mut self, spec: PlacementSpec) -> Self {
        self.spec = spec;
        self
    }

    pub fn with_margin(mut self, margin: Margin) -> Self {
        self.margin = margin;
        self
    }

    /// Checks that spec and margin carry finite numbers.
    ///
    /// # Errors
    ///
    /// Returns [`PlacementError::NonFinite`] otherwise.
    pub fn validate(&self) -> Result<(), PlacementError> {
        let finite_offset = self.spec.offset.iter().all(|value| value.is_finite());
        if finite_offset && self.margin.is_finite() {
            Ok(())
        } else {
            Err(PlacementError::NonFinite {
                label: self.label.clone(),
            })
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn spec(&self) -> &PlacementSpec {
        &self.spec
    }

    pub fn margin(&self) -> Margin {
        self.margin
    }
}

/// A sized node together with its offset in the parent's coordinate space.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedNode {
    node: SizedNode,
    offset: Point,
}

impl PlacedNode {
    pub fn new(node: SizedNode, offset: Point) -> Self {
        Self { node, offset }
    }

    pub fn node(&self) -> &SizedNode {
        &self.node
    }

    pub fn offset(&self) -> Point {
        self.offset
    }

    /// Returns the node's box in the parent's coordinate space.
    pub fn bounds(&self) -> Bounds {
        Bounds::new_from_top_left(self.offset, self.node.size())
    }

    /// Consumes the placement and returns the sized node.
    pub fn into_inner(self) -> SizedNode {
        self.node
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sized_node_rejects_negative_size() {
        let result = SizedNode::new("pli", NodeKind::PartsList, Size::new(-1.0, 10.0));
        assert_eq!(
            result,
            Err(PlacementError::InvalidSize {
                label: "pli".to_string(),
                size: Size::new(-1.0, 10.0),
            })
        );
    }

    #[test]
    fn test_sized_node_validate_rejects_nan_offset() {
        let spec = PlacementSpec::default().with_offset(f32::NAN, 0.0);
        let node = SizedNode::new("sn", NodeKind::StepNumber, Size::new(10.0, 10.0))
            .expect("valid size")
            .with_spec(spec);
        assert!(node.validate().is_err());
    }

    #[test]
    fn test_placed_node_bounds() {
        let node = SizedNode::new("csi", NodeKind::Image, Size::new(200.0, 150.0)).expect("valid");
        let placed = PlacedNode::new(node, Point::new(10.0, 20.0));
        let bounds = placed.bounds();
        assert_eq!(bounds.min_point(), Point::new(10.0, 20.0));
        assert_eq!(bounds.to_size(), Size::new(200.0, 150.0));
    }

    #[test]
    fn test_roles() {
        assert_eq!(NodeKind::Image.role(), Some(RelativeTo::Image));
        assert_eq!(NodeKind::StepGroup.role(), Some(RelativeTo::StepGroup));
        assert_eq!(NodeKind::Divider.role(), None);
        assert_eq!(NodeKind::ReservedSpace.role(), None);
    }
}
