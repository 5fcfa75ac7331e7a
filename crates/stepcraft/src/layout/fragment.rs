//! Composed output: nested fragments and the flat page they turn into.

use serde::Serialize;

use stepcraft_core::{
    geometry::{Bounds, Point, Size},
    node::NodeKind,
};

use crate::{LayoutIssue, pli::PliLayout};

/// A sized box with its children at offsets relative to its own corner.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Fragment {
    label: String,
    kind: NodeKind,
    size: Size,
    children: Vec<PlacedFragment>,
    pli: Option<PliLayout>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PlacedFragment {
    offset: Point,
    fragment: Fragment,
}

impl Fragment {
    pub fn leaf(label: impl Into<String>, kind: NodeKind, size: Size) -> Self {
        Self {
            label: label.into(),
            kind,
            size,
            children: Vec::new(),
            pli: None,
        }
    }

    pub fn with_pli(mut self, pli: PliLayout) -> Self {
        self.pli = Some(pli);
        self
    }

    pub fn with_child(mut self, offset: Point, child: Fragment) -> Self {
        self.push_child(offset, child);
        self
    }

    pub fn push_child(&mut self, offset: Point, child: Fragment) {
        self.children.push(PlacedFragment {
            offset,
            fragment: child,
        });
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn size(&self) -> Size {
        self.size
    }

    /// Emits this fragment and all descendants in page coordinates,
    /// parents before children.
    pub fn flatten(
        self,
        origin: Point,
        elements: &mut Vec<PlacedElement>,
        parts_lists: &mut Vec<PliLayout>,
    ) {
        elements.push(PlacedElement {
            label: self.label,
            kind: self.kind,
            bounds: Bounds::new_from_top_left(origin, self.size),
        });
        if let Some(mut pli) = self.pli {
            pli.origin = origin;
            parts_lists.push(pli);
        }
        for child in self.children {
            child
                .fragment
                .flatten(origin.add_point(child.offset), elements, parts_lists);
        }
    }
}

/// One element of a composed page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedElement {
    pub label: String,
    pub kind: NodeKind,
    /// Page-pixel box of the element.
    pub bounds: Bounds,
}

/// Everything the renderer needs to draw one page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComposedPage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<u32>,
    pub size: Size,
    /// Every element, parents before children.
    pub elements: Vec<PlacedElement>,
    pub parts_lists: Vec<PliLayout>,
    /// Problems recovered while composing the page.
    pub issues: Vec<LayoutIssue>,
}

impl ComposedPage {
    /// Finds an element by label.
    pub fn element(&self, label: &str) -> Option<&PlacedElement> {
        self.elements.iter().find(|element| element.label == label)
    }

    /// Returns every element of the given kind.
    pub fn elements_of(&self, kind: NodeKind) -> impl Iterator<Item = &PlacedElement> {
        self.elements.iter().filter(move |element| element.kind == kind)
    }

    /// Finds a parts list by label.
    pub fn parts_list(&self, label: &str) -> Option<&PliLayout> {
        self.parts_lists.iter().find(|pli| pli.label == label)
    }
}
