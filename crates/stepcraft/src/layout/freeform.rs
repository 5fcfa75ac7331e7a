//! Freeform step layout.
//!
//! Components keep the offsets the resolver gives them around a base
//! component sitting at the origin. The step's box is the union of the
//! component boxes, shifted so that its top-left corner is the origin.

use log::debug;

use stepcraft_core::{
    node::NodeKind,
    placement::{PlacementSpec, RelativeTo},
};

use super::step::{Arrangement, Component};
use crate::{
    config::FreeformBase,
    structure::{PlacementGraph, Walk},
};

/// Picks the base component and the spec that places the image around it.
///
/// Returns the base's position in `components` and the image's new spec,
/// which mirrors the base's own placement: a parts list on top of the image
/// puts the image below the parts list. `None` keeps the image as base,
/// either because it is configured so or because the base is missing, empty,
/// or not placed outside the image.
pub(crate) fn base_placement(
    components: &[Component],
    base: FreeformBase,
) -> Option<(usize, PlacementSpec)> {
    let kind = match base {
        FreeformBase::Image => return None,
        FreeformBase::PartsList => NodeKind::PartsList,
        FreeformBase::StepNumber => NodeKind::StepNumber,
    };
    let (position, (node, _)) = components
        .iter()
        .enumerate()
        .find(|(_, (node, _))| node.kind() == kind)?;

    let spec = node.spec();
    if spec.relative_to != RelativeTo::Image || spec.is_inside() || node.size().is_zero() {
        debug!(base = node.label(); "Base is not outside the image, keeping the image as base");
        return None;
    }

    let role = kind.role()?;
    let image_spec = PlacementSpec::new(spec.edge.opposite(), role)
        .with_justification(spec.justification);
    Some((position, image_spec))
}

pub(crate) fn arrange(graph: &PlacementGraph, walk: &Walk) -> Arrangement {
    let offsets = graph
        .indices()
        .map(|index| walk.is_resolved(index).then(|| walk.offset(index)))
        .collect();
    Arrangement::new(graph, offsets, None)
}

#[cfg(test)]
mod tests {
    use petgraph::graph::NodeIndex;

    use stepcraft_core::{
        geometry::{Point, Size},
        node::SizedNode,
        placement::{Edge, Justification, Margin, Preposition},
    };

    use super::*;
    use crate::layout::fragment::Fragment;

    fn component(kind: NodeKind, w: f32, h: f32, spec: PlacementSpec, margin: f32) -> Component {
        let node = SizedNode::new(kind.to_string(), kind, Size::new(w, h))
            .expect("valid size")
            .with_spec(spec)
            .with_margin(Margin::uniform(margin));
        let fragment = Fragment::leaf(node.label(), kind, node.size());
        (node, fragment)
    }

    fn pli_on_top() -> Component {
        component(
            NodeKind::PartsList,
            80.0,
            40.0,
            PlacementSpec::new(Edge::Top, RelativeTo::Image).with_justification(Justification::Start),
            8.0,
        )
    }

    #[test]
    fn test_image_base_keeps_image_root() {
        assert_eq!(base_placement(&[pli_on_top()], FreeformBase::Image), None);
    }

    #[test]
    fn test_parts_list_base_mirrors_its_placement() {
        let (position, spec) =
            base_placement(&[pli_on_top()], FreeformBase::PartsList).expect("base found");

        assert_eq!(position, 0);
        assert_eq!(spec.edge, Edge::Bottom);
        assert_eq!(spec.relative_to, RelativeTo::PartsList);
        assert_eq!(spec.justification, Justification::Start);
    }

    #[test]
    fn test_missing_or_inside_base_falls_back() {
        let inside = component(
            NodeKind::StepNumber,
            10.0,
            10.0,
            PlacementSpec::new(Edge::TopLeft, RelativeTo::Image).with_preposition(Preposition::Inside),
            0.0,
        );

        assert_eq!(base_placement(&[pli_on_top()], FreeformBase::StepNumber), None);
        assert_eq!(base_placement(&[inside], FreeformBase::StepNumber), None);
    }

    #[test]
    fn test_mid_edge_base_matches_image_base() {
        let image = SizedNode::new("image", NodeKind::Image, Size::new(200.0, 150.0)).expect("valid");
        let (pli, _) = pli_on_top();

        let mut by_image = PlacementGraph::new(image.clone());
        by_image.add(pli.clone());
        let walk = by_image.walk();
        let expected = arrange(&by_image, &walk);

        let (_, spec) = base_placement(&[pli_on_top()], FreeformBase::PartsList).expect("base found");
        let mut by_pli = PlacementGraph::new(image.with_spec(spec));
        by_pli.add(pli);
        by_pli.set_root(NodeIndex::new(1));
        let walk = by_pli.walk();
        let actual = arrange(&by_pli, &walk);

        assert!(walk.issues.is_empty());
        assert_eq!(actual, expected);
        assert_eq!(actual.offset(NodeIndex::new(0)), Point::new(0.0, 48.0));
        assert_eq!(actual.size(), Size::new(200.0, 198.0));
    }
}
