//! Step composition: sizing a step's components, placing them, and
//! deriving the step's own size.

use log::{debug, trace};
use petgraph::graph::NodeIndex;

use stepcraft_core::{
    geometry::{Bounds, Point, Size},
    node::{NodeKind, SizedNode},
};

use super::{Composer, fragment::Fragment, freeform, tabular};
use crate::{
    StepcraftError,
    config::{ElementDefaults, LayoutMode},
    pli::PartsList,
    structure::{Callout, Element, PartsListSource, PlacementGraph, Step},
};

/// A sized node together with the fragment it renders as.
pub(super) type Component = (SizedNode, Fragment);

/// Offsets of a scope's components after layout, shifted so that the
/// scope's box starts at the origin.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Arrangement {
    /// `None` for components the walker could not resolve.
    offsets: Vec<Option<Point>>,
    size: Size,
}

impl Arrangement {
    /// Shifts `offsets` so the union of `frame` and every resolved box has
    /// a non-negative top-left corner, and sizes the scope to that union.
    ///
    /// Unresolved and empty components stay where they are and do not count.
    pub fn new(graph: &PlacementGraph, offsets: Vec<Option<Point>>, frame: Option<Bounds>) -> Self {
        let union = graph
            .indices()
            .filter(|index| !graph.node(*index).size().is_zero())
            .filter_map(|index| {
                offsets[index.index()]
                    .map(|offset| Bounds::new_from_top_left(offset, graph.node(index).size()))
            })
            .chain(frame)
            .reduce(|acc, bounds| acc.merge(&bounds));

        let Some(union) = union else {
            return Self {
                offsets,
                size: Size::default(),
            };
        };

        let shift = Point::new(-union.min_x(), -union.min_y());
        let offsets = offsets
            .into_iter()
            .map(|offset| offset.map(|offset| offset.add_point(shift)))
            .collect();

        Self {
            offsets,
            size: union.to_size(),
        }
    }

    pub fn offset(&self, index: NodeIndex) -> Point {
        self.offsets
            .get(index.index())
            .copied()
            .flatten()
            .unwrap_or_default()
    }

    pub fn is_resolved(&self, index: NodeIndex) -> bool {
        matches!(self.offsets.get(index.index()), Some(Some(_)))
    }

    pub fn size(&self) -> Size {
        self.size
    }

    /// Boxes of the resolved, non-empty components.
    pub fn boxes(&self, graph: &PlacementGraph) -> Vec<Bounds> {
        graph
            .indices()
            .filter(|index| self.is_resolved(*index) && !graph.node(*index).size().is_zero())
            .map(|index| Bounds::new_from_top_left(self.offset(index), graph.node(index).size()))
            .collect()
    }
}

/// A composed step.
#[derive(Debug, Clone)]
pub(crate) struct StepLayout {
    pub fragment: Fragment,
    pub mode: LayoutMode,
    /// Boxes of the resolved components in step coordinates.
    pub profile: Vec<Bounds>,
    /// Top-left corner of the assembly image in step coordinates.
    pub image_origin: Point,
}

impl Composer<'_> {
    /// Composes a step labelled `{scope}step N`.
    pub(super) fn compose_step(
        &mut self,
        scope: &str,
        step: &Step,
    ) -> Result<StepLayout, StepcraftError> {
        let config = self.config;
        let defaults = config.defaults();
        let label = format!("{scope}step {}", step.number);
        let mode = step.layout.unwrap_or(config.layout().mode());

        let mut components: Vec<Component> = Vec::new();
        if let Some(element) = &step.step_number {
            components.push(self.element_component(
                &format!("{label} / step number"),
                NodeKind::StepNumber,
                element,
                &defaults.step_number,
            )?);
        }
        if let Some(source) = &step.parts_list {
            let pli_label = format!("{label} / parts list");
            if let Some(component) =
                self.compose_parts_list(&pli_label, source, &defaults.parts_list)?
            {
                components.push(component);
            }
        }
        for (i, callout) in step.callouts.iter().enumerate() {
            components.push(self.compose_callout(
                &format!("{label} / callout {}", i + 1),
                callout,
                &defaults.callout,
            )?);
        }

        let mut image = SizedNode::new(format!("{label} / image"), NodeKind::Image, step.image)?
            .with_margin(step.image_margin.unwrap_or_default());
        image.validate()?;

        // Components are inserted after the image, so component `i` ends up
        // at node index `i + 1`.
        let mut root = NodeIndex::new(0);
        if mode == LayoutMode::Freeform {
            let base = config.layout().freeform_base();
            if let Some((position, spec)) = freeform::base_placement(&components, base) {
                trace!(step = label, base:? = base; "Placing image around freeform base");
                image = image.with_spec(spec);
                root = NodeIndex::new(position + 1);
            }
        }

        let image_fragment = Fragment::leaf(image.label(), NodeKind::Image, step.image);
        let mut graph = PlacementGraph::new(image);
        let mut fragments = vec![image_fragment];
        for (node, fragment) in components {
            graph.add(node);
            fragments.push(fragment);
        }
        graph.set_root(root);

        let mut walk = graph.walk();
        self.issues.append(&mut walk.issues);

        let arrangement = match mode {
            LayoutMode::Tabular => tabular::arrange(&graph, &walk).arrangement,
            LayoutMode::Freeform => freeform::arrange(&graph, &walk),
        };

        let size = arrangement.size();
        let mut fragment = Fragment::leaf(label.as_str(), NodeKind::Step, size);
        for (index, child) in graph.indices().zip(fragments) {
            fragment.push_child(arrangement.offset(index), child);
        }

        debug!(
            step = label,
            mode:? = mode,
            width = size.width(),
            height = size.height();
            "Step composed"
        );

        Ok(StepLayout {
            fragment,
            mode,
            profile: arrangement.boxes(&graph),
            image_origin: arrangement.offset(NodeIndex::new(0)),
        })
    }

    /// Sizes a parts list. Lists without parts are left out entirely.
    pub(super) fn compose_parts_list(
        &mut self,
        label: &str,
        source: &PartsListSource,
        defaults: &ElementDefaults,
    ) -> Result<Option<Component>, StepcraftError> {
        let config = self.config;
        let list = PartsList::build(label, &source.parts, config.pli())?;
        if list.is_empty() {
            debug!(label; "Skipping empty parts list");
            return Ok(None);
        }

        let constraint = source.constraint.unwrap_or(config.pli().constraint);
        let (layout, issue) = list.pack(constraint, config.layout().scan_step());
        self.issues.extend(issue);

        let size = layout.size;
        let node = self.element_node(
            label,
            NodeKind::PartsList,
            size,
            source.placement,
            source.margin,
            defaults,
        )?;
        let fragment = Fragment::leaf(label, NodeKind::PartsList, size).with_pli(layout);
        Ok(Some((node, fragment)))
    }

    /// Sizes a callout: its nested group plus the border frame on each side.
    pub(super) fn compose_callout(
        &mut self,
        label: &str,
        callout: &Callout,
        defaults: &ElementDefaults,
    ) -> Result<Component, StepcraftError> {
        let frame = self.config.callout().border.frame();
        let group = self.compose_group(
            &format!("{label} / group"),
            &format!("{label} / "),
            &callout.group,
            None,
        )?;
        let size = Size::new(
            group.size().width() + 2.0 * frame,
            group.size().height() + 2.0 * frame,
        );

        let node = self.element_node(
            label,
            NodeKind::Callout,
            size,
            callout.placement,
            callout.margin,
            defaults,
        )?;
        let fragment =
            Fragment::leaf(label, NodeKind::Callout, size).with_child(Point::new(frame, frame), group);
        Ok((node, fragment))
    }

    pub(super) fn element_component(
        &self,
        label: &str,
        kind: NodeKind,
        element: &Element,
        defaults: &ElementDefaults,
    ) -> Result<Component, StepcraftError> {
        let node = self.element_node(
            label,
            kind,
            element.size,
            element.placement,
            element.margin,
            defaults,
        )?;
        let fragment = Fragment::leaf(label, kind, element.size);
        Ok((node, fragment))
    }
}
