//! Page composition.

use log::{debug, info};

use stepcraft_core::{
    geometry::Point,
    node::{NodeKind, SizedNode},
};

use super::{
    Composer,
    fragment::{ComposedPage, Fragment},
    range,
    step::Component,
};
use crate::{
    StepcraftError,
    structure::{PageDescription, PageItem, PlacementGraph},
};

impl Composer<'_> {
    /// Composes a page: the step group first, then the page-level elements
    /// around it, all resolved against the page box.
    pub fn compose_page(mut self, page: &PageDescription) -> Result<ComposedPage, StepcraftError> {
        let config = self.config;
        let defaults = config.defaults();
        let label = page
            .number
            .map_or_else(|| "page".to_string(), |number| format!("page {number}"));

        let page_node = SizedNode::new(label.as_str(), NodeKind::Page, page.size)?
            .with_margin(config.layout().page_margin());
        page_node.validate()?;

        let mut components: Vec<Component> = Vec::new();
        if let Some(group) = &page.group {
            let available = config.layout().fill_page().then(|| {
                let axis = range::packing_axis(group.allocation);
                let margin = config.layout().page_margin().along(axis);
                (page.size.along(axis) - 2.0 * margin).max(0.0)
            });
            let group_label = format!("{label} / step group");
            let fragment = self.compose_group(&group_label, "", group, available)?;
            let node = self.element_node(
                &group_label,
                NodeKind::StepGroup,
                fragment.size(),
                group.placement,
                group.margin,
                &defaults.step_group,
            )?;
            components.push((node, fragment));
        }

        let (mut pli_count, mut callout_count, mut reserve_count) = (0, 0, 0);
        for item in &page.items {
            match item {
                PageItem::PageNumber(element) => {
                    components.push(self.element_component(
                        &format!("{label} / page number"),
                        NodeKind::PageNumber,
                        element,
                        &defaults.page_number,
                    )?);
                }
                PageItem::PartsList(source) => {
                    pli_count += 1;
                    let pli_label = format!("{label} / parts list {pli_count}");
                    if let Some(component) =
                        self.compose_parts_list(&pli_label, source, &defaults.page_parts_list)?
                    {
                        components.push(component);
                    }
                }
                PageItem::Callout(callout) => {
                    callout_count += 1;
                    components.push(self.compose_callout(
                        &format!("{label} / callout {callout_count}"),
                        callout,
                        &defaults.page_callout,
                    )?);
                }
                PageItem::Reserve(element) => {
                    reserve_count += 1;
                    components.push(self.element_component(
                        &format!("{label} / reserve {reserve_count}"),
                        NodeKind::ReservedSpace,
                        element,
                        &defaults.reserved_space,
                    )?);
                }
            }
        }

        let mut graph = PlacementGraph::new(page_node);
        let mut fragments = Vec::with_capacity(components.len());
        for (node, fragment) in components {
            graph.add(node);
            fragments.push(fragment);
        }

        let mut walk = graph.walk();
        self.issues.append(&mut walk.issues);

        let mut root = Fragment::leaf(label.as_str(), NodeKind::Page, page.size);
        for (placed, fragment) in walk.placed.iter().skip(1).zip(fragments) {
            debug!(element = fragment.label(), x = placed.offset().x(), y = placed.offset().y(); "Placed on page");
            root.push_child(placed.offset(), fragment);
        }

        let mut elements = Vec::new();
        let mut parts_lists = Vec::new();
        root.flatten(Point::default(), &mut elements, &mut parts_lists);

        info!(
            page = label,
            elements = elements.len(),
            parts_lists = parts_lists.len(),
            issues = self.issues.len();
            "Page composed"
        );

        Ok(ComposedPage {
            number: page.number,
            size: page.size,
            elements,
            parts_lists,
            issues: self.issues,
        })
    }
}
