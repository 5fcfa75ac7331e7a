//! Integration tests for the PageComposer API
//!
//! These tests compose whole pages through the public API and check the
//! positions handed to the renderer.

use float_cmp::assert_approx_eq;

use stepcraft::{
    LayoutIssue, PageComposer, StepcraftError,
    config::{AppConfig, BorderConfig, LayoutConfig, LayoutMode, PliConfig},
    geometry::Size,
    node::NodeKind,
    placement::{Edge, Margin, PlacementSpec, RelativeTo},
    pli::{PixelSize, PliConstraint},
    structure::{
        Allocation, Element, PageDescription, PageItem, PartSource, PartsListSource, Range, Step,
        StepGroup, StepsChild,
    },
};

fn bare_pli() -> PliConfig {
    PliConfig {
        border: BorderConfig::new(0.0, 0.0),
        part_margin: Margin::default(),
        label_margin: Margin::default(),
        ..PliConfig::default()
    }
}

fn part(name: &str, width: u32, height: u32) -> PartSource {
    PartSource::new(name, "red", 1, PixelSize::new(width, height))
}

fn single_step_page(step: Step) -> PageDescription {
    let group = StepGroup::default().with_range(Range::new(vec![StepsChild::Step(step)]));
    PageDescription::new(Size::new(1200.0, 900.0))
        .with_number(1)
        .with_group(group)
}

#[test]
fn test_builder_api_exists() {
    let _composer = PageComposer::default();
}

#[test]
fn test_columns_constraint_packs_every_part() {
    let parts = vec![
        part("a", 40, 40),
        part("b", 40, 40),
        part("c", 30, 60),
        part("d", 50, 20),
        part("e", 20, 20),
    ];
    let step = Step::new(1, Size::new(300.0, 200.0)).with_parts_list(
        PartsListSource::new(parts).with_constraint(PliConstraint::Columns(3)),
    );
    let composer = PageComposer::new(AppConfig::default().with_pli(bare_pli()));

    let composed = composer
        .compose(&single_step_page(step))
        .expect("Failed to compose");

    let pli = composed
        .parts_list("step 1 / parts list")
        .expect("parts list is placed");
    assert_eq!(pli.columns, 3);
    assert_eq!(pli.parts.len(), 5);
    assert!(pli.failure.is_none());
    assert!(composed.issues.is_empty());
}

#[test]
fn test_too_tall_part_leaves_an_empty_list() {
    let step = Step::new(1, Size::new(300.0, 200.0)).with_parts_list(
        PartsListSource::new(vec![part("tall", 10, 500)]).with_constraint(PliConstraint::Height(300)),
    );
    let composer = PageComposer::default();

    let composed = composer
        .compose(&single_step_page(step))
        .expect("Failed to compose");

    let pli = composed
        .parts_list("step 1 / parts list")
        .expect("failed list is still reported");
    assert!(pli.parts.is_empty());
    assert!(pli.failure.is_some());
    assert_eq!(composed.issues.len(), 1);
    match &composed.issues[0] {
        LayoutIssue::ConstraintInfeasible {
            part, constraint, ..
        } => {
            assert!(part.contains("tall"), "issue names the part: {part}");
            assert_eq!(*constraint, PliConstraint::Height(300));
        }
        other => panic!("Unexpected issue: {other:?}"),
    }

    // The rest of the step still composes.
    assert!(composed.element("step 1 / image").is_some());
}

#[test]
fn test_step_number_hangs_off_the_image_corner() {
    let config =
        AppConfig::default().with_layout(LayoutConfig::default().with_mode(LayoutMode::Freeform));
    let composer = PageComposer::new(config);

    for (width, height) in [(30.0, 20.0), (64.0, 48.0), (8.0, 90.0)] {
        let step = Step::new(1, Size::new(200.0, 150.0)).with_step_number(
            Element::new(Size::new(width, height))
                .with_placement(PlacementSpec::new(Edge::TopLeft, RelativeTo::Image))
                .with_margin(Margin::uniform(5.0)),
        );

        let composed = composer
            .compose(&single_step_page(step))
            .expect("Failed to compose");

        let image = composed.element("step 1 / image").expect("image is placed");
        let number = composed
            .element("step 1 / step number")
            .expect("step number is placed");
        assert_approx_eq!(f32, number.bounds.min_x() - image.bounds.min_x(), -width - 5.0);
        assert_approx_eq!(f32, number.bounds.min_y() - image.bounds.min_y(), -5.0);
    }
}

#[test]
fn test_row_range_takes_the_tallest_step() {
    let group = StepGroup::new(Allocation::Horizontal).with_range(Range::new(vec![
        StepsChild::Step(Step::new(1, Size::new(50.0, 100.0))),
        StepsChild::Step(Step::new(2, Size::new(60.0, 120.0)).with_margin(Margin::uniform(15.0))),
        StepsChild::Step(Step::new(3, Size::new(40.0, 90.0))),
    ]));
    let page = PageDescription::new(Size::new(800.0, 600.0))
        .with_number(2)
        .with_group(group);

    let composed = PageComposer::default()
        .compose(&page)
        .expect("Failed to compose");

    let range = composed
        .element("page 2 / step group / range 1")
        .expect("range is placed");
    assert_approx_eq!(f32, range.bounds.height(), 120.0);

    let steps: Vec<_> = ["step 1", "step 2", "step 3"]
        .iter()
        .map(|label| composed.element(label).expect("step is placed").bounds)
        .collect();
    for (bounds, height) in steps.iter().zip([100.0, 120.0, 90.0]) {
        assert_approx_eq!(f32, bounds.height(), height);
    }
    for pair in steps.windows(2) {
        assert!(!pair[0].intersects(&pair[1]));
        // Step 2 declares the larger margin, so both gaps use it.
        assert!(pair[1].min_x() - pair[0].max_x() >= 15.0 - 1e-3);
    }
    assert_eq!(composed.elements_of(NodeKind::Step).count(), 3);
}

#[test]
fn test_width_constraint_stops_where_area_keeps_scanning() {
    let parts = || vec![part("tall", 20, 60), part("wide", 50, 40)];
    let group = StepGroup::default().with_range(Range::new(vec![
        StepsChild::Step(Step::new(1, Size::new(200.0, 150.0)).with_parts_list(
            PartsListSource::new(parts()).with_constraint(PliConstraint::Width(60)),
        )),
        StepsChild::Step(Step::new(2, Size::new(200.0, 150.0)).with_parts_list(
            PartsListSource::new(parts()).with_constraint(PliConstraint::Area),
        )),
    ]));
    let page = PageDescription::new(Size::new(1200.0, 900.0)).with_group(group);
    let composer = PageComposer::new(AppConfig::default().with_pli(bare_pli()));

    let composed = composer.compose(&page).expect("Failed to compose");

    let width = composed.parts_list("step 1 / parts list").expect("placed");
    assert_eq!(width.columns, 1);
    assert_approx_eq!(f32, width.size.height(), 100.0);

    let area = composed.parts_list("step 2 / parts list").expect("placed");
    assert_eq!(area.columns, 2);
    assert_approx_eq!(f32, area.size.width(), 70.0);
    assert_approx_eq!(f32, area.size.height(), 60.0);
}

#[test]
fn test_missing_anchor_is_an_issue_not_an_error() {
    let step = Step::new(5, Size::new(200.0, 150.0)).with_step_number(
        Element::new(Size::new(30.0, 20.0))
            .with_placement(PlacementSpec::new(Edge::Left, RelativeTo::PartsList)),
    );

    let composed = PageComposer::default()
        .compose(&single_step_page(step))
        .expect("Failed to compose");

    assert_eq!(
        composed.issues,
        vec![LayoutIssue::DanglingRelativeTo {
            node: "step 5 / step number".to_string(),
            relative_to: RelativeTo::PartsList,
        }]
    );
    assert!(composed.element("step 5 / image").is_some());
}

#[test]
fn test_negative_size_is_rejected() {
    let page = single_step_page(Step::new(1, Size::new(-10.0, 150.0)));

    let result = PageComposer::default().compose(&page);

    assert!(matches!(result, Err(StepcraftError::InvalidInput(_))));
}

#[test]
fn test_parse_compose_and_export() {
    let source = r#"
        number = 3
        size = { width = 800.0, height = 600.0 }

        [group]
        allocation = "horizontal"

        [[group.ranges]]

        [[group.ranges.children]]
        type = "step"
        number = 1
        image = { width = 200.0, height = 150.0 }

        [group.ranges.children.step_number]
        size = { width = 30.0, height = 20.0 }

        [[items]]
        type = "page_number"
        size = { width = 30.0, height = 20.0 }
    "#;

    let composer = PageComposer::default();
    let page = composer.parse(source).expect("Failed to parse page");
    assert_eq!(page.number, Some(3));
    assert_eq!(page.items.len(), 1);

    let composed = composer.compose(&page).expect("Failed to compose");
    assert!(composed.element("step 1 / step number").is_some());
    assert!(composed.element("page 3 / page number").is_some());

    let output = composer.to_toml(&composed).expect("Failed to export");
    assert!(output.contains("step 1 / image"), "{output}");
    assert!(output.contains("page 3 / page number"), "{output}");
}

#[test]
fn test_parse_error_points_at_the_source() {
    let source = "size = \"big\"\n";

    let result = PageComposer::default().parse(source);

    match result {
        Err(StepcraftError::Parse { span, src, .. }) => {
            assert!(span.is_some());
            assert_eq!(src, source);
        }
        other => panic!("Expected a parse error, got {other:?}"),
    }
}
