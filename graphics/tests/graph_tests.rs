//! Render graph and compiler integration tests.

mod common;

use rstest::rstest;

use common::{color_target, init_logging};
use ember_graphics::compiler::{DependencyKind, LifetimeWindow};
use ember_graphics::{
    Access, CompiledGraph, GraphError, GraphicsError, ImageAttachmentHandle, ImageUsage, LoadOp,
    PassHandle, RenderGraph,
};

/// One compute pass per entry, each touching a single storage image.
fn storage_chain(
    graph: &mut RenderGraph,
    passes: &[(&str, ImageAttachmentHandle, Access)],
) -> Vec<PassHandle> {
    passes
        .iter()
        .map(|&(name, attachment, access)| {
            let pass = graph.add_compute_pass(name);
            graph.use_storage_image(pass, attachment, access).unwrap();
            pass
        })
        .collect()
}

// ============================================================================
// Lifetimes And Aliasing
// ============================================================================

#[test]
fn test_scratch_window_spans_first_to_last_use() {
    init_logging();
    let mut graph = RenderGraph::new();
    let a = graph.create_transient_image("a", color_target(64, 64)).unwrap();
    let scratch = graph.create_transient_image("scratch", color_target(64, 64)).unwrap();

    storage_chain(
        &mut graph,
        &[
            ("p0", a, Access::Write),
            ("p1", scratch, Access::Write),
            ("p2", a, Access::Read),
            ("p3", scratch, Access::Read),
            ("p4", a, Access::Read),
        ],
    );

    let compiled = graph.compile().unwrap();
    let lifetime = compiled.image_lifetime(scratch).unwrap();
    assert_eq!(lifetime.window, LifetimeWindow { first: 1, last: 3 });
    assert!(!lifetime.window.contains(4));
    assert_eq!(
        compiled.image_lifetime(a).unwrap().window,
        LifetimeWindow { first: 0, last: 4 }
    );
}

#[test]
fn test_disjoint_transients_share_memory() {
    init_logging();
    let mut graph = RenderGraph::new();
    let first = graph.create_transient_image("first", color_target(128, 128)).unwrap();
    let second = graph.create_transient_image("second", color_target(128, 128)).unwrap();

    storage_chain(
        &mut graph,
        &[
            ("write_first", first, Access::Write),
            ("read_first", first, Access::Read),
            ("write_second", second, Access::Write),
            ("read_second", second, Access::Read),
        ],
    );

    let compiled = graph.compile().unwrap();
    let plan = compiled.aliasing_plan();
    assert_eq!(plan.image_slots().len(), 1);
    assert_eq!(plan.image_slot(first), plan.image_slot(second));
    assert_eq!(
        plan.image_bytes(),
        compiled.image_lifetime(first).unwrap().size()
    );
}

// ============================================================================
// Usage Aggregation
// ============================================================================

#[rstest]
#[case::remove_first(0, ImageUsage::SAMPLED | ImageUsage::STORAGE)]
#[case::remove_middle(1, ImageUsage::COLOR_ATTACHMENT | ImageUsage::STORAGE)]
#[case::remove_last(2, ImageUsage::COLOR_ATTACHMENT | ImageUsage::SAMPLED)]
fn test_usage_union_after_removal(#[case] removed: usize, #[case] expected: ImageUsage) {
    init_logging();
    let mut graph = RenderGraph::new();
    let target = graph.create_transient_image("target", color_target(32, 32)).unwrap();

    let draw = graph.add_graphics_pass("draw");
    let sample = graph.add_graphics_pass("sample");
    let filter = graph.add_compute_pass("filter");
    let uses = [
        graph.use_render_target(draw, target, LoadOp::DontCare).unwrap(),
        graph.use_shader_input(sample, target).unwrap(),
        graph.use_storage_image(filter, target, Access::ReadWrite).unwrap(),
    ];
    assert_eq!(
        graph.registry().resolve_image(target).usage(),
        ImageUsage::COLOR_ATTACHMENT | ImageUsage::SAMPLED | ImageUsage::STORAGE
    );

    graph.remove_image_use(uses[removed]).unwrap();
    let attachment = graph.registry().resolve_image(target);
    assert_eq!(attachment.usage(), expected);
    assert_eq!(attachment.use_count(), 2);
}

// ============================================================================
// Ordering
// ============================================================================

#[test]
fn test_explicit_cycle_is_reported() {
    init_logging();
    let mut graph = RenderGraph::new();
    let a = graph.add_graphics_pass("a");
    let b = graph.add_graphics_pass("b");
    let c = graph.add_graphics_pass("c");
    graph.add_dependency(b, a);
    graph.add_dependency(c, b);
    graph.add_dependency(a, c);

    let error = graph.compile().unwrap_err();
    match &error {
        GraphError::CyclicDependency { passes } => assert_eq!(passes, &vec![a, b, c]),
        other => panic!("unexpected error: {other}"),
    }
    assert!(matches!(
        GraphicsError::from(error),
        GraphicsError::InvalidParameter(_)
    ));
}

#[test]
fn test_write_after_read_orders_writer_last() {
    init_logging();
    let mut graph = RenderGraph::new();
    let history = graph.create_transient_image("history", color_target(16, 16)).unwrap();

    let passes = storage_chain(
        &mut graph,
        &[
            ("seed", history, Access::Write),
            ("consume", history, Access::Read),
            ("overwrite", history, Access::Write),
        ],
    );

    let compiled = graph.compile().unwrap();
    assert_eq!(compiled.pass_order(), passes.as_slice());
    assert!(
        compiled
            .dependencies()
            .iter()
            .any(|dep| dep.producer == passes[1]
                && dep.consumer == passes[2]
                && dep.kind == DependencyKind::WriteAfterRead)
    );
}

/// `width` independent writers gathered by one reader.
fn build_fan_in(graph: &mut RenderGraph, width: usize) {
    let images: Vec<_> = (0..width)
        .map(|i| {
            graph
                .create_transient_image(format!("image_{i}"), color_target(8, 8))
                .unwrap()
        })
        .collect();
    for (i, image) in images.iter().enumerate() {
        let writer = graph.add_compute_pass(format!("write_{i}"));
        graph.use_storage_image(writer, *image, Access::Write).unwrap();
    }
    let gather = graph.add_compute_pass("gather");
    for image in images.iter().rev() {
        graph.use_storage_image(gather, *image, Access::Read).unwrap();
    }
}

/// Edges without attachment handles, which change generation across resets.
fn edge_shape(compiled: &CompiledGraph) -> Vec<(PassHandle, PassHandle, DependencyKind)> {
    compiled
        .dependencies()
        .iter()
        .map(|dep| (dep.producer, dep.consumer, dep.kind))
        .collect()
}

#[rstest]
#[case::small(4)]
#[case::large(24)]
fn test_compilation_is_deterministic(#[case] width: usize) {
    init_logging();
    let mut first_graph = RenderGraph::new();
    build_fan_in(&mut first_graph, width);
    let first = first_graph.compile().unwrap();

    let mut second_graph = RenderGraph::new();
    build_fan_in(&mut second_graph, width);
    let second = second_graph.compile().unwrap();
    assert_eq!(first.pass_order(), second.pass_order());
    assert_eq!(first.dependencies(), second.dependencies());
    assert_eq!(first.edge_count(), width);

    // Rebuilding into a reset graph gives the same result.
    first_graph.reset();
    build_fan_in(&mut first_graph, width);
    let rebuilt = first_graph.compile().unwrap();
    assert_eq!(rebuilt.pass_order(), first.pass_order());
    assert_eq!(edge_shape(&rebuilt), edge_shape(&first));
}

#[test]
fn test_aliasing_plan_survives_reset() {
    init_logging();
    let build = |graph: &mut RenderGraph| {
        let large = graph.create_transient_image("large", color_target(64, 64)).unwrap();
        let small = graph.create_transient_image("small", color_target(4, 4)).unwrap();
        let late = graph.create_transient_image("late", color_target(64, 64)).unwrap();
        let first = graph.add_compute_pass("first");
        graph.use_storage_image(first, large, Access::Write).unwrap();
        graph.use_storage_image(first, small, Access::Write).unwrap();
        let second = graph.add_compute_pass("second");
        graph.use_storage_image(second, late, Access::Write).unwrap();

        let plan = graph.compile().unwrap().aliasing_plan();
        let slots: Vec<_> = [large, small, late]
            .into_iter()
            .map(|image| plan.image_slot(image))
            .collect();
        (plan.image_bytes(), slots)
    };

    let mut graph = RenderGraph::new();
    let fresh = build(&mut graph);
    // The late target reuses the large one's slot.
    assert_eq!(fresh.1[0], fresh.1[2]);
    assert_ne!(fresh.1[0], fresh.1[1]);

    graph.reset();
    assert_eq!(build(&mut graph), fresh);
}

#[test]
fn test_reset_invalidates_handles() {
    init_logging();
    let mut graph = RenderGraph::new();
    let image = graph.create_transient_image("image", color_target(8, 8)).unwrap();
    let pass = graph.add_graphics_pass("draw");
    graph.use_render_target(pass, image, LoadOp::DontCare).unwrap();

    graph.reset();
    assert!(graph.registry().image(image).is_none());
    assert!(graph.pass(pass).is_none());

    // Names are free again; the new handle differs from the stale one.
    let again = graph.create_transient_image("image", color_target(8, 8)).unwrap();
    assert_ne!(again, image);
}
