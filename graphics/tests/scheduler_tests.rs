//! Frame scheduler integration tests.
//!
//! These run whole frames through the dummy backend and inspect the recorded
//! submissions and presents.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use rstest::rstest;

use common::{TestContext, color_target};
use ember_graphics::backend::dummy::DummyBackendConfig;
use ember_graphics::scheduler::FenceStatus;
use ember_graphics::{
    Access, Device, GpuBackend, GraphicsError, ImageFormat, ImageUsage, LoadOp, PresentStatus,
    RenderGraph, SchedulerConfig, SwapchainDescriptor, SwapchainHandle,
};

/// A (graphics) writes X, B (compute) reads X and writes Y, C (graphics) reads Y.
fn build_abc(graph: &mut RenderGraph) {
    let x = graph.create_transient_image("x", color_target(256, 256)).unwrap();
    let y = graph.create_transient_image("y", color_target(256, 256)).unwrap();

    let a = graph.add_graphics_pass("A");
    graph.use_render_target(a, x, LoadOp::DontCare).unwrap();

    let b = graph.add_compute_pass("B");
    graph.use_shader_input(b, x).unwrap();
    graph.use_storage_image(b, y, Access::Write).unwrap();

    let c = graph.add_graphics_pass("C");
    graph.use_shader_input(c, y).unwrap();
}

/// A single pass clearing the swapchain.
fn build_present(graph: &mut RenderGraph, device: &Device, swapchain: SwapchainHandle) {
    let backbuffer = graph.import_swapchain("backbuffer", device, swapchain).unwrap();
    let main = graph.add_graphics_pass("main");
    graph
        .use_render_target(main, backbuffer, LoadOp::clear_color(0.1, 0.2, 0.3, 1.0))
        .unwrap();
}

// ============================================================================
// Submission Order And Semaphores
// ============================================================================

#[test]
fn test_chain_waits_on_producers() {
    let mut ctx = TestContext::new();
    let mut graph = RenderGraph::new();
    build_abc(&mut graph);

    let outcome = ctx.run_frame(&mut graph);
    assert_eq!(outcome.pass_count(), 3);
    assert_eq!(ctx.submitted_labels(), ["A", "B", "C"]);

    let submissions = ctx.backend.submissions();
    // B waits on A's edge semaphore, C on B's.
    assert!(submissions[1].waits_on(submissions[0].signals[0]));
    assert!(submissions[2].waits_on(submissions[1].signals[0]));
    assert!(!submissions[2].waits_on(submissions[0].signals[0]));

    // Only the last submission carries the fence.
    assert!(submissions[..2].iter().all(|s| s.fence.is_none()));
    assert!(submissions[2].fence.is_some());
}

#[test]
fn test_other_queue_tails_guard_the_fence() {
    let mut ctx = TestContext::new();
    let mut graph = RenderGraph::new();
    // Two unrelated passes on different queues.
    graph.add_compute_pass("async");
    graph.add_graphics_pass("main");

    ctx.run_frame(&mut graph);
    let submissions = ctx.backend.submissions();
    assert_eq!(submissions.len(), 2);
    assert_eq!(submissions[0].signals.len(), 1);
    assert!(submissions[1].waits_on(submissions[0].signals[0]));
    assert!(submissions[1].fence.is_some());
}

#[rstest]
#[case::single(1)]
#[case::double(2)]
#[case::triple(3)]
fn test_steady_state_reuses_semaphores(#[case] frames_in_flight: usize) {
    let mut ctx = TestContext::with_config(
        DummyBackendConfig::default(),
        SchedulerConfig::new().with_frames_in_flight(frames_in_flight),
    );

    let mut warm = 0;
    for frame in 0..(frames_in_flight * 3) {
        let mut graph = RenderGraph::new();
        build_abc(&mut graph);
        let outcome = ctx.run_frame(&mut graph);
        assert_eq!(outcome.frame_index(), frame as u64);
        if frame + 1 == frames_in_flight {
            warm = ctx.backend.semaphore_count();
        }
    }
    assert!(warm > 0);
    assert_eq!(ctx.backend.semaphore_count(), warm);
}

// ============================================================================
// Frames In Flight
// ============================================================================

#[test]
fn test_begin_frame_blocks_on_oldest_slot() {
    let mut ctx = TestContext::manual(2);
    let mut graph = RenderGraph::new();

    ctx.run_frame(&mut graph);
    ctx.run_frame(&mut graph);
    assert_eq!(ctx.backend.pending_count(), 2);
    assert_eq!(ctx.scheduler.slot_status(0), Some(FenceStatus::Pending));

    let completed = Arc::new(AtomicBool::new(false));
    let worker = {
        let backend = ctx.backend.clone();
        let completed = completed.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            completed.store(true, Ordering::SeqCst);
            backend.complete_next();
        })
    };

    // Frame 2 reuses slot 0 and must wait for frame 0.
    assert_eq!(ctx.scheduler.begin_frame().unwrap(), 2);
    assert!(completed.load(Ordering::SeqCst));
    assert_eq!(ctx.backend.pending_count(), 1);
    assert_eq!(ctx.scheduler.slot_status(1), Some(FenceStatus::Pending));

    ctx.scheduler.end_frame(&ctx.device, &mut graph).unwrap();
    worker.join().unwrap();
}

#[test]
fn test_wait_idle_waits_for_every_slot() {
    let mut ctx = TestContext::manual(3);
    let mut graph = RenderGraph::new();
    for _ in 0..3 {
        ctx.run_frame(&mut graph);
    }
    assert_eq!(ctx.backend.pending_count(), 3);

    let worker = {
        let backend = ctx.backend.clone();
        thread::spawn(move || {
            while backend.complete_next() {
                thread::sleep(Duration::from_millis(5));
            }
        })
    };
    ctx.scheduler.wait_idle().unwrap();
    worker.join().unwrap();

    assert_eq!(ctx.backend.pending_count(), 0);
    for slot in 0..3 {
        assert_eq!(ctx.scheduler.slot_status(slot), Some(FenceStatus::Signaled));
    }
}

// ============================================================================
// Swapchains
// ============================================================================

#[test]
fn test_present_waits_for_last_writer() {
    let mut ctx = TestContext::new();
    let swapchain = ctx.create_swapchain(640, 480);

    let mut graph = RenderGraph::new();
    build_present(&mut graph, &ctx.device, swapchain);
    let outcome = ctx.run_frame(&mut graph);

    assert_eq!(outcome.presents().len(), 1);
    assert_eq!(outcome.presents()[0].status, PresentStatus::Presented);
    // Acquire plus render-finished.
    assert_eq!(outcome.semaphore_count(), 2);

    let submission = &ctx.backend.submissions()[0];
    let present = &ctx.backend.presents()[0];
    assert_eq!(submission.waits.len(), 1);
    assert_eq!(present.waits, submission.signals);
}

#[test]
fn test_out_of_date_at_acquire_skips_frame() {
    let mut ctx = TestContext::new();
    let swapchain = ctx.create_swapchain(640, 480);
    let raw = ctx.device.resolve_swapchain(swapchain).raw();
    ctx.backend.invalidate_swapchain(raw);

    let mut graph = RenderGraph::new();
    build_present(&mut graph, &ctx.device, swapchain);
    let outcome = ctx.run_frame(&mut graph);

    assert!(!outcome.is_submitted());
    assert_eq!(outcome.acquire_failure(), Some(swapchain));
    assert!(outcome.needs_swapchain_recreation());
    assert!(ctx.backend.submissions().is_empty());
    assert!(ctx.backend.presents().is_empty());

    // Recreate and rebuild the graph against the new images.
    ctx.scheduler.wait_idle().unwrap();
    ctx.device.resize_swapchain(swapchain, 800, 600).unwrap();
    let mut graph = RenderGraph::new();
    build_present(&mut graph, &ctx.device, swapchain);
    let outcome = ctx.run_frame(&mut graph);
    assert!(outcome.is_submitted());
    assert_eq!(outcome.presents()[0].status, PresentStatus::Presented);
}

#[test]
fn test_out_of_date_at_present_is_reported() {
    let mut ctx = TestContext::new();
    let swapchain = ctx.create_swapchain(640, 480);
    let raw = ctx.device.resolve_swapchain(swapchain).raw();
    ctx.backend.expire_swapchain_on_present(raw);

    let mut graph = RenderGraph::new();
    build_present(&mut graph, &ctx.device, swapchain);
    let outcome = ctx.run_frame(&mut graph);

    // The work still ran.
    assert!(outcome.is_submitted());
    assert_eq!(ctx.backend.submissions().len(), 1);
    assert_eq!(outcome.presents()[0].status, PresentStatus::OutOfDate);
    assert_eq!(outcome.invalidated_swapchains(), vec![swapchain]);
}

#[test]
fn test_rejected_frame_does_not_block_the_next() {
    let mut ctx = TestContext::new();
    let descriptor = SwapchainDescriptor::new(320, 240, ImageFormat::Bgra8Unorm)
        .with_usage(ImageUsage::COLOR_ATTACHMENT | ImageUsage::SAMPLED);
    let main = ctx.device.create_swapchain(&descriptor).unwrap();
    let mirror = ctx.device.create_swapchain(&descriptor).unwrap();

    // The mirror is only sampled, which is rejected.
    let mut graph = RenderGraph::new();
    build_present(&mut graph, &ctx.device, main);
    let sampled = graph.import_swapchain("mirror", &ctx.device, mirror).unwrap();
    let read = graph.add_graphics_pass("read");
    graph.use_shader_input(read, sampled).unwrap();

    ctx.scheduler.begin_frame().unwrap();
    let result = ctx.scheduler.end_frame(&ctx.device, &mut graph);
    assert!(matches!(result, Err(GraphicsError::InvalidParameter(_))));
    assert!(ctx.backend.presents().is_empty());

    let mut graph = RenderGraph::new();
    build_present(&mut graph, &ctx.device, main);
    let outcome = ctx.run_frame(&mut graph);
    assert_eq!(outcome.frame_index(), 0);
    assert_eq!(outcome.presents()[0].status, PresentStatus::Presented);
}

#[test]
fn test_failed_acquire_drains_earlier_images() {
    let mut ctx = TestContext::new();
    let first = ctx.create_swapchain(320, 240);
    let second = ctx.create_swapchain(320, 240);

    let build = |graph: &mut RenderGraph, device: &Device, swapchains: &[SwapchainHandle]| {
        for (i, &swapchain) in swapchains.iter().enumerate() {
            let target = graph
                .import_swapchain(format!("swapchain_{i}"), device, swapchain)
                .unwrap();
            let pass = graph.add_graphics_pass(format!("draw_{i}"));
            graph.use_render_target(pass, target, LoadOp::DontCare).unwrap();
        }
    };

    // The backend loses the second swapchain behind the device's back, so
    // its acquire fails after the first image was acquired.
    let raw = ctx.device.resolve_swapchain(second).raw();
    ctx.backend.destroy_swapchain(raw);
    let mut graph = RenderGraph::new();
    build(&mut graph, &ctx.device, &[first, second]);
    ctx.scheduler.begin_frame().unwrap();
    let result = ctx.scheduler.end_frame(&ctx.device, &mut graph);
    assert!(matches!(result, Err(GraphicsError::InvalidHandle(_))));

    let mut graph = RenderGraph::new();
    build(&mut graph, &ctx.device, &[first]);
    let outcome = ctx.run_frame(&mut graph);
    assert!(outcome.is_submitted());
    assert_eq!(outcome.presents()[0].status, PresentStatus::Presented);
}

#[test]
fn test_resize_invalidates_old_images() {
    let mut ctx = TestContext::new();
    let swapchain = ctx.create_swapchain(320, 240);
    let old_images = ctx.device.resolve_swapchain(swapchain).images().to_vec();

    ctx.device.resize_swapchain(swapchain, 1280, 720).unwrap();
    for image in &old_images {
        assert!(ctx.device.image(*image).is_none());
    }
    let resized = ctx.device.resolve_swapchain(swapchain);
    assert_eq!(resized.extent().width, 1280);
    assert_eq!(resized.images().len(), old_images.len());

    // A graph built against the new extent renders.
    let mut graph = RenderGraph::new();
    build_present(&mut graph, &ctx.device, swapchain);
    let outcome = ctx.run_frame(&mut graph);
    assert_eq!(outcome.presents()[0].status, PresentStatus::Presented);
}
