mod common;

use common::*;
use framegraph_passes::backend::{LayerMask, LoadOp, RecordedCommand, RenderQueueRange, StoreOp};
use framegraph_passes::pipeline::{
    CopyColorData, CopyDepthData, MsaaKeywordState, CAMERA_DEPTH_TEXTURE,
};
use framegraph_passes::*;
use glam::Vec2;
use rstest::rstest;

fn copy(source: TextureHandle, destination: TextureHandle) -> CopyColorPass {
    let mut pass = CopyColorPass::new(
        RenderPassEvent::AfterRenderingOpaques,
        copy_material(),
        sampling_material(),
        Downsampling::None,
    )
    .with_global_binding(false);
    pass.setup(source, destination, Downsampling::None);
    pass
}

fn depth_prepass(depth: TextureHandle) -> DepthOnlyPrepass {
    let mut pass = DepthOnlyPrepass::new(
        RenderPassEvent::BeforeRenderingPrePasses,
        RenderQueueRange::opaque(),
        LayerMask::ALL,
    );
    pass.setup(depth);
    pass
}

/// camera -> t1 -> t2 -> t3 -> output, every link a straight colour copy
struct Chain {
    transients: [TextureHandle; 3],
    passes: [PassId; 4],
}

fn build_chain(graph: &mut RenderGraph, frame: &FrameData) -> Chain {
    let camera = graph
        .import_texture(color_desc("camera", 64, 64), external(1))
        .unwrap();
    let output = graph
        .import_texture(color_desc("output", 64, 64), external(2))
        .unwrap();
    let t1 = graph.create_texture(color_desc("t1", 64, 64)).unwrap();
    let t2 = graph.create_texture(color_desc("t2", 64, 64)).unwrap();
    let t3 = graph.create_texture(color_desc("t3", 64, 64)).unwrap();

    let passes = [
        graph.add_pass(&copy(camera, t1), frame).unwrap(),
        graph.add_pass(&copy(t1, t2), frame).unwrap(),
        graph.add_pass(&copy(t2, t3), frame).unwrap(),
        graph.add_pass(&copy(t3, output), frame).unwrap(),
    ];
    Chain {
        transients: [t1, t2, t3],
        passes,
    }
}

#[test]
fn test_read_of_unwritten_transient_fails_compile() {
    init_logging();
    let mut graph = RenderGraph::new();
    let frame = frame(64, 64);
    let never_written = graph.create_texture(color_desc("scratch", 64, 64)).unwrap();
    let output = graph
        .import_texture(color_desc("output", 64, 64), external(1))
        .unwrap();
    graph.add_pass(&copy(never_written, output), &frame).unwrap();

    let err = graph.compile().unwrap_err();
    assert!(
        matches!(&err, FrameGraphError::UnwrittenRead { texture, .. } if texture == "scratch"),
        "unexpected error: {err}"
    );
}

#[test]
fn test_second_plain_write_is_rejected() {
    init_logging();
    let mut graph = RenderGraph::new();
    let frame = frame(64, 64);
    let camera = graph
        .import_texture(color_desc("camera", 64, 64), external(1))
        .unwrap();
    let target = graph.create_texture(color_desc("target", 64, 64)).unwrap();
    graph.add_pass(&copy(camera, target), &frame).unwrap();
    graph.add_pass(&copy(camera, target), &frame).unwrap();

    let err = graph.compile().unwrap_err();
    assert!(matches!(err, FrameGraphError::DuplicateWrite { .. }));
}

#[test]
fn test_work_touching_undeclared_texture_fails_compile() {
    init_logging();
    let mut graph = RenderGraph::new();
    let camera = graph
        .import_texture(color_desc("camera", 64, 64), external(1))
        .unwrap();
    let target = graph
        .import_texture(color_desc("target", 64, 64), external(2))
        .unwrap();

    graph
        .add_raster_pass("sneaky copy", |builder| {
            builder.use_color_attachment(target, 0, AccessFlags::Write)?;
            builder.set_render_func(PassData::CopyColor(CopyColorData {
                source: camera,
                downsampling: Downsampling::None,
                copy_material: copy_material(),
                sampling_material: sampling_material(),
                viewport_scale: Vec2::ONE,
            }))
        })
        .unwrap();

    let err = graph.compile().unwrap_err();
    assert!(matches!(
        &err,
        FrameGraphError::UndeclaredAccess { pass, resource }
            if pass == "sneaky copy" && resource.contains("camera")
    ));
}

#[test]
fn test_pass_without_work_is_rejected() {
    let mut graph = RenderGraph::new();
    let err = graph
        .add_raster_pass("empty", |_| Ok(()))
        .unwrap_err();
    assert!(matches!(err, FrameGraphError::MissingRenderFunc { .. }));
    assert_eq!(graph.pass_count(), 0);
}

#[test]
fn test_pass_used_before_setup_is_rejected() {
    let mut graph = RenderGraph::new();
    let pass = DrawObjectsPass::new(
        RenderPassEvent::BeforeRenderingOpaques,
        DrawObjectsSettings::default(),
    );
    let err = graph.add_pass(&pass, &frame(64, 64)).unwrap_err();
    assert!(matches!(err, FrameGraphError::PassNotSetUp { .. }));
}

#[rstest]
#[case::culling_enabled(true, 1)]
#[case::culling_disabled(false, 2)]
fn test_unobserved_pass_is_culled(#[case] pass_culling: bool, #[case] expected_live: usize) {
    init_logging();
    let mut graph = RenderGraph::with_config(FrameGraphConfig {
        pass_culling,
        ..Default::default()
    });
    let frame = frame(64, 64);
    let camera = graph
        .import_texture(color_desc("camera", 64, 64), external(1))
        .unwrap();
    let scratch = graph.create_texture(color_desc("scratch", 64, 64)).unwrap();
    let depth = graph.create_texture(depth_desc("depth", 64, 64)).unwrap();

    let unobserved = graph.add_pass(&copy(camera, scratch), &frame).unwrap();
    let prepass = graph.add_pass(&depth_prepass(depth), &frame).unwrap();

    let compiled = graph.compile().unwrap();
    assert_eq!(compiled.pass_order.len(), expected_live);
    assert_eq!(compiled.is_culled(unobserved), pass_culling);
    // Culling is opted out of by the prepass itself
    assert!(!compiled.is_culled(prepass));
}

#[test]
fn test_global_promotion_alone_does_not_keep_pass_alive() {
    let mut graph = RenderGraph::new();
    let frame = frame(64, 64);
    let camera = graph
        .import_texture(color_desc("camera", 64, 64), external(1))
        .unwrap();
    let mut pass = CopyColorPass::new(
        RenderPassEvent::AfterRenderingSkybox,
        copy_material(),
        sampling_material(),
        Downsampling::None,
    );
    pass.render(&mut graph, &frame, camera, Downsampling::HalfBilinear)
        .unwrap();

    let compiled = graph.compile().unwrap();
    assert!(compiled.pass_order.is_empty());
    assert_eq!(compiled.culled_passes.len(), 1);
}

#[test]
fn test_chain_keeps_declaration_order_and_lifetimes() {
    init_logging();
    let mut graph = RenderGraph::new();
    let frame = frame(64, 64);
    let chain = build_chain(&mut graph, &frame);

    let compiled = graph.compile().unwrap();
    assert_eq!(compiled.pass_order, chain.passes.to_vec());
    assert!(compiled.culled_passes.is_empty());

    let [t1, t2, t3] = chain.transients;
    assert!(compiled.is_resource_alive(t1, 0));
    assert!(compiled.is_resource_alive(t1, 1));
    assert!(!compiled.is_resource_alive(t1, 2));
    assert!(compiled.is_resource_alive(t2, 2));
    assert!(compiled.is_resource_alive(t3, 3));
    // Imported textures are not tracked
    assert_eq!(compiled.resource_lifetimes.len(), 3);
}

#[rstest]
#[case::aliasing(true, 2)]
#[case::no_aliasing(false, 3)]
fn test_disjoint_transients_share_memory(#[case] memory_aliasing: bool, #[case] expected: usize) {
    init_logging();
    let mut graph = RenderGraph::with_config(FrameGraphConfig {
        memory_aliasing,
        ..Default::default()
    });
    let frame = frame(64, 64);
    let chain = build_chain(&mut graph, &frame);

    let compiled = graph.compile().unwrap();
    assert_eq!(compiled.physical_texture_count(), expected);

    let [t1, t2, t3] = chain.transients;
    assert_ne!(compiled.physical_slot(t1), compiled.physical_slot(t2));
    assert_eq!(
        compiled.physical_slot(t1) == compiled.physical_slot(t3),
        memory_aliasing
    );

    let mut backend = RecordingBackend::new();
    let mut executor = RenderGraphExecutor::new();
    executor.execute(&mut graph, &compiled, &mut backend).unwrap();
    assert_eq!(backend.created_textures().len(), expected);
    assert_eq!(executor.pool().free_count(), expected);
    assert_eq!(executor.pool().in_use_count(), 0);
}

#[test]
fn test_promoted_texture_outlives_its_last_declared_use() {
    init_logging();
    let mut graph = RenderGraph::new();
    let frame = frame(64, 64);
    let depth = graph.create_texture(depth_desc("depth", 64, 64)).unwrap();
    let normals = graph.create_texture(color_desc("normals", 64, 64)).unwrap();
    let late_depth = graph.create_texture(depth_desc("late depth", 64, 64)).unwrap();

    let mut depth_normals = DepthNormalPrepass::new(
        RenderPassEvent::BeforeRenderingPrePasses,
        RenderQueueRange::opaque(),
        LayerMask::ALL,
    );
    depth_normals.setup(depth, normals);
    depth_normals.set_global_bindings(true, true);
    graph.add_pass(&depth_normals, &frame).unwrap();
    graph.add_pass(&depth_prepass(late_depth), &frame).unwrap();

    let compiled = graph.compile().unwrap();
    assert_eq!(compiled.pass_order.len(), 2);
    // Sampled through globals for the rest of the frame
    assert!(compiled.is_resource_alive(depth, 1));
    assert!(compiled.is_resource_alive(normals, 1));
    assert_ne!(compiled.physical_slot(depth), compiled.physical_slot(late_depth));
    assert_eq!(compiled.physical_texture_count(), 3);

    let mut backend = RecordingBackend::new();
    let executed = RenderGraphExecutor::new()
        .execute(&mut graph, &compiled, &mut backend)
        .unwrap();
    let published = executed
        .globals
        .texture(CAMERA_DEPTH_TEXTURE)
        .expect("depth published");
    let written_later = render_passes(backend.commands())
        .iter()
        .find(|p| p.label == "Depth Prepass")
        .and_then(|p| p.depth_stencil_attachment.as_ref())
        .map(|a| a.texture)
        .expect("late depth bound");
    assert_ne!(published, written_later);
    assert_eq!(backend.created_textures().len(), 3);
}

#[test]
fn test_handles_from_another_registry_are_rejected() {
    let mut graph = RenderGraph::new();
    let foreign = graph.create_texture(color_desc("foreign", 64, 64)).unwrap();

    let mut ctx = ImmediateContext::new();
    let own = ctx
        .import_texture(color_desc("own", 64, 64), external(7))
        .unwrap();
    assert_eq!(own.index(), foreign.index());
    assert_eq!(own.frame(), foreign.frame());

    assert!(!ctx.textures().is_valid(foreign));
    assert!(matches!(
        ctx.textures().resolve(foreign),
        Err(FrameGraphError::StaleHandle { .. })
    ));

    let mut other = RenderGraph::new();
    let camera = other
        .import_texture(color_desc("camera", 64, 64), external(1))
        .unwrap();
    let err = other.add_pass(&copy(camera, foreign), &frame(64, 64)).unwrap_err();
    assert!(matches!(err, FrameGraphError::StaleHandle { .. }));
}

#[test]
fn test_pool_recycles_textures_across_frames() {
    init_logging();
    let mut graph = RenderGraph::new();
    let mut backend = RecordingBackend::new();
    let mut executor = RenderGraphExecutor::new();

    for _ in 0..3 {
        let frame = frame(64, 64);
        build_chain(&mut graph, &frame);
        let compiled = graph.compile().unwrap();
        executor.execute(&mut graph, &compiled, &mut backend).unwrap();
    }
    assert_eq!(backend.created_textures().len(), 2);

    // Two idle frames later everything is released
    assert_eq!(executor.pool().trim(1, &mut backend), 0);
    assert_eq!(executor.pool().trim(1, &mut backend), 2);
    assert_eq!(backend.live_texture_count(), 0);
}

#[test]
fn test_store_ops_follow_later_use() {
    init_logging();
    let mut graph = RenderGraph::new();
    let frame = frame(64, 64);
    let chain = build_chain(&mut graph, &frame);
    let depth = graph.create_texture(depth_desc("depth", 64, 64)).unwrap();
    let prepass = graph.add_pass(&depth_prepass(depth), &frame).unwrap();

    let compiled = graph.compile().unwrap();
    let [t1, ..] = chain.transients;
    assert_eq!(compiled.store_op(chain.passes[0], t1), Some(StoreOp::Store));
    assert_eq!(compiled.store_op(prepass, depth), Some(StoreOp::Discard));

    let mut backend = RecordingBackend::new();
    RenderGraphExecutor::new()
        .execute(&mut graph, &compiled, &mut backend)
        .unwrap();

    let passes = render_passes(backend.commands());
    let depth_pass = passes
        .iter()
        .find(|p| p.label == "Depth Prepass")
        .expect("depth prepass recorded");
    let attachment = depth_pass.depth_stencil_attachment.as_ref().unwrap();
    assert_eq!(attachment.depth_store_op, StoreOp::Discard);
    assert!(matches!(attachment.depth_load_op, LoadOp::Clear(_)));
    assert_eq!(attachment.depth_clear_value, 1.0);

    // Imported output of the last copy is kept, its contents are not loaded
    let last_copy = passes[3];
    assert_eq!(last_copy.color_attachments[0].store_op, StoreOp::Store);
    assert_eq!(last_copy.color_attachments[0].load_op, LoadOp::DontCare);
}

#[test]
fn test_execution_records_passes_in_order() {
    init_logging();
    let mut graph = RenderGraph::new();
    let frame = frame(64, 64);
    build_chain(&mut graph, &frame);
    let compiled = graph.compile().unwrap();

    let mut backend = RecordingBackend::new();
    let executed = RenderGraphExecutor::new()
        .execute(&mut graph, &compiled, &mut backend)
        .unwrap();

    assert_eq!(executed.executed_passes, vec!["Copy Color"; 4]);
    let commands = backend.commands();
    assert_eq!(debug_groups(commands).len(), 4);
    let blits: Vec<_> = commands
        .iter()
        .filter(|c| matches!(c, RecordedCommand::Blit { .. }))
        .collect();
    assert_eq!(blits.len(), 4);
    assert!(matches!(
        blits[0],
        RecordedCommand::Blit { source, .. } if *source == external(1)
    ));
}

#[test]
fn test_handles_expire_with_the_frame() {
    init_logging();
    let mut graph = RenderGraph::new();
    let frame = frame(64, 64);
    let depth = graph.create_texture(depth_desc("depth", 64, 64)).unwrap();
    graph.add_pass(&depth_prepass(depth), &frame).unwrap();
    let compiled = graph.compile().unwrap();

    let mut backend = RecordingBackend::new();
    RenderGraphExecutor::new()
        .execute(&mut graph, &compiled, &mut backend)
        .unwrap();

    assert!(!graph.is_valid(depth));
    assert_eq!(graph.pass_count(), 0);
    let err = graph.add_pass(&depth_prepass(depth), &frame).unwrap_err();
    assert!(matches!(err, FrameGraphError::StaleHandle { .. }));
}

#[test]
fn test_compiled_graph_from_previous_frame_is_refused() {
    let mut graph = RenderGraph::new();
    let frame = frame(64, 64);
    let depth = graph.create_texture(depth_desc("depth", 64, 64)).unwrap();
    graph.add_pass(&depth_prepass(depth), &frame).unwrap();
    let compiled = graph.compile().unwrap();
    graph.begin_frame();

    let mut backend = RecordingBackend::new();
    let err = RenderGraphExecutor::new()
        .execute(&mut graph, &compiled, &mut backend)
        .unwrap_err();
    assert!(matches!(err, FrameGraphError::StaleCompilation { .. }));
    assert!(backend.commands().is_empty());
}

#[test]
fn test_failed_pass_discards_the_frame() {
    init_logging();
    let mut graph = RenderGraph::new();
    let depth = graph
        .import_texture(depth_desc("depth", 64, 64), external(1))
        .unwrap();
    let target = graph
        .import_texture(color_desc("target", 64, 64), external(2))
        .unwrap();

    // Toggles keywords without permission to touch global state
    graph
        .add_raster_pass("rogue depth copy", |builder| {
            builder.use_texture(depth, AccessFlags::Read)?;
            builder.use_color_attachment(target, 0, AccessFlags::Write)?;
            builder.set_render_func(PassData::CopyDepth(CopyDepthData {
                source: depth,
                material: copy_depth_material(),
                msaa: MsaaKeywordState::Off,
                copy_to_depth: false,
                copy_to_backbuffer: false,
                y_flip: false,
                viewport_scale: Vec2::ONE,
                pixel_rect: framegraph_passes::backend::Rect::new(0.0, 0.0, 64.0, 64.0),
            }))
        })
        .unwrap();
    let compiled = graph.compile().unwrap();

    let mut backend = InspectingBackend::default();
    let err = RenderGraphExecutor::new()
        .execute(&mut graph, &compiled, &mut backend)
        .unwrap_err();
    assert!(matches!(err, FrameGraphError::UndeclaredGlobalState { .. }));
    assert!(backend.inner.commands().is_empty());
    assert!(!graph.is_valid(depth));

    // Render pass and debug group were closed before the discard
    let discarded = &backend.discarded;
    assert_eq!(debug_groups(discarded), vec!["rogue depth copy"]);
    let opened = render_passes(discarded).len();
    let closed = discarded
        .iter()
        .filter(|c| matches!(c, RecordedCommand::EndRenderPass))
        .count();
    assert_eq!((opened, closed), (1, 1));
    assert_eq!(backend.discarded.last(), Some(&RecordedCommand::PopDebugGroup));
}

#[test]
fn test_backend_failure_surfaces_unchanged() {
    init_logging();
    let mut graph = RenderGraph::new();
    let frame = frame(64, 64);
    let depth = graph.create_texture(depth_desc("depth", 64, 64)).unwrap();
    graph.add_pass(&depth_prepass(depth), &frame).unwrap();
    let compiled = graph.compile().unwrap();

    let mut backend = InspectingBackend::failing_allocations();
    let err = RenderGraphExecutor::new()
        .execute(&mut graph, &compiled, &mut backend)
        .unwrap_err();
    assert!(matches!(
        err,
        FrameGraphError::Backend(BackendError::OutOfMemory)
    ));
    assert!(backend.inner.commands().is_empty());
}

/// Recording backend that keeps what it was told to discard and can refuse
/// texture allocations
#[derive(Default)]
struct InspectingBackend {
    inner: RecordingBackend,
    fail_allocations: bool,
    discarded: Vec<RecordedCommand>,
}

impl InspectingBackend {
    fn failing_allocations() -> Self {
        Self {
            fail_allocations: true,
            ..Default::default()
        }
    }
}

impl CommandRecorder for InspectingBackend {
    fn begin_render_pass(&mut self, desc: &framegraph_passes::backend::RenderPassDescriptor) {
        self.inner.begin_render_pass(desc)
    }
    fn end_render_pass(&mut self) {
        self.inner.end_render_pass()
    }
    fn push_debug_group(&mut self, label: &str) {
        self.inner.push_debug_group(label)
    }
    fn pop_debug_group(&mut self) {
        self.inner.pop_debug_group()
    }
    fn set_viewport(&mut self, rect: framegraph_passes::backend::Rect) {
        self.inner.set_viewport(rect)
    }
    fn set_keyword(&mut self, keyword: framegraph_passes::backend::ShaderKeyword, enabled: bool) {
        self.inner.set_keyword(keyword, enabled)
    }
    fn set_global_texture(&mut self, name: &'static str, texture: BackendTexture) {
        self.inner.set_global_texture(name, texture)
    }
    fn set_global_vector(&mut self, name: &'static str, value: glam::Vec4) {
        self.inner.set_global_vector(name, value)
    }
    fn set_material_float(&mut self, material: MaterialHandle, name: &'static str, value: f32) {
        self.inner.set_material_float(material, name, value)
    }
    fn set_material_texture(
        &mut self,
        material: MaterialHandle,
        name: &'static str,
        texture: BackendTexture,
    ) {
        self.inner.set_material_texture(material, name, texture)
    }
    fn blit_texture(
        &mut self,
        source: BackendTexture,
        scale_bias: glam::Vec4,
        material: MaterialHandle,
        technique: u32,
    ) {
        self.inner.blit_texture(source, scale_bias, material, technique)
    }
    fn draw_renderer_list(&mut self, list: &framegraph_passes::backend::RendererList) {
        self.inner.draw_renderer_list(list)
    }
    fn discard(&mut self) {
        self.discarded = self.inner.take_commands();
    }
}

impl TextureAllocator for InspectingBackend {
    fn create_texture(&mut self, desc: &TextureDescriptor) -> Result<BackendTexture, BackendError> {
        if self.fail_allocations {
            return Err(BackendError::OutOfMemory);
        }
        self.inner.create_texture(desc)
    }

    fn destroy_texture(&mut self, texture: BackendTexture) {
        self.inner.destroy_texture(texture)
    }
}

impl DrawItemQuery for InspectingBackend {
    fn create_renderer_list(
        &mut self,
        desc: &framegraph_passes::backend::RendererListDesc,
    ) -> Result<framegraph_passes::backend::RendererList, BackendError> {
        self.inner.create_renderer_list(desc)
    }
}
