//! Depth-only pre-pass

use crate::backend::types::*;
use crate::error::{FrameGraphError, FrameGraphResult};
use crate::pipeline::{PassData, RenderPassEvent, DEPTH_ONLY_TAG};
use crate::render_graph::*;
use crate::scene::FrameData;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthOnlyData {
    pub renderer_list: RendererListHandle,
}

impl DepthOnlyData {
    pub(crate) fn record(&self, ctx: &mut RasterContext<'_>) -> FrameGraphResult<()> {
        ctx.draw_renderer_list(self.renderer_list)
    }
}

/// Depth pre-pass
pub struct DepthOnlyPrepass {
    event: RenderPassEvent,
    filtering: FilteringSettings,
    depth_texture: Option<TextureHandle>,
}

impl DepthOnlyPrepass {
    pub fn new(event: RenderPassEvent, queue_range: RenderQueueRange, layer_mask: LayerMask) -> Self {
        Self {
            event,
            filtering: FilteringSettings::new(queue_range, layer_mask),
            depth_texture: None,
        }
    }

    pub fn setup(&mut self, depth_texture: TextureHandle) {
        self.depth_texture = Some(depth_texture);
    }

    pub fn depth_texture(&self) -> Option<TextureHandle> {
        self.depth_texture
    }

    pub fn render(
        &mut self,
        graph: &mut RenderGraph,
        frame: &FrameData,
        depth_texture: TextureHandle,
    ) -> FrameGraphResult<PassId> {
        self.setup(depth_texture);
        graph.add_pass(&*self, frame)
    }
}

impl RenderPass for DepthOnlyPrepass {
    fn name(&self) -> &str {
        "Depth Prepass"
    }

    fn event(&self) -> RenderPassEvent {
        self.event
    }

    fn declare(&self, builder: &mut PassBuilder<'_>, frame: &FrameData) -> FrameGraphResult<()> {
        let Some(depth) = self.depth_texture else {
            return Err(FrameGraphError::PassNotSetUp {
                pass: self.name().to_string(),
            });
        };

        let renderer_list = builder.use_renderer_list(RendererListDesc {
            culling: frame.culling,
            shader_tags: vec![DEPTH_ONLY_TAG],
            sorting: frame.camera.default_opaque_sort_flags,
            filtering: self.filtering,
            per_object_data: PerObjectData::NONE,
            state_block: None,
            main_light_index: frame.lights.main_light_index,
            kind: RendererListKind::Main,
        });
        builder.use_depth_attachment(depth, AccessFlags::Write)?;
        // Read through global bindings the scheduler cannot see
        builder.allow_pass_culling(false);
        builder.allow_global_state_modification(true);
        builder.set_clear(ClearFlags::ALL, CLEAR_BLACK);

        builder.set_render_func(PassData::DepthOnly(DepthOnlyData { renderer_list }))
    }
}
