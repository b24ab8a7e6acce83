//! Depth and view-space normal pre-pass

use crate::backend::types::*;
use crate::error::{FrameGraphError, FrameGraphResult};
use crate::pipeline::{
    PassData, RenderPassEvent, CAMERA_DEPTH_TEXTURE, CAMERA_NORMALS_TEXTURE, DEPTH_NORMALS_ONLY_TAG,
    DEPTH_NORMALS_TAG,
};
use crate::render_graph::*;
use crate::scene::FrameData;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthNormalsData {
    pub renderer_list: RendererListHandle,
}

impl DepthNormalsData {
    pub(crate) fn record(&self, ctx: &mut RasterContext<'_>) -> FrameGraphResult<()> {
        ctx.draw_renderer_list(self.renderer_list)
    }
}

/// Renders opaque depth into the depth target and normals into colour slot 0
pub struct DepthNormalPrepass {
    event: RenderPassEvent,
    filtering: FilteringSettings,
    shader_tags: Vec<ShaderTagId>,
    depth_texture: Option<TextureHandle>,
    normal_texture: Option<TextureHandle>,
    bind_depth_global: bool,
    bind_normal_global: bool,
}

impl DepthNormalPrepass {
    pub fn new(event: RenderPassEvent, queue_range: RenderQueueRange, layer_mask: LayerMask) -> Self {
        Self {
            event,
            filtering: FilteringSettings::new(queue_range, layer_mask),
            shader_tags: vec![DEPTH_NORMALS_TAG, DEPTH_NORMALS_ONLY_TAG],
            depth_texture: None,
            normal_texture: None,
            bind_depth_global: false,
            bind_normal_global: false,
        }
    }

    /// Replace the shader passes the draw items are rendered with
    pub fn set_shader_tags(&mut self, tags: Vec<ShaderTagId>) {
        self.shader_tags = tags;
    }

    pub fn shader_tags(&self) -> &[ShaderTagId] {
        &self.shader_tags
    }

    pub fn setup(&mut self, depth_texture: TextureHandle, normal_texture: TextureHandle) {
        self.depth_texture = Some(depth_texture);
        self.normal_texture = Some(normal_texture);
    }

    /// Publish the targets as `_CameraDepthTexture` / `_CameraNormalsTexture`
    pub fn set_global_bindings(&mut self, depth: bool, normal: bool) {
        self.bind_depth_global = depth;
        self.bind_normal_global = normal;
    }

    pub fn render(
        &mut self,
        graph: &mut RenderGraph,
        frame: &FrameData,
        normal_texture: TextureHandle,
        depth_texture: TextureHandle,
        set_global_depth: bool,
        set_global_normal: bool,
    ) -> FrameGraphResult<PassId> {
        self.setup(depth_texture, normal_texture);
        self.set_global_bindings(set_global_depth, set_global_normal);
        graph.add_pass(&*self, frame)
    }
}

impl RenderPass for DepthNormalPrepass {
    fn name(&self) -> &str {
        "Depth Normal Prepass"
    }

    fn event(&self) -> RenderPassEvent {
        self.event
    }

    fn declare(&self, builder: &mut PassBuilder<'_>, frame: &FrameData) -> FrameGraphResult<()> {
        let (Some(depth), Some(normal)) = (self.depth_texture, self.normal_texture) else {
            return Err(FrameGraphError::PassNotSetUp {
                pass: self.name().to_string(),
            });
        };

        let renderer_list = builder.use_renderer_list(RendererListDesc {
            culling: frame.culling,
            shader_tags: self.shader_tags.clone(),
            sorting: frame.camera.default_opaque_sort_flags,
            filtering: self.filtering,
            per_object_data: PerObjectData::NONE,
            state_block: None,
            main_light_index: frame.lights.main_light_index,
            kind: RendererListKind::Main,
        });
        builder.use_color_attachment(normal, 0, AccessFlags::Write)?;
        builder.use_depth_attachment(depth, AccessFlags::Write)?;
        if self.bind_depth_global {
            builder.promote_to_global(depth, CAMERA_DEPTH_TEXTURE)?;
        }
        if self.bind_normal_global {
            builder.promote_to_global(normal, CAMERA_NORMALS_TEXTURE)?;
        }
        builder.allow_pass_culling(false);
        builder.set_clear(ClearFlags::ALL, CLEAR_BLACK);

        builder.set_render_func(PassData::DepthNormals(DepthNormalsData { renderer_list }))
    }
}
