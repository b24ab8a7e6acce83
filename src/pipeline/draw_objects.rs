//! Main opaque/transparent object pass

use crate::backend::types::*;
use crate::error::{FrameGraphError, FrameGraphResult};
use crate::pipeline::{
    compose_render_state, draw_objects_scale_bias, PassData, RenderPassEvent,
    DRAW_OBJECTS_PASS_DATA, SCALE_BIAS, SRP_DEFAULT_UNLIT_TAG, UNIVERSAL_FORWARD_ONLY_TAG,
    UNIVERSAL_FORWARD_TAG,
};
use crate::render_graph::*;
use crate::scene::FrameData;
use glam::Vec4;

/// Construction-time options of a [`DrawObjectsPass`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawObjectsSettings {
    pub is_opaque: bool,
    /// Depth already holds the final opaque depth: test Equal, never write
    pub use_depth_priming: bool,
    /// Stencil test applied to every draw item; ignored unless enabled
    pub stencil: Option<StencilState>,
    pub filtering: FilteringSettings,
    pub per_object_data: PerObjectData,
}

impl Default for DrawObjectsSettings {
    fn default() -> Self {
        Self {
            is_opaque: true,
            use_depth_priming: false,
            stencil: None,
            filtering: FilteringSettings::new(RenderQueueRange::opaque(), LayerMask::ALL),
            per_object_data: PerObjectData::LIGHT_PROBE
                | PerObjectData::REFLECTION_PROBES
                | PerObjectData::LIGHTMAPS
                | PerObjectData::LIGHT_INDICES,
        }
    }
}

impl DrawObjectsSettings {
    pub fn transparent() -> Self {
        Self {
            is_opaque: false,
            filtering: FilteringSettings::new(RenderQueueRange::transparent(), LayerMask::ALL),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawObjectsData {
    pub renderer_list: RendererListHandle,
    pub error_renderer_list: RendererListHandle,
    pub is_opaque: bool,
    pub y_flip: bool,
}

impl DrawObjectsData {
    pub(crate) fn record(&self, ctx: &mut RasterContext<'_>) -> FrameGraphResult<()> {
        let pass_data = Vec4::new(0.0, 0.0, 0.0, if self.is_opaque { 1.0 } else { 0.0 });
        ctx.set_global_vector(DRAW_OBJECTS_PASS_DATA, pass_data)?;
        ctx.set_global_vector(SCALE_BIAS, draw_objects_scale_bias(self.y_flip))?;

        // Error geometry goes first so valid geometry is drawn over it
        if !ctx.renderer_list(self.error_renderer_list)?.is_empty() {
            log::warn!(
                "Pass '{}' has draw items with unresolvable shaders, drawing error fallback",
                ctx.pass_name()
            );
            ctx.draw_renderer_list(self.error_renderer_list)?;
        }
        ctx.draw_renderer_list(self.renderer_list)
    }
}

/// Submits the opaque or transparent draw-item set into the camera targets
pub struct DrawObjectsPass {
    event: RenderPassEvent,
    settings: DrawObjectsSettings,
    render_state: RenderStateBlock,
    shader_tags: Vec<ShaderTagId>,
    color_texture: Option<TextureHandle>,
    depth_texture: Option<TextureHandle>,
}

impl DrawObjectsPass {
    pub fn new(event: RenderPassEvent, settings: DrawObjectsSettings) -> Self {
        Self {
            event,
            settings,
            render_state: compose_render_state(settings.stencil, settings.use_depth_priming),
            shader_tags: vec![
                SRP_DEFAULT_UNLIT_TAG,
                UNIVERSAL_FORWARD_TAG,
                UNIVERSAL_FORWARD_ONLY_TAG,
            ],
            color_texture: None,
            depth_texture: None,
        }
    }

    pub fn settings(&self) -> &DrawObjectsSettings {
        &self.settings
    }

    pub fn render_state(&self) -> &RenderStateBlock {
        &self.render_state
    }

    pub fn setup(&mut self, color_texture: TextureHandle, depth_texture: TextureHandle) {
        self.color_texture = Some(color_texture);
        self.depth_texture = Some(depth_texture);
    }

    pub fn render(
        &mut self,
        graph: &mut RenderGraph,
        frame: &FrameData,
        color_texture: TextureHandle,
        depth_texture: TextureHandle,
    ) -> FrameGraphResult<PassId> {
        self.setup(color_texture, depth_texture);
        graph.add_pass(&*self, frame)
    }

    fn renderer_list_desc(&self, frame: &FrameData) -> RendererListDesc {
        let sorting = if self.settings.is_opaque {
            SortingCriteria::COMMON_OPAQUE
        } else {
            SortingCriteria::COMMON_TRANSPARENT
        };
        RendererListDesc {
            culling: frame.culling,
            shader_tags: self.shader_tags.clone(),
            sorting,
            filtering: self.settings.filtering,
            per_object_data: self.settings.per_object_data,
            state_block: (!self.render_state.is_empty()).then_some(self.render_state),
            main_light_index: frame.lights.main_light_index,
            kind: RendererListKind::Main,
        }
    }
}

impl RenderPass for DrawObjectsPass {
    fn name(&self) -> &str {
        if self.settings.is_opaque {
            "Draw Opaque Objects"
        } else {
            "Draw Transparent Objects"
        }
    }

    fn event(&self) -> RenderPassEvent {
        self.event
    }

    fn declare(&self, builder: &mut PassBuilder<'_>, frame: &FrameData) -> FrameGraphResult<()> {
        let (Some(color), Some(depth)) = (self.color_texture, self.depth_texture) else {
            return Err(FrameGraphError::PassNotSetUp {
                pass: self.name().to_string(),
            });
        };

        let desc = self.renderer_list_desc(frame);
        let error_renderer_list = builder.use_renderer_list(desc.error_fallback());
        let renderer_list = builder.use_renderer_list(desc);
        builder.use_color_attachment(color, 0, AccessFlags::ReadWrite)?;
        builder.use_depth_attachment(depth, AccessFlags::ReadWrite)?;
        builder.allow_global_state_modification(true);

        let y_flip = frame.camera.is_handle_y_flipped(builder.is_backbuffer(color)?);
        builder.set_render_func(PassData::DrawObjects(DrawObjectsData {
            renderer_list,
            error_renderer_list,
            is_opaque: self.settings.is_opaque,
            y_flip,
        }))
    }
}
