//! Depth resolve/copy

use crate::backend::types::*;
use crate::error::{FrameGraphError, FrameGraphResult};
use crate::pipeline::{
    depth_copy_scale_bias, MsaaKeywordState, PassData, RenderPassEvent, CAMERA_DEPTH_ATTACHMENT,
    CAMERA_DEPTH_TEXTURE, ZWRITE,
};
use crate::render_graph::*;
use crate::scene::FrameData;
use glam::Vec2;

/// Construction-time options of a [`CopyDepthPass`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CopyDepthSettings {
    /// Write into a real depth/stencil attachment instead of a colour-encoded target
    pub copy_to_depth: bool,
    pub copy_to_backbuffer: bool,
    /// Sample count override; `None` uses the source's own sample count
    pub msaa_samples: Option<u32>,
    /// Publish the destination as `_CameraDepthTexture`
    pub bind_as_camera_depth: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CopyDepthData {
    pub source: TextureHandle,
    pub material: MaterialHandle,
    pub msaa: MsaaKeywordState,
    pub copy_to_depth: bool,
    pub copy_to_backbuffer: bool,
    pub y_flip: bool,
    pub viewport_scale: Vec2,
    pub pixel_rect: Rect,
}

impl CopyDepthData {
    pub(crate) fn record(&self, ctx: &mut RasterContext<'_>) -> FrameGraphResult<()> {
        for (keyword, enabled) in self.msaa.keywords() {
            ctx.set_keyword(keyword, enabled)?;
        }
        ctx.set_keyword(ShaderKeyword::OutputDepth, self.copy_to_depth)?;

        let scale_bias = depth_copy_scale_bias(self.viewport_scale);
        if self.copy_to_backbuffer {
            ctx.set_viewport(self.pixel_rect);
        }

        ctx.set_material_texture(self.material, CAMERA_DEPTH_ATTACHMENT, self.source)?;
        ctx.set_material_float(
            self.material,
            ZWRITE,
            if self.copy_to_depth { 1.0 } else { 0.0 },
        );
        ctx.blit(self.source, scale_bias, self.material, 0)
    }
}

/// Copy depth pass
pub struct CopyDepthPass {
    event: RenderPassEvent,
    material: MaterialHandle,
    settings: CopyDepthSettings,
    source: Option<TextureHandle>,
    destination: Option<TextureHandle>,
}

impl CopyDepthPass {
    pub fn new(event: RenderPassEvent, material: MaterialHandle, settings: CopyDepthSettings) -> Self {
        Self {
            event,
            material,
            settings,
            source: None,
            destination: None,
        }
    }

    pub fn settings(&self) -> &CopyDepthSettings {
        &self.settings
    }

    pub fn setup(&mut self, destination: TextureHandle, source: TextureHandle) {
        self.destination = Some(destination);
        self.source = Some(source);
    }

    pub fn render(
        &mut self,
        graph: &mut RenderGraph,
        frame: &FrameData,
        destination: TextureHandle,
        source: TextureHandle,
    ) -> FrameGraphResult<PassId> {
        self.setup(destination, source);
        graph.add_pass(&*self, frame)
    }
}

impl RenderPass for CopyDepthPass {
    fn name(&self) -> &str {
        "Copy Depth"
    }

    fn event(&self) -> RenderPassEvent {
        self.event
    }

    fn declare(&self, builder: &mut PassBuilder<'_>, frame: &FrameData) -> FrameGraphResult<()> {
        let (Some(source), Some(destination)) = (self.source, self.destination) else {
            return Err(FrameGraphError::PassNotSetUp {
                pass: self.name().to_string(),
            });
        };
        let settings = &self.settings;

        builder.use_texture(source, AccessFlags::Read)?;
        if settings.copy_to_depth {
            builder.use_depth_attachment(destination, AccessFlags::Write)?;
        } else {
            builder.use_color_attachment(destination, 0, AccessFlags::Write)?;
        }
        if settings.bind_as_camera_depth {
            builder.promote_to_global(destination, CAMERA_DEPTH_TEXTURE)?;
        }
        builder.allow_global_state_modification(true);
        builder.allow_pass_culling(false);
        builder.set_clear(ClearFlags::ALL, CLEAR_BLACK);

        let source_desc = builder.texture_descriptor(source)?;
        let samples = settings.msaa_samples.unwrap_or(source_desc.sample_count);
        let msaa = MsaaKeywordState::from_sample_count(samples);
        let viewport_scale = frame.camera.viewport_scale(source_desc);
        let y_flip = frame.camera.is_handle_y_flipped(builder.is_backbuffer(source)?)
            && settings.copy_to_backbuffer;
        log::trace!("Copy depth: {samples} samples -> {msaa:?}, y flip {y_flip}");

        builder.set_render_func(PassData::CopyDepth(CopyDepthData {
            source,
            material: self.material,
            msaa,
            copy_to_depth: settings.copy_to_depth,
            copy_to_backbuffer: settings.copy_to_backbuffer,
            y_flip,
            viewport_scale,
            pixel_rect: frame.camera.pixel_rect,
        }))
    }
}
