//! Copy of the camera colour for later sampling

use crate::backend::types::*;
use crate::error::{FrameGraphError, FrameGraphResult};
use crate::pipeline::{PassData, RenderPassEvent, CAMERA_OPAQUE_TEXTURE, SAMPLE_OFFSET};
use crate::render_graph::*;
use crate::scene::FrameData;
use glam::{Vec2, Vec4};

/// Resolution reduction applied by the colour copy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Downsampling {
    #[default]
    None,
    HalfBilinear,
    QuarterBox,
    QuarterBilinear,
}

impl Downsampling {
    pub fn divisor(self) -> u32 {
        match self {
            Self::None => 1,
            Self::HalfBilinear => 2,
            Self::QuarterBox | Self::QuarterBilinear => 4,
        }
    }
}

/// Derive the copy target from the source descriptor.
///
/// Single-sampled, colour only, divided per `method` and never smaller than a
/// pixel. Filtering is point for a straight copy and bilinear otherwise.
pub fn destination_descriptor(method: Downsampling, source: &TextureDescriptor) -> TextureDescriptor {
    let divisor = method.divisor();
    let mut desc = source.clone();
    desc.sample_count = 1;
    desc.depth_stencil_format = None;
    desc.width = (source.width / divisor).max(1);
    desc.height = (source.height / divisor).max(1);
    desc.filter_mode = if method == Downsampling::None {
        FilterMode::Point
    } else {
        FilterMode::Bilinear
    };
    desc
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CopyColorData {
    pub source: TextureHandle,
    pub downsampling: Downsampling,
    pub copy_material: MaterialHandle,
    pub sampling_material: MaterialHandle,
    pub viewport_scale: Vec2,
}

impl CopyColorData {
    pub(crate) fn record(&self, ctx: &mut RasterContext<'_>) -> FrameGraphResult<()> {
        let scale_bias = Vec4::new(self.viewport_scale.x, self.viewport_scale.y, 0.0, 0.0);
        match self.downsampling {
            Downsampling::None | Downsampling::HalfBilinear => {
                ctx.blit(self.source, scale_bias, self.copy_material, 0)
            }
            Downsampling::QuarterBox => {
                ctx.set_material_float(self.sampling_material, SAMPLE_OFFSET, 2.0);
                ctx.blit(self.source, scale_bias, self.sampling_material, 0)
            }
            Downsampling::QuarterBilinear => ctx.blit(self.source, scale_bias, self.copy_material, 1),
        }
    }
}

/// Copy color pass
pub struct CopyColorPass {
    event: RenderPassEvent,
    copy_material: MaterialHandle,
    sampling_material: MaterialHandle,
    downsampling: Downsampling,
    source: Option<TextureHandle>,
    destination: Option<TextureHandle>,
    bind_global: bool,
}

impl CopyColorPass {
    pub fn new(
        event: RenderPassEvent,
        copy_material: MaterialHandle,
        sampling_material: MaterialHandle,
        downsampling: Downsampling,
    ) -> Self {
        Self {
            event,
            copy_material,
            sampling_material,
            downsampling,
            source: None,
            destination: None,
            bind_global: true,
        }
    }

    /// Publish the destination as `_CameraOpaqueTexture` (on by default)
    pub fn with_global_binding(mut self, bind_global: bool) -> Self {
        self.bind_global = bind_global;
        self
    }

    pub fn setup(&mut self, source: TextureHandle, destination: TextureHandle, downsampling: Downsampling) {
        self.source = Some(source);
        self.destination = Some(destination);
        self.downsampling = downsampling;
    }

    pub fn downsampling(&self) -> Downsampling {
        self.downsampling
    }

    pub fn destination(&self) -> Option<TextureHandle> {
        self.destination
    }

    /// Create the copy target from the camera descriptor and add the pass
    pub fn render(
        &mut self,
        graph: &mut RenderGraph,
        frame: &FrameData,
        source: TextureHandle,
        downsampling: Downsampling,
    ) -> FrameGraphResult<TextureHandle> {
        let desc = destination_descriptor(downsampling, &frame.camera.target_descriptor)
            .with_label(CAMERA_OPAQUE_TEXTURE);
        let destination = graph.create_texture(desc)?;
        self.setup(source, destination, downsampling);
        graph.add_pass(&*self, frame)?;
        Ok(destination)
    }
}

impl RenderPass for CopyColorPass {
    fn name(&self) -> &str {
        "Copy Color"
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

        builder.use_texture(source, AccessFlags::Read)?;
        builder.use_color_attachment(destination, 0, AccessFlags::Write)?;
        if self.bind_global {
            builder.promote_to_global(destination, CAMERA_OPAQUE_TEXTURE)?;
        }

        let viewport_scale = frame.camera.viewport_scale(builder.texture_descriptor(source)?);
        builder.set_render_func(PassData::CopyColor(CopyColorData {
            source,
            downsampling: self.downsampling,
            copy_material: self.copy_material,
            sampling_material: self.sampling_material,
            viewport_scale,
        }))
    }
}
