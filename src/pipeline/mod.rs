//! Render passes
//!
//! The five passes that plug into the frame graph:
//! 1. Copy color - (downsampled) copy of the camera colour for later sampling
//! 2. Copy depth - depth resolve/copy into a depth or colour-encoded target
//! 3. Depth/normal prepass - opaque depth plus view-space normals
//! 4. Depth-only prepass - opaque depth
//! 5. Draw objects - main opaque or transparent draw-item submission
//!
//! Each pass binds its inputs with `setup`, declares its accesses through
//! [`RenderPass::declare`](crate::render_graph::RenderPass::declare) and hands
//! over a [`PassData`] work item that is replayed later, in graph or immediate
//! mode alike.

pub mod copy_color;
pub mod copy_depth;
pub mod depth_normal_prepass;
pub mod depth_prepass;
pub mod draw_objects;

pub use copy_color::{CopyColorData, CopyColorPass, Downsampling};
pub use copy_depth::{CopyDepthData, CopyDepthPass, CopyDepthSettings};
pub use depth_normal_prepass::{DepthNormalPrepass, DepthNormalsData};
pub use depth_prepass::{DepthOnlyData, DepthOnlyPrepass};
pub use draw_objects::{DrawObjectsData, DrawObjectsPass, DrawObjectsSettings};

use crate::backend::types::*;
use crate::error::FrameGraphResult;
use crate::render_graph::{RasterContext, RendererListHandle, TextureHandle};
use glam::{Vec2, Vec4};

/// Opaque colour copy published by the copy-color pass
pub const CAMERA_OPAQUE_TEXTURE: &str = "_CameraOpaqueTexture";
/// Readable camera depth
pub const CAMERA_DEPTH_TEXTURE: &str = "_CameraDepthTexture";
/// View-space normals written by the depth/normal prepass
pub const CAMERA_NORMALS_TEXTURE: &str = "_CameraNormalsTexture";
/// Depth source bound on the copy-depth material
pub const CAMERA_DEPTH_ATTACHMENT: &str = "_CameraDepthAttachment";
pub const ZWRITE: &str = "_ZWrite";
pub const SAMPLE_OFFSET: &str = "_SampleOffset";
pub const DRAW_OBJECTS_PASS_DATA: &str = "_DrawObjectsPassData";
pub const SCALE_BIAS: &str = "_ScaleBias";

pub const DEPTH_ONLY_TAG: ShaderTagId = ShaderTagId("DepthOnly");
pub const DEPTH_NORMALS_TAG: ShaderTagId = ShaderTagId("DepthNormals");
pub const DEPTH_NORMALS_ONLY_TAG: ShaderTagId = ShaderTagId("DepthNormalsOnly");
pub const SRP_DEFAULT_UNLIT_TAG: ShaderTagId = ShaderTagId("SRPDefaultUnlit");
pub const UNIVERSAL_FORWARD_TAG: ShaderTagId = ShaderTagId("UniversalForward");
pub const UNIVERSAL_FORWARD_ONLY_TAG: ShaderTagId = ShaderTagId("UniversalForwardOnly");

/// Where in the frame a pass runs; lower values run first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u32)]
pub enum RenderPassEvent {
    BeforeRendering = 0,
    BeforeRenderingShadows = 50,
    AfterRenderingShadows = 100,
    BeforeRenderingPrePasses = 150,
    AfterRenderingPrePasses = 200,
    BeforeRenderingGbuffer = 210,
    AfterRenderingGbuffer = 220,
    BeforeRenderingDeferredLights = 230,
    AfterRenderingDeferredLights = 240,
    BeforeRenderingOpaques = 250,
    AfterRenderingOpaques = 300,
    BeforeRenderingSkybox = 350,
    AfterRenderingSkybox = 400,
    BeforeRenderingTransparents = 450,
    AfterRenderingTransparents = 500,
    BeforeRenderingPostProcessing = 550,
    AfterRenderingPostProcessing = 600,
    AfterRendering = 1000,
}

impl RenderPassEvent {
    pub fn value(self) -> u32 {
        self as u32
    }
}

/// Per-frame work item of one pass, replayed once when the pass executes
#[derive(Debug, Clone, PartialEq)]
pub enum PassData {
    CopyColor(CopyColorData),
    CopyDepth(CopyDepthData),
    DepthNormals(DepthNormalsData),
    DepthOnly(DepthOnlyData),
    DrawObjects(DrawObjectsData),
}

impl PassData {
    /// Emit the pass's commands
    pub fn record(&self, ctx: &mut RasterContext<'_>) -> FrameGraphResult<()> {
        match self {
            Self::CopyColor(data) => data.record(ctx),
            Self::CopyDepth(data) => data.record(ctx),
            Self::DepthNormals(data) => data.record(ctx),
            Self::DepthOnly(data) => data.record(ctx),
            Self::DrawObjects(data) => data.record(ctx),
        }
    }

    /// Textures the work item resolves while recording
    pub fn referenced_textures(&self) -> Vec<TextureHandle> {
        match self {
            Self::CopyColor(data) => vec![data.source],
            Self::CopyDepth(data) => vec![data.source],
            Self::DepthNormals(_) | Self::DepthOnly(_) | Self::DrawObjects(_) => Vec::new(),
        }
    }

    /// Draw-item sets the work item submits
    pub fn referenced_renderer_lists(&self) -> Vec<RendererListHandle> {
        match self {
            Self::CopyColor(_) | Self::CopyDepth(_) => Vec::new(),
            Self::DepthNormals(data) => vec![data.renderer_list],
            Self::DepthOnly(data) => vec![data.renderer_list],
            Self::DrawObjects(data) => vec![data.renderer_list, data.error_renderer_list],
        }
    }
}

/// Depth MSAA shader path selected for a sample count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MsaaKeywordState {
    Off,
    Msaa4,
    Msaa8,
}

impl MsaaKeywordState {
    /// Pick the depth MSAA path.
    ///
    /// 2 samples select the 8x path. This matches the shipped behaviour and is
    /// kept until the shader gains a dedicated 2x path.
    pub fn from_sample_count(samples: u32) -> Self {
        match samples {
            8 | 2 => Self::Msaa8,
            4 => Self::Msaa4,
            _ => Self::Off,
        }
    }

    /// Keyword values to set, all three every time
    pub fn keywords(self) -> [(ShaderKeyword, bool); 3] {
        [
            (ShaderKeyword::DepthMsaa2, false),
            (ShaderKeyword::DepthMsaa4, self == Self::Msaa4),
            (ShaderKeyword::DepthMsaa8, self == Self::Msaa8),
        ]
    }
}

/// Scale-bias for the depth copy blit.
///
/// Produces `(sx, -sy, 0, sy)` for flipped and unflipped targets alike; the
/// copy shader applies the sign itself.
pub fn depth_copy_scale_bias(viewport_scale: Vec2) -> Vec4 {
    Vec4::new(viewport_scale.x, -viewport_scale.y, 0.0, viewport_scale.y)
}

/// Orientation vector published by the draw-objects pass
pub fn draw_objects_scale_bias(y_flip: bool) -> Vec4 {
    let flip_sign = if y_flip { 1.0 } else { 0.0 };
    Vec4::new(flip_sign, 0.0, if y_flip { -1.0 } else { 1.0 }, 0.0)
}

/// Combine the optional stencil test and depth-priming overrides into one
/// block applied to every draw item
pub fn compose_render_state(stencil: Option<StencilState>, depth_priming: bool) -> RenderStateBlock {
    let mut block = RenderStateBlock::default();
    if let Some(stencil) = stencil.filter(|s| s.enabled) {
        block.mask |= RenderStateMask::STENCIL;
        block.stencil = stencil;
    }
    if depth_priming {
        block.mask |= RenderStateMask::DEPTH;
        block.depth = DepthState {
            write_enabled: false,
            compare: CompareFunction::Equal,
        };
    }
    block
}
