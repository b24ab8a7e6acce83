//! Common types shared with the external backend

use crate::scene::CullingResults;
use bitflags::bitflags;
use glam::Vec4;

/// Texture format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    Rgba8Unorm,
    Rgba8UnormSrgb,
    Bgra8Unorm,
    Bgra8UnormSrgb,
    Rgba16Float,
    Rgba32Float,
    Rg16Float,
    R32Float,
    Depth16Unorm,
    Depth32Float,
    Depth24PlusStencil8,
    Depth32FloatStencil8,
}

impl TextureFormat {
    pub fn is_depth(&self) -> bool {
        matches!(
            self,
            TextureFormat::Depth16Unorm
                | TextureFormat::Depth32Float
                | TextureFormat::Depth24PlusStencil8
                | TextureFormat::Depth32FloatStencil8
        )
    }

    pub fn has_stencil(&self) -> bool {
        matches!(
            self,
            TextureFormat::Depth24PlusStencil8 | TextureFormat::Depth32FloatStencil8
        )
    }
}

/// Texture filtering applied when the texture is sampled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterMode {
    #[default]
    Point,
    Bilinear,
    Trilinear,
}

/// Render target descriptor
///
/// A colour target has `color_format` set; a depth target has only
/// `depth_stencil_format`. A colour target may also carry a depth/stencil format
/// when the backend allocates both planes together.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextureDescriptor {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub color_format: Option<TextureFormat>,
    pub depth_stencil_format: Option<TextureFormat>,
    pub sample_count: u32,
    pub filter_mode: FilterMode,
    /// The texture is rendered at a dynamic internal resolution and sampled through
    /// the camera's runtime scale factors.
    pub use_dynamic_scale: bool,
}

impl TextureDescriptor {
    pub fn color(label: impl Into<String>, width: u32, height: u32, format: TextureFormat) -> Self {
        Self {
            label: label.into(),
            width,
            height,
            color_format: Some(format),
            depth_stencil_format: None,
            sample_count: 1,
            filter_mode: FilterMode::Point,
            use_dynamic_scale: false,
        }
    }

    pub fn depth(label: impl Into<String>, width: u32, height: u32, format: TextureFormat) -> Self {
        Self {
            label: label.into(),
            width,
            height,
            color_format: None,
            depth_stencil_format: Some(format),
            sample_count: 1,
            filter_mode: FilterMode::Point,
            use_dynamic_scale: false,
        }
    }

    pub fn with_sample_count(mut self, sample_count: u32) -> Self {
        self.sample_count = sample_count;
        self
    }

    pub fn with_dynamic_scale(mut self, use_dynamic_scale: bool) -> Self {
        self.use_dynamic_scale = use_dynamic_scale;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// True when the texture is a real depth/stencil surface rather than a colour target
    pub fn is_depth_target(&self) -> bool {
        self.color_format.is_none() && self.depth_stencil_format.is_some()
    }

    /// Two transient textures may share backing memory when this matches
    pub fn is_alias_compatible(&self, other: &Self) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.color_format == other.color_format
            && self.depth_stencil_format == other.depth_stencil_format
            && self.sample_count == other.sample_count
            && self.filter_mode == other.filter_mode
    }

    /// Describe why the descriptor cannot be allocated, if it cannot
    pub fn validate(&self) -> Option<&'static str> {
        if self.width == 0 || self.height == 0 {
            Some("dimensions must be positive")
        } else if self.sample_count == 0 {
            Some("sample count must be at least 1")
        } else if self.color_format.is_none() && self.depth_stencil_format.is_none() {
            Some("no colour or depth/stencil format")
        } else if self.color_format.is_some_and(|f| f.is_depth()) {
            Some("colour format is a depth format")
        } else if self.depth_stencil_format.is_some_and(|f| !f.is_depth()) {
            Some("depth/stencil format is a colour format")
        } else {
            None
        }
    }
}

/// Backend-owned texture resolved from a frame graph handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BackendTexture(u64);

impl BackendTexture {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Already-loaded material owned by the external material system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialHandle(u64);

impl MaterialHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Pixel rectangle
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Compare function for depth/stencil
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompareFunction {
    Never,
    Less,
    Equal,
    #[default]
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

/// Stencil operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StencilOp {
    #[default]
    Keep,
    Zero,
    Replace,
    IncrementSaturate,
    DecrementSaturate,
    Invert,
    IncrementWrap,
    DecrementWrap,
}

/// Stencil test state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StencilState {
    pub enabled: bool,
    pub reference: u8,
    pub read_mask: u8,
    pub write_mask: u8,
    pub compare: CompareFunction,
    pub pass_op: StencilOp,
    pub fail_op: StencilOp,
    pub depth_fail_op: StencilOp,
}

impl Default for StencilState {
    fn default() -> Self {
        Self {
            enabled: false,
            reference: 0,
            read_mask: 0xFF,
            write_mask: 0xFF,
            compare: CompareFunction::Always,
            pass_op: StencilOp::Keep,
            fail_op: StencilOp::Keep,
            depth_fail_op: StencilOp::Keep,
        }
    }
}

/// Depth test state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthState {
    pub write_enabled: bool,
    pub compare: CompareFunction,
}

impl Default for DepthState {
    fn default() -> Self {
        Self {
            write_enabled: true,
            compare: CompareFunction::LessEqual,
        }
    }
}

bitflags! {
    /// Which parts of a [`RenderStateBlock`] override the material state
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RenderStateMask: u32 {
        const DEPTH = 1 << 0;
        const STENCIL = 1 << 1;
    }
}

/// Render state override applied uniformly to a whole draw-item set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RenderStateBlock {
    pub mask: RenderStateMask,
    pub depth: DepthState,
    pub stencil: StencilState,
}

impl RenderStateBlock {
    pub fn is_empty(&self) -> bool {
        self.mask.is_empty()
    }
}

bitflags! {
    /// Draw-item ordering requested from the draw-item query backend
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SortingCriteria: u32 {
        const SORTING_LAYER = 1 << 0;
        const RENDER_QUEUE = 1 << 1;
        const BACK_TO_FRONT = 1 << 2;
        const QUANTIZED_FRONT_TO_BACK = 1 << 3;
        const OPTIMIZE_STATE_CHANGES = 1 << 4;
        const CANVAS_ORDER = 1 << 5;
        const COMMON_OPAQUE = Self::SORTING_LAYER.bits()
            | Self::RENDER_QUEUE.bits()
            | Self::QUANTIZED_FRONT_TO_BACK.bits()
            | Self::OPTIMIZE_STATE_CHANGES.bits()
            | Self::CANVAS_ORDER.bits();
        const COMMON_TRANSPARENT = Self::SORTING_LAYER.bits()
            | Self::RENDER_QUEUE.bits()
            | Self::BACK_TO_FRONT.bits()
            | Self::OPTIMIZE_STATE_CHANGES.bits();
    }
}

bitflags! {
    /// Extra per-object data the draw items need bound
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PerObjectData: u32 {
        const LIGHT_PROBE = 1 << 0;
        const REFLECTION_PROBES = 1 << 1;
        const LIGHTMAPS = 1 << 2;
        const LIGHT_INDICES = 1 << 3;
        const MOTION_VECTORS = 1 << 4;
    }
}

impl PerObjectData {
    pub const NONE: Self = Self::empty();
}

/// Inclusive render queue range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderQueueRange {
    pub lower: u32,
    pub upper: u32,
}

impl RenderQueueRange {
    pub fn opaque() -> Self {
        Self {
            lower: 0,
            upper: 2500,
        }
    }

    pub fn transparent() -> Self {
        Self {
            lower: 2501,
            upper: 5000,
        }
    }

    pub fn all() -> Self {
        Self {
            lower: 0,
            upper: 5000,
        }
    }

    pub fn contains(&self, queue: u32) -> bool {
        (self.lower..=self.upper).contains(&queue)
    }
}

/// Bit mask of object layers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayerMask(pub u32);

impl LayerMask {
    pub const ALL: Self = Self(u32::MAX);
    pub const NONE: Self = Self(0);

    pub fn contains_layer(&self, layer: u32) -> bool {
        layer < 32 && self.0 & (1 << layer) != 0
    }
}

/// Queue range + layer mask selecting which draw items a pass considers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FilteringSettings {
    pub queue_range: RenderQueueRange,
    pub layer_mask: LayerMask,
}

impl FilteringSettings {
    pub fn new(queue_range: RenderQueueRange, layer_mask: LayerMask) -> Self {
        Self {
            queue_range,
            layer_mask,
        }
    }
}

/// Shader pass tag selecting which shader pass of a material a draw item uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderTagId(pub &'static str);

/// Binary shader switches toggled by passes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderKeyword {
    DepthMsaa2,
    DepthMsaa4,
    DepthMsaa8,
    OutputDepth,
}

/// Kind of draw-item set requested from the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RendererListKind {
    /// Items whose shader pass resolved against the requested tags
    Main,
    /// Items whose shader or technique could not be resolved, drawn with the
    /// error-visualisation technique
    ErrorFallback,
}

/// Deferred draw-item query
#[derive(Debug, Clone, PartialEq)]
pub struct RendererListDesc {
    pub culling: CullingResults,
    pub shader_tags: Vec<ShaderTagId>,
    pub sorting: SortingCriteria,
    pub filtering: FilteringSettings,
    pub per_object_data: PerObjectData,
    pub state_block: Option<RenderStateBlock>,
    pub main_light_index: Option<usize>,
    pub kind: RendererListKind,
}

impl RendererListDesc {
    /// Same query, restricted to the items that need the error fallback
    pub fn error_fallback(&self) -> Self {
        Self {
            kind: RendererListKind::ErrorFallback,
            state_block: None,
            ..self.clone()
        }
    }
}

/// Concrete, GPU-submittable draw-item set produced by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RendererList {
    id: u64,
    draw_count: usize,
}

impl RendererList {
    pub fn new(id: u64, draw_count: usize) -> Self {
        Self { id, draw_count }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_empty(&self) -> bool {
        self.draw_count == 0
    }
}

bitflags! {
    /// Attachment planes cleared when a pass begins
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ClearFlags: u32 {
        const COLOR = 1 << 0;
        const DEPTH = 1 << 1;
        const STENCIL = 1 << 2;
        const ALL = Self::COLOR.bits() | Self::DEPTH.bits() | Self::STENCIL.bits();
    }
}

/// Opaque black, the clear colour used by the prepasses
pub const CLEAR_BLACK: Vec4 = Vec4::new(0.0, 0.0, 0.0, 1.0);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoadOp {
    Clear(Vec4),
    Load,
    DontCare,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Store,
    Discard,
}

/// Colour attachment for render pass
#[derive(Debug, Clone, PartialEq)]
pub struct ColorAttachment {
    pub texture: BackendTexture,
    pub slot: u32,
    pub load_op: LoadOp,
    pub store_op: StoreOp,
}

/// Depth stencil attachment for render pass
#[derive(Debug, Clone, PartialEq)]
pub struct DepthStencilAttachment {
    pub texture: BackendTexture,
    pub depth_load_op: LoadOp,
    pub depth_store_op: StoreOp,
    pub depth_clear_value: f32,
    pub stencil_clear_value: u32,
}

/// Render pass descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPassDescriptor {
    pub label: String,
    pub color_attachments: Vec<ColorAttachment>,
    pub depth_stencil_attachment: Option<DepthStencilAttachment>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_validation() {
        let desc = TextureDescriptor::color("c", 0, 4, TextureFormat::Rgba8Unorm);
        assert!(desc.validate().is_some());

        let desc = TextureDescriptor::depth("d", 4, 4, TextureFormat::Rgba8Unorm);
        assert!(desc.validate().is_some());

        let desc = TextureDescriptor::depth("d", 4, 4, TextureFormat::Depth32Float);
        assert!(desc.validate().is_none());
        assert!(desc.is_depth_target());
    }

    #[test]
    fn test_common_sorting_flags() {
        assert!(SortingCriteria::COMMON_OPAQUE.contains(SortingCriteria::QUANTIZED_FRONT_TO_BACK));
        assert!(!SortingCriteria::COMMON_OPAQUE.contains(SortingCriteria::BACK_TO_FRONT));
        assert!(SortingCriteria::COMMON_TRANSPARENT.contains(SortingCriteria::BACK_TO_FRONT));
    }

    #[test]
    fn test_queue_ranges_do_not_overlap() {
        let opaque = RenderQueueRange::opaque();
        let transparent = RenderQueueRange::transparent();
        assert!(opaque.contains(2500));
        assert!(!transparent.contains(2500));
        assert!(transparent.contains(2501));
    }
}
