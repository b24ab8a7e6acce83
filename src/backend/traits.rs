//! Core backend abstraction traits
//!
//! The frame graph never encodes GPU work itself. These traits are the narrow
//! contracts it consumes from the external command-encoding backend.

use crate::backend::types::*;
use glam::Vec4;
use thiserror::Error;

/// Backend error type
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Failed to create texture: {0}")]
    TextureCreationFailed(String),
    #[error("Failed to create renderer list: {0}")]
    RendererListFailed(String),
    #[error("Out of memory")]
    OutOfMemory,
    #[error("Device lost")]
    DeviceLost,
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Accepts the commands passes emit while recording.
///
/// Provided directly in immediate mode, or handed to each deferred pass by the
/// [`RenderGraphExecutor`](crate::RenderGraphExecutor) in graph mode.
pub trait CommandRecorder {
    /// Begin a render pass
    fn begin_render_pass(&mut self, desc: &RenderPassDescriptor);

    /// End the current render pass
    fn end_render_pass(&mut self);

    fn push_debug_group(&mut self, label: &str);

    fn pop_debug_group(&mut self);

    /// Set viewport
    fn set_viewport(&mut self, rect: Rect);

    fn set_keyword(&mut self, keyword: ShaderKeyword, enabled: bool);

    fn set_global_texture(&mut self, name: &'static str, texture: BackendTexture);

    fn set_global_vector(&mut self, name: &'static str, value: Vec4);

    fn set_material_float(&mut self, material: MaterialHandle, name: &'static str, value: f32);

    fn set_material_texture(
        &mut self,
        material: MaterialHandle,
        name: &'static str,
        texture: BackendTexture,
    );

    /// Full-screen blit of `source` through `material`'s technique `technique`.
    ///
    /// `scale_bias` is `(scale.x, scale.y, bias.x, bias.y)` applied to the source UVs.
    fn blit_texture(
        &mut self,
        source: BackendTexture,
        scale_bias: Vec4,
        material: MaterialHandle,
        technique: u32,
    );

    /// Submit a draw-item set
    fn draw_renderer_list(&mut self, list: &RendererList);

    /// Drop every command recorded since the last submission.
    ///
    /// Called when a frame aborts so that no partial frame reaches the GPU.
    fn discard(&mut self);
}

/// Creates and destroys the backing textures of transient frame graph resources
pub trait TextureAllocator {
    fn create_texture(&mut self, desc: &TextureDescriptor) -> BackendResult<BackendTexture>;

    fn destroy_texture(&mut self, texture: BackendTexture);
}

/// Turns deferred draw-item queries into submittable lists.
///
/// The frame graph never looks inside a [`RendererList`], it only submits it.
pub trait DrawItemQuery {
    fn create_renderer_list(&mut self, desc: &RendererListDesc) -> BackendResult<RendererList>;
}

/// Everything a frame graph execution needs from the backend
pub trait RenderBackend: CommandRecorder + TextureAllocator + DrawItemQuery {}

impl<T: CommandRecorder + TextureAllocator + DrawItemQuery> RenderBackend for T {}
