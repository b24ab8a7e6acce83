//! Per-frame camera context

use crate::backend::types::{Rect, SortingCriteria, TextureDescriptor, TextureFormat};
use glam::Vec2;

/// Camera description supplied by the frame context provider, read-only to passes
#[derive(Debug, Clone)]
pub struct CameraData {
    /// Descriptor of the camera's colour target; copies derive their targets from it
    pub target_descriptor: TextureDescriptor,
    /// Camera viewport in backbuffer pixels
    pub pixel_rect: Rect,
    /// Graphics API convention: texture V starts at the top of the image.
    ///
    /// Off-screen targets are then stored upside down relative to the backbuffer.
    pub uv_starts_at_top: bool,
    /// Runtime scale factors for targets rendered at a dynamic internal resolution
    pub dynamic_scale: Vec2,
    /// Sorting used by the depth prepasses
    pub default_opaque_sort_flags: SortingCriteria,
}

impl CameraData {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            target_descriptor: TextureDescriptor::color(
                "_CameraColorAttachment",
                width,
                height,
                TextureFormat::Rgba16Float,
            ),
            pixel_rect: Rect::new(0.0, 0.0, width as f32, height as f32),
            uv_starts_at_top: false,
            dynamic_scale: Vec2::ONE,
            default_opaque_sort_flags: SortingCriteria::COMMON_OPAQUE,
        }
    }

    /// Whether a target is stored vertically flipped relative to the backbuffer
    pub fn is_handle_y_flipped(&self, is_backbuffer: bool) -> bool {
        self.uv_starts_at_top && !is_backbuffer
    }

    /// Scale applied to UVs when sampling a texture with the given descriptor
    pub fn viewport_scale(&self, desc: &TextureDescriptor) -> Vec2 {
        if desc.use_dynamic_scale {
            self.dynamic_scale
        } else {
            Vec2::ONE
        }
    }
}
