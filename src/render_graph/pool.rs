//! Transient texture pool
//!
//! Backing textures for transient graph resources are taken from here when a
//! frame executes and handed back when it ends. They are only destroyed by
//! [`TransientTexturePool::trim`] or [`TransientTexturePool::clear`], so a
//! steady frame allocates nothing after warm-up.

use crate::backend::traits::TextureAllocator;
use crate::backend::types::{BackendTexture, FilterMode, TextureDescriptor, TextureFormat};
use crate::error::FrameGraphResult;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Everything that decides whether a pooled texture can back a descriptor
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PoolKey {
    width: u32,
    height: u32,
    color_format: Option<TextureFormat>,
    depth_stencil_format: Option<TextureFormat>,
    sample_count: u32,
    filter_mode: FilterMode,
}

impl PoolKey {
    fn from_desc(desc: &TextureDescriptor) -> Self {
        Self {
            width: desc.width,
            height: desc.height,
            color_format: desc.color_format,
            depth_stencil_format: desc.depth_stencil_format,
            sample_count: desc.sample_count,
            filter_mode: desc.filter_mode,
        }
    }
}

#[derive(Debug)]
struct PooledTexture {
    texture: BackendTexture,
    /// Frames spent in the free list without being reused
    idle_frames: u32,
}

#[derive(Debug, Default)]
struct PoolInner {
    free: HashMap<PoolKey, Vec<PooledTexture>>,
    in_use: usize,
}

/// Shared pool of backing textures.
///
/// Cloning yields another handle to the same pool, so several executors (or
/// threads) can recycle through one set of textures.
#[derive(Debug, Clone, Default)]
pub struct TransientTexturePool {
    inner: Arc<Mutex<PoolInner>>,
}

impl TransientTexturePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a free texture matching `desc`, creating one when none is left
    pub fn acquire(
        &self,
        desc: &TextureDescriptor,
        allocator: &mut dyn TextureAllocator,
    ) -> FrameGraphResult<BackendTexture> {
        let key = PoolKey::from_desc(desc);
        let mut inner = self.inner.lock();

        if let Some(pooled) = inner.free.get_mut(&key).and_then(Vec::pop) {
            inner.in_use += 1;
            return Ok(pooled.texture);
        }

        let texture = allocator.create_texture(desc)?;
        log::debug!(
            "Allocated transient texture '{}' {}x{} ({} samples)",
            desc.label,
            desc.width,
            desc.height,
            desc.sample_count
        );
        inner.in_use += 1;
        Ok(texture)
    }

    /// Return a texture acquired with a matching descriptor
    pub fn release(&self, desc: &TextureDescriptor, texture: BackendTexture) {
        let mut inner = self.inner.lock();
        inner.in_use = inner.in_use.saturating_sub(1);
        inner
            .free
            .entry(PoolKey::from_desc(desc))
            .or_default()
            .push(PooledTexture {
                texture,
                idle_frames: 0,
            });
    }

    /// Age every free texture by one frame and destroy those idle for longer
    /// than `max_idle_frames`. Returns how many were destroyed.
    pub fn trim(&self, max_idle_frames: u32, allocator: &mut dyn TextureAllocator) -> usize {
        let mut inner = self.inner.lock();
        let mut destroyed = 0;

        inner.free.retain(|_, bucket| {
            bucket.retain_mut(|pooled| {
                pooled.idle_frames += 1;
                if pooled.idle_frames > max_idle_frames {
                    allocator.destroy_texture(pooled.texture);
                    destroyed += 1;
                    false
                } else {
                    true
                }
            });
            !bucket.is_empty()
        });

        if destroyed > 0 {
            log::debug!("Trimmed {destroyed} idle transient textures");
        }
        destroyed
    }

    /// Destroy every free texture
    pub fn clear(&self, allocator: &mut dyn TextureAllocator) {
        let mut inner = self.inner.lock();
        for (_, bucket) in inner.free.drain() {
            for pooled in bucket {
                allocator.destroy_texture(pooled.texture);
            }
        }
    }

    pub fn free_count(&self) -> usize {
        self.inner.lock().free.values().map(Vec::len).sum()
    }

    pub fn in_use_count(&self) -> usize {
        self.inner.lock().in_use
    }
}
