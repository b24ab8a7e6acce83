//! Frame-scoped resource handles for the render graph

use crate::backend::types::{BackendTexture, RendererListDesc, TextureDescriptor};
use crate::error::{FrameGraphError, FrameGraphResult};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_REGISTRY_ID: AtomicU32 = AtomicU32::new(0);

fn next_registry_id() -> u32 {
    NEXT_REGISTRY_ID.fetch_add(1, Ordering::Relaxed)
}

/// Handle to a texture in the render graph.
///
/// Handles carry the registry and frame they were created in; once the
/// registry moves to the next frame every outstanding handle is stale, and no
/// other registry accepts them at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle {
    /// Index into the registry of the creating frame.
    index: u32,
    /// Frame counter for validation.
    frame: u32,
    /// Id of the owning registry.
    registry: u32,
}

impl TextureHandle {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn frame(&self) -> u32 {
        self.frame
    }
}

/// Handle to a deferred draw-item query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RendererListHandle {
    index: u32,
    frame: u32,
    registry: u32,
}

impl RendererListHandle {
    pub fn index(&self) -> u32 {
        self.index
    }
}

/// Resource access type for dependency tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessFlags {
    /// Read-only access.
    Read,
    /// Write-only access; previous contents are not preserved.
    Write,
    /// Read and write access; previous contents are loaded.
    ReadWrite,
}

impl AccessFlags {
    /// Check if this access includes reading.
    pub fn reads(&self) -> bool {
        matches!(self, Self::Read | Self::ReadWrite)
    }

    /// Check if this access includes writing.
    pub fn writes(&self) -> bool {
        matches!(self, Self::Write | Self::ReadWrite)
    }
}

/// Where a texture is bound as a render target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttachmentSlot {
    Color(u32),
    Depth,
}

impl fmt::Display for AttachmentSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Color(index) => write!(f, "colour slot {index}"),
            Self::Depth => write!(f, "the depth slot"),
        }
    }
}

/// How a texture entered the frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureOrigin {
    /// Created by the graph; backing memory is assigned at execution time
    Transient,
    /// Supplied from outside with its backing already bound
    Imported { backbuffer: bool },
}

#[derive(Debug, Clone)]
struct TextureEntry {
    desc: TextureDescriptor,
    origin: TextureOrigin,
    backing: Option<BackendTexture>,
}

/// Resource handle registry.
///
/// Holds the logical textures of one frame. [`reset`](Self::reset) drops all of
/// them and advances the frame counter.
#[derive(Debug)]
pub struct TextureRegistry {
    id: u32,
    frame: u32,
    entries: Vec<TextureEntry>,
}

impl Default for TextureRegistry {
    fn default() -> Self {
        Self {
            id: next_registry_id(),
            frame: 0,
            entries: Vec::new(),
        }
    }
}

impl TextureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame(&self) -> u32 {
        self.frame
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forget every texture and invalidate all outstanding handles
    pub fn reset(&mut self) {
        self.entries.clear();
        self.frame = self.frame.wrapping_add(1);
    }

    /// Allocate a new logical texture for the current frame
    pub fn create(&mut self, desc: TextureDescriptor) -> FrameGraphResult<TextureHandle> {
        Self::check_descriptor(&desc)?;
        Ok(self.push(desc, TextureOrigin::Transient, None))
    }

    /// Register an externally owned texture for the current frame
    pub fn import(
        &mut self,
        desc: TextureDescriptor,
        backing: BackendTexture,
        backbuffer: bool,
    ) -> FrameGraphResult<TextureHandle> {
        Self::check_descriptor(&desc)?;
        Ok(self.push(desc, TextureOrigin::Imported { backbuffer }, Some(backing)))
    }

    fn check_descriptor(desc: &TextureDescriptor) -> FrameGraphResult<()> {
        match desc.validate() {
            Some(reason) => Err(FrameGraphError::InvalidDescriptor {
                label: desc.label.clone(),
                reason: reason.to_string(),
            }),
            None => Ok(()),
        }
    }

    fn push(
        &mut self,
        desc: TextureDescriptor,
        origin: TextureOrigin,
        backing: Option<BackendTexture>,
    ) -> TextureHandle {
        let handle = TextureHandle {
            index: self.entries.len() as u32,
            frame: self.frame,
            registry: self.id,
        };
        self.entries.push(TextureEntry {
            desc,
            origin,
            backing,
        });
        handle
    }

    fn owns(&self, handle: TextureHandle) -> bool {
        handle.registry == self.id && handle.frame == self.frame
    }

    pub fn is_valid(&self, handle: TextureHandle) -> bool {
        self.owns(handle) && (handle.index as usize) < self.entries.len()
    }

    fn entry(&self, handle: TextureHandle) -> FrameGraphResult<&TextureEntry> {
        if !self.owns(handle) {
            return Err(self.stale(handle));
        }
        self.entries
            .get(handle.index as usize)
            .ok_or_else(|| self.stale(handle))
    }

    fn stale(&self, handle: TextureHandle) -> FrameGraphError {
        FrameGraphError::StaleHandle {
            index: handle.index,
            handle_frame: handle.frame,
            current_frame: self.frame,
        }
    }

    pub fn descriptor(&self, handle: TextureHandle) -> FrameGraphResult<&TextureDescriptor> {
        self.entry(handle).map(|e| &e.desc)
    }

    pub fn origin(&self, handle: TextureHandle) -> FrameGraphResult<TextureOrigin> {
        self.entry(handle).map(|e| e.origin)
    }

    pub fn is_imported(&self, handle: TextureHandle) -> FrameGraphResult<bool> {
        Ok(matches!(self.origin(handle)?, TextureOrigin::Imported { .. }))
    }

    pub fn is_backbuffer(&self, handle: TextureHandle) -> FrameGraphResult<bool> {
        Ok(matches!(
            self.origin(handle)?,
            TextureOrigin::Imported { backbuffer: true }
        ))
    }

    /// Label for diagnostics; stale handles are described by index
    pub fn label(&self, handle: TextureHandle) -> String {
        match self.entry(handle) {
            Ok(entry) => entry.desc.label.clone(),
            Err(_) => format!("#{}@{}", handle.index, handle.frame),
        }
    }

    /// Resolve a handle to its backing texture.
    ///
    /// Only meaningful while the frame executes: transient textures have no
    /// backing before allocation or after their last use.
    pub fn resolve(&self, handle: TextureHandle) -> FrameGraphResult<BackendTexture> {
        self.entry(handle)?
            .backing
            .ok_or_else(|| self.stale(handle))
    }

    pub(crate) fn bind_backing(&mut self, handle: TextureHandle, backing: Option<BackendTexture>) {
        if let Some(entry) = self.entries.get_mut(handle.index as usize) {
            if handle.registry == self.id
                && handle.frame == self.frame
                && entry.origin == TextureOrigin::Transient
            {
                entry.backing = backing;
            }
        }
    }

    /// All handles of the current frame in creation order
    pub fn handles(&self) -> impl Iterator<Item = TextureHandle> + '_ {
        let (frame, registry) = (self.frame, self.id);
        (0..self.entries.len() as u32).map(move |index| TextureHandle {
            index,
            frame,
            registry,
        })
    }
}

/// Deferred draw-item queries of one frame
#[derive(Debug)]
pub struct RendererListTable {
    id: u32,
    frame: u32,
    descs: Vec<RendererListDesc>,
}

impl Default for RendererListTable {
    fn default() -> Self {
        Self {
            id: next_registry_id(),
            frame: 0,
            descs: Vec::new(),
        }
    }
}

impl RendererListTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.descs.clear();
        self.frame = self.frame.wrapping_add(1);
    }

    pub fn add(&mut self, desc: RendererListDesc) -> RendererListHandle {
        let handle = RendererListHandle {
            index: self.descs.len() as u32,
            frame: self.frame,
            registry: self.id,
        };
        self.descs.push(desc);
        handle
    }

    fn owns(&self, handle: RendererListHandle) -> bool {
        handle.registry == self.id && handle.frame == self.frame
    }

    pub fn is_valid(&self, handle: RendererListHandle) -> bool {
        self.owns(handle) && (handle.index as usize) < self.descs.len()
    }

    pub fn get(&self, handle: RendererListHandle) -> Option<&RendererListDesc> {
        if !self.owns(handle) {
            return None;
        }
        self.descs.get(handle.index as usize)
    }
}
