//! Render pass definitions for the render graph

use crate::backend::types::*;
use crate::error::{FrameGraphError, FrameGraphResult};
use crate::pipeline::{PassData, RenderPassEvent};
use crate::render_graph::resource::*;
use crate::scene::FrameData;
use glam::Vec4;

/// Unique identifier for a render pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PassId(pub(crate) u32);

impl PassId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// One declared use of a texture by a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureAccess {
    pub handle: TextureHandle,
    pub access: AccessFlags,
    /// Set when the texture is bound as a render target
    pub attachment: Option<AttachmentSlot>,
}

/// Texture published under a symbolic name once the pass completes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalPromotion {
    pub handle: TextureHandle,
    pub name: &'static str,
}

/// Declarations collected for one pass
#[derive(Debug)]
pub struct PassNode {
    pub name: String,
    pub accesses: Vec<TextureAccess>,
    pub promotions: Vec<GlobalPromotion>,
    pub renderer_lists: Vec<RendererListHandle>,
    pub allow_culling: bool,
    pub allow_global_state: bool,
    pub clear_flags: ClearFlags,
    pub clear_color: Vec4,
    pub(crate) work: Option<PassData>,
}

impl PassNode {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            accesses: Vec::new(),
            promotions: Vec::new(),
            renderer_lists: Vec::new(),
            allow_culling: true,
            allow_global_state: false,
            clear_flags: ClearFlags::empty(),
            clear_color: CLEAR_BLACK,
            work: None,
        }
    }

    pub fn has_work(&self) -> bool {
        self.work.is_some()
    }

    /// Combined access of this pass to a texture, if it declared any
    pub fn access_to(&self, handle: TextureHandle) -> Option<AccessFlags> {
        self.accesses
            .iter()
            .filter(|a| a.handle == handle)
            .map(|a| a.access)
            .reduce(merge_access)
    }

    pub fn reads_resource(&self, handle: TextureHandle) -> bool {
        self.access_to(handle).is_some_and(|a| a.reads())
    }

    pub fn writes_resource(&self, handle: TextureHandle) -> bool {
        self.access_to(handle).is_some_and(|a| a.writes())
    }

    pub fn promotes(&self, handle: TextureHandle) -> bool {
        self.promotions.iter().any(|p| p.handle == handle)
    }

    /// Distinct textures this pass touches, in first-declaration order
    pub fn textures(&self) -> Vec<TextureHandle> {
        let mut handles: Vec<TextureHandle> = Vec::with_capacity(self.accesses.len());
        for access in &self.accesses {
            if !handles.contains(&access.handle) {
                handles.push(access.handle);
            }
        }
        handles
    }

    pub fn attachments(&self) -> impl Iterator<Item = (AttachmentSlot, &TextureAccess)> + '_ {
        self.accesses
            .iter()
            .filter_map(|a| a.attachment.map(|slot| (slot, a)))
    }

    /// Check that the recorded work only touches what was declared
    pub(crate) fn validate_work(&self, textures: &TextureRegistry) -> FrameGraphResult<()> {
        let Some(work) = &self.work else {
            return Err(FrameGraphError::MissingRenderFunc {
                pass: self.name.clone(),
            });
        };
        for handle in work.referenced_textures() {
            if self.access_to(handle).is_none() {
                return Err(FrameGraphError::UndeclaredAccess {
                    pass: self.name.clone(),
                    resource: format!("texture '{}'", textures.label(handle)),
                });
            }
        }
        for list in work.referenced_renderer_lists() {
            if !self.renderer_lists.contains(&list) {
                return Err(FrameGraphError::UndeclaredAccess {
                    pass: self.name.clone(),
                    resource: format!("renderer list #{}", list.index()),
                });
            }
        }
        Ok(())
    }

    fn load_op(&self, access: AccessFlags, plane: ClearFlags, clear_value: Vec4) -> LoadOp {
        match access {
            AccessFlags::ReadWrite | AccessFlags::Read => LoadOp::Load,
            AccessFlags::Write if self.clear_flags.intersects(plane) => LoadOp::Clear(clear_value),
            AccessFlags::Write => LoadOp::DontCare,
        }
    }

    /// Build the render pass description for the pass's attachments.
    ///
    /// Returns `None` when the pass binds no render targets.
    pub(crate) fn render_pass_descriptor(
        &self,
        textures: &TextureRegistry,
        store_op: impl Fn(TextureHandle) -> StoreOp,
    ) -> FrameGraphResult<Option<RenderPassDescriptor>> {
        let mut color_attachments = Vec::new();
        let mut depth_stencil_attachment = None;

        for (slot, access) in self.attachments() {
            let texture = textures.resolve(access.handle)?;
            match slot {
                AttachmentSlot::Color(index) => color_attachments.push(ColorAttachment {
                    texture,
                    slot: index,
                    load_op: self.load_op(access.access, ClearFlags::COLOR, self.clear_color),
                    store_op: store_op(access.handle),
                }),
                AttachmentSlot::Depth => {
                    depth_stencil_attachment = Some(DepthStencilAttachment {
                        texture,
                        depth_load_op: self.load_op(
                            access.access,
                            ClearFlags::DEPTH | ClearFlags::STENCIL,
                            Vec4::ONE,
                        ),
                        depth_store_op: store_op(access.handle),
                        depth_clear_value: 1.0,
                        stencil_clear_value: 0,
                    })
                }
            }
        }

        if color_attachments.is_empty() && depth_stencil_attachment.is_none() {
            return Ok(None);
        }
        color_attachments.sort_by_key(|a| a.slot);

        Ok(Some(RenderPassDescriptor {
            label: self.name.clone(),
            color_attachments,
            depth_stencil_attachment,
        }))
    }
}

pub(crate) fn merge_access(a: AccessFlags, b: AccessFlags) -> AccessFlags {
    let reads = a.reads() || b.reads();
    let writes = a.writes() || b.writes();
    match (reads, writes) {
        (true, true) => AccessFlags::ReadWrite,
        (false, true) => AccessFlags::Write,
        _ => AccessFlags::Read,
    }
}

/// Declares what a single pass reads, writes and binds.
///
/// Handed to [`RenderPass::declare`] by both the graph and the immediate
/// adapter. Nothing touches the GPU while the builder is alive.
pub struct PassBuilder<'a> {
    pub(crate) textures: &'a TextureRegistry,
    pub(crate) renderer_lists: &'a mut RendererListTable,
    pub(crate) node: &'a mut PassNode,
}

impl<'a> PassBuilder<'a> {
    pub(crate) fn new(
        textures: &'a TextureRegistry,
        renderer_lists: &'a mut RendererListTable,
        node: &'a mut PassNode,
    ) -> Self {
        Self {
            textures,
            renderer_lists,
            node,
        }
    }

    pub fn pass_name(&self) -> &str {
        &self.node.name
    }

    fn check_handle(&self, handle: TextureHandle) -> FrameGraphResult<()> {
        self.textures.descriptor(handle).map(|_| ())
    }

    fn bind_attachment(
        &mut self,
        handle: TextureHandle,
        slot: AttachmentSlot,
        access: AccessFlags,
    ) -> FrameGraphResult<()> {
        self.check_handle(handle)?;
        if !access.writes() {
            return Err(FrameGraphError::ReadOnlyAttachment {
                pass: self.node.name.clone(),
                texture: self.textures.label(handle),
            });
        }
        if self.node.attachments().any(|(s, _)| s == slot) {
            return Err(FrameGraphError::AttachmentSlotInUse {
                pass: self.node.name.clone(),
                slot: slot.to_string(),
            });
        }
        self.node.accesses.push(TextureAccess {
            handle,
            access,
            attachment: Some(slot),
        });
        Ok(())
    }

    /// Bind a texture as colour render target `slot`
    pub fn use_color_attachment(
        &mut self,
        handle: TextureHandle,
        slot: u32,
        access: AccessFlags,
    ) -> FrameGraphResult<()> {
        self.bind_attachment(handle, AttachmentSlot::Color(slot), access)
    }

    /// Bind a texture as the depth/stencil render target
    pub fn use_depth_attachment(
        &mut self,
        handle: TextureHandle,
        access: AccessFlags,
    ) -> FrameGraphResult<()> {
        self.bind_attachment(handle, AttachmentSlot::Depth, access)
    }

    /// Declare a non-attachment use, typically sampling
    pub fn use_texture(&mut self, handle: TextureHandle, access: AccessFlags) -> FrameGraphResult<()> {
        self.check_handle(handle)?;
        self.node.accesses.push(TextureAccess {
            handle,
            access,
            attachment: None,
        });
        Ok(())
    }

    /// Register a deferred draw-item query, resolved by the backend right
    /// before the pass records
    pub fn use_renderer_list(&mut self, desc: RendererListDesc) -> RendererListHandle {
        let handle = self.renderer_lists.add(desc);
        self.node.renderer_lists.push(handle);
        handle
    }

    /// Publish `handle` under `name` for the passes that follow
    pub fn promote_to_global(
        &mut self,
        handle: TextureHandle,
        name: &'static str,
    ) -> FrameGraphResult<()> {
        self.check_handle(handle)?;
        self.node.promotions.push(GlobalPromotion { handle, name });
        Ok(())
    }

    pub fn allow_pass_culling(&mut self, allow: bool) {
        self.node.allow_culling = allow;
    }

    /// Permit the pass to toggle keywords and publish global vectors
    pub fn allow_global_state_modification(&mut self, allow: bool) {
        self.node.allow_global_state = allow;
    }

    /// Clear the write-only attachments when the pass begins
    pub fn set_clear(&mut self, flags: ClearFlags, color: Vec4) {
        self.node.clear_flags = flags;
        self.node.clear_color = color;
    }

    /// Hand over the work item replayed when the pass executes
    pub fn set_render_func(&mut self, data: PassData) -> FrameGraphResult<()> {
        if self.node.work.is_some() {
            return Err(FrameGraphError::DuplicateRenderFunc {
                pass: self.node.name.clone(),
            });
        }
        self.node.work = Some(data);
        Ok(())
    }

    pub fn texture_descriptor(&self, handle: TextureHandle) -> FrameGraphResult<&TextureDescriptor> {
        self.textures.descriptor(handle)
    }

    pub fn is_backbuffer(&self, handle: TextureHandle) -> FrameGraphResult<bool> {
        self.textures.is_backbuffer(handle)
    }
}

/// A concrete pass: binds its inputs with an inherent `setup`, then declares
/// its accesses and produces the work item to record.
pub trait RenderPass {
    /// Get the pass name for debugging
    fn name(&self) -> &str;

    /// Ordering key within the frame
    fn event(&self) -> RenderPassEvent;

    /// Declare resources and build the per-frame work item.
    ///
    /// Implementations call [`PassBuilder::set_render_func`] exactly once.
    fn declare(&self, builder: &mut PassBuilder<'_>, frame: &FrameData) -> FrameGraphResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with_color() -> (TextureRegistry, TextureHandle) {
        let mut textures = TextureRegistry::new();
        let handle = textures
            .create(TextureDescriptor::color("c", 8, 8, TextureFormat::Rgba8Unorm))
            .unwrap();
        (textures, handle)
    }

    #[test]
    fn test_attachment_requires_write() {
        let (textures, handle) = registry_with_color();
        let mut lists = RendererListTable::new();
        let mut node = PassNode::new("p");
        let mut builder = PassBuilder::new(&textures, &mut lists, &mut node);

        let err = builder
            .use_color_attachment(handle, 0, AccessFlags::Read)
            .unwrap_err();
        assert!(matches!(err, FrameGraphError::ReadOnlyAttachment { .. }));
    }

    #[test]
    fn test_slot_bound_once() {
        let (textures, handle) = registry_with_color();
        let mut lists = RendererListTable::new();
        let mut node = PassNode::new("p");
        let mut builder = PassBuilder::new(&textures, &mut lists, &mut node);

        builder
            .use_color_attachment(handle, 0, AccessFlags::Write)
            .unwrap();
        let err = builder
            .use_color_attachment(handle, 0, AccessFlags::Write)
            .unwrap_err();
        assert!(matches!(err, FrameGraphError::AttachmentSlotInUse { .. }));
    }

    #[test]
    fn test_merged_access() {
        let (textures, handle) = registry_with_color();
        let mut lists = RendererListTable::new();
        let mut node = PassNode::new("p");
        {
            let mut builder = PassBuilder::new(&textures, &mut lists, &mut node);
            builder.use_texture(handle, AccessFlags::Read).unwrap();
            builder
                .use_color_attachment(handle, 1, AccessFlags::Write)
                .unwrap();
        }
        assert_eq!(node.access_to(handle), Some(AccessFlags::ReadWrite));
        assert_eq!(node.textures(), vec![handle]);
    }

    #[test]
    fn test_load_op_derivation() {
        let (mut textures, handle) = registry_with_color();
        textures.bind_backing(handle, Some(BackendTexture::new(1)));
        let mut node = PassNode::new("p");
        node.accesses.push(TextureAccess {
            handle,
            access: AccessFlags::Write,
            attachment: Some(AttachmentSlot::Color(0)),
        });

        let desc = node
            .render_pass_descriptor(&textures, |_| StoreOp::Store)
            .unwrap()
            .unwrap();
        assert_eq!(desc.color_attachments[0].load_op, LoadOp::DontCare);

        node.clear_flags = ClearFlags::ALL;
        let desc = node
            .render_pass_descriptor(&textures, |_| StoreOp::Store)
            .unwrap()
            .unwrap();
        assert_eq!(desc.color_attachments[0].load_op, LoadOp::Clear(CLEAR_BLACK));
    }
}
