//! Recording context handed to a pass's work item

use crate::backend::traits::CommandRecorder;
use crate::backend::types::*;
use crate::error::{FrameGraphError, FrameGraphResult};
use crate::pipeline::PassData;
use crate::render_graph::globals::GlobalBindings;
use crate::render_graph::pass::PassNode;
use crate::render_graph::resource::*;
use glam::Vec4;

/// Access-checked command interface for one executing pass.
///
/// Every texture or draw-item set goes through the pass's declarations; touching
/// anything else fails with [`FrameGraphError::UndeclaredAccess`]. Global state
/// changes require the pass to have allowed them.
pub struct RasterContext<'a> {
    node: &'a PassNode,
    textures: &'a TextureRegistry,
    renderer_lists: &'a [(RendererListHandle, RendererList)],
    globals: &'a mut GlobalBindings,
    cmd: &'a mut dyn CommandRecorder,
}

impl<'a> RasterContext<'a> {
    pub(crate) fn new(
        node: &'a PassNode,
        textures: &'a TextureRegistry,
        renderer_lists: &'a [(RendererListHandle, RendererList)],
        globals: &'a mut GlobalBindings,
        cmd: &'a mut dyn CommandRecorder,
    ) -> Self {
        Self {
            node,
            textures,
            renderer_lists,
            globals,
            cmd,
        }
    }

    pub fn pass_name(&self) -> &str {
        &self.node.name
    }

    fn undeclared(&self, resource: String) -> FrameGraphError {
        FrameGraphError::UndeclaredAccess {
            pass: self.node.name.clone(),
            resource,
        }
    }

    /// Resolve a declared texture to its backing
    pub fn texture(&self, handle: TextureHandle) -> FrameGraphResult<BackendTexture> {
        if self.node.access_to(handle).is_none() {
            return Err(self.undeclared(format!("texture '{}'", self.textures.label(handle))));
        }
        self.textures.resolve(handle)
    }

    pub fn renderer_list(&self, handle: RendererListHandle) -> FrameGraphResult<RendererList> {
        self.renderer_lists
            .iter()
            .find(|(h, _)| *h == handle)
            .map(|(_, list)| *list)
            .ok_or_else(|| self.undeclared(format!("renderer list #{}", handle.index())))
    }

    pub fn set_viewport(&mut self, rect: Rect) {
        self.cmd.set_viewport(rect);
    }

    fn check_global_state(&self) -> FrameGraphResult<()> {
        if self.node.allow_global_state {
            Ok(())
        } else {
            Err(FrameGraphError::UndeclaredGlobalState {
                pass: self.node.name.clone(),
            })
        }
    }

    pub fn set_keyword(&mut self, keyword: ShaderKeyword, enabled: bool) -> FrameGraphResult<()> {
        self.check_global_state()?;
        self.globals.set_keyword(keyword, enabled);
        self.cmd.set_keyword(keyword, enabled);
        Ok(())
    }

    pub fn set_global_vector(&mut self, name: &'static str, value: Vec4) -> FrameGraphResult<()> {
        self.check_global_state()?;
        self.globals.set_vector(name, value);
        self.cmd.set_global_vector(name, value);
        Ok(())
    }

    pub fn set_material_float(&mut self, material: MaterialHandle, name: &'static str, value: f32) {
        self.cmd.set_material_float(material, name, value);
    }

    pub fn set_material_texture(
        &mut self,
        material: MaterialHandle,
        name: &'static str,
        handle: TextureHandle,
    ) -> FrameGraphResult<()> {
        let texture = self.texture(handle)?;
        self.cmd.set_material_texture(material, name, texture);
        Ok(())
    }

    /// Full-screen blit of a declared source through `material`
    pub fn blit(
        &mut self,
        source: TextureHandle,
        scale_bias: Vec4,
        material: MaterialHandle,
        technique: u32,
    ) -> FrameGraphResult<()> {
        let texture = self.texture(source)?;
        self.cmd.blit_texture(texture, scale_bias, material, technique);
        Ok(())
    }

    pub fn draw_renderer_list(&mut self, handle: RendererListHandle) -> FrameGraphResult<()> {
        let list = self.renderer_list(handle)?;
        self.cmd.draw_renderer_list(&list);
        Ok(())
    }

    /// Record the pass: open its render targets, replay the work item, then
    /// publish its global promotions.
    pub(crate) fn run(
        mut self,
        work: &PassData,
        store_op: impl Fn(TextureHandle) -> StoreOp,
        debug_groups: bool,
    ) -> FrameGraphResult<()> {
        if debug_groups {
            self.cmd.push_debug_group(&self.node.name);
        }

        // Scopes are closed even when recording fails
        let recorded = match self.node.render_pass_descriptor(self.textures, store_op) {
            Ok(Some(desc)) => {
                self.cmd.begin_render_pass(&desc);
                let recorded = work.record(&mut self);
                self.cmd.end_render_pass();
                recorded
            }
            Ok(None) => work.record(&mut self),
            Err(err) => Err(err),
        };

        if debug_groups {
            self.cmd.pop_debug_group();
        }
        recorded?;

        for promotion in &self.node.promotions {
            let texture = self.textures.resolve(promotion.handle)?;
            log::trace!(
                "Pass '{}' promotes '{}' as {}",
                self.node.name,
                self.textures.label(promotion.handle),
                promotion.name
            );
            self.globals.set_texture(promotion.name, texture);
            self.cmd.set_global_texture(promotion.name, texture);
        }
        Ok(())
    }
}
