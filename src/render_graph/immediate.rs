//! Immediate-mode adapter
//!
//! Runs a pass straight against a command recorder without building a graph.
//! Every texture is imported with its backing already bound, so there is
//! nothing to schedule or allocate. Passes go through the same declaration
//! logic as in graph mode, which keeps the recorded commands identical.

use crate::backend::traits::{CommandRecorder, DrawItemQuery};
use crate::backend::types::*;
use crate::config::FrameGraphConfig;
use crate::error::{FrameGraphError, FrameGraphResult};
use crate::render_graph::context::RasterContext;
use crate::render_graph::globals::GlobalBindings;
use crate::render_graph::pass::{PassBuilder, PassNode, RenderPass};
use crate::render_graph::resource::*;
use crate::scene::FrameData;

#[derive(Debug, Default)]
pub struct ImmediateContext {
    config: FrameGraphConfig,
    textures: TextureRegistry,
    renderer_lists: RendererListTable,
    globals: GlobalBindings,
}

impl ImmediateContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: FrameGraphConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Forget the previous frame's textures and global bindings
    pub fn begin_frame(&mut self) {
        self.textures.reset();
        self.renderer_lists.reset();
        self.globals.clear();
    }

    pub fn import_texture(
        &mut self,
        desc: TextureDescriptor,
        backing: BackendTexture,
    ) -> FrameGraphResult<TextureHandle> {
        self.textures.import(desc, backing, false)
    }

    pub fn import_backbuffer(
        &mut self,
        desc: TextureDescriptor,
        backing: BackendTexture,
    ) -> FrameGraphResult<TextureHandle> {
        self.textures.import(desc, backing, true)
    }

    pub fn textures(&self) -> &TextureRegistry {
        &self.textures
    }

    /// Bindings published by the passes executed so far this frame
    pub fn globals(&self) -> &GlobalBindings {
        &self.globals
    }

    /// Declare and record one pass right away.
    ///
    /// On failure the recorder's pending commands are discarded.
    pub fn execute<B>(
        &mut self,
        pass: &dyn RenderPass,
        frame: &FrameData,
        backend: &mut B,
    ) -> FrameGraphResult<()>
    where
        B: CommandRecorder + DrawItemQuery,
    {
        let result = self.record(pass, frame, backend);
        if let Err(err) = &result {
            log::warn!("Immediate pass '{}' failed: {err}", pass.name());
            backend.discard();
        }
        result
    }

    /// Execute several passes ordered by their event; equal events keep the
    /// given order
    pub fn execute_all<B>(
        &mut self,
        passes: &[&dyn RenderPass],
        frame: &FrameData,
        backend: &mut B,
    ) -> FrameGraphResult<()>
    where
        B: CommandRecorder + DrawItemQuery,
    {
        let mut ordered = passes.to_vec();
        ordered.sort_by_key(|pass| pass.event());
        for pass in ordered {
            self.execute(pass, frame, backend)?;
        }
        Ok(())
    }

    fn record<B>(
        &mut self,
        pass: &dyn RenderPass,
        frame: &FrameData,
        backend: &mut B,
    ) -> FrameGraphResult<()>
    where
        B: CommandRecorder + DrawItemQuery,
    {
        let mut node = PassNode::new(pass.name());
        {
            let mut builder = PassBuilder::new(&self.textures, &mut self.renderer_lists, &mut node);
            pass.declare(&mut builder, frame)?;
        }
        node.validate_work(&self.textures)?;
        let Some(work) = node.work.take() else {
            return Err(FrameGraphError::MissingRenderFunc {
                pass: node.name.clone(),
            });
        };

        let mut lists = Vec::with_capacity(node.renderer_lists.len());
        for &handle in &node.renderer_lists {
            if let Some(desc) = self.renderer_lists.get(handle) {
                lists.push((handle, backend.create_renderer_list(desc)?));
            }
        }

        let ctx = RasterContext::new(&node, &self.textures, &lists, &mut self.globals, backend);
        ctx.run(&work, |_| StoreOp::Store, self.config.debug_groups)
    }
}
