//! Render graph executor

use crate::backend::traits::*;
use crate::backend::types::*;
use crate::error::{FrameGraphError, FrameGraphResult};
use crate::render_graph::context::RasterContext;
use crate::render_graph::globals::GlobalBindings;
use crate::render_graph::graph::*;
use crate::render_graph::pool::TransientTexturePool;
use crate::render_graph::resource::*;

/// Result of a successfully executed frame
#[derive(Debug, Clone, Default)]
pub struct ExecutedFrame {
    /// Global bindings published by the frame's passes
    pub globals: GlobalBindings,
    /// Names of the passes that ran, in order
    pub executed_passes: Vec<String>,
}

/// Executor for running the compiled render graph.
///
/// Assigns backing textures from its pool, resolves draw-item queries and
/// replays each pass's work item in schedule order. Executing ends the frame:
/// the graph's handles are invalid afterwards, whether or not execution
/// succeeded.
#[derive(Debug, Default)]
pub struct RenderGraphExecutor {
    pool: TransientTexturePool,
}

impl RenderGraphExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Share an existing pool
    pub fn with_pool(pool: TransientTexturePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &TransientTexturePool {
        &self.pool
    }

    /// Execute the render graph
    pub fn execute<B: RenderBackend>(
        &mut self,
        graph: &mut RenderGraph,
        compiled: &CompiledGraph,
        backend: &mut B,
    ) -> FrameGraphResult<ExecutedFrame> {
        if compiled.frame != graph.frame() {
            return Err(FrameGraphError::StaleCompilation {
                compiled_frame: compiled.frame,
                current_frame: graph.frame(),
            });
        }

        let mut acquired: Vec<Option<BackendTexture>> = vec![None; compiled.physical_textures.len()];
        let result = self.run(graph, compiled, backend, &mut acquired);

        if let Err(err) = &result {
            log::warn!("Frame {} aborted: {err}", compiled.frame);
            backend.discard();
        }

        for (slot, texture) in acquired.into_iter().enumerate() {
            if let Some(texture) = texture {
                self.pool
                    .release(&compiled.physical_textures[slot].descriptor, texture);
            }
        }
        graph.begin_frame();

        result
    }

    fn run<B: RenderBackend>(
        &mut self,
        graph: &mut RenderGraph,
        compiled: &CompiledGraph,
        backend: &mut B,
        acquired: &mut [Option<BackendTexture>],
    ) -> FrameGraphResult<ExecutedFrame> {
        let debug_groups = graph.config().debug_groups;
        let mut frame = ExecutedFrame::default();

        for (step, &pass_id) in compiled.pass_order.iter().enumerate() {
            let handles = graph.passes[pass_id.index()].textures();

            for &handle in &handles {
                if compiled.resource_lifetimes.get(&handle).map(|l| l.first_use) != Some(step) {
                    continue;
                }
                let Some(slot) = compiled.physical_slot(handle) else {
                    continue;
                };
                let texture = match acquired[slot] {
                    Some(texture) => texture,
                    None => {
                        let desc = &compiled.physical_textures[slot].descriptor;
                        let texture = self.pool.acquire(desc, backend)?;
                        acquired[slot] = Some(texture);
                        texture
                    }
                };
                graph.textures.bind_backing(handle, Some(texture));
            }

            let node = &mut graph.passes[pass_id.index()];
            let Some(work) = node.work.take() else {
                return Err(FrameGraphError::MissingRenderFunc {
                    pass: node.name.clone(),
                });
            };

            let mut lists: Vec<(RendererListHandle, RendererList)> =
                Vec::with_capacity(node.renderer_lists.len());
            for &handle in &node.renderer_lists {
                let Some(desc) = graph.renderer_lists.get(handle) else {
                    return Err(FrameGraphError::UndeclaredAccess {
                        pass: node.name.clone(),
                        resource: format!("renderer list #{}", handle.index()),
                    });
                };
                lists.push((handle, backend.create_renderer_list(desc)?));
            }

            log::trace!("Executing pass '{}' (step {step})", node.name);
            let node = &graph.passes[pass_id.index()];
            let ctx = RasterContext::new(node, &graph.textures, &lists, &mut frame.globals, backend);
            ctx.run(
                &work,
                |handle| {
                    compiled
                        .store_op(pass_id, handle)
                        .unwrap_or(StoreOp::Store)
                },
                debug_groups,
            )?;
            frame.executed_passes.push(node.name.clone());

            for &handle in &handles {
                if compiled.resource_lifetimes.get(&handle).map(|l| l.last_use) == Some(step) {
                    graph.textures.bind_backing(handle, None);
                }
            }
        }

        Ok(frame)
    }
}
