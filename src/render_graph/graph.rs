//! Render graph definition and compilation

use crate::backend::types::{BackendTexture, StoreOp, TextureDescriptor};
use crate::config::FrameGraphConfig;
use crate::error::{FrameGraphError, FrameGraphResult};
use crate::render_graph::pass::*;
use crate::render_graph::resource::*;
use crate::scene::FrameData;
use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashMap, HashSet};

/// The main render graph structure.
///
/// Owns the declarations of one frame. Passes are added, the graph is compiled
/// into a schedule, and a [`RenderGraphExecutor`](crate::RenderGraphExecutor)
/// replays it. [`begin_frame`](Self::begin_frame) starts over and invalidates
/// every handle of the previous frame.
#[derive(Debug, Default)]
pub struct RenderGraph {
    config: FrameGraphConfig,
    pub(crate) textures: TextureRegistry,
    pub(crate) renderer_lists: RendererListTable,
    pub(crate) passes: Vec<PassNode>,
}

impl RenderGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: FrameGraphConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &FrameGraphConfig {
        &self.config
    }

    /// Drop all declarations and start a new frame
    pub fn begin_frame(&mut self) {
        self.passes.clear();
        self.textures.reset();
        self.renderer_lists.reset();
    }

    pub fn frame(&self) -> u32 {
        self.textures.frame()
    }

    /// Create a transient texture; backing memory is assigned at execution
    pub fn create_texture(&mut self, desc: TextureDescriptor) -> FrameGraphResult<TextureHandle> {
        self.textures.create(desc)
    }

    /// Register an externally owned texture for this frame
    pub fn import_texture(
        &mut self,
        desc: TextureDescriptor,
        backing: BackendTexture,
    ) -> FrameGraphResult<TextureHandle> {
        self.textures.import(desc, backing, false)
    }

    /// Register the presentation target for this frame
    pub fn import_backbuffer(
        &mut self,
        desc: TextureDescriptor,
        backing: BackendTexture,
    ) -> FrameGraphResult<TextureHandle> {
        self.textures.import(desc, backing, true)
    }

    pub fn is_valid(&self, handle: TextureHandle) -> bool {
        self.textures.is_valid(handle)
    }

    pub fn texture_descriptor(&self, handle: TextureHandle) -> FrameGraphResult<&TextureDescriptor> {
        self.textures.descriptor(handle)
    }

    pub fn textures(&self) -> &TextureRegistry {
        &self.textures
    }

    /// Add a pass declared by `setup`.
    ///
    /// `setup` must hand a work item to [`PassBuilder::set_render_func`].
    pub fn add_raster_pass<F>(&mut self, name: &str, setup: F) -> FrameGraphResult<PassId>
    where
        F: FnOnce(&mut PassBuilder<'_>) -> FrameGraphResult<()>,
    {
        let id = PassId(self.passes.len() as u32);
        let mut node = PassNode::new(name);
        {
            let mut builder = PassBuilder::new(&self.textures, &mut self.renderer_lists, &mut node);
            setup(&mut builder)?;
        }
        if !node.has_work() {
            return Err(FrameGraphError::MissingRenderFunc {
                pass: name.to_string(),
            });
        }
        self.passes.push(node);
        Ok(id)
    }

    /// Add a concrete pass through its declaration logic
    pub fn add_pass(&mut self, pass: &dyn RenderPass, frame: &FrameData) -> FrameGraphResult<PassId> {
        self.add_raster_pass(pass.name(), |builder| pass.declare(builder, frame))
    }

    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    pub fn pass(&self, id: PassId) -> Option<&PassNode> {
        self.passes.get(id.index())
    }

    pub fn pass_name(&self, id: PassId) -> Option<&str> {
        self.pass(id).map(|node| node.name.as_str())
    }

    fn is_imported(&self, handle: TextureHandle) -> bool {
        matches!(
            self.textures.origin(handle),
            Ok(TextureOrigin::Imported { .. })
        )
    }

    /// Compile the graph - validation, ordering, culling and memory planning
    pub fn compile(&self) -> FrameGraphResult<CompiledGraph> {
        for node in &self.passes {
            node.validate_work(&self.textures)?;
        }

        let edges = self.build_dependency_edges()?;
        let sorted = topological_sort(&edges)?;

        let culled: HashSet<usize> = if self.config.pass_culling {
            self.compute_culled_passes(&sorted)
        } else {
            HashSet::new()
        };

        let pass_order: Vec<PassId> = sorted
            .iter()
            .filter(|index| !culled.contains(index))
            .map(|&index| PassId(index as u32))
            .collect();
        let culled_passes: Vec<PassId> = sorted
            .iter()
            .filter(|index| culled.contains(index))
            .map(|&index| PassId(index as u32))
            .collect();

        let resource_lifetimes = self.compute_lifetimes(&pass_order);
        let (physical_textures, aliases) = self.compute_aliasing(&resource_lifetimes)?;
        let store_ops = self.compute_store_ops(&pass_order);

        log::debug!(
            "Compiled frame {}: order [{}], culled [{}], {} transient textures in {} allocations",
            self.frame(),
            self.names(&pass_order),
            self.names(&culled_passes),
            resource_lifetimes.len(),
            physical_textures.len()
        );

        Ok(CompiledGraph {
            frame: self.frame(),
            pass_order,
            culled_passes,
            resource_lifetimes,
            physical_textures,
            aliases,
            store_ops,
        })
    }

    fn names(&self, ids: &[PassId]) -> String {
        ids.iter()
            .filter_map(|&id| self.pass_name(id))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Read-after-write, write-after-write and write-after-read edges in
    /// declaration order. `edges[a]` holds the passes that must run after `a`.
    fn build_dependency_edges(&self) -> FrameGraphResult<Vec<BTreeSet<usize>>> {
        #[derive(Default)]
        struct HandleState {
            last_writer: Option<usize>,
            readers: Vec<usize>,
        }

        let mut edges = vec![BTreeSet::new(); self.passes.len()];
        let mut states: HashMap<TextureHandle, HandleState> = HashMap::new();

        for (index, node) in self.passes.iter().enumerate() {
            for handle in node.textures() {
                let Some(access) = node.access_to(handle) else {
                    continue;
                };
                let imported = self.is_imported(handle);
                let state = states.entry(handle).or_default();

                if access.reads() {
                    match state.last_writer {
                        Some(writer) => {
                            edges[writer].insert(index);
                        }
                        None if imported => {}
                        None => {
                            return Err(FrameGraphError::UnwrittenRead {
                                pass: node.name.clone(),
                                texture: self.textures.label(handle),
                            })
                        }
                    }
                }

                if access.writes() {
                    if let Some(writer) = state.last_writer {
                        if access == AccessFlags::Write {
                            return Err(FrameGraphError::DuplicateWrite {
                                pass: node.name.clone(),
                                texture: self.textures.label(handle),
                                first_writer: self.passes[writer].name.clone(),
                            });
                        }
                        edges[writer].insert(index);
                    }
                    for &reader in &state.readers {
                        edges[reader].insert(index);
                    }
                    state.readers.clear();
                    state.last_writer = Some(index);
                } else {
                    state.readers.push(index);
                }
            }
        }

        Ok(edges)
    }

    /// Walk the schedule backwards from passes with observable output and
    /// keep every producer they read from.
    fn compute_culled_passes(&self, sorted: &[usize]) -> HashSet<usize> {
        let mut required: HashSet<TextureHandle> = self
            .textures
            .handles()
            .filter(|&handle| self.is_imported(handle))
            .collect();
        let mut live = HashSet::new();

        for &index in sorted.iter().rev() {
            let node = &self.passes[index];
            let handles = node.textures();
            let writes_required = handles
                .iter()
                .any(|&h| node.writes_resource(h) && required.contains(&h));

            if !node.allow_culling || writes_required {
                live.insert(index);
                required.extend(handles.into_iter().filter(|&h| node.reads_resource(h)));
            }
        }

        (0..self.passes.len())
            .filter(|index| !live.contains(index))
            .collect()
    }

    fn compute_lifetimes(&self, pass_order: &[PassId]) -> HashMap<TextureHandle, ResourceLifetime> {
        let mut lifetimes: HashMap<TextureHandle, ResourceLifetime> = HashMap::new();

        for (step, &id) in pass_order.iter().enumerate() {
            for handle in self.passes[id.index()].textures() {
                if self.is_imported(handle) {
                    continue;
                }
                let lifetime = lifetimes.entry(handle).or_insert(ResourceLifetime {
                    first_use: step,
                    last_use: step,
                });
                lifetime.last_use = step;
            }
        }

        // Globals stay bound until the frame ends, so promoted backings must too
        if let Some(last_step) = pass_order.len().checked_sub(1) {
            for &id in pass_order {
                for promotion in &self.passes[id.index()].promotions {
                    if let Some(lifetime) = lifetimes.get_mut(&promotion.handle) {
                        lifetime.last_use = last_step;
                    }
                }
            }
        }

        lifetimes
    }

    /// Greedy first-fit assignment of transient textures to physical
    /// allocations whose previous occupant is already dead
    fn compute_aliasing(
        &self,
        lifetimes: &HashMap<TextureHandle, ResourceLifetime>,
    ) -> FrameGraphResult<(Vec<PhysicalTexture>, HashMap<TextureHandle, usize>)> {
        let mut ordered: Vec<(TextureHandle, ResourceLifetime)> =
            lifetimes.iter().map(|(&h, &lt)| (h, lt)).collect();
        ordered.sort_by_key(|(handle, lifetime)| (lifetime.first_use, handle.index()));

        let mut physical: Vec<PhysicalTexture> = Vec::new();
        let mut aliases = HashMap::new();

        for (handle, lifetime) in ordered {
            let desc = self.textures.descriptor(handle)?;
            let reusable = if self.config.memory_aliasing {
                physical.iter().position(|p| {
                    p.last_use < lifetime.first_use && p.descriptor.is_alias_compatible(desc)
                })
            } else {
                None
            };

            let slot = match reusable {
                Some(slot) => {
                    let entry = &mut physical[slot];
                    entry.textures.push(handle);
                    entry.last_use = lifetime.last_use;
                    slot
                }
                None => {
                    physical.push(PhysicalTexture {
                        descriptor: desc.clone(),
                        textures: vec![handle],
                        first_use: lifetime.first_use,
                        last_use: lifetime.last_use,
                    });
                    physical.len() - 1
                }
            };
            aliases.insert(handle, slot);
        }

        Ok((physical, aliases))
    }

    /// Attachments are stored when imported, promoted, or read later on
    fn compute_store_ops(&self, pass_order: &[PassId]) -> HashMap<(PassId, TextureHandle), StoreOp> {
        let mut store_ops = HashMap::new();

        for (step, &id) in pass_order.iter().enumerate() {
            for (_, access) in self.passes[id.index()].attachments() {
                let handle = access.handle;
                let keep = self.is_imported(handle)
                    || pass_order
                        .iter()
                        .any(|&p| self.passes[p.index()].promotes(handle))
                    || pass_order[step + 1..]
                        .iter()
                        .any(|&p| self.passes[p.index()].reads_resource(handle));
                let op = if keep { StoreOp::Store } else { StoreOp::Discard };
                store_ops.insert((id, handle), op);
            }
        }

        store_ops
    }
}

/// Kahn's algorithm; ties resolve to the earliest declared pass
fn topological_sort(edges: &[BTreeSet<usize>]) -> FrameGraphResult<Vec<usize>> {
    let mut in_degree = vec![0usize; edges.len()];
    for targets in edges {
        for &target in targets {
            in_degree[target] += 1;
        }
    }

    let mut queue: BinaryHeap<Reverse<usize>> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, &degree)| degree == 0)
        .map(|(index, _)| Reverse(index))
        .collect();

    let mut sorted = Vec::with_capacity(edges.len());
    while let Some(Reverse(index)) = queue.pop() {
        sorted.push(index);
        for &target in &edges[index] {
            in_degree[target] -= 1;
            if in_degree[target] == 0 {
                queue.push(Reverse(target));
            }
        }
    }

    if sorted.len() != edges.len() {
        return Err(FrameGraphError::CyclicDependency);
    }
    Ok(sorted)
}

/// Resource lifetime in terms of pass execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceLifetime {
    pub first_use: usize,
    pub last_use: usize,
}

/// One backing allocation shared by transient textures with disjoint lifetimes
#[derive(Debug, Clone)]
pub struct PhysicalTexture {
    pub descriptor: TextureDescriptor,
    /// Logical textures placed here, in order of first use
    pub textures: Vec<TextureHandle>,
    pub first_use: usize,
    pub last_use: usize,
}

/// Compiled render graph with execution order and resource lifetimes
#[derive(Debug, Clone)]
pub struct CompiledGraph {
    pub(crate) frame: u32,
    pub pass_order: Vec<PassId>,
    pub culled_passes: Vec<PassId>,
    pub resource_lifetimes: HashMap<TextureHandle, ResourceLifetime>,
    pub(crate) physical_textures: Vec<PhysicalTexture>,
    pub(crate) aliases: HashMap<TextureHandle, usize>,
    pub(crate) store_ops: HashMap<(PassId, TextureHandle), StoreOp>,
}

impl CompiledGraph {
    /// Frame the schedule was compiled for
    pub fn frame(&self) -> u32 {
        self.frame
    }

    pub fn is_culled(&self, pass: PassId) -> bool {
        self.culled_passes.contains(&pass)
    }

    /// Check if a resource is alive at a given execution step
    pub fn is_resource_alive(&self, resource: TextureHandle, step: usize) -> bool {
        if let Some(lifetime) = self.resource_lifetimes.get(&resource) {
            step >= lifetime.first_use && step <= lifetime.last_use
        } else {
            false
        }
    }

    pub fn physical_textures(&self) -> &[PhysicalTexture] {
        &self.physical_textures
    }

    pub fn physical_texture_count(&self) -> usize {
        self.physical_textures.len()
    }

    /// Physical allocation backing a transient texture
    pub fn physical_slot(&self, handle: TextureHandle) -> Option<usize> {
        self.aliases.get(&handle).copied()
    }

    pub fn store_op(&self, pass: PassId, handle: TextureHandle) -> Option<StoreOp> {
        self.store_ops.get(&(pass, handle)).copied()
    }
}
