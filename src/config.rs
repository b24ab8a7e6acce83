//! Frame graph configuration

/// Configuration for compiling and executing a [`RenderGraph`](crate::RenderGraph)
#[derive(Debug, Clone)]
pub struct FrameGraphConfig {
    /// Remove passes whose outputs nothing observes (per-pass opt-out still applies)
    pub pass_culling: bool,
    /// Let transient textures with disjoint lifetimes share one backing texture
    pub memory_aliasing: bool,
    /// Wrap every pass in a debug group named after the pass
    pub debug_groups: bool,
}

impl Default for FrameGraphConfig {
    fn default() -> Self {
        Self {
            pass_culling: true,
            memory_aliasing: true,
            debug_groups: true,
        }
    }
}
