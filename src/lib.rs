//! Frame graph render passes
//!
//! This crate provides a declarative frame graph for GPU render passes plus the
//! concrete passes of a deferred pipeline's opaque section:
//! - **Copy Color**: (optionally downsampled) copy of the active colour buffer
//! - **Copy Depth**: MSAA-aware depth resolve into a depth or colour target
//! - **Depth/Normal Prepass** and **Depth-Only Prepass**
//! - **Draw Objects**: opaque or transparent draw-item submission
//!
//! # Features
//! - Handle-based resource registry that is reset every frame
//! - Access declarations drive dependency ordering, pass culling and memory aliasing
//! - Deferred execution: passes declare now and are replayed later from an immutable [`PassData`]
//! - An immediate-mode adapter running the same pass logic against pre-bound resources
//!
//! The GPU command encoder, material system, culling and the per-frame orchestrator are
//! external; they are reached through the traits in [`backend`].

pub mod backend;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod render_graph;
pub mod scene;

pub use backend::{
    BackendError, BackendTexture, CommandRecorder, DrawItemQuery, MaterialHandle, RecordingBackend,
    RenderBackend, TextureAllocator, TextureDescriptor, TextureFormat,
};
pub use config::FrameGraphConfig;
pub use error::{FrameGraphError, FrameGraphResult};
pub use pipeline::{
    CopyColorPass, CopyDepthPass, CopyDepthSettings, DepthNormalPrepass, DepthOnlyPrepass,
    Downsampling, DrawObjectsPass, DrawObjectsSettings, PassData, RenderPassEvent,
};
pub use render_graph::{
    AccessFlags, CompiledGraph, ExecutedFrame, GlobalBindings, ImmediateContext, PassBuilder,
    PassId, RenderGraph, RenderGraphExecutor, RenderPass, TextureHandle, TransientTexturePool,
};
pub use scene::{CameraData, CullingResults, FrameData, LightData};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log the library version. Call once during renderer start-up.
pub fn init() {
    log::info!("framegraph-passes v{} initialized", VERSION);
}
