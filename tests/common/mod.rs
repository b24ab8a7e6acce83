//! Common utilities for the frame graph integration tests.
//!
//! Fixtures for frames, descriptors and materials, plus helpers that pick
//! apart the command log of a [`RecordingBackend`].

#![allow(dead_code)]

use std::collections::HashMap;

use framegraph_passes::backend::{
    RecordedCommand, RenderPassDescriptor, ShaderKeyword, TextureDescriptor, TextureFormat,
};
use framegraph_passes::{BackendTexture, CameraData, FrameData, MaterialHandle};
use glam::Vec4;

/// Initialise logging once per test binary.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn copy_material() -> MaterialHandle {
    MaterialHandle::new(100)
}

pub fn sampling_material() -> MaterialHandle {
    MaterialHandle::new(101)
}

pub fn copy_depth_material() -> MaterialHandle {
    MaterialHandle::new(102)
}

/// Frame for a camera rendering at `width` x `height`.
pub fn frame(width: u32, height: u32) -> FrameData {
    FrameData::new(CameraData::new(width, height))
}

pub fn color_desc(label: &str, width: u32, height: u32) -> TextureDescriptor {
    TextureDescriptor::color(label, width, height, TextureFormat::Rgba16Float)
}

pub fn depth_desc(label: &str, width: u32, height: u32) -> TextureDescriptor {
    TextureDescriptor::depth(label, width, height, TextureFormat::Depth32Float)
}

/// Backing ids handed out for imported textures; kept far away from the ids
/// the recording backend allocates.
pub fn external(id: u64) -> BackendTexture {
    BackendTexture::new(1000 + id)
}

/// Render pass descriptors in recording order.
pub fn render_passes(commands: &[RecordedCommand]) -> Vec<&RenderPassDescriptor> {
    commands
        .iter()
        .filter_map(|c| match c {
            RecordedCommand::BeginRenderPass(desc) => Some(desc),
            _ => None,
        })
        .collect()
}

/// Final value of every keyword touched by the commands.
pub fn keyword_states(commands: &[RecordedCommand]) -> HashMap<ShaderKeyword, bool> {
    commands
        .iter()
        .filter_map(|c| match c {
            RecordedCommand::SetKeyword(keyword, enabled) => Some((*keyword, *enabled)),
            _ => None,
        })
        .collect()
}

/// Value a global vector was last set to.
pub fn global_vector(commands: &[RecordedCommand], name: &str) -> Option<Vec4> {
    commands.iter().rev().find_map(|c| match c {
        RecordedCommand::SetGlobalVector(n, value) if *n == name => Some(*value),
        _ => None,
    })
}

/// Position of the first command matching `pred`.
pub fn position(
    commands: &[RecordedCommand],
    pred: impl Fn(&RecordedCommand) -> bool,
) -> Option<usize> {
    commands.iter().position(pred)
}

/// Debug group labels in the order they were opened.
pub fn debug_groups(commands: &[RecordedCommand]) -> Vec<String> {
    commands
        .iter()
        .filter_map(|c| match c {
            RecordedCommand::PushDebugGroup(label) => Some(label.clone()),
            _ => None,
        })
        .collect()
}
