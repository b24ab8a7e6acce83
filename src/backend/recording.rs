//! In-memory recording backend
//!
//! Logs every command instead of encoding it. Used by the test suite and by
//! orchestrators that want to inspect what a frame would submit.

use crate::backend::traits::*;
use crate::backend::types::*;
use glam::Vec4;
use std::collections::HashSet;

/// One recorded backend call
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCommand {
    BeginRenderPass(RenderPassDescriptor),
    EndRenderPass,
    PushDebugGroup(String),
    PopDebugGroup,
    SetViewport(Rect),
    SetKeyword(ShaderKeyword, bool),
    SetGlobalTexture(&'static str, BackendTexture),
    SetGlobalVector(&'static str, Vec4),
    SetMaterialFloat(MaterialHandle, &'static str, f32),
    SetMaterialTexture(MaterialHandle, &'static str, BackendTexture),
    Blit {
        source: BackendTexture,
        scale_bias: Vec4,
        material: MaterialHandle,
        technique: u32,
    },
    DrawRendererList(RendererList),
}

/// Backend that records commands, hands out texture ids and answers draw-item
/// queries with a configurable number of draws.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    commands: Vec<RecordedCommand>,
    live_textures: HashSet<BackendTexture>,
    created_textures: Vec<TextureDescriptor>,
    renderer_lists: Vec<RendererListDesc>,
    next_id: u64,
    /// Draw count reported for [`RendererListKind::Main`] queries
    pub main_draw_count: usize,
    /// Draw count reported for [`RendererListKind::ErrorFallback`] queries
    pub error_draw_count: usize,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self {
            main_draw_count: 1,
            ..Default::default()
        }
    }

    /// Commands recorded since the last [`take_commands`](Self::take_commands) or discard
    pub fn commands(&self) -> &[RecordedCommand] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<RecordedCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Descriptors of every texture ever created, in creation order
    pub fn created_textures(&self) -> &[TextureDescriptor] {
        &self.created_textures
    }

    pub fn live_texture_count(&self) -> usize {
        self.live_textures.len()
    }

    /// Draw-item queries answered so far
    pub fn renderer_list_queries(&self) -> &[RendererListDesc] {
        &self.renderer_lists
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

impl CommandRecorder for RecordingBackend {
    fn begin_render_pass(&mut self, desc: &RenderPassDescriptor) {
        self.commands.push(RecordedCommand::BeginRenderPass(desc.clone()));
    }

    fn end_render_pass(&mut self) {
        self.commands.push(RecordedCommand::EndRenderPass);
    }

    fn push_debug_group(&mut self, label: &str) {
        self.commands.push(RecordedCommand::PushDebugGroup(label.to_string()));
    }

    fn pop_debug_group(&mut self) {
        self.commands.push(RecordedCommand::PopDebugGroup);
    }

    fn set_viewport(&mut self, rect: Rect) {
        self.commands.push(RecordedCommand::SetViewport(rect));
    }

    fn set_keyword(&mut self, keyword: ShaderKeyword, enabled: bool) {
        self.commands.push(RecordedCommand::SetKeyword(keyword, enabled));
    }

    fn set_global_texture(&mut self, name: &'static str, texture: BackendTexture) {
        self.commands.push(RecordedCommand::SetGlobalTexture(name, texture));
    }

    fn set_global_vector(&mut self, name: &'static str, value: Vec4) {
        self.commands.push(RecordedCommand::SetGlobalVector(name, value));
    }

    fn set_material_float(&mut self, material: MaterialHandle, name: &'static str, value: f32) {
        self.commands.push(RecordedCommand::SetMaterialFloat(material, name, value));
    }

    fn set_material_texture(
        &mut self,
        material: MaterialHandle,
        name: &'static str,
        texture: BackendTexture,
    ) {
        self.commands.push(RecordedCommand::SetMaterialTexture(material, name, texture));
    }

    fn blit_texture(
        &mut self,
        source: BackendTexture,
        scale_bias: Vec4,
        material: MaterialHandle,
        technique: u32,
    ) {
        self.commands.push(RecordedCommand::Blit {
            source,
            scale_bias,
            material,
            technique,
        });
    }

    fn draw_renderer_list(&mut self, list: &RendererList) {
        self.commands.push(RecordedCommand::DrawRendererList(*list));
    }

    fn discard(&mut self) {
        self.commands.clear();
    }
}

impl TextureAllocator for RecordingBackend {
    fn create_texture(&mut self, desc: &TextureDescriptor) -> BackendResult<BackendTexture> {
        if let Some(reason) = desc.validate() {
            return Err(BackendError::TextureCreationFailed(format!(
                "{}: {reason}",
                desc.label
            )));
        }
        let texture = BackendTexture::new(self.next_id());
        self.live_textures.insert(texture);
        self.created_textures.push(desc.clone());
        Ok(texture)
    }

    fn destroy_texture(&mut self, texture: BackendTexture) {
        self.live_textures.remove(&texture);
    }
}

impl DrawItemQuery for RecordingBackend {
    fn create_renderer_list(&mut self, desc: &RendererListDesc) -> BackendResult<RendererList> {
        let draw_count = match desc.kind {
            RendererListKind::Main => self.main_draw_count,
            RendererListKind::ErrorFallback => self.error_draw_count,
        };
        self.renderer_lists.push(desc.clone());
        Ok(RendererList::new(self.next_id(), draw_count))
    }
}
