//! Per-frame table of global shader bindings

use crate::backend::types::{BackendTexture, ShaderKeyword};
use glam::Vec4;
use std::collections::HashMap;

/// Symbolic bindings published during one frame.
///
/// A fresh table is created for every executed frame and returned to the caller
/// afterwards; nothing carries over implicitly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlobalBindings {
    textures: HashMap<&'static str, BackendTexture>,
    vectors: HashMap<&'static str, Vec4>,
    keywords: HashMap<ShaderKeyword, bool>,
}

impl GlobalBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn texture(&self, name: &str) -> Option<BackendTexture> {
        self.textures.get(name).copied()
    }

    pub fn vector(&self, name: &str) -> Option<Vec4> {
        self.vectors.get(name).copied()
    }

    /// `None` when no pass touched the keyword this frame
    pub fn keyword(&self, keyword: ShaderKeyword) -> Option<bool> {
        self.keywords.get(&keyword).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty() && self.vectors.is_empty() && self.keywords.is_empty()
    }

    pub(crate) fn set_texture(&mut self, name: &'static str, texture: BackendTexture) {
        self.textures.insert(name, texture);
    }

    pub(crate) fn set_vector(&mut self, name: &'static str, value: Vec4) {
        self.vectors.insert(name, value);
    }

    pub(crate) fn set_keyword(&mut self, keyword: ShaderKeyword, enabled: bool) {
        self.keywords.insert(keyword, enabled);
    }

    pub fn clear(&mut self) {
        self.textures.clear();
        self.vectors.clear();
        self.keywords.clear();
    }
}
