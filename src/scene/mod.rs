//! Frame context
//!
//! Camera, light and culling data produced outside this crate and consumed
//! read-only by passes.

mod camera;
mod light;

pub use camera::*;
pub use light::*;

/// Opaque token for the visibility results of the current frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CullingResults(pub u64);

/// Everything a pass may read about the frame it is declared in
#[derive(Debug, Clone)]
pub struct FrameData {
    pub camera: CameraData,
    pub lights: LightData,
    pub culling: CullingResults,
}

impl FrameData {
    pub fn new(camera: CameraData) -> Self {
        Self {
            camera,
            lights: LightData::default(),
            culling: CullingResults::default(),
        }
    }

    pub fn with_lights(mut self, lights: LightData) -> Self {
        self.lights = lights;
        self
    }

    pub fn with_culling(mut self, culling: CullingResults) -> Self {
        self.culling = culling;
        self
    }
}
