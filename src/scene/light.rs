//! Light context consumed by draw-item queries

/// Light information aggregated by the frame context provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LightData {
    /// Index of the main directional light among the visible lights
    pub main_light_index: Option<usize>,
    pub additional_lights_count: usize,
}
