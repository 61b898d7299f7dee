use kagura_animation::AnimationHelper;
use kagura_core::RenderError;
use kagura_scene::{Camera, Scene, SkyTarget, SkyUniforms};

use crate::outline::OutlineParams;
use crate::overlays::Overlays;

/// Everything a backend may read while drawing one frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameContext<'a> {
    pub scene: &'a Scene,
    pub camera: &'a Camera,
    /// Source of the animated poses
    pub helper: &'a AnimationHelper,
    pub sky: &'a SkyUniforms,
    pub overlays: &'a Overlays,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub frame_index: u64,
    pub mesh_draws: u32,
    pub outline_draws: u32,
    pub overlay_lines: u32,
    pub overlay_markers: u32,
}

/// A render backend. Sky changes arrive through [`SkyTarget`].
pub trait FrameRenderer: SkyTarget {
    /// Draws the scene pass.
    fn render(&mut self, frame: &FrameContext<'_>) -> Result<FrameStats, RenderError>;

    /// Draws inverted-hull outlines over the scene pass; returns the draw count.
    fn render_outline(&mut self, frame: &FrameContext<'_>, params: &OutlineParams) -> Result<u32, RenderError>;

    fn set_size(&mut self, width: u32, height: u32) -> Result<(), RenderError>;

    fn size(&self) -> (u32, u32);
}
