use glam::Vec3;

use kagura_core::RenderError;
use kagura_scene::{SkyTarget, SkyUniforms};

use crate::renderer::{FrameContext, FrameRenderer, FrameStats};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlineParams {
    /// Hull offset relative to the model size
    pub thickness: f32,
    pub color: Vec3,
    pub alpha: f32,
}

impl Default for OutlineParams {
    fn default() -> Self {
        Self {
            thickness: 0.003,
            color: Vec3::ZERO,
            alpha: 1.0,
        }
    }
}

/// Wraps a renderer and adds an outline pass after the scene pass.
#[derive(Debug)]
pub struct OutlineEffect<R> {
    renderer: R,
    pub enabled: bool,
    pub params: OutlineParams,
}

impl<R: FrameRenderer> OutlineEffect<R> {
    pub fn new(renderer: R) -> Self {
        Self {
            renderer,
            enabled: true,
            params: OutlineParams::default(),
        }
    }

    /// Renders one frame, with outlines when enabled.
    pub fn render(&mut self, frame: &FrameContext<'_>) -> Result<FrameStats, RenderError> {
        let mut stats = self.renderer.render(frame)?;
        if self.enabled {
            stats.outline_draws = self.renderer.render_outline(frame, &self.params)?;
        }
        Ok(stats)
    }

    pub fn set_size(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        self.renderer.set_size(width, height)
    }

    #[inline]
    #[must_use]
    pub fn size(&self) -> (u32, u32) {
        self.renderer.size()
    }

    #[inline]
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    #[inline]
    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn into_inner(self) -> R {
        self.renderer
    }
}

impl<R: FrameRenderer> SkyTarget for OutlineEffect<R> {
    fn apply_sky(&mut self, uniforms: &SkyUniforms) {
        self.renderer.apply_sky(uniforms);
    }
}
