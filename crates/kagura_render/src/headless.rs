use glam::{Mat4, Vec3};

use kagura_animation::AnimatedEntity;
use kagura_core::RenderError;
use kagura_scene::{SkyTarget, SkyUniforms};

use crate::outline::OutlineParams;
use crate::renderer::{FrameContext, FrameRenderer, FrameStats};

/// A backend that draws nothing.
///
/// It still does the CPU side of a frame (skinning matrices, visibility,
/// overlay counts) and records what it was asked to do, which makes it the
/// backend for tests, benchmarks and the headless viewer.
#[derive(Debug, Default)]
pub struct HeadlessRenderer {
    width: u32,
    height: u32,
    frames_rendered: u64,
    outline_passes: u64,
    last_stats: Option<FrameStats>,
    clear_color: Vec3,
    sky: Option<SkyUniforms>,
    skinning: Vec<Vec<Mat4>>,
}

impl HeadlessRenderer {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    /// Number of scene passes rendered so far.
    #[must_use]
    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    #[must_use]
    pub fn outline_passes(&self) -> u64 {
        self.outline_passes
    }

    #[must_use]
    pub fn last_stats(&self) -> Option<FrameStats> {
        self.last_stats
    }

    #[must_use]
    pub fn clear_color(&self) -> Vec3 {
        self.clear_color
    }

    /// The last uniforms pushed by the sky controls.
    #[must_use]
    pub fn sky(&self) -> Option<&SkyUniforms> {
        self.sky.as_ref()
    }

    /// Joint matrices of every mesh drawn in the last frame, in draw order.
    #[must_use]
    pub fn skinning(&self) -> &[Vec<Mat4>] {
        &self.skinning
    }
}

impl SkyTarget for HeadlessRenderer {
    fn apply_sky(&mut self, uniforms: &SkyUniforms) {
        self.sky = Some(*uniforms);
    }
}

impl FrameRenderer for HeadlessRenderer {
    fn render(&mut self, frame: &FrameContext<'_>) -> Result<FrameStats, RenderError> {
        if self.width == 0 || self.height == 0 {
            return Err(RenderError::InvalidViewport {
                width: self.width,
                height: self.height,
            });
        }

        self.clear_color = frame.scene.background;
        self.skinning.clear();

        for instance in frame.scene.meshes().filter(|m| m.visible) {
            let skeleton = &instance.mesh.skeleton;
            // The helper may drive a different rig under the same id.
            let pose = frame
                .helper
                .entity(&instance.mesh.id)
                .map(AnimatedEntity::pose)
                .filter(|pose| pose.bone_count() == skeleton.len())
                .unwrap_or_else(|| skeleton.rest_pose());

            let matrices = pose.skinning_matrices(skeleton);
            if !matrices.iter().all(|m| m.is_finite()) {
                return Err(RenderError::Backend(format!(
                    "non-finite joint matrix in '{}'",
                    instance.mesh.name
                )));
            }
            self.skinning.push(matrices);
        }

        let stats = FrameStats {
            frame_index: self.frames_rendered,
            mesh_draws: self.skinning.len() as u32,
            outline_draws: 0,
            overlay_lines: frame.overlays.lines.len() as u32,
            overlay_markers: frame.overlays.markers.len() as u32,
        };
        self.frames_rendered += 1;
        self.last_stats = Some(stats);

        log::debug!(
            "Frame {}: {} meshes, {} overlay lines",
            stats.frame_index,
            stats.mesh_draws,
            stats.overlay_lines
        );
        Ok(stats)
    }

    fn render_outline(&mut self, _frame: &FrameContext<'_>, params: &OutlineParams) -> Result<u32, RenderError> {
        self.outline_passes += 1;
        if params.alpha <= 0.0 || params.thickness <= 0.0 {
            return Ok(0);
        }
        let draws = self.skinning.len() as u32;
        if let Some(stats) = self.last_stats.as_mut() {
            stats.outline_draws = draws;
        }
        Ok(draws)
    }

    fn set_size(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidViewport { width, height });
        }
        self.width = width;
        self.height = height;
        Ok(())
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
