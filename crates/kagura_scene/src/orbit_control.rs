use glam::{Vec2, Vec3};

use crate::camera::Camera;

/// Spherical orbit around a target point, driven by abstract input deltas.
#[derive(Debug, Clone)]
pub struct OrbitControls {
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub damping_factor: f32,
    pub enable_damping: bool,
    pub min_distance: f32,
    pub max_distance: f32,

    pub center: Vec3,
    pub radius: f32,
    pub theta: f32,
    pub phi: f32,

    rotate_delta: Vec2,
    pan_delta: Vec2,
    zoom_steps: f32,
}

impl OrbitControls {
    #[must_use]
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self {
            rotate_speed: 1.0,
            zoom_speed: 0.05,
            pan_speed: 1.0,
            damping_factor: 0.05,
            enable_damping: true,
            min_distance: 1.0,
            max_distance: 1000.0,

            center,
            radius,
            theta: 0.0,
            phi: std::f32::consts::FRAC_PI_2,

            rotate_delta: Vec2::ZERO,
            pan_delta: Vec2::ZERO,
            zoom_steps: 0.0,
        }
    }

    /// Orbit that starts where `eye` looks at `center`.
    #[must_use]
    pub fn looking_from(eye: Vec3, center: Vec3) -> Self {
        let offset = eye - center;
        let radius = offset.length().max(f32::EPSILON);
        let mut controls = Self::new(center, radius);
        controls.theta = offset.x.atan2(offset.z);
        controls.phi = (offset.y / radius).clamp(-1.0, 1.0).acos();
        controls
    }

    #[must_use]
    pub fn with_distance_limits(mut self, min: f32, max: f32) -> Self {
        self.min_distance = min;
        self.max_distance = max.max(min);
        self.radius = self.radius.clamp(self.min_distance, self.max_distance);
        self
    }

    /// Queues a rotation in radians (x: azimuth, y: polar).
    pub fn rotate(&mut self, delta: Vec2) {
        self.rotate_delta -= delta * self.rotate_speed;
    }

    /// Positive steps zoom in.
    pub fn zoom(&mut self, steps: f32) {
        self.zoom_steps += steps;
    }

    /// Pans by a screen-space delta, in world units at the target distance.
    pub fn pan(&mut self, delta: Vec2) {
        self.pan_delta += delta * self.pan_speed;
    }

    #[must_use]
    pub fn eye(&self) -> Vec3 {
        self.center + self.offset()
    }

    fn offset(&self) -> Vec3 {
        let (sin_phi, cos_phi) = self.phi.sin_cos();
        let (sin_theta, cos_theta) = self.theta.sin_cos();
        Vec3::new(
            self.radius * sin_phi * sin_theta,
            self.radius * cos_phi,
            self.radius * sin_phi * cos_theta,
        )
    }

    pub fn update(&mut self, camera: &mut Camera, dt: f32) {
        if self.enable_damping {
            let target_fps = 60.0;
            let retention = (1.0 - self.damping_factor).powf(dt * target_fps);
            let delta_apply = self.rotate_delta * (1.0 - retention);

            self.theta += delta_apply.x;
            self.phi += delta_apply.y;

            self.rotate_delta *= retention;
        } else {
            self.theta += self.rotate_delta.x;
            self.phi += self.rotate_delta.y;
            self.rotate_delta = Vec2::ZERO;
        }

        const EPS: f32 = 0.0001;
        self.phi = self.phi.clamp(EPS, std::f32::consts::PI - EPS);

        if self.zoom_steps != 0.0 {
            let scale = (1.0 - self.zoom_speed).powf(self.zoom_steps.abs());
            if self.zoom_steps > 0.0 {
                self.radius *= scale;
            } else {
                self.radius /= scale;
            }
            self.zoom_steps = 0.0;
        }
        self.radius = self.radius.clamp(self.min_distance, self.max_distance);

        if self.pan_delta != Vec2::ZERO {
            let forward = -self.offset().normalize_or(Vec3::Z);
            let right = forward.cross(Vec3::Y).normalize_or(Vec3::X);
            let up = right.cross(forward).normalize_or(Vec3::Y);

            self.center += right * -self.pan_delta.x + up * self.pan_delta.y;
            self.pan_delta = Vec2::ZERO;
        }

        camera.look_at(self.eye(), self.center, Vec3::Y);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zoom_respects_distance_limits() {
        let mut camera = Camera::new_perspective(45.0, 1.0, 1.0, 2000.0);
        let mut controls = OrbitControls::looking_from(Vec3::new(0.0, 0.0, 30.0), Vec3::ZERO)
            .with_distance_limits(10.0, 100.0);

        controls.zoom(500.0);
        controls.update(&mut camera, 1.0 / 60.0);
        assert!((controls.radius - 10.0).abs() < 1e-4);

        controls.zoom(-500.0);
        controls.update(&mut camera, 1.0 / 60.0);
        assert!((controls.radius - 100.0).abs() < 1e-3);
    }

    #[test]
    fn looking_from_recovers_eye() {
        let eye = Vec3::new(3.0, 4.0, 12.0);
        let controls = OrbitControls::looking_from(eye, Vec3::ZERO);
        assert!(controls.eye().distance(eye) < 1e-4);
    }
}
