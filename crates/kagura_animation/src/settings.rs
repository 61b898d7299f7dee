use crate::physics::PhysicsSettings;

/// Configuration of one [`AnimationHelper`](crate::AnimationHelper).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HelperSettings {
    /// Seconds to hold the last pose after a clip ends
    pub afterglow: f32,
    /// Re-seed physics whenever a looping clip wraps around
    pub reset_physics_on_loop: bool,
    pub physics: PhysicsSettings,
}
