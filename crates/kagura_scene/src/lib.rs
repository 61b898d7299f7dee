//! Scene-side state for Kagura: placed meshes, lights, the camera and its
//! orbit controls, and the procedural sky.

pub mod camera;
pub mod orbit_control;
pub mod scene;
pub mod sky;

pub use camera::{Camera, CameraSettings};
pub use orbit_control::OrbitControls;
pub use scene::{AmbientLight, DirectionalLight, MeshInstance, MeshKey, Scene, color_from_hex};
pub use sky::{FieldRange, SKY_SCALE, SkyField, SkyParameters, SkyTarget, SkyUniforms};
