//! Foundational types shared by every Kagura crate.
//!
//! - [`errors`]: the error taxonomy and the crate-wide [`Result`] alias
//! - [`time`]: the frame [`Clock`]
//! - [`fps_counter`]: frame-rate sampling for diagnostics
//! - [`id`]: stable identities for loaded meshes

pub mod errors;
pub mod fps_counter;
pub mod id;
pub mod time;

pub use errors::{AnimationError, AssetError, ControlError, Error, RenderError, Result};
pub use fps_counter::FpsCounter;
pub use id::MeshId;
pub use time::Clock;
