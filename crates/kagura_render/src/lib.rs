//! Rendering boundary for Kagura.
//!
//! Real GPU backends live outside this workspace. They implement
//! [`FrameRenderer`]; [`HeadlessRenderer`] is the in-tree implementation.

pub mod headless;
pub mod outline;
pub mod overlays;
pub mod renderer;

pub use headless::HeadlessRenderer;
pub use outline::{OutlineEffect, OutlineParams};
pub use overlays::{MarkerKind, OverlayLine, OverlayMarker, OverlaySettings, Overlays};
pub use renderer::{FrameContext, FrameRenderer, FrameStats};
