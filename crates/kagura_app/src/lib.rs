//! Application layer for Kagura: the [`Stage`] context object, the
//! command-based control surface, and startup settings.

pub mod controls;
pub mod settings;
pub mod stage;

pub use controls::{ControlDescriptor, ControlEvent, ControlKind, ControlValue};
pub use settings::{LoopSetting, ModelEntry, StageSettings, Viewport};
pub use stage::{ModelOptions, Stage};
