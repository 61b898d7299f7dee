//! Error Types
//!
//! This module defines the error types used throughout Kagura.
//!
//! # Overview
//!
//! Errors are grouped by the concern that produces them:
//! - [`AnimationError`]: time deltas, skeleton validation, solver failures
//! - [`AssetError`]: reading and decoding rig / motion documents
//! - [`RenderError`]: failures reported by a render backend
//! - [`ControlError`]: rejected control-surface values
//!
//! The umbrella [`Error`] converts from each of them, and [`Result<T>`] is an
//! alias for `std::result::Result<T, Error>`.
//!
//! ```rust,ignore
//! use kagura_core::errors::{AnimationError, Result};
//!
//! fn tick(dt: f32) -> Result<()> {
//!     if dt < 0.0 {
//!         return Err(AnimationError::InvalidTimeDelta(dt).into());
//!     }
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// Errors raised by the animation / IK / physics coordinator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnimationError {
    /// `advance` was called with a negative or non-finite delta.
    ///
    /// The call performs no state mutation; the caller may retry next tick.
    #[error("Invalid time delta: {0} (must be finite and non-negative)")]
    InvalidTimeDelta(f32),

    /// The skeleton description is structurally invalid.
    #[error("Invalid skeleton: {0}")]
    InvalidSkeleton(String),

    /// A rig element references a bone index that does not exist.
    #[error("{context} references bone {index}, but the skeleton has {count} bones")]
    BoneOutOfRange {
        /// What was being built
        context: String,
        /// The offending index
        index: usize,
        /// Number of bones in the skeleton
        count: usize,
    },

    /// The IK solver produced a non-finite rotation.
    #[error("IK chain '{chain}' diverged")]
    IkDiverged {
        /// Name of the failing chain
        chain: String,
    },

    /// The physics world produced a non-finite body state.
    #[error("Physics diverged on rigid body '{body}'")]
    PhysicsDiverged {
        /// Name of the failing body
        body: String,
    },
}

/// Errors raised while reading or decoding assets.
#[derive(Error, Debug)]
pub enum AssetError {
    /// The requested asset was not found.
    #[error("Asset not found: {0}")]
    NotFound(String),

    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport-level HTTP failure.
    #[error("HTTP error: {0}")]
    Http(String),

    /// HTTP response error with status code.
    #[error("HTTP response error: status {status}")]
    HttpStatus {
        /// HTTP status code
        status: u16,
    },

    /// URL parsing error.
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The document parsed but describes an unusable rig or motion.
    #[error("Invalid document '{uri}': {reason}")]
    InvalidDocument {
        /// Source of the document
        uri: String,
        /// What is wrong with it
        reason: String,
    },

    /// A rig element refers to a bone name the model does not declare.
    #[error("'{uri}' references unknown bone '{bone}'")]
    UnknownBone {
        /// Source of the document
        uri: String,
        /// The unresolved name
        bone: String,
    },

    /// The rig parsed but failed skeleton validation.
    #[error("Invalid rig: {0}")]
    Rig(#[from] AnimationError),

    /// The background load task failed to complete.
    #[error("Task join error: {0}")]
    TaskJoin(String),

    /// The loader dropped its result channel before finishing.
    #[error("Load channel closed before a result was delivered")]
    ChannelClosed,
}

/// Errors raised by a render backend.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    /// The backend failed to produce a frame.
    #[error("Render backend error: {0}")]
    Backend(String),

    /// The requested output size cannot be rendered.
    #[error("Invalid viewport size: {width}x{height}")]
    InvalidViewport {
        /// Requested width in pixels
        width: u32,
        /// Requested height in pixels
        height: u32,
    },
}

/// Errors raised when a control-surface value is rejected.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ControlError {
    /// The value is NaN or infinite.
    #[error("Control '{field}' received a non-finite value: {value}")]
    NonFinite {
        /// Name of the bound field
        field: &'static str,
        /// The rejected value
        value: f32,
    },

    /// No bindable field carries this name.
    #[error("Unknown control field: {0}")]
    UnknownField(String),
}

/// The main error type for Kagura.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Animation(#[from] AnimationError),

    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Control(#[from] ControlError),
}

/// Alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_delta_message_names_the_value() {
        let err = AnimationError::InvalidTimeDelta(-0.5);
        assert!(err.to_string().contains("-0.5"));
    }

    #[test]
    fn umbrella_converts_from_concerns() {
        let err: Error = AnimationError::InvalidTimeDelta(f32::NAN).into();
        assert!(matches!(err, Error::Animation(AnimationError::InvalidTimeDelta(_))));

        let err: Error = AssetError::NotFound("rig.json".into()).into();
        assert_eq!(err.to_string(), "Asset not found: rig.json");
    }
}
