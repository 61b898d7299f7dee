//! Asset loading for Kagura.
//!
//! - [`format`]: JSON rig and motion documents and their conversion
//! - [`io`]: file and HTTP byte readers
//! - [`loader`]: async loading with progress reporting

pub mod format;
pub mod io;
pub mod loader;

pub use format::{LoadedModel, ModelDocument, MotionDocument};
#[cfg(feature = "http")]
pub use io::HttpAssetReader;
pub use io::{AssetReader, AssetReaderVariant, FileAssetReader, read_source};
pub use loader::{AssetLoader, LoadEvent, LoadProgress, LoadTicket, ModelRequest, load_model};
