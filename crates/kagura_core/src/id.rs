use std::fmt;

use uuid::Uuid;

/// Identity of a loaded skinned mesh.
///
/// The animation helper keys its entities by this id, so registering the
/// same mesh twice updates the existing entity instead of adding a second one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(Uuid);

impl MeshId {
    /// Creates a fresh random id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Derives a deterministic id from a source path or URL.
    #[must_use]
    pub fn from_source(source: &str) -> Self {
        Self(Uuid::new_v5(&Uuid::NAMESPACE_URL, source.as_bytes()))
    }

    #[inline]
    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for MeshId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MeshId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
