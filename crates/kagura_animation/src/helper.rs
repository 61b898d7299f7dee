//! The per-frame coordinator.
//!
//! # Overview
//!
//! [`AnimationHelper`] owns one [`AnimatedEntity`] per registered mesh and
//! advances all of them once per frame. For every entity the stages run in
//! a fixed order:
//!
//! 1. sample the clip at the entity's local time (`ANIMATION`)
//! 2. CCD IK on the sampled pose (`IK`), then grant bones (`GRANT`)
//! 3. step rigid bodies and write them back over the result (`PHYSICS`)
//!
//! A stage whose feature flag is off, or whose handle the entity lacks, is
//! skipped. A stage that fails only affects its own entity for that frame.
//!
//! ```rust,ignore
//! let mut helper = AnimationHelper::new(HelperSettings::default());
//! helper.register(mesh, RegisterOptions::with_clip(clip))?;
//! helper.advance(clock.elapsed())?;
//! ```

use std::sync::Arc;

use rustc_hash::FxHashMap;
use slotmap::{SlotMap, new_key_type};

use kagura_core::{AnimationError, MeshId};

use crate::Features;
use crate::entity::{AnimatedEntity, RegisterOptions};
use crate::mesh::SkinnedMesh;
use crate::physics::{PhysicsFactory, default_physics_factory};
use crate::settings::HelperSettings;

new_key_type! {
    pub struct EntityKey;
}

pub struct AnimationHelper {
    entities: SlotMap<EntityKey, AnimatedEntity>,
    lookup: FxHashMap<MeshId, EntityKey>,
    features: Features,
    settings: HelperSettings,
    physics_factory: PhysicsFactory,
}

impl Default for AnimationHelper {
    fn default() -> Self {
        Self::new(HelperSettings::default())
    }
}

impl AnimationHelper {
    #[must_use]
    pub fn new(settings: HelperSettings) -> Self {
        Self {
            entities: SlotMap::with_key(),
            lookup: FxHashMap::default(),
            features: Features::all(),
            settings,
            physics_factory: default_physics_factory(),
        }
    }

    /// Replaces the backend used for entities registered from now on.
    #[must_use]
    pub fn with_physics_factory(mut self, factory: PhysicsFactory) -> Self {
        self.physics_factory = factory;
        self
    }

    /// Starts driving `mesh`.
    ///
    /// Registering a mesh that is already known rebuilds its entity with the
    /// new options; local time restarts from zero. Fails only when the rig
    /// references bones the skeleton does not have, in which case any
    /// existing entity is left untouched.
    pub fn register(&mut self, mesh: Arc<SkinnedMesh>, options: RegisterOptions) -> Result<(), AnimationError> {
        let id = mesh.id;
        let name = mesh.name.clone();
        let entity = AnimatedEntity::new(
            mesh,
            options,
            self.features,
            &self.settings,
            &self.physics_factory,
        )?;

        log::info!(
            "Registered '{name}' ({id}): clip={}, ik={}, physics={}",
            entity.action().is_some(),
            entity.has_ik(),
            entity.has_physics()
        );

        if let Some(slot) = self.lookup.get(&id).and_then(|&key| self.entities.get_mut(key)) {
            *slot = entity;
            return Ok(());
        }

        let key = self.entities.insert(entity);
        self.lookup.insert(id, key);
        Ok(())
    }

    /// Stops driving the mesh. Returns `false` if it was not registered.
    pub fn unregister(&mut self, id: &MeshId) -> bool {
        let Some(key) = self.lookup.remove(id) else {
            return false;
        };
        self.entities.remove(key).is_some()
    }

    /// Toggles one or more stages for every entity, from the next `advance`.
    pub fn set_feature(&mut self, feature: Features, enabled: bool) {
        self.features.set(feature, enabled);
    }

    #[inline]
    #[must_use]
    pub fn features(&self) -> Features {
        self.features
    }

    #[inline]
    #[must_use]
    pub fn is_enabled(&self, feature: Features) -> bool {
        self.features.contains(feature)
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &HelperSettings {
        &self.settings
    }

    /// Seconds the final pose is held after a clip ends. Negative values
    /// are treated as zero.
    pub fn set_afterglow(&mut self, seconds: f32) {
        self.settings.afterglow = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
    }

    /// Advances every entity by `delta_seconds`.
    ///
    /// A negative or non-finite delta is rejected before anything changes.
    /// Stage failures are logged and skip the rest of that entity's frame;
    /// they do not fail the call.
    pub fn advance(&mut self, delta_seconds: f32) -> Result<(), AnimationError> {
        if !delta_seconds.is_finite() || delta_seconds < 0.0 {
            return Err(AnimationError::InvalidTimeDelta(delta_seconds));
        }

        for entity in self.entities.values_mut() {
            if let Err(err) = entity.update(delta_seconds, self.features, &self.settings) {
                log::warn!("Skipping '{}' this frame: {err}", entity.mesh().name);
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn entity(&self, id: &MeshId) -> Option<&AnimatedEntity> {
        self.lookup.get(id).and_then(|&key| self.entities.get(key))
    }

    #[must_use]
    pub fn contains(&self, id: &MeshId) -> bool {
        self.lookup.contains_key(id)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AnimatedEntity> {
        self.entities.values()
    }
}

impl std::fmt::Debug for AnimationHelper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimationHelper")
            .field("entities", &self.entities.len())
            .field("features", &self.features)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
