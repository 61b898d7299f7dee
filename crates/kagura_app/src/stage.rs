//! The stage: one object that owns a running viewer.
//!
//! # Overview
//!
//! [`Stage`] holds the scene, camera, orbit controls, sky, outline-wrapped
//! renderer, frame clock and animation helper. There is no global state;
//! a stage is built once at startup and dropped at shutdown.
//!
//! Per frame the host calls, in order:
//! 1. [`Stage::poll_loads`] to adopt models whose background load finished
//! 2. [`Stage::apply`] for any queued [`ControlEvent`]s
//! 3. [`Stage::render_tick`], which advances the helper once and renders once

use glam::Vec3;

use kagura_animation::{AnimationHelper, HelperSettings, LoopMode, RegisterOptions};
use kagura_assets::{AssetLoader, LoadEvent, LoadedModel, LoadTicket, ModelRequest};
use kagura_core::{AnimationError, Clock, ControlError, Error, MeshId, RenderError};
use kagura_render::{FrameContext, FrameRenderer, FrameStats, OutlineEffect, OverlaySettings, Overlays};
use kagura_scene::{Camera, OrbitControls, Scene, SkyParameters, SkyTarget};

use crate::controls::{ControlDescriptor, ControlEvent, ControlValue, sky_value};
use crate::settings::{ModelEntry, StageSettings};

/// How a model is driven once it joins the stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelOptions {
    pub physics: bool,
    pub loop_mode: LoopMode,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            physics: true,
            loop_mode: LoopMode::Once,
        }
    }
}

impl From<&ModelEntry> for ModelOptions {
    fn from(entry: &ModelEntry) -> Self {
        Self {
            physics: entry.physics,
            loop_mode: entry.loop_mode.into(),
        }
    }
}

#[derive(Debug)]
struct PendingLoad {
    ticket: LoadTicket,
    placement: Vec3,
    options: ModelOptions,
}

pub struct Stage<R: FrameRenderer> {
    scene: Scene,
    camera: Camera,
    orbit: OrbitControls,
    sky: SkyParameters,
    effect: OutlineEffect<R>,
    clock: Clock,
    helper: AnimationHelper,
    overlay_settings: OverlaySettings,
    overlays: Overlays,
    pending: Vec<PendingLoad>,
}

impl<R: FrameRenderer> Stage<R> {
    pub fn new(settings: &StageSettings, renderer: R) -> Result<Self, Error> {
        let viewport = settings.viewport;
        let mut effect = OutlineEffect::new(renderer);
        effect.set_size(viewport.width, viewport.height)?;
        effect.enabled = settings.outline;

        let aspect = viewport.width as f32 / viewport.height as f32;
        let camera = Camera::from_settings(&settings.camera, aspect);
        let orbit = OrbitControls::looking_from(settings.camera.position, Vec3::ZERO)
            .with_distance_limits(settings.camera.min_distance, settings.camera.max_distance);

        let sky = settings.sky.sanitized();
        effect.apply_sky(&sky.uniforms());

        let mut helper = AnimationHelper::new(HelperSettings {
            reset_physics_on_loop: settings.reset_physics_on_loop,
            ..Default::default()
        });
        helper.set_afterglow(settings.afterglow);

        log::info!(
            "Stage ready: {}x{}, afterglow {:.2}s, outline {}",
            viewport.width,
            viewport.height,
            helper.settings().afterglow,
            effect.enabled
        );

        Ok(Self {
            scene: Scene::new(),
            camera,
            orbit,
            sky,
            effect,
            clock: Clock::new(),
            helper,
            overlay_settings: OverlaySettings::default(),
            overlays: Overlays::default(),
            pending: Vec::new(),
        })
    }

    /// Registers a loaded model with the helper and places it in the scene.
    pub fn add_model(
        &mut self,
        model: LoadedModel,
        placement: Vec3,
        options: ModelOptions,
    ) -> Result<MeshId, AnimationError> {
        let id = model.mesh.id;
        self.helper.register(
            model.mesh.clone(),
            RegisterOptions {
                clip: model.clip,
                enable_physics: options.physics,
                loop_mode: options.loop_mode,
            },
        )?;
        self.scene.add_mesh(model.mesh, placement);
        Ok(id)
    }

    /// Removes a model from both the helper and the scene.
    pub fn remove_model(&mut self, id: &MeshId) -> bool {
        let registered = self.helper.unregister(id);
        let placed = self.scene.remove_mesh(id).is_some();
        registered || placed
    }

    /// Starts a background load; the model joins on a later [`Stage::poll_loads`].
    pub fn request_model(&mut self, loader: &AssetLoader, request: ModelRequest, placement: Vec3, options: ModelOptions) {
        log::info!("Loading {} with {} motion(s)", request.model, request.motions.len());
        self.pending.push(PendingLoad {
            ticket: loader.spawn(request),
            placement,
            options,
        });
    }

    /// Number of loads still in flight.
    #[must_use]
    pub fn pending_loads(&self) -> usize {
        self.pending.len()
    }

    /// Adopts finished loads. Returns one result per load that finished
    /// since the last call.
    pub fn poll_loads(&mut self) -> Vec<Result<MeshId, Error>> {
        let mut finished = Vec::new();
        let mut still_pending = Vec::with_capacity(self.pending.len());

        for mut load in std::mem::take(&mut self.pending) {
            let mut outcome = None;
            for event in load.ticket.poll() {
                match event {
                    LoadEvent::Progress(progress) => {
                        if let Some(fraction) = progress.fraction() {
                            log::info!("{}: {:.0}% downloaded", progress.uri, fraction * 100.0);
                        }
                    }
                    LoadEvent::Finished(result) => outcome = Some(result),
                }
            }

            match outcome {
                Some(Ok(model)) => {
                    finished.push(self.add_model(model, load.placement, load.options).map_err(Error::from));
                }
                Some(Err(err)) => finished.push(Err(err.into())),
                None => still_pending.push(load),
            }
        }

        self.pending = still_pending;
        finished
    }

    /// Applies one control-surface command.
    pub fn apply(&mut self, event: ControlEvent) -> Result<(), ControlError> {
        match event {
            ControlEvent::SetFeature(feature, enabled) => self.helper.set_feature(feature, enabled),
            ControlEvent::SetOutline(enabled) => self.effect.enabled = enabled,
            ControlEvent::ShowIkBones(visible) => self.overlay_settings.show_ik_bones = visible,
            ControlEvent::ShowRigidBodies(visible) => self.overlay_settings.show_rigid_bodies = visible,
            ControlEvent::SetSky(field, value) => {
                self.sky.set_and_apply(field, value, &mut self.effect)?;
            }
        }
        Ok(())
    }

    /// Descriptors for every bindable control.
    #[must_use]
    pub fn controls(&self) -> Vec<ControlDescriptor> {
        ControlDescriptor::all()
    }

    /// Reads back the current value of a bound control.
    pub fn control_value(&self, name: &str) -> Result<ControlValue, ControlError> {
        use kagura_animation::Features;

        let toggle = match name {
            "animation" => self.helper.is_enabled(Features::ANIMATION),
            "ik" => self.helper.is_enabled(Features::IK),
            "physics" => self.helper.is_enabled(Features::PHYSICS),
            "outline" => self.effect.enabled,
            "show_ik_bones" => self.overlay_settings.show_ik_bones,
            "show_rigid_bodies" => self.overlay_settings.show_rigid_bodies,
            _ => return sky_value(&self.sky, name),
        };
        Ok(ControlValue::Toggle(toggle))
    }

    /// Updates the camera aspect and the render target size.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        self.effect.set_size(width, height)?;
        self.camera.set_aspect(width as f32 / height as f32);
        Ok(())
    }

    /// Advances by the wall-clock delta and renders one frame.
    pub fn render_tick(&mut self) -> Result<FrameStats, Error> {
        let dt = self.clock.elapsed();
        self.render_tick_with_delta(dt)
    }

    /// Advances by `dt` and renders one frame.
    ///
    /// An invalid delta fails before anything is advanced or rendered.
    pub fn render_tick_with_delta(&mut self, dt: f32) -> Result<FrameStats, Error> {
        self.helper.advance(dt)?;
        self.orbit.update(&mut self.camera, dt);
        self.overlays.rebuild(self.overlay_settings, &self.helper, &self.scene);

        let sky = self.sky.uniforms();
        let frame = FrameContext {
            scene: &self.scene,
            camera: &self.camera,
            helper: &self.helper,
            sky: &sky,
            overlays: &self.overlays,
        };
        Ok(self.effect.render(&frame)?)
    }

    #[inline]
    #[must_use]
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    #[inline]
    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    #[inline]
    #[must_use]
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    #[inline]
    pub fn orbit_mut(&mut self) -> &mut OrbitControls {
        &mut self.orbit
    }

    #[inline]
    #[must_use]
    pub fn sky(&self) -> &SkyParameters {
        &self.sky
    }

    #[inline]
    #[must_use]
    pub fn helper(&self) -> &AnimationHelper {
        &self.helper
    }

    #[inline]
    pub fn helper_mut(&mut self) -> &mut AnimationHelper {
        &mut self.helper
    }

    #[inline]
    #[must_use]
    pub fn overlays(&self) -> &Overlays {
        &self.overlays
    }

    #[inline]
    #[must_use]
    pub fn outline(&self) -> &OutlineEffect<R> {
        &self.effect
    }

    #[inline]
    #[must_use]
    pub fn renderer(&self) -> &R {
        self.effect.renderer()
    }
}
