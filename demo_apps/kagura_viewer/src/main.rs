//! Headless Kagura viewer.
//!
//! Usage: `kagura_viewer [settings.json] [frames]`
//!
//! Loads every model listed in the settings file in the background, then
//! runs the frame loop at roughly 60 Hz against the headless renderer.
//! Partway through it flips a few controls the way a GUI would.

use std::time::Duration;

use kagura::app::{ModelOptions, Stage, StageSettings};
use kagura::{AssetLoader, ControlEvent, FpsCounter, HeadlessRenderer};

const DEFAULT_SETTINGS: &str = "demo_apps/kagura_viewer/assets/stage.json";
const DEFAULT_FRAMES: u64 = 600;
const FRAME_TIME: Duration = Duration::from_millis(16);

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let settings_path = args.next().unwrap_or_else(|| DEFAULT_SETTINGS.to_string());
    let frames = match args.next() {
        Some(n) => n.parse()?,
        None => DEFAULT_FRAMES,
    };

    let settings = match StageSettings::load(&settings_path) {
        Ok(settings) => settings,
        Err(err) => {
            log::warn!("Using default settings ({err})");
            StageSettings::default()
        }
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name("kagura-loader")
        .build()?;
    let loader = AssetLoader::new(runtime.handle().clone());

    let viewport = settings.viewport;
    let mut stage = Stage::new(&settings, HeadlessRenderer::new(viewport.width, viewport.height))?;
    for entry in &settings.models {
        stage.request_model(&loader, entry.request(), entry.position, ModelOptions::from(entry));
    }

    let mut fps_counter = FpsCounter::new();

    for frame in 0..frames {
        for result in stage.poll_loads() {
            match result {
                Ok(id) => log::info!("Model {id} joined the stage"),
                Err(err) => log::error!("Load failed: {err}"),
            }
        }

        match frame {
            120 => {
                stage.apply(ControlEvent::toggle("show_ik_bones", true)?)?;
                stage.apply(ControlEvent::slider("inclination", 0.45)?)?;
            }
            300 => stage.apply(ControlEvent::toggle("physics", false)?)?,
            420 => stage.apply(ControlEvent::toggle("outline", false)?)?,
            _ => {}
        }

        let stats = stage.render_tick()?;

        if let Some(fps) = fps_counter.update() {
            log::info!(
                "Frame {} | FPS: {fps:.1} | meshes {} | outlines {} | overlay lines {}",
                stats.frame_index,
                stats.mesh_draws,
                stats.outline_draws,
                stats.overlay_lines
            );
        }

        std::thread::sleep(FRAME_TIME);
    }

    for entity in stage.helper().iter() {
        log::info!(
            "'{}': {:?} at {:.2}s",
            entity.mesh().name,
            entity.state(),
            entity.local_time()
        );
    }
    log::info!("Rendered {} frames", stage.renderer().frames_rendered());
    Ok(())
}
