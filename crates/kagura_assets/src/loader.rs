//! Background model loading.
//!
//! # Overview
//!
//! [`load_model`] reads a model document and any number of motion
//! documents, converts them, and merges the motions into one clip. Motions
//! are fetched concurrently.
//!
//! [`AssetLoader::spawn`] runs the same work on a tokio runtime and returns
//! a [`LoadTicket`]. The ticket yields zero or more
//! [`LoadEvent::Progress`] events followed by exactly one
//! [`LoadEvent::Finished`]. The frame loop drains tickets without blocking.

use std::sync::Arc;

use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use kagura_animation::AnimationClip;
use kagura_core::AssetError;

use crate::format::{LoadedModel, ModelDocument, MotionDocument};
use crate::io::read_source;

/// A model source plus the motions to play on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRequest {
    pub model: String,
    #[serde(default)]
    pub motions: Vec<String>,
}

impl ModelRequest {
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            motions: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_motion(mut self, motion: impl Into<String>) -> Self {
        self.motions.push(motion.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadProgress {
    pub uri: String,
    pub loaded_bytes: u64,
    /// Unknown when the source does not report a length
    pub total_bytes: Option<u64>,
}

impl LoadProgress {
    /// Completion in `[0, 1]`, if the total is known.
    #[must_use]
    pub fn fraction(&self) -> Option<f32> {
        match self.total_bytes {
            Some(0) => Some(1.0),
            Some(total) => Some((self.loaded_bytes as f64 / total as f64).min(1.0) as f32),
            None => None,
        }
    }
}

#[derive(Debug)]
pub enum LoadEvent {
    Progress(LoadProgress),
    Finished(Result<LoadedModel, AssetError>),
}

/// Loads a model and merges its motions into a single clip.
pub async fn load_model(
    request: &ModelRequest,
    progress: &(dyn Fn(LoadProgress) + Send + Sync),
) -> Result<LoadedModel, AssetError> {
    let report = |uri: &str| {
        let uri = uri.to_string();
        move |loaded_bytes: u64, total_bytes: Option<u64>| {
            progress(LoadProgress {
                uri: uri.clone(),
                loaded_bytes,
                total_bytes,
            });
        }
    };

    let model_progress = report(&request.model);
    let bytes = read_source(&request.model, &model_progress).await?;
    let mesh = ModelDocument::from_slice(&bytes)?.into_mesh(&request.model)?;
    let skeleton = &mesh.skeleton;

    let clips = try_join_all(request.motions.iter().map(|uri| {
        let motion_progress = report(uri);
        async move {
            let bytes = read_source(uri, &motion_progress).await?;
            MotionDocument::from_slice(&bytes)?.to_clip(skeleton, uri)
        }
    }))
    .await?;

    let clip = if clips.is_empty() {
        None
    } else {
        let name = clips.iter().map(|c| c.name.as_str()).collect::<Vec<_>>().join("+");
        Some(Arc::new(AnimationClip::merge(name, clips)))
    };

    log::info!(
        "Loaded '{}' from {}: {} bones, {} motion(s), clip {:.2}s",
        mesh.name,
        request.model,
        mesh.skeleton.len(),
        request.motions.len(),
        clip.as_ref().map_or(0.0, |c| c.duration)
    );

    Ok(LoadedModel {
        mesh: Arc::new(mesh),
        clip,
    })
}

/// Spawns loads onto a tokio runtime.
#[derive(Debug, Clone)]
pub struct AssetLoader {
    handle: Handle,
}

impl AssetLoader {
    #[must_use]
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Uses the runtime of the calling context, if any.
    #[must_use]
    pub fn current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }

    pub fn spawn(&self, request: ModelRequest) -> LoadTicket {
        let (tx, rx) = flume::unbounded();
        let task_request = request.clone();

        let task = self.handle.spawn(async move {
            let progress_tx = tx.clone();
            let progress = move |p: LoadProgress| {
                // A dropped ticket only means nobody is listening.
                let _ = progress_tx.send(LoadEvent::Progress(p));
            };

            let result = load_model(&task_request, &progress).await;
            if let Err(err) = &result {
                log::error!("Failed to load '{}': {err}", task_request.model);
            }
            let _ = tx.send(LoadEvent::Finished(result));
        });

        LoadTicket {
            request,
            events: rx,
            task: Some(task),
            finished: false,
        }
    }
}

/// Receiving end of one spawned load.
#[derive(Debug)]
pub struct LoadTicket {
    request: ModelRequest,
    events: flume::Receiver<LoadEvent>,
    task: Option<JoinHandle<()>>,
    finished: bool,
}

impl LoadTicket {
    #[must_use]
    pub fn request(&self) -> &ModelRequest {
        &self.request
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Drains pending events without blocking.
    ///
    /// If the task ends without reporting, a `ChannelClosed` failure is
    /// synthesized so callers always see a `Finished` event.
    pub fn poll(&mut self) -> Vec<LoadEvent> {
        let mut out = Vec::new();
        if self.finished {
            return out;
        }

        loop {
            match self.events.try_recv() {
                Ok(event) => {
                    if matches!(event, LoadEvent::Finished(_)) {
                        self.finished = true;
                    }
                    out.push(event);
                    if self.finished {
                        break;
                    }
                }
                Err(flume::TryRecvError::Empty) => break,
                Err(flume::TryRecvError::Disconnected) => {
                    self.finished = true;
                    out.push(LoadEvent::Finished(Err(AssetError::ChannelClosed)));
                    break;
                }
            }
        }
        out
    }

    /// Awaits the final result, discarding progress events.
    pub async fn wait(mut self) -> Result<LoadedModel, AssetError> {
        while let Ok(event) = self.events.recv_async().await {
            if let LoadEvent::Finished(result) = event {
                self.finished = true;
                return result;
            }
        }

        self.finished = true;
        match self.task.take() {
            Some(task) => match task.await {
                Err(err) => Err(AssetError::TaskJoin(err.to_string())),
                Ok(()) => Err(AssetError::ChannelClosed),
            },
            None => Err(AssetError::ChannelClosed),
        }
    }
}
