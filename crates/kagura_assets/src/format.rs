//! Document formats for rigs and motions.
//!
//! # Overview
//!
//! A [`ModelDocument`] describes a character rig in JSON: bones with
//! absolute rest positions (as model editors export them), morph names, IK
//! chains, grant bones, rigid bodies and joints. Every cross-reference is
//! by name and is resolved when the document is turned into a
//! [`SkinnedMesh`].
//!
//! A [`MotionDocument`] holds bone and morph keyframes. Bone positions are
//! offsets from the rest pose, so one motion fits any model with the same
//! bone names. Times are seconds unless `frame_rate` is set, in which case
//! they are frame numbers.

use std::sync::Arc;

use glam::{Quat, Vec3};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use kagura_animation::{
    AnimationClip, Bone, BodyKind, GrantBone, IkChain, IkLink, InterpolationMode, JointDesc, KeyframeTrack, PhysicsRig,
    RigMetadata, RigidBodyDesc, Skeleton, SkinnedMesh, Track,
};
use kagura_core::{AssetError, MeshId};

const DEFAULT_IK_ITERATIONS: u32 = 40;

fn default_ratio() -> f32 {
    1.0
}

fn default_true() -> bool {
    true
}

fn default_iterations() -> u32 {
    DEFAULT_IK_ITERATIONS
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterpolationDoc {
    #[default]
    Linear,
    Step,
    /// Smooth ease between keys (zero tangents)
    Cubic,
}

impl From<InterpolationDoc> for InterpolationMode {
    fn from(value: InterpolationDoc) -> Self {
        match value {
            InterpolationDoc::Linear => InterpolationMode::Linear,
            InterpolationDoc::Step => InterpolationMode::Step,
            InterpolationDoc::Cubic => InterpolationMode::CubicSpline,
        }
    }
}

// ============================================================================
// Model
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoneDoc {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    /// Absolute rest position in model space
    pub position: [f32; 3],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IkLinkDoc {
    pub bone: String,
    #[serde(default)]
    pub limitation: Option<[f32; 3]>,
    #[serde(default)]
    pub rotation_min: Option<[f32; 3]>,
    #[serde(default)]
    pub rotation_max: Option<[f32; 3]>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IkDoc {
    #[serde(default)]
    pub name: Option<String>,
    pub goal: String,
    pub effector: String,
    pub links: Vec<IkLinkDoc>,
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    #[serde(default)]
    pub min_angle: Option<f32>,
    #[serde(default)]
    pub max_angle: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrantDoc {
    pub bone: String,
    pub source: String,
    #[serde(default = "default_ratio")]
    pub ratio: f32,
    #[serde(default = "default_true")]
    pub affect_rotation: bool,
    #[serde(default)]
    pub affect_position: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyKindDoc {
    #[default]
    Static,
    Dynamic,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RigidBodyDoc {
    pub name: String,
    pub bone: String,
    #[serde(default)]
    pub kind: BodyKindDoc,
    /// Tip of the body relative to its bone. Defaults to the bone's first child.
    #[serde(default)]
    pub tip: Option<[f32; 3]>,
    #[serde(default)]
    pub damping: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JointDoc {
    pub name: String,
    pub body_a: String,
    pub body_b: String,
    #[serde(default)]
    pub stiffness: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDocument {
    pub name: String,
    pub bones: Vec<BoneDoc>,
    #[serde(default)]
    pub morphs: Vec<String>,
    #[serde(default)]
    pub ik: Vec<IkDoc>,
    #[serde(default)]
    pub grants: Vec<GrantDoc>,
    #[serde(default)]
    pub rigid_bodies: Vec<RigidBodyDoc>,
    #[serde(default)]
    pub joints: Vec<JointDoc>,
}

struct Resolver<'a> {
    uri: &'a str,
    bones: FxHashMap<&'a str, usize>,
}

impl Resolver<'_> {
    fn bone(&self, name: &str) -> Result<usize, AssetError> {
        self.bones.get(name).copied().ok_or_else(|| AssetError::UnknownBone {
            uri: self.uri.to_string(),
            bone: name.to_string(),
        })
    }
}

impl ModelDocument {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, AssetError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Builds the runtime mesh. The id is derived from `uri`, so loading the
    /// same source twice yields the same [`MeshId`].
    pub fn into_mesh(self, uri: &str) -> Result<SkinnedMesh, AssetError> {
        let mut resolver = Resolver {
            uri,
            bones: FxHashMap::default(),
        };
        let mut bones = Vec::with_capacity(self.bones.len());

        for (index, doc) in self.bones.iter().enumerate() {
            let position = Vec3::from_array(doc.position);
            let (parent, translation) = match &doc.parent {
                Some(parent_name) => {
                    let parent = resolver.bone(parent_name).map_err(|_| AssetError::InvalidDocument {
                        uri: uri.to_string(),
                        reason: format!("bone '{}' is listed before its parent '{parent_name}'", doc.name),
                    })?;
                    (Some(parent), position - Vec3::from_array(self.bones[parent].position))
                }
                None => (None, position),
            };
            bones.push(Bone::new(doc.name.clone(), parent, translation));
            resolver.bones.entry(doc.name.as_str()).or_insert(index);
        }

        let skeleton = Skeleton::new(bones)?;

        let ik_chains = self
            .ik
            .iter()
            .enumerate()
            .map(|(i, doc)| {
                let links = doc
                    .links
                    .iter()
                    .map(|link| {
                        Ok(IkLink {
                            bone: resolver.bone(&link.bone)?,
                            limitation: link.limitation.map(Vec3::from_array),
                            rotation_min: link.rotation_min.map(Vec3::from_array),
                            rotation_max: link.rotation_max.map(Vec3::from_array),
                        })
                    })
                    .collect::<Result<SmallVec<_>, AssetError>>()?;

                Ok(IkChain {
                    name: doc.name.clone().unwrap_or_else(|| format!("ik_{i}")),
                    goal: resolver.bone(&doc.goal)?,
                    effector: resolver.bone(&doc.effector)?,
                    links,
                    iterations: doc.iterations,
                    min_angle: doc.min_angle,
                    max_angle: doc.max_angle,
                })
            })
            .collect::<Result<Vec<_>, AssetError>>()?;

        let grants = self
            .grants
            .iter()
            .map(|doc| {
                Ok(GrantBone {
                    bone: resolver.bone(&doc.bone)?,
                    source: resolver.bone(&doc.source)?,
                    ratio: doc.ratio,
                    affect_rotation: doc.affect_rotation,
                    affect_position: doc.affect_position,
                })
            })
            .collect::<Result<Vec<_>, AssetError>>()?;

        let physics = if self.rigid_bodies.is_empty() {
            None
        } else {
            Some(self.physics_rig(&resolver, &skeleton)?)
        };

        let rig = RigMetadata {
            ik_chains,
            grants,
            physics,
        };

        Ok(SkinnedMesh::new(self.name, skeleton)
            .with_id(MeshId::from_source(uri))
            .with_morphs(self.morphs)
            .with_rig(rig))
    }

    fn physics_rig(&self, resolver: &Resolver<'_>, skeleton: &Skeleton) -> Result<PhysicsRig, AssetError> {
        let mut body_lookup = FxHashMap::default();
        let mut bodies = Vec::with_capacity(self.rigid_bodies.len());

        for (index, doc) in self.rigid_bodies.iter().enumerate() {
            let bone = resolver.bone(&doc.bone)?;
            let tip = match doc.tip {
                Some(tip) => Vec3::from_array(tip),
                None => skeleton
                    .bones()
                    .iter()
                    .find(|b| b.parent == Some(bone))
                    .map_or(Vec3::ZERO, |child| child.translation),
            };
            bodies.push(RigidBodyDesc {
                name: doc.name.clone(),
                bone,
                kind: match doc.kind {
                    BodyKindDoc::Static => BodyKind::Static,
                    BodyKindDoc::Dynamic => BodyKind::Dynamic,
                },
                tip,
                damping: doc.damping,
            });
            body_lookup.entry(doc.name.as_str()).or_insert(index);
        }

        let body = |name: &str| {
            body_lookup
                .get(name)
                .copied()
                .ok_or_else(|| AssetError::InvalidDocument {
                    uri: resolver.uri.to_string(),
                    reason: format!("joint references unknown rigid body '{name}'"),
                })
        };

        let joints = self
            .joints
            .iter()
            .map(|doc| {
                Ok(JointDesc {
                    name: doc.name.clone(),
                    body_a: body(&doc.body_a)?,
                    body_b: body(&doc.body_b)?,
                    stiffness: doc.stiffness,
                })
            })
            .collect::<Result<Vec<_>, AssetError>>()?;

        Ok(PhysicsRig { bodies, joints })
    }
}

// ============================================================================
// Motion
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoneKeyDoc {
    pub time: f32,
    /// Offset from the rest position
    #[serde(default)]
    pub position: Option<[f32; 3]>,
    /// Quaternion `[x, y, z, w]`
    #[serde(default)]
    pub rotation: Option<[f32; 4]>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoneTrackDoc {
    pub bone: String,
    #[serde(default)]
    pub interpolation: InterpolationDoc,
    pub keys: Vec<BoneKeyDoc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MorphKeyDoc {
    pub time: f32,
    pub weight: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MorphTrackDoc {
    pub morph: String,
    #[serde(default)]
    pub interpolation: InterpolationDoc,
    pub keys: Vec<MorphKeyDoc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MotionDocument {
    pub name: String,
    /// When set, key times are frame numbers at this rate.
    #[serde(default)]
    pub frame_rate: Option<f32>,
    #[serde(default)]
    pub bones: Vec<BoneTrackDoc>,
    #[serde(default)]
    pub morphs: Vec<MorphTrackDoc>,
}

/// Sorted, de-duplicated keys (last one wins on equal times).
fn sorted_keys<K: Clone>(keys: &[K], time: impl Fn(&K) -> f32) -> Vec<K> {
    let mut sorted = keys.to_vec();
    sorted.sort_by(|a, b| time(a).total_cmp(&time(b)));
    sorted.dedup_by(|next, prev| {
        if time(next) == time(prev) {
            *prev = next.clone();
            true
        } else {
            false
        }
    });
    sorted
}

/// Lays values out for `mode`, adding zero tangents for cubic tracks.
fn with_tangents<T: Copy>(values: Vec<T>, mode: InterpolationMode, zero: T) -> Vec<T> {
    match mode {
        InterpolationMode::CubicSpline => values.into_iter().flat_map(|v| [zero, v, zero]).collect(),
        _ => values,
    }
}

impl MotionDocument {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, AssetError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    fn seconds(&self, time: f32) -> f32 {
        match self.frame_rate {
            Some(rate) if rate > 0.0 => time / rate,
            _ => time,
        }
    }

    /// Converts to a clip for `skeleton`.
    ///
    /// Position keys become absolute local translations using the rest pose.
    /// Tracks for bones the skeleton lacks keep their rest offset of zero and
    /// are later dropped by the binder.
    pub fn to_clip(&self, skeleton: &Skeleton, uri: &str) -> Result<AnimationClip, AssetError> {
        if let Some(rate) = self.frame_rate
            && !(rate.is_finite() && rate > 0.0)
        {
            return Err(AssetError::InvalidDocument {
                uri: uri.to_string(),
                reason: format!("frame_rate must be positive, got {rate}"),
            });
        }

        let mut tracks = Vec::with_capacity(self.bones.len() * 2 + self.morphs.len());

        for doc in &self.bones {
            let keys = sorted_keys(&doc.keys, |k| k.time);
            let mode = InterpolationMode::from(doc.interpolation);
            let rest = skeleton
                .find(&doc.bone)
                .map_or(Vec3::ZERO, |i| skeleton.bones()[i].translation);

            let (times, values): (Vec<f32>, Vec<Vec3>) = keys
                .iter()
                .filter_map(|k| k.position.map(|p| (self.seconds(k.time), rest + Vec3::from_array(p))))
                .unzip();
            if !times.is_empty() {
                let values = with_tangents(values, mode, Vec3::ZERO);
                tracks.push(Track::bone_translation(&doc.bone, KeyframeTrack::new(times, values, mode)));
            }

            let mut previous = Quat::IDENTITY;
            let (times, values): (Vec<f32>, Vec<Quat>) = keys
                .iter()
                .filter_map(|k| k.rotation.map(|r| (self.seconds(k.time), Quat::from_array(r))))
                .map(|(t, q)| {
                    // Keep consecutive keys in the same hemisphere.
                    let q = (if previous.dot(q) < 0.0 { -q } else { q }).normalize();
                    previous = q;
                    (t, q)
                })
                .unzip();
            if !times.is_empty() {
                let values = with_tangents(values, mode, Quat::from_xyzw(0.0, 0.0, 0.0, 0.0));
                tracks.push(Track::bone_rotation(&doc.bone, KeyframeTrack::new(times, values, mode)));
            }
        }

        for doc in &self.morphs {
            let keys = sorted_keys(&doc.keys, |k| k.time);
            let mode = InterpolationMode::from(doc.interpolation);
            let (times, values): (Vec<f32>, Vec<f32>) =
                keys.iter().map(|k| (self.seconds(k.time), k.weight)).unzip();
            if !times.is_empty() {
                let values = with_tangents(values, mode, 0.0);
                tracks.push(Track::morph_weight(&doc.morph, KeyframeTrack::new(times, values, mode)));
            }
        }

        if tracks.iter().any(|t| !t.data.is_compatible_with(t.meta.target)) {
            return Err(AssetError::InvalidDocument {
                uri: uri.to_string(),
                reason: "motion contains non-finite key times".to_string(),
            });
        }

        Ok(AnimationClip::new(self.name.clone(), tracks))
    }
}

/// A parsed model plus its merged motion, ready for registration.
#[derive(Debug, Clone)]
pub struct LoadedModel {
    pub mesh: Arc<SkinnedMesh>,
    pub clip: Option<Arc<AnimationClip>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODEL: &str = r#"{
        "name": "stick",
        "bones": [
            { "name": "root", "position": [0, 0, 0] },
            { "name": "arm", "parent": "root", "position": [0, 5, 0] },
            { "name": "hand", "parent": "arm", "position": [0, 8, 0] }
        ],
        "rigid_bodies": [
            { "name": "arm_body", "bone": "arm", "kind": "dynamic" }
        ]
    }"#;

    #[test]
    fn bone_positions_become_local_offsets() {
        let mesh = ModelDocument::from_slice(MODEL.as_bytes())
            .unwrap()
            .into_mesh("stick.json")
            .unwrap();
        let bones = mesh.skeleton.bones();
        assert_eq!(bones[2].translation, Vec3::new(0.0, 3.0, 0.0));
        // Tip defaults to the first child's offset.
        let physics = mesh.rig.physics.as_ref().unwrap();
        assert_eq!(physics.bodies[0].tip, Vec3::new(0.0, 3.0, 0.0));
    }

    #[test]
    fn child_before_parent_is_rejected() {
        let json = r#"{ "name": "bad", "bones": [
            { "name": "hand", "parent": "arm", "position": [0, 1, 0] },
            { "name": "arm", "position": [0, 0, 0] }
        ] }"#;
        let err = ModelDocument::from_slice(json.as_bytes())
            .unwrap()
            .into_mesh("bad.json")
            .unwrap_err();
        assert!(matches!(err, AssetError::InvalidDocument { .. }));
    }

    #[test]
    fn frame_rate_scales_key_times() {
        let skeleton = Skeleton::new(vec![Bone::new("root", None, Vec3::ZERO)]).unwrap();
        let json = r#"{ "name": "m", "frame_rate": 30, "morphs": [
            { "morph": "smile", "keys": [ { "time": 0, "weight": 0 }, { "time": 60, "weight": 1 } ] }
        ] }"#;
        let clip = MotionDocument::from_slice(json.as_bytes())
            .unwrap()
            .to_clip(&skeleton, "m.json")
            .unwrap();
        assert!((clip.duration - 2.0).abs() < 1e-6);
    }
}
