use glam::Vec3;

use kagura_animation::AnimationHelper;
use kagura_scene::Scene;

/// Which helper overlays are drawn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OverlaySettings {
    pub show_ik_bones: bool,
    pub show_rigid_bodies: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayLine {
    pub start: Vec3,
    pub end: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    IkGoal,
    IkEffector,
    StaticBody,
    DynamicBody,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayMarker {
    pub position: Vec3,
    pub kind: MarkerKind,
}

/// World-space debug geometry for one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overlays {
    pub lines: Vec<OverlayLine>,
    pub markers: Vec<OverlayMarker>,
}

impl Overlays {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() && self.markers.is_empty()
    }

    /// Rebuilds overlays from the current poses. Hidden meshes and meshes
    /// not placed in `scene` contribute nothing.
    pub fn rebuild(&mut self, settings: OverlaySettings, helper: &AnimationHelper, scene: &Scene) {
        self.lines.clear();
        self.markers.clear();
        if !settings.show_ik_bones && !settings.show_rigid_bodies {
            return;
        }

        for entity in helper.iter() {
            let Some(instance) = scene.get(&entity.mesh().id) else {
                continue;
            };
            if !instance.visible {
                continue;
            }
            let origin = instance.position;
            let pose = entity.pose();

            if settings.show_ik_bones
                && let Some(ik) = entity.ik()
            {
                for chain in ik.chains() {
                    let mut previous = pose.world_position(chain.effector);
                    for link in &chain.links {
                        let position = pose.world_position(link.bone);
                        self.lines.push(OverlayLine {
                            start: origin + previous,
                            end: origin + position,
                        });
                        previous = position;
                    }
                    self.markers.push(OverlayMarker {
                        position: origin + pose.world_position(chain.goal),
                        kind: MarkerKind::IkGoal,
                    });
                    self.markers.push(OverlayMarker {
                        position: origin + pose.world_position(chain.effector),
                        kind: MarkerKind::IkEffector,
                    });
                }
            }

            if settings.show_rigid_bodies {
                for body in entity.body_transforms() {
                    self.markers.push(OverlayMarker {
                        position: origin + body.position,
                        kind: if body.dynamic {
                            MarkerKind::DynamicBody
                        } else {
                            MarkerKind::StaticBody
                        },
                    });
                }
            }
        }
    }
}
