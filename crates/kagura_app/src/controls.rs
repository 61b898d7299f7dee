use kagura_animation::Features;
use kagura_core::ControlError;
use kagura_scene::{SkyField, SkyParameters};

/// Commands issued by a GUI or script. The stage applies them before the
/// next tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlEvent {
    SetFeature(Features, bool),
    SetOutline(bool),
    ShowIkBones(bool),
    ShowRigidBodies(bool),
    SetSky(SkyField, f32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlKind {
    Toggle,
    Slider { min: f32, max: f32, step: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlDescriptor {
    pub name: &'static str,
    pub kind: ControlKind,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlValue {
    Toggle(bool),
    Slider(f32),
}

const TOGGLES: [&str; 6] = ["animation", "ik", "outline", "physics", "show_ik_bones", "show_rigid_bodies"];

impl ControlDescriptor {
    /// Every bindable field: the toggles first, then the sky sliders.
    #[must_use]
    pub fn all() -> Vec<ControlDescriptor> {
        let toggles = TOGGLES.iter().map(|&name| ControlDescriptor {
            name,
            kind: ControlKind::Toggle,
        });
        let sliders = SkyField::ALL.iter().map(|&field| {
            let range = field.range();
            ControlDescriptor {
                name: field.name(),
                kind: ControlKind::Slider {
                    min: range.min,
                    max: range.max,
                    step: range.step,
                },
            }
        });
        toggles.chain(sliders).collect()
    }
}

impl ControlEvent {
    /// Builds the event for a toggle bound by name.
    pub fn toggle(name: &str, enabled: bool) -> Result<Self, ControlError> {
        Ok(match name {
            "animation" => ControlEvent::SetFeature(Features::ANIMATION, enabled),
            "ik" => ControlEvent::SetFeature(Features::IK, enabled),
            "physics" => ControlEvent::SetFeature(Features::PHYSICS, enabled),
            "outline" => ControlEvent::SetOutline(enabled),
            "show_ik_bones" => ControlEvent::ShowIkBones(enabled),
            "show_rigid_bodies" => ControlEvent::ShowRigidBodies(enabled),
            other => return Err(ControlError::UnknownField(other.to_string())),
        })
    }

    /// Builds the event for a slider bound by name.
    pub fn slider(name: &str, value: f32) -> Result<Self, ControlError> {
        let field = SkyField::from_name(name)?;
        if !value.is_finite() {
            return Err(ControlError::NonFinite {
                field: field.name(),
                value,
            });
        }
        Ok(ControlEvent::SetSky(field, value))
    }
}

/// Current sky slider value, for GUIs that read back state.
pub(crate) fn sky_value(sky: &SkyParameters, name: &str) -> Result<ControlValue, ControlError> {
    Ok(ControlValue::Slider(sky.get(SkyField::from_name(name)?)))
}
