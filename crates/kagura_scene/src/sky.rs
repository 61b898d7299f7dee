//! Procedural sky parameters.
//!
//! # Overview
//!
//! [`SkyParameters`] holds the atmospheric-scattering inputs of a
//! Preetham-style sky dome. Every field has a declared range and GUI step
//! (see [`SkyField::range`]); setters clamp into that range and reject
//! non-finite input. After each change the derived [`SkyUniforms`] are
//! pushed to a [`SkyTarget`], typically the renderer's sky material.

use std::f32::consts::PI;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use kagura_core::ControlError;

/// Uniform scale applied to the sky dome mesh.
pub const SKY_SCALE: f32 = 450_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkyField {
    Turbidity,
    Rayleigh,
    MieCoefficient,
    MieDirectionalG,
    Inclination,
    Azimuth,
    Exposure,
}

/// Inclusive bounds and slider step of one field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldRange {
    pub min: f32,
    pub max: f32,
    pub step: f32,
}

impl SkyField {
    pub const ALL: [SkyField; 7] = [
        SkyField::Turbidity,
        SkyField::Rayleigh,
        SkyField::MieCoefficient,
        SkyField::MieDirectionalG,
        SkyField::Inclination,
        SkyField::Azimuth,
        SkyField::Exposure,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            SkyField::Turbidity => "turbidity",
            SkyField::Rayleigh => "rayleigh",
            SkyField::MieCoefficient => "mie_coefficient",
            SkyField::MieDirectionalG => "mie_directional_g",
            SkyField::Inclination => "inclination",
            SkyField::Azimuth => "azimuth",
            SkyField::Exposure => "exposure",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, ControlError> {
        Self::ALL
            .into_iter()
            .find(|f| f.name() == name)
            .ok_or_else(|| ControlError::UnknownField(name.to_string()))
    }

    #[must_use]
    pub fn range(self) -> FieldRange {
        let (min, max, step) = match self {
            SkyField::Turbidity => (0.0, 20.0, 0.1),
            SkyField::Rayleigh => (0.0, 4.0, 0.001),
            SkyField::MieCoefficient => (0.0, 0.1, 0.001),
            SkyField::MieDirectionalG => (0.0, 1.0, 0.001),
            SkyField::Inclination | SkyField::Azimuth | SkyField::Exposure => (0.0, 1.0, 0.0001),
        };
        FieldRange { min, max, step }
    }
}

/// Values handed to the sky renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkyUniforms {
    pub turbidity: f32,
    pub rayleigh: f32,
    pub mie_coefficient: f32,
    pub mie_directional_g: f32,
    /// Unit vector towards the sun
    pub sun_position: Vec3,
    /// Tone-mapping exposure
    pub exposure: f32,
}

/// Receives sky changes; implemented by render backends.
pub trait SkyTarget {
    fn apply_sky(&mut self, uniforms: &SkyUniforms);
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkyParameters {
    turbidity: f32,
    rayleigh: f32,
    mie_coefficient: f32,
    mie_directional_g: f32,
    inclination: f32,
    azimuth: f32,
    exposure: f32,
}

impl Default for SkyParameters {
    fn default() -> Self {
        Self {
            turbidity: 3.0,
            rayleigh: 0.5,
            mie_coefficient: 0.005,
            mie_directional_g: 0.7,
            inclination: 0.1,
            azimuth: 0.3,
            exposure: 1.0,
        }
    }
}

impl SkyParameters {
    #[must_use]
    pub fn get(&self, field: SkyField) -> f32 {
        match field {
            SkyField::Turbidity => self.turbidity,
            SkyField::Rayleigh => self.rayleigh,
            SkyField::MieCoefficient => self.mie_coefficient,
            SkyField::MieDirectionalG => self.mie_directional_g,
            SkyField::Inclination => self.inclination,
            SkyField::Azimuth => self.azimuth,
            SkyField::Exposure => self.exposure,
        }
    }

    /// Sets one field, clamped to its range. Returns the stored value.
    pub fn set(&mut self, field: SkyField, value: f32) -> Result<f32, ControlError> {
        if !value.is_finite() {
            return Err(ControlError::NonFinite {
                field: field.name(),
                value,
            });
        }
        let range = field.range();
        let value = value.clamp(range.min, range.max);

        let slot = match field {
            SkyField::Turbidity => &mut self.turbidity,
            SkyField::Rayleigh => &mut self.rayleigh,
            SkyField::MieCoefficient => &mut self.mie_coefficient,
            SkyField::MieDirectionalG => &mut self.mie_directional_g,
            SkyField::Inclination => &mut self.inclination,
            SkyField::Azimuth => &mut self.azimuth,
            SkyField::Exposure => &mut self.exposure,
        };
        *slot = value;
        Ok(value)
    }

    /// Sets a field and pushes the new uniforms to `target`.
    pub fn set_and_apply(&mut self, field: SkyField, value: f32, target: &mut dyn SkyTarget) -> Result<f32, ControlError> {
        let stored = self.set(field, value)?;
        target.apply_sky(&self.uniforms());
        Ok(stored)
    }

    /// Brings values loaded from settings back into range.
    #[must_use]
    pub fn sanitized(self) -> Self {
        let mut out = Self::default();
        for field in SkyField::ALL {
            // Non-finite input keeps the default.
            let _ = out.set(field, self.get(field));
        }
        out
    }

    /// Direction of the sun derived from inclination and azimuth.
    #[must_use]
    pub fn sun_direction(&self) -> Vec3 {
        let theta = PI * (self.inclination - 0.5);
        let phi = 2.0 * PI * (self.azimuth - 0.5);

        Vec3::new(phi.cos(), phi.sin() * theta.sin(), phi.sin() * theta.cos())
    }

    #[must_use]
    pub fn uniforms(&self) -> SkyUniforms {
        SkyUniforms {
            turbidity: self.turbidity,
            rayleigh: self.rayleigh,
            mie_coefficient: self.mie_coefficient,
            mie_directional_g: self.mie_directional_g,
            sun_position: self.sun_direction(),
            exposure: self.exposure,
        }
    }
}
