//! Effect parameters
//!
//! An immutable value describing one configuration of the holographic effect.
//! Fields split into two groups: uniform-backed values that can change on a
//! live program, and structural choices that alter the spliced source or the
//! material render state.

use std::collections::BTreeSet;

use holoavatar_config::HolographicQuality;
use holoavatar_ipc::Rgb;
use serde::{Deserialize, Serialize};

use crate::error::HologramError;
use crate::graph::{Blending, MaterialFlags, Side};

/// Where the vertex glitch animates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GlitchVariant {
    /// Body jitters over time; the face region holds a static offset
    #[default]
    BodyAnimated,
    /// Every vertex jitters over time
    Everywhere,
}

/// Render state applied to patched materials
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlendProfile {
    #[default]
    Normal,
    Additive,
}

impl BlendProfile {
    pub fn flags(self) -> MaterialFlags {
        match self {
            BlendProfile::Normal => MaterialFlags {
                transparent: true,
                side: Side::Front,
                depth_write: true,
                blending: Blending::Normal,
            },
            BlendProfile::Additive => MaterialFlags {
                transparent: true,
                side: Side::Double,
                depth_write: false,
                blending: Blending::Additive,
            },
        }
    }
}

/// How two parameter sets differ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamChange {
    None,
    /// Only uniform-backed values differ
    Uniforms,
    /// Shader source or render state must change
    Structural,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectParameters {
    pub color: Rgb,
    pub enabled: bool,
    pub exclude_mesh_names: BTreeSet<String>,
    pub exclude_material_names: BTreeSet<String>,
    pub face_intensity: f32,
    pub body_intensity: f32,
    pub upper_threshold: f32,
    pub lower_threshold: f32,
    pub glitch_intensity: f32,
    pub glitch_frequency: f32,
    pub stripe_count: f32,
    pub glitch_enabled: bool,
    pub glitch_variant: GlitchVariant,
    pub blend_profile: BlendProfile,
}

impl Default for EffectParameters {
    fn default() -> Self {
        Self {
            color: Rgb::HOLOGRAM_BLUE,
            enabled: true,
            exclude_mesh_names: BTreeSet::new(),
            exclude_material_names: BTreeSet::new(),
            face_intensity: 0.2,
            body_intensity: 1.0,
            upper_threshold: 1.3,
            lower_threshold: 0.3,
            glitch_intensity: 1.0,
            glitch_frequency: 1.0,
            stripe_count: 20.0,
            glitch_enabled: true,
            glitch_variant: GlitchVariant::default(),
            blend_profile: BlendProfile::default(),
        }
    }
}

impl EffectParameters {
    /// Defaults with the intensities and glitch settings of a quality tier
    pub fn from_quality(quality: &HolographicQuality) -> Self {
        Self::default().with_quality(quality)
    }

    /// Replace the tier-controlled values, keeping color and exclusions
    pub fn with_quality(mut self, quality: &HolographicQuality) -> Self {
        self.face_intensity = quality.face_intensity;
        self.body_intensity = quality.body_intensity;
        self.glitch_enabled = quality.enable_glitch;
        self.glitch_intensity = quality.glitch_intensity;
        self.glitch_frequency = quality.glitch_frequency;
        self.stripe_count = quality.stripe_count;
        self
    }

    pub fn with_color(mut self, color: Rgb) -> Self {
        self.color = color;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn exclude_mesh(mut self, name: impl Into<String>) -> Self {
        self.exclude_mesh_names.insert(name.into());
        self
    }

    pub fn exclude_material(mut self, name: impl Into<String>) -> Self {
        self.exclude_material_names.insert(name.into());
        self
    }

    /// Exact match against either exclusion set. An empty name only matches
    /// an explicit `""` entry.
    pub fn is_excluded(&self, node_name: &str, material_name: &str) -> bool {
        self.exclude_mesh_names.contains(node_name)
            || self.exclude_material_names.contains(material_name)
    }

    pub fn validate(&self) -> Result<(), HologramError> {
        let unit = |name: &str, value: f32| {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(HologramError::InvalidParameters(format!(
                    "{name} must be within [0, 1], got {value}"
                )))
            }
        };
        unit("face_intensity", self.face_intensity)?;
        unit("body_intensity", self.body_intensity)?;
        unit("glitch_intensity", self.glitch_intensity)?;

        if !self.upper_threshold.is_finite()
            || !self.lower_threshold.is_finite()
            || self.upper_threshold <= self.lower_threshold
        {
            return Err(HologramError::InvalidParameters(format!(
                "upper_threshold ({}) must be above lower_threshold ({})",
                self.upper_threshold, self.lower_threshold
            )));
        }
        if !(self.glitch_frequency.is_finite() && self.glitch_frequency >= 0.0) {
            return Err(HologramError::InvalidParameters(format!(
                "glitch_frequency must be non-negative, got {}",
                self.glitch_frequency
            )));
        }
        if !(self.stripe_count.is_finite() && self.stripe_count > 0.0) {
            return Err(HologramError::InvalidParameters(format!(
                "stripe_count must be positive, got {}",
                self.stripe_count
            )));
        }
        Ok(())
    }

    /// Classify the difference between `self` (the active set) and `next`
    pub fn change_to(&self, next: &EffectParameters) -> ParamChange {
        if self == next {
            return ParamChange::None;
        }
        let structural = self.glitch_enabled != next.glitch_enabled
            || self.glitch_variant != next.glitch_variant
            || self.blend_profile != next.blend_profile
            || self.exclude_mesh_names != next.exclude_mesh_names
            || self.exclude_material_names != next.exclude_material_names;
        if structural {
            ParamChange::Structural
        } else {
            ParamChange::Uniforms
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use holoavatar_config::QualityLevel;

    #[test]
    fn test_defaults_are_valid() {
        let params = EffectParameters::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.color.to_hex(), "#70c1ff");
        assert_eq!(params.stripe_count, 20.0);
    }

    #[test]
    fn test_every_quality_tier_is_valid() {
        for level in QualityLevel::ALL {
            let params = EffectParameters::from_quality(&level.settings().holographic);
            assert!(params.validate().is_ok(), "{level} produced invalid params");
        }
    }

    #[test]
    fn test_from_quality_copies_tier_values() {
        let quality = QualityLevel::UltraLow.settings().holographic;
        let params = EffectParameters::from_quality(&quality);
        assert!(!params.glitch_enabled);
        assert_eq!(params.face_intensity, 0.05);
        assert_eq!(params.stripe_count, 10.0);
        // Untouched by tiers
        assert_eq!(params.upper_threshold, 1.3);
        assert_eq!(params.color, Rgb::HOLOGRAM_BLUE);
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let bad = [
            EffectParameters { face_intensity: 1.5, ..Default::default() },
            EffectParameters { upper_threshold: 0.3, lower_threshold: 0.3, ..Default::default() },
            EffectParameters { glitch_frequency: -1.0, ..Default::default() },
            EffectParameters { stripe_count: 0.0, ..Default::default() },
            EffectParameters { body_intensity: f32::NAN, ..Default::default() },
        ];
        for params in bad {
            assert!(matches!(
                params.validate(),
                Err(HologramError::InvalidParameters(_))
            ));
        }
    }

    #[test]
    fn test_exclusion_is_exact_match() {
        let params = EffectParameters::default()
            .exclude_mesh("Eyes")
            .exclude_material("Teeth_mat");
        assert!(params.is_excluded("Eyes", "whatever"));
        assert!(params.is_excluded("Mouth", "Teeth_mat"));
        assert!(!params.is_excluded("EyesLeft", "skin"));
        assert!(!params.is_excluded("", ""));

        let unnamed = EffectParameters::default().exclude_mesh("");
        assert!(unnamed.is_excluded("", "skin"));
    }

    #[test]
    fn test_change_classification() {
        let base = EffectParameters::default();
        assert_eq!(base.change_to(&base.clone()), ParamChange::None);

        let recolored = base.clone().with_color(Rgb::new(255, 0, 0));
        assert_eq!(base.change_to(&recolored), ParamChange::Uniforms);

        let dimmer = EffectParameters { stripe_count: 5.0, ..base.clone() };
        assert_eq!(base.change_to(&dimmer), ParamChange::Uniforms);

        let no_glitch = EffectParameters { glitch_enabled: false, ..base.clone() };
        assert_eq!(base.change_to(&no_glitch), ParamChange::Structural);

        let excluded = base.clone().exclude_mesh("Eyes");
        assert_eq!(base.change_to(&excluded), ParamChange::Structural);
    }

    #[test]
    fn test_blend_profiles() {
        let normal = BlendProfile::Normal.flags();
        assert!(normal.transparent && normal.depth_write);
        assert_eq!(normal.side, Side::Front);

        let additive = BlendProfile::Additive.flags();
        assert!(!additive.depth_write);
        assert_eq!(additive.blending, Blending::Additive);
        assert_eq!(additive.side, Side::Double);
    }

    #[test]
    fn test_params_deserialize_with_defaults() {
        let params: EffectParameters =
            serde_json::from_str(r##"{"color":"#ff0000","glitch_variant":"everywhere"}"##).unwrap();
        assert_eq!(params.color, Rgb::new(255, 0, 0));
        assert_eq!(params.glitch_variant, GlitchVariant::Everywhere);
        assert_eq!(params.face_intensity, 0.2);
    }
}
