//! The adjustment bundle.
//!
//! [`Adjustments`] is the host-facing description of every edit the render
//! core can apply: global tonal/color/spatial work plus up to eight masked
//! local stacks. The struct is strict and fixed-shape: every field has a
//! defined default, and `Adjustments::default()` is the identity edit, so a
//! sparse sidecar document deserializes into "no change" for everything it
//! does not mention.
//!
//! Scalar conventions, unless a field says otherwise: `[-1, 1]` with 0 as
//! identity. Exposure is in EV stops. Noise reduction amounts live in
//! `[0, inf)`.

use rawgrade_math::Mat3;
use serde::{Deserialize, Serialize};

use crate::agx;
use crate::curve::ToneCurves;
use crate::mask::MaskLayer;
use crate::{Error, Result};

/// Number of fixed HSL bands.
pub const HSL_BANDS: usize = 8;

/// Maximum simultaneous masks per dispatch.
pub const MAX_MASKS: usize = 8;

/// Tone-mapping operator selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToneMapper {
    /// Plain linear -> sRGB encode, no highlight rolloff.
    #[default]
    Legacy,
    /// AgX filmic transform.
    Filmic,
}

impl ToneMapper {
    /// Uniform encoding of the mode.
    #[inline]
    pub fn as_u32(self) -> u32 {
        match self {
            Self::Legacy => 0,
            Self::Filmic => 1,
        }
    }
}

/// Per-band HSL shift. All fields `[-1, 1]`, 0 = identity.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HslShift {
    /// Hue rotation within the band.
    pub hue: f32,
    /// Saturation scale within the band.
    pub saturation: f32,
    /// Luminance shift within the band.
    pub luminance: f32,
}

/// One color-grading zone (shadows, midtones, or highlights).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradingZone {
    /// Tint hue in degrees, `[0, 360)`.
    pub hue: f32,
    /// Tint strength, `[0, 1]`.
    pub saturation: f32,
    /// Luminance offset, `[-1, 1]`.
    pub luminance: f32,
}

impl Default for GradingZone {
    fn default() -> Self {
        Self {
            hue: 0.0,
            saturation: 0.0,
            luminance: 0.0,
        }
    }
}

/// Three-way color grading.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorGrading {
    /// Shadow zone tint.
    pub shadows: GradingZone,
    /// Midtone zone tint.
    pub midtones: GradingZone,
    /// Highlight zone tint.
    pub highlights: GradingZone,
    /// Width of the zone crossover feathers, `[0, 1]`.
    pub blending: f32,
    /// Shifts the shadow/highlight crossovers, `[-1, 1]`.
    pub balance: f32,
}

/// Hue/saturation trim for one camera primary.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PrimaryCalibration {
    /// Rotates the primary toward its hue neighbors, `[-1, 1]`.
    pub hue: f32,
    /// Saturation delta for the primary, `[-1, 1]`.
    pub saturation: f32,
}

/// Camera color calibration.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Calibration {
    /// Shadow tint along the temperature axis, `[-1, 1]`.
    pub shadow_tint: f32,
    /// Red primary trim.
    pub red: PrimaryCalibration,
    /// Green primary trim.
    pub green: PrimaryCalibration,
    /// Blue primary trim.
    pub blue: PrimaryCalibration,
}

/// Vignette parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vignette {
    /// Strength, `[-1, 1]`. Negative darkens, positive lifts toward white.
    pub amount: f32,
    /// Radius at which the falloff is centered, `[0, 1]`.
    pub midpoint: f32,
    /// Ellipse shape, `[0, 1]`. 1 is fully circular, 0 squarer.
    pub roundness: f32,
    /// Softness of the falloff band, `[0, 1]`.
    pub feather: f32,
}

impl Default for Vignette {
    fn default() -> Self {
        Self {
            amount: 0.0,
            midpoint: 0.5,
            roundness: 0.5,
            feather: 0.5,
        }
    }
}

/// Film grain parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Grain {
    /// Strength, `[0, 1]`.
    pub amount: f32,
    /// Grain particle size, `> 0`.
    pub size: f32,
    /// Mix of the rougher noise octave, `[0, 1]`.
    pub roughness: f32,
}

impl Default for Grain {
    fn default() -> Self {
        Self {
            amount: 0.0,
            size: 1.0,
            roughness: 0.5,
        }
    }
}

/// Lateral chromatic aberration correction.
///
/// Dimensionless per-channel radial displacement scales; 0 disables the
/// resample entirely.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChromaticAberration {
    /// Red/cyan fringe displacement.
    pub red_cyan: f32,
    /// Blue/yellow fringe displacement.
    pub blue_yellow: f32,
}

/// The AgX working-space round trip carried in the uniform.
///
/// Hosts that render for other primaries substitute their own pair; the
/// kernel only requires that `inverse` actually invert `forward`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgxTransform {
    /// Input -> AgX rendering space.
    pub forward: Mat3,
    /// AgX rendering space -> input.
    pub inverse: Mat3,
}

impl Default for AgxTransform {
    fn default() -> Self {
        Self {
            forward: agx::AGX_INSET,
            inverse: agx::AGX_INSET_INVERSE,
        }
    }
}

/// Adjustments available inside a mask: the global set minus the frame-wide
/// effects (vignette, grain, CA, LUT, tone-mapper selection).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MaskAdjustments {
    /// Exposure in EV stops.
    pub exposure: f32,
    /// Filmic mid-tone brightness.
    pub brightness: f32,
    /// S-curve contrast.
    pub contrast: f32,
    /// Highlight recovery/boost.
    pub highlights: f32,
    /// Shadow lift/crush.
    pub shadows: f32,
    /// White point scale.
    pub whites: f32,
    /// Black point lift.
    pub blacks: f32,
    /// White balance temperature.
    pub temperature: f32,
    /// White balance tint.
    pub tint: f32,
    /// Plain saturation.
    pub saturation: f32,
    /// Saturation-aware vibrance.
    pub vibrance: f32,
    /// Fine local contrast (smallest blur radius).
    pub sharpness: f32,
    /// Mid local contrast.
    pub clarity: f32,
    /// Coarse local contrast.
    pub structure: f32,
    /// Dehaze strength.
    pub dehaze: f32,
    /// Luma noise reduction, `[0, inf)`.
    pub noise_reduction_luma: f32,
    /// Color noise reduction, `[0, inf)`.
    pub noise_reduction_color: f32,
    /// Warm bloom around highlights, `[0, 1]`.
    pub glow: f32,
    /// Red-orange film halation, `[0, 1]`.
    pub halation: f32,
    /// Flare plane contribution, `[0, 1]`.
    pub flare: f32,
    /// Per-band HSL shifts.
    pub hsl: [HslShift; HSL_BANDS],
    /// Mask-local tone curves, applied after the global curves.
    pub curves: ToneCurves,
    /// Mask-local three-way grading.
    pub grading: ColorGrading,
}

/// The full adjustment bundle for one render.
///
/// # Example
///
/// ```rust
/// use rawgrade_core::Adjustments;
///
/// let mut adjustments = Adjustments::default();
/// adjustments.exposure = 0.5;
/// adjustments.validate().unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Adjustments {
    /// Exposure in EV stops, typically `[-5, 5]`.
    pub exposure: f32,
    /// Filmic mid-tone brightness, `[-1, 1]`.
    pub brightness: f32,
    /// S-curve contrast, `[-1, 1]`.
    pub contrast: f32,
    /// Highlight recovery/boost, `[-1, 1]`.
    pub highlights: f32,
    /// Shadow lift/crush, `[-1, 1]`.
    pub shadows: f32,
    /// White point scale, `[-1, 1]`.
    pub whites: f32,
    /// Black point lift, `[-1, 1]`.
    pub blacks: f32,

    /// White balance temperature, `[-1, 1]`.
    pub temperature: f32,
    /// White balance tint, `[-1, 1]`.
    pub tint: f32,

    /// Plain saturation, `[-1, 1]`.
    pub saturation: f32,
    /// Saturation-aware vibrance, `[-1, 1]`.
    pub vibrance: f32,

    /// Fine local contrast (smallest blur radius), `[-1, 1]`.
    pub sharpness: f32,
    /// Mid local contrast, `[-1, 1]`.
    pub clarity: f32,
    /// Coarse local contrast, `[-1, 1]`.
    pub structure: f32,
    /// Center-weighted punch, `[-1, 1]`.
    pub centre: f32,

    /// Luma noise reduction, `[0, inf)`. Values at or below 100 are inert;
    /// the excess above 100 scales the bilateral threshold.
    pub noise_reduction_luma: f32,
    /// Color noise reduction, `[0, inf)`. Same gate as the luma amount.
    pub noise_reduction_color: f32,

    /// Dehaze strength, `[-1, 1]`.
    pub dehaze: f32,

    /// Vignette.
    pub vignette: Vignette,
    /// Film grain.
    pub grain: Grain,
    /// Chromatic aberration correction.
    pub chromatic_aberration: ChromaticAberration,

    /// Tone-mapping operator.
    pub tone_mapper: ToneMapper,
    /// Paint blown/crushed pixels red/blue.
    pub show_clipping: bool,
    /// Blend factor for the bound 3D LUT, `[0, 1]`. 0 is a no-op even with
    /// a LUT bound.
    pub lut_intensity: f32,

    /// Three-way color grading.
    pub grading: ColorGrading,
    /// Camera calibration.
    pub calibration: Calibration,

    /// Warm bloom around highlights, `[0, 1]`.
    pub glow: f32,
    /// Red-orange film halation, `[0, 1]`.
    pub halation: f32,
    /// Flare plane contribution, `[0, 1]`.
    pub flare: f32,

    /// Per-band HSL shifts (red, orange, yellow, green, aqua, blue,
    /// purple, magenta).
    pub hsl: [HslShift; HSL_BANDS],
    /// Global tone curves.
    pub curves: ToneCurves,

    /// AgX round-trip matrices. Not serialized; hosts with non-default
    /// primaries set this after deserializing.
    #[serde(skip)]
    pub agx: AgxTransform,

    /// Masked local adjustment stacks, applied in order. At most
    /// [`MAX_MASKS`].
    pub masks: Vec<MaskLayer>,
}

impl Default for Adjustments {
    fn default() -> Self {
        Self {
            exposure: 0.0,
            brightness: 0.0,
            contrast: 0.0,
            highlights: 0.0,
            shadows: 0.0,
            whites: 0.0,
            blacks: 0.0,
            temperature: 0.0,
            tint: 0.0,
            saturation: 0.0,
            vibrance: 0.0,
            sharpness: 0.0,
            clarity: 0.0,
            structure: 0.0,
            centre: 0.0,
            noise_reduction_luma: 0.0,
            noise_reduction_color: 0.0,
            dehaze: 0.0,
            vignette: Vignette::default(),
            grain: Grain::default(),
            chromatic_aberration: ChromaticAberration::default(),
            tone_mapper: ToneMapper::Legacy,
            show_clipping: false,
            lut_intensity: 0.0,
            grading: ColorGrading::default(),
            calibration: Calibration::default(),
            glow: 0.0,
            halation: 0.0,
            flare: 0.0,
            hsl: [HslShift::default(); HSL_BANDS],
            curves: ToneCurves::default(),
            agx: AgxTransform::default(),
            masks: Vec::new(),
        }
    }
}

impl Adjustments {
    /// Validates the bundle: curve contracts (global and per mask) and the
    /// mask slot limit.
    pub fn validate(&self) -> Result<()> {
        self.curves.validate("")?;
        if self.masks.len() > MAX_MASKS {
            return Err(Error::TooManyMasks {
                count: self.masks.len(),
            });
        }
        for (i, mask) in self.masks.iter().enumerate() {
            mask.adjustments.curves.validate(&format!("mask {i} "))?;
        }
        Ok(())
    }

    /// Number of enabled masks, capped at the slot limit by `validate`.
    pub fn enabled_mask_count(&self) -> usize {
        self.masks.iter().filter(|m| m.enabled).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::{CurvePoint, ToneCurve};
    use crate::mask::MaskKind;

    #[test]
    fn test_default_is_identity() {
        let adjustments = Adjustments::default();
        assert_eq!(adjustments.exposure, 0.0);
        assert_eq!(adjustments.tone_mapper, ToneMapper::Legacy);
        assert!(adjustments.curves.is_identity());
        assert!(adjustments.masks.is_empty());
        assert!(adjustments.validate().is_ok());
    }

    #[test]
    fn test_sparse_json_fills_defaults() {
        let adjustments: Adjustments =
            serde_json::from_str(r#"{"exposure": 1.5, "vignette": {"amount": -0.4}}"#).unwrap();
        assert_eq!(adjustments.exposure, 1.5);
        assert_eq!(adjustments.vignette.amount, -0.4);
        // Unmentioned fields keep identity defaults.
        assert_eq!(adjustments.vignette.midpoint, 0.5);
        assert_eq!(adjustments.contrast, 0.0);
        assert!(adjustments.curves.is_identity());
    }

    #[test]
    fn test_json_roundtrip() {
        let mut adjustments = Adjustments::default();
        adjustments.contrast = 0.25;
        adjustments.hsl[2].saturation = -0.5;
        adjustments.grading.shadows.hue = 220.0;
        adjustments.masks.push(MaskLayer {
            kind: MaskKind::Radial,
            enabled: true,
            adjustments: MaskAdjustments {
                exposure: 1.0,
                ..Default::default()
            },
        });

        let json = serde_json::to_string(&adjustments).unwrap();
        let back: Adjustments = serde_json::from_str(&json).unwrap();
        assert_eq!(adjustments, back);
    }

    #[test]
    fn test_validate_rejects_nine_masks() {
        let mut adjustments = Adjustments::default();
        for _ in 0..9 {
            adjustments.masks.push(MaskLayer::default());
        }
        assert!(matches!(
            adjustments.validate(),
            Err(Error::TooManyMasks { count: 9 })
        ));
    }

    #[test]
    fn test_validate_names_mask_curve() {
        let mut adjustments = Adjustments::default();
        let mut mask = MaskLayer::default();
        mask.adjustments.curves.red = ToneCurve {
            points: vec![CurvePoint::new(0.0, 0.0)],
        };
        adjustments.masks.push(mask);
        let err = adjustments.validate().unwrap_err();
        assert!(err.to_string().contains("mask 0"));
    }

    #[test]
    fn test_tone_mapper_encoding() {
        assert_eq!(ToneMapper::Legacy.as_u32(), 0);
        assert_eq!(ToneMapper::Filmic.as_u32(), 1);
    }
}
