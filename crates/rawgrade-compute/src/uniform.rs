//! Uniform marshaling.
//!
//! `#[repr(C)]` mirrors of the WGSL uniform structs in
//! [`crate::shaders`]. Field order and padding here are the layout
//! contract; both sides are size-asserted so a drifted field shows up as a
//! compile error rather than a scrambled render.
//!
//! The friendly [`Adjustments`] model is converted by value per dispatch:
//! validation first, then a flat copy into the padded records.

use bytemuck::{Pod, Zeroable};
use rawgrade_core::{Adjustments, MaskAdjustments, Result, ToneCurve};

/// One vec4-padded curve control point.
pub type GpuCurve = [[f32; 4]; 16];

/// Size in bytes of [`GlobalParams`] on the GPU.
pub const GLOBAL_PARAMS_SIZE: usize = 1488;
/// Size in bytes of [`MaskParams`] on the GPU.
pub const MASK_PARAMS_SIZE: usize = 1312;
/// Size in bytes of [`PipelineParams`] on the GPU.
pub const PIPELINE_PARAMS_SIZE: usize = GLOBAL_PARAMS_SIZE + 8 * MASK_PARAMS_SIZE + 32;

/// Mirror of the WGSL `GlobalParams` struct.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct GlobalParams {
    pub exposure: f32,
    pub brightness: f32,
    pub contrast: f32,
    pub highlights: f32,
    pub shadows: f32,
    pub whites: f32,
    pub blacks: f32,
    pub temperature: f32,
    pub tint: f32,
    pub saturation: f32,
    pub vibrance: f32,
    pub sharpness: f32,
    pub clarity: f32,
    pub structure: f32,
    pub centre: f32,
    pub dehaze: f32,
    pub noise_reduction_luma: f32,
    pub noise_reduction_color: f32,
    pub glow: f32,
    pub halation: f32,
    pub flare: f32,
    pub vignette_amount: f32,
    pub vignette_midpoint: f32,
    pub vignette_roundness: f32,
    pub vignette_feather: f32,
    pub grain_amount: f32,
    pub grain_size: f32,
    pub grain_roughness: f32,
    pub ca_red_cyan: f32,
    pub ca_blue_yellow: f32,
    pub lut_intensity: f32,
    pub grading_blending: f32,
    pub grading_balance: f32,
    pub calib_shadow_tint: f32,
    pub calib_red_hue: f32,
    pub calib_red_sat: f32,
    pub calib_green_hue: f32,
    pub calib_green_sat: f32,
    pub calib_blue_hue: f32,
    pub calib_blue_sat: f32,
    pub tonemapper_mode: u32,
    pub is_raw: u32,
    pub show_clipping: u32,
    pub has_lut: u32,
    pub grading_shadows: [f32; 4],
    pub grading_midtones: [f32; 4],
    pub grading_highlights: [f32; 4],
    pub hsl: [[f32; 4]; 8],
    pub luma_curve: GpuCurve,
    pub red_curve: GpuCurve,
    pub green_curve: GpuCurve,
    pub blue_curve: GpuCurve,
    pub curve_counts: [u32; 4],
    pub agx_mat: [[f32; 4]; 3],
    pub agx_mat_inv: [[f32; 4]; 3],
}

/// Mirror of the WGSL `MaskParams` struct.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct MaskParams {
    pub exposure: f32,
    pub brightness: f32,
    pub contrast: f32,
    pub highlights: f32,
    pub shadows: f32,
    pub whites: f32,
    pub blacks: f32,
    pub temperature: f32,
    pub tint: f32,
    pub saturation: f32,
    pub vibrance: f32,
    pub sharpness: f32,
    pub clarity: f32,
    pub structure: f32,
    pub dehaze: f32,
    pub noise_reduction_luma: f32,
    pub noise_reduction_color: f32,
    pub glow: f32,
    pub halation: f32,
    pub flare: f32,
    pub grading_blending: f32,
    pub grading_balance: f32,
    pub _pad0: f32,
    pub _pad1: f32,
    pub grading_shadows: [f32; 4],
    pub grading_midtones: [f32; 4],
    pub grading_highlights: [f32; 4],
    pub hsl: [[f32; 4]; 8],
    pub luma_curve: GpuCurve,
    pub red_curve: GpuCurve,
    pub green_curve: GpuCurve,
    pub blue_curve: GpuCurve,
    pub curve_counts: [u32; 4],
}

/// Mirror of the WGSL `PipelineParams` struct: the whole uniform.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct PipelineParams {
    pub global: GlobalParams,
    pub masks: [MaskParams; 8],
    pub mask_count: u32,
    pub tile_offset_x: u32,
    pub tile_offset_y: u32,
    /// Reserved for atlas-packed mask hosts; the kernel does not read it.
    pub atlas_cols: u32,
    pub full_width: u32,
    pub full_height: u32,
    pub _pad0: u32,
    pub _pad1: u32,
}

const _: () = assert!(std::mem::size_of::<GlobalParams>() == GLOBAL_PARAMS_SIZE);
const _: () = assert!(std::mem::size_of::<MaskParams>() == MASK_PARAMS_SIZE);
const _: () = assert!(std::mem::size_of::<PipelineParams>() == PIPELINE_PARAMS_SIZE);

/// Per-frame facts the uniform carries besides the adjustments.
#[derive(Debug, Clone, Copy)]
pub struct FrameDesc {
    /// Input holds scene-linear values (true) or sRGB-encoded (false).
    pub is_raw: bool,
    /// A 3D LUT is bound.
    pub has_lut: bool,
    /// Full image extent in pixels.
    pub full_size: (u32, u32),
}

fn pack_curve(curve: &ToneCurve) -> ([[f32; 4]; 16], u32) {
    let mut points = [[0.0f32; 4]; 16];
    for (slot, p) in points.iter_mut().zip(curve.points.iter()) {
        slot[0] = p.x;
        slot[1] = p.y;
    }
    (points, curve.points.len() as u32)
}

fn pack_zone(zone: &rawgrade_core::GradingZone) -> [f32; 4] {
    [zone.hue, zone.saturation, zone.luminance, 0.0]
}

fn pack_hsl(shifts: &[rawgrade_core::HslShift; 8]) -> [[f32; 4]; 8] {
    let mut packed = [[0.0f32; 4]; 8];
    for (slot, s) in packed.iter_mut().zip(shifts.iter()) {
        slot[0] = s.hue;
        slot[1] = s.saturation;
        slot[2] = s.luminance;
    }
    packed
}

impl GlobalParams {
    fn build(adjustments: &Adjustments, frame: &FrameDesc) -> Self {
        let (luma_curve, luma_n) = pack_curve(&adjustments.curves.luma);
        let (red_curve, red_n) = pack_curve(&adjustments.curves.red);
        let (green_curve, green_n) = pack_curve(&adjustments.curves.green);
        let (blue_curve, blue_n) = pack_curve(&adjustments.curves.blue);

        Self {
            exposure: adjustments.exposure,
            brightness: adjustments.brightness,
            contrast: adjustments.contrast,
            highlights: adjustments.highlights,
            shadows: adjustments.shadows,
            whites: adjustments.whites,
            blacks: adjustments.blacks,
            temperature: adjustments.temperature,
            tint: adjustments.tint,
            saturation: adjustments.saturation,
            vibrance: adjustments.vibrance,
            sharpness: adjustments.sharpness,
            clarity: adjustments.clarity,
            structure: adjustments.structure,
            centre: adjustments.centre,
            dehaze: adjustments.dehaze,
            noise_reduction_luma: adjustments.noise_reduction_luma,
            noise_reduction_color: adjustments.noise_reduction_color,
            glow: adjustments.glow,
            halation: adjustments.halation,
            flare: adjustments.flare,
            vignette_amount: adjustments.vignette.amount,
            vignette_midpoint: adjustments.vignette.midpoint,
            vignette_roundness: adjustments.vignette.roundness,
            vignette_feather: adjustments.vignette.feather,
            grain_amount: adjustments.grain.amount,
            grain_size: adjustments.grain.size,
            grain_roughness: adjustments.grain.roughness,
            ca_red_cyan: adjustments.chromatic_aberration.red_cyan,
            ca_blue_yellow: adjustments.chromatic_aberration.blue_yellow,
            lut_intensity: adjustments.lut_intensity,
            grading_blending: adjustments.grading.blending,
            grading_balance: adjustments.grading.balance,
            calib_shadow_tint: adjustments.calibration.shadow_tint,
            calib_red_hue: adjustments.calibration.red.hue,
            calib_red_sat: adjustments.calibration.red.saturation,
            calib_green_hue: adjustments.calibration.green.hue,
            calib_green_sat: adjustments.calibration.green.saturation,
            calib_blue_hue: adjustments.calibration.blue.hue,
            calib_blue_sat: adjustments.calibration.blue.saturation,
            tonemapper_mode: adjustments.tone_mapper.as_u32(),
            is_raw: frame.is_raw as u32,
            show_clipping: adjustments.show_clipping as u32,
            has_lut: frame.has_lut as u32,
            grading_shadows: pack_zone(&adjustments.grading.shadows),
            grading_midtones: pack_zone(&adjustments.grading.midtones),
            grading_highlights: pack_zone(&adjustments.grading.highlights),
            hsl: pack_hsl(&adjustments.hsl),
            luma_curve,
            red_curve,
            green_curve,
            blue_curve,
            curve_counts: [luma_n, red_n, green_n, blue_n],
            agx_mat: adjustments.agx.forward.to_padded_cols(),
            agx_mat_inv: adjustments.agx.inverse.to_padded_cols(),
        }
    }
}

impl MaskParams {
    fn build(mask: &MaskAdjustments) -> Self {
        let (luma_curve, luma_n) = pack_curve(&mask.curves.luma);
        let (red_curve, red_n) = pack_curve(&mask.curves.red);
        let (green_curve, green_n) = pack_curve(&mask.curves.green);
        let (blue_curve, blue_n) = pack_curve(&mask.curves.blue);

        Self {
            exposure: mask.exposure,
            brightness: mask.brightness,
            contrast: mask.contrast,
            highlights: mask.highlights,
            shadows: mask.shadows,
            whites: mask.whites,
            blacks: mask.blacks,
            temperature: mask.temperature,
            tint: mask.tint,
            saturation: mask.saturation,
            vibrance: mask.vibrance,
            sharpness: mask.sharpness,
            clarity: mask.clarity,
            structure: mask.structure,
            dehaze: mask.dehaze,
            noise_reduction_luma: mask.noise_reduction_luma,
            noise_reduction_color: mask.noise_reduction_color,
            glow: mask.glow,
            halation: mask.halation,
            flare: mask.flare,
            grading_blending: mask.grading.blending,
            grading_balance: mask.grading.balance,
            _pad0: 0.0,
            _pad1: 0.0,
            grading_shadows: pack_zone(&mask.grading.shadows),
            grading_midtones: pack_zone(&mask.grading.midtones),
            grading_highlights: pack_zone(&mask.grading.highlights),
            hsl: pack_hsl(&mask.hsl),
            luma_curve,
            red_curve,
            green_curve,
            blue_curve,
            curve_counts: [luma_n, red_n, green_n, blue_n],
        }
    }
}

impl PipelineParams {
    /// Builds the uniform from a validated adjustment bundle.
    ///
    /// Disabled masks are skipped; enabled ones keep their relative order
    /// and land in slots `0..mask_count`. Tile offsets start at zero and
    /// are patched per tile by the renderer.
    pub fn build(adjustments: &Adjustments, frame: &FrameDesc) -> Result<Self> {
        adjustments.validate()?;

        let mut masks = [MaskParams::zeroed(); 8];
        let mut count = 0usize;
        for mask in adjustments.masks.iter().filter(|m| m.enabled) {
            masks[count] = MaskParams::build(&mask.adjustments);
            count += 1;
        }

        Ok(Self {
            global: GlobalParams::build(adjustments, frame),
            masks,
            mask_count: count as u32,
            tile_offset_x: 0,
            tile_offset_y: 0,
            atlas_cols: 0,
            full_width: frame.full_size.0,
            full_height: frame.full_size.1,
            _pad0: 0,
            _pad1: 0,
        })
    }

    /// Returns a copy with tile offsets patched in.
    pub fn with_tile_offset(mut self, x: u32, y: u32) -> Self {
        self.tile_offset_x = x;
        self.tile_offset_y = y;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rawgrade_core::{CurvePoint, MaskLayer, ToneMapper};

    fn frame() -> FrameDesc {
        FrameDesc {
            is_raw: false,
            has_lut: false,
            full_size: (64, 64),
        }
    }

    #[test]
    fn test_layout_sizes() {
        assert_eq!(std::mem::size_of::<GlobalParams>(), GLOBAL_PARAMS_SIZE);
        assert_eq!(std::mem::size_of::<MaskParams>(), MASK_PARAMS_SIZE);
        assert_eq!(std::mem::size_of::<PipelineParams>(), 12016);
        // std140 array stride: the mask record must stay 16-byte aligned.
        assert_eq!(MASK_PARAMS_SIZE % 16, 0);
        assert_eq!(GLOBAL_PARAMS_SIZE % 16, 0);
    }

    #[test]
    fn test_identity_build() {
        let params = PipelineParams::build(&Adjustments::default(), &frame()).unwrap();
        assert_eq!(params.mask_count, 0);
        assert_eq!(params.global.tonemapper_mode, 0);
        assert_eq!(params.global.is_raw, 0);
        assert_eq!(params.global.curve_counts, [2, 2, 2, 2]);
        assert_eq!(params.global.luma_curve[1][0], 255.0);
        assert_eq!(params.global.luma_curve[1][1], 255.0);
        assert_eq!(params.full_width, 64);
        // Default AgX forward matrix lands column-major.
        assert!((params.global.agx_mat[0][0] - 0.8424791).abs() < 1e-5);
    }

    #[test]
    fn test_curve_packing() {
        let mut adjustments = Adjustments::default();
        adjustments.curves.luma = ToneCurve::from_points(vec![
            CurvePoint::new(0.0, 0.0),
            CurvePoint::new(128.0, 200.0),
            CurvePoint::new(255.0, 255.0),
        ])
        .unwrap();
        let params = PipelineParams::build(&adjustments, &frame()).unwrap();
        assert_eq!(params.global.curve_counts[0], 3);
        assert_eq!(params.global.luma_curve[1][1], 200.0);
        // Unused slots stay zeroed.
        assert_eq!(params.global.luma_curve[3], [0.0; 4]);
    }

    #[test]
    fn test_disabled_masks_skipped() {
        let mut adjustments = Adjustments::default();
        adjustments.masks.push(MaskLayer {
            enabled: false,
            ..Default::default()
        });
        let mut bright = MaskLayer::default();
        bright.adjustments.exposure = 1.0;
        adjustments.masks.push(bright);

        let params = PipelineParams::build(&adjustments, &frame()).unwrap();
        assert_eq!(params.mask_count, 1);
        assert_eq!(params.masks[0].exposure, 1.0);
    }

    #[test]
    fn test_invalid_curve_rejected() {
        let mut adjustments = Adjustments::default();
        adjustments.curves.red.points = vec![CurvePoint::new(0.0, 0.0)];
        assert!(PipelineParams::build(&adjustments, &frame()).is_err());
    }

    #[test]
    fn test_filmic_and_flags() {
        let mut adjustments = Adjustments::default();
        adjustments.tone_mapper = ToneMapper::Filmic;
        adjustments.show_clipping = true;
        let desc = FrameDesc {
            is_raw: true,
            has_lut: true,
            full_size: (128, 96),
        };
        let params = PipelineParams::build(&adjustments, &desc).unwrap();
        assert_eq!(params.global.tonemapper_mode, 1);
        assert_eq!(params.global.is_raw, 1);
        assert_eq!(params.global.show_clipping, 1);
        assert_eq!(params.global.has_lut, 1);
    }

    #[test]
    fn test_tile_offset_patch() {
        let params = PipelineParams::build(&Adjustments::default(), &frame()).unwrap();
        let tiled = params.with_tile_offset(512, 1024);
        assert_eq!(tiled.tile_offset_x, 512);
        assert_eq!(tiled.tile_offset_y, 1024);
        // Everything else is untouched.
        assert_eq!(tiled.full_width, params.full_width);
    }
}
