//! End-to-end pipeline tests.
//!
//! Each test renders a small constant frame through the real GPU pipeline
//! and checks the output bytes. On machines without a usable adapter the
//! tests log a skip and pass vacuously.

use rawgrade_compute::{BlurSet, FrameInput, GpuContext, InfluencePlane, PixelPlane, Renderer};
use rawgrade_core::{Adjustments, CurvePoint, MaskLayer, ToneCurve, ToneMapper};

const W: u32 = 64;
const H: u32 = 64;

fn gpu() -> Option<(GpuContext, Renderer)> {
    let _ = env_logger::builder().is_test(true).try_init();
    match GpuContext::new() {
        Ok(context) => {
            let renderer = Renderer::new(&context).ok()?;
            Some((context, renderer))
        }
        Err(e) => {
            eprintln!("skipping GPU test: {e}");
            None
        }
    }
}

fn srgb_encode(l: f32) -> f32 {
    if l <= 0.0031308 {
        l * 12.92
    } else {
        1.055 * l.powf(1.0 / 2.4) - 0.055
    }
}

fn srgb_decode(v: f32) -> f32 {
    if v <= 0.04045 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}

/// Constant RGBA frame whose texels hold the sRGB encoding of `linear`.
fn encoded_frame(linear: [f32; 3]) -> Vec<f32> {
    let texel = [
        srgb_encode(linear[0]),
        srgb_encode(linear[1]),
        srgb_encode(linear[2]),
        1.0,
    ];
    let mut data = Vec::with_capacity((W * H * 4) as usize);
    for _ in 0..W * H {
        data.extend_from_slice(&texel);
    }
    data
}

fn raw_frame(linear: [f32; 3]) -> Vec<f32> {
    let texel = [linear[0], linear[1], linear[2], 1.0];
    let mut data = Vec::with_capacity((W * H * 4) as usize);
    for _ in 0..W * H {
        data.extend_from_slice(&texel);
    }
    data
}

/// Renders a frame whose blur planes equal the image (exact for constant
/// input) with optional mask influence planes.
fn render(
    renderer: &Renderer,
    image: &[f32],
    is_raw: bool,
    masks: &[&[f32]],
    adjustments: &Adjustments,
) -> Vec<u8> {
    let plane = PixelPlane::new(image, W, H).unwrap();
    let frame = FrameInput {
        image: plane,
        is_raw,
        blurs: BlurSet {
            sharpness: plane,
            tonal: plane,
            clarity: plane,
            structure: plane,
        },
        masks: masks
            .iter()
            .map(|m| InfluencePlane::new(m, W, H).unwrap())
            .collect(),
        lut: None,
        flare: None,
    };
    renderer.render(&frame, adjustments).unwrap()
}

fn channel_stats(pixels: &[u8]) -> (f32, u8, u8) {
    let mut sum = 0u64;
    let mut lo = u8::MAX;
    let mut hi = 0u8;
    let mut n = 0u64;
    for px in pixels.chunks(4) {
        for &v in &px[..3] {
            sum += v as u64;
            lo = lo.min(v);
            hi = hi.max(v);
            n += 1;
        }
    }
    ((sum as f32) / (n as f32), lo, hi)
}

#[test]
fn identity_round_trips_within_dither() {
    let Some((_context, renderer)) = gpu() else {
        return;
    };
    let image = encoded_frame([0.5, 0.5, 0.5]);
    let pixels = render(&renderer, &image, false, &[], &Adjustments::default());

    let expected = srgb_encode(0.5) * 255.0;
    for px in pixels.chunks(4) {
        for &v in &px[..3] {
            assert!(
                (v as f32 - expected).abs() <= 2.0,
                "channel {v} strayed from {expected}"
            );
        }
        assert_eq!(px[3], 255, "alpha must pass through");
    }
}

#[test]
fn exposure_one_stop_saturates_mid_gray() {
    let Some((_context, renderer)) = gpu() else {
        return;
    };
    let image = encoded_frame([0.5, 0.5, 0.5]);
    let mut adjustments = Adjustments::default();
    adjustments.exposure = 1.0;
    let pixels = render(&renderer, &image, false, &[], &adjustments);

    let (mean, _, _) = channel_stats(&pixels);
    assert!(mean >= 253.0, "mean {mean} below 253 after +1 EV");
}

#[test]
fn contrast_fixes_mid_gray() {
    let Some((_context, renderer)) = gpu() else {
        return;
    };
    let image = encoded_frame([0.5, 0.5, 0.5]);
    let mut adjustments = Adjustments::default();
    adjustments.contrast = 0.5;
    let pixels = render(&renderer, &image, false, &[], &adjustments);

    let expected = srgb_encode(0.5) * 255.0;
    for px in pixels.chunks(4) {
        for &v in &px[..3] {
            assert!(
                (v as f32 - expected).abs() <= 2.0,
                "mid-gray moved under contrast: {v} vs {expected}"
            );
        }
    }
}

#[test]
fn contrast_darkens_below_and_lifts_above_mid_gray() {
    let Some((_context, renderer)) = gpu() else {
        return;
    };
    let mut adjustments = Adjustments::default();
    adjustments.contrast = 0.5;

    let dark = encoded_frame([0.2, 0.2, 0.2]);
    let bright = encoded_frame([0.8, 0.8, 0.8]);
    let dark_out = render(&renderer, &dark, false, &[], &adjustments);
    let bright_out = render(&renderer, &bright, false, &[], &adjustments);

    assert!((dark_out[0] as f32) < srgb_encode(0.2) * 255.0);
    assert!((bright_out[0] as f32) > srgb_encode(0.8) * 255.0);
}

#[test]
fn hsl_red_luminance_darkens_red() {
    let Some((_context, renderer)) = gpu() else {
        return;
    };
    let linear = [0.8, 0.05, 0.05];
    let image = encoded_frame(linear);
    let mut adjustments = Adjustments::default();
    adjustments.hsl[0].luminance = -1.0;
    let pixels = render(&renderer, &image, false, &[], &adjustments);

    let input_luma = 0.2126 * linear[0] + 0.7152 * linear[1] + 0.0722 * linear[2];
    let out = [
        srgb_decode(pixels[0] as f32 / 255.0),
        srgb_decode(pixels[1] as f32 / 255.0),
        srgb_decode(pixels[2] as f32 / 255.0),
    ];
    let out_luma = 0.2126 * out[0] + 0.7152 * out[1] + 0.0722 * out[2];
    assert!(
        out_luma < input_luma - 0.01,
        "red luma did not drop: {out_luma} vs {input_luma}"
    );
}

#[test]
fn vignette_darkens_corners_not_center() {
    let Some((_context, renderer)) = gpu() else {
        return;
    };
    let image = encoded_frame([1.0, 1.0, 1.0]);
    let mut adjustments = Adjustments::default();
    adjustments.vignette.amount = -1.0;
    adjustments.vignette.midpoint = 0.3;
    adjustments.vignette.feather = 0.3;
    adjustments.vignette.roundness = 0.0;
    let pixels = render(&renderer, &image, false, &[], &adjustments);

    let corner = &pixels[0..3];
    let center_idx = (((H / 2) * W + W / 2) * 4) as usize;
    let center = &pixels[center_idx..center_idx + 3];
    for &v in corner {
        assert!(v <= 5, "corner not crushed: {v}");
    }
    for &v in center {
        assert!(v >= 250, "center dimmed: {v}");
    }
}

#[test]
fn mask_exposure_splits_at_boundary() {
    let Some((_context, renderer)) = gpu() else {
        return;
    };
    let image = encoded_frame([0.25, 0.25, 0.25]);

    // Influence 1.0 on the bottom half, 0.0 above.
    let mut influence = vec![0.0f32; (W * H) as usize];
    for row in (H / 2)..H {
        for col in 0..W {
            influence[(row * W + col) as usize] = 1.0;
        }
    }

    let mut adjustments = Adjustments::default();
    let mut mask = MaskLayer::default();
    mask.adjustments.exposure = 1.0;
    adjustments.masks.push(mask);

    let pixels = render(&renderer, &image, false, &[&influence], &adjustments);

    let top_expected = srgb_encode(0.25) * 255.0;
    let bottom_expected = srgb_encode(0.5) * 255.0;
    let top_idx = ((H / 2 - 1) * W * 4) as usize;
    let bottom_idx = ((H / 2) * W * 4) as usize;
    assert!(
        (pixels[top_idx] as f32 - top_expected).abs() <= 3.0,
        "top half off: {} vs {top_expected}",
        pixels[top_idx]
    );
    assert!(
        (pixels[bottom_idx] as f32 - bottom_expected).abs() <= 3.0,
        "bottom half off: {} vs {bottom_expected}",
        pixels[bottom_idx]
    );
}

#[test]
fn zero_influence_mask_is_noop() {
    let Some((_context, renderer)) = gpu() else {
        return;
    };
    let image = encoded_frame([0.4, 0.3, 0.2]);
    let influence = vec![0.0f32; (W * H) as usize];

    let baseline = render(&renderer, &image, false, &[], &Adjustments::default());

    let mut adjustments = Adjustments::default();
    let mut mask = MaskLayer::default();
    mask.adjustments.exposure = 2.0;
    mask.adjustments.saturation = 1.0;
    adjustments.masks.push(mask);
    let masked = render(&renderer, &image, false, &[&influence], &adjustments);

    assert_eq!(baseline, masked, "zero-influence mask changed the output");
}

#[test]
fn luma_curve_lifts_mid_gray() {
    let Some((_context, renderer)) = gpu() else {
        return;
    };
    let image = encoded_frame([0.5, 0.5, 0.5]);

    let baseline = render(&renderer, &image, false, &[], &Adjustments::default());

    let mut adjustments = Adjustments::default();
    adjustments.curves.luma = ToneCurve::from_points(vec![
        CurvePoint::new(0.0, 0.0),
        CurvePoint::new(128.0, 200.0),
        CurvePoint::new(255.0, 255.0),
    ])
    .unwrap();
    let curved = render(&renderer, &image, false, &[], &adjustments);

    assert!(
        curved[0] > baseline[0] + 4,
        "curve did not lift mid-gray: {} vs {}",
        curved[0],
        baseline[0]
    );
}

#[test]
fn agx_is_positive_finite_and_monotone_on_grays() {
    let Some((_context, renderer)) = gpu() else {
        return;
    };
    let mut adjustments = Adjustments::default();
    adjustments.tone_mapper = ToneMapper::Filmic;

    let mut previous = -1i32;
    for gray in [0.01, 0.05, 0.18, 0.5, 1.0, 2.0] {
        let image = raw_frame([gray, gray, gray]);
        let pixels = render(&renderer, &image, true, &[], &adjustments);
        let v = pixels[0] as i32;
        assert!(v > 0, "gray {gray} mapped to zero");
        assert!(
            v >= previous,
            "AgX not monotone on grays: {v} after {previous}"
        );
        previous = v;
    }
}

#[test]
fn clipping_indicator_paints_exact_red_and_blue() {
    let Some((_context, renderer)) = gpu() else {
        return;
    };
    let mut adjustments = Adjustments::default();
    adjustments.show_clipping = true;

    let white = encoded_frame([1.0, 1.0, 1.0]);
    let pixels = render(&renderer, &white, false, &[], &adjustments);
    assert_eq!(&pixels[0..3], &[255, 0, 0], "blown pixel must be pure red");

    let black = encoded_frame([0.0, 0.0, 0.0]);
    let pixels = render(&renderer, &black, false, &[], &adjustments);
    assert_eq!(&pixels[0..3], &[0, 0, 255], "crushed pixel must be pure blue");
}

#[test]
fn alpha_passes_through() {
    let Some((_context, renderer)) = gpu() else {
        return;
    };
    let mut image = encoded_frame([0.5, 0.5, 0.5]);
    for px in image.chunks_mut(4) {
        px[3] = 0.5;
    }
    let pixels = render(&renderer, &image, false, &[], &Adjustments::default());
    for px in pixels.chunks(4) {
        assert!((px[3] as i32 - 128).abs() <= 1, "alpha drifted: {}", px[3]);
    }
}

#[test]
fn output_is_deterministic() {
    let Some((_context, renderer)) = gpu() else {
        return;
    };
    let image = encoded_frame([0.6, 0.4, 0.3]);
    let mut adjustments = Adjustments::default();
    adjustments.contrast = 0.3;
    adjustments.grain.amount = 0.5;

    let first = render(&renderer, &image, false, &[], &adjustments);
    let second = render(&renderer, &image, false, &[], &adjustments);
    assert_eq!(first, second, "identical inputs must render identical bytes");
}
