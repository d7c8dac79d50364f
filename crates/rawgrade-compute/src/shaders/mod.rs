//! WGSL sources for the render kernel.
//!
//! The kernel is one compute entry point over the output tile, assembled
//! from the section constants below by [`kernel_source`]. Section order
//! matters only for declaration-before-use; the per-pixel operator order is
//! fixed in `MAIN` and is the pipeline contract:
//!
//! CA resample -> linear ingress -> local contrast (sharpness, clarity,
//! structure, centre) -> exposure -> raw contrast emulation -> glow /
//! halation / flare -> global stack -> masked stacks -> tone-map ->
//! curves -> LUT -> grain -> vignette -> clipping -> dither.
//!
//! The uniform structs here must match the `#[repr(C)]` mirrors in
//! `crate::uniform` field for field; both sides carry layout assertions.

/// Uniform structs and resource bindings.
///
/// Group 0 is per-dispatch I/O, group 1 the four blur planes, group 2 the
/// mask influence array, group 3 the optional LUT and flare resources
/// (placeholder-bound when absent, gated by `has_lut` / flare amount).
pub const BINDINGS: &str = r#"
struct GlobalParams {
    exposure: f32,
    brightness: f32,
    contrast: f32,
    highlights: f32,
    shadows: f32,
    whites: f32,
    blacks: f32,
    temperature: f32,
    tint: f32,
    saturation: f32,
    vibrance: f32,
    sharpness: f32,
    clarity: f32,
    structure: f32,
    centre: f32,
    dehaze: f32,
    noise_reduction_luma: f32,
    noise_reduction_color: f32,
    glow: f32,
    halation: f32,
    flare: f32,
    vignette_amount: f32,
    vignette_midpoint: f32,
    vignette_roundness: f32,
    vignette_feather: f32,
    grain_amount: f32,
    grain_size: f32,
    grain_roughness: f32,
    ca_red_cyan: f32,
    ca_blue_yellow: f32,
    lut_intensity: f32,
    grading_blending: f32,
    grading_balance: f32,
    calib_shadow_tint: f32,
    calib_red_hue: f32,
    calib_red_sat: f32,
    calib_green_hue: f32,
    calib_green_sat: f32,
    calib_blue_hue: f32,
    calib_blue_sat: f32,
    tonemapper_mode: u32,
    is_raw: u32,
    show_clipping: u32,
    has_lut: u32,
    grading_shadows: vec4<f32>,
    grading_midtones: vec4<f32>,
    grading_highlights: vec4<f32>,
    hsl: array<vec4<f32>, 8>,
    luma_curve: array<vec4<f32>, 16>,
    red_curve: array<vec4<f32>, 16>,
    green_curve: array<vec4<f32>, 16>,
    blue_curve: array<vec4<f32>, 16>,
    curve_counts: vec4<u32>,
    agx_mat: mat3x3<f32>,
    agx_mat_inv: mat3x3<f32>,
}

struct MaskParams {
    exposure: f32,
    brightness: f32,
    contrast: f32,
    highlights: f32,
    shadows: f32,
    whites: f32,
    blacks: f32,
    temperature: f32,
    tint: f32,
    saturation: f32,
    vibrance: f32,
    sharpness: f32,
    clarity: f32,
    structure: f32,
    dehaze: f32,
    noise_reduction_luma: f32,
    noise_reduction_color: f32,
    glow: f32,
    halation: f32,
    flare: f32,
    grading_blending: f32,
    grading_balance: f32,
    _pad0: f32,
    _pad1: f32,
    grading_shadows: vec4<f32>,
    grading_midtones: vec4<f32>,
    grading_highlights: vec4<f32>,
    hsl: array<vec4<f32>, 8>,
    luma_curve: array<vec4<f32>, 16>,
    red_curve: array<vec4<f32>, 16>,
    green_curve: array<vec4<f32>, 16>,
    blue_curve: array<vec4<f32>, 16>,
    curve_counts: vec4<u32>,
}

struct PipelineParams {
    global: GlobalParams,
    masks: array<MaskParams, 8>,
    mask_count: u32,
    tile_offset_x: u32,
    tile_offset_y: u32,
    atlas_cols: u32,
    full_width: u32,
    full_height: u32,
    _pad0: u32,
    _pad1: u32,
}

@group(0) @binding(0) var input_texture: texture_2d<f32>;
@group(0) @binding(1) var output_texture: texture_storage_2d<rgba8unorm, write>;
@group(0) @binding(2) var<uniform> params: PipelineParams;

@group(1) @binding(0) var sharpness_blur: texture_2d<f32>;
@group(1) @binding(1) var tonal_blur: texture_2d<f32>;
@group(1) @binding(2) var clarity_blur: texture_2d<f32>;
@group(1) @binding(3) var structure_blur: texture_2d<f32>;

@group(2) @binding(0) var mask_influences: texture_2d_array<f32>;

@group(3) @binding(0) var lut_texture: texture_3d<f32>;
@group(3) @binding(1) var lut_sampler: sampler;
@group(3) @binding(2) var flare_texture: texture_2d<f32>;
@group(3) @binding(3) var flare_sampler: sampler;

const EPS: f32 = 1e-6;
const LUMA_W: vec3<f32> = vec3<f32>(0.2126, 0.7152, 0.0722);
"#;

/// Color space and geometry helpers.
pub const COLOR: &str = r#"
fn luma(c: vec3<f32>) -> f32 {
    return dot(c, LUMA_W);
}

fn srgb_to_linear(c: vec3<f32>) -> vec3<f32> {
    let lo = c / 12.92;
    let hi = pow((c + vec3<f32>(0.055)) / 1.055, vec3<f32>(2.4));
    return select(hi, lo, c <= vec3<f32>(0.04045));
}

fn linear_to_srgb(c: vec3<f32>) -> vec3<f32> {
    let cc = max(c, vec3<f32>(0.0));
    let lo = cc * 12.92;
    let hi = 1.055 * pow(cc, vec3<f32>(1.0 / 2.4)) - vec3<f32>(0.055);
    return select(hi, lo, cc <= vec3<f32>(0.0031308));
}

fn rgb_to_hsv(c: vec3<f32>) -> vec3<f32> {
    let k = vec4<f32>(0.0, -1.0 / 3.0, 2.0 / 3.0, -1.0);
    let p = mix(vec4<f32>(c.bg, k.wz), vec4<f32>(c.gb, k.xy), step(c.b, c.g));
    let q = mix(vec4<f32>(p.xyw, c.r), vec4<f32>(c.r, p.yzx), step(p.x, c.r));
    let d = q.x - min(q.w, q.y);
    return vec3<f32>(abs(q.z + (q.w - q.y) / (6.0 * d + 1e-10)), d / (q.x + 1e-10), q.x);
}

fn hsv_to_rgb(c: vec3<f32>) -> vec3<f32> {
    let k = vec4<f32>(1.0, 2.0 / 3.0, 1.0 / 3.0, 3.0);
    let p = abs(fract(c.xxx + k.xyz) * 6.0 - k.www);
    return c.z * mix(k.xxx, clamp(p - k.xxx, vec3<f32>(0.0), vec3<f32>(1.0)), c.y);
}

// Per-axis normalized distance from the image center; corners land at 1.
fn radial_distance(abs_pos: vec2<f32>, full_size: vec2<f32>) -> f32 {
    let half_size = max(full_size * 0.5, vec2<f32>(1.0));
    let v = (abs_pos - half_size) / half_size;
    return length(v) * 0.70710678;
}

// Center-weighted falloff: 1 in the middle of the frame, 0 at the corners.
fn centre_weight(abs_pos: vec2<f32>, full_size: vec2<f32>) -> f32 {
    let d = radial_distance(abs_pos, full_size);
    return 1.0 - smoothstep(0.025, 0.775, d);
}

fn hash_coords(p: vec2<u32>, seed: u32) -> f32 {
    var h = seed ^ (p.x * 0x9E3779B9u) ^ (p.y * 0x85EBCA6Bu);
    h = h ^ (h >> 16u);
    h = h * 0x7FEB352Du;
    h = h ^ (h >> 15u);
    h = h * 0x846CA68Bu;
    h = h ^ (h >> 16u);
    return f32(h) / 4294967295.0;
}

fn hash_grad(p: vec2<f32>) -> vec2<f32> {
    let q = vec2<f32>(
        dot(p, vec2<f32>(127.1, 311.7)),
        dot(p, vec2<f32>(269.5, 183.3)),
    );
    return fract(sin(q) * 43758.5453) * 2.0 - vec2<f32>(1.0);
}

// Gradient noise with quintic fade, roughly [-1, 1].
fn gradient_noise(p: vec2<f32>) -> f32 {
    let i = floor(p);
    let f = fract(p);
    let u = f * f * f * (f * (f * 6.0 - 15.0) + 10.0);
    let ga = hash_grad(i);
    let gb = hash_grad(i + vec2<f32>(1.0, 0.0));
    let gc = hash_grad(i + vec2<f32>(0.0, 1.0));
    let gd = hash_grad(i + vec2<f32>(1.0, 1.0));
    let va = dot(ga, f);
    let vb = dot(gb, f - vec2<f32>(1.0, 0.0));
    let vc = dot(gc, f - vec2<f32>(0.0, 1.0));
    let vd = dot(gd, f - vec2<f32>(1.0, 1.0));
    return mix(mix(va, vb, u.x), mix(vc, vd, u.x), u.y) * 1.4142;
}
"#;

/// Monotone tone-curve evaluation.
pub const CURVES: &str = r#"
// Monotone cubic over [0,255]: Fritsch-Carlson tangents with the Hyman
// rescale wherever alpha^2 + beta^2 > 9.
fn eval_tone_curve(points: array<vec4<f32>, 16>, count: u32, x: f32) -> f32 {
    let n = min(count, 16u);
    if (n < 2u) {
        return x;
    }
    var pts = points;
    if (x <= pts[0].x) {
        return pts[0].y;
    }
    if (x >= pts[n - 1u].x) {
        return pts[n - 1u].y;
    }

    var secants: array<f32, 15>;
    for (var i = 0u; i < n - 1u; i = i + 1u) {
        secants[i] = (pts[i + 1u].y - pts[i].y) / max(pts[i + 1u].x - pts[i].x, EPS);
    }

    var m: array<f32, 16>;
    m[0] = secants[0];
    m[n - 1u] = secants[n - 2u];
    for (var i = 1u; i < n - 1u; i = i + 1u) {
        if (secants[i - 1u] * secants[i] <= 0.0) {
            m[i] = 0.0;
        } else {
            m[i] = 0.5 * (secants[i - 1u] + secants[i]);
        }
    }
    for (var i = 0u; i < n - 1u; i = i + 1u) {
        let d = secants[i];
        if (abs(d) < EPS) {
            m[i] = 0.0;
            m[i + 1u] = 0.0;
            continue;
        }
        let alpha = m[i] / d;
        let beta = m[i + 1u] / d;
        let s = alpha * alpha + beta * beta;
        if (s > 9.0) {
            let tau = 3.0 / sqrt(s);
            m[i] = tau * alpha * d;
            m[i + 1u] = tau * beta * d;
        }
    }

    var seg = 0u;
    for (var i = 0u; i < n - 2u; i = i + 1u) {
        if (pts[i + 1u].x <= x) {
            seg = i + 1u;
        }
    }

    let p0 = pts[seg];
    let p1 = pts[seg + 1u];
    let h = p1.x - p0.x;
    let t = (x - p0.x) / h;
    let t2 = t * t;
    let t3 = t2 * t;
    return p0.y * (2.0 * t3 - 3.0 * t2 + 1.0)
        + h * m[seg] * (t3 - 2.0 * t2 + t)
        + p1.y * (-2.0 * t3 + 3.0 * t2)
        + h * m[seg + 1u] * (t3 - t2);
}

fn curve_is_identity(points: array<vec4<f32>, 16>, count: u32) -> bool {
    var pts = points;
    return count == 2u
        && pts[0].x == 0.0 && pts[0].y == 0.0
        && pts[1].x == 255.0 && pts[1].y == 255.0;
}

// Applies a curve set to an encoded color. When any RGB curve is active the
// channels are curved individually and the result is rescaled onto the luma
// target the luma curve assigns to the original luma; otherwise the luma
// curve runs per channel.
fn apply_curve_set(
    color: vec3<f32>,
    luma_curve: array<vec4<f32>, 16>,
    red_curve: array<vec4<f32>, 16>,
    green_curve: array<vec4<f32>, 16>,
    blue_curve: array<vec4<f32>, 16>,
    counts: vec4<u32>,
) -> vec3<f32> {
    let luma_id = curve_is_identity(luma_curve, counts.x);
    let rgb_id = curve_is_identity(red_curve, counts.y)
        && curve_is_identity(green_curve, counts.z)
        && curve_is_identity(blue_curve, counts.w);
    if (luma_id && rgb_id) {
        return color;
    }

    let c255 = clamp(color, vec3<f32>(0.0), vec3<f32>(1.0)) * 255.0;
    if (rgb_id) {
        return vec3<f32>(
            eval_tone_curve(luma_curve, counts.x, c255.r),
            eval_tone_curve(luma_curve, counts.x, c255.g),
            eval_tone_curve(luma_curve, counts.x, c255.b),
        ) / 255.0;
    }

    var curved = vec3<f32>(
        eval_tone_curve(red_curve, counts.y, c255.r),
        eval_tone_curve(green_curve, counts.z, c255.g),
        eval_tone_curve(blue_curve, counts.w, c255.b),
    ) / 255.0;

    let target_luma = eval_tone_curve(luma_curve, counts.x, luma(c255)) / 255.0;
    curved = curved * (target_luma / max(luma(curved), EPS));
    let peak = max(curved.r, max(curved.g, curved.b));
    if (peak > 1.0) {
        curved = curved / peak;
    }
    return curved;
}
"#;

/// Local-contrast family: the sharpness/clarity/structure trio, the
/// centre-weighted variant, and bilateral noise reduction.
pub const LOCAL: &str = r#"
const LC_SHARPNESS: u32 = 0u;
const LC_CLARITY: u32 = 1u;
const LC_STRUCTURE: u32 = 2u;

// Log-luma local contrast against a precomputed blur of the input. The
// shadow/highlight protection mask keeps both ends of the tonal range out
// of the effect.
fn apply_local_contrast(
    color: vec3<f32>,
    blur: vec3<f32>,
    amount: f32,
    mode: u32,
    is_raw: bool,
) -> vec3<f32> {
    if (amount == 0.0) {
        return color;
    }
    let l = max(luma(color), EPS);
    let lb = max(luma(blur), EPS);
    let t_s = select(0.03, 0.1, is_raw);
    let protect = smoothstep(0.0, t_s, l) * (1.0 - smoothstep(0.9, 1.0, l));

    if (amount > 0.0) {
        let detail = log2(l / lb);
        var eff = amount;
        if (mode == LC_SHARPNESS) {
            // Strong edges get less gain to hold haloing down.
            eff = eff / (1.0 + 4.0 * abs(detail));
        }
        let boosted = color * exp2(detail * eff);
        return mix(color, boosted, protect);
    }

    // Softening: pull toward the blur's luma while keeping chroma.
    var strength = -amount;
    if (mode == LC_SHARPNESS) {
        strength = strength * 0.5;
    }
    let softened = color * (lb / l);
    return mix(color, softened, strength * protect);
}

// Clarity against the clarity blur, signed by frame position: positive
// amounts punch the middle of the frame and flatten the edges.
fn apply_centre_contrast(
    color: vec3<f32>,
    clarity_blur: vec3<f32>,
    amount: f32,
    abs_pos: vec2<f32>,
    full_size: vec2<f32>,
    is_raw: bool,
) -> vec3<f32> {
    if (amount == 0.0) {
        return color;
    }
    let w = centre_weight(abs_pos, full_size);
    let signed_val = amount * (2.0 * w - 1.0);
    return apply_local_contrast(color, clarity_blur, signed_val, LC_CLARITY, is_raw);
}

// Tonal/color companion to the centre contrast, applied inside the global
// stack: a small exposure push and chroma lift under the same radial mask.
fn apply_centre_tone(
    color: vec3<f32>,
    amount: f32,
    abs_pos: vec2<f32>,
    full_size: vec2<f32>,
) -> vec3<f32> {
    if (amount == 0.0) {
        return color;
    }
    let w = centre_weight(abs_pos, full_size);
    let signed_val = amount * (2.0 * w - 1.0);
    var c = color * exp2(signed_val * 0.3);
    c = mix(vec3<f32>(luma(c)), c, 1.0 + signed_val * 0.1);
    return c;
}

// 3x3 bilateral on the linearized input neighborhood. Amounts at or below
// 100 leave the gate closed; the excess above it widens the acceptance
// threshold, which itself shrinks as preview scale grows.
fn apply_noise_reduction(
    color: vec3<f32>,
    coords: vec2<i32>,
    tile_dims: vec2<i32>,
    luma_amount: f32,
    color_amount: f32,
    scale: f32,
    is_raw: bool,
) -> vec3<f32> {
    let luma_on = luma_amount > 100.0;
    let color_on = color_amount > 100.0;
    if (!luma_on && !color_on) {
        return color;
    }

    var center = textureLoad(input_texture, coords, 0).rgb;
    if (!is_raw) {
        center = srgb_to_linear(center);
    }
    let center_l = max(luma(center), EPS);

    let t_l = max((luma_amount - 100.0) / 100.0, 0.0) * 0.1 / scale;
    let t_c = max((color_amount - 100.0) / 100.0, 0.0) * 0.1 / scale;

    var sum_l = 0.0;
    var w_l = 0.0;
    var sum_c = vec3<f32>(0.0);
    var w_c = 0.0;
    for (var dy = -1; dy <= 1; dy = dy + 1) {
        for (var dx = -1; dx <= 1; dx = dx + 1) {
            let p = clamp(coords + vec2<i32>(dx, dy), vec2<i32>(0), tile_dims - vec2<i32>(1));
            var n = textureLoad(input_texture, p, 0).rgb;
            if (!is_raw) {
                n = srgb_to_linear(n);
            }
            let nl = luma(n);
            let dl = abs(nl - center_l);
            let wl = 1.0 - smoothstep(0.0, max(t_l, EPS), dl);
            sum_l = sum_l + nl * wl;
            w_l = w_l + wl;

            let chroma_diff = length(n / max(nl, EPS) - center / center_l);
            let wc = 1.0 - smoothstep(0.0, max(t_c, EPS), chroma_diff);
            sum_c = sum_c + n * wc;
            w_c = w_c + wc;
        }
    }

    var result = color;
    if (luma_on) {
        let smoothed_l = sum_l / max(w_l, EPS);
        result = result * (smoothed_l / center_l);
    }
    if (color_on) {
        let avg = sum_c / max(w_c, EPS);
        let dir = avg / max(luma(avg), EPS);
        let new_l = max(luma(result), EPS);
        result = mix(result, dir * new_l, 0.8);
    }
    return result;
}
"#;

/// Glow, halation, and flare: linear-space additive creative effects.
pub const CREATIVE: &str = r#"
// Mirrors the exposure / whites / filmic-brightness / contrast steps the
// global stack applies later, so the bloom threshold sees the tonality the
// viewer will.
fn provisional_tone(
    color: vec3<f32>,
    exposure: f32,
    brightness: f32,
    whites: f32,
    contrast: f32,
) -> vec3<f32> {
    var c = color * exp2(exposure + whites);
    c = apply_filmic_brightness(c, brightness);
    c = apply_contrast(c, contrast);
    return c;
}

fn bloom_excess(source_luma: f32, amount: f32) -> f32 {
    // The cutoff drops as the amount rises, admitting more of the frame.
    let cutoff = 0.5 / (0.25 + amount);
    return max(source_luma - cutoff, 0.0);
}

fn apply_glow(
    color: vec3<f32>,
    structure_blur: vec3<f32>,
    amount: f32,
    exposure: f32,
    brightness: f32,
    whites: f32,
    contrast: f32,
) -> vec3<f32> {
    if (amount <= 0.0) {
        return color;
    }
    let b = provisional_tone(structure_blur, exposure, brightness, whites, contrast);
    let pl = luma(linear_to_srgb(max(b, vec3<f32>(0.0))));
    let excess = bloom_excess(pl, amount);
    if (excess <= 0.0) {
        return color;
    }
    let gate = smoothstep(0.05, 0.15, pl);
    let protect = 1.0 - smoothstep(0.8, 2.0, luma(color));
    let warm = vec3<f32>(1.0, 0.82, 0.6);
    return color + warm * excess * amount * 0.6 * gate * protect;
}

fn apply_halation(
    color: vec3<f32>,
    clarity_blur: vec3<f32>,
    amount: f32,
    exposure: f32,
    brightness: f32,
    whites: f32,
    contrast: f32,
) -> vec3<f32> {
    if (amount <= 0.0) {
        return color;
    }
    let b = provisional_tone(clarity_blur, exposure, brightness, whites, contrast);
    let pl = luma(linear_to_srgb(max(b, vec3<f32>(0.0))));
    let excess = bloom_excess(pl, amount);
    if (excess <= 0.0) {
        return color;
    }
    let gate = smoothstep(0.05, 0.15, pl);
    // Saturated red core shifting to an orange fringe as intensity rises.
    let t = clamp(excess, 0.0, 1.0);
    let tint = mix(vec3<f32>(1.0, 0.05, 0.02), vec3<f32>(1.0, 0.35, 0.1), t);
    let w = clamp(excess * amount, 0.0, 1.0);
    var c = mix(color, vec3<f32>(luma(color)), 0.2 * w);
    c = c * (1.0 - 0.15 * w);
    return c + tint * excess * amount * 0.5 * gate;
}

fn apply_flare(color: vec3<f32>, uv: vec2<f32>, amount: f32) -> vec3<f32> {
    if (amount <= 0.0) {
        return color;
    }
    let f = textureSampleLevel(flare_texture, flare_sampler, uv, 0.0).rgb;
    let protect = 1.0 - smoothstep(0.8, 1.1, luma(color));
    return color + f * f * 2.0 * amount * protect;
}
"#;

/// The tonal and color operator set shared by the global and mask stacks.
pub const OPERATORS: &str = r#"
fn apply_white_balance(color: vec3<f32>, temperature: f32, tint: f32) -> vec3<f32> {
    var c = color;
    if (temperature != 0.0) {
        c = c * vec3<f32>(1.0 + 0.2 * temperature, 1.0 + 0.05 * temperature, 1.0 - 0.2 * temperature);
    }
    if (tint != 0.0) {
        c = c * vec3<f32>(1.0 + 0.25 * tint, 1.0 - 0.25 * tint, 1.0 + 0.25 * tint);
    }
    return c;
}

// Rational mid-tone emphasis; chroma rides along through a softened scale.
fn apply_filmic_brightness(color: vec3<f32>, brightness: f32) -> vec3<f32> {
    if (brightness == 0.0) {
        return color;
    }
    let l = max(luma(color), EPS);
    let lc = min(l, 1.0);
    let shaped = l / max(1.0 - brightness * (1.0 - lc), 0.1);
    let target_val = 0.95 * shaped + 0.05 * l * (1.0 + brightness);
    let ratio = pow(max(target_val, EPS) / l, 0.8);
    return color * ratio;
}

// Mid-gray after the 1/2.2 warp; the S-curve is anchored here so linear
// 0.5 is a fixed point of the contrast operator.
const CONTRAST_PIVOT: f32 = 0.72974005;

fn contrast_s_curve(x: f32, strength: f32) -> f32 {
    if (x < CONTRAST_PIVOT) {
        return CONTRAST_PIVOT * pow(max(x, 1e-6) / CONTRAST_PIVOT, strength);
    }
    return 1.0 - (1.0 - CONTRAST_PIVOT) * pow(max(1.0 - x, 1e-6) / (1.0 - CONTRAST_PIVOT), strength);
}

// Gamma-warped S-curve on luma. The warp pivots the curve on mid-gray as
// seen on screen; above 1.0 the curve hands back the raw value so
// superwhites survive for the tone-mapper.
fn apply_contrast(color: vec3<f32>, contrast: f32) -> vec3<f32> {
    if (contrast == 0.0) {
        return color;
    }
    let strength = exp2(1.25 * contrast);
    let l = max(luma(color), EPS);
    let warped_gamma = contrast_s_curve(pow(clamp(l, 0.0, 1.0), 1.0 / 2.2), strength);
    let warped = pow(warped_gamma, 2.2);
    let fade = smoothstep(1.0, 1.2, l);
    let new_l = mix(warped, l, fade);
    return color * (max(new_l, 0.0) / l);
}

fn soft_limit_lift(l: f32, amount: f32, gate: f32) -> f32 {
    if (l >= gate) {
        return 1.0;
    }
    let r = 1.0 - l / gate;
    return clamp(1.0 + amount * r * r, 0.2, 5.0);
}

// Contrast, shadows, whites, blacks. The blur surrogate supplies a spatial
// variant of the shadow/black multipliers; an edge detector on the
// Lab-like luma distance picks the point-wise one near edges so the lift
// does not halo.
fn apply_tonal_adjustments(
    color: vec3<f32>,
    blur_luma: f32,
    contrast: f32,
    shadows: f32,
    whites: f32,
    blacks: f32,
) -> vec3<f32> {
    var c = color;
    var lb = max(blur_luma, EPS);

    if (whites != 0.0) {
        let m = exp2(whites);
        c = c * m;
        lb = lb * m;
    }

    let l = max(luma(c), EPS);
    let edge = smoothstep(0.04, 0.12, abs(pow(l, 1.0 / 3.0) - pow(lb, 1.0 / 3.0)));

    if (shadows != 0.0) {
        let point = soft_limit_lift(l, shadows, 0.1);
        let spatial = soft_limit_lift(lb, shadows, 0.1);
        c = c * mix(spatial, point, edge);
    }
    if (blacks != 0.0) {
        let l2 = max(luma(c), EPS);
        let point = soft_limit_lift(l2, blacks, 0.05);
        let spatial = soft_limit_lift(lb, blacks, 0.05);
        c = c * mix(spatial, point, edge);
    }

    c = apply_contrast(c, contrast);
    return c;
}

// Highlight recovery (negative) or boost (positive), masked by a tanh
// shoulder on the blur luma so the transition into highlights stays wide.
fn apply_highlights(color: vec3<f32>, blur_luma: f32, amount: f32) -> vec3<f32> {
    if (amount == 0.0) {
        return color;
    }
    let mask = smoothstep(0.4, 0.9, tanh(1.5 * max(blur_luma, 0.0)));
    if (mask <= 0.0) {
        return color;
    }
    let l = max(luma(color), EPS);
    var adjusted: vec3<f32>;
    if (amount < 0.0) {
        let g = 1.0 - 1.75 * amount;
        var new_l = pow(min(l, 1.0), g);
        if (l > 1.0) {
            let k = -1.75 * amount;
            new_l = 1.0 + (l - 1.0) / (1.0 + k * (l - 1.0));
        }
        adjusted = color * (new_l / l);
        // Above 1.0 pull toward neutral so recovered highlights do not skew.
        let dw = clamp(l - 1.0, 0.0, 1.0) * (-amount) * 0.5;
        adjusted = mix(adjusted, vec3<f32>(new_l), dw);
    } else {
        adjusted = color * exp2(1.75 * amount);
    }
    return mix(color, adjusted, mask);
}

fn apply_creative_color(color: vec3<f32>, saturation: f32, vibrance: f32) -> vec3<f32> {
    var c = color;
    if (saturation != 0.0) {
        c = mix(vec3<f32>(luma(c)), c, 1.0 + saturation);
    }
    if (vibrance != 0.0) {
        let mx = max(c.r, max(c.g, c.b));
        let mn = min(c.r, min(c.g, c.b));
        let current_sat = (mx - mn) / max(mx, EPS);
        if (vibrance > 0.0) {
            let headroom = 1.0 - smoothstep(0.4, 0.9, current_sat);
            let h = rgb_to_hsv(c).x * 360.0;
            let skin = 1.0 - 0.4 * exp(-pow((h - 25.0) / 20.0, 2.0));
            c = mix(vec3<f32>(luma(c)), c, 1.0 + vibrance * headroom * skin);
        } else {
            let low_sat = 1.0 - current_sat;
            c = mix(vec3<f32>(luma(c)), c, 1.0 + vibrance * low_sat);
        }
    }
    return c;
}

fn apply_hsl_panel(color: vec3<f32>, shifts: array<vec4<f32>, 8>) -> vec3<f32> {
    var bands = shifts;
    var total = 0.0;
    for (var i = 0u; i < 8u; i = i + 1u) {
        total = total + abs(bands[i].x) + abs(bands[i].y) + abs(bands[i].z);
    }
    if (total == 0.0) {
        return color;
    }

    var centers = array<f32, 8>(358.0, 25.0, 60.0, 115.0, 180.0, 225.0, 280.0, 330.0);
    var widths = array<f32, 8>(35.0, 45.0, 40.0, 90.0, 60.0, 60.0, 55.0, 50.0);

    var hsv = rgb_to_hsv(color);
    let h_deg = hsv.x * 360.0;
    let sat_mask = smoothstep(0.05, 0.25, hsv.y);
    let lum_weight = smoothstep(0.02, 0.2, hsv.y);

    var influences: array<f32, 8>;
    var inf_sum = 0.0;
    for (var i = 0u; i < 8u; i = i + 1u) {
        var d = abs(h_deg - centers[i]);
        d = min(d, 360.0 - d);
        let t = d / widths[i];
        influences[i] = exp(-t * t * 2.0);
        inf_sum = inf_sum + influences[i];
    }

    var hue_shift = 0.0;
    var sat_scale = 0.0;
    var lum_scale = 0.0;
    for (var i = 0u; i < 8u; i = i + 1u) {
        let inf = influences[i] / max(inf_sum, EPS);
        hue_shift = hue_shift + bands[i].x * inf * 30.0;
        sat_scale = sat_scale + bands[i].y * inf;
        lum_scale = lum_scale + bands[i].z * inf;
    }

    hsv.x = fract(hsv.x + hue_shift * sat_mask / 360.0 + 1.0);
    hsv.y = clamp(hsv.y * (1.0 + sat_scale * sat_mask), 0.0, 1.0);
    var c = hsv_to_rgb(hsv);

    let l = max(luma(c), EPS);
    let target_val = l * (1.0 + lum_scale * lum_weight * 0.5);
    c = c * (max(target_val, 0.0) / l);
    return c;
}

fn grading_zone_offsets(color: vec3<f32>, zone: vec4<f32>, mask: f32, color_w: f32, lum_w: f32) -> vec3<f32> {
    var c = color;
    if (zone.y != 0.0) {
        let tint = hsv_to_rgb(vec3<f32>(zone.x / 360.0, 1.0, 1.0)) - vec3<f32>(0.5);
        c = c + tint * zone.y * mask * color_w;
    }
    if (zone.z != 0.0) {
        c = c + vec3<f32>(zone.z * mask * lum_w);
    }
    return c;
}

// Three-way grading. Zone masks come from luma smoothsteps whose crossovers
// shift with balance and whose feather widens with blending.
fn apply_color_grading(
    color: vec3<f32>,
    shadows: vec4<f32>,
    midtones: vec4<f32>,
    highlights: vec4<f32>,
    blending: f32,
    balance: f32,
) -> vec3<f32> {
    let active_val = abs(shadows.y) + abs(shadows.z)
        + abs(midtones.y) + abs(midtones.z)
        + abs(highlights.y) + abs(highlights.z);
    if (active_val == 0.0) {
        return color;
    }

    let l = clamp(luma(color), 0.0, 1.0);
    let f = max(0.2 * blending, 1e-3);
    let lo = 0.33 + 0.2 * balance;
    let hi = 0.66 + 0.2 * balance;

    let shadow_mask = 1.0 - smoothstep(lo - f, lo + f, l);
    let highlight_mask = smoothstep(hi - f, hi + f, l);
    let mid_mask = clamp(1.0 - shadow_mask - highlight_mask, 0.0, 1.0);

    var c = color;
    c = grading_zone_offsets(c, shadows, shadow_mask, 0.3, 0.5);
    c = grading_zone_offsets(c, midtones, mid_mask, 0.6, 0.8);
    c = grading_zone_offsets(c, highlights, highlight_mask, 0.8, 1.0);
    return c;
}

// Primary rotation plus per-primary saturation, then a shadows-only tint
// along the temperature axis.
fn apply_calibration(
    color: vec3<f32>,
    shadow_tint: f32,
    red_hue: f32,
    red_sat: f32,
    green_hue: f32,
    green_sat: f32,
    blue_hue: f32,
    blue_sat: f32,
) -> vec3<f32> {
    var c = color;

    if (red_hue != 0.0 || green_hue != 0.0 || blue_hue != 0.0) {
        let ar = red_hue * 0.25;
        let ag = green_hue * 0.25;
        let ab = blue_hue * 0.25;
        // Each primary leans toward its hue-wheel neighbors; columns keep
        // unit sum so the achromatic axis is untouched.
        let col_r = vec3<f32>(1.0 - abs(ar), max(ar, 0.0), max(-ar, 0.0));
        let col_g = vec3<f32>(max(-ag, 0.0), 1.0 - abs(ag), max(ag, 0.0));
        let col_b = vec3<f32>(max(ab, 0.0), max(-ab, 0.0), 1.0 - abs(ab));
        c = mat3x3<f32>(col_r, col_g, col_b) * c;
    }

    if (red_sat != 0.0 || green_sat != 0.0 || blue_sat != 0.0) {
        let sum = max(c.r + c.g + c.b, EPS);
        let frac = c / sum;
        let delta = red_sat * frac.r + green_sat * frac.g + blue_sat * frac.b;
        c = mix(vec3<f32>(luma(c)), c, 1.0 + delta);
    }

    if (shadow_tint != 0.0) {
        let shadow_w = 1.0 - smoothstep(0.0, 0.3, luma(c));
        let a = shadow_tint * shadow_w * 0.5;
        c = c * vec3<f32>(1.0 + 0.2 * a, 1.0 + 0.05 * a, 1.0 - 0.2 * a);
    }
    return c;
}

const ATMOSPHERE: vec3<f32> = vec3<f32>(0.95, 0.97, 1.0);

// Dark-channel dehaze with a small contrast/vibrance pop; negative amounts
// blend toward the atmospheric light instead.
fn apply_dehaze(color: vec3<f32>, amount: f32) -> vec3<f32> {
    if (amount == 0.0) {
        return color;
    }
    if (amount > 0.0) {
        let dark = min(color.r, min(color.g, color.b));
        let t = clamp(1.0 - amount * (1.0 - clamp(dark, 0.0, 1.0)), 0.1, 1.0);
        var c = (color - ATMOSPHERE) / t + ATMOSPHERE;
        c = mix(c, (c - vec3<f32>(0.5)) * 1.1 + vec3<f32>(0.5), amount * 0.3);
        c = mix(vec3<f32>(luma(c)), c, 1.0 + amount * 0.15);
        return c;
    }
    return mix(color, ATMOSPHERE, -amount * 0.5);
}
"#;

/// Tone-mapping, LUT, and the output-stage effects.
pub const OUTPUT: &str = r#"
const AGX_MIN_EV: f32 = -12.47393;
const AGX_MAX_EV: f32 = 4.026069;
const AGX_PIVOT_X: f32 = 0.6060606;
const AGX_PIVOT_Y: f32 = 0.48943964;
const AGX_SLOPE: f32 = 2.4;
const AGX_TOE_POWER: f32 = 3.0;
const AGX_SHOULDER_POWER: f32 = 3.25;

// Toe/linear/shoulder sigmoid in log-encoded space: linear slope at the
// mid-gray pivot, power-law rolloff toward 0 and 1 on either side.
fn agx_sigmoid(x: f32) -> f32 {
    let dx = x - AGX_PIVOT_X;
    let lim = select(1.0 - AGX_PIVOT_Y, AGX_PIVOT_Y, dx < 0.0);
    let p = select(AGX_SHOULDER_POWER, AGX_TOE_POWER, dx < 0.0);
    let num = AGX_SLOPE * dx;
    return AGX_PIVOT_Y + num / pow(1.0 + pow(abs(num) / lim, p), 1.0 / p);
}

fn agx_tonemap(color: vec3<f32>) -> vec3<f32> {
    // Gamut-compress into the positive octant before the forward matrix.
    var v = max(color, vec3<f32>(0.0));
    v = params.global.agx_mat * v;
    v = clamp(
        (log2(max(v, vec3<f32>(1e-10))) - vec3<f32>(AGX_MIN_EV)) / (AGX_MAX_EV - AGX_MIN_EV),
        vec3<f32>(0.0),
        vec3<f32>(1.0),
    );
    v = vec3<f32>(agx_sigmoid(v.x), agx_sigmoid(v.y), agx_sigmoid(v.z));
    v = pow(v, vec3<f32>(2.4));
    v = params.global.agx_mat_inv * v;
    return linear_to_srgb(max(v, vec3<f32>(0.0)));
}

fn lut_fetch(p: vec3<i32>) -> vec3<f32> {
    return textureLoad(lut_texture, p, 0).rgb;
}

// Tetrahedral 3D LUT lookup on the encoded color.
fn sample_lut(color: vec3<f32>) -> vec3<f32> {
    let size = i32(textureDimensions(lut_texture).x);
    let n = f32(size - 1);
    let pos = clamp(color, vec3<f32>(0.0), vec3<f32>(1.0)) * n;
    let base = min(vec3<i32>(pos), vec3<i32>(size - 2));
    let f = pos - vec3<f32>(base);

    let c000 = lut_fetch(base);
    let c111 = lut_fetch(base + vec3<i32>(1, 1, 1));

    var w0: f32;
    var w1: f32;
    var w2: f32;
    var v1: vec3<f32>;
    var v2: vec3<f32>;
    if (f.r >= f.g) {
        if (f.g >= f.b) {
            w0 = 1.0 - f.r;
            v1 = lut_fetch(base + vec3<i32>(1, 0, 0));
            w1 = f.r - f.g;
            v2 = lut_fetch(base + vec3<i32>(1, 1, 0));
            w2 = f.g - f.b;
        } else if (f.r >= f.b) {
            w0 = 1.0 - f.r;
            v1 = lut_fetch(base + vec3<i32>(1, 0, 0));
            w1 = f.r - f.b;
            v2 = lut_fetch(base + vec3<i32>(1, 0, 1));
            w2 = f.b - f.g;
        } else {
            w0 = 1.0 - f.b;
            v1 = lut_fetch(base + vec3<i32>(0, 0, 1));
            w1 = f.b - f.r;
            v2 = lut_fetch(base + vec3<i32>(1, 0, 1));
            w2 = f.r - f.g;
        }
    } else if (f.b >= f.g) {
        w0 = 1.0 - f.b;
        v1 = lut_fetch(base + vec3<i32>(0, 0, 1));
        w1 = f.b - f.g;
        v2 = lut_fetch(base + vec3<i32>(0, 1, 1));
        w2 = f.g - f.r;
    } else if (f.b >= f.r) {
        w0 = 1.0 - f.g;
        v1 = lut_fetch(base + vec3<i32>(0, 1, 0));
        w1 = f.g - f.b;
        v2 = lut_fetch(base + vec3<i32>(0, 1, 1));
        w2 = f.b - f.r;
    } else {
        w0 = 1.0 - f.g;
        v1 = lut_fetch(base + vec3<i32>(0, 1, 0));
        w1 = f.g - f.r;
        v2 = lut_fetch(base + vec3<i32>(1, 1, 0));
        w2 = f.r - f.b;
    }
    let w3 = 1.0 - w0 - w1 - w2;
    return w0 * c000 + w1 * v1 + w2 * v2 + w3 * c111;
}

// Two-octave gradient noise added as luminance, masked into the midtones.
fn apply_grain(
    color: vec3<f32>,
    abs_pos: vec2<f32>,
    scale: f32,
    amount: f32,
    size: f32,
    roughness: f32,
) -> vec3<f32> {
    if (amount <= 0.0) {
        return color;
    }
    let freq = 0.5 / max(size * scale, 1e-3);
    let p = abs_pos * freq;
    let fine = gradient_noise(p);
    let coarse = gradient_noise(p * 2.7 + vec2<f32>(13.7, 91.3));
    let g = mix(fine, coarse, roughness);

    let l = luma(color);
    let mid = smoothstep(0.03, 0.2, l) * (1.0 - smoothstep(0.85, 0.98, l));
    return color + vec3<f32>(g * amount * 0.5 * mid);
}

// Aspect-corrected superellipse falloff. Negative amounts multiply toward
// black, positive amounts mix toward white.
fn apply_vignette(color: vec3<f32>, abs_pos: vec2<f32>, full_size: vec2<f32>) -> vec3<f32> {
    let amount = params.global.vignette_amount;
    if (amount == 0.0) {
        return color;
    }
    let half_size = max(full_size * 0.5, vec2<f32>(1.0));
    let nd = max(abs(abs_pos - half_size) / half_size, vec2<f32>(1e-6));
    let e = mix(4.0, 2.0, params.global.vignette_roundness);
    let d = pow(pow(nd.x, e) + pow(nd.y, e), 1.0 / e);
    let f = max(params.global.vignette_feather, 1e-3);
    let v = smoothstep(params.global.vignette_midpoint - f, params.global.vignette_midpoint + f, d);
    if (amount < 0.0) {
        return color * (1.0 + amount * v);
    }
    return mix(color, vec3<f32>(1.0), amount * v);
}

// Single-bit triangular dither to break rgba8 banding.
fn dither_offset(pixel: vec2<u32>) -> f32 {
    return (hash_coords(pixel, 0x9E3779B9u) - hash_coords(pixel, 0x85EBCA6Bu)) / 255.0;
}
"#;

/// Chromatic aberration resample and the composed adjustment stacks.
pub const STACKS: &str = r#"
fn clamp_coords(p: vec2<i32>, dims: vec2<i32>) -> vec2<i32> {
    return clamp(p, vec2<i32>(0), dims - vec2<i32>(1));
}

// Radial per-channel resample. Red and blue displace along the ray from
// the image center, scaled by normalized radius and the CA parameters.
fn sample_input_with_ca(
    coords: vec2<i32>,
    tile_dims: vec2<i32>,
    abs_pos: vec2<f32>,
    full_size: vec2<f32>,
) -> vec4<f32> {
    let base = textureLoad(input_texture, coords, 0);
    let ca_r = params.global.ca_red_cyan;
    let ca_b = params.global.ca_blue_yellow;
    if (ca_r == 0.0 && ca_b == 0.0) {
        return base;
    }
    let center = full_size * 0.5;
    let delta = abs_pos - center;
    let r_norm = length(delta) / max(length(center), 1.0);

    let shift_r = delta * ca_r * r_norm * 0.01;
    let shift_b = delta * ca_b * r_norm * 0.01;
    let red_pos = clamp_coords(vec2<i32>(round(vec2<f32>(coords) - shift_r)), tile_dims);
    let blue_pos = clamp_coords(vec2<i32>(round(vec2<f32>(coords) - shift_b)), tile_dims);
    let red = textureLoad(input_texture, red_pos, 0).r;
    let blue = textureLoad(input_texture, blue_pos, 0).b;
    return vec4<f32>(red, base.g, blue, base.a);
}

// JPEG-like contrast for raw files when filmic is off: encode, a slight
// gamma lift, 75% of a smoothstep S, and back to linear.
fn raw_srgb_emulation(color: vec3<f32>) -> vec3<f32> {
    var s = linear_to_srgb(max(color, vec3<f32>(0.0)));
    s = pow(max(s, vec3<f32>(1e-6)), vec3<f32>(1.0 / 1.1));
    let soft = s * s * (vec3<f32>(3.0) - 2.0 * s);
    s = mix(s, soft, 0.75);
    return srgb_to_linear(clamp(s, vec3<f32>(0.0), vec3<f32>(1.0)));
}

// The global adjustment stack, in pipeline order.
fn apply_all_adjustments(
    color: vec3<f32>,
    tonal_blur_luma: f32,
    coords: vec2<i32>,
    tile_dims: vec2<i32>,
    abs_pos: vec2<f32>,
    full_size: vec2<f32>,
    scale: f32,
) -> vec3<f32> {
    let g = params.global;
    let is_raw = g.is_raw == 1u;
    var c = color;

    c = apply_noise_reduction(
        c, coords, tile_dims,
        g.noise_reduction_luma, g.noise_reduction_color, scale, is_raw,
    );
    c = apply_dehaze(c, g.dehaze);
    c = apply_centre_tone(c, g.centre, abs_pos, full_size);
    c = apply_white_balance(c, g.temperature, g.tint);
    c = apply_filmic_brightness(c, g.brightness);

    var blur_l = tonal_blur_luma * exp2(g.exposure);
    c = apply_tonal_adjustments(c, blur_l, g.contrast, g.shadows, g.whites, g.blacks);
    blur_l = blur_l * exp2(g.whites);
    c = apply_highlights(c, blur_l, g.highlights);

    c = apply_calibration(
        c, g.calib_shadow_tint,
        g.calib_red_hue, g.calib_red_sat,
        g.calib_green_hue, g.calib_green_sat,
        g.calib_blue_hue, g.calib_blue_sat,
    );
    c = apply_hsl_panel(c, g.hsl);
    c = apply_color_grading(
        c, g.grading_shadows, g.grading_midtones, g.grading_highlights,
        g.grading_blending, g.grading_balance,
    );
    c = apply_creative_color(c, g.saturation, g.vibrance);
    return c;
}

// The mask-local stack. Exposure is linear here because the global stack
// already ran; highlight work precedes the tonal block so recovered
// highlights still take the mask's contrast.
fn apply_all_mask_adjustments(
    color: vec3<f32>,
    mp: MaskParams,
    tonal_blur_luma: f32,
    coords: vec2<i32>,
    tile_dims: vec2<i32>,
    scale: f32,
) -> vec3<f32> {
    let g = params.global;
    let is_raw = g.is_raw == 1u;
    var c = color;

    c = apply_noise_reduction(
        c, coords, tile_dims,
        mp.noise_reduction_luma, mp.noise_reduction_color, scale, is_raw,
    );
    c = apply_dehaze(c, mp.dehaze);
    c = c * exp2(mp.exposure);
    c = apply_white_balance(c, mp.temperature, mp.tint);
    c = apply_filmic_brightness(c, mp.brightness);

    var blur_l = tonal_blur_luma * exp2(g.exposure + mp.exposure);
    c = apply_highlights(c, blur_l, mp.highlights);
    c = apply_tonal_adjustments(c, blur_l, mp.contrast, mp.shadows, mp.whites, mp.blacks);

    c = apply_hsl_panel(c, mp.hsl);
    c = apply_color_grading(
        c, mp.grading_shadows, mp.grading_midtones, mp.grading_highlights,
        mp.grading_blending, mp.grading_balance,
    );
    c = apply_creative_color(c, mp.saturation, mp.vibrance);
    return c;
}
"#;

/// Kernel entry point.
pub const MAIN: &str = r#"
@compute @workgroup_size(8, 8)
fn main(@builtin(global_invocation_id) gid: vec3<u32>) {
    let dims = textureDimensions(input_texture);
    if (gid.x >= dims.x || gid.y >= dims.y) {
        return;
    }
    let coords = vec2<i32>(gid.xy);
    let tile_dims = vec2<i32>(dims);
    let pixel = gid.xy + vec2<u32>(params.tile_offset_x, params.tile_offset_y);
    let abs_pos = vec2<f32>(pixel) + vec2<f32>(0.5);
    let full_size = vec2<f32>(f32(params.full_width), f32(params.full_height));
    let scale = max(max(full_size.x, full_size.y) / 1080.0, 1e-3);

    let g = params.global;
    let is_raw = g.is_raw == 1u;

    let source = sample_input_with_ca(coords, tile_dims, abs_pos, full_size);
    let alpha = source.a;
    var color = source.rgb;

    var blur_sharp = textureLoad(sharpness_blur, coords, 0).rgb;
    var blur_tonal = textureLoad(tonal_blur, coords, 0).rgb;
    var blur_clar = textureLoad(clarity_blur, coords, 0).rgb;
    var blur_struct = textureLoad(structure_blur, coords, 0).rgb;

    // Ingress: blur planes share the input's encoding.
    if (!is_raw) {
        color = srgb_to_linear(color);
        blur_sharp = srgb_to_linear(blur_sharp);
        blur_tonal = srgb_to_linear(blur_tonal);
        blur_clar = srgb_to_linear(blur_clar);
        blur_struct = srgb_to_linear(blur_struct);
    }

    color = apply_local_contrast(color, blur_sharp, g.sharpness, LC_SHARPNESS, is_raw);
    color = apply_local_contrast(color, blur_clar, g.clarity, LC_CLARITY, is_raw);
    color = apply_local_contrast(color, blur_struct, g.structure, LC_STRUCTURE, is_raw);
    color = apply_centre_contrast(color, blur_clar, g.centre, abs_pos, full_size, is_raw);

    color = color * exp2(g.exposure);

    if (is_raw && g.tonemapper_mode != 1u) {
        color = raw_srgb_emulation(color);
    }

    color = apply_glow(color, blur_struct, g.glow, g.exposure, g.brightness, g.whites, g.contrast);
    color = apply_halation(color, blur_clar, g.halation, g.exposure, g.brightness, g.whites, g.contrast);
    let flare_uv = abs_pos / max(full_size, vec2<f32>(1.0));
    color = apply_flare(color, flare_uv, g.flare);

    let tonal_blur_luma = luma(blur_tonal);
    color = apply_all_adjustments(color, tonal_blur_luma, coords, tile_dims, abs_pos, full_size, scale);

    // Masked local stacks, in slot order; later masks see earlier output.
    for (var m = 0u; m < min(params.mask_count, 8u); m = m + 1u) {
        let influence = textureLoad(mask_influences, coords, i32(m), 0).r;
        if (influence <= 0.001) {
            continue;
        }
        let mp = params.masks[m];
        var masked = color;
        masked = apply_local_contrast(masked, blur_sharp, mp.sharpness, LC_SHARPNESS, is_raw);
        masked = apply_local_contrast(masked, blur_clar, mp.clarity, LC_CLARITY, is_raw);
        masked = apply_local_contrast(masked, blur_struct, mp.structure, LC_STRUCTURE, is_raw);
        masked = apply_glow(
            masked, blur_struct, mp.glow,
            g.exposure + mp.exposure, g.brightness + mp.brightness,
            g.whites + mp.whites, g.contrast + mp.contrast,
        );
        masked = apply_halation(
            masked, blur_clar, mp.halation,
            g.exposure + mp.exposure, g.brightness + mp.brightness,
            g.whites + mp.whites, g.contrast + mp.contrast,
        );
        masked = apply_flare(masked, flare_uv, mp.flare);
        masked = apply_all_mask_adjustments(masked, mp, tonal_blur_luma, coords, tile_dims, scale);
        color = mix(color, masked, clamp(influence, 0.0, 1.0));
    }

    // Tone-map and encode.
    var encoded: vec3<f32>;
    if (g.tonemapper_mode == 1u) {
        encoded = agx_tonemap(color);
    } else {
        encoded = linear_to_srgb(max(color, vec3<f32>(0.0)));
    }

    // Curves run post tone-map, global first, then each mask's set blended
    // by its influence.
    encoded = apply_curve_set(
        encoded, g.luma_curve, g.red_curve, g.green_curve, g.blue_curve, g.curve_counts,
    );
    for (var m = 0u; m < min(params.mask_count, 8u); m = m + 1u) {
        let influence = textureLoad(mask_influences, coords, i32(m), 0).r;
        if (influence <= 0.001) {
            continue;
        }
        let mp = params.masks[m];
        let curved = apply_curve_set(
            encoded, mp.luma_curve, mp.red_curve, mp.green_curve, mp.blue_curve, mp.curve_counts,
        );
        encoded = mix(encoded, curved, clamp(influence, 0.0, 1.0));
    }

    if (g.has_lut == 1u && g.lut_intensity > 0.0) {
        encoded = mix(encoded, sample_lut(encoded), clamp(g.lut_intensity, 0.0, 1.0));
    }

    encoded = apply_grain(encoded, abs_pos, scale, g.grain_amount, g.grain_size, g.grain_roughness);
    encoded = apply_vignette(encoded, abs_pos, full_size);

    var out_rgb = encoded;
    var indicated = false;
    if (g.show_clipping == 1u) {
        let mx = max(out_rgb.r, max(out_rgb.g, out_rgb.b));
        let mn = min(out_rgb.r, min(out_rgb.g, out_rgb.b));
        if (mx > 0.998) {
            out_rgb = vec3<f32>(1.0, 0.0, 0.0);
            indicated = true;
        } else if (mn < 0.002) {
            out_rgb = vec3<f32>(0.0, 0.0, 1.0);
            indicated = true;
        }
    }
    // Indicator pixels stay exact; everything else gets the dither.
    if (!indicated) {
        out_rgb = out_rgb + vec3<f32>(dither_offset(pixel));
    }
    out_rgb = clamp(out_rgb, vec3<f32>(0.0), vec3<f32>(1.0));

    textureStore(output_texture, coords, vec4<f32>(out_rgb, clamp(alpha, 0.0, 1.0)));
}
"#;

/// Assembles the full kernel source.
pub fn kernel_source() -> String {
    let mut source = String::with_capacity(
        BINDINGS.len()
            + COLOR.len()
            + CURVES.len()
            + OPERATORS.len()
            + LOCAL.len()
            + CREATIVE.len()
            + OUTPUT.len()
            + STACKS.len()
            + MAIN.len(),
    );
    source.push_str(BINDINGS);
    source.push_str(COLOR);
    source.push_str(CURVES);
    source.push_str(OPERATORS);
    source.push_str(LOCAL);
    source.push_str(CREATIVE);
    source.push_str(OUTPUT);
    source.push_str(STACKS);
    source.push_str(MAIN);
    source
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_assembles() {
        let src = kernel_source();
        assert!(src.contains("@compute @workgroup_size(8, 8)"));
        assert!(src.contains("fn main"));
    }

    #[test]
    fn test_sections_balanced() {
        // Cheap brace sanity for every section.
        for (name, section) in [
            ("bindings", BINDINGS),
            ("color", COLOR),
            ("curves", CURVES),
            ("operators", OPERATORS),
            ("local", LOCAL),
            ("creative", CREATIVE),
            ("output", OUTPUT),
            ("stacks", STACKS),
            ("main", MAIN),
        ] {
            let open = section.matches('{').count();
            let close = section.matches('}').count();
            assert_eq!(open, close, "unbalanced braces in {name}");
        }
    }

    #[test]
    fn test_pipeline_order_in_main() {
        // The operator order is the contract; keep the entry point honest.
        let idx = |needle: &str| MAIN.find(needle).unwrap_or_else(|| panic!("missing {needle}"));
        let order = [
            idx("sample_input_with_ca"),
            idx("srgb_to_linear"),
            idx("apply_local_contrast"),
            idx("apply_centre_contrast"),
            idx("exp2(g.exposure)"),
            idx("raw_srgb_emulation"),
            idx("apply_glow"),
            idx("apply_all_adjustments"),
            idx("apply_all_mask_adjustments"),
            idx("agx_tonemap"),
            idx("apply_curve_set"),
            idx("sample_lut"),
            idx("apply_grain"),
            idx("apply_vignette"),
            idx("dither_offset"),
        ];
        for pair in order.windows(2) {
            assert!(pair[0] < pair[1], "pipeline stages out of order in MAIN");
        }
    }
}
