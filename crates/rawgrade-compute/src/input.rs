//! Per-dispatch input descriptors.
//!
//! The renderer borrows every plane read-only for the duration of a call;
//! nothing here owns pixels. Dimension checks happen up front so a
//! mismatched plane is named before any GPU work starts.

use rawgrade_core::{Adjustments, Lut3D};

use crate::{RenderError, RenderResult};

/// A borrowed RGBA f32 plane.
#[derive(Debug, Clone, Copy)]
pub struct PixelPlane<'a> {
    /// Interleaved RGBA values, row-major.
    pub data: &'a [f32],
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl<'a> PixelPlane<'a> {
    /// Creates a plane, checking the buffer length.
    pub fn new(data: &'a [f32], width: u32, height: u32) -> RenderResult<Self> {
        let expected = (width as usize) * (height as usize) * 4;
        if data.len() != expected {
            return Err(RenderError::BufferSizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }
}

/// A borrowed single-channel f32 influence plane in `[0, 1]`.
#[derive(Debug, Clone, Copy)]
pub struct InfluencePlane<'a> {
    /// Influence values, row-major.
    pub data: &'a [f32],
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl<'a> InfluencePlane<'a> {
    /// Creates an influence plane, checking the buffer length.
    pub fn new(data: &'a [f32], width: u32, height: u32) -> RenderResult<Self> {
        let expected = (width as usize) * (height as usize);
        if data.len() != expected {
            return Err(RenderError::BufferSizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }
}

/// A borrowed RGBA8 flare plane, sampled at normalized frame UV.
#[derive(Debug, Clone, Copy)]
pub struct FlarePlane<'a> {
    /// Interleaved RGBA bytes, row-major.
    pub data: &'a [u8],
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl<'a> FlarePlane<'a> {
    /// Creates a flare plane, checking the buffer length.
    pub fn new(data: &'a [u8], width: u32, height: u32) -> RenderResult<Self> {
        let expected = (width as usize) * (height as usize) * 4;
        if data.len() != expected {
            return Err(RenderError::BufferSizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }
}

/// The four precomputed blur planes, smallest radius first.
///
/// How they were blurred is the host's business; the pipeline only
/// requires that they match the input's extent and color encoding.
#[derive(Debug, Clone, Copy)]
pub struct BlurSet<'a> {
    /// Small-radius blur, drives sharpness.
    pub sharpness: PixelPlane<'a>,
    /// Medium-radius blur, drives the tonal and highlight operators.
    pub tonal: PixelPlane<'a>,
    /// Large-radius blur, drives clarity, centre, and halation.
    pub clarity: PixelPlane<'a>,
    /// Largest-radius blur, drives structure and glow.
    pub structure: PixelPlane<'a>,
}

/// Everything the renderer needs for one frame besides the adjustments.
#[derive(Debug, Clone)]
pub struct FrameInput<'a> {
    /// The image, RGBA f32. Scene-linear when `is_raw`, sRGB-encoded
    /// otherwise.
    pub image: PixelPlane<'a>,
    /// Input color encoding.
    pub is_raw: bool,
    /// The four blur planes, same extent and encoding as the image.
    pub blurs: BlurSet<'a>,
    /// One influence plane per **enabled** mask, in mask order.
    pub masks: Vec<InfluencePlane<'a>>,
    /// Optional 3D LUT cube.
    pub lut: Option<&'a Lut3D>,
    /// Optional flare plane.
    pub flare: Option<FlarePlane<'a>>,
}

impl FrameInput<'_> {
    /// Checks plane extents and required resources against the
    /// adjustments. Called by the renderer before any binding.
    pub fn validate(&self, adjustments: &Adjustments) -> RenderResult<()> {
        let expected = (self.image.width, self.image.height);
        if expected.0 == 0 || expected.1 == 0 {
            return Err(RenderError::InvalidParams(
                rawgrade_core::Error::invalid_dimensions(expected.0, expected.1, "empty frame"),
            ));
        }

        for (name, plane) in [
            ("sharpness blur", &self.blurs.sharpness),
            ("tonal blur", &self.blurs.tonal),
            ("clarity blur", &self.blurs.clarity),
            ("structure blur", &self.blurs.structure),
        ] {
            if (plane.width, plane.height) != expected {
                return Err(RenderError::dimension_mismatch(
                    name,
                    expected,
                    (plane.width, plane.height),
                ));
            }
        }
        for (i, mask) in self.masks.iter().enumerate() {
            if (mask.width, mask.height) != expected {
                return Err(RenderError::dimension_mismatch(
                    format!("mask influence {i}"),
                    expected,
                    (mask.width, mask.height),
                ));
            }
        }

        let enabled = adjustments.enabled_mask_count();
        if self.masks.len() < enabled {
            return Err(RenderError::missing(format!(
                "mask influence planes: {} bound, {enabled} enabled masks",
                self.masks.len()
            )));
        }

        if adjustments.lut_intensity > 0.0 && self.lut.is_none() {
            return Err(RenderError::missing("3D LUT (lut_intensity > 0)"));
        }
        let wants_flare = adjustments.flare > 0.0
            || adjustments
                .masks
                .iter()
                .any(|m| m.enabled && m.adjustments.flare > 0.0);
        if wants_flare && self.flare.is_none() {
            return Err(RenderError::missing("flare plane (flare amount > 0)"));
        }

        Ok(())
    }
}

/// Copies a `channels`-interleaved rectangle out of a row-major plane.
pub(crate) fn slice_region(
    data: &[f32],
    plane_width: u32,
    x: u32,
    y: u32,
    w: u32,
    h: u32,
    channels: u32,
) -> Vec<f32> {
    let c = channels as usize;
    let stride = plane_width as usize * c;
    let mut out = Vec::with_capacity(w as usize * h as usize * c);
    for row in y..y + h {
        let start = row as usize * stride + x as usize * c;
        out.extend_from_slice(&data[start..start + w as usize * c]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rawgrade_core::MaskLayer;

    fn plane_data(w: u32, h: u32) -> Vec<f32> {
        vec![0.5; (w * h * 4) as usize]
    }

    fn frame_input<'a>(image: &'a [f32], blur: &'a [f32], w: u32, h: u32) -> FrameInput<'a> {
        let p = PixelPlane::new(blur, w, h).unwrap();
        FrameInput {
            image: PixelPlane::new(image, w, h).unwrap(),
            is_raw: false,
            blurs: BlurSet {
                sharpness: p,
                tonal: p,
                clarity: p,
                structure: p,
            },
            masks: Vec::new(),
            lut: None,
            flare: None,
        }
    }

    #[test]
    fn test_plane_length_checked() {
        let data = vec![0.0f32; 10];
        assert!(matches!(
            PixelPlane::new(&data, 2, 2),
            Err(RenderError::BufferSizeMismatch { expected: 16, actual: 10 })
        ));
    }

    #[test]
    fn test_validate_accepts_matching() {
        let image = plane_data(8, 8);
        let blur = plane_data(8, 8);
        let input = frame_input(&image, &blur, 8, 8);
        assert!(input.validate(&Adjustments::default()).is_ok());
    }

    #[test]
    fn test_validate_rejects_blur_mismatch() {
        let image = plane_data(8, 8);
        let blur = plane_data(4, 8);
        let mut input = frame_input(&image, &image, 8, 8);
        input.blurs.tonal = PixelPlane::new(&blur, 4, 8).unwrap();
        let err = input.validate(&Adjustments::default()).unwrap_err();
        assert!(err.to_string().contains("tonal blur"));
    }

    #[test]
    fn test_validate_requires_mask_planes() {
        let image = plane_data(8, 8);
        let input = frame_input(&image, &image, 8, 8);
        let mut adjustments = Adjustments::default();
        adjustments.masks.push(MaskLayer::default());
        assert!(matches!(
            input.validate(&adjustments),
            Err(RenderError::MissingResource { .. })
        ));
    }

    #[test]
    fn test_validate_requires_flare_plane() {
        let image = plane_data(8, 8);
        let input = frame_input(&image, &image, 8, 8);
        let mut adjustments = Adjustments::default();
        adjustments.flare = 0.5;
        assert!(matches!(
            input.validate(&adjustments),
            Err(RenderError::MissingResource { .. })
        ));
    }

    #[test]
    fn test_validate_requires_lut() {
        let image = plane_data(8, 8);
        let input = frame_input(&image, &image, 8, 8);
        let mut adjustments = Adjustments::default();
        adjustments.lut_intensity = 1.0;
        assert!(matches!(
            input.validate(&adjustments),
            Err(RenderError::MissingResource { .. })
        ));
    }

    #[test]
    fn test_slice_region() {
        // 4x2 single-channel plane, values = index.
        let data: Vec<f32> = (0..8).map(|v| v as f32).collect();
        let out = slice_region(&data, 4, 1, 0, 2, 2, 1);
        assert_eq!(out, vec![1.0, 2.0, 5.0, 6.0]);
    }
}
