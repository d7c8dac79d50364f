//! Mask taxonomy.
//!
//! A mask couples a geometry kind with its own adjustment stack. Geometry
//! editing and rasterization live in the host application; the render core
//! receives each mask as a grayscale influence plane, so [`MaskKind`] here
//! is carried for bookkeeping (sidecars, UI) rather than for math.

use serde::{Deserialize, Serialize};

use crate::adjustments::MaskAdjustments;

/// The geometry family a mask's influence was rasterized from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaskKind {
    /// Elliptical gradient.
    #[default]
    Radial,
    /// Linear gradient.
    Linear,
    /// Hand-painted brush strokes.
    Brush,
    /// AI segmentation: the main subject.
    AiSubject,
    /// AI segmentation: foreground.
    AiForeground,
    /// AI segmentation: sky.
    AiSky,
    /// Luminance range selection.
    Luminance,
    /// Color range selection.
    Color,
    /// Subtractive eraser applied over other masks.
    QuickEraser,
}

/// One masked local adjustment stack.
///
/// Masks apply in list order; later masks composite over the output of
/// earlier ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaskLayer {
    /// Geometry family the influence plane came from.
    pub kind: MaskKind,
    /// Disabled masks are skipped at dispatch without renumbering slots.
    pub enabled: bool,
    /// The mask's local adjustments.
    pub adjustments: MaskAdjustments,
}

impl Default for MaskLayer {
    fn default() -> Self {
        Self {
            kind: MaskKind::default(),
            enabled: true,
            adjustments: MaskAdjustments::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&MaskKind::AiSubject).unwrap();
        assert_eq!(json, r#""ai_subject""#);
        let kind: MaskKind = serde_json::from_str(r#""quick_eraser""#).unwrap();
        assert_eq!(kind, MaskKind::QuickEraser);
    }

    #[test]
    fn test_default_layer() {
        let layer = MaskLayer::default();
        assert_eq!(layer.kind, MaskKind::Radial);
        assert!(layer.enabled);
    }
}
