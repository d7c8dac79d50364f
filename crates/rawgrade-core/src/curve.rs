//! Tone curves.
//!
//! A tone curve maps `[0, 255]` to `[0, 255]` through 2..=16 control
//! points, interpolated with a monotone cubic (Fritsch-Carlson tangents
//! with the Hyman correction), so a monotone point set always produces a
//! monotone curve with no overshoot between points.
//!
//! The GPU kernel evaluates the same construction; the CPU evaluator here
//! is the reference for tests and for hosts that need curve previews.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Maximum number of control points per curve.
pub const MAX_CURVE_POINTS: usize = 16;

/// A single control point on a tone curve, in `[0, 255]` on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    /// Input value.
    pub x: f32,
    /// Output value.
    pub y: f32,
}

impl CurvePoint {
    /// Creates a control point.
    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A tone curve over `[0, 255]`.
///
/// # Contract
///
/// - 2..=16 control points
/// - x strictly ascending
/// - first point at x = 0, last at x = 255
///
/// A curve with exactly the two points `(0,0)` and `(255,255)` is the
/// identity.
///
/// # Example
///
/// ```rust
/// use rawgrade_core::ToneCurve;
///
/// let curve = ToneCurve::identity();
/// assert!(curve.is_identity());
/// assert_eq!(curve.evaluate(128.0), 128.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToneCurve {
    /// Control points, sorted by x.
    pub points: Vec<CurvePoint>,
}

impl ToneCurve {
    /// Creates the identity curve `(0,0) - (255,255)`.
    pub fn identity() -> Self {
        Self {
            points: vec![CurvePoint::new(0.0, 0.0), CurvePoint::new(255.0, 255.0)],
        }
    }

    /// Creates a curve from control points, validating the contract.
    pub fn from_points(points: Vec<CurvePoint>) -> Result<Self> {
        let curve = Self { points };
        curve.validate("curve")?;
        Ok(curve)
    }

    /// Returns true if this is the exact identity curve.
    pub fn is_identity(&self) -> bool {
        self.points.len() == 2
            && self.points[0] == CurvePoint::new(0.0, 0.0)
            && self.points[1] == CurvePoint::new(255.0, 255.0)
    }

    /// Checks the curve contract, naming `label` in any error.
    pub fn validate(&self, label: &str) -> Result<()> {
        let n = self.points.len();
        if !(2..=MAX_CURVE_POINTS).contains(&n) {
            return Err(Error::invalid_curve(
                label,
                format!("point count {n} outside 2..=16"),
            ));
        }
        for pair in self.points.windows(2) {
            if pair[1].x <= pair[0].x {
                return Err(Error::invalid_curve(
                    label,
                    format!("x not strictly ascending at {} -> {}", pair[0].x, pair[1].x),
                ));
            }
        }
        if self.points[0].x != 0.0 {
            return Err(Error::invalid_curve(label, "first point must be at x = 0"));
        }
        if self.points[n - 1].x != 255.0 {
            return Err(Error::invalid_curve(label, "last point must be at x = 255"));
        }
        Ok(())
    }

    /// Computes interval tangents: Fritsch-Carlson averages of adjacent
    /// secants, zeroed at sign changes, then rescaled wherever the Hyman
    /// criterion `alpha^2 + beta^2 > 9` would let the Hermite overshoot.
    fn tangents(&self) -> Vec<f32> {
        let n = self.points.len();
        let mut secants = Vec::with_capacity(n - 1);
        for pair in self.points.windows(2) {
            secants.push((pair[1].y - pair[0].y) / (pair[1].x - pair[0].x));
        }

        let mut m = vec![0.0f32; n];
        m[0] = secants[0];
        m[n - 1] = secants[n - 2];
        for i in 1..n - 1 {
            if secants[i - 1] * secants[i] <= 0.0 {
                m[i] = 0.0;
            } else {
                m[i] = 0.5 * (secants[i - 1] + secants[i]);
            }
        }

        for (i, &d) in secants.iter().enumerate() {
            if d == 0.0 {
                m[i] = 0.0;
                m[i + 1] = 0.0;
                continue;
            }
            let alpha = m[i] / d;
            let beta = m[i + 1] / d;
            let s = alpha * alpha + beta * beta;
            if s > 9.0 {
                let tau = 3.0 / s.sqrt();
                m[i] = tau * alpha * d;
                m[i + 1] = tau * beta * d;
            }
        }

        m
    }

    /// Evaluates the curve at `x`, clamped to the curve's domain.
    pub fn evaluate(&self, x: f32) -> f32 {
        let n = self.points.len();
        if x <= self.points[0].x {
            return self.points[0].y;
        }
        if x >= self.points[n - 1].x {
            return self.points[n - 1].y;
        }

        let m = self.tangents();
        let mut i = 0;
        while i < n - 2 && self.points[i + 1].x <= x {
            i += 1;
        }

        let p0 = self.points[i];
        let p1 = self.points[i + 1];
        let h = p1.x - p0.x;
        let t = (x - p0.x) / h;
        let t2 = t * t;
        let t3 = t2 * t;

        p0.y * (2.0 * t3 - 3.0 * t2 + 1.0)
            + h * m[i] * (t3 - 2.0 * t2 + t)
            + p1.y * (-2.0 * t3 + 3.0 * t2)
            + h * m[i + 1] * (t3 - t2)
    }
}

impl Default for ToneCurve {
    fn default() -> Self {
        Self::identity()
    }
}

/// The four tone curves applied after tone-mapping.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToneCurves {
    /// Luma curve, applied per channel when the RGB curves are identity.
    pub luma: ToneCurve,
    /// Red channel curve.
    pub red: ToneCurve,
    /// Green channel curve.
    pub green: ToneCurve,
    /// Blue channel curve.
    pub blue: ToneCurve,
}

impl ToneCurves {
    /// Validates all four curves, prefixing errors with `prefix`.
    pub fn validate(&self, prefix: &str) -> Result<()> {
        self.luma.validate(&format!("{prefix}luma"))?;
        self.red.validate(&format!("{prefix}red"))?;
        self.green.validate(&format!("{prefix}green"))?;
        self.blue.validate(&format!("{prefix}blue"))?;
        Ok(())
    }

    /// Returns true if all four curves are identity.
    pub fn is_identity(&self) -> bool {
        self.luma.is_identity()
            && self.red.is_identity()
            && self.green.is_identity()
            && self.blue.is_identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_identity() {
        let curve = ToneCurve::identity();
        assert!(curve.is_identity());
        assert_relative_eq!(curve.evaluate(0.0), 0.0);
        assert_relative_eq!(curve.evaluate(100.0), 100.0, epsilon = 1e-3);
        assert_relative_eq!(curve.evaluate(255.0), 255.0);
    }

    #[test]
    fn test_validation_rejects_short() {
        let curve = ToneCurve {
            points: vec![CurvePoint::new(0.0, 0.0)],
        };
        assert!(curve.validate("luma").is_err());
    }

    #[test]
    fn test_validation_rejects_unsorted() {
        let curve = ToneCurve {
            points: vec![
                CurvePoint::new(0.0, 0.0),
                CurvePoint::new(128.0, 64.0),
                CurvePoint::new(128.0, 200.0),
                CurvePoint::new(255.0, 255.0),
            ],
        };
        let err = curve.validate("red").unwrap_err();
        assert!(err.to_string().contains("red"));
    }

    #[test]
    fn test_validation_rejects_bad_endpoints() {
        let curve = ToneCurve {
            points: vec![CurvePoint::new(5.0, 0.0), CurvePoint::new(255.0, 255.0)],
        };
        assert!(curve.validate("luma").is_err());
        let curve = ToneCurve {
            points: vec![CurvePoint::new(0.0, 0.0), CurvePoint::new(250.0, 255.0)],
        };
        assert!(curve.validate("luma").is_err());
    }

    #[test]
    fn test_lift_raises_midtones() {
        // (0,0) (128,200) (255,255): midtones lift, endpoints stay.
        let curve = ToneCurve::from_points(vec![
            CurvePoint::new(0.0, 0.0),
            CurvePoint::new(128.0, 200.0),
            CurvePoint::new(255.0, 255.0),
        ])
        .unwrap();
        assert!(curve.evaluate(128.0) > 128.0);
        assert_relative_eq!(curve.evaluate(128.0), 200.0, epsilon = 1e-3);
        assert_relative_eq!(curve.evaluate(0.0), 0.0);
        assert_relative_eq!(curve.evaluate(255.0), 255.0);
    }

    #[test]
    fn test_monotone_no_overshoot() {
        // A steep step between points must not overshoot the data range.
        let curve = ToneCurve::from_points(vec![
            CurvePoint::new(0.0, 0.0),
            CurvePoint::new(100.0, 10.0),
            CurvePoint::new(110.0, 245.0),
            CurvePoint::new(255.0, 255.0),
        ])
        .unwrap();
        let mut prev = curve.evaluate(0.0);
        for i in 1..=255 {
            let y = curve.evaluate(i as f32);
            assert!(y >= prev - 1e-3, "not monotone at x={i}: {y} < {prev}");
            assert!((0.0..=255.0 + 1e-3).contains(&y), "overshoot at x={i}: {y}");
            prev = y;
        }
    }

    #[test]
    fn test_flat_segment_stays_flat() {
        let curve = ToneCurve::from_points(vec![
            CurvePoint::new(0.0, 64.0),
            CurvePoint::new(128.0, 64.0),
            CurvePoint::new(255.0, 255.0),
        ])
        .unwrap();
        assert_relative_eq!(curve.evaluate(64.0), 64.0, epsilon = 1e-3);
    }

    #[test]
    fn test_curves_bundle_identity() {
        let curves = ToneCurves::default();
        assert!(curves.is_identity());
        assert!(curves.validate("").is_ok());
    }
}
