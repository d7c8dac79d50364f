//! Error types for parameter validation.
//!
//! Everything the host hands the render core is validated before any GPU
//! work happens; these are the failures that validation can surface.
//!
//! # Usage
//!
//! ```rust
//! use rawgrade_core::{Error, Result};
//!
//! fn check_mask_count(count: usize) -> Result<()> {
//!     if count > 8 {
//!         return Err(Error::TooManyMasks { count });
//!     }
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while validating the parameter bundle.
///
/// # Categories
///
/// - **Curve errors**: [`InvalidCurve`](Error::InvalidCurve)
/// - **Mask errors**: [`TooManyMasks`](Error::TooManyMasks)
/// - **LUT errors**: [`InvalidLut`](Error::InvalidLut)
/// - **Dimension errors**: [`InvalidDimensions`](Error::InvalidDimensions)
#[derive(Debug, Error)]
pub enum Error {
    /// A tone curve violates its contract.
    ///
    /// Curves must have 2..=16 control points, strictly ascending x, and
    /// endpoints at x = 0 and x = 255. The host should repair and retry.
    #[error("invalid {curve} curve: {reason}")]
    InvalidCurve {
        /// Which curve failed (luma, red, green, blue, possibly prefixed
        /// with the mask index).
        curve: String,
        /// What the violation was.
        reason: String,
    },

    /// More mask records than the pipeline's eight slots.
    ///
    /// Masks beyond eight must be flattened by the host before dispatch.
    #[error("mask count {count} exceeds the 8 pipeline slots")]
    TooManyMasks {
        /// Number of masks supplied.
        count: usize,
    },

    /// A 3D LUT does not describe a valid cube.
    #[error("invalid 3D LUT: {reason}")]
    InvalidLut {
        /// What the violation was.
        reason: String,
    },

    /// A pixel plane has unusable dimensions.
    #[error("invalid dimensions {width}x{height}: {reason}")]
    InvalidDimensions {
        /// Plane width.
        width: u32,
        /// Plane height.
        height: u32,
        /// What the violation was.
        reason: String,
    },
}

impl Error {
    /// Creates an [`Error::InvalidCurve`].
    #[inline]
    pub fn invalid_curve(curve: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidCurve {
            curve: curve.into(),
            reason: reason.into(),
        }
    }

    /// Creates an [`Error::InvalidLut`].
    #[inline]
    pub fn invalid_lut(reason: impl Into<String>) -> Self {
        Self::InvalidLut {
            reason: reason.into(),
        }
    }

    /// Creates an [`Error::InvalidDimensions`].
    #[inline]
    pub fn invalid_dimensions(width: u32, height: u32, reason: impl Into<String>) -> Self {
        Self::InvalidDimensions {
            width,
            height,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_curve_message() {
        let err = Error::invalid_curve("luma", "points not ascending");
        let msg = err.to_string();
        assert!(msg.contains("luma"));
        assert!(msg.contains("ascending"));
    }

    #[test]
    fn test_too_many_masks_message() {
        let err = Error::TooManyMasks { count: 11 };
        assert!(err.to_string().contains("11"));
    }

    #[test]
    fn test_invalid_dimensions_message() {
        let err = Error::invalid_dimensions(0, 128, "zero width");
        assert!(err.to_string().contains("0x128"));
    }
}
