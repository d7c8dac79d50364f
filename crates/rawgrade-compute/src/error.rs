//! Render pipeline errors.
//!
//! Everything here is raised on the host before or around a dispatch; the
//! GPU kernel itself is total and never reports.

use thiserror::Error;

/// Result type alias using [`RenderError`].
pub type RenderResult<T> = std::result::Result<T, RenderError>;

/// Errors raised by the render pipeline host.
#[derive(Debug, Error)]
pub enum RenderError {
    /// No suitable GPU adapter was found.
    #[error("no suitable GPU adapter found")]
    NoAdapter,

    /// Device creation failed.
    #[error("failed to create device: {0}")]
    DeviceCreation(String),

    /// A binding the parameters require was not supplied.
    ///
    /// Raised before dispatch: a LUT while `lut_intensity > 0`, a flare
    /// plane while any flare amount is positive, or fewer mask influence
    /// planes than enabled masks.
    #[error("missing resource: {resource}")]
    MissingResource {
        /// What was missing.
        resource: String,
    },

    /// An input plane does not match the frame dimensions.
    #[error("{plane} is {got_w}x{got_h}, expected {expected_w}x{expected_h}")]
    DimensionMismatch {
        /// Which plane mismatched.
        plane: String,
        /// Expected width.
        expected_w: u32,
        /// Expected height.
        expected_h: u32,
        /// Actual width.
        got_w: u32,
        /// Actual height.
        got_h: u32,
    },

    /// A pixel buffer does not hold `width * height * channels` values.
    #[error("buffer holds {actual} values, expected {expected}")]
    BufferSizeMismatch {
        /// Expected element count.
        expected: usize,
        /// Actual element count.
        actual: usize,
    },

    /// The adjustment bundle failed validation.
    #[error("invalid parameters: {0}")]
    InvalidParams(#[from] rawgrade_core::Error),

    /// The device was lost mid-render; recreate resources and retry.
    #[error("device lost: {0}")]
    DeviceLost(String),

    /// The GPU did not signal completion in time.
    #[error("GPU readback timed out after {seconds}s")]
    Timeout {
        /// How long the host waited.
        seconds: u64,
    },

    /// Mapping the output buffer back failed.
    #[error("readback failed: {0}")]
    Readback(String),
}

impl RenderError {
    /// Creates a [`RenderError::MissingResource`].
    #[inline]
    pub fn missing(resource: impl Into<String>) -> Self {
        Self::MissingResource {
            resource: resource.into(),
        }
    }

    /// Creates a [`RenderError::DimensionMismatch`].
    #[inline]
    pub fn dimension_mismatch(
        plane: impl Into<String>,
        expected: (u32, u32),
        got: (u32, u32),
    ) -> Self {
        Self::DimensionMismatch {
            plane: plane.into(),
            expected_w: expected.0,
            expected_h: expected.1,
            got_w: got.0,
            got_h: got.1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_resource_message() {
        let err = RenderError::missing("flare plane");
        assert!(err.to_string().contains("flare plane"));
    }

    #[test]
    fn test_dimension_mismatch_message() {
        let err = RenderError::dimension_mismatch("tonal blur", (64, 64), (32, 64));
        let msg = err.to_string();
        assert!(msg.contains("tonal blur"));
        assert!(msg.contains("32x64"));
        assert!(msg.contains("64x64"));
    }

    #[test]
    fn test_core_error_converts() {
        let core = rawgrade_core::Error::TooManyMasks { count: 9 };
        let err: RenderError = core.into();
        assert!(matches!(err, RenderError::InvalidParams(_)));
    }
}
