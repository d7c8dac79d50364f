//! Default AgX working-space matrices.
//!
//! The AgX tone-mapper renders through an "inset" RGB space whose primaries
//! sit inside the display gamut; compressing into it before the per-channel
//! sigmoid is what keeps saturated highlights from skewing hue. The uniform
//! transports the pair so hosts can substitute primaries; these constants
//! are the standard pair for Rec.709/sRGB input and are what
//! [`AgxTransform::default`](crate::AgxTransform) supplies.

use rawgrade_math::Mat3;

/// Rec.709 linear -> AgX rendering space.
pub const AGX_INSET: Mat3 = Mat3::from_cols([
    [0.842_479_06, 0.042_328_246, 0.042_375_654],
    [0.078_433_6, 0.878_468_63, 0.078_433_6],
    [0.079_223_745, 0.079_166_125, 0.879_142_97],
]);

/// AgX rendering space -> Rec.709 linear.
pub const AGX_INSET_INVERSE: Mat3 = Mat3::from_cols([
    [1.196_879, -0.052_896_85, -0.052_971_635],
    [-0.098_020_88, 1.151_903_1, -0.098_043_45],
    [-0.099_029_74, -0.098_961_174, 1.151_073_7],
]);

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_pair_round_trips() {
        let id = AGX_INSET.mul_mat(&AGX_INSET_INVERSE);
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_relative_eq!(id.cols[i][j], expected, epsilon = 1e-4);
            }
        }
    }

    #[test]
    fn test_preserves_achromatic_axis() {
        // Gray in, gray out: each row of the inset sums to ~1.
        let gray = AGX_INSET.mul_vec3([1.0, 1.0, 1.0]);
        for ch in gray {
            assert_relative_eq!(ch, 1.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_inverse_matches_computed() {
        let computed = AGX_INSET.inverse().unwrap();
        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(
                    computed.cols[i][j],
                    AGX_INSET_INVERSE.cols[i][j],
                    epsilon = 1e-4
                );
            }
        }
    }
}
