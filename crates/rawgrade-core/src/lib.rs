//! # rawgrade-core
//!
//! The parameter bundle and semantic contracts of the rawgrade render core.
//!
//! This crate defines everything the GPU pipeline consumes that is not a
//! texture: the adjustment model, tone curves, the mask taxonomy, 3D LUT
//! cubes, and the AgX working-space matrices. It owns validation: by the
//! time parameters reach the compute crate they are known-good.
//!
//! ## Crate structure
//!
//! ```text
//! rawgrade-core
//!    +-- adjustments  global + per-mask records, Default = identity
//!    +-- curve        tone curves, monotone cubic evaluation
//!    +-- mask         geometry taxonomy (rasterization is external)
//!    +-- lut          3D LUT cubes, tetrahedral reference lookup
//!    +-- agx          default AgX inset matrix pair
//!    +-- error        validation failures
//! ```
//!
//! ## Design
//!
//! The adjustment model is strict and fixed-shape: fixed-size arrays for
//! the 8 HSL bands and 16-point curves, no sparse objects, and every field
//! defaulting to identity so sparse sidecar JSON means "no change". The
//! render core treats the bundle as a value; it is rebuilt per frame and
//! marshaled into the GPU uniform by the compute crate.

#![warn(missing_docs)]

pub mod adjustments;
pub mod agx;
pub mod curve;
pub mod error;
pub mod lut;
pub mod mask;

pub use adjustments::{
    Adjustments, AgxTransform, Calibration, ChromaticAberration, ColorGrading, GradingZone, Grain,
    HslShift, MaskAdjustments, PrimaryCalibration, ToneMapper, Vignette, HSL_BANDS, MAX_MASKS,
};
pub use curve::{CurvePoint, ToneCurve, ToneCurves, MAX_CURVE_POINTS};
pub use error::{Error, Result};
pub use lut::Lut3D;
pub use mask::{MaskKind, MaskLayer};
