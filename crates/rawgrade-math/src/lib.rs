//! # rawgrade-math
//!
//! Small math utilities shared by the rawgrade render core:
//!
//! - [`interp`] - scalar interpolation and gating helpers that mirror the
//!   shader-language builtins used by the GPU kernel
//! - [`mat3`] - a 3x3 matrix for linear color-space transforms
//!
//! Everything here is plain `f32` math with no dependencies; the compute
//! crate relies on these being exact CPU mirrors of what the WGSL kernel
//! does so host-side validation and tests can reason about shader behavior.

pub mod interp;
pub mod mat3;

pub use interp::{inverse_lerp, lerp, saturate, smootherstep, smoothstep};
pub use mat3::Mat3;
