//! # rawgrade-compute
//!
//! The GPU core of the rawgrade photo editor: a single wgpu compute kernel
//! that renders final sRGB pixels from a float-RGB image and an adjustment
//! bundle, plus the host machinery that validates, marshals, and
//! dispatches it.
//!
//! # Architecture
//!
//! ```text
//! +------------------------------------------------------------------+
//! |                           Renderer                               |
//! +------------------------------------------------------------------+
//! |                                                                  |
//! |  FrameInput --> validate --> PipelineParams --> dispatch --> u8  |
//! |      |                            |                 |            |
//! |      v                            v                 v            |
//! |  image + blurs(4)          uniform mirror     8x8 workgroups     |
//! |  masks(0..8), LUT,         (bytemuck Pod,     per tile, rgba8    |
//! |  flare plane               layout-asserted)   readback           |
//! |                                                                  |
//! +------------------------------------------------------------------+
//! ```
//!
//! # Quick start
//!
//! ```ignore
//! use rawgrade_compute::{FrameInput, GpuContext, Renderer};
//! use rawgrade_core::Adjustments;
//!
//! let context = GpuContext::new()?;
//! let renderer = Renderer::new(&context)?;
//!
//! let mut adjustments = Adjustments::default();
//! adjustments.exposure = 0.7;
//!
//! let pixels = renderer.render(&frame, &adjustments)?;  // rgba8 bytes
//! ```
//!
//! # Contracts
//!
//! - A dispatch is pure: identical inputs produce identical output, and
//!   tiling is invisible in the result.
//! - All validation happens host-side before binding; the kernel itself
//!   never faults (divisors are epsilon-guarded, everything saturates).
//! - Output alpha equals input alpha; color lands in `[0, 1]` rgba8.

pub mod context;
pub mod error;
pub mod input;
pub mod renderer;
pub mod shaders;
pub mod uniform;

pub use context::GpuContext;
pub use error::{RenderError, RenderResult};
pub use input::{BlurSet, FlarePlane, FrameInput, InfluencePlane, PixelPlane};
pub use renderer::Renderer;
pub use uniform::{FrameDesc, GlobalParams, MaskParams, PipelineParams};
