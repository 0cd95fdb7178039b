//! Frame lifecycle and scene rendering for Glint.
//!
//! [`Renderer`] owns the full Vulkan object graph and renders one
//! frame per [`Renderer::draw_frame`] call. The per-frame sequencing
//! lives in [`driver::FrameDriver`], which talks to the GPU only
//! through the [`driver::FramePort`] trait so the sequencing logic is
//! testable without a device.

pub mod driver;
pub mod frame;
pub mod geometry;
pub mod renderer;
pub mod transform;

pub use driver::{FrameDriver, FrameOutcome, FramePort};
pub use frame::{FrameRing, MAX_FRAMES_IN_FLIGHT};
pub use geometry::{GeometryBuffers, Vertex};
pub use renderer::{Renderer, RendererConfig};
pub use transform::TransformUbo;
