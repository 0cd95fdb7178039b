//! Vulkan layer for the Glint renderer.
//!
//! This crate provides:
//! - Instance and device management
//! - Surface and swapchain handling, including recreation
//! - Render pass and framebuffer setup
//! - Buffer allocation and staging uploads
//! - Sampled texture upload with layout transitions
//! - Command buffer and synchronization primitives

pub mod buffer;
pub mod command;
pub mod depth;
pub mod descriptors;
pub mod device;
pub mod error;
pub mod instance;
pub mod pipeline;
pub mod render_pass;
pub mod shader;
pub mod surface;
pub mod swapchain;
pub mod sync;
pub mod texture;

pub use buffer::Buffer;
pub use command::CommandPool;
pub use depth::DepthBuffer;
pub use descriptors::{
    write_combined_image_sampler, write_uniform_buffer, DescriptorPool, DescriptorSetLayoutBuilder,
};
pub use device::DeviceContext;
pub use error::{GpuError, Result};
pub use pipeline::{GraphicsPipeline, GraphicsPipelineConfig};
pub use render_pass::RenderPass;
pub use surface::{SurfaceContext, SurfaceSupport};
pub use swapchain::{AcquireOutcome, PresentOutcome, SurfaceSet};
pub use sync::SlotSync;
pub use texture::Texture;
