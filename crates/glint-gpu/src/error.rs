//! GPU error types.
//!
//! Setup and runtime failures are errors; the surface-retire path is
//! deliberately not represented here. Out-of-date and suboptimal
//! presentation results are expected outcomes and surface as variants
//! of [`crate::swapchain::AcquireOutcome`] and
//! [`crate::swapchain::PresentOutcome`] instead.

use ash::vk;
use thiserror::Error;

/// GPU-related errors.
#[derive(Error, Debug)]
pub enum GpuError {
    /// Vulkan error.
    #[error("Vulkan error: {0}")]
    Vulkan(#[from] vk::Result),

    /// No suitable GPU found.
    #[error("No suitable GPU found")]
    NoSuitableDevice,

    /// No memory type satisfies the requested properties.
    #[error("No suitable memory type (mask {type_mask:#x})")]
    NoSuitableMemoryType {
        /// Memory type bits from the resource's requirements.
        type_mask: u32,
    },

    /// The surface cannot back any presentable images.
    #[error("Surface unavailable: {0}")]
    SurfaceUnavailable(String),

    /// A swapchain image view handle came back null.
    #[error("Image view creation failed for swapchain image {index}")]
    ImageViewCreationFailed {
        /// Index of the offending swapchain image.
        index: usize,
    },

    /// Surface creation failed.
    #[error("Surface creation failed: {0}")]
    SurfaceCreation(String),

    /// Swapchain creation failed.
    #[error("Swapchain creation failed: {0}")]
    SwapchainCreation(String),

    /// Shader module creation failed.
    #[error("Shader compilation failed: {0}")]
    ShaderCompilation(String),

    /// Pipeline creation failed.
    #[error("Pipeline creation failed: {0}")]
    PipelineCreation(String),

    /// Queue submission failed.
    #[error("Queue submit failed: {0}")]
    SubmitFailed(vk::Result),

    /// Presentation failed with an unexpected result.
    #[error("Present failed: {0}")]
    PresentFailed(vk::Result),

    /// A fence wait ran out of time. Treated as a driver-level hang.
    #[error("Fence wait timed out")]
    FenceWaitTimeout,

    /// Other error.
    #[error("{0}")]
    Other(String),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, GpuError>;
