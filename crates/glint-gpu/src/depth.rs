//! Depth buffer backing the render pass's depth attachment.

use crate::device::DeviceContext;
use crate::error::{GpuError, Result};
use ash::vk;

/// Device-local depth image sized to the swapchain extent.
///
/// Recreated together with the swapchain on every resize.
pub struct DepthBuffer {
    /// The depth image.
    pub image: vk::Image,
    /// Backing memory.
    pub memory: vk::DeviceMemory,
    /// View bound into every framebuffer.
    pub view: vk::ImageView,
    /// Selected depth format.
    pub format: vk::Format,
}

impl DepthBuffer {
    /// Create a depth buffer for the given extent.
    pub fn new(device_ctx: &DeviceContext, extent: vk::Extent2D) -> Result<Self> {
        let format = find_depth_format(device_ctx)?;
        let device = device_ctx.device();

        let image_info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .extent(vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .format(format)
            .tiling(vk::ImageTiling::OPTIMAL)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .usage(vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT)
            .samples(vk::SampleCountFlags::TYPE_1)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let image = unsafe { device.create_image(&image_info, None) }?;

        let requirements = unsafe { device.get_image_memory_requirements(image) };
        let memory_type = device_ctx.find_memory_type(
            requirements.memory_type_bits,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        )?;

        let alloc_info = vk::MemoryAllocateInfo::default()
            .allocation_size(requirements.size)
            .memory_type_index(memory_type);

        let memory = unsafe { device.allocate_memory(&alloc_info, None) }?;
        unsafe { device.bind_image_memory(image, memory, 0) }?;

        let view_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .subresource_range(
                vk::ImageSubresourceRange::default()
                    .aspect_mask(vk::ImageAspectFlags::DEPTH)
                    .base_mip_level(0)
                    .level_count(1)
                    .base_array_layer(0)
                    .layer_count(1),
            );

        let view = unsafe { device.create_image_view(&view_info, None) }?;

        Ok(Self {
            image,
            memory,
            view,
            format,
        })
    }

    /// Destroy the depth buffer.
    ///
    /// # Safety
    /// The device must be idle with respect to this image.
    pub unsafe fn destroy(&mut self, device: &ash::Device) {
        device.destroy_image_view(self.view, None);
        device.destroy_image(self.image, None);
        device.free_memory(self.memory, None);
        self.image = vk::Image::null();
        self.memory = vk::DeviceMemory::null();
        self.view = vk::ImageView::null();
    }
}

/// Find a depth format with optimal-tiling attachment support.
pub fn find_depth_format(device_ctx: &DeviceContext) -> Result<vk::Format> {
    let candidates = [
        vk::Format::D32_SFLOAT,
        vk::Format::D32_SFLOAT_S8_UINT,
        vk::Format::D24_UNORM_S8_UINT,
    ];

    for format in candidates {
        let props = unsafe {
            device_ctx
                .instance()
                .get_physical_device_format_properties(device_ctx.physical_device(), format)
        };

        if props
            .optimal_tiling_features
            .contains(vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT)
        {
            return Ok(format);
        }
    }

    Err(GpuError::Other(
        "No supported depth format found".to_string(),
    ))
}
