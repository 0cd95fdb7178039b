//! Swapchain management: the rotating set of presentable images plus
//! their views and framebuffers.
//!
//! Out-of-date and suboptimal presentation results are expected on the
//! hot path and surface as [`AcquireOutcome`] / [`PresentOutcome`]
//! variants rather than errors; only genuinely unexpected results
//! become `GpuError`.

use crate::device::DeviceContext;
use crate::error::{GpuError, Result};
use crate::render_pass::RenderPass;
use crate::surface::SurfaceContext;
use ash::vk;

/// Result of requesting the next presentable image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// An image was acquired. `suboptimal` means the frame can proceed
    /// but the swapchain should be recreated after present.
    Ready {
        /// Index of the acquired swapchain image.
        image_index: u32,
        /// The surface no longer matches the swapchain exactly.
        suboptimal: bool,
    },
    /// The surface is out of date; the caller must recreate the
    /// swapchain and drop this frame without submitting.
    Retire,
}

/// Result of presenting an image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PresentOutcome {
    /// The image was queued for display.
    Presented,
    /// The surface is out of date; recreate before the next acquire.
    Retire,
    /// The frame was displayed but the swapchain no longer matches the
    /// surface; recreate before the next acquire.
    RetireSoft,
}

/// The presentation surface set: swapchain, images, views, and
/// framebuffers sized to the current output dimensions.
pub struct SurfaceSet {
    /// The swapchain handle.
    pub swapchain: vk::SwapchainKHR,
    /// Presentable images owned by the presentation engine.
    pub images: Vec<vk::Image>,
    /// One view per image.
    pub image_views: Vec<vk::ImageView>,
    /// One framebuffer per image, all referencing the same render pass.
    pub framebuffers: Vec<vk::Framebuffer>,
    /// Selected pixel format.
    pub format: vk::Format,
    /// Negotiated extent in pixels.
    pub extent: vk::Extent2D,
}

impl SurfaceSet {
    /// Create the swapchain and fetch its images.
    ///
    /// Views and framebuffers are built separately once the render
    /// pass and depth buffer exist; see
    /// [`SurfaceSet::create_views_and_framebuffers`].
    pub fn create(
        device_ctx: &DeviceContext,
        surface_ctx: &SurfaceContext,
        drawable_width: u32,
        drawable_height: u32,
    ) -> Result<Self> {
        let support = surface_ctx.query_support(device_ctx.physical_device())?;

        let surface_format = select_surface_format(&support.formats);
        let present_mode = select_present_mode(&support.present_modes);
        let extent = select_extent(&support.capabilities, drawable_width, drawable_height);
        let image_count = select_image_count(&support.capabilities);

        if extent.width == 0 || extent.height == 0 {
            return Err(GpuError::SurfaceUnavailable(
                "surface reports a zero-sized drawable area".to_string(),
            ));
        }

        let graphics_family = device_ctx.graphics_queue_family();
        let present_family = device_ctx.present_queue_family();
        let queue_families = [graphics_family, present_family];

        let mut create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(surface_ctx.surface)
            .min_image_count(image_count)
            .image_format(surface_format.format)
            .image_color_space(surface_format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .pre_transform(support.capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true)
            .old_swapchain(vk::SwapchainKHR::null());

        // Images are touched by both queues when the families differ,
        // so they need concurrent sharing in that case.
        create_info = if graphics_family != present_family {
            create_info
                .image_sharing_mode(vk::SharingMode::CONCURRENT)
                .queue_family_indices(&queue_families)
        } else {
            create_info.image_sharing_mode(vk::SharingMode::EXCLUSIVE)
        };

        let swapchain = unsafe {
            surface_ctx
                .swapchain_loader
                .create_swapchain(&create_info, None)
        }
        .map_err(|e| GpuError::SwapchainCreation(e.to_string()))?;

        let images = unsafe { surface_ctx.swapchain_loader.get_swapchain_images(swapchain) }?;

        tracing::info!(
            "Swapchain created: {}x{} ({} images, {:?})",
            extent.width,
            extent.height,
            images.len(),
            present_mode
        );

        Ok(Self {
            swapchain,
            images,
            image_views: Vec::new(),
            framebuffers: Vec::new(),
            format: surface_format.format,
            extent,
        })
    }

    /// Build one view and one framebuffer per image.
    ///
    /// Every framebuffer references the same render pass and, when
    /// present, the same depth view.
    ///
    /// # Safety
    /// The device and render pass must be valid; the depth view, when
    /// given, must match the swapchain extent.
    pub unsafe fn create_views_and_framebuffers(
        &mut self,
        device: &ash::Device,
        render_pass: &RenderPass,
        depth_view: Option<vk::ImageView>,
    ) -> Result<()> {
        debug_assert!(self.image_views.is_empty() && self.framebuffers.is_empty());

        self.image_views.reserve(self.images.len());
        for (index, &image) in self.images.iter().enumerate() {
            let view_info = vk::ImageViewCreateInfo::default()
                .image(image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(self.format)
                .components(vk::ComponentMapping::default())
                .subresource_range(
                    vk::ImageSubresourceRange::default()
                        .aspect_mask(vk::ImageAspectFlags::COLOR)
                        .base_mip_level(0)
                        .level_count(1)
                        .base_array_layer(0)
                        .layer_count(1),
                );

            let view = device.create_image_view(&view_info, None)?;
            if view == vk::ImageView::null() {
                return Err(GpuError::ImageViewCreationFailed { index });
            }
            self.image_views.push(view);
        }

        self.framebuffers.reserve(self.image_views.len());
        for &view in &self.image_views {
            let mut attachments = vec![view];
            if let Some(depth) = depth_view {
                attachments.push(depth);
            }

            let framebuffer_info = vk::FramebufferCreateInfo::default()
                .render_pass(render_pass.handle())
                .attachments(&attachments)
                .width(self.extent.width)
                .height(self.extent.height)
                .layers(1);

            let framebuffer = device.create_framebuffer(&framebuffer_info, None)?;
            self.framebuffers.push(framebuffer);
        }

        Ok(())
    }

    /// Number of presentable images.
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Framebuffer for an acquired image index.
    pub fn framebuffer(&self, image_index: u32) -> vk::Framebuffer {
        self.framebuffers[image_index as usize]
    }

    /// Request the next presentable image.
    ///
    /// # Safety
    /// All handles must be valid and the semaphore must be unsignaled.
    pub unsafe fn acquire_next(
        &self,
        surface_ctx: &SurfaceContext,
        timeout_ns: u64,
        signal_semaphore: vk::Semaphore,
    ) -> Result<AcquireOutcome> {
        let result = surface_ctx.swapchain_loader.acquire_next_image(
            self.swapchain,
            timeout_ns,
            signal_semaphore,
            vk::Fence::null(),
        );

        match result {
            Ok((image_index, suboptimal)) => Ok(AcquireOutcome::Ready {
                image_index,
                suboptimal,
            }),
            // No image was acquired; the caller must recreate and drop
            // this frame.
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(AcquireOutcome::Retire),
            Err(e) => Err(GpuError::from(e)),
        }
    }

    /// Present an acquired image on the presentation queue.
    ///
    /// # Safety
    /// All handles must be valid; `image_index` must come from a
    /// successful acquire on this swapchain.
    pub unsafe fn present(
        &self,
        surface_ctx: &SurfaceContext,
        present_queue: vk::Queue,
        image_index: u32,
        wait_semaphore: vk::Semaphore,
    ) -> Result<PresentOutcome> {
        let wait_semaphores = [wait_semaphore];
        let swapchains = [self.swapchain];
        let image_indices = [image_index];

        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let result = surface_ctx
            .swapchain_loader
            .queue_present(present_queue, &present_info);

        match result {
            Ok(false) => Ok(PresentOutcome::Presented),
            Ok(true) => Ok(PresentOutcome::RetireSoft),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(PresentOutcome::Retire),
            Err(e) => Err(GpuError::PresentFailed(e)),
        }
    }

    /// Destroy framebuffers, views, and the swapchain, in that order.
    ///
    /// # Safety
    /// The device must be idle with respect to this swapchain.
    pub unsafe fn destroy(&mut self, device: &ash::Device, surface_ctx: &SurfaceContext) {
        for &framebuffer in &self.framebuffers {
            device.destroy_framebuffer(framebuffer, None);
        }
        self.framebuffers.clear();

        for &view in &self.image_views {
            device.destroy_image_view(view, None);
        }
        self.image_views.clear();

        surface_ctx
            .swapchain_loader
            .destroy_swapchain(self.swapchain, None);
        self.swapchain = vk::SwapchainKHR::null();
    }
}

/// Select the surface format, preferring 8-bit sRGB.
pub fn select_surface_format(available: &[vk::SurfaceFormatKHR]) -> vk::SurfaceFormatKHR {
    for format in available {
        if format.format == vk::Format::B8G8R8A8_SRGB
            && format.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
        {
            return *format;
        }
    }

    // Fall back to the first reported format
    available[0]
}

/// Select the present mode, preferring low-latency triple buffering.
///
/// FIFO is the fallback; a conformant device always reports it.
pub fn select_present_mode(available: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    for &mode in available {
        if mode == vk::PresentModeKHR::MAILBOX {
            return mode;
        }
    }

    vk::PresentModeKHR::FIFO
}

/// Compute the swapchain extent from the surface capabilities.
///
/// When the surface reports the "extent undefined" sentinel, the
/// platform drawable size is clamped into the reported bounds.
pub fn select_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    drawable_width: u32,
    drawable_height: u32,
) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        capabilities.current_extent
    } else {
        vk::Extent2D {
            width: drawable_width.clamp(
                capabilities.min_image_extent.width,
                capabilities.max_image_extent.width,
            ),
            height: drawable_height.clamp(
                capabilities.min_image_extent.height,
                capabilities.max_image_extent.height,
            ),
        }
    }
}

/// Decide how many images to request: one more than the reported
/// minimum, clamped by the maximum when one exists (zero means
/// unbounded).
pub fn select_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let mut image_count = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 && image_count > capabilities.max_image_count {
        image_count = capabilities.max_image_count;
    }
    image_count
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(format: vk::Format, color_space: vk::ColorSpaceKHR) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR {
            format,
            color_space,
        }
    }

    fn capabilities(min: u32, max: u32) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            min_image_count: min,
            max_image_count: max,
            ..Default::default()
        }
    }

    #[test]
    fn prefers_srgb_format() {
        let formats = [
            format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            format(vk::Format::B8G8R8A8_SRGB, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            format(vk::Format::B8G8R8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        ];

        let selected = select_surface_format(&formats);
        assert_eq!(selected.format, vk::Format::B8G8R8A8_SRGB);
        assert_eq!(selected.color_space, vk::ColorSpaceKHR::SRGB_NONLINEAR);
    }

    #[test]
    fn falls_back_to_first_format() {
        let formats = [
            format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            format(vk::Format::B8G8R8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        ];

        let selected = select_surface_format(&formats);
        assert_eq!(selected.format, vk::Format::R8G8B8A8_UNORM);
    }

    #[test]
    fn format_selection_is_deterministic() {
        let formats = [
            format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            format(vk::Format::B8G8R8A8_SRGB, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        ];

        let first = select_surface_format(&formats);
        let second = select_surface_format(&formats);
        assert_eq!(first.format, second.format);
        assert_eq!(first.color_space, second.color_space);
    }

    #[test]
    fn prefers_mailbox_present_mode() {
        let modes = [
            vk::PresentModeKHR::FIFO,
            vk::PresentModeKHR::MAILBOX,
            vk::PresentModeKHR::IMMEDIATE,
        ];
        assert_eq!(select_present_mode(&modes), vk::PresentModeKHR::MAILBOX);
    }

    #[test]
    fn falls_back_to_fifo_present_mode() {
        let modes = [vk::PresentModeKHR::FIFO, vk::PresentModeKHR::IMMEDIATE];
        assert_eq!(select_present_mode(&modes), vk::PresentModeKHR::FIFO);

        // FIFO alone is the minimum a conformant device reports.
        let only_fifo = [vk::PresentModeKHR::FIFO];
        assert_eq!(select_present_mode(&only_fifo), vk::PresentModeKHR::FIFO);
    }

    #[test]
    fn uses_current_extent_when_defined() {
        let caps = vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D {
                width: 800,
                height: 600,
            },
            ..Default::default()
        };

        let extent = select_extent(&caps, 1920, 1080);
        assert_eq!(extent.width, 800);
        assert_eq!(extent.height, 600);
    }

    #[test]
    fn clamps_drawable_size_when_extent_undefined() {
        let caps = vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D {
                width: u32::MAX,
                height: u32::MAX,
            },
            min_image_extent: vk::Extent2D {
                width: 320,
                height: 240,
            },
            max_image_extent: vk::Extent2D {
                width: 1280,
                height: 720,
            },
            ..Default::default()
        };

        let extent = select_extent(&caps, 1920, 100);
        assert_eq!(extent.width, 1280);
        assert_eq!(extent.height, 240);

        let inside = select_extent(&caps, 640, 480);
        assert_eq!(inside.width, 640);
        assert_eq!(inside.height, 480);
    }

    #[test]
    fn image_count_within_reported_bounds() {
        for (min, max) in [(2, 4), (3, 3), (1, 8)] {
            let count = select_image_count(&capabilities(min, max));
            assert!(count >= min && count <= max);
        }
    }

    #[test]
    fn image_count_unbounded_when_max_is_zero() {
        let count = select_image_count(&capabilities(2, 0));
        assert_eq!(count, 3);
    }

    #[test]
    fn image_count_is_idempotent_for_stable_inputs() {
        let caps = capabilities(2, 4);
        assert_eq!(select_image_count(&caps), select_image_count(&caps));
    }
}
