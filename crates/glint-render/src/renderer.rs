//! The renderer: owns the Vulkan object graph and implements
//! [`FramePort`] over the real device.

use crate::driver::{FrameDriver, FrameOutcome, FramePort};
use crate::frame::{FrameRing, MAX_FRAMES_IN_FLIGHT};
use crate::geometry::{GeometryBuffers, Vertex};
use crate::transform::TransformUbo;
use ash::vk;
use glint_gpu::{
    command, shader, sync, AcquireOutcome, CommandPool, DepthBuffer, DescriptorSetLayoutBuilder,
    DeviceContext, GraphicsPipeline, GraphicsPipelineConfig, PresentOutcome, RenderPass, Result,
    SurfaceContext, SurfaceSet, Texture,
};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::time::Instant;

/// Renderer construction parameters.
pub struct RendererConfig {
    /// Application name reported to the driver.
    pub app_name: String,
    /// Enable the validation layer and debug messenger.
    pub enable_validation: bool,
    /// Raw SPIR-V bytes for the vertex shader.
    pub vertex_shader: Vec<u8>,
    /// Raw SPIR-V bytes for the fragment shader.
    pub fragment_shader: Vec<u8>,
}

/// Owns every Vulkan object and renders one frame per
/// [`Renderer::draw_frame`] call.
pub struct Renderer {
    device_ctx: DeviceContext,
    surface_ctx: SurfaceContext,
    surface_set: SurfaceSet,
    render_pass: RenderPass,
    depth: DepthBuffer,
    pipeline: GraphicsPipeline,
    command_pool: CommandPool,
    geometry: GeometryBuffers,
    texture: Texture,
    ring: FrameRing,
    driver: FrameDriver,
    start: Instant,
    resize_requested: bool,
    drawable_width: u32,
    drawable_height: u32,
    destroyed: bool,
}

impl Renderer {
    /// Build the full object graph for a window.
    pub fn new<W>(
        window: &W,
        config: &RendererConfig,
        drawable_width: u32,
        drawable_height: u32,
    ) -> Result<Self>
    where
        W: HasDisplayHandle + HasWindowHandle,
    {
        let (device_ctx, surface_ctx) =
            DeviceContext::new(window, &config.app_name, config.enable_validation)?;
        let device = device_ctx.device();

        let command_pool = unsafe { CommandPool::new(device, device_ctx.graphics_queue_family()) }?;

        let mut surface_set =
            SurfaceSet::create(&device_ctx, &surface_ctx, drawable_width, drawable_height)?;

        let depth = DepthBuffer::new(&device_ctx, surface_set.extent)?;
        let render_pass =
            unsafe { RenderPass::new(device, surface_set.format, Some(depth.format)) }?;

        unsafe {
            surface_set.create_views_and_framebuffers(device, &render_pass, Some(depth.view))?;
        }

        let descriptor_set_layout = unsafe {
            DescriptorSetLayoutBuilder::new()
                .uniform_buffer(0, vk::ShaderStageFlags::VERTEX)
                .combined_image_sampler(1, vk::ShaderStageFlags::FRAGMENT)
                .build(device)
        }?;

        let pipeline_config = GraphicsPipelineConfig {
            vertex_shader: shader::spirv_words(&config.vertex_shader)?,
            fragment_shader: shader::spirv_words(&config.fragment_shader)?,
            vertex_bindings: vec![Vertex::binding_description()],
            vertex_attributes: Vertex::attribute_descriptions(),
            depth_test: true,
        };
        let pipeline = unsafe {
            GraphicsPipeline::new(device, &pipeline_config, &[descriptor_set_layout], &render_pass)
        }?;

        let geometry = GeometryBuffers::upload(
            &device_ctx,
            &command_pool,
            &crate::geometry::QUAD_VERTICES,
            &crate::geometry::QUAD_INDICES,
        )?;

        let texture = Texture::upload(
            &device_ctx,
            &command_pool,
            device_ctx.graphics_queue(),
            &crate::geometry::default_texture_pixels(),
            crate::geometry::DEFAULT_TEXTURE_SIZE,
            crate::geometry::DEFAULT_TEXTURE_SIZE,
        )?;

        let ring = FrameRing::new(&device_ctx, &command_pool, descriptor_set_layout, &texture)?;
        let driver = FrameDriver::new(MAX_FRAMES_IN_FLIGHT);

        tracing::info!("Renderer initialized");

        Ok(Self {
            device_ctx,
            surface_ctx,
            surface_set,
            render_pass,
            depth,
            pipeline,
            command_pool,
            geometry,
            texture,
            ring,
            driver,
            start: Instant::now(),
            resize_requested: false,
            drawable_width,
            drawable_height,
            destroyed: false,
        })
    }

    /// Render and present one frame.
    ///
    /// The drawable size is the window's current size in pixels; it is
    /// only consulted when the presentation resources are recreated.
    pub fn draw_frame(
        &mut self,
        drawable_width: u32,
        drawable_height: u32,
    ) -> Result<FrameOutcome> {
        self.drawable_width = drawable_width;
        self.drawable_height = drawable_height;

        let mut driver = self.driver;
        let outcome = driver.drive(self);
        self.driver = driver;
        outcome
    }

    /// Note that the window was resized; the swapchain is recreated
    /// after the next presented frame.
    pub fn request_resize(&mut self) {
        self.resize_requested = true;
    }

    /// Tear everything down in reverse creation order.
    ///
    /// Idempotent; also invoked from `Drop` as a backstop.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;

        if let Err(e) = self.device_ctx.wait_idle() {
            tracing::error!("Device wait failed during teardown: {e}");
        }

        let device = self.device_ctx.device();
        unsafe {
            self.ring.destroy(device);
            self.texture.destroy(device);
            self.geometry.destroy(device);
            self.pipeline.destroy(device);
            self.surface_set.destroy(device, &self.surface_ctx);
            self.depth.destroy(device);
            self.render_pass.destroy(device);
            self.command_pool.destroy(device);
            self.surface_ctx.destroy();
        }
    }

    /// Rebuild the swapchain, depth buffer, views, and framebuffers for
    /// the current drawable size.
    fn rebuild_presentation(&mut self) -> Result<()> {
        self.device_ctx.wait_idle()?;

        let device = self.device_ctx.device();
        unsafe {
            self.surface_set.destroy(device, &self.surface_ctx);
            self.depth.destroy(device);
        }

        self.surface_set = SurfaceSet::create(
            &self.device_ctx,
            &self.surface_ctx,
            self.drawable_width,
            self.drawable_height,
        )?;
        self.depth = DepthBuffer::new(&self.device_ctx, self.surface_set.extent)?;

        let device = self.device_ctx.device();
        unsafe {
            self.surface_set.create_views_and_framebuffers(
                device,
                &self.render_pass,
                Some(self.depth.view),
            )?;
        }

        Ok(())
    }

    /// Record the slot's command buffer: one pass, one draw.
    ///
    /// # Safety
    /// The command buffer must be reset and not in flight.
    unsafe fn record_commands(&self, slot: usize, image_index: u32) -> Result<()> {
        let device = self.device_ctx.device();
        let ring_slot = self.ring.slot(slot);
        let cmd = ring_slot.command_buffer;
        let extent = self.surface_set.extent;

        command::begin_command_buffer(device, cmd, vk::CommandBufferUsageFlags::empty())?;

        let clear_values = self.render_pass.clear_values();
        let pass_info = vk::RenderPassBeginInfo::default()
            .render_pass(self.render_pass.handle())
            .framebuffer(self.surface_set.framebuffer(image_index))
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent,
            })
            .clear_values(&clear_values);

        device.cmd_begin_render_pass(cmd, &pass_info, vk::SubpassContents::INLINE);
        device.cmd_bind_pipeline(
            cmd,
            vk::PipelineBindPoint::GRAPHICS,
            self.pipeline.pipeline,
        );

        let viewport = vk::Viewport::default()
            .width(extent.width as f32)
            .height(extent.height as f32)
            .min_depth(0.0)
            .max_depth(1.0);
        device.cmd_set_viewport(cmd, 0, &[viewport]);

        let scissor = vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent,
        };
        device.cmd_set_scissor(cmd, 0, &[scissor]);

        device.cmd_bind_vertex_buffers(cmd, 0, &[self.geometry.vertex.buffer], &[0]);
        device.cmd_bind_index_buffer(cmd, self.geometry.index.buffer, 0, vk::IndexType::UINT16);
        device.cmd_bind_descriptor_sets(
            cmd,
            vk::PipelineBindPoint::GRAPHICS,
            self.pipeline.layout,
            0,
            &[ring_slot.descriptor_set],
            &[],
        );

        device.cmd_draw_indexed(cmd, self.geometry.index_count(), 1, 0, 0, 0);
        device.cmd_end_render_pass(cmd);

        command::end_command_buffer(device, cmd)?;
        Ok(())
    }
}

impl FramePort for Renderer {
    fn wait_for_slot(&mut self, slot: usize) -> Result<()> {
        let fence = self.ring.slot(slot).sync.in_flight;
        unsafe { sync::wait_for_fence(self.device_ctx.device(), fence, u64::MAX) }
    }

    fn acquire(&mut self, slot: usize) -> Result<AcquireOutcome> {
        let semaphore = self.ring.slot(slot).sync.image_available;
        unsafe {
            self.surface_set
                .acquire_next(&self.surface_ctx, u64::MAX, semaphore)
        }
    }

    fn begin_recording(&mut self, slot: usize) -> Result<()> {
        let device = self.device_ctx.device();
        let ring_slot = self.ring.slot(slot);

        unsafe {
            sync::reset_fence(device, ring_slot.sync.in_flight)?;
            device.reset_command_buffer(
                ring_slot.command_buffer,
                vk::CommandBufferResetFlags::empty(),
            )?;
        }
        Ok(())
    }

    fn update_transform(&mut self, slot: usize) -> Result<()> {
        let elapsed = self.start.elapsed().as_secs_f32();
        let ubo = TransformUbo::compute(elapsed, self.surface_set.extent);
        self.ring.slot(slot).uniform.write_pod(&ubo)
    }

    fn record(&mut self, slot: usize, image_index: u32) -> Result<()> {
        unsafe { self.record_commands(slot, image_index) }
    }

    fn submit(&mut self, slot: usize) -> Result<()> {
        let ring_slot = self.ring.slot(slot);
        unsafe {
            command::submit_command_buffers(
                self.device_ctx.device(),
                self.device_ctx.graphics_queue(),
                &[ring_slot.command_buffer],
                &[ring_slot.sync.image_available],
                &[vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT],
                &[ring_slot.sync.render_finished],
                ring_slot.sync.in_flight,
            )
        }
    }

    fn present(&mut self, slot: usize, image_index: u32) -> Result<PresentOutcome> {
        let semaphore = self.ring.slot(slot).sync.render_finished;
        unsafe {
            self.surface_set.present(
                &self.surface_ctx,
                self.device_ctx.present_queue(),
                image_index,
                semaphore,
            )
        }
    }

    fn recreate_presentation(&mut self) -> Result<()> {
        // A minimized window reports a zero-sized drawable; keep the
        // stale swapchain and retry once a real size arrives.
        if self.drawable_width == 0 || self.drawable_height == 0 {
            self.resize_requested = true;
            return Ok(());
        }

        tracing::debug!(
            "Recreating presentation resources at {}x{}",
            self.drawable_width,
            self.drawable_height
        );
        self.rebuild_presentation()
    }

    fn take_resize_request(&mut self) -> bool {
        std::mem::take(&mut self.resize_requested)
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        self.destroy();
    }
}
