//! Frame pass descriptor: the fixed attachment, subpass, and
//! dependency description shared by every framebuffer.

use crate::error::Result;
use ash::vk;

/// Render pass wrapper. Immutable after creation.
pub struct RenderPass {
    render_pass: vk::RenderPass,
    depth_format: Option<vk::Format>,
}

impl RenderPass {
    /// Create the render pass.
    ///
    /// One color attachment (clear on load, stored, transitioned to
    /// presentable), optionally one depth attachment (clear on load,
    /// discarded after the pass), one subpass, and one dependency from
    /// EXTERNAL that orders the clear after any prior use of the
    /// attachments.
    ///
    /// # Safety
    /// The device must be valid.
    pub unsafe fn new(
        device: &ash::Device,
        color_format: vk::Format,
        depth_format: Option<vk::Format>,
    ) -> Result<Self> {
        let color_attachment = vk::AttachmentDescription::default()
            .format(color_format)
            .samples(vk::SampleCountFlags::TYPE_1)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::STORE)
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .final_layout(vk::ImageLayout::PRESENT_SRC_KHR);

        let mut attachments = vec![color_attachment];

        if let Some(depth_format) = depth_format {
            let depth_attachment = vk::AttachmentDescription::default()
                .format(depth_format)
                .samples(vk::SampleCountFlags::TYPE_1)
                .load_op(vk::AttachmentLoadOp::CLEAR)
                .store_op(vk::AttachmentStoreOp::DONT_CARE)
                .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
                .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
                .initial_layout(vk::ImageLayout::UNDEFINED)
                .final_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);
            attachments.push(depth_attachment);
        }

        let color_ref = vk::AttachmentReference::default()
            .attachment(0)
            .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);

        let depth_ref = vk::AttachmentReference::default()
            .attachment(1)
            .layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);

        let color_refs = [color_ref];
        let mut subpass = vk::SubpassDescription::default()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(&color_refs);
        if depth_format.is_some() {
            subpass = subpass.depth_stencil_attachment(&depth_ref);
        }

        let stages = if depth_format.is_some() {
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
                | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS
        } else {
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
        };
        let dst_access = if depth_format.is_some() {
            vk::AccessFlags::COLOR_ATTACHMENT_WRITE
                | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE
        } else {
            vk::AccessFlags::COLOR_ATTACHMENT_WRITE
        };

        // The clear must not race a previous frame's presentation of
        // the same image.
        let dependency = vk::SubpassDependency::default()
            .src_subpass(vk::SUBPASS_EXTERNAL)
            .dst_subpass(0)
            .src_stage_mask(stages)
            .src_access_mask(vk::AccessFlags::NONE)
            .dst_stage_mask(stages)
            .dst_access_mask(dst_access);

        let subpasses = [subpass];
        let dependencies = [dependency];
        let create_info = vk::RenderPassCreateInfo::default()
            .attachments(&attachments)
            .subpasses(&subpasses)
            .dependencies(&dependencies);

        let render_pass = device.create_render_pass(&create_info, None)?;

        Ok(Self {
            render_pass,
            depth_format,
        })
    }

    /// Get the raw render pass handle.
    pub fn handle(&self) -> vk::RenderPass {
        self.render_pass
    }

    /// Whether the pass carries a depth attachment.
    pub fn has_depth(&self) -> bool {
        self.depth_format.is_some()
    }

    /// Clear values matching the attachment list.
    pub fn clear_values(&self) -> Vec<vk::ClearValue> {
        let mut clear_values = vec![vk::ClearValue {
            color: vk::ClearColorValue {
                float32: [0.0, 0.0, 0.0, 1.0],
            },
        }];

        if self.depth_format.is_some() {
            clear_values.push(vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue {
                    depth: 1.0,
                    stencil: 0,
                },
            });
        }

        clear_values
    }

    /// Destroy the render pass.
    ///
    /// # Safety
    /// The device must be valid and the pass must not be in use.
    pub unsafe fn destroy(&self, device: &ash::Device) {
        device.destroy_render_pass(self.render_pass, None);
    }
}
