//! Per-frame resource ring.
//!
//! The ring holds one slot per frame that may be in flight at once.
//! Each slot owns the resources the CPU mutates while recording a
//! frame: its command buffer, a persistently mapped uniform buffer,
//! the descriptor set pointing at that buffer, and the slot's
//! synchronization objects. Slots are reused round-robin; the slot's
//! fence gates reuse.

use crate::transform::TransformUbo;
use ash::vk;
use glint_gpu::{
    write_combined_image_sampler, write_uniform_buffer, Buffer, CommandPool, DescriptorPool,
    DeviceContext, Result, SlotSync, Texture,
};

/// Number of frames the CPU may record ahead of the GPU.
pub const MAX_FRAMES_IN_FLIGHT: usize = 2;

/// One slot of the frame ring.
pub struct RingSlot {
    /// Command buffer re-recorded every time the slot is reused.
    pub command_buffer: vk::CommandBuffer,
    /// Persistently mapped uniform buffer for the slot's transforms.
    pub uniform: Buffer,
    /// Descriptor set bound to `uniform`.
    pub descriptor_set: vk::DescriptorSet,
    /// Semaphores and fence gating this slot.
    pub sync: SlotSync,
}

/// Fixed ring of [`MAX_FRAMES_IN_FLIGHT`] slots.
pub struct FrameRing {
    slots: Vec<RingSlot>,
    descriptor_pool: DescriptorPool,
    descriptor_set_layout: vk::DescriptorSetLayout,
}

impl FrameRing {
    /// Create the ring: command buffers, mapped uniform buffers,
    /// descriptor sets, and sync objects for every slot. Every slot's
    /// set points at the shared texture.
    pub fn new(
        device_ctx: &DeviceContext,
        pool: &CommandPool,
        descriptor_set_layout: vk::DescriptorSetLayout,
        texture: &Texture,
    ) -> Result<Self> {
        let device = device_ctx.device();
        let count = MAX_FRAMES_IN_FLIGHT as u32;

        let command_buffers = unsafe { pool.allocate_command_buffers(device, count) }?;

        let pool_sizes = [
            vk::DescriptorPoolSize::default()
                .ty(vk::DescriptorType::UNIFORM_BUFFER)
                .descriptor_count(count),
            vk::DescriptorPoolSize::default()
                .ty(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                .descriptor_count(count),
        ];
        let descriptor_pool = unsafe { DescriptorPool::new(device, count, &pool_sizes) }?;

        let layouts = vec![descriptor_set_layout; MAX_FRAMES_IN_FLIGHT];
        let descriptor_sets = unsafe { descriptor_pool.allocate(device, &layouts) }?;

        let mut slots = Vec::with_capacity(MAX_FRAMES_IN_FLIGHT);
        for (command_buffer, descriptor_set) in command_buffers.into_iter().zip(descriptor_sets) {
            let mut uniform = Buffer::new(
                device_ctx,
                TransformUbo::SIZE,
                vk::BufferUsageFlags::UNIFORM_BUFFER,
                vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
            )?;
            uniform.map(device)?;

            unsafe {
                write_uniform_buffer(device, descriptor_set, 0, uniform.buffer, TransformUbo::SIZE);
                write_combined_image_sampler(
                    device,
                    descriptor_set,
                    1,
                    texture.view,
                    texture.sampler,
                );
            }

            let sync = unsafe { SlotSync::new(device) }?;

            slots.push(RingSlot {
                command_buffer,
                uniform,
                descriptor_set,
                sync,
            });
        }

        Ok(Self {
            slots,
            descriptor_pool,
            descriptor_set_layout,
        })
    }

    /// Number of slots in the ring.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Borrow a slot.
    pub fn slot(&self, index: usize) -> &RingSlot {
        &self.slots[index]
    }

    /// The layout the slots' descriptor sets were allocated with.
    pub fn descriptor_set_layout(&self) -> vk::DescriptorSetLayout {
        self.descriptor_set_layout
    }

    /// Destroy every slot's resources and the descriptor machinery.
    ///
    /// # Safety
    /// The device must be idle; no slot may be in flight.
    pub unsafe fn destroy(&mut self, device: &ash::Device) {
        for slot in &mut self.slots {
            slot.sync.destroy(device);
            slot.uniform.destroy(device);
        }
        self.slots.clear();

        self.descriptor_pool.destroy(device);
        device.destroy_descriptor_set_layout(self.descriptor_set_layout, None);
    }
}
