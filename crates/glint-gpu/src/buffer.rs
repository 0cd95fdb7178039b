//! Buffer creation and staging uploads.
//!
//! Memory is bound directly through the device context's memory-type
//! resolver; there is no sub-allocation layer.

use crate::command::{self, CommandPool};
use crate::device::DeviceContext;
use crate::error::{GpuError, Result};
use ash::vk;

/// A buffer with its backing device memory.
pub struct Buffer {
    /// The buffer handle.
    pub buffer: vk::Buffer,
    /// The backing memory.
    pub memory: vk::DeviceMemory,
    /// Allocated size in bytes.
    pub size: vk::DeviceSize,
    mapped: Option<*mut u8>,
}

impl Buffer {
    /// Create a buffer and bind freshly allocated memory to it.
    pub fn new(
        device_ctx: &DeviceContext,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        properties: vk::MemoryPropertyFlags,
    ) -> Result<Self> {
        let device = device_ctx.device();

        let buffer_info = vk::BufferCreateInfo::default()
            .size(size)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe { device.create_buffer(&buffer_info, None) }?;

        let requirements = unsafe { device.get_buffer_memory_requirements(buffer) };
        let memory_type =
            device_ctx.find_memory_type(requirements.memory_type_bits, properties)?;

        let alloc_info = vk::MemoryAllocateInfo::default()
            .allocation_size(requirements.size)
            .memory_type_index(memory_type);

        let memory = match unsafe { device.allocate_memory(&alloc_info, None) } {
            Ok(memory) => memory,
            Err(e) => {
                unsafe { device.destroy_buffer(buffer, None) };
                return Err(GpuError::from(e));
            }
        };

        unsafe { device.bind_buffer_memory(buffer, memory, 0) }?;

        Ok(Self {
            buffer,
            memory,
            size,
            mapped: None,
        })
    }

    /// Map the whole buffer persistently. Host-visible memory only.
    ///
    /// The mapping stays valid until [`Buffer::destroy`]; there is no
    /// per-frame map/unmap.
    pub fn map(&mut self, device: &ash::Device) -> Result<*mut u8> {
        if let Some(ptr) = self.mapped {
            return Ok(ptr);
        }

        let ptr = unsafe {
            device.map_memory(self.memory, 0, self.size, vk::MemoryMapFlags::empty())
        }? as *mut u8;

        self.mapped = Some(ptr);
        Ok(ptr)
    }

    /// Persistently mapped pointer, when [`Buffer::map`] has been
    /// called.
    pub fn mapped_ptr(&self) -> Option<*mut u8> {
        self.mapped
    }

    /// Copy a Pod value into the mapped buffer.
    pub fn write_pod<T: bytemuck::Pod>(&self, value: &T) -> Result<()> {
        let ptr = self
            .mapped
            .ok_or_else(|| GpuError::Other("Buffer is not mapped".to_string()))?;

        let bytes = bytemuck::bytes_of(value);
        if bytes.len() as vk::DeviceSize > self.size {
            return Err(GpuError::Other("Data too large for buffer".to_string()));
        }

        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr, bytes.len());
        }

        Ok(())
    }

    /// Destroy the buffer and free its memory.
    ///
    /// # Safety
    /// The device must be valid and the buffer must not be in use.
    pub unsafe fn destroy(&mut self, device: &ash::Device) {
        if self.mapped.take().is_some() {
            device.unmap_memory(self.memory);
        }
        device.destroy_buffer(self.buffer, None);
        device.free_memory(self.memory, None);
        self.buffer = vk::Buffer::null();
        self.memory = vk::DeviceMemory::null();
    }
}

/// Upload bytes into a new device-local buffer through a staging copy.
///
/// The staging buffer is host-visible, filled on the CPU, copied with a
/// one-time command buffer, and freed before returning. Used once at
/// startup for the static geometry; the result is immutable.
pub fn upload_via_staging(
    device_ctx: &DeviceContext,
    pool: &CommandPool,
    queue: vk::Queue,
    bytes: &[u8],
    usage: vk::BufferUsageFlags,
) -> Result<Buffer> {
    let device = device_ctx.device();
    let size = bytes.len() as vk::DeviceSize;

    let mut staging = Buffer::new(
        device_ctx,
        size,
        vk::BufferUsageFlags::TRANSFER_SRC,
        vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
    )?;

    let ptr = staging.map(device)?;
    unsafe {
        std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr, bytes.len());
    }

    let target = Buffer::new(
        device_ctx,
        size,
        vk::BufferUsageFlags::TRANSFER_DST | usage,
        vk::MemoryPropertyFlags::DEVICE_LOCAL,
    )?;

    unsafe {
        command::execute_single_time_commands(device, pool, queue, |cmd| {
            let region = vk::BufferCopy::default().size(size);
            device.cmd_copy_buffer(cmd, staging.buffer, target.buffer, &[region]);
        })?;

        staging.destroy(device);
    }

    Ok(target)
}
