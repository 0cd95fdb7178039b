//! Synchronization primitives.

use crate::error::{GpuError, Result};
use ash::vk;

/// Create a binary semaphore.
///
/// # Safety
/// The device must be valid.
pub unsafe fn create_semaphore(device: &ash::Device) -> Result<vk::Semaphore> {
    let create_info = vk::SemaphoreCreateInfo::default();
    let semaphore = device.create_semaphore(&create_info, None)?;
    Ok(semaphore)
}

/// Create a fence, optionally already signaled.
///
/// # Safety
/// The device must be valid.
pub unsafe fn create_fence(device: &ash::Device, signaled: bool) -> Result<vk::Fence> {
    let flags = if signaled {
        vk::FenceCreateFlags::SIGNALED
    } else {
        vk::FenceCreateFlags::empty()
    };

    let create_info = vk::FenceCreateInfo::default().flags(flags);
    let fence = device.create_fence(&create_info, None)?;
    Ok(fence)
}

/// Block until the fence signals.
///
/// A timeout is a driver-level hang, not recoverable in-process, and
/// maps to [`GpuError::FenceWaitTimeout`].
///
/// # Safety
/// The device and fence must be valid.
pub unsafe fn wait_for_fence(
    device: &ash::Device,
    fence: vk::Fence,
    timeout_ns: u64,
) -> Result<()> {
    match device.wait_for_fences(&[fence], true, timeout_ns) {
        Ok(()) => Ok(()),
        Err(vk::Result::TIMEOUT) => Err(GpuError::FenceWaitTimeout),
        Err(e) => Err(GpuError::from(e)),
    }
}

/// Reset a fence to unsignaled.
///
/// Must only be called after a successful wait on the same fence.
///
/// # Safety
/// The device and fence must be valid.
pub unsafe fn reset_fence(device: &ash::Device, fence: vk::Fence) -> Result<()> {
    device.reset_fences(&[fence])?;
    Ok(())
}

/// Per-ring-slot synchronization bundle.
///
/// The fence is created signaled so the first wait on a fresh slot
/// returns immediately.
pub struct SlotSync {
    /// Signaled by the presentation engine when the acquired image is
    /// ready to be written.
    pub image_available: vk::Semaphore,
    /// Signaled by the graphics queue when rendering finishes; waited
    /// on by present.
    pub render_finished: vk::Semaphore,
    /// Signaled when the slot's submission completes on the GPU.
    pub in_flight: vk::Fence,
}

impl SlotSync {
    /// Create the slot's synchronization objects.
    ///
    /// # Safety
    /// The device must be valid.
    pub unsafe fn new(device: &ash::Device) -> Result<Self> {
        Ok(Self {
            image_available: create_semaphore(device)?,
            render_finished: create_semaphore(device)?,
            in_flight: create_fence(device, true)?,
        })
    }

    /// Destroy the slot's synchronization objects.
    ///
    /// # Safety
    /// The device must be valid and the slot must not be in flight.
    pub unsafe fn destroy(&self, device: &ash::Device) {
        device.destroy_semaphore(self.image_available, None);
        device.destroy_semaphore(self.render_finished, None);
        device.destroy_fence(self.in_flight, None);
    }
}
