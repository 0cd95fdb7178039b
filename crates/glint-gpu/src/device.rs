//! Device context: instance, physical device, logical device, queues.

use crate::error::{GpuError, Result};
use crate::instance::{create_instance, DebugMessenger};
use crate::surface::SurfaceContext;
use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::collections::HashSet;
use std::ffi::{c_char, CStr};

/// Device extensions the renderer requires.
fn required_device_extensions() -> Vec<&'static CStr> {
    vec![ash::khr::swapchain::NAME]
}

/// Owns the Vulkan instance, the logical device, and its queues.
///
/// The graphics and presentation queues may coincide; when their
/// families differ, swapchain images must use concurrent sharing.
pub struct DeviceContext {
    // Entry must be kept alive for the lifetime of the context
    #[allow(dead_code)]
    entry: ash::Entry,
    instance: ash::Instance,
    debug_messenger: Option<DebugMessenger>,
    physical_device: vk::PhysicalDevice,
    device: ash::Device,
    graphics_queue_family: u32,
    present_queue_family: u32,
    graphics_queue: vk::Queue,
    present_queue: vk::Queue,
}

impl DeviceContext {
    /// Create the device context and the presentation surface for a
    /// window.
    ///
    /// The surface is created before physical device selection because
    /// suitability includes presentation support on that surface.
    pub fn new<W>(
        window: &W,
        app_name: &str,
        enable_validation: bool,
    ) -> Result<(Self, SurfaceContext)>
    where
        W: HasDisplayHandle + HasWindowHandle,
    {
        let entry = unsafe { ash::Entry::load() }
            .map_err(|e| GpuError::Other(format!("Failed to load Vulkan: {e}")))?;

        let instance = unsafe { create_instance(&entry, app_name, enable_validation) }?;

        let debug_messenger = if enable_validation {
            Some(unsafe { DebugMessenger::new(&entry, &instance) }?)
        } else {
            None
        };

        let display = window
            .display_handle()
            .map_err(|e| GpuError::SurfaceCreation(format!("Failed to get display handle: {e}")))?;
        let window_handle = window
            .window_handle()
            .map_err(|e| GpuError::SurfaceCreation(format!("Failed to get window handle: {e}")))?;

        let surface = unsafe {
            ash_window::create_surface(
                &entry,
                &instance,
                display.as_raw(),
                window_handle.as_raw(),
                None,
            )
        }
        .map_err(|e| GpuError::SurfaceCreation(e.to_string()))?;

        let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);

        let (physical_device, families) =
            unsafe { select_physical_device(&instance, &surface_loader, surface) }?;

        let properties = unsafe { instance.get_physical_device_properties(physical_device) };
        let device_name = unsafe { CStr::from_ptr(properties.device_name.as_ptr()) };
        tracing::info!("Selected GPU: {}", device_name.to_string_lossy());

        let (device, graphics_queue, present_queue) =
            unsafe { create_device(&instance, physical_device, families) }?;

        let swapchain_loader = ash::khr::swapchain::Device::new(&instance, &device);

        let surface_ctx = SurfaceContext {
            surface,
            surface_loader,
            swapchain_loader,
        };

        Ok((
            Self {
                entry,
                instance,
                debug_messenger,
                physical_device,
                device,
                graphics_queue_family: families.graphics,
                present_queue_family: families.present,
                graphics_queue,
                present_queue,
            },
            surface_ctx,
        ))
    }

    /// Get the Vulkan device handle.
    pub fn device(&self) -> &ash::Device {
        &self.device
    }

    /// Get the physical device handle.
    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    /// Get the Vulkan instance handle.
    pub fn instance(&self) -> &ash::Instance {
        &self.instance
    }

    /// Get the graphics queue.
    pub fn graphics_queue(&self) -> vk::Queue {
        self.graphics_queue
    }

    /// Get the presentation queue.
    pub fn present_queue(&self) -> vk::Queue {
        self.present_queue
    }

    /// Get the graphics queue family index.
    pub fn graphics_queue_family(&self) -> u32 {
        self.graphics_queue_family
    }

    /// Get the presentation queue family index.
    pub fn present_queue_family(&self) -> u32 {
        self.present_queue_family
    }

    /// Resolve a memory type index for the given requirements.
    ///
    /// `type_mask` comes from `vk::MemoryRequirements::memory_type_bits`.
    pub fn find_memory_type(
        &self,
        type_mask: u32,
        properties: vk::MemoryPropertyFlags,
    ) -> Result<u32> {
        let mem_properties = unsafe {
            self.instance
                .get_physical_device_memory_properties(self.physical_device)
        };

        for i in 0..mem_properties.memory_type_count {
            let supported = type_mask & (1 << i) != 0;
            let flags = mem_properties.memory_types[i as usize].property_flags;
            if supported && flags.contains(properties) {
                return Ok(i);
            }
        }

        Err(GpuError::NoSuitableMemoryType { type_mask })
    }

    /// Block until the device finishes all submitted work.
    pub fn wait_idle(&self) -> Result<()> {
        unsafe {
            self.device.device_wait_idle()?;
        }
        Ok(())
    }
}

impl Drop for DeviceContext {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();
            self.device.destroy_device(None);
            if let Some(messenger) = &self.debug_messenger {
                messenger.destroy();
            }
            self.instance.destroy_instance(None);
        }
    }
}

/// Graphics and presentation queue family indices.
#[derive(Clone, Copy)]
struct QueueFamilyIndices {
    graphics: u32,
    present: u32,
}

/// Pick the first physical device that can render and present.
///
/// # Safety
/// The instance, surface loader, and surface must be valid.
unsafe fn select_physical_device(
    instance: &ash::Instance,
    surface_loader: &ash::khr::surface::Instance,
    surface: vk::SurfaceKHR,
) -> Result<(vk::PhysicalDevice, QueueFamilyIndices)> {
    let devices = instance.enumerate_physical_devices()?;

    for device in devices {
        if !supports_required_extensions(instance, device)? {
            continue;
        }

        let Some(families) = find_queue_families(instance, surface_loader, surface, device)?
        else {
            continue;
        };

        // The surface must report at least one format and present mode.
        let formats = surface_loader.get_physical_device_surface_formats(device, surface)?;
        let present_modes =
            surface_loader.get_physical_device_surface_present_modes(device, surface)?;
        if formats.is_empty() || present_modes.is_empty() {
            continue;
        }

        return Ok((device, families));
    }

    Err(GpuError::NoSuitableDevice)
}

/// Find a graphics-capable family and a present-capable family.
///
/// # Safety
/// All handles must be valid.
unsafe fn find_queue_families(
    instance: &ash::Instance,
    surface_loader: &ash::khr::surface::Instance,
    surface: vk::SurfaceKHR,
    device: vk::PhysicalDevice,
) -> Result<Option<QueueFamilyIndices>> {
    let queue_families = instance.get_physical_device_queue_family_properties(device);

    let mut graphics = None;
    let mut present = None;

    for (i, family) in queue_families.iter().enumerate() {
        let i = i as u32;

        if family.queue_flags.contains(vk::QueueFlags::GRAPHICS) && graphics.is_none() {
            graphics = Some(i);
        }

        if surface_loader.get_physical_device_surface_support(device, i, surface)?
            && present.is_none()
        {
            present = Some(i);
        }

        if graphics.is_some() && present.is_some() {
            break;
        }
    }

    Ok(match (graphics, present) {
        (Some(graphics), Some(present)) => Some(QueueFamilyIndices { graphics, present }),
        _ => None,
    })
}

/// Check that the device exposes every required extension.
///
/// # Safety
/// The instance and device must be valid.
unsafe fn supports_required_extensions(
    instance: &ash::Instance,
    device: vk::PhysicalDevice,
) -> Result<bool> {
    let available = instance.enumerate_device_extension_properties(device)?;

    let supported = required_device_extensions().iter().all(|required| {
        available
            .iter()
            .any(|ext| CStr::from_ptr(ext.extension_name.as_ptr()) == *required)
    });

    Ok(supported)
}

/// Create the logical device and retrieve the graphics and present
/// queues.
///
/// # Safety
/// The instance and physical device must be valid.
unsafe fn create_device(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
    families: QueueFamilyIndices,
) -> Result<(ash::Device, vk::Queue, vk::Queue)> {
    let mut unique_families = HashSet::new();
    unique_families.insert(families.graphics);
    unique_families.insert(families.present);

    let queue_priority = 1.0_f32;
    let queue_create_infos: Vec<vk::DeviceQueueCreateInfo> = unique_families
        .iter()
        .map(|&family| {
            vk::DeviceQueueCreateInfo::default()
                .queue_family_index(family)
                .queue_priorities(std::slice::from_ref(&queue_priority))
        })
        .collect();

    let extensions = required_device_extensions();
    let extension_names: Vec<*const c_char> = extensions.iter().map(|ext| ext.as_ptr()).collect();

    let features = vk::PhysicalDeviceFeatures::default();

    let device_create_info = vk::DeviceCreateInfo::default()
        .queue_create_infos(&queue_create_infos)
        .enabled_extension_names(&extension_names)
        .enabled_features(&features);

    let device = instance.create_device(physical_device, &device_create_info, None)?;

    let graphics_queue = device.get_device_queue(families.graphics, 0);
    let present_queue = device.get_device_queue(families.present, 0);

    Ok((device, graphics_queue, present_queue))
}
