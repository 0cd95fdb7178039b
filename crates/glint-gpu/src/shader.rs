//! Shader module creation from loader-supplied SPIR-V blobs.

use crate::error::{GpuError, Result};
use ash::vk;
use std::io::Cursor;

/// Decode a raw SPIR-V byte blob into aligned words.
///
/// The bytes come from the external asset loader and are treated as
/// opaque; only alignment and magic-number validation happen here.
pub fn spirv_words(bytes: &[u8]) -> Result<Vec<u32>> {
    let mut cursor = Cursor::new(bytes);
    ash::util::read_spv(&mut cursor)
        .map_err(|e| GpuError::ShaderCompilation(format!("Invalid SPIR-V blob: {e}")))
}

/// Create a shader module from SPIR-V words.
///
/// # Safety
/// The device must be valid.
pub unsafe fn create_shader_module(
    device: &ash::Device,
    words: &[u32],
) -> Result<vk::ShaderModule> {
    let create_info = vk::ShaderModuleCreateInfo::default().code(words);

    let module = device
        .create_shader_module(&create_info, None)
        .map_err(|e| GpuError::ShaderCompilation(e.to_string()))?;

    Ok(module)
}
