//! GLSL shaders and their compiled SPIR-V bytecode.
//!
//! Shaders are compiled at build time using shaderc and embedded as
//! raw bytes; the GPU layer handles word alignment when building
//! shader modules.

/// Compiled vertex shader (raw SPIR-V bytes).
pub static VERTEX_SHADER: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/shader.vert.spv"));

/// Compiled fragment shader (raw SPIR-V bytes).
pub static FRAGMENT_SHADER: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/shader.frag.spv"));

#[cfg(test)]
mod tests {
    use super::*;

    const SPIRV_MAGIC: u32 = 0x0723_0203;

    fn magic(bytes: &[u8]) -> u32 {
        u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    #[test]
    fn embedded_shaders_are_spirv() {
        for shader in [VERTEX_SHADER, FRAGMENT_SHADER] {
            assert!(shader.len() >= 20);
            assert_eq!(shader.len() % 4, 0);
            assert_eq!(magic(shader), SPIRV_MAGIC);
        }
    }
}
