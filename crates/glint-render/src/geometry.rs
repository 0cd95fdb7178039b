//! Static quad geometry and its device-local buffers.

use ash::vk;
use bytemuck::{Pod, Zeroable};
use glint_gpu::{buffer::upload_via_staging, Buffer, CommandPool, DeviceContext, Result};

/// Interleaved vertex as consumed by the vertex shader.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct Vertex {
    pub pos: [f32; 2],
    pub color: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    /// Binding description for the interleaved vertex stream.
    pub fn binding_description() -> vk::VertexInputBindingDescription {
        vk::VertexInputBindingDescription::default()
            .binding(0)
            .stride(std::mem::size_of::<Self>() as u32)
            .input_rate(vk::VertexInputRate::VERTEX)
    }

    /// Attribute descriptions for position, color, and texture
    /// coordinates.
    pub fn attribute_descriptions() -> Vec<vk::VertexInputAttributeDescription> {
        vec![
            vk::VertexInputAttributeDescription::default()
                .binding(0)
                .location(0)
                .format(vk::Format::R32G32_SFLOAT)
                .offset(std::mem::offset_of!(Vertex, pos) as u32),
            vk::VertexInputAttributeDescription::default()
                .binding(0)
                .location(1)
                .format(vk::Format::R32G32B32_SFLOAT)
                .offset(std::mem::offset_of!(Vertex, color) as u32),
            vk::VertexInputAttributeDescription::default()
                .binding(0)
                .location(2)
                .format(vk::Format::R32G32_SFLOAT)
                .offset(std::mem::offset_of!(Vertex, uv) as u32),
        ]
    }
}

/// Unit quad in the XY plane, one color per corner, textured across
/// its full area.
pub const QUAD_VERTICES: [Vertex; 4] = [
    Vertex {
        pos: [-0.5, -0.5],
        color: [1.0, 0.0, 0.0],
        uv: [1.0, 0.0],
    },
    Vertex {
        pos: [0.5, -0.5],
        color: [0.0, 1.0, 0.0],
        uv: [0.0, 0.0],
    },
    Vertex {
        pos: [0.5, 0.5],
        color: [0.0, 0.0, 1.0],
        uv: [0.0, 1.0],
    },
    Vertex {
        pos: [-0.5, 0.5],
        color: [1.0, 1.0, 1.0],
        uv: [1.0, 1.0],
    },
];

/// Two counter-clockwise triangles covering the quad.
pub const QUAD_INDICES: [u16; 6] = [0, 1, 2, 2, 3, 0];

/// Edge length of the built-in texture.
pub const DEFAULT_TEXTURE_SIZE: u32 = 64;

/// Generate the built-in checkerboard texture as tightly packed RGBA8
/// pixels.
///
/// Image decoding lives outside the renderer; this is the default
/// asset used when no decoded pixels are supplied, like the built-in
/// quad.
pub fn default_texture_pixels() -> Vec<u8> {
    let size = DEFAULT_TEXTURE_SIZE as usize;
    let cell = size / 8;
    let mut pixels = Vec::with_capacity(size * size * 4);

    for y in 0..size {
        for x in 0..size {
            let light = (x / cell + y / cell) % 2 == 0;
            let value = if light { 0xe0 } else { 0x40 };
            pixels.extend_from_slice(&[value, value, value, 0xff]);
        }
    }

    pixels
}

/// Device-local vertex and index buffers for the static quad.
pub struct GeometryBuffers {
    pub vertex: Buffer,
    pub index: Buffer,
    index_count: u32,
}

impl GeometryBuffers {
    /// Upload vertex and index data through staging buffers.
    ///
    /// The buffers are immutable once uploaded.
    pub fn upload(
        device_ctx: &DeviceContext,
        pool: &CommandPool,
        vertices: &[Vertex],
        indices: &[u16],
    ) -> Result<Self> {
        let queue = device_ctx.graphics_queue();

        let vertex = upload_via_staging(
            device_ctx,
            pool,
            queue,
            bytemuck::cast_slice(vertices),
            vk::BufferUsageFlags::VERTEX_BUFFER,
        )?;

        let index = upload_via_staging(
            device_ctx,
            pool,
            queue,
            bytemuck::cast_slice(indices),
            vk::BufferUsageFlags::INDEX_BUFFER,
        )?;

        Ok(Self {
            vertex,
            index,
            index_count: indices.len() as u32,
        })
    }

    /// Number of indices to draw.
    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// Destroy both buffers.
    ///
    /// # Safety
    /// The device must be idle with respect to these buffers.
    pub unsafe fn destroy(&mut self, device: &ash::Device) {
        self.vertex.destroy(device);
        self.index.destroy(device);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_layout_matches_shader_inputs() {
        let attrs = Vertex::attribute_descriptions();
        assert_eq!(attrs.len(), 3);
        assert_eq!(attrs[0].format, vk::Format::R32G32_SFLOAT);
        assert_eq!(attrs[0].offset, 0);
        assert_eq!(attrs[1].format, vk::Format::R32G32B32_SFLOAT);
        assert_eq!(attrs[1].offset, 8);
        assert_eq!(attrs[2].format, vk::Format::R32G32_SFLOAT);
        assert_eq!(attrs[2].offset, 20);
        assert_eq!(Vertex::binding_description().stride, 28);
    }

    #[test]
    fn quad_indices_reference_existing_vertices() {
        for &i in &QUAD_INDICES {
            assert!((i as usize) < QUAD_VERTICES.len());
        }
    }

    #[test]
    fn default_texture_is_tightly_packed_rgba() {
        let pixels = default_texture_pixels();
        let size = DEFAULT_TEXTURE_SIZE as usize;
        assert_eq!(pixels.len(), size * size * 4);

        // Opaque everywhere, and the checker pattern actually varies.
        assert!(pixels.chunks_exact(4).all(|p| p[3] == 0xff));
        let first = pixels[0];
        assert!(pixels.chunks_exact(4).any(|p| p[0] != first));
    }
}
