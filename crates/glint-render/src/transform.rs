//! Per-frame transform uniform.

use ash::vk;
use bytemuck::{Pod, Zeroable};
use glam::Mat4;

/// Model, view, and projection matrices as laid out in the vertex
/// shader's uniform block.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct TransformUbo {
    pub model: Mat4,
    pub view: Mat4,
    pub proj: Mat4,
}

impl TransformUbo {
    /// Byte size of the uniform block.
    pub const SIZE: u64 = std::mem::size_of::<Self>() as u64;

    /// Compute the transforms for a point in time and drawable size.
    ///
    /// The model spins around Z at a quarter turn per four seconds,
    /// viewed from (2, 2, 2) looking at the origin with Z up. The
    /// projection's Y axis is flipped for Vulkan's inverted clip
    /// space.
    pub fn compute(elapsed_secs: f32, extent: vk::Extent2D) -> Self {
        let angle = elapsed_secs * 0.25 * 90f32.to_radians();
        let model = Mat4::from_rotation_z(angle);

        let view = Mat4::look_at_rh(
            glam::Vec3::new(2.0, 2.0, 2.0),
            glam::Vec3::ZERO,
            glam::Vec3::Z,
        );

        let aspect = extent.width as f32 / extent.height.max(1) as f32;
        let mut proj = Mat4::perspective_rh(45f32.to_radians(), aspect, 0.1, 10.0);
        proj.y_axis.y *= -1.0;

        Self { model, view, proj }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn extent(width: u32, height: u32) -> vk::Extent2D {
        vk::Extent2D { width, height }
    }

    #[test]
    fn model_is_identity_at_time_zero() {
        let ubo = TransformUbo::compute(0.0, extent(800, 600));
        assert!(ubo.model.abs_diff_eq(Mat4::IDENTITY, 1e-6));
    }

    #[test]
    fn model_rotates_quarter_turn_in_four_seconds() {
        let ubo = TransformUbo::compute(4.0, extent(800, 600));
        let rotated = ubo.model.transform_point3(Vec3::X);
        assert!(rotated.abs_diff_eq(Vec3::Y, 1e-5));
    }

    #[test]
    fn projection_y_axis_is_flipped() {
        let ubo = TransformUbo::compute(1.0, extent(800, 600));
        assert!(ubo.proj.y_axis.y < 0.0);
    }

    #[test]
    fn view_moves_eye_to_origin() {
        let ubo = TransformUbo::compute(0.0, extent(800, 600));
        let eye = ubo.view.transform_point3(Vec3::new(2.0, 2.0, 2.0));
        assert!(eye.abs_diff_eq(Vec3::ZERO, 1e-5));
    }

    #[test]
    fn aspect_tracks_drawable_size() {
        let wide = TransformUbo::compute(0.0, extent(1600, 400));
        let square = TransformUbo::compute(0.0, extent(500, 500));
        // Wider drawable compresses X more than a square one.
        assert!(wide.proj.x_axis.x < square.proj.x_axis.x);
    }

    #[test]
    fn zero_height_does_not_produce_nan() {
        let ubo = TransformUbo::compute(0.0, extent(800, 0));
        assert!(ubo.proj.x_axis.is_finite());
    }
}
