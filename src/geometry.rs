//! CPU-side geometry, material and image data produced by model import.
//!
//! Nothing in here touches the GPU until [`RawGeometry::upload`] or the
//! renderer turns an [`ImageData`] into a texture, which keeps import work on
//! the loader thread and the render thread free.

use crate::gpu::GpuContext;
use crate::mesh::{Mesh, Vertex3d};
use glam::{Mat4, Vec3};

/// Raw geometry data before GPU upload.
#[derive(Clone, Debug, Default)]
pub struct RawGeometry {
    /// Vertex data (position, normal, UV).
    pub vertices: Vec<Vertex3d>,
    /// Triangle indices (every 3 indices form a triangle).
    pub indices: Vec<u32>,
}

impl RawGeometry {
    pub fn new(vertices: Vec<Vertex3d>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.indices.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Axis-aligned bounds as `(min, max)`.
    ///
    /// Empty geometry yields inverted infinite bounds.
    pub fn bounds(&self) -> (Vec3, Vec3) {
        self.transformed_bounds(Mat4::IDENTITY)
    }

    /// Bounds of the geometry after applying `matrix` to every vertex.
    pub fn transformed_bounds(&self, matrix: Mat4) -> (Vec3, Vec3) {
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);

        for v in &self.vertices {
            let p = matrix.transform_point3(Vec3::from(v.position));
            min = min.min(p);
            max = max.max(p);
        }

        (min, max)
    }

    /// Recompute smooth vertex normals from the triangle list.
    ///
    /// Used for primitives that ship without a normal attribute.
    pub fn recalculate_normals(&mut self) {
        for v in &mut self.vertices {
            v.normal = [0.0, 0.0, 0.0];
        }

        for tri in self.indices.chunks_exact(3) {
            let [i0, i1, i2] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            if i0 >= self.vertices.len() || i1 >= self.vertices.len() || i2 >= self.vertices.len() {
                continue;
            }

            let p0 = Vec3::from(self.vertices[i0].position);
            let p1 = Vec3::from(self.vertices[i1].position);
            let p2 = Vec3::from(self.vertices[i2].position);

            // Area-weighted: the cross product length is twice the face area
            let face_normal = (p1 - p0).cross(p2 - p0);

            for i in [i0, i1, i2] {
                let n = Vec3::from(self.vertices[i].normal) + face_normal;
                self.vertices[i].normal = n.into();
            }
        }

        for v in &mut self.vertices {
            v.normal = Vec3::from(v.normal).normalize_or_zero().into();
        }
    }

    pub fn upload(&self, gpu: &GpuContext) -> Mesh {
        Mesh::new(gpu, &self.vertices, &self.indices)
    }
}

/// Decoded RGBA8 image, row-major, sRGB encoded.
#[derive(Clone, Debug)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl ImageData {
    /// Expand tightly packed pixels with `channels` components per pixel to RGBA8.
    ///
    /// Grey and grey-alpha are splatted to RGB. Returns `None` when the buffer
    /// length does not match the dimensions.
    pub fn from_channels(width: u32, height: u32, channels: usize, pixels: &[u8]) -> Option<Self> {
        let count = width as usize * height as usize;
        if channels == 0 || channels > 4 || pixels.len() != count * channels {
            return None;
        }

        let mut rgba = Vec::with_capacity(count * 4);
        for px in pixels.chunks_exact(channels) {
            let [r, g, b, a] = match *px {
                [l] => [l, l, l, 255],
                [l, a] => [l, l, l, a],
                [r, g, b] => [r, g, b, 255],
                [r, g, b, a] => [r, g, b, a],
                _ => [0, 0, 0, 255],
            };
            rgba.extend_from_slice(&[r, g, b, a]);
        }

        Some(Self {
            width,
            height,
            rgba,
        })
    }
}

/// Surface appearance of one mesh node.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
    /// Linear RGBA multiplier.
    pub base_color: [f32; 4],
    /// Index into the owning model's image list.
    pub texture: Option<usize>,
    pub double_sided: bool,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            base_color: [1.0, 1.0, 1.0, 1.0],
            texture: None,
            double_sided: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_geometry_bounds() {
        let vertices = vec![
            Vertex3d::new([0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0]),
            Vertex3d::new([1.0, 2.0, 3.0], [0.0, 1.0, 0.0], [0.0, 0.0]),
            Vertex3d::new([-1.0, -1.0, -1.0], [0.0, 1.0, 0.0], [0.0, 0.0]),
        ];
        let indices = vec![0, 1, 2];
        let geom = RawGeometry::new(vertices, indices);

        let (min, max) = geom.bounds();
        assert_eq!(min, Vec3::new(-1.0, -1.0, -1.0));
        assert_eq!(max, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn transformed_bounds_follow_the_matrix() {
        let vertices = vec![
            Vertex3d::new([-1.0, -1.0, -1.0], [0.0, 1.0, 0.0], [0.0, 0.0]),
            Vertex3d::new([1.0, 1.0, 1.0], [0.0, 1.0, 0.0], [0.0, 0.0]),
        ];
        let geom = RawGeometry::new(vertices, vec![0, 1, 0]);
        let matrix = Mat4::from_scale_rotation_translation(
            Vec3::new(2.0, 1.0, 1.0),
            glam::Quat::IDENTITY,
            Vec3::new(10.0, 0.0, 0.0),
        );

        let (min, max) = geom.transformed_bounds(matrix);
        assert_eq!(min, Vec3::new(8.0, -1.0, -1.0));
        assert_eq!(max, Vec3::new(12.0, 1.0, 1.0));
    }

    #[test]
    fn normals_point_out_of_a_ccw_triangle() {
        let vertices = vec![
            Vertex3d::new([0.0, 0.0, 0.0], [0.0; 3], [0.0, 0.0]),
            Vertex3d::new([1.0, 0.0, 0.0], [0.0; 3], [0.0, 0.0]),
            Vertex3d::new([0.0, 1.0, 0.0], [0.0; 3], [0.0, 0.0]),
        ];
        let mut geom = RawGeometry::new(vertices, vec![0, 1, 2]);
        geom.recalculate_normals();

        for v in &geom.vertices {
            assert_eq!(v.normal, [0.0, 0.0, 1.0]);
        }
    }

    #[test]
    fn images_expand_to_rgba() {
        let grey = ImageData::from_channels(2, 1, 1, &[10, 20]).unwrap();
        assert_eq!(grey.rgba, vec![10, 10, 10, 255, 20, 20, 20, 255]);

        let rgb = ImageData::from_channels(1, 1, 3, &[1, 2, 3]).unwrap();
        assert_eq!(rgb.rgba, vec![1, 2, 3, 255]);

        assert!(ImageData::from_channels(2, 2, 3, &[0; 5]).is_none());
    }
}
