//! Geometry of the panorama sphere.
//!
//! The sphere is viewed from the inside. Latitude rings run from the north
//! pole (`v = 0`) to the south pole (`v = 1`); longitude wraps once around
//! with a duplicated seam column so `u` runs cleanly from 0 to 1.

use std::f32::consts::{PI, TAU};

/// A vertex of the panorama sphere.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SphereVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

impl SphereVertex {
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<SphereVertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            // position
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x3,
            },
            // uv
            wgpu::VertexAttribute {
                offset: 12,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x2,
            },
        ],
    };
}

/// CPU-side sphere mesh, ready to upload.
#[derive(Clone, Debug)]
pub struct SphereGeometry {
    pub vertices: Vec<SphereVertex>,
    pub indices: Vec<u32>,
}

impl SphereGeometry {
    /// A UV sphere with `segments` slices around and `segments` rings top to bottom.
    pub fn new(radius: f32, segments: u32) -> Self {
        let segments = segments.max(3);
        let rings = segments;
        let mut vertices = Vec::with_capacity(((rings + 1) * (segments + 1)) as usize);
        let mut indices = Vec::with_capacity((rings * segments * 6) as usize);

        for ring in 0..=rings {
            let v = ring as f32 / rings as f32;
            let theta = PI * v;
            let y = theta.cos();
            let ring_radius = theta.sin();

            for seg in 0..=segments {
                let u = seg as f32 / segments as f32;
                let phi = TAU * u;
                let x = -ring_radius * phi.cos();
                let z = ring_radius * phi.sin();

                vertices.push(SphereVertex {
                    position: [x * radius, y * radius, z * radius],
                    uv: [u, v],
                });
            }
        }

        for ring in 0..rings {
            for seg in 0..segments {
                let current = ring * (segments + 1) + seg;
                let next = current + segments + 1;

                indices.push(current);
                indices.push(next);
                indices.push(current + 1);

                indices.push(current + 1);
                indices.push(next);
                indices.push(next + 1);
            }
        }

        Self { vertices, indices }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn vertices_lie_on_the_sphere() {
        let sphere = SphereGeometry::new(50.0, 32);
        assert_eq!(sphere.vertices.len(), 33 * 33);
        assert_eq!(sphere.indices.len(), 32 * 32 * 6);

        for vertex in &sphere.vertices {
            let length = Vec3::from(vertex.position).length();
            assert!((length - 50.0).abs() < 1e-3, "{length}");
        }
    }

    #[test]
    fn indices_stay_in_bounds() {
        let sphere = SphereGeometry::new(1.0, 8);
        let count = sphere.vertices.len() as u32;
        assert!(sphere.indices.iter().all(|&i| i < count));
    }

    #[test]
    fn uv_spans_the_whole_image() {
        let sphere = SphereGeometry::new(1.0, 16);
        let first = sphere.vertices.first().unwrap();
        let last = sphere.vertices.last().unwrap();
        assert_eq!(first.uv, [0.0, 0.0]);
        assert_eq!(last.uv, [1.0, 1.0]);
        // North pole at v = 0.
        assert!((first.position[1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn degenerate_segment_count_is_raised() {
        let sphere = SphereGeometry::new(1.0, 1);
        assert_eq!(sphere.vertices.len(), 16);
    }
}
