//! Primitive shape builders.
//!
//! Each primitive is a serializable struct with an `apply()` method that
//! generates a [`VertexData`] buffer with positions, normals, uvs and indices.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use std::f32::consts::{PI, TAU};

use crate::{VertexData, VertexDataBuilder};

// ============================================================================
// Cuboid
// ============================================================================

/// Generates a box/cuboid centered at the origin.
///
/// Each face has its own vertices (not shared) for correct per-face normals,
/// so a box always has 24 vertices and 12 triangles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Cuboid {
    /// Size along the X axis.
    pub width: f32,
    /// Size along the Y axis.
    pub height: f32,
    /// Size along the Z axis.
    pub depth: f32,
}

impl Default for Cuboid {
    fn default() -> Self {
        Self {
            width: 1.0,
            height: 1.0,
            depth: 1.0,
        }
    }
}

impl Cuboid {
    /// Creates a new cuboid with the given dimensions.
    pub fn new(width: f32, height: f32, depth: f32) -> Self {
        Self {
            width,
            height,
            depth,
        }
    }

    /// Creates a unit cube (1x1x1).
    pub fn unit() -> Self {
        Self::default()
    }

    /// Creates a cube with equal sides.
    pub fn cube(size: f32) -> Self {
        Self::new(size, size, size)
    }

    /// Generates the cuboid.
    pub fn apply(&self) -> VertexData {
        let mut builder = VertexDataBuilder::new();

        let hx = self.width / 2.0;
        let hy = self.height / 2.0;
        let hz = self.depth / 2.0;

        let mut add_face = |positions: [Vec3; 4], normal: Vec3| {
            let uv = [
                Vec2::new(0.0, 0.0),
                Vec2::new(1.0, 0.0),
                Vec2::new(1.0, 1.0),
                Vec2::new(0.0, 1.0),
            ];
            let i0 = builder.vertex_with_normal_uv(positions[0], normal, uv[0]);
            let i1 = builder.vertex_with_normal_uv(positions[1], normal, uv[1]);
            let i2 = builder.vertex_with_normal_uv(positions[2], normal, uv[2]);
            let i3 = builder.vertex_with_normal_uv(positions[3], normal, uv[3]);
            builder.quad(i0, i1, i2, i3);
        };

        add_face(
            [
                Vec3::new(-hx, -hy, hz),
                Vec3::new(hx, -hy, hz),
                Vec3::new(hx, hy, hz),
                Vec3::new(-hx, hy, hz),
            ],
            Vec3::Z,
        );
        add_face(
            [
                Vec3::new(hx, -hy, -hz),
                Vec3::new(-hx, -hy, -hz),
                Vec3::new(-hx, hy, -hz),
                Vec3::new(hx, hy, -hz),
            ],
            Vec3::NEG_Z,
        );
        add_face(
            [
                Vec3::new(hx, -hy, hz),
                Vec3::new(hx, -hy, -hz),
                Vec3::new(hx, hy, -hz),
                Vec3::new(hx, hy, hz),
            ],
            Vec3::X,
        );
        add_face(
            [
                Vec3::new(-hx, -hy, -hz),
                Vec3::new(-hx, -hy, hz),
                Vec3::new(-hx, hy, hz),
                Vec3::new(-hx, hy, -hz),
            ],
            Vec3::NEG_X,
        );
        add_face(
            [
                Vec3::new(-hx, hy, hz),
                Vec3::new(hx, hy, hz),
                Vec3::new(hx, hy, -hz),
                Vec3::new(-hx, hy, -hz),
            ],
            Vec3::Y,
        );
        add_face(
            [
                Vec3::new(-hx, -hy, -hz),
                Vec3::new(hx, -hy, -hz),
                Vec3::new(hx, -hy, hz),
                Vec3::new(-hx, -hy, hz),
            ],
            Vec3::NEG_Y,
        );

        builder.build()
    }
}

// ============================================================================
// UvSphere
// ============================================================================

/// Generates a UV sphere centered at the origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UvSphere {
    /// Radius of the sphere.
    pub radius: f32,
    /// Number of horizontal divisions (longitude). Minimum 3.
    pub segments: u32,
    /// Number of vertical divisions (latitude). Minimum 2.
    pub rings: u32,
}

impl Default for UvSphere {
    fn default() -> Self {
        Self {
            radius: 0.5,
            segments: 32,
            rings: 16,
        }
    }
}

impl UvSphere {
    /// Creates a new UV sphere with the given parameters.
    pub fn new(radius: f32, segments: u32, rings: u32) -> Self {
        Self {
            radius,
            segments,
            rings,
        }
    }

    /// Generates the sphere.
    pub fn apply(&self) -> VertexData {
        let segments = self.segments.max(3);
        let rings = self.rings.max(2);

        let mut builder = VertexDataBuilder::new();

        for ring in 0..=rings {
            let v = ring as f32 / rings as f32;
            let phi = PI * v;

            for segment in 0..=segments {
                let u = segment as f32 / segments as f32;
                let theta = TAU * u;

                let normal = Vec3::new(phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin());
                builder.vertex_with_normal_uv(normal * self.radius, normal, Vec2::new(u, v));
            }
        }

        let stride = segments + 1;
        for ring in 0..rings {
            for segment in 0..segments {
                let i0 = ring * stride + segment;
                let i1 = i0 + 1;
                let i2 = i0 + stride;
                let i3 = i2 + 1;

                if ring == 0 {
                    builder.triangle(i0, i2, i3);
                } else if ring == rings - 1 {
                    builder.triangle(i0, i2, i1);
                } else {
                    builder.quad(i0, i2, i3, i1);
                }
            }
        }

        builder.build()
    }
}

// ============================================================================
// Plane
// ============================================================================

/// Generates a flat plane in the XZ plane, centered at the origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Plane {
    /// Size along the X axis.
    pub width: f32,
    /// Size along the Z axis.
    pub depth: f32,
    /// Number of divisions along X. Minimum 1.
    pub subdivisions_x: u32,
    /// Number of divisions along Z. Minimum 1.
    pub subdivisions_z: u32,
}

impl Default for Plane {
    fn default() -> Self {
        Self {
            width: 1.0,
            depth: 1.0,
            subdivisions_x: 1,
            subdivisions_z: 1,
        }
    }
}

impl Plane {
    /// Creates a new plane with the given dimensions.
    pub fn new(width: f32, depth: f32, subdivisions_x: u32, subdivisions_z: u32) -> Self {
        Self {
            width,
            depth,
            subdivisions_x,
            subdivisions_z,
        }
    }

    /// Generates the plane.
    pub fn apply(&self) -> VertexData {
        let subdivisions_x = self.subdivisions_x.max(1);
        let subdivisions_z = self.subdivisions_z.max(1);

        let mut builder = VertexDataBuilder::new();

        for iz in 0..=subdivisions_z {
            let v = iz as f32 / subdivisions_z as f32;
            let z = -self.depth / 2.0 + self.depth * v;

            for ix in 0..=subdivisions_x {
                let u = ix as f32 / subdivisions_x as f32;
                let x = -self.width / 2.0 + self.width * u;

                builder.vertex_with_normal_uv(Vec3::new(x, 0.0, z), Vec3::Y, Vec2::new(u, v));
            }
        }

        let stride = subdivisions_x + 1;
        for iz in 0..subdivisions_z {
            for ix in 0..subdivisions_x {
                let i0 = iz * stride + ix;
                let i1 = i0 + 1;
                let i2 = i0 + stride;
                let i3 = i2 + 1;
                builder.quad(i0, i2, i3, i1);
            }
        }

        builder.build()
    }
}

// ============================================================================
// Cylinder
// ============================================================================

/// Generates a capped cylinder centered at the origin, along the Y axis.
///
/// With low segment counts this produces prisms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Cylinder {
    /// Radius of the cylinder.
    pub radius: f32,
    /// Height of the cylinder.
    pub height: f32,
    /// Number of divisions around the circumference. Minimum 3.
    pub segments: u32,
}

impl Default for Cylinder {
    fn default() -> Self {
        Self {
            radius: 0.5,
            height: 1.0,
            segments: 24,
        }
    }
}

impl Cylinder {
    /// Creates a new cylinder with the given dimensions.
    pub fn new(radius: f32, height: f32, segments: u32) -> Self {
        Self {
            radius,
            height,
            segments,
        }
    }

    /// Generates the cylinder.
    pub fn apply(&self) -> VertexData {
        let segments = self.segments.max(3);
        let half_height = self.height / 2.0;

        let mut builder = VertexDataBuilder::new();

        let ring_point = |i: u32| {
            let angle = TAU * (i as f32) / (segments as f32);
            (angle.cos(), angle.sin())
        };

        for (y, normal) in [(-half_height, Vec3::NEG_Y), (half_height, Vec3::Y)] {
            let center = builder.vertex_with_normal_uv(Vec3::new(0.0, y, 0.0), normal, Vec2::splat(0.5));
            let ring: Vec<u32> = (0..segments)
                .map(|i| {
                    let (c, s) = ring_point(i);
                    builder.vertex_with_normal_uv(
                        Vec3::new(c * self.radius, y, s * self.radius),
                        normal,
                        Vec2::new(0.5 + c * 0.5, 0.5 + s * 0.5),
                    )
                })
                .collect();

            for i in 0..segments as usize {
                let next = (i + 1) % segments as usize;
                if y < 0.0 {
                    builder.triangle(center, ring[next], ring[i]);
                } else {
                    builder.triangle(center, ring[i], ring[next]);
                }
            }
        }

        let side_start = 2 * (segments + 1);
        for i in 0..=segments {
            let (c, s) = ring_point(i);
            let normal = Vec3::new(c, 0.0, s);
            let u = i as f32 / segments as f32;
            let rim = Vec3::new(c * self.radius, 0.0, s * self.radius);
            builder.vertex_with_normal_uv(rim - Vec3::Y * half_height, normal, Vec2::new(u, 0.0));
            builder.vertex_with_normal_uv(rim + Vec3::Y * half_height, normal, Vec2::new(u, 1.0));
        }

        for i in 0..segments {
            let bl = side_start + i * 2;
            let tl = bl + 1;
            let br = bl + 2;
            let tr = bl + 3;
            builder.quad(bl, tl, tr, br);
        }

        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cuboid_counts() {
        let data = Cuboid::unit().apply();
        assert_eq!(data.positions.len(), 72);
        assert_eq!(data.indices.as_ref().unwrap().len(), 36);
        assert!(data.validate().is_ok());
    }

    #[test]
    fn test_cuboid_dimensions() {
        let (min, max) = Cuboid::new(2.0, 4.0, 6.0).apply().bounds().unwrap();
        assert_eq!(min, Vec3::new(-1.0, -2.0, -3.0));
        assert_eq!(max, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_sphere_radius() {
        let data = UvSphere::new(2.0, 8, 4).apply();
        assert!(data.validate().is_ok());
        for i in 0..data.vertex_count() {
            assert!((data.position(i).unwrap().length() - 2.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_sphere_minimums() {
        let data = UvSphere::new(1.0, 0, 0).apply();
        // Clamped to 3 segments and 2 rings.
        assert_eq!(data.vertex_count(), 4 * 3);
        assert_eq!(data.face_count(), 6);
    }

    #[test]
    fn test_plane_counts() {
        let data = Plane::new(1.0, 1.0, 2, 3).apply();
        assert_eq!(data.vertex_count(), 3 * 4);
        assert_eq!(data.face_count(), 2 * 3 * 2);
        assert!(data.validate().is_ok());
    }

    #[test]
    fn test_cylinder_counts() {
        let data = Cylinder::new(1.0, 2.0, 6).apply();
        // Two caps (center + ring) and a side strip with a seam.
        assert_eq!(data.vertex_count(), 2 * 7 + 2 * 7);
        assert_eq!(data.face_count(), 6 * 2 + 6 * 2);
        assert!(data.validate().is_ok());
    }
}
