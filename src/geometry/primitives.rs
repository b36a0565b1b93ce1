//! Mesh generators for the built-in primitive shapes.
//!
//! Triangles wind counter-clockwise when seen from the side the normals
//! point to. Multi-material shapes record one [`GeometryGroup`] per face set.

use glam::Vec3;

use super::{GeometryData, GeometryGroup};

/// Subdivided plane in the XY plane, centered on the origin, facing +Z.
pub fn generate_plane(width: f32, height: f32, parts_x: u32, parts_y: u32) -> GeometryData {
    let grid_x = parts_x.max(1);
    let grid_y = parts_y.max(1);
    let grid_x1 = grid_x + 1;
    let segment_width = width / grid_x as f32;
    let segment_height = height / grid_y as f32;

    let mut data = GeometryData::new();
    for iy in 0..=grid_y {
        let y = iy as f32 * segment_height - height / 2.0;
        for ix in 0..=grid_x {
            let x = ix as f32 * segment_width - width / 2.0;
            data.vertices.push([x, -y, 0.0]);
            data.normals.push([0.0, 0.0, 1.0]);
            data.tex_coords
                .push([ix as f32 / grid_x as f32, 1.0 - iy as f32 / grid_y as f32]);
        }
    }
    for iy in 0..grid_y {
        for ix in 0..grid_x {
            let a = ix + grid_x1 * iy;
            let b = ix + grid_x1 * (iy + 1);
            let c = ix + 1 + grid_x1 * (iy + 1);
            let d = ix + 1 + grid_x1 * iy;
            data.indices.extend_from_slice(&[a, b, d, b, c, d]);
        }
    }
    data
}

/// Axis-aligned box centered on the origin. Faces are grouped in the order
/// +X, -X, +Y, -Y, +Z, -Z with material indices 0..6.
pub fn generate_box(width: f32, height: f32, depth: f32, parts: [u32; 3]) -> GeometryData {
    let [px, py, pz] = parts.map(|p| p.max(1));
    let mut data = GeometryData::new();
    // (u axis, v axis, w axis, u dir, v dir, face width, face height, face depth, grid x, grid y)
    let faces: [(usize, usize, usize, f32, f32, f32, f32, f32, u32, u32); 6] = [
        (2, 1, 0, -1.0, -1.0, depth, height, width, pz, py),
        (2, 1, 0, 1.0, -1.0, depth, height, -width, pz, py),
        (0, 2, 1, 1.0, 1.0, width, depth, height, px, pz),
        (0, 2, 1, 1.0, -1.0, width, depth, -height, px, pz),
        (0, 1, 2, 1.0, -1.0, width, height, depth, px, py),
        (0, 1, 2, -1.0, -1.0, width, height, -depth, px, py),
    ];
    for (material_index, face) in faces.into_iter().enumerate() {
        let (u, v, w, udir, vdir, face_w, face_h, face_d, grid_x, grid_y) = face;
        let start = data.indices.len() as u32;
        let base = data.vertices.len() as u32;
        let grid_x1 = grid_x + 1;
        for iy in 0..=grid_y {
            let y = iy as f32 * face_h / grid_y as f32 - face_h / 2.0;
            for ix in 0..=grid_x {
                let x = ix as f32 * face_w / grid_x as f32 - face_w / 2.0;
                let mut vertex = [0.0f32; 3];
                vertex[u] = x * udir;
                vertex[v] = y * vdir;
                vertex[w] = face_d / 2.0;
                data.vertices.push(vertex);

                let mut normal = [0.0f32; 3];
                normal[w] = if face_d > 0.0 { 1.0 } else { -1.0 };
                data.normals.push(normal);
                data.tex_coords
                    .push([ix as f32 / grid_x as f32, 1.0 - iy as f32 / grid_y as f32]);
            }
        }
        for iy in 0..grid_y {
            for ix in 0..grid_x {
                let a = base + ix + grid_x1 * iy;
                let b = base + ix + grid_x1 * (iy + 1);
                let c = base + ix + 1 + grid_x1 * (iy + 1);
                let d = base + ix + 1 + grid_x1 * iy;
                data.indices.extend_from_slice(&[a, b, d, b, c, d]);
            }
        }
        data.groups.push(GeometryGroup {
            start,
            count: data.indices.len() as u32 - start,
            material_index: material_index as u32,
        });
    }
    data
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CylinderShape {
    pub top_radius: f32,
    pub bottom_radius: f32,
    pub height: f32,
    pub slices: u32,
    pub stacks: u32,
    pub open_ended: bool,
    pub theta_start: f32,
    pub theta_length: f32,
}

/// Cylinder or cone along Y, centered on the origin. Groups: side (0),
/// top cap (1), bottom cap (2); a cap is omitted when open-ended or when its
/// radius is zero.
pub fn generate_cylinder(shape: &CylinderShape) -> GeometryData {
    let slices = shape.slices.max(3);
    let stacks = shape.stacks.max(1);
    let half_height = shape.height / 2.0;
    let slope = if shape.height != 0.0 {
        (shape.bottom_radius - shape.top_radius) / shape.height
    } else {
        0.0
    };

    let mut data = GeometryData::new();
    let mut rows: Vec<Vec<u32>> = Vec::with_capacity(stacks as usize + 1);
    for y in 0..=stacks {
        let v = y as f32 / stacks as f32;
        let radius = v * (shape.bottom_radius - shape.top_radius) + shape.top_radius;
        let mut row = Vec::with_capacity(slices as usize + 1);
        for x in 0..=slices {
            let u = x as f32 / slices as f32;
            let theta = u * shape.theta_length + shape.theta_start;
            let (sin, cos) = theta.sin_cos();
            row.push(data.vertices.len() as u32);
            data.vertices
                .push([radius * sin, -v * shape.height + half_height, radius * cos]);
            data.normals
                .push(Vec3::new(sin, slope, cos).normalize_or_zero().to_array());
            data.tex_coords.push([u, 1.0 - v]);
        }
        rows.push(row);
    }
    for x in 0..slices as usize {
        for y in 0..stacks as usize {
            let a = rows[y][x];
            let b = rows[y + 1][x];
            let c = rows[y + 1][x + 1];
            let d = rows[y][x + 1];
            data.indices.extend_from_slice(&[a, b, d, b, c, d]);
        }
    }
    data.groups.push(GeometryGroup {
        start: 0,
        count: data.indices.len() as u32,
        material_index: 0,
    });

    if !shape.open_ended {
        if shape.top_radius > 0.0 {
            push_cap(&mut data, shape, slices, true);
        }
        if shape.bottom_radius > 0.0 {
            push_cap(&mut data, shape, slices, false);
        }
    }
    data
}

fn push_cap(data: &mut GeometryData, shape: &CylinderShape, slices: u32, top: bool) {
    let radius = if top {
        shape.top_radius
    } else {
        shape.bottom_radius
    };
    let sign = if top { 1.0 } else { -1.0 };
    let y = shape.height / 2.0 * sign;
    let start = data.indices.len() as u32;

    let center_start = data.vertices.len() as u32;
    for _ in 0..slices {
        data.vertices.push([0.0, y, 0.0]);
        data.normals.push([0.0, sign, 0.0]);
        data.tex_coords.push([0.5, 0.5]);
    }
    let rim_start = data.vertices.len() as u32;
    for x in 0..=slices {
        let u = x as f32 / slices as f32;
        let theta = u * shape.theta_length + shape.theta_start;
        let (sin, cos) = theta.sin_cos();
        data.vertices.push([radius * sin, y, radius * cos]);
        data.normals.push([0.0, sign, 0.0]);
        data.tex_coords
            .push([cos * 0.5 + 0.5, sin * 0.5 * sign + 0.5]);
    }
    for x in 0..slices {
        let c = center_start + x;
        let i = rim_start + x;
        if top {
            data.indices.extend_from_slice(&[i, i + 1, c]);
        } else {
            data.indices.extend_from_slice(&[i + 1, i, c]);
        }
    }
    data.groups.push(GeometryGroup {
        start,
        count: data.indices.len() as u32 - start,
        material_index: if top { 1 } else { 2 },
    });
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphereShape {
    pub radius: f32,
    pub slices: u32,
    pub stacks: u32,
    pub phi_start: f32,
    pub phi_length: f32,
    pub theta_start: f32,
    pub theta_length: f32,
}

/// UV sphere around the origin. Degenerate pole triangles are skipped.
pub fn generate_sphere(shape: &SphereShape) -> GeometryData {
    use std::f32::consts::PI;

    let width_segments = shape.slices.max(3);
    let height_segments = shape.stacks.max(2);
    let theta_end = (shape.theta_start + shape.theta_length).min(PI);

    let mut data = GeometryData::new();
    let mut grid: Vec<Vec<u32>> = Vec::with_capacity(height_segments as usize + 1);
    for iy in 0..=height_segments {
        let v = iy as f32 / height_segments as f32;
        let u_offset = if iy == 0 && shape.theta_start == 0.0 {
            0.5 / width_segments as f32
        } else if iy == height_segments && theta_end == PI {
            -0.5 / width_segments as f32
        } else {
            0.0
        };
        let mut row = Vec::with_capacity(width_segments as usize + 1);
        for ix in 0..=width_segments {
            let u = ix as f32 / width_segments as f32;
            let phi = shape.phi_start + u * shape.phi_length;
            let theta = shape.theta_start + v * shape.theta_length;
            let vertex = Vec3::new(
                -shape.radius * phi.cos() * theta.sin(),
                shape.radius * theta.cos(),
                shape.radius * phi.sin() * theta.sin(),
            );
            row.push(data.vertices.len() as u32);
            data.vertices.push(vertex.to_array());
            data.normals.push(vertex.normalize_or_zero().to_array());
            data.tex_coords.push([u + u_offset, 1.0 - v]);
        }
        grid.push(row);
    }
    for iy in 0..height_segments as usize {
        for ix in 0..width_segments as usize {
            let a = grid[iy][ix + 1];
            let b = grid[iy][ix];
            let c = grid[iy + 1][ix];
            let d = grid[iy + 1][ix + 1];
            if iy != 0 || shape.theta_start > 0.0 {
                data.indices.extend_from_slice(&[a, b, d]);
            }
            if iy != height_segments as usize - 1 || theta_end < PI {
                data.indices.extend_from_slice(&[b, c, d]);
            }
        }
    }
    data
}

/// Side lengths and derived planar unwrap of a triangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleMetrics {
    /// |p1p2|
    pub a: f32,
    /// |p2p3|
    pub b: f32,
    /// |p1p3|
    pub c: f32,
    /// Distance from p3 to the line p1p2.
    pub height: f32,
    pub cos_alpha: f32,
}

impl TriangleMetrics {
    pub fn new(p1: Vec3, p2: Vec3, p3: Vec3) -> Self {
        let a = p1.distance(p2);
        let b = p2.distance(p3);
        let c = p1.distance(p3);
        let cos_alpha = if a > f32::EPSILON && c > f32::EPSILON {
            ((a * a - b * b + c * c) / (2.0 * a * c)).clamp(-1.0, 1.0)
        } else {
            1.0
        };
        let sin_alpha = (1.0 - cos_alpha * cos_alpha).max(0.0).sqrt();
        Self {
            a,
            b,
            c,
            height: c * sin_alpha,
            cos_alpha,
        }
    }

    pub fn sin_alpha(&self) -> f32 {
        (1.0 - self.cos_alpha * self.cos_alpha).max(0.0).sqrt()
    }

    /// Texture coordinates for p1, p2, p3. The third vertex sits at
    /// `(cos·a, sin·a)`, with the angle taken at p1.
    pub fn uvs(&self) -> [[f32; 2]; 3] {
        let uv3 = [self.cos_alpha * self.a, self.sin_alpha() * self.a];
        [[0.0, 0.0], [1.0, 0.0], uv3]
    }
}

pub fn generate_triangle(p1: Vec3, p2: Vec3, p3: Vec3) -> GeometryData {
    let metrics = TriangleMetrics::new(p1, p2, p3);
    let normal = (p2 - p1).cross(p3 - p1).normalize_or_zero().to_array();

    let mut data = GeometryData::new();
    data.vertices = vec![p1.to_array(), p2.to_array(), p3.to_array()];
    data.normals = vec![normal; 3];
    data.tex_coords = metrics.uvs().to_vec();
    data.indices = vec![0, 1, 2];
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{PI, TAU};

    fn full_cylinder(top: f32, bottom: f32) -> CylinderShape {
        CylinderShape {
            top_radius: top,
            bottom_radius: bottom,
            height: 2.0,
            slices: 8,
            stacks: 2,
            open_ended: false,
            theta_start: 0.0,
            theta_length: TAU,
        }
    }

    #[test]
    fn plane_counts_and_extent() {
        let plane = generate_plane(4.0, 2.0, 2, 3);
        assert_eq!(plane.vertex_count(), 3 * 4);
        assert_eq!(plane.triangle_count(), 2 * 2 * 3);
        assert_eq!(plane.vertices[0], [-2.0, 1.0, 0.0]);
        assert_eq!(plane.vertices[11], [2.0, -1.0, 0.0]);
        assert!(plane.indices.iter().all(|&i| (i as usize) < plane.vertex_count()));
    }

    #[test]
    fn plane_faces_positive_z() {
        let plane = generate_plane(1.0, 1.0, 1, 1);
        for tri in plane.indices.chunks(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| Vec3::from_array(plane.vertices[i as usize]));
            assert!((b - a).cross(c - a).z > 0.0);
        }
    }

    #[test]
    fn box_has_six_groups_and_correct_counts() {
        let cube = generate_box(2.0, 2.0, 2.0, [1, 1, 1]);
        assert_eq!(cube.vertex_count(), 24);
        assert_eq!(cube.triangle_count(), 12);
        assert_eq!(cube.groups.len(), 6);
        let material_indices: Vec<u32> = cube.groups.iter().map(|g| g.material_index).collect();
        assert_eq!(material_indices, vec![0, 1, 2, 3, 4, 5]);
        assert!(cube.groups.iter().all(|g| g.count == 6));
    }

    #[test]
    fn box_triangles_face_outward() {
        let cube = generate_box(1.0, 2.0, 3.0, [2, 1, 3]);
        for tri in cube.indices.chunks(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| Vec3::from_array(cube.vertices[i as usize]));
            let normal = (b - a).cross(c - a);
            let centroid = (a + b + c) / 3.0;
            assert!(normal.dot(centroid) > 0.0);
        }
    }

    #[test]
    fn cylinder_groups_follow_caps() {
        let closed = generate_cylinder(&full_cylinder(1.0, 2.0));
        assert_eq!(closed.groups.len(), 3);
        assert_eq!(closed.groups[0].count, 8 * 2 * 6);
        assert_eq!(closed.groups[1].count, 8 * 3);
        assert_eq!(closed.groups[2].material_index, 2);

        let cone = generate_cylinder(&full_cylinder(0.0, 1.0));
        assert_eq!(cone.groups.len(), 2);
        assert_eq!(cone.groups[1].material_index, 2);

        let open = generate_cylinder(&CylinderShape {
            open_ended: true,
            ..full_cylinder(1.0, 1.0)
        });
        assert_eq!(open.groups.len(), 1);
    }

    #[test]
    fn cylinder_bottom_cap_uses_bottom_radius() {
        let cylinder = generate_cylinder(&full_cylinder(1.0, 3.0));
        let bottom = cylinder.groups[2];
        let max_radius = cylinder.indices[bottom.start as usize..(bottom.start + bottom.count) as usize]
            .iter()
            .map(|&i| {
                let v = cylinder.vertices[i as usize];
                (v[0] * v[0] + v[2] * v[2]).sqrt()
            })
            .fold(0.0f32, f32::max);
        assert!((max_radius - 3.0).abs() < 1e-5);
    }

    #[test]
    fn sphere_vertices_lie_on_radius() {
        let sphere = generate_sphere(&SphereShape {
            radius: 2.5,
            slices: 12,
            stacks: 6,
            phi_start: 0.0,
            phi_length: TAU,
            theta_start: 0.0,
            theta_length: PI,
        });
        assert_eq!(sphere.vertex_count(), 13 * 7);
        // Poles lose one triangle per slice.
        assert_eq!(sphere.triangle_count(), 12 * 6 * 2 - 2 * 12);
        for v in &sphere.vertices {
            assert!((Vec3::from_array(*v).length() - 2.5).abs() < 1e-4);
        }
    }

    #[test]
    fn right_triangle_uvs() {
        let metrics = TriangleMetrics::new(Vec3::ZERO, Vec3::new(3.0, 0.0, 0.0), Vec3::new(0.0, 4.0, 0.0));
        assert!((metrics.a - 3.0).abs() < 1e-6);
        assert!((metrics.b - 5.0).abs() < 1e-6);
        assert!((metrics.c - 4.0).abs() < 1e-6);
        assert!((metrics.height - 4.0).abs() < 1e-5);
        let uvs = metrics.uvs();
        assert_eq!(uvs[0], [0.0, 0.0]);
        assert_eq!(uvs[1], [1.0, 0.0]);
        assert!(uvs[2][0].abs() < 1e-6);
        assert!((uvs[2][1] - 3.0).abs() < 1e-5);
    }

    #[test]
    fn third_uv_scales_the_angle_at_p1_by_the_first_side() {
        let cases = [
            // Equilateral, side 2.
            (Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0), Vec3::new(1.0, 3.0f32.sqrt(), 0.0), [1.0, 1.732_050_8]),
            // Obtuse at p1: cos = -1/sqrt(2).
            (Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0), Vec3::new(-1.0, 1.0, 0.0), [-1.414_213_6, 1.414_213_6]),
            // Skewed in the yz plane: a = 4, c = sqrt(10), b = sqrt(18).
            (Vec3::new(1.0, 1.0, 1.0), Vec3::new(1.0, 1.0, 5.0), Vec3::new(1.0, 4.0, 2.0), [1.264_911, 3.794_733_3]),
        ];
        for (p1, p2, p3, expected) in cases {
            let uv = TriangleMetrics::new(p1, p2, p3).uvs()[2];
            assert!((uv[0] - expected[0]).abs() < 1e-4, "{uv:?} vs {expected:?}");
            assert!((uv[1] - expected[1]).abs() < 1e-4, "{uv:?} vs {expected:?}");
        }
    }

    #[test]
    fn degenerate_triangle_stays_finite() {
        let collinear = generate_triangle(Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0));
        assert!(collinear.tex_coords.iter().flatten().all(|v| v.is_finite()));
        assert!(collinear.normals.iter().flatten().all(|v| v.is_finite()));

        let point = generate_triangle(Vec3::ONE, Vec3::ONE, Vec3::ONE);
        assert!(point.tex_coords.iter().flatten().all(|v| v.is_finite()));
    }
}
