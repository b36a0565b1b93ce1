//! Flat regular polygon split into concentric rings, colored by a radial
//! gradient from the center color to the perimeter color.

use super::GeometryData;

/// Vertex layout: index 0 is the center; ring vertex `(slice k, stack s)`
/// for `s >= 1` sits at `k * stacks + s`. The last sector wraps to slice 0
/// instead of duplicating the starting spoke.
pub fn generate_polygon(
    radius: f32,
    stacks: u32,
    slices: u32,
    center_color: [f32; 3],
    perimeter_color: [f32; 3],
) -> GeometryData {
    let mut data = GeometryData::new();
    let color_at = |stack: u32| -> [f32; 4] {
        let t = stack as f32 / stacks as f32;
        let mut rgba = [1.0f32; 4];
        for i in 0..3 {
            rgba[i] = center_color[i] + (perimeter_color[i] - center_color[i]) * t;
        }
        rgba
    };

    data.vertices.push([0.0, 0.0, 0.0]);
    data.normals.push([0.0, 0.0, 1.0]);
    data.colors.push(color_at(0));
    data.tex_coords.push([0.5, 0.5]);

    for slice in 0..slices {
        let theta = std::f32::consts::TAU * slice as f32 / slices as f32;
        for stack in 1..=stacks {
            let r = stack as f32 * radius / stacks as f32;
            let x = round2(r * theta.cos());
            let y = round2(r * theta.sin());
            data.vertices.push([x, y, 0.0]);
            data.normals.push([0.0, 0.0, 1.0]);
            data.colors.push(color_at(stack));
            let span = if radius != 0.0 { 0.5 / radius } else { 0.0 };
            data.tex_coords.push([0.5 + x * span, 0.5 + y * span]);
        }
    }

    let vertex = |slice: u32, stack: u32| slice * stacks + stack;
    for slice in 0..slices {
        let next = (slice + 1) % slices;
        data.indices
            .extend_from_slice(&[vertex(next, 1), 0, vertex(slice, 1)]);
        for stack in 2..=stacks {
            let a = vertex(next, stack);
            let b = vertex(next, stack - 1);
            let c = vertex(slice, stack - 1);
            let d = vertex(slice, stack);
            data.indices.extend_from_slice(&[a, b, c, a, c, d]);
        }
    }
    data
}

/// Two-decimal rounding, halves toward positive infinity.
fn round2(value: f32) -> f32 {
    (value * 100.0 + 0.5).floor() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn signed_areas(data: &GeometryData) -> Vec<f32> {
        data.indices
            .chunks(3)
            .map(|tri| {
                let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| Vec3::from_array(data.vertices[i as usize]));
                (b - a).cross(c - a).z / 2.0
            })
            .collect()
    }

    #[test]
    fn three_stacks_four_slices() {
        let polygon = generate_polygon(1.0, 3, 4, [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]);
        assert_eq!(polygon.vertex_count(), 13);
        assert_eq!(polygon.triangle_count(), 20);
        assert_eq!(polygon.colors.len(), 13);
        assert_eq!(&polygon.indices[..6], &[4, 0, 1, 5, 4, 1]);
        // Last sector closes onto the first spoke.
        let tail = &polygon.indices[polygon.indices.len() - 15..];
        assert_eq!(tail, &[1, 0, 10, 2, 1, 10, 2, 10, 11, 3, 2, 11, 3, 11, 12]);
    }

    #[test]
    fn all_triangles_wind_counter_clockwise_and_tile_the_disc() {
        let polygon = generate_polygon(1.0, 3, 4, [1.0, 1.0, 1.0], [0.0, 0.0, 0.0]);
        let areas = signed_areas(&polygon);
        assert!(areas.iter().all(|&a| a > 0.0));
        // Four spokes of radius one span a unit diamond.
        let total: f32 = areas.iter().sum();
        assert!((total - 2.0).abs() < 1e-4, "{total}");
    }

    #[test]
    fn single_stack_is_a_fan() {
        let polygon = generate_polygon(2.0, 1, 6, [0.0; 3], [1.0; 3]);
        assert_eq!(polygon.vertex_count(), 7);
        assert_eq!(polygon.triangle_count(), 6);
        assert!(signed_areas(&polygon).iter().all(|&a| a > 0.0));
    }

    #[test]
    fn colors_interpolate_by_stack() {
        let polygon = generate_polygon(1.0, 2, 3, [0.0, 0.0, 0.0], [1.0, 1.0, 1.0]);
        assert_eq!(polygon.colors[0], [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(polygon.colors[1], [0.5, 0.5, 0.5, 1.0]);
        assert_eq!(polygon.colors[2], [1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn coordinates_are_rounded_to_two_decimals() {
        let polygon = generate_polygon(1.0, 3, 4, [0.0; 3], [0.0; 3]);
        assert!((polygon.vertices[1][0] - 0.33).abs() < 1e-6);
        assert!((polygon.vertices[2][0] - 0.67).abs() < 1e-6);
    }
}
