//! Rational B-spline surfaces with clamped uniform knot vectors, sampled
//! into a regular grid.

use glam::{DVec3, DVec4};

use super::GeometryData;

const NORMAL_EPSILON: f64 = 1e-5;

#[derive(Debug, Clone, PartialEq)]
pub struct NurbsSurface {
    degree_u: usize,
    degree_v: usize,
    knots_u: Vec<f64>,
    knots_v: Vec<f64>,
    /// Weighted homogeneous points, `(degree_u + 1)` rows of `(degree_v + 1)`.
    points: Vec<Vec<DVec4>>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ControlPointCountError {
    #[error("expected {expected} control points for degrees {degree_u}x{degree_v}, got {actual}")]
    Mismatch {
        degree_u: usize,
        degree_v: usize,
        expected: usize,
        actual: usize,
    },
    #[error("degrees {degree_u}x{degree_v} need more control points than can be addressed")]
    TooLarge { degree_u: usize, degree_v: usize },
}

/// `(degree_u + 1) * (degree_v + 1)`, or `None` on overflow.
pub fn control_point_count(degree_u: usize, degree_v: usize) -> Option<usize> {
    degree_u
        .checked_add(1)?
        .checked_mul(degree_v.checked_add(1)?)
}

impl NurbsSurface {
    /// `control_points` are `[x, y, z, w]`, row-major in u.
    pub fn new(
        degree_u: usize,
        degree_v: usize,
        control_points: &[[f32; 4]],
    ) -> Result<Self, ControlPointCountError> {
        let expected = control_point_count(degree_u, degree_v)
            .ok_or(ControlPointCountError::TooLarge { degree_u, degree_v })?;
        if control_points.len() != expected {
            return Err(ControlPointCountError::Mismatch {
                degree_u,
                degree_v,
                expected,
                actual: control_points.len(),
            });
        }
        let points = control_points
            .chunks(degree_v + 1)
            .map(|row| {
                row.iter()
                    .map(|&[x, y, z, w]| {
                        let w = f64::from(w);
                        DVec4::new(f64::from(x) * w, f64::from(y) * w, f64::from(z) * w, w)
                    })
                    .collect()
            })
            .collect();
        Ok(Self {
            degree_u,
            degree_v,
            knots_u: clamped_knots(degree_u),
            knots_v: clamped_knots(degree_v),
            points,
        })
    }

    pub fn point(&self, u: f64, v: f64) -> DVec3 {
        let span_u = find_span(self.degree_u, u, &self.knots_u);
        let span_v = find_span(self.degree_v, v, &self.knots_v);
        let basis_u = basis_functions(span_u, u, self.degree_u, &self.knots_u);
        let basis_v = basis_functions(span_v, v, self.degree_v, &self.knots_v);

        let mut sum = DVec4::ZERO;
        for (l, nv) in basis_v.iter().enumerate() {
            let mut column = DVec4::ZERO;
            for (k, nu) in basis_u.iter().enumerate() {
                let row = span_u - self.degree_u + k;
                let col = span_v - self.degree_v + l;
                column += self.points[row][col] * *nu;
            }
            sum += column * *nv;
        }
        if sum.w.abs() > f64::EPSILON {
            sum.truncate() / sum.w
        } else {
            sum.truncate()
        }
    }

    /// Samples `(slices + 1) x (stacks + 1)` points; u runs along slices.
    pub fn tessellate(&self, slices: u32, stacks: u32) -> GeometryData {
        let slices = slices.max(1);
        let stacks = stacks.max(1);
        let mut data = GeometryData::new();
        for i in 0..=stacks {
            let v = f64::from(i) / f64::from(stacks);
            for j in 0..=slices {
                let u = f64::from(j) / f64::from(slices);
                let p = self.point(u, v);
                let pu = if u - NORMAL_EPSILON >= 0.0 {
                    p - self.point(u - NORMAL_EPSILON, v)
                } else {
                    self.point(u + NORMAL_EPSILON, v) - p
                };
                let pv = if v - NORMAL_EPSILON >= 0.0 {
                    p - self.point(u, v - NORMAL_EPSILON)
                } else {
                    self.point(u, v + NORMAL_EPSILON) - p
                };
                data.vertices.push(p.as_vec3().to_array());
                data.normals
                    .push(pu.cross(pv).normalize_or_zero().as_vec3().to_array());
                data.tex_coords.push([u as f32, v as f32]);
            }
        }
        let row = slices + 1;
        for i in 0..stacks {
            for j in 0..slices {
                let a = i * row + j;
                let b = i * row + j + 1;
                let c = (i + 1) * row + j + 1;
                let d = (i + 1) * row + j;
                data.indices.extend_from_slice(&[a, b, d, b, c, d]);
            }
        }
        data
    }
}

/// `degree + 1` zeros followed by `degree + 1` ones.
fn clamped_knots(degree: usize) -> Vec<f64> {
    let mut knots = vec![0.0; degree + 1];
    knots.extend(std::iter::repeat(1.0).take(degree + 1));
    knots
}

fn find_span(degree: usize, u: f64, knots: &[f64]) -> usize {
    let n = knots.len() - degree - 2;
    if u >= knots[n + 1] {
        return n;
    }
    if u <= knots[degree] {
        return degree;
    }
    let mut low = degree;
    let mut high = n + 1;
    let mut mid = (low + high) / 2;
    while u < knots[mid] || u >= knots[mid + 1] {
        if u < knots[mid] {
            high = mid;
        } else {
            low = mid;
        }
        mid = (low + high) / 2;
    }
    mid
}

fn basis_functions(span: usize, u: f64, degree: usize, knots: &[f64]) -> Vec<f64> {
    let mut n = vec![0.0; degree + 1];
    let mut left = vec![0.0; degree + 1];
    let mut right = vec![0.0; degree + 1];
    n[0] = 1.0;
    for j in 1..=degree {
        left[j] = u - knots[span + 1 - j];
        right[j] = knots[span + j] - u;
        let mut saved = 0.0;
        for r in 0..j {
            let rv = right[r + 1];
            let lv = left[j - r];
            let temp = n[r] / (rv + lv);
            n[r] = saved + rv * temp;
            saved = lv * temp;
        }
        n[j] = saved;
    }
    n
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_patch() -> NurbsSurface {
        NurbsSurface::new(
            1,
            1,
            &[
                [0.0, 0.0, 0.0, 1.0],
                [0.0, 2.0, 0.0, 1.0],
                [2.0, 0.0, 0.0, 1.0],
                [2.0, 2.0, 0.0, 1.0],
            ],
        )
        .unwrap()
    }

    #[test]
    fn bilinear_patch_interpolates_corners() {
        let surface = flat_patch();
        assert!((surface.point(0.0, 0.0) - DVec3::ZERO).length() < 1e-9);
        assert!((surface.point(1.0, 1.0) - DVec3::new(2.0, 2.0, 0.0)).length() < 1e-9);
        assert!((surface.point(0.5, 0.5) - DVec3::new(1.0, 1.0, 0.0)).length() < 1e-9);
        assert!((surface.point(1.0, 0.0) - DVec3::new(2.0, 0.0, 0.0)).length() < 1e-9);
    }

    #[test]
    fn basis_functions_partition_unity() {
        let knots = clamped_knots(3);
        for step in 0..=10 {
            let u = f64::from(step) / 10.0;
            let span = find_span(3, u, &knots);
            let sum: f64 = basis_functions(span, u, 3, &knots).iter().sum();
            assert!((sum - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn tessellation_counts_and_normals() {
        let data = flat_patch().tessellate(4, 3);
        assert_eq!(data.vertex_count(), 5 * 4);
        assert_eq!(data.triangle_count(), 4 * 3 * 2);
        for normal in &data.normals {
            assert!((normal[2].abs() - 1.0).abs() < 1e-3, "{normal:?}");
        }
    }

    #[test]
    fn weights_pull_the_surface() {
        let mut points = vec![[0.0, 0.0, 0.0, 1.0]; 9];
        for (i, p) in points.iter_mut().enumerate() {
            p[0] = (i / 3) as f32;
            p[1] = (i % 3) as f32;
        }
        points[4] = [1.0, 1.0, 1.0, 1.0];
        let unweighted = NurbsSurface::new(2, 2, &points).unwrap().point(0.5, 0.5);
        points[4][3] = 4.0;
        let weighted = NurbsSurface::new(2, 2, &points).unwrap().point(0.5, 0.5);
        assert!(weighted.z > unweighted.z);
    }

    #[test]
    fn wrong_point_count_is_rejected() {
        let err = NurbsSurface::new(2, 1, &[[0.0; 4]; 4]).unwrap_err();
        assert_eq!(
            err,
            ControlPointCountError::Mismatch {
                degree_u: 2,
                degree_v: 1,
                expected: 6,
                actual: 4
            }
        );
    }

    #[test]
    fn huge_degrees_do_not_overflow() {
        assert_eq!(control_point_count(3, 2), Some(12));
        assert_eq!(control_point_count(usize::MAX, 0), None);
        assert_eq!(control_point_count(usize::MAX / 2, 3), None);
        assert_eq!(
            NurbsSurface::new(usize::MAX, 1, &[[0.0; 4]; 4]).unwrap_err(),
            ControlPointCountError::TooLarge {
                degree_u: usize::MAX,
                degree_v: 1
            }
        );
    }
}
