//! # Primitive Geometry
//!
//! Generates mesh data for the primitive kinds a scene description can
//! declare, and pairs it with materials sized to each face.
//!
//! ## Supported Primitives
//!
//! - **rectangle**: subdivided plane between two corners in XY
//! - **triangle**: three arbitrary points, planar texture unwrap
//! - **cylinder**: cylinder or cone with optional caps (side/top/bottom materials)
//! - **box**: axis-aligned box between two corners (one material per face)
//! - **nurbs**: rational B-spline patch
//! - **sphere**: UV sphere or partial sphere
//! - **polygon**: ring-subdivided disc with a radial color gradient

pub mod nurbs;
pub mod polygon;
pub mod primitives;

pub use primitives::*;

use std::f32::consts::{PI, TAU};
use std::sync::Arc;

use glam::Vec3;
use serde::Deserialize;

use crate::material::{Material, MaterialResolver};
use crate::scene::{ConfigurationError, RawElement};

/// Generated mesh data ready for upload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeometryData {
    /// Vertex positions (x, y, z)
    pub vertices: Vec<[f32; 3]>,
    /// Texture coordinates (u, v)
    pub tex_coords: Vec<[f32; 2]>,
    /// Normal vectors (x, y, z)
    pub normals: Vec<[f32; 3]>,
    /// Per-vertex RGBA, empty unless the material uses vertex colors
    pub colors: Vec<[f32; 4]>,
    /// Triangle indices (counter-clockwise winding)
    pub indices: Vec<u32>,
    /// Index ranges drawn with a specific material slot
    pub groups: Vec<GeometryGroup>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometryGroup {
    pub start: u32,
    pub count: u32,
    pub material_index: u32,
}

impl GeometryData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveSubtype {
    Rectangle,
    Triangle,
    Cylinder,
    Box,
    Nurbs,
    Sphere,
    Polygon,
}

impl PrimitiveSubtype {
    pub fn as_str(self) -> &'static str {
        match self {
            PrimitiveSubtype::Rectangle => "rectangle",
            PrimitiveSubtype::Triangle => "triangle",
            PrimitiveSubtype::Cylinder => "cylinder",
            PrimitiveSubtype::Box => "box",
            PrimitiveSubtype::Nurbs => "nurbs",
            PrimitiveSubtype::Sphere => "sphere",
            PrimitiveSubtype::Polygon => "polygon",
        }
    }
}

/// A drawable leaf of the scene graph. Geometry and materials are shared
/// between clones of the same subtree.
#[derive(Debug, Clone)]
pub struct RenderableLeaf {
    pub subtype: PrimitiveSubtype,
    pub geometry: Arc<GeometryData>,
    /// One entry per material slot referenced by the geometry groups.
    pub materials: Vec<Arc<Material>>,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

fn one() -> u32 {
    1
}

fn ten() -> u32 {
    10
}

fn one_f() -> f32 {
    1.0
}

fn tau() -> f32 {
    TAU
}

fn pi() -> f32 {
    PI
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RectangleParams {
    pub xy1: [f32; 2],
    pub xy2: [f32; 2],
    #[serde(default = "one")]
    pub parts_x: u32,
    #[serde(default = "one")]
    pub parts_y: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TriangleParams {
    pub xyz1: [f32; 3],
    pub xyz2: [f32; 3],
    pub xyz3: [f32; 3],
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CylinderParams {
    pub top: f32,
    pub base: f32,
    pub height: f32,
    pub slices: u32,
    pub stacks: u32,
    /// Without this flag the cylinder is open-ended.
    #[serde(default)]
    pub capsclose: bool,
    #[serde(default)]
    pub thetastart: f32,
    #[serde(default = "tau")]
    pub thetalength: f32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BoxParams {
    pub xyz1: [f32; 3],
    pub xyz2: [f32; 3],
    #[serde(default = "one")]
    pub parts_x: u32,
    #[serde(default = "one")]
    pub parts_y: u32,
    #[serde(default = "one")]
    pub parts_z: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ControlPoint {
    pub xx: f32,
    pub yy: f32,
    pub zz: f32,
    #[serde(default = "one_f")]
    pub w: f32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NurbsParams {
    pub degree_u: usize,
    pub degree_v: usize,
    #[serde(default = "ten")]
    pub parts_u: u32,
    #[serde(default = "ten")]
    pub parts_v: u32,
    pub controlpoints: Vec<ControlPoint>,
}

/// Angles are in radians.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SphereParams {
    pub radius: f32,
    pub slices: u32,
    pub stacks: u32,
    #[serde(default)]
    pub phistart: f32,
    #[serde(default = "tau")]
    pub philength: f32,
    #[serde(default)]
    pub thetastart: f32,
    #[serde(default = "pi")]
    pub thetalength: f32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PolygonParams {
    pub radius: f32,
    pub stacks: u32,
    pub slices: u32,
    pub color_c: [f32; 3],
    pub color_p: [f32; 3],
}

/// A primitive record after validation.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Rectangle(RectangleParams),
    Triangle(TriangleParams),
    Cylinder(CylinderParams),
    Box(BoxParams),
    Nurbs(NurbsParams),
    Sphere(SphereParams),
    Polygon(PolygonParams),
}

fn params<T: serde::de::DeserializeOwned>(raw: &RawElement) -> Result<T, ConfigurationError> {
    T::deserialize(&raw.params).map_err(|source| ConfigurationError::MalformedElement {
        subtype: raw.subtype.clone(),
        source,
    })
}

fn invalid(subtype: &str, reason: impl Into<String>) -> ConfigurationError {
    ConfigurationError::InvalidElement {
        subtype: subtype.to_string(),
        reason: reason.into(),
    }
}

impl Primitive {
    pub fn parse(raw: &RawElement) -> Result<Self, ConfigurationError> {
        let subtype = raw.subtype.as_str();
        let primitive = match subtype {
            "rectangle" => Primitive::Rectangle(params(raw)?),
            "triangle" => Primitive::Triangle(params(raw)?),
            "cylinder" => Primitive::Cylinder(params(raw)?),
            "box" => Primitive::Box(params(raw)?),
            "nurbs" => Primitive::Nurbs(params(raw)?),
            "sphere" => Primitive::Sphere(params(raw)?),
            "polygon" => Primitive::Polygon(params(raw)?),
            other => return Err(ConfigurationError::UnknownPrimitive(other.to_string())),
        };
        primitive.validate()?;
        Ok(primitive)
    }

    fn validate(&self) -> Result<(), ConfigurationError> {
        let subtype = self.subtype().as_str();
        match self {
            Primitive::Rectangle(p) if p.parts_x == 0 || p.parts_y == 0 => {
                Err(invalid(subtype, "parts must be at least 1"))
            }
            Primitive::Cylinder(p) if p.top < 0.0 || p.base < 0.0 => {
                Err(invalid(subtype, "radii must not be negative"))
            }
            Primitive::Cylinder(p) if p.slices == 0 || p.stacks == 0 => {
                Err(invalid(subtype, "slices and stacks must be at least 1"))
            }
            Primitive::Box(p) if p.parts_x == 0 || p.parts_y == 0 || p.parts_z == 0 => {
                Err(invalid(subtype, "parts must be at least 1"))
            }
            Primitive::Nurbs(p)
                if nurbs::control_point_count(p.degree_u, p.degree_v) != Some(p.controlpoints.len()) =>
            {
                let reason = match nurbs::control_point_count(p.degree_u, p.degree_v) {
                    Some(expected) => format!(
                        "expected {expected} control points, got {}",
                        p.controlpoints.len()
                    ),
                    None => format!("degrees {}x{} are too large", p.degree_u, p.degree_v),
                };
                Err(invalid(subtype, reason))
            }
            Primitive::Sphere(p) if p.radius < 0.0 => Err(invalid(subtype, "radius must not be negative")),
            Primitive::Polygon(p) if p.stacks == 0 || p.slices < 3 => {
                Err(invalid(subtype, "needs at least 1 stack and 3 slices"))
            }
            _ => Ok(()),
        }
    }

    pub fn subtype(&self) -> PrimitiveSubtype {
        match self {
            Primitive::Rectangle(_) => PrimitiveSubtype::Rectangle,
            Primitive::Triangle(_) => PrimitiveSubtype::Triangle,
            Primitive::Cylinder(_) => PrimitiveSubtype::Cylinder,
            Primitive::Box(_) => PrimitiveSubtype::Box,
            Primitive::Nurbs(_) => PrimitiveSubtype::Nurbs,
            Primitive::Sphere(_) => PrimitiveSubtype::Sphere,
            Primitive::Polygon(_) => PrimitiveSubtype::Polygon,
        }
    }

    /// Face sizes used to tile each material slot, in slot order. Empty for
    /// kinds with a fixed material.
    pub fn face_dimensions(&self) -> Vec<(f32, f32)> {
        match self {
            Primitive::Rectangle(p) => vec![(
                (p.xy2[0] - p.xy1[0]).abs(),
                (p.xy2[1] - p.xy1[1]).abs(),
            )],
            Primitive::Triangle(p) => {
                let metrics = TriangleMetrics::new(
                    Vec3::from_array(p.xyz1),
                    Vec3::from_array(p.xyz2),
                    Vec3::from_array(p.xyz3),
                );
                vec![(metrics.a, metrics.height)]
            }
            Primitive::Cylinder(p) => vec![
                (TAU * (p.top + p.base) / 2.0, p.height),
                (2.0 * p.top, 2.0 * p.top),
                (2.0 * p.base, 2.0 * p.base),
            ],
            Primitive::Box(p) => {
                let [w, h, d] = box_extent(p).to_array();
                vec![(d, h), (d, h), (w, d), (w, d), (w, h), (w, h)]
            }
            Primitive::Nurbs(p) => {
                let (min, max) = p.controlpoints.iter().fold(
                    (Vec3::splat(f32::INFINITY), Vec3::splat(f32::NEG_INFINITY)),
                    |(min, max), cp| {
                        let v = Vec3::new(cp.xx, cp.yy, cp.zz);
                        (min.min(v), max.max(v))
                    },
                );
                let range = (max - min).max(Vec3::ZERO);
                vec![(range.x, range.y)]
            }
            Primitive::Sphere(p) => vec![(TAU * p.radius, TAU * p.radius)],
            Primitive::Polygon(_) => Vec::new(),
        }
    }

    /// Offset of the leaf inside its parent; corner-defined shapes are
    /// centered between their corners.
    pub fn offset(&self) -> Vec3 {
        match self {
            Primitive::Rectangle(p) => Vec3::new(
                (p.xy1[0] + p.xy2[0]) / 2.0,
                (p.xy1[1] + p.xy2[1]) / 2.0,
                0.0,
            ),
            Primitive::Box(p) => (Vec3::from_array(p.xyz1) + Vec3::from_array(p.xyz2)) / 2.0,
            _ => Vec3::ZERO,
        }
    }

    pub fn generate(&self) -> GeometryData {
        match self {
            Primitive::Rectangle(p) => {
                let [w, h] = [(p.xy2[0] - p.xy1[0]).abs(), (p.xy2[1] - p.xy1[1]).abs()];
                generate_plane(w, h, p.parts_x, p.parts_y)
            }
            Primitive::Triangle(p) => generate_triangle(
                Vec3::from_array(p.xyz1),
                Vec3::from_array(p.xyz2),
                Vec3::from_array(p.xyz3),
            ),
            Primitive::Cylinder(p) => generate_cylinder(&CylinderShape {
                top_radius: p.top,
                bottom_radius: p.base,
                height: p.height,
                slices: p.slices,
                stacks: p.stacks,
                open_ended: !p.capsclose,
                theta_start: p.thetastart,
                theta_length: p.thetalength,
            }),
            Primitive::Box(p) => {
                let [w, h, d] = box_extent(p).to_array();
                generate_box(w, h, d, [p.parts_x, p.parts_y, p.parts_z])
            }
            Primitive::Nurbs(p) => {
                let points: Vec<[f32; 4]> = p
                    .controlpoints
                    .iter()
                    .map(|cp| [cp.xx, cp.yy, cp.zz, cp.w])
                    .collect();
                match nurbs::NurbsSurface::new(p.degree_u, p.degree_v, &points) {
                    Ok(surface) => surface.tessellate(p.parts_u, p.parts_v),
                    // Unreachable after validation.
                    Err(_) => GeometryData::new(),
                }
            }
            Primitive::Sphere(p) => generate_sphere(&SphereShape {
                radius: p.radius,
                slices: p.slices,
                stacks: p.stacks,
                phi_start: p.phistart,
                phi_length: p.philength,
                theta_start: p.thetastart,
                theta_length: p.thetalength,
            }),
            Primitive::Polygon(p) => {
                polygon::generate_polygon(p.radius, p.stacks, p.slices, p.color_c, p.color_p)
            }
        }
    }
}

fn box_extent(p: &BoxParams) -> Vec3 {
    (Vec3::from_array(p.xyz2) - Vec3::from_array(p.xyz1)).abs()
}

/// A leaf plus where it sits inside its parent.
#[derive(Debug, Clone)]
pub struct PrimitiveMesh {
    pub leaf: RenderableLeaf,
    pub offset: Vec3,
}

/// Builds primitive leaves, resolving one material per face.
#[derive(Debug, Default)]
pub struct GeometryFactory {
    materials: MaterialResolver,
}

impl GeometryFactory {
    pub fn new(materials: MaterialResolver) -> Self {
        Self { materials }
    }

    pub fn materials(&self) -> &MaterialResolver {
        &self.materials
    }

    pub fn materials_mut(&mut self) -> &mut MaterialResolver {
        &mut self.materials
    }

    pub fn into_materials(self) -> MaterialResolver {
        self.materials
    }

    pub fn create_primitive(
        &mut self,
        raw: &RawElement,
        material_id: &str,
        cast_shadow: bool,
        receive_shadow: bool,
    ) -> Result<PrimitiveMesh, ConfigurationError> {
        let primitive = Primitive::parse(raw)?;
        let materials = match &primitive {
            Primitive::Polygon(_) => vec![Arc::new(Material::vertex_colored())],
            other => other
                .face_dimensions()
                .into_iter()
                .map(|(w, h)| self.materials.resolve(material_id, w, h))
                .collect(),
        };
        Ok(PrimitiveMesh {
            offset: primitive.offset(),
            leaf: RenderableLeaf {
                subtype: primitive.subtype(),
                geometry: Arc::new(primitive.generate()),
                materials,
                cast_shadow,
                receive_shadow,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::MaterialTable;
    use crate::scene::{MaterialDescriptor, TextureDescriptor};
    use serde_json::json;

    fn raw(subtype: &str, params: serde_json::Value) -> RawElement {
        RawElement {
            subtype: subtype.to_string(),
            params,
        }
    }

    fn textured_factory() -> GeometryFactory {
        let material = MaterialDescriptor {
            texture_ref: Some("grid".to_string()),
            ..MaterialDescriptor::plain("grid", [1.0, 1.0, 1.0])
        };
        let texture = TextureDescriptor {
            id: "grid".to_string(),
            filepath: "grid.png".to_string(),
            anisotropy: 1,
            mipmaps: Vec::new(),
        };
        let (table, _) = MaterialTable::from_descriptors(&[material], &[texture]);
        GeometryFactory::new(MaterialResolver::new(table))
    }

    #[test]
    fn rectangle_is_centered_between_corners() {
        let mut factory = GeometryFactory::default();
        let mesh = factory
            .create_primitive(
                &raw("rectangle", json!({ "xy1": [1.0, 1.0], "xy2": [5.0, 3.0], "parts_x": 2 })),
                "default",
                true,
                false,
            )
            .unwrap();
        assert_eq!(mesh.offset, Vec3::new(3.0, 2.0, 0.0));
        assert_eq!(mesh.leaf.subtype, PrimitiveSubtype::Rectangle);
        assert_eq!(mesh.leaf.geometry.vertex_count(), 3 * 2);
        assert!(mesh.leaf.cast_shadow);
        assert!(!mesh.leaf.receive_shadow);
    }

    #[test]
    fn box_gets_one_material_per_face() {
        let mut factory = textured_factory();
        let mesh = factory
            .create_primitive(
                &raw("box", json!({ "xyz1": [0.0, 0.0, 0.0], "xyz2": [4.0, 2.0, 1.0] })),
                "grid",
                false,
                false,
            )
            .unwrap();
        assert_eq!(mesh.offset, Vec3::new(2.0, 1.0, 0.5));
        let repeats: Vec<[f32; 2]> = mesh
            .leaf
            .materials
            .iter()
            .map(|m| m.map.unwrap().repeat)
            .collect();
        assert_eq!(
            repeats,
            vec![[1.0, 2.0], [1.0, 2.0], [4.0, 1.0], [4.0, 1.0], [4.0, 2.0], [4.0, 2.0]]
        );
    }

    #[test]
    fn cylinder_caps_are_sized_by_their_own_radius() {
        let mut factory = textured_factory();
        let mesh = factory
            .create_primitive(
                &raw(
                    "cylinder",
                    json!({ "top": 1.0, "base": 2.0, "height": 3.0, "slices": 8, "stacks": 1, "capsclose": true }),
                ),
                "grid",
                false,
                false,
            )
            .unwrap();
        assert_eq!(mesh.leaf.materials.len(), 3);
        assert_eq!(mesh.leaf.materials[1].map.unwrap().repeat, [2.0, 2.0]);
        assert_eq!(mesh.leaf.materials[2].map.unwrap().repeat, [4.0, 4.0]);
        assert_eq!(mesh.leaf.geometry.groups.len(), 3);
    }

    #[test]
    fn polygon_ignores_the_inherited_material() {
        let mut factory = textured_factory();
        let mesh = factory
            .create_primitive(
                &raw(
                    "polygon",
                    json!({ "radius": 1.0, "stacks": 3, "slices": 4, "color_c": [1, 0, 0], "color_p": [0, 0, 1] }),
                ),
                "grid",
                false,
                false,
            )
            .unwrap();
        assert_eq!(mesh.leaf.materials.len(), 1);
        assert!(mesh.leaf.materials[0].vertex_colors);
        assert!(mesh.leaf.materials[0].map.is_none());
        assert_eq!(mesh.leaf.geometry.triangle_count(), 20);
    }

    #[test]
    fn nurbs_and_sphere_build() {
        let mut factory = GeometryFactory::default();
        let nurbs = factory
            .create_primitive(
                &raw(
                    "nurbs",
                    json!({
                        "degree_u": 1, "degree_v": 1, "parts_u": 3, "parts_v": 2,
                        "controlpoints": [
                            { "xx": 0, "yy": 0, "zz": 0 }, { "xx": 0, "yy": 1, "zz": 0 },
                            { "xx": 1, "yy": 0, "zz": 0 }, { "xx": 1, "yy": 1, "zz": 0 }
                        ]
                    }),
                ),
                "default",
                false,
                false,
            )
            .unwrap();
        assert_eq!(nurbs.leaf.geometry.vertex_count(), 4 * 3);

        let sphere = factory
            .create_primitive(&raw("sphere", json!({ "radius": 1.0, "slices": 8, "stacks": 4 })), "default", false, false)
            .unwrap();
        assert_eq!(sphere.leaf.geometry.vertex_count(), 9 * 5);
    }

    #[test]
    fn unknown_and_malformed_records_are_configuration_errors() {
        let mut factory = GeometryFactory::default();
        assert!(matches!(
            factory.create_primitive(&raw("torus", json!({})), "default", false, false),
            Err(ConfigurationError::UnknownPrimitive(s)) if s == "torus"
        ));
        assert!(matches!(
            factory.create_primitive(&raw("sphere", json!({ "radius": "big" })), "default", false, false),
            Err(ConfigurationError::MalformedElement { .. })
        ));
        assert!(matches!(
            factory.create_primitive(
                &raw("polygon", json!({ "radius": 1.0, "stacks": 0, "slices": 4, "color_c": [0, 0, 0], "color_p": [0, 0, 0] })),
                "default",
                false,
                false
            ),
            Err(ConfigurationError::InvalidElement { .. })
        ));
    }

    #[test]
    fn nurbs_with_overflowing_degrees_is_invalid() {
        let mut factory = GeometryFactory::default();
        let result = factory.create_primitive(
            &raw(
                "nurbs",
                json!({
                    "degree_u": u64::MAX, "degree_v": 1, "parts_u": 2, "parts_v": 2,
                    "controlpoints": [{ "xx": 0, "yy": 0, "zz": 0 }]
                }),
            ),
            "default",
            false,
            false,
        );
        assert!(matches!(
            result,
            Err(ConfigurationError::InvalidElement { subtype, reason })
                if subtype == "nurbs" && reason.contains("too large")
        ));
    }
}
