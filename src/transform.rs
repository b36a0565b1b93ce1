//! Transformation records and their composition into a single matrix.

use glam::{Mat4, Vec3};

use crate::graph::{self, NodeHandle, SceneGraph};
use crate::scene::{ConfigurationError, RawTransformation};

/// One step of a node's transformation list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transformation {
    /// Euler angles in degrees, applied as Rx * Ry * Rz.
    Rotate(Vec3),
    Translate(Vec3),
    Scale(Vec3),
}

impl Transformation {
    pub fn from_raw(raw: &RawTransformation) -> Result<Self, ConfigurationError> {
        let missing = |field: &str| ConfigurationError::MalformedTransformation {
            kind: raw.kind.clone(),
            reason: format!("missing '{field}'"),
        };
        match raw.kind.to_ascii_uppercase().as_str() {
            "R" | "ROTATE" => raw
                .rotation
                .map(|r| Transformation::Rotate(Vec3::from_array(r)))
                .ok_or_else(|| missing("rotation")),
            "T" | "TRANSLATE" => raw
                .translate
                .map(|t| Transformation::Translate(Vec3::from_array(t)))
                .ok_or_else(|| missing("translate")),
            "S" | "SCALE" => raw
                .scale
                .map(|s| Transformation::Scale(Vec3::from_array(s)))
                .ok_or_else(|| missing("scale")),
            _ => Err(ConfigurationError::MalformedTransformation {
                kind: raw.kind.clone(),
                reason: "expected R, T or S".to_string(),
            }),
        }
    }

    pub fn matrix(&self) -> Mat4 {
        match *self {
            Transformation::Rotate(degrees) => {
                Mat4::from_rotation_x(degrees.x.to_radians())
                    * Mat4::from_rotation_y(degrees.y.to_radians())
                    * Mat4::from_rotation_z(degrees.z.to_radians())
            }
            Transformation::Translate(offset) => Mat4::from_translation(offset),
            Transformation::Scale(factors) => Mat4::from_scale(factors),
        }
    }
}

/// Right-multiplies the steps in declaration order: `M = M * step`.
pub fn compose(steps: &[Transformation]) -> Mat4 {
    steps
        .iter()
        .fold(Mat4::IDENTITY, |acc, step| acc * step.matrix())
}

/// Composes `steps` and pre-multiplies the result onto the node's local transform.
pub fn apply(graph: &mut SceneGraph, node: NodeHandle, steps: &[Transformation]) -> graph::Result<()> {
    if steps.is_empty() {
        return Ok(());
    }
    graph.apply_matrix(node, compose(steps))
}

/// Parses every record, keeping the valid ones and returning the rejects.
pub fn parse_all(raw: &[RawTransformation]) -> (Vec<Transformation>, Vec<ConfigurationError>) {
    let mut steps = Vec::with_capacity(raw.len());
    let mut errors = Vec::new();
    for record in raw {
        match Transformation::from_raw(record) {
            Ok(step) => steps.push(step),
            Err(err) => errors.push(err),
        }
    }
    (steps, errors)
}
