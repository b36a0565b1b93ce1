use glam::Vec3;
use serde::Deserialize;

use crate::scene::{ConfigurationError, RawElement};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    Point {
        distance: f32,
        decay: f32,
    },
    Spot {
        distance: f32,
        /// Cone half-angle in radians.
        angle: f32,
        decay: f32,
        penumbra: f32,
        target: Vec3,
    },
    Directional {
        shadow_left: f32,
        shadow_right: f32,
        shadow_bottom: f32,
        shadow_top: f32,
    },
}

impl LightKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            LightKind::Point { .. } => "pointlight",
            LightKind::Spot { .. } => "spotlight",
            LightKind::Directional { .. } => "directionallight",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LightNode {
    pub id: String,
    pub kind: LightKind,
    pub enabled: bool,
    pub color: [f32; 3],
    pub intensity: f32,
    pub position: Vec3,
    pub cast_shadow: bool,
    pub shadow_far: f32,
    pub shadow_map_size: u32,
}

impl LightNode {
    pub fn spot_target(&self) -> Option<Vec3> {
        match self.kind {
            LightKind::Spot { target, .. } => Some(target),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LightParams {
    id: String,
    #[serde(default)]
    enabled: Option<bool>,
    color: [f32; 3],
    #[serde(default)]
    intensity: Option<f32>,
    position: [f32; 3],
    #[serde(default)]
    castshadow: Option<bool>,
    #[serde(default)]
    shadowfar: Option<f32>,
    #[serde(default)]
    shadowmapsize: Option<u32>,
    #[serde(default)]
    distance: Option<f32>,
    #[serde(default)]
    decay: Option<f32>,
    /// Degrees.
    #[serde(default)]
    angle: Option<f32>,
    #[serde(default)]
    penumbra: Option<f32>,
    #[serde(default)]
    target: Option<[f32; 3]>,
    #[serde(default)]
    shadowleft: Option<f32>,
    #[serde(default)]
    shadowright: Option<f32>,
    #[serde(default)]
    shadowbottom: Option<f32>,
    #[serde(default)]
    shadowtop: Option<f32>,
}

/// Builds a light from its record, applying per-type defaults.
pub fn load_light(raw: &RawElement) -> Result<LightNode, ConfigurationError> {
    let subtype = raw.subtype.as_str();
    if !matches!(subtype, "pointlight" | "spotlight" | "directionallight") {
        return Err(ConfigurationError::UnknownLight(subtype.to_string()));
    }
    let p = LightParams::deserialize(&raw.params).map_err(|source| {
        ConfigurationError::MalformedElement {
            subtype: subtype.to_string(),
            source,
        }
    })?;

    let kind = match subtype {
        "pointlight" => LightKind::Point {
            distance: p.distance.unwrap_or(1000.0),
            decay: p.decay.unwrap_or(2.0),
        },
        "spotlight" => {
            let missing = |field: &str| ConfigurationError::InvalidElement {
                subtype: subtype.to_string(),
                reason: format!("missing '{field}'"),
            };
            LightKind::Spot {
                distance: p.distance.unwrap_or(1000.0),
                angle: p.angle.ok_or_else(|| missing("angle"))?.to_radians(),
                decay: p.decay.unwrap_or(2.0),
                penumbra: p.penumbra.unwrap_or(1.0),
                target: Vec3::from_array(p.target.ok_or_else(|| missing("target"))?),
            }
        }
        _ => LightKind::Directional {
            shadow_left: p.shadowleft.unwrap_or(-5.0),
            shadow_right: p.shadowright.unwrap_or(5.0),
            shadow_bottom: p.shadowbottom.unwrap_or(-5.0),
            shadow_top: p.shadowtop.unwrap_or(5.0),
        },
    };

    Ok(LightNode {
        id: p.id,
        kind,
        enabled: p.enabled.unwrap_or(true),
        color: p.color,
        intensity: p.intensity.unwrap_or(1.0),
        position: Vec3::from_array(p.position),
        cast_shadow: p.castshadow.unwrap_or(false),
        shadow_far: p.shadowfar.unwrap_or(500.0),
        shadow_map_size: p.shadowmapsize.unwrap_or(512),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(subtype: &str, params: serde_json::Value) -> RawElement {
        RawElement {
            subtype: subtype.to_string(),
            params,
        }
    }

    #[test]
    fn point_light_defaults() {
        let light = load_light(&raw(
            "pointlight",
            json!({ "id": "bulb", "color": [1, 1, 0.5], "position": [0, 3, 0] }),
        ))
        .unwrap();
        assert_eq!(light.kind, LightKind::Point { distance: 1000.0, decay: 2.0 });
        assert!(light.enabled);
        assert_eq!(light.intensity, 1.0);
        assert!(!light.cast_shadow);
        assert_eq!(light.shadow_far, 500.0);
        assert_eq!(light.shadow_map_size, 512);
        assert_eq!(light.position, Vec3::new(0.0, 3.0, 0.0));
    }

    #[test]
    fn spot_angle_is_converted_to_radians() {
        let light = load_light(&raw(
            "spotlight",
            json!({
                "id": "spot", "color": [1, 1, 1], "position": [0, 5, 0],
                "angle": 30.0, "target": [0, 0, 0], "castshadow": true, "shadowmapsize": 1024
            }),
        ))
        .unwrap();
        match light.kind {
            LightKind::Spot { angle, penumbra, target, .. } => {
                assert!((angle - std::f32::consts::FRAC_PI_6).abs() < 1e-6);
                assert_eq!(penumbra, 1.0);
                assert_eq!(target, Vec3::ZERO);
            }
            other => panic!("Expected spot light, got {other:?}"),
        }
        assert!(light.cast_shadow);
        assert_eq!(light.shadow_map_size, 1024);
        assert_eq!(light.spot_target(), Some(Vec3::ZERO));
    }

    #[test]
    fn spot_without_target_is_rejected() {
        let err = load_light(&raw(
            "spotlight",
            json!({ "id": "spot", "color": [1, 1, 1], "position": [0, 5, 0], "angle": 30.0 }),
        ))
        .unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidElement { .. }));
    }

    #[test]
    fn directional_shadow_box_defaults() {
        let light = load_light(&raw(
            "directionallight",
            json!({ "id": "sun", "color": [1, 1, 1], "position": [10, 10, 0], "shadowtop": 8 }),
        ))
        .unwrap();
        assert_eq!(
            light.kind,
            LightKind::Directional {
                shadow_left: -5.0,
                shadow_right: 5.0,
                shadow_bottom: -5.0,
                shadow_top: 8.0,
            }
        );
    }

    #[test]
    fn unknown_light_type() {
        let err = load_light(&raw("arealight", json!({}))).unwrap_err();
        assert!(matches!(err, ConfigurationError::UnknownLight(t) if t == "arealight"));
    }
}
