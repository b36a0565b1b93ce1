pub mod serialization;

use std::collections::BTreeMap;

/// Node descriptors keyed by id, as consumed by the builder.
pub type DescriptorMap = BTreeMap<String, NodeDescriptor>;

/// Whether a declarative node produces a plain group or a level-of-detail container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    #[default]
    Node,
    Lod,
}

/// One graph node of the scene description. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDescriptor {
    #[serde(default)]
    pub id: String,
    #[serde(default, rename = "type")]
    pub node_type: NodeType,
    /// Empty means "inherit from the parent".
    #[serde(default)]
    pub material_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cast_shadows: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receive_shadows: Option<bool>,
    #[serde(default)]
    pub children: Vec<ChildRef>,
    #[serde(default)]
    pub transformations: Vec<RawTransformation>,
}

/// A child entry of a node descriptor.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ChildRef {
    Node {
        id: String,
    },
    /// A distance-annotated reference; the distance only matters under an LOD parent.
    Lod {
        id: String,
        #[serde(default, rename = "minDistance")]
        min_distance: f32,
    },
    Primitive(RawElement),
    Light(RawElement),
}

/// Primitive or light payload kept untyped until build time, so an unknown
/// subtype only drops that element instead of the whole document.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RawElement {
    pub subtype: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Transformation record as written in the document. Rotations are in degrees.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RawTransformation {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<[f32; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translate: Option<[f32; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<[f32; 3]>,
}

impl RawTransformation {
    pub fn rotate(degrees: [f32; 3]) -> Self {
        Self {
            kind: "R".to_string(),
            rotation: Some(degrees),
            translate: None,
            scale: None,
        }
    }

    pub fn translate(offset: [f32; 3]) -> Self {
        Self {
            kind: "T".to_string(),
            rotation: None,
            translate: Some(offset),
            scale: None,
        }
    }

    pub fn scale(factors: [f32; 3]) -> Self {
        Self {
            kind: "S".to_string(),
            rotation: None,
            translate: None,
            scale: Some(factors),
        }
    }
}

/// Recoverable problems with a single scene element. The offending element is
/// skipped and construction continues.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("unknown primitive subtype '{0}'")]
    UnknownPrimitive(String),
    #[error("unknown light type '{0}'")]
    UnknownLight(String),
    #[error("malformed {subtype} record: {source}")]
    MalformedElement {
        subtype: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid {subtype}: {reason}")]
    InvalidElement { subtype: String, reason: String },
    #[error("malformed transformation '{kind}': {reason}")]
    MalformedTransformation { kind: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TextureDescriptor {
    pub id: String,
    pub filepath: String,
    #[serde(default = "default_anisotropy")]
    pub anisotropy: u32,
    /// Explicit mip chain, level 0 first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mipmaps: Vec<String>,
}

fn default_anisotropy() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MaterialDescriptor {
    pub id: String,
    #[serde(default = "white")]
    pub color: [f32; 3],
    #[serde(default)]
    pub specular: [f32; 3],
    #[serde(default = "default_shininess")]
    pub shininess: f32,
    #[serde(default)]
    pub emissive: [f32; 3],
    #[serde(default)]
    pub wireframe: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shading: Option<String>,
    #[serde(default)]
    pub twosided: bool,
    #[serde(default)]
    pub castshadow: bool,
    #[serde(default, rename = "textureref", skip_serializing_if = "Option::is_none")]
    pub texture_ref: Option<String>,
    #[serde(default, rename = "texlength_s", skip_serializing_if = "Option::is_none")]
    pub texlength_s: Option<f32>,
    #[serde(default, rename = "texlength_t", skip_serializing_if = "Option::is_none")]
    pub texlength_t: Option<f32>,
    #[serde(default, rename = "bumpref", skip_serializing_if = "Option::is_none")]
    pub bump_ref: Option<String>,
    #[serde(default, rename = "bumpscale", skip_serializing_if = "Option::is_none")]
    pub bump_scale: Option<f32>,
    #[serde(default, rename = "specularref", skip_serializing_if = "Option::is_none")]
    pub specular_ref: Option<String>,
}

impl MaterialDescriptor {
    pub fn plain(id: &str, color: [f32; 3]) -> Self {
        Self {
            id: id.to_string(),
            color,
            specular: [0.0, 0.0, 0.0],
            shininess: default_shininess(),
            emissive: [0.0, 0.0, 0.0],
            wireframe: false,
            shading: None,
            twosided: false,
            castshadow: false,
            texture_ref: None,
            texlength_s: None,
            texlength_t: None,
            bump_ref: None,
            bump_scale: None,
            specular_ref: None,
        }
    }
}

fn white() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

fn default_shininess() -> f32 {
    30.0
}

/// Camera record; `type` is interpreted by the camera loader.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CameraDescriptor {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bottom: Option<f32>,
    #[serde(default = "default_near")]
    pub near: f32,
    #[serde(default = "default_far")]
    pub far: f32,
    pub location: [f32; 3],
    pub target: [f32; 3],
}

fn default_near() -> f32 {
    0.1
}

fn default_far() -> f32 {
    2000.0
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SkyboxDescriptor {
    pub id: String,
    pub size: [f32; 3],
    #[serde(default)]
    pub emissive: [f32; 3],
    #[serde(default)]
    pub intensity: f32,
    pub up: String,
    pub down: String,
    pub left: String,
    pub right: String,
    pub front: String,
    pub back: String,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Keyframe {
    pub time: f32,
    pub position: [f32; 3],
}

/// Position path for a built node, looked up by its final name.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AnimationDescriptor {
    pub target: String,
    pub points: Vec<Keyframe>,
    #[serde(default = "default_true")]
    pub rotate: bool,
    #[serde(default)]
    pub autoplay: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GlobalOptions {
    #[serde(default)]
    pub background: [f32; 3],
    #[serde(default = "default_ambient")]
    pub ambient: [f32; 3],
}

fn default_ambient() -> [f32; 3] {
    [0.2, 0.2, 0.2]
}

impl Default for GlobalOptions {
    fn default() -> Self {
        Self {
            background: [0.0, 0.0, 0.0],
            ambient: default_ambient(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FogDescriptor {
    pub color: [f32; 3],
    pub near: f32,
    pub far: f32,
}

/// The whole declarative scene: what gets saved/loaded.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneDocument {
    pub root_id: String,
    #[serde(default)]
    pub options: GlobalOptions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fog: Option<FogDescriptor>,
    #[serde(default)]
    pub cameras: Vec<CameraDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_camera: Option<String>,
    #[serde(default)]
    pub textures: Vec<TextureDescriptor>,
    #[serde(default)]
    pub materials: Vec<MaterialDescriptor>,
    #[serde(default)]
    pub skyboxes: Vec<SkyboxDescriptor>,
    #[serde(default)]
    pub nodes: DescriptorMap,
    #[serde(default)]
    pub animations: Vec<AnimationDescriptor>,
}

impl SceneDocument {
    pub fn new(root_id: &str) -> Self {
        Self {
            root_id: root_id.to_string(),
            ..Self::default()
        }
    }

    pub fn nodes(&self) -> &DescriptorMap {
        &self.nodes
    }

    pub fn node(&self, id: &str) -> Option<&NodeDescriptor> {
        self.nodes.get(id)
    }

    /// Inserts a node under its own id, replacing any previous one.
    pub fn add_node(&mut self, node: NodeDescriptor) {
        self.nodes.insert(node.id.clone(), node);
    }

    pub fn add_material(&mut self, material: MaterialDescriptor) {
        self.materials.push(material);
    }

    pub fn add_texture(&mut self, texture: TextureDescriptor) {
        self.textures.push(texture);
    }

    /// The skybox with id "default", or the first one declared.
    pub fn default_skybox(&self) -> Option<&SkyboxDescriptor> {
        self.skyboxes
            .iter()
            .find(|skybox| skybox.id == "default")
            .or_else(|| self.skyboxes.first())
    }
}

impl NodeDescriptor {
    pub fn group(id: &str) -> Self {
        Self {
            id: id.to_string(),
            ..Self::default()
        }
    }

    pub fn lod(id: &str) -> Self {
        Self {
            id: id.to_string(),
            node_type: NodeType::Lod,
            ..Self::default()
        }
    }

    pub fn with_materials(mut self, ids: &[&str]) -> Self {
        self.material_ids = ids.iter().map(|id| id.to_string()).collect();
        self
    }

    pub fn with_shadows(mut self, cast: Option<bool>, receive: Option<bool>) -> Self {
        self.cast_shadows = cast;
        self.receive_shadows = receive;
        self
    }

    pub fn with_child(mut self, child: ChildRef) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_transformation(mut self, transformation: RawTransformation) -> Self {
        self.transformations.push(transformation);
        self
    }
}

impl ChildRef {
    pub fn node(id: &str) -> Self {
        ChildRef::Node { id: id.to_string() }
    }

    pub fn lod_level(id: &str, min_distance: f32) -> Self {
        ChildRef::Lod {
            id: id.to_string(),
            min_distance,
        }
    }

    pub fn primitive(subtype: &str, params: serde_json::Value) -> Self {
        ChildRef::Primitive(RawElement {
            subtype: subtype.to_string(),
            params,
        })
    }

    pub fn light(subtype: &str, params: serde_json::Value) -> Self {
        ChildRef::Light(RawElement {
            subtype: subtype.to_string(),
            params,
        })
    }
}
