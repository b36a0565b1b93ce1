//! Material records and their resolution into renderer-ready materials.
//!
//! Resolution is per primitive face: the same record yields different
//! texture repeat factors depending on the face size it covers.

pub mod texture;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::scene::{MaterialDescriptor, TextureDescriptor};
use texture::{TextureId, TextureInfo, TextureStore};

pub const DEFAULT_MATERIAL_ID: &str = "default";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Shading {
    None,
    Flat,
    #[default]
    Smooth,
}

impl Shading {
    /// Unknown or missing values fall back to smooth.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("none") => Shading::None,
            Some("flat") => Shading::Flat,
            _ => Shading::Smooth,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Front,
    Back,
    Double,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterialModel {
    /// Lit with specular highlights.
    Phong,
    /// Physically based; used by the skybox.
    Standard,
    /// Unlit, vertex colors.
    Basic,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureBinding {
    pub texture: TextureId,
    /// Repeat along s and t; wrapping always repeats.
    pub repeat: [f32; 2],
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub id: String,
    pub model: MaterialModel,
    pub color: [f32; 3],
    pub specular: [f32; 3],
    pub shininess: f32,
    pub emissive: [f32; 3],
    pub emissive_intensity: f32,
    pub wireframe: bool,
    pub shading: Shading,
    pub side: Side,
    pub shadow_side: Side,
    pub cast_shadow: bool,
    pub vertex_colors: bool,
    pub map: Option<TextureBinding>,
    pub bump_map: Option<TextureBinding>,
    pub bump_scale: f32,
    pub specular_map: Option<TextureBinding>,
}

impl Material {
    /// Opaque white, used whenever no material record applies.
    pub fn default_white() -> Self {
        Self {
            id: DEFAULT_MATERIAL_ID.to_string(),
            model: MaterialModel::Phong,
            color: [1.0, 1.0, 1.0],
            specular: [0.067, 0.067, 0.067],
            shininess: 30.0,
            emissive: [0.0, 0.0, 0.0],
            emissive_intensity: 1.0,
            wireframe: false,
            shading: Shading::Smooth,
            side: Side::Front,
            shadow_side: Side::Back,
            cast_shadow: false,
            vertex_colors: false,
            map: None,
            bump_map: None,
            bump_scale: 0.0,
            specular_map: None,
        }
    }

    /// White, unlit, double-sided, colored per vertex.
    pub fn vertex_colored() -> Self {
        Self {
            id: "vertexcolors".to_string(),
            model: MaterialModel::Basic,
            side: Side::Double,
            vertex_colors: true,
            ..Self::default_white()
        }
    }

    pub fn flat_shading(&self) -> bool {
        self.shading == Shading::Flat
    }
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum MaterialResolutionError {
    #[error("unknown material '{0}', using the default")]
    UnknownMaterial(String),
    #[error("material '{material}' references unknown texture '{texture}'")]
    UnknownTexture { material: String, texture: String },
}

/// Material record joined with its texture records.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialEntry {
    pub descriptor: MaterialDescriptor,
    pub shading: Shading,
    pub texture: Option<TextureInfo>,
    /// Texture length along s and t; only meaningful with a main texture.
    pub tex_length: Option<[f32; 2]>,
    pub bump: Option<TextureInfo>,
    pub bump_scale: f32,
    pub specular: Option<TextureInfo>,
}

/// Materials by id, built once from the document's records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaterialTable {
    entries: HashMap<String, MaterialEntry>,
}

impl MaterialTable {
    /// Unknown texture references are dropped from the entry and reported.
    pub fn from_descriptors(
        materials: &[MaterialDescriptor],
        textures: &[TextureDescriptor],
    ) -> (Self, Vec<MaterialResolutionError>) {
        let texture_map: HashMap<&str, TextureInfo> = textures
            .iter()
            .map(|t| (t.id.as_str(), TextureInfo::from_descriptor(t)))
            .collect();
        let mut diagnostics = Vec::new();
        let mut lookup = |material: &str, reference: &Option<String>| -> Option<TextureInfo> {
            let texture = reference.as_deref()?;
            match texture_map.get(texture) {
                Some(info) => Some(info.clone()),
                None => {
                    diagnostics.push(MaterialResolutionError::UnknownTexture {
                        material: material.to_string(),
                        texture: texture.to_string(),
                    });
                    None
                }
            }
        };

        let mut entries = HashMap::new();
        for descriptor in materials {
            let texture = lookup(&descriptor.id, &descriptor.texture_ref);
            let bump = lookup(&descriptor.id, &descriptor.bump_ref);
            let specular = lookup(&descriptor.id, &descriptor.specular_ref);
            let tex_length = texture.as_ref().map(|_| {
                [
                    descriptor.texlength_s.unwrap_or(1.0),
                    descriptor.texlength_t.unwrap_or(1.0),
                ]
            });
            entries.insert(
                descriptor.id.clone(),
                MaterialEntry {
                    shading: Shading::parse(descriptor.shading.as_deref()),
                    texture,
                    tex_length,
                    bump,
                    bump_scale: descriptor.bump_scale.unwrap_or(0.0),
                    specular,
                    descriptor: descriptor.clone(),
                },
            );
        }
        (Self { entries }, diagnostics)
    }

    pub fn get(&self, id: &str) -> Option<&MaterialEntry> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `size / length`, or 1 when that is zero or not finite.
pub fn repeat_factor(size: f32, length: f32) -> f32 {
    let factor = size / length;
    if factor.is_finite() && factor != 0.0 {
        factor
    } else {
        1.0
    }
}

/// Turns material ids plus face dimensions into materials, sharing textures
/// through its [`TextureStore`].
#[derive(Debug)]
pub struct MaterialResolver {
    table: MaterialTable,
    textures: TextureStore,
    default_material: Arc<Material>,
    reported: HashSet<String>,
    diagnostics: Vec<MaterialResolutionError>,
}

impl Default for MaterialResolver {
    fn default() -> Self {
        Self::new(MaterialTable::default())
    }
}

impl MaterialResolver {
    pub fn new(table: MaterialTable) -> Self {
        Self {
            table,
            textures: TextureStore::new(),
            default_material: Arc::new(Material::default_white()),
            reported: HashSet::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn table(&self) -> &MaterialTable {
        &self.table
    }

    pub fn textures(&self) -> &TextureStore {
        &self.textures
    }

    pub fn textures_mut(&mut self) -> &mut TextureStore {
        &mut self.textures
    }

    pub fn default_material(&self) -> Arc<Material> {
        Arc::clone(&self.default_material)
    }

    /// Drains problems found since the last call. Each unknown id is
    /// reported once.
    pub fn take_diagnostics(&mut self) -> Vec<MaterialResolutionError> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Material for a face of `width` x `height`. `"default"` and unknown
    /// ids yield the shared default material.
    pub fn resolve(&mut self, id: &str, width: f32, height: f32) -> Arc<Material> {
        if id == DEFAULT_MATERIAL_ID {
            return self.default_material();
        }
        let Some(entry) = self.table.get(id).cloned() else {
            if self.reported.insert(id.to_string()) {
                log::warn!("Unknown material '{id}', using the default material");
                self.diagnostics
                    .push(MaterialResolutionError::UnknownMaterial(id.to_string()));
            }
            return self.default_material();
        };
        Arc::new(self.build(&entry, width, height))
    }

    fn build(&mut self, entry: &MaterialEntry, width: f32, height: f32) -> Material {
        let d = &entry.descriptor;
        let repeat = match entry.tex_length {
            Some([s, t]) => [repeat_factor(width, s), repeat_factor(height, t)],
            None => [1.0, 1.0],
        };
        let map = entry.texture.as_ref().map(|info| TextureBinding {
            texture: self.textures.acquire(info),
            repeat,
        });
        let bump_map = entry.bump.as_ref().map(|info| TextureBinding {
            texture: self.textures.acquire(info),
            repeat,
        });
        let specular_map = entry.specular.as_ref().map(|info| TextureBinding {
            texture: self.textures.acquire(info),
            repeat,
        });
        Material {
            id: d.id.clone(),
            model: MaterialModel::Phong,
            color: d.color,
            specular: d.specular,
            shininess: d.shininess,
            emissive: d.emissive,
            emissive_intensity: 1.0,
            wireframe: d.wireframe,
            shading: entry.shading,
            side: if d.twosided { Side::Double } else { Side::Front },
            shadow_side: Side::Back,
            cast_shadow: d.castshadow,
            vertex_colors: false,
            map,
            bump_map,
            bump_scale: entry.bump_scale,
            specular_map,
        }
    }
}
