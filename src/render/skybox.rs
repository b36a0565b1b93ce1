use std::sync::Arc;

use crate::geometry::{generate_box, GeometryData};
use crate::material::texture::{TextureId, TextureStore};
use crate::material::{Material, MaterialModel, Side, TextureBinding};
use crate::scene::SkyboxDescriptor;

pub const SKYBOX_NAME: &str = "skyBox";

/// Inward-facing textured box surrounding the scene.
#[derive(Debug, Clone)]
pub struct Skybox {
    pub name: String,
    pub geometry: Arc<GeometryData>,
    /// In box face order: right, left, up, down, front, back.
    pub faces: Vec<Arc<Material>>,
}

impl Skybox {
    pub fn face_texture(&self, index: usize) -> Option<TextureId> {
        self.faces.get(index).and_then(|m| m.map).map(|b| b.texture)
    }
}

pub fn load_skybox(descriptor: &SkyboxDescriptor, textures: &mut TextureStore) -> Skybox {
    let [w, h, d] = descriptor.size;
    let face_paths = [
        &descriptor.right,
        &descriptor.left,
        &descriptor.up,
        &descriptor.down,
        &descriptor.front,
        &descriptor.back,
    ];
    let faces = face_paths
        .iter()
        .map(|path| {
            let texture = textures.acquire_image(path);
            Arc::new(Material {
                id: format!("{SKYBOX_NAME}:{path}"),
                model: MaterialModel::Standard,
                side: Side::Back,
                emissive: descriptor.emissive,
                emissive_intensity: descriptor.intensity / 10.0,
                map: Some(TextureBinding {
                    texture,
                    repeat: [1.0, 1.0],
                }),
                ..Material::default_white()
            })
        })
        .collect();
    log::debug!("Skybox '{}' with size {w}x{h}x{d}", descriptor.id);
    Skybox {
        name: SKYBOX_NAME.to_string(),
        geometry: Arc::new(generate_box(w, h, d, [1, 1, 1])),
        faces,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::texture::TextureSource;
    use std::path::PathBuf;

    fn descriptor() -> SkyboxDescriptor {
        SkyboxDescriptor {
            id: "default".to_string(),
            size: [100.0, 50.0, 100.0],
            emissive: [1.0, 1.0, 1.0],
            intensity: 5.0,
            up: "sky/up.png".to_string(),
            down: "sky/down.png".to_string(),
            left: "sky/left.png".to_string(),
            right: "sky/right.png".to_string(),
            front: "sky/front.png".to_string(),
            back: "sky/back.png".to_string(),
        }
    }

    #[test]
    fn faces_follow_box_group_order() {
        let mut store = TextureStore::new();
        let skybox = load_skybox(&descriptor(), &mut store);
        assert_eq!(skybox.name, "skyBox");
        assert_eq!(skybox.geometry.groups.len(), 6);

        let expected = ["right", "left", "up", "down", "front", "back"];
        for (index, face) in expected.iter().enumerate() {
            let texture = store.get(skybox.face_texture(index).unwrap()).unwrap();
            assert_eq!(texture.source, TextureSource::Image(PathBuf::from(format!("sky/{face}.png"))));
        }
    }

    #[test]
    fn faces_render_inside_with_scaled_emission() {
        let mut store = TextureStore::new();
        let skybox = load_skybox(&descriptor(), &mut store);
        for face in &skybox.faces {
            assert_eq!(face.side, Side::Back);
            assert_eq!(face.model, MaterialModel::Standard);
            assert_eq!(face.emissive_intensity, 0.5);
        }
    }
}
