use crate::scene::SceneDocument;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum SerializationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("node stored under key '{key}' declares id '{id}'")]
    NodeIdMismatch { key: String, id: String },
    #[error("scene has no root id")]
    MissingRootId,
}

pub type Result<T> = std::result::Result<T, SerializationError>;

pub fn save_scene_to_file(scene: &SceneDocument, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(scene)?;
    std::fs::write(path, json)?;
    Ok(())
}

pub fn load_scene_from_file(path: &Path) -> Result<SceneDocument> {
    let json = std::fs::read_to_string(path)?;
    parse_scene(&json)
}

/// Parses a document and fills node ids from their map keys where omitted.
pub fn parse_scene(json: &str) -> Result<SceneDocument> {
    let mut scene: SceneDocument = serde_json::from_str(json)?;
    if scene.root_id.is_empty() {
        return Err(SerializationError::MissingRootId);
    }
    for (key, node) in scene.nodes.iter_mut() {
        if node.id.is_empty() {
            node.id = key.clone();
        } else if node.id != *key {
            return Err(SerializationError::NodeIdMismatch {
                key: key.clone(),
                id: node.id.clone(),
            });
        }
    }
    Ok(scene)
}
