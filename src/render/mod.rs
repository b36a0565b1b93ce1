pub mod camera;
pub mod light;
pub mod skybox;

pub use camera::{Camera, CameraController, CameraMovement, CameraRig};
pub use light::{LightKind, LightNode};
pub use skybox::Skybox;

use glam::Mat4;

use crate::geometry::RenderableLeaf;
use crate::graph::{NodeHandle, SceneGraph};
use crate::material::texture::TextureStore;
use crate::scene::{FogDescriptor, GlobalOptions};

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("viewport has zero area ({width}x{height})")]
    EmptyViewport { width: u32, height: u32 },
    #[error("renderer backend failed: {0}")]
    Backend(String),
}

/// A visible mesh with its resolved world transform.
#[derive(Debug, Clone, Copy)]
pub struct DrawItem<'a> {
    pub node: NodeHandle,
    pub name: &'a str,
    pub world: Mat4,
    pub leaf: &'a RenderableLeaf,
}

#[derive(Debug, Clone, Copy)]
pub struct LightItem<'a> {
    pub node: NodeHandle,
    pub world: Mat4,
    pub light: &'a LightNode,
}

/// Everything a backend needs to draw one frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    pub graph: &'a SceneGraph,
    pub root: NodeHandle,
    pub camera: &'a Camera,
    pub textures: &'a TextureStore,
    pub skybox: Option<&'a Skybox>,
    pub globals: &'a GlobalOptions,
    pub fog: Option<&'a FogDescriptor>,
    pub viewport: (u32, u32),
}

impl<'a> FrameView<'a> {
    pub fn aspect(&self) -> f32 {
        let (w, h) = self.viewport;
        if h == 0 {
            1.0
        } else {
            w as f32 / h as f32
        }
    }

    /// Meshes whose whole ancestor chain is visible, in traversal order.
    pub fn visible_meshes(&self) -> Vec<DrawItem<'a>> {
        let graph = self.graph;
        let mut out = Vec::new();
        let mut stack = vec![(self.root, Mat4::IDENTITY)];
        while let Some((handle, parent_world)) = stack.pop() {
            let Some(node) = graph.get(handle) else {
                continue;
            };
            if !node.is_visible() {
                continue;
            }
            let world = parent_world * node.local_transform();
            if let Some(leaf) = node.as_mesh() {
                out.push(DrawItem {
                    node: handle,
                    name: node.name(),
                    world,
                    leaf,
                });
            }
            stack.extend(node.children().iter().rev().map(|&child| (child, world)));
        }
        out
    }

    /// Enabled lights under visible ancestors.
    pub fn active_lights(&self) -> Vec<LightItem<'a>> {
        let graph = self.graph;
        graph
            .descendants(self.root)
            .into_iter()
            .filter(|&handle| graph.is_effectively_visible(handle))
            .filter_map(|handle| {
                let light = graph.get(handle)?.as_light()?;
                if !light.enabled {
                    return None;
                }
                Some(LightItem {
                    node: handle,
                    world: graph.world_transform(handle)?,
                    light,
                })
            })
            .collect()
    }
}

/// Drawing backend boundary.
pub trait Renderer {
    fn render(&mut self, frame: &FrameView<'_>) -> Result<(), RenderError>;
}

/// Backend that draws nothing and counts what it would have drawn.
#[derive(Debug, Default)]
pub struct NullRenderer {
    pub frames: u64,
    pub last_draw_count: usize,
    pub last_light_count: usize,
    pub last_draw_names: Vec<String>,
}

impl Renderer for NullRenderer {
    fn render(&mut self, frame: &FrameView<'_>) -> Result<(), RenderError> {
        let (width, height) = frame.viewport;
        if width == 0 || height == 0 {
            return Err(RenderError::EmptyViewport { width, height });
        }
        let meshes = frame.visible_meshes();
        self.last_draw_count = meshes.len();
        self.last_light_count = frame.active_lights().len();
        self.last_draw_names = meshes.iter().map(|m| m.name.to_string()).collect();
        self.frames += 1;
        log::trace!(
            "Frame {}: {} meshes, {} lights via '{}'",
            self.frames,
            self.last_draw_count,
            self.last_light_count,
            frame.camera.name
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build;
    use crate::material::MaterialResolver;
    use crate::scene::{ChildRef, DescriptorMap, NodeDescriptor};
    use glam::Vec3;
    use serde_json::json;

    fn scene() -> crate::builder::BuiltScene {
        let nodes: DescriptorMap = [
            NodeDescriptor::group("scene")
                .with_child(ChildRef::node("shown"))
                .with_child(ChildRef::node("hidden"))
                .with_child(ChildRef::light(
                    "pointlight",
                    json!({ "id": "lamp", "color": [1, 1, 1], "position": [0, 3, 0] }),
                ))
                .with_child(ChildRef::light(
                    "pointlight",
                    json!({ "id": "off", "enabled": false, "color": [1, 1, 1], "position": [0, 3, 0] }),
                )),
            NodeDescriptor::group("shown").with_child(ChildRef::primitive(
                "rectangle",
                json!({ "xy1": [0, 0], "xy2": [2, 2] }),
            )),
            NodeDescriptor::group("hidden").with_child(ChildRef::primitive(
                "rectangle",
                json!({ "xy1": [0, 0], "xy2": [2, 2] }),
            )),
        ]
        .into_iter()
        .map(|node| (node.id.clone(), node))
        .collect();
        build(&nodes, "scene", MaterialResolver::default()).unwrap()
    }

    #[test]
    fn frame_view_collects_visible_meshes_and_enabled_lights() {
        let mut built = scene();
        let hidden = built.find("scene_hidden_obj").unwrap();
        built.graph.set_visible(hidden, false).unwrap();
        let shown = built.find("scene_shown_obj").unwrap();
        built.graph.set_position(shown, Vec3::new(0.0, 0.0, -4.0)).unwrap();

        let camera = Camera::default_perspective();
        let globals = GlobalOptions::default();
        let view = FrameView {
            graph: &built.graph,
            root: built.root,
            camera: &camera,
            textures: built.materials.textures(),
            skybox: None,
            globals: &globals,
            fog: None,
            viewport: (800, 400),
        };
        assert_eq!(view.aspect(), 2.0);

        let meshes = view.visible_meshes();
        assert_eq!(meshes.len(), 1);
        assert_eq!(meshes[0].name, "scene_shown_rectangle_obj");
        let origin = meshes[0].world.transform_point3(Vec3::ZERO);
        assert!((origin - Vec3::new(1.0, 1.0, -4.0)).length() < 1e-5);

        let lights = view.active_lights();
        assert_eq!(lights.len(), 1);
        assert_eq!(lights[0].light.id, "lamp");
    }

    #[test]
    fn null_renderer_counts_and_rejects_empty_viewports() {
        let built = scene();
        let camera = Camera::default_perspective();
        let globals = GlobalOptions::default();
        let mut view = FrameView {
            graph: &built.graph,
            root: built.root,
            camera: &camera,
            textures: built.materials.textures(),
            skybox: None,
            globals: &globals,
            fog: None,
            viewport: (640, 480),
        };
        let mut renderer = NullRenderer::default();
        renderer.render(&view).unwrap();
        assert_eq!(renderer.frames, 1);
        assert_eq!(renderer.last_draw_count, 2);
        assert_eq!(renderer.last_light_count, 1);

        view.viewport = (0, 480);
        assert!(matches!(
            renderer.render(&view),
            Err(RenderError::EmptyViewport { width: 0, height: 480 })
        ));
        assert_eq!(renderer.frames, 1);
    }
}
