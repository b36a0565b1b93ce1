//! Frame-driven render driver around a built scene.

pub mod animation;
pub mod input;
pub mod timing;
mod window;

pub use window::run_windowed;

use std::path::Path;
use std::time::Instant;

use winit::keyboard::PhysicalKey;

use crate::builder::{BuildError, BuiltScene, CancellationToken, SceneBuilder};
use crate::config::ConfigError;
use crate::graph::{GraphError, NodeHandle, NodeKind, SceneGraph};
use crate::material::{MaterialResolutionError, MaterialResolver, MaterialTable};
use crate::render::camera::load_cameras;
use crate::render::skybox::load_skybox;
use crate::render::{Camera, CameraController, CameraRig, FrameView, RenderError, Renderer, Skybox};
use crate::scene::serialization::{load_scene_from_file, SerializationError};
use crate::scene::{FogDescriptor, GlobalOptions, SceneDocument};
use animation::{bind_animations, AnimationError, PathAnimation};
use input::{InputAction, InputState};
use timing::FrameTiming;

/// Mip images decoded per frame.
const TEXTURE_BUDGET: usize = 4;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Serialization(#[from] SerializationError),
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("window system error: {0}")]
    Window(String),
}

/// Everything produced from one scene document.
#[derive(Debug)]
pub struct LoadedScene {
    pub built: BuiltScene,
    pub cameras: CameraRig,
    pub skybox: Option<Skybox>,
    pub globals: GlobalOptions,
    pub fog: Option<FogDescriptor>,
    pub animations: Vec<PathAnimation>,
    /// Problems found in the material and texture tables before building.
    pub material_warnings: Vec<MaterialResolutionError>,
    pub animation_warnings: Vec<AnimationError>,
}

impl LoadedScene {
    pub fn graph(&self) -> &SceneGraph {
        &self.built.graph
    }
}

/// Builds a document from `root` (or its own root id).
pub fn load_scene(
    document: &SceneDocument,
    root: Option<&str>,
    cancel: CancellationToken,
) -> Result<LoadedScene, AppError> {
    let (table, material_warnings) = MaterialTable::from_descriptors(&document.materials, &document.textures);
    for warning in &material_warnings {
        log::warn!("{warning}");
    }
    log::info!(
        "Loaded {} materials and {} textures",
        table.len(),
        document.textures.len()
    );

    let root_id = root.unwrap_or(&document.root_id);
    let mut built = SceneBuilder::new(&document.nodes, MaterialResolver::new(table))
        .with_cancellation(cancel)
        .build(root_id)?;

    let cameras = CameraRig::new(load_cameras(&document.cameras), document.initial_camera.as_deref());
    let skybox = document
        .default_skybox()
        .map(|descriptor| load_skybox(descriptor, built.materials.textures_mut()));
    let (animations, animation_warnings) =
        bind_animations(&document.animations, &built.graph, built.container);

    log::info!(
        "Scene '{root_id}' ready: {} nodes, {} cameras, {} animations",
        built.graph.len(),
        cameras.cameras().len(),
        animations.len()
    );
    Ok(LoadedScene {
        built,
        cameras,
        skybox,
        globals: document.options.clone(),
        fog: document.fog.clone(),
        animations,
        material_warnings,
        animation_warnings,
    })
}

pub fn load_scene_file(path: &Path, root: Option<&str>) -> Result<LoadedScene, AppError> {
    let document = load_scene_from_file(path)?;
    log::info!("Read scene document {}", path.display());
    load_scene(&document, root, CancellationToken::new())
}

pub struct SceneApp {
    scene: LoadedScene,
    lods: Vec<NodeHandle>,
    input: InputState,
    camera: CameraController,
    timing: FrameTiming,
    viewport: (u32, u32),
    animations_running: bool,
    quit_requested: bool,
}

impl SceneApp {
    pub fn new(scene: LoadedScene, viewport: (u32, u32)) -> Self {
        let graph = &scene.built.graph;
        let lods = graph
            .descendants(scene.built.container)
            .into_iter()
            .filter(|&handle| matches!(graph.get(handle).map(|n| n.kind()), Some(NodeKind::Lod(_))))
            .collect();
        let camera = CameraController::from_camera(scene.cameras.active());
        Self {
            scene,
            lods,
            input: InputState::default(),
            camera,
            timing: FrameTiming::new("stagehand".to_string()),
            viewport,
            animations_running: true,
            quit_requested: false,
        }
    }

    pub fn scene(&self) -> &LoadedScene {
        &self.scene
    }

    /// Game and GUI layers may change transforms, visibility and materials.
    pub fn graph_mut(&mut self) -> &mut SceneGraph {
        &mut self.scene.built.graph
    }

    pub fn camera(&self) -> &Camera {
        self.scene.cameras.active()
    }

    pub fn title(&self) -> String {
        format!("{} - {}", self.timing.title(), self.camera().name)
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.viewport = (width, height);
    }

    pub fn handle_key(&mut self, key: PhysicalKey, pressed: bool) {
        match self.input.handle_key(key, pressed) {
            Some(InputAction::CycleCamera) => {
                let next = self.scene.cameras.cycle();
                log::info!("Switched to camera '{}'", next.name);
                self.camera = CameraController::from_camera(next);
            }
            Some(InputAction::ToggleAnimations) => self.toggle_animations(),
            Some(InputAction::Quit) => self.quit_requested = true,
            None => {}
        }
    }

    /// Accepts a camera id or its `_cam` name.
    pub fn switch_camera(&mut self, id_or_name: &str) -> bool {
        if !self.scene.cameras.set_active(id_or_name) {
            log::warn!("No camera named '{id_or_name}'");
            return false;
        }
        self.camera = CameraController::from_camera(self.scene.cameras.active());
        true
    }

    pub fn toggle_animations(&mut self) {
        self.animations_running = !self.animations_running;
        for animation in &mut self.scene.animations {
            if self.animations_running {
                animation.play();
            } else {
                animation.stop();
            }
        }
    }

    /// Runs one frame. Returns true when the fps reading was refreshed.
    pub fn frame<R: Renderer + ?Sized>(&mut self, now: Instant, renderer: &mut R) -> Result<bool, AppError> {
        let fps_updated = self.timing.update(now);
        let dt = self.timing.frame_dt;

        let loaded = self
            .scene
            .built
            .materials
            .textures_mut()
            .poll_pending(TEXTURE_BUDGET);
        if loaded > 0 {
            log::debug!("Loaded {loaded} mipmap levels");
        }

        for animation in &mut self.scene.animations {
            animation.update(dt, &mut self.scene.built.graph)?;
        }

        if self.camera.update_movement(&self.input.to_movement(), dt) {
            self.camera.apply(self.scene.cameras.active_mut());
        }

        self.update_lods()?;

        let (width, height) = self.viewport;
        if width == 0 || height == 0 {
            return Ok(fps_updated);
        }
        let render_start = Instant::now();
        let scene = &self.scene;
        renderer.render(&FrameView {
            graph: &scene.built.graph,
            root: scene.built.root,
            camera: scene.cameras.active(),
            textures: scene.built.materials.textures(),
            skybox: scene.skybox.as_ref(),
            globals: &scene.globals,
            fog: scene.fog.as_ref(),
            viewport: self.viewport,
        })?;
        self.timing
            .set_render_ms(render_start.elapsed().as_secs_f32() * 1000.0);
        Ok(fps_updated)
    }

    fn update_lods(&mut self) -> Result<(), AppError> {
        let eye = self.scene.cameras.active().position;
        let graph = &mut self.scene.built.graph;
        for &lod in &self.lods {
            let world = graph.world_transform(lod).ok_or(GraphError::StaleHandle)?;
            graph.update_lod(lod, eye.distance(world.w_axis.truncate()));
        }
        Ok(())
    }
}
