//! Stagehand - declarative 3D scene composition.
//!
//! A JSON scene document (nodes, LOD containers, primitives, lights,
//! materials, textures, cameras, skyboxes, animation paths) is turned into an
//! arena-backed scene graph by [`builder`], then driven frame by frame by
//! [`app::SceneApp`] through the [`render::Renderer`] boundary.

pub mod app;
pub mod builder;
pub mod config;
pub mod geometry;
pub mod graph;
pub mod material;
pub mod render;
pub mod scene;
pub mod transform;
