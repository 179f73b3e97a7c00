//! Scenes of the exhibition.
//!
//! There are two: the start scene behind the introduction overlay, and the
//! game scene holding the walkable environment. Each has its own camera,
//! lights and ECS world. [`SceneRegistry`] keeps exactly one of them active
//! and hands the replaced scene to the render surface for release.
//!
//! # Example
//!
//! ```ignore
//! let mut registry = SceneRegistry::new();
//! registry.activate(Scene::start(None, Color::BLACK), &mut surface);
//!
//! let mut game = Scene::new(SceneKind::Game);
//! game.install_environment(&asset);
//! registry.stage(game);
//!
//! // Releases "start" through the surface, then attaches "game"
//! registry.activate_pending(&mut surface);
//! ```

mod registry;
pub mod scene;

pub use registry::SceneRegistry;
pub use scene::{Atmosphere, PointLight, Scene, SceneId, SceneKind};
