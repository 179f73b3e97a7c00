//! # Artioma
//!
//! **A first-person walkthrough of a contemporary art exhibition.**
//!
//! The visitor lands on a start screen, reads a paged introduction, presses
//! play and walks through a 3D gallery imported from glTF, with gravity,
//! collisions against the gallery walls and click-to-pick on the artworks.
//!
//! ## Layout
//!
//! - [`Exhibition`] is the state machine: it owns the [`scene`]s, the
//!   [`Overlay`] and the [`DialoguePresenter`], and never blocks a frame.
//! - [`RenderSurface`] and [`AssetImporter`] are the two capabilities it
//!   needs. [`WgpuRenderer`] and [`GltfImporter`] are the real ones; tests use
//!   recording fakes.
//! - [`app::run`] opens the window and drives everything from winit.
//! - [`server`] serves the built web bundle with a single-page fallback.
//!
//! ```ignore
//! artioma::logging::init();
//! let config = artioma::config::ExhibitConfig::load("exhibit.ron")?;
//! artioma::app::run(config)?;
//! ```

pub mod app;
mod assets;
mod camera;
mod collision;
pub mod config;
mod dialogue;
mod draw2d;
mod environment;
mod exhibition;
mod geometry;
mod gpu;
mod importer;
mod input;
pub mod logging;
mod mesh;
mod mesh_pass;
mod renderer;
pub mod scene;
pub mod server;
mod skybox;
mod state;
mod surface;
mod texture;
mod ui;
mod walk_camera;

pub use assets::FontAtlas;
pub use camera::Camera;
pub use collision::{Aabb, Ray, RayHit};
pub use dialogue::{DialogueCursor, DialoguePresenter, DialogueText, NavOutcome, texts};
pub use draw2d::Draw2d;
pub use environment::{Environment, EnvironmentAsset, FlagPolicy, MeshFlags, classify};
pub use exhibition::{Exhibition, PlayRequest};
pub use geometry::{ImageData, Material, RawGeometry};
pub use gpu::GpuContext;
pub use importer::{
    AssetImporter, GltfImporter, ImportError, ImportResult, ImportedMesh, ImportedModel,
    PendingImport,
};
pub use input::{Input, Modifiers};
pub use mesh::{Mesh, Transform, Vertex3d};
pub use mesh_pass::MeshPass;
pub use renderer::{RenderError, WgpuRenderer};
pub use state::ApplicationState;
pub use surface::RenderSurface;
pub use texture::{Panorama, Texture};
pub use ui::{Color, ElementId, Overlay, Rect, UiError};
pub use walk_camera::WalkCamera;

// Re-export glam math types for convenience
pub use glam::{Mat4, Quat, Vec2, Vec3};

// Re-export commonly used winit types for convenience
pub use winit::keyboard::KeyCode;

pub use hecs::{Entity, World};
