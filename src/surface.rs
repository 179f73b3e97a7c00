use crate::scene::{Scene, SceneId};
use crate::ui::Overlay;

/// Something that can draw scenes.
///
/// The state machine talks to the GPU only through this trait, so it can be
/// driven headless with a recording implementation.
pub trait RenderSurface {
    /// Create or finish creating the resources for `scene`. Returns `true`
    /// once the scene can be rendered. Called every tick until it succeeds.
    fn prepare(&mut self, scene: &Scene) -> bool;

    /// Draw one frame of `scene` with the overlay on top.
    fn render(&mut self, scene: &Scene, overlay: &Overlay);

    fn resize(&mut self, width: u32, height: u32);

    /// Drop every resource held for the scene.
    fn release(&mut self, id: &SceneId);
}
