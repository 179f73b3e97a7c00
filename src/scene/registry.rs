//! Ownership of the active scene and the one being built.

use super::scene::{Scene, SceneId};
use crate::surface::RenderSurface;

/// Holds at most one active scene plus at most one scene under construction.
///
/// Replacing the active scene releases the previous one through the render
/// surface before the new one is attached, so every scene is released exactly
/// once.
#[derive(Debug, Default)]
pub struct SceneRegistry {
    active: Option<Scene>,
    pending: Option<Scene>,
}

impl SceneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Park a scene that is still being built. A scene already parked is
    /// returned.
    pub fn stage(&mut self, scene: Scene) -> Option<Scene> {
        tracing::debug!("Staging scene '{}'", scene.id);
        self.pending.replace(scene)
    }

    pub fn pending(&self) -> Option<&Scene> {
        self.pending.as_ref()
    }

    pub fn pending_mut(&mut self) -> Option<&mut Scene> {
        self.pending.as_mut()
    }

    pub fn active(&self) -> Option<&Scene> {
        self.active.as_ref()
    }

    pub fn active_mut(&mut self) -> Option<&mut Scene> {
        self.active.as_mut()
    }

    pub fn active_id(&self) -> Option<&SceneId> {
        self.active.as_ref().map(|s| &s.id)
    }

    /// Make the parked scene active. Returns `false` when nothing is parked.
    pub fn activate_pending(&mut self, surface: &mut impl RenderSurface) -> bool {
        match self.pending.take() {
            Some(scene) => {
                self.activate(scene, surface);
                true
            }
            None => false,
        }
    }

    /// Release the current active scene, then attach `scene`.
    pub fn activate(&mut self, scene: Scene, surface: &mut impl RenderSurface) {
        if let Some(mut previous) = self.active.take() {
            previous.detach_control();
            surface.release(&previous.id);
            tracing::info!("Released scene '{}'", previous.id);
        }
        tracing::info!("Scene '{}' is active", scene.id);
        self.active = Some(scene);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneKind;
    use crate::ui::Overlay;

    #[derive(Default)]
    struct Releases(Vec<SceneId>);

    impl RenderSurface for Releases {
        fn prepare(&mut self, _: &Scene) -> bool {
            true
        }
        fn render(&mut self, _: &Scene, _: &Overlay) {}
        fn resize(&mut self, _: u32, _: u32) {}
        fn release(&mut self, id: &SceneId) {
            self.0.push(id.clone());
        }
    }

    #[test]
    fn first_activation_releases_nothing() {
        let mut registry = SceneRegistry::new();
        let mut surface = Releases::default();
        registry.stage(Scene::new(SceneKind::Start));

        assert!(registry.activate_pending(&mut surface));
        assert_eq!(registry.active_id(), Some(&SceneId::new("start")));
        assert!(surface.0.is_empty());
        assert!(!registry.activate_pending(&mut surface));
    }

    #[test]
    fn replacing_releases_previous_once() {
        let mut registry = SceneRegistry::new();
        let mut surface = Releases::default();
        registry.activate(Scene::new(SceneKind::Start), &mut surface);
        registry.stage(Scene::new(SceneKind::Game));
        registry.activate_pending(&mut surface);

        assert_eq!(surface.0, vec![SceneId::new("start")]);
        assert_eq!(registry.active_id(), Some(&SceneId::new("game")));
        assert!(registry.pending().is_none());
    }
}
