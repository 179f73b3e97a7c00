//! Scene definition and identifier types.

use std::path::PathBuf;
use std::sync::Arc;

use glam::Vec3;

use crate::camera::Camera;
use crate::collision::{self, Aabb, Ray, RayHit};
use crate::config::{AtmosphereConfig, LightConfig};
use crate::environment::{EnvironmentAsset, NodeName};
use crate::geometry::ImageData;
use crate::input::Input;
use crate::mesh_pass::MAX_LIGHTS;
use crate::ui::Color;
use crate::walk_camera::WalkCamera;

/// Unique identifier for a scene.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SceneId(pub(crate) String);

impl SceneId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SceneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SceneId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Which of the two exhibition scenes this is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SceneKind {
    Start,
    Game,
}

impl SceneKind {
    pub fn id(self) -> SceneId {
        match self {
            SceneKind::Start => SceneId::new("start"),
            SceneKind::Game => SceneId::new("game"),
        }
    }
}

/// Lighting environment of a scene.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Atmosphere {
    pub clear_color: Color,
    pub ambient_color: Vec3,
    /// Weight of the skybox panorama in the ambient term.
    pub environment_intensity: f32,
    pub fog_color: Vec3,
    pub fog_density: f32,
    pub exposure: f32,
}

impl Default for Atmosphere {
    fn default() -> Self {
        Self {
            clear_color: Color::BLACK,
            ambient_color: Vec3::ZERO,
            environment_intensity: 0.0,
            fog_color: Vec3::ZERO,
            fog_density: 0.0,
            exposure: 1.0,
        }
    }
}

impl From<&AtmosphereConfig> for Atmosphere {
    fn from(config: &AtmosphereConfig) -> Self {
        Self {
            clear_color: Color::from_array(config.clear_color),
            ambient_color: Vec3::from(config.ambient_color),
            environment_intensity: config.environment_intensity,
            fog_color: Vec3::from(config.fog_color),
            fog_density: config.fog_density,
            exposure: config.exposure,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PointLight {
    pub name: String,
    pub position: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    pub range: f32,
    pub follow_camera: bool,
}

impl From<&LightConfig> for PointLight {
    fn from(config: &LightConfig) -> Self {
        Self {
            name: config.name.clone(),
            position: Vec3::from(config.position),
            color: Vec3::from(config.color),
            intensity: config.intensity,
            range: config.range,
            follow_camera: config.follow_camera,
        }
    }
}

/// A renderable world with its own camera, lights and environment.
pub struct Scene {
    pub id: SceneId,
    pub kind: SceneKind,
    /// Installed environment nodes.
    pub world: hecs::World,
    pub camera: Camera,
    /// First-person controller, present once control can be attached.
    pub walker: Option<WalkCamera>,
    pub atmosphere: Atmosphere,
    pub lights: Vec<PointLight>,
    /// Equirectangular HDR panorama.
    pub skybox: Option<PathBuf>,
    /// Still image drawn full-screen behind the 3D content.
    pub background: Option<PathBuf>,
    /// Images referenced by node materials.
    pub images: Vec<Arc<ImageData>>,
    /// Name of the environment root, once installed.
    pub root: Option<String>,
    /// Per-triangle boxes of the collidable nodes, rebuilt on install.
    colliders: Vec<Aabb>,
    control_attached: bool,
}

impl Scene {
    pub fn new(kind: SceneKind) -> Self {
        Self {
            id: kind.id(),
            kind,
            world: hecs::World::new(),
            camera: Camera::new(),
            walker: None,
            atmosphere: Atmosphere::default(),
            lights: Vec::new(),
            skybox: None,
            background: None,
            images: Vec::new(),
            root: None,
            colliders: Vec::new(),
            control_attached: false,
        }
    }

    /// The start scene: static camera at the origin over a black clear color.
    pub fn start(background: Option<PathBuf>, clear_color: Color) -> Self {
        let mut scene = Self::new(SceneKind::Start);
        scene.atmosphere.clear_color = clear_color;
        scene.camera = Camera::new().at(Vec3::ZERO).looking_at(Vec3::NEG_Z);
        scene.background = background;
        scene
    }

    pub fn install_environment(&mut self, asset: &EnvironmentAsset) -> usize {
        let entities = asset.install(&mut self.world);
        self.images = asset.images.clone();
        self.root = Some(asset.root.clone());
        self.colliders = collision::collidable_boxes(&self.world);
        tracing::debug!("{} collision boxes", self.colliders.len());
        entities.len()
    }

    pub fn apply_atmosphere(&mut self, config: &AtmosphereConfig) {
        self.atmosphere = Atmosphere::from(config);
    }

    pub fn set_lights<'a>(&mut self, lights: impl IntoIterator<Item = &'a LightConfig>) {
        self.lights = lights.into_iter().map(PointLight::from).collect();
        if self.lights.len() > MAX_LIGHTS {
            tracing::warn!(
                "{} lights configured, only the first {} are drawn",
                self.lights.len(),
                MAX_LIGHTS
            );
            self.lights.truncate(MAX_LIGHTS);
        }
    }

    pub fn node_count(&self) -> usize {
        self.world.len() as usize
    }

    pub fn control_attached(&self) -> bool {
        self.control_attached
    }

    pub fn attach_control(&mut self) {
        self.control_attached = true;
    }

    pub fn detach_control(&mut self) {
        self.control_attached = false;
    }

    /// Move every camera-following light to the camera.
    pub fn follow_camera_lights(&mut self) {
        let position = self.camera.position;
        for light in self.lights.iter_mut().filter(|l| l.follow_camera) {
            light.position = position;
        }
    }

    pub fn colliders(&self) -> &[Aabb] {
        &self.colliders
    }

    /// Advance the walk camera against the scene colliders and follow it.
    pub fn update_walker(&mut self, input: &Input, dt: f32) {
        if let Some(walker) = self.walker.as_mut() {
            walker.update(input, dt, &self.colliders);
            self.camera = walker.camera();
        }
    }

    /// Nearest pickable node along the ray, with its name.
    pub fn pick(&self, ray: &Ray) -> Option<(RayHit, String)> {
        let hit = collision::raycast_pickable(&self.world, ray)?;
        let name = self
            .world
            .get::<&NodeName>(hit.entity)
            .map(|n| n.0.clone())
            .unwrap_or_default();
        Some((hit, name))
    }
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("id", &self.id)
            .field("nodes", &self.node_count())
            .field("control_attached", &self.control_attached)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LightsConfig;

    #[test]
    fn start_scene_is_static_and_black() {
        let scene = Scene::start(None, Color::BLACK);
        assert_eq!(scene.id.as_str(), "start");
        assert_eq!(scene.camera.position, Vec3::ZERO);
        assert!(scene.walker.is_none());
        assert_eq!(scene.atmosphere.clear_color, Color::BLACK);
    }

    #[test]
    fn only_following_lights_track_the_camera() {
        let mut scene = Scene::new(SceneKind::Game);
        scene.set_lights(&LightsConfig::default().0);
        scene.camera.position = Vec3::new(3.0, 1.5, -7.0);
        scene.follow_camera_lights();

        let omni = scene.lights.iter().find(|l| l.name == "omni").unwrap();
        let spark = scene.lights.iter().find(|l| l.name == "sparklight").unwrap();
        assert_eq!(omni.position, scene.camera.position);
        assert_eq!(spark.position, Vec3::ZERO);
    }

    #[test]
    fn collision_shell_is_solid_after_install() {
        use crate::environment::{EnvironmentAsset, FlagPolicy};
        use crate::geometry::Material;
        use crate::importer::{ImportedMesh, ImportedModel};

        let model = ImportedModel {
            root: "__root__".into(),
            meshes: vec![ImportedMesh {
                name: "room_collision".into(),
                transform: glam::Mat4::IDENTITY,
                geometry: collision::tests::room_shell(
                    Vec3::new(-20.0, -1.0, -20.0),
                    Vec3::new(20.0, 5.0, 20.0),
                ),
                material: Material::default(),
            }],
            images: Vec::new(),
        };
        let mut scene = Scene::new(SceneKind::Game);
        scene.install_environment(&EnvironmentAsset::from_model(model, FlagPolicy::NameConvention));
        assert_eq!(scene.colliders().len(), 12);

        let mut walker = WalkCamera::default();
        walker.apply_gravity = true;
        walker.check_collisions = true;
        scene.walker = Some(walker);

        let input = Input::new();
        for _ in 0..120 {
            scene.update_walker(&input, 1.0 / 60.0);
        }
        assert!(scene.camera.position.y > 0.0, "fell to {}", scene.camera.position.y);
    }
}

