//! Viewer configuration.
//!
//! Everything that is tuning data rather than behaviour lives here: window
//! size, asset paths, colours, lights, camera and physics parameters. The
//! defaults reproduce the exhibition as it was first shown; a RON file can
//! override any subset of fields.
//!
//! ```ron
//! (
//!     assets: (root: "dist"),
//!     physics: (gravity: (0.0, -0.5, 0.0)),
//!     environment: (flag_policy: Unconditional),
//! )
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use winit::keyboard::KeyCode;

use crate::environment::FlagPolicy;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExhibitConfig {
    pub window: WindowConfig,
    pub assets: AssetConfig,
    pub environment: EnvironmentConfig,
    pub atmosphere: AtmosphereConfig,
    pub lights: LightsConfig,
    pub camera: CameraConfig,
    pub physics: PhysicsConfig,
}

impl ExhibitConfig {
    /// Read and parse a RON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_ron(&text)?;
        tracing::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(text)?)
    }

    /// Asset path resolved against the asset root.
    pub fn asset_path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.assets.root.join(relative)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Artioma".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Directory every other asset path is relative to.
    pub root: PathBuf,
    pub environment_model: PathBuf,
    /// Equirectangular HDR panorama used for the skybox and ambient light.
    pub skybox: PathBuf,
    pub font: PathBuf,
    pub font_size: f32,
    /// Still image drawn behind the start overlay.
    pub background: Option<PathBuf>,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            environment_model: PathBuf::from("models/Layout.glb"),
            skybox: PathBuf::from("textures/sky.hdr"),
            font: PathBuf::from("fonts/ui.ttf"),
            font_size: 20.0,
            background: None,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    pub flag_policy: FlagPolicy,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AtmosphereConfig {
    /// Clear color of the start scene.
    pub start_clear_color: [f32; 4],
    pub clear_color: [f32; 4],
    pub ambient_color: [f32; 3],
    /// Weight of the panorama's mean radiance in the ambient term.
    pub environment_intensity: f32,
    pub fog_color: [f32; 3],
    /// Exponential-squared fog density, zero disables fog.
    pub fog_density: f32,
    pub exposure: f32,
}

impl Default for AtmosphereConfig {
    fn default() -> Self {
        Self {
            start_clear_color: [0.0, 0.0, 0.0, 1.0],
            clear_color: [0.015_686_275, 0.015_686_275, 0.203_921_57, 1.0],
            ambient_color: [0.345_098_05, 0.556_862_76, 0.835_294_1],
            environment_intensity: 0.04,
            fog_color: [0.015_686_275, 0.015_686_275, 0.203_921_57],
            fog_density: 0.0,
            exposure: 1.0,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LightConfig {
    pub name: String,
    pub position: [f32; 3],
    pub color: [f32; 3],
    pub intensity: f32,
    /// Distance at which the light has faded out.
    pub range: f32,
    /// Keep the light at the camera position every frame.
    pub follow_camera: bool,
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            name: "light".to_string(),
            position: [0.0, 0.0, 0.0],
            color: [1.0, 1.0, 1.0],
            intensity: 1.0,
            range: 100.0,
            follow_camera: false,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LightsConfig(pub Vec<LightConfig>);

impl Default for LightsConfig {
    fn default() -> Self {
        Self(vec![
            LightConfig {
                name: "sparklight".to_string(),
                position: [0.0, 0.0, 0.0],
                color: [0.086_274_51, 0.109_803_92, 0.152_941_18],
                intensity: 35.0,
                range: 100.0,
                follow_camera: false,
            },
            LightConfig {
                name: "omni".to_string(),
                position: [20.0, 20.0, 100.0],
                color: [1.0, 1.0, 1.0],
                intensity: 1.0,
                range: 100.0,
                follow_camera: true,
            },
        ])
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub position: [f32; 3],
    pub target: [f32; 3],
    pub fov_degrees: f32,
    /// Walking speed in units per second.
    pub speed: f32,
    /// Radians per pixel of mouse drag.
    pub sensitivity: f32,
    /// Collision body radii around the camera.
    pub ellipsoid: [f32; 3],
    pub keys: KeyBindings,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [0.0, 2.0, 0.0],
            target: [0.0, -8.0, 0.0],
            fov_degrees: 45.8,
            speed: 6.0,
            sensitivity: 0.004,
            ellipsoid: [1.0, 1.5, 1.0],
            keys: KeyBindings::default(),
        }
    }
}

/// Movement keys. Each action accepts any of its listed keys.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub forward: Vec<KeyCode>,
    pub backward: Vec<KeyCode>,
    pub left: Vec<KeyCode>,
    pub right: Vec<KeyCode>,
    pub up: Vec<KeyCode>,
    pub down: Vec<KeyCode>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            forward: vec![KeyCode::KeyW, KeyCode::ArrowUp],
            backward: vec![KeyCode::KeyS, KeyCode::ArrowDown],
            left: vec![KeyCode::KeyA, KeyCode::ArrowLeft],
            right: vec![KeyCode::KeyD, KeyCode::ArrowRight],
            up: vec![KeyCode::KeyE],
            down: vec![KeyCode::KeyQ],
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Displacement applied per 60 Hz frame.
    pub gravity: [f32; 3],
    pub collisions: bool,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: [0.0, -0.9, 0.0],
            collisions: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_exhibition() {
        let config = ExhibitConfig::default();
        assert_eq!(config.physics.gravity, [0.0, -0.9, 0.0]);
        assert_eq!(config.camera.ellipsoid, [1.0, 1.5, 1.0]);
        assert_eq!(config.camera.position, [0.0, 2.0, 0.0]);
        assert_eq!(config.camera.keys.up, vec![KeyCode::KeyE]);
        assert_eq!(config.camera.keys.down, vec![KeyCode::KeyQ]);
        assert_eq!(config.lights.0.len(), 2);
        assert_eq!(config.environment.flag_policy, FlagPolicy::NameConvention);
    }

    #[test]
    fn partial_file_overrides_only_named_fields() {
        let config = ExhibitConfig::from_ron(
            "(physics: (gravity: (0.0, -0.5, 0.0)), environment: (flag_policy: Unconditional))",
        )
        .unwrap();

        assert_eq!(config.physics.gravity, [0.0, -0.5, 0.0]);
        assert!(config.physics.collisions);
        assert_eq!(config.environment.flag_policy, FlagPolicy::Unconditional);
        assert_eq!(config.window.title, "Artioma");
    }

    #[test]
    fn key_bindings_parse_by_name() {
        let config =
            ExhibitConfig::from_ron("(camera: (keys: (forward: [KeyZ], up: [Space])))").unwrap();
        assert_eq!(config.camera.keys.forward, vec![KeyCode::KeyZ]);
        assert_eq!(config.camera.keys.up, vec![KeyCode::Space]);
        assert_eq!(config.camera.keys.left, KeyBindings::default().left);
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let err = ExhibitConfig::from_ron("(window: (width: \"wide\"))").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn load_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exhibit.ron");
        std::fs::write(&path, "(window: (title: \"Preview\"))").unwrap();

        let config = ExhibitConfig::load(&path).unwrap();
        assert_eq!(config.window.title, "Preview");

        let missing = ExhibitConfig::load(dir.path().join("nope.ron")).unwrap_err();
        assert!(matches!(missing, ConfigError::Io { .. }));
    }
}
