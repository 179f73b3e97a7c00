//! Exhibition environment loading and mesh classification.
//!
//! An [`Environment`] names one model file and the [`FlagPolicy`] used to
//! decide which of its meshes the visitor can bump into or click on. Loading
//! never blocks: [`Environment::begin_load`] hands back an [`EnvironmentLoad`]
//! that is polled once per frame.

use std::path::PathBuf;
use std::sync::Arc;
use std::task::Poll;

use serde::{Deserialize, Serialize};

use crate::collision::Aabb;
use crate::geometry::{ImageData, Material, RawGeometry};
use crate::importer::{AssetImporter, ImportError, ImportedModel, PendingImport};
use crate::mesh::Transform;

/// Rule set mapping mesh names to [`MeshFlags`].
///
/// The two policies come from successive versions of the exhibition and are
/// never mixed within one load.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlagPolicy {
    /// Names containing "collision" are invisible blockers, names containing
    /// "cloth" are visible blockers, everything else is decoration.
    #[default]
    NameConvention,
    /// Every mesh blocks and can be picked.
    Unconditional,
}

/// Per-mesh interaction flags, fixed at load time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MeshFlags {
    pub collidable: bool,
    pub pickable: bool,
    pub visible: bool,
}

impl MeshFlags {
    pub const DECORATION: Self = Self {
        collidable: false,
        pickable: false,
        visible: true,
    };
}

/// Classify a mesh by name.
pub fn classify(name: &str, policy: FlagPolicy) -> MeshFlags {
    match policy {
        FlagPolicy::Unconditional => MeshFlags {
            collidable: true,
            pickable: true,
            visible: true,
        },
        FlagPolicy::NameConvention if name.contains("collision") => MeshFlags {
            collidable: true,
            pickable: true,
            visible: false,
        },
        FlagPolicy::NameConvention if name.contains("cloth") => MeshFlags {
            collidable: true,
            pickable: true,
            visible: true,
        },
        FlagPolicy::NameConvention => MeshFlags::DECORATION,
    }
}

/// Name component of an installed environment node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeName(pub String);

/// One classified mesh node.
#[derive(Clone, Debug)]
pub struct EnvironmentNode {
    pub name: String,
    pub transform: Transform,
    pub geometry: Arc<RawGeometry>,
    pub material: Material,
    pub flags: MeshFlags,
    /// World-space bounds.
    pub bounds: Aabb,
}

/// A fully imported and classified environment.
#[derive(Clone, Debug)]
pub struct EnvironmentAsset {
    pub root: String,
    pub nodes: Vec<EnvironmentNode>,
    pub images: Vec<Arc<ImageData>>,
}

impl EnvironmentAsset {
    pub fn from_model(model: ImportedModel, policy: FlagPolicy) -> Self {
        let nodes = model
            .meshes
            .into_iter()
            .filter(|mesh| !mesh.geometry.is_empty())
            .map(|mesh| {
                let (min, max) = mesh.geometry.transformed_bounds(mesh.transform);
                let flags = classify(&mesh.name, policy);
                tracing::debug!(
                    "Mesh {}: collidable={} pickable={} visible={}",
                    mesh.name,
                    flags.collidable,
                    flags.pickable,
                    flags.visible
                );
                EnvironmentNode {
                    flags,
                    transform: Transform::from_matrix(mesh.transform),
                    bounds: Aabb::new(min, max),
                    geometry: Arc::new(mesh.geometry),
                    material: mesh.material,
                    name: mesh.name,
                }
            })
            .collect();

        Self {
            root: model.root,
            nodes,
            images: model.images.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn node(&self, name: &str) -> Option<&EnvironmentNode> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Spawn one entity per node.
    ///
    /// Every entity carries [`NodeName`], [`Transform`], [`MeshFlags`],
    /// `Arc<RawGeometry>`, [`Material`] and its world [`Aabb`].
    pub fn install(&self, world: &mut hecs::World) -> Vec<hecs::Entity> {
        self.nodes
            .iter()
            .map(|node| {
                world.spawn((
                    NodeName(node.name.clone()),
                    node.transform,
                    node.flags,
                    Arc::clone(&node.geometry),
                    node.material,
                    node.bounds,
                ))
            })
            .collect()
    }
}

/// Description of the environment to load.
#[derive(Clone, Debug)]
pub struct Environment {
    model: PathBuf,
    policy: FlagPolicy,
}

impl Environment {
    pub fn new(model: impl Into<PathBuf>, policy: FlagPolicy) -> Self {
        Self {
            model: model.into(),
            policy,
        }
    }

    pub fn begin_load(&self, importer: &impl AssetImporter) -> EnvironmentLoad {
        tracing::info!("Loading environment {}", self.model.display());
        EnvironmentLoad {
            pending: importer.import(&self.model),
            policy: self.policy,
        }
    }
}

/// An environment import in flight.
#[derive(Debug)]
pub struct EnvironmentLoad {
    pending: PendingImport,
    policy: FlagPolicy,
}

impl EnvironmentLoad {
    pub fn poll(&mut self) -> Poll<Result<EnvironmentAsset, ImportError>> {
        let policy = self.policy;
        self.pending
            .poll()
            .map(|result| result.map(|model| EnvironmentAsset::from_model(model, policy)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use crate::importer::{ImportedMesh, ROOT_NODE_NAME};
    use crate::mesh::Vertex3d;
    use glam::{Mat4, Vec3};

    fn unit_box_mesh(name: &str, offset: Vec3) -> ImportedMesh {
        let vertices = vec![
            Vertex3d::new([-0.5, -0.5, -0.5], [0.0, 1.0, 0.0], [0.0, 0.0]),
            Vertex3d::new([0.5, 0.5, 0.5], [0.0, 1.0, 0.0], [1.0, 1.0]),
            Vertex3d::new([0.5, -0.5, 0.5], [0.0, 1.0, 0.0], [1.0, 0.0]),
        ];
        ImportedMesh {
            name: name.to_string(),
            transform: Mat4::from_translation(offset),
            geometry: RawGeometry::new(vertices, vec![0, 1, 2]),
            material: Material::default(),
        }
    }

    fn model(names: &[&str]) -> ImportedModel {
        ImportedModel {
            root: ROOT_NODE_NAME.to_string(),
            meshes: names
                .iter()
                .map(|n| unit_box_mesh(n, Vec3::ZERO))
                .collect(),
            images: Vec::new(),
        }
    }

    struct Immediate(Vec<&'static str>);

    impl AssetImporter for Immediate {
        fn import(&self, path: &Path) -> PendingImport {
            PendingImport::resolved(path, Ok(model(&self.0)))
        }
    }

    #[test]
    fn collision_meshes_block_and_hide() {
        let flags = classify("wall_collision_01", FlagPolicy::NameConvention);
        assert_eq!(
            flags,
            MeshFlags {
                collidable: true,
                pickable: true,
                visible: false
            }
        );
    }

    #[test]
    fn cloth_meshes_block_and_stay_visible() {
        let flags = classify("curtain_cloth", FlagPolicy::NameConvention);
        assert!(flags.collidable);
        assert!(flags.pickable);
        assert!(flags.visible);
    }

    #[test]
    fn other_meshes_are_decoration() {
        assert_eq!(
            classify("floor_deco", FlagPolicy::NameConvention),
            MeshFlags::DECORATION
        );
    }

    #[test]
    fn unconditional_policy_blocks_everything() {
        for name in ["wall_collision_01", "curtain_cloth", "floor_deco"] {
            let flags = classify(name, FlagPolicy::Unconditional);
            assert!(flags.collidable && flags.pickable && flags.visible, "{name}");
        }
    }

    #[test]
    fn load_resolves_to_classified_nodes() {
        let importer = Immediate(vec!["wall_collision_01", "curtain_cloth", "floor_deco"]);
        let env = Environment::new("models/Layout.glb", FlagPolicy::NameConvention);
        let mut load = env.begin_load(&importer);

        let Poll::Ready(Ok(asset)) = load.poll() else {
            panic!("immediate import should resolve on first poll");
        };
        assert_eq!(asset.root, ROOT_NODE_NAME);
        assert_eq!(asset.nodes.len(), 3);
        assert!(!asset.node("wall_collision_01").unwrap().flags.visible);
        assert!(asset.node("curtain_cloth").unwrap().flags.collidable);
        assert!(!asset.node("floor_deco").unwrap().flags.pickable);
    }

    #[test]
    fn bounds_are_in_world_space() {
        let model = ImportedModel {
            root: ROOT_NODE_NAME.to_string(),
            meshes: vec![unit_box_mesh("pillar_cloth", Vec3::new(4.0, 0.0, 0.0))],
            images: Vec::new(),
        };
        let asset = EnvironmentAsset::from_model(model, FlagPolicy::NameConvention);
        let bounds = asset.nodes[0].bounds;
        assert_eq!(bounds.min, Vec3::new(3.5, -0.5, -0.5));
        assert_eq!(bounds.max, Vec3::new(4.5, 0.5, 0.5));
    }

    #[test]
    fn install_spawns_one_entity_per_node() {
        let asset = EnvironmentAsset::from_model(
            model(&["wall_collision_01", "floor_deco"]),
            FlagPolicy::NameConvention,
        );
        let mut world = hecs::World::new();
        let entities = asset.install(&mut world);
        assert_eq!(entities.len(), 2);

        let name = world.get::<&NodeName>(entities[0]).unwrap();
        assert_eq!(name.0, "wall_collision_01");
        let flags = world.get::<&MeshFlags>(entities[1]).unwrap();
        assert_eq!(*flags, MeshFlags::DECORATION);
    }

    #[test]
    fn empty_meshes_are_dropped() {
        let mut model = model(&["floor_deco"]);
        model.meshes[0].geometry = RawGeometry::default();
        let asset = EnvironmentAsset::from_model(model, FlagPolicy::NameConvention);
        assert!(asset.nodes.is_empty());
    }
}
