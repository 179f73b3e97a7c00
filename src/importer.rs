//! Asynchronous model import.
//!
//! [`AssetImporter`] is the seam between the state machine and file parsing.
//! An import returns a [`PendingImport`] immediately; the caller polls it
//! once per frame until it yields a typed result. [`GltfImporter`] does the
//! parsing on a dedicated loader thread and reports back over a channel.
//!
//! # Example
//!
//! ```ignore
//! let importer = GltfImporter::new();
//! let mut pending = importer.import(Path::new("models/Layout.glb"));
//!
//! // Once per frame:
//! if let Poll::Ready(result) = pending.poll() {
//!     let model = result?;
//!     println!("{} meshes", model.meshes.len());
//! }
//! ```

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::task::Poll;
use std::time::Instant;

use glam::Mat4;

use crate::geometry::{ImageData, Material, RawGeometry};
use crate::mesh::Vertex3d;

/// Name given to the synthetic node that parents everything in a model.
pub const ROOT_NODE_NAME: &str = "__root__";

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("failed to start import of {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Gltf {
        path: PathBuf,
        #[source]
        source: gltf::Error,
    },
    #[error("{0} contains no scene")]
    EmptyDocument(PathBuf),
    #[error("unsupported model format '{0}'")]
    UnknownFormat(String),
    #[error("loader stopped before finishing {0}")]
    Interrupted(PathBuf),
}

/// One renderable mesh node, flattened out of the model hierarchy.
#[derive(Clone, Debug)]
pub struct ImportedMesh {
    pub name: String,
    /// Model-to-world transform including every ancestor.
    pub transform: Mat4,
    pub geometry: RawGeometry,
    pub material: Material,
}

/// Everything one model file produced.
#[derive(Clone, Debug)]
pub struct ImportedModel {
    pub root: String,
    pub meshes: Vec<ImportedMesh>,
    pub images: Vec<ImageData>,
}

pub type ImportResult = Result<ImportedModel, ImportError>;

/// Capability to import a model file without blocking the caller.
pub trait AssetImporter {
    fn import(&self, path: &Path) -> PendingImport;
}

/// Handle to an import in flight.
#[derive(Debug)]
pub struct PendingImport {
    path: PathBuf,
    receiver: Option<Receiver<ImportResult>>,
}

impl PendingImport {
    /// Create a handle and the sender that completes it.
    pub fn channel(path: impl Into<PathBuf>) -> (Sender<ImportResult>, Self) {
        let (sender, receiver) = mpsc::channel();
        let pending = Self {
            path: path.into(),
            receiver: Some(receiver),
        };
        (sender, pending)
    }

    /// A handle that is already complete.
    pub fn resolved(path: impl Into<PathBuf>, result: ImportResult) -> Self {
        let (sender, pending) = Self::channel(path);
        let _ = sender.send(result);
        pending
    }

    /// Whether the result has already been taken.
    pub fn is_finished(&self) -> bool {
        self.receiver.is_none()
    }

    /// Check for completion without blocking.
    ///
    /// Yields the result exactly once. A sender dropped without sending is
    /// reported as [`ImportError::Interrupted`]. After the result has been
    /// taken this keeps returning `Poll::Pending`.
    pub fn poll(&mut self) -> Poll<ImportResult> {
        let Some(receiver) = &self.receiver else {
            return Poll::Pending;
        };

        let result = match receiver.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return Poll::Pending,
            Err(TryRecvError::Disconnected) => Err(ImportError::Interrupted(self.path.clone())),
        };
        self.receiver = None;
        Poll::Ready(result)
    }
}

/// glTF 2.0 importer (`.gltf` and `.glb`) running on a loader thread.
#[derive(Clone, Copy, Debug, Default)]
pub struct GltfImporter;

impl GltfImporter {
    pub fn new() -> Self {
        Self
    }
}

impl AssetImporter for GltfImporter {
    fn import(&self, path: &Path) -> PendingImport {
        let (sender, pending) = PendingImport::channel(path);
        let owned = path.to_path_buf();

        let spawned = std::thread::Builder::new()
            .name("model-import".to_string())
            .spawn(move || {
                let started = Instant::now();
                let result = load_model(&owned);
                if let Ok(model) = &result {
                    tracing::info!(
                        "Imported {} ({} meshes, {} images) in {:.2?}",
                        owned.display(),
                        model.meshes.len(),
                        model.images.len(),
                        started.elapsed()
                    );
                }
                let _ = sender.send(result);
            });

        match spawned {
            Ok(_) => pending,
            Err(source) => PendingImport::resolved(
                path,
                Err(ImportError::Io {
                    path: path.to_path_buf(),
                    source,
                }),
            ),
        }
    }
}

/// Parse a model file synchronously.
pub fn load_model(path: &Path) -> ImportResult {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default();

    if ext != "glb" && ext != "gltf" {
        return Err(ImportError::UnknownFormat(ext));
    }

    let (document, buffers, images) = gltf::import(path).map_err(|source| ImportError::Gltf {
        path: path.to_path_buf(),
        source,
    })?;

    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .ok_or_else(|| ImportError::EmptyDocument(path.to_path_buf()))?;

    let mut meshes = Vec::new();
    for node in scene.nodes() {
        collect_meshes(&node, Mat4::IDENTITY, &buffers, &mut meshes);
    }

    let images = images.iter().map(convert_image).collect();

    Ok(ImportedModel {
        root: ROOT_NODE_NAME.to_string(),
        meshes,
        images,
    })
}

fn collect_meshes(
    node: &gltf::Node,
    parent: Mat4,
    buffers: &[gltf::buffer::Data],
    out: &mut Vec<ImportedMesh>,
) {
    let transform = parent * Mat4::from_cols_array_2d(&node.transform().matrix());

    if let Some(mesh) = node.mesh() {
        let base_name = node
            .name()
            .or_else(|| mesh.name())
            .map(str::to_string)
            .unwrap_or_else(|| format!("node{}", node.index()));
        let primitive_count = mesh.primitives().len();

        for (i, primitive) in mesh.primitives().enumerate() {
            let name = if primitive_count > 1 {
                format!("{base_name}_primitive{i}")
            } else {
                base_name.clone()
            };

            if primitive.mode() != gltf::mesh::Mode::Triangles {
                tracing::debug!("Skipping non-triangle primitive {name}");
                continue;
            }

            let Some(geometry) = read_geometry(&primitive, buffers) else {
                tracing::debug!("Skipping primitive {name} without positions");
                continue;
            };

            out.push(ImportedMesh {
                name,
                transform,
                geometry,
                material: read_material(&primitive.material()),
            });
        }
    }

    for child in node.children() {
        collect_meshes(&child, transform, buffers, out);
    }
}

fn read_geometry(primitive: &gltf::Primitive, buffers: &[gltf::buffer::Data]) -> Option<RawGeometry> {
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| &data.0[..]));

    let positions: Vec<[f32; 3]> = reader.read_positions()?.collect();
    let normals: Option<Vec<[f32; 3]>> = reader.read_normals().map(|n| n.collect());
    let uvs: Option<Vec<[f32; 2]>> = reader.read_tex_coords(0).map(|t| t.into_f32().collect());

    let vertices = positions
        .iter()
        .enumerate()
        .map(|(i, &position)| {
            let normal = normals
                .as_ref()
                .and_then(|n| n.get(i).copied())
                .unwrap_or([0.0, 1.0, 0.0]);
            let uv = uvs
                .as_ref()
                .and_then(|t| t.get(i).copied())
                .unwrap_or([0.0, 0.0]);
            Vertex3d::new(position, normal, uv)
        })
        .collect();

    let indices = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..positions.len() as u32).collect(),
    };

    let mut geometry = RawGeometry::new(vertices, indices);
    if normals.is_none() {
        geometry.recalculate_normals();
    }
    Some(geometry)
}

fn read_material(material: &gltf::Material) -> Material {
    let pbr = material.pbr_metallic_roughness();
    Material {
        base_color: pbr.base_color_factor(),
        texture: pbr
            .base_color_texture()
            .map(|info| info.texture().source().index()),
        double_sided: material.double_sided(),
    }
}

fn convert_image(data: &gltf::image::Data) -> ImageData {
    use gltf::image::Format;

    let converted = match data.format {
        Format::R8 => ImageData::from_channels(data.width, data.height, 1, &data.pixels),
        Format::R8G8 => ImageData::from_channels(data.width, data.height, 2, &data.pixels),
        Format::R8G8B8 => ImageData::from_channels(data.width, data.height, 3, &data.pixels),
        Format::R8G8B8A8 => ImageData::from_channels(data.width, data.height, 4, &data.pixels),
        Format::R16 | Format::R16G16 | Format::R16G16B16 | Format::R16G16B16A16 => {
            let channels = match data.format {
                Format::R16 => 1,
                Format::R16G16 => 2,
                Format::R16G16B16 => 3,
                _ => 4,
            };
            // Keep the high byte of each little-endian sample
            let narrowed: Vec<u8> = data.pixels.chunks_exact(2).map(|s| s[1]).collect();
            ImageData::from_channels(data.width, data.height, channels, &narrowed)
        }
        _ => None,
    };

    converted.unwrap_or_else(|| {
        tracing::warn!(
            "Unsupported texture format {:?} ({}x{}), using white",
            data.format,
            data.width,
            data.height
        );
        ImageData {
            width: 1,
            height: 1,
            rgba: vec![255; 4],
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_model() -> ImportedModel {
        ImportedModel {
            root: ROOT_NODE_NAME.to_string(),
            meshes: Vec::new(),
            images: Vec::new(),
        }
    }

    #[test]
    fn pending_import_yields_once() {
        let (sender, mut pending) = PendingImport::channel("models/a.glb");
        assert!(pending.poll().is_pending());

        sender.send(Ok(empty_model())).unwrap();
        assert!(matches!(pending.poll(), Poll::Ready(Ok(_))));
        assert!(pending.is_finished());
        assert!(pending.poll().is_pending());
    }

    #[test]
    fn dropped_sender_is_an_interruption() {
        let (sender, mut pending) = PendingImport::channel("models/a.glb");
        drop(sender);
        assert!(matches!(
            pending.poll(),
            Poll::Ready(Err(ImportError::Interrupted(_)))
        ));
    }

    #[test]
    fn held_sender_stays_pending() {
        let (_sender, mut pending) = PendingImport::channel("models/a.glb");
        for _ in 0..100 {
            assert!(pending.poll().is_pending());
        }
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = load_model(Path::new("models/layout.obj")).unwrap_err();
        assert!(matches!(err, ImportError::UnknownFormat(ext) if ext == "obj"));
    }

    #[test]
    fn missing_file_is_a_parse_failure() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_model(&dir.path().join("missing.glb")).unwrap_err();
        assert!(matches!(err, ImportError::Gltf { .. }));
    }

    #[test]
    fn importer_reports_failures_through_the_handle() {
        let dir = tempfile::tempdir().unwrap();
        let mut pending = GltfImporter::new().import(&dir.path().join("missing.gltf"));

        let result = loop {
            if let Poll::Ready(result) = pending.poll() {
                break result;
            }
            std::thread::sleep(std::time::Duration::from_millis(5));
        };
        assert!(result.is_err());
    }

    #[test]
    fn minimal_gltf_is_flattened() {
        // One triangle, base64 embedded, under a translated parent node
        let gltf = r#"{
            "asset": { "version": "2.0" },
            "scene": 0,
            "scenes": [ { "nodes": [0] } ],
            "nodes": [
                { "name": "room", "translation": [0.0, 0.0, -5.0], "children": [1] },
                { "name": "wall_collision_01", "mesh": 0 }
            ],
            "meshes": [ { "primitives": [ { "attributes": { "POSITION": 0 } } ] } ],
            "buffers": [ {
                "byteLength": 36,
                "uri": "data:application/octet-stream;base64,AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAgD8AAAAA"
            } ],
            "bufferViews": [ { "buffer": 0, "byteLength": 36 } ],
            "accessors": [ {
                "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
                "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]
            } ]
        }"#;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("triangle.gltf");
        std::fs::write(&path, gltf).unwrap();

        let model = load_model(&path).unwrap();
        assert_eq!(model.root, ROOT_NODE_NAME);
        assert_eq!(model.meshes.len(), 1);

        let mesh = &model.meshes[0];
        assert_eq!(mesh.name, "wall_collision_01");
        assert_eq!(mesh.geometry.triangle_count(), 1);
        assert_eq!(mesh.transform.w_axis.z, -5.0);
        assert_eq!(mesh.geometry.vertices[0].normal, [0.0, 0.0, 1.0]);
    }
}
