#![doc = " Binary glTF 2.0 (GLB) export of a scene part"]
#![doc = ""]
#![doc = " The part root becomes the single scene node, carrying the part's world"]
#![doc = " transform; every leaf mesh below it becomes a child node with one"]
#![doc = " primitive per material slot."]

use crate::errors::ExportError;
use crate::float_types::{Real, tolerance};
use crate::mesh::TriangleBuffers;
use crate::scene::{Material, MaterialId, NodeId, Scene};
use hashbrown::HashMap;
use nalgebra::{Matrix4, Point3, Vector3};
use serde_json::{Value, json};

pub const GLB_MAGIC: u32 = 0x4654_6C67;
pub const GLB_VERSION: u32 = 2;
pub const CHUNK_JSON: u32 = 0x4E4F_534A;
pub const CHUNK_BIN: u32 = 0x004E_4942;

const TARGET_ARRAY_BUFFER: u32 = 34962;
const TARGET_ELEMENT_ARRAY_BUFFER: u32 = 34963;
const COMPONENT_FLOAT: u32 = 5126;
const COMPONENT_UNSIGNED_INT: u32 = 5125;

#[derive(Clone)]
struct GltfVertex {
    position: Point3<Real>,
    normal: Vector3<Real>,
}

/// Welds vertices whose position and normal agree within `tolerance()`.
#[derive(Default)]
struct VertexWelder {
    vertices: Vec<GltfVertex>,
    lookup: HashMap<[i64; 6], u32>,
}

impl VertexWelder {
    fn add(&mut self, position: Point3<Real>, normal: Vector3<Real>) -> u32 {
        let q = |v: Real| (v / tolerance()).round() as i64;
        let key = [
            q(position.x),
            q(position.y),
            q(position.z),
            q(normal.x),
            q(normal.y),
            q(normal.z),
        ];
        *self.lookup.entry(key).or_insert_with(|| {
            self.vertices.push(GltfVertex { position, normal });
            (self.vertices.len() - 1) as u32
        })
    }
}

/// Accumulates the BIN chunk and the buffer views / accessors that describe it.
#[derive(Default)]
struct BinaryBuilder {
    data: Vec<u8>,
    buffer_views: Vec<Value>,
    accessors: Vec<Value>,
}

impl BinaryBuilder {
    fn push_view(&mut self, bytes: &[u8], target: u32) -> usize {
        let offset = self.data.len();
        self.data.extend_from_slice(bytes);
        self.buffer_views.push(json!({
            "buffer": 0,
            "byteOffset": offset,
            "byteLength": bytes.len(),
            "target": target,
        }));
        self.buffer_views.len() - 1
    }

    fn push_vec3(&mut self, values: &[Vector3<Real>], with_bounds: bool) -> usize {
        #[allow(clippy::unnecessary_cast)]
        let stored: Vec<[f32; 3]> = values
            .iter()
            .map(|v| [v.x as f32, v.y as f32, v.z as f32])
            .collect();
        let bytes: Vec<u8> = stored
            .iter()
            .flatten()
            .flat_map(|c| c.to_le_bytes())
            .collect();
        let view = self.push_view(&bytes, TARGET_ARRAY_BUFFER);
        let mut accessor = json!({
            "bufferView": view,
            "componentType": COMPONENT_FLOAT,
            "count": values.len(),
            "type": "VEC3",
        });
        if with_bounds {
            // Bounds must match the stored f32 components exactly.
            let (min, max) = stored.iter().fold(
                ([f32::MAX; 3], [f32::MIN; 3]),
                |(mut min, mut max), v| {
                    for axis in 0..3 {
                        min[axis] = min[axis].min(v[axis]);
                        max[axis] = max[axis].max(v[axis]);
                    }
                    (min, max)
                },
            );
            accessor["min"] = json!(min.map(f64::from));
            accessor["max"] = json!(max.map(f64::from));
        }
        self.accessors.push(accessor);
        self.accessors.len() - 1
    }

    fn push_indices(&mut self, indices: &[u32]) -> usize {
        let bytes: Vec<u8> = indices.iter().flat_map(|i| i.to_le_bytes()).collect();
        let view = self.push_view(&bytes, TARGET_ELEMENT_ARRAY_BUFFER);
        self.accessors.push(json!({
            "bufferView": view,
            "componentType": COMPONENT_UNSIGNED_INT,
            "count": indices.len(),
            "type": "SCALAR",
        }));
        self.accessors.len() - 1
    }
}

fn matrix_json(m: &Matrix4<Real>) -> Value {
    // glTF matrices are column-major, as is nalgebra's storage.
    #[allow(clippy::unnecessary_cast)]
    let values: Vec<f64> = m.iter().map(|v| *v as f64).collect();
    json!(values)
}

fn material_json(material: &Material) -> Value {
    let mut value = json!({
        "name": material.name,
        "pbrMetallicRoughness": {
            "baseColorFactor": material.base_color,
            "metallicFactor": material.metallic,
            "roughnessFactor": material.roughness,
        },
        "doubleSided": false,
    });
    if material.is_translucent() {
        value["alphaMode"] = json!("BLEND");
    }
    value
}

/// Serialize the part rooted at `part` as a GLB blob.
///
/// `material_overrides` maps leaf nodes to the materials written instead of
/// the ones currently assigned (the selection keeps the originals there while
/// the highlight is shown).
pub fn part_to_glb(
    scene: &Scene,
    part: NodeId,
    material_overrides: &HashMap<NodeId, Vec<Material>>,
) -> Result<Vec<u8>, ExportError> {
    let root = scene.node(part).ok_or(ExportError::EmptyPart)?;
    let root_world = scene.world_transform(part).ok_or(ExportError::EmptyPart)?;

    let mut bin = BinaryBuilder::default();
    let mut materials: Vec<Value> = Vec::new();
    let mut material_index: HashMap<MaterialId, usize> = HashMap::new();
    let mut meshes: Vec<Value> = Vec::new();
    let mut nodes: Vec<Value> = vec![Value::Null];
    let mut children: Vec<usize> = Vec::new();

    for leaf in scene.leaf_meshes(part) {
        let Some(node) = scene.node(leaf) else { continue };
        let Some(mesh) = node.mesh.as_ref() else { continue };
        let leaf_materials = material_overrides
            .get(&leaf)
            .map_or(mesh.materials.as_slice(), Vec::as_slice);

        let mut primitives = Vec::new();
        for TriangleBuffers {
            material,
            positions,
            normals,
            ..
        } in mesh.geometry.triangle_buffers()
        {
            let mut welder = VertexWelder::default();
            let indices: Vec<u32> = positions
                .iter()
                .zip(&normals)
                .map(|(p, n)| welder.add(*p, *n))
                .collect();
            if indices.is_empty() {
                continue;
            }
            let welded_positions: Vec<Vector3<Real>> =
                welder.vertices.iter().map(|v| v.position.coords).collect();
            let welded_normals: Vec<Vector3<Real>> =
                welder.vertices.iter().map(|v| v.normal).collect();

            let position_accessor = bin.push_vec3(&welded_positions, true);
            let normal_accessor = bin.push_vec3(&welded_normals, false);
            let index_accessor = bin.push_indices(&indices);

            let mut primitive = json!({
                "attributes": { "POSITION": position_accessor, "NORMAL": normal_accessor },
                "indices": index_accessor,
                "mode": 4,
            });
            let slot = material.min(leaf_materials.len().saturating_sub(1));
            if let Some(mat) = leaf_materials.get(slot) {
                let index = *material_index.entry(mat.id).or_insert_with(|| {
                    materials.push(material_json(mat));
                    materials.len() - 1
                });
                primitive["material"] = json!(index);
            }
            primitives.push(primitive);
        }
        if primitives.is_empty() {
            continue;
        }

        meshes.push(json!({ "name": node.name, "primitives": primitives }));
        let relative = scene
            .transform_relative_to(leaf, part)
            .unwrap_or_else(Matrix4::identity);
        let mut child = json!({ "name": node.name, "mesh": meshes.len() - 1 });
        if relative != Matrix4::identity() {
            child["matrix"] = matrix_json(&relative);
        }
        nodes.push(child);
        children.push(nodes.len() - 1);
    }

    if meshes.is_empty() {
        return Err(ExportError::EmptyPart);
    }

    let mut root_node = json!({ "name": root.name, "children": children });
    if root_world != Matrix4::identity() {
        root_node["matrix"] = matrix_json(&root_world);
    }
    nodes[0] = root_node;

    let document = json!({
        "asset": { "version": "2.0", "generator": "meshcleave" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": nodes,
        "meshes": meshes,
        "materials": materials,
        "accessors": bin.accessors,
        "bufferViews": bin.buffer_views,
        "buffers": [{ "byteLength": bin.data.len() }],
    });

    assemble_glb(serde_json::to_vec(&document)?, bin.data)
}

/// Wrap a JSON document and a binary buffer into a GLB container.
pub fn assemble_glb(mut json: Vec<u8>, mut bin: Vec<u8>) -> Result<Vec<u8>, ExportError> {
    while json.len() % 4 != 0 {
        json.push(b' ');
    }
    while bin.len() % 4 != 0 {
        bin.push(0);
    }
    let total = 12 + 8 + json.len() + if bin.is_empty() { 0 } else { 8 + bin.len() };
    let total_len = u32::try_from(total).map_err(|_| ExportError::BufferTooLarge)?;
    let json_len = u32::try_from(json.len()).map_err(|_| ExportError::BufferTooLarge)?;
    let bin_len = u32::try_from(bin.len()).map_err(|_| ExportError::BufferTooLarge)?;

    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(&GLB_MAGIC.to_le_bytes());
    out.extend_from_slice(&GLB_VERSION.to_le_bytes());
    out.extend_from_slice(&total_len.to_le_bytes());

    out.extend_from_slice(&json_len.to_le_bytes());
    out.extend_from_slice(&CHUNK_JSON.to_le_bytes());
    out.extend_from_slice(&json);

    if !bin.is_empty() {
        out.extend_from_slice(&bin_len.to_le_bytes());
        out.extend_from_slice(&CHUNK_BIN.to_le_bytes());
        out.extend_from_slice(&bin);
    }
    Ok(out)
}
