//! Wavefront OBJ support

use crate::registry::{ReadContext, SceneReader};
use crate::{IoError, Result};
use ::obj::{IndexTuple, ObjData};
use std::collections::HashMap;
use std::io::Cursor;
use turntable_core::{MeshPrimitive, Point3f, SceneNode, Vector3f};

pub struct ObjReader;

impl SceneReader for ObjReader {
    fn read_scene(&self, bytes: &[u8], context: &ReadContext) -> Result<SceneNode> {
        read_obj(bytes, context)
    }

    fn can_read(&self, bytes: &[u8]) -> bool {
        // OBJ has no magic; accept text whose first statement is a known keyword
        let head = &bytes[..bytes.len().min(512)];
        std::str::from_utf8(head).is_ok_and(|text| {
            text.lines()
                .map(str::trim_start)
                .find(|line| !line.is_empty() && !line.starts_with('#'))
                .is_some_and(|line| {
                    ["v ", "vn ", "vt ", "o ", "g ", "mtllib ", "usemtl ", "s "]
                        .iter()
                        .any(|k| line.starts_with(k))
                })
        })
    }

    fn format_name(&self) -> &'static str {
        "obj"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["obj"]
    }
}

/// Vertex key: position, texcoord and normal indices
type Corner = (usize, Option<usize>, Option<usize>);

/// Parse an OBJ file into a single-mesh node.
///
/// Polygons are fan-triangulated and every distinct corner tuple becomes
/// one vertex. Materials are not read.
pub fn read_obj(bytes: &[u8], context: &ReadContext) -> Result<SceneNode> {
    let data = ObjData::load_buf(Cursor::new(bytes)).map_err(|e| IoError::parse(e.to_string()))?;

    let mut lookup: HashMap<Corner, u32> = HashMap::new();
    let mut corners: Vec<Corner> = Vec::new();
    let mut indices = Vec::new();

    let polygons = data
        .objects
        .iter()
        .flat_map(|object| object.groups.iter())
        .flat_map(|group| group.polys.iter());
    for polygon in polygons {
        let face: Vec<Corner> = polygon.0.iter().map(|&IndexTuple(p, t, n)| (p, t, n)).collect();
        if face.len() < 3 {
            continue;
        }

        let mut index_of = |corner: Corner| -> u32 {
            *lookup.entry(corner).or_insert_with(|| {
                corners.push(corner);
                (corners.len() - 1) as u32
            })
        };
        let first = index_of(face[0]);
        for pair in face[1..].windows(2) {
            let b = index_of(pair[0]);
            let c = index_of(pair[1]);
            indices.extend_from_slice(&[first, b, c]);
        }
    }

    let position = |i: usize| {
        data.position
            .get(i)
            .map(|&[x, y, z]| Point3f::new(x, y, z))
            .ok_or_else(|| IoError::parse(format!("position index {} out of range", i)))
    };
    let positions = corners.iter().map(|c| position(c.0)).collect::<Result<Vec<_>>>()?;

    let mut mesh = MeshPrimitive::new(positions, indices);

    if !corners.is_empty() && corners.iter().all(|c| c.1.is_some()) {
        let uvs = corners
            .iter()
            .filter_map(|c| c.1.and_then(|t| data.texture.get(t)))
            .map(|&[u, v]| [u, 1.0 - v])
            .collect::<Vec<_>>();
        if uvs.len() == corners.len() {
            mesh.uvs = Some(uvs);
        }
    }

    if !corners.is_empty() && corners.iter().all(|c| c.2.is_some()) {
        let normals = corners
            .iter()
            .filter_map(|c| c.2.and_then(|n| data.normal.get(n)))
            .map(|&[x, y, z]| Vector3f::new(x, y, z))
            .collect::<Vec<_>>();
        if normals.len() == corners.len() {
            mesh.normals = Some(normals);
        }
    }
    if mesh.normals.is_none() {
        mesh.compute_normals();
    }

    let mut root = SceneNode::new(context.name.clone());
    if !mesh.is_empty() {
        root.meshes.push(mesh);
    }
    Ok(root)
}
