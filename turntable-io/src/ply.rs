//! PLY format support

use crate::registry::{ReadContext, SceneReader};
use crate::{IoError, Result};
use ply_rs::{
    parser::Parser,
    ply::{DefaultElement, Property},
};
use std::io::Cursor;
use turntable_core::{MeshPrimitive, Point3f, SceneNode, Vector3f};

pub struct PlyReader;

impl SceneReader for PlyReader {
    fn read_scene(&self, bytes: &[u8], context: &ReadContext) -> Result<SceneNode> {
        read_ply(bytes, context)
    }

    fn can_read(&self, bytes: &[u8]) -> bool {
        bytes.starts_with(b"ply")
    }

    fn format_name(&self) -> &'static str {
        "ply"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["ply"]
    }
}

/// Parse a PLY mesh; normals and 8-bit vertex colours are kept when present
pub fn read_ply(bytes: &[u8], context: &ReadContext) -> Result<SceneNode> {
    let mut reader = Cursor::new(bytes);
    let parser = Parser::<DefaultElement>::new();
    let ply = parser.read_ply(&mut reader)?;

    let vertices = ply.payload.get("vertex").map(Vec::as_slice).unwrap_or_default();
    let mut positions = Vec::with_capacity(vertices.len());
    for vertex in vertices {
        positions.push(Point3f::new(
            extract_property_value(vertex, "x")?,
            extract_property_value(vertex, "y")?,
            extract_property_value(vertex, "z")?,
        ));
    }

    let mut indices = Vec::new();
    if let Some(faces) = ply.payload.get("face") {
        for face in faces {
            let polygon = extract_face_indices(face)?;
            if let Some(bad) = polygon.iter().find(|&&i| i >= positions.len()) {
                return Err(IoError::parse(format!("face index {} out of range", bad)));
            }
            for pair in polygon.windows(2).skip(1) {
                indices.extend_from_slice(&[polygon[0] as u32, pair[0] as u32, pair[1] as u32]);
            }
        }
    }

    let normals = vertices
        .iter()
        .map(|v| {
            Some(Vector3f::new(
                extract_property_value(v, "nx").ok()?,
                extract_property_value(v, "ny").ok()?,
                extract_property_value(v, "nz").ok()?,
            ))
        })
        .collect::<Option<Vec<_>>>();
    let colors = vertices
        .iter()
        .map(|v| Some([extract_color(v, "red")?, extract_color(v, "green")?, extract_color(v, "blue")?]))
        .collect::<Option<Vec<_>>>();

    let mut mesh = MeshPrimitive::new(positions, indices);
    mesh.colors = colors.filter(|c| !c.is_empty());
    match normals.filter(|n| !n.is_empty()) {
        Some(normals) => mesh.normals = Some(normals),
        None => mesh.compute_normals(),
    }

    let mut root = SceneNode::new(context.name.clone());
    if !mesh.is_empty() {
        root.meshes.push(mesh);
    }
    Ok(root)
}

/// Extract a property value as f32 from a PLY element
fn extract_property_value(element: &DefaultElement, name: &str) -> Result<f32> {
    match element.get(name) {
        Some(Property::Float(val)) => Ok(*val),
        Some(Property::Double(val)) => Ok(*val as f32),
        Some(Property::Int(val)) => Ok(*val as f32),
        Some(Property::UInt(val)) => Ok(*val as f32),
        _ => Err(IoError::parse(format!("Property '{}' not found or invalid type", name))),
    }
}

/// Extract an 8-bit colour channel as linear f32
fn extract_color(element: &DefaultElement, name: &str) -> Option<f32> {
    match element.get(name) {
        Some(Property::UChar(val)) => Some(turntable_core::srgb_to_linear(*val as f32 / 255.0)),
        Some(Property::Float(val)) => Some(*val),
        _ => None,
    }
}

/// Extract face indices from a PLY face element
fn extract_face_indices(element: &DefaultElement) -> Result<Vec<usize>> {
    match element.get("vertex_indices").or_else(|| element.get("vertex_index")) {
        Some(Property::ListInt(indices)) => Ok(indices.iter().map(|&idx| idx as usize).collect()),
        Some(Property::ListUInt(indices)) => Ok(indices.iter().map(|&idx| idx as usize).collect()),
        Some(Property::ListUChar(indices)) => Ok(indices.iter().map(|&idx| idx as usize).collect()),
        _ => Err(IoError::parse("Face indices not found")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const TETRA: &str = "ply
format ascii 1.0
element vertex 4
property float x
property float y
property float z
property uchar red
property uchar green
property uchar blue
element face 2
property list uchar int vertex_indices
end_header
0 0 0 255 0 0
2 0 0 255 0 0
0 2 0 255 0 0
0 0 2 255 0 0
3 0 1 2
4 0 1 3 2
";

    #[test]
    fn reads_ascii_mesh_with_colors() {
        let root = read_ply(TETRA.as_bytes(), &ReadContext::new("tetra")).unwrap();
        let mesh = &root.meshes[0];

        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.triangle_count(), 3);
        assert!(mesh.normals.is_some());
        let colors = mesh.colors.as_ref().unwrap();
        assert_relative_eq!(colors[0][0], 1.0, epsilon = 1e-6);
        assert_relative_eq!(colors[0][1], 0.0);
        assert_relative_eq!(root.bounds().max, Point3f::new(2.0, 2.0, 2.0));
    }

    #[test]
    fn out_of_range_face_is_an_error() {
        let src = TETRA.replace("3 0 1 2\n", "3 0 1 9\n");
        assert!(read_ply(src.as_bytes(), &ReadContext::default()).is_err());
    }

    #[test]
    fn header_detection() {
        assert!(PlyReader.can_read(TETRA.as_bytes()));
        assert!(!PlyReader.can_read(b"v 0 0 0"));
    }
}
