//! glTF 2.0 support (`.gltf` JSON and binary `.glb`)

use crate::registry::{ReadContext, SceneReader};
use crate::{IoError, Result};
use std::sync::Arc;
use tracing::{debug, warn};
use turntable_core::{
    Material, MeshPrimitive, NodeTransform, Point3f, SceneNode, TextureBinding, TextureImage, Vector3f,
};

/// Extensions whose data this reader cannot decode
const UNSUPPORTED_EXTENSIONS: &[&str] = &["KHR_draco_mesh_compression", "EXT_meshopt_compression"];

pub struct GltfReader;

impl SceneReader for GltfReader {
    fn read_scene(&self, bytes: &[u8], context: &ReadContext) -> Result<SceneNode> {
        read_gltf(bytes, context)
    }

    fn can_read(&self, bytes: &[u8]) -> bool {
        bytes.starts_with(b"glTF")
            || bytes
                .iter()
                .find(|b| !b.is_ascii_whitespace())
                .is_some_and(|b| *b == b'{')
    }

    fn format_name(&self) -> &'static str {
        "gltf"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["glb", "gltf"]
    }
}

/// Decode a glTF document, its buffers and images into a scene graph
pub fn read_gltf(bytes: &[u8], context: &ReadContext) -> Result<SceneNode> {
    let ::gltf::Gltf { document, blob } = ::gltf::Gltf::from_slice(bytes)?;

    if let Some(ext) = document
        .extensions_required()
        .find(|ext| UNSUPPORTED_EXTENSIONS.contains(ext))
    {
        return Err(IoError::parse(format!("required extension {} is not supported", ext)));
    }

    let base = context.base_dir.as_deref();
    let buffers = ::gltf::import_buffers(&document, base, blob)?;
    let images = ::gltf::import_images(&document, base, &buffers)?;
    let textures: Vec<Option<Arc<TextureImage>>> = images.into_iter().map(convert_image).collect();

    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .ok_or_else(|| IoError::parse("glTF document has no scenes"))?;

    let mut root = SceneNode::new(context.name.clone());
    for node in scene.nodes() {
        root.children.push(convert_node(&node, &buffers, &textures)?);
    }

    debug!(
        name = %context.name,
        meshes = root.mesh_count(),
        vertices = root.vertex_count(),
        "decoded glTF scene"
    );
    Ok(root)
}

fn convert_node(
    node: &::gltf::Node<'_>,
    buffers: &[::gltf::buffer::Data],
    textures: &[Option<Arc<TextureImage>>],
) -> Result<SceneNode> {
    let (translation, rotation, scale) = node.transform().decomposed();
    let name = node
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("node{}", node.index()));
    let mut out = SceneNode::new(name).with_transform(NodeTransform::from_parts(translation, rotation, scale));

    if let Some(mesh) = node.mesh() {
        for primitive in mesh.primitives() {
            if let Some(converted) = convert_primitive(&primitive, buffers, textures)? {
                out.meshes.push(converted);
            }
        }
    }

    for child in node.children() {
        out.children.push(convert_node(&child, buffers, textures)?);
    }
    Ok(out)
}

fn convert_primitive(
    primitive: &::gltf::Primitive<'_>,
    buffers: &[::gltf::buffer::Data],
    textures: &[Option<Arc<TextureImage>>],
) -> Result<Option<MeshPrimitive>> {
    if primitive.mode() != ::gltf::mesh::Mode::Triangles {
        warn!(mode = ?primitive.mode(), "skipping non-triangle primitive");
        return Ok(None);
    }

    let reader = primitive.reader(|b| buffers.get(b.index()).map(|data| data.0.as_slice()));
    let positions: Vec<Point3f> = match reader.read_positions() {
        Some(iter) => iter.map(Point3f::from).collect(),
        None => return Ok(None),
    };
    let indices: Vec<u32> = match reader.read_indices() {
        Some(read) => read.into_u32().collect(),
        None => (0..positions.len() as u32).collect(),
    };
    if let Some(bad) = indices.iter().find(|&&i| i as usize >= positions.len()) {
        return Err(IoError::parse(format!(
            "index {} out of range for {} vertices",
            bad,
            positions.len()
        )));
    }

    let mut mesh = MeshPrimitive::new(positions, indices);
    mesh.normals = reader.read_normals().map(|iter| iter.map(Vector3f::from).collect());
    mesh.uvs = reader.read_tex_coords(0).map(|t| t.into_f32().collect());
    mesh.colors = reader.read_colors(0).map(|c| c.into_rgb_f32().collect());
    if mesh.normals.is_none() {
        mesh.compute_normals();
    }
    mesh.material = convert_material(&primitive.material(), textures);
    Ok(Some(mesh))
}

fn convert_material(material: &::gltf::Material<'_>, textures: &[Option<Arc<TextureImage>>]) -> Material {
    let pbr = material.pbr_metallic_roughness();
    let base_color_texture = pbr
        .base_color_texture()
        .and_then(|info| textures.get(info.texture().source().index()).cloned().flatten())
        .map(TextureBinding::new);

    Material {
        name: material.name().map(str::to_string),
        base_color: pbr.base_color_factor(),
        base_color_texture,
        metallic: pbr.metallic_factor(),
        roughness: pbr.roughness_factor(),
        ..Material::default()
    }
}

/// Expand 8-bit image data to RGBA8; other layouts are dropped
fn convert_image(data: ::gltf::image::Data) -> Option<Arc<TextureImage>> {
    use ::gltf::image::Format;

    let pixels: Vec<[u8; 4]> = match data.format {
        Format::R8 => data.pixels.iter().map(|&r| [r, r, r, 255]).collect(),
        Format::R8G8 => data.pixels.chunks_exact(2).map(|p| [p[0], p[1], 0, 255]).collect(),
        Format::R8G8B8 => data.pixels.chunks_exact(3).map(|p| [p[0], p[1], p[2], 255]).collect(),
        Format::R8G8B8A8 => data.pixels.chunks_exact(4).map(|p| [p[0], p[1], p[2], p[3]]).collect(),
        other => {
            warn!(format = ?other, "unsupported texture format");
            return None;
        }
    };

    Some(Arc::new(TextureImage {
        width: data.width,
        height: data.height,
        pixels,
    }))
}
