//! Scene graph produced by the model readers

use crate::bounds::Aabb;
use crate::point::{Point3f, Vector3f};
use crate::transform::NodeTransform;
use nalgebra::Matrix4;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_MESH_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique mesh identity, used to key GPU-side caches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(u64);

impl MeshId {
    pub fn next() -> Self {
        Self(NEXT_MESH_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

/// Optional features a node or material may carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Node owns at least one drawable primitive
    Mesh,
    /// A material samples a base-colour texture
    ColorTexture,
    /// A material responds to image-based environment lighting
    EnvironmentReflection,
}

/// How stored texel values are to be interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorSpace {
    #[default]
    Linear,
    Srgb,
}

/// Decoded RGBA8 image
#[derive(Debug, Clone, PartialEq)]
pub struct TextureImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<[u8; 4]>,
}

/// A texture reference on a material together with its colour space
#[derive(Debug, Clone)]
pub struct TextureBinding {
    pub image: Arc<TextureImage>,
    pub color_space: ColorSpace,
}

impl TextureBinding {
    pub fn new(image: Arc<TextureImage>) -> Self {
        Self {
            image,
            color_space: ColorSpace::Linear,
        }
    }

    /// Nearest-texel lookup with repeat wrapping, returned as linear RGBA
    pub fn sample(&self, uv: [f32; 2]) -> [f32; 4] {
        let image = &self.image;
        if image.width == 0 || image.height == 0 || image.pixels.is_empty() {
            return [1.0; 4];
        }
        let u = uv[0] - uv[0].floor();
        let v = uv[1] - uv[1].floor();
        let x = ((u * image.width as f32) as u32).min(image.width - 1);
        let y = ((v * image.height as f32) as u32).min(image.height - 1);
        let texel = image.pixels[(y * image.width + x) as usize];

        let channel = |c: u8| {
            let c = c as f32 / 255.0;
            match self.color_space {
                ColorSpace::Linear => c,
                ColorSpace::Srgb => srgb_to_linear(c),
            }
        };
        [channel(texel[0]), channel(texel[1]), channel(texel[2]), texel[3] as f32 / 255.0]
    }
}

/// sRGB transfer function decode
pub fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Lighting model of a material
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterialModel {
    /// Metal-rough PBR, lit by lights and the environment
    Standard,
    /// Emits its base colour unlit
    Unlit,
}

/// Surface appearance of a primitive
#[derive(Debug, Clone)]
pub struct Material {
    pub name: Option<String>,
    pub model: MaterialModel,
    /// Linear RGBA factor
    pub base_color: [f32; 4],
    pub base_color_texture: Option<TextureBinding>,
    pub metallic: f32,
    pub roughness: f32,
    /// Multiplier on environment lighting
    pub env_intensity: f32,
}

impl Material {
    pub fn has_capability(&self, capability: Capability) -> bool {
        match capability {
            Capability::Mesh => false,
            Capability::ColorTexture => self.base_color_texture.is_some(),
            Capability::EnvironmentReflection => self.model == MaterialModel::Standard,
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: None,
            model: MaterialModel::Standard,
            base_color: [0.8, 0.8, 0.8, 1.0],
            base_color_texture: None,
            metallic: 0.0,
            roughness: 0.5,
            env_intensity: 1.0,
        }
    }
}

/// Indexed triangle list with one material
#[derive(Debug, Clone)]
pub struct MeshPrimitive {
    pub id: MeshId,
    pub positions: Vec<Point3f>,
    pub normals: Option<Vec<Vector3f>>,
    pub uvs: Option<Vec<[f32; 2]>>,
    /// Linear RGB vertex colours
    pub colors: Option<Vec<[f32; 3]>>,
    pub indices: Vec<u32>,
    pub material: Material,
}

impl MeshPrimitive {
    pub fn new(positions: Vec<Point3f>, indices: Vec<u32>) -> Self {
        Self {
            id: MeshId::next(),
            positions,
            normals: None,
            uvs: None,
            colors: None,
            indices,
            material: Material::default(),
        }
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() || self.indices.len() < 3
    }

    pub fn local_bounds(&self) -> Aabb {
        Aabb::from_points(&self.positions)
    }

    /// Area-weighted smooth vertex normals from the triangle list
    pub fn compute_normals(&mut self) {
        let mut normals = vec![Vector3f::zeros(); self.positions.len()];
        for tri in self.indices.chunks_exact(3) {
            let (a, b, c) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
            if a >= normals.len() || b >= normals.len() || c >= normals.len() {
                continue;
            }
            let face = (self.positions[b] - self.positions[a]).cross(&(self.positions[c] - self.positions[a]));
            normals[a] += face;
            normals[b] += face;
            normals[c] += face;
        }
        for n in &mut normals {
            *n = n.try_normalize(f32::EPSILON).unwrap_or_else(Vector3f::y);
        }
        self.normals = Some(normals);
    }
}

/// A node in a loaded model's hierarchy
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub transform: NodeTransform,
    pub meshes: Vec<MeshPrimitive>,
    pub children: Vec<SceneNode>,
    pub visible: bool,
}

impl SceneNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: NodeTransform::identity(),
            meshes: Vec::new(),
            children: Vec::new(),
            visible: true,
        }
    }

    pub fn with_mesh(mut self, mesh: MeshPrimitive) -> Self {
        self.meshes.push(mesh);
        self
    }

    pub fn with_child(mut self, child: SceneNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_transform(mut self, transform: NodeTransform) -> Self {
        self.transform = transform;
        self
    }

    /// Whether this node itself (not its subtree) carries `capability`
    pub fn has_capability(&self, capability: Capability) -> bool {
        match capability {
            Capability::Mesh => self.meshes.iter().any(|m| !m.is_empty()),
            _ => self.meshes.iter().any(|m| m.material.has_capability(capability)),
        }
    }

    /// Visit every node depth-first, parents before children
    pub fn traverse<F: FnMut(&SceneNode)>(&self, f: &mut F) {
        f(self);
        for child in &self.children {
            child.traverse(f);
        }
    }

    /// Mutable depth-first visit
    pub fn traverse_mut<F: FnMut(&mut SceneNode)>(&mut self, f: &mut F) {
        f(self);
        for child in &mut self.children {
            child.traverse_mut(f);
        }
    }

    /// Visit every primitive with its world matrix, `parent` being the matrix
    /// of this node's parent. Hidden subtrees are skipped.
    pub fn for_each_mesh<F: FnMut(&MeshPrimitive, &Matrix4<f32>)>(&self, parent: &Matrix4<f32>, f: &mut F) {
        if !self.visible {
            return;
        }
        let world = parent * self.transform.to_matrix();
        for mesh in &self.meshes {
            f(mesh, &world);
        }
        for child in &self.children {
            child.for_each_mesh(&world, f);
        }
    }

    /// Smallest world-space box around every primitive in the subtree,
    /// including this node's own transform
    pub fn world_bounds(&self, parent: &Matrix4<f32>) -> Aabb {
        let world = parent * self.transform.to_matrix();
        let own = self
            .meshes
            .iter()
            .fold(Aabb::empty(), |acc, mesh| acc.union(&mesh.local_bounds().transformed(&world)));
        self.children
            .iter()
            .fold(own, |acc, child| acc.union(&child.world_bounds(&world)))
    }

    pub fn bounds(&self) -> Aabb {
        self.world_bounds(&Matrix4::identity())
    }

    pub fn mesh_count(&self) -> usize {
        let mut count = 0;
        self.traverse(&mut |n| count += n.meshes.len());
        count
    }

    pub fn vertex_count(&self) -> usize {
        let mut count = 0;
        self.traverse(&mut |n| count += n.meshes.iter().map(|m| m.vertex_count()).sum::<usize>());
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    fn unit_triangle() -> MeshPrimitive {
        MeshPrimitive::new(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
            ],
            vec![0, 1, 2],
        )
    }

    #[test]
    fn bounds_cover_child_transforms() {
        let child = SceneNode::new("child")
            .with_transform(NodeTransform::from_translation(Vector3::new(10.0, 0.0, 0.0)))
            .with_mesh(unit_triangle());
        let root = SceneNode::new("root").with_mesh(unit_triangle()).with_child(child);

        let bounds = root.bounds();
        assert_relative_eq!(bounds.min, Point3f::new(0.0, 0.0, 0.0));
        assert_relative_eq!(bounds.max, Point3f::new(11.0, 1.0, 0.0));
    }

    #[test]
    fn node_without_meshes_has_empty_bounds() {
        let root = SceneNode::new("root").with_child(SceneNode::new("empty"));
        assert!(root.bounds().is_empty());
        assert!(!root.has_capability(Capability::Mesh));
    }

    #[test]
    fn capability_queries_follow_materials() {
        let texture = TextureBinding::new(Arc::new(TextureImage { width: 1, height: 1, pixels: vec![[255; 4]] }));
        let textured = Material {
            base_color_texture: Some(texture),
            ..Material::default()
        };
        let unlit = Material {
            model: MaterialModel::Unlit,
            ..Material::default()
        };
        let node = SceneNode::new("a").with_mesh(unit_triangle().with_material(textured));
        let flat = SceneNode::new("b").with_mesh(unit_triangle().with_material(unlit));

        assert!(node.has_capability(Capability::Mesh));
        assert!(node.has_capability(Capability::ColorTexture));
        assert!(node.has_capability(Capability::EnvironmentReflection));
        assert!(!flat.has_capability(Capability::ColorTexture));
        assert!(!flat.has_capability(Capability::EnvironmentReflection));
    }

    #[test]
    fn srgb_texture_decodes_to_linear() {
        let image = Arc::new(TextureImage { width: 2, height: 1, pixels: vec![[128, 0, 255, 255], [0; 4]] });
        let mut binding = TextureBinding::new(image);
        let raw = binding.sample([0.25, 0.5]);
        assert_relative_eq!(raw[0], 128.0 / 255.0, epsilon = 1e-6);

        binding.color_space = ColorSpace::Srgb;
        let decoded = binding.sample([0.25, 0.5]);
        assert!(decoded[0] < raw[0]);
        assert_relative_eq!(decoded[2], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn hidden_subtrees_are_not_drawn() {
        let mut hidden = SceneNode::new("hidden").with_mesh(unit_triangle());
        hidden.visible = false;
        let root = SceneNode::new("root").with_mesh(unit_triangle()).with_child(hidden);

        let mut drawn = 0;
        root.for_each_mesh(&Matrix4::identity(), &mut |_, _| drawn += 1);
        assert_eq!(drawn, 1);
        assert_eq!(root.mesh_count(), 2);
    }

    #[test]
    fn computed_normals_face_out_of_ccw_triangle() {
        let mut mesh = unit_triangle();
        mesh.compute_normals();
        let normals = mesh.normals.unwrap();
        assert_relative_eq!(normals[0], Vector3f::z(), epsilon = 1e-6);
    }
}
