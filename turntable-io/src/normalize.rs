//! Baseline applied to every model before it is shown

use turntable_core::{Capability, ColorSpace, MaterialBaseline, SceneNode};
use nalgebra::Vector3;

/// What `normalize_materials` touched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    pub meshes: usize,
    pub color_textures: usize,
    pub env_materials: usize,
}

/// Reset the root placement and apply the material baseline.
///
/// The root is moved back to the origin at unit scale (its rotation is kept),
/// colour textures are tagged sRGB, and every material that takes
/// environment lighting gets the baseline intensity. Nodes without meshes
/// are left alone.
pub fn normalize_materials(root: &mut SceneNode, baseline: &MaterialBaseline) -> NormalizeReport {
    root.transform.translation = Vector3::zeros();
    root.transform.scale = Vector3::repeat(1.0);

    let mut report = NormalizeReport::default();
    root.traverse_mut(&mut |node| {
        if !node.has_capability(Capability::Mesh) {
            return;
        }
        for mesh in &mut node.meshes {
            report.meshes += 1;
            let material = &mut mesh.material;
            if baseline.color_textures_srgb && material.has_capability(Capability::ColorTexture) {
                if let Some(texture) = material.base_color_texture.as_mut() {
                    texture.color_space = ColorSpace::Srgb;
                    report.color_textures += 1;
                }
            }
            if material.has_capability(Capability::EnvironmentReflection) {
                material.env_intensity = baseline.env_intensity;
                report.env_materials += 1;
            }
        }
    });
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use turntable_core::{
        Material, MaterialModel, MeshPrimitive, NodeTransform, Point3f, TextureBinding, TextureImage,
    };

    fn triangle(material: Material) -> MeshPrimitive {
        MeshPrimitive::new(
            vec![Point3f::origin(), Point3f::new(1.0, 0.0, 0.0), Point3f::new(0.0, 1.0, 0.0)],
            vec![0, 1, 2],
        )
        .with_material(material)
    }

    #[test]
    fn applies_baseline_to_capable_materials() {
        let texture = TextureBinding::new(Arc::new(TextureImage { width: 1, height: 1, pixels: vec![[255; 4]] }));
        let textured = Material {
            base_color_texture: Some(texture),
            ..Material::default()
        };
        let unlit = Material {
            model: MaterialModel::Unlit,
            ..Material::default()
        };
        let mut root = SceneNode::new("model")
            .with_transform(NodeTransform::from_parts([5.0, 1.0, 0.0], [0.0, 0.0, 0.0, 1.0], [3.0, 3.0, 3.0]))
            .with_child(SceneNode::new("body").with_mesh(triangle(textured)))
            .with_child(SceneNode::new("decal").with_mesh(triangle(unlit)))
            .with_child(SceneNode::new("locator"));

        let report = normalize_materials(&mut root, &MaterialBaseline::default());

        assert_eq!(report, NormalizeReport { meshes: 2, color_textures: 1, env_materials: 1 });
        assert!(root.transform.is_identity(1e-6));

        let body = &root.children[0].meshes[0].material;
        assert_eq!(body.base_color_texture.as_ref().unwrap().color_space, ColorSpace::Srgb);
        assert_eq!(body.env_intensity, 1.15);
        assert_eq!(root.children[1].meshes[0].material.env_intensity, 1.0);
    }

    #[test]
    fn srgb_tagging_can_be_disabled() {
        let texture = TextureBinding::new(Arc::new(TextureImage { width: 1, height: 1, pixels: vec![[255; 4]] }));
        let mut root = SceneNode::new("m").with_mesh(triangle(Material {
            base_color_texture: Some(texture),
            ..Material::default()
        }));
        let baseline = MaterialBaseline {
            color_textures_srgb: false,
            ..MaterialBaseline::default()
        };
        normalize_materials(&mut root, &baseline);
        assert_eq!(root.meshes[0].material.base_color_texture.as_ref().unwrap().color_space, ColorSpace::Linear);
    }
}
