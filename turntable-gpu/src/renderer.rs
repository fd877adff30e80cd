//! wgpu implementation of the render surface

use crate::device::GpuContext;
use bytemuck::{Pod, Zeroable};
use nalgebra::{Matrix3, Matrix4};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};
use turntable_core::{
    EnvironmentMap, Error, FrameDesc, Lighting, MaterialModel, MeshId, MeshPrimitive, RenderSurface, Result,
    SurfaceSize, ViewportConfig, SH_COEFFICIENTS,
};
use winit::window::Window;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const MSAA_SAMPLES: u32 = 4;

/// Interleaved vertex as uploaded to the GPU
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    /// Linear RGBA: vertex colour times base-colour texture
    pub color: [f32; 4],
}

impl MeshVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x4];

    /// Vertex buffer layout descriptor
    pub fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<MeshVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Flatten a primitive's attributes into GPU vertices.
///
/// The base-colour texture, when present with UVs, is sampled once per
/// vertex; the material's colour factor is applied in the shader.
pub fn build_vertices(mesh: &MeshPrimitive) -> Vec<MeshVertex> {
    let texture = mesh.material.base_color_texture.as_ref();
    mesh.positions
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let normal = mesh
                .normals
                .as_ref()
                .and_then(|n| n.get(i))
                .map(|n| [n.x, n.y, n.z])
                .unwrap_or([0.0, 1.0, 0.0]);
            let rgb = mesh.colors.as_ref().and_then(|c| c.get(i)).copied().unwrap_or([1.0; 3]);
            let texel = match (texture, mesh.uvs.as_ref().and_then(|uv| uv.get(i))) {
                (Some(texture), Some(uv)) => texture.sample(*uv),
                _ => [1.0; 4],
            };
            MeshVertex {
                position: [p.x, p.y, p.z],
                normal,
                color: [rgb[0] * texel[0], rgb[1] * texel[1], rgb[2] * texel[2], texel[3]],
            }
        })
        .collect()
}

/// Per-frame uniform block, mirrored by `Globals` in the shader
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct GlobalsUniform {
    pub view_proj: [[f32; 4]; 4],
    pub eye: [f32; 4],
    pub ambient: [f32; 4],
    pub key_dir: [f32; 4],
    pub key_color: [f32; 4],
    pub sh: [[f32; 4]; SH_COEFFICIENTS],
    pub params: [f32; 4],
}

impl GlobalsUniform {
    pub fn new(frame: &FrameDesc<'_>, environment: Option<&EnvironmentMap>, encode_srgb: bool) -> Self {
        let lighting: &Lighting = frame.lighting;
        let scale = |c: [f32; 3], k: f32| [c[0] * k, c[1] * k, c[2] * k, 0.0];
        let key_dir = lighting
            .key_position
            .coords
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(nalgebra::Vector3::y);

        let mut sh = [[0.0; 4]; SH_COEFFICIENTS];
        if let Some(env) = environment {
            for (dst, src) in sh.iter_mut().zip(env.coefficients.iter()) {
                *dst = [src[0], src[1], src[2], 0.0];
            }
        }

        Self {
            view_proj: (frame.projection * frame.view).into(),
            eye: [frame.eye.x, frame.eye.y, frame.eye.z, 1.0],
            ambient: scale(lighting.ambient_color, lighting.ambient_intensity),
            key_dir: [key_dir.x, key_dir.y, key_dir.z, 0.0],
            key_color: scale(lighting.key_color, lighting.key_intensity),
            sh,
            params: [
                lighting.exposure,
                if environment.is_some() { 1.0 } else { 0.0 },
                if encode_srgb { 1.0 } else { 0.0 },
                0.0,
            ],
        }
    }
}

/// Per-draw uniform block, mirrored by `Model` in the shader
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct ModelUniform {
    pub model: [[f32; 4]; 4],
    pub normal: [[f32; 4]; 4],
    pub base_color: [f32; 4],
    pub material: [f32; 4],
}

impl ModelUniform {
    pub fn new(mesh: &MeshPrimitive, world: &Matrix4<f32>) -> Self {
        let material = &mesh.material;
        let unlit = if material.model == MaterialModel::Unlit { 1.0 } else { 0.0 };
        Self {
            model: (*world).into(),
            normal: normal_matrix(world).into(),
            base_color: material.base_color,
            material: [material.metallic, material.roughness, material.env_intensity, unlit],
        }
    }
}

/// Inverse-transpose of the upper 3x3, so normals survive non-uniform scale
pub fn normal_matrix(world: &Matrix4<f32>) -> Matrix4<f32> {
    let linear: Matrix3<f32> = world.fixed_view::<3, 3>(0, 0).into_owned();
    linear
        .try_inverse()
        .map(|inverse| inverse.transpose())
        .unwrap_or(linear)
        .to_homogeneous()
}

/// GPU-resident copy of one primitive
struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

/// Colour and depth attachments sized to the surface
struct Attachments {
    depth: wgpu::TextureView,
    msaa: Option<wgpu::TextureView>,
}

/// Forward renderer drawing the scene into a window surface
pub struct SceneRenderer {
    pub gpu_context: GpuContext,
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    size: SurfaceSize,
    sample_count: u32,
    encode_srgb: bool,
    clear_color: wgpu::Color,
    render_pipeline: wgpu::RenderPipeline,
    globals_buffer: wgpu::Buffer,
    globals_bind_group: wgpu::BindGroup,
    model_layout: wgpu::BindGroupLayout,
    attachments: Attachments,
    environment: Option<EnvironmentMap>,
    meshes: HashMap<MeshId, GpuMesh>,
    draw_queue: Vec<MeshId>,
}

impl SceneRenderer {
    /// Create a renderer presenting into `window` at the given physical size
    pub async fn new(window: Arc<Window>, size: SurfaceSize, config: &ViewportConfig) -> Result<Self> {
        let (gpu_context, surface) = GpuContext::with_window(window).await?;

        let surface_caps = surface.get_capabilities(&gpu_context.adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| Error::RenderSurface("Surface reports no supported formats".to_string()))?;
        let alpha_mode = [wgpu::CompositeAlphaMode::PreMultiplied, wgpu::CompositeAlphaMode::PostMultiplied]
            .into_iter()
            .find(|m| surface_caps.alpha_modes.contains(m))
            .or_else(|| surface_caps.alpha_modes.first().copied())
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        if !size.is_empty() {
            surface.configure(&gpu_context.device, &surface_config);
        }

        let format_features = gpu_context.adapter.get_texture_format_features(surface_format);
        let sample_count = if config.multisample && format_features.flags.sample_count_supported(MSAA_SAMPLES) {
            MSAA_SAMPLES
        } else {
            1
        };
        debug!(?surface_format, ?alpha_mode, sample_count, "configured surface");

        let globals_layout = gpu_context.create_uniform_layout(
            "globals_bind_group_layout",
            wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
        );
        let model_layout = gpu_context.create_uniform_layout(
            "model_bind_group_layout",
            wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
        );
        let globals_buffer = gpu_context.create_buffer_init(
            "Globals Buffer",
            &[GlobalsUniform::zeroed()],
            wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        );
        let globals_bind_group =
            gpu_context.create_uniform_bind_group("globals_bind_group", &globals_layout, &globals_buffer);

        let shader = gpu_context.create_shader_module("Scene Shader", include_str!("shaders/scene.wgsl"));
        let pipeline_layout = gpu_context.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Render Pipeline Layout"),
            bind_group_layouts: &[&globals_layout, &model_layout],
            push_constant_ranges: &[],
        });

        let render_pipeline = gpu_context.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Scene Render Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[MeshVertex::desc()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_config.format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: sample_count,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
        });

        let attachments = create_attachments(&gpu_context.device, &surface_config, sample_count);
        let [r, g, b, a] = config.clear_color;

        Ok(Self {
            gpu_context,
            surface,
            encode_srgb: !surface_config.format.is_srgb(),
            surface_config,
            size,
            sample_count,
            clear_color: wgpu::Color { r, g, b, a },
            render_pipeline,
            globals_buffer,
            globals_bind_group,
            model_layout,
            attachments,
            environment: None,
            meshes: HashMap::new(),
            draw_queue: Vec::new(),
        })
    }

    /// Number of primitives currently resident on the GPU
    pub fn resident_meshes(&self) -> usize {
        self.meshes.len()
    }

    fn upload(&mut self, mesh: &MeshPrimitive) {
        if self.meshes.contains_key(&mesh.id) {
            return;
        }
        let ctx = &self.gpu_context;
        let vertices = build_vertices(mesh);
        let vertex_buffer = ctx.create_buffer_init("Mesh Vertex Buffer", &vertices, wgpu::BufferUsages::VERTEX);
        let index_buffer = ctx.create_buffer_init("Mesh Index Buffer", &mesh.indices, wgpu::BufferUsages::INDEX);
        let uniform_buffer = ctx.create_buffer_init(
            "Model Uniform Buffer",
            &[ModelUniform::zeroed()],
            wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        );
        let bind_group = ctx.create_uniform_bind_group("model_bind_group", &self.model_layout, &uniform_buffer);

        debug!(mesh = mesh.id.get(), vertices = vertices.len(), "uploaded mesh");
        self.meshes.insert(
            mesh.id,
            GpuMesh {
                vertex_buffer,
                index_buffer,
                index_count: mesh.indices.len() as u32,
                uniform_buffer,
                bind_group,
            },
        );
    }

    fn reconfigure(&mut self) {
        self.surface.configure(&self.gpu_context.device, &self.surface_config);
        self.attachments = create_attachments(&self.gpu_context.device, &self.surface_config, self.sample_count);
    }
}

fn create_attachments(device: &wgpu::Device, config: &wgpu::SurfaceConfiguration, sample_count: u32) -> Attachments {
    let size = wgpu::Extent3d {
        width: config.width,
        height: config.height,
        depth_or_array_layers: 1,
    };
    let texture = |label: &str, format: wgpu::TextureFormat| {
        device
            .create_texture(&wgpu::TextureDescriptor {
                label: Some(label),
                size,
                mip_level_count: 1,
                sample_count,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            })
            .create_view(&wgpu::TextureViewDescriptor::default())
    };

    Attachments {
        depth: texture("Depth Texture", DEPTH_FORMAT),
        msaa: (sample_count > 1).then(|| texture("Multisample Texture", config.format)),
    }
}

impl RenderSurface for SceneRenderer {
    fn size(&self) -> SurfaceSize {
        self.size
    }

    fn resize(&mut self, size: SurfaceSize) {
        self.size = size;
        if size.is_empty() {
            return;
        }
        self.surface_config.width = size.width;
        self.surface_config.height = size.height;
        self.reconfigure();
    }

    fn set_environment(&mut self, environment: Option<&EnvironmentMap>) {
        self.environment = environment.cloned();
    }

    fn render(&mut self, frame: &FrameDesc<'_>) -> Result<()> {
        if self.size.is_empty() {
            return Ok(());
        }

        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.reconfigure();
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                warn!("surface texture timed out; skipping frame");
                return Ok(());
            }
            Err(e) => return Err(Error::RenderSurface(format!("Failed to get surface texture: {}", e))),
        };
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let globals = GlobalsUniform::new(frame, self.environment.as_ref(), self.encode_srgb);
        self.gpu_context
            .queue
            .write_buffer(&self.globals_buffer, 0, bytemuck::bytes_of(&globals));

        let mut queue = std::mem::take(&mut self.draw_queue);
        queue.clear();
        frame.scene.for_each_draw(&mut |mesh, world| {
            if mesh.is_empty() {
                return;
            }
            self.upload(mesh);
            if let Some(gpu_mesh) = self.meshes.get(&mesh.id) {
                let uniform = ModelUniform::new(mesh, world);
                self.gpu_context
                    .queue
                    .write_buffer(&gpu_mesh.uniform_buffer, 0, bytemuck::bytes_of(&uniform));
                queue.push(mesh.id);
            }
        });

        let mut encoder = self.gpu_context.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Scene Render Encoder"),
        });

        {
            let (target, resolve_target) = match &self.attachments.msaa {
                Some(msaa) => (msaa, Some(&view)),
                None => (&view, None),
            };
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.attachments.depth,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_pipeline(&self.render_pipeline);
            render_pass.set_bind_group(0, &self.globals_bind_group, &[]);
            for id in &queue {
                let Some(mesh) = self.meshes.get(id) else { continue };
                render_pass.set_bind_group(1, &mesh.bind_group, &[]);
                render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                render_pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..mesh.index_count, 0, 0..1);
            }
        }

        self.gpu_context.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        self.draw_queue = queue;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use turntable_core::{
        DrawList, Material, Point3f, TextureBinding, TextureImage, Vector3f,
    };

    fn triangle() -> MeshPrimitive {
        MeshPrimitive::new(
            vec![Point3f::origin(), Point3f::new(1.0, 0.0, 0.0), Point3f::new(0.0, 1.0, 0.0)],
            vec![0, 1, 2],
        )
    }

    struct Nothing;

    impl DrawList for Nothing {
        fn for_each_draw(&self, _f: &mut dyn FnMut(&MeshPrimitive, &Matrix4<f32>)) {}
    }

    #[test]
    fn vertices_default_to_white_and_up() {
        let vertices = build_vertices(&triangle());
        assert_eq!(vertices.len(), 3);
        assert_eq!(vertices[1].position, [1.0, 0.0, 0.0]);
        assert_eq!(vertices[0].normal, [0.0, 1.0, 0.0]);
        assert_eq!(vertices[2].color, [1.0; 4]);
    }

    #[test]
    fn texture_is_baked_into_vertex_colors() {
        let image = Arc::new(TextureImage { width: 1, height: 1, pixels: vec![[255, 0, 0, 128]] });
        let mut mesh = triangle().with_material(Material {
            base_color_texture: Some(TextureBinding::new(image)),
            ..Material::default()
        });
        mesh.uvs = Some(vec![[0.5, 0.5]; 3]);
        mesh.colors = Some(vec![[0.5, 1.0, 1.0]; 3]);
        mesh.compute_normals();

        let vertices = build_vertices(&mesh);
        assert_relative_eq!(vertices[0].color[0], 0.5);
        assert_relative_eq!(vertices[0].color[1], 0.0);
        assert_relative_eq!(vertices[0].color[3], 128.0 / 255.0);
        assert_eq!(vertices[0].normal, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn normal_matrix_undoes_non_uniform_scale() {
        let world = Matrix4::new_nonuniform_scaling(&Vector3f::new(2.0, 1.0, 1.0));
        let n = normal_matrix(&world).transform_vector(&Vector3f::new(1.0, 1.0, 0.0));
        assert_relative_eq!(n, Vector3f::new(0.5, 1.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn globals_carry_lighting_and_environment() {
        let lighting = Lighting::default();
        let frame = FrameDesc {
            view: Matrix4::identity(),
            projection: Matrix4::identity(),
            eye: Point3f::new(0.0, 0.0, 5.0),
            lighting: &lighting,
            scene: &Nothing,
        };

        let without = GlobalsUniform::new(&frame, None, false);
        assert_eq!(without.params, [1.1, 0.0, 0.0, 0.0]);
        assert_relative_eq!(without.ambient[0], 0.4);
        assert_relative_eq!(without.key_color[1], 1.2);

        let env = EnvironmentMap::uniform([1.0, 1.0, 1.0]);
        let with = GlobalsUniform::new(&frame, Some(&env), true);
        assert_eq!(with.params[1], 1.0);
        assert_eq!(with.params[2], 1.0);
        assert_relative_eq!(with.sh[0][0], env.coefficients[0][0]);
    }

    #[test]
    fn uniform_blocks_match_shader_layout() {
        assert_eq!(std::mem::size_of::<GlobalsUniform>(), 64 + 4 * 16 + 9 * 16 + 16);
        assert_eq!(std::mem::size_of::<ModelUniform>(), 2 * 64 + 2 * 16);
        assert_eq!(std::mem::size_of::<MeshVertex>(), 40);
    }
}
