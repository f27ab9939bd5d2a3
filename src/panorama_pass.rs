//! GPU pass drawing a [`RenderRoot`]: the panorama sphere, then the hotspot
//! markers as camera-facing sprites on top.

use wgpu::util::DeviceExt;

use crate::camera::Camera;
use crate::gpu::GpuContext;
use crate::sphere::{SphereGeometry, SphereVertex};
use crate::texture::Texture;
use crate::tour::TextureHandle;
use crate::tour::content::{RenderRoot, SPHERE_RADIUS, SPHERE_SEGMENTS};

/// Uniforms shared by the sphere and marker pipelines.
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct PanoramaUniforms {
    view_proj: [[f32; 4]; 4],
    /// Camera right vector, for billboarding. `w` unused.
    camera_right: [f32; 4],
    /// Camera up vector, for billboarding. `w` unused.
    camera_up: [f32; 4],
    opacity: f32,
    _pad: [f32; 3],
}

/// One marker sprite.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct MarkerInstance {
    position: [f32; 3],
    size: f32,
}

impl MarkerInstance {
    const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<MarkerInstance>() as u64,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &[
            // position
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x3,
            },
            // size
            wgpu::VertexAttribute {
                offset: 12,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32,
            },
        ],
    };
}

/// Draws the panorama sphere and its hotspot markers.
pub struct PanoramaPass {
    sphere_pipeline: wgpu::RenderPipeline,
    marker_pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    texture_bind_group_layout: wgpu::BindGroupLayout,
    sphere_vertices: wgpu::Buffer,
    sphere_indices: wgpu::Buffer,
    sphere_index_count: u32,
    marker_bind_group: wgpu::BindGroup,
    /// Bind group of the panorama last drawn, rebuilt when the texture changes.
    panorama_binding: Option<(TextureHandle<Texture>, wgpu::BindGroup)>,
}

impl PanoramaPass {
    /// Build both pipelines. `marker` is the sprite drawn for every hotspot.
    pub fn new(gpu: &GpuContext, marker: &Texture) -> Self {
        let device = &gpu.device;

        let sphere_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Panorama Sphere Shader"),
            source: wgpu::ShaderSource::Wgsl(SPHERE_SHADER.into()),
        });
        let marker_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Hotspot Marker Shader"),
            source: wgpu::ShaderSource::Wgsl(MARKER_SHADER.into()),
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Panorama Uniforms"),
            size: std::mem::size_of::<PanoramaUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniform_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Panorama Uniform Bind Group Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Panorama Uniform Bind Group"),
            layout: &uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let texture_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Panorama Texture Bind Group Layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Panorama Pipeline Layout"),
            bind_group_layouts: &[&uniform_bind_group_layout, &texture_bind_group_layout],
            push_constant_ranges: &[],
        });

        let sphere_pipeline = create_pipeline(
            gpu,
            &pipeline_layout,
            &sphere_shader,
            SphereVertex::LAYOUT,
            "Panorama Sphere Pipeline",
        );
        let marker_pipeline = create_pipeline(
            gpu,
            &pipeline_layout,
            &marker_shader,
            MarkerInstance::LAYOUT,
            "Hotspot Marker Pipeline",
        );

        let geometry = SphereGeometry::new(SPHERE_RADIUS, SPHERE_SEGMENTS);
        let sphere_vertices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Panorama Sphere Vertices"),
            contents: bytemuck::cast_slice(&geometry.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let sphere_indices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Panorama Sphere Indices"),
            contents: bytemuck::cast_slice(&geometry.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        let marker_bind_group =
            create_texture_bind_group(gpu, &texture_bind_group_layout, marker, "Marker");

        Self {
            sphere_pipeline,
            marker_pipeline,
            uniform_buffer,
            uniform_bind_group,
            texture_bind_group_layout,
            sphere_vertices,
            sphere_indices,
            sphere_index_count: geometry.indices.len() as u32,
            marker_bind_group,
            panorama_binding: None,
        }
    }

    /// Clear `target` to black and draw `root` as seen by `camera`.
    pub fn render(
        &mut self,
        gpu: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        camera: &Camera,
        root: &RenderRoot<Texture>,
    ) {
        let right = camera.right();
        let up = right.cross(camera.forward).normalize_or_zero();
        let opacity = root.panorama.as_ref().map_or(0.0, |p| p.opacity);

        let uniforms = PanoramaUniforms {
            view_proj: camera.view_proj(gpu.aspect()).to_cols_array_2d(),
            camera_right: right.extend(0.0).to_array(),
            camera_up: up.extend(0.0).to_array(),
            opacity,
            _pad: [0.0; 3],
        };
        gpu.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));

        let panorama = root.panorama.as_ref().and_then(|p| p.texture.as_ref());
        self.bind_panorama(gpu, panorama);

        let instances: Vec<MarkerInstance> = root
            .markers
            .iter()
            .map(|m| MarkerInstance {
                position: m.position.to_array(),
                size: m.size,
            })
            .collect();
        let instance_buffer = (!instances.is_empty()).then(|| {
            gpu.device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Hotspot Marker Instances"),
                    contents: bytemuck::cast_slice(&instances),
                    usage: wgpu::BufferUsages::VERTEX,
                })
        });

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Panorama Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_bind_group(0, &self.uniform_bind_group, &[]);

        if let Some((_, bind_group)) = &self.panorama_binding {
            pass.set_pipeline(&self.sphere_pipeline);
            pass.set_bind_group(1, bind_group, &[]);
            pass.set_vertex_buffer(0, self.sphere_vertices.slice(..));
            pass.set_index_buffer(self.sphere_indices.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..self.sphere_index_count, 0, 0..1);
        }

        if let Some(buffer) = &instance_buffer {
            pass.set_pipeline(&self.marker_pipeline);
            pass.set_bind_group(1, &self.marker_bind_group, &[]);
            pass.set_vertex_buffer(0, buffer.slice(..));
            pass.draw(0..6, 0..instances.len() as u32);
        }
    }
}

impl PanoramaPass {
    fn bind_panorama(&mut self, gpu: &GpuContext, texture: Option<&TextureHandle<Texture>>) {
        let Some(handle) = texture else {
            self.panorama_binding = None;
            return;
        };
        let bound = self.panorama_binding.as_ref().map(|(bound, _)| bound);
        if !needs_rebind(bound, handle) {
            return;
        }

        let bind_group = create_texture_bind_group(
            gpu,
            &self.texture_bind_group_layout,
            handle.texture(),
            "Panorama",
        );
        self.panorama_binding = Some((handle.clone(), bind_group));
    }
}

/// Whether a bind group made for `bound` cannot be reused for `next`.
fn needs_rebind<T>(bound: Option<&TextureHandle<T>>, next: &TextureHandle<T>) -> bool {
    bound.is_none_or(|bound| !bound.ptr_eq(next))
}

fn create_pipeline(
    gpu: &GpuContext,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    buffer: wgpu::VertexBufferLayout<'static>,
    label: &str,
) -> wgpu::RenderPipeline {
    gpu.device
        .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(layout),
            vertex: wgpu::VertexState {
                module: shader,
                entry_point: Some("vs"),
                buffers: &[buffer],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: shader,
                entry_point: Some("fs"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: gpu.config.format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        })
}

fn create_texture_bind_group(
    gpu: &GpuContext,
    layout: &wgpu::BindGroupLayout,
    texture: &Texture,
    label: &str,
) -> wgpu::BindGroup {
    gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(&format!("{} Texture Bind Group", label)),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&texture.view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&texture.sampler),
            },
        ],
    })
}

/// Panorama sphere shader - textured from the inside, horizontally mirrored.
const SPHERE_SHADER: &str = r#"
struct Uniforms {
    view_proj: mat4x4f,
    camera_right: vec4f,
    camera_up: vec4f,
    opacity: f32,
}

@group(0) @binding(0) var<uniform> u: Uniforms;
@group(1) @binding(0) var pano_texture: texture_2d<f32>;
@group(1) @binding(1) var pano_sampler: sampler;

struct VertexOut {
    @builtin(position) position: vec4f,
    @location(0) uv: vec2f,
}

@vertex
fn vs(@location(0) position: vec3f, @location(1) uv: vec2f) -> VertexOut {
    var out: VertexOut;
    out.position = u.view_proj * vec4f(position, 1.0);
    // Seen from inside, the image would read backwards.
    out.uv = vec2f(1.0 - uv.x, uv.y);
    return out;
}

@fragment
fn fs(in: VertexOut) -> @location(0) vec4f {
    let color = textureSample(pano_texture, pano_sampler, in.uv);
    return vec4f(color.rgb, u.opacity);
}
"#;

/// Hotspot marker shader - camera-facing quads, one instance per marker.
const MARKER_SHADER: &str = r#"
struct Uniforms {
    view_proj: mat4x4f,
    camera_right: vec4f,
    camera_up: vec4f,
    opacity: f32,
}

@group(0) @binding(0) var<uniform> u: Uniforms;
@group(1) @binding(0) var marker_texture: texture_2d<f32>;
@group(1) @binding(1) var marker_sampler: sampler;

struct VertexOut {
    @builtin(position) position: vec4f,
    @location(0) uv: vec2f,
}

@vertex
fn vs(
    @builtin(vertex_index) vi: u32,
    @location(0) center: vec3f,
    @location(1) size: f32,
) -> VertexOut {
    var corners = array<vec2f, 6>(
        vec2f(-0.5, -0.5), vec2f(0.5, -0.5), vec2f(0.5, 0.5),
        vec2f(-0.5, -0.5), vec2f(0.5, 0.5), vec2f(-0.5, 0.5),
    );
    let corner = corners[vi];
    let world = center
        + u.camera_right.xyz * corner.x * size
        + u.camera_up.xyz * corner.y * size;

    var out: VertexOut;
    out.position = u.view_proj * vec4f(world, 1.0);
    out.uv = vec2f(corner.x + 0.5, 0.5 - corner.y);
    return out;
}

@fragment
fn fs(in: VertexOut) -> @location(0) vec4f {
    return textureSample(marker_texture, marker_sampler, in.uv);
}
"#;
