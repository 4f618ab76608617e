//! One fragment program: render pipeline, bind-group layout and uniform
//! buffer.
//!
//! Every kernel shares the same binding scheme — params at binding 0, then
//! its sampled textures, then one sampler — so bind groups can be rebuilt
//! per draw from whatever textures the current ping-pong roles dictate.

use bytemuck::{Pod, Zeroable};

use crate::error::FluidError;
use crate::gpu::{FullscreenQuad, GpuContext};

/// Params layout shared by the gather-style kernels that only need texel
/// offsets.
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct TexelParams {
    pub texel_size: [f32; 2],
    pub _pad: [f32; 2],
}

impl TexelParams {
    pub fn new(texel_size: glam::Vec2) -> Self {
        Self {
            texel_size: texel_size.to_array(),
            _pad: [0.0; 2],
        }
    }
}

/// Additive blending for the bloom upsample walk.
pub const ADDITIVE_BLEND: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
};

pub struct Kernel {
    name: String,
    pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
    params: wgpu::Buffer,
    filterable: bool,
}

impl Kernel {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ctx: &GpuContext,
        name: &str,
        source: &str,
        params_size: u64,
        texture_count: u32,
        target_format: wgpu::TextureFormat,
        blend: Option<wgpu::BlendState>,
    ) -> Result<Self, FluidError> {
        let filterable = ctx.formats.linear_filtering;

        let (module, error) = ctx.try_validated(|device, _| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(name),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            })
        });
        if let Some(e) = error {
            return Err(FluidError::ShaderCompile {
                name: name.to_string(),
                message: e.to_string(),
            });
        }

        let layout = bind_group_layout(&ctx.device, name, texture_count, filterable);
        let pipeline_layout = ctx
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(name),
                bind_group_layouts: &[&layout],
                push_constant_ranges: &[],
            });

        let (pipeline, error) = ctx.try_validated(|device, _| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(name),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &module,
                    entry_point: Some("vs_main"),
                    buffers: &[FullscreenQuad::layout()],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &module,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: target_format,
                        blend,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
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
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        });
        if let Some(e) = error {
            return Err(FluidError::PipelineBuild {
                name: name.to_string(),
                message: e.to_string(),
            });
        }

        let params = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("{name} Params")),
            size: params_size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Ok(Self {
            name: name.to_string(),
            pipeline,
            layout,
            params,
            filterable,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pipeline(&self) -> &wgpu::RenderPipeline {
        &self.pipeline
    }

    pub fn write_params<P: Pod>(&self, queue: &wgpu::Queue, params: &P) {
        queue.write_buffer(&self.params, 0, bytemuck::bytes_of(params));
    }

    /// Bind group over the kernel's own params buffer.
    pub fn bind(&self, ctx: &GpuContext, textures: &[&wgpu::TextureView]) -> wgpu::BindGroup {
        self.bind_with(ctx, &self.params, textures)
    }

    /// Bind group over an external params buffer, for chained passes that
    /// pre-write one buffer per stage.
    pub fn bind_with(
        &self,
        ctx: &GpuContext,
        params: &wgpu::Buffer,
        textures: &[&wgpu::TextureView],
    ) -> wgpu::BindGroup {
        let sampler = if self.filterable {
            &ctx.field_sampler
        } else {
            &ctx.nearest_sampler
        };

        let mut entries = Vec::with_capacity(textures.len() + 2);
        entries.push(wgpu::BindGroupEntry {
            binding: 0,
            resource: params.as_entire_binding(),
        });
        for (i, view) in textures.iter().enumerate() {
            entries.push(wgpu::BindGroupEntry {
                binding: 1 + i as u32,
                resource: wgpu::BindingResource::TextureView(view),
            });
        }
        if !textures.is_empty() {
            entries.push(wgpu::BindGroupEntry {
                binding: 1 + textures.len() as u32,
                resource: wgpu::BindingResource::Sampler(sampler),
            });
        }

        ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&self.name),
            layout: &self.layout,
            entries: &entries,
        })
    }
}

fn bind_group_layout(
    device: &wgpu::Device,
    name: &str,
    texture_count: u32,
    filterable: bool,
) -> wgpu::BindGroupLayout {
    let mut entries = Vec::with_capacity(texture_count as usize + 2);
    entries.push(wgpu::BindGroupLayoutEntry {
        binding: 0,
        visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    });
    for i in 0..texture_count {
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: 1 + i,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        });
    }
    if texture_count > 0 {
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: 1 + texture_count,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(if filterable {
                wgpu::SamplerBindingType::Filtering
            } else {
                wgpu::SamplerBindingType::NonFiltering
            }),
            count: None,
        });
    }

    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(name),
        entries: &entries,
    })
}
