//! Device acquisition and capability probing.
//!
//! The solver needs color-renderable floating-point textures. Formats are
//! probed in narrowing order (RGBA16F, RG16F, R16F) by clearing a 4x4 test
//! target inside a validation error scope; a format that fails widens to the
//! next channel count. A device without renderable RGBA16F is rejected.

use crate::error::FluidError;

/// Texture formats selected for the field textures after probing.
#[derive(Debug, Clone, Copy)]
pub struct FormatCaps {
    /// Four-channel half float (dye, bloom chain)
    pub rgba: wgpu::TextureFormat,
    /// Two-channel half float (velocity), widened if unsupported
    pub rg: wgpu::TextureFormat,
    /// Single-channel half float (pressure, divergence, curl, sunrays)
    pub r: wgpu::TextureFormat,
    /// Whether the formats above support linear filtering
    pub linear_filtering: bool,
    /// Whether R32Float is color-renderable and filterable (pressure promotion)
    pub float32_pressure: bool,
}

/// Owns the device, the queue, the probed format set and the shared samplers.
///
/// Everything GPU-resident in the crate is allocated through this context;
/// other components borrow it for the duration of a call.
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub formats: FormatCaps,
    /// Clamp-to-edge linear sampler (or nearest when filtering is unavailable)
    pub field_sampler: wgpu::Sampler,
    pub nearest_sampler: wgpu::Sampler,
}

impl GpuContext {
    pub fn new(adapter: &wgpu::Adapter) -> Result<Self, FluidError> {
        let mut features = wgpu::Features::empty();
        if adapter.features().contains(wgpu::Features::FLOAT32_FILTERABLE) {
            features |= wgpu::Features::FLOAT32_FILTERABLE;
        }

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("Fluid Device"),
            required_features: features,
            required_limits: wgpu::Limits::default(),
            memory_hints: Default::default(),
            ..Default::default()
        }))
        .map_err(|e| FluidError::UnsupportedGpu(e.to_string()))?;

        let formats = probe_formats(adapter, &device, &queue)?;
        log::info!(
            "field formats: rgba={:?} rg={:?} r={:?}, linear filtering: {}",
            formats.rgba,
            formats.rg,
            formats.r,
            formats.linear_filtering
        );

        let field_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Field Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: filter_mode(formats.linear_filtering),
            min_filter: filter_mode(formats.linear_filtering),
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let nearest_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Nearest Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Ok(Self {
            device,
            queue,
            formats,
            field_sampler,
            nearest_sampler,
        })
    }

    /// Run a closure that allocates GPU resources inside an out-of-memory
    /// error scope, mapping any trapped error to `ResourceAlloc`.
    pub fn try_alloc<T>(
        &self,
        label: &str,
        f: impl FnOnce(&wgpu::Device) -> T,
    ) -> Result<T, FluidError> {
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let value = f(&self.device);
        let _ = self.device.poll(wgpu::PollType::Poll);
        match pollster::block_on(self.device.pop_error_scope()) {
            None => Ok(value),
            Some(e) => Err(FluidError::ResourceAlloc {
                label: label.to_string(),
                message: e.to_string(),
            }),
        }
    }

    /// Trap validation errors around `f`, for shader/pipeline construction
    /// and for the per-frame step.
    pub fn try_validated<T>(
        &self,
        f: impl FnOnce(&wgpu::Device, &wgpu::Queue) -> T,
    ) -> (T, Option<wgpu::Error>) {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = f(&self.device, &self.queue);
        let _ = self.device.poll(wgpu::PollType::Poll);
        let error = pollster::block_on(self.device.pop_error_scope());
        (value, error)
    }
}

fn filter_mode(linear: bool) -> wgpu::FilterMode {
    if linear {
        wgpu::FilterMode::Linear
    } else {
        wgpu::FilterMode::Nearest
    }
}

/// Pick field formats, widening R -> RG -> RGBA where a narrow format cannot
/// be rendered to.
fn probe_formats(
    adapter: &wgpu::Adapter,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> Result<FormatCaps, FluidError> {
    use wgpu::TextureFormat::{R16Float, R32Float, Rg16Float, Rgba16Float};

    if !renders_to(device, queue, Rgba16Float) {
        return Err(FluidError::UnsupportedGpu(
            "half-float RGBA textures are not color-renderable".into(),
        ));
    }

    let rg = if renders_to(device, queue, Rg16Float) {
        Rg16Float
    } else {
        Rgba16Float
    };
    let r = if renders_to(device, queue, R16Float) {
        R16Float
    } else {
        rg
    };

    let linear_filtering = [Rgba16Float, rg, r].iter().all(|&f| {
        adapter
            .get_texture_format_features(f)
            .flags
            .contains(wgpu::TextureFormatFeatureFlags::FILTERABLE)
    });

    let float32_pressure = device.features().contains(wgpu::Features::FLOAT32_FILTERABLE)
        && renders_to(device, queue, R32Float);

    Ok(FormatCaps {
        rgba: Rgba16Float,
        rg,
        r,
        linear_filtering,
        float32_pressure,
    })
}

/// Clear a 4x4 texture of the given format and report whether validation
/// stayed clean.
fn renders_to(device: &wgpu::Device, queue: &wgpu::Queue, format: wgpu::TextureFormat) -> bool {
    device.push_error_scope(wgpu::ErrorFilter::Validation);

    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Format Probe Texture"),
        size: wgpu::Extent3d {
            width: 4,
            height: 4,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Format Probe Encoder"),
    });
    {
        let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Format Probe Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
    }
    queue.submit(std::iter::once(encoder.finish()));

    let _ = device.poll(wgpu::PollType::Poll);
    pollster::block_on(device.pop_error_scope()).is_none()
}
