//! Render targets and ping-pong pairs.
//!
//! A `RenderTarget` bundles one color texture with its view and size data; a
//! render pass aimed at its view is the bound framebuffer, with the viewport
//! implied by the attachment. `DoubleTarget` is the ping-pong pair: kernels
//! sample `read` while rasterizing into `write`, then `swap` publishes the
//! result.

use glam::Vec2;

use super::GpuContext;
use crate::error::FluidError;

pub struct RenderTarget {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
    label: String,
}

impl RenderTarget {
    pub fn new(
        ctx: &GpuContext,
        label: &str,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
    ) -> Result<Self, FluidError> {
        let texture = ctx.try_alloc(label, |device| {
            device.create_texture(&wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                    | wgpu::TextureUsages::TEXTURE_BINDING
                    | wgpu::TextureUsages::COPY_SRC,
                view_formats: &[],
            })
        })?;
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Ok(Self {
            texture,
            view,
            width,
            height,
            format,
            label: label.to_string(),
        })
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn texel_size(&self) -> Vec2 {
        Vec2::new(1.0 / self.width as f32, 1.0 / self.height as f32)
    }

    /// Begin a render pass targeting this texture. `clear` wipes it to
    /// transparent black first, otherwise previous contents load.
    pub fn begin_pass<'e>(
        &self,
        encoder: &'e mut wgpu::CommandEncoder,
        clear: bool,
    ) -> wgpu::RenderPass<'e> {
        begin_target_pass(encoder, &self.view, &self.label, clear)
    }
}

/// Start a pass on an arbitrary color view (a field target or the surface).
pub fn begin_target_pass<'e>(
    encoder: &'e mut wgpu::CommandEncoder,
    view: &wgpu::TextureView,
    label: &str,
    clear: bool,
) -> wgpu::RenderPass<'e> {
    let load = if clear {
        wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT)
    } else {
        wgpu::LoadOp::Load
    };
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view,
            resolve_target: None,
            ops: wgpu::Operations {
                load,
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
    })
}

/// Ping-pong pair. Kernels that read their previous state while writing the
/// next hold one of these; `read` and `write` always have identical size and
/// format.
pub struct DoubleTarget {
    targets: [RenderTarget; 2],
    index: usize,
}

impl DoubleTarget {
    pub fn new(
        ctx: &GpuContext,
        label: &str,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
    ) -> Result<Self, FluidError> {
        let a = RenderTarget::new(ctx, &format!("{label} A"), width, height, format)?;
        let b = RenderTarget::new(ctx, &format!("{label} B"), width, height, format)?;
        Ok(Self {
            targets: [a, b],
            index: 0,
        })
    }

    pub fn read(&self) -> &RenderTarget {
        &self.targets[self.index]
    }

    pub fn write(&self) -> &RenderTarget {
        &self.targets[1 - self.index]
    }

    pub fn swap(&mut self) {
        self.index = 1 - self.index;
    }

    pub fn width(&self) -> u32 {
        self.read().width()
    }

    pub fn height(&self) -> u32 {
        self.read().height()
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.read().format()
    }

    pub fn texel_size(&self) -> Vec2 {
        self.read().texel_size()
    }

    /// Overwrite the current `read` slot, used by the content-preserving
    /// resize path.
    pub fn replace_read(&mut self, target: RenderTarget) {
        self.targets[self.index] = target;
    }

    /// Overwrite the current `write` slot (contents undefined after resize).
    pub fn replace_write(&mut self, target: RenderTarget) {
        self.targets[1 - self.index] = target;
    }
}
