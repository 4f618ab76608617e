//! Dithering texture for the bloom composite.
//!
//! A small tiling noise image breaks up banding in the gamma-encoded bloom
//! term. Loading is fallible; the caller degrades bloom when the asset is
//! missing instead of blocking startup.

use std::path::Path;

use glam::Vec2;

use crate::error::FluidError;
use crate::gpu::GpuContext;

pub struct DitherTexture {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
}

impl DitherTexture {
    pub fn load(ctx: &GpuContext, path: &Path) -> Result<Self, FluidError> {
        let image = image::open(path)
            .map_err(|e| FluidError::AssetLoad {
                path: path.display().to_string(),
                message: e.to_string(),
            })?
            .to_rgba8();
        let (width, height) = image.dimensions();
        Ok(Self::from_rgba8(ctx, &image, width, height))
    }

    /// Flat white stand-in so the display bind group stays complete when no
    /// noise image is available.
    pub fn fallback(ctx: &GpuContext) -> Self {
        Self::from_rgba8(ctx, &[0x80, 0x80, 0x80, 0xff], 1, 1)
    }

    fn from_rgba8(ctx: &GpuContext, pixels: &[u8], width: u32, height: u32) -> Self {
        let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Dither Texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        // write_texture wants 256-byte row alignment for multi-row uploads
        let unpadded = width as usize * 4;
        let padded = unpadded.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT as usize)
            * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT as usize;
        let mut data = vec![0u8; padded * height as usize];
        for row in 0..height as usize {
            let src = &pixels[row * unpadded..(row + 1) * unpadded];
            data[row * padded..row * padded + unpadded].copy_from_slice(src);
        }

        ctx.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded as u32),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
            width,
            height,
        }
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    /// Tiling factor so one noise texel maps to one surface pixel.
    pub fn scale(&self, surface_width: u32, surface_height: u32) -> Vec2 {
        Vec2::new(
            surface_width as f32 / self.width as f32,
            surface_height as f32 / self.height as f32,
        )
    }
}
