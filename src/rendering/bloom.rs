//! Bloom post effect.
//!
//! Bright regions of the dye pass a soft-knee prefilter, get blurred down a
//! half-resolution chain, walk back up with additive blending and land in the
//! base target scaled by the configured intensity. The dye field itself is
//! never written.

use bytemuck::{Pod, Zeroable};
use glam::Vec2;

use super::kernel::{Kernel, TexelParams, ADDITIVE_BLEND};
use super::shaders::{self, compose};
use crate::config::SimConfig;
use crate::error::FluidError;
use crate::gpu::{FullscreenQuad, GpuContext, RenderTarget};

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct PrefilterParams {
    texel_size: [f32; 2],
    threshold: f32,
    _pad: f32,
    curve: [f32; 3],
    _pad2: f32,
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct FinalParams {
    texel_size: [f32; 2],
    intensity: f32,
    _pad: f32,
}

pub struct Bloom {
    prefilter: Kernel,
    blur: Kernel,
    blur_additive: Kernel,
    final_pass: Kernel,

    base: RenderTarget,
    mips: Vec<RenderTarget>,
    // Per-pass texel sizes, written once per rebuild
    down_params: Vec<wgpu::Buffer>,
    up_params: Vec<wgpu::Buffer>,

    applied: (u32, u32, u32),
}

impl Bloom {
    pub fn new(ctx: &GpuContext, size: (u32, u32), iterations: u32) -> Result<Self, FluidError> {
        let format = ctx.formats.rgba;
        let prefilter = Kernel::new(
            ctx,
            "Bloom Prefilter",
            &compose(shaders::src::BLOOM_PREFILTER, &[]),
            std::mem::size_of::<PrefilterParams>() as u64,
            1,
            format,
            None,
        )?;
        let blur = Kernel::new(
            ctx,
            "Bloom Blur",
            &compose(shaders::src::BLOOM_BLUR, &[]),
            std::mem::size_of::<TexelParams>() as u64,
            1,
            format,
            None,
        )?;
        let blur_additive = Kernel::new(
            ctx,
            "Bloom Blur Additive",
            &compose(shaders::src::BLOOM_BLUR, &[]),
            std::mem::size_of::<TexelParams>() as u64,
            1,
            format,
            Some(ADDITIVE_BLEND),
        )?;
        let final_pass = Kernel::new(
            ctx,
            "Bloom Final",
            &compose(shaders::src::BLOOM_FINAL, &[]),
            std::mem::size_of::<FinalParams>() as u64,
            1,
            format,
            None,
        )?;

        let mut bloom = Self {
            prefilter,
            blur,
            blur_additive,
            final_pass,
            base: RenderTarget::new(ctx, "Bloom", size.0, size.1, format)?,
            mips: Vec::new(),
            down_params: Vec::new(),
            up_params: Vec::new(),
            applied: (0, 0, 0),
        };
        bloom.rebuild(ctx, size, iterations)?;
        Ok(bloom)
    }

    /// The composited bloom texture sampled by the display shader.
    pub fn target(&self) -> &RenderTarget {
        &self.base
    }

    /// Recreate the chain when the base resolution or iteration bound
    /// changed. Chain contents are transient, nothing is preserved.
    pub fn resize(
        &mut self,
        ctx: &GpuContext,
        size: (u32, u32),
        iterations: u32,
    ) -> Result<(), FluidError> {
        if self.applied == (size.0, size.1, iterations) {
            return Ok(());
        }
        self.rebuild(ctx, size, iterations)
    }

    fn rebuild(
        &mut self,
        ctx: &GpuContext,
        size: (u32, u32),
        iterations: u32,
    ) -> Result<(), FluidError> {
        let format = ctx.formats.rgba;
        self.base = RenderTarget::new(ctx, "Bloom", size.0, size.1, format)?;

        self.mips.clear();
        for (i, (w, h)) in chain_sizes(size.0, size.1, iterations).into_iter().enumerate() {
            self.mips
                .push(RenderTarget::new(ctx, &format!("Bloom Mip {i}"), w, h, format)?);
        }

        self.down_params.clear();
        self.up_params.clear();
        for i in 0..self.mips.len() {
            let source_texel = if i == 0 {
                self.base.texel_size()
            } else {
                self.mips[i - 1].texel_size()
            };
            self.down_params
                .push(params_buffer(ctx, &format!("Bloom Down {i} Params"), source_texel));
        }
        for i in (0..self.mips.len().saturating_sub(1)).rev() {
            let source_texel = self.mips[i + 1].texel_size();
            self.up_params
                .push(params_buffer(ctx, &format!("Bloom Up {i} Params"), source_texel));
        }

        self.applied = (size.0, size.1, iterations);
        Ok(())
    }

    /// Run the full bloom chain over the current dye texture.
    pub fn apply(
        &self,
        ctx: &GpuContext,
        quad: &FullscreenQuad,
        encoder: &mut wgpu::CommandEncoder,
        source: &wgpu::TextureView,
        config: &SimConfig,
    ) {
        self.prefilter.write_params(
            &ctx.queue,
            &PrefilterParams {
                texel_size: self.base.texel_size().to_array(),
                threshold: config.bloom_threshold,
                _pad: 0.0,
                curve: config.bloom_curve(),
                _pad2: 0.0,
            },
        );
        self.final_pass.write_params(
            &ctx.queue,
            &FinalParams {
                texel_size: self
                    .mips
                    .first()
                    .map(|m| m.texel_size())
                    .unwrap_or_else(|| self.base.texel_size())
                    .to_array(),
                intensity: config.bloom_intensity,
                _pad: 0.0,
            },
        );

        let bind = self.prefilter.bind(ctx, &[source]);
        {
            let mut pass = self.base.begin_pass(encoder, true);
            pass.set_pipeline(self.prefilter.pipeline());
            pass.set_bind_group(0, &bind, &[]);
            quad.draw(&mut pass);
        }

        if self.mips.is_empty() {
            return;
        }

        // Downsample walk
        let mut last = &self.base;
        for (i, mip) in self.mips.iter().enumerate() {
            let bind = self.blur.bind_with(ctx, &self.down_params[i], &[last.view()]);
            let mut pass = mip.begin_pass(encoder, true);
            pass.set_pipeline(self.blur.pipeline());
            pass.set_bind_group(0, &bind, &[]);
            quad.draw(&mut pass);
            last = mip;
        }

        // Additive upsample walk
        for (pass_index, i) in (0..self.mips.len() - 1).rev().enumerate() {
            let dest = &self.mips[i];
            let bind =
                self.blur_additive
                    .bind_with(ctx, &self.up_params[pass_index], &[last.view()]);
            let mut pass = dest.begin_pass(encoder, false);
            pass.set_pipeline(self.blur_additive.pipeline());
            pass.set_bind_group(0, &bind, &[]);
            quad.draw(&mut pass);
            last = dest;
        }

        let bind = self.final_pass.bind(ctx, &[last.view()]);
        {
            let mut pass = self.base.begin_pass(encoder, true);
            pass.set_pipeline(self.final_pass.pipeline());
            pass.set_bind_group(0, &bind, &[]);
            quad.draw(&mut pass);
        }
    }
}

fn params_buffer(ctx: &GpuContext, label: &str, texel_size: Vec2) -> wgpu::Buffer {
    use wgpu::util::DeviceExt;
    ctx.device
        .create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::bytes_of(&TexelParams::new(texel_size)),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        })
}

/// Halving chain below the base size; stops before a side would drop under
/// two texels, bounded by the configured iteration count.
pub fn chain_sizes(base_width: u32, base_height: u32, iterations: u32) -> Vec<(u32, u32)> {
    let mut sizes = Vec::new();
    for i in 0..iterations {
        let w = base_width >> (i + 1);
        let h = base_height >> (i + 1);
        if w < 2 || h < 2 {
            break;
        }
        sizes.push((w, h));
    }
    sizes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_halves_until_side_too_small() {
        let sizes = chain_sizes(256, 144, 8);
        assert_eq!(sizes.first(), Some(&(128, 72)));
        for window in sizes.windows(2) {
            assert_eq!(window[1].0, window[0].0 / 2);
            assert_eq!(window[1].1, window[0].1 / 2);
        }
        let last = sizes.last().unwrap();
        assert!(last.0 >= 2 && last.1 >= 2);
        assert!(last.0 / 2 < 2 || last.1 / 2 < 2 || sizes.len() == 8);
    }

    #[test]
    fn chain_respects_iteration_bound() {
        assert_eq!(chain_sizes(1024, 1024, 3).len(), 3);
    }

    #[test]
    fn chain_is_empty_for_tiny_base() {
        assert!(chain_sizes(3, 3, 8).is_empty());
    }
}
