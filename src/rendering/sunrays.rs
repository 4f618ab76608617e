//! Radial light-scattering post effect.
//!
//! A brightness mask of the dye is marched toward the screen center, then
//! softened with one separable blur iteration. Output is single-channel and
//! modulates the final composite.

use bytemuck::{Pod, Zeroable};
use glam::Vec2;
use wgpu::util::DeviceExt;

use super::kernel::{Kernel, TexelParams};
use super::shaders::{self, compose, compose_standalone};
use crate::config::SimConfig;
use crate::error::FluidError;
use crate::gpu::{FullscreenQuad, GpuContext, RenderTarget};

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct SunraysParams {
    texel_size: [f32; 2],
    weight: f32,
    _pad: f32,
}

pub struct Sunrays {
    mask: Kernel,
    rays: Kernel,
    blur: Kernel,

    target: RenderTarget,
    temp: RenderTarget,
    blur_h_params: wgpu::Buffer,
    blur_v_params: wgpu::Buffer,

    applied: (u32, u32),
}

impl Sunrays {
    pub fn new(ctx: &GpuContext, size: (u32, u32)) -> Result<Self, FluidError> {
        let format = ctx.formats.r;
        let mask = Kernel::new(
            ctx,
            "Sunrays Mask",
            &compose(shaders::src::SUNRAYS_MASK, &[]),
            std::mem::size_of::<TexelParams>() as u64,
            1,
            format,
            None,
        )?;
        let rays = Kernel::new(
            ctx,
            "Sunrays",
            &compose(shaders::src::SUNRAYS, &[]),
            std::mem::size_of::<SunraysParams>() as u64,
            1,
            format,
            None,
        )?;
        let blur = Kernel::new(
            ctx,
            "Sunrays Blur",
            &compose_standalone(shaders::src::BLUR),
            std::mem::size_of::<TexelParams>() as u64,
            1,
            format,
            None,
        )?;

        let mut sunrays = Self {
            mask,
            rays,
            blur,
            target: RenderTarget::new(ctx, "Sunrays", size.0, size.1, format)?,
            temp: RenderTarget::new(ctx, "Sunrays Temp", size.0, size.1, format)?,
            blur_h_params: blur_buffer(ctx, "Sunrays Blur H Params", Vec2::ZERO),
            blur_v_params: blur_buffer(ctx, "Sunrays Blur V Params", Vec2::ZERO),
            applied: (0, 0),
        };
        sunrays.rebuild(ctx, size)?;
        Ok(sunrays)
    }

    pub fn target(&self) -> &RenderTarget {
        &self.target
    }

    pub fn resize(&mut self, ctx: &GpuContext, size: (u32, u32)) -> Result<(), FluidError> {
        if self.applied == size {
            return Ok(());
        }
        self.rebuild(ctx, size)
    }

    fn rebuild(&mut self, ctx: &GpuContext, size: (u32, u32)) -> Result<(), FluidError> {
        let format = ctx.formats.r;
        self.target = RenderTarget::new(ctx, "Sunrays", size.0, size.1, format)?;
        self.temp = RenderTarget::new(ctx, "Sunrays Temp", size.0, size.1, format)?;

        let texel = self.target.texel_size();
        ctx.queue.write_buffer(
            &self.blur_h_params,
            0,
            bytemuck::bytes_of(&TexelParams::new(Vec2::new(texel.x, 0.0))),
        );
        ctx.queue.write_buffer(
            &self.blur_v_params,
            0,
            bytemuck::bytes_of(&TexelParams::new(Vec2::new(0.0, texel.y))),
        );

        self.applied = size;
        Ok(())
    }

    pub fn apply(
        &self,
        ctx: &GpuContext,
        quad: &FullscreenQuad,
        encoder: &mut wgpu::CommandEncoder,
        source: &wgpu::TextureView,
        config: &SimConfig,
    ) {
        self.mask
            .write_params(&ctx.queue, &TexelParams::new(self.temp.texel_size()));
        self.rays.write_params(
            &ctx.queue,
            &SunraysParams {
                texel_size: self.target.texel_size().to_array(),
                weight: config.sunrays_weight,
                _pad: 0.0,
            },
        );

        let bind = self.mask.bind(ctx, &[source]);
        {
            let mut pass = self.temp.begin_pass(encoder, true);
            pass.set_pipeline(self.mask.pipeline());
            pass.set_bind_group(0, &bind, &[]);
            quad.draw(&mut pass);
        }

        let bind = self.rays.bind(ctx, &[self.temp.view()]);
        {
            let mut pass = self.target.begin_pass(encoder, true);
            pass.set_pipeline(self.rays.pipeline());
            pass.set_bind_group(0, &bind, &[]);
            quad.draw(&mut pass);
        }

        // One separable blur iteration: horizontal into temp, vertical back
        let bind = self.blur.bind_with(ctx, &self.blur_h_params, &[self.target.view()]);
        {
            let mut pass = self.temp.begin_pass(encoder, false);
            pass.set_pipeline(self.blur.pipeline());
            pass.set_bind_group(0, &bind, &[]);
            quad.draw(&mut pass);
        }
        let bind = self.blur.bind_with(ctx, &self.blur_v_params, &[self.temp.view()]);
        {
            let mut pass = self.target.begin_pass(encoder, false);
            pass.set_pipeline(self.blur.pipeline());
            pass.set_bind_group(0, &bind, &[]);
            quad.draw(&mut pass);
        }
    }
}

fn blur_buffer(ctx: &GpuContext, label: &str, texel_size: Vec2) -> wgpu::Buffer {
    ctx.device
        .create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::bytes_of(&TexelParams::new(texel_size)),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        })
}
