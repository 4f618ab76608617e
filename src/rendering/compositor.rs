//! Final composite onto the drawing surface.
//!
//! The display shader has three compile-time keywords (SHADING, BLOOM,
//! SUNRAYS). Variants are compiled on demand and cached by keyword bitmask;
//! a failed rebuild keeps the previous variant active so a bad toggle never
//! blanks the screen.

use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};
use glam::Vec2;

use super::kernel::Kernel;
use super::shaders::{self, compose, display_keywords, display_mask};
use crate::config::SimConfig;
use crate::error::FluidError;
use crate::gpu::{begin_target_pass, FullscreenQuad, GpuContext};

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct ColorParams {
    texel_size: [f32; 2],
    _pad: [f32; 2],
    color: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct CheckerboardParams {
    texel_size: [f32; 2],
    aspect_ratio: f32,
    _pad: f32,
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct DisplayParams {
    texel_size: [f32; 2],
    dither_scale: [f32; 2],
}

/// Everything the display shader samples, regardless of which keywords are
/// active; disabled paths still need complete bind groups.
pub struct DisplayInputs<'a> {
    pub dye: &'a wgpu::TextureView,
    pub bloom: &'a wgpu::TextureView,
    pub sunrays: &'a wgpu::TextureView,
    pub dither: &'a wgpu::TextureView,
    pub dye_texel_size: Vec2,
    pub dither_scale: Vec2,
}

pub struct Compositor {
    color: Kernel,
    checkerboard: Kernel,
    variants: HashMap<u8, Kernel>,
    active_mask: u8,
    surface_format: wgpu::TextureFormat,
    rebuild_fail_logged: bool,
}

impl Compositor {
    pub fn new(
        ctx: &GpuContext,
        surface_format: wgpu::TextureFormat,
        config: &SimConfig,
    ) -> Result<Self, FluidError> {
        let color = Kernel::new(
            ctx,
            "Back Color",
            &compose(shaders::src::COLOR, &[]),
            std::mem::size_of::<ColorParams>() as u64,
            0,
            surface_format,
            Some(wgpu::BlendState::ALPHA_BLENDING),
        )?;
        let checkerboard = Kernel::new(
            ctx,
            "Checkerboard",
            &compose(shaders::src::CHECKERBOARD, &[]),
            std::mem::size_of::<CheckerboardParams>() as u64,
            0,
            surface_format,
            None,
        )?;

        let mask = display_mask(config.shading, config.bloom, config.sunrays);
        let mut variants = HashMap::new();
        variants.insert(mask, build_display(ctx, surface_format, mask)?);

        Ok(Self {
            color,
            checkerboard,
            variants,
            active_mask: mask,
            surface_format,
            rebuild_fail_logged: false,
        })
    }

    /// The keyword set the active display program was compiled with.
    pub fn active_mask(&self) -> u8 {
        self.active_mask
    }

    /// Align the active variant with the configuration, compiling and caching
    /// a new one when needed. A compile failure leaves the previous variant
    /// in place and logs once.
    pub fn select_variant(&mut self, ctx: &GpuContext, config: &SimConfig) {
        let mask = display_mask(config.shading, config.bloom, config.sunrays);
        if mask == self.active_mask {
            return;
        }
        if !self.variants.contains_key(&mask) {
            match build_display(ctx, self.surface_format, mask) {
                Ok(kernel) => {
                    self.variants.insert(mask, kernel);
                }
                Err(e) => {
                    if !self.rebuild_fail_logged {
                        log::error!("display variant rebuild failed, keeping previous: {e}");
                        self.rebuild_fail_logged = true;
                    }
                    return;
                }
            }
        }
        self.active_mask = mask;
    }

    /// Composite the dye (with whatever effects are enabled) onto `target`.
    pub fn render(
        &mut self,
        ctx: &GpuContext,
        quad: &FullscreenQuad,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        inputs: &DisplayInputs<'_>,
        config: &SimConfig,
        surface_size: (u32, u32),
    ) {
        self.select_variant(ctx, config);

        let aspect_ratio = surface_size.0 as f32 / surface_size.1 as f32;
        self.color.write_params(
            &ctx.queue,
            &ColorParams {
                texel_size: [0.0; 2],
                _pad: [0.0; 2],
                color: [
                    config.back_color[0],
                    config.back_color[1],
                    config.back_color[2],
                    1.0,
                ],
            },
        );
        self.checkerboard.write_params(
            &ctx.queue,
            &CheckerboardParams {
                texel_size: [0.0; 2],
                aspect_ratio,
                _pad: 0.0,
            },
        );

        let display = &self.variants[&self.active_mask];
        display.write_params(
            &ctx.queue,
            &DisplayParams {
                texel_size: inputs.dye_texel_size.to_array(),
                dither_scale: inputs.dither_scale.to_array(),
            },
        );

        let fill_bind = if config.transparent {
            self.checkerboard.bind(ctx, &[])
        } else {
            self.color.bind(ctx, &[])
        };
        let display_bind = display.bind(
            ctx,
            &[inputs.dye, inputs.bloom, inputs.sunrays, inputs.dither],
        );

        let mut pass = begin_target_pass(encoder, target, "Display Pass", true);
        if config.transparent {
            pass.set_pipeline(self.checkerboard.pipeline());
        } else {
            pass.set_pipeline(self.color.pipeline());
        }
        pass.set_bind_group(0, &fill_bind, &[]);
        quad.draw(&mut pass);

        pass.set_pipeline(display.pipeline());
        pass.set_bind_group(0, &display_bind, &[]);
        quad.draw(&mut pass);
    }
}

fn build_display(
    ctx: &GpuContext,
    surface_format: wgpu::TextureFormat,
    mask: u8,
) -> Result<Kernel, FluidError> {
    Kernel::new(
        ctx,
        &format!("Display {mask:03b}"),
        &compose(shaders::src::DISPLAY, &display_keywords(mask)),
        std::mem::size_of::<DisplayParams>() as u64,
        4,
        surface_format,
        Some(wgpu::BlendState::ALPHA_BLENDING),
    )
}
